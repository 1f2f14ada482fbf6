//! Library side of the `dwh` binary.

pub mod logging;
