//! Dimensional-modeling transforms.
//!
//! - **normalize**: absent-token masking, quote stripping, numeric coercion
//! - **split**: composite field decomposition
//! - **filter** / **derive**: row scoping and derived columns
//! - **dimension**: fresh and incremental surrogate-key assignment
//! - **unpivot** / **pivot**: wide to long and long to wide reshaping
//! - **resolve**: foreign-key resolution into a fact table
//! - **profile**: per-column null and domain profile on a Polars frame

pub mod derive;
pub mod dimension;
pub mod error;
pub mod filter;
pub mod frame;
pub mod normalize;
pub mod pivot;
pub mod profile;
pub mod resolve;
pub mod split;
pub mod unpivot;

pub use derive::{concat_columns, extract_pattern};
pub use dimension::{
    DimensionBuild, DimensionSchema, build_fresh, build_incremental, build_incremental_or_seed,
};
pub use error::{Result, TransformError};
pub use filter::{RowFilter, apply_filters};
pub use normalize::{
    AbsentReason, AbsentTokens, Coerced, ColumnKind, NormalizedTable, Normalizer, clean_text,
    null_counts,
};
pub use pivot::{PivotCategory, Pivoted, pivot_sum};
pub use profile::{ColumnProfile, profile_table};
pub use resolve::{DimensionJoin, JoinReport, Resolved, UnresolvedPolicy, resolve};
pub use split::{CompositeSplitter, SplitOutcome, SplitRejection};
pub use unpivot::{Unpivoted, unpivot};
