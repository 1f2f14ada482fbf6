//! Runs the `dwh` binary against a temporary workspace.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const LABOUR: &str = "freq,wstatus,age,unit,geo\\TIME_PERIOD\t2019 \t2020 \n\
A,EMP,Y15-64,PC,IT\t58.1 b\t:\n";

fn dwh(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dwh"))
        .current_dir(root)
        .args(["--color", "never"])
        .args(args)
        .output()
        .expect("run dwh")
}

fn workspace() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("estat.csv"), LABOUR).expect("source");
    fs::write(temp.path().join("anno_export.csv"), "id_anno,valore\n1,2019\n").expect("years");
    fs::write(
        temp.path().join("dwh.toml"),
        "[labour]\nunresolved = \"keep\"\n",
    )
    .expect("config");
    temp
}

#[test]
fn stages_lists_every_family() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = dwh(temp.path(), &["stages"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["gender-gap", "enrollment", "labour", "observations"] {
        assert!(stdout.contains(name), "{name} missing from:\n{stdout}");
    }
}

#[test]
fn unknown_family_exits_with_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let output = dwh(temp.path(), &["stages", "istat"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown family"));
}

#[test]
fn run_all_refuses_to_overwrite_without_force() {
    let temp = workspace();
    let report = temp.path().join("report.json");
    let report_arg = report.to_string_lossy().into_owned();

    let first = dwh(
        temp.path(),
        &["run-all", "labour", "--config", "dwh.toml", "--report", &report_arg],
    );
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    assert!(temp.path().join("observation_import_full.csv").exists());
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(json["family"], "labour");
    assert_eq!(json["stages"].as_array().map(Vec::len), Some(4));

    let second = dwh(temp.path(), &["run-all", "labour", "--config", "dwh.toml"]);
    assert_eq!(second.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    let forced = dwh(temp.path(), &["run-all", "labour", "--config", "dwh.toml", "--force"]);
    assert!(forced.status.success());
}

#[test]
fn failing_stage_exits_with_failure() {
    let temp = workspace();
    fs::remove_file(temp.path().join("anno_export.csv")).expect("remove years");

    let report = temp.path().join("report.json");
    let report_arg = report.to_string_lossy().into_owned();

    let output = dwh(
        temp.path(),
        &["run", "labour", "observations", "--report", &report_arg],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("is unavailable"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("report")).expect("json");
    assert_eq!(json["family"], "labour");
    assert_eq!(json["failure"]["stage"], "observations");
    assert!(
        json["failure"]["message"]
            .as_str()
            .is_some_and(|message| message.contains("is unavailable"))
    );
}

#[test]
fn invalid_config_exits_before_writing() {
    let temp = workspace();
    fs::write(temp.path().join("dwh.toml"), "[labour]\nperiod_header_pattern = \"(\"\n")
        .expect("config");

    let output = dwh(temp.path(), &["run", "labour", "clean", "--config", "dwh.toml"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(!temp.path().join("estat_clean.csv").exists());
}
