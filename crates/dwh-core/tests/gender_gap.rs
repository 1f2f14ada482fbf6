//! Gender-gap family end to end on a small extract.

use std::fs;
use std::path::Path;

use dwh_core::{PipelineConfig, PipelineError, StageError, run_all, run_stage};

const SOURCE: &str = "\
nome;regione;settore;men;women
Acme;Lombardia;C;10;5
Beta;Lazio;K;N.A.;7.5
KIKO SPA;Lombardia;C;1;1
Gamma;-;C;3;3
";

fn config(root: &Path) -> PipelineConfig {
    fs::write(root.join("DNF.csv"), SOURCE).expect("write source");
    let mut config = PipelineConfig::default();
    let family = &mut config.gender_gap;
    family.source.path = root.join("DNF.csv");
    family.output_dir = root.to_path_buf();
    family.entity_column = "nome".to_string();
    family.region_column = "regione".to_string();
    family.sector_column = "settore".to_string();
    family.metric_columns = vec!["men".to_string(), "women".to_string()];
    config
}

fn read(root: &Path, name: &str) -> String {
    fs::read_to_string(root.join(name)).expect("artifact")
}

#[test]
fn run_all_builds_dimensions_companies_and_facts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = config(temp.path());

    let report = run_all(&config, "gender-gap").expect("run");
    assert!(report.is_success(), "{:?}", report.failure);
    let stages: Vec<&str> = report.stages.iter().map(|s| s.stage.as_str()).collect();
    assert_eq!(stages, vec!["profile", "clean", "dimensions", "companies", "facts"]);

    assert_eq!(read(temp.path(), "anno_dnf_export.csv"), "id_anno,valore\n1,2019\n");
    assert_eq!(
        read(temp.path(), "regione_export.csv"),
        "id_regione,nome\n1,Lazio\n2,Lombardia\n"
    );
    assert_eq!(
        read(temp.path(), "ateco_export.csv"),
        "id_ateco,settore\n1,C\n2,K\n"
    );
    // Gamma has no region and keeps an empty foreign key
    assert_eq!(
        read(temp.path(), "aziende_export.csv"),
        "id_azienda,nome,cod_ateco,cod_regione\n1,Acme,1,2\n2,Beta,2,1\n3,Gamma,1,\n"
    );
    insta::assert_snapshot!(read(temp.path(), "gender_gap_dnf_filatrato.csv"), @r"
    id_report,nome,cod_azienda,valore,cod_anno
    1,men,1,10,1
    2,women,1,5,1
    3,women,2,7.5,1
    4,men,3,3,1
    5,women,3,3,1
    ");

    let facts = &report.stages[4];
    assert_eq!(facts.exclusions.get("excluded entity"), Some(&1));
    assert_eq!(facts.exclusions.get("absent value"), Some(&1));
    assert_eq!(facts.unresolved(), 0);

    let profile = report.stages[0].profile.as_ref().expect("profile");
    let region = profile
        .iter()
        .find(|column| column.column == "regione")
        .expect("regione profiled");
    assert_eq!(region.absent, 1);
}

#[test]
fn facts_without_companies_fail_before_writing() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = config(temp.path());

    let err = run_stage(&config, "dnf", "facts").expect_err("missing companies");
    match err {
        PipelineError::Stage {
            stage,
            source: StageError::InputUnavailable { artifact, .. },
            ..
        } => {
            assert_eq!(stage, "facts");
            assert_eq!(artifact, "companies");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!temp.path().join("gender_gap_dnf_filatrato.csv").exists());
}

#[test]
fn year_dimension_extends_an_existing_snapshot() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = config(temp.path());
    config.gender_gap.reference_year = 2021;
    fs::write(temp.path().join("anno_dnf_export.csv"), "id_anno,valore\n1,2019\n5,2020\n")
        .expect("snapshot");

    run_stage(&config, "gender-gap", "dimensions").expect("dimensions");
    assert_eq!(
        read(temp.path(), "anno_dnf_export.csv"),
        "id_anno,valore\n1,2019\n5,2020\n6,2021\n"
    );

    // a second run finds nothing new
    run_stage(&config, "gender-gap", "dimensions").expect("rerun");
    assert_eq!(
        read(temp.path(), "anno_dnf_export.csv"),
        "id_anno,valore\n1,2019\n5,2020\n6,2021\n"
    );
}

#[test]
fn drop_policy_removes_companies_without_region() {
    let temp = tempfile::tempdir().expect("tempdir");
    let mut config = config(temp.path());
    config.gender_gap.unresolved = dwh_transform::UnresolvedPolicy::Drop;

    run_stage(&config, "gender-gap", "dimensions").expect("dimensions");
    let report = run_stage(&config, "gender-gap", "companies").expect("companies");
    assert_eq!(report.exclusions.get("unresolved foreign key"), Some(&1));
    assert_eq!(
        read(temp.path(), "aziende_export.csv"),
        "id_azienda,nome,cod_ateco,cod_regione\n1,Acme,1,2\n2,Beta,2,1\n"
    );
}
