use std::fs;

use ariane_xml::cli::{
    CliError, RunOptions, RunResult, notices, rows_to_json, rows_to_tsv, run_query,
};
use ariane_xml::executor::ExecutorConfig;
use tempfile::TempDir;

const DECLARATION: &str = r#"<?xml version="1.0"?>
<S10_G00_00>
  <S21_G00_30>
    <S21_G00_30_001>180017512345678</S21_G00_30_001>
    <S21_G00_30_002>DUPONT</S21_G00_30_002>
  </S21_G00_30>
  <S21_G00_30>
    <S21_G00_30_001>280017512345678</S21_G00_30_001>
    <S21_G00_30_002>MARTIN</S21_G00_30_002>
  </S21_G00_30>
</S10_G00_00>
"#;

const SCHEMA: &str = r#"{
  "version": "P25",
  "attributes": [
    {"full_name": "S10_G00_30_001"},
    {"full_name": "S21_G00_30_001", "description": "NIR"},
    {"full_name": "S21_G00_30_002", "description": "Nom de famille"}
  ]
}"#;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("dsn.xml"), DECLARATION).unwrap();
    fs::write(dir.path().join("schema.json"), SCHEMA).unwrap();
    dir
}

fn options(query: String) -> RunOptions {
    RunOptions {
        query,
        executor: ExecutorConfig::default(),
        ..Default::default()
    }
}

fn run(options: &RunOptions) -> Result<RunResult, CliError> {
    run_query(options, &|_, _, _| {})
}

#[test]
fn test_syntax_only_skips_execution() {
    let result = run(&RunOptions {
        syntax_only: true,
        ..options("SELECT a FROM '/does/not/exist'".to_string())
    })
    .unwrap();
    assert!(matches!(result, RunResult::SyntaxValid));
}

#[test]
fn test_syntax_error_is_reported() {
    let err = run(&options("SELECT FROM data".to_string())).unwrap_err();
    assert!(matches!(err, CliError::Parse(_)));
    assert!(err.to_string().starts_with("Parse error:"));
}

#[test]
fn test_missing_source_is_reported() {
    let err = run(&options("SELECT a FROM '/does/not/exist'".to_string())).unwrap_err();
    assert!(matches!(err, CliError::Execute(_)));
}

#[test]
fn test_full_names_without_schema() {
    let dir = workspace();
    let query = format!("SELECT S21_G00_30_002 FROM '{}'", dir.path().display());
    let RunResult::Rows { rows, stats, warnings, .. } = run(&options(query)).unwrap() else {
        panic!("expected rows");
    };
    assert_eq!(
        rows_to_json(&rows, false).unwrap(),
        r#"[{"S21_G00_30_002":"DUPONT"},{"S21_G00_30_002":"MARTIN"}]"#
    );
    assert_eq!(stats.total_files, 1);
    assert!(warnings.is_empty());
}

#[test]
fn test_schema_expands_short_codes() {
    let dir = workspace();
    let query = format!(
        "SELECT 30_002 FROM '{}' WHERE S21_G00_30.30_001 LIKE /^2/",
        dir.path().display()
    );
    let result = run(&RunOptions {
        schema: Some(dir.path().join("schema.json")),
        ..options(query)
    })
    .unwrap();

    let RunResult::Rows { rows, warnings, .. } = result else {
        panic!("expected rows");
    };
    assert_eq!(rows_to_tsv(&rows), "S21_G00_30_002\nMARTIN\n");
    assert!(warnings.is_empty());
}

#[test]
fn test_ambiguous_short_code_warns() {
    let dir = workspace();
    let query = format!("SELECT COUNT(30_001) FROM '{}'", dir.path().display());
    let result = run(&RunOptions {
        schema: Some(dir.path().join("schema.json")),
        ..options(query)
    })
    .unwrap();

    let RunResult::Rows { rows, warnings, .. } = result else {
        panic!("expected rows");
    };
    // first candidate in schema order is the S10 bloc, absent from the file
    assert_eq!(rows[0].get("COUNT(S10_G00_30_001)"), Some("0"));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].chosen, "S10_G00_30_001");
}

#[test]
fn test_notices_leave_shortcut_warnings_to_the_log() {
    let dir = workspace();
    fs::write(dir.path().join("broken.xml"), "<r>").unwrap();
    let query = format!("SELECT 30_001 FROM '{}'", dir.path().display());
    let result = run(&RunOptions {
        schema: Some(dir.path().join("schema.json")),
        ..options(query)
    })
    .unwrap();

    let RunResult::Rows { warnings, .. } = &result else {
        panic!("expected rows");
    };
    assert_eq!(warnings.len(), 1);
    assert_eq!(notices(&result), vec!["1 of 2 file(s) could not be processed"]);
}

#[test]
fn test_bad_schema_file() {
    let dir = workspace();
    fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    let err = run(&RunOptions {
        schema: Some(dir.path().join("broken.json")),
        ..options(format!("SELECT 30_002 FROM '{}'", dir.path().display()))
    })
    .unwrap_err();
    assert!(matches!(err, CliError::Schema(_)));
}

#[test]
fn test_diagnose_reports_ambiguous_fields() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.xml"),
        "<r><x><name>1</name></x><y><name>2</name></y></r>",
    )
    .unwrap();
    let result = run(&RunOptions {
        diagnose: true,
        ..options(format!("SELECT name FROM '{}'", dir.path().display()))
    })
    .unwrap();

    let RunResult::Rows { ambiguous, .. } = result else {
        panic!("expected rows");
    };
    assert_eq!(ambiguous.len(), 1);
    assert_eq!(ambiguous[0].field, "name");
}
