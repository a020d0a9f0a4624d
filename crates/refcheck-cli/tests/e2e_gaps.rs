//! E2E tests for `refcheck window` and `refcheck gaps`.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn refcheck_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("refcheck"));
    cmd.current_dir(dir);
    cmd.env("REFCHECK_LOG", "error");
    cmd.env_remove("FORMAT");
    cmd
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

fn form_with_gap() -> Value {
    json!({
        "globals": {},
        "OccupationReferences": [
            {
                "ReferenceTypeValueId": 1079,
                "OriginalApplicantReferenceId": 11,
                "StartDate": "2022-03-01",
                "CompanyName": "Acme Ltd"
            },
            {
                "ReferenceTypeValueId": 1077,
                "OriginalApplicantReferenceId": 12,
                "StartDate": "2015-09-01",
                "EndDate": "2021-12-31",
                "CompanyName": "Example State University"
            }
        ],
        "PersonalReferences": []
    })
}

fn run_json(dir: &Path, args: &[&str]) -> Value {
    let output = refcheck_cmd(dir).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "refcheck failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("valid JSON on stdout")
}

// ---------------------------------------------------------------------------
// window
// ---------------------------------------------------------------------------

#[test]
fn window_json_for_fixed_date() {
    let dir = TempDir::new().unwrap();
    let json = run_json(dir.path(), &["window", "--today", "2025-06-15", "--json"]);
    assert_eq!(json["start"], "2020-06-15");
    assert_eq!(json["end"], "2025-06-15");
    assert_eq!(json["years"], 5);
}

#[test]
fn window_honours_project_config() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join(".refcheck")).unwrap();
    std::fs::write(
        dir.path().join(".refcheck/config.toml"),
        "[coverage]\nyears = 3\n",
    )
    .unwrap();

    let json = run_json(dir.path(), &["window", "--today", "2025-06-15", "--json"]);
    assert_eq!(json["start"], "2022-06-15");
    assert_eq!(json["years"], 3);
}

#[test]
fn window_text_is_one_line() {
    let dir = TempDir::new().unwrap();
    refcheck_cmd(dir.path())
        .args(["--format", "text", "window", "--today", "2024-02-29"])
        .assert()
        .success()
        .stdout("2019-02-28 2024-02-29 1828\n");
}

// ---------------------------------------------------------------------------
// gaps
// ---------------------------------------------------------------------------

#[test]
fn gaps_reports_the_gap_between_periods() {
    let dir = TempDir::new().unwrap();
    let state = write_json(dir.path(), "form.json", &form_with_gap());
    let json = run_json(
        dir.path(),
        &["gaps", "--state", state.to_str().unwrap(), "--today", "2025-06-15", "--json"],
    );

    let occupations = json["occupations"].as_array().unwrap();
    assert_eq!(occupations.len(), 2);
    assert_eq!(occupations[0]["name"], "Acme Ltd");
    assert_eq!(occupations[0]["kind"], "employment");
    assert_eq!(occupations[0]["key"], "ref:11");
    assert_eq!(occupations[1]["kind"], "education");

    let gaps = json["gaps"].as_array().unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0]["start"], "2022-01-01");
    assert_eq!(gaps[0]["end"], "2022-02-28");
    assert_eq!(gaps[0]["days"], 59);
    assert_eq!(gaps[0]["position"]["kind"], "before");
    assert_eq!(gaps[0]["position"]["index"], 0);
}

#[test]
fn empty_form_has_one_full_window_gap() {
    let dir = TempDir::new().unwrap();
    let state = write_json(dir.path(), "form.json", &json!({}));
    let json = run_json(
        dir.path(),
        &["gaps", "--state", state.to_str().unwrap(), "--today", "2025-06-15", "--json"],
    );
    let gaps = json["gaps"].as_array().unwrap();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0]["start"], "2020-06-15");
    assert_eq!(gaps[0]["end"], "2025-06-15");
    assert_eq!(gaps[0]["position"]["kind"], "leading");
}

#[test]
fn fill_adds_gap_references_and_closes_every_gap() {
    let dir = TempDir::new().unwrap();
    let state = write_json(dir.path(), "form.json", &form_with_gap());
    let filled = run_json(
        dir.path(),
        &["gaps", "--state", state.to_str().unwrap(), "--today", "2025-06-15", "--fill"],
    );

    let occupations = filled["OccupationReferences"].as_array().unwrap();
    assert_eq!(occupations.len(), 3);
    let gap = &occupations[2];
    assert_eq!(gap["ReferenceTypeValueId"], 1075);
    assert_eq!(gap["StartDate"], "2022-01-01");
    assert_eq!(gap["EndDate"], "2022-02-28");
    assert_eq!(gap["__changed"], true);
    assert!(gap["__unsavedId"].as_u64().is_some());

    let refilled = write_json(dir.path(), "filled.json", &filled);
    let json = run_json(
        dir.path(),
        &["gaps", "--state", refilled.to_str().unwrap(), "--today", "2025-06-15", "--json"],
    );
    assert!(json["gaps"].as_array().unwrap().is_empty());
}

#[test]
fn malformed_state_fails_with_code() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("form.json");
    std::fs::write(&path, "{ not json").unwrap();

    refcheck_cmd(dir.path())
        .args(["gaps", "--state", path.to_str().unwrap(), "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E2001]"));
}

#[test]
fn unknown_reference_type_fails_with_json_error() {
    let dir = TempDir::new().unwrap();
    let state = write_json(
        dir.path(),
        "form.json",
        &json!({ "OccupationReferences": [
            { "ReferenceTypeValueId": 4242, "OriginalApplicantReferenceId": 1 }
        ]}),
    );

    let output = refcheck_cmd(dir.path())
        .args(["gaps", "--state", state.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["error_code"], "E3002");
    let message = err["error"]["message"].as_str().unwrap();
    assert!(message.starts_with("Unknown reference type: Invalid reference in"));
    assert!(message.contains("unknown reference type id 4242"));
}

#[test]
fn oversized_unsaved_handle_fails_with_its_own_code() {
    let dir = TempDir::new().unwrap();
    let state = write_json(
        dir.path(),
        "form.json",
        &json!({ "PersonalReferences": [
            { "ReferenceTypeValueId": null, "__unsavedId": 18_446_744_073_709_551_615_u64 }
        ]}),
    );

    refcheck_cmd(dir.path())
        .args(["gaps", "--state", state.to_str().unwrap(), "--fill", "--format", "text"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error[E3004]"));
}
