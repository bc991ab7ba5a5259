//! CLI integration tests using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const HEADER: &str = "question_id,question_categorie,categorie_model,model A,token A,time A (sec),score A,cost A (€),electricity A (wh),co2 A (g),model B,token B,time B (sec),score B,cost B (€),electricity B (wh),co2 B (g)";

fn green_ai_report() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("green_ai_report").unwrap()
}

fn fixture(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("data.csv");
    fs::write(
        &path,
        format!(
            "{HEADER}\n\
             q1,general,chat,gpt-x,120,2,4,0.01,1,10,gpt-y,90,1,3,0.01,0.5,5\n\
             q2,coding,chat,gpt-x,110,2,4,0.01,1,10,gpt-y,abc,1,3,0.01,0.5,5\n"
        ),
    )
    .unwrap();
    path
}

#[test]
fn batch_run_writes_every_report() {
    let dir = TempDir::new().unwrap();
    let data = fixture(&dir);
    let out = dir.path().join("out");

    green_ai_report()
        .arg("--batch")
        .arg("--data")
        .arg(&data)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 comparison rows loaded, 4 observations"))
        .stdout(predicate::str::contains("1 numeric cells could not be parsed"))
        .stdout(predicate::str::contains("Report 3: General Model Comparison"))
        .stdout(predicate::str::contains("Raw Data (filtered)"))
        .stdout(predicate::str::contains("model_position"))
        .stdout(predicate::str::contains("\"leader\": \"gpt-y\""));

    for name in [
        "report1_model_category_detail.csv",
        "report2_category_comparison.csv",
        "report2_category_radar.csv",
        "report3_model_ranking.csv",
        "report4_question_comparison.csv",
        "report4_question_detail.csv",
        "green_ai_filtered_data.csv",
        "summary.json",
    ] {
        assert!(out.join(name).exists(), "missing {name}");
    }

    let export = fs::read_to_string(out.join("green_ai_filtered_data.csv")).unwrap();
    assert_eq!(export.lines().count(), 5);
    assert!(export.starts_with("question_id,question_category,model_category,model,tokens"));

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["overview"]["models"], 2);
    assert_eq!(summary["leader"]["rank"], 1);
}

#[test]
fn filters_narrow_the_export() {
    let dir = TempDir::new().unwrap();
    let data = fixture(&dir);
    let out = dir.path().join("out");

    green_ai_report()
        .args(["--batch", "--model", "gpt-x", "--question-category", "coding"])
        .arg("--data")
        .arg(&data)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Filtered data (1 rows)"));
}

#[test]
fn empty_selection_is_reported_not_fatal() {
    let dir = TempDir::new().unwrap();
    let data = fixture(&dir);
    let out = dir.path().join("out");

    green_ai_report()
        .args(["--batch", "--min-score", "5"])
        .arg("--data")
        .arg(&data)
        .arg("--output-dir")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("No observations match the current filters"))
        .stdout(predicate::str::contains("\"leader\": null"));
}

#[test]
fn missing_file_in_batch_mode_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    green_ai_report()
        .arg("--batch")
        .arg("--data")
        .arg(dir.path().join("absent.csv"))
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("data file not found"));
}

#[test]
fn min_score_out_of_range_is_rejected() {
    green_ai_report()
        .args(["--batch", "--min-score", "9"])
        .assert()
        .failure();
}

#[test]
fn interactive_menu_loads_and_reports() {
    let dir = TempDir::new().unwrap();
    let data = fixture(&dir);
    let out = dir.path().join("out");

    green_ai_report()
        .arg("--data")
        .arg(&data)
        .arg("--output-dir")
        .arg(&out)
        .write_stdin("2\nY\n1\n2\nN\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("No data loaded"))
        .stdout(predicate::str::contains("Report 4: Analysis by Question Type"))
        .stdout(predicate::str::contains("Exiting the program."));
}

#[test]
fn interactive_menu_survives_missing_file_and_eof() {
    let dir = TempDir::new().unwrap();
    green_ai_report()
        .arg("--data")
        .arg(dir.path().join("absent.csv"))
        .write_stdin("1\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Unable to load data"))
        .stdout(predicate::str::contains("Exiting the program."));
}

