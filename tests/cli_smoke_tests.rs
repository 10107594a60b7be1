mod common;

use assert_cmd::Command;
use predicates::str::contains;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("budget_months_cli").unwrap();
    cmd.env("BUDGET_MONTHS_HOME", home).env("NO_COLOR", "1");
    cmd
}

#[test]
fn ensure_then_show_reads_the_saved_month() {
    let home = common::temp_dir();

    cli(&home)
        .args(["ensure", "2025-06"])
        .assert()
        .success()
        .stdout(contains("created month 2025-06"))
        .stdout(contains("Savings"))
        .stdout(contains("amounts in USD"));

    assert!(home
        .join("months")
        .join("default")
        .join("2025-06.json")
        .exists());

    cli(&home)
        .args(["show", "2025-06", "--json"])
        .assert()
        .success()
        .stdout(contains("\"totalBudgeted\""))
        .stdout(contains("Credit Card Payments"));
}

#[test]
fn rollover_closes_once() {
    let home = common::temp_dir();

    cli(&home)
        .args(["rollover", "2025-02"])
        .assert()
        .success()
        .stdout(contains("month 2025-02 closed"));

    cli(&home)
        .args(["rollover", "2025-02"])
        .assert()
        .failure()
        .stderr(contains("closed"));
}

#[test]
fn show_of_missing_month_warns_and_bad_input_fails() {
    let home = common::temp_dir();

    cli(&home)
        .args(["show", "2030-01"])
        .assert()
        .success()
        .stdout(contains("has not been created yet"));

    cli(&home)
        .args(["show", "2030-13"])
        .assert()
        .failure()
        .stderr(contains("2030-13"));
}

#[test]
fn version_prints_build_metadata() {
    let home = common::temp_dir();
    cli(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(contains("Budget Months"))
        .stdout(contains("Build hash"));
}
