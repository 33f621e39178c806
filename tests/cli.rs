use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const HEADER: &str = "BIOGUIDE_ID,OFFICE,QUARTER,PROGRAM,CATEGORY,SORT SEQUENCE,DATE,START DATE,\
END DATE,TRANSCODE,RECORDID,PAYEE,PURPOSE,AMOUNT,YEAR";

fn detail_line(record_id: &str, amount: &str, quarter: &str) -> String {
    format!(
        "A000374,HON. RALPH LEE ABRAHAM,{quarter},OFFICIAL EXPENSES OF MEMBERS,TRAVEL,DETAIL,\
07/12/2016,07/01/2016,,AP,{record_id},AMERICAN EXPRESS,AIRFARE,{amount},2016"
    )
}

fn write_csv(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut content = format!("{HEADER}\n");
    for line in lines {
        content.push_str(line);
        content.push('\n');
    }
    std::fs::write(&path, content).unwrap();
    path
}

fn expenses(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("expenses").unwrap();
    cmd.env("HOME", home).env("RUST_LOG", "expenses=warn");
    cmd
}

fn load(home: &Path, input: &Path, extra: &[&str]) -> assert_cmd::assert::Assert {
    expenses(home)
        .arg("load")
        .arg("--input")
        .arg(input)
        .args(["--date-format", "mdy"])
        .args(extra)
        .assert()
}

#[test]
fn load_well_formed_file_exits_zero() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "detail.csv", &[
        detail_line(" 1 ", "10.00", "3"),
        detail_line("2", "20.00", "3"),
        detail_line("3", "30.00", "3"),
    ]);
    load(home.path(), &csv, &[])
        .success()
        .stdout(predicate::str::contains("3 stored, 0 failed"));

    expenses(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Details:     3"));
}

#[test]
fn row_failures_are_reported_but_not_fatal() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "detail.csv", &[
        detail_line("1", "10.00", "3"),
        detail_line("abc", "20.00", "3"),
        detail_line("3", "30.00", "9"),
        detail_line("4", "40.00", "3"),
    ]);
    load(home.path(), &csv, &[])
        .success()
        .stdout(predicate::str::contains("2 stored, 2 failed"))
        .stdout(predicate::str::contains("record id"))
        .stdout(predicate::str::contains("quarter"));
}

#[test]
fn second_load_reports_duplicate_record_ids() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "detail.csv", &[
        detail_line("1", "10.00", "1"),
        detail_line("2", "20.00", "1"),
        detail_line("3", "30.00", "1"),
    ]);
    load(home.path(), &csv, &[]).success();
    load(home.path(), &csv, &[])
        .success()
        .stdout(predicate::str::contains("0 stored, 3 failed"))
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn all_or_nothing_rollback_exits_two() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "detail.csv", &[
        detail_line("1", "10.00", "2"),
        detail_line("2", "not-money", "2"),
        detail_line("3", "30.00", "2"),
    ]);
    load(home.path(), &csv, &["--all-or-nothing"])
        .code(2)
        .stdout(predicate::str::contains("0 stored, 1 failed"))
        .stdout(predicate::str::contains("rolled back"));

    expenses(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Details:     0"));
}

#[test]
fn missing_header_column_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    let path = home.path().join("bad.csv");
    std::fs::write(&path, "BIOGUIDE_ID,OFFICE\nA000374,HON. X\n").unwrap();
    load(home.path(), &path, &[])
        .code(1)
        .stderr(predicate::str::contains("RECORDID"));
}

#[test]
fn unreadable_input_is_fatal() {
    let home = tempfile::tempdir().unwrap();
    load(home.path(), &home.path().join("missing.csv"), &[])
        .code(1)
        .stderr(predicate::str::contains("Cannot open"));
}

#[test]
fn date_format_is_required() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "detail.csv", &[detail_line("1", "10.00", "1")]);
    expenses(home.path())
        .arg("load")
        .arg("--input")
        .arg(&csv)
        .assert()
        .code(1);
}

#[test]
fn currency_flags_are_opt_in() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "detail.csv", &[detail_line("1", "\"$1,250.00\"", "1")]);
    load(home.path(), &csv, &[])
        .success()
        .stdout(predicate::str::contains("0 stored, 1 failed"));
    load(home.path(), &csv, &["--strip-currency-symbol", "--strip-thousands-separator"])
        .success()
        .stdout(predicate::str::contains("1 stored, 0 failed"));

    expenses(home.path())
        .args(["details", "--search", "american"])
        .assert()
        .success()
        .stdout(predicate::str::contains("$1,250.00"));
}

#[test]
fn history_lists_each_run() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "q3.csv", &[detail_line("1", "10.00", "3")]);
    load(home.path(), &csv, &[]).success();
    expenses(home.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("q3.csv"));
}

#[test]
fn categories_add_and_list() {
    let home = tempfile::tempdir().unwrap();
    expenses(home.path())
        .args(["categories", "add", "FRANKED MAIL SPECIAL"])
        .assert()
        .success();
    expenses(home.path())
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("FRANKED MAIL SPECIAL"));
    expenses(home.path())
        .args(["categories", "add", "TRAVEL"])
        .assert()
        .code(1);
}

#[test]
fn unknown_summary_is_an_error() {
    let home = tempfile::tempdir().unwrap();
    expenses(home.path())
        .args(["summary", "42"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No summary with ID 42"));
}

#[test]
fn summaries_lists_and_filters() {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");
    expenses(home.path())
        .args(["init", "--data-dir"])
        .arg(&data)
        .assert()
        .success();

    let conn = rusqlite::Connection::open(data.join("expenses.db")).unwrap();
    for (office, program, category) in [
        ("HON. RALPH LEE ABRAHAM", "OFFICIAL EXPENSES OF MEMBERS", "TRAVEL"),
        ("OFFICE OF THE CLERK", "CLERK OF THE HOUSE", "SUPPLIES AND MATERIALS"),
    ] {
        conn.execute(
            "INSERT INTO summaries (bioguide_id, office, program, category, year_to_date, amount, year, quarter) \
             VALUES ('A000374', ?1, ?2, ?3, '4000.00', '1234.50', 2016, 3)",
            rusqlite::params![office, program, category],
        )
        .unwrap();
    }
    drop(conn);

    expenses(home.path())
        .arg("summaries")
        .assert()
        .success()
        .stdout(predicate::str::contains("HON. RALPH LEE ABRAHAM"))
        .stdout(predicate::str::contains("OFFICE OF THE CLERK"))
        .stdout(predicate::str::contains("$1,234.50"));

    expenses(home.path())
        .args(["summaries", "--search", "clerk"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OFFICE OF THE CLERK"))
        .stdout(predicate::str::contains("HON. RALPH LEE ABRAHAM").not());
}

#[test]
fn load_help_describes_exit_codes() {
    let home = tempfile::tempdir().unwrap();
    expenses(home.path())
        .args(["load", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exits 0 when the run completes"));
}
