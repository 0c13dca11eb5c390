use assert_cmd::Command;
use tempfile::{tempdir, TempDir};

/// Non-interactive entry points of the binary: these never need a TTY.

fn quizlock(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("quizlock").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("USER", "cli-student");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn list_shows_active_bundled_quizzes() {
    let home = tempdir().unwrap();
    let db = home.path().join("attempts.db");

    let out = stdout_of(quizlock(&home).arg("--list").arg("--db").arg(&db));

    assert!(out.contains("Web Development Basics"));
    assert!(out.contains("rust-ownership"));
    assert!(!out.contains("signals-101"));
}

#[test]
fn list_filters_by_department() {
    let home = tempdir().unwrap();
    let db = home.path().join("attempts.db");

    let out = stdout_of(
        quizlock(&home)
            .args(["--list", "--department", "Electronics", "--db"])
            .arg(&db),
    );

    // the only Electronics quiz is inactive
    assert!(out.contains("no quizzes available"));
}

#[test]
fn export_of_empty_history_writes_header() {
    let home = tempdir().unwrap();
    let db = home.path().join("attempts.db");
    let csv = home.path().join("out.csv");

    let out = stdout_of(quizlock(&home).arg("--db").arg(&db).arg("--export").arg(&csv));
    assert!(out.contains("exported 0 attempts"));
    assert!(csv.exists());
}

#[test]
fn unknown_quiz_is_reported() {
    let home = tempdir().unwrap();
    let db = home.path().join("attempts.db");

    let output = quizlock(&home)
        .args(["--quiz", "no-such-quiz", "--db"])
        .arg(&db)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("quiz 'no-such-quiz' not found"));
}

#[test]
fn inactive_quiz_is_refused() {
    let home = tempdir().unwrap();
    let db = home.path().join("attempts.db");

    let output = quizlock(&home)
        .args(["--quiz", "signals-101", "--db"])
        .arg(&db)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("is not active"));
}

/// Write `body` over the config file the binary reads and return its path.
fn write_config(home: &TempDir, body: &str) -> String {
    let out = stdout_of(quizlock(home).arg("--init-config"));
    let path = out.trim_start_matches("wrote ").trim().to_string();
    std::fs::write(&path, body).unwrap();
    path
}

fn list_stderr(home: &TempDir) -> String {
    let output = quizlock(home).arg("--list").output().unwrap();
    assert!(!output.status.success());
    String::from_utf8(output.stderr).unwrap()
}

#[test]
fn zero_max_warnings_is_rejected() {
    let home = tempdir().unwrap();
    write_config(&home, r#"{ "max_warnings": 0 }"#);

    assert!(list_stderr(&home).contains("max_warnings must be at least 1"));
}

#[test]
fn oversized_max_warnings_is_rejected() {
    let home = tempdir().unwrap();
    write_config(&home, r#"{ "max_warnings": 1000000 }"#);

    assert!(list_stderr(&home).contains("max_warnings must be at most 10"));
}

#[test]
fn max_warnings_flag_is_not_accepted() {
    let home = tempdir().unwrap();

    let output = quizlock(&home)
        .args(["--list", "--max-warnings", "1000"])
        .output()
        .unwrap();

    assert!(!output.status.success());
}

#[test]
fn init_config_writes_file() {
    let home = tempdir().unwrap();

    let out = stdout_of(quizlock(&home).args(["--init-config", "--participant", "ada"]));
    assert!(out.starts_with("wrote "));

    let path = out.trim_start_matches("wrote ").trim();
    let saved = std::fs::read_to_string(path).unwrap();
    assert!(saved.contains("\"participant_id\": \"ada\""));
}
