use quizlock::attempt::{AttemptRecorder, AttemptStore};
use quizlock::attention::ManualAttentionSource;
use quizlock::history::SqliteAttemptStore;
use quizlock::proctor::ProctorMonitor;
use quizlock::quiz::QuizCatalog;
use quizlock::session::{QuizSession, SubmitReason};
use tempfile::tempdir;

/// Integration tests for recording attempts into the sqlite history and
/// reading them back through the catalog and export paths.

fn take_quiz(catalog: &QuizCatalog, quiz_id: &str, store: SqliteAttemptStore) {
    let monitor = ProctorMonitor::new(ManualAttentionSource::new());
    let mut session = QuizSession::open(catalog, quiz_id, "student-7", monitor).unwrap();
    session.start().unwrap();
    session.select_answer(0, 0).unwrap();

    let mut recorder = AttemptRecorder::new(store);
    session.submit(SubmitReason::Manual, &mut recorder).unwrap();
}

#[test]
fn attempts_persist_across_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("nested").join("attempts.db");
    let catalog = QuizCatalog::bundled().unwrap();

    {
        let store = SqliteAttemptStore::open(&db_path).unwrap();
        let monitor = ProctorMonitor::new(ManualAttentionSource::new());
        let mut session = QuizSession::open(&catalog, "1", "student-7", monitor).unwrap();
        session.start().unwrap();
        session.select_answer(0, 0).unwrap();
        session.select_answer(1, 1).unwrap();

        let mut recorder = AttemptRecorder::new(store);
        session.submit(SubmitReason::Manual, &mut recorder).unwrap();
    }

    let store = SqliteAttemptStore::open(&db_path).unwrap();
    let attempts = store.attempts_for("student-7").unwrap();
    assert_eq!(attempts.len(), 1);

    let attempt = &attempts[0];
    assert!(attempt.id.starts_with("attempt_"));
    assert_eq!(attempt.quiz_id, "1");
    assert_eq!(attempt.answers, vec![Some(0), Some(1)]);
    assert_eq!(attempt.score, 1);
    assert_eq!(attempt.max_score, 2);
    assert_eq!(attempt.percentage(), 50);
    assert_eq!(attempt.reason, SubmitReason::Manual);

    assert!(store.attempts_for("someone-else").unwrap().is_empty());
}

#[test]
fn attempted_quizzes_drop_out_of_available_list() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("attempts.db");
    let catalog = QuizCatalog::bundled().unwrap();

    let before: Vec<String> = catalog
        .available_for(None, &[])
        .iter()
        .map(|q| q.id.clone())
        .collect();
    assert!(before.contains(&"1".to_string()));
    // inactive quizzes are never offered
    assert!(!before.contains(&"signals-101".to_string()));

    let store = SqliteAttemptStore::open(&db_path).unwrap();
    take_quiz(&catalog, "1", store);

    let store = SqliteAttemptStore::open(&db_path).unwrap();
    let attempted = store.attempted_quiz_ids("student-7").unwrap();
    assert_eq!(attempted, vec!["1".to_string()]);

    let after: Vec<String> = catalog
        .available_for(None, &attempted)
        .iter()
        .map(|q| q.id.clone())
        .collect();
    assert!(!after.contains(&"1".to_string()));
    assert!(after.contains(&"rust-ownership".to_string()));
}

#[test]
fn subjects_and_subject_filter() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("attempts.db");
    let catalog = QuizCatalog::bundled().unwrap();

    take_quiz(&catalog, "1", SqliteAttemptStore::open(&db_path).unwrap());
    take_quiz(
        &catalog,
        "rust-ownership",
        SqliteAttemptStore::open(&db_path).unwrap(),
    );

    let store = SqliteAttemptStore::open(&db_path).unwrap();
    let subjects = store.subjects_for("student-7").unwrap();
    assert_eq!(subjects.len(), 2);

    let web = catalog.quizzes().iter().find(|q| q.id == "1").unwrap();
    let in_subject = store.attempts_in_subject("student-7", &web.subject).unwrap();
    assert_eq!(in_subject.len(), 1);
    assert_eq!(in_subject[0].quiz_id, "1");
    assert!(store
        .attempts_in_subject("student-7", "No Such Subject")
        .unwrap()
        .is_empty());
}

#[test]
fn export_writes_header_and_rows() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("attempts.db");
    let catalog = QuizCatalog::bundled().unwrap();
    take_quiz(&catalog, "1", SqliteAttemptStore::open(&db_path).unwrap());

    let store = SqliteAttemptStore::open(&db_path).unwrap();
    let mut out = Vec::new();
    let written = store.export_csv("student-7", &mut out).unwrap();
    assert_eq!(written, 1);

    let text = String::from_utf8(out).unwrap();
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("id,quiz_id,participant_id,subject,score,max_score,percentage,answered,reason,completed_at")
    );
    let row = lines.next().unwrap();
    assert!(row.contains(",1,student-7,"));
    assert!(row.contains(",manual,"));
    assert_eq!(lines.next(), None);
}
