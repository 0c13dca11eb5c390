use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::attempt::{AttemptRecord, AttemptStore};
use crate::error::StoreError;
use crate::session::SubmitReason;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS attempts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL,
        quiz_id TEXT NOT NULL,
        participant_id TEXT NOT NULL,
        answers TEXT NOT NULL,
        score INTEGER NOT NULL,
        max_score INTEGER NOT NULL,
        completed_at TEXT NOT NULL,
        subject TEXT NOT NULL,
        reason TEXT NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_attempts_participant ON attempts(participant_id);
    CREATE INDEX IF NOT EXISTS idx_attempts_completed_at ON attempts(completed_at);
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, quiz_id, participant_id, answers, score, max_score, completed_at, subject, reason FROM attempts";

/// Attempt history persisted in SQLite
#[derive(Debug)]
pub struct SqliteAttemptStore {
    conn: Connection,
}

/// One attempt as written to a CSV export
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    quiz_id: &'a str,
    participant_id: &'a str,
    subject: &'a str,
    score: u32,
    max_score: u32,
    percentage: u32,
    answered: usize,
    reason: String,
    completed_at: String,
}

impl SqliteAttemptStore {
    /// Open (or create) the database file, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Ids of every quiz the participant has attempted
    pub fn attempted_quiz_ids(&self, participant_id: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT quiz_id FROM attempts WHERE participant_id = ?1 ORDER BY quiz_id",
        )?;
        let ids = stmt
            .query_map([participant_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Write the participant's attempts as CSV, newest first.
    pub fn export_csv<W: Write>(&self, participant_id: &str, out: W) -> Result<usize, StoreError> {
        let attempts = self.attempts_for(participant_id)?;
        let mut writer = csv::Writer::from_writer(out);
        for attempt in &attempts {
            writer.serialize(CsvRow {
                id: &attempt.id,
                quiz_id: &attempt.quiz_id,
                participant_id: &attempt.participant_id,
                subject: &attempt.subject,
                score: attempt.score,
                max_score: attempt.max_score,
                percentage: attempt.percentage(),
                answered: attempt.answers.iter().filter(|a| a.is_some()).count(),
                reason: attempt.reason.to_string(),
                completed_at: attempt.completed_at.to_rfc3339(),
            })?;
        }
        writer.flush()?;
        Ok(attempts.len())
    }
}

impl AttemptStore for SqliteAttemptStore {
    fn add_attempt(&mut self, record: AttemptRecord) -> Result<(), StoreError> {
        self.conn.execute(
            r#"
            INSERT INTO attempts
            (id, quiz_id, participant_id, answers, score, max_score, completed_at, subject, reason)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.quiz_id,
                record.participant_id,
                serde_json::to_string(&record.answers)?,
                record.score,
                record.max_score,
                record.completed_at.to_rfc3339(),
                record.subject,
                record.reason.to_string(),
            ],
        )?;
        Ok(())
    }

    fn attempts_for(&self, participant_id: &str) -> Result<Vec<AttemptRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE participant_id = ?1 ORDER BY completed_at DESC, seq DESC"
        ))?;
        let raw = stmt
            .query_map([participant_id], RawAttempt::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawAttempt::into_record).collect()
    }

    fn subjects_for(&self, participant_id: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT subject FROM attempts WHERE participant_id = ?1 ORDER BY subject",
        )?;
        let subjects = stmt
            .query_map([participant_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(subjects)
    }

    fn attempts_in_subject(
        &self,
        participant_id: &str,
        subject: &str,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE participant_id = ?1 AND subject = ?2 ORDER BY completed_at DESC, seq DESC"
        ))?;
        let raw = stmt
            .query_map([participant_id, subject], RawAttempt::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawAttempt::into_record).collect()
    }
}

/// Row as stored, before the text columns are decoded
struct RawAttempt {
    id: String,
    quiz_id: String,
    participant_id: String,
    answers: String,
    score: u32,
    max_score: u32,
    completed_at: String,
    subject: String,
    reason: String,
}

impl RawAttempt {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            quiz_id: row.get(1)?,
            participant_id: row.get(2)?,
            answers: row.get(3)?,
            score: row.get(4)?,
            max_score: row.get(5)?,
            completed_at: row.get(6)?,
            subject: row.get(7)?,
            reason: row.get(8)?,
        })
    }

    fn into_record(self) -> Result<AttemptRecord, StoreError> {
        let completed_at = DateTime::parse_from_rfc3339(&self.completed_at)
            .map_err(|_| StoreError::Corrupt {
                id: self.id.clone(),
                field: "completed_at",
            })?
            .with_timezone(&Local);
        let reason = SubmitReason::from_str(&self.reason).map_err(|_| StoreError::Corrupt {
            id: self.id.clone(),
            field: "reason",
        })?;

        Ok(AttemptRecord {
            answers: serde_json::from_str(&self.answers)?,
            id: self.id,
            quiz_id: self.quiz_id,
            participant_id: self.participant_id,
            score: self.score,
            max_score: self.max_score,
            completed_at,
            subject: self.subject,
            reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;
    use tempfile::tempdir;

    fn record(id: &str, participant: &str, subject: &str, minutes_ago: i64) -> AttemptRecord {
        AttemptRecord {
            id: id.to_string(),
            quiz_id: format!("quiz-{id}"),
            participant_id: participant.to_string(),
            answers: vec![Some(0), None, Some(2)],
            score: 2,
            max_score: 3,
            completed_at: Local::now() - Duration::minutes(minutes_ago),
            subject: subject.to_string(),
            reason: SubmitReason::Timeout,
        }
    }

    #[test]
    fn add_and_read_back_attempt() {
        let mut db = SqliteAttemptStore::open_in_memory().unwrap();
        let original = record("a1", "s1", "Web Development", 0);

        db.add_attempt(original.clone()).unwrap();

        let attempts = db.attempts_for("s1").unwrap();
        assert_eq!(attempts.len(), 1);
        let loaded = &attempts[0];
        assert_eq!(loaded.answers, vec![Some(0), None, Some(2)]);
        assert_eq!(loaded.reason, SubmitReason::Timeout);
        assert_eq!(loaded.score, 2);
        assert_eq!(loaded.completed_at.timestamp(), original.completed_at.timestamp());
    }

    #[test]
    fn attempts_are_newest_first_and_per_participant() {
        let mut db = SqliteAttemptStore::open_in_memory().unwrap();
        db.add_attempt(record("old", "s1", "Math", 60)).unwrap();
        db.add_attempt(record("new", "s1", "Math", 1)).unwrap();
        db.add_attempt(record("other", "s2", "Math", 5)).unwrap();

        let ids: Vec<_> = db
            .attempts_for("s1")
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn attempts_sharing_an_id_are_both_kept() {
        // ids are millisecond stamps, two quick submits may collide
        let mut db = SqliteAttemptStore::open_in_memory().unwrap();
        db.add_attempt(record("same", "s1", "Math", 0)).unwrap();
        db.add_attempt(record("same", "s1", "Physics", 0)).unwrap();

        assert_eq!(db.attempts_for("s1").unwrap().len(), 2);
    }

    #[test]
    fn subjects_and_subject_filter() {
        let mut db = SqliteAttemptStore::open_in_memory().unwrap();
        db.add_attempt(record("a", "s1", "Physics", 3)).unwrap();
        db.add_attempt(record("b", "s1", "Chemistry", 2)).unwrap();
        db.add_attempt(record("c", "s1", "Physics", 1)).unwrap();

        assert_eq!(db.subjects_for("s1").unwrap(), vec!["Chemistry", "Physics"]);
        let physics = db.attempts_in_subject("s1", "Physics").unwrap();
        assert_eq!(physics.len(), 2);
        assert_eq!(physics[0].id, "c");
        assert_eq!(
            db.attempted_quiz_ids("s1").unwrap(),
            vec!["quiz-a", "quiz-b", "quiz-c"]
        );
    }

    #[test]
    fn export_csv_writes_header_and_rows() {
        let mut db = SqliteAttemptStore::open_in_memory().unwrap();
        db.add_attempt(record("a", "s1", "Physics", 0)).unwrap();

        let mut out = Vec::new();
        let written = db.export_csv("s1", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(written, 1);
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,quiz_id,participant_id,subject,score,max_score,percentage,answered,reason,completed_at")
        );
        assert!(lines.next().unwrap().starts_with("a,quiz-a,s1,Physics,2,3,67,2,timeout,"));
    }

    #[test]
    fn file_database_persists_between_opens() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("attempts.db");

        {
            let mut db = SqliteAttemptStore::open(&path).unwrap();
            db.add_attempt(record("a", "s1", "Physics", 0)).unwrap();
        }

        let db = SqliteAttemptStore::open(&path).unwrap();
        assert_eq!(db.attempts_for("s1").unwrap().len(), 1);
        assert_eq!(db.subjects_for("s1").unwrap(), vec!["Physics".to_string()]);
    }

    #[test]
    fn corrupt_reason_is_reported() {
        let db = SqliteAttemptStore::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO attempts (id, quiz_id, participant_id, answers, score, max_score, completed_at, subject, reason)
                 VALUES ('x', 'q', 's1', '[]', 0, 1, '2025-01-01T00:00:00+00:00', 'Math', 'bogus')",
                [],
            )
            .unwrap();

        assert_matches!(
            db.attempts_for("s1"),
            Err(StoreError::Corrupt { field: "reason", .. })
        );
    }
}
