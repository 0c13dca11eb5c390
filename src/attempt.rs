use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{RecordError, StoreError};
use crate::session::{Phase, QuizSession, SubmitReason};

/// One participant's completed run through a quiz
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: String,
    pub quiz_id: String,
    pub participant_id: String,
    /// One slot per question; `None` for unanswered
    pub answers: Vec<Option<usize>>,
    pub score: u32,
    pub max_score: u32,
    pub completed_at: DateTime<Local>,
    pub subject: String,
    pub reason: SubmitReason,
}

impl AttemptRecord {
    pub fn percentage(&self) -> u32 {
        crate::util::percentage(self.score, self.max_score)
    }
}

/// Destination for finished attempts
pub trait AttemptStore {
    fn add_attempt(&mut self, record: AttemptRecord) -> Result<(), StoreError>;

    /// Attempts by one participant, newest first
    fn attempts_for(&self, participant_id: &str) -> Result<Vec<AttemptRecord>, StoreError>;

    /// Distinct subjects across the participant's attempts, sorted
    fn subjects_for(&self, participant_id: &str) -> Result<Vec<String>, StoreError>;

    /// Participant attempts in one subject, newest first
    fn attempts_in_subject(
        &self,
        participant_id: &str,
        subject: &str,
    ) -> Result<Vec<AttemptRecord>, StoreError>;
}

/// Builds attempt records from submitted sessions and hands them to a store
pub struct AttemptRecorder {
    store: Box<dyn AttemptStore>,
}

impl AttemptRecorder {
    pub fn new(store: impl AttemptStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Record the attempt of a submitted session. Returns the new attempt id.
    pub fn record(
        &mut self,
        session: &QuizSession,
        participant_id: &str,
    ) -> Result<String, RecordError> {
        let outcome = match (session.phase(), session.outcome()) {
            (Phase::Submitted, Some(outcome)) => outcome,
            _ => return Err(RecordError::NotSubmitted),
        };

        let quiz = session.quiz();
        let record = AttemptRecord {
            id: format!("attempt_{}", outcome.completed_at.timestamp_millis()),
            quiz_id: quiz.id.clone(),
            participant_id: participant_id.to_string(),
            answers: session.answers().to_vec(),
            score: outcome.score.score,
            max_score: outcome.score.max_score,
            completed_at: outcome.completed_at,
            subject: quiz.subject.clone(),
            reason: outcome.reason,
        };
        let id = record.id.clone();

        self.store.add_attempt(record)?;
        info!(attempt = %id, quiz = %quiz.id, participant = participant_id, "attempt recorded");
        Ok(id)
    }

    pub fn store(&self) -> &dyn AttemptStore {
        self.store.as_ref()
    }
}

/// Attempt store kept in memory. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAttemptStore {
    records: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record. Records pushed before a poisoning panic are kept.
    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn locked(&self) -> Result<MutexGuard<'_, Vec<AttemptRecord>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl AttemptStore for InMemoryAttemptStore {
    fn add_attempt(&mut self, record: AttemptRecord) -> Result<(), StoreError> {
        self.locked()?.push(record);
        Ok(())
    }

    fn attempts_for(&self, participant_id: &str) -> Result<Vec<AttemptRecord>, StoreError> {
        let attempts = self
            .locked()?
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .sorted_by(|a, b| b.completed_at.cmp(&a.completed_at))
            .collect();
        Ok(attempts)
    }

    fn subjects_for(&self, participant_id: &str) -> Result<Vec<String>, StoreError> {
        let subjects = self
            .locked()?
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .map(|r| r.subject.clone())
            .unique()
            .sorted()
            .collect();
        Ok(subjects)
    }

    fn attempts_in_subject(
        &self,
        participant_id: &str,
        subject: &str,
    ) -> Result<Vec<AttemptRecord>, StoreError> {
        Ok(self
            .attempts_for(participant_id)?
            .into_iter()
            .filter(|r| r.subject == subject)
            .collect())
    }
}
