use std::time::Instant;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attempt::AttemptRecorder;
use crate::attention::AttentionSignal;
use crate::error::SessionError;
use crate::grading::{self, Score};
use crate::proctor::{ProctorMonitor, Violation, WarningNotice};
use crate::quiz::{Question, Quiz, QuizStore};
use crate::timer::{CountdownTimer, TimerEvent};

/// Lifecycle of one attempt. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    NotStarted,
    InProgress,
    Submitted,
}

/// Why a session was submitted. Does not affect scoring.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SubmitReason {
    Timeout,
    ProctorViolation,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// This call submitted the session and recorded the attempt
    Recorded { reason: SubmitReason, score: Score },
    /// The session was already submitted; nothing changed
    AlreadySubmitted,
}

/// Result of a submitted session, kept for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub reason: SubmitReason,
    pub score: Score,
    pub completed_at: DateTime<Local>,
    pub attempt_id: Option<String>,
}

/// State machine for one participant's timed, proctored attempt.
///
/// Timer ticks, attention signals and user actions all arrive as separate
/// calls on one thread, in no guaranteed order. `submit` is guarded by the
/// phase so exactly one attempt is recorded no matter which trigger wins.
#[derive(Debug)]
pub struct QuizSession {
    quiz: Quiz,
    participant_id: String,
    answers: Vec<Option<usize>>,
    current: usize,
    phase: Phase,
    timer: CountdownTimer,
    monitor: ProctorMonitor,
    outcome: Option<SessionOutcome>,
}

impl QuizSession {
    pub fn new(
        quiz: Quiz,
        participant_id: impl Into<String>,
        monitor: ProctorMonitor,
    ) -> Result<Self, SessionError> {
        quiz.validate()?;
        let answers = vec![None; quiz.question_count()];
        Ok(Self {
            quiz,
            participant_id: participant_id.into(),
            answers,
            current: 0,
            phase: Phase::NotStarted,
            timer: CountdownTimer::new(),
            monitor,
            outcome: None,
        })
    }

    /// Look the quiz up in `store` and build a session for it.
    pub fn open(
        store: &impl QuizStore,
        quiz_id: &str,
        participant_id: impl Into<String>,
        monitor: ProctorMonitor,
    ) -> Result<Self, SessionError> {
        let quiz = store
            .get_quiz_by_id(quiz_id)
            .ok_or_else(|| SessionError::QuizNotFound(quiz_id.to_string()))?;
        if !quiz.is_active {
            return Err(SessionError::QuizInactive(quiz_id.to_string()));
        }
        Self::new(quiz.clone(), participant_id, monitor)
    }

    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::NotStarted {
            return Err(SessionError::AlreadyStarted);
        }

        self.monitor.arm()?;
        self.timer.arm(self.quiz.time_limit_secs());
        self.phase = Phase::InProgress;
        info!(
            quiz = %self.quiz.id,
            participant = %self.participant_id,
            seconds = self.timer.remaining_seconds(),
            "quiz started"
        );
        Ok(())
    }

    /// Store an answer, replacing any earlier one for that question.
    /// Silently ignored once submitted.
    pub fn select_answer(&mut self, question: usize, option: usize) -> Result<(), SessionError> {
        match self.phase {
            Phase::Submitted => return Ok(()),
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::InProgress => {}
        }

        let count = self.quiz.question_count();
        let q = self
            .quiz
            .questions
            .get(question)
            .ok_or(SessionError::QuestionOutOfRange {
                index: question,
                count,
            })?;
        if option >= q.option_count() {
            return Err(SessionError::OptionOutOfRange {
                question,
                option,
                count: q.option_count(),
            });
        }

        self.answers[question] = Some(option);
        debug!(question, option, "answer selected");
        Ok(())
    }

    /// Answer the question currently on screen
    pub fn select_current(&mut self, option: usize) -> Result<(), SessionError> {
        self.select_answer(self.current, option)
    }

    /// Jump to a question, clamping into range.
    pub fn go_to_question(&mut self, index: isize) {
        let last = self.quiz.question_count().saturating_sub(1);
        self.current = index.clamp(0, last as isize) as usize;
    }

    pub fn next(&mut self) {
        if self.current + 1 < self.quiz.question_count() {
            self.current += 1;
        }
    }

    pub fn previous(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    /// Submit the attempt. Only the first call from `InProgress` has any
    /// effect; later calls report `AlreadySubmitted`.
    pub fn submit(
        &mut self,
        reason: SubmitReason,
        recorder: &mut AttemptRecorder,
    ) -> Result<SubmitOutcome, SessionError> {
        match self.phase {
            Phase::Submitted => {
                debug!(%reason, "submit ignored, already submitted");
                return Ok(SubmitOutcome::AlreadySubmitted);
            }
            Phase::NotStarted => return Err(SessionError::NotStarted),
            Phase::InProgress => {}
        }

        self.timer.disarm();
        self.monitor.disarm();

        let score = grading::score(&self.quiz, &self.answers);
        self.phase = Phase::Submitted;
        self.outcome = Some(SessionOutcome {
            reason,
            score,
            completed_at: Local::now(),
            attempt_id: None,
        });
        info!(
            quiz = %self.quiz.id,
            %reason,
            score = score.score,
            max_score = score.max_score,
            "quiz submitted"
        );

        let attempt_id = recorder.record(self, &self.participant_id)?;
        if let Some(outcome) = self.outcome.as_mut() {
            outcome.attempt_id = Some(attempt_id);
        }

        Ok(SubmitOutcome::Recorded { reason, score })
    }

    /// One-second cadence callback. Submits with `Timeout` on expiry.
    pub fn on_tick(
        &mut self,
        recorder: &mut AttemptRecorder,
    ) -> Result<Option<SubmitOutcome>, SessionError> {
        match self.timer.tick() {
            Some(TimerEvent::Expired) => self.submit(SubmitReason::Timeout, recorder).map(Some),
            Some(TimerEvent::Tick(_)) | None => Ok(None),
        }
    }

    /// Attention signal callback. Submits with `ProctorViolation` when the
    /// warning threshold is first reached.
    pub fn on_attention(
        &mut self,
        signal: AttentionSignal,
        now: Instant,
        recorder: &mut AttemptRecorder,
    ) -> Result<Option<Violation>, SessionError> {
        let violation = self.monitor.observe(signal, now);
        if violation.is_some_and(|v| v.threshold_reached) {
            self.submit(SubmitReason::ProctorViolation, recorder)?;
        }
        Ok(violation)
    }

    /// Let the warning notice clear once its delay has passed
    pub fn refresh(&mut self, now: Instant) {
        self.monitor.refresh_notice(now);
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.answers.len() - self.answered_count()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.quiz.questions[self.current]
    }

    pub fn current_answer(&self) -> Option<usize> {
        self.answers[self.current]
    }

    pub fn remaining_seconds(&self) -> u32 {
        match self.phase {
            Phase::NotStarted => self.quiz.time_limit_secs(),
            _ => self.timer.remaining_seconds(),
        }
    }

    pub fn warning_count(&self) -> u32 {
        self.monitor.warning_count()
    }

    pub fn max_warnings(&self) -> u32 {
        self.monitor.max_warnings()
    }

    pub fn exceeded_threshold(&self) -> bool {
        self.monitor.exceeded_threshold()
    }

    pub fn notice(&self) -> Option<&WarningNotice> {
        self.monitor.notice()
    }

    pub fn is_proctoring(&self) -> bool {
        self.monitor.is_armed()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_armed()
    }

    pub fn outcome(&self) -> Option<&SessionOutcome> {
        self.outcome.as_ref()
    }
}
