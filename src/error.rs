//! Error types for every fallible boundary of the crate.

use thiserror::Error;

/// Errors raised while loading or validating quiz definitions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz '{0}' has no questions")]
    NoQuestions(String),
    #[error("quiz '{0}' must have a time limit of at least one minute")]
    ZeroTimeLimit(String),
    #[error("question '{question}' needs at least two options, found {found}")]
    TooFewOptions { question: String, found: usize },
    #[error("question '{question}' marks option {index} correct but only has {options} options")]
    CorrectAnswerOutOfRange {
        question: String,
        index: usize,
        options: usize,
    },
    #[error("question '{0}' must be worth at least one point")]
    ZeroPoints(String),
    #[error("bundled quiz file {0} is not valid UTF-8")]
    NotUtf8(String),
    #[error("failed to parse quiz file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised by the attempt store backends.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("attempt store lock was poisoned; the attempt was not saved")]
    Poisoned,
    #[error("stored attempt {id} has an unreadable {field}")]
    Corrupt { id: String, field: &'static str },
}

/// Errors raised by `AttemptRecorder`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RecordError {
    #[error("attempts can only be recorded from a submitted session")]
    NotSubmitted,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors raised by `QuizSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz '{0}' not found")]
    QuizNotFound(String),
    #[error("quiz '{0}' is not active")]
    QuizInactive(String),
    #[error(transparent)]
    InvalidQuiz(#[from] QuizError),
    #[error("session already started")]
    AlreadyStarted,
    #[error("session has not started")]
    NotStarted,
    #[error("question {index} is out of range (quiz has {count} questions)")]
    QuestionOutOfRange { index: usize, count: usize },
    #[error("option {option} is out of range for question {question} ({count} options)")]
    OptionOutOfRange {
        question: usize,
        option: usize,
        count: usize,
    },
    #[error("failed to subscribe to attention signals: {0}")]
    Attention(#[from] std::io::Error),
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Errors raised while reading or writing the configuration file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("max_warnings must be at least 1")]
    ZeroMaxWarnings,
    #[error("max_warnings must be at most {limit}, got {value}")]
    MaxWarningsTooHigh { value: u32, limit: u32 },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
