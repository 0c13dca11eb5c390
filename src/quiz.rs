use chrono::{DateTime, Utc};
use include_dir::{include_dir, Dir};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::QuizError;

static QUIZ_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/quizzes");

/// A single multiple-choice question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub options: Vec<String>,
    /// 0-based index into `options`
    pub correct_answer: usize,
    pub points: u32,
}

impl Question {
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    pub fn is_correct(&self, answer: Option<usize>) -> bool {
        answer == Some(self.correct_answer)
    }
}

/// A timed quiz as authored by faculty. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub subject: String,
    pub department: String,
    pub faculty_id: String,
    pub time_limit_minutes: u32,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Quiz {
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    pub fn max_score(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// Check the invariants a session relies on.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::NoQuestions(self.id.clone()));
        }
        if self.time_limit_minutes == 0 {
            return Err(QuizError::ZeroTimeLimit(self.id.clone()));
        }
        for q in &self.questions {
            if q.options.len() < 2 {
                return Err(QuizError::TooFewOptions {
                    question: q.id.clone(),
                    found: q.options.len(),
                });
            }
            if q.correct_answer >= q.options.len() {
                return Err(QuizError::CorrectAnswerOutOfRange {
                    question: q.id.clone(),
                    index: q.correct_answer,
                    options: q.options.len(),
                });
            }
            if q.points == 0 {
                return Err(QuizError::ZeroPoints(q.id.clone()));
            }
        }
        Ok(())
    }
}

/// Read access to quiz definitions owned by someone else
pub trait QuizStore {
    fn get_quiz_by_id(&self, id: &str) -> Option<&Quiz>;
}

/// In-memory collection of quizzes, seeded from the bundled definitions
#[derive(Debug, Clone, Default)]
pub struct QuizCatalog {
    quizzes: Vec<Quiz>,
}

impl QuizCatalog {
    pub fn new(quizzes: Vec<Quiz>) -> Self {
        Self { quizzes }
    }

    /// Quizzes compiled into the binary.
    pub fn bundled() -> Result<Self, QuizError> {
        let mut quizzes = Vec::new();
        for file in QUIZ_DIR
            .files()
            .filter(|f| f.path().extension().is_some_and(|ext| ext == "json"))
            .sorted_by(|a, b| a.path().cmp(b.path()))
        {
            let path = file.path().display().to_string();
            let contents = file
                .contents_utf8()
                .ok_or_else(|| QuizError::NotUtf8(path.clone()))?;
            quizzes.push(parse_quiz(contents, &path)?);
        }
        Ok(Self { quizzes })
    }

    /// Bundled quizzes, with any `*.json` found in `dir` added on top.
    /// A quiz on disk replaces a bundled one with the same id.
    pub fn load(dir: Option<&Path>) -> Result<Self, QuizError> {
        let mut catalog = Self::bundled()?;
        if let Some(dir) = dir {
            catalog.merge_dir(dir)?;
        }
        Ok(catalog)
    }

    pub fn merge_dir(&mut self, dir: &Path) -> Result<(), QuizError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            let contents = fs::read_to_string(&path)?;
            let quiz = parse_quiz(&contents, &path.display().to_string())?;
            self.insert(quiz);
        }
        Ok(())
    }

    pub fn insert(&mut self, quiz: Quiz) {
        match self.quizzes.iter_mut().find(|q| q.id == quiz.id) {
            Some(existing) => *existing = quiz,
            None => self.quizzes.push(quiz),
        }
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn department_quizzes(&self, department: &str) -> Vec<&Quiz> {
        self.quizzes
            .iter()
            .filter(|q| q.department == department)
            .collect()
    }

    pub fn faculty_quizzes(&self, faculty_id: &str) -> Vec<&Quiz> {
        self.quizzes
            .iter()
            .filter(|q| q.faculty_id == faculty_id)
            .collect()
    }

    /// Active quizzes the participant may still take: same department (when
    /// one is given) and not already attempted.
    pub fn available_for(&self, department: Option<&str>, attempted: &[String]) -> Vec<&Quiz> {
        self.quizzes
            .iter()
            .filter(|q| q.is_active)
            .filter(|q| department.map_or(true, |d| q.department == d))
            .filter(|q| !attempted.contains(&q.id))
            .collect()
    }
}

impl QuizStore for QuizCatalog {
    fn get_quiz_by_id(&self, id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.id == id)
    }
}

fn parse_quiz(contents: &str, path: &str) -> Result<Quiz, QuizError> {
    let quiz: Quiz = serde_json::from_str(contents).map_err(|source| QuizError::Parse {
        path: path.to_string(),
        source,
    })?;
    quiz.validate()?;
    Ok(quiz)
}
