use serde::{Deserialize, Serialize};

use crate::quiz::Quiz;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub score: u32,
    pub max_score: u32,
}

impl Score {
    /// Whole-number percentage, rounded half away from zero.
    pub fn percentage(&self) -> u32 {
        crate::util::percentage(self.score, self.max_score)
    }
}

/// Sum the points of every question whose answer matches its correct option.
/// Unanswered slots never match. Slots beyond the question list are ignored.
pub fn score(quiz: &Quiz, answers: &[Option<usize>]) -> Score {
    let score = quiz
        .questions
        .iter()
        .zip(answers.iter().copied().chain(std::iter::repeat(None)))
        .filter(|(question, answer)| question.is_correct(*answer))
        .map(|(question, _)| question.points)
        .sum();

    Score {
        score,
        max_score: quiz.max_score(),
    }
}
