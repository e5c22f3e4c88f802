// src/engine/scorer.rs

use crate::{
    config::PASS_THRESHOLD_PERCENT,
    models::{attempt::AnswerSheet, exam::Question},
};

/// Result of grading one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreCard {
    pub raw_correct: usize,
    pub total_questions: usize,
    /// floor(raw_correct / total_questions * 100)
    pub percent: i32,
    pub passed: bool,
}

impl ScoreCard {
    pub fn incorrect(&self) -> usize {
        self.total_questions - self.raw_correct
    }
}

/// Grades `answers` against the answer key of `questions`.
///
/// Unanswered questions count as incorrect. An exam without questions scores 0
/// and fails. Integer arithmetic keeps the floor and the pass threshold exact.
pub fn score(questions: &[Question], answers: &AnswerSheet) -> ScoreCard {
    let total_questions = questions.len();

    if total_questions == 0 {
        return ScoreCard {
            raw_correct: 0,
            total_questions,
            percent: 0,
            passed: false,
        };
    }

    let raw_correct = questions
        .iter()
        .enumerate()
        .filter(|(idx, q)| answers.selected(*idx) == Some(q.correct_index))
        .count();

    let percent = (raw_correct * 100 / total_questions) as i32;
    let passed = raw_correct as i64 * 100 >= total_questions as i64 * PASS_THRESHOLD_PERCENT;

    ScoreCard {
        raw_correct,
        total_questions,
        percent,
        passed,
    }
}
