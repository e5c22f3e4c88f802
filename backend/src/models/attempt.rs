// src/models/attempt.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

use crate::error::AppError;

/// Sparse mapping from question index to the selected option index.
/// Serialized as a JSON object (`{"0": 2, "1": 1}`); missing keys are unanswered questions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(pub BTreeMap<usize, usize>);

impl AnswerSheet {
    pub fn selected(&self, question: usize) -> Option<usize> {
        self.0.get(&question).copied()
    }

    /// Rejects answers for questions the exam does not have, or options a question does not offer.
    pub fn validate_against(&self, questions: &[crate::models::exam::Question]) -> Result<(), AppError> {
        for (&index, &option) in &self.0 {
            let question = questions.get(index).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Answer given for question {} but the exam has {} questions",
                    index,
                    questions.len()
                ))
            })?;
            if option >= question.options.len() {
                return Err(AppError::BadRequest(format!(
                    "Option {} does not exist for question {}",
                    option, index
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(usize, usize)> for AnswerSheet {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        AnswerSheet(iter.into_iter().collect())
    }
}

/// Represents the 'attempts' table: one immutable ledger entry per scored submission.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptRecord {
    pub id: i64,
    pub student_id: i64,
    pub exam_id: i64,
    pub answers: Json<AnswerSheet>,
    /// Percentage, 0-100, rounded down.
    pub score: i32,
    pub passed: bool,
    /// 1-based and gap-free per (student, exam); never resets.
    pub attempt_number: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Ledger entry before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub student_id: i64,
    pub exam_id: i64,
    pub answers: AnswerSheet,
    pub score: i32,
    pub passed: bool,
    pub attempt_number: i32,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for submitting an exam attempt.
#[derive(Debug, Deserialize)]
pub struct SubmitExamRequest {
    /// User's answers map.
    /// Key: question index, Value: selected option index.
    pub answers: Option<AnswerSheet>,
}

/// Response returned after a successful submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub id: i64,
    pub score: i32,
    pub passed: bool,
    pub attempt_number: i32,
    pub correct_count: usize,
    pub total_questions: usize,
    pub message: String,
}

/// One row of a student's result history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub total_questions: usize,
    pub score: i32,
    pub passed: bool,
    pub attempt_number: i32,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Question-level breakdown of an attempt.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub text: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub correct_option: String,
    pub student_index: Option<usize>,
    pub student_option: Option<String>,
    pub is_correct: bool,
}

/// An attempt joined with its exam and reviewed question by question.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptReview {
    pub id: i64,
    pub exam_id: i64,
    pub exam_title: String,
    pub score: i32,
    pub passed: bool,
    pub attempt_number: i32,
    pub correct_count: usize,
    pub incorrect_count: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub questions: Vec<QuestionReview>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exam::Question;

    fn questions() -> Vec<Question> {
        vec![
            Question {
                text: "Q1".to_string(),
                options: vec!["A".to_string(), "B".to_string()],
                correct_index: 0,
            },
            Question {
                text: "Q2".to_string(),
                options: vec!["A".to_string(), "B".to_string(), "C".to_string()],
                correct_index: 2,
            },
        ]
    }

    #[test]
    fn answer_sheet_parses_string_keys() {
        let sheet: AnswerSheet = serde_json::from_str(r#"{"0": 1, "1": 2}"#).unwrap();
        assert_eq!(sheet.selected(0), Some(1));
        assert_eq!(sheet.selected(1), Some(2));
        assert_eq!(sheet.selected(2), None);
    }

    #[test]
    fn validate_rejects_unknown_question() {
        let sheet: AnswerSheet = [(5, 0)].into_iter().collect();
        assert!(matches!(
            sheet.validate_against(&questions()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn validate_rejects_unknown_option() {
        let sheet: AnswerSheet = [(0, 2)].into_iter().collect();
        assert!(sheet.validate_against(&questions()).is_err());

        let sheet: AnswerSheet = [(1, 2)].into_iter().collect();
        assert!(sheet.validate_against(&questions()).is_ok());
    }

    #[test]
    fn missing_answers_payload_is_none() {
        let req: SubmitExamRequest = serde_json::from_str("{}").unwrap();
        assert!(req.answers.is_none());
    }
}
