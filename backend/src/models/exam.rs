// src/models/exam.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

use crate::models::validate_not_blank;

/// A single multiple-choice question, stored inside the exam's JSON column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// The text content of the question.
    pub text: String,

    /// Ordered list of options (e.g., ["Option A", "Option B"]).
    pub options: Vec<String>,

    /// Index into `options` of the correct answer.
    pub correct_index: usize,
}

/// Represents the 'exams' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: i64,

    pub title: String,

    /// Subject the exam belongs to.
    pub category_id: i64,

    pub duration_minutes: i32,

    /// Stored as a JSON array in the database.
    /// `sqlx::types::Json` handles automatic serialization/deserialization.
    pub questions: Json<Vec<Question>>,

    /// Teacher who authored the exam.
    pub owner_id: i64,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for sending a question to a student (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub text: String,
    pub options: Vec<String>,
}

/// DTO for sending an exam to a student.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicExam {
    pub id: i64,
    pub title: String,
    pub category_id: i64,
    pub category: Option<String>,
    pub duration_minutes: i32,
    pub questions: Vec<PublicQuestion>,
    pub owner_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PublicExam {
    pub fn from_exam(exam: &Exam, category: Option<String>) -> Self {
        Self {
            id: exam.id,
            title: exam.title.clone(),
            category_id: exam.category_id,
            category,
            duration_minutes: exam.duration_minutes,
            questions: exam
                .questions
                .iter()
                .map(|q| PublicQuestion {
                    text: q.text.clone(),
                    options: q.options.clone(),
                })
                .collect(),
            owner_id: exam.owner_id,
            created_at: exam.created_at,
        }
    }
}

/// Catalogue entry for students: the public exam plus its attempt gate status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamListing {
    #[serde(flatten)]
    pub exam: PublicExam,
    pub attempts_used: usize,
    pub locked: bool,
    pub retry_after_minutes: i64,
}

/// Insert payload handed to the store.
#[derive(Debug, Clone)]
pub struct NewExam {
    pub title: String,
    pub category_id: i64,
    pub duration_minutes: i32,
    pub questions: Vec<Question>,
    pub owner_id: i64,
}

/// Partial update applied by the store; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ExamChanges {
    pub title: Option<String>,
    pub category_id: Option<i64>,
    pub duration_minutes: Option<i32>,
    pub questions: Option<Vec<Question>>,
}

/// DTO for creating a new exam.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExamRequest {
    #[validate(length(min = 1, max = 200), custom(function = validate_not_blank))]
    pub title: String,
    /// Required; checked by the handler so the message matches the API contract.
    pub category_id: Option<i64>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: i32,
    #[validate(custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

/// DTO for editing an exam. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExamRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub category_id: Option<i64>,
    #[validate(range(min = 1, max = 600))]
    pub duration_minutes: Option<i32>,
    pub questions: Option<Vec<Question>>,
}

/// Checks that an exam has at least one question and every answer key is in range.
pub fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    if questions.is_empty() {
        return Err(validator::ValidationError::new("questions_cannot_be_empty"));
    }
    for q in questions {
        if q.text.trim().is_empty() || q.text.len() > 2000 {
            return Err(validator::ValidationError::new("invalid_question_text"));
        }
        if q.options.len() < 2 {
            return Err(validator::ValidationError::new("at_least_two_options"));
        }
        if q.options.iter().any(|opt| opt.trim().is_empty() || opt.len() > 500) {
            return Err(validator::ValidationError::new("invalid_option"));
        }
        if q.correct_index >= q.options.len() {
            return Err(validator::ValidationError::new("correct_index_out_of_range"));
        }
    }
    Ok(())
}
