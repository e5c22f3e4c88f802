// src/store/mod.rs

//! Persistence seam for users, subjects, exams and the attempt ledger.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptRecord, NewAttempt},
        category::Category,
        exam::{Exam, ExamChanges, NewExam},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Stored answers are option indices, so an attempted exam keeps its questions.
pub(crate) const QUESTIONS_FROZEN: &str =
    "Questions cannot be changed after students have attempted this exam";

/// Ordering of ledger reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrder {
    NewestFirst,
    OldestFirst,
}

/// Storage backend used by the engine and handlers.
///
/// Ledger entries are append-only: there is no update or delete for attempts.
/// `record_attempt` must reject a second entry with the same
/// (student, exam, attempt number) with `AppError::Conflict`.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn create_user(&self, new: NewUser) -> Result<User, AppError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;

    // Categories
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;
    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError>;
    /// Returns the category with this name, creating it if needed.
    async fn ensure_category(&self, name: &str) -> Result<Category, AppError>;

    // Exams (soft-deleted exams are invisible to every read)
    async fn create_exam(&self, new: NewExam) -> Result<Exam, AppError>;
    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError>;
    async fn list_exams(&self) -> Result<Vec<Exam>, AppError>;
    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, AppError>;
    async fn exams_by_ids(&self, ids: &[i64]) -> Result<Vec<Exam>, AppError>;
    /// Applies `changes`. A change to `questions` is refused with `AppError::Conflict`
    /// once any attempt references the exam, checked in the same step as the write.
    async fn update_exam(&self, id: i64, changes: ExamChanges) -> Result<Exam, AppError>;
    async fn delete_exam(&self, id: i64) -> Result<(), AppError>;

    // Attempt ledger
    async fn record_attempt(&self, new: NewAttempt) -> Result<AttemptRecord, AppError>;
    async fn get_attempt(&self, id: i64) -> Result<AttemptRecord, AppError>;
    async fn list_attempts(
        &self,
        student_id: i64,
        exam_id: Option<i64>,
        order: LedgerOrder,
    ) -> Result<Vec<AttemptRecord>, AppError>;
    /// Every attempt referencing one of `exam_ids`, newest first.
    async fn attempts_for_exams(&self, exam_ids: &[i64]) -> Result<Vec<AttemptRecord>, AppError>;
}
