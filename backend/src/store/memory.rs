// src/store/memory.rs

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptRecord, NewAttempt},
        category::Category,
        exam::{Exam, ExamChanges, NewExam},
        user::{NewUser, User},
    },
    store::{LedgerOrder, QUESTIONS_FROZEN, Store},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    /// Exams with their deletion flag.
    exams: Vec<(Exam, bool)>,
    attempts: Vec<AttemptRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn live_exams(&self) -> impl Iterator<Item = &Exam> {
        self.exams
            .iter()
            .filter(|(_, deleted)| !deleted)
            .map(|(exam, _)| exam)
    }
}

/// Process-local store used when no database is configured, and by tests.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|e| AppError::InternalServerError(format!("memory store poisoned: {}", e)))
    }
}

fn sort_ledger(records: &mut [AttemptRecord], order: LedgerOrder) {
    records.sort_by_key(|r| (r.created_at, r.id));
    if order == LedgerOrder::NewestFirst {
        records.reverse();
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(AppError::Conflict(format!(
                "Email '{}' is already registered",
                new.email
            )));
        }
        let user = User {
            id: tables.next_id(),
            name: new.name,
            email: new.email,
            password: new.password,
            role: new.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn users_by_ids(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        Ok(self
            .tables()?
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let mut categories = self.tables()?.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(self
            .tables()?
            .categories
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn ensure_category(&self, name: &str) -> Result<Category, AppError> {
        let mut tables = self.tables()?;
        if let Some(existing) = tables.categories.iter().find(|c| c.name == name) {
            return Ok(existing.clone());
        }
        let category = Category {
            id: tables.next_id(),
            name: name.to_string(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn create_exam(&self, new: NewExam) -> Result<Exam, AppError> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let exam = Exam {
            id: tables.next_id(),
            title: new.title,
            category_id: new.category_id,
            duration_minutes: new.duration_minutes,
            questions: Json(new.questions),
            owner_id: new.owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.exams.push((exam.clone(), false));
        Ok(exam)
    }

    async fn find_exam(&self, id: i64) -> Result<Option<Exam>, AppError> {
        Ok(self.tables()?.live_exams().find(|e| e.id == id).cloned())
    }

    async fn list_exams(&self) -> Result<Vec<Exam>, AppError> {
        let mut exams: Vec<Exam> = self.tables()?.live_exams().cloned().collect();
        exams.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(exams)
    }

    async fn list_exams_by_owner(&self, owner_id: i64) -> Result<Vec<Exam>, AppError> {
        let mut exams: Vec<Exam> = self
            .tables()?
            .live_exams()
            .filter(|e| e.owner_id == owner_id)
            .cloned()
            .collect();
        exams.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(exams)
    }

    async fn exams_by_ids(&self, ids: &[i64]) -> Result<Vec<Exam>, AppError> {
        Ok(self
            .tables()?
            .live_exams()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn update_exam(&self, id: i64, changes: ExamChanges) -> Result<Exam, AppError> {
        let mut tables = self.tables()?;
        if !tables.live_exams().any(|e| e.id == id) {
            return Err(AppError::NotFound("Exam not found".to_string()));
        }
        if changes.questions.is_some() && tables.attempts.iter().any(|r| r.exam_id == id) {
            return Err(AppError::Conflict(QUESTIONS_FROZEN.to_string()));
        }

        let (exam, _) = tables
            .exams
            .iter_mut()
            .find(|(e, deleted)| e.id == id && !deleted)
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;

        if let Some(title) = changes.title {
            exam.title = title;
        }
        if let Some(category_id) = changes.category_id {
            exam.category_id = category_id;
        }
        if let Some(duration) = changes.duration_minutes {
            exam.duration_minutes = duration;
        }
        if let Some(questions) = changes.questions {
            exam.questions = Json(questions);
        }
        exam.updated_at = Utc::now();
        Ok(exam.clone())
    }

    async fn delete_exam(&self, id: i64) -> Result<(), AppError> {
        let mut tables = self.tables()?;
        let (_, deleted) = tables
            .exams
            .iter_mut()
            .find(|(e, deleted)| e.id == id && !*deleted)
            .ok_or(AppError::NotFound("Exam not found".to_string()))?;
        *deleted = true;
        Ok(())
    }

    async fn record_attempt(&self, new: NewAttempt) -> Result<AttemptRecord, AppError> {
        let mut tables = self.tables()?;
        let duplicate = tables.attempts.iter().any(|r| {
            r.student_id == new.student_id
                && r.exam_id == new.exam_id
                && r.attempt_number == new.attempt_number
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "Attempt {} was already recorded for this exam",
                new.attempt_number
            )));
        }

        let record = AttemptRecord {
            id: tables.next_id(),
            student_id: new.student_id,
            exam_id: new.exam_id,
            answers: Json(new.answers),
            score: new.score,
            passed: new.passed,
            attempt_number: new.attempt_number,
            created_at: new.created_at,
        };
        tables.attempts.push(record.clone());
        Ok(record)
    }

    async fn get_attempt(&self, id: i64) -> Result<AttemptRecord, AppError> {
        self.tables()?
            .attempts
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(AppError::NotFound("Result not found".to_string()))
    }

    async fn list_attempts(
        &self,
        student_id: i64,
        exam_id: Option<i64>,
        order: LedgerOrder,
    ) -> Result<Vec<AttemptRecord>, AppError> {
        let mut records: Vec<AttemptRecord> = self
            .tables()?
            .attempts
            .iter()
            .filter(|r| r.student_id == student_id && exam_id.is_none_or(|id| r.exam_id == id))
            .cloned()
            .collect();
        sort_ledger(&mut records, order);
        Ok(records)
    }

    async fn attempts_for_exams(&self, exam_ids: &[i64]) -> Result<Vec<AttemptRecord>, AppError> {
        let mut records: Vec<AttemptRecord> = self
            .tables()?
            .attempts
            .iter()
            .filter(|r| exam_ids.contains(&r.exam_id))
            .cloned()
            .collect();
        sort_ledger(&mut records, LedgerOrder::NewestFirst);
        Ok(records)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attempt::AnswerSheet, exam::Question};
    use chrono::TimeDelta;

    fn new_exam(owner_id: i64) -> NewExam {
        NewExam {
            title: "Networks".to_string(),
            category_id: 1,
            duration_minutes: 10,
            questions: vec![Question {
                text: "TCP?".to_string(),
                options: vec!["Reliable".to_string(), "Unreliable".to_string()],
                correct_index: 0,
            }],
            owner_id,
        }
    }

    fn attempt(exam_id: i64, attempt_number: i32, minutes: i64) -> NewAttempt {
        NewAttempt {
            student_id: 5,
            exam_id,
            answers: AnswerSheet::default(),
            score: 0,
            passed: false,
            attempt_number,
            created_at: Utc::now() + TimeDelta::minutes(minutes),
        }
    }

    #[tokio::test]
    async fn duplicate_ordinal_is_a_conflict() {
        let store = MemoryStore::new();
        let exam = store.create_exam(new_exam(1)).await.unwrap();

        store.record_attempt(attempt(exam.id, 1, 0)).await.unwrap();
        let err = store.record_attempt(attempt(exam.id, 1, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn ledger_order_is_respected() {
        let store = MemoryStore::new();
        let exam = store.create_exam(new_exam(1)).await.unwrap();
        for n in 1..=3 {
            store
                .record_attempt(attempt(exam.id, n, n as i64))
                .await
                .unwrap();
        }

        let newest = store
            .list_attempts(5, Some(exam.id), LedgerOrder::NewestFirst)
            .await
            .unwrap();
        let numbers: Vec<i32> = newest.iter().map(|r| r.attempt_number).collect();
        assert_eq!(numbers, vec![3, 2, 1]);

        let oldest = store
            .list_attempts(5, None, LedgerOrder::OldestFirst)
            .await
            .unwrap();
        let numbers: Vec<i32> = oldest.iter().map(|r| r.attempt_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn deleted_exams_disappear_but_attempts_remain() {
        let store = MemoryStore::new();
        let exam = store.create_exam(new_exam(1)).await.unwrap();
        let record = store.record_attempt(attempt(exam.id, 1, 0)).await.unwrap();

        store.delete_exam(exam.id).await.unwrap();
        assert!(store.find_exam(exam.id).await.unwrap().is_none());
        assert!(store.list_exams_by_owner(1).await.unwrap().is_empty());
        assert!(matches!(
            store.delete_exam(exam.id).await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(store.get_attempt(record.id).await.unwrap().id, record.id);
    }

    #[tokio::test]
    async fn questions_freeze_once_attempted() {
        let store = MemoryStore::new();
        let exam = store.create_exam(new_exam(1)).await.unwrap();
        let replacement = new_exam(1).questions;

        let edited = store
            .update_exam(
                exam.id,
                ExamChanges {
                    questions: Some(replacement.clone()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.questions.0, replacement);

        store.record_attempt(attempt(exam.id, 1, 0)).await.unwrap();

        let err = store
            .update_exam(
                exam.id,
                ExamChanges {
                    questions: Some(replacement),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let renamed = store
            .update_exam(
                exam.id,
                ExamChanges {
                    title: Some("Routing".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.title, "Routing");

        assert!(matches!(
            store.update_exam(9_999, ExamChanges::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let user = NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "hash".to_string(),
            role: "student".to_string(),
        };
        store.create_user(user.clone()).await.unwrap();
        assert!(matches!(
            store.create_user(user).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn ensure_category_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.ensure_category("SQL").await.unwrap();
        let second = store.ensure_category("SQL").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_categories().await.unwrap().len(), 1);
    }
}
