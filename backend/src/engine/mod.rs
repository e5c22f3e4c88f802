// src/engine/mod.rs

//! Attempt, scoring and analytics engine.
//!
//! The pure pieces (`gate`, `scorer`, `analytics`, `teacher`, `review`) operate on
//! plain data; `ExamEngine` loads that data from a [`Store`] and runs the
//! submission sequence: load prior attempts, gate-check, score, persist.

pub mod analytics;
pub mod gate;
pub mod review;
pub mod scorer;
pub mod teacher;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    models::{
        analytics::{DetailedAnalytics, StudentAnalytics, StudentsAnalytics, TeacherAnalytics},
        attempt::{AnswerSheet, AttemptReview, NewAttempt, ResultSummary, SubmissionReceipt},
        category::Category,
        exam::{Exam, ExamListing, PublicExam},
    },
    store::{LedgerOrder, Store},
};

pub use gate::{AttemptGate, GateDecision, GateStatus};
pub use scorer::ScoreCard;

#[derive(Clone)]
pub struct ExamEngine {
    store: Arc<dyn Store>,
    gate: AttemptGate,
}

impl ExamEngine {
    pub fn new(store: Arc<dyn Store>, gate: AttemptGate) -> Self {
        Self { store, gate }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    async fn load_exam(&self, exam_id: i64) -> Result<Exam, AppError> {
        self.store
            .find_exam(exam_id)
            .await?
            .ok_or(AppError::NotFound("Exam not found".to_string()))
    }

    async fn category_map(&self) -> Result<HashMap<i64, Category>, AppError> {
        Ok(self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect())
    }

    async fn exam_map(&self, exam_ids: &[i64]) -> Result<HashMap<i64, Exam>, AppError> {
        let mut ids = exam_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(self
            .store
            .exams_by_ids(&ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect())
    }

    async fn student_names(&self, student_ids: &[i64]) -> Result<HashMap<i64, String>, AppError> {
        let mut ids = student_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(self
            .store
            .users_by_ids(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect())
    }

    /// How many attempts were used and whether the exam is locked.
    pub async fn gate_status(
        &self,
        student_id: i64,
        exam_id: i64,
        now: DateTime<Utc>,
    ) -> Result<GateStatus, AppError> {
        let exam = self.load_exam(exam_id).await?;
        let history = self
            .store
            .list_attempts(student_id, Some(exam.id), LedgerOrder::NewestFirst)
            .await?;
        Ok(self.gate.status(&history, now))
    }

    /// Exam detail for a student, refused while the gate is closed.
    pub async fn open_exam(
        &self,
        student_id: i64,
        exam_id: i64,
        now: DateTime<Utc>,
    ) -> Result<PublicExam, AppError> {
        let exam = self.load_exam(exam_id).await?;
        let history = self
            .store
            .list_attempts(student_id, Some(exam.id), LedgerOrder::NewestFirst)
            .await?;
        self.gate.check(&history, now).into_result()?;

        let category = self.store.find_category(exam.category_id).await?;
        Ok(PublicExam::from_exam(&exam, category.map(|c| c.name)))
    }

    /// Every exam, without answer keys, annotated with this student's gate status.
    pub async fn catalogue(
        &self,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExamListing>, AppError> {
        let exams = self.store.list_exams().await?;
        let categories = self.category_map().await?;

        let mut by_exam: HashMap<i64, Vec<_>> = HashMap::new();
        for record in self
            .store
            .list_attempts(student_id, None, LedgerOrder::NewestFirst)
            .await?
        {
            by_exam.entry(record.exam_id).or_default().push(record);
        }

        Ok(exams
            .iter()
            .map(|exam| {
                let history = by_exam.get(&exam.id).map(Vec::as_slice).unwrap_or_default();
                let status = self.gate.status(history, now);
                ExamListing {
                    exam: PublicExam::from_exam(
                        exam,
                        categories.get(&exam.category_id).map(|c| c.name.clone()),
                    ),
                    attempts_used: status.attempts_used,
                    locked: status.locked,
                    retry_after_minutes: status.retry_after_minutes,
                }
            })
            .collect())
    }

    /// The authoritative gate check, scoring and ledger append.
    ///
    /// Nothing is persisted unless the exam exists, the gate is open and the
    /// answers are valid for the exam.
    pub async fn submit(
        &self,
        student_id: i64,
        exam_id: i64,
        answers: Option<AnswerSheet>,
        now: DateTime<Utc>,
    ) -> Result<SubmissionReceipt, AppError> {
        let exam = self.load_exam(exam_id).await?;

        let history = self
            .store
            .list_attempts(student_id, Some(exam.id), LedgerOrder::NewestFirst)
            .await?;

        if let GateDecision::Locked { retry_after_minutes } = self.gate.check(&history, now) {
            tracing::warn!(
                student_id,
                exam_id,
                retry_after_minutes,
                "Submission rejected by attempt gate"
            );
            return Err(AppError::AttemptLocked { retry_after_minutes });
        }

        let answers = answers.ok_or(AppError::BadRequest("Answers required".to_string()))?;
        answers.validate_against(&exam.questions)?;

        let card = scorer::score(&exam.questions, &answers);
        let attempt_number = history.len() as i32 + 1;

        let record = self
            .store
            .record_attempt(NewAttempt {
                student_id,
                exam_id: exam.id,
                answers,
                score: card.percent,
                passed: card.passed,
                attempt_number,
                created_at: now,
            })
            .await?;

        tracing::info!(
            student_id,
            exam_id,
            attempt_number,
            score = record.score,
            passed = record.passed,
            "Exam submitted"
        );

        Ok(SubmissionReceipt {
            id: record.id,
            score: record.score,
            passed: record.passed,
            attempt_number: record.attempt_number,
            correct_count: card.raw_correct,
            total_questions: card.total_questions,
            message: "Exam submitted".to_string(),
        })
    }

    /// The student's result history, newest first. Attempts of deleted exams are left out.
    pub async fn student_results(&self, student_id: i64) -> Result<Vec<ResultSummary>, AppError> {
        let records = self
            .store
            .list_attempts(student_id, None, LedgerOrder::NewestFirst)
            .await?;
        let exam_ids: Vec<i64> = records.iter().map(|r| r.exam_id).collect();
        let exams = self.exam_map(&exam_ids).await?;

        Ok(records
            .iter()
            .filter_map(|record| {
                let exam = exams.get(&record.exam_id)?;
                let card = scorer::score(&exam.questions, &record.answers);
                Some(ResultSummary {
                    id: record.id,
                    exam_id: exam.id,
                    exam_title: exam.title.clone(),
                    total_questions: card.total_questions,
                    score: record.score,
                    passed: record.passed,
                    attempt_number: record.attempt_number,
                    correct_count: card.raw_correct,
                    incorrect_count: card.incorrect(),
                    created_at: record.created_at,
                })
            })
            .collect())
    }

    /// Question-level review of one of the student's own attempts.
    pub async fn result_detail(
        &self,
        student_id: i64,
        attempt_id: i64,
    ) -> Result<AttemptReview, AppError> {
        let record = self.store.get_attempt(attempt_id).await?;
        if record.student_id != student_id {
            return Err(AppError::Forbidden("Access denied".to_string()));
        }
        let exam = self.load_exam(record.exam_id).await?;
        Ok(review::review_attempt(&exam, &record))
    }

    /// Per-subject summaries plus mastery and weak/strong lists.
    pub async fn student_analytics(&self, student_id: i64) -> Result<StudentAnalytics, AppError> {
        let records = self
            .store
            .list_attempts(student_id, None, LedgerOrder::OldestFirst)
            .await?;
        let exam_ids: Vec<i64> = records.iter().map(|r| r.exam_id).collect();
        let exams = self.exam_map(&exam_ids).await?;
        let categories = self.category_map().await?;

        Ok(analytics::summarize_student(&records, &exams, &categories))
    }

    /// Every attempt of the student, newest first, with its question-level review.
    pub async fn student_analytics_details(
        &self,
        student_id: i64,
    ) -> Result<DetailedAnalytics, AppError> {
        let records = self
            .store
            .list_attempts(student_id, None, LedgerOrder::NewestFirst)
            .await?;
        let exam_ids: Vec<i64> = records.iter().map(|r| r.exam_id).collect();
        let exams = self.exam_map(&exam_ids).await?;

        let detailed = records
            .iter()
            .filter_map(|record| {
                exams
                    .get(&record.exam_id)
                    .map(|exam| review::review_attempt(exam, record))
            })
            .collect();
        Ok(DetailedAnalytics { detailed })
    }

    /// Dashboard rollup across the teacher's exams.
    pub async fn teacher_analytics(&self, teacher_id: i64) -> Result<TeacherAnalytics, AppError> {
        let exams = self.store.list_exams_by_owner(teacher_id).await?;
        let exam_ids: Vec<i64> = exams.iter().map(|e| e.id).collect();
        let records = self.store.attempts_for_exams(&exam_ids).await?;
        let student_ids: Vec<i64> = records.iter().map(|r| r.student_id).collect();
        let students = self.student_names(&student_ids).await?;

        Ok(teacher::summarize_teacher(&exams, &records, &students))
    }

    /// Per-student drill-down across the teacher's exams.
    pub async fn students_analytics(
        &self,
        teacher_id: i64,
    ) -> Result<StudentsAnalytics, AppError> {
        let exams = self.store.list_exams_by_owner(teacher_id).await?;
        let exam_ids: Vec<i64> = exams.iter().map(|e| e.id).collect();
        let records = self.store.attempts_for_exams(&exam_ids).await?;
        let student_ids: Vec<i64> = records.iter().map(|r| r.student_id).collect();
        let students = self.student_names(&student_ids).await?;
        let categories = self.category_map().await?;

        Ok(teacher::students_rollup(
            &exams,
            &records,
            &students,
            &categories,
        ))
    }
}
