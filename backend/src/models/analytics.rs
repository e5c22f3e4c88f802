// src/models/analytics.rs

use serde::Serialize;

use crate::models::attempt::AttemptReview;

/// Pass/fail label of a subject, derived from its average score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubjectStatus {
    Pass,
    Fail,
}

/// Per-subject rollup of a student's attempts. Computed on demand, never persisted.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject: String,
    pub attempts: usize,
    pub avg_score: i64,
    pub best_score: i64,
    pub passed_rate: i64,
    pub status: SubjectStatus,
    /// Last score minus the one before it; 0 with fewer than two attempts.
    pub trend: i64,
    /// Scores in chronological order.
    pub history: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnalytics {
    pub mastery: i64,
    pub subjects: Vec<SubjectSummary>,
    pub weak_subjects: Vec<SubjectSummary>,
    pub strong_subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExamPerformance {
    pub exam_id: i64,
    pub name: String,
    pub avg_score: i64,
    pub attempts: usize,
}

/// Entry of the teacher's live submission feed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSubmission {
    pub student: String,
    pub exam: String,
    pub score: i32,
    pub date: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TeacherAnalytics {
    pub total_exams: usize,
    pub avg_score: i64,
    pub active_students: usize,
    pub performance: Vec<ExamPerformance>,
    pub recent: Vec<RecentSubmission>,
}

/// Drill-down rollup of one student across a teacher's exams.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRollup {
    pub student_id: i64,
    pub name: String,
    pub total_attempts: usize,
    pub highest_score: i32,
    pub lowest_score: i32,
    pub total_correct: usize,
    pub total_incorrect: usize,
    pub subjects: Vec<String>,
    pub exams: Vec<AttemptReview>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct StudentsAnalytics {
    pub students: Vec<StudentRollup>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DetailedAnalytics {
    pub detailed: Vec<AttemptReview>,
}
