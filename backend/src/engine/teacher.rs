// src/engine/teacher.rs

use std::collections::{HashMap, HashSet};

use crate::{
    config::RECENT_FEED_LIMIT,
    engine::{analytics::round_div, review::review_attempt},
    models::{
        analytics::{
            ExamPerformance, RecentSubmission, StudentRollup, StudentsAnalytics, TeacherAnalytics,
        },
        attempt::AttemptRecord,
        category::Category,
        exam::Exam,
    },
};

const UNKNOWN_STUDENT: &str = "Unknown student";

/// Folds every ledger entry across a teacher's exams into the dashboard view.
///
/// `records` may contain entries for other exams; only those referencing one of
/// `exams` are counted. `students` maps student ids to display names.
pub fn summarize_teacher(
    exams: &[Exam],
    records: &[AttemptRecord],
    students: &HashMap<i64, String>,
) -> TeacherAnalytics {
    let titles: HashMap<i64, &str> = exams.iter().map(|e| (e.id, e.title.as_str())).collect();
    let owned: Vec<&AttemptRecord> = records
        .iter()
        .filter(|r| titles.contains_key(&r.exam_id))
        .collect();

    let performance = exams
        .iter()
        .map(|exam| {
            let scores: Vec<i64> = owned
                .iter()
                .filter(|r| r.exam_id == exam.id)
                .map(|r| r.score as i64)
                .collect();
            ExamPerformance {
                exam_id: exam.id,
                name: exam.title.clone(),
                avg_score: round_div(scores.iter().sum(), scores.len() as i64),
                attempts: scores.len(),
            }
        })
        .collect();

    let active_students = owned
        .iter()
        .map(|r| r.student_id)
        .collect::<HashSet<_>>()
        .len();

    let avg_score = round_div(
        owned.iter().map(|r| r.score as i64).sum(),
        owned.len() as i64,
    );

    let mut newest_first = owned.clone();
    newest_first.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
    let recent = newest_first
        .into_iter()
        .take(RECENT_FEED_LIMIT)
        .map(|r| RecentSubmission {
            student: students
                .get(&r.student_id)
                .cloned()
                .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
            exam: titles.get(&r.exam_id).copied().unwrap_or_default().to_string(),
            score: r.score,
            date: r.created_at,
        })
        .collect();

    TeacherAnalytics {
        total_exams: exams.len(),
        avg_score,
        active_students,
        performance,
        recent,
    }
}

/// Per-student drill-down across a teacher's exams, with question-level review.
pub fn students_rollup(
    exams: &[Exam],
    records: &[AttemptRecord],
    students: &HashMap<i64, String>,
    categories: &HashMap<i64, Category>,
) -> StudentsAnalytics {
    let by_id: HashMap<i64, &Exam> = exams.iter().map(|e| (e.id, e)).collect();

    let mut ordered: Vec<&AttemptRecord> = records
        .iter()
        .filter(|r| by_id.contains_key(&r.exam_id))
        .collect();
    ordered.sort_by_key(|r| (r.created_at, r.id));

    let mut rollups: Vec<StudentRollup> = Vec::new();
    let mut slots: HashMap<i64, usize> = HashMap::new();

    for record in ordered {
        let Some(exam) = by_id.get(&record.exam_id) else {
            continue;
        };

        let slot = *slots.entry(record.student_id).or_insert_with(|| {
            rollups.push(StudentRollup {
                student_id: record.student_id,
                name: students
                    .get(&record.student_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_STUDENT.to_string()),
                total_attempts: 0,
                highest_score: 0,
                lowest_score: 100,
                total_correct: 0,
                total_incorrect: 0,
                subjects: Vec::new(),
                exams: Vec::new(),
            });
            rollups.len() - 1
        });
        let rollup = &mut rollups[slot];

        let review = review_attempt(exam, record);
        rollup.total_attempts += 1;
        rollup.highest_score = rollup.highest_score.max(record.score);
        rollup.lowest_score = rollup.lowest_score.min(record.score);
        rollup.total_correct += review.correct_count;
        rollup.total_incorrect += review.incorrect_count;

        if let Some(category) = categories.get(&exam.category_id) {
            if !rollup.subjects.contains(&category.name) {
                rollup.subjects.push(category.name.clone());
            }
        }
        rollup.exams.push(review);
    }

    StudentsAnalytics { students: rollups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attempt::AnswerSheet, exam::Question};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use sqlx::types::Json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn exam(id: i64, title: &str) -> Exam {
        Exam {
            id,
            title: title.to_string(),
            category_id: 1,
            duration_minutes: 15,
            questions: Json(vec![
                Question {
                    text: "one".to_string(),
                    options: vec!["A".to_string(), "B".to_string()],
                    correct_index: 0,
                },
                Question {
                    text: "two".to_string(),
                    options: vec!["A".to_string(), "B".to_string()],
                    correct_index: 1,
                },
            ]),
            owner_id: 9,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn record(id: i64, student_id: i64, exam_id: i64, score: i32, minutes: i64) -> AttemptRecord {
        AttemptRecord {
            id,
            student_id,
            exam_id,
            answers: Json([(0, 0)].into_iter().collect::<AnswerSheet>()),
            score,
            passed: score >= 60,
            attempt_number: 1,
            created_at: t0() + TimeDelta::minutes(minutes),
        }
    }

    fn names() -> HashMap<i64, String> {
        [(1, "Asha".to_string()), (2, "Bo".to_string())]
            .into_iter()
            .collect()
    }

    #[test]
    fn averages_and_distinct_students() {
        let exams = vec![exam(1, "Graphs"), exam(2, "Sorting"), exam(3, "Empty")];
        let records = vec![
            record(1, 1, 1, 80, 0),
            record(2, 1, 1, 60, 1),
            record(3, 2, 2, 100, 2),
        ];

        let analytics = summarize_teacher(&exams, &records, &names());
        assert_eq!(analytics.total_exams, 3);
        assert_eq!(analytics.avg_score, 80);
        assert_eq!(analytics.active_students, 2);

        assert_eq!(analytics.performance[0].avg_score, 70);
        assert_eq!(analytics.performance[0].attempts, 2);
        assert_eq!(analytics.performance[1].avg_score, 100);
        assert_eq!(analytics.performance[2].avg_score, 0);
        assert_eq!(analytics.performance[2].attempts, 0);
    }

    #[test]
    fn foreign_exam_records_are_ignored() {
        let exams = vec![exam(1, "Graphs")];
        let records = vec![record(1, 1, 1, 40, 0), record(2, 2, 77, 100, 1)];
        let analytics = summarize_teacher(&exams, &records, &names());
        assert_eq!(analytics.avg_score, 40);
        assert_eq!(analytics.active_students, 1);
        assert_eq!(analytics.recent.len(), 1);
    }

    #[test]
    fn recent_feed_is_newest_first_and_capped() {
        let exams = vec![exam(1, "Graphs")];
        let records: Vec<AttemptRecord> = (0..15)
            .map(|i| record(i, 1 + i % 2, 1, i as i32, i))
            .collect();

        let analytics = summarize_teacher(&exams, &records, &names());
        assert_eq!(analytics.recent.len(), RECENT_FEED_LIMIT);
        assert_eq!(analytics.recent[0].score, 14);
        assert_eq!(analytics.recent[9].score, 5);
        assert_eq!(analytics.recent[0].exam, "Graphs");
        assert_eq!(analytics.recent[0].student, "Asha");
    }

    #[test]
    fn no_exams_no_records() {
        let analytics = summarize_teacher(&[], &[], &names());
        assert_eq!(analytics.total_exams, 0);
        assert_eq!(analytics.avg_score, 0);
        assert_eq!(analytics.active_students, 0);
        assert!(analytics.recent.is_empty());
    }

    #[test]
    fn rollup_groups_attempts_per_student() {
        let exams = vec![exam(1, "Graphs"), exam(2, "Sorting")];
        let records = vec![
            record(1, 1, 1, 50, 0),
            record(2, 2, 1, 90, 1),
            record(3, 1, 2, 70, 2),
        ];
        let categories: HashMap<i64, Category> = [(
            1,
            Category {
                id: 1,
                name: "Algorithms".to_string(),
            },
        )]
        .into_iter()
        .collect();

        let rollup = students_rollup(&exams, &records, &names(), &categories);
        assert_eq!(rollup.students.len(), 2);

        let asha = &rollup.students[0];
        assert_eq!(asha.name, "Asha");
        assert_eq!(asha.total_attempts, 2);
        assert_eq!(asha.highest_score, 70);
        assert_eq!(asha.lowest_score, 50);
        // every record answers only question 0, correctly
        assert_eq!(asha.total_correct, 2);
        assert_eq!(asha.total_incorrect, 2);
        assert_eq!(asha.subjects, vec!["Algorithms".to_string()]);
        assert_eq!(asha.exams[1].exam_title, "Sorting");
        assert_eq!(asha.exams[0].questions[1].student_option, None);

        assert_eq!(rollup.students[1].name, "Bo");
    }
}
