// src/engine/analytics.rs

//! Folds a student's ledger into per-subject summaries.

use std::collections::HashMap;

use crate::{
    config::{PASS_THRESHOLD_PERCENT, STRONG_SUBJECT_PERCENT},
    models::{
        analytics::{StudentAnalytics, SubjectStatus, SubjectSummary},
        attempt::AttemptRecord,
        category::Category,
        exam::Exam,
    },
};

/// `round(numerator / denominator)` for non-negative operands, halves rounding up.
/// Returns 0 when `denominator` is 0.
pub(crate) fn round_div(numerator: i64, denominator: i64) -> i64 {
    if denominator == 0 {
        return 0;
    }
    (2 * numerator + denominator) / (2 * denominator)
}

#[derive(Default)]
struct SubjectAccumulator {
    scores: Vec<i64>,
    passed: i64,
}

/// Builds the student analytics view.
///
/// Records are sorted chronologically (oldest first) before grouping, since the
/// trend is the difference between the last two scores. Records whose exam or
/// subject no longer exists are skipped.
pub fn summarize_student(
    records: &[AttemptRecord],
    exams: &HashMap<i64, Exam>,
    categories: &HashMap<i64, Category>,
) -> StudentAnalytics {
    let mut ordered: Vec<&AttemptRecord> = records.iter().collect();
    ordered.sort_by_key(|r| (r.created_at, r.id));

    // Groups keep first-seen order so the response is stable.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, SubjectAccumulator> = HashMap::new();

    for record in ordered {
        let Some(subject) = exams
            .get(&record.exam_id)
            .and_then(|exam| categories.get(&exam.category_id))
        else {
            continue;
        };

        let group = groups.entry(subject.name.clone()).or_insert_with(|| {
            order.push(subject.name.clone());
            SubjectAccumulator::default()
        });
        group.scores.push(record.score as i64);
        if record.passed {
            group.passed += 1;
        }
    }

    let subjects: Vec<SubjectSummary> = order
        .into_iter()
        .filter_map(|name| {
            let group = groups.remove(&name)?;
            Some(summarize_subject(name, group))
        })
        .collect();

    let mastery = round_div(
        subjects.iter().map(|s| s.best_score).sum(),
        subjects.len() as i64,
    );

    let weak_subjects = subjects
        .iter()
        .filter(|s| s.avg_score < PASS_THRESHOLD_PERCENT)
        .cloned()
        .collect();
    let strong_subjects = subjects
        .iter()
        .filter(|s| s.avg_score >= STRONG_SUBJECT_PERCENT)
        .cloned()
        .collect();

    StudentAnalytics {
        mastery,
        subjects,
        weak_subjects,
        strong_subjects,
    }
}

fn summarize_subject(subject: String, group: SubjectAccumulator) -> SubjectSummary {
    let attempts = group.scores.len();
    let avg_score = round_div(group.scores.iter().sum(), attempts as i64);
    let best_score = group.scores.iter().copied().max().unwrap_or(0);
    let passed_rate = round_div(100 * group.passed, attempts as i64);
    let trend = match group.scores.as_slice() {
        [.., previous, last] => last - previous,
        _ => 0,
    };
    let status = if avg_score >= PASS_THRESHOLD_PERCENT {
        SubjectStatus::Pass
    } else {
        SubjectStatus::Fail
    };

    SubjectSummary {
        subject,
        attempts,
        avg_score,
        best_score,
        passed_rate,
        status,
        trend,
        history: group.scores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attempt::AnswerSheet, exam::Question};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use sqlx::types::Json;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn exam(id: i64, category_id: i64) -> Exam {
        Exam {
            id,
            title: format!("Exam {}", id),
            category_id,
            duration_minutes: 20,
            questions: Json(vec![Question {
                text: "Q".to_string(),
                options: vec!["A".to_string(), "B".to_string()],
                correct_index: 0,
            }]),
            owner_id: 1,
            created_at: t0(),
            updated_at: t0(),
        }
    }

    fn record(id: i64, exam_id: i64, score: i32, minutes: i64) -> AttemptRecord {
        AttemptRecord {
            id,
            student_id: 42,
            exam_id,
            answers: Json(AnswerSheet::default()),
            score,
            passed: score >= 60,
            attempt_number: 1,
            created_at: t0() + TimeDelta::minutes(minutes),
        }
    }

    fn catalogue() -> (HashMap<i64, Exam>, HashMap<i64, Category>) {
        let exams = [exam(1, 10), exam(2, 20), exam(3, 10), exam(4, 99)]
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let categories = [
            Category { id: 10, name: "Algorithms".to_string() },
            Category { id: 20, name: "Databases".to_string() },
        ]
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
        (exams, categories)
    }

    #[test]
    fn round_div_matches_half_up_rounding() {
        assert_eq!(round_div(5, 2), 3);
        assert_eq!(round_div(7, 3), 2);
        assert_eq!(round_div(240, 3), 80);
        assert_eq!(round_div(1, 0), 0);
    }

    #[test]
    fn trend_follows_chronology() {
        let (exams, categories) = catalogue();

        let rising = summarize_student(
            &[record(1, 1, 50, 0), record(2, 1, 70, 5)],
            &exams,
            &categories,
        );
        assert_eq!(rising.subjects[0].trend, 20);

        let falling = summarize_student(
            &[record(1, 1, 70, 0), record(2, 1, 50, 5)],
            &exams,
            &categories,
        );
        assert_eq!(falling.subjects[0].trend, -20);

        let single = summarize_student(&[record(1, 1, 70, 0)], &exams, &categories);
        assert_eq!(single.subjects[0].trend, 0);
    }

    #[test]
    fn newest_first_input_is_reordered() {
        let (exams, categories) = catalogue();
        let analytics = summarize_student(
            &[record(2, 1, 70, 5), record(1, 1, 50, 0)],
            &exams,
            &categories,
        );
        assert_eq!(analytics.subjects[0].history, vec![50, 70]);
        assert_eq!(analytics.subjects[0].trend, 20);
    }

    #[test]
    fn groups_by_subject_across_exams() {
        let (exams, categories) = catalogue();
        let records = vec![
            record(1, 1, 40, 0),
            record(2, 2, 90, 1),
            record(3, 3, 80, 2),
            record(4, 2, 80, 3),
            record(5, 1, 55, 4),
        ];
        let analytics = summarize_student(&records, &exams, &categories);

        assert_eq!(analytics.subjects.len(), 2);
        let algorithms = &analytics.subjects[0];
        assert_eq!(algorithms.subject, "Algorithms");
        assert_eq!(algorithms.attempts, 3);
        assert_eq!(algorithms.history, vec![40, 80, 55]);
        assert_eq!(algorithms.avg_score, 58);
        assert_eq!(algorithms.best_score, 80);
        assert_eq!(algorithms.passed_rate, 33);
        assert_eq!(algorithms.trend, -25);
        assert_eq!(algorithms.status, SubjectStatus::Fail);

        let databases = &analytics.subjects[1];
        assert_eq!(databases.subject, "Databases");
        assert_eq!(databases.avg_score, 85);
        assert_eq!(databases.passed_rate, 100);
        assert_eq!(databases.status, SubjectStatus::Pass);

        // (80 + 90) / 2
        assert_eq!(analytics.mastery, 85);
        assert_eq!(analytics.weak_subjects.len(), 1);
        assert_eq!(analytics.weak_subjects[0].subject, "Algorithms");
        assert_eq!(analytics.strong_subjects.len(), 1);
        assert_eq!(analytics.strong_subjects[0].subject, "Databases");
    }

    #[test]
    fn dangling_references_are_skipped() {
        let (exams, categories) = catalogue();
        let records = vec![
            record(1, 1, 70, 0),
            // exam 4 points at a missing category, exam 404 does not exist
            record(2, 4, 10, 1),
            record(3, 404, 10, 2),
        ];
        let analytics = summarize_student(&records, &exams, &categories);
        assert_eq!(analytics.subjects.len(), 1);
        assert_eq!(analytics.subjects[0].attempts, 1);
        assert_eq!(analytics.mastery, 70);
    }

    #[test]
    fn no_records_means_zero_mastery() {
        let (exams, categories) = catalogue();
        let analytics = summarize_student(&[], &exams, &categories);
        assert_eq!(analytics.mastery, 0);
        assert!(analytics.subjects.is_empty());
        assert!(analytics.weak_subjects.is_empty());
    }
}
