// src/engine/review.rs

use crate::{
    engine::scorer,
    models::{
        attempt::{AttemptRecord, AttemptReview, QuestionReview},
        exam::Exam,
    },
};

/// Walks an exam question by question next to the answers stored in `record`.
pub fn review_attempt(exam: &Exam, record: &AttemptRecord) -> AttemptReview {
    let questions: Vec<QuestionReview> = exam
        .questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let student_index = record.answers.selected(idx);
            QuestionReview {
                text: q.text.clone(),
                options: q.options.clone(),
                correct_index: q.correct_index,
                correct_option: q.options.get(q.correct_index).cloned().unwrap_or_default(),
                student_index,
                student_option: student_index.and_then(|i| q.options.get(i).cloned()),
                is_correct: student_index == Some(q.correct_index),
            }
        })
        .collect();

    let card = scorer::score(&exam.questions, &record.answers);

    AttemptReview {
        id: record.id,
        exam_id: exam.id,
        exam_title: exam.title.clone(),
        score: record.score,
        passed: record.passed,
        attempt_number: record.attempt_number,
        correct_count: card.raw_correct,
        incorrect_count: card.incorrect(),
        created_at: record.created_at,
        questions,
    }
}
