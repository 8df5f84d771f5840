// src/scoring.rs
//
// Pure scoring of a completed answer set against the question definitions.
// The session submit path and the direct progress endpoint both go through
// here, so local and server-side results can never disagree.

use std::collections::HashMap;

use crate::models::{
    content::Question,
    progress::{AnswerReview, AnswerSubmission},
};

/// Outcome of grading one attempt.
#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    /// 100 * correct / total, full precision.
    pub score: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    /// One review entry per question, in question order.
    pub reviews: Vec<AnswerReview>,
}

/// Grades `submissions` against `questions`.
///
/// * Matching is exact and case-sensitive; no normalization, even for
///   short_answer questions.
/// * An empty or missing answer never matches, including against an empty
///   `correct_answer`.
/// * Submissions for unknown question ids are ignored.
pub fn score_submissions(questions: &[Question], submissions: &[AnswerSubmission]) -> ScoreOutcome {
    let by_question: HashMap<&str, &AnswerSubmission> = submissions
        .iter()
        .map(|s| (s.question_id.as_str(), s))
        .collect();

    let mut correct_count = 0;
    let mut reviews = Vec::with_capacity(questions.len());

    for question in questions {
        let submission = by_question.get(question.id.as_str());
        let user_answer = submission.map(|s| s.user_answer.as_str()).unwrap_or("");
        let time_spent = submission.map(|s| s.time_spent_seconds).unwrap_or(0);

        let is_correct = !user_answer.is_empty() && user_answer == question.correct_answer;
        if is_correct {
            correct_count += 1;
        }

        reviews.push(AnswerReview {
            question_id: question.id.clone(),
            user_answer: user_answer.to_string(),
            correct_answer: question.correct_answer.clone(),
            is_correct,
            time_spent_seconds: time_spent,
        });
    }

    let total_questions = questions.len();
    let score = if total_questions == 0 {
        0.0
    } else {
        100.0 * correct_count as f64 / total_questions as f64
    };

    ScoreOutcome {
        score,
        correct_count,
        total_questions,
        reviews,
    }
}

/// Rounds a stored score for display as an integer percent.
pub fn display_percent(score: f64) -> i64 {
    score.round() as i64
}
