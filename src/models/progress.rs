// src/models/progress.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Represents the 'progress_records' table in the database.
/// One immutable record per completed assessment attempt.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: String,
    pub user_id: String,
    pub content_id: String,

    /// Final score in [0, 100]. Stored at full precision; rounding happens
    /// only at presentation.
    pub score: f64,

    pub time_spent_seconds: i64,

    /// Per-question review, persisted alongside the score.
    pub answers: Json<Vec<AnswerReview>>,

    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// One answer as submitted by the learner.
/// Unanswered questions are submitted with an empty `user_answer` and are
/// scored as incorrect, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnswerSubmission {
    pub question_id: String,
    pub user_answer: String,
    #[validate(range(min = 0))]
    pub time_spent_seconds: i64,
}

/// One graded answer, as stored on the progress record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerReview {
    pub question_id: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub time_spent_seconds: i64,
}

/// DTO for the direct progress submission endpoint.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitProgressRequest {
    pub content_id: String,
    #[validate(length(min = 1), nested)]
    pub answers: Vec<AnswerSubmission>,
    #[validate(range(min = 0))]
    pub total_time_spent: i64,
}

/// DTO returned after a successful submission.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub id: String,
    pub user_id: String,
    pub content_id: String,
    pub score: f64,
    pub correct_count: usize,
    pub total_questions: usize,
    pub time_spent_seconds: i64,
    pub answers: Vec<AnswerReview>,
    pub message: String,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

/// Tiered feedback line shown with the final score.
pub fn feedback_message(score: f64) -> &'static str {
    if score >= 90.0 {
        "Excellent work!"
    } else if score >= 70.0 {
        "Great job!"
    } else {
        "Keep practicing!"
    }
}
