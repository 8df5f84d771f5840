// src/session.rs
//
// One assessment attempt, driven through a finite state machine:
//
//   Loading -> InProgress -> Submitting -> Completed
//      \                         |
//       -> Failed                | (recorder failure keeps the session in
//                                |  Submitting for an explicit retry)
//
// A session is owned by exactly one learner and lives only in the
// in-process store; abandoning the attempt removes it and any late
// submission result is discarded instead of applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        content::{ContentItem, ContentType, PublicQuestion, Question},
        progress::AnswerSubmission,
    },
    scoring,
};

/// Immutable snapshot of the content an attempt runs against, taken when
/// the session loads. Later content edits never leak into a running attempt.
#[derive(Debug, Clone)]
pub struct LoadedContent {
    pub content_id: String,
    pub content_type: ContentType,
    pub title: String,
    pub questions: Vec<Question>,
}

impl LoadedContent {
    /// Validates a fetched content item for assessment and snapshots its
    /// question list. Review material and empty question lists are rejected
    /// as `MalformedContent`.
    pub fn from_item(item: &ContentItem) -> Result<Self, AppError> {
        item.content_json.validate(item.content_type)?;

        let questions = item
            .content_json
            .questions()
            .ok_or_else(|| {
                AppError::MalformedContent(format!("Content {} has no questions", item.id))
            })?
            .to_vec();

        Ok(LoadedContent {
            content_id: item.id.clone(),
            content_type: item.content_type,
            title: item.title.clone(),
            questions,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// Awaiting the content fetch.
    Loading,
    /// Learner is answering; `current_index` is within `[0, N-1]`.
    InProgress,
    /// A submission has been built. `in_flight` distinguishes an
    /// outstanding recorder call from a failed one awaiting retry.
    Submitting { in_flight: bool },
    /// Terminal; holds the authoritative score.
    Completed { score: f64 },
    /// Terminal; the attempt must be recreated to retry.
    Failed,
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::InProgress => "in_progress",
            SessionPhase::Submitting { .. } => "submitting",
            SessionPhase::Completed { .. } => "completed",
            SessionPhase::Failed => "failed",
        }
    }
}

/// The answer submissions built at submit time, one per question.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub submissions: Vec<AnswerSubmission>,
    pub total_time_spent: i64,
}

/// One learner's attempt at a quiz/game, from load to submission or
/// abandonment. Not designed for shared concurrent ownership; the store
/// serializes access.
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub user_id: String,
    pub content_id: String,
    content: Option<Arc<LoadedContent>>,
    pub current_index: usize,
    answers: HashMap<String, String>,
    pub started_at: DateTime<Utc>,
    pub phase: SessionPhase,
}

impl Session {
    pub fn new(user_id: &str, content_id: &str) -> Self {
        Session {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            content_id: content_id.to_string(),
            content: None,
            current_index: 0,
            answers: HashMap::new(),
            started_at: Utc::now(),
            phase: SessionPhase::Loading,
        }
    }

    pub fn content(&self) -> Option<&Arc<LoadedContent>> {
        self.content.as_ref()
    }

    pub fn question_count(&self) -> usize {
        self.content.as_ref().map(|c| c.questions.len()).unwrap_or(0)
    }

    /// Loading -> InProgress. The content has already passed validation.
    pub fn content_loaded(&mut self, content: Arc<LoadedContent>) -> Result<(), AppError> {
        if self.phase != SessionPhase::Loading {
            return Err(AppError::Conflict("Session is already loaded".to_string()));
        }
        self.content = Some(content);
        self.phase = SessionPhase::InProgress;
        Ok(())
    }

    /// Loading -> Failed, when the fetch or validation fails.
    pub fn load_failed(&mut self) {
        self.phase = SessionPhase::Failed;
    }

    /// Upserts an answer. Always legal while in progress; the value is not
    /// checked against the question type, the learner may change it any
    /// number of times before submitting.
    pub fn answer(&mut self, question_id: &str, value: &str) -> Result<(), AppError> {
        if self.phase != SessionPhase::InProgress {
            return Err(AppError::Conflict(format!(
                "Cannot answer while session is {}",
                self.phase.name()
            )));
        }
        self.answers
            .insert(question_id.to_string(), value.to_string());
        Ok(())
    }

    /// Advances to the next question. Legal only below the last index.
    pub fn next(&mut self) -> Result<(), AppError> {
        self.require_in_progress("navigate")?;
        if self.current_index + 1 >= self.question_count() {
            return Err(AppError::BadRequest(
                "Already at the last question".to_string(),
            ));
        }
        self.current_index += 1;
        Ok(())
    }

    /// Steps back to the previous question. Never discards entered answers.
    pub fn previous(&mut self) -> Result<(), AppError> {
        self.require_in_progress("navigate")?;
        if self.current_index == 0 {
            return Err(AppError::BadRequest(
                "Already at the first question".to_string(),
            ));
        }
        self.current_index -= 1;
        Ok(())
    }

    /// Builds one AnswerSubmission per question and transitions to
    /// Submitting. Legal on the last question, or as an explicit retry
    /// after a failed submission. A second call while a submission is
    /// outstanding is rejected before any network work happens.
    ///
    /// Per-question time is the even split `floor(total_elapsed / N)`; true
    /// per-question timing is a possible future enhancement.
    pub fn begin_submit(&mut self, now: DateTime<Utc>) -> Result<PreparedSubmission, AppError> {
        match self.phase {
            SessionPhase::InProgress => {
                if self.current_index + 1 != self.question_count() {
                    return Err(AppError::BadRequest(
                        "Submit is only legal on the last question".to_string(),
                    ));
                }
            }
            SessionPhase::Submitting { in_flight: false } => {} // explicit retry
            SessionPhase::Submitting { in_flight: true } => {
                return Err(AppError::Conflict(
                    "A submission is already in flight".to_string(),
                ));
            }
            SessionPhase::Completed { .. } => {
                return Err(AppError::Conflict(
                    "Session is already completed".to_string(),
                ));
            }
            SessionPhase::Loading | SessionPhase::Failed => {
                return Err(AppError::Conflict(format!(
                    "Cannot submit while session is {}",
                    self.phase.name()
                )));
            }
        }

        let content = self
            .content
            .as_ref()
            .ok_or_else(|| AppError::InternalServerError("Session has no content".to_string()))?;

        let total_time_spent = (now - self.started_at).num_seconds().max(0);
        let per_question = total_time_spent / content.questions.len() as i64;

        let submissions = content
            .questions
            .iter()
            .map(|q| AnswerSubmission {
                question_id: q.id.clone(),
                user_answer: self.answers.get(&q.id).cloned().unwrap_or_default(),
                time_spent_seconds: per_question,
            })
            .collect();

        self.phase = SessionPhase::Submitting { in_flight: true };

        Ok(PreparedSubmission {
            submissions,
            total_time_spent,
        })
    }

    /// Submitting -> Completed with the authoritative score.
    pub fn complete(&mut self, score: f64) -> Result<(), AppError> {
        match self.phase {
            SessionPhase::Submitting { .. } => {
                self.phase = SessionPhase::Completed { score };
                Ok(())
            }
            _ => Err(AppError::Conflict(format!(
                "Cannot complete a session that is {}",
                self.phase.name()
            ))),
        }
    }

    /// The recorder failed; stay in Submitting so the learner can retry
    /// explicitly. Automatic retry is forbidden, a duplicate record would
    /// double-count in aggregation.
    pub fn submission_failed(&mut self) {
        if let SessionPhase::Submitting { in_flight } = &mut self.phase {
            *in_flight = false;
        }
    }

    fn require_in_progress(&self, operation: &str) -> Result<(), AppError> {
        if self.phase != SessionPhase::InProgress {
            return Err(AppError::Conflict(format!(
                "Cannot {} while session is {}",
                operation,
                self.phase.name()
            )));
        }
        Ok(())
    }

    /// Client-facing view. Correct answers are never included; the score
    /// appears only once the session is completed.
    pub fn view(&self) -> SessionView {
        let (score, score_display) = match self.phase {
            SessionPhase::Completed { score } => (Some(score), Some(scoring::display_percent(score))),
            _ => (None, None),
        };

        SessionView {
            id: self.id,
            content_id: self.content_id.clone(),
            title: self.content.as_ref().map(|c| c.title.clone()),
            content_type: self.content.as_ref().map(|c| c.content_type),
            phase: self.phase.name(),
            current_index: self.current_index,
            question_count: self.question_count(),
            questions: self
                .content
                .as_ref()
                .map(|c| c.questions.iter().map(PublicQuestion::from).collect())
                .unwrap_or_default(),
            answers: self.answers.clone(),
            score,
            score_display,
        }
    }
}

/// DTO describing a session to its owner.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub content_id: String,
    pub title: Option<String>,
    pub content_type: Option<ContentType>,
    pub phase: &'static str,
    pub current_index: usize,
    pub question_count: usize,
    pub questions: Vec<PublicQuestion>,
    pub answers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_display: Option<i64>,
}

/// In-process store of active sessions, keyed by session id. Access is
/// serialized through the mutex; handlers never hold the lock across an
/// await point.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert(&self, session: Session) {
        self.sessions().insert(session.id, session);
    }

    /// Removes the session (learner navigated away or attempt finished).
    pub fn remove(&self, id: &Uuid, user_id: &str) -> Option<Session> {
        let mut sessions = self.sessions();
        match sessions.get(id) {
            Some(s) if s.user_id == user_id => sessions.remove(id),
            _ => None,
        }
    }

    /// Runs `f` against the session under the lock. Sessions of other users
    /// are reported as absent rather than forbidden.
    pub fn with_session<T>(
        &self,
        id: &Uuid,
        user_id: &str,
        f: impl FnOnce(&mut Session) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.sessions();
        let session = sessions
            .get_mut(id)
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", id)))?;
        f(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::QuestionKind;
    use chrono::Duration;

    fn loaded_content(question_count: usize) -> Arc<LoadedContent> {
        let questions = (1..=question_count)
            .map(|i| Question {
                id: format!("q{}", i),
                kind: QuestionKind::MultipleChoice {
                    options: vec!["A".to_string(), "B".to_string()],
                },
                prompt: format!("Question {}", i),
                correct_answer: "A".to_string(),
            })
            .collect();

        Arc::new(LoadedContent {
            content_id: "content-1".to_string(),
            content_type: ContentType::Quiz,
            title: "Test Quiz".to_string(),
            questions,
        })
    }

    fn in_progress(question_count: usize) -> Session {
        let mut session = Session::new("user-1", "content-1");
        session.content_loaded(loaded_content(question_count)).unwrap();
        session
    }

    #[test]
    fn loading_transitions_to_in_progress() {
        let session = in_progress(3);
        assert_eq!(session.phase, SessionPhase::InProgress);
        assert_eq!(session.current_index, 0);
        assert_eq!(session.question_count(), 3);
    }

    #[test]
    fn load_failure_is_terminal() {
        let mut session = Session::new("user-1", "content-1");
        session.load_failed();
        assert_eq!(session.phase, SessionPhase::Failed);
        assert!(session.answer("q1", "A").is_err());
        assert!(session.begin_submit(Utc::now()).is_err());
    }

    #[test]
    fn navigation_stays_within_bounds() {
        let mut session = in_progress(2);

        assert!(matches!(
            session.previous(),
            Err(AppError::BadRequest(_))
        ));
        session.next().unwrap();
        assert_eq!(session.current_index, 1);
        assert!(matches!(session.next(), Err(AppError::BadRequest(_))));
        session.previous().unwrap();
        assert_eq!(session.current_index, 0);
    }

    #[test]
    fn navigation_keeps_answers() {
        let mut session = in_progress(2);
        session.answer("q1", "A").unwrap();
        session.next().unwrap();
        session.previous().unwrap();
        // Changing an answer is an upsert, not an error.
        session.answer("q1", "B").unwrap();

        session.next().unwrap();
        let prepared = session.begin_submit(Utc::now()).unwrap();
        assert_eq!(prepared.submissions[0].user_answer, "B");
        assert_eq!(prepared.submissions[1].user_answer, "");
    }

    #[test]
    fn submit_is_only_legal_on_last_question() {
        let mut session = in_progress(3);
        assert!(matches!(
            session.begin_submit(Utc::now()),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn submit_splits_elapsed_time_evenly() {
        let now = Utc::now();
        let mut session = in_progress(2);
        session.started_at = now - Duration::seconds(125);
        session.next().unwrap();

        let prepared = session.begin_submit(now).unwrap();
        assert_eq!(prepared.total_time_spent, 125);
        assert!(prepared
            .submissions
            .iter()
            .all(|s| s.time_spent_seconds == 62));
    }

    #[test]
    fn double_submit_is_a_conflict() {
        let mut session = in_progress(1);
        session.begin_submit(Utc::now()).unwrap();
        assert!(matches!(
            session.begin_submit(Utc::now()),
            Err(AppError::Conflict(_))
        ));
    }

    #[test]
    fn failed_submission_allows_explicit_retry() {
        let mut session = in_progress(1);
        session.begin_submit(Utc::now()).unwrap();
        session.submission_failed();
        assert_eq!(session.phase, SessionPhase::Submitting { in_flight: false });

        // Retry is legal; a third concurrent attempt is not.
        session.begin_submit(Utc::now()).unwrap();
        assert!(session.begin_submit(Utc::now()).is_err());
    }

    #[test]
    fn completed_sessions_reject_further_mutation() {
        let mut session = in_progress(1);
        session.answer("q1", "A").unwrap();
        session.begin_submit(Utc::now()).unwrap();
        session.complete(100.0).unwrap();

        assert!(matches!(session.answer("q1", "B"), Err(AppError::Conflict(_))));
        assert!(matches!(
            session.begin_submit(Utc::now()),
            Err(AppError::Conflict(_))
        ));

        let view = session.view();
        assert_eq!(view.phase, "completed");
        assert_eq!(view.score, Some(100.0));
        assert_eq!(view.score_display, Some(100));
    }

    #[test]
    fn view_never_exposes_correct_answers() {
        let session = in_progress(2);
        let json = serde_json::to_value(session.view()).unwrap();
        assert!(json.to_string().find("correct_answer").is_none());
        assert_eq!(json["question_count"], 2);
    }

    #[test]
    fn late_result_for_removed_session_is_discarded() {
        let store = SessionStore::new();
        let session = in_progress(1);
        let id = session.id;
        store.insert(session);

        let prepared = store
            .with_session(&id, "user-1", |s| s.begin_submit(Utc::now()))
            .unwrap();
        assert_eq!(prepared.submissions.len(), 1);

        // Learner abandons the attempt while the recorder call is still
        // outstanding.
        assert!(store.remove(&id, "user-1").is_some());

        // The late result finds no session to apply to and is dropped.
        let applied = store.with_session(&id, "user-1", |s| s.complete(100.0));
        assert!(matches!(applied, Err(AppError::NotFound(_))));
    }

    #[test]
    fn store_scopes_sessions_to_their_owner() {
        let store = SessionStore::new();
        let session = in_progress(1);
        let id = session.id;
        store.insert(session);

        assert!(store
            .with_session(&id, "someone-else", |_| Ok(()))
            .is_err());
        assert!(store.remove(&id, "someone-else").is_none());
        assert!(store.with_session(&id, "user-1", |_| Ok(())).is_ok());
        assert!(store.remove(&id, "user-1").is_some());
    }
}
