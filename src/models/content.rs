// src/models/content.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

use crate::error::AppError;

/// Kind of generated learning content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ContentType {
    Game,
    Quiz,
    Review,
}

/// Represents the 'contents' table in the database.
/// One generated learning artifact (game, quiz or review material) tied to a
/// source document. Immutable for the lifetime of a session once fetched;
/// engagement counters are updated server-side only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub content_type: ContentType,
    pub subject: Option<String>,
    pub title: String,
    pub description: Option<String>,

    /// Polymorphic payload: questions for game/quiz, sections for review.
    /// Stored as a JSON document in the database.
    pub content_json: Json<ContentPayload>,

    // Engagement metrics, mutated as a side effect of fetch/completion.
    pub views: i64,
    pub completions: i64,
    pub average_score: f64,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The parsed `content_json` document.
///
/// The generator emits extra keys (difficulty, hints, scoring tables...);
/// everything not needed for driving a session is ignored on parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPayload {
    Assessment { questions: Vec<Question> },
    Review { sections: Vec<Section> },
}

impl ContentPayload {
    /// The ordered question list, if this payload is assessable.
    pub fn questions(&self) -> Option<&[Question]> {
        match self {
            ContentPayload::Assessment { questions } => Some(questions),
            ContentPayload::Review { .. } => None,
        }
    }

    /// Checks the payload against the invariants of its declared content
    /// type. A game/quiz with zero questions is invalid content and must
    /// never reach a session.
    pub fn validate(&self, content_type: ContentType) -> Result<(), AppError> {
        match (content_type, self) {
            (ContentType::Game | ContentType::Quiz, ContentPayload::Assessment { questions }) => {
                if questions.is_empty() {
                    return Err(AppError::MalformedContent(
                        "Content has no questions".to_string(),
                    ));
                }
                for question in questions {
                    question.validate()?;
                }
                Ok(())
            }
            (ContentType::Review, ContentPayload::Review { .. }) => Ok(()),
            _ => Err(AppError::MalformedContent(format!(
                "Payload shape does not match content type {:?}",
                content_type
            ))),
        }
    }

    /// Copy of the payload with correct answers stripped, safe to send to
    /// a learner before submission.
    pub fn public(&self) -> PublicPayload {
        match self {
            ContentPayload::Assessment { questions } => PublicPayload::Assessment {
                questions: questions.iter().map(PublicQuestion::from).collect(),
            },
            ContentPayload::Review { sections } => PublicPayload::Review {
                sections: sections.clone(),
            },
        }
    }
}

/// One question of a game/quiz payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,

    /// Question kind, tagged by the JSON "type" field. Closed enum so that
    /// rendering and scoring sites handle every kind exhaustively.
    #[serde(flatten)]
    pub kind: QuestionKind,

    /// The prompt shown to the learner.
    #[serde(rename = "question")]
    pub prompt: String,

    /// Never exposed to the learner before submission.
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    MultipleChoice { options: Vec<String> },
    TrueFalse,
    ShortAnswer,
}

impl Question {
    pub fn validate(&self) -> Result<(), AppError> {
        match &self.kind {
            QuestionKind::MultipleChoice { options } => {
                if options.is_empty() {
                    return Err(AppError::MalformedContent(format!(
                        "Question {} has no options",
                        self.id
                    )));
                }
                if !options.contains(&self.correct_answer) {
                    return Err(AppError::MalformedContent(format!(
                        "Question {}: correct answer is not among the options",
                        self.id
                    )));
                }
                Ok(())
            }
            QuestionKind::TrueFalse | QuestionKind::ShortAnswer => Ok(()),
        }
    }
}

/// One section of a review/study-guide payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub topic: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// DTO for sending a question to the client (excludes correct_answer).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
    #[serde(rename = "question")]
    pub prompt: String,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id.clone(),
            kind: q.kind.clone(),
            prompt: q.prompt.clone(),
        }
    }
}

/// Answer-stripped payload for client responses.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PublicPayload {
    Assessment { questions: Vec<PublicQuestion> },
    Review { sections: Vec<Section> },
}

/// DTO for returning a content item to the client.
#[derive(Debug, Serialize)]
pub struct ContentResponse {
    pub id: String,
    pub document_id: String,
    pub content_type: ContentType,
    pub subject: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub content: PublicPayload,
    pub views: i64,
    pub completions: i64,
    pub average_score: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&ContentItem> for ContentResponse {
    fn from(item: &ContentItem) -> Self {
        ContentResponse {
            id: item.id.clone(),
            document_id: item.document_id.clone(),
            content_type: item.content_type,
            subject: item.subject.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            content: item.content_json.public(),
            views: item.views,
            completions: item.completions,
            average_score: item.average_score,
            created_at: item.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz_payload() -> ContentPayload {
        serde_json::from_value(serde_json::json!({
            "title": "Fractions Practice Quiz",
            "difficulty": "medium",
            "questions": [
                {
                    "id": "q1",
                    "type": "multiple_choice",
                    "question": "What is 1/2 + 1/4?",
                    "options": ["1/4", "2/4", "3/4", "4/4"],
                    "correct_answer": "3/4",
                    "hints": ["Find a common denominator"],
                    "points": 20
                },
                {
                    "id": "q2",
                    "type": "true_false",
                    "question": "1/2 equals 2/4.",
                    "options": ["True", "False"],
                    "correct_answer": "True"
                },
                {
                    "id": "q3",
                    "type": "short_answer",
                    "question": "Write one half as a decimal.",
                    "correct_answer": "0.5"
                }
            ]
        }))
        .expect("quiz payload should parse")
    }

    #[test]
    fn parses_tagged_question_kinds() {
        let payload = quiz_payload();
        let questions = payload.questions().unwrap();
        assert_eq!(questions.len(), 3);
        assert!(matches!(
            questions[0].kind,
            QuestionKind::MultipleChoice { ref options } if options.len() == 4
        ));
        assert_eq!(questions[1].kind, QuestionKind::TrueFalse);
        assert_eq!(questions[2].kind, QuestionKind::ShortAnswer);
        assert!(payload.validate(ContentType::Quiz).is_ok());
    }

    #[test]
    fn review_payload_has_no_questions() {
        let payload: ContentPayload = serde_json::from_value(serde_json::json!({
            "title": "Fractions Study Guide",
            "sections": [
                {
                    "topic": "Adding fractions",
                    "summary": "Use a common denominator.",
                    "key_points": ["Find the LCM", "Add numerators"]
                }
            ]
        }))
        .unwrap();

        assert!(payload.questions().is_none());
        assert!(payload.validate(ContentType::Review).is_ok());
        assert!(payload.validate(ContentType::Quiz).is_err());
    }

    #[test]
    fn empty_question_list_is_malformed() {
        let payload: ContentPayload =
            serde_json::from_value(serde_json::json!({ "questions": [] })).unwrap();
        let err = payload.validate(ContentType::Quiz).unwrap_err();
        assert!(matches!(err, AppError::MalformedContent(_)));
    }

    #[test]
    fn correct_answer_must_be_an_option() {
        let payload: ContentPayload = serde_json::from_value(serde_json::json!({
            "questions": [{
                "id": "q1",
                "type": "multiple_choice",
                "question": "Pick one",
                "options": ["A", "B"],
                "correct_answer": "C"
            }]
        }))
        .unwrap();
        assert!(payload.validate(ContentType::Quiz).is_err());
    }

    #[test]
    fn public_payload_strips_correct_answers() {
        let public = quiz_payload().public();
        let json = serde_json::to_value(&public).unwrap();
        assert!(json.to_string().find("correct_answer").is_none());
        assert_eq!(json["questions"][0]["type"], "multiple_choice");
        assert_eq!(json["questions"][0]["options"].as_array().unwrap().len(), 4);
    }
}
