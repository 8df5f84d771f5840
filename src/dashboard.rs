// src/dashboard.rs
//
// Dashboard aggregation: a pure function of the learner's documents and
// completed activities. Nothing here is persisted or accumulated; the
// summary is recomputed on demand and is therefore always consistent with
// the underlying records.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::prelude::FromRow;

use crate::models::{content::ContentType, document::Document};

/// How many entries `recent_activities` is capped to.
pub const RECENT_ACTIVITY_LIMIT: usize = 10;

/// One progress record joined with a snapshot of its content's metadata.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    pub content_id: String,
    pub content_title: String,
    pub content_type: ContentType,
    pub subject: Option<String>,
    pub score: f64,
    pub time_spent_seconds: i64,
    pub completed_at: DateTime<Utc>,
}

/// Aggregated statistics for one learner's dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_documents: usize,
    pub total_games_played: usize,
    pub total_quizzes_completed: usize,
    pub average_score: f64,
    pub total_study_time_minutes: i64,
    /// Newest first, capped to `RECENT_ACTIVITY_LIMIT`. Each entry is a
    /// snapshot taken at aggregation time, not a live reference.
    pub recent_activities: Vec<RecentActivity>,
    /// Distinct content items touched per subject. Subjects without
    /// activity are omitted, never present with a zero count.
    pub subject_breakdown: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentActivity {
    pub content_title: String,
    pub content_type: ContentType,
    pub score: f64,
    pub completed_at: DateTime<Utc>,
}

/// Derives the dashboard summary from the two inputs alone.
pub fn aggregate(documents: &[Document], activities: &[ActivityRow]) -> DashboardSummary {
    let total_games_played = activities
        .iter()
        .filter(|a| a.content_type == ContentType::Game)
        .count();
    let total_quizzes_completed = activities
        .iter()
        .filter(|a| a.content_type == ContentType::Quiz)
        .count();

    let average_score = if activities.is_empty() {
        0.0
    } else {
        activities.iter().map(|a| a.score).sum::<f64>() / activities.len() as f64
    };

    let total_study_time_minutes =
        activities.iter().map(|a| a.time_spent_seconds).sum::<i64>() / 60;

    let mut recent: Vec<&ActivityRow> = activities.iter().collect();
    recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    let recent_activities = recent
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .map(|a| RecentActivity {
            content_title: a.content_title.clone(),
            content_type: a.content_type,
            score: a.score,
            completed_at: a.completed_at,
        })
        .collect();

    let mut touched: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for activity in activities {
        if let Some(subject) = activity.subject.as_deref() {
            touched
                .entry(subject)
                .or_default()
                .insert(activity.content_id.as_str());
        }
    }
    let subject_breakdown = touched
        .into_iter()
        .map(|(subject, contents)| (subject.to_string(), contents.len()))
        .collect();

    DashboardSummary {
        total_documents: documents.len(),
        total_games_played,
        total_quizzes_completed,
        average_score,
        total_study_time_minutes,
        recent_activities,
        subject_breakdown,
    }
}
