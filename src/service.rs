//! # MovieSense application state
//! Owns the tiered client and the history store and exposes the user-level flows:
//! single submission, comparison, batch and rating aggregation. Built once at startup
//! and shared by `Arc`; nothing here is global.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::aggregate::{stars, AggregationSession, Stars};
use crate::batch::{run_batch, BatchReport, BatchRow};
use crate::client::{Analysis, SentimentClient};
use crate::config::SenseConfig;
use crate::error::{Result, SenseError};
use crate::history::HistoryStore;
use crate::review::{AggregatedRating, ReviewSubmission, ReviewWithResult, SentimentLabel};
use crate::storage::JsonFileStorage;

/// Lifecycle of one analysis: Idle → Submitting → Succeeded | Failed → Idle.
#[derive(Debug)]
pub enum AnalysisState {
    Idle,
    Submitting,
    Succeeded(Analysis),
    Failed(SenseError),
}

impl AnalysisState {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisState::Idle => "idle",
            AnalysisState::Submitting => "submitting",
            AnalysisState::Succeeded(_) => "succeeded",
            AnalysisState::Failed(_) => "failed",
        }
    }
}

/// Enforces the transitions of [`AnalysisState`].
#[derive(Debug)]
pub struct AnalysisTracker {
    state: AnalysisState,
}

impl Default for AnalysisTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisTracker {
    pub fn new() -> Self {
        Self {
            state: AnalysisState::Idle,
        }
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }

    /// Idle → Submitting. Any other starting state is rejected.
    pub fn begin(&mut self) -> Result<()> {
        if !matches!(self.state, AnalysisState::Idle) {
            return Err(SenseError::Validation(format!(
                "cannot submit while {}",
                self.state.name()
            )));
        }
        self.state = AnalysisState::Submitting;
        Ok(())
    }

    /// Submitting → Succeeded | Failed. Returns `false` if no submission was running.
    pub fn finish(&mut self, outcome: Result<Analysis>) -> bool {
        if !matches!(self.state, AnalysisState::Submitting) {
            return false;
        }
        self.state = match outcome {
            Ok(a) => AnalysisState::Succeeded(a),
            Err(e) => AnalysisState::Failed(e),
        };
        true
    }

    /// Back to Idle, handing out the terminal outcome if there was one.
    pub fn take_outcome(&mut self) -> Option<Result<Analysis>> {
        match std::mem::replace(&mut self.state, AnalysisState::Idle) {
            AnalysisState::Succeeded(a) => Some(Ok(a)),
            AnalysisState::Failed(e) => Some(Err(e)),
            AnalysisState::Submitting => {
                // still running: keep it that way
                self.state = AnalysisState::Submitting;
                None
            }
            AnalysisState::Idle => None,
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonItem {
    pub movie_title: Option<String>,
    pub review: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Input review of a rating request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    #[serde(default)]
    pub reviewer_name: String,
    #[serde(default, deserialize_with = "crate::review::null_as_empty")]
    pub review: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub rating: AggregatedRating,
    pub failed: usize,
    pub stars: Stars,
    /// Only ratings with at least one analyzed review are persisted.
    pub saved: bool,
}

pub struct MovieSense {
    client: SentimentClient,
    history: Arc<HistoryStore>,
}

impl MovieSense {
    pub fn new(client: SentimentClient, history: Arc<HistoryStore>) -> Self {
        Self { client, history }
    }

    /// Tiered client from config, history persisted under `storage_dir`.
    pub fn from_config(cfg: &SenseConfig) -> Result<Self> {
        let client = SentimentClient::from_config(cfg)?;
        let storage = Arc::new(JsonFileStorage::new(cfg.storage_dir.clone()));
        let history = Arc::new(HistoryStore::open(storage));
        info!(
            target: "service",
            tiers = ?client.tier_names(),
            storage = %cfg.storage_dir.display(),
            "moviesense ready"
        );
        Ok(Self::new(client, history))
    }

    pub fn client(&self) -> &SentimentClient {
        &self.client
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Analyze one review and append it to the history on success.
    pub async fn submit(&self, submission: ReviewSubmission) -> Result<Analysis> {
        let mut tracker = AnalysisTracker::new();
        tracker.begin()?;
        debug!(target: "service", state = tracker.state().name(), "analysis started");

        let outcome = self.client.analyze(&submission).await;
        if let Ok(a) = &outcome {
            self.history
                .record(ReviewWithResult::new(&submission, &a.result));
        }
        tracker.finish(outcome);
        debug!(target: "service", state = tracker.state().name(), "analysis settled");

        tracker
            .take_outcome()
            .unwrap_or_else(|| Err(SenseError::Upstream("analysis did not settle".into())))
    }

    /// Analyze at least two reviews concurrently. Per-item failures are reported inline.
    pub async fn compare(&self, items: Vec<ReviewSubmission>) -> Result<Vec<ComparisonItem>> {
        if items.len() < 2 {
            return Err(SenseError::Validation(
                "at least two items are required for comparison".into(),
            ));
        }
        if items.iter().any(|s| s.review.trim().is_empty()) {
            return Err(SenseError::Validation("all review fields are required".into()));
        }

        let outcomes = self.client.analyze_many(items.clone()).await;
        let out = items
            .into_iter()
            .zip(outcomes)
            .map(|(s, outcome)| {
                let movie_title = s.title().map(str::to_string);
                match outcome {
                    Ok(a) => ComparisonItem {
                        movie_title,
                        review: s.review,
                        sentiment: Some(a.result.sentiment),
                        confidence: Some(a.result.confidence),
                        error: None,
                    },
                    Err(e) => ComparisonItem {
                        movie_title,
                        review: s.review,
                        sentiment: None,
                        confidence: None,
                        error: Some(e.to_string()),
                    },
                }
            })
            .collect();
        Ok(out)
    }

    /// Sequential batch; successful rows are recorded in the history.
    pub async fn batch<F>(&self, rows: Vec<BatchRow>, on_progress: F) -> BatchReport
    where
        F: FnMut(u8),
    {
        let report = run_batch(&self.client, rows, on_progress).await;
        for r in report.results.iter().rev() {
            self.history.record(ReviewWithResult {
                id: r.id,
                review: r.review.clone(),
                movie_title: Some(r.movie_title.clone()),
                sentiment: r.sentiment,
                confidence: r.confidence,
                timestamp: r.timestamp,
            });
        }
        report
    }

    /// Analyze all reviews of one title, aggregate and persist the rating.
    pub async fn rate(&self, movie_title: &str, reviews: Vec<RatingInput>) -> Result<RatingOutcome> {
        let mut session = AggregationSession::new(movie_title);
        for r in reviews {
            session.add_review(r.reviewer_name, r.review);
        }
        let failed = session.analyze(&self.client).await?;
        let rating = session.to_rating();

        let saved = rating.review_count > 0;
        if saved {
            self.history.save_rating(rating.clone());
        }
        Ok(RatingOutcome {
            stars: stars(rating.aggregate_score),
            rating,
            failed,
            saved,
        })
    }

    pub fn delete_rating(&self, id: Uuid) -> bool {
        self.history.delete_rating(id)
    }
}
