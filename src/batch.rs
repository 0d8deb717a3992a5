//! Sequential batch analysis with progress reporting.
//!
//! Rows are processed one after another (never concurrently); after each row the
//! completed percentage is reported. A failed row is counted and skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::SentimentClient;
use crate::review::{ReviewSubmission, SentimentLabel};
use crate::telemetry::anon_hash;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRow {
    #[serde(default, deserialize_with = "crate::review::null_as_empty")]
    pub review: String,
    #[serde(rename = "movieTitle", default)]
    pub movie_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub id: Uuid,
    pub movie_title: String,
    pub review: String,
    pub sentiment: SentimentLabel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub results: Vec<BatchResult>,
    /// Rows whose analysis failed on every tier.
    pub failed: usize,
    /// Rows with blank review text.
    pub skipped: usize,
}

/// Percentage of `done` out of `total`, rounded; 100 for an empty batch.
pub fn progress_percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

pub async fn run_batch<F>(client: &SentimentClient, rows: Vec<BatchRow>, mut on_progress: F) -> BatchReport
where
    F: FnMut(u8),
{
    let total = rows.len();
    let mut report = BatchReport::default();

    for (i, row) in rows.into_iter().enumerate() {
        let review = row.review.trim().to_string();
        if review.is_empty() {
            report.skipped += 1;
            on_progress(progress_percent(i + 1, total));
            continue;
        }
        let movie_title = row
            .movie_title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Review #{}", i + 1));

        let submission = ReviewSubmission::new(review.clone()).titled(movie_title.clone());
        match client.analyze(&submission).await {
            Ok(a) => report.results.push(BatchResult {
                id: Uuid::new_v4(),
                movie_title,
                review,
                sentiment: a.result.sentiment,
                confidence: a.result.confidence,
                timestamp: Utc::now(),
            }),
            Err(e) => {
                report.failed += 1;
                warn!(target: "batch", row = i, review = %anon_hash(&review), error = %e, "row failed");
            }
        }
        on_progress(progress_percent(i + 1, total));
    }

    info!(
        target: "batch",
        rows = total,
        ok = report.results.len(),
        failed = report.failed,
        skipped = report.skipped,
        "batch complete"
    );
    report
}
