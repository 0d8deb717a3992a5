//! # Aggregation Engine
//! Folds per-review (label, confidence) pairs into one 0–10 movie score.
//!
//! Per-review score bands:
//! - positive: `7 + 3c`      (7..=10)
//! - negative: `3 * (1 - c)` (0..=3)
//! - neutral:  `3 + 4c`      (3..=7)
//!
//! The aggregate is the confidence-weighted mean of those scores. Everything is
//! recomputed from the full review set on each change; nothing is incremental.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::client::SentimentClient;
use crate::error::{Result, SenseError};
use crate::review::{
    AggregatedRating, Aspect, RatedReview, ReviewSubmission, SentimentDistribution,
    SentimentLabel,
};

/// Score of a single review on the 0–10 scale.
pub fn review_score(label: SentimentLabel, confidence: f64) -> f64 {
    match label {
        SentimentLabel::Positive => 7.0 + confidence * 3.0,
        SentimentLabel::Negative => 3.0 * (1.0 - confidence),
        SentimentLabel::Neutral => 3.0 + confidence * 4.0,
    }
}

/// `Σ(score·c) / Σc` over reviews with a label and a non-zero confidence; 0 without weight.
pub fn aggregate_score(reviews: &[RatedReview]) -> f64 {
    let mut total_score = 0.0;
    let mut total_weight = 0.0;

    for r in reviews {
        let (Some(label), Some(c)) = (r.sentiment, r.confidence) else {
            continue;
        };
        if c <= 0.0 || !c.is_finite() {
            continue;
        }
        total_score += review_score(label, c) * c;
        total_weight += c;
    }

    if total_weight > 0.0 {
        (total_score / total_weight).clamp(0.0, 10.0)
    } else {
        0.0
    }
}

/// Counts canonical labels; failed items are left out.
pub fn sentiment_distribution(reviews: &[RatedReview]) -> SentimentDistribution {
    let mut dist = SentimentDistribution::default();
    for label in reviews.iter().filter_map(|r| r.sentiment) {
        dist.record(label);
    }
    dist
}

/// Mean aspect score per aspect, scaled to 0–10.
pub fn aspect_averages(reviews: &[RatedReview]) -> BTreeMap<Aspect, f64> {
    let mut acc: BTreeMap<Aspect, (f64, usize)> = BTreeMap::new();
    for aspects in reviews.iter().filter_map(|r| r.aspect_scores.as_ref()) {
        for (aspect, s) in aspects {
            let e = acc.entry(aspect.clone()).or_insert((0.0, 0));
            e.0 += s.score;
            e.1 += 1;
        }
    }
    acc.into_iter()
        .map(|(aspect, (sum, n))| (aspect, sum / n as f64 * 10.0))
        .collect()
}

/// Five-star rendering of a 0–10 score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Stars {
    pub full: u8,
    pub half: u8,
    pub empty: u8,
}

pub fn stars(score: f64) -> Stars {
    let score = if score.is_finite() { score.clamp(0.0, 10.0) } else { 0.0 };
    let full = ((score / 2.0).floor() as u8).min(5);
    let half = u8::from(full < 5 && score % 2.0 >= 0.5);
    Stars {
        full,
        half,
        empty: 5 - full - half,
    }
}

/// The review set for one title, with its derived aggregate kept in sync.
#[derive(Debug, Clone)]
pub struct AggregationSession {
    movie_title: String,
    reviews: Vec<RatedReview>,
    score: f64,
    distribution: SentimentDistribution,
}

impl AggregationSession {
    pub fn new(movie_title: impl Into<String>) -> Self {
        Self {
            movie_title: movie_title.into(),
            reviews: Vec::new(),
            score: 0.0,
            distribution: SentimentDistribution::default(),
        }
    }

    pub fn movie_title(&self) -> &str {
        &self.movie_title
    }

    pub fn reviews(&self) -> &[RatedReview] {
        &self.reviews
    }

    pub fn add_review(&mut self, reviewer_name: impl Into<String>, review: impl Into<String>) -> Uuid {
        let item = RatedReview::pending(reviewer_name, review);
        let id = item.id;
        self.reviews.push(item);
        self.recompute();
        id
    }

    pub fn remove_review(&mut self, id: Uuid) -> bool {
        let before = self.reviews.len();
        self.reviews.retain(|r| r.id != id);
        let removed = self.reviews.len() != before;
        if removed {
            self.recompute();
        }
        removed
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn distribution(&self) -> SentimentDistribution {
        self.distribution
    }

    pub fn failures(&self) -> usize {
        self.reviews.iter().filter(|r| r.is_failed()).count()
    }

    fn recompute(&mut self) {
        self.score = aggregate_score(&self.reviews);
        self.distribution = sentiment_distribution(&self.reviews);
    }

    /// Analyze every review concurrently; per-item failures are recorded, not raised.
    /// Returns the number of failed items.
    pub async fn analyze(&mut self, client: &SentimentClient) -> Result<usize> {
        let title = self.movie_title.trim().to_string();
        if title.is_empty() {
            return Err(SenseError::Validation("movie title is required".into()));
        }
        if self.reviews.is_empty() {
            return Err(SenseError::Validation("at least one review is required".into()));
        }
        if self.reviews.iter().any(|r| r.review.trim().is_empty()) {
            return Err(SenseError::Validation("all review fields are required".into()));
        }

        let submissions = self
            .reviews
            .iter()
            .map(|r| ReviewSubmission::new(r.review.clone()).titled(title.clone()))
            .collect();
        let outcomes = client.analyze_many(submissions).await;

        let pending = std::mem::take(&mut self.reviews);
        self.reviews = pending
            .into_iter()
            .zip(outcomes)
            .map(|(item, outcome)| match outcome {
                Ok(a) => item.succeeded(&a.result),
                Err(e) => item.failed(format!("Analysis failed: {e}")),
            })
            .collect();
        self.recompute();

        let failed = self.failures();
        info!(
            target: "aggregate",
            title = %title,
            reviews = self.reviews.len(),
            failed,
            score = self.score,
            "aggregation complete"
        );
        Ok(failed)
    }

    /// Snapshot for persistence. `review_count` counts successfully analyzed reviews.
    pub fn to_rating(&self) -> AggregatedRating {
        AggregatedRating {
            id: Uuid::new_v4(),
            movie_title: self.movie_title.trim().to_string(),
            aggregate_score: self.score,
            review_count: self.distribution.total(),
            sentiment_distribution: self.distribution,
            aspect_averages: aspect_averages(&self.reviews),
            reviews: self.reviews.clone(),
            timestamp: Utc::now(),
        }
    }
}
