//! review.rs — review submissions, sentiment results and the records kept in history.
//!
//! Wire shapes follow the upstream `/analyze` contract (`snake_case` result fields) and
//! the persisted history/ratings documents (`camelCase`, ISO-8601 timestamps).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Result, SenseError};

/// Text + optional title as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub review: String,
    #[serde(
        rename = "movieTitle",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub movie_title: Option<String>,
}

/// Missing and `null` text both read as empty, so validation reports them.
pub(crate) fn null_as_empty<'de, D>(d: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl ReviewSubmission {
    pub fn new(review: impl Into<String>) -> Self {
        Self {
            review: review.into(),
            movie_title: None,
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.movie_title = Some(title.into());
        self
    }

    /// Empty or whitespace-only review text is rejected.
    pub fn validate(&self) -> Result<()> {
        if self.review.trim().is_empty() {
            return Err(SenseError::Validation(
                "review text is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Title with surrounding whitespace removed; `None` when blank.
    pub fn title(&self) -> Option<&str> {
        self.movie_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Case-insensitive parse; anything outside the three canonical labels is `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "positive" => Some(Self::Positive),
            "negative" => Some(Self::Negative),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aspect key of an aspect analysis. Known buckets are closed variants; keys an
/// upstream model invents are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Aspect {
    ActingQuality,
    PlotStory,
    VisualElements,
    EmotionalImpact,
    Direction,
    General,
    Other(String),
}

impl Aspect {
    pub fn as_str(&self) -> &str {
        match self {
            Aspect::ActingQuality => "Acting Quality",
            Aspect::PlotStory => "Plot & Story",
            Aspect::VisualElements => "Visual Elements",
            Aspect::EmotionalImpact => "Emotional Impact",
            Aspect::Direction => "Direction",
            Aspect::General => "General",
            Aspect::Other(name) => name.as_str(),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "Acting Quality" => Aspect::ActingQuality,
            "Plot & Story" => Aspect::PlotStory,
            "Visual Elements" => Aspect::VisualElements,
            "Emotional Impact" => Aspect::EmotionalImpact,
            "Direction" => Aspect::Direction,
            "General" => Aspect::General,
            other => Aspect::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Aspect {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Aspect {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Aspect::from_name(&name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectScore {
    pub score: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
}

pub type AspectAnalysis = BTreeMap<Aspect, AspectScore>;

/// Outcome of one analysis, whichever backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: SentimentLabel,
    /// In <0.0, 1.0>.
    pub confidence: f64,
    #[serde(default)]
    pub key_phrases: Vec<String>,
    #[serde(default)]
    pub aspect_analysis: AspectAnalysis,
    /// Model variant reported by the producer ("full_model", "lightweight", "mock").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl SentimentResult {
    pub fn new(sentiment: SentimentLabel, confidence: f64) -> Self {
        Self {
            sentiment,
            confidence: clamp01(confidence),
            key_phrases: Vec::new(),
            aspect_analysis: AspectAnalysis::new(),
            method: None,
        }
    }

    pub fn with_key_phrases(mut self, phrases: Vec<String>) -> Self {
        self.key_phrases = phrases;
        self
    }

    pub fn with_aspect(mut self, aspect: Aspect, score: f64, keywords: Vec<String>) -> Self {
        self.aspect_analysis.insert(aspect, AspectScore { score, keywords });
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

/// Raw upstream answer. Every field is optional because the Flask service answers
/// errors with the same envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SentimentResponse {
    #[serde(default)]
    pub sentiment: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub key_phrases: Option<Vec<String>>,
    #[serde(default)]
    pub aspect_analysis: Option<AspectAnalysis>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
}

impl TryFrom<SentimentResponse> for SentimentResult {
    type Error = SenseError;

    fn try_from(raw: SentimentResponse) -> Result<Self> {
        let label = raw.sentiment.as_deref().and_then(SentimentLabel::parse);
        let (sentiment, confidence) = match (label, raw.confidence) {
            (Some(l), Some(c)) if c.is_finite() => (l, c),
            _ => {
                let why = raw
                    .error
                    .unwrap_or_else(|| "missing sentiment or confidence".to_string());
                return Err(SenseError::Upstream(why));
            }
        };
        if let Some(err) = raw.error {
            return Err(SenseError::Upstream(err));
        }

        Ok(SentimentResult {
            sentiment,
            confidence: clamp01(confidence),
            key_phrases: raw.key_phrases.unwrap_or_default(),
            aspect_analysis: raw.aspect_analysis.unwrap_or_default(),
            method: raw.method,
        })
    }
}

/// One entry of the review history. Immutable; only ever deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewWithResult {
    pub id: Uuid,
    pub review: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movie_title: Option<String>,
    pub sentiment: SentimentLabel,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
}

impl ReviewWithResult {
    pub fn new(submission: &ReviewSubmission, result: &SentimentResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            review: submission.review.clone(),
            movie_title: submission.title().map(str::to_string),
            sentiment: result.sentiment,
            confidence: result.confidence,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    pub fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Positive => self.positive += 1,
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// A review inside an aggregation, with its per-item outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatedReview {
    pub id: Uuid,
    #[serde(default)]
    pub reviewer_name: String,
    pub review: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<SentimentLabel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_scores: Option<AspectAnalysis>,
}

impl RatedReview {
    pub fn pending(reviewer_name: impl Into<String>, review: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reviewer_name: reviewer_name.into(),
            review: review.into(),
            sentiment: None,
            confidence: None,
            error: None,
            aspect_scores: None,
        }
    }

    pub fn succeeded(mut self, result: &SentimentResult) -> Self {
        self.sentiment = Some(result.sentiment);
        self.confidence = Some(result.confidence);
        self.aspect_scores = Some(result.aspect_analysis.clone());
        self.error = None;
        self
    }

    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.sentiment = None;
        self.confidence = Some(0.0);
        self.aspect_scores = None;
        self.error = Some(error.into());
        self
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Persisted aggregate for one movie title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedRating {
    pub id: Uuid,
    pub movie_title: String,
    /// In <0.0, 10.0>.
    pub aggregate_score: f64,
    pub review_count: usize,
    pub sentiment_distribution: SentimentDistribution,
    #[serde(default)]
    pub aspect_averages: BTreeMap<Aspect, f64>,
    #[serde(default)]
    pub reviews: Vec<RatedReview>,
    pub timestamp: DateTime<Utc>,
}

pub(crate) fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
