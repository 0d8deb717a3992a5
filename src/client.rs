//! # Sentiment Client
//! Tiered analysis: each configured backend is tried in order (primary endpoint,
//! fallback endpoint, local heuristic) and the first success wins. An error reaches
//! the caller only when every tier failed; it is the last tier's error.
//!
//! No caching or deduplication across calls.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::SenseConfig;
use crate::error::{Result, SenseError};
use crate::metrics::{ANALYSES_TOTAL, ANALYSIS_FAILED_TOTAL, ANALYSIS_MS, TIER_FAILURES_TOTAL};
use crate::mock;
use crate::review::{ReviewSubmission, SentimentResponse, SentimentResult};
use crate::telemetry::anon_hash;

/// One tier of the chain.
#[async_trait]
pub trait SentimentBackend: Send + Sync {
    async fn analyze(&self, submission: &ReviewSubmission) -> Result<SentimentResult>;
    /// Tier name for logs, metrics and the `tier` field of responses.
    fn name(&self) -> &str;
}

/// Remote `/analyze`-compatible endpoint.
pub struct HttpBackend {
    name: String,
    url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("moviesense/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .build()
            .map_err(|e| SenseError::Config(format!("http client: {e}")))?;
        Ok(Self {
            name: name.into(),
            url: url.into(),
            timeout,
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, e: reqwest::Error) -> SenseError {
        if e.is_timeout() {
            SenseError::Timeout {
                endpoint: self.url.clone(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            SenseError::Network(format!("{}: {e}", self.url))
        }
    }
}

#[async_trait]
impl SentimentBackend for HttpBackend {
    async fn analyze(&self, submission: &ReviewSubmission) -> Result<SentimentResult> {
        let resp = self
            .http
            .post(&self.url)
            .timeout(self.timeout)
            .json(submission)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SenseError::Network(format!(
                "{} answered HTTP {status}",
                self.url
            )));
        }

        let body: SentimentResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                SenseError::Upstream(format!("{}: unreadable body: {e}", self.url))
            }
        })?;
        SentimentResult::try_from(body)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Local keyword heuristic with a simulated latency.
pub struct MockBackend {
    delay: Duration,
}

impl MockBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SentimentBackend for MockBackend {
    async fn analyze(&self, submission: &ReviewSubmission) -> Result<SentimentResult> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(mock::analyze(&submission.review))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A result together with the tier that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    #[serde(flatten)]
    pub result: SentimentResult,
    pub tier: String,
}

#[derive(Clone)]
pub struct SentimentClient {
    tiers: Arc<Vec<Arc<dyn SentimentBackend>>>,
}

impl SentimentClient {
    pub fn new(tiers: Vec<Arc<dyn SentimentBackend>>) -> Self {
        Self {
            tiers: Arc::new(tiers),
        }
    }

    /// primary → fallback (if configured) → mock (if enabled).
    pub fn from_config(cfg: &SenseConfig) -> Result<Self> {
        let mut tiers: Vec<Arc<dyn SentimentBackend>> = Vec::with_capacity(3);
        tiers.push(Arc::new(HttpBackend::new(
            "primary",
            cfg.primary_url.clone(),
            cfg.primary_timeout(),
        )?));
        if let Some(url) = &cfg.fallback_url {
            tiers.push(Arc::new(HttpBackend::new(
                "fallback",
                url.clone(),
                cfg.fallback_timeout(),
            )?));
        }
        if cfg.mock_enabled {
            tiers.push(Arc::new(MockBackend::new(cfg.mock_delay())));
        }
        Ok(Self::new(tiers))
    }

    pub fn tier_names(&self) -> Vec<String> {
        self.tiers.iter().map(|t| t.name().to_string()).collect()
    }

    pub async fn analyze(&self, submission: &ReviewSubmission) -> Result<Analysis> {
        submission.validate()?;

        let id = anon_hash(&submission.review);
        let started = Instant::now();
        let mut last_err: Option<SenseError> = None;

        for tier in self.tiers.iter() {
            match tier.analyze(submission).await {
                Ok(result) => {
                    let ms = started.elapsed().as_millis() as u64;
                    counter!(ANALYSES_TOTAL, "tier" => tier.name().to_string()).increment(1);
                    histogram!(ANALYSIS_MS).record(ms as f64);
                    info!(
                        target: "client",
                        review = %id,
                        tier = tier.name(),
                        sentiment = %result.sentiment,
                        confidence = result.confidence,
                        ms,
                        "analysis succeeded"
                    );
                    return Ok(Analysis {
                        result,
                        tier: tier.name().to_string(),
                    });
                }
                Err(e) if e.is_recoverable() => {
                    counter!(
                        TIER_FAILURES_TOTAL,
                        "tier" => tier.name().to_string(),
                        "kind" => e.kind()
                    )
                    .increment(1);
                    warn!(target: "client", review = %id, tier = tier.name(), error = %e, "tier failed; trying next");
                    last_err = Some(e);
                }
                Err(e) => {
                    counter!(ANALYSIS_FAILED_TOTAL).increment(1);
                    return Err(e);
                }
            }
        }

        counter!(ANALYSIS_FAILED_TOTAL).increment(1);
        let err = last_err
            .unwrap_or_else(|| SenseError::Config("no sentiment backends configured".into()));
        warn!(target: "client", review = %id, error = %err, "all tiers failed");
        Err(err)
    }

    /// Concurrent fan-out; one task per submission, joined when all settle.
    /// Output order matches input order and one failure never cancels the others.
    pub async fn analyze_many(&self, submissions: Vec<ReviewSubmission>) -> Vec<Result<Analysis>> {
        let n = submissions.len();
        let mut set = JoinSet::new();
        for (i, sub) in submissions.into_iter().enumerate() {
            let client = self.clone();
            set.spawn(async move { (i, client.analyze(&sub).await) });
        }

        let mut slots: Vec<Option<Result<Analysis>>> = (0..n).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((i, res)) => slots[i] = Some(res),
                Err(e) => debug!(target: "client", error = %e, "analysis task aborted"),
            }
        }

        slots
            .into_iter()
            .map(|s| s.unwrap_or_else(|| Err(SenseError::Upstream("analysis task aborted".into()))))
            .collect()
    }
}
