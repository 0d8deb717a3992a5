// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod lexicon;
pub mod metrics;
pub mod mock;
pub mod review;
pub mod service;
pub mod storage;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::client::{Analysis, SentimentBackend, SentimentClient};
pub use crate::config::SenseConfig;
pub use crate::error::{Result, SenseError};
pub use crate::service::MovieSense;
