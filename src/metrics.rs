use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::get,
    Router,
};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::warn;

pub const ANALYSES_TOTAL: &str = "moviesense_analyses_total";
pub const TIER_FAILURES_TOTAL: &str = "moviesense_tier_failures_total";
pub const ANALYSIS_FAILED_TOTAL: &str = "moviesense_analysis_failed_total";
pub const STORAGE_ERRORS_TOTAL: &str = "moviesense_storage_errors_total";
pub const ANALYSIS_MS: &str = "moviesense_analysis_ms";

static HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

pub struct Metrics {
    pub handle: Option<PrometheusHandle>,
}

impl Metrics {
    /// Install the Prometheus recorder once per process. Later calls reuse it; if another
    /// recorder already owns the process, `/metrics` renders an empty body.
    pub fn init() -> Self {
        let handle = HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(h) => {
                    describe();
                    Some(h)
                }
                Err(e) => {
                    warn!(target: "metrics", error = %e, "prometheus recorder not installed");
                    None
                }
            })
            .clone();
        Self { handle }
    }

    /// `/metrics` in the text exposition format; empty body without a recorder.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(render))
            .with_state(self.handle.clone())
    }
}

const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

async fn render(State(handle): State<Option<PrometheusHandle>>) -> impl IntoResponse {
    let body = handle.as_ref().map(PrometheusHandle::render).unwrap_or_default();
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body)
}

fn describe() {
    describe_counter!(ANALYSES_TOTAL, "Successful analyses, labelled by tier.");
    describe_counter!(TIER_FAILURES_TOTAL, "Failed tier attempts, labelled by tier and kind.");
    describe_counter!(ANALYSIS_FAILED_TOTAL, "Analyses where every tier failed.");
    describe_counter!(STORAGE_ERRORS_TOTAL, "Swallowed persistence errors.");
    describe_histogram!(ANALYSIS_MS, "End-to-end analysis time in milliseconds.");
}
