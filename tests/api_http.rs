// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// The primary tier points at a closed local port, so every analysis lands on the
// in-process mock tier (zero delay) and stays deterministic.

use std::path::Path;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _; // for `oneshot`

use moviesense::{router, AppState, SenseConfig};

const BODY_LIMIT: usize = 1024 * 1024;
const CLOSED_PORT_URL: &str = "http://127.0.0.1:9/analyze";

fn offline_config(dir: &Path, mock_enabled: bool) -> SenseConfig {
    SenseConfig {
        primary_url: CLOSED_PORT_URL.to_string(),
        fallback_url: None,
        upstream_url: CLOSED_PORT_URL.to_string(),
        primary_timeout_ms: 500,
        fallback_timeout_ms: 500,
        mock_enabled,
        mock_delay_ms: 0,
        storage_dir: dir.to_path_buf(),
    }
}

fn test_router(dir: &Path) -> Router {
    let state = AppState::from_config(&offline_config(dir, true)).expect("app state");
    router(state)
}

async fn send(app: &Router, method: &str, uri: &str, payload: Option<Json>) -> (StatusCode, Json) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match payload {
        Some(p) => {
            req = req.header("content-type", "application/json");
            Body::from(p.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(req.body(body).expect("build request"))
        .await
        .expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let v = if bytes.is_empty() {
        Json::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Json::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, v)
}

#[tokio::test]
async fn health_lists_configured_tiers() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["tiers"], json!(["primary", "mock"]));
}

#[tokio::test]
async fn analyze_falls_back_to_mock_and_records_history() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(
        &app,
        "POST",
        "/analyze",
        Some(json!({ "review": "I love the acting", "movieTitle": "Heat" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["sentiment"], "positive");
    assert_eq!(v["confidence"], 0.85);
    assert_eq!(v["tier"], "mock");
    assert_eq!(v["method"], "mock");
    assert!(v["aspect_analysis"]["Acting Quality"].is_object());

    let (_, hist) = send(&app, "GET", "/history", None).await;
    let hist = hist.as_array().expect("history array");
    assert_eq!(hist.len(), 1);
    assert_eq!(hist[0]["movieTitle"], "Heat");
    assert!(tmp.path().join("reviewHistory.json").exists());
}

#[tokio::test]
async fn analyze_rejects_blank_review_without_touching_history() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(&app, "POST", "/analyze", Some(json!({ "review": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(v["error"].as_str().is_some());

    let (_, hist) = send(&app, "GET", "/history", None).await;
    assert_eq!(hist, json!([]));
}

#[tokio::test]
async fn analyze_reports_bad_gateway_when_every_tier_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let state = AppState::from_config(&offline_config(tmp.path(), false)).unwrap();
    let app = router(state);

    let (status, v) = send(&app, "POST", "/analyze", Some(json!({ "review": "great" }))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(v["error"].as_str().is_some());
}

#[tokio::test]
async fn history_entries_can_be_deleted_once() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    send(&app, "POST", "/analyze", Some(json!({ "review": "awful pacing" }))).await;
    let (_, hist) = send(&app, "GET", "/history", None).await;
    let id = hist[0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/history/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/history/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn lightweight_uses_the_lexicon() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(
        &app,
        "POST",
        "/analyze/lightweight",
        Some(json!({ "review": "Brilliant acting and a wonderful story" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["method"], "lightweight");
    assert_eq!(v["sentiment"], "positive");
    assert_eq!(v["confidence"], 1.0);

    let (status, _) = send(&app, "POST", "/analyze/lightweight", Some(json!({ "review": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn compare_needs_two_items_and_keeps_order() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, _) = send(&app, "POST", "/compare", Some(json!({ "items": [{ "review": "great" }] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, v) = send(
        &app,
        "POST",
        "/compare",
        Some(json!({ "items": [
            { "review": "great fun", "movieTitle": "A" },
            { "review": "terrible", "movieTitle": "B" },
            { "review": "it exists", "movieTitle": "C" }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["failed"], 0);
    let labels: Vec<&str> = v["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["sentiment"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["positive", "negative", "neutral"]);
}

#[tokio::test]
async fn batch_skips_blank_rows_and_names_untitled_ones() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(
        &app,
        "POST",
        "/batch",
        Some(json!({ "rows": [
            { "review": "amazing" },
            { "review": "" },
            { "review": "bad", "movieTitle": "Cats" }
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["skipped"], 1);
    assert_eq!(v["failed"], 0);
    assert_eq!(v["results"][0]["movieTitle"], "Review #1");
    assert_eq!(v["results"][1]["movieTitle"], "Cats");

    let (_, hist) = send(&app, "GET", "/history", None).await;
    assert_eq!(hist.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ratings_are_aggregated_persisted_and_deletable() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(
        &app,
        "POST",
        "/ratings",
        Some(json!({
            "movieTitle": "Alien",
            "reviews": [
                { "reviewerName": "kim", "review": "Amazing tension" },
                { "reviewerName": "lee", "review": "It was fine" }
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {v}");
    assert_eq!(v["saved"], true);
    assert_eq!(v["failed"], 0);
    let rating = &v["rating"];
    assert_eq!(rating["reviewCount"], 2);
    assert_eq!(rating["sentimentDistribution"]["positive"], 1);
    assert_eq!(rating["sentimentDistribution"]["neutral"], 1);
    let score = rating["aggregateScore"].as_f64().unwrap();
    assert!((0.0..=10.0).contains(&score));

    let (_, all) = send(&app, "GET", "/ratings", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
    assert!(tmp.path().join("aggregatedRatings.json").exists());

    let id = rating["id"].as_str().unwrap();
    let (status, _) = send(&app, "DELETE", &format!("/ratings/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/ratings/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, all) = send(&app, "GET", "/ratings", None).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn rating_without_title_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, _) = send(
        &app,
        "POST",
        "/ratings",
        Some(json!({ "movieTitle": " ", "reviews": [{ "reviewerName": "a", "review": "ok" }] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_survives_a_restart() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let app = test_router(tmp.path());
        send(&app, "POST", "/analyze", Some(json!({ "review": "excellent score" }))).await;
    }
    let app = test_router(tmp.path());
    let (_, hist) = send(&app, "GET", "/history", None).await;
    assert_eq!(hist.as_array().unwrap().len(), 1);
    assert_eq!(hist[0]["review"], "excellent score");
}

#[tokio::test]
async fn proxy_failure_collapses_to_fixed_message() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (status, v) = send(&app, "POST", "/api/analyze-sentiment", Some(json!({ "review": "hi" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v, json!({ "error": "Failed to analyze sentiment" }));
}

#[tokio::test]
async fn metrics_endpoint_exposes_analysis_series() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    send(&app, "POST", "/analyze", Some(json!({ "review": "great" }))).await;
    let resp = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = String::from_utf8(body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap().to_vec()).unwrap();
    assert!(text.contains("moviesense_analyses_total"), "metrics body: {text}");
}

#[test]
fn shipped_config_file_parses() {
    let cfg = SenseConfig::load_from_file("config/moviesense.toml").expect("shipped config");
    assert_eq!(cfg, SenseConfig::default());
}

async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Json) {
    let mut req = Request::builder().method("POST").uri(uri);
    if let Some(ct) = content_type {
        req = req.header("content-type", ct);
    }
    let resp = app
        .clone()
        .oneshot(req.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    let v = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn proxy_answers_unparsable_bodies_with_the_fixed_message() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());
    let expected = json!({ "error": "Failed to analyze sentiment" });

    let (status, v) = send_raw(&app, "/api/analyze-sentiment", Some("application/json"), "{not json").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v, expected);

    let (status, v) = send_raw(&app, "/api/analyze-sentiment", None, "").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(v, expected);
}

#[tokio::test]
async fn missing_or_null_review_is_a_json_bad_request() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    for uri in ["/analyze", "/analyze/lightweight"] {
        for payload in [json!({ "movieTitle": "Heat" }), json!({ "review": null })] {
            let (status, v) = send(&app, "POST", uri, Some(payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert!(v["error"].as_str().is_some(), "{uri}: {v}");
        }
    }
}

#[tokio::test]
async fn malformed_json_bodies_keep_the_error_envelope() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    for uri in ["/analyze", "/compare", "/batch", "/ratings"] {
        let (status, v) = send_raw(&app, uri, Some("application/json"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(v["error"].as_str().is_some(), "{uri}");

        let (status, v) = send_raw(&app, uri, None, r#"{"review":"great"}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(v["error"].as_str().is_some(), "{uri}");
    }
}

#[tokio::test]
async fn saved_rating_exports_as_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let app = test_router(tmp.path());

    let (_, v) = send(
        &app,
        "POST",
        "/ratings",
        Some(json!({
            "movieTitle": "The Thing",
            "reviews": [{ "reviewerName": "Mac \"RJ\"", "review": "Great, \"chilling\" stuff" }]
        })),
    )
    .await;
    let id = v["rating"]["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(Request::get(format!("/ratings/{id}/export")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/csv; charset=utf-8");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"The_Thing_ratings.csv\""
    );
    let text = String::from_utf8(body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap().to_vec()).unwrap();
    assert_eq!(
        text,
        "Reviewer,Review Text,Sentiment,Confidence\n\"Mac \"\"RJ\"\"\",\"Great, \"\"chilling\"\" stuff\",positive,85.0%"
    );

    let missing = uuid::Uuid::new_v4();
    let (status, v) = send(&app, "GET", &format!("/ratings/{missing}/export"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(v["error"].as_str().is_some());
}

#[tokio::test]
async fn reload_picks_up_another_instance_writes() {
    let tmp = tempfile::tempdir().unwrap();
    let mine = test_router(tmp.path());
    let other = test_router(tmp.path());

    send(&other, "POST", "/analyze", Some(json!({ "review": "amazing score" }))).await;
    let (_, hist) = send(&mine, "GET", "/history", None).await;
    assert_eq!(hist, json!([]));

    let (status, v) = send(&mine, "POST", "/history/reload", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v, json!({ "reviews": 1, "ratings": 0 }));
    let (_, hist) = send(&mine, "GET", "/history", None).await;
    assert_eq!(hist.as_array().unwrap().len(), 1);
}
