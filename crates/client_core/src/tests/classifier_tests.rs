use super::*;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn classify_ok(
    State(state): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.requests.lock().await.push((auth, body));
    Json(serde_json::json!([[
        {"label": "POSITIVE", "score": 0.98},
        {"label": "NEGATIVE", "score": 0.02}
    ]]))
}

async fn spawn_classifier_server() -> (String, Recorded) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/ok", post(classify_ok))
        .route(
            "/unauthorized",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({"error": "invalid token"})),
                )
            }),
        )
        .route(
            "/loading",
            post(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({"error": "Model is currently loading", "estimated_time": 20.0})),
                )
            }),
        )
        .route(
            "/rate_limited",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        )
        .route("/garbage", post(|| async { "<html>not json</html>" }))
        .with_state(recorded.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), recorded)
}

#[tokio::test]
async fn posts_inputs_and_returns_raw_json() {
    let (base, recorded) = spawn_classifier_server().await;
    let classifier = HttpClassifier::new(format!("{base}/ok"));

    let value = classifier
        .classify("What a film", None)
        .await
        .expect("classify");

    assert!(value.is_array());
    let requests = recorded.requests.lock().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, None);
    assert_eq!(requests[0].1, serde_json::json!({"inputs": "What a film"}));
}

#[tokio::test]
async fn attaches_bearer_token_only_when_present() {
    let (base, recorded) = spawn_classifier_server().await;
    let classifier = HttpClassifier::new(format!("{base}/ok"));

    classifier
        .classify("one", Some("hf_secret"))
        .await
        .expect("classify");
    classifier.classify("two", Some("   ")).await.expect("classify");

    let requests = recorded.requests.lock().await;
    assert_eq!(requests[0].0.as_deref(), Some("Bearer hf_secret"));
    assert_eq!(requests[1].0, None);
}

#[tokio::test]
async fn unauthorized_includes_guidance_and_body_detail() {
    let (base, _) = spawn_classifier_server().await;
    let classifier = HttpClassifier::new(format!("{base}/unauthorized"));

    let err = classifier.classify("x", None).await.expect_err("must fail");

    assert_eq!(
        err,
        AnalysisError::Api {
            status: 401,
            detail: Some("invalid token".into()),
        }
    );
    let text = err.to_string();
    assert!(text.contains("invalid or missing API token"), "{text}");
    assert!(text.contains("invalid token"), "{text}");
}

#[tokio::test]
async fn model_loading_is_reported_as_retryable() {
    let (base, _) = spawn_classifier_server().await;
    let classifier = HttpClassifier::new(format!("{base}/loading"));

    let err = classifier.classify("x", None).await.expect_err("must fail");

    assert!(matches!(err, AnalysisError::Api { status: 503, .. }));
    assert!(err.to_string().contains("Model is currently loading"));
}

#[tokio::test]
async fn unparseable_error_body_is_ignored() {
    let (base, _) = spawn_classifier_server().await;
    let classifier = HttpClassifier::new(format!("{base}/rate_limited"));

    let err = classifier.classify("x", None).await.expect_err("must fail");

    assert_eq!(
        err,
        AnalysisError::Api {
            status: 429,
            detail: None,
        }
    );
}

#[tokio::test]
async fn non_json_success_body_is_invalid_response() {
    let (base, _) = spawn_classifier_server().await;
    let classifier = HttpClassifier::new(format!("{base}/garbage"));

    let err = classifier.classify("x", None).await.expect_err("must fail");

    assert!(matches!(err, AnalysisError::InvalidResponse(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let classifier = HttpClassifier::new(format!("http://{addr}/ok"));

    let err = classifier.classify("x", None).await.expect_err("must fail");

    assert!(matches!(err, AnalysisError::Network(_)), "{err:?}");
}

#[test]
fn error_detail_only_accepts_textual_error_fields() {
    assert_eq!(
        error_detail(r#"{"error":"boom"}"#).as_deref(),
        Some("boom")
    );
    assert_eq!(error_detail(r#"{"error":["a","b"]}"#), None);
    assert_eq!(error_detail("plain text"), None);
}
