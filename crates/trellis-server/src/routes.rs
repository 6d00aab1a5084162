//! HTTP surface: evaluation endpoint plus the two SSE streams.

use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::{Stream, StreamExt};
use tower_http::cors::CorsLayer;

use trellis::forth::value::Value;
use trellis::service::WorldHandle;

const MEMORY_STREAM_PERIOD: Duration = Duration::from_millis(100);

pub fn router(handle: WorldHandle) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:5173"),
            HeaderValue::from_static("http://localhost:5174"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/evaluate", post(evaluate))
        .route("/memory-stream", get(memory_stream))
        .route("/message-stream", get(message_stream))
        .layer(cors)
        .with_state(handle)
}

#[derive(Debug, Deserialize)]
struct EvaluateRequest {
    input: String,
}

#[derive(Debug, Serialize)]
struct EvaluateResponse {
    output: Vec<String>,
    stack: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn evaluate(
    State(handle): State<WorldHandle>,
    Json(request): Json<EvaluateRequest>,
) -> Json<EvaluateResponse> {
    match handle.evaluate(request.input).await {
        Ok(outcome) => Json(EvaluateResponse {
            output: outcome.output,
            stack: outcome.stack,
            error: None,
        }),
        Err(e) => {
            tracing::error!("evaluate failed: {e}");
            Json(EvaluateResponse {
                output: Vec::new(),
                stack: Vec::new(),
                error: Some(e.to_string()),
            })
        }
    }
}

/// Grid snapshots at 10 Hz.
async fn memory_stream(
    State(handle): State<WorldHandle>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = IntervalStream::new(tokio::time::interval(MEMORY_STREAM_PERIOD)).then(move |_| {
        let handle = handle.clone();
        async move {
            let snapshot = handle.snapshot().await.unwrap_or_default();
            Event::default().json_data(&snapshot)
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// UI events as they happen.
async fn message_stream(
    State(handle): State<WorldHandle>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(handle.subscribe_ui()).filter_map(|item| match item {
        Ok(event) => Some(Event::default().json_data(&event)),
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            tracing::warn!("message stream lagged, dropped {n} events");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use trellis::service::{spawn, ServiceConfig};

    fn test_router() -> Router {
        let handle = spawn(ServiceConfig {
            osc_host: "127.0.0.1".to_string(),
            osc_port: 9,
            start_clock: false,
            ..ServiceConfig::default()
        })
        .unwrap();
        router(handle)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn evaluate_returns_output_and_stack() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"input": "3 4 + ."}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({"output": ["7"], "stack": []}));
    }

    #[tokio::test]
    async fn evaluate_reports_user_errors_in_output() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/evaluate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"input": "zorp"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["output"], serde_json::json!(["Unknown word: zorp"]));
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn preflight_is_allowed_for_known_origin() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/evaluate")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .map(|v| v.to_str().unwrap()),
            Some("http://localhost:5173")
        );
    }

    #[tokio::test]
    async fn unknown_origin_gets_no_cors_headers() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/evaluate")
                    .header(header::ORIGIN, "http://evil.example")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn streams_respond_with_event_stream_content_type() {
        let response = test_router()
            .oneshot(
                Request::builder()
                    .uri("/memory-stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .map(|v| v.to_str().unwrap()),
            Some("text/event-stream")
        );
    }
}
