//! HTTP routes of the demo server.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use streamfwd_server::{StreamForwarder, StreamReceiver, stream_response, unary_response};
use tokio_util::sync::CancellationToken;

use crate::feed::{self, PodEvent};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<StreamForwarder<PodEvent>>,
    pub shutdown: CancellationToken,
    pub feed_period: Duration,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/pods/watch", get(watch_pods))
        .route("/v1/pods/{name}", get(get_pod))
        .with_state(state)
}

async fn watch_pods(State(state): State<AppState>, headers: HeaderMap, uri: Uri) -> Response {
    stream_response(
        Arc::clone(&state.forwarder),
        &headers,
        &uri,
        StreamReceiver::new(feed::watch(state.feed_period)),
        &state.shutdown,
    )
}

async fn get_pod(Path(name): Path<String>, headers: HeaderMap, uri: Uri) -> Response {
    match feed::lookup(&name) {
        Some(pod) => unary_response(&headers, &uri, &pod),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("pod {name} not found") })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::http::header::{ACCEPT, CONTENT_TYPE};
    use futures::StreamExt;
    use streamfwd_server::ForwarderConfig;
    use tower::ServiceExt;

    fn app(shutdown: &CancellationToken) -> Router {
        let forwarder = StreamForwarder::new(ForwarderConfig::default())
            .with_message_key(Arc::new(feed::pod_key));
        build_router(AppState {
            forwarder: Arc::new(forwarder),
            shutdown: shutdown.clone(),
            feed_period: Duration::from_millis(5),
        })
    }

    #[tokio::test]
    async fn unary_pod_with_fields() {
        let shutdown = CancellationToken::new();
        let response = app(&shutdown)
            .oneshot(
                Request::builder()
                    .uri("/v1/pods/api-1?fields=metadata.name")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"metadata":{"name":"api-1"}}"#);
    }

    #[tokio::test]
    async fn unknown_pod_is_404() {
        let shutdown = CancellationToken::new();
        let response = app(&shutdown)
            .oneshot(Request::builder().uri("/v1/pods/db-0").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn watch_streams_sse_until_shutdown() {
        let shutdown = CancellationToken::new();
        let response = app(&shutdown)
            .oneshot(
                Request::builder()
                    .uri("/v1/pods/watch?fields=result.metadata.name")
                    .header(ACCEPT, "text/event-stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        assert!(
            first.starts_with(b"data: {\"result\":{\"metadata\":{\"name\":\"api-0\"}}} \n\n"),
            "unexpected first chunk: {first:?}"
        );

        shutdown.cancel();
        while let Some(chunk) = body.next().await {
            assert!(chunk.is_ok());
        }
    }
}
