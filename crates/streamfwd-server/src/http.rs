//! axum glue: turn a forwarded stream or a single message into a response.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::io::ReaderStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::errors::ForwardError;
use crate::forwarder::{StreamForwarder, marshal_unary};
use crate::marshaler::JSON_CONTENT_TYPE;
use crate::negotiation::Negotiation;
use crate::receive::Receive;

/// Buffer between the forward task and the response body.
const BODY_PIPE_CAPACITY: usize = 64 * 1024;

/// Response body that cancels its stream context when dropped.
struct GuardedBody {
    inner: BoxStream<'static, std::io::Result<Bytes>>,
    _guard: DropGuard,
}

impl Stream for GuardedBody {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

/// Stream `recv` to the client as negotiated from `headers` and `uri`.
///
/// The forward runs on its own task under a child of `cancel`. Dropping the
/// response body (client gone) cancels it. A forward failure other than
/// cancellation surfaces as a body error, so the chunked response is aborted
/// rather than terminated cleanly.
pub fn stream_response<M, R>(
    forwarder: Arc<StreamForwarder<M>>,
    headers: &HeaderMap,
    uri: &Uri,
    recv: R,
    cancel: &CancellationToken,
) -> Response
where
    M: Serialize + Send + Sync + 'static,
    R: Receive<Message = M> + 'static,
{
    let negotiation = Negotiation::from_request(headers, uri);
    let response_headers = negotiation.response_headers();
    debug!(sse = negotiation.is_sse(), path = %uri.path(), "forwarding stream");

    let (reader, writer) = tokio::io::duplex(BODY_PIPE_CAPACITY);
    let (failed_tx, failed_rx) = oneshot::channel::<ForwardError>();
    let ctx = cancel.child_token();
    let guard = ctx.clone().drop_guard();

    let _forward = tokio::spawn(async move {
        if let Err(err) = forwarder.forward(&ctx, &negotiation, recv, writer).await {
            if !err.is_cancelled() {
                let _ = failed_tx.send(err);
            }
        }
    });

    let failure = stream::once(failed_rx).filter_map(|received| async move {
        received.ok().map(|err| Err(std::io::Error::other(err)))
    });
    let body = GuardedBody {
        inner: ReaderStream::new(reader).chain(failure).boxed(),
        _guard: guard,
    };

    let mut response = Body::from_stream(body).into_response();
    response.headers_mut().extend(response_headers);
    response
}

/// Serialize one message for a unary call, honoring `fields`.
///
/// Never SSE framed and never wrapped in a `result` envelope. A marshal
/// failure becomes a `500` with a JSON error body.
pub fn unary_response<M: Serialize + ?Sized>(headers: &HeaderMap, uri: &Uri, message: &M) -> Response {
    let negotiation = Negotiation::from_request(headers, uri);
    match marshal_unary(negotiation.projection(), message) {
        Ok(body) => (
            [(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE))],
            body,
        )
            .into_response(),
        Err(err) => {
            warn!(error = %err, path = %uri.path(), "failed to marshal unary response");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
