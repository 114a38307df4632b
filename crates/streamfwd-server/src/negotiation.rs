//! Per-request negotiation: SSE or chunked JSON, plus the field projection.

use axum::extract::Query;
use axum::http::header::{CONTENT_TYPE, TRANSFER_ENCODING, X_CONTENT_TYPE_OPTIONS};
use axum::http::{HeaderMap, HeaderValue, Uri, header::ACCEPT};
use serde::Deserialize;
use streamfwd_core::Projection;
use tracing::debug;

use crate::marshaler::{JSON_CONTENT_TYPE, MessageMarshaler, SSE_CONTENT_TYPE};

#[derive(Debug, Deserialize)]
struct FieldsQuery {
    fields: Option<String>,
}

/// What a request asked for.
#[derive(Debug, Clone, Default)]
pub struct Negotiation {
    sse: bool,
    projection: Projection,
}

impl Negotiation {
    /// Build from explicit parts.
    pub fn new(sse: bool, projection: Projection) -> Self {
        Self { sse, projection }
    }

    /// Read the `Accept` header and the `fields` query parameter.
    ///
    /// Only an exact `Accept: text/event-stream` selects SSE. An unparseable
    /// query string means no filtering.
    pub fn from_request(headers: &HeaderMap, uri: &Uri) -> Self {
        let sse = headers
            .get(ACCEPT)
            .is_some_and(|value| value.as_bytes() == SSE_CONTENT_TYPE.as_bytes());

        let fields = match Query::<FieldsQuery>::try_from_uri(uri) {
            Ok(Query(query)) => query.fields,
            Err(rejection) => {
                debug!(error = %rejection, "unparseable query, not filtering fields");
                None
            }
        };

        Self::new(sse, Projection::from_query(fields.as_deref()))
    }

    /// Whether SSE framing was negotiated.
    pub fn is_sse(&self) -> bool {
        self.sse
    }

    /// Requested projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Marshaler for streamed messages.
    pub fn marshaler(&self) -> MessageMarshaler {
        MessageMarshaler::new(self.projection.clone(), self.sse)
    }

    /// Headers to send before the first body byte.
    pub fn response_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if self.sse {
            let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static(SSE_CONTENT_TYPE));
            let _ = headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            let _ = headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
        } else {
            let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        }
        headers
    }
}
