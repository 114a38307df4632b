//! Field-projecting message marshaler.
//!
//! Serializes one message to JSON, prunes it with the request's
//! [`Projection`], and optionally wraps the result in an SSE `data:` frame.

use serde::Serialize;
use streamfwd_core::{Node, Projection};

use crate::errors::Result;

/// Content type of an SSE response.
pub const SSE_CONTENT_TYPE: &str = "text/event-stream";
/// Content type of a JSON response.
pub const JSON_CONTENT_TYPE: &str = "application/json";

const SSE_PREFIX: &[u8] = b"data: ";
// The space before the blank line is part of the wire format existing
// consumers parse; keep it.
const SSE_SUFFIX: &[u8] = b" \n\n";
const JSON_DELIMITER: &[u8] = b"\n";
const NO_DELIMITER: &[u8] = b"";

/// Envelope every streamed message is wrapped in before marshaling.
#[derive(Debug, Serialize)]
pub struct ResultEnvelope<'a, M> {
    /// The streamed message.
    pub result: &'a M,
}

impl<'a, M> ResultEnvelope<'a, M> {
    /// Wrap a message.
    pub fn new(result: &'a M) -> Self {
        Self { result }
    }
}

/// Serializes messages for one request.
#[derive(Debug, Clone, Default)]
pub struct MessageMarshaler {
    projection: Projection,
    sse: bool,
}

impl MessageMarshaler {
    /// Create a marshaler with an explicit projection.
    pub fn new(projection: Projection, sse: bool) -> Self {
        Self { projection, sse }
    }

    /// Create a marshaler from a raw `fields` query value.
    pub fn from_fields(fields: Option<&str>, sse: bool) -> Self {
        Self::new(Projection::from_query(fields), sse)
    }

    /// Whether output is framed as SSE events.
    pub fn is_sse(&self) -> bool {
        self.sse
    }

    /// The active projection.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Response content type for this framing.
    pub fn content_type(&self) -> &'static str {
        if self.sse {
            SSE_CONTENT_TYPE
        } else {
            JSON_CONTENT_TYPE
        }
    }

    /// Bytes written after each streamed chunk.
    ///
    /// SSE frames terminate themselves; JSON chunks are newline delimited.
    pub fn delimiter(&self) -> &'static [u8] {
        if self.sse { NO_DELIMITER } else { JSON_DELIMITER }
    }

    /// Serialize `value`, applying the projection and SSE framing.
    ///
    /// Without a projection the value is serialized directly, so struct field
    /// order is preserved. With one, the projected tree is emitted with
    /// sorted map keys.
    pub fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let payload = if self.projection.is_empty() {
            serde_json::to_vec(value)?
        } else {
            let mut node = Node::from_serialize(value)?;
            self.projection.apply(&mut node);
            node.to_json_vec()?
        };

        if self.sse {
            Ok(sse_frame(&payload))
        } else {
            Ok(payload)
        }
    }
}

fn sse_frame(payload: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(SSE_PREFIX.len() + payload.len() + SSE_SUFFIX.len());
    framed.extend_from_slice(SSE_PREFIX);
    framed.extend_from_slice(payload);
    framed.extend_from_slice(SSE_SUFFIX);
    framed
}
