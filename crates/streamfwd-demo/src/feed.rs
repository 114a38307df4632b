//! Synthetic pod watch feed.
//!
//! Stands in for a server-streaming upstream. Each pod reports the same phase
//! on consecutive rounds before moving on, so the dedup layer has repeats to
//! suppress.

use std::convert::Infallible;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde::Serialize;
use streamfwd_server::BoxError;

const NAMESPACE: &str = "default";
const PODS: [&str; 3] = ["api-0", "api-1", "worker-0"];
const PHASES: [&str; 3] = ["Pending", "Running", "Succeeded"];

/// One watch event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodEvent {
    pub metadata: PodMetadata,
    pub status: PodStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodMetadata {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    pub phase: String,
    pub restart_count: usize,
}

/// The `seq`-th event of the feed.
pub fn pod_at(seq: usize) -> PodEvent {
    let round = seq / PODS.len();
    PodEvent {
        metadata: PodMetadata {
            name: PODS[seq % PODS.len()].to_string(),
            namespace: NAMESPACE.to_string(),
        },
        status: PodStatus {
            phase: PHASES[(round / 2) % PHASES.len()].to_string(),
            restart_count: round / (2 * PHASES.len()),
        },
    }
}

/// Current state of a pod by name.
pub fn lookup(name: &str) -> Option<PodEvent> {
    PODS.iter().position(|p| *p == name).map(pod_at)
}

/// Dedup key: `namespace/name`.
pub fn pod_key(pod: &PodEvent) -> Result<String, BoxError> {
    Ok(format!("{}/{}", pod.metadata.namespace, pod.metadata.name))
}

/// Endless feed emitting one event per `period`, the first immediately.
pub fn watch(period: Duration) -> BoxStream<'static, Result<PodEvent, Infallible>> {
    stream::unfold((0usize, tokio::time::interval(period)), |(seq, mut ticker)| async move {
        let _ = ticker.tick().await;
        Some((Ok(pod_at(seq)), (seq + 1, ticker)))
    })
    .boxed()
}
