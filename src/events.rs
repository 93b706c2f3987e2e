// Copyright 2026 Matchup Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed event bus for analysis progress.
//!
//! A `tokio::sync::broadcast` channel carrying [`AnalysisEvent`] values. The
//! REST SSE endpoint and any other consumer subscribe independently; with no
//! subscribers, events are silently dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Every event the analysis pipeline emits. Serialized to JSON for SSE.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AnalysisEvent {
    /// A new analysis job was accepted.
    JobSubmitted {
        job_id: String,
        url_a: String,
        url_b: String,
    },
    /// One page path was captured and probed successfully.
    PageCaptured {
        job_id: String,
        site: String,
        page: String,
        elapsed_ms: u64,
    },
    /// One page path failed; the walk continues without it.
    PageFailed {
        job_id: String,
        site: String,
        page: String,
        kind: String,
        error: String,
    },
    /// The job reached its `completed` terminal state.
    JobCompleted {
        job_id: String,
        matrix_entries: usize,
        elapsed_ms: u64,
    },
    /// The job reached its `failed` terminal state.
    JobFailed {
        job_id: String,
        error: String,
        elapsed_ms: u64,
    },
    /// The REST server came up.
    ServerStarted { version: String, port: u16 },
}

/// The central event bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AnalysisEvent>,
}

impl EventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event to all subscribers. Silently ignores if no subscribers.
    pub fn emit(&self, event: AnalysisEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.sender.subscribe()
    }
}

/// Check whether an event belongs to a specific job.
pub fn event_matches_job(event: &AnalysisEvent, job_id: &str) -> bool {
    match event {
        AnalysisEvent::JobSubmitted { job_id: j, .. }
        | AnalysisEvent::PageCaptured { job_id: j, .. }
        | AnalysisEvent::PageFailed { job_id: j, .. }
        | AnalysisEvent::JobCompleted { job_id: j, .. }
        | AnalysisEvent::JobFailed { job_id: j, .. } => j == job_id,
        // Server events reach every subscriber.
        AnalysisEvent::ServerStarted { .. } => true,
    }
}
