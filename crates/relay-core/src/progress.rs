//! Throttled progress reporting.
//!
//! While a backend works, tool activity is turned into short status lines
//! ("Using Bash...") and pushed to a [`ProgressSink`] at most once per
//! [`PROGRESS_INTERVAL`].

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::harness::StreamEvent;

/// Minimum spacing between two delivered status lines.
pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(3);

/// Destination for progress status lines.
///
/// Delivery failures are logged and never affect the invocation.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, status: &str) -> Result<()>;
}

/// Sink that writes each status line to the tracing log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl ProgressSink for LogSink {
    async fn notify(&self, status: &str) -> Result<()> {
        info!(status, "agent progress");
        Ok(())
    }
}

#[async_trait]
impl ProgressSink for mpsc::Sender<String> {
    async fn notify(&self, status: &str) -> Result<()> {
        self.send(status.to_owned())
            .await
            .map_err(|_| anyhow::anyhow!("progress receiver dropped"))
    }
}

/// Per-invocation throttle state.
#[derive(Debug, Default)]
pub struct ProgressState {
    last_notified: Option<Instant>,
    tool_calls: u32,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tool calls observed so far.
    pub fn tool_calls(&self) -> u32 {
        self.tool_calls
    }

    /// Feed one event observed at `now`; returns a status line when one is
    /// due.
    ///
    /// Only tool activity produces status lines. The first one fires
    /// immediately, later ones only once [`PROGRESS_INTERVAL`] has elapsed
    /// since the last delivered line. Suppressed lines are dropped, not
    /// queued.
    pub fn observe(&mut self, event: &StreamEvent, now: Instant) -> Option<String> {
        let status = match event {
            StreamEvent::ToolInvoked { tool } => {
                self.tool_calls += 1;
                format!("Using {tool}...")
            }
            StreamEvent::ToolCompleted { .. } => {
                let noun = if self.tool_calls == 1 { "call" } else { "calls" };
                format!("Working... ({} tool {noun} so far)", self.tool_calls)
            }
            _ => return None,
        };

        if let Some(last) = self.last_notified {
            if now.duration_since(last) < PROGRESS_INTERVAL {
                return None;
            }
        }
        self.last_notified = Some(now);
        Some(status)
    }
}

/// Push `status` to `sink`, logging rather than propagating failures.
pub async fn deliver(sink: &dyn ProgressSink, status: &str) {
    if let Err(e) = sink.notify(status).await {
        warn!(error = %e, status, "progress delivery failed");
    }
}
