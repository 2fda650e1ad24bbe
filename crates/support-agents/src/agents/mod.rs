//! Stage agents that consume pipeline events
//!
//! Each agent owns a filtered subscription and runs until its
//! [`CancellationToken`] fires or the bus closes. On cancellation an agent
//! first drains the envelopes already buffered for it, so everything
//! published before shutdown is handled.

pub mod analytics;
pub mod escalation;

pub use analytics::AnalyticsAgent;
pub use escalation::{EscalationAgent, EscalationReport};

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use triage::{Envelope, FilteredReceiver};

/// Receive the next envelope, or `None` once the agent should stop.
///
/// After cancellation this keeps yielding buffered envelopes until the
/// receiver is empty.
pub(crate) async fn next_envelope(
    agent: &str,
    receiver: &mut FilteredReceiver,
    cancel: &CancellationToken,
) -> Option<Envelope> {
    if cancel.is_cancelled() {
        return receiver.try_recv().ok();
    }

    tokio::select! {
        biased;
        received = receiver.recv() => match received {
            Ok(envelope) => Some(envelope),
            Err(RecvError::Closed) | Err(RecvError::Lagged(_)) => {
                debug!(agent, "Event stream closed");
                None
            }
        },
        _ = cancel.cancelled() => {
            debug!(agent, "Cancellation requested; draining buffered events");
            receiver.try_recv().ok()
        }
    }
}
