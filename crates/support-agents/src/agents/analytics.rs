//! Analytics agent: aggregates pipeline events off the bus

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

use triage::{
    AnalyticsAggregator, AnalyticsSnapshot, EventBusExt, EventFilter, FilteredReceiver, TopicBus,
};

use super::next_envelope;

/// Event types the aggregator tracks
const TRACKED: [&str; 3] = ["analytics_recorded", "escalation_raised", "session_closed"];

pub struct AnalyticsAgent {
    aggregator: Arc<Mutex<AnalyticsAggregator>>,
}

impl AnalyticsAgent {
    pub fn new() -> Self {
        Self {
            aggregator: Arc::new(Mutex::new(AnalyticsAggregator::new())),
        }
    }

    /// Subscribe on the firehose; escalation details arrive on the
    /// escalation topic, everything else on the analytics topic.
    pub fn subscribe(bus: &TopicBus) -> FilteredReceiver {
        bus.subscribe_filtered(EventFilter::new().types(TRACKED.to_vec()))
    }

    /// Shared handle for reading snapshots while the agent runs
    pub fn aggregator(&self) -> Arc<Mutex<AnalyticsAggregator>> {
        self.aggregator.clone()
    }

    pub fn snapshot(&self) -> AnalyticsSnapshot {
        self.aggregator
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .snapshot()
    }

    /// Aggregate until cancelled; returns the final snapshot.
    pub async fn run(
        self,
        mut receiver: FilteredReceiver,
        cancel: CancellationToken,
    ) -> AnalyticsSnapshot {
        info!("Analytics agent started");
        while let Some(envelope) = next_envelope("analytics", &mut receiver, &cancel).await {
            self.aggregator
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .record_event(&envelope.event);
        }

        let snapshot = self.snapshot();
        info!(
            messages = snapshot.total_messages,
            escalations = snapshot.escalations,
            "Analytics agent stopped"
        );
        snapshot
    }
}

impl Default for AnalyticsAgent {
    fn default() -> Self {
        Self::new()
    }
}
