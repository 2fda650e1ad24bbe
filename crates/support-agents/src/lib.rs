//! Stage agents for the customer-service triage pipeline
//!
//! The `triage` crate decides; the agents here act on those decisions by
//! consuming events from the topic bus:
//! - [`agents::EscalationAgent`] opens a ticket for every escalation
//!   through a [`tickets::TicketSink`]
//! - [`agents::AnalyticsAgent`] aggregates what flowed through the pipeline
//!
//! [`config`], [`intake`] and [`telemetry`] hold the startup and I/O
//! plumbing shared by the `support-agents` binary and its tests.

pub mod agents;
pub mod config;
pub mod intake;
pub mod telemetry;
pub mod tickets;
