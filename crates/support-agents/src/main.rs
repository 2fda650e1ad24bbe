//! Customer-service triage CLI
//!
//! Runs customer messages through intent classification, escalation rules
//! and topic routing, with the escalation and analytics agents attached.
//!
//! # Usage
//!
//! ```bash
//! # Classify one message
//! support-agents classify "Where is my order #12345?"
//!
//! # Process stdin line by line (plain text or JSON messages)
//! printf 'hi\nmy package never arrived\n' | support-agents run --session s-1 --summary
//!
//! # Validate or print the effective configuration
//! TRIAGE_CONFIG=triage.toml support-agents check-config
//! support-agents show-config --format yaml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{stdin, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use support_agents::agents::{AnalyticsAgent, EscalationAgent};
use support_agents::config::{self, ConfigFormat};
use support_agents::intake::parse_line;
use support_agents::telemetry;
use support_agents::tickets::LogTicketSink;
use triage::{IntentClassifier, Pipeline, TopicBus, TriageConfig};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (toml, yaml/yml or json); overrides TRIAGE_CONFIG
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace); TRIAGE_LOG and RUST_LOG take precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a message and print the result as JSON
    Classify {
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Read messages from stdin and print one JSON outcome per line
    Run {
        /// Conversation id for lines that do not carry one
        #[arg(long, default_value = "cli")]
        session: String,

        /// Customer id for lines that do not carry one
        #[arg(long, default_value = "")]
        customer: String,

        /// Print an analytics and ticket summary after the last message
        #[arg(long, default_value_t = false)]
        summary: bool,
    },

    /// Validate the configuration and exit
    CheckConfig,

    /// Print the effective configuration
    ShowConfig {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Json)]
        format: ConfigFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry::init(args.verbose);

    let config = config::load_config(args.config.as_deref())?;

    match args.command {
        Command::Classify { text } => classify(&config, &text.join(" ")),
        Command::Run {
            session,
            customer,
            summary,
        } => run(config, &session, &customer, summary).await,
        Command::CheckConfig => {
            println!("Configuration OK: {}", config::summarize(&config));
            Ok(())
        }
        Command::ShowConfig { format } => {
            let rendered = config::render_config(&config, format)?;
            println!("{}", rendered.trim_end());
            Ok(())
        }
    }
}

fn classify(config: &TriageConfig, text: &str) -> Result<()> {
    let result = IntentClassifier::from_config(config).classify_intent(text);
    println!(
        "{}",
        serde_json::to_string(&result).context("Failed to serialize classification")?
    );
    Ok(())
}

async fn run(config: TriageConfig, session: &str, customer: &str, summary: bool) -> Result<()> {
    let bus = TopicBus::with_capacity(config.bus.capacity).shared();
    let pipeline = Pipeline::try_new(&config, bus.clone()).context("Failed to build pipeline")?;
    let cancel = CancellationToken::new();

    let escalation_rx = EscalationAgent::subscribe(&bus, pipeline.router());
    let escalation = tokio::spawn(
        EscalationAgent::new(Arc::new(LogTicketSink::new())).run(escalation_rx, cancel.clone()),
    );
    let analytics_rx = AnalyticsAgent::subscribe(&bus);
    let analytics = tokio::spawn(AnalyticsAgent::new().run(analytics_rx, cancel.clone()));

    info!(session, "Reading messages from stdin");
    let mut sessions = BTreeSet::new();
    let mut lines = BufReader::new(stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let Some(message) = parse_line(&line, session, customer) else {
            continue;
        };
        sessions.insert(message.context_id.clone());

        let outcome = pipeline.process(message).await?;
        println!(
            "{}",
            serde_json::to_string(&outcome).context("Failed to serialize outcome")?
        );
    }

    for context_id in &sessions {
        pipeline.close_session(context_id).await?;
    }

    cancel.cancel();
    let report = escalation.await.context("Escalation agent task failed")?;
    let snapshot = analytics.await.context("Analytics agent task failed")?;
    info!(
        messages = snapshot.total_messages,
        tickets = report.opened.len(),
        failed_tickets = report.failed,
        "Run complete"
    );

    if summary {
        let summary = serde_json::json!({ "analytics": snapshot, "tickets": report });
        println!(
            "{}",
            serde_json::to_string(&summary).context("Failed to serialize summary")?
        );
    }
    Ok(())
}
