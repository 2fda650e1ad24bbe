//! Startup configuration for the `support-agents` binary
//!
//! The config file comes from `--config` or, failing that, the
//! `TRIAGE_CONFIG` environment variable. Without either, the built-in
//! defaults are used. `TRIAGE_*` overrides are applied last and the result
//! is validated once more.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use triage::TriageConfig;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "TRIAGE_CONFIG";

/// Output format for `show-config`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

/// Pick the config file: explicit path first, then `TRIAGE_CONFIG`.
pub fn resolve_config_path(
    explicit: Option<&Path>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        lookup(CONFIG_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    })
}

/// Load, override from the environment, and validate.
pub fn load_config(explicit: Option<&Path>) -> Result<TriageConfig> {
    let mut config = match resolve_config_path(explicit, |key| std::env::var(key).ok()) {
        Some(path) => {
            let config = TriageConfig::load(&path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            info!(path = %path.display(), "Configuration loaded");
            config
        }
        None => {
            info!("No configuration file given; using built-in defaults");
            TriageConfig::default()
        }
    };

    config.apply_env_overrides();
    config
        .validate()
        .context("Configuration is invalid after applying TRIAGE_* overrides")?;
    Ok(config)
}

/// Serialize a config for display.
pub fn render_config(config: &TriageConfig, format: ConfigFormat) -> Result<String> {
    let rendered = match format {
        ConfigFormat::Json => {
            serde_json::to_string_pretty(config).context("Failed to render config as JSON")?
        }
        ConfigFormat::Toml => {
            toml::to_string_pretty(config).context("Failed to render config as TOML")?
        }
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).context("Failed to render config as YAML")?
        }
    };
    Ok(rendered)
}

/// One-line description of a loaded config
pub fn summarize(config: &TriageConfig) -> String {
    let enabled = config.escalation_rules.iter().filter(|r| r.enabled).count();
    format!(
        "{} intent rules, {} escalation rules ({} enabled), {} routed intents, fallback topic '{}'",
        config.intent_keywords.len(),
        config.escalation_rules.len(),
        enabled,
        config.topics.intents.len(),
        config.topics.fallback
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_path_wins_over_env() {
        let lookup = |_: &str| Some("/etc/from-env.toml".to_string());
        assert_eq!(
            resolve_config_path(Some(Path::new("cli.toml")), lookup),
            Some(PathBuf::from("cli.toml"))
        );
        assert_eq!(
            resolve_config_path(None, lookup),
            Some(PathBuf::from("/etc/from-env.toml"))
        );
    }

    #[test]
    fn test_blank_env_means_defaults() {
        assert_eq!(resolve_config_path(None, |_| Some("  ".to_string())), None);
        assert_eq!(resolve_config_path(None, |_| None), None);
    }

    #[test]
    fn test_load_reports_path_on_failure() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[[intent_keywords]]\nintent = \"COMPLAINT\"\nkeywords = []").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Failed to load configuration from"));
        assert!(chain.contains("keyword set is empty"));
    }

    #[test]
    fn test_render_round_trips_every_format() {
        let config = TriageConfig::default();

        let toml = render_config(&config, ConfigFormat::Toml).unwrap();
        assert_eq!(TriageConfig::from_toml_str(&toml).unwrap(), config);

        let json = render_config(&config, ConfigFormat::Json).unwrap();
        assert_eq!(TriageConfig::from_json_str(&json).unwrap(), config);

        let yaml = render_config(&config, ConfigFormat::Yaml).unwrap();
        assert_eq!(TriageConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_summary_counts_rules() {
        let summary = summarize(&TriageConfig::default());
        assert!(summary.starts_with("9 intent rules, 7 escalation rules (7 enabled)"));
    }
}
