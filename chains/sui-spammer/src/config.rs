//! Configuration loader for sui-spammer

use crate::sim::SimOptions;
use anyhow::{Context, Result};
use core_logic::{Network, SpamConfig, SpamTimings};
use serde::{Deserialize, Serialize};
use std::fs;

/// Configuration for the sui spammer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiSpammerConfig {
    /// Network the account lives on
    pub network: Network,
    /// RPC endpoints, rotated through in order
    pub rpc_urls: Vec<String>,
    /// Loop tunables; every field falls back to its default
    #[serde(default)]
    pub timings: SpamTimings,
    /// Simulated ledger behaviour
    #[serde(default)]
    pub simulation: SimOptions,
    /// Number of events kept for the post-run report
    #[serde(default = "default_event_log_capacity")]
    pub event_log_capacity: usize,
}

fn default_event_log_capacity() -> usize {
    200
}

impl SuiSpammerConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```ignore
    /// let config = SuiSpammerConfig::from_path("config/config.toml")?;
    /// ```
    pub fn from_path(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config from {}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        config
            .to_spam_config()
            .validate()
            .context("Invalid spammer configuration")?;
        Ok(config)
    }

    pub fn to_spam_config(&self) -> SpamConfig {
        SpamConfig::new(self.network, self.rpc_urls.clone()).with_timings(self.timings.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
network = "localnet"
rpc_urls = ["http://127.0.0.1:9000", "http://127.0.0.1:9001"]

[timings]
txs_until_rotate = 20

[simulation]
txs_per_epoch = 30
"#;

    #[test]
    fn test_parse_sample() {
        let config = SuiSpammerConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.network, Network::Localnet);
        assert_eq!(config.rpc_urls.len(), 2);
        assert_eq!(config.timings.txs_until_rotate, 20);
        assert_eq!(config.timings.failure_penalty, 17);
        assert_eq!(config.simulation.txs_per_epoch, 30);
        assert_eq!(config.simulation.gas_per_tx, SimOptions::default().gas_per_tx);
        assert_eq!(config.event_log_capacity, 200);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = SuiSpammerConfig::from_toml_str(
            r#"
network = "testnet"
rpc_urls = []
"#,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("rpc_urls"));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = SuiSpammerConfig::from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.to_spam_config().rpc_urls, config.rpc_urls);

        assert!(SuiSpammerConfig::from_path("does/not/exist.toml").is_err());
    }
}
