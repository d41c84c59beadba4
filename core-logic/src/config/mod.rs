use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Successful increments (plus penalties) before switching RPC endpoints.
pub const TXS_UNTIL_ROTATE: u64 = 50;
pub const SLEEP_MS_AFTER_RPC_CHANGE: u64 = 1_000;
pub const SLEEP_MS_AFTER_OBJECT_NOT_READY: u64 = 1_000;
pub const SLEEP_MS_AFTER_NETWORK_ERROR: u64 = 15_000;
pub const SLEEP_MS_AFTER_UNEXPECTED_ERROR: u64 = 30_000;
pub const OBJECT_NOT_READY_PENALTY: u64 = 5;
pub const FAILURE_PENALTY: u64 = 17;
pub const LOCALNET_LATENCY_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Localnet => "localnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "localnet" => Ok(Network::Localnet),
            other => Err(ConfigError::InvalidValue {
                field: "network".to_string(),
                reason: format!("unknown network '{}'", other),
            }),
        }
    }
}

/// Tunables for the spam loop: rotation cadence, backoff delays and penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamTimings {
    pub txs_until_rotate: u64,
    pub rotate_settle_ms: u64,
    pub object_not_ready_ms: u64,
    pub network_error_ms: u64,
    /// Base delay after an unexpected error.
    pub unexpected_error_ms: u64,
    /// Growth factor applied per consecutive unexpected error (1.0 = fixed delay).
    pub unexpected_backoff_factor: f64,
    pub unexpected_max_ms: u64,
    pub object_not_ready_penalty: u64,
    pub failure_penalty: u64,
    pub localnet_latency_ms: u64,
}

impl Default for SpamTimings {
    fn default() -> Self {
        Self {
            txs_until_rotate: TXS_UNTIL_ROTATE,
            rotate_settle_ms: SLEEP_MS_AFTER_RPC_CHANGE,
            object_not_ready_ms: SLEEP_MS_AFTER_OBJECT_NOT_READY,
            network_error_ms: SLEEP_MS_AFTER_NETWORK_ERROR,
            unexpected_error_ms: SLEEP_MS_AFTER_UNEXPECTED_ERROR,
            unexpected_backoff_factor: 1.0,
            unexpected_max_ms: SLEEP_MS_AFTER_UNEXPECTED_ERROR * 10,
            object_not_ready_penalty: OBJECT_NOT_READY_PENALTY,
            failure_penalty: FAILURE_PENALTY,
            localnet_latency_ms: LOCALNET_LATENCY_MS,
        }
    }
}

impl SpamTimings {
    /// Same policy with every sleep removed. Used by simulations and tests.
    pub fn without_delays() -> Self {
        Self {
            rotate_settle_ms: 0,
            object_not_ready_ms: 0,
            network_error_ms: 0,
            unexpected_error_ms: 0,
            unexpected_max_ms: 0,
            localnet_latency_ms: 0,
            ..Default::default()
        }
    }

    pub fn rotate_settle(&self) -> Duration {
        Duration::from_millis(self.rotate_settle_ms)
    }

    pub fn localnet_latency(&self) -> Duration {
        Duration::from_millis(self.localnet_latency_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.txs_until_rotate == 0 {
            return Err(ConfigError::InvalidValue {
                field: "txs_until_rotate".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !self.unexpected_backoff_factor.is_finite() || self.unexpected_backoff_factor < 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "unexpected_backoff_factor".to_string(),
                reason: format!("must be >= 1.0, got {}", self.unexpected_backoff_factor),
            });
        }
        if self.unexpected_max_ms < self.unexpected_error_ms {
            return Err(ConfigError::InvalidValue {
                field: "unexpected_max_ms".to_string(),
                reason: "must not be lower than unexpected_error_ms".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpamConfig {
    pub network: Network,
    pub rpc_urls: Vec<String>,
    #[serde(default)]
    pub timings: SpamTimings,
}

impl SpamConfig {
    pub fn new(network: Network, rpc_urls: Vec<String>) -> Self {
        Self {
            network,
            rpc_urls,
            timings: SpamTimings::default(),
        }
    }

    pub fn with_timings(mut self, timings: SpamTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rpc_urls.is_empty() {
            return Err(ConfigError::MissingField {
                field: "rpc_urls".to_string(),
            });
        }
        for url in &self.rpc_urls {
            validate_rpc_url(url)?;
        }
        self.timings.validate()
    }
}

pub fn validate_rpc_url(url: &str) -> Result<(), ConfigError> {
    url::Url::parse(url)
        .map(|_| ())
        .map_err(|_| ConfigError::InvalidRpcUrl {
            url: url.to_string(),
        })
}
