//! # Core Logic - Counter Spammer Core
//!
//! Chain-agnostic core of the counter spammer: the spam loop state machine
//! and everything it needs around it.
//!
//! ## Modules
//!
//! - [`spammer`] - The spam loop, its continuation policy and observer handle
//! - [`classifier`] - Error categories and their recovery policies
//! - [`counters`] - Counter snapshot and transaction response types
//! - [`config`] - Network, endpoints and loop tunables
//! - [`error`] - Typed error handling with thiserror
//! - [`events`] - Event emitter and bounded event log
//! - [`metrics`] - Submission, error and rotation metrics
//! - [`security`] - Credential handling
//! - [`status`] - Shared tri-state run flag
//! - [`traits`] - Ledger client interface
//! - [`utils`] - Logging, backoff, RPC rotation, runner

pub mod classifier;
pub mod config;
pub mod counters;
pub mod error;
pub mod events;
pub mod metrics;
pub mod security;
pub mod spammer;
pub mod status;
pub mod traits;
pub mod utils;

pub use classifier::{ErrorCategory, Recovery};
pub use config::{Network, SpamConfig, SpamTimings};
pub use counters::{
    shorten_address, Counter, ObjectRef, RefetchRequest, TxEffects, TxResponse, TxStatus,
    UserCounters,
};
pub use error::{ConfigError, LedgerError};
pub use events::{EventEmitter, EventLevel, EventLog, LoggedEvent, SpamEvent};
pub use metrics::{MetricsCollector, MetricsSnapshot};
pub use security::Credential;
pub use spammer::{schedule, Next, SpamHandle, SpamMode, SpamOperation, SpamView, Spammer};
pub use status::{RunStatus, StatusFlag};
pub use traits::LedgerClient;
pub use utils::{setup_logger, BackoffConfig, ClientRotator, SpamRunner};
