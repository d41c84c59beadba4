//! # Utilities Module
//!
//! Logging, backoff, RPC rotation and the task runner.

pub mod backoff;
pub(crate) mod logger;
pub mod rotator;
pub(crate) mod runner;

pub use backoff::BackoffConfig;
pub use logger::{setup_logger, SPAM_EVENT_TARGET};
pub use rotator::ClientRotator;
pub use runner::SpamRunner;
