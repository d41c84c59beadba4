//! # Core Error Types
//!
//! Centralized error definitions for the core-logic crate.
//! All errors implement `std::error::Error` and `std::fmt::Display`.

use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid RPC URL format: '{url}'")]
    InvalidRpcUrl { url: String },

    #[error("Missing required configuration field: '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Failure kinds reported by a ledger client.
///
/// Clients translate whatever their transport or node returns into one of
/// these kinds (see `LedgerClient::parse_error`), so the spam loop never
/// inspects raw error text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The operation targeted a counter from an epoch that is no longer current.
    #[error("Counter belongs to a stale epoch: {0}")]
    WrongEpoch(String),

    /// No spendable balance is left to pay transaction fees.
    #[error("Insufficient gas: {0}")]
    InsufficientGas(String),

    /// The node serving the request has not caught up with the object yet.
    #[error("Object not available yet: {0}")]
    ObjectNotReady(String),

    /// The request never reached an endpoint.
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The node answered, but the response is missing required fields.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Other(String),
}

impl LedgerError {
    /// Raw message carried by the error, without the kind prefix.
    pub fn message(&self) -> &str {
        match self {
            LedgerError::WrongEpoch(m)
            | LedgerError::InsufficientGas(m)
            | LedgerError::ObjectNotReady(m)
            | LedgerError::Transport(m)
            | LedgerError::MalformedResponse(m)
            | LedgerError::Other(m) => m,
        }
    }
}
