//! # Error Classifier
//!
//! Maps a ledger failure to one of five categories and derives the recovery
//! the spam loop applies for it.

use crate::config::SpamTimings;
use crate::error::LedgerError;
use crate::utils::backoff::BackoffConfig;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCategory {
    EpochMismatch,
    InsufficientFunds,
    ObjectNotReady,
    TransportFailure,
    Unexpected,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 5] = [
        ErrorCategory::EpochMismatch,
        ErrorCategory::InsufficientFunds,
        ErrorCategory::ObjectNotReady,
        ErrorCategory::TransportFailure,
        ErrorCategory::Unexpected,
    ];

    pub fn classify(error: &LedgerError) -> Self {
        match error {
            LedgerError::WrongEpoch(_) => ErrorCategory::EpochMismatch,
            LedgerError::InsufficientGas(_) => ErrorCategory::InsufficientFunds,
            LedgerError::ObjectNotReady(_) => ErrorCategory::ObjectNotReady,
            LedgerError::Transport(_) => ErrorCategory::TransportFailure,
            LedgerError::MalformedResponse(_) | LedgerError::Other(_) => ErrorCategory::Unexpected,
        }
    }

    /// Recovery for this category. `consecutive_unexpected` counts unexpected
    /// errors in a row, including the current one.
    pub fn recovery(&self, timings: &SpamTimings, consecutive_unexpected: u32) -> Recovery {
        match self {
            ErrorCategory::EpochMismatch => Recovery {
                delay: Duration::ZERO,
                rotate_penalty: 0,
                refetch: true,
                stop: false,
            },
            ErrorCategory::InsufficientFunds => Recovery {
                delay: Duration::ZERO,
                rotate_penalty: 0,
                refetch: false,
                stop: true,
            },
            ErrorCategory::ObjectNotReady => Recovery {
                delay: Duration::from_millis(timings.object_not_ready_ms),
                rotate_penalty: timings.object_not_ready_penalty,
                refetch: false,
                stop: false,
            },
            ErrorCategory::TransportFailure => Recovery {
                delay: Duration::from_millis(timings.network_error_ms),
                rotate_penalty: timings.failure_penalty,
                refetch: true,
                stop: false,
            },
            ErrorCategory::Unexpected => Recovery {
                delay: BackoffConfig::for_unexpected(timings)
                    .delay(consecutive_unexpected.saturating_sub(1)),
                rotate_penalty: timings.failure_penalty,
                refetch: true,
                stop: false,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::EpochMismatch => "epoch_mismatch",
            ErrorCategory::InsufficientFunds => "insufficient_funds",
            ErrorCategory::ObjectNotReady => "object_not_ready",
            ErrorCategory::TransportFailure => "transport_failure",
            ErrorCategory::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovery {
    pub delay: Duration,
    /// Added to the rotation counter so a misbehaving endpoint is left sooner.
    pub rotate_penalty: u64,
    pub refetch: bool,
    pub stop: bool,
}
