//! # Sui Spammer
//!
//! Sui adapter for the counter spammer: error text mapping, counter
//! classification, configuration and an in-process simulated ledger that
//! implements [`core_logic::LedgerClient`].

pub mod classify;
pub mod config;
pub mod errors;
pub mod sim;

pub use classify::{classify_counters, counter_status_label, is_low_balance, CounterSlot};
pub use config::SuiSpammerConfig;
pub use errors::{parse_abort_code, parse_sui_error, E_WRONG_EPOCH};
pub use sim::{SimClient, SimLedger, SimOptions};
