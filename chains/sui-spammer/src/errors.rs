//! Sui error adapter.
//!
//! Node and transport failures arrive as free text. This is the only place
//! that inspects that text; everything downstream works with [`LedgerError`].

use core_logic::LedgerError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Abort code raised by the counter package when a counter is used in the
/// wrong epoch.
pub const E_WRONG_EPOCH: u64 = 100;

pub const NO_GAS_COINS: &str = "No valid gas coins found for the transaction";

static MOVE_ABORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"MoveAbort\(.*,\s*(\d+)\)").expect("valid abort pattern"));

static LOW_GAS_BALANCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Balance of gas object \d+ is lower than the needed amount")
        .expect("valid gas balance pattern")
});

/// Failures raised before the request reached a node. Timeouts and resets
/// are left out: the transaction may already have been received.
const TRANSPORT_MARKERS: [&str; 3] = ["Failed to fetch", "error sending request", "Connection refused"];

/// Extract the abort code from a `MoveAbort(..., code)` failure.
pub fn parse_abort_code(message: &str) -> Option<u64> {
    MOVE_ABORT
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|code| code.as_str().parse().ok())
}

fn is_unknown_outcome(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timed out") || lower.contains("connection reset")
}

pub fn parse_sui_error(message: &str) -> LedgerError {
    let owned = message.to_string();

    if parse_abort_code(message) == Some(E_WRONG_EPOCH) || message.contains("EWrongEpoch") {
        return LedgerError::WrongEpoch(owned);
    }
    if message.contains(NO_GAS_COINS) || LOW_GAS_BALANCE.is_match(message) {
        return LedgerError::InsufficientGas(owned);
    }
    if message.contains("ObjectNotFound") || message.contains("not available for consumption") {
        return LedgerError::ObjectNotReady(owned);
    }
    if is_unknown_outcome(message) {
        return LedgerError::Other(owned);
    }
    if TRANSPORT_MARKERS.iter().any(|marker| message.contains(marker)) {
        return LedgerError::Transport(owned);
    }
    LedgerError::Other(owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRONG_EPOCH_ABORT: &str = "MoveAbort(MoveLocation { module: ModuleId { address: 0x2, \
        name: Identifier(\"user_counter\") }, function: 3, instruction: 12, \
        function_name: Some(\"increment\") }, 100) in command 0";

    #[test]
    fn test_abort_code() {
        assert_eq!(parse_abort_code(WRONG_EPOCH_ABORT), Some(100));
        assert_eq!(parse_abort_code("MoveAbort(loc, 7) in command 1"), Some(7));
        assert_eq!(parse_abort_code("ObjectNotFound"), None);
    }

    #[test]
    fn test_error_kinds() {
        assert!(matches!(
            parse_sui_error(WRONG_EPOCH_ABORT),
            LedgerError::WrongEpoch(_)
        ));
        assert!(matches!(parse_sui_error(NO_GAS_COINS), LedgerError::InsufficientGas(_)));
        assert!(matches!(
            parse_sui_error("Balance of gas object 1000 is lower than the needed amount: 2000"),
            LedgerError::InsufficientGas(_)
        ));
        assert!(matches!(
            parse_sui_error("Error checking transaction input objects: ObjectNotFound { object_id: 0xa }"),
            LedgerError::ObjectNotReady(_)
        ));
        assert!(matches!(
            parse_sui_error("Object 0xa is not available for consumption, its current version: 7"),
            LedgerError::ObjectNotReady(_)
        ));
        assert!(matches!(parse_sui_error("TypeError: Failed to fetch"), LedgerError::Transport(_)));
        assert!(matches!(
            parse_sui_error("Transaction timed out before reaching finality"),
            LedgerError::Other(_)
        ));
    }

    #[test]
    fn test_unknown_outcome_is_not_a_transport_failure() {
        for message in [
            "error sending request for url (https://rpc): operation timed out",
            "connection reset by peer",
            "error sending request for url (https://rpc): connection error: Connection reset by peer",
        ] {
            assert!(
                matches!(parse_sui_error(message), LedgerError::Other(_)),
                "{message}"
            );
        }
        assert!(matches!(
            parse_sui_error("error sending request for url (https://rpc): Connection refused"),
            LedgerError::Transport(_)
        ));
    }

    #[test]
    fn test_other_abort_codes_are_not_epoch_changes() {
        assert!(matches!(
            parse_sui_error("MoveAbort(loc, 7) in command 0"),
            LedgerError::Other(_)
        ));
    }

    #[test]
    fn test_epoch_wins_over_later_markers() {
        let message = format!("{} (Failed to fetch dynamic fields)", WRONG_EPOCH_ABORT);
        assert!(matches!(parse_sui_error(&message), LedgerError::WrongEpoch(_)));

        let message = format!("{}; ObjectNotFound", NO_GAS_COINS);
        assert!(matches!(parse_sui_error(&message), LedgerError::InsufficientGas(_)));
    }
}
