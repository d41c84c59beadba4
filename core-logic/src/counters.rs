//! # Counter Data Model
//!
//! Point-in-time view of the account's counters as the spam loop sees them,
//! plus the transaction responses returned by a ledger client.

use serde::{Deserialize, Serialize};

/// Versioned object reference. Mutations must be submitted against the latest
/// version or the node rejects them as stale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectRef {
    pub object_id: String,
    pub version: u64,
    pub digest: String,
}

/// One on-chain counter owned by the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub id: String,
    pub epoch: u64,
    pub tx_count: u64,
    pub registered: bool,
    pub object_ref: ObjectRef,
}

/// Classified snapshot of the account's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCounters {
    /// Current network epoch, or [`UserCounters::UNKNOWN_EPOCH`] before the first fetch.
    pub epoch: i64,
    pub current: Option<Counter>,
    pub register: Option<Counter>,
    pub claim: Vec<Counter>,
    pub delete: Vec<Counter>,
}

impl UserCounters {
    pub const UNKNOWN_EPOCH: i64 = -1;

    pub fn empty() -> Self {
        Self {
            epoch: Self::UNKNOWN_EPOCH,
            current: None,
            register: None,
            claim: Vec::new(),
            delete: Vec::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.epoch != Self::UNKNOWN_EPOCH
    }

    pub fn has_counters(&self) -> bool {
        self.current.is_some()
            || self.register.is_some()
            || !self.claim.is_empty()
            || !self.delete.is_empty()
    }

    /// Register, claim or delete work that a single pass would flush.
    pub fn has_pending_work(&self) -> bool {
        self.register.as_ref().is_some_and(|c| !c.registered)
            || !self.claim.is_empty()
            || !self.delete.is_empty()
    }
}

impl Default for UserCounters {
    fn default() -> Self {
        Self::empty()
    }
}

/// Tells the next iteration to reload on-chain state, optionally after a
/// given transaction reaches finality.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RefetchRequest {
    pub refetch: bool,
    pub tx_digest: Option<String>,
}

impl RefetchRequest {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn full() -> Self {
        Self {
            refetch: true,
            tx_digest: None,
        }
    }

    pub fn after_tx(digest: &str) -> Self {
        Self {
            refetch: true,
            tx_digest: Some(digest.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxEffects {
    pub status: TxStatus,
    pub mutated: Vec<ObjectRef>,
}

/// Response of a submitted transaction. `effects` is `None` when the node
/// returned an incomplete response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxResponse {
    pub digest: String,
    pub effects: Option<TxEffects>,
}

impl TxResponse {
    pub fn success(digest: impl Into<String>, mutated: Vec<ObjectRef>) -> Self {
        Self {
            digest: digest.into(),
            effects: Some(TxEffects {
                status: TxStatus::Success,
                mutated,
            }),
        }
    }

    pub fn failure(digest: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            effects: Some(TxEffects {
                status: TxStatus::Failure(reason.into()),
                mutated: Vec::new(),
            }),
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.effects.as_ref().map(|e| &e.status) {
            Some(TxStatus::Success) => "success",
            Some(TxStatus::Failure(_)) => "failure",
            None => "unknown",
        }
    }

    /// Fresh reference of a mutated object, if the effects list it.
    pub fn mutated_ref(&self, object_id: &str) -> Option<&ObjectRef> {
        self.effects
            .as_ref()?
            .mutated
            .iter()
            .find(|r| r.object_id == object_id)
    }
}

/// `0x1234…abcd` form used in operator-facing messages.
pub fn shorten_address(address: &str) -> String {
    let body = address.strip_prefix("0x").unwrap_or(address);
    if !body.is_ascii() || body.len() <= 8 {
        return address.to_string();
    }
    format!("0x{}…{}", &body[..4], &body[body.len() - 4..])
}
