use crate::config::Network;
use crate::counters::{ObjectRef, TxResponse, UserCounters};
use crate::error::LedgerError;
use async_trait::async_trait;

/// Account-scoped ledger client bound to one RPC endpoint.
///
/// Implementations sign and submit transactions for a single account and
/// translate node or transport failures into [`LedgerError`] kinds.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Endpoint this client talks to
    fn rpc_url(&self) -> &str;

    fn network(&self) -> Network;

    /// Reload every counter owned by the account and classify it.
    async fn fetch_user_counters(&self) -> Result<UserCounters, LedgerError>;

    async fn register_user_counter(&self, counter_id: &str) -> Result<TxResponse, LedgerError>;

    async fn claim_user_counters(&self, counter_ids: &[String]) -> Result<TxResponse, LedgerError>;

    async fn destroy_user_counters(&self, counter_ids: &[String])
        -> Result<TxResponse, LedgerError>;

    async fn new_user_counter(&self) -> Result<TxResponse, LedgerError>;

    async fn increment_user_counter(&self, counter_ref: &ObjectRef)
        -> Result<TxResponse, LedgerError>;

    /// Suspend until the transaction is final on the network.
    async fn wait_for_transaction(&self, digest: &str) -> Result<(), LedgerError>;

    /// Drop any cached gas payment object so the next submission selects a fresh one.
    fn reset_gas_coin(&self) {}

    /// Map a failure reason reported in transaction effects to an error kind.
    fn parse_error(&self, message: &str) -> LedgerError {
        LedgerError::Other(message.to_string())
    }
}
