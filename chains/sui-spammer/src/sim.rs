//! # Simulated ledger
//!
//! In-process stand-in for the Sui counter package: one account, its
//! counters, a gas balance and an epoch clock. Failures are reported with
//! the same text a Sui node produces and mapped through [`parse_sui_error`],
//! so the spam loop sees exactly what it would see on a real network.

use crate::classify::classify_counters;
use crate::errors::{parse_sui_error, E_WRONG_EPOCH, NO_GAS_COINS};
use async_trait::async_trait;
use core_logic::{Counter, LedgerClient, LedgerError, Network, ObjectRef, TxResponse, UserCounters};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const PACKAGE_ID: &str = "0x5c0a";
const GAS_COIN_ID: &str = "0x6a5c";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimOptions {
    /// Executed transactions per epoch. 0 keeps the epoch fixed until
    /// [`SimLedger::advance_epoch`] is called.
    pub txs_per_epoch: u64,
    /// Starting gas balance in MIST.
    pub starting_balance: u64,
    pub gas_per_tx: u64,
    /// Reward paid per counted transaction on claim.
    pub reward_per_tx: u64,
    /// Probability that a request fails before reaching the node.
    pub transport_failure_rate: f64,
    /// Probability that an increment hits a validator that has not seen the
    /// latest counter version yet.
    pub object_lag_rate: f64,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            txs_per_epoch: 200,
            starting_balance: 1_000_000_000,
            gas_per_tx: 1_000_000,
            reward_per_tx: 1,
            transport_failure_rate: 0.0,
            object_lag_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct SimCounter {
    id: String,
    epoch: u64,
    tx_count: u64,
    registered: bool,
    version: u64,
}

impl SimCounter {
    fn object_ref(&self) -> ObjectRef {
        ObjectRef {
            object_id: self.id.clone(),
            version: self.version,
            digest: object_digest(&self.id, self.version),
        }
    }

    fn to_counter(&self) -> Counter {
        Counter {
            id: self.id.clone(),
            epoch: self.epoch,
            tx_count: self.tx_count,
            registered: self.registered,
            object_ref: self.object_ref(),
        }
    }
}

#[derive(Debug, Default)]
struct ChainState {
    epoch: u64,
    txs_in_epoch: u64,
    counters: BTreeMap<String, SimCounter>,
    balance: u64,
    claimed_reward: u64,
    tx_seq: u64,
    object_seq: u64,
    finalized: HashSet<String>,
}

/// Outcome of a Move call that did not succeed.
enum CallFailure {
    /// Rejected while checking inputs; nothing executes and no gas is charged.
    Rejected(String),
    /// Aborted during execution; gas is charged and effects report the failure.
    Aborted(String),
}

type CallResult = Result<Vec<ObjectRef>, CallFailure>;

#[derive(Debug, Clone)]
pub struct SimLedger {
    options: SimOptions,
    state: Arc<Mutex<ChainState>>,
}

impl SimLedger {
    pub fn new(options: SimOptions) -> Self {
        let state = ChainState {
            balance: options.starting_balance,
            ..Default::default()
        };
        Self {
            options,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn options(&self) -> &SimOptions {
        &self.options
    }

    /// A client bound to `rpc_url`. Every client shares this ledger's state.
    pub fn client(&self, rpc_url: &str, network: Network) -> SimClient {
        SimClient {
            rpc_url: rpc_url.to_string(),
            network,
            ledger: self.clone(),
            gas_coin: Mutex::new(None),
            gas_selections: Mutex::new(0),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.lock().epoch
    }

    pub fn balance(&self) -> u64 {
        self.lock().balance
    }

    pub fn claimed_reward(&self) -> u64 {
        self.lock().claimed_reward
    }

    pub fn advance_epoch(&self) -> u64 {
        let mut state = self.lock();
        state.epoch += 1;
        state.txs_in_epoch = 0;
        debug!(epoch = state.epoch, "Simulated epoch change");
        state.epoch
    }

    pub fn counters(&self) -> Vec<Counter> {
        self.lock()
            .counters
            .values()
            .map(SimCounter::to_counter)
            .collect()
    }

    pub fn user_counters(&self) -> UserCounters {
        let state = self.lock();
        let counters = state.counters.values().map(SimCounter::to_counter).collect();
        classify_counters(state.epoch, counters)
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_finalized(&self, digest: &str) -> bool {
        self.lock().finalized.contains(digest)
    }

    /// Run one transaction: check gas, apply the call, charge and finalize.
    fn execute<F>(&self, function: &str, call: F) -> Result<TxResponse, LedgerError>
    where
        F: FnOnce(&mut ChainState) -> CallResult,
    {
        let mut state = self.lock();
        let gas = self.options.gas_per_tx;
        if state.balance < gas {
            return Err(parse_sui_error(NO_GAS_COINS));
        }

        let outcome = match call(&mut *state) {
            Err(CallFailure::Rejected(reason)) => return Err(parse_sui_error(&reason)),
            other => other,
        };

        state.balance -= gas;
        state.tx_seq += 1;
        let digest = format!("Tx{:012}", state.tx_seq);
        state.finalized.insert(digest.clone());

        state.txs_in_epoch += 1;
        if self.options.txs_per_epoch > 0 && state.txs_in_epoch >= self.options.txs_per_epoch {
            state.epoch += 1;
            state.txs_in_epoch = 0;
        }

        debug!(%digest, function, "Simulated transaction executed");
        Ok(match outcome {
            Ok(mutated) => TxResponse::success(digest, mutated),
            Err(CallFailure::Aborted(reason)) | Err(CallFailure::Rejected(reason)) => {
                TxResponse::failure(digest, reason)
            }
        })
    }
}

impl ChainState {
    fn counter(&self, id: &str) -> Result<&SimCounter, CallFailure> {
        self.counters.get(id).ok_or_else(|| object_not_found(id))
    }

    fn counter_mut(&mut self, id: &str) -> Result<&mut SimCounter, CallFailure> {
        self.counters.get_mut(id).ok_or_else(|| object_not_found(id))
    }

    fn next_object_id(&mut self) -> String {
        self.object_seq += 1;
        format!("0x{:064x}", self.object_seq)
    }
}

fn object_digest(id: &str, version: u64) -> String {
    format!("{}:{}", &id[id.len().saturating_sub(6)..], version)
}

fn object_not_found(id: &str) -> CallFailure {
    CallFailure::Rejected(format!(
        "Error checking transaction input objects: ObjectNotFound {{ object_id: {} }}",
        id
    ))
}

fn wrong_epoch_abort(function: &str) -> CallFailure {
    CallFailure::Aborted(format!(
        "MoveAbort(MoveLocation {{ module: ModuleId {{ address: {}, name: Identifier(\"user_counter\") }}, \
         function: 0, instruction: 0, function_name: Some(\"{}\") }}, {}) in command 0",
        PACKAGE_ID, function, E_WRONG_EPOCH
    ))
}

fn stale_version(id: &str, current: u64) -> CallFailure {
    CallFailure::Rejected(format!(
        "Object {} is not available for consumption, its current version: {}",
        id, current
    ))
}

fn roll(rate: f64) -> bool {
    rate > 0.0 && rand::thread_rng().gen_bool(rate.min(1.0))
}

/// [`LedgerClient`] over a [`SimLedger`], bound to one RPC URL.
#[derive(Debug)]
pub struct SimClient {
    rpc_url: String,
    network: Network,
    ledger: SimLedger,
    gas_coin: Mutex<Option<String>>,
    gas_selections: Mutex<u64>,
}

impl SimClient {
    pub fn ledger(&self) -> &SimLedger {
        &self.ledger
    }

    /// How many times a gas coin had to be selected.
    pub fn gas_selections(&self) -> u64 {
        *self.gas_selections.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn select_gas_coin(&self) {
        let mut coin = self.gas_coin.lock().unwrap_or_else(|p| p.into_inner());
        if coin.is_none() {
            *coin = Some(GAS_COIN_ID.to_string());
            *self.gas_selections.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        }
    }

    fn transport(&self) -> Result<(), LedgerError> {
        if roll(self.ledger.options.transport_failure_rate) {
            return Err(parse_sui_error(&format!(
                "error sending request for url ({}): Failed to fetch",
                self.rpc_url
            )));
        }
        Ok(())
    }

    fn submit<F>(&self, function: &str, call: F) -> Result<TxResponse, LedgerError>
    where
        F: FnOnce(&mut ChainState) -> CallResult,
    {
        self.transport()?;
        self.select_gas_coin();
        self.ledger.execute(function, call)
    }
}

#[async_trait]
impl LedgerClient for SimClient {
    fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn fetch_user_counters(&self) -> Result<UserCounters, LedgerError> {
        self.transport()?;
        Ok(self.ledger.user_counters())
    }

    async fn register_user_counter(&self, counter_id: &str) -> Result<TxResponse, LedgerError> {
        self.submit("register", |state| {
            let epoch = state.epoch;
            let counter = state.counter_mut(counter_id)?;
            if counter.epoch + 1 != epoch {
                return Err(wrong_epoch_abort("register"));
            }
            counter.registered = true;
            counter.version += 1;
            Ok(vec![counter.object_ref()])
        })
    }

    async fn claim_user_counters(&self, counter_ids: &[String]) -> Result<TxResponse, LedgerError> {
        let reward_per_tx = self.ledger.options.reward_per_tx;
        self.submit("claim", |state| {
            for id in counter_ids {
                let counter = state.counter(id)?;
                if !counter.registered || counter.epoch + 2 > state.epoch {
                    return Err(wrong_epoch_abort("claim"));
                }
            }
            for id in counter_ids {
                if let Some(counter) = state.counters.remove(id) {
                    state.claimed_reward += counter.tx_count * reward_per_tx;
                }
            }
            Ok(Vec::new())
        })
    }

    async fn destroy_user_counters(
        &self,
        counter_ids: &[String],
    ) -> Result<TxResponse, LedgerError> {
        self.submit("destroy", |state| {
            for id in counter_ids {
                state.counter(id)?;
            }
            for id in counter_ids {
                state.counters.remove(id);
            }
            Ok(Vec::new())
        })
    }

    async fn new_user_counter(&self) -> Result<TxResponse, LedgerError> {
        self.submit("new", |state| {
            let id = state.next_object_id();
            let counter = SimCounter {
                id: id.clone(),
                epoch: state.epoch,
                tx_count: 0,
                registered: false,
                version: 1,
            };
            let created = counter.object_ref();
            state.counters.insert(id, counter);
            Ok(vec![created])
        })
    }

    async fn increment_user_counter(
        &self,
        counter_ref: &ObjectRef,
    ) -> Result<TxResponse, LedgerError> {
        let lagging = roll(self.ledger.options.object_lag_rate);
        self.submit("increment", |state| {
            let epoch = state.epoch;
            let counter = state.counter_mut(&counter_ref.object_id)?;
            if lagging || counter.version != counter_ref.version {
                return Err(stale_version(&counter.id, counter.version));
            }
            if counter.epoch != epoch {
                return Err(wrong_epoch_abort("increment"));
            }
            counter.tx_count += 1;
            counter.version += 1;
            Ok(vec![counter.object_ref()])
        })
    }

    async fn wait_for_transaction(&self, digest: &str) -> Result<(), LedgerError> {
        self.transport()?;
        if self.ledger.is_finalized(digest) {
            Ok(())
        } else {
            Err(parse_sui_error(&format!(
                "Could not find the referenced transaction [TransactionDigest({})]",
                digest
            )))
        }
    }

    fn reset_gas_coin(&self) {
        *self.gas_coin.lock().unwrap_or_else(|p| p.into_inner()) = None;
    }

    fn parse_error(&self, message: &str) -> LedgerError {
        parse_sui_error(message)
    }
}
