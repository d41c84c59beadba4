//! # Spam Loop
//!
//! The state machine that keeps one account submitting transactions.
//!
//! Each iteration performs at most one mutating submission, chosen by
//! priority: register, then claim, then delete, then the epoch's main action
//! (create a counter, or increment the current one). Failures are classified
//! (see [`ErrorCategory`]) and recovered from inside the loop; nothing
//! propagates to the caller.
//!
//! ```text
//! stopped --start--> running --stop--> stopping --next iteration--> stopped
//! ```
//!
//! The loop is cooperative: a stop request is honoured at the top of the next
//! iteration, so an in-flight submission always completes first.

mod handle;

pub use handle::{SpamHandle, SpamView};

use crate::classifier::ErrorCategory;
use crate::config::{Network, SpamConfig, SpamTimings};
use crate::counters::{shorten_address, ObjectRef, RefetchRequest, TxResponse, TxStatus, UserCounters};
use crate::error::{ConfigError, LedgerError};
use crate::events::{EventEmitter, SpamEvent};
use crate::metrics::MetricsCollector;
use crate::security::Credential;
use crate::status::{RunStatus, StatusFlag};
use crate::traits::LedgerClient;
use crate::utils::rotator::ClientRotator;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpamMode {
    /// Keep spamming until stopped or out of funds.
    Loop,
    /// One decision cycle to flush register/claim/delete work, then stop.
    SinglePass,
}

impl SpamMode {
    pub fn from_loop_flag(looping: bool) -> Self {
        if looping {
            SpamMode::Loop
        } else {
            SpamMode::SinglePass
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpamOperation {
    Register,
    Claim,
    Delete,
    Create,
    Increment,
}

impl SpamOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpamOperation::Register => "register",
            SpamOperation::Claim => "claim",
            SpamOperation::Delete => "delete",
            SpamOperation::Create => "create",
            SpamOperation::Increment => "increment",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            SpamOperation::Register => "Registering counter",
            SpamOperation::Claim => "Claiming counters",
            SpamOperation::Delete => "Deleting counters",
            SpamOperation::Create => "Creating counter",
            SpamOperation::Increment => "Incrementing counter",
        }
    }
}

impl fmt::Display for SpamOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Iterate,
    /// Honour a stop request (or an out-of-funds stop).
    FinishStop,
    /// Single pass is done.
    FinishPass,
}

/// Continuation policy, decided purely from the run status, the mode and how
/// many iterations already ran in this invocation.
pub fn schedule(status: RunStatus, mode: SpamMode, completed: u64) -> Next {
    if mode == SpamMode::SinglePass && completed > 0 {
        return Next::FinishPass;
    }
    match status {
        RunStatus::Running => Next::Iterate,
        RunStatus::Stopping | RunStatus::Stopped => Next::FinishStop,
    }
}

pub(crate) fn request_stop(status: &StatusFlag, events: &EventEmitter) -> bool {
    if status.request_stop() {
        events.info("Shutting down");
        true
    } else {
        false
    }
}

pub struct Spammer<C: LedgerClient> {
    status: StatusFlag,
    counters: UserCounters,
    refetch: RefetchRequest,
    events: EventEmitter,
    metrics: Arc<MetricsCollector>,
    rotator: ClientRotator<C>,
    timings: SpamTimings,
    txs_since_rotate: u64,
    consecutive_unexpected: u32,
    view_tx: watch::Sender<SpamView>,
}

impl<C: LedgerClient> Spammer<C> {
    pub fn new(rotator: ClientRotator<C>, timings: SpamTimings) -> Self {
        let (view_tx, _) = watch::channel(SpamView {
            counters: UserCounters::empty(),
            rpc_url: rotator.current().rpc_url().to_string(),
        });
        Self {
            status: StatusFlag::new(),
            counters: UserCounters::empty(),
            // so the first run pulls on-chain data
            refetch: RefetchRequest::full(),
            events: EventEmitter::new(),
            metrics: Arc::new(MetricsCollector::new()),
            rotator,
            timings,
            txs_since_rotate: 0,
            consecutive_unexpected: 0,
            view_tx,
        }
    }

    /// Validate `config` and connect one client per RPC URL.
    pub fn from_config<F>(
        config: &SpamConfig,
        credential: &Credential,
        connect: F,
    ) -> Result<Self, ConfigError>
    where
        F: FnMut(&Credential, Network, &str) -> Result<C, ConfigError>,
    {
        config.validate()?;
        let rotator = ClientRotator::new(credential, config.network, &config.rpc_urls, connect)?;
        Ok(Self::new(rotator, config.timings.clone()))
    }

    pub fn handle(&self) -> SpamHandle {
        SpamHandle::new(
            self.status.clone(),
            self.events.clone(),
            self.metrics.clone(),
            self.view_tx.subscribe(),
        )
    }

    pub fn status(&self) -> RunStatus {
        self.status.get()
    }

    pub fn user_counters(&self) -> &UserCounters {
        &self.counters
    }

    pub fn active_client(&self) -> &C {
        self.rotator.current()
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Successful increments plus penalties since the last RPC rotation.
    pub fn txs_since_rotate(&self) -> u64 {
        self.txs_since_rotate
    }

    pub fn refetch_pending(&self) -> bool {
        self.refetch.refetch
    }

    pub fn set_event_handler<F>(&self, handler: F)
    where
        F: Fn(&SpamEvent) + Send + Sync + 'static,
    {
        self.events.set_handler(handler);
    }

    pub fn remove_event_handler(&self) {
        self.events.remove_handler();
    }

    /// Request a cooperative stop. No-op unless running.
    pub fn stop(&self) -> bool {
        request_stop(&self.status, &self.events)
    }

    /// Run the loop until it halts. No-op (returns false) unless stopped.
    pub async fn start(&mut self, mode: SpamMode) -> bool {
        if !self.status.try_start() {
            return false;
        }
        self.events.info(match mode {
            SpamMode::Loop => "Starting",
            SpamMode::SinglePass => "Processing counters",
        });

        let mut completed = 0u64;
        loop {
            match schedule(self.status.get(), mode, completed) {
                Next::Iterate => {
                    self.spam_once(mode).await;
                    completed += 1;
                    self.publish_view();
                }
                Next::FinishStop => {
                    self.finish_stop();
                    return true;
                }
                Next::FinishPass => {
                    self.finish_pass().await;
                    return true;
                }
            }
        }
    }

    async fn spam_once(&mut self, mode: SpamMode) {
        match self.step(mode).await {
            Ok(()) => self.consecutive_unexpected = 0,
            Err(err) => self.recover(err).await,
        }
    }

    async fn step(&mut self, mode: SpamMode) -> Result<(), LedgerError> {
        if self.txs_since_rotate >= self.timings.txs_until_rotate {
            self.rotate_rpc().await;
        }

        if self.refetch.refetch {
            self.refetch_data().await?;
        }

        if let Some(counter) = self.counters.register.as_ref().filter(|c| !c.registered) {
            let counter_id = counter.id.clone();
            return self.register_user_counter(&counter_id).await;
        }

        if !self.counters.claim.is_empty() {
            let ids = self.counters.claim.iter().map(|c| c.id.clone()).collect();
            return self.claim_user_counters(ids).await;
        }

        if !self.counters.delete.is_empty() {
            let ids = self.counters.delete.iter().map(|c| c.id.clone()).collect();
            return self.destroy_user_counters(ids).await;
        }

        if mode == SpamMode::Loop {
            return match self.counters.current.as_ref().map(|c| c.object_ref.clone()) {
                None => self.new_user_counter().await,
                Some(counter_ref) => self.increment_user_counter(counter_ref).await,
            };
        }

        Ok(())
    }

    async fn rotate_rpc(&mut self) {
        self.txs_since_rotate = 0;
        let rpc_url = self.rotator.rotate().rpc_url().to_string();
        self.metrics.record_rotation();
        self.events.debug(format!("Rotating to next RPC: {}", rpc_url));
        self.publish_view();
        sleep(self.timings.rotate_settle()).await;
    }

    async fn refetch_data(&mut self) -> Result<(), LedgerError> {
        let client = self.rotator.current();
        client.reset_gas_coin();

        if let Some(digest) = self.refetch.tx_digest.as_deref() {
            self.events.debug(format!("Waiting for tx: {}", digest));
            client.wait_for_transaction(digest).await?;
        }

        self.events.debug("Fetching onchain data");
        let started = Instant::now();
        let counters = client.fetch_user_counters().await?;
        self.metrics.record_refetch(started.elapsed());

        self.counters = counters;
        self.refetch = RefetchRequest::none();
        Ok(())
    }

    async fn register_user_counter(&mut self, counter_id: &str) -> Result<(), LedgerError> {
        let op = SpamOperation::Register;
        self.events
            .info(format!("{}: {}", op.label(), shorten_address(counter_id)));
        self.simulate_latency().await;
        let result = self.rotator.current().register_user_counter(counter_id).await;
        self.settle_refetching(op, result).map(|_| ())
    }

    async fn claim_user_counters(&mut self, counter_ids: Vec<String>) -> Result<(), LedgerError> {
        let op = SpamOperation::Claim;
        self.events
            .info(format!("{}: {}", op.label(), shorten_all(&counter_ids)));
        self.simulate_latency().await;
        let result = self.rotator.current().claim_user_counters(&counter_ids).await;
        self.settle_refetching(op, result).map(|_| ())
    }

    async fn destroy_user_counters(&mut self, counter_ids: Vec<String>) -> Result<(), LedgerError> {
        let op = SpamOperation::Delete;
        self.events
            .info(format!("{}: {}", op.label(), shorten_all(&counter_ids)));
        self.simulate_latency().await;
        let result = self.rotator.current().destroy_user_counters(&counter_ids).await;
        self.settle_refetching(op, result).map(|_| ())
    }

    async fn new_user_counter(&mut self) -> Result<(), LedgerError> {
        let op = SpamOperation::Create;
        self.events.info(op.label());
        self.simulate_latency().await;
        let result = self.rotator.current().new_user_counter().await;
        self.settle_refetching(op, result).map(|_| ())
    }

    /// Hot path: no refetch on success. `tx_count` and the counter reference
    /// are updated in place from the transaction effects.
    async fn increment_user_counter(&mut self, counter_ref: ObjectRef) -> Result<(), LedgerError> {
        let op = SpamOperation::Increment;
        self.events.debug(op.label());
        if self.counters.current.is_none() {
            return Err(LedgerError::Other(
                "current counter does not exist".to_string(),
            ));
        }
        self.simulate_latency().await;

        let result = self.rotator.current().increment_user_counter(&counter_ref).await;
        let resp = self.check_effects(op, result)?;
        let new_ref = resp
            .mutated_ref(&counter_ref.object_id)
            .cloned()
            .ok_or_else(|| {
                LedgerError::MalformedResponse(format!(
                    "tx {} does not list counter {} as mutated",
                    resp.digest, counter_ref.object_id
                ))
            })?;

        if let Some(current) = self.counters.current.as_mut() {
            current.tx_count += 1;
            current.object_ref = new_ref;
        }
        self.txs_since_rotate += 1;
        Ok(())
    }

    /// Settle a submission whose success invalidates the local snapshot.
    /// A refetch tied to the digest is requested as soon as the tx exists,
    /// even when its effects report a failure.
    fn settle_refetching(
        &mut self,
        op: SpamOperation,
        result: Result<TxResponse, LedgerError>,
    ) -> Result<TxResponse, LedgerError> {
        if let Ok(resp) = &result {
            self.refetch = RefetchRequest::after_tx(&resp.digest);
            self.events.debug(format!(
                "{}: {}: {}",
                op.label(),
                resp.status_label(),
                resp.digest
            ));
        }
        self.check_effects(op, result)
    }

    fn check_effects(
        &self,
        op: SpamOperation,
        result: Result<TxResponse, LedgerError>,
    ) -> Result<TxResponse, LedgerError> {
        let outcome = result.and_then(|resp| {
            match resp.effects.as_ref().map(|e| &e.status) {
                Some(TxStatus::Success) => Ok(resp),
                Some(TxStatus::Failure(reason)) => Err(self.rotator.current().parse_error(reason)),
                None => Err(LedgerError::MalformedResponse(format!(
                    "tx {} returned no effects",
                    resp.digest
                ))),
            }
        });
        self.metrics.record_submission(op, outcome.is_ok());
        outcome
    }

    async fn recover(&mut self, err: LedgerError) {
        let category = ErrorCategory::classify(&err);
        self.metrics.record_error(category);
        if category == ErrorCategory::Unexpected {
            self.consecutive_unexpected = self.consecutive_unexpected.saturating_add(1);
        }

        let recovery = category.recovery(&self.timings, self.consecutive_unexpected);
        if recovery.refetch {
            self.refetch = RefetchRequest::full();
        }
        if recovery.stop {
            self.status.set(RunStatus::Stopping);
        }
        self.txs_since_rotate = self.txs_since_rotate.saturating_add(recovery.rotate_penalty);

        let retry = retry_message(recovery.delay);
        match category {
            ErrorCategory::EpochMismatch => self.events.info("Epoch change"),
            ErrorCategory::InsufficientFunds => self.events.info("Out of gas. Stopping."),
            ErrorCategory::ObjectNotReady => self.events.debug(format!(
                "Validator didn't sync yet. {}. RPC: {}.",
                retry,
                self.rotator.current().rpc_url()
            )),
            ErrorCategory::TransportFailure => self
                .events
                .warn(format!("Network error. {}. Details: {}", retry, err)),
            ErrorCategory::Unexpected => self
                .events
                .warn(format!("Unexpected error. {}. Details: {}", retry, err)),
        }

        if !recovery.delay.is_zero() {
            sleep(recovery.delay).await;
        }
    }

    fn finish_stop(&mut self) {
        self.status.set(RunStatus::Stopped);
        // so the next run starts from fresh on-chain data
        self.refetch = RefetchRequest::full();
        self.events.info("Stopped as requested");
        self.publish_view();
    }

    async fn finish_pass(&mut self) {
        if self.refetch.refetch {
            if let Err(err) = self.refetch_data().await {
                self.events
                    .warn(format!("Could not refresh counters: {}", err));
            }
        }
        self.refetch = RefetchRequest::full();
        self.status.set(RunStatus::Stopped);
        self.events.info("Done processing counters");
        self.publish_view();
    }

    async fn simulate_latency(&self) {
        if self.rotator.current().network() == Network::Localnet {
            let latency = self.timings.localnet_latency();
            if !latency.is_zero() {
                sleep(latency).await;
            }
        }
    }

    fn publish_view(&self) {
        self.view_tx.send_replace(SpamView {
            counters: self.counters.clone(),
            rpc_url: self.rotator.current().rpc_url().to_string(),
        });
    }
}

fn shorten_all(ids: &[String]) -> String {
    ids.iter()
        .map(|id| shorten_address(id))
        .collect::<Vec<_>>()
        .join(", ")
}

fn retry_message(delay: Duration) -> String {
    if delay.is_zero() {
        "Retrying now".to_string()
    } else {
        format!("Retrying in {} seconds", delay.as_secs_f64())
    }
}
