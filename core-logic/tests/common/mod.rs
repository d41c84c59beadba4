#![allow(dead_code)]

use async_trait::async_trait;
use core_logic::{
    ClientRotator, Counter, LedgerClient, LedgerError, Network, ObjectRef, SpamHandle,
    SpamTimings, Spammer, TxResponse, UserCounters,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Fetch,
    Wait(String),
    Register(String),
    Claim(Vec<String>),
    Delete(Vec<String>),
    Create,
    Increment(ObjectRef),
}

impl Call {
    pub fn is_submission(&self) -> bool {
        !matches!(self, Call::Fetch | Call::Wait(_))
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<(String, Call)>,
    snapshots: VecDeque<UserCounters>,
    last_snapshot: Option<UserCounters>,
    fetch_errors: VecDeque<LedgerError>,
    results: VecDeque<Result<TxResponse, LedgerError>>,
    submissions: usize,
    next_digest: u64,
    in_flight: usize,
    max_in_flight: usize,
    gas_resets: usize,
    stop_after: Option<(usize, SpamHandle)>,
}

/// Scripted ledger shared by every mock client in a test.
///
/// Fetches replay queued snapshots (the last one repeats). Submissions pop
/// queued results, falling back to a success that bumps the counter version.
#[derive(Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_snapshot(&self, snapshot: UserCounters) {
        self.state.lock().unwrap().snapshots.push_back(snapshot);
    }

    pub fn push_fetch_error(&self, err: LedgerError) {
        self.state.lock().unwrap().fetch_errors.push_back(err);
    }

    pub fn push_result(&self, result: Result<TxResponse, LedgerError>) {
        self.state.lock().unwrap().results.push_back(result);
    }

    /// Request a stop through `handle` once `count` submissions have completed.
    pub fn stop_after(&self, count: usize, handle: SpamHandle) {
        self.state.lock().unwrap().stop_after = Some((count, handle));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .map(|(_, call)| call.clone())
            .collect()
    }

    pub fn calls_with_urls(&self) -> Vec<(String, Call)> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn submissions(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_submission).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    pub fn gas_resets(&self) -> usize {
        self.state.lock().unwrap().gas_resets
    }

    pub fn client(&self, url: &str, network: Network) -> MockClient {
        MockClient {
            url: url.to_string(),
            network,
            ledger: self.clone(),
        }
    }

    fn record(&self, url: &str, call: Call) {
        self.state.lock().unwrap().calls.push((url.to_string(), call));
    }

    async fn submit(&self, url: &str, call: Call) -> Result<TxResponse, LedgerError> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((url.to_string(), call.clone()));
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.next_digest += 1;
            let digest = format!("tx-{}", state.next_digest);
            state
                .results
                .pop_front()
                .unwrap_or_else(|| Ok(default_response(digest, &call)))
        };

        tokio::task::yield_now().await;

        let mut state = self.state.lock().unwrap();
        state.in_flight -= 1;
        state.submissions += 1;
        if let Some((count, handle)) = &state.stop_after {
            if state.submissions >= *count {
                handle.stop();
            }
        }
        result
    }
}

fn default_response(digest: String, call: &Call) -> TxResponse {
    match call {
        Call::Increment(counter_ref) => {
            let version = counter_ref.version + 1;
            let mutated = ObjectRef {
                object_id: counter_ref.object_id.clone(),
                version,
                digest: format!("{}-v{}", counter_ref.object_id, version),
            };
            TxResponse::success(digest, vec![mutated])
        }
        _ => TxResponse::success(digest, Vec::new()),
    }
}

pub struct MockClient {
    url: String,
    network: Network,
    ledger: MockLedger,
}

#[async_trait]
impl LedgerClient for MockClient {
    fn rpc_url(&self) -> &str {
        &self.url
    }

    fn network(&self) -> Network {
        self.network
    }

    async fn fetch_user_counters(&self) -> Result<UserCounters, LedgerError> {
        self.ledger.record(&self.url, Call::Fetch);
        let mut state = self.ledger.state.lock().unwrap();
        if let Some(err) = state.fetch_errors.pop_front() {
            return Err(err);
        }
        if let Some(next) = state.snapshots.pop_front() {
            state.last_snapshot = Some(next);
        }
        Ok(state.last_snapshot.clone().unwrap_or_else(|| snapshot(0)))
    }

    async fn register_user_counter(&self, counter_id: &str) -> Result<TxResponse, LedgerError> {
        self.ledger
            .submit(&self.url, Call::Register(counter_id.to_string()))
            .await
    }

    async fn claim_user_counters(&self, counter_ids: &[String]) -> Result<TxResponse, LedgerError> {
        self.ledger
            .submit(&self.url, Call::Claim(counter_ids.to_vec()))
            .await
    }

    async fn destroy_user_counters(
        &self,
        counter_ids: &[String],
    ) -> Result<TxResponse, LedgerError> {
        self.ledger
            .submit(&self.url, Call::Delete(counter_ids.to_vec()))
            .await
    }

    async fn new_user_counter(&self) -> Result<TxResponse, LedgerError> {
        self.ledger.submit(&self.url, Call::Create).await
    }

    async fn increment_user_counter(
        &self,
        counter_ref: &ObjectRef,
    ) -> Result<TxResponse, LedgerError> {
        self.ledger
            .submit(&self.url, Call::Increment(counter_ref.clone()))
            .await
    }

    async fn wait_for_transaction(&self, digest: &str) -> Result<(), LedgerError> {
        self.ledger.record(&self.url, Call::Wait(digest.to_string()));
        Ok(())
    }

    fn reset_gas_coin(&self) {
        self.ledger.state.lock().unwrap().gas_resets += 1;
    }

    fn parse_error(&self, message: &str) -> LedgerError {
        if message.contains("ObjectNotFound") {
            LedgerError::ObjectNotReady(message.to_string())
        } else if message.contains("EWrongEpoch") {
            LedgerError::WrongEpoch(message.to_string())
        } else if message.contains("No valid gas coins") {
            LedgerError::InsufficientGas(message.to_string())
        } else {
            LedgerError::Other(message.to_string())
        }
    }
}

pub fn spammer(
    ledger: &MockLedger,
    urls: &[&str],
    network: Network,
    timings: SpamTimings,
) -> Spammer<MockClient> {
    let clients = urls.iter().map(|url| ledger.client(url, network)).collect();
    let rotator = ClientRotator::from_clients(network, clients).unwrap();
    Spammer::new(rotator, timings)
}

pub fn counter(id: &str, epoch: u64, tx_count: u64, registered: bool) -> Counter {
    Counter {
        id: id.to_string(),
        epoch,
        tx_count,
        registered,
        object_ref: ObjectRef {
            object_id: id.to_string(),
            version: 1,
            digest: format!("{}-v1", id),
        },
    }
}

pub fn snapshot(epoch: i64) -> UserCounters {
    UserCounters {
        epoch,
        ..UserCounters::empty()
    }
}

/// Collect event messages emitted while a test runs.
pub fn record_events(spammer: &Spammer<MockClient>) -> Arc<Mutex<Vec<String>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    spammer.set_event_handler(move |event| {
        sink.lock().unwrap().push(event.message.clone());
    });
    events
}
