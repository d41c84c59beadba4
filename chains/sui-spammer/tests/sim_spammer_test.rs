use core_logic::{
    Credential, EventLog, LedgerClient, Network, RunStatus, SpamConfig, SpamMode, SpamRunner,
    SpamTimings, Spammer,
};
use std::time::Duration;
use sui_spammer::{SimClient, SimLedger, SimOptions};
use tokio::time::timeout;

const GAS: u64 = 1_000;

fn build(ledger: &SimLedger, urls: &[&str], timings: SpamTimings) -> Spammer<SimClient> {
    let config = SpamConfig::new(
        Network::Testnet,
        urls.iter().map(|u| u.to_string()).collect(),
    )
    .with_timings(timings);

    Spammer::from_config(&config, &Credential::ephemeral(), |_, network, url| {
        Ok(ledger.client(url, network))
    })
    .unwrap()
}

#[tokio::test]
async fn test_loop_runs_until_out_of_gas() {
    let ledger = SimLedger::new(SimOptions {
        txs_per_epoch: 5,
        starting_balance: 40 * GAS,
        gas_per_tx: GAS,
        ..Default::default()
    });
    let timings = SpamTimings {
        txs_until_rotate: 4,
        ..SpamTimings::without_delays()
    };
    let mut spammer = build(&ledger, &["http://rpc-a", "http://rpc-b"], timings);
    let log = EventLog::new(500);
    spammer.set_event_handler(log.handler());

    let finished = timeout(Duration::from_secs(10), spammer.start(SpamMode::Loop))
        .await
        .expect("spammer stops on its own once gas runs out");

    assert!(finished);
    assert_eq!(spammer.status(), RunStatus::Stopped);
    assert!(ledger.balance() < GAS);
    assert!(ledger.claimed_reward() > 0);
    assert!(ledger.epoch() >= 2);
    assert!(spammer.metrics().rotations() > 0);

    let messages: Vec<String> = log.entries().into_iter().map(|e| e.message).collect();
    assert_eq!(messages.first().map(String::as_str), Some("Stopped as requested"));
    assert!(messages.iter().any(|m| m == "Out of gas. Stopping."));
    assert!(messages.iter().any(|m| m == "Epoch change"));
}

#[tokio::test]
async fn test_single_pass_takes_one_decision() {
    let ledger = SimLedger::new(SimOptions {
        txs_per_epoch: 0,
        starting_balance: 100 * GAS,
        gas_per_tx: GAS,
        ..Default::default()
    });

    // epoch 0: counter A; epoch 1: register A, create B; epoch 2: A claimable, B registrable
    let setup = ledger.client("http://setup", Network::Testnet);
    setup.new_user_counter().await.unwrap();
    let a = ledger.user_counters().current.unwrap();
    setup.increment_user_counter(&a.object_ref).await.unwrap();
    ledger.advance_epoch();
    setup.register_user_counter(&a.id).await.unwrap();
    setup.new_user_counter().await.unwrap();
    let b = ledger.user_counters().current.unwrap();
    ledger.advance_epoch();

    let mut spammer = build(&ledger, &["http://rpc-a"], SpamTimings::without_delays());
    assert!(spammer.start(SpamMode::SinglePass).await);

    let after_first = spammer.user_counters().clone();
    assert_eq!(spammer.status(), RunStatus::Stopped);
    assert!(after_first.register.as_ref().unwrap().registered);
    assert_eq!(after_first.register.as_ref().unwrap().id, b.id);
    assert_eq!(after_first.claim.len(), 1);
    assert_eq!(ledger.claimed_reward(), 0);

    assert!(spammer.start(SpamMode::SinglePass).await);
    assert!(spammer.user_counters().claim.is_empty());
    assert_eq!(ledger.claimed_reward(), 1);
    // nothing new was created in either pass
    assert_eq!(ledger.counters().len(), 1);
}

#[tokio::test]
async fn test_runner_returns_summary() {
    let ledger = SimLedger::new(SimOptions {
        txs_per_epoch: 0,
        starting_balance: 10 * GAS,
        gas_per_tx: GAS,
        ..Default::default()
    });
    let spammer = build(&ledger, &["http://rpc-a"], SpamTimings::without_delays());

    let (spammer, snapshot) = timeout(
        Duration::from_secs(10),
        SpamRunner::run(spammer, SpamMode::Loop),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(spammer.status(), RunStatus::Stopped);
    assert_eq!(snapshot.submissions.success, 10);
    assert_eq!(snapshot.operations.create, 1);
    assert_eq!(snapshot.operations.increment, 9);
    assert_eq!(snapshot.errors.insufficient_funds, 1);
    assert_eq!(
        spammer.user_counters().current.as_ref().unwrap().tx_count,
        9
    );
}

#[tokio::test(start_paused = true)]
async fn test_flaky_transport_still_makes_progress() {
    let ledger = SimLedger::new(SimOptions {
        txs_per_epoch: 0,
        starting_balance: 30 * GAS,
        gas_per_tx: GAS,
        transport_failure_rate: 0.3,
        object_lag_rate: 0.2,
        ..Default::default()
    });
    let mut spammer = build(&ledger, &["http://rpc-a", "http://rpc-b"], SpamTimings::default());

    assert!(spammer.start(SpamMode::Loop).await);

    assert_eq!(spammer.status(), RunStatus::Stopped);
    assert!(ledger.balance() < GAS);
    let counter = &ledger.counters()[0];
    assert_eq!(counter.tx_count, 29);
}
