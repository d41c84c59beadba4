//! Sorting the account's counters into the slots the spam loop works on.

use core_logic::{Counter, UserCounters};

/// Balance (in MIST) under which the account is told to top up: 0.001025 SUI.
pub const LOW_BALANCE_THRESHOLD_MIST: u64 = 1_025_000;

pub fn is_low_balance(balance_mist: u64) -> bool {
    balance_mist < LOW_BALANCE_THRESHOLD_MIST
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterSlot {
    Current,
    Register,
    Claim,
    Delete,
}

/// Classify counters against network epoch `epoch`.
///
/// Same epoch goes to `current`, previous epoch to `register`, older
/// registered counters to `claim`. Duplicates and everything else are
/// deleted.
pub fn classify_counters(epoch: u64, counters: Vec<Counter>) -> UserCounters {
    let mut classified = UserCounters {
        epoch: epoch as i64,
        ..UserCounters::empty()
    };

    for counter in counters {
        let slot = if counter.epoch == epoch {
            classified.current.is_none().then_some(CounterSlot::Current)
        } else if epoch > 0 && counter.epoch == epoch - 1 {
            classified.register.is_none().then_some(CounterSlot::Register)
        } else if counter.epoch < epoch && counter.registered {
            Some(CounterSlot::Claim)
        } else {
            None
        };

        match slot {
            Some(CounterSlot::Current) => classified.current = Some(counter),
            Some(CounterSlot::Register) => classified.register = Some(counter),
            Some(CounterSlot::Claim) => classified.claim.push(counter),
            Some(CounterSlot::Delete) | None => classified.delete.push(counter),
        }
    }

    classified
}

/// Operator-facing status of a counter in a given slot.
pub fn counter_status_label(
    slot: CounterSlot,
    counter: &Counter,
    running: bool,
    low_balance: bool,
) -> &'static str {
    match slot {
        CounterSlot::Current if running => "spamming",
        CounterSlot::Current if low_balance => "top up to spam",
        CounterSlot::Current => "ready to spam",
        CounterSlot::Register if counter.registered => "claim on next epoch",
        CounterSlot::Register => "ready to register",
        CounterSlot::Claim => "ready to claim",
        CounterSlot::Delete => "unusable, will be deleted",
    }
}

/// Every counter in the snapshot with the slot it sits in.
fn slotted(counters: &UserCounters) -> Vec<(CounterSlot, &Counter)> {
    let mut all = Vec::new();
    if let Some(current) = &counters.current {
        all.push((CounterSlot::Current, current));
    }
    if let Some(register) = &counters.register {
        all.push((CounterSlot::Register, register));
    }
    all.extend(counters.claim.iter().map(|c| (CounterSlot::Claim, c)));
    all.extend(counters.delete.iter().map(|c| (CounterSlot::Delete, c)));
    all
}

/// Counters with their labels once the loop has returned. Nothing is
/// spamming at that point, so the current counter is never labelled as such.
pub fn stopped_report(counters: &UserCounters, low_balance: bool) -> Vec<(&Counter, &'static str)> {
    slotted(counters)
        .into_iter()
        .map(|(slot, counter)| (counter, counter_status_label(slot, counter, false, low_balance)))
        .collect()
}
