use core_logic::{BackoffConfig, ErrorCategory, SpamTimings};
use std::time::Duration;

#[test]
fn test_backoff_grows_and_caps() {
    let config = BackoffConfig::new(10).with_max_delay(50);

    assert_eq!(config.delay(0), Duration::from_millis(10));
    assert_eq!(config.delay(1), Duration::from_millis(20));
    assert_eq!(config.delay(2), Duration::from_millis(40));
    assert_eq!(config.delay(3), Duration::from_millis(50));
    assert_eq!(config.delay(30), Duration::from_millis(50));
}

#[test]
fn test_backoff_jitter_stays_in_range() {
    let config = BackoffConfig::new(100).with_jitter(true);

    for _ in 0..50 {
        let delay = config.delay(0);
        assert!(delay >= Duration::from_millis(50));
        assert!(delay <= Duration::from_millis(150));
    }
}

#[test]
fn test_unexpected_backoff_is_fixed_by_default() {
    let config = BackoffConfig::for_unexpected(&SpamTimings::default());

    for attempt in 0..5 {
        assert_eq!(config.delay(attempt), Duration::from_secs(30));
    }
}

#[test]
fn test_unexpected_recovery_uses_configured_growth() {
    let timings = SpamTimings {
        unexpected_error_ms: 1_000,
        unexpected_backoff_factor: 3.0,
        unexpected_max_ms: 5_000,
        ..SpamTimings::default()
    };

    let delays: Vec<Duration> = (1..=4)
        .map(|n| ErrorCategory::Unexpected.recovery(&timings, n).delay)
        .collect();

    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(3),
            Duration::from_secs(5),
            Duration::from_secs(5),
        ]
    );
}

#[test]
fn test_without_delays_zeroes_every_sleep() {
    let timings = SpamTimings::without_delays();

    for category in ErrorCategory::ALL {
        assert!(category.recovery(&timings, 3).delay.is_zero(), "{}", category);
    }
    assert!(timings.rotate_settle().is_zero());
    assert!(timings.localnet_latency().is_zero());
}
