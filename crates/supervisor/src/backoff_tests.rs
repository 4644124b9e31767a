// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn first_failure_delays_by_the_floor() {
    let mut backoff = Backoff::new();
    assert_eq!(backoff.note_failure(), Some(Duration::from_secs(1)));
}

#[test]
fn delay_doubles_up_to_the_cap() {
    let mut backoff = Backoff::new();
    let delays: Vec<_> = (0..8).map(|_| backoff.note_failure().unwrap()).collect();
    assert_eq!(
        delays,
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4),
            Duration::from_secs(8),
            Duration::from_secs(16),
            Duration::from_secs(30),
            Duration::from_secs(30),
            Duration::from_secs(30),
        ]
    );
}

#[test]
fn gives_up_on_the_tenth_consecutive_failure() {
    let mut backoff = Backoff::new();
    for _ in 0..9 {
        assert!(backoff.note_failure().is_some());
    }
    assert!(!backoff.given_up());
    assert_eq!(backoff.note_failure(), None);
    assert!(backoff.given_up());
}

#[test]
fn stability_resets_the_failure_count() {
    let mut backoff = Backoff::new();
    for _ in 0..5 {
        backoff.note_failure();
    }
    backoff.note_stable();
    assert_eq!(backoff.note_failure(), Some(Duration::from_secs(1)));
}
