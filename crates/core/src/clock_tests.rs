// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Sketchwasm Contributors

use super::*;

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let start = clock.now();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.now() - start, Duration::from_secs(5));
}

#[test]
fn fake_clock_epoch_ms_tracks_advance() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(10_000);
    clock.advance(Duration::from_millis(250));
    assert_eq!(clock.epoch_ms(), 10_250);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance(Duration::from_secs(1));
    assert_eq!(clock.now(), other.now());
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock;
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
