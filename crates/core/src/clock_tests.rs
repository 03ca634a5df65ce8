// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_is_after_epoch() {
    let clock = SystemClock;
    assert!(clock.now() > UNIX_EPOCH);
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::from_secs(60));
    let t2 = clock.now();
    assert_eq!(t2.duration_since(t1).unwrap(), Duration::from_secs(60));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.now();
    clock2.advance(Duration::from_secs(30));
    let t2 = clock1.now();
    assert_eq!(t2.duration_since(t1).unwrap(), Duration::from_secs(30));
}

#[test]
fn fake_clock_can_be_set() {
    let clock = FakeClock::new();
    let target = UNIX_EPOCH + Duration::from_secs(42);
    clock.set(target);
    assert_eq!(clock.now(), target);
}

#[test]
fn fake_clock_is_deterministic() {
    assert_eq!(FakeClock::new().now(), FakeClock::new().now());
}
