// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_returns_increasing_time() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 > t1);
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    let ms1 = clock.epoch_ms();
    clock.advance(Duration::from_secs(60));
    assert!(clock.now().duration_since(t1) >= Duration::from_secs(60));
    assert_eq!(clock.epoch_ms(), ms1 + 60_000);
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    clock2.advance(Duration::from_secs(30));
    assert!(clock1.now().duration_since(clock2.now()) == Duration::ZERO);
}

#[test]
fn now_utc_tracks_epoch_ms() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_741_091_657_000); // 2025-03-04T12:34:17Z
    let utc = clock.now_utc();
    assert_eq!(utc.to_rfc3339(), "2025-03-04T12:34:17+00:00");
}

#[test]
fn system_clock_epoch_is_recent() {
    let clock = SystemClock;
    // Sometime after 2024.
    assert!(clock.epoch_ms() > 1_704_067_200_000);
}
