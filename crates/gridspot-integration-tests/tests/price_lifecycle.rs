// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! End-to-end price lifecycle: cold start, cached reads, interval
//! boundaries, source outages with backoff, and the midnight rollover.

use gridspot_integration_tests::{MockSource, local, test_manager};
use gridspot_types::GridspotError;

#[tokio::test]
async fn test_cold_start_fetches_and_snapshot_reflects_it() {
    let source = MockSource::new(100.0);
    let manager = test_manager(source.clone());
    let now = local((2026, 8, 29), (10, 5));

    let (set, from_cache) = manager.fetch_data_at("SE3", false, now).await.unwrap();
    assert!(!from_cache);
    assert_eq!(source.calls(), 1);
    assert_eq!(set.today.len(), 96);

    let snapshot = manager.snapshot_at("SE3", now).await.unwrap();
    assert_eq!(snapshot.area, "SE3");
    assert_eq!(snapshot.current_key, "10:00");
    assert_eq!(snapshot.next_key, "10:15");
    // 100 EUR/MWh -> 0.125 /kWh with 25% VAT
    assert!((snapshot.current_price.unwrap() - 0.125).abs() < 1e-9);
    assert!((snapshot.next_interval_price.unwrap() - 0.125).abs() < 1e-9);
    assert!(snapshot.using_cached_data, "snapshot reads back the store");
    assert!(snapshot.tomorrow.is_none());
    let stats = snapshot.statistics.unwrap();
    assert!((stats.min - 0.125).abs() < 1e-9);
    assert!((stats.max - 0.125).abs() < 1e-9);
}

#[tokio::test]
async fn test_repeat_reads_within_interval_hit_cache() {
    let source = MockSource::new(100.0);
    let manager = test_manager(source.clone());

    manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 5)))
        .await
        .unwrap();
    for minute in 6..14 {
        let (_, from_cache) = manager
            .fetch_data_at("SE3", false, local((2026, 8, 29), (10, minute)))
            .await
            .unwrap();
        assert!(from_cache);
    }
    assert_eq!(source.calls(), 1);
}

#[tokio::test]
async fn test_interval_boundary_with_full_day_stays_cached() {
    let source = MockSource::new(100.0);
    let manager = test_manager(source.clone());

    manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 0)))
        .await
        .unwrap();
    // New interval, new spacing allowance, but the day is already covered
    let (set, from_cache) = manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 16)))
        .await
        .unwrap();
    assert!(from_cache);
    assert_eq!(source.calls(), 1);
    assert!(set.price_at("10:15").is_some());
}

#[tokio::test]
async fn test_outage_backs_off_then_recovers() {
    let source = MockSource::new(100.0);
    source.set_failing(true);
    let manager = test_manager(source.clone());

    // Cold start against a dead source: nothing cached to fall back on
    let err = manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, GridspotError::AllSourcesExhausted { .. }));
    assert_eq!(source.calls(), 1);

    // Inside the backoff window no retry happens even though the current
    // interval is missing
    source.set_failing(false);
    let err = manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 5)))
        .await
        .unwrap_err();
    assert!(matches!(err, GridspotError::NoData(_)));
    assert_eq!(source.calls(), 1);

    // Backoff (15 min after one failure) has elapsed
    let (set, from_cache) = manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 20)))
        .await
        .unwrap();
    assert!(!from_cache);
    assert_eq!(source.calls(), 2);
    assert!(set.error_code.is_none());
}

#[tokio::test]
async fn test_outage_serves_annotated_stale_copy() {
    let source = MockSource::new(100.0);
    let manager = test_manager(source.clone());

    manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 0)))
        .await
        .unwrap();

    source.set_failing(true);
    let (set, from_cache) = manager
        .fetch_data_at("SE3", true, local((2026, 8, 29), (11, 0)))
        .await
        .unwrap();
    assert!(from_cache);
    assert_eq!(set.error_code.as_deref(), Some("all_sources_exhausted"));
    assert!(set.price_at("11:00").is_some(), "stale data still served");
}

#[tokio::test]
async fn test_midnight_rollover_promotes_tomorrow() {
    let source = MockSource::with_tomorrow(100.0, 200.0);
    let manager = test_manager(source.clone());

    let (evening, _) = manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (23, 50)))
        .await
        .unwrap();
    assert!(evening.has_tomorrow());

    // Just past midnight: yesterday's tomorrow becomes today, no refetch
    let (set, from_cache) = manager
        .fetch_data_at("SE3", false, local((2026, 8, 30), (0, 5)))
        .await
        .unwrap();
    assert!(from_cache);
    assert_eq!(source.calls(), 1);
    assert!(set.migrated_from_tomorrow);
    assert_eq!(set.today.len(), 96);
    // 200 EUR/MWh -> 0.25 /kWh with 25% VAT
    assert!((set.price_at("00:00").unwrap() - 0.25).abs() < 1e-9);
    assert!(!set.has_tomorrow());

    let snapshot = manager.snapshot_at("SE3", local((2026, 8, 30), (0, 7))).await.unwrap();
    assert!((snapshot.current_price.unwrap() - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn test_clear_cache_forces_network_on_next_read() {
    let source = MockSource::new(100.0);
    let manager = test_manager(source.clone());

    manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 0)))
        .await
        .unwrap();
    manager.clear_cache(Some("SE3"));

    // Spacing would normally defer, but the current interval is gone from
    // the cache, which overrides everything except an active backoff
    let (_, from_cache) = manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 10)))
        .await
        .unwrap();
    assert!(!from_cache);
    assert_eq!(source.calls(), 2);
}
