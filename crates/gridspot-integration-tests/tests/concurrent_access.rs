// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Concurrent readers must never trigger duplicate network fetches.

use gridspot_integration_tests::{MockSource, local, test_manager};
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cold_reads_fetch_exactly_once() {
    let source = MockSource::new(100.0);
    let manager = Arc::new(test_manager(source.clone()));
    let now = local((2026, 8, 29), (10, 5));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.fetch_data_at("SE3", false, now).await
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap().unwrap());
    }

    // The area lock serializes callers; the first one fetches, the rest
    // read the entry it stored
    assert_eq!(source.calls(), 1);
    let reference = &results[0].0.today;
    for (set, _) in &results {
        assert_eq!(&set.today, reference);
        assert_eq!(set.source, "mock");
    }
    assert_eq!(
        results.iter().filter(|(_, from_cache)| !from_cache).count(),
        1,
        "exactly one caller observed a network fetch"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_after_warmup_all_cached() {
    let source = MockSource::new(100.0);
    let manager = Arc::new(test_manager(source.clone()));

    manager
        .fetch_data_at("SE3", false, local((2026, 8, 29), (10, 0)))
        .await
        .unwrap();

    let now = local((2026, 8, 29), (10, 3));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager.fetch_data_at("SE3", false, now).await
        }));
    }
    for handle in handles {
        let (_, from_cache) = handle.await.unwrap().unwrap();
        assert!(from_cache);
    }
    assert_eq!(source.calls(), 1);
}
