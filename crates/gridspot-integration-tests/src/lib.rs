// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Shared fixtures for the integration tests

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use gridspot_core::{PriceSource, UnifiedPriceManager};
use gridspot_types::price::PriceMap;
use gridspot_types::{GridspotConfig, GridspotError, Result, SourceFetchResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

pub const TEST_TZ: &str = "Europe/Stockholm";

/// Mock market source with a scriptable failure switch and call counter.
/// Holds each request briefly so concurrent callers actually overlap.
pub struct MockSource {
    calls: AtomicUsize,
    failing: AtomicBool,
    today_price: f64,
    tomorrow_price: Option<f64>,
}

impl MockSource {
    pub fn new(today_price: f64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            today_price,
            tomorrow_price: None,
        })
    }

    pub fn with_tomorrow(today_price: f64, tomorrow_price: f64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            today_price,
            tomorrow_price: Some(tomorrow_price),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

pub fn full_day(price: f64) -> PriceMap {
    let mut map = PriceMap::new();
    for slot in 0..96 {
        let minutes = slot * 15;
        map.insert(format!("{:02}:{:02}", minutes / 60, minutes % 60), price);
    }
    map
}

#[async_trait]
impl PriceSource for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    async fn fetch_and_parse(&self, _area: &str) -> Result<SourceFetchResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(GridspotError::SourceFetch {
                source_id: "mock".to_string(),
                message: "scripted outage".to_string(),
            });
        }
        Ok(SourceFetchResult {
            today: full_day(self.today_price),
            tomorrow: self.tomorrow_price.map(full_day).unwrap_or_default(),
            source_currency: "EUR".to_string(),
            source_timezone: "Europe/Oslo".to_string(),
        })
    }
}

/// Single-area manager wired to the given mock, grace period already elapsed
pub fn test_manager(source: Arc<MockSource>) -> UnifiedPriceManager {
    let config: GridspotConfig = toml::from_str(
        r#"
            [[areas]]
            id = "SE3"
            timezone = "Europe/Stockholm"
            currency = "SEK"
            vat_rate = 0.25
            sources = ["mock"]
        "#,
    )
    .unwrap();
    let mut registry: HashMap<String, Arc<dyn PriceSource>> = HashMap::new();
    registry.insert("mock".to_string(), source);
    UnifiedPriceManager::new(&config, &registry)
        .unwrap()
        .with_start_time(local((2026, 8, 1), (0, 0)))
}

pub fn local(date: (i32, u32, u32), time: (u32, u32)) -> DateTime<Utc> {
    let tz: Tz = TEST_TZ.parse().unwrap();
    tz.with_ymd_and_hms(date.0, date.1, date.2, time.0, time.1, 0)
        .unwrap()
        .with_timezone(&Utc)
}
