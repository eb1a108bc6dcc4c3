// Copyright (c) 2026 GRIDSPOT CONTRIBUTORS
//
// This file is part of GridSpot.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.

//! Narrow interface to the source-specific market clients
//!
//! Each market (Nord Pool, ENTSO-E, Energi Data Service, ...) implements
//! [`PriceSource`] and returns a canonical per-interval price map. The core
//! depends only on this trait; priority fallback is a plain ordered list.

use async_trait::async_trait;
use gridspot_types::{GridspotError, Result, SourceFetchResult};
use std::sync::Arc;
use tracing::{debug, warn};

/// One external price-providing market API
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Stable id used in configuration and cache keys
    fn id(&self) -> &str;

    /// Fetch and parse prices for an area into canonical form. Any failure
    /// (network, parse, timeout) surfaces as an error; timeouts are owned by
    /// the client implementation.
    async fn fetch_and_parse(&self, area: &str) -> Result<SourceFetchResult>;
}

/// Outcome of walking the fallback chain
#[derive(Debug, Clone)]
pub struct ChainFetch {
    pub result: SourceFetchResult,
    /// Id of the source that succeeded
    pub source: String,
    /// All ids tried, in order
    pub attempted: Vec<String>,
    /// Ids that failed before one succeeded
    pub failed: Vec<String>,
}

/// Ordered source fallback for one area
#[derive(Clone)]
pub struct SourceChain {
    sources: Vec<Arc<dyn PriceSource>>,
}

impl std::fmt::Debug for SourceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceChain")
            .field("sources", &self.ids())
            .finish()
    }
}

impl SourceChain {
    pub fn new(sources: Vec<Arc<dyn PriceSource>>) -> Self {
        Self { sources }
    }

    pub fn ids(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.id().to_string()).collect()
    }

    /// Id of the highest-priority source, used for rate-limit overrides
    pub fn primary_id(&self) -> Option<String> {
        self.sources.first().map(|s| s.id().to_string())
    }

    /// Try each source in priority order until one succeeds.
    pub async fn fetch(&self, area: &str) -> Result<ChainFetch> {
        let mut attempted = Vec::new();
        let mut failed = Vec::new();

        for source in &self.sources {
            attempted.push(source.id().to_string());
            debug!(area, source = source.id(), "attempting source fetch");
            match source.fetch_and_parse(area).await {
                Ok(result) => {
                    return Ok(ChainFetch {
                        result,
                        source: source.id().to_string(),
                        attempted,
                        failed,
                    });
                }
                Err(e) => {
                    warn!(area, source = source.id(), "source failed: {e}");
                    failed.push(source.id().to_string());
                }
            }
        }

        Err(GridspotError::AllSourcesExhausted {
            area: area.to_string(),
            attempted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridspot_types::price::PriceMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        id: String,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(id: &str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PriceSource for FixedSource {
        fn id(&self) -> &str {
            &self.id
        }

        async fn fetch_and_parse(&self, _area: &str) -> Result<SourceFetchResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GridspotError::SourceFetch {
                    source_id: self.id.clone(),
                    message: "unreachable".to_string(),
                });
            }
            Ok(SourceFetchResult {
                today: PriceMap::from([("00:00".to_string(), 50.0)]),
                tomorrow: PriceMap::new(),
                source_currency: "EUR".to_string(),
                source_timezone: "Europe/Oslo".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let primary = FixedSource::new("nordpool", false);
        let backup = FixedSource::new("entsoe", false);
        let chain = SourceChain::new(vec![
            primary.clone() as Arc<dyn PriceSource>,
            backup.clone() as Arc<dyn PriceSource>,
        ]);

        let fetch = chain.fetch("SE3").await.unwrap();
        assert_eq!(fetch.source, "nordpool");
        assert_eq!(fetch.attempted, vec!["nordpool"]);
        assert!(fetch.failed.is_empty());
        assert_eq!(backup.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_to_next_source() {
        let primary = FixedSource::new("nordpool", true);
        let backup = FixedSource::new("entsoe", false);
        let chain = SourceChain::new(vec![
            primary as Arc<dyn PriceSource>,
            backup as Arc<dyn PriceSource>,
        ]);

        let fetch = chain.fetch("SE3").await.unwrap();
        assert_eq!(fetch.source, "entsoe");
        assert_eq!(fetch.attempted, vec!["nordpool", "entsoe"]);
        assert_eq!(fetch.failed, vec!["nordpool"]);
    }

    #[tokio::test]
    async fn test_all_sources_exhausted() {
        let chain = SourceChain::new(vec![
            FixedSource::new("nordpool", true) as Arc<dyn PriceSource>,
            FixedSource::new("entsoe", true) as Arc<dyn PriceSource>,
        ]);

        let err = chain.fetch("SE3").await.unwrap_err();
        assert!(matches!(
            err,
            GridspotError::AllSourcesExhausted { ref area, ref attempted }
                if area == "SE3" && attempted.len() == 2
        ));
    }
}
