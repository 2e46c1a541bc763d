//! Memoization of stage outputs.
//!
//! One slot per [`CacheKey`]. The map lock is held only long enough to find
//! or create the slot; the computation runs under the slot's own lock, so
//! concurrent requests for the same key compute once while unrelated keys
//! proceed in parallel. Stage dependencies form a DAG, which keeps slot
//! locks acquired in a consistent order.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::stage::StageOutput;

/// Identity of one cached computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub stage: String,
    pub method: String,
    pub instrument: Option<String>,
    pub rule: Option<String>,
}

impl CacheKey {
    pub fn new(stage: &str, method: &str) -> Self {
        Self {
            stage: stage.to_string(),
            method: method.to_string(),
            instrument: None,
            rule: None,
        }
    }

    pub fn instrument(stage: &str, method: &str, instrument: &str) -> Self {
        Self::new(stage, method).with_instrument(instrument)
    }

    pub fn rule(stage: &str, method: &str, instrument: &str, rule: &str) -> Self {
        Self::instrument(stage, method, instrument).with_rule(rule)
    }

    pub fn with_instrument(mut self, instrument: &str) -> Self {
        self.instrument = Some(instrument.to_string());
        self
    }

    pub fn with_rule(mut self, rule: &str) -> Self {
        self.rule = Some(rule.to_string());
        self
    }

    pub fn require_instrument(&self) -> Result<&str, PipelineError> {
        self.instrument.as_deref().ok_or_else(|| PipelineError::IncompleteKey {
            key: self.to_string(),
            part: "instrument",
        })
    }

    pub fn require_rule(&self) -> Result<&str, PipelineError> {
        self.rule.as_deref().ok_or_else(|| PipelineError::IncompleteKey {
            key: self.to_string(),
            part: "rule",
        })
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.stage, self.method)?;
        match (&self.instrument, &self.rule) {
            (Some(i), Some(r)) => write!(f, "[{i}/{r}]"),
            (Some(i), None) => write!(f, "[{i}]"),
            (None, Some(r)) => write!(f, "[*/{r}]"),
            (None, None) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

type Slot = Arc<Mutex<Option<StageOutput>>>;

#[derive(Debug, Default)]
pub struct StageCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Poisoned locks are taken over as-is; slots only ever hold complete values.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl StageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stored output for `key`, computing it first if needed.
    ///
    /// A failed computation leaves the slot empty; the next request retries.
    pub fn get_or_compute<F>(&self, key: &CacheKey, compute: F) -> Result<StageOutput, PipelineError>
    where
        F: FnOnce() -> Result<StageOutput, PipelineError>,
    {
        let slot = {
            let mut slots = lock(&self.slots);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let mut value = lock(&slot);
        if let Some(out) = value.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(out.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(%key, "cache miss");
        let out = compute()?;
        *value = Some(out.clone());
        Ok(out)
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        let slot = lock(&self.slots).get(key).cloned();
        slot.is_some_and(|s| lock(&s).is_some())
    }

    pub fn stats(&self) -> CacheStats {
        let slots: Vec<Slot> = lock(&self.slots).values().cloned().collect();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: slots.iter().filter(|s| lock(s).is_some()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bday_series;
    use std::sync::atomic::AtomicUsize;

    fn key() -> CacheKey {
        CacheKey::rule("rules", "raw_forecast", "SOFR", "ewmac8")
    }

    #[test]
    fn display_names_entity() {
        assert_eq!(key().to_string(), "rules.raw_forecast[SOFR/ewmac8]");
        assert_eq!(CacheKey::new("accounts", "portfolio").to_string(), "accounts.portfolio");
    }

    #[test]
    fn computes_once_then_hits() {
        let cache = StageCache::new();
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let out = cache
                .get_or_compute(&key(), || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(StageOutput::series(bday_series(&[1.0])))
                })
                .unwrap();
            assert_eq!(out.kind(), "series");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1
            }
        );
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = StageCache::new();
        let err = cache.get_or_compute(&key(), || Err(PipelineError::UnknownStage("x".into())));
        assert!(err.is_err());
        assert!(!cache.contains(&key()));

        cache
            .get_or_compute(&key(), || Ok(StageOutput::series(bday_series(&[2.0]))))
            .unwrap();
        assert!(cache.contains(&key()));
    }

    #[test]
    fn concurrent_requests_share_one_computation() {
        let cache = StageCache::new();
        let calls = AtomicUsize::new(0);
        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    cache
                        .get_or_compute(&key(), || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(20));
                            Ok(StageOutput::series(bday_series(&[3.0])))
                        })
                        .unwrap();
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_key_parts_are_reported() {
        let k = CacheKey::new("rules", "raw_forecast");
        assert!(matches!(
            k.require_instrument(),
            Err(PipelineError::IncompleteKey { part: "instrument", .. })
        ));
    }
}
