//! Result cache for the dashboard's canned reports.
//!
//! Keyed by query fingerprint plus bound parameters; entries live for a
//! bounded TTL and are evicted lazily on access. Two racing misses for the
//! same key may both run the query and the last store wins. That is an
//! accepted relaxation, not a single-flight guarantee. The compute never
//! runs while a lock is held.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::executor::ExecutionError;
use crate::models::{CellValue, QueryResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: String,
    params: String,
}

impl CacheKey {
    fn new(fingerprint: &str, params: &[CellValue]) -> Self {
        // Canonical JSON rendering of the ordered parameters; same
        // fingerprint with different parameters is a different entry.
        let params = serde_json::to_string(params).unwrap_or_else(|_| format!("{params:?}"));
        Self {
            fingerprint: fingerprint.to_string(),
            params,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: QueryResult,
    inserted_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.duration_since(self.inserted_at) <= self.ttl
    }
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for (fingerprint, params) when fresh,
    /// otherwise run `compute`, store its result and return it. A failed
    /// compute caches nothing and propagates.
    pub async fn get_or_compute<F, Fut>(
        &self,
        fingerprint: &str,
        params: &[CellValue],
        ttl: Duration,
        compute: F,
    ) -> Result<QueryResult, ExecutionError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<QueryResult, ExecutionError>>,
    {
        let key = CacheKey::new(fingerprint, params);
        let now = Instant::now();

        let stale = {
            let entries = self
                .entries
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                Some(entry) if entry.is_fresh(now) => {
                    tracing::debug!(fingerprint, "Report cache hit");
                    return Ok(entry.result.clone());
                }
                Some(_) => true,
                None => false,
            }
        };

        if stale {
            // Lazy eviction; re-check under the write lock so a fresh
            // overwrite from a racing caller is kept.
            let mut entries = self
                .entries
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if entries.get(&key).is_some_and(|e| !e.is_fresh(now)) {
                entries.remove(&key);
            }
        }

        tracing::debug!(fingerprint, "Report cache miss, running query");
        let result = compute().await?;

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            key,
            CacheEntry {
                result: result.clone(),
                inserted_at: Instant::now(),
                ttl,
            },
        );

        Ok(result)
    }

    /// Point-in-time removal of every entry (the "Refresh Data" action).
    /// Never blocks future `get_or_compute` calls on a drain.
    pub fn clear_all(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, ColumnType};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn one_cell(value: i64) -> QueryResult {
        QueryResult::new(
            vec![Column {
                name: "total".to_string(),
                column_type: ColumnType::Integer,
            }],
            vec![vec![CellValue::Integer(value)]],
        )
    }

    fn date_range(start: &str, end: &str) -> Vec<CellValue> {
        vec![
            CellValue::Date(start.parse().unwrap()),
            CellValue::Date(end.parse().unwrap()),
        ]
    }

    const TTL: Duration = Duration::from_secs(300);

    #[tokio::test]
    async fn test_second_call_within_ttl_does_not_recompute() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);
        let params = date_range("2024-01-01", "2024-01-31");

        for _ in 0..2 {
            let result = cache
                .get_or_compute("daily_trend", &params, TTL, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(one_cell(50000))
                })
                .await
                .unwrap();
            assert_eq!(result.rows[0][0], CellValue::Integer(50000));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_all_forces_recompute() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);
        let params = date_range("2024-01-01", "2024-01-31");

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(one_cell(1))
        };

        cache
            .get_or_compute("kpi_summary", &params, TTL, compute)
            .await
            .unwrap();
        cache.clear_all();
        assert!(cache.is_empty());

        cache
            .get_or_compute("kpi_summary", &params, TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(one_cell(2))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_different_params_never_share_an_entry() {
        let cache = ResultCache::new();

        let january = cache
            .get_or_compute(
                "daily_trend",
                &date_range("2024-01-01", "2024-01-31"),
                TTL,
                || async { Ok(one_cell(11)) },
            )
            .await
            .unwrap();
        let february = cache
            .get_or_compute(
                "daily_trend",
                &date_range("2024-02-01", "2024-02-28"),
                TTL,
                || async { Ok(one_cell(22)) },
            )
            .await
            .unwrap();

        assert_eq!(january.rows[0][0], CellValue::Integer(11));
        assert_eq!(february.rows[0][0], CellValue::Integer(22));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);
        let params = date_range("2024-01-01", "2024-01-31");
        let short_ttl = Duration::from_millis(5);

        let compute = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(one_cell(7))
        };

        cache
            .get_or_compute("region_breakdown", &params, short_ttl, compute)
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        cache
            .get_or_compute("region_breakdown", &params, short_ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(one_cell(7))
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let cache = ResultCache::new();
        let calls = AtomicUsize::new(0);
        let params = date_range("2024-01-01", "2024-01-31");

        let err = cache
            .get_or_compute("kpi_summary", &params, TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ExecutionError::Query(sqlx::Error::RowNotFound))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok = cache
            .get_or_compute("kpi_summary", &params, TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(one_cell(3))
            })
            .await
            .unwrap();

        assert_eq!(ok.rows[0][0], CellValue::Integer(3));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
