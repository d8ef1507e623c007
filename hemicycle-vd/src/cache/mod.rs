//! Legislator identity cache
//!
//! Three-tier resolution of legislator identifiers to names: in-memory map
//! (no I/O) → SQLite store → remote open-data API, with a synthetic
//! placeholder as the floor so the presentation layer never blocks on a
//! name. The cache is owned by the composition root and injected into
//! consumers; tests build fresh instances.
//!
//! State per `(identifier, legislature)`:
//!
//! ```text
//! unrequested → Loading{in_flight} → Resolved
//!                                  → NotFound          (authoritative miss)
//!                                  → Loading{parked}   (transient failure)
//! Resolved → Loading   only once the entry exceeds the freshness window
//! ```
//!
//! Updates are monotonic: a `Resolved` entry never regresses to empty. Only
//! identifiers requested with `Priority::Visible` arm the bounded
//! fixed-delay retry; everything else waits for the next read or for a full
//! sync (`clear` is invoked after a successful sync).

use chrono::Utc;
use futures::future::join_all;
use hemicycle_common::config::CacheConfig;
use hemicycle_common::db::legislators::{self, LegislatorRow};
use hemicycle_common::model::{canonical_legislator_id, LegislatorIdentity};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::client::OpenDataClient;
use crate::sync::roster;

/// Scheduling hint for a resolution request
///
/// `Visible` marks identifiers currently on screen: they are resolved
/// eagerly and are the only ones eligible for automatic retry. The hint
/// never affects correctness, only eagerness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Visible,
    Background,
}

#[derive(Debug, Clone)]
enum EntryState {
    /// Resolution requested; `in_flight` distinguishes an attempt currently
    /// running from one parked after a transient failure
    Loading { attempts: u32, in_flight: bool },
    Resolved(LegislatorIdentity),
    /// Every tier answered and none had the legislator; holds the synthetic
    /// placeholder shown instead
    NotFound(LegislatorIdentity),
}

/// Outcome of one pass through the resolution tiers
enum TierOutcome {
    Resolved(LegislatorIdentity),
    /// All tiers answered authoritatively without data
    Missing,
    /// At least one tier failed transiently; worth retrying
    Unavailable,
}

type CacheKey = (String, u32);

/// Process-wide legislator identity cache (cheaply cloneable handle)
#[derive(Clone)]
pub struct IdentityCache {
    db: SqlitePool,
    client: Arc<OpenDataClient>,
    config: CacheConfig,
    entries: Arc<RwLock<HashMap<CacheKey, EntryState>>>,
}

impl IdentityCache {
    pub fn new(db: SqlitePool, client: Arc<OpenDataClient>, config: CacheConfig) -> Self {
        Self {
            db,
            client,
            config,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Resolve one identifier, canonicalizing it first
    ///
    /// Always returns something displayable: the resolved identity, a
    /// pending identity (names empty) while another resolution is in
    /// flight, or the synthetic placeholder once the tiers came back empty.
    pub async fn resolve(
        &self,
        raw_id: &str,
        legislature: u32,
        priority: Priority,
    ) -> LegislatorIdentity {
        let id = canonical_legislator_id(raw_id);
        if id.is_empty() {
            return LegislatorIdentity::pending("");
        }
        let key = (id.clone(), legislature);

        // Fast path and single-flight guard under one write lock
        {
            let mut entries = self.entries.write().await;
            match entries.get(&key) {
                Some(EntryState::Resolved(identity)) if !self.is_stale(identity) => {
                    return identity.clone();
                }
                Some(EntryState::NotFound(placeholder)) => return placeholder.clone(),
                Some(EntryState::Loading { in_flight: true, .. }) => {
                    // A resolution is already running; a second fetch would
                    // be a duplicate, not a speedup
                    return LegislatorIdentity::pending(&id);
                }
                Some(EntryState::Loading {
                    attempts,
                    in_flight: false,
                }) if *attempts >= self.config.retry_max_attempts => {
                    // Retry budget exhausted; a full sync is the escape hatch
                    return LegislatorIdentity::placeholder(&id);
                }
                Some(EntryState::Loading {
                    attempts,
                    in_flight: false,
                }) => {
                    // Parked after a transient failure; this read re-attempts
                    let attempts = *attempts;
                    entries.insert(
                        key.clone(),
                        EntryState::Loading {
                            attempts,
                            in_flight: true,
                        },
                    );
                }
                _ => {
                    // Unrequested, or resolved but past the freshness window
                    entries.insert(
                        key.clone(),
                        EntryState::Loading {
                            attempts: 0,
                            in_flight: true,
                        },
                    );
                }
            }
        }

        self.attempt(&id, legislature, priority).await
    }

    /// Non-blocking read of an already-settled entry
    pub async fn peek(&self, raw_id: &str, legislature: u32) -> Option<LegislatorIdentity> {
        let id = canonical_legislator_id(raw_id);
        let entries = self.entries.read().await;
        match entries.get(&(id, legislature)) {
            Some(EntryState::Resolved(identity)) | Some(EntryState::NotFound(identity)) => {
                Some(identity.clone())
            }
            _ => None,
        }
    }

    /// Batched prefetch for a set of identifiers
    ///
    /// Identifiers already fresh in memory (or in flight) are skipped; the
    /// rest are loaded with a single store query, then any the batch missed
    /// fall back to individual resolution. One round-trip instead of N is
    /// the point; correctness never depends on it.
    pub async fn prefetch(&self, raw_ids: &[String], legislature: u32) {
        let mut needed: Vec<String> = Vec::new();
        {
            let mut entries = self.entries.write().await;
            for raw in raw_ids {
                let id = canonical_legislator_id(raw);
                if id.is_empty() || needed.contains(&id) {
                    continue;
                }
                let key = (id.clone(), legislature);
                let skip = match entries.get(&key) {
                    Some(EntryState::Resolved(identity)) => !self.is_stale(identity),
                    Some(EntryState::NotFound(_)) => true,
                    Some(EntryState::Loading { in_flight, .. }) => *in_flight,
                    None => false,
                };
                if !skip {
                    // Keep the attempt count of a parked entry; prefetch is
                    // not a fresh budget
                    let attempts = match entries.get(&key) {
                        Some(EntryState::Loading { attempts, .. }) => *attempts,
                        _ => 0,
                    };
                    entries.insert(
                        key,
                        EntryState::Loading {
                            attempts,
                            in_flight: true,
                        },
                    );
                    needed.push(id);
                }
            }
        }

        if needed.is_empty() {
            return;
        }

        tracing::debug!(count = needed.len(), legislature, "Prefetching legislator identities");

        let found = match legislators::batch_query(&self.db, &needed, legislature).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "Batched legislator query failed");
                HashMap::new()
            }
        };

        let mut missing: Vec<String> = Vec::new();
        {
            let mut entries = self.entries.write().await;
            for id in &needed {
                match found.get(id) {
                    Some(row) => {
                        let identity = row.clone().into_identity();
                        if identity.is_complete() {
                            entries.insert(
                                (id.clone(), legislature),
                                EntryState::Resolved(identity),
                            );
                        } else {
                            missing.push(id.clone());
                        }
                    }
                    None => missing.push(id.clone()),
                }
            }
        }

        // Individual fallback for identifiers the batch did not settle
        join_all(
            missing
                .iter()
                .map(|id| self.attempt(id, legislature, Priority::Background)),
        )
        .await;
    }

    /// Drop every entry; the next read re-consults the store
    ///
    /// Invoked after a successful sync so repopulated rows become visible
    /// even for entries whose retry budget was exhausted.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// One resolution attempt; caller has already marked the entry in flight
    async fn attempt(
        &self,
        id: &str,
        legislature: u32,
        priority: Priority,
    ) -> LegislatorIdentity {
        let key = (id.to_string(), legislature);
        let outcome = self.resolve_from_tiers(id, legislature).await;
        let mut entries = self.entries.write().await;

        match outcome {
            TierOutcome::Resolved(identity) => {
                entries.insert(key, EntryState::Resolved(identity.clone()));
                identity
            }
            TierOutcome::Missing => {
                let placeholder = LegislatorIdentity::placeholder(id);
                entries.insert(key, EntryState::NotFound(placeholder.clone()));
                placeholder
            }
            TierOutcome::Unavailable => {
                let attempts = match entries.get(&key) {
                    Some(EntryState::Loading { attempts, .. }) => attempts + 1,
                    _ => 1,
                };
                entries.insert(
                    key,
                    EntryState::Loading {
                        attempts,
                        in_flight: false,
                    },
                );
                drop(entries);

                if attempts >= self.config.retry_max_attempts {
                    tracing::warn!(
                        id,
                        attempts,
                        "Retry budget exhausted; entry stays unresolved until next sync"
                    );
                } else if priority == Priority::Visible {
                    self.arm_retry(id, legislature);
                }

                // The caller still gets something displayable
                LegislatorIdentity::placeholder(id)
            }
        }
    }

    /// One pass through the store and remote tiers
    async fn resolve_from_tiers(&self, id: &str, legislature: u32) -> TierOutcome {
        let mut degraded = false;

        // Persistent store, keyed by identifier + legislature
        match legislators::query(&self.db, id, legislature).await {
            Ok(Some(row)) => {
                let identity = row.into_identity();
                if identity.is_complete() {
                    return TierOutcome::Resolved(identity);
                }
                // Row exists but names are incomplete; ask the remote API
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, id, "Legislator store query failed");
                degraded = true;
            }
        }

        // Remote open-data API
        match self.client.fetch_acteur(id).await {
            Ok(Some(payload)) => {
                if let Some(identity) = roster::acteur_identity(&payload, id) {
                    // Write through so the store answers directly next time;
                    // the upsert is idempotent, a failure only costs latency
                    let row = LegislatorRow {
                        legislator_id: identity.legislator_id.clone(),
                        legislature,
                        first_name: identity.first_name.clone(),
                        last_name: identity.last_name.clone(),
                        profession: identity.profession.clone(),
                        political_group: identity.political_group.clone(),
                        political_group_id: identity.political_group_id.clone(),
                    };
                    if let Err(e) = legislators::upsert_one(&self.db, &row).await {
                        tracing::warn!(error = %e, id, "Write-through upsert failed");
                    }
                    return TierOutcome::Resolved(identity);
                }
                // Actor record exists but carries no usable name
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, id, "Remote actor fetch failed");
                degraded = true;
            }
        }

        if degraded {
            TierOutcome::Unavailable
        } else {
            TierOutcome::Missing
        }
    }

    /// Schedule a bounded fixed-delay retry for a visible identifier
    fn arm_retry(&self, id: &str, legislature: u32) {
        let cache = self.clone();
        let id = id.to_string();
        let delay = self.config.retry_delay();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cache.retry_if_loading(&id, legislature).await;
        });
    }

    /// Re-attempt a parked entry if it is still unresolved and in budget
    async fn retry_if_loading(&self, id: &str, legislature: u32) {
        let key = (id.to_string(), legislature);
        let should_retry = {
            let mut entries = self.entries.write().await;
            match entries.get(&key) {
                Some(EntryState::Loading {
                    attempts,
                    in_flight: false,
                }) if *attempts < self.config.retry_max_attempts => {
                    let attempts = *attempts;
                    entries.insert(
                        key.clone(),
                        EntryState::Loading {
                            attempts,
                            in_flight: true,
                        },
                    );
                    true
                }
                _ => false,
            }
        };

        if should_retry {
            tracing::debug!(id, "Retrying visible identifier still loading");
            self.attempt(id, legislature, Priority::Visible).await;
        }
    }

    fn is_stale(&self, identity: &LegislatorIdentity) -> bool {
        Utc::now().signed_duration_since(identity.fetched_at) > self.config.freshness()
    }

    #[cfg(test)]
    async fn loading_attempts(&self, id: &str, legislature: u32) -> Option<u32> {
        let entries = self.entries.read().await;
        match entries.get(&(id.to_string(), legislature)) {
            Some(EntryState::Loading { attempts, .. }) => Some(*attempts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::Router;
    use hemicycle_common::config::OpenDataConfig;
    use std::time::Duration;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        hemicycle_common::db::initialize_schema(&pool)
            .await
            .expect("Schema initialization failed");
        pool
    }

    fn seed_row(id: &str, first: &str, last: &str) -> LegislatorRow {
        LegislatorRow {
            legislator_id: id.to_string(),
            legislature: 16,
            first_name: first.to_string(),
            last_name: last.to_string(),
            profession: None,
            political_group: Some("Groupe Démocrate".to_string()),
            political_group_id: Some("PO800538".to_string()),
        }
    }

    /// Client pointing at a port that refuses connections (transient-failure tier)
    fn dead_client() -> Arc<OpenDataClient> {
        let config = OpenDataConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            ..OpenDataConfig::default()
        };
        Arc::new(OpenDataClient::new(&config).expect("Failed to build client"))
    }

    /// Client pointing at a local server that 404s everything (authoritative miss)
    async fn not_found_client() -> Arc<OpenDataClient> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        let app = Router::new().fallback(|| async { StatusCode::NOT_FOUND });
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let config = OpenDataConfig {
            base_url: format!("http://{}", addr),
            ..OpenDataConfig::default()
        };
        Arc::new(OpenDataClient::new(&config).expect("Failed to build client"))
    }

    fn cache_config(retry_delay_secs: u64) -> CacheConfig {
        CacheConfig {
            retry_delay_secs,
            ..CacheConfig::default()
        }
    }

    #[tokio::test]
    async fn test_resolves_from_store() {
        let pool = test_pool().await;
        legislators::upsert_one(&pool, &seed_row("PA1234", "Jean", "Dupont"))
            .await
            .unwrap();

        let cache = IdentityCache::new(pool, dead_client(), cache_config(10));
        let identity = cache.resolve("PA1234", 16, Priority::Background).await;

        assert_eq!(identity.first_name, "Jean");
        assert_eq!(identity.last_name, "Dupont");
        assert!(identity.is_complete());

        // Second read is served from memory
        let again = cache.resolve("PA1234", 16, Priority::Background).await;
        assert_eq!(again.display_name(), "Jean Dupont");
    }

    #[tokio::test]
    async fn test_bare_digits_resolve_canonically() {
        let pool = test_pool().await;
        legislators::upsert_one(&pool, &seed_row("PA1234", "Jean", "Dupont"))
            .await
            .unwrap();

        let cache = IdentityCache::new(pool, dead_client(), cache_config(10));
        let identity = cache.resolve("1234", 16, Priority::Background).await;

        assert_eq!(identity.legislator_id, "PA1234");
        assert!(identity.is_complete());
    }

    #[tokio::test]
    async fn test_authoritative_miss_settles_as_not_found() {
        let pool = test_pool().await;
        let cache = IdentityCache::new(pool, not_found_client().await, cache_config(10));

        let identity = cache.resolve("PA1234", 16, Priority::Visible).await;
        assert_eq!(identity.display_name(), "Député 1234");

        // Settled: a later read returns the placeholder without new attempts
        let again = cache.resolve("PA1234", 16, Priority::Visible).await;
        assert_eq!(again.display_name(), "Député 1234");
        assert_eq!(cache.loading_attempts("PA1234", 16).await, None);
    }

    #[tokio::test]
    async fn test_concurrent_reads_single_flight() {
        let pool = test_pool().await;
        let cache = IdentityCache::new(pool, dead_client(), cache_config(1000));

        let (a, b) = tokio::join!(
            cache.resolve("PA1", 16, Priority::Background),
            cache.resolve("PA1", 16, Priority::Background)
        );

        // Both callers got a displayable value and only one attempt ran
        assert_eq!(a.legislator_id, "PA1");
        assert_eq!(b.legislator_id, "PA1");
        assert_eq!(cache.loading_attempts("PA1", 16).await, Some(1));
    }

    #[tokio::test]
    async fn test_visible_retry_is_bounded() {
        let pool = test_pool().await;
        // Zero delay so armed retries fire immediately
        let cache = IdentityCache::new(pool.clone(), dead_client(), cache_config(0));

        let identity = cache.resolve("PA77", 16, Priority::Visible).await;
        assert_eq!(identity.display_name(), "Député 77");

        // Wait for the armed retries to drain the budget
        for _ in 0..100 {
            if cache.loading_attempts("PA77", 16).await == Some(3) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(cache.loading_attempts("PA77", 16).await, Some(3));

        // Budget exhausted: further reads return the placeholder, no new attempts
        let after = cache.resolve("PA77", 16, Priority::Visible).await;
        assert_eq!(after.display_name(), "Député 77");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.loading_attempts("PA77", 16).await, Some(3));
    }

    #[tokio::test]
    async fn test_background_failure_does_not_arm_retry() {
        let pool = test_pool().await;
        let cache = IdentityCache::new(pool, dead_client(), cache_config(0));

        cache.resolve("PA5", 16, Priority::Background).await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        // One attempt, parked; no timer was armed
        assert_eq!(cache.loading_attempts("PA5", 16).await, Some(1));
    }

    #[tokio::test]
    async fn test_prefetch_batches_and_falls_back() {
        let pool = test_pool().await;
        legislators::upsert_one(&pool, &seed_row("PA1", "Anne", "Martin"))
            .await
            .unwrap();
        legislators::upsert_one(&pool, &seed_row("PA2", "Paul", "Bernard"))
            .await
            .unwrap();

        let cache = IdentityCache::new(pool, dead_client(), cache_config(10));
        let ids = vec!["PA1".to_string(), "2".to_string(), "PA3".to_string()];
        cache.prefetch(&ids, 16).await;

        // Batch settled the two stored ids (including the canonicalized one)
        assert_eq!(
            cache.peek("PA1", 16).await.map(|i| i.display_name()),
            Some("Anne Martin".to_string())
        );
        assert_eq!(
            cache.peek("PA2", 16).await.map(|i| i.display_name()),
            Some("Paul Bernard".to_string())
        );
        // The missing one fell back to individual resolution and parked
        assert_eq!(cache.loading_attempts("PA3", 16).await, Some(1));
    }

    #[tokio::test]
    async fn test_stale_entry_is_refetched() {
        let pool = test_pool().await;
        legislators::upsert_one(&pool, &seed_row("PA1", "Anne", "Martin"))
            .await
            .unwrap();
        let cache = IdentityCache::new(pool.clone(), dead_client(), cache_config(10));

        // Plant a resolved entry past the freshness window with an old name
        let stale = LegislatorIdentity {
            legislator_id: "PA1".to_string(),
            first_name: "Ancienne".to_string(),
            last_name: "Valeur".to_string(),
            profession: None,
            political_group: None,
            political_group_id: None,
            fetched_at: Utc::now() - chrono::Duration::hours(25),
        };
        cache
            .entries
            .write()
            .await
            .insert(("PA1".to_string(), 16), EntryState::Resolved(stale));

        let identity = cache.resolve("PA1", 16, Priority::Background).await;
        assert_eq!(identity.display_name(), "Anne Martin");
    }

    #[tokio::test]
    async fn test_clear_reopens_exhausted_entries() {
        let pool = test_pool().await;
        let cache = IdentityCache::new(pool.clone(), dead_client(), cache_config(0));

        cache.resolve("PA9", 16, Priority::Visible).await;
        for _ in 0..100 {
            if cache.loading_attempts("PA9", 16).await == Some(3) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // Simulate a sync repopulating the store, then clearing the cache
        legislators::upsert_one(&pool, &seed_row("PA9", "Neuf", "Nouveau"))
            .await
            .unwrap();
        cache.clear().await;

        let identity = cache.resolve("PA9", 16, Priority::Background).await;
        assert_eq!(identity.display_name(), "Neuf Nouveau");
    }
}
