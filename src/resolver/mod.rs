// src/resolver/mod.rs

//! Specificity-cascade resolution
//!
//! [`CascadeResolver`] walks an ordered list of candidate keys, most
//! specific first, and returns the first one its [`Probe`] can back with
//! content. With caching enabled, the content is kept under its canonical
//! key and every more specific key that missed on the way is indexed to
//! it, so later lookups for those keys skip the store entirely.
//!
//! ```text
//! [A, B, C]  probe A: miss, probe B: miss, probe C: hit
//!            cache[C] = content, index[A] = index[B] = index[C] = C
//! [B, ...]   index[B] -> C -> cache[C]   (no probe)
//! ```

pub mod candidates;

pub use candidates::{CandidateKey, generate};

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Backing storage that can answer a single candidate key
pub trait Probe: Send + Sync {
    type Entry: Clone + Send + Sync;

    /// `Ok(None)` is a miss; errors abort the cascade
    fn probe(&self, key: &CandidateKey) -> Result<Option<Self::Entry>>;
}

/// Content together with the key that actually backs it
#[derive(Debug, Clone)]
pub struct Resolved<E> {
    pub content: E,
    pub canonical: CandidateKey,
}

/// Cache and memoization index, guarded together so every indexed key
/// always points at a cached canonical key
struct Memo<E> {
    cache: HashMap<CandidateKey, E>,
    index: HashMap<CandidateKey, CandidateKey>,
}

impl<E> Default for Memo<E> {
    fn default() -> Self {
        Self {
            cache: HashMap::new(),
            index: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct ResolverStats {
    probes: AtomicU64,
    memo_hits: AtomicU64,
    store_hits: AtomicU64,
    misses: AtomicU64,
}

/// Point-in-time resolver counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolverSnapshot {
    /// Store probes performed
    pub probes: u64,
    /// Resolutions answered from the index
    pub memo_hits: u64,
    /// Resolutions answered by a store probe
    pub store_hits: u64,
    /// Resolutions that exhausted every candidate
    pub misses: u64,
    pub cached_entries: usize,
    pub indexed_keys: usize,
}

/// Ordered-fallback resolver over a [`Probe`]
///
/// Entries are never evicted or invalidated; growth is bounded by the
/// number of distinct descriptor combinations clients send.
pub struct CascadeResolver<P: Probe> {
    store: P,
    resource: &'static str,
    memo: Option<RwLock<Memo<P::Entry>>>,
    stats: ResolverStats,
}

impl<P: Probe> CascadeResolver<P> {
    /// Create a resolver; `resource` names the content in errors and logs
    pub fn new(store: P, resource: &'static str, use_cache: bool) -> Self {
        Self {
            store,
            resource,
            memo: use_cache.then(|| RwLock::new(Memo::default())),
            stats: ResolverStats::default(),
        }
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn caching(&self) -> bool {
        self.memo.is_some()
    }

    /// Resolve the first candidate with content
    ///
    /// Fails with `NotFound` carrying the most specific candidate when no
    /// key matches; probe errors (broken content, I/O) are returned as-is
    /// without trying less specific keys.
    pub fn resolve(&self, candidates: &[CandidateKey]) -> Result<Resolved<P::Entry>> {
        let Some(most_specific) = candidates.first() else {
            return Err(Error::NotFound {
                resource: self.resource,
                key: "(no candidates)".to_string(),
            });
        };

        for (idx, key) in candidates.iter().enumerate() {
            if let Some(found) = self.lookup(key) {
                self.stats.memo_hits.fetch_add(1, Ordering::Relaxed);
                if idx > 0 {
                    // earlier keys were probed and missed on this walk
                    let content = self.remember(&candidates[..idx], &found.canonical, found.content);
                    return Ok(Resolved {
                        content,
                        canonical: found.canonical,
                    });
                }
                return Ok(found);
            }

            self.stats.probes.fetch_add(1, Ordering::Relaxed);
            let Some(content) = self.store.probe(key)? else {
                continue;
            };

            self.stats.store_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                resource = self.resource,
                requested = %most_specific,
                canonical = %key,
                "resolved"
            );
            let content = self.remember(&candidates[..=idx], key, content);
            return Ok(Resolved {
                content,
                canonical: key.clone(),
            });
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            resource = self.resource,
            spec = %most_specific,
            "no {} found for spec",
            self.resource
        );
        Err(Error::NotFound {
            resource: self.resource,
            key: most_specific.to_string(),
        })
    }

    /// Canonical key an attempted key is indexed to, if any
    pub fn canonical_for(&self, key: &CandidateKey) -> Option<CandidateKey> {
        self.memo.as_ref()?.read().index.get(key).cloned()
    }

    pub fn snapshot(&self) -> ResolverSnapshot {
        let (cached_entries, indexed_keys) = match &self.memo {
            Some(memo) => {
                let memo = memo.read();
                (memo.cache.len(), memo.index.len())
            }
            None => (0, 0),
        };
        ResolverSnapshot {
            probes: self.stats.probes.load(Ordering::Relaxed),
            memo_hits: self.stats.memo_hits.load(Ordering::Relaxed),
            store_hits: self.stats.store_hits.load(Ordering::Relaxed),
            misses: self.stats.misses.load(Ordering::Relaxed),
            cached_entries,
            indexed_keys,
        }
    }

    fn lookup(&self, key: &CandidateKey) -> Option<Resolved<P::Entry>> {
        let memo = self.memo.as_ref()?.read();
        let canonical = memo.index.get(key)?;
        let content = memo.cache.get(canonical)?;
        Some(Resolved {
            content: content.clone(),
            canonical: canonical.clone(),
        })
    }

    /// Cache `content` under `canonical` and index every tried key to it
    ///
    /// The first writer wins, so concurrent resolutions of the same key
    /// hand back identical content.
    fn remember(
        &self,
        tried: &[CandidateKey],
        canonical: &CandidateKey,
        content: P::Entry,
    ) -> P::Entry {
        let Some(memo) = &self.memo else {
            return content;
        };
        let mut memo = memo.write();
        let stored = memo
            .cache
            .entry(canonical.clone())
            .or_insert(content)
            .clone();
        for key in tried.iter().rev() {
            memo.index.insert(key.clone(), canonical.clone());
        }
        memo.index.insert(canonical.clone(), canonical.clone());
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::Mutex;

    /// In-memory store that records every probe
    struct MapStore {
        entries: HashMap<String, Vec<u8>>,
        probed: Mutex<Vec<String>>,
    }

    impl MapStore {
        fn new(entries: &[(&str, &str)]) -> Self {
            Self {
                entries: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
                    .collect(),
                probed: Mutex::new(Vec::new()),
            }
        }

        fn probe_count(&self) -> usize {
            self.probed.lock().unwrap().len()
        }
    }

    impl Probe for MapStore {
        type Entry = Arc<[u8]>;

        fn probe(&self, key: &CandidateKey) -> Result<Option<Self::Entry>> {
            let rendered = key.to_string();
            self.probed.lock().unwrap().push(rendered.clone());
            match self.entries.get(&rendered) {
                Some(data) if data.is_empty() => Err(Error::InvalidEntry {
                    resource: "test",
                    key: rendered,
                    reason: "empty".to_string(),
                }),
                Some(data) => Ok(Some(Arc::from(data.as_slice()))),
                None => Ok(None),
            }
        }
    }

    fn keys(quals: &[&str]) -> Vec<CandidateKey> {
        (0..=quals.len())
            .rev()
            .map(|n| CandidateKey::new(&quals[..n], "graph", "cpu"))
            .collect()
    }

    #[test]
    fn test_second_resolution_skips_store() {
        let resolver = CascadeResolver::new(
            MapStore::new(&[("linux/graph/cpu", "linux")]),
            "template",
            true,
        );
        let candidates = keys(&["linux", "ubuntu", "16.04"]);

        let first = resolver.resolve(&candidates).unwrap();
        assert_eq!(&*first.content, b"linux");
        assert_eq!(first.canonical.to_string(), "linux/graph/cpu");
        let probes = resolver.store().probe_count();
        assert_eq!(probes, 3);

        let second = resolver.resolve(&candidates).unwrap();
        assert_eq!(first.content, second.content);
        assert_eq!(resolver.store().probe_count(), probes);
    }

    #[test]
    fn test_less_specific_list_uses_backfilled_index() {
        let resolver = CascadeResolver::new(
            MapStore::new(&[("graph/cpu", "universal")]),
            "template",
            true,
        );
        let full = keys(&["linux", "ubuntu"]);
        resolver.resolve(&full).unwrap();
        let probes = resolver.store().probe_count();

        // [linux/ubuntu, linux] tried and missed before the universal hit
        let shorter = vec![full[0].clone(), full[1].clone()];
        let resolved = resolver.resolve(&shorter).unwrap();
        assert_eq!(&*resolved.content, b"universal");
        assert!(resolved.canonical.is_universal());
        assert_eq!(resolver.store().probe_count(), probes);

        for key in &full {
            assert_eq!(resolver.canonical_for(key), Some(full[2].clone()));
        }
    }

    #[test]
    fn test_total_miss_reports_most_specific_key_and_indexes_nothing() {
        let resolver = CascadeResolver::new(MapStore::new(&[]), "template", true);
        let candidates = keys(&["linux", "ubuntu"]);

        match resolver.resolve(&candidates) {
            Err(Error::NotFound { resource, key }) => {
                assert_eq!(resource, "template");
                assert_eq!(key, "linux/ubuntu/graph/cpu");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
        let snap = resolver.snapshot();
        assert_eq!(snap.indexed_keys, 0);
        assert_eq!(snap.cached_entries, 0);
        assert_eq!(snap.misses, 1);
    }

    #[test]
    fn test_empty_entry_is_fatal_not_a_miss() {
        let resolver = CascadeResolver::new(
            MapStore::new(&[("linux/graph/cpu", ""), ("graph/cpu", "universal")]),
            "template",
            true,
        );
        let err = resolver.resolve(&keys(&["linux"])).unwrap_err();
        assert!(matches!(err, Error::InvalidEntry { .. }));
        // the universal key was never probed
        assert_eq!(resolver.store().probe_count(), 1);
    }

    #[test]
    fn test_cache_disabled_probes_every_time() {
        let resolver = CascadeResolver::new(
            MapStore::new(&[("graph/cpu", "universal")]),
            "template",
            false,
        );
        let candidates = keys(&["linux"]);
        resolver.resolve(&candidates).unwrap();
        resolver.resolve(&candidates).unwrap();
        assert_eq!(resolver.store().probe_count(), 4);
        assert_eq!(resolver.canonical_for(&candidates[0]), None);
        assert_eq!(resolver.snapshot().cached_entries, 0);
    }

    #[test]
    fn test_memo_hit_mid_walk_backfills_earlier_keys() {
        let resolver = CascadeResolver::new(
            MapStore::new(&[("linux/graph/cpu", "linux")]),
            "template",
            true,
        );
        // prime the index for the shorter walk only
        resolver.resolve(&keys(&["linux"])).unwrap();
        let probes = resolver.store().probe_count();

        let longer = keys(&["linux", "centos"]);
        resolver.resolve(&longer).unwrap();
        // only linux/centos was probed before the index answered
        assert_eq!(resolver.store().probe_count(), probes + 1);
        assert_eq!(
            resolver.canonical_for(&longer[0]).map(|k| k.to_string()),
            Some("linux/graph/cpu".to_string())
        );
    }

    #[test]
    fn test_index_always_points_at_cached_keys() {
        let resolver = CascadeResolver::new(
            MapStore::new(&[
                ("linux/ubuntu/graph/cpu", "ubuntu"),
                ("linux/graph/cpu", "linux"),
                ("graph/cpu", "universal"),
            ]),
            "template",
            true,
        );
        for quals in [
            vec!["linux", "ubuntu", "16.04"],
            vec!["linux", "centos", "7"],
            vec!["windows"],
            vec![],
        ] {
            resolver.resolve(&keys(&quals)).unwrap();
        }

        let memo = resolver.memo.as_ref().unwrap().read();
        let canonical: HashSet<_> = memo.index.values().collect();
        assert!(canonical.iter().all(|k| memo.cache.contains_key(*k)));
        assert_eq!(memo.cache.len(), 3);
    }

    #[test]
    fn test_concurrent_resolution_returns_identical_content() {
        let resolver = Arc::new(CascadeResolver::new(
            MapStore::new(&[("linux/graph/cpu", "linux"), ("graph/cpu", "universal")]),
            "template",
            true,
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    let quals: Vec<&str> = if i % 2 == 0 {
                        vec!["linux", "ubuntu", "16.04", "x86_64"]
                    } else {
                        vec!["freebsd", "12"]
                    };
                    (0..50)
                        .map(|_| resolver.resolve(&keys(&quals)).unwrap().content)
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let expected: &[u8] = if i % 2 == 0 { b"linux" } else { b"universal" };
            for content in handle.join().unwrap() {
                assert_eq!(&*content, expected);
            }
        }
        assert_eq!(resolver.snapshot().cached_entries, 2);
    }
}
