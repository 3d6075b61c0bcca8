//! Advisory facet-count cache.
//!
//! Losing an entry only costs a recomputation. Two requests missing on the
//! same key may both compute and store; the later write wins.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use super::facets::FacetCounts;
use super::filter::FilterSet;

pub trait FacetCache: Send + Sync {
    fn get(&self, key: &str) -> Option<FacetCounts>;
    fn set(&self, key: &str, counts: FacetCounts);
    fn ttl(&self) -> Duration;
}

/// Process-wide cache; entries older than the TTL read as misses and are
/// dropped on the next write.
#[derive(Debug)]
pub struct InMemoryFacetCache {
    ttl: Duration,
    entries: DashMap<String, (Instant, FacetCounts)>,
}

impl InMemoryFacetCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FacetCache for InMemoryFacetCache {
    fn get(&self, key: &str) -> Option<FacetCounts> {
        let fresh = self.entries.get(key).and_then(|entry| {
            let (stored_at, counts) = entry.value();
            (stored_at.elapsed() < self.ttl).then(|| counts.clone())
        });
        if fresh.is_none() {
            self.entries
                .remove_if(key, |_, (stored_at, _)| stored_at.elapsed() >= self.ttl);
        }
        fresh
    }

    fn set(&self, key: &str, counts: FacetCounts) {
        self.entries
            .retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        self.entries
            .insert(key.to_string(), (Instant::now(), counts));
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopFacetCache;

impl FacetCache for NoopFacetCache {
    fn get(&self, _key: &str) -> Option<FacetCounts> {
        None
    }

    fn set(&self, _key: &str, _counts: FacetCounts) {}

    fn ttl(&self) -> Duration {
        Duration::ZERO
    }
}

/// Deterministic key for the facet counts of `filters`. Pagination, sort and
/// seed are not part of a filter set, so they never change the key.
pub fn cache_key(filters: &FilterSet) -> String {
    let filters = filters.clone().normalized();
    let mut hasher = Sha256::new();
    let mut section = |name: &str, values: Vec<String>| {
        hasher.update(name.as_bytes());
        hasher.update([0x1e]);
        for value in values {
            hasher.update(value.as_bytes());
            hasher.update([0x1f]);
        }
    };
    section("search", filters.search.into_iter().collect());
    section(
        "years",
        filters.years.iter().map(ToString::to_string).collect(),
    );
    section("genres", filters.genres);
    section("countries", filters.countries);
    section("locations", filters.locations);
    section(
        "media",
        filters
            .media
            .iter()
            .map(|format| format.label().to_string())
            .collect(),
    );
    format!("facets:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::filter::{MediaFormat, YearToken};

    fn counts_with_genre(genre: &str) -> FacetCounts {
        let mut counts = FacetCounts::default();
        counts.genres.add(genre, 1);
        counts
    }

    #[test]
    fn stored_counts_are_returned_until_they_expire() {
        let cache = InMemoryFacetCache::new(Duration::from_secs(300));
        cache.set("k", counts_with_genre("Horror"));
        assert_eq!(cache.get("k"), Some(counts_with_genre("Horror")));
        assert_eq!(cache.get("other"), None);

        let expired = InMemoryFacetCache::new(Duration::ZERO);
        expired.set("k", counts_with_genre("Horror"));
        assert_eq!(expired.get("k"), None);
        assert!(expired.is_empty());
    }

    #[test]
    fn writing_drops_entries_expired_under_other_keys() {
        let cache = InMemoryFacetCache::new(Duration::from_millis(10));
        for n in 0..1000 {
            cache.set(&format!("search-{}", n), counts_with_genre("Drama"));
        }

        std::thread::sleep(Duration::from_millis(50));
        cache.set("fresh", counts_with_genre("Horror"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("fresh"), Some(counts_with_genre("Horror")));
    }

    #[test]
    fn noop_cache_never_hits() {
        let cache = NoopFacetCache;
        cache.set("k", counts_with_genre("Drama"));
        assert_eq!(cache.get("k"), None);
    }

    #[test]
    fn key_ignores_selection_order_and_duplicates() {
        let a = FilterSet {
            genres: vec!["Horror".into(), "Drama".into()],
            media: vec![MediaFormat::Dvd],
            ..Default::default()
        };
        let b = FilterSet {
            genres: vec!["Drama".into(), "Horror".into(), "Drama".into()],
            media: vec![MediaFormat::Dvd, MediaFormat::Dvd],
            ..Default::default()
        };
        assert_eq!(cache_key(&a), cache_key(&b));
    }

    #[test]
    fn key_separates_dimensions() {
        let genre = FilterSet {
            genres: vec!["France".into()],
            ..Default::default()
        };
        let country = FilterSet {
            countries: vec!["France".into()],
            ..Default::default()
        };
        let year = FilterSet {
            years: vec![YearToken::Year(1994)],
            ..Default::default()
        };
        assert_ne!(cache_key(&genre), cache_key(&country));
        assert_ne!(cache_key(&genre), cache_key(&year));
        assert_ne!(cache_key(&FilterSet::default()), cache_key(&genre));
    }
}
