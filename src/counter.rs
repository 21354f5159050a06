//! TopNCounter: bounded-memory accumulation with watermark culling.
//!
//! Counts accumulate in a [`ChainedHashMap`]. Whenever the number of live
//! keys reaches the high watermark, the table is sorted and cut back to the
//! low watermark. On skewed streams the eventual heavy hitters pile up
//! counts fast enough to stay above every cut; on flat streams they may not,
//! and an evicted key restarts from zero if it shows up again.

use crate::chained_map::{ChainedHashMap, TableStats};
use crate::error::ConfigError;
use crate::hash::{KeyHasher, SuperFastHash};
use crate::ranking::Ranker;
use std::io::{self, Write};
use tracing::{debug, info};

/// Entry-count thresholds and output size, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    output_count: usize,
    low: usize,
    high: usize,
}

impl Watermarks {
    pub const DEFAULT_OUTPUT_COUNT: usize = 100;
    pub const DEFAULT_LOW: usize = 500_000;
    pub const DEFAULT_HIGH: usize = 1_000_000;

    /// Requires `0 < high` and `low <= high`. With `low == high` the table
    /// becomes a hard cap that evicts one entry per new key.
    pub fn new(output_count: usize, low: usize, high: usize) -> Result<Self, ConfigError> {
        if high == 0 {
            return Err(ConfigError::ZeroHighWatermark);
        }
        if low > high {
            return Err(ConfigError::LowAboveHigh { low, high });
        }
        Ok(Self {
            output_count,
            low,
            high,
        })
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    pub fn low(&self) -> usize {
        self.low
    }

    pub fn high(&self) -> usize {
        self.high
    }

    /// Bucket count used when none is given: one more than the low watermark,
    /// which keeps chains near length two at the high watermark.
    pub fn default_modulus(&self) -> usize {
        self.low + 1
    }
}

impl Default for Watermarks {
    fn default() -> Self {
        Self {
            output_count: Self::DEFAULT_OUTPUT_COUNT,
            low: Self::DEFAULT_LOW,
            high: Self::DEFAULT_HIGH,
        }
    }
}

/// Totals for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterStats {
    /// Records passed to [`TopNCounter::add`].
    pub records: u64,
    /// Sum of all increments, saturating.
    pub total: u64,
    pub culls: u64,
    pub evicted: u64,
}

/// The counting context: table, ranking buffer, thresholds and totals.
pub struct TopNCounter<K, S = SuperFastHash> {
    map: ChainedHashMap<K, u64, S>,
    ranker: Ranker,
    watermarks: Watermarks,
    stats: CounterStats,
}

impl<K> TopNCounter<K>
where
    K: Ord + AsRef<[u8]>,
{
    /// Counter hashed by [`SuperFastHash`] with the default modulus.
    pub fn new(watermarks: Watermarks) -> Result<Self, ConfigError> {
        Self::with_hasher(watermarks, watermarks.default_modulus(), SuperFastHash)
    }
}

impl<K, S> TopNCounter<K, S>
where
    K: Ord,
{
    pub fn with_hasher(
        watermarks: Watermarks,
        modulus: usize,
        hasher: S,
    ) -> Result<Self, ConfigError> {
        let map = ChainedHashMap::with_hasher(modulus, hasher)?;
        Ok(Self {
            map,
            ranker: Ranker::with_capacity(watermarks.high),
            watermarks,
            stats: CounterStats::default(),
        })
    }

    pub fn watermarks(&self) -> &Watermarks {
        &self.watermarks
    }

    pub fn stats(&self) -> &CounterStats {
        &self.stats
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Read-only view of the underlying table.
    pub fn map(&self) -> &ChainedHashMap<K, u64, S> {
        &self.map
    }

    pub fn analyze(&self) -> TableStats {
        self.map.analyze()
    }

    /// Add `n` occurrences of `key`, culling when the high watermark is hit.
    ///
    /// Counts saturate at `u64::MAX`.
    pub fn add<Q>(&mut self, key: &Q, n: u64)
    where
        K: core::borrow::Borrow<Q>,
        Q: ?Sized + Eq + ToOwned<Owned = K>,
        S: KeyHasher<Q> + KeyHasher<K>,
    {
        self.stats.records += 1;
        self.stats.total = self.stats.total.saturating_add(n);
        match self.map.find_mut(key) {
            Some(count) => *count = count.saturating_add(n),
            None => {
                self.map.add(key.to_owned(), n);
                if self.map.len() >= self.watermarks.high {
                    self.cull();
                }
            }
        }
    }

    /// Cut the table down to the low watermark now.
    pub fn cull(&mut self) -> usize {
        let live = self.map.len();
        let evicted = self.ranker.cull(&mut self.map, self.watermarks.low);
        self.stats.culls += 1;
        self.stats.evicted += evicted as u64;
        debug!(live, low = self.watermarks.low, evicted, "cull");
        evicted
    }

    /// Current top `output_count` entries, highest first.
    pub fn top(&mut self) -> Vec<(&K, u64)> {
        self.ranker.top_n(&self.map, self.watermarks.output_count)
    }

    /// Write the current top `output_count` entries as `<key> <count>` lines.
    /// Does not mutate the table, so repeated calls print the same rows.
    pub fn emit<W: Write>(&mut self, out: &mut W) -> io::Result<usize>
    where
        K: AsRef<[u8]>,
    {
        let rows = self
            .ranker
            .emit_top_n(&self.map, self.watermarks.output_count, out)?;
        info!(
            rows,
            records = self.stats.records,
            tracked = self.map.len(),
            culls = self.stats.culls,
            evicted = self.stats.evicted,
            "emitted top entries"
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(out: usize, lo: usize, hi: usize) -> TopNCounter<String> {
        TopNCounter::new(Watermarks::new(out, lo, hi).unwrap()).unwrap()
    }

    #[test]
    fn watermark_validation() {
        assert_eq!(Watermarks::new(1, 0, 0), Err(ConfigError::ZeroHighWatermark));
        assert_eq!(
            Watermarks::new(1, 4, 3),
            Err(ConfigError::LowAboveHigh { low: 4, high: 3 })
        );
        assert!(Watermarks::new(1, 3, 3).is_ok());
        let w = Watermarks::new(10, 0, 1).unwrap();
        assert_eq!(w.default_modulus(), 1);
        assert_eq!(Watermarks::default().default_modulus(), 500_001);
    }

    #[test]
    fn zero_modulus_surfaces_as_config_error() {
        let w = Watermarks::new(1, 1, 2).unwrap();
        let r = TopNCounter::<String>::with_hasher(w, 0, SuperFastHash);
        assert!(matches!(r, Err(ConfigError::Map(_))));
    }

    #[test]
    fn repeated_keys_accumulate() {
        let mut c = counter(5, 10, 20);
        c.add("x", 10);
        c.add("y", 1);
        c.add("y", 1);
        c.add("x", 5);
        assert_eq!(c.top(), [(&"x".to_string(), 15), (&"y".to_string(), 2)]);
        assert_eq!(c.stats().records, 4);
        assert_eq!(c.stats().total, 17);
        assert_eq!(c.stats().culls, 0);
    }

    #[test]
    fn reaching_high_watermark_culls_to_low() {
        let mut c = counter(10, 2, 3);
        for _ in 0..5 {
            c.add("apple", 1);
        }
        for _ in 0..3 {
            c.add("banana", 1);
        }
        c.add("cherry", 1);
        assert_eq!(c.len(), 2);
        assert_eq!(c.stats().culls, 1);
        assert_eq!(c.stats().evicted, 1);
        assert_eq!(c.map().find("apple"), Some(&5));
        assert_eq!(c.map().find("banana"), Some(&3));
        assert!(c.map().find("cherry").is_none());
    }

    #[test]
    fn equal_watermarks_cap_the_table() {
        let mut c = counter(10, 2, 2);
        assert_eq!(c.watermarks().low(), c.watermarks().high());
        c.add("a", 5);
        c.add("b", 3);
        assert_eq!(c.len(), 2);
        c.add("c", 1);
        assert_eq!(c.len(), 2);
        assert!(c.map().find("c").is_none());
        c.add("d", 9);
        assert_eq!(c.len(), 2);
        assert_eq!(c.stats().evicted, 2);
        assert_eq!(c.top(), [(&"d".to_string(), 9), (&"a".to_string(), 5)]);
    }

    #[test]
    fn evicted_key_restarts_from_zero() {
        let mut c = counter(10, 1, 2);
        c.add("hot", 9);
        c.add("cold", 1);
        assert!(c.map().find("cold").is_none());
        c.add("cold", 1);
        assert_eq!(c.stats().culls, 2);
        c.add("hot", 1);
        assert_eq!(c.map().find("hot"), Some(&10));
    }

    #[test]
    fn counts_saturate() {
        let mut c = counter(1, 1, 2);
        c.add("k", u64::MAX - 1);
        c.add("k", 5);
        assert_eq!(c.map().find("k"), Some(&u64::MAX));
        assert_eq!(c.stats().total, u64::MAX);
    }

    #[test]
    fn emit_respects_output_count_and_is_repeatable() {
        let mut c = counter(2, 10, 20);
        for (k, n) in [("a", 3), ("b", 1), ("c", 2)] {
            c.add(k, n);
        }
        let mut first = Vec::new();
        let mut second = Vec::new();
        assert_eq!(c.emit(&mut first).unwrap(), 2);
        c.emit(&mut second).unwrap();
        assert_eq!(first, b"a 3\nc 2\n");
        assert_eq!(first, second);
    }

    #[test]
    fn byte_keys_count_like_strings() {
        let mut c: TopNCounter<Vec<u8>> =
            TopNCounter::new(Watermarks::new(3, 4, 8).unwrap()).unwrap();
        c.add(&b"k"[..], 2);
        c.add(&b"k"[..], 2);
        assert_eq!(c.map().find(&b"k"[..]), Some(&4));
    }
}
