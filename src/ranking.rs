//! Sorting live entries by count, culling the tail, and emitting the head.
//!
//! Rank order is count descending, then key ascending. The key tie-break
//! makes every rank deterministic: which entries survive a cull never
//! depends on bucket layout or sort stability.

use crate::chained_map::{ChainedHashMap, Handle};
use core::cmp::Ordering;
use std::io::{self, Write};
use tracing::debug;

/// One row of a sorted snapshot. Borrows the map, so it cannot outlive a
/// mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked<'a, K> {
    pub handle: Handle,
    pub key: &'a K,
    pub count: u64,
}

#[inline]
fn by_rank<K: Ord>(a_count: u64, a_key: &K, b_count: u64, b_key: &K) -> Ordering {
    b_count.cmp(&a_count).then_with(|| a_key.cmp(b_key))
}

/// Every live entry, highest count first.
pub fn snapshot_sorted<K, S>(map: &ChainedHashMap<K, u64, S>) -> Vec<Ranked<'_, K>>
where
    K: Ord,
{
    let mut rows: Vec<Ranked<'_, K>> = map
        .iter()
        .map(|(handle, key, &count)| Ranked { handle, key, count })
        .collect();
    rows.sort_unstable_by(|a, b| by_rank(a.count, a.key, b.count, b.key));
    rows
}

/// Keep only the `keep` highest-ranked entries. Returns how many were evicted.
pub fn cull<K, S>(map: &mut ChainedHashMap<K, u64, S>, keep: usize) -> usize
where
    K: Ord,
{
    Ranker::new().cull(map, keep)
}

/// The first `min(n, len)` entries as `(key, count)`.
pub fn top_n<K, S>(map: &ChainedHashMap<K, u64, S>, n: usize) -> Vec<(&K, u64)>
where
    K: Ord,
{
    Ranker::new().top_n(map, n)
}

/// Write the top `n` entries as `<key> <count>` lines. Returns rows written.
pub fn emit_top_n<K, S, W>(
    map: &ChainedHashMap<K, u64, S>,
    n: usize,
    out: &mut W,
) -> io::Result<usize>
where
    K: Ord + AsRef<[u8]>,
    W: Write,
{
    Ranker::new().emit_top_n(map, n, out)
}

/// Reusable ranking buffer.
///
/// Holds `(count, handle)` pairs between passes so that repeated culls do
/// not reallocate. Reserve it up front for the high watermark. The buffer is
/// emptied at the end of every pass and never carries handles across a
/// mutation.
#[derive(Debug, Default)]
pub struct Ranker {
    order: Vec<(u64, Handle)>,
}

impl Ranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.order.capacity()
    }

    fn rank<K, S>(&mut self, map: &ChainedHashMap<K, u64, S>)
    where
        K: Ord,
    {
        debug!(live = map.len(), "sorting live entries");
        self.order.clear();
        self.order.reserve(map.len());
        self.order
            .extend(map.iter().map(|(handle, _, &count)| (count, handle)));
        self.order.sort_unstable_by(|&(ac, ah), &(bc, bh)| {
            bc.cmp(&ac).then_with(|| ah.key(map).cmp(&bh.key(map)))
        });
    }

    /// Evict every entry outside the top `keep`. A no-op when the map
    /// already holds `keep` entries or fewer.
    pub fn cull<K, S>(&mut self, map: &mut ChainedHashMap<K, u64, S>, keep: usize) -> usize
    where
        K: Ord,
    {
        if map.len() <= keep {
            return 0;
        }
        self.rank(map);
        let mut evicted = 0;
        for &(_, handle) in &self.order[keep..] {
            if map.remove_handle(handle).is_some() {
                evicted += 1;
            }
        }
        self.order.clear();
        debug!(kept = map.len(), evicted, "culled to low watermark");
        evicted
    }

    pub fn top_n<'m, K, S>(
        &mut self,
        map: &'m ChainedHashMap<K, u64, S>,
        n: usize,
    ) -> Vec<(&'m K, u64)>
    where
        K: Ord,
    {
        self.rank(map);
        let rows = self
            .order
            .iter()
            .take(n)
            .filter_map(|&(count, handle)| handle.key(map).map(|k| (k, count)))
            .collect();
        self.order.clear();
        rows
    }

    pub fn emit_top_n<K, S, W>(
        &mut self,
        map: &ChainedHashMap<K, u64, S>,
        n: usize,
        out: &mut W,
    ) -> io::Result<usize>
    where
        K: Ord + AsRef<[u8]>,
        W: Write,
    {
        let rows = self.top_n(map, n);
        for (key, count) in &rows {
            out.write_all(key.as_ref())?;
            writeln!(out, " {count}")?;
        }
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_of(rows: &[(&str, u64)]) -> ChainedHashMap<String, u64> {
        let mut m = ChainedHashMap::new(7).unwrap();
        for &(k, c) in rows {
            m.add(k.to_string(), c);
        }
        m
    }

    fn keys<S>(m: &ChainedHashMap<String, u64, S>) -> Vec<&str> {
        let mut ks: Vec<&str> = m.iter().map(|(_, k, _)| k.as_str()).collect();
        ks.sort_unstable();
        ks
    }

    #[test]
    fn snapshot_orders_by_count_then_key() {
        let m = map_of(&[("b", 2), ("d", 9), ("a", 2), ("c", 5)]);
        let rows: Vec<(&str, u64)> = snapshot_sorted(&m)
            .iter()
            .map(|r| (r.key.as_str(), r.count))
            .collect();
        assert_eq!(rows, [("d", 9), ("c", 5), ("a", 2), ("b", 2)]);
    }

    #[test]
    fn snapshot_handles_resolve_to_their_rows() {
        let m = map_of(&[("x", 1), ("y", 3)]);
        for r in snapshot_sorted(&m) {
            assert_eq!(r.handle.key(&m), Some(r.key));
            assert_eq!(r.handle.value(&m), Some(&r.count));
        }
    }

    #[test]
    fn cull_keeps_exactly_the_top_ranked() {
        let mut m = map_of(&[("a", 1), ("b", 7), ("c", 3), ("d", 7), ("e", 2)]);
        let before: Vec<String> = snapshot_sorted(&m)
            .iter()
            .take(3)
            .map(|r| r.key.clone())
            .collect();
        assert_eq!(cull(&mut m, 3), 2);
        assert_eq!(m.len(), 3);
        let mut before: Vec<&str> = before.iter().map(String::as_str).collect();
        before.sort_unstable();
        assert_eq!(keys(&m), before);
        assert_eq!(keys(&m), ["b", "c", "d"]);
    }

    #[test]
    fn cull_breaks_count_ties_by_key() {
        let mut m = map_of(&[("z", 4), ("m", 4), ("a", 4), ("q", 9)]);
        cull(&mut m, 2);
        assert_eq!(keys(&m), ["a", "q"]);
    }

    #[test]
    fn cull_below_len_is_noop() {
        let mut m = map_of(&[("a", 1), ("b", 2)]);
        assert_eq!(cull(&mut m, 2), 0);
        assert_eq!(cull(&mut m, 10), 0);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn cull_to_zero_empties_the_map() {
        let mut m = map_of(&[("a", 1), ("b", 2)]);
        assert_eq!(cull(&mut m, 0), 2);
        assert!(m.is_empty());
    }

    #[test]
    fn top_n_truncates_to_len() {
        let m = map_of(&[("a", 1), ("b", 2)]);
        assert_eq!(top_n(&m, 1), [(&"b".to_string(), 2)]);
        assert_eq!(top_n(&m, 5).len(), 2);
        assert!(top_n(&m, 0).is_empty());
    }

    #[test]
    fn emit_is_idempotent_and_line_formatted() {
        let m = map_of(&[("x", 15), ("y", 2), ("w", 15)]);
        let mut first = Vec::new();
        let mut second = Vec::new();
        assert_eq!(emit_top_n(&m, 10, &mut first).unwrap(), 3);
        emit_top_n(&m, 10, &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(String::from_utf8(first).unwrap(), "w 15\nx 15\ny 2\n");
    }

    #[test]
    fn emit_writes_non_utf8_keys_verbatim() {
        let mut m: ChainedHashMap<Vec<u8>, u64> = ChainedHashMap::new(3).unwrap();
        m.add(vec![0xff, b'k'], 4);
        let mut out = Vec::new();
        emit_top_n(&m, 1, &mut out).unwrap();
        assert_eq!(out, b"\xffk 4\n");
    }

    #[test]
    fn ranker_reuses_its_buffer() {
        let mut ranker = Ranker::with_capacity(64);
        let cap = ranker.capacity();
        let mut m = map_of(&[("a", 1), ("b", 2), ("c", 3), ("d", 4)]);
        assert_eq!(ranker.cull(&mut m, 2), 2);
        assert_eq!(keys(&m), ["c", "d"]);
        assert_eq!(ranker.capacity(), cap);
        assert_eq!(ranker.top_n(&m, 1), [(&"d".to_string(), 4)]);
    }
}
