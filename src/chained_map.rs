//! ChainedHashMap: fixed-modulus separate chaining over a node arena.
//!
//! Each bucket holds the head of a singly linked chain. Chain nodes live in a
//! `SlotMap` and link to each other by generational key, so unlinking a node
//! and dropping its key/value is a single arena removal; nothing can be
//! freed twice or leaked.
//!
//! The bucket count is fixed at construction. New keys are appended at the
//! chain tail, so both insertion and lookup cost O(chain length); size the
//! modulus for the largest entry count the table is expected to hold.

use crate::error::MapError;
use crate::hash::{KeyHasher, SuperFastHash};
use core::borrow::Borrow;
use core::fmt;
use core::iter::FusedIterator;
use slotmap::{DefaultKey, SlotMap};

/// Stable reference to one entry. Stays valid until that entry is removed;
/// a stale handle never resolves to a later entry.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub fn key<'a, K, V, S>(&self, map: &'a ChainedHashMap<K, V, S>) -> Option<&'a K> {
        map.handle_key(*self)
    }

    pub fn value<'a, K, V, S>(&self, map: &'a ChainedHashMap<K, V, S>) -> Option<&'a V> {
        map.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, S>(
        &self,
        map: &'a mut ChainedHashMap<K, V, S>,
    ) -> Option<&'a mut V> {
        map.handle_value_mut(*self)
    }
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u32,
    next: Option<DefaultKey>,
}

pub struct ChainedHashMap<K, V, S = SuperFastHash> {
    hasher: S,
    buckets: Box<[Option<DefaultKey>]>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    // Bumped on every structural change; detached cursors compare against it.
    generation: u64,
}

#[inline]
fn slot_of(hash: u32, modulus: usize) -> usize {
    hash as usize % modulus
}

impl<K, V> ChainedHashMap<K, V> {
    /// Table with `modulus` buckets hashed by [`SuperFastHash`].
    pub fn new(modulus: usize) -> Result<Self, MapError> {
        Self::with_hasher(modulus, SuperFastHash)
    }
}

impl<K, V, S> ChainedHashMap<K, V, S> {
    pub fn with_hasher(modulus: usize, hasher: S) -> Result<Self, MapError> {
        if modulus == 0 {
            return Err(MapError::ZeroModulus);
        }
        Ok(Self {
            hasher,
            buckets: vec![None; modulus].into_boxed_slice(),
            nodes: SlotMap::with_key(),
            generation: 0,
        })
    }

    /// Number of live entries. O(1).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Fixed bucket count chosen at construction.
    pub fn modulus(&self) -> usize {
        self.buckets.len()
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        self.nodes.get(h.0).map(|n| &n.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        self.nodes.get(h.0).map(|n| &n.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.nodes.get_mut(h.0).map(|n| &mut n.value)
    }

    /// Unlink the entry behind `handle` and hand back its key and value.
    /// Uses the stored hash; no user code runs.
    pub fn remove_handle(&mut self, handle: Handle) -> Option<(K, V)> {
        let k = handle.0;
        let slot = slot_of(self.nodes.get(k)?.hash, self.buckets.len());
        let mut prev = None;
        let mut cur = self.buckets[slot];
        while let Some(c) = cur {
            if c == k {
                break;
            }
            prev = cur;
            cur = self.nodes[c].next;
        }
        if cur.is_none() {
            return None;
        }
        self.unlink(slot, prev, k)
    }

    fn unlink(
        &mut self,
        slot: usize,
        prev: Option<DefaultKey>,
        k: DefaultKey,
    ) -> Option<(K, V)> {
        let node = self.nodes.remove(k)?;
        match prev {
            None => self.buckets[slot] = node.next,
            Some(p) => self.nodes[p].next = node.next,
        }
        self.generation = self.generation.wrapping_add(1);
        Some((node.key, node.value))
    }

    /// Drop every entry; the bucket array and modulus are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.buckets.fill(None);
        self.generation = self.generation.wrapping_add(1);
    }

    /// Entries in bucket order, then chain (insertion) order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: &self.nodes,
            buckets: &self.buckets,
            slot: 0,
            next: None,
            remaining: self.nodes.len(),
        }
    }

    /// A detached cursor positioned before the first entry. See [`Cursor`].
    pub fn cursor(&self) -> Cursor {
        Cursor {
            slot: 0,
            next: None,
            generation: self.generation,
        }
    }

    fn chain_len(&self, slot: usize) -> usize {
        let mut n = 0;
        let mut cur = self.buckets[slot];
        while let Some(k) = cur {
            n += 1;
            cur = self.nodes[k].next;
        }
        n
    }

    /// Bucket occupancy, for tuning the modulus.
    pub fn analyze(&self) -> TableStats {
        let mut empty_buckets = 0;
        let mut longest_chain = 0;
        for slot in 0..self.buckets.len() {
            match self.chain_len(slot) {
                0 => empty_buckets += 1,
                n => longest_chain = longest_chain.max(n),
            }
        }
        TableStats {
            buckets: self.buckets.len(),
            empty_buckets,
            longest_chain,
            len: self.nodes.len(),
        }
    }
}

impl<K, V, S> ChainedHashMap<K, V, S>
where
    K: Eq,
{
    fn locate<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: KeyHasher<Q>,
    {
        let hash = self.hasher.hash_key(q);
        let mut cur = self.buckets[slot_of(hash, self.buckets.len())];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if node.hash == hash && node.key.borrow() == q {
                return Some(k);
            }
            cur = node.next;
        }
        None
    }

    /// Append `key` at the tail of its chain.
    ///
    /// Duplicates are not detected: callers that need unique keys must
    /// [`find`](Self::find) first, or use [`find_or_add_with`](Self::find_or_add_with).
    pub fn add(&mut self, key: K, value: V) -> Handle
    where
        S: KeyHasher<K>,
    {
        let hash = self.hasher.hash_key(&key);
        let slot = slot_of(hash, self.buckets.len());
        let k = self.nodes.insert(Node {
            key,
            value,
            hash,
            next: None,
        });
        let head = self.buckets[slot];
        match head {
            None => self.buckets[slot] = Some(k),
            Some(mut tail) => {
                while let Some(next) = self.nodes[tail].next {
                    tail = next;
                }
                self.nodes[tail].next = Some(k);
            }
        }
        self.generation = self.generation.wrapping_add(1);
        Handle(k)
    }

    /// Value for `key`, inserting `default()` first when absent.
    /// `default` only runs on insert.
    pub fn find_or_add_with<F>(&mut self, key: K, default: F) -> &mut V
    where
        S: KeyHasher<K>,
        F: FnOnce() -> V,
    {
        let k = match self.locate(&key) {
            Some(k) => k,
            None => self.add(key, default()).0,
        };
        &mut self.nodes[k].value
    }

    pub fn find<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: KeyHasher<Q>,
    {
        self.locate(q).map(|k| &self.nodes[k].value)
    }

    pub fn find_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: KeyHasher<Q>,
    {
        let k = self.locate(q)?;
        Some(&mut self.nodes[k].value)
    }

    pub fn find_handle<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: KeyHasher<Q>,
    {
        self.locate(q).map(Handle)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: KeyHasher<Q>,
    {
        self.locate(q).is_some()
    }

    /// Unlink the first entry equal to `q`. Absent keys are a no-op.
    /// Dropping the returned pair releases the entry.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
        S: KeyHasher<Q>,
    {
        let hash = self.hasher.hash_key(q);
        let slot = slot_of(hash, self.buckets.len());
        let mut prev = None;
        let mut cur = self.buckets[slot];
        while let Some(k) = cur {
            let node = &self.nodes[k];
            if node.hash == hash && node.key.borrow() == q {
                break;
            }
            prev = cur;
            cur = node.next;
        }
        let k = cur?;
        self.unlink(slot, prev, k)
    }
}

/// Iterator over `(handle, key, value)` in bucket order, then chain order.
/// Borrowing the map for its whole lifetime rules out mutation mid-pass.
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    buckets: &'a [Option<DefaultKey>],
    slot: usize,
    next: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.next {
                let node = &self.nodes[k];
                self.next = node.next;
                self.remaining -= 1;
                return Some((Handle(k), &node.key, &node.value));
            }
            let head = self.buckets.get(self.slot)?;
            self.next = *head;
            self.slot += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K, V, S> IntoIterator for &'a ChainedHashMap<K, V, S> {
    type Item = (Handle, &'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resumable iteration position that does not borrow the map.
///
/// Every step takes the map explicitly. If the map was structurally modified
/// since the cursor was created or rewound, the step fails with
/// [`MapError::StaleCursor`] instead of following freed links. Past the end,
/// `next` keeps returning `Ok(None)`.
#[derive(Debug, Clone)]
pub struct Cursor {
    slot: usize,
    next: Option<DefaultKey>,
    generation: u64,
}

impl Cursor {
    /// Reposition before the first entry of `map` and resynchronize.
    pub fn rewind<K, V, S>(&mut self, map: &ChainedHashMap<K, V, S>) {
        *self = map.cursor();
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next<'m, K, V, S>(
        &mut self,
        map: &'m ChainedHashMap<K, V, S>,
    ) -> Result<Option<(Handle, &'m K, &'m V)>, MapError> {
        if self.generation != map.generation {
            return Err(MapError::StaleCursor);
        }
        loop {
            if let Some(k) = self.next {
                let node = map.nodes.get(k).ok_or(MapError::StaleCursor)?;
                self.next = node.next;
                return Ok(Some((Handle(k), &node.key, &node.value)));
            }
            match map.buckets.get(self.slot) {
                Some(head) => {
                    self.next = *head;
                    self.slot += 1;
                }
                None => return Ok(None),
            }
        }
    }
}

/// Snapshot of bucket occupancy returned by [`ChainedHashMap::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub buckets: usize,
    pub empty_buckets: usize,
    pub longest_chain: usize,
    pub len: usize,
}

impl TableStats {
    /// Mean chain length if keys were spread evenly.
    pub fn expected_mean(&self) -> f64 {
        self.len as f64 / self.buckets as f64
    }
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Total Slots: {}", self.buckets)?;
        writeln!(f, "  Empty Slots: {}", self.empty_buckets)?;
        writeln!(f, "    Hash Keys: {}", self.len)?;
        writeln!(f, "Expected Mean: {:.2}", self.expected_mean())?;
        write!(f, " Longest List: {}", self.longest_chain)
    }
}
