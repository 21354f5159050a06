#![cfg(test)]

// Property tests for ChainedHashMap kept inside the crate so they can reach
// the chain order and cursor internals through the public methods without
// a feature gate.

use crate::chained_map::{ChainedHashMap, Handle};
use crate::error::MapError;
use crate::hash::{KeyHasher, SuperFastHash};
use hashbrown::HashMap;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::collections::BTreeSet;

// Pool-indexed operations: indices shrink to earlier keys, pool length
// shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    FindOrAdd(usize, u64),
    Remove(usize),
    RemoveHandle(usize),
    Find(usize),
    Contains(String),
    Bump(usize, u64),
    Iterate,
    CursorPass,
    Clear,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<Op>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=8).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), 0u64..1000).prop_map(|(i, v)| Op::FindOrAdd(i, v)),
            2 => idx.clone().prop_map(Op::Remove),
            1 => idx.clone().prop_map(Op::RemoveHandle),
            2 => idx.clone().prop_map(Op::Find),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(Op::Contains),
            2 => (idx.clone(), 0u64..1000).prop_map(|(i, d)| Op::Bump(i, d)),
            1 => Just(Op::Iterate),
            1 => Just(Op::CursorPass),
            1 => Just(Op::Clear),
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against a model map. Invariants exercised after
// every operation:
// - `len`/`is_empty` match the model (live counter == reachable entries).
// - `find` after `find_or_add_with` returns the stored value; after
//   `remove` it misses and `len` dropped by exactly one.
// - Removing an absent key is a no-op.
// - A full `iter` pass yields every live key exactly once; so does a cursor.
// - Handles of removed entries never resolve again.
fn check_state_machine<S>(
    mut sut: ChainedHashMap<String, u64, S>,
    pool: Vec<String>,
    ops: Vec<Op>,
) -> Result<(), TestCaseError>
where
    S: KeyHasher<String> + KeyHasher<str>,
{
    let mut model: HashMap<String, u64> = HashMap::new();
    let mut live: HashMap<String, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();

    for op in ops {
        match op {
            Op::FindOrAdd(i, v) => {
                let k = pool[i].clone();
                let before = sut.len();
                let already = model.contains_key(&k);
                let got = *sut.find_or_add_with(k.clone(), || v);
                if already {
                    prop_assert_eq!(Some(&got), model.get(&k));
                    prop_assert_eq!(sut.len(), before);
                } else {
                    prop_assert_eq!(got, v);
                    prop_assert_eq!(sut.len(), before + 1);
                    model.insert(k.clone(), v);
                    let h = sut.find_handle(k.as_str()).expect("just added");
                    live.insert(k, h);
                }
            }
            Op::Remove(i) => {
                let k = &pool[i];
                let before = sut.len();
                match sut.remove(k.as_str()) {
                    Some((kk, vv)) => {
                        prop_assert_eq!(&kk, k);
                        prop_assert_eq!(Some(vv), model.remove(k));
                        prop_assert_eq!(sut.len(), before - 1);
                        stale.extend(live.remove(k));
                    }
                    None => {
                        prop_assert!(!model.contains_key(k));
                        prop_assert_eq!(sut.len(), before);
                    }
                }
                prop_assert!(sut.find(k.as_str()).is_none());
            }
            Op::RemoveHandle(i) => {
                let k = &pool[i];
                if let Some(h) = live.remove(k) {
                    let (kk, vv) = sut.remove_handle(h).expect("live handle removes");
                    prop_assert_eq!(&kk, k);
                    prop_assert_eq!(Some(vv), model.remove(k));
                    stale.push(h);
                }
            }
            Op::Find(i) => {
                let k = &pool[i];
                prop_assert_eq!(sut.find(k.as_str()), model.get(k));
                if let Some(h) = sut.find_handle(k.as_str()) {
                    prop_assert_eq!(Some(&h), live.get(k));
                }
            }
            Op::Contains(s) => {
                prop_assert_eq!(sut.contains_key(s.as_str()), model.contains_key(&s));
            }
            Op::Bump(i, d) => {
                let k = &pool[i];
                if let Some(v) = sut.find_mut(k.as_str()) {
                    *v += d;
                    if let Some(mv) = model.get_mut(k) {
                        *mv += d;
                    }
                }
            }
            Op::Iterate => {
                let seen: Vec<&String> = sut.iter().map(|(_, k, _)| k).collect();
                let unique: BTreeSet<&String> = seen.iter().copied().collect();
                prop_assert_eq!(seen.len(), unique.len());
                let m_keys: BTreeSet<&String> = model.keys().collect();
                prop_assert_eq!(unique, m_keys);
            }
            Op::CursorPass => {
                let mut cur = sut.cursor();
                let mut n = 0;
                while let Some((h, k, v)) = cur.next(&sut).expect("no mutation mid-pass") {
                    prop_assert_eq!(Some(v), model.get(k));
                    prop_assert_eq!(Some(&h), live.get(k));
                    n += 1;
                }
                prop_assert_eq!(n, model.len());
            }
            Op::Clear => {
                let mut cur = sut.cursor();
                sut.clear();
                prop_assert_eq!(cur.next(&sut), Err(MapError::StaleCursor));
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
        }

        for &h in &stale {
            prop_assert!(h.value(&sut).is_none());
        }
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

// All keys in one bucket: the worst case still has to be correct.
#[derive(Clone, Copy, Default)]
struct ConstHasher;
impl<Q: ?Sized> KeyHasher<Q> for ConstHasher {
    fn hash_key(&self, _key: &Q) -> u32 {
        0
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario(), modulus in 1usize..16) {
        let sut = ChainedHashMap::with_hasher(modulus, SuperFastHash).unwrap();
        check_state_machine(sut, pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario(), modulus in 1usize..16) {
        let sut = ChainedHashMap::with_hasher(modulus, ConstHasher).unwrap();
        check_state_machine(sut, pool, ops)?;
    }
}
