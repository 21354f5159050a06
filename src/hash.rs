//! Bucket hashing.
//!
//! The table only needs a 32-bit value to reduce modulo its bucket count.
//! [`KeyHasher`] is the capability the table is built with; the default is
//! [`SuperFastHash`], Paul Hsieh's string hash with a final avalanche.
//! None of this is suitable for adversarial input.

use core::hash::{BuildHasher, Hash};

/// Maps a key to a 32-bit bucket hash.
///
/// Implementations must agree for a stored key `K` and every borrowed form
/// `Q` that lookups use (e.g. `String` and `str`), the same contract as
/// `Borrow` + `Hash`.
pub trait KeyHasher<Q: ?Sized> {
    fn hash_key(&self, key: &Q) -> u32;
}

/// SuperFastHash over the key's bytes.
///
/// Deterministic for identical bytes; not stable across crate versions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuperFastHash;

impl<Q> KeyHasher<Q> for SuperFastHash
where
    Q: ?Sized + AsRef<[u8]>,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u32 {
        super_fast_hash(key.as_ref())
    }
}

/// Adapts a std `BuildHasher` by truncating its 64-bit output.
#[derive(Debug, Clone, Default)]
pub struct StdBuildHasher<S>(pub S);

impl<Q, S> KeyHasher<Q> for StdBuildHasher<S>
where
    Q: ?Sized + Hash,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &Q) -> u32 {
        self.0.hash_one(key) as u32
    }
}

#[inline]
fn get16(b: &[u8]) -> u32 {
    u32::from(b[0]) | (u32::from(b[1]) << 8)
}

/// Paul Hsieh's SuperFastHash. Empty input hashes to 0.
pub fn super_fast_hash(data: &[u8]) -> u32 {
    if data.is_empty() {
        return 0;
    }
    // Seeded with the length, truncated to 32 bits.
    let mut hash = data.len() as u32;

    let mut chunks = data.chunks_exact(4);
    for c in &mut chunks {
        hash = hash.wrapping_add(get16(c));
        let tmp = (get16(&c[2..]) << 11) ^ hash;
        hash = (hash << 16) ^ tmp;
        hash = hash.wrapping_add(hash >> 11);
    }

    let rem = chunks.remainder();
    match rem.len() {
        3 => {
            hash = hash.wrapping_add(get16(rem));
            hash ^= hash << 16;
            // Tail bytes are mixed in sign-extended, as a signed `char`.
            hash ^= ((rem[2] as i8 as i32) << 18) as u32;
            hash = hash.wrapping_add(hash >> 11);
        }
        2 => {
            hash = hash.wrapping_add(get16(rem));
            hash ^= hash << 11;
            hash = hash.wrapping_add(hash >> 17);
        }
        1 => {
            hash = hash.wrapping_add(rem[0] as i8 as i32 as u32);
            hash ^= hash << 10;
            hash = hash.wrapping_add(hash >> 1);
        }
        _ => {}
    }

    // Avalanche.
    hash ^= hash << 3;
    hash = hash.wrapping_add(hash >> 5);
    hash ^= hash << 4;
    hash = hash.wrapping_add(hash >> 17);
    hash ^= hash << 25;
    hash = hash.wrapping_add(hash >> 6);
    hash
}
