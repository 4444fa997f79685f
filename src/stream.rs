//! Deterministic random stream & seed plumbing
//!
//! This module provides the **seed-addressable** randomness protocol the rest
//! of the engine builds on, with explicit domain-separation tags so the three
//! derivations (trial seed, stream key, tuple digest) never share a value
//! space.
//!
//! ### Design highlights
//! - **Stable DSTs.** Every derivation is prefixed by a fixed domain
//!   separation tag. This guarantees a run and a replay walk the exact same
//!   byte schedule.
//! - **Rehash before keying.** The PRNG is keyed from a BLAKE3 rehash of the
//!   trial seed rather than from the trial seed directly, so raw seeds and
//!   stream states are unrelated values.
//! - **Allocator-only consumption.** The engine itself never draws words from
//!   a [`WordStream`]; only allocator callbacks do, and one stream instance
//!   is threaded through every position of a tuple in order, so later
//!   positions see words consumed by earlier ones.
//!
//! ### Rustdoc examples
//! A fixed seed yields the identical word sequence on every instantiation:
//!
//! ```
//! use tinycheck::WordStream;
//!
//! let mut a = WordStream::from_seed(42);
//! let mut b = WordStream::from_seed(42);
//! for _ in 0..8 {
//!     assert_eq!(a.next64(), b.next64());
//! }
//! ```

#![forbid(unsafe_code)]

use blake3::Hasher;
use rand::{rngs::StdRng, RngCore, SeedableRng};

use crate::Seed;

/// Index of a trial `i ∈ {0..trials-1}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrialIdx(pub u64);
impl TrialIdx {
    /// Access the underlying index.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Index of an argument position `p ∈ {0..N-1}`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArgIdx(pub usize);
impl ArgIdx {
    /// Access the underlying index.
    #[inline]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// Index of a shrink tactic, ascending from 0 (coarsest first by convention).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TacticIdx(pub u32);
impl TacticIdx {
    /// Access the underlying index.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// The next tactic index.
    #[inline]
    pub fn next(self) -> TacticIdx {
        TacticIdx(self.0 + 1)
    }
}

// Domain separation tags. Adding new tags is backward-compatible; changing
// existing ones changes every derived seed and digest.
const TRIAL_DST: &[u8] = b"tinycheck.trial.v1";
const STREAM_DST: &[u8] = b"tinycheck.stream.v1";
const TUPLE_DST: &[u8] = b"tinycheck.tuple.v1";

/// First 8 bytes of the digest, little-endian.
fn digest64(h: &Hasher) -> u64 {
    let digest = h.finalize();
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(word)
}

/// Derive the seed for trial `trial` from the run seed.
///
/// Stable mixing function: a domain-separated BLAKE3 digest over
/// `(run_seed, trial)`. The reproducer printed on failure is this value.
pub fn trial_seed(run_seed: Seed, trial: TrialIdx) -> Seed {
    let mut h = Hasher::new();
    h.update(TRIAL_DST);
    h.update(&run_seed.to_le_bytes());
    h.update(&trial.as_u64().to_le_bytes());
    digest64(&h)
}

/// A seed-addressable source of 64-bit words.
///
/// For a fixed seed, repeated instantiation yields the identical sequence.
/// The distribution is uniform over 64-bit words to well beyond any nominal
/// trial count (ChaCha-based `StdRng` under the hood).
pub struct WordStream {
    rng: StdRng,
    consumed: u64,
}

impl WordStream {
    /// Instantiate the stream for one trial seed.
    pub fn from_seed(seed: Seed) -> Self {
        let mut h = Hasher::new();
        h.update(STREAM_DST);
        h.update(&seed.to_le_bytes());
        Self {
            rng: StdRng::seed_from_u64(digest64(&h)),
            consumed: 0,
        }
    }

    /// Draw the next 64-bit word and advance the draw counter.
    #[inline]
    pub fn next64(&mut self) -> u64 {
        self.consumed = self.consumed.saturating_add(1);
        self.rng.next_u64()
    }

    /// Total number of words drawn so far (a draw counter, not a byte count).
    #[inline]
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Unbiased integer in `[0, n)` via rejection sampling. `None` if `n == 0`.
    ///
    /// Let `threshold = 2^64 mod n` (computed as `n.wrapping_neg() % n`).
    /// Accept `x` when `x >= threshold`; then `x % n` is uniform.
    pub fn next_below(&mut self, n: u64) -> Option<u64> {
        if n == 0 {
            return None;
        }
        let threshold = n.wrapping_neg() % n;
        loop {
            let x = self.next64();
            if x >= threshold {
                return Some(x % n);
            }
        }
    }

    /// Draw `len` bytes, consuming `ceil(len / 8)` words.
    pub fn next_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let word = self.next64().to_le_bytes();
            let take = word.len().min(len - out.len());
            out.extend_from_slice(&word[..take]);
        }
        out
    }
}

/// Incremental digest of an argument tuple.
///
/// Absorbs `(position index, per-position 64-bit hash)` pairs under a fixed
/// DST; the finished 64-bit digest addresses the bloom filter. The digest is
/// a pure function of the absorb schedule, so position order matters.
pub struct TupleDigest {
    hasher: Hasher,
}

impl TupleDigest {
    /// Start an empty tuple digest.
    pub fn new() -> Self {
        let mut hasher = Hasher::new();
        hasher.update(TUPLE_DST);
        Self { hasher }
    }

    /// Absorb one position's hash.
    pub fn absorb(&mut self, pos: ArgIdx, hash: u64) {
        self.hasher.update(b"pos:");
        self.hasher.update(&(pos.as_usize() as u64).to_le_bytes());
        self.hasher.update(b"hash:");
        self.hasher.update(&hash.to_le_bytes());
    }

    /// Finish, yielding the composite 64-bit digest.
    pub fn finish(self) -> u64 {
        digest64(&self.hasher)
    }
}

impl Default for TupleDigest {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
