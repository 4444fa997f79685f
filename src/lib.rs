//! Crate root: public surface, core aliases, and engine-wide invariants
//!
//! This module is the **single canonical entry-point** for downstream users of
//! the library. It centralizes the seed alias, the small index newtypes, the
//! shared defaults, and re-exports the submodules that implement the search
//! and shrink engine.
//!
//! ## Invariants
//!
//! - **Determinism.** Every run is a pure function of the run seed and the
//!   configuration: trial seeds are derived from the run seed by a stable,
//!   domain-separated BLAKE3 mix, and each trial seed keys an independent
//!   [`WordStream`] whose word sequence is identical on every instantiation.
//!   The printed reproducer seed replays the exact argument tuple.
//!
//! - **Ownership.** The engine owns every live argument value between
//!   allocation and the point the value is no longer referenced; values are
//!   dropped exactly there. Shrink candidates that are not accepted are
//!   dropped immediately; an accepted candidate supersedes its parent, which
//!   is dropped before the next shrink step.
//!
//! - **Single-threaded discipline.** The engine performs no internal
//!   parallelism and takes no locks. Callbacks are invoked synchronously, and
//!   a property must not re-enter the engine instance that invoked it.
//!
//! - **Bloom filter is an optimization.** Duplicate suppression is consulted
//!   only when every argument position supplies a hash operation. A false
//!   positive costs one skipped trial (counted as a duplicate); no
//!   correctness property depends on the filter.
//!
//! If any invariant is violated at runtime, the failure mode is a **precise
//! error** (never UB); we **forbid unsafe** throughout the crate.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Duplicate-suppression bloom filter (auto-sized, bit-addressed, test-and-set).
pub mod bloom;
/// Type-information vocabulary (allocate / hash / shrink / print per position).
pub mod info;
/// Counters, failure records, progress hook surface, and report emission.
pub mod report;
/// Trial runner: engine, configuration, validation, outcome classification.
pub mod runner;
/// Breadth-first shrinker over (position, tactic) pairs.
pub mod shrink;
/// Deterministic word stream, trial-seed derivation, and tuple digests.
pub mod stream;

// ============================================================================
// Canonical aliases and root-level re-exports (centralization)
// ============================================================================

/// A 64-bit seed. The run begins with one; each trial derives its own from it
/// deterministically, and the word stream derives 64-bit words from the trial
/// seed.
pub type Seed = u64;

/// Run seed used when the caller does not supply one.
///
/// Any value works; this one (2^64 / φ, rounded to odd) has no zero bytes and
/// keeps default runs away from the degenerate all-zero seed.
pub const DEFAULT_SEED: Seed = 0x9E37_79B9_7F4A_7C15;

/// Trial count used when the caller does not supply one.
pub const DEFAULT_TRIALS: usize = 100;

/// Maximum number of argument positions a property may take.
pub const MAX_ARGS: usize = 8;

/// Centralized index newtypes used across the crate.
///
/// These are re-exported from `stream` to avoid duplication and to keep a
/// single definition site. Downstream code should import them from the crate
/// root (e.g., `use tinycheck::{TrialIdx, ArgIdx, TacticIdx};`).
pub use crate::stream::{ArgIdx, TacticIdx, TrialIdx};

pub use crate::stream::{trial_seed, TupleDigest, WordStream};

pub use crate::bloom::Bloom;

pub use crate::info::{tuple_digest, ArgValue, InfoOf, ShrinkStep, TypeInfo};

pub use crate::report::{
    format_seed, Counters, Failure, Flow, Progress, RunReport, RunResult, TrialOutcome, Verdict,
};

pub use crate::runner::{Config, ConfigError, Engine, EngineError, ProgressHook, Property};
