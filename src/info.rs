//! Type-information vocabulary
//!
//! A property composes over arbitrary user input types through one trait per
//! argument position: [`TypeInfo`]. The allocator is required; hashing,
//! shrinking, and printing are optional capabilities signalled by the
//! defaults (`None` / [`ShrinkStep::NoMoreTactics`]).
//!
//! Values travel through the engine as [`ArgValue`] — owned, type-erased
//! boxes. The engine holds exactly one reference to each live value and drops
//! it when it is no longer referenced, which subsumes an explicit release
//! callback. State a C-style design would pass as an environment pointer is
//! captured state inside the implementation (closures, for [`InfoOf`]).
//!
//! ### Contracts
//! - **allocate** consumes words from the stream it is given and, for a fixed
//!   stream seed, produces an equivalent value. `None` signals allocation
//!   failure; the engine counts the trial as skipped.
//! - **hash** must be a pure, stable, well-distributed function of the value.
//!   An implementation must answer uniformly: `Some` for every value or
//!   `None` for every value, or duplicate suppression degrades silently.
//! - **shrink** must be deterministic for fixed `(value, tactic)`, must
//!   return a freshly owned **strictly simpler** value, and must be globally
//!   well-founded: no infinite descending chain may exist across any
//!   combination of tactics. The engine relies on this for termination.
//!   Once [`ShrinkStep::NoMoreTactics`] is returned for some tactic, no
//!   tactic with a greater index is tried on that value.
//! - **print** renders the value for failure reports.

#![forbid(unsafe_code)]

use std::any::Any;
use std::sync::Arc;

use crate::stream::{ArgIdx, TacticIdx, TupleDigest, WordStream};

/// An opaque, engine-owned argument value.
pub type ArgValue = Box<dyn Any>;

/// Outcome of one shrink attempt.
///
/// The typed parameter lets closure-based implementations work in their own
/// value type; the engine always sees the erased form.
#[derive(Debug)]
pub enum ShrinkStep<V = ArgValue> {
    /// A freshly owned, strictly simpler variant of the input value.
    Shrunk(V),
    /// This tactic does not apply to this value; the next index may.
    DeadEnd,
    /// No tactic with this index or above applies to this value.
    NoMoreTactics,
}

/// Per-position capability set: allocate (required), hash, shrink, print.
///
/// Identity is by reference: the engine compares and shares positions through
/// `Arc<dyn TypeInfo>`, and one info may serve several positions.
pub trait TypeInfo {
    /// Draw a fresh value from the word stream. `None` signals allocation
    /// failure and skips the trial.
    fn allocate(&self, stream: &mut WordStream) -> Option<ArgValue>;

    /// Stable 64-bit digest of a value, or `None` when this position does not
    /// participate in duplicate suppression.
    fn hash(&self, _value: &dyn Any) -> Option<u64> {
        None
    }

    /// Produce a strictly simpler variant of `value` under `tactic`.
    fn shrink(&self, _value: &dyn Any, _tactic: TacticIdx) -> ShrinkStep {
        ShrinkStep::NoMoreTactics
    }

    /// Render `value` for failure reports, or `None` when this position is
    /// unprintable (the report falls back to the seed-derived identity).
    fn print(&self, _value: &dyn Any) -> Option<String> {
        None
    }
}

/// Composite digest of an argument tuple: position-mixed per-position hashes.
///
/// `None` when any position lacks a hash operation, in which case the tuple
/// is treated as novel and the bloom filter is not consulted.
pub fn tuple_digest(args: &[Arc<dyn TypeInfo>], tuple: &[ArgValue]) -> Option<u64> {
    debug_assert_eq!(args.len(), tuple.len(), "tuple arity mismatch");
    let mut digest = TupleDigest::new();
    for (pos, (info, value)) in args.iter().zip(tuple).enumerate() {
        digest.absorb(ArgIdx(pos), info.hash(value.as_ref())?);
    }
    Some(digest.finish())
}

// ============================================================================
// Closure-built adapter
// ============================================================================

type AllocFn<T> = Box<dyn Fn(&mut WordStream) -> Option<T>>;
type HashFn<T> = Box<dyn Fn(&T) -> u64>;
type ShrinkFn<T> = Box<dyn Fn(&T, TacticIdx) -> ShrinkStep<T>>;
type PrintFn<T> = Box<dyn Fn(&T) -> String>;

/// [`TypeInfo`] built from closures over a concrete value type `T`.
///
/// ```
/// use tinycheck::{InfoOf, ShrinkStep};
///
/// let small = InfoOf::new(|s| Some(s.next64() % 100))
///     .with_hash(|v| *v)
///     .with_shrink(|v, tactic| match tactic.as_u32() {
///         0 if *v > 0 => ShrinkStep::Shrunk(v / 2),
///         0 => ShrinkStep::DeadEnd,
///         _ => ShrinkStep::NoMoreTactics,
///     })
///     .with_print(|v| v.to_string());
/// # let _ = small;
/// ```
pub struct InfoOf<T> {
    alloc: AllocFn<T>,
    hash: Option<HashFn<T>>,
    shrink: Option<ShrinkFn<T>>,
    print: Option<PrintFn<T>>,
}

impl<T: 'static> InfoOf<T> {
    /// Start from the (required) allocator.
    pub fn new(alloc: impl Fn(&mut WordStream) -> Option<T> + 'static) -> Self {
        Self {
            alloc: Box::new(alloc),
            hash: None,
            shrink: None,
            print: None,
        }
    }

    /// Attach a hash operation.
    pub fn with_hash(mut self, hash: impl Fn(&T) -> u64 + 'static) -> Self {
        self.hash = Some(Box::new(hash));
        self
    }

    /// Attach a shrink operation.
    pub fn with_shrink(mut self, shrink: impl Fn(&T, TacticIdx) -> ShrinkStep<T> + 'static) -> Self {
        self.shrink = Some(Box::new(shrink));
        self
    }

    /// Attach a print operation.
    pub fn with_print(mut self, print: impl Fn(&T) -> String + 'static) -> Self {
        self.print = Some(Box::new(print));
        self
    }
}

/// Downcast an engine-owned value back to `T`.
///
/// The engine only ever hands a position values that position allocated, so a
/// mismatch is a wiring bug, not a recoverable condition.
fn view<T: 'static>(value: &dyn Any) -> &T {
    value
        .downcast_ref::<T>()
        .expect("argument value does not match its type info")
}

impl<T: 'static> TypeInfo for InfoOf<T> {
    fn allocate(&self, stream: &mut WordStream) -> Option<ArgValue> {
        (self.alloc)(stream).map(|v| Box::new(v) as ArgValue)
    }

    fn hash(&self, value: &dyn Any) -> Option<u64> {
        self.hash.as_ref().map(|f| f(view::<T>(value)))
    }

    fn shrink(&self, value: &dyn Any, tactic: TacticIdx) -> ShrinkStep {
        match &self.shrink {
            None => ShrinkStep::NoMoreTactics,
            Some(f) => match f(view::<T>(value), tactic) {
                ShrinkStep::Shrunk(v) => ShrinkStep::Shrunk(Box::new(v) as ArgValue),
                ShrinkStep::DeadEnd => ShrinkStep::DeadEnd,
                ShrinkStep::NoMoreTactics => ShrinkStep::NoMoreTactics,
            },
        }
    }

    fn print(&self, value: &dyn Any) -> Option<String> {
        self.print.as_ref().map(|f| f(view::<T>(value)))
    }
}

// ============================================================================
// Tests
// ============================================================================
