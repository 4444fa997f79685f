//! Reporting: counters, failure records, and the progress hook surface
//!
//! The report structure returned by a run reflects the state at termination
//! regardless of outcome: counters are updated monotonically on every
//! transition and reset at run start; no error is swallowed; nothing is
//! retried. Human-facing emission goes through `tracing`, never stdout.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::runner::EngineError;
use crate::Seed;

/// Verdict returned by a property for one trial.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The property holds for this tuple.
    Pass,
    /// The property is falsified by this tuple.
    Fail,
    /// The property declines to judge this tuple.
    Skip,
    /// The property cannot continue; the run aborts.
    Error,
}

/// Terminal outcome of one trial, as observed by the progress hook.
///
/// Unlike [`Verdict`], this includes tuples suppressed as duplicates before
/// the property was invoked.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrialOutcome {
    /// The property passed.
    Pass,
    /// The property failed (after shrinking completed).
    Fail,
    /// The property skipped, or an allocator declined.
    Skip,
    /// The tuple was suppressed by the bloom filter.
    Duplicate,
}

/// Outcome of a whole run.
///
/// Precedence: `Error` over `Fail` (≥ 1 failure) over `Skip` (≥ 1 skip,
/// no failure) over `Pass`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunResult {
    /// Every judged trial passed.
    Pass,
    /// At least one trial failed.
    Fail,
    /// At least one trial skipped and none failed.
    Skip,
    /// Validation failed, or an allocator or the property signalled an error.
    Error,
}

/// Decision returned by the progress hook after each trial.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Keep running trials.
    Continue,
    /// Terminate the run cleanly with the current counters.
    Halt,
}

/// Running tallies for one run. Monotone; reset at run start.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    /// Trials on which the property passed.
    pub passes: u64,
    /// Trials on which the property failed.
    pub failures: u64,
    /// Trials skipped by the property or by allocation failure.
    pub skipped: u64,
    /// Trials suppressed by the bloom filter.
    pub duplicates: u64,
}

impl Counters {
    /// Trials actually attempted: every attempted trial lands in exactly one
    /// counter (an aborting trial lands in none).
    pub fn total(&self) -> u64 {
        self.passes + self.failures + self.skipped + self.duplicates
    }
}

/// One reported counter-example, after shrinking.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Trial index within the run.
    pub trial: u64,
    /// The reproducer: replaying this trial seed with an identical
    /// configuration regenerates the original failing tuple.
    pub seed: Seed,
    /// Accepted shrink steps between the generated and the reported tuple.
    pub shrink_steps: u64,
    /// Printed rendering per position; `None` where the position has no print
    /// operation (the seed-derived identity above suffices to reproduce it).
    pub args: Vec<Option<String>>,
}

/// Per-trial observation handed to the progress hook.
#[derive(Copy, Clone, Debug)]
pub struct Progress {
    /// Trial index within the run.
    pub trial: u64,
    /// Seed of this trial.
    pub seed: Seed,
    /// Terminal outcome of this trial.
    pub outcome: TrialOutcome,
    /// Counters after this trial's transition.
    pub counters: Counters,
}

/// Everything a run produced, observable after `run` returns.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Overall outcome (see [`RunResult`] for precedence).
    pub result: RunResult,
    /// Run seed the trial seeds were derived from.
    pub seed: Seed,
    /// Final tallies.
    pub counters: Counters,
    /// One record per failing trial, in trial order.
    pub failures: Vec<Failure>,
    /// Present iff `result` is [`RunResult::Error`].
    pub error: Option<EngineError>,
}

/// Canonical human-readable seed rendering: `0x` + 16 hex digits.
pub fn format_seed(seed: Seed) -> String {
    format!("{seed:#018x}")
}

/// Emit one failure through `tracing`, with the reproducer seed and the
/// printed (shrunk) arguments.
pub(crate) fn emit_failure(name: Option<&str>, run_seed: Seed, failure: &Failure) {
    let args: Vec<String> = failure
        .args
        .iter()
        .enumerate()
        .map(|(pos, printed)| match printed {
            Some(s) => s.clone(),
            None => format!(
                "<arg {pos}: run seed {}, trial {}>",
                format_seed(run_seed),
                failure.trial
            ),
        })
        .collect();
    warn!(
        property = name.unwrap_or("<unnamed>"),
        trial = failure.trial,
        seed = %format_seed(failure.seed),
        shrink_steps = failure.shrink_steps,
        args = ?args,
        "property falsified"
    );
}

// ============================================================================
// Tests
// ============================================================================
