//! Trial runner
//!
//! The engine wires the whole search: for each trial it derives the trial
//! seed, instantiates the word stream, asks the type-info vocabulary to
//! allocate an argument tuple, consults the bloom filter, invokes the
//! property, classifies the verdict, and routes failures through the
//! shrinker before reporting them.
//!
//! Key properties
//! - **Trials execute in ascending index** and the per-trial seed is a pure
//!   function of the run seed, so the ordering observed through the progress
//!   hook is the ordering a replay walks.
//! - **One stream per tuple.** A single [`WordStream`] is threaded through
//!   every position's allocator in order; the reproducer seed refers to the
//!   tuple as a whole.
//! - **Forced seeds.** `Config::always_seeds` run first, verbatim, one per
//!   trial. Replaying a reported failure is `always_seeds = vec![t]` with
//!   `trials = 1` and an otherwise identical configuration.
//! - **The engine consumes no randomness itself.** Only allocators draw
//!   words; everything else is seed derivation by hashing.

#![forbid(unsafe_code)]

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::bloom::Bloom;
use crate::info::{tuple_digest, ArgValue, TypeInfo};
use crate::report::{
    emit_failure, format_seed, Counters, Failure, Flow, Progress, RunReport, RunResult,
    TrialOutcome, Verdict,
};
use crate::shrink;
use crate::stream::{trial_seed, TrialIdx, WordStream};
use crate::{Seed, DEFAULT_SEED, DEFAULT_TRIALS, MAX_ARGS};

/// The property under test: a predicate over one generated argument tuple.
pub type Property = Box<dyn FnMut(&[ArgValue]) -> Verdict>;

/// Per-trial observer; returning [`Flow::Halt`] ends the run cleanly.
pub type ProgressHook = Box<dyn FnMut(&Progress) -> Flow>;

/// Rejected configurations, surfaced before any trial runs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The type-info list is empty.
    #[error("at least one argument position is required")]
    NoArguments,
    /// The type-info list exceeds the supported arity.
    #[error("{0} argument positions exceed the supported maximum of {MAX_ARGS}")]
    TooManyArguments(usize),
    /// A run of zero trials is meaningless.
    #[error("trial count must be at least 1")]
    ZeroTrials,
}

/// Why a run ended with [`RunResult::Error`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The configuration was rejected before any trial ran.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The property signalled an unrecoverable error.
    #[error("property aborted the run at trial {trial} (seed {seed:#018x})")]
    Property {
        /// Trial index at which the property aborted.
        trial: u64,
        /// Seed of the aborting trial.
        seed: Seed,
    },
}

/// Everything one run needs: the property, its argument vocabulary, and the
/// search parameters.
pub struct Config {
    /// Property name for messages; unnamed properties report as `<unnamed>`.
    pub name: Option<String>,
    /// The property under test.
    pub property: Property,
    /// One type-info reference per argument position, in order. The same
    /// reference may serve several positions.
    pub args: Vec<Arc<dyn TypeInfo>>,
    /// Number of trials to attempt.
    pub trials: usize,
    /// Run seed all trial seeds derive from.
    pub seed: Seed,
    /// Seeds to run first, verbatim, one per trial — the replay channel for
    /// reported reproducers. Entries beyond `trials` are ignored.
    pub always_seeds: Vec<Seed>,
    /// Per-trial observer, consulted after every counted trial.
    pub hook: Option<ProgressHook>,
}

impl Config {
    /// A configuration with defaults: unnamed, [`DEFAULT_TRIALS`] trials,
    /// [`DEFAULT_SEED`], no forced seeds, no hook.
    pub fn new(
        property: impl FnMut(&[ArgValue]) -> Verdict + 'static,
        args: Vec<Arc<dyn TypeInfo>>,
    ) -> Self {
        Self {
            name: None,
            property: Box::new(property),
            args,
            trials: DEFAULT_TRIALS,
            seed: DEFAULT_SEED,
            always_seeds: Vec::new(),
            hook: None,
        }
    }

    /// Check the preconditions the trial loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.args.is_empty() {
            return Err(ConfigError::NoArguments);
        }
        if self.args.len() > MAX_ARGS {
            return Err(ConfigError::TooManyArguments(self.args.len()));
        }
        if self.trials == 0 {
            return Err(ConfigError::ZeroTrials);
        }
        Ok(())
    }
}

/// The search-and-shrink engine.
///
/// Construction chooses the bloom sizing policy; each run builds its filter
/// empty (sized from the trial count unless a bit-width hint was given) and
/// all remaining state dies with the run. Dropping the engine releases
/// everything.
pub struct Engine {
    bloom_bits: Option<u32>,
}

impl Engine {
    /// An engine with auto-sized defaults.
    pub fn new() -> Self {
        Self { bloom_bits: None }
    }

    /// An engine whose bloom filter uses `2^k` bits, with `k` clamped to the
    /// supported range.
    pub fn with_bloom_bits(k: u32) -> Self {
        Self { bloom_bits: Some(k) }
    }

    /// Run the configured search. The returned report reflects the state at
    /// termination regardless of outcome.
    pub fn run(&mut self, cfg: &mut Config) -> RunReport {
        let mut report = RunReport {
            result: RunResult::Pass,
            seed: cfg.seed,
            counters: Counters::default(),
            failures: Vec::new(),
            error: None,
        };

        if let Err(e) = cfg.validate() {
            error!(error = %e, "configuration rejected");
            report.result = RunResult::Error;
            report.error = Some(EngineError::Config(e));
            return report;
        }

        let mut bloom = Bloom::sized(self.bloom_bits, cfg.trials);
        info!(
            property = cfg.name.as_deref().unwrap_or("<unnamed>"),
            seed = %format_seed(cfg.seed),
            trials = cfg.trials,
            bloom_bits = bloom.bit_count(),
            "run started"
        );

        let mut halted = false;
        for trial in 0..cfg.trials as u64 {
            let seed = match cfg.always_seeds.get(trial as usize) {
                Some(&forced) => forced,
                None => trial_seed(cfg.seed, TrialIdx(trial)),
            };
            let mut stream = WordStream::from_seed(seed);

            // One shared stream: later positions see words consumed by
            // earlier ones.
            let mut tuple: Vec<ArgValue> = Vec::with_capacity(cfg.args.len());
            let mut starved = false;
            for position in &cfg.args {
                match position.allocate(&mut stream) {
                    Some(value) => tuple.push(value),
                    None => {
                        starved = true;
                        break;
                    }
                }
            }
            if starved {
                drop(tuple);
                report.counters.skipped += 1;
                debug!(trial, seed = %format_seed(seed), "allocator declined; trial skipped");
                if hook_halts(&mut cfg.hook, trial, seed, TrialOutcome::Skip, report.counters) {
                    halted = true;
                    break;
                }
                continue;
            }

            if let Some(digest) = tuple_digest(&cfg.args, &tuple) {
                if bloom.test_and_set(digest) {
                    drop(tuple);
                    report.counters.duplicates += 1;
                    debug!(trial, seed = %format_seed(seed), "duplicate tuple suppressed");
                    if hook_halts(
                        &mut cfg.hook,
                        trial,
                        seed,
                        TrialOutcome::Duplicate,
                        report.counters,
                    ) {
                        halted = true;
                        break;
                    }
                    continue;
                }
            }

            let outcome = match (cfg.property)(&tuple) {
                Verdict::Pass => {
                    report.counters.passes += 1;
                    drop(tuple);
                    TrialOutcome::Pass
                }
                Verdict::Skip => {
                    report.counters.skipped += 1;
                    drop(tuple);
                    TrialOutcome::Skip
                }
                Verdict::Error => {
                    drop(tuple);
                    error!(trial, seed = %format_seed(seed), "property aborted the run");
                    report.result = RunResult::Error;
                    report.error = Some(EngineError::Property { trial, seed });
                    return report;
                }
                Verdict::Fail => {
                    report.counters.failures += 1;
                    let (shrunk, shrink_steps) =
                        shrink::minimize(&cfg.args, cfg.property.as_mut(), &mut bloom, tuple);
                    let failure = Failure {
                        trial,
                        seed,
                        shrink_steps,
                        args: render_args(&cfg.args, &shrunk),
                    };
                    drop(shrunk);
                    emit_failure(cfg.name.as_deref(), cfg.seed, &failure);
                    report.failures.push(failure);
                    TrialOutcome::Fail
                }
            };
            if hook_halts(&mut cfg.hook, trial, seed, outcome, report.counters) {
                halted = true;
                break;
            }
        }

        report.result = if report.counters.failures > 0 {
            RunResult::Fail
        } else if report.counters.skipped > 0 {
            RunResult::Skip
        } else {
            RunResult::Pass
        };
        info!(
            property = cfg.name.as_deref().unwrap_or("<unnamed>"),
            result = ?report.result,
            passes = report.counters.passes,
            failures = report.counters.failures,
            skipped = report.counters.skipped,
            duplicates = report.counters.duplicates,
            halted,
            "run finished"
        );
        report
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn hook_halts(
    hook: &mut Option<ProgressHook>,
    trial: u64,
    seed: Seed,
    outcome: TrialOutcome,
    counters: Counters,
) -> bool {
    match hook {
        None => false,
        Some(observe) => {
            let progress = Progress {
                trial,
                seed,
                outcome,
                counters,
            };
            matches!(observe(&progress), Flow::Halt)
        }
    }
}

fn render_args(args: &[Arc<dyn TypeInfo>], tuple: &[ArgValue]) -> Vec<Option<String>> {
    args.iter()
        .zip(tuple)
        .map(|(info, value)| info.print(value.as_ref()))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
