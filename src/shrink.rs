//! Breadth-first shrinking
//!
//! Given a failing argument tuple, descend over (position, tactic) pairs
//! until no tactic at any position produces a simpler tuple that still fails:
//! positions left-to-right, tactics in ascending index order, and — on every
//! accepted step — a restart from tactic 0 on the new value, so coarse
//! tactics that previously hit a dead end are retried where they may now
//! apply. The first failing candidate is committed immediately, with no
//! lookahead toward a finer one: locality and speed over global minimality.
//!
//! Candidate tuples share the run's bloom filter history. A candidate whose
//! digest is already present is treated as **already tested** and the tactic
//! index advances; the alternative (retrying the same index later) is not
//! implemented.
//!
//! Termination rests on the shrink contract: every accepted value is strictly
//! simpler, and no infinite descending chain exists across any combination of
//! tactics.

#![forbid(unsafe_code)]

use std::mem;
use std::sync::Arc;

use tracing::trace;

use crate::bloom::Bloom;
use crate::info::{tuple_digest, ArgValue, ShrinkStep, TypeInfo};
use crate::report::Verdict;
use crate::stream::TacticIdx;

/// Reduce `tuple` to a locally minimal tuple still witnessing failure.
///
/// Returns the reduced tuple and the number of accepted shrink steps. The
/// caller still owns the result and sees only the final tuple, never an
/// intermediate. Rejected candidates are dropped immediately; an accepted
/// candidate's parent is dropped before the next step. The property verdicts
/// `Pass`, `Skip`, and `Error` all reject a candidate; only `Fail` commits.
pub fn minimize(
    args: &[Arc<dyn TypeInfo>],
    property: &mut dyn FnMut(&[ArgValue]) -> Verdict,
    bloom: &mut Bloom,
    mut current: Vec<ArgValue>,
) -> (Vec<ArgValue>, u64) {
    let mut accepted: u64 = 0;
    loop {
        let mut progress = false;
        for pos in 0..args.len() {
            let info = &args[pos];
            let mut tactic = TacticIdx(0);
            loop {
                let candidate = match info.shrink(current[pos].as_ref(), tactic) {
                    ShrinkStep::NoMoreTactics => break,
                    ShrinkStep::DeadEnd => {
                        tactic = tactic.next();
                        continue;
                    }
                    ShrinkStep::Shrunk(candidate) => candidate,
                };

                // Splice the candidate in; the parent stays on hand until the
                // verdict decides which of the two survives.
                let parent = mem::replace(&mut current[pos], candidate);

                if let Some(digest) = tuple_digest(args, &current) {
                    if bloom.test_and_set(digest) {
                        drop(mem::replace(&mut current[pos], parent));
                        tactic = tactic.next();
                        continue;
                    }
                }

                match property(&current) {
                    Verdict::Fail => {
                        drop(parent);
                        accepted += 1;
                        progress = true;
                        trace!(
                            pos,
                            tactic = tactic.as_u32(),
                            accepted,
                            "shrink step accepted"
                        );
                        tactic = TacticIdx(0);
                    }
                    _ => {
                        drop(mem::replace(&mut current[pos], parent));
                        tactic = tactic.next();
                    }
                }
            }
        }
        if !progress {
            break;
        }
    }
    (current, accepted)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::InfoOf;
    use crate::runner::{Config, Engine};
    use crate::report::RunResult;
    use std::cell::Cell;
    use std::rc::Rc;

    fn fnv(bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .fold(0xcbf2_9ce4_8422_2325u64, |h, &b| {
                (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
            })
    }

    #[test]
    fn accepted_steps_restart_from_the_coarsest_tactic() {
        // Halving applies only to even values; decrement always applies.
        // After a decrement is accepted, halving must be retried — and now
        // applies — or the walk stalls far from the local minimum.
        let info: Arc<dyn TypeInfo> = Arc::new(InfoOf::new(|s| Some(s.next64())).with_shrink(
            |v: &u64, tactic| match tactic.as_u32() {
                0 if *v > 0 && v % 2 == 0 => ShrinkStep::Shrunk(v / 2),
                0 => ShrinkStep::DeadEnd,
                1 if *v > 0 => ShrinkStep::Shrunk(v - 1),
                1 => ShrinkStep::DeadEnd,
                _ => ShrinkStep::NoMoreTactics,
            },
        ));
        let mut property = |tuple: &[ArgValue]| {
            if *tuple[0].downcast_ref::<u64>().unwrap() >= 3 {
                Verdict::Fail
            } else {
                Verdict::Pass
            }
        };
        let mut bloom = Bloom::sized(None, 16);
        let start: Vec<ArgValue> = vec![Box::new(7u64)];

        let (minimal, steps) = minimize(&[info], &mut property, &mut bloom, start);

        // 7 → 6 (decrement) → 3 (halving, retried after the restart).
        assert_eq!(*minimal[0].downcast_ref::<u64>().unwrap(), 3);
        assert_eq!(steps, 2);
    }

    #[test]
    fn positions_without_shrink_are_left_alone() {
        let info: Arc<dyn TypeInfo> = Arc::new(InfoOf::new(|s| Some(s.next64())));
        let calls = Rc::new(Cell::new(0u32));
        let seen = calls.clone();
        let mut property = move |_tuple: &[ArgValue]| {
            seen.set(seen.get() + 1);
            Verdict::Fail
        };
        let mut bloom = Bloom::sized(None, 16);
        let start: Vec<ArgValue> = vec![Box::new(41u64)];

        let (minimal, steps) = minimize(&[info], &mut property, &mut bloom, start);

        assert_eq!(*minimal[0].downcast_ref::<u64>().unwrap(), 41);
        assert_eq!(steps, 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn candidates_already_tested_are_skipped() {
        let info: Arc<dyn TypeInfo> = Arc::new(
            InfoOf::new(|s| Some(s.next64()))
                .with_hash(|v| *v)
                .with_shrink(|v: &u64, tactic| match tactic.as_u32() {
                    0 if *v == 10 => ShrinkStep::Shrunk(5u64),
                    0 => ShrinkStep::DeadEnd,
                    _ => ShrinkStep::NoMoreTactics,
                }),
        );
        let args = [info];

        // Pre-seed the shared history with the digest of the only candidate
        // tuple; the shrinker must then skip it without a property call.
        let probe: Vec<ArgValue> = vec![Box::new(5u64)];
        let mut bloom = Bloom::sized(None, 16);
        bloom.test_and_set(tuple_digest(&args, &probe).unwrap());

        let calls = Rc::new(Cell::new(0u32));
        let seen = calls.clone();
        let mut property = move |_tuple: &[ArgValue]| {
            seen.set(seen.get() + 1);
            Verdict::Fail
        };
        let start: Vec<ArgValue> = vec![Box::new(10u64)];

        let (minimal, steps) = minimize(&args, &mut property, &mut bloom, start);

        assert_eq!(*minimal[0].downcast_ref::<u64>().unwrap(), 10);
        assert_eq!(steps, 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn failing_integer_shrinks_to_the_boundary() {
        // No hash op: the walk to the boundary visits thousands of candidate
        // values, and a saturating filter would stall it on a false positive.
        let info: Arc<dyn TypeInfo> = Arc::new(
            InfoOf::new(|s| Some(s.next64()))
                .with_shrink(|v: &u64, tactic| match tactic.as_u32() {
                    0 if *v > 0 => ShrinkStep::Shrunk(v / 2),
                    0 => ShrinkStep::DeadEnd,
                    1 if *v > 0 => ShrinkStep::Shrunk(v - 1),
                    1 => ShrinkStep::DeadEnd,
                    _ => ShrinkStep::NoMoreTactics,
                })
                .with_print(|v| v.to_string()),
        );
        let mut cfg = Config::new(
            |tuple| {
                if *tuple[0].downcast_ref::<u64>().unwrap() <= 1000 {
                    Verdict::Pass
                } else {
                    Verdict::Fail
                }
            },
            vec![info],
        );
        cfg.name = Some("integer at most 1000".to_owned());
        cfg.trials = 1;

        let report = Engine::new().run(&mut cfg);

        assert_eq!(report.result, RunResult::Fail);
        assert_eq!(report.counters.failures, 1);
        let failure = &report.failures[0];
        assert_eq!(failure.args[0].as_deref(), Some("1001"));
        assert!(failure.shrink_steps > 0);
    }

    #[test]
    fn byte_buffer_shrinks_to_the_offending_byte() {
        let info: Arc<dyn TypeInfo> = Arc::new(
            InfoOf::new(|_s| {
                let mut buf: Vec<u8> = (0..1024usize).map(|i| (i % 7) as u8).collect();
                buf[513] = 7;
                Some(buf)
            })
            .with_hash(|buf: &Vec<u8>| fnv(buf))
            .with_shrink(|buf: &Vec<u8>, tactic| {
                let len = buf.len();
                match tactic.as_u32() {
                    // drop-first-half, drop-last-half, drop-first, drop-last
                    0 if len / 2 > 0 => ShrinkStep::Shrunk(buf[len / 2..].to_vec()),
                    1 if len / 2 > 0 => ShrinkStep::Shrunk(buf[..len - len / 2].to_vec()),
                    2 if len > 0 => ShrinkStep::Shrunk(buf[1..].to_vec()),
                    3 if len > 0 => ShrinkStep::Shrunk(buf[..len - 1].to_vec()),
                    0..=3 => ShrinkStep::DeadEnd,
                    _ => ShrinkStep::NoMoreTactics,
                }
            })
            .with_print(|buf: &Vec<u8>| hex::encode(buf)),
        );
        let mut cfg = Config::new(
            |tuple| {
                if tuple[0].downcast_ref::<Vec<u8>>().unwrap().contains(&7) {
                    Verdict::Fail
                } else {
                    Verdict::Pass
                }
            },
            vec![info],
        );
        cfg.name = Some("no byte equals 7".to_owned());
        cfg.trials = 1;

        let report = Engine::new().run(&mut cfg);

        assert_eq!(report.counters.failures, 1);
        let printed = report.failures[0].args[0].as_deref().unwrap();
        // Hex rendering: length ≤ 2 bytes and the 7 survived.
        assert!(printed.len() <= 4, "buffer not minimal: {printed}");
        assert!(printed.contains("07"), "offending byte lost: {printed}");
    }
}
