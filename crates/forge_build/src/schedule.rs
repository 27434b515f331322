//! Unit Scheduling
//!
//! Build units share no mutable state and may run in any order. The
//! scheduler runs them on a rayon pool (or inline for `jobs = 1`) and
//! collects the outcome of each into a [`BuildReport`].
//!
//! Nothing is retried. Under [`FailurePolicy::FailFast`] no unit starts
//! after the first failure; units already running finish.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rayon::prelude::*;

use forge_core::{ForgeError, Result};

use crate::executor::{BuildUnit, CompileOrFallbackExecutor, UnitOutcome};

/// What happens to remaining units after a failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    #[default]
    FailFast,
    KeepGoing,
}

/// A unit that did not produce its output.
#[derive(Debug)]
pub struct UnitFailure {
    /// Position of the unit in the scheduled list.
    pub index: usize,
    pub output: PathBuf,
    pub error: ForgeError,
}

/// Outcome counts of one scheduler run.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub compiled: usize,
    pub copied: usize,
    pub up_to_date: usize,
    /// Units never started because of an earlier failure.
    pub skipped: usize,
    /// Failures in unit order.
    pub failures: Vec<UnitFailure>,
}

impl BuildReport {
    fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Compiled => self.compiled += 1,
            UnitOutcome::Copied => self.copied += 1,
            UnitOutcome::UpToDate => self.up_to_date += 1,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of units accounted for.
    #[must_use]
    pub fn total(&self) -> usize {
        self.compiled + self.copied + self.up_to_date + self.skipped + self.failures.len()
    }

    /// The first failure, if any, as an error.
    pub fn into_result(self) -> Result<()> {
        match self.failures.into_iter().next() {
            Some(failure) => Err(failure.error),
            None => Ok(()),
        }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} compiled, {} copied, {} up to date",
            self.compiled, self.copied, self.up_to_date
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        if self.skipped > 0 {
            write!(f, ", {} skipped", self.skipped)?;
        }
        Ok(())
    }
}

/// Runs build units in parallel.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    jobs: usize,
    policy: FailurePolicy,
    executor: CompileOrFallbackExecutor,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: 0,
            policy: FailurePolicy::default(),
            executor: CompileOrFallbackExecutor::new(),
        }
    }

    /// Worker count: 1 runs inline, 0 uses rayon's default.
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    #[must_use]
    pub fn policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.executor = self.executor.force(force);
        self
    }

    pub fn run(&self, units: &[BuildUnit]) -> BuildReport {
        let stop = AtomicBool::new(false);
        let report = Mutex::new(BuildReport::default());

        let run_one = |(index, unit): (usize, &BuildUnit)| {
            if stop.load(Ordering::Relaxed) {
                report.lock().skipped += 1;
                return;
            }
            match self.executor.execute(unit) {
                Ok(outcome) => report.lock().record(outcome),
                Err(error) => {
                    log::error!("{} {}: {error}", unit.family, unit.artifact);
                    if self.policy == FailurePolicy::FailFast {
                        stop.store(true, Ordering::Relaxed);
                    }
                    report.lock().failures.push(UnitFailure {
                        index,
                        output: unit.output.clone(),
                        error,
                    });
                }
            }
        };

        if self.jobs == 1 {
            units.iter().enumerate().for_each(run_one);
        } else {
            match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
                Ok(pool) => pool.install(|| units.par_iter().enumerate().for_each(run_one)),
                Err(err) => {
                    log::warn!("could not start worker pool ({err}), building sequentially");
                    units.iter().enumerate().for_each(run_one);
                }
            }
        }

        let mut report = report.into_inner();
        report.failures.sort_by_key(|failure| failure.index);
        report
    }
}
