//! Flat profiling of wrapped calls.
//!
//! [`FlatProfiler`] is a [`CallWrap`] that times every wrapped call and
//! reports a per-callee breakdown when the function finishes. One profiler
//! is built per invocation, so concurrent invocations never share timing
//! state. Reporting happens through [`FlatProfiler::finish`] on the normal
//! return path and through `Drop` when the body panics, so a partial
//! breakdown still surfaces.

use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{CallExtras, CallWrap};

/// Identifies the profiled function in reports.
#[derive(Debug, Clone, Copy)]
pub struct FnDescriptor {
    /// Fully qualified name, `module_path!()` plus the function name.
    pub name: &'static str,
}

/// Receives the report for one finished invocation.
///
/// Arguments: total runtime, the configured limit, the per-callee timing
/// breakdown, and the profiled function.
pub type ProfilerCallback = fn(Duration, Duration, &CallTimes, &FnDescriptor);

/// Per-callee timings collected during one invocation.
///
/// Callees are keyed by identity in first-call order; each entry keeps the
/// individual durations so callbacks can report counts, totals, or
/// distributions.
#[derive(Debug, Default)]
pub struct CallTimes {
    entries: Vec<(&'static str, Vec<Duration>)>,
}

impl CallTimes {
    fn record(&mut self, name: &'static str, elapsed: Duration) {
        match self.entries.iter_mut().find(|(entry, _)| *entry == name) {
            Some((_, times)) => times.push(elapsed),
            None => self.entries.push((name, vec![elapsed])),
        }
    }

    /// Durations recorded for one callee.
    pub fn get(&self, name: &str) -> Option<&[Duration]> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, times)| times.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[Duration])> {
        self.entries
            .iter()
            .map(|(name, times)| (*name, times.as_slice()))
    }

    /// Number of distinct callees recorded.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total time per callee, slowest first.
    pub fn sorted_totals(&self) -> Vec<(&'static str, Duration)> {
        let mut totals: Vec<_> = self
            .entries
            .iter()
            .map(|(name, times)| (*name, times.iter().sum::<Duration>()))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        totals
    }
}

/// Configuration for one profiled function.
pub struct ProfileConfig {
    /// Threshold separating the two report paths.
    pub limit: Duration,
    /// Fires when total runtime stays under the limit.
    pub below_callback: Option<ProfilerCallback>,
    /// Fires when total runtime reaches the limit.
    pub above_callback: Option<ProfilerCallback>,
    /// The profiled function.
    pub function: FnDescriptor,
}

/// Times wrapped calls for a single invocation and reports once.
pub struct FlatProfiler {
    config: ProfileConfig,
    started: Instant,
    times: RefCell<CallTimes>,
    reported: Cell<bool>,
}

impl FlatProfiler {
    pub fn new(config: ProfileConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
            times: RefCell::new(CallTimes::default()),
            reported: Cell::new(false),
        }
    }

    /// Report this invocation. Called on the normal return path; a second
    /// call (or the later drop) is a no-op.
    pub fn finish(&self) {
        if !self.reported.replace(true) {
            self.report();
        }
    }

    fn report(&self) {
        let total = self.started.elapsed();
        let times = self.times.borrow();
        let callback = if total < self.config.limit {
            self.config.below_callback
        } else {
            self.config.above_callback
        };
        if let Some(callback) = callback {
            callback(total, self.config.limit, &times, &self.config.function);
        }
    }
}

impl CallWrap for FlatProfiler {
    fn wrap<T>(&self, extras: &CallExtras, call: impl FnOnce() -> T) -> T {
        // Recorded from a drop guard so a panicking call still contributes
        // its elapsed time to the breakdown.
        let _guard = RecordOnDrop {
            times: &self.times,
            name: extras.name,
            started: Instant::now(),
        };
        call()
    }
}

impl Drop for FlatProfiler {
    fn drop(&mut self) {
        if !self.reported.get() {
            self.report();
        }
    }
}

struct RecordOnDrop<'a> {
    times: &'a RefCell<CallTimes>,
    name: &'static str,
    started: Instant,
}

impl Drop for RecordOnDrop<'_> {
    fn drop(&mut self) {
        self.times
            .borrow_mut()
            .record(self.name, self.started.elapsed());
    }
}

/// Default below-limit report: a single info line.
pub fn log_below(total: Duration, limit: Duration, _times: &CallTimes, func: &FnDescriptor) {
    info!(
        target: "callweave",
        "{} finished in {total:?}, under the limit of {limit:?}",
        func.name
    );
}

/// Default above-limit report: a warning with the per-callee breakdown,
/// slowest callee first.
pub fn log_above(total: Duration, limit: Duration, times: &CallTimes, func: &FnDescriptor) {
    let breakdown = times
        .sorted_totals()
        .into_iter()
        .map(|(name, spent)| {
            let count = times.get(name).map_or(0, <[Duration]>::len);
            format!("{name}: {spent:?} over {count} call(s)")
        })
        .collect::<Vec<_>>()
        .join(", ");
    warn!(
        target: "callweave",
        "{} finished in {total:?}, over the limit of {limit:?} [{breakdown}]",
        func.name
    );
}
