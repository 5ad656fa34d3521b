//! Progress reporting and cooperative cancellation.
//!
//! A single [`ProgressMonitor`] is passed by reference through every long
//! running step. Components poll [`ProgressMonitor::is_cancelled`] between
//! bounded units of work (a layer, a sweep, a batch of simplex pivots) and stop
//! with [`Outcome::Cancelled`] without committing the unfinished step.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use log::trace;

/// Signal object shared between the caller and a running layout.
pub trait ProgressMonitor: Sync {
    /// Returns true once the caller asked the layout to stop.
    fn is_cancelled(&self) -> bool;

    /// Reports the completed fraction (`0.0..=1.0`) of the current invocation.
    fn report_progress(&self, fraction: f64);
}

/// Result of a layout step that ran to completion or was cancelled.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The step stopped early; the graph holds the previous step's output.
    Cancelled,
}

impl Outcome {
    pub fn is_cancelled(self) -> bool {
        self == Outcome::Cancelled
    }
}

/// Intermediate result of a strategy that computes into scratch storage.
///
/// A strategy never touches the graph it reads; the caller commits the
/// [`Step::Done`] payload in one go, or nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    Done(T),
    Cancelled,
}

impl<T> Step<T> {
    /// Maps the payload of a finished step.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Step<U> {
        match self {
            Step::Done(value) => Step::Done(f(value)),
            Step::Cancelled => Step::Cancelled,
        }
    }
}

/// Monitor that never cancels and discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullMonitor;

impl ProgressMonitor for NullMonitor {
    fn is_cancelled(&self) -> bool {
        false
    }

    fn report_progress(&self, _fraction: f64) {}
}

/// Monitor backed by atomics, so it can be cancelled from another thread.
///
/// # Examples
///
/// ```
/// use strata::progress::{CancellationMonitor, ProgressMonitor};
///
/// let monitor = CancellationMonitor::new();
/// monitor.report_progress(0.25);
/// assert_eq!(monitor.progress(), 0.25);
///
/// monitor.cancel();
/// assert!(monitor.is_cancelled());
/// ```
#[derive(Debug, Default)]
pub struct CancellationMonitor {
    cancelled: AtomicBool,
    progress_bits: AtomicU64,
}

impl CancellationMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the running layout.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns the last reported fraction.
    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress_bits.load(Ordering::Acquire))
    }
}

impl ProgressMonitor for CancellationMonitor {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn report_progress(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        trace!(fraction; "Layout progress");
        self.progress_bits
            .store(fraction.to_bits(), Ordering::Release);
    }
}


#[cfg(test)]
mod tests {
    use super::{testing::CancelAfter, *};

    #[test]
    fn test_null_monitor_never_cancels() {
        let monitor = NullMonitor;
        monitor.report_progress(0.5);
        assert!(!monitor.is_cancelled());
    }

    #[test]
    fn test_cancellation_monitor_clamps_progress() {
        let monitor = CancellationMonitor::new();
        assert_eq!(monitor.progress(), 0.0);

        monitor.report_progress(3.0);
        assert_eq!(monitor.progress(), 1.0);

        monitor.report_progress(-1.0);
        assert_eq!(monitor.progress(), 0.0);
    }

    #[test]
    fn test_cancellation_monitor_is_shareable() {
        let monitor = CancellationMonitor::new();
        std::thread::scope(|scope| {
            scope.spawn(|| monitor.cancel());
        });
        assert!(monitor.is_cancelled());
    }

    #[test]
    fn test_cancel_after_counts_polls() {
        let monitor = CancelAfter::new(2);
        assert!(!monitor.is_cancelled());
        assert!(!monitor.is_cancelled());
        assert!(monitor.is_cancelled());
        assert!(monitor.is_cancelled());
    }

    #[test]
    fn test_outcome_is_cancelled() {
        assert!(Outcome::Cancelled.is_cancelled());
        assert!(!Outcome::Completed.is_cancelled());
    }
}
