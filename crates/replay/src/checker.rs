//! The baseline holding consistency checker.
//!
//! A [`ConsistencyChecker`] starts out empty. The first body it checks becomes the
//! baseline and every later body is compared against that baseline. The checker is
//! meant to be built once and shared, usually as an `Arc<ConsistencyChecker>`,
//! between every request that passes through a tap.

use crate::capture::CapturedBody;
use crate::diff::{DiffResult, diff};
use crate::report::DivergenceReport;
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Result of a single [`ConsistencyChecker::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonOutcome {
    /// The checker was empty and this body became the baseline.
    BaselineSet { sequence: u64 },
    /// The body is byte for byte equal to the baseline.
    Consistent { sequence: u64 },
    /// The body differs from the baseline.
    Diverged(DivergenceReport),
}

impl ComparisonOutcome {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::BaselineSet { sequence } | Self::Consistent { sequence } => *sequence,
            Self::Diverged(report) => report.candidate().sequence(),
        }
    }

    #[inline]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged(_))
    }

    pub fn report(&self) -> Option<&DivergenceReport> {
        match self {
            Self::Diverged(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Empty,
    Armed(CapturedBody),
}

/// Compares every captured body against the first one it was given.
#[derive(Debug, Default)]
pub struct ConsistencyChecker {
    state: Mutex<State>,
    sequence: AtomicU64,
}

impl ConsistencyChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags `bytes` with the next capture sequence number.
    ///
    /// Only the counter is touched, the baseline lock is not taken.
    pub fn record(&self, bytes: Bytes) -> CapturedBody {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        CapturedBody::new(sequence, bytes)
    }

    /// Records and checks `bytes` in one step.
    pub fn capture(&self, bytes: Bytes) -> ComparisonOutcome {
        let captured = self.record(bytes);
        self.check(captured)
    }

    /// Stores `captured` as the baseline if there is none yet, otherwise compares
    /// it against the baseline.
    ///
    /// The whole step runs under the baseline lock, so when several first captures
    /// race exactly one of them becomes the baseline and the others are compared
    /// against it.
    pub fn check(&self, captured: CapturedBody) -> ComparisonOutcome {
        let mut state = self.lock();
        match &*state {
            State::Empty => {
                let sequence = captured.sequence();
                debug!(sequence, len = captured.len(), "baseline request body captured");
                *state = State::Armed(captured);
                ComparisonOutcome::BaselineSet { sequence }
            }
            State::Armed(baseline) => match diff(baseline.bytes(), captured.bytes()) {
                DiffResult::Equal => {
                    trace!(sequence = captured.sequence(), "request body matches baseline");
                    ComparisonOutcome::Consistent { sequence: captured.sequence() }
                }
                DiffResult::Divergent(divergence) => {
                    ComparisonOutcome::Diverged(DivergenceReport::new(baseline.clone(), captured, divergence))
                }
            },
        }
    }

    /// The current baseline, if one has been captured.
    pub fn baseline(&self) -> Option<CapturedBody> {
        match &*self.lock() {
            State::Empty => None,
            State::Armed(baseline) => Some(baseline.clone()),
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(&*self.lock(), State::Armed(_))
    }

    /// Drops the baseline so the next capture starts a new session.
    ///
    /// Returns the baseline that was dropped. Sequence numbers keep counting.
    pub fn reset(&self) -> Option<CapturedBody> {
        match std::mem::take(&mut *self.lock()) {
            State::Empty => None,
            State::Armed(baseline) => {
                debug!(sequence = baseline.sequence(), "baseline request body dropped");
                Some(baseline)
            }
        }
    }

    // the state is only ever replaced wholesale, so a poisoned guard still holds a valid value
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
