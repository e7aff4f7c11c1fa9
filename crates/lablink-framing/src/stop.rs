use std::time::{Duration, Instant};

use crate::content::{Length, Termination};
use crate::timeout::Timeout;

/// What happens to the bytes collected so far when a timeout fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataStrategy {
    /// Drop everything; the read yields empty.
    Discard,
    /// Yield everything collected so far; the timeout acts as a framer.
    Return,
    /// Yield nothing now; keep the bytes for the next read call.
    Store,
}

/// The three timeout categories of a [`Timeout`] condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Time allowed for the device to start answering.
    Response,
    /// Maximum gap between consecutive fragments of one answer.
    Continuation,
    /// Hard ceiling on the whole read, first byte or not.
    Total,
}

/// What the read loop observed: a stamped fragment, or a queue wait that
/// ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadEvent {
    /// Bytes arrived; `at` is their receipt stamp.
    Data { at: Instant },
    /// The bounded queue wait elapsed with nothing queued.
    Expired,
}

/// Decision returned by [`StopCondition::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Keep reading; wait at most `bound` for the next fragment
    /// (`None` means wait indefinitely).
    Continue { bound: Option<Duration> },
    /// The read is complete; apply the disposition to the accumulation.
    Stop(Disposition),
}

/// How to split the accumulated bytes once a read stops.
///
/// Offsets index the accumulation the evaluator was shown, with the newest
/// fragment already appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Yield empty, keep nothing.
    Discard,
    /// Yield the whole accumulation.
    Return,
    /// Yield empty, defer the whole accumulation to the next read.
    Store,
    /// Yield `..keep`, drop `keep..defer_from`, defer `defer_from..`.
    Split { keep: usize, defer_from: usize },
}

impl From<DataStrategy> for Disposition {
    fn from(strategy: DataStrategy) -> Self {
        match strategy {
            DataStrategy::Discard => Disposition::Discard,
            DataStrategy::Return => Disposition::Return,
            DataStrategy::Store => Disposition::Store,
        }
    }
}

/// A rule deciding when a logical read is complete.
///
/// Exactly one of three shapes: framed by time ([`Timeout`]), by byte count
/// ([`Length`]), or by a terminator sequence ([`Termination`]). The reading
/// loop drives the same two-step protocol against any of them: `arm` once
/// per call, then `evaluate` after every queue event until a
/// [`Verdict::Stop`].
#[derive(Debug, Clone)]
pub enum StopCondition {
    Timeout(Timeout),
    Length(Length),
    Termination(Termination),
}

impl StopCondition {
    /// Reset per-call state and return the first queue wait bound.
    pub fn arm(&mut self, now: Instant) -> Option<Duration> {
        match self {
            StopCondition::Timeout(t) => t.arm(now),
            StopCondition::Length(l) => l.arm(),
            StopCondition::Termination(t) => t.arm(),
        }
    }

    /// Judge the accumulation after one queue event.
    ///
    /// `accumulated` is everything collected this call, newest fragment
    /// included. `now` is the caller's clock reading, used to size the next
    /// wait against a total deadline.
    pub fn evaluate(&mut self, accumulated: &[u8], event: ReadEvent, now: Instant) -> Verdict {
        match self {
            StopCondition::Timeout(t) => t.evaluate(event, now),
            StopCondition::Length(l) => l.evaluate(accumulated),
            StopCondition::Termination(t) => t.evaluate(accumulated),
        }
    }
}

impl From<Timeout> for StopCondition {
    fn from(timeout: Timeout) -> Self {
        StopCondition::Timeout(timeout)
    }
}

impl From<Length> for StopCondition {
    fn from(length: Length) -> Self {
        StopCondition::Length(length)
    }
}

impl From<Termination> for StopCondition {
    fn from(termination: Termination) -> Self {
        StopCondition::Termination(termination)
    }
}
