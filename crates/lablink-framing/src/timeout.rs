use std::time::{Duration, Instant};

use tracing::debug;

use crate::stop::{DataStrategy, ReadEvent, TimeoutKind, Verdict};

/// Time-based stop condition with three independent clocks.
///
/// - `response`: how long the device may stay silent before the first byte.
/// - `continuation`: once data has started, the largest gap tolerated between
///   consecutive fragments. This is the usual framer for free-running
///   instruments: the answer is over when the device goes quiet.
/// - `total`: hard ceiling on the whole read, counted from the call start.
///   It can cut an answer mid-stream and is the only defense against a
///   device that never stops transmitting.
///
/// Each clock is optional and pairs with a [`DataStrategy`] deciding what
/// happens to the collected bytes when that clock fires. All arithmetic runs
/// on fragment receipt stamps, so queueing latency between the receive loop
/// and the caller never widens or narrows a gap.
#[derive(Debug, Clone)]
pub struct Timeout {
    response: Option<Duration>,
    on_response: DataStrategy,
    continuation: Option<Duration>,
    on_continuation: DataStrategy,
    total: Option<Duration>,
    on_total: DataStrategy,

    phase: Phase,
    started_at: Instant,
    last_fragment_at: Option<Instant>,
    waiting_on: TimeoutKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    WaitingForResponse,
    Continuation,
}

impl Timeout {
    /// Gap after which an answer is considered finished when no explicit
    /// continuation timeout is configured.
    pub const DEFAULT_CONTINUATION: Duration = Duration::from_millis(5);

    /// Create a timeout condition.
    ///
    /// `response` of `None` waits indefinitely for the first byte. The other
    /// clocks start at their defaults: continuation of
    /// [`DEFAULT_CONTINUATION`](Self::DEFAULT_CONTINUATION) yielding the
    /// collected bytes, no total ceiling, and silent discard on response
    /// expiry.
    pub fn new(response: impl Into<Option<Duration>>) -> Self {
        Self {
            response: response.into(),
            on_response: DataStrategy::Discard,
            continuation: Some(Self::DEFAULT_CONTINUATION),
            on_continuation: DataStrategy::Return,
            total: None,
            on_total: DataStrategy::Discard,
            phase: Phase::WaitingForResponse,
            started_at: Instant::now(),
            last_fragment_at: None,
            waiting_on: TimeoutKind::Response,
        }
    }

    /// Strategy applied when the response clock fires.
    pub fn with_response_strategy(mut self, strategy: DataStrategy) -> Self {
        self.on_response = strategy;
        self
    }

    /// Largest tolerated gap between fragments (`None` disables the clock).
    pub fn with_continuation(mut self, continuation: impl Into<Option<Duration>>) -> Self {
        self.continuation = continuation.into();
        self
    }

    /// Strategy applied when the continuation clock fires.
    pub fn with_continuation_strategy(mut self, strategy: DataStrategy) -> Self {
        self.on_continuation = strategy;
        self
    }

    /// Hard ceiling on the whole read (`None` disables the clock).
    pub fn with_total(mut self, total: impl Into<Option<Duration>>) -> Self {
        self.total = total.into();
        self
    }

    /// Strategy applied when the total clock fires.
    pub fn with_total_strategy(mut self, strategy: DataStrategy) -> Self {
        self.on_total = strategy;
        self
    }

    /// Start a read call at `now` and return the first queue wait bound.
    ///
    /// The bound is the nearer of the response and total deadlines; a total
    /// shorter than the response must still cap the very first wait.
    pub fn arm(&mut self, now: Instant) -> Option<Duration> {
        self.phase = Phase::WaitingForResponse;
        self.started_at = now;
        self.last_fragment_at = None;

        match (self.response, self.total) {
            (None, None) => {
                self.waiting_on = TimeoutKind::Response;
                None
            }
            (Some(response), None) => {
                self.waiting_on = TimeoutKind::Response;
                Some(response)
            }
            (None, Some(total)) => {
                self.waiting_on = TimeoutKind::Total;
                Some(total)
            }
            (Some(response), Some(total)) => {
                if response <= total {
                    self.waiting_on = TimeoutKind::Response;
                    Some(response)
                } else {
                    self.waiting_on = TimeoutKind::Total;
                    Some(total)
                }
            }
        }
    }

    /// Judge one queue event.
    ///
    /// Expiry stops the read with the strategy of whichever clock governed
    /// the wait. A fragment is checked against the clocks in order of
    /// severity (total, then continuation, then response); if none fired,
    /// the read continues and the next wait bound is the smaller of the
    /// continuation gap and the time left until the total deadline, measured
    /// at `now`.
    pub fn evaluate(&mut self, event: ReadEvent, now: Instant) -> Verdict {
        let at = match event {
            ReadEvent::Expired => {
                let strategy = self.strategy_for(self.waiting_on);
                debug!(kind = ?self.waiting_on, strategy = ?strategy, "wait expired, read stops");
                return Verdict::Stop(strategy.into());
            }
            ReadEvent::Data { at } => at,
        };

        if let Some(total) = self.total {
            if at.saturating_duration_since(self.started_at) >= total {
                return Verdict::Stop(self.on_total.into());
            }
        }
        if self.phase == Phase::Continuation {
            if let (Some(continuation), Some(last)) = (self.continuation, self.last_fragment_at) {
                if at.saturating_duration_since(last) >= continuation {
                    return Verdict::Stop(self.on_continuation.into());
                }
            }
        }
        if self.phase == Phase::WaitingForResponse {
            if let Some(response) = self.response {
                if at.saturating_duration_since(self.started_at) >= response {
                    return Verdict::Stop(self.on_response.into());
                }
            }
        }

        self.phase = Phase::Continuation;
        self.last_fragment_at = Some(at);

        let total_left = self
            .total
            .map(|total| total.saturating_sub(now.saturating_duration_since(self.started_at)));
        let bound = match (self.continuation, total_left) {
            (None, None) => {
                self.waiting_on = TimeoutKind::Continuation;
                None
            }
            (Some(continuation), None) => {
                self.waiting_on = TimeoutKind::Continuation;
                Some(continuation)
            }
            (None, Some(left)) => {
                self.waiting_on = TimeoutKind::Total;
                Some(left)
            }
            (Some(continuation), Some(left)) => {
                if continuation <= left {
                    self.waiting_on = TimeoutKind::Continuation;
                    Some(continuation)
                } else {
                    self.waiting_on = TimeoutKind::Total;
                    Some(left)
                }
            }
        };
        Verdict::Continue { bound }
    }

    fn strategy_for(&self, kind: TimeoutKind) -> DataStrategy {
        match kind {
            TimeoutKind::Response => self.on_response,
            TimeoutKind::Continuation => self.on_continuation,
            TimeoutKind::Total => self.on_total,
        }
    }
}
