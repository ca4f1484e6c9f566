/// Non-blocking periodic timer tracked as an absolute "next due" timestamp.
///
/// Firing advances the deadline by exactly one period rather than restarting
/// from `now`, so late polls do not accumulate drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicTimer {
    next_due_ms: u64,
    period_ms: u64,
}

impl PeriodicTimer {
    /// First firing is at `first_due_ms`.
    pub fn new(first_due_ms: u64, period_ms: u64) -> Self {
        Self {
            next_due_ms: first_due_ms,
            period_ms,
        }
    }

    pub fn due(&self, now_ms: u64) -> bool {
        now_ms >= self.next_due_ms
    }

    pub fn advance(&mut self) {
        self.next_due_ms += self.period_ms;
    }

    /// `due` followed by `advance` when it fires.
    pub fn fire(&mut self, now_ms: u64) -> bool {
        if !self.due(now_ms) {
            return false;
        }
        self.advance();
        true
    }

    pub fn next_due_ms(&self) -> u64 {
        self.next_due_ms
    }
}
