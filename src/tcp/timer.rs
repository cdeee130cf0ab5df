/// Retransmission timer for the oldest outstanding segment.
///
/// A plain value: every transition returns the next timer, so replacing it
/// after an acknowledgment is just an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmissionTimer {
    rto_ms: u64,
    elapsed_ms: u64,
    running: bool,
}

impl RetransmissionTimer {
    /// A stopped timer with the given RTO
    pub fn new(rto_ms: u64) -> Self {
        RetransmissionTimer {
            rto_ms,
            elapsed_ms: 0,
            running: false,
        }
    }

    pub fn start(self) -> Self {
        RetransmissionTimer { running: true, ..self }
    }

    /// Advance by `ms`. A stopped timer does not accumulate time.
    pub fn tick(self, ms: u64) -> Self {
        if !self.running {
            return self;
        }
        RetransmissionTimer {
            elapsed_ms: self.elapsed_ms.saturating_add(ms),
            ..self
        }
    }

    /// Double the RTO
    pub fn backoff(self) -> Self {
        RetransmissionTimer {
            rto_ms: self.rto_ms.saturating_mul(2),
            ..self
        }
    }

    /// Start counting from zero again, keeping the current RTO
    pub fn reset(self) -> Self {
        RetransmissionTimer { elapsed_ms: 0, ..self }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_expired(&self) -> bool {
        self.running && self.elapsed_ms >= self.rto_ms
    }

    pub fn rto_ms(&self) -> u64 {
        self.rto_ms
    }
}
