use std::time::Instant;

/// Wall-clock anchor for one streaming session.
///
/// The clock only exists once started, so elapsed queries are always defined.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    started_at: Instant,
}

impl SessionClock {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(started_at: Instant) -> Self {
        Self { started_at }
    }

    pub fn origin(&self) -> Instant {
        self.started_at
    }

    /// Milliseconds between the session start and `now`; instants before the
    /// start saturate to zero.
    pub fn elapsed_ms(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started_at).as_secs_f64() * 1_000.0
    }
}
