use tracing::debug;

/// What a single tick did to the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    /// One second elapsed; carries the new remaining time
    Tick(u32),
    /// Remaining time reached zero. Fired exactly once per arming.
    Expired,
}

/// Whole-second countdown driven by an external one-second cadence.
///
/// The timer owns only the remaining-time value and an armed flag; the
/// cadence itself comes from `runtime::Runner`. Ticks delivered while the
/// timer is disarmed are dropped, which is what guarantees that nothing fires
/// after `disarm` returns.
#[derive(Debug, Clone, Default)]
pub struct CountdownTimer {
    remaining: u32,
    armed: bool,
}

impl CountdownTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, initial_seconds: u32) {
        self.remaining = initial_seconds;
        self.armed = true;
        debug!(initial_seconds, "countdown armed");
    }

    /// Stop the countdown. Safe to call repeatedly.
    pub fn disarm(&mut self) {
        if self.armed {
            debug!(remaining = self.remaining, "countdown disarmed");
        }
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining
    }

    /// Advance by one second. Returns `None` when disarmed.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if !self.armed {
            return None;
        }

        if self.remaining <= 1 {
            self.remaining = 0;
            self.armed = false;
            debug!("countdown expired");
            return Some(TimerEvent::Expired);
        }

        self.remaining -= 1;
        Some(TimerEvent::Tick(self.remaining))
    }
}
