use log::debug;

use crate::timing::{EventScheduler, FiredEvent, TimerHandle, ms_to_cycles};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// No timer registered.
    Idle,
    /// Exactly one timer registered.
    Armed(TimerHandle),
}

/// Delay until the next report when the last one fired `lateness` cycles
/// late. Never negative, so a very late firing reports again immediately.
#[inline]
pub const fn next_delay(period: u64, lateness: u64) -> u64 {
    period.saturating_sub(lateness)
}

/// Self-rescheduling status timer.
///
/// Holds the configured period and at most one outstanding registration.
/// Every arm cancels the previous registration first.
#[derive(Debug, Default)]
pub struct StatusScheduler {
    period_ms: Option<u8>,
    handle: Option<TimerHandle>,
}

impl StatusScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last configured period, `None` before the first status request.
    pub fn period_ms(&self) -> Option<u8> {
        self.period_ms
    }

    pub fn state(&self) -> SchedulerState {
        match self.handle {
            Some(handle) => SchedulerState::Armed(handle),
            None => SchedulerState::Idle,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }

    /// Restart the cadence with a new period, measured from now.
    ///
    /// A zero period leaves the timer idle.
    pub fn configure(&mut self, period_ms: u8, timing: &mut dyn EventScheduler) {
        self.cancel(timing);
        self.period_ms = Some(period_ms);
        if period_ms == 0 {
            debug!(target: "extra_hid", "Status period 0: periodic reports stopped");
            return;
        }
        self.handle = Some(timing.schedule_after(ms_to_cycles(period_ms as u64)));
    }

    /// Claim a fired event. Returns `false` if it is not the registration this
    /// scheduler is waiting for, in which case nothing changes.
    pub fn fire(&mut self, event: FiredEvent) -> bool {
        if self.handle != Some(event.handle) {
            return false;
        }
        self.handle = None;
        true
    }

    /// Register the next report after a firing that was `lateness` cycles
    /// late. Returns the delay used, or `None` if no period is active.
    pub fn rearm(&mut self, lateness: u64, timing: &mut dyn EventScheduler) -> Option<u64> {
        let period = self.period_ms.filter(|&p| p != 0)?;
        self.cancel(timing);
        let delay = next_delay(ms_to_cycles(period as u64), lateness);
        self.handle = Some(timing.schedule_after(delay));
        Some(delay)
    }

    /// Drop the outstanding registration, if any.
    pub fn cancel(&mut self, timing: &mut dyn EventScheduler) {
        if let Some(handle) = self.handle.take() {
            timing.cancel(handle);
        }
    }
}
