use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// ARM11 base clock of the host system in Hz. Scheduler time units are cycles
/// of this clock.
pub const BASE_CLOCK_RATE_ARM11: u64 = 268_111_856;

/// Convert milliseconds to scheduler cycles, saturating at `u64::MAX`.
pub const fn ms_to_cycles(ms: u64) -> u64 {
    let cycles = BASE_CLOCK_RATE_ARM11 as u128 * ms as u128 / 1000;
    if cycles > u64::MAX as u128 {
        u64::MAX
    } else {
        cycles as u64
    }
}

/// Opaque reference to one timer registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// A timer that reached its deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FiredEvent {
    pub handle: TimerHandle,
    /// Cycles between the intended deadline and the time the event was
    /// delivered.
    pub lateness: u64,
}

/// The scheduling facility a device arms its timers on.
pub trait EventScheduler: Send {
    /// Register a one-shot timer `delay` cycles from now.
    fn schedule_after(&mut self, delay: u64) -> TimerHandle;

    /// Cancel a pending timer. Unknown or already fired handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Default)]
struct TimingState {
    now: u64,
    next_id: u64,
    // (deadline, id): ids grow monotonically, so equal deadlines fire in
    // registration order.
    queue: BinaryHeap<Reverse<(u64, u64)>>,
    pending: HashSet<u64>,
}

/// Shared cycle-counting event queue.
///
/// Cloning yields another handle to the same clock, so the host loop and the
/// devices scheduling on it can each hold one. Time only moves through
/// [`CoreTiming::add_ticks`]; due events are then drained with
/// [`CoreTiming::pop_due`].
#[derive(Clone, Default)]
pub struct CoreTiming {
    inner: Arc<Mutex<TimingState>>,
}

impl CoreTiming {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, TimingState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current time in cycles.
    pub fn now(&self) -> u64 {
        self.state().now
    }

    pub fn add_ticks(&self, ticks: u64) {
        let mut state = self.state();
        state.now = state.now.saturating_add(ticks);
    }

    /// Pop the earliest event whose deadline has passed.
    ///
    /// The lock is released before returning, so the caller may dispatch the
    /// event into code that schedules again on this clock.
    pub fn pop_due(&self) -> Option<FiredEvent> {
        let mut state = self.state();
        while let Some(&Reverse((deadline, id))) = state.queue.peek() {
            if deadline > state.now {
                return None;
            }
            state.queue.pop();
            if state.pending.remove(&id) {
                return Some(FiredEvent {
                    handle: TimerHandle(id),
                    lateness: state.now - deadline,
                });
            }
        }
        None
    }

    /// Deadline of the earliest live event, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        let state = self.state();
        state
            .queue
            .iter()
            .filter(|Reverse((_, id))| state.pending.contains(id))
            .map(|Reverse((deadline, _))| *deadline)
            .min()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.state().pending.contains(&handle.0)
    }

    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }
}

impl EventScheduler for CoreTiming {
    fn schedule_after(&mut self, delay: u64) -> TimerHandle {
        let mut state = self.state();
        let id = state.next_id;
        state.next_id += 1;
        let deadline = state.now.saturating_add(delay);
        state.queue.push(Reverse((deadline, id)));
        state.pending.insert(id);
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        // The heap entry is skipped lazily in `pop_due`.
        self.state().pending.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreTiming, EventScheduler, ms_to_cycles};

    #[test]
    fn ms_to_cycles_uses_arm11_clock() {
        assert_eq!(ms_to_cycles(0), 0);
        assert_eq!(ms_to_cycles(1000), 268_111_856);
        assert_eq!(ms_to_cycles(8), 2_144_894);
    }

    #[test]
    fn ms_to_cycles_does_not_overflow() {
        assert_eq!(ms_to_cycles(100_000_000_000), 26_811_185_600_000_000);
        assert_eq!(ms_to_cycles(u64::MAX), u64::MAX);
    }

    #[test]
    fn event_fires_once_deadline_passes() {
        let mut timing = CoreTiming::new();
        let handle = timing.schedule_after(100);

        timing.add_ticks(99);
        assert_eq!(timing.pop_due(), None);

        timing.add_ticks(1);
        let fired = timing.pop_due().expect("event due");
        assert_eq!(fired.handle, handle);
        assert_eq!(fired.lateness, 0);
        assert_eq!(timing.pop_due(), None);
        assert_eq!(timing.pending_count(), 0);
    }

    #[test]
    fn lateness_reports_overshoot() {
        let mut timing = CoreTiming::new();
        timing.schedule_after(100);
        timing.add_ticks(130);
        assert_eq!(timing.pop_due().map(|e| e.lateness), Some(30));
    }

    #[test]
    fn cancelled_event_never_fires() {
        let mut timing = CoreTiming::new();
        let handle = timing.schedule_after(10);
        timing.cancel(handle);
        // Cancelling twice is harmless.
        timing.cancel(handle);

        timing.add_ticks(1000);
        assert_eq!(timing.pop_due(), None);
        assert!(!timing.is_pending(handle));
    }

    #[test]
    fn equal_deadlines_fire_in_registration_order() {
        let mut timing = CoreTiming::new();
        let a = timing.schedule_after(5);
        let b = timing.schedule_after(5);
        let c = timing.schedule_after(1);
        timing.add_ticks(5);

        assert_eq!(timing.pop_due().map(|e| e.handle), Some(c));
        assert_eq!(timing.pop_due().map(|e| e.handle), Some(a));
        assert_eq!(timing.pop_due().map(|e| e.handle), Some(b));
    }

    #[test]
    fn zero_delay_is_due_immediately() {
        let mut timing = CoreTiming::new();
        timing.add_ticks(42);
        let handle = timing.schedule_after(0);
        let fired = timing.pop_due().expect("event due");
        assert_eq!(fired.handle, handle);
        assert_eq!(fired.lateness, 0);
    }

    #[test]
    fn next_deadline_skips_cancelled_entries() {
        let mut timing = CoreTiming::new();
        let early = timing.schedule_after(10);
        timing.schedule_after(20);
        assert_eq!(timing.next_deadline(), Some(10));

        timing.cancel(early);
        assert_eq!(timing.next_deadline(), Some(20));
    }

    #[test]
    fn clones_share_one_clock() {
        let timing = CoreTiming::new();
        let mut other = timing.clone();
        other.schedule_after(3);
        timing.add_ticks(3);
        assert!(other.pop_due().is_some());
        assert_eq!(other.now(), 3);
    }
}
