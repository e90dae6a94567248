#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic virtual-time scheduler.
//!
//! [`VirtualScheduler`] implements the [`Scheduler`] capability without any
//! real clock. Frame requests fire on the next display refresh boundary and
//! one-shot timers fire once their delay elapsed. Hosts pull due callbacks
//! with [`VirtualScheduler::next_event`] and forward them to the swarm.

use std::{collections::BTreeMap, time::Duration};

use bike_swarm_core::{FrameHandle, Scheduler, SchedulerEvent, TimerHandle};

/// Refresh rate used when none is provided.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pending {
    Frame(FrameHandle),
    Timer(TimerHandle),
}

/// Scheduler driven by explicit calls rather than wall-clock time.
#[derive(Debug)]
pub struct VirtualScheduler {
    now: Duration,
    frame_period: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, u64), Pending>,
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::with_refresh_rate(DEFAULT_REFRESH_HZ)
    }
}

impl VirtualScheduler {
    /// Creates a scheduler whose frames fire every `frame_period`.
    ///
    /// A zero period fires frames immediately at the current time.
    #[must_use]
    pub fn new(frame_period: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            frame_period,
            next_id: 0,
            queue: BTreeMap::new(),
        }
    }

    /// Creates a scheduler emulating a display refreshing `hz` times per second.
    #[must_use]
    pub fn with_refresh_rate(hz: u32) -> Self {
        let period = if hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / hz
        };
        Self::new(period)
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Interval between two display refreshes.
    #[must_use]
    pub const fn frame_period(&self) -> Duration {
        self.frame_period
    }

    /// Number of frame callbacks waiting to fire.
    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.queue
            .values()
            .filter(|pending| matches!(pending, Pending::Frame(_)))
            .count()
    }

    /// Number of one-shot timers waiting to fire.
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.queue
            .values()
            .filter(|pending| matches!(pending, Pending::Timer(_)))
            .count()
    }

    /// Time at which the earliest pending callback fires.
    #[must_use]
    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Pops the earliest callback due at or before `deadline`.
    ///
    /// The clock jumps to the callback's due time. When nothing is due the
    /// clock moves to `deadline` and `None` is returned. Callbacks due at the
    /// same time fire in the order they were armed.
    pub fn next_event(&mut self, deadline: Duration) -> Option<SchedulerEvent> {
        let due = self.next_due().filter(|due| *due <= deadline);
        let Some(due) = due else {
            self.now = self.now.max(deadline);
            return None;
        };
        let (_, pending) = self.queue.pop_first()?;
        self.now = self.now.max(due);
        Some(match pending {
            Pending::Frame(handle) => SchedulerEvent::Frame {
                handle,
                timestamp: self.now,
            },
            Pending::Timer(handle) => SchedulerEvent::Timer { handle },
        })
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn next_refresh(&self) -> Duration {
        let period = self.frame_period.as_nanos();
        if period == 0 {
            return self.now;
        }
        let ticks = self.now.as_nanos() / period + 1;
        let nanos = ticks.saturating_mul(period);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn cancel(&mut self, target: Pending) {
        self.queue.retain(|_, pending| *pending != target);
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_frame(&mut self) -> FrameHandle {
        let id = self.allocate();
        let handle = FrameHandle::new(id);
        let _ = self
            .queue
            .insert((self.next_refresh(), id), Pending::Frame(handle));
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.cancel(Pending::Frame(handle));
    }

    fn schedule_after(&mut self, delay: Duration) -> TimerHandle {
        let id = self.allocate();
        let handle = TimerHandle::new(id);
        let due = self.now.saturating_add(delay);
        let _ = self.queue.insert((due, id), Pending::Timer(handle));
        handle
    }

    fn cancel_after(&mut self, handle: TimerHandle) {
        self.cancel(Pending::Timer(handle));
    }
}
