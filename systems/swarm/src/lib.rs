#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Swarm controller that owns the live sprites and their timers.
//!
//! The controller spawns an initial population, keeps adding sprites at
//! random intervals until the population cap is reached, advances every
//! sprite once per throttled frame, and supports a temporary boost of the
//! spawn rate and cap. All callbacks are armed through the host-provided
//! [`Scheduler`]; the host reports their firing through [`Swarm::handle`].

use std::time::Duration;

use bike_swarm_core::{
    duration_from_millis, BoostOptions, Bounds, ConfigPatch, Container, FrameHandle, RenderSink,
    Scheduler, SchedulerEvent, SwarmConfig, TimerHandle,
};
use bike_swarm_system_motion::{math::rand_range, Bike};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Values overwritten by a boost and restored once it expires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoostBase {
    /// Lower spawn delay bound before the boost, in milliseconds.
    pub spawn_min_ms: f32,
    /// Upper spawn delay bound before the boost, in milliseconds.
    pub spawn_max_ms: f32,
    /// Population cap before the boost.
    pub max_count: usize,
}

impl BoostBase {
    fn capture(config: &SwarmConfig) -> Self {
        Self {
            spawn_min_ms: config.spawn_min_ms,
            spawn_max_ms: config.spawn_max_ms,
            max_count: config.max_count,
        }
    }

    fn restore(self, config: &mut SwarmConfig) {
        config.spawn_min_ms = self.spawn_min_ms;
        config.spawn_max_ms = self.spawn_max_ms;
        config.max_count = self.max_count;
    }
}

/// Single owner of every live sprite, the spawn scheduler and the frame loop.
#[derive(Debug)]
pub struct Swarm<C, S, T> {
    config: SwarmConfig,
    container: C,
    sink: S,
    scheduler: T,
    rng: ChaCha8Rng,
    bikes: Vec<Bike>,
    active: bool,
    last_frame: Option<Duration>,
    boost_base: Option<BoostBase>,
    boost_timer: Option<TimerHandle>,
    spawn_timer: Option<TimerHandle>,
    frame: Option<FrameHandle>,
}

impl<C, S, T> Swarm<C, S, T>
where
    C: Container,
    S: RenderSink,
    T: Scheduler,
{
    /// Creates an inactive swarm. Every random draw derives from `seed`.
    #[must_use]
    pub fn new(config: SwarmConfig, container: C, sink: S, scheduler: T, seed: u64) -> Self {
        Self {
            config,
            container,
            sink,
            scheduler,
            rng: ChaCha8Rng::seed_from_u64(seed),
            bikes: Vec::new(),
            active: false,
            last_frame: None,
            boost_base: None,
            boost_timer: None,
            spawn_timer: None,
            frame: None,
        }
    }

    /// Seeds the initial population, arms the spawn scheduler and starts the
    /// frame loop. Does nothing while already active.
    pub fn start(&mut self) {
        if self.active {
            return;
        }
        self.active = true;

        let bounds = self.container.bounds();
        for _ in 0..self.config.initial_count {
            if !self.spawn_one(bounds) {
                break;
            }
        }
        self.schedule_spawn();
        self.arm_frame();
        tracing::debug!(population = self.bikes.len(), "swarm started");
    }

    /// Halts the simulation and releases every sprite. Does nothing while
    /// already inactive.
    ///
    /// A pending boost expiry stays armed and still restores the pre-boost
    /// configuration when it fires. Trails already emitted are left to the
    /// sink.
    pub fn stop(&mut self) {
        let was_active = self.active;
        self.active = false;
        self.cancel_spawn_timer();
        if let Some(frame) = self.frame.take() {
            self.scheduler.cancel_frame(frame);
        }
        for mut bike in self.bikes.drain(..) {
            bike.dispose(&mut self.sink);
        }
        self.last_frame = None;
        if was_active {
            tracing::debug!("swarm stopped");
        }
    }

    /// Adds one sprite unless the swarm is inactive or at its population cap.
    ///
    /// Returns whether a sprite was added.
    pub fn spawn_one(&mut self, bounds: Bounds) -> bool {
        if !self.active || self.bikes.len() >= self.config.max_count {
            return false;
        }
        let bike = Bike::spawn(&self.config, bounds, &mut self.rng, &mut self.sink);
        self.bikes.push(bike);
        true
    }

    /// Arms the next scheduled spawn after a random delay within the
    /// configured spawn interval, replacing any pending one.
    pub fn schedule_spawn(&mut self) {
        if !self.active {
            return;
        }
        self.cancel_spawn_timer();
        let delay_ms = rand_range(
            &mut self.rng,
            self.config.spawn_min_ms,
            self.config.spawn_max_ms,
        );
        let delay = duration_from_millis(delay_ms);
        self.spawn_timer = Some(self.scheduler.schedule_after(delay));
    }

    /// Reacts to a callback fired by the scheduler.
    ///
    /// Callbacks that no longer match an armed handle are ignored.
    pub fn handle(&mut self, event: SchedulerEvent) {
        match event {
            SchedulerEvent::Frame { handle, timestamp } => {
                if self.frame != Some(handle) {
                    tracing::trace!(handle = handle.get(), "ignoring stale frame");
                    return;
                }
                self.frame = None;
                self.on_frame(timestamp);
            }
            SchedulerEvent::Timer { handle } => {
                if self.spawn_timer == Some(handle) {
                    self.spawn_timer = None;
                    self.on_spawn_timer();
                } else if self.boost_timer == Some(handle) {
                    self.boost_timer = None;
                    self.expire_boost();
                } else {
                    tracing::trace!(handle = handle.get(), "ignoring stale timer");
                }
            }
        }
    }

    /// Temporarily raises the spawn rate and population cap.
    ///
    /// The first boost snapshots the spawn interval and cap; later boosts
    /// issued before expiry reuse that snapshot and only push the expiry
    /// back. Does nothing while inactive.
    pub fn boost(&mut self, options: BoostOptions) {
        if !self.active {
            return;
        }
        let base = *self
            .boost_base
            .get_or_insert_with(|| BoostBase::capture(&self.config));
        self.config.spawn_min_ms = options.spawn_min_ms;
        self.config.spawn_max_ms = options.spawn_max_ms;
        self.config.max_count = base.max_count.saturating_add(options.max_count_increment);

        let bounds = self.container.bounds();
        let mut spawned = 0;
        for _ in 0..options.extra_bikes {
            if !self.spawn_one(bounds) {
                break;
            }
            spawned += 1;
        }

        self.schedule_spawn();
        if let Some(timer) = self.boost_timer.take() {
            self.scheduler.cancel_after(timer);
        }
        self.boost_timer = Some(self.scheduler.schedule_after(options.duration()));
        tracing::debug!(
            spawned,
            max_count = self.config.max_count,
            spawn_min_ms = self.config.spawn_min_ms,
            spawn_max_ms = self.config.spawn_max_ms,
            "boost applied"
        );
    }

    /// Merges `patch` into the live configuration.
    ///
    /// A new positive base speed rescales every sprite's velocity by the
    /// ratio to the previous one. Changing either spawn interval bound
    /// re-arms the spawn scheduler immediately.
    pub fn apply_options(&mut self, patch: ConfigPatch) {
        let previous_speed = self.config.base_speed;
        let reschedule = patch.touches_spawn_interval();
        patch.merge_into(&mut self.config);

        let speed = self.config.base_speed;
        if speed > 0.0 && previous_speed > 0.0 && speed != previous_speed {
            let factor = speed / previous_speed;
            for bike in &mut self.bikes {
                bike.scale_velocity(factor);
            }
            tracing::debug!(factor, "rescaled sprite velocities");
        }
        if reschedule {
            self.schedule_spawn();
        }
        tracing::debug!(reschedule, "options applied");
    }

    /// Live configuration.
    #[must_use]
    pub const fn config(&self) -> &SwarmConfig {
        &self.config
    }

    /// Sprites currently alive, in no particular order.
    #[must_use]
    pub fn bikes(&self) -> &[Bike] {
        &self.bikes
    }

    /// Number of live sprites.
    #[must_use]
    pub fn population(&self) -> usize {
        self.bikes.len()
    }

    /// Whether the swarm is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Snapshot restored when the current boost expires, if one is in effect.
    #[must_use]
    pub const fn boost_base(&self) -> Option<BoostBase> {
        self.boost_base
    }

    /// Pending spawn timer, if armed.
    #[must_use]
    pub const fn spawn_timer(&self) -> Option<TimerHandle> {
        self.spawn_timer
    }

    /// Pending boost expiry timer, if armed.
    #[must_use]
    pub const fn boost_timer(&self) -> Option<TimerHandle> {
        self.boost_timer
    }

    /// Pending frame callback, if armed.
    #[must_use]
    pub const fn frame(&self) -> Option<FrameHandle> {
        self.frame
    }

    /// Container the swarm moves within.
    #[must_use]
    pub const fn container(&self) -> &C {
        &self.container
    }

    /// Mutable access to the container, e.g. to resize it.
    pub fn container_mut(&mut self) -> &mut C {
        &mut self.container
    }

    /// Render sink holding the swarm's visuals.
    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the render sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Scheduler arming the swarm's callbacks.
    #[must_use]
    pub const fn scheduler(&self) -> &T {
        &self.scheduler
    }

    /// Mutable access to the scheduler, used by hosts to pull due callbacks.
    pub fn scheduler_mut(&mut self) -> &mut T {
        &mut self.scheduler
    }

    fn on_spawn_timer(&mut self) {
        if !self.active {
            return;
        }
        let bounds = self.container.bounds();
        if self.spawn_one(bounds) {
            tracing::trace!(population = self.bikes.len(), "scheduled spawn");
        }
        self.schedule_spawn();
    }

    fn on_frame(&mut self, timestamp: Duration) {
        if !self.active {
            return;
        }
        let last = *self.last_frame.get_or_insert(timestamp);
        let elapsed = timestamp.saturating_sub(last);
        if elapsed < self.config.frame_interval() {
            self.arm_frame();
            return;
        }
        self.last_frame = Some(timestamp);

        let bounds = self.container.bounds();
        let dt_seconds = elapsed.as_secs_f32();
        let Self {
            config,
            sink,
            rng,
            bikes,
            ..
        } = self;
        let before = bikes.len();
        bikes.retain_mut(|bike| bike.advance(config, bounds, timestamp, dt_seconds, rng, sink));
        let removed = before - bikes.len();
        if removed > 0 {
            tracing::trace!(removed, "sprites removed");
        }
        self.arm_frame();
    }

    fn expire_boost(&mut self) {
        if let Some(base) = self.boost_base.take() {
            base.restore(&mut self.config);
            tracing::debug!(max_count = base.max_count, "boost expired");
        }
    }

    fn arm_frame(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.scheduler.cancel_frame(frame);
        }
        self.frame = Some(self.scheduler.schedule_frame());
    }

    fn cancel_spawn_timer(&mut self) {
        if let Some(timer) = self.spawn_timer.take() {
            self.scheduler.cancel_after(timer);
        }
    }
}
