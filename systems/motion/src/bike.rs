//! Moving sprite entity.

use std::{f32::consts::TAU, time::Duration};

use bike_swarm_core::{
    Bounds, FadeOut, HandleId, RenderSink, SinkError, SwarmConfig, Transform, VisualRole,
};
use glam::Vec2;
use rand::Rng;

use crate::math::{pick, rand_range, rotate, with_length};

/// Range the speed multiplier is drawn from before clamping.
pub const SPAWN_MULTIPLIER_RANGE: (f32, f32) = (0.85, 1.3);

/// Smallest time step integrated, in seconds.
pub const MIN_STEP_SECONDS: f32 = 0.001;

/// One animated sprite with its kinematic state and visual handle.
#[derive(Debug)]
pub struct Bike {
    position: Vec2,
    velocity: Vec2,
    speed_multiplier: f32,
    mirrored: bool,
    last_trail: Option<Duration>,
    glyph: String,
    handle: Option<HandleId>,
}

impl Bike {
    /// Creates a sprite inside `bounds` and attaches its visual to the sink.
    ///
    /// In fall mode the sprite starts just above the top edge heading down;
    /// otherwise it starts anywhere inside the bounds with a random heading.
    pub fn spawn<R, S>(config: &SwarmConfig, bounds: Bounds, rng: &mut R, sink: &mut S) -> Self
    where
        R: Rng + ?Sized,
        S: RenderSink + ?Sized,
    {
        let (low, high) = SPAWN_MULTIPLIER_RANGE;
        let speed_multiplier = config.clamp_speed_multiplier(rand_range(rng, low, high));
        let speed = config.target_speed(speed_multiplier);
        let span_x = (bounds.width() - config.size).max(0.0);

        let (position, velocity) = if config.fall_enabled {
            let position = Vec2::new(rand_range(rng, 0.0, span_x), -config.size);
            let drift = rand_range(rng, -config.drift_x_max, config.drift_x_max);
            (position, Vec2::new(drift, speed))
        } else {
            let span_y = (bounds.height() - config.size).max(0.0);
            let position = Vec2::new(rand_range(rng, 0.0, span_x), rand_range(rng, 0.0, span_y));
            let heading = rand_range(rng, 0.0, TAU);
            (position, Vec2::from_angle(heading) * speed)
        };

        let glyph = pick(rng, &config.glyphs).cloned().unwrap_or_default();
        let mirrored = velocity.x < 0.0;
        let handle = sink.create_handle(VisualRole::Sprite, &glyph);
        let mut bike = Self {
            position,
            velocity,
            speed_multiplier,
            mirrored,
            last_trail: None,
            glyph,
            handle: Some(handle),
        };
        if bike.sync_visual(sink, 0.0).is_err() {
            bike.dispose(sink);
        }
        tracing::trace!(handle = handle.get(), x = position.x, y = position.y, "bike spawned");
        bike
    }

    /// Advances the sprite by `dt_seconds` and pushes its new transform.
    ///
    /// Returns `false` once the sprite should be removed, in which case its
    /// visual has already been released.
    pub fn advance<R, S>(
        &mut self,
        config: &SwarmConfig,
        bounds: Bounds,
        now: Duration,
        dt_seconds: f32,
        rng: &mut R,
        sink: &mut S,
    ) -> bool
    where
        R: Rng + ?Sized,
        S: RenderSink + ?Sized,
    {
        let Some(handle) = self.handle else {
            return false;
        };
        if !sink.is_live(handle) {
            self.handle = None;
            return false;
        }

        if !config.fall_enabled {
            self.apply_jitter(config, rng);
        }
        self.integrate(config, dt_seconds);

        if config.fall_enabled {
            if config.remove_offscreen && self.position.y >= bounds.height() + config.size {
                tracing::trace!(handle = handle.get(), "bike left the bottom edge");
                self.dispose(sink);
                return false;
            }
            self.resolve_side_edges(config, bounds);
        } else {
            self.resolve_all_edges(config, bounds);
        }

        self.mirrored = self.velocity.x < 0.0;
        let tilt = self.velocity.y.atan2(self.velocity.x).to_degrees() * config.tilt_factor;
        if self.sync_visual(sink, tilt).is_err() {
            self.handle = None;
            return false;
        }

        if config.trail_enabled {
            self.emit_trail(config, now, sink);
        }
        true
    }

    /// Releases the visual handle. Calling it again is a no-op.
    pub fn dispose<S: RenderSink + ?Sized>(&mut self, sink: &mut S) {
        if let Some(handle) = self.handle.take() {
            sink.dispose(handle);
        }
    }

    /// Multiplies the current velocity by `factor`.
    pub fn scale_velocity(&mut self, factor: f32) {
        self.velocity *= factor;
    }

    /// Top-left corner of the sprite in container-local units.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Velocity in units per second.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Per-sprite speed multiplier.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Whether the glyph is drawn mirrored, which tracks a leftward heading.
    #[must_use]
    pub const fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    /// Timestamp of the most recent trail emission.
    #[must_use]
    pub const fn last_trail(&self) -> Option<Duration> {
        self.last_trail
    }

    /// Glyph the sprite is drawn with.
    #[must_use]
    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    /// Visual handle, or `None` once released.
    #[must_use]
    pub const fn handle(&self) -> Option<HandleId> {
        self.handle
    }

    fn apply_jitter<R: Rng + ?Sized>(&mut self, config: &SwarmConfig, rng: &mut R) {
        if rng.gen::<f32>() < config.jitter_chance {
            let theta = rand_range(rng, -config.jitter_max_angle, config.jitter_max_angle);
            let rotated = rotate(self.velocity, theta);
            self.velocity = with_length(rotated, config.target_speed(self.speed_multiplier));
        }

        if rng.gen::<f32>() < config.speed_jitter_chance {
            let factor =
                1.0 + rand_range(rng, -config.speed_jitter_range, config.speed_jitter_range);
            self.speed_multiplier = config.clamp_speed_multiplier(self.speed_multiplier * factor);
            self.velocity = with_length(self.velocity, config.target_speed(self.speed_multiplier));
        }
    }

    fn integrate(&mut self, config: &SwarmConfig, dt_seconds: f32) {
        // NaN also falls back to the floor.
        let dt = if dt_seconds > MIN_STEP_SECONDS {
            dt_seconds
        } else {
            MIN_STEP_SECONDS
        };
        if config.fall_enabled {
            self.velocity.y += config.gravity * dt;
        }
        self.position += self.velocity * dt;
    }

    fn resolve_all_edges(&mut self, config: &SwarmConfig, bounds: Bounds) {
        let far = Vec2::new(bounds.width(), bounds.height()) - config.size;

        if self.position.x <= 0.0 {
            self.position.x = 0.0;
            self.velocity.x = -self.velocity.x;
        } else if self.position.x >= far.x {
            self.position.x = far.x;
            self.velocity.x = -self.velocity.x;
        }

        if self.position.y <= 0.0 {
            self.position.y = 0.0;
            self.velocity.y = -self.velocity.y;
        } else if self.position.y >= far.y {
            self.position.y = far.y;
            self.velocity.y = -self.velocity.y;
        }
    }

    fn resolve_side_edges(&mut self, config: &SwarmConfig, bounds: Bounds) {
        let far_x = bounds.width() - config.size;
        if self.position.x <= 0.0 {
            self.position.x = 0.0;
            self.velocity.x = self.velocity.x.abs();
        } else if self.position.x >= far_x {
            self.position.x = far_x;
            self.velocity.x = -self.velocity.x.abs();
        }
    }

    fn sync_visual<S: RenderSink + ?Sized>(
        &self,
        sink: &mut S,
        tilt_degrees: f32,
    ) -> Result<(), SinkError> {
        let Some(handle) = self.handle else {
            return Ok(());
        };
        let transform = Transform::at(self.position, self.mirrored).with_tilt(tilt_degrees);
        sink.set_transform(handle, transform)
    }

    fn emit_trail<S: RenderSink + ?Sized>(
        &mut self,
        config: &SwarmConfig,
        now: Duration,
        sink: &mut S,
    ) {
        let due = match self.last_trail {
            Some(last) => now.saturating_sub(last) >= config.trail_interval(),
            None => true,
        };
        if !due {
            return;
        }
        self.last_trail = Some(now);

        let trail = sink.create_handle(VisualRole::Trail, &self.glyph);
        let transform =
            Transform::at(self.position, self.mirrored).with_scale(config.trail_size_scale);
        let placed = sink
            .set_transform(trail, transform)
            .and_then(|()| sink.set_opacity(trail, config.trail_opacity))
            .and_then(|()| sink.fade_out(trail, FadeOut::with_grace(config.trail_linger())));
        if let Err(error) = placed {
            tracing::trace!(%error, "dropping trail");
            sink.dispose(trail);
        }
    }
}
