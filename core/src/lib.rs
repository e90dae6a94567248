#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the bike swarm engine.
//!
//! This crate defines the vocabulary that connects the motion system, the
//! swarm controller and the host adapters. Hosts provide a [`Container`]
//! with queryable bounds, a [`RenderSink`] that owns visual handles, and a
//! [`Scheduler`] that arms frame and one-shot callbacks. The controller
//! requests callbacks through the scheduler and the host feeds their firing
//! back as [`SchedulerEvent`] values.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod config;

pub use config::{BoostOptions, ConfigPatch, SwarmConfig};

/// Extra time a faded trail lingers before the sink disposes it.
pub const TRAIL_DISPOSE_GRACE: Duration = Duration::from_millis(50);

/// Converts a millisecond quantity into a [`Duration`].
///
/// NaN and non-positive values collapse to zero; values too large to
/// represent saturate at [`Duration::MAX`].
#[must_use]
pub fn duration_from_millis(millis: f32) -> Duration {
    if millis.is_nan() || millis <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f32(millis / 1_000.0).unwrap_or(Duration::MAX)
}

/// Width and height of the area sprites move within, in container-local units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    width: f32,
    height: f32,
}

impl Bounds {
    /// Creates bounds with the provided dimensions.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Horizontal extent of the container.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Vertical extent of the container.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }
}

/// Surface hosting the swarm whose bounds may be queried at any time.
pub trait Container {
    /// Reports the current bounds of the container.
    fn bounds(&self) -> Bounds;
}

impl Container for Bounds {
    fn bounds(&self) -> Bounds {
        *self
    }
}

/// Identifier of a visual resource owned by a [`RenderSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Creates a handle identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a pending frame callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(u64);

impl FrameHandle {
    /// Creates a frame handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the frame handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a pending one-shot timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a timer handle with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the timer handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Purpose of a visual handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VisualRole {
    /// Live sprite driven by an entity every frame.
    Sprite,
    /// Fire-and-forget fading copy left behind a sprite.
    Trail,
}

/// Placement of a visual within the container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Top-left corner of the visual in container-local units.
    pub position: Vec2,
    /// Whether the glyph is mirrored horizontally.
    pub mirrored: bool,
    /// Cosmetic rotation in degrees.
    pub tilt_degrees: f32,
    /// Uniform scale applied to the glyph.
    pub scale: f32,
}

impl Transform {
    /// Creates an unrotated, unscaled transform at the provided position.
    #[must_use]
    pub const fn at(position: Vec2, mirrored: bool) -> Self {
        Self {
            position,
            mirrored,
            tilt_degrees: 0.0,
            scale: 1.0,
        }
    }

    /// Overrides the rotation of the transform.
    #[must_use]
    pub const fn with_tilt(mut self, tilt_degrees: f32) -> Self {
        self.tilt_degrees = tilt_degrees;
        self
    }

    /// Overrides the scale of the transform.
    #[must_use]
    pub const fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// Instructions for fading a visual out and releasing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FadeOut {
    /// Time taken for opacity to reach zero.
    pub linger: Duration,
    /// Time after which the visual is disposed, measured from the fade start.
    pub dispose_after: Duration,
}

impl FadeOut {
    /// Creates a fade that disposes the visual shortly after it becomes invisible.
    #[must_use]
    pub fn with_grace(linger: Duration) -> Self {
        Self {
            linger,
            dispose_after: linger.saturating_add(TRAIL_DISPOSE_GRACE),
        }
    }
}

/// Errors reported by a [`RenderSink`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The handle was disposed or never existed.
    #[error("visual handle {} is not live", .0.get())]
    MissingHandle(HandleId),
}

/// Rendering capability that owns the visuals drawn for the swarm.
pub trait RenderSink {
    /// Allocates a new visual showing the provided glyph.
    fn create_handle(&mut self, role: VisualRole, glyph: &str) -> HandleId;

    /// Reports whether the handle still refers to a live visual.
    fn is_live(&self, handle: HandleId) -> bool;

    /// Places the visual within the container.
    fn set_transform(&mut self, handle: HandleId, transform: Transform) -> Result<(), SinkError>;

    /// Sets the opacity of the visual in the range 0.0..=1.0.
    fn set_opacity(&mut self, handle: HandleId, opacity: f32) -> Result<(), SinkError>;

    /// Fades the visual out and disposes it once the fade completes.
    ///
    /// The sink completes the fade on its own; callers never hear about the
    /// visual again.
    fn fade_out(&mut self, handle: HandleId, fade: FadeOut) -> Result<(), SinkError>;

    /// Releases the visual. Disposing a missing handle is a no-op.
    fn dispose(&mut self, handle: HandleId);
}

/// Timing capability that arms frame callbacks and one-shot timers.
///
/// Cancelling a handle that already fired or was already cancelled must be
/// a no-op.
pub trait Scheduler {
    /// Requests a callback on the next frame.
    fn schedule_frame(&mut self) -> FrameHandle;

    /// Cancels a pending frame callback.
    fn cancel_frame(&mut self, handle: FrameHandle);

    /// Requests a one-shot callback after the provided delay.
    fn schedule_after(&mut self, delay: Duration) -> TimerHandle;

    /// Cancels a pending one-shot callback.
    fn cancel_after(&mut self, handle: TimerHandle);
}

/// Callback firing delivered by the host to the swarm controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerEvent {
    /// A frame callback fired.
    Frame {
        /// Handle returned when the frame was requested.
        handle: FrameHandle,
        /// Monotonic timestamp of the frame.
        timestamp: Duration,
    },
    /// A one-shot timer fired.
    Timer {
        /// Handle returned when the timer was armed.
        handle: TimerHandle,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_from_millis_handles_degenerate_values() {
        assert_eq!(duration_from_millis(-5.0), Duration::ZERO);
        assert_eq!(duration_from_millis(f32::NAN), Duration::ZERO);
        assert_eq!(duration_from_millis(f32::INFINITY), Duration::MAX);
        assert_eq!(duration_from_millis(250.0), Duration::from_millis(250));
    }

    #[test]
    fn fade_with_grace_disposes_after_linger() {
        let fade = FadeOut::with_grace(Duration::from_millis(600));
        assert_eq!(fade.linger, Duration::from_millis(600));
        assert_eq!(fade.dispose_after, Duration::from_millis(650));
    }

    #[test]
    fn bounds_act_as_a_fixed_container() {
        let bounds = Bounds::new(800.0, 600.0);
        assert_eq!(Container::bounds(&bounds), bounds);
    }

    #[test]
    fn sink_error_names_the_handle() {
        let error = SinkError::MissingHandle(HandleId::new(7));
        assert_eq!(error.to_string(), "visual handle 7 is not live");
    }
}
