#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! In-memory rendering backend for the bike swarm.
//!
//! [`SceneSink`] implements [`RenderSink`] by keeping every live visual in a
//! map. It carries its own clock: hosts call [`SceneSink::advance_to`] once
//! per frame so that trails fade and are released without any help from the
//! swarm controller.

use std::{collections::BTreeMap, time::Duration};

use bike_swarm_core::{FadeOut, HandleId, RenderSink, SinkError, Transform, VisualRole};

mod ascii;

pub use ascii::render_ascii;

/// Snapshot of a single visual held by the sink.
#[derive(Clone, Debug, PartialEq)]
pub struct Visual {
    role: VisualRole,
    glyph: String,
    transform: Option<Transform>,
    opacity: f32,
    fade: Option<ActiveFade>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct ActiveFade {
    from: f32,
    started: Duration,
    fade: FadeOut,
}

impl Visual {
    fn new(role: VisualRole, glyph: &str) -> Self {
        Self {
            role,
            glyph: glyph.to_owned(),
            transform: None,
            opacity: 1.0,
            fade: None,
        }
    }

    /// Purpose the visual was created for.
    #[must_use]
    pub const fn role(&self) -> VisualRole {
        self.role
    }

    /// Glyph shown by the visual.
    #[must_use]
    pub fn glyph(&self) -> &str {
        &self.glyph
    }

    /// Most recent transform, or `None` if the visual was never placed.
    #[must_use]
    pub const fn transform(&self) -> Option<Transform> {
        self.transform
    }

    /// Current opacity in the range 0.0..=1.0.
    #[must_use]
    pub const fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Whether the visual is fading out towards disposal.
    #[must_use]
    pub const fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Updates opacity for the provided time and reports whether the visual expired.
    fn step_fade(&mut self, now: Duration) -> bool {
        let Some(active) = self.fade else {
            return false;
        };
        let elapsed = now.saturating_sub(active.started);
        if elapsed >= active.fade.dispose_after {
            return true;
        }
        let progress = if active.fade.linger.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f32() / active.fade.linger.as_secs_f32()).min(1.0)
        };
        self.opacity = active.from * (1.0 - progress);
        false
    }
}

/// Render sink that stores visuals in memory.
#[derive(Debug, Default)]
pub struct SceneSink {
    now: Duration,
    next_handle: u64,
    visuals: BTreeMap<HandleId, Visual>,
}

impl SceneSink {
    /// Creates an empty sink whose clock starts at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current time of the sink's clock.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Moves the clock forward, progressing fades and releasing expired trails.
    ///
    /// Times earlier than the current clock are ignored.
    pub fn advance_to(&mut self, now: Duration) {
        if now < self.now {
            return;
        }
        self.now = now;

        let before = self.visuals.len();
        self.visuals.retain(|_, visual| !visual.step_fade(now));
        let released = before - self.visuals.len();
        if released > 0 {
            tracing::trace!(released, "faded visuals released");
        }
    }

    /// Looks up a live visual.
    #[must_use]
    pub fn visual(&self, handle: HandleId) -> Option<&Visual> {
        self.visuals.get(&handle)
    }

    /// Iterates over live visuals in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (HandleId, &Visual)> + '_ {
        self.visuals.iter().map(|(handle, visual)| (*handle, visual))
    }

    /// Number of live visuals with the provided role.
    #[must_use]
    pub fn count(&self, role: VisualRole) -> usize {
        self.visuals
            .values()
            .filter(|visual| visual.role == role)
            .count()
    }

    /// Total number of live visuals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    /// Returns `true` when no visual is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }

    fn visual_mut(&mut self, handle: HandleId) -> Result<&mut Visual, SinkError> {
        self.visuals
            .get_mut(&handle)
            .ok_or(SinkError::MissingHandle(handle))
    }
}

impl RenderSink for SceneSink {
    fn create_handle(&mut self, role: VisualRole, glyph: &str) -> HandleId {
        let handle = HandleId::new(self.next_handle);
        self.next_handle += 1;
        let _ = self.visuals.insert(handle, Visual::new(role, glyph));
        handle
    }

    fn is_live(&self, handle: HandleId) -> bool {
        self.visuals.contains_key(&handle)
    }

    fn set_transform(&mut self, handle: HandleId, transform: Transform) -> Result<(), SinkError> {
        self.visual_mut(handle)?.transform = Some(transform);
        Ok(())
    }

    fn set_opacity(&mut self, handle: HandleId, opacity: f32) -> Result<(), SinkError> {
        let visual = self.visual_mut(handle)?;
        visual.opacity = opacity;
        visual.fade = None;
        Ok(())
    }

    fn fade_out(&mut self, handle: HandleId, fade: FadeOut) -> Result<(), SinkError> {
        let started = self.now;
        let visual = self.visual_mut(handle)?;
        visual.fade = Some(ActiveFade {
            from: visual.opacity,
            started,
            fade,
        });
        Ok(())
    }

    fn dispose(&mut self, handle: HandleId) {
        let _ = self.visuals.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn operations_on_missing_handles_fail_without_panicking() {
        let mut sink = SceneSink::new();
        let handle = sink.create_handle(VisualRole::Sprite, "b");
        sink.dispose(handle);
        sink.dispose(handle);

        assert_eq!(
            sink.set_transform(handle, Transform::at(Vec2::ZERO, false)),
            Err(SinkError::MissingHandle(handle))
        );
        assert_eq!(
            sink.set_opacity(handle, 0.5),
            Err(SinkError::MissingHandle(handle))
        );
        assert!(!sink.is_live(handle));
    }

    #[test]
    fn handles_are_never_reused() {
        let mut sink = SceneSink::new();
        let first = sink.create_handle(VisualRole::Sprite, "a");
        sink.dispose(first);
        let second = sink.create_handle(VisualRole::Sprite, "b");
        assert_ne!(first, second);
    }

    #[test]
    fn fade_interpolates_linearly_then_releases_after_grace() {
        let mut sink = SceneSink::new();
        sink.advance_to(Duration::from_millis(1_000));
        let trail = sink.create_handle(VisualRole::Trail, "t");
        sink.set_opacity(trail, 0.4).expect("trail is live");
        sink.fade_out(trail, FadeOut::with_grace(Duration::from_millis(600)))
            .expect("trail is live");

        sink.advance_to(Duration::from_millis(1_300));
        let opacity = sink.visual(trail).expect("mid-fade trail").opacity();
        assert!((opacity - 0.2).abs() < 1e-5, "unexpected opacity {opacity}");

        sink.advance_to(Duration::from_millis(1_620));
        let faded = sink.visual(trail).expect("trail lingers during grace");
        assert_eq!(faded.opacity(), 0.0);

        sink.advance_to(Duration::from_millis(1_650));
        assert!(!sink.is_live(trail));
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut sink = SceneSink::new();
        sink.advance_to(Duration::from_secs(2));
        sink.advance_to(Duration::from_secs(1));
        assert_eq!(sink.now(), Duration::from_secs(2));
    }

    #[test]
    fn count_filters_by_role() {
        let mut sink = SceneSink::new();
        let _ = sink.create_handle(VisualRole::Sprite, "a");
        let _ = sink.create_handle(VisualRole::Trail, "a");
        let _ = sink.create_handle(VisualRole::Trail, "a");

        assert_eq!(sink.count(VisualRole::Sprite), 1);
        assert_eq!(sink.count(VisualRole::Trail), 2);
        assert_eq!(sink.len(), 3);
    }
}
