//! Live configuration surface of the swarm.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration_from_millis;

/// Tuning knobs controlling population, motion, trails and fall mode.
///
/// Values are not validated. Inverted or negative bounds produce degenerate
/// but non-panicking motion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwarmConfig {
    /// Number of sprites spawned immediately when the swarm starts.
    pub initial_count: usize,
    /// Population cap; spawns are skipped while the swarm is at or above it.
    pub max_count: usize,
    /// Lower bound of the random delay between scheduled spawns, in milliseconds.
    pub spawn_min_ms: f32,
    /// Upper bound of the random delay between scheduled spawns, in milliseconds.
    pub spawn_max_ms: f32,
    /// Distance travelled per reference tick at a speed multiplier of one.
    pub base_speed: f32,
    /// Frame rate at which `base_speed` is calibrated.
    pub reference_fps: f32,
    /// Glyphs a sprite picks its appearance from.
    pub glyphs: Vec<String>,
    /// Sprite bounding size, used as the margin for edge resolution.
    pub size: f32,
    /// Per-frame probability of a random change of heading.
    pub jitter_chance: f32,
    /// Largest heading change applied by a jitter event, in radians.
    pub jitter_max_angle: f32,
    /// Frame rate the loop throttles itself to.
    pub target_fps: f32,
    /// Per-frame probability of a random change of speed.
    pub speed_jitter_chance: f32,
    /// Largest relative speed change applied by a speed jitter event.
    pub speed_jitter_range: f32,
    /// Smallest allowed speed multiplier.
    pub speed_min_mul: f32,
    /// Largest allowed speed multiplier.
    pub speed_max_mul: f32,
    /// Fraction of the heading angle applied as cosmetic tilt.
    pub tilt_factor: f32,
    /// Whether sprites leave fading trails.
    pub trail_enabled: bool,
    /// Minimum time between two trails of the same sprite, in milliseconds.
    pub trail_interval_ms: f32,
    /// Time a trail takes to fade out, in milliseconds.
    pub trail_linger_ms: f32,
    /// Opacity a trail starts fading from.
    pub trail_opacity: f32,
    /// Scale of a trail relative to its sprite.
    pub trail_size_scale: f32,
    /// Whether sprites fall from the top edge instead of bouncing around.
    pub fall_enabled: bool,
    /// Downward acceleration in fall mode, in units per second squared.
    pub gravity: f32,
    /// Largest horizontal drift of a falling sprite, in units per second.
    pub drift_x_max: f32,
    /// Whether falling sprites are removed once they leave the bottom edge.
    pub remove_offscreen: bool,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            initial_count: 12,
            max_count: 20,
            spawn_min_ms: 400.0,
            spawn_max_ms: 1_600.0,
            base_speed: 8.0,
            reference_fps: 60.0,
            glyphs: vec![
                "\u{1f6b4}\u{200d}\u{2642}\u{fe0f}".to_owned(),
                "\u{1f6b4}\u{200d}\u{2640}\u{fe0f}".to_owned(),
                "\u{1f6b4}".to_owned(),
            ],
            size: 32.0,
            jitter_chance: 0.02,
            jitter_max_angle: 0.25,
            target_fps: 60.0,
            speed_jitter_chance: 0.015,
            speed_jitter_range: 0.08,
            speed_min_mul: 0.85,
            speed_max_mul: 1.6,
            tilt_factor: 0.2,
            trail_enabled: true,
            trail_interval_ms: 120.0,
            trail_linger_ms: 600.0,
            trail_opacity: 0.35,
            trail_size_scale: 0.9,
            fall_enabled: false,
            gravity: 900.0,
            drift_x_max: 120.0,
            remove_offscreen: true,
        }
    }
}

impl SwarmConfig {
    /// Scalar speed in units per second for the provided speed multiplier.
    #[must_use]
    pub fn target_speed(&self, speed_multiplier: f32) -> f32 {
        self.base_speed * self.reference_fps * speed_multiplier
    }

    /// Limits a speed multiplier to the configured bounds.
    ///
    /// Inverted bounds resolve to `speed_min_mul`.
    #[must_use]
    pub fn clamp_speed_multiplier(&self, speed_multiplier: f32) -> f32 {
        self.speed_min_mul.max(self.speed_max_mul.min(speed_multiplier))
    }

    /// Minimum time between two processed frames.
    ///
    /// A zero target frame rate never lets a frame through.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        duration_from_millis(1_000.0 / self.target_fps)
    }

    /// Minimum time between two trails of the same sprite.
    #[must_use]
    pub fn trail_interval(&self) -> Duration {
        duration_from_millis(self.trail_interval_ms)
    }

    /// Time a trail takes to fade out.
    #[must_use]
    pub fn trail_linger(&self) -> Duration {
        duration_from_millis(self.trail_linger_ms)
    }
}

/// Subset of [`SwarmConfig`] merged into the live configuration.
///
/// Fields mirror the [`SwarmConfig`] field of the same name; `None` leaves
/// the live value untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigPatch {
    /// Sprites spawned by `start`.
    pub initial_count: Option<usize>,
    /// Population cap.
    pub max_count: Option<usize>,
    /// Lower spawn delay bound, in milliseconds.
    pub spawn_min_ms: Option<f32>,
    /// Upper spawn delay bound, in milliseconds.
    pub spawn_max_ms: Option<f32>,
    /// Per-frame speed at the reference frame rate. Rescales live velocities.
    pub base_speed: Option<f32>,
    /// Frame rate at which `base_speed` is calibrated.
    pub reference_fps: Option<f32>,
    /// Glyphs new sprites pick from.
    pub glyphs: Option<Vec<String>>,
    /// Sprite edge length in pixels.
    pub size: Option<f32>,
    /// Per-frame probability of a heading change.
    pub jitter_chance: Option<f32>,
    /// Largest heading change, in radians.
    pub jitter_max_angle: Option<f32>,
    /// Frame rate the loop is throttled to.
    pub target_fps: Option<f32>,
    /// Per-frame probability of a speed change.
    pub speed_jitter_chance: Option<f32>,
    /// Largest relative speed change.
    pub speed_jitter_range: Option<f32>,
    /// Lower speed multiplier bound.
    pub speed_min_mul: Option<f32>,
    /// Upper speed multiplier bound.
    pub speed_max_mul: Option<f32>,
    /// Fraction of the heading angle applied as tilt.
    pub tilt_factor: Option<f32>,
    /// Whether sprites leave trails.
    pub trail_enabled: Option<bool>,
    /// Minimum time between two trails of a sprite, in milliseconds.
    pub trail_interval_ms: Option<f32>,
    /// Trail fade duration, in milliseconds.
    pub trail_linger_ms: Option<f32>,
    /// Opacity trails start fading from.
    pub trail_opacity: Option<f32>,
    /// Trail scale relative to its sprite.
    pub trail_size_scale: Option<f32>,
    /// Fall mode instead of bouncing.
    pub fall_enabled: Option<bool>,
    /// Downward acceleration in fall mode, in pixels per second squared.
    pub gravity: Option<f32>,
    /// Largest horizontal drift of falling sprites, in pixels per second.
    pub drift_x_max: Option<f32>,
    /// Whether falling sprites are removed past the bottom edge.
    pub remove_offscreen: Option<bool>,
}

macro_rules! merge_fields {
    ($patch:expr, $config:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = $patch.$field {
                $config.$field = value;
            }
        )+
    };
}

impl ConfigPatch {
    /// Returns `true` when the patch changes either spawn interval bound.
    #[must_use]
    pub fn touches_spawn_interval(&self) -> bool {
        self.spawn_min_ms.is_some() || self.spawn_max_ms.is_some()
    }

    /// Returns `true` when the patch sets no field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrites every field of `config` that the patch sets.
    pub fn merge_into(self, config: &mut SwarmConfig) {
        merge_fields!(
            self,
            config,
            initial_count,
            max_count,
            spawn_min_ms,
            spawn_max_ms,
            base_speed,
            reference_fps,
            glyphs,
            size,
            jitter_chance,
            jitter_max_angle,
            target_fps,
            speed_jitter_chance,
            speed_jitter_range,
            speed_min_mul,
            speed_max_mul,
            tilt_factor,
            trail_enabled,
            trail_interval_ms,
            trail_linger_ms,
            trail_opacity,
            trail_size_scale,
            fall_enabled,
            gravity,
            drift_x_max,
            remove_offscreen,
        );
    }
}

/// Parameters of a temporary spawn-rate and population-cap override.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoostOptions {
    /// Sprites spawned immediately when the boost is applied.
    pub extra_bikes: usize,
    /// Time the boost stays in effect, in milliseconds.
    pub duration_ms: f32,
    /// Lower spawn delay bound while boosted, in milliseconds.
    pub spawn_min_ms: f32,
    /// Upper spawn delay bound while boosted, in milliseconds.
    pub spawn_max_ms: f32,
    /// Amount added to the pre-boost population cap.
    pub max_count_increment: usize,
}

impl Default for BoostOptions {
    fn default() -> Self {
        Self {
            extra_bikes: 8,
            duration_ms: 3_000.0,
            spawn_min_ms: 100.0,
            spawn_max_ms: 300.0,
            max_count_increment: 10,
        }
    }
}

impl BoostOptions {
    /// Time the boost stays in effect.
    #[must_use]
    pub fn duration(&self) -> Duration {
        duration_from_millis(self.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_prefers_lower_bound_when_inverted() {
        let config = SwarmConfig {
            speed_min_mul: 1.5,
            speed_max_mul: 0.5,
            ..SwarmConfig::default()
        };
        assert_eq!(config.clamp_speed_multiplier(1.0), 1.5);
    }

    #[test]
    fn clamp_limits_to_configured_range() {
        let config = SwarmConfig::default();
        assert_eq!(config.clamp_speed_multiplier(0.1), 0.85);
        assert_eq!(config.clamp_speed_multiplier(3.0), 1.6);
        assert_eq!(config.clamp_speed_multiplier(1.2), 1.2);
    }

    #[test]
    fn target_speed_scales_with_reference_rate() {
        let config = SwarmConfig::default();
        assert!((config.target_speed(1.0) - 480.0).abs() < 1e-3);
        assert!((config.target_speed(1.25) - 600.0).abs() < 1e-3);
    }

    #[test]
    fn frame_interval_follows_target_rate() {
        let config = SwarmConfig {
            target_fps: 50.0,
            ..SwarmConfig::default()
        };
        assert_eq!(config.frame_interval(), Duration::from_millis(20));

        let stalled = SwarmConfig {
            target_fps: 0.0,
            ..SwarmConfig::default()
        };
        assert_eq!(stalled.frame_interval(), Duration::MAX);
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let mut config = SwarmConfig::default();
        let patch = ConfigPatch {
            base_speed: Some(4.0),
            trail_enabled: Some(false),
            ..ConfigPatch::default()
        };
        assert!(!patch.touches_spawn_interval());

        patch.merge_into(&mut config);

        assert_eq!(config.base_speed, 4.0);
        assert!(!config.trail_enabled);
        assert_eq!(config.max_count, SwarmConfig::default().max_count);
        assert_eq!(config.glyphs, SwarmConfig::default().glyphs);
    }

    #[test]
    fn patch_reports_spawn_interval_changes() {
        let patch = ConfigPatch {
            spawn_max_ms: Some(900.0),
            ..ConfigPatch::default()
        };
        assert!(patch.touches_spawn_interval());
        assert!(!patch.is_empty());
        assert!(ConfigPatch::default().is_empty());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: SwarmConfig = toml::from_str(
            r#"
                max_count = 5
                fall_enabled = true
                glyphs = ["*"]
            "#,
        )
        .expect("partial config should parse");

        assert_eq!(config.max_count, 5);
        assert!(config.fall_enabled);
        assert_eq!(config.glyphs, vec!["*".to_owned()]);
        assert_eq!(config.initial_count, 12);
        assert_eq!(config.gravity, 900.0);
    }

    #[test]
    fn patch_rejects_unknown_fields() {
        let result: Result<ConfigPatch, _> = toml::from_str("warp_speed = 9.0");
        assert!(result.is_err(), "unknown patch fields must be rejected");
    }

    #[test]
    fn boost_options_fill_defaults_and_reject_unknown_fields() {
        let options: BoostOptions =
            toml::from_str("extra_bikes = 2").expect("partial boost should parse");
        assert_eq!(
            options,
            BoostOptions {
                extra_bikes: 2,
                ..BoostOptions::default()
            }
        );

        let result: Result<BoostOptions, _> = toml::from_str("extra_bike = 2");
        assert!(result.is_err(), "unknown boost fields must be rejected");
    }

    #[test]
    fn boost_defaults_match_documented_values() {
        let options = BoostOptions::default();
        assert_eq!(options.extra_bikes, 8);
        assert_eq!(options.duration(), Duration::from_secs(3));
        assert_eq!(options.spawn_min_ms, 100.0);
        assert_eq!(options.spawn_max_ms, 300.0);
        assert_eq!(options.max_count_increment, 10);
    }
}
