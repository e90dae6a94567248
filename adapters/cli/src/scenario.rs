use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use bike_swarm_core::{BoostOptions, ConfigPatch, SwarmConfig};
use serde::Deserialize;

/// Swarm configuration plus the boosts and option updates scripted against it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Scenario {
    /// Configuration the swarm starts with.
    swarm: SwarmConfig,
    /// Boosts triggered at fixed offsets from the start.
    boosts: Vec<ScheduledBoost>,
    /// Live option updates applied at fixed offsets from the start.
    updates: Vec<ScheduledUpdate>,
}

/// Boost fired `at_ms` milliseconds into the run.
///
/// Omitted options fall back to [`BoostOptions::default`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScheduledBoost {
    at_ms: u64,
    #[serde(default)]
    options: BoostOptions,
}

/// Option patch applied `at_ms` milliseconds into the run.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScheduledUpdate {
    at_ms: u64,
    patch: ConfigPatch,
}

/// Scripted operation delivered to the swarm.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Action {
    /// Temporary surge.
    Boost(BoostOptions),
    /// Live configuration change.
    Update(ConfigPatch),
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        parse_scenario(&contents)
            .with_context(|| format!("invalid scenario file {}", path.display()))
    }

    /// Splits the scenario into its configuration and a time-ordered script.
    ///
    /// Boosts precede updates scheduled for the same instant.
    pub(crate) fn into_timeline(self) -> (SwarmConfig, Vec<(Duration, Action)>) {
        let boosts = self
            .boosts
            .into_iter()
            .map(|boost| (Duration::from_millis(boost.at_ms), Action::Boost(boost.options)));
        let updates = self
            .updates
            .into_iter()
            .map(|update| (Duration::from_millis(update.at_ms), Action::Update(update.patch)));
        let mut timeline: Vec<_> = boosts.chain(updates).collect();
        timeline.sort_by_key(|(at, _)| *at);
        (self.swarm, timeline)
    }
}

fn parse_scenario(contents: &str) -> Result<Scenario> {
    let scenario: Scenario =
        toml::from_str(contents).context("failed to parse scenario toml contents")?;
    for update in &scenario.updates {
        if update.patch.is_empty() {
            bail!("update at {} ms does not change any option", update.at_ms);
        }
    }
    Ok(scenario)
}
