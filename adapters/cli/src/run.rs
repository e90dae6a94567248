use std::{fmt, time::Duration};

use bike_swarm_core::{Bounds, SwarmConfig, VisualRole};
use bike_swarm_rendering::{render_ascii, SceneSink};
use bike_swarm_scheduler::VirtualScheduler;
use bike_swarm_system_swarm::Swarm;

use crate::scenario::Action;

type HeadlessSwarm = Swarm<Bounds, SceneSink, VirtualScheduler>;

/// Width of the optional ASCII snapshot, in characters.
const ASCII_COLUMNS: usize = 72;
/// Height of the optional ASCII snapshot, in lines.
const ASCII_ROWS: usize = 24;

/// Parameters of a headless run.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RunOptions {
    pub(crate) bounds: Bounds,
    pub(crate) seed: u64,
    pub(crate) duration: Duration,
    pub(crate) refresh_hz: u32,
    pub(crate) report_every: Duration,
    pub(crate) ascii: bool,
}

/// Outcome of a headless run.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct RunSummary {
    pub(crate) elapsed: Duration,
    pub(crate) final_population: usize,
    pub(crate) peak_population: usize,
    pub(crate) boosts_applied: usize,
    pub(crate) updates_applied: usize,
    pub(crate) trails_fading: usize,
    pub(crate) snapshot: Option<String>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ran for {} ms", self.elapsed.as_millis())?;
        writeln!(
            f,
            "population: {} at stop, {} at peak",
            self.final_population, self.peak_population
        )?;
        writeln!(
            f,
            "script: {} boosts, {} option updates",
            self.boosts_applied, self.updates_applied
        )?;
        write!(f, "trails still fading: {}", self.trails_fading)?;
        if let Some(snapshot) = &self.snapshot {
            write!(f, "\n\n{snapshot}")?;
        }
        Ok(())
    }
}

/// Runs the swarm on virtual time, replaying `timeline` against it.
///
/// Actions scheduled after the end of the run are skipped.
pub(crate) fn run(
    config: SwarmConfig,
    timeline: Vec<(Duration, Action)>,
    options: &RunOptions,
) -> RunSummary {
    let mut swarm = Swarm::new(
        config,
        options.bounds,
        SceneSink::new(),
        VirtualScheduler::with_refresh_rate(options.refresh_hz),
        options.seed,
    );
    let mut summary = RunSummary::default();
    let mut timeline = timeline.into_iter().peekable();
    let mut next_report = (!options.report_every.is_zero()).then_some(options.report_every);

    swarm.start();
    summary.peak_population = swarm.population();

    loop {
        let checkpoint = [next_report, timeline.peek().map(|(at, _)| *at)]
            .into_iter()
            .flatten()
            .fold(options.duration, Duration::min);
        pump(&mut swarm, checkpoint, &mut summary);

        while let Some((_, action)) = timeline.next_if(|(at, _)| *at <= checkpoint) {
            match action {
                Action::Boost(boost) => {
                    swarm.boost(boost);
                    summary.boosts_applied += 1;
                }
                Action::Update(patch) => {
                    swarm.apply_options(patch);
                    summary.updates_applied += 1;
                }
            }
            summary.peak_population = summary.peak_population.max(swarm.population());
        }

        if next_report == Some(checkpoint) {
            report(&swarm, checkpoint);
            next_report = checkpoint.checked_add(options.report_every);
        }
        if checkpoint >= options.duration {
            break;
        }
    }

    if options.ascii {
        summary.snapshot = Some(render_ascii(
            swarm.sink(),
            options.bounds,
            ASCII_COLUMNS,
            ASCII_ROWS,
        ));
    }
    summary.final_population = swarm.population();
    swarm.stop();
    summary.elapsed = swarm.scheduler().now();
    summary.trails_fading = swarm.sink().count(VisualRole::Trail);
    tracing::info!(
        elapsed_ms = summary.elapsed.as_millis() as u64,
        population = summary.final_population,
        "swarm stopped"
    );
    summary
}

/// Delivers every callback due up to `deadline`, keeping the sink clock in step.
fn pump(swarm: &mut HeadlessSwarm, deadline: Duration, summary: &mut RunSummary) {
    while let Some(event) = swarm.scheduler_mut().next_event(deadline) {
        swarm.handle(event);
        let now = swarm.scheduler().now();
        swarm.sink_mut().advance_to(now);
        summary.peak_population = summary.peak_population.max(swarm.population());
    }
    swarm.sink_mut().advance_to(deadline);
}

fn report(swarm: &HeadlessSwarm, at: Duration) {
    tracing::info!(
        at_ms = at.as_millis() as u64,
        population = swarm.population(),
        max_count = swarm.config().max_count,
        trails = swarm.sink().count(VisualRole::Trail),
        boosted = swarm.boost_base().is_some(),
        "swarm report"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use bike_swarm_core::{BoostOptions, ConfigPatch};

    fn options(duration_ms: u64) -> RunOptions {
        RunOptions {
            bounds: Bounds::new(640.0, 480.0),
            seed: 7,
            duration: Duration::from_millis(duration_ms),
            refresh_hz: 60,
            report_every: Duration::from_millis(250),
            ascii: false,
        }
    }

    #[test]
    fn run_without_script_keeps_population_under_cap() {
        let config = SwarmConfig::default();
        let summary = run(config.clone(), Vec::new(), &options(3_000));

        assert_eq!(summary.elapsed, Duration::from_millis(3_000));
        assert!(summary.final_population >= config.initial_count);
        assert!(summary.peak_population <= config.max_count);
        assert!(summary.trails_fading > 0, "trails outlive the stop");
        assert_eq!(summary.snapshot, None);
    }

    #[test]
    fn scripted_actions_apply_in_order() {
        let timeline = vec![
            (
                Duration::from_millis(500),
                Action::Boost(BoostOptions {
                    extra_bikes: 5,
                    ..BoostOptions::default()
                }),
            ),
            (
                Duration::from_millis(900),
                Action::Update(ConfigPatch {
                    trail_enabled: Some(false),
                    ..ConfigPatch::default()
                }),
            ),
        ];
        let config = SwarmConfig {
            initial_count: 4,
            ..SwarmConfig::default()
        };

        let summary = run(config, timeline, &options(1_000));

        assert_eq!(summary.boosts_applied, 1);
        assert_eq!(summary.updates_applied, 1);
        assert!(summary.peak_population >= 9);
    }

    #[test]
    fn actions_after_the_end_are_skipped() {
        let timeline = vec![(
            Duration::from_millis(5_000),
            Action::Boost(BoostOptions::default()),
        )];

        let summary = run(SwarmConfig::default(), timeline, &options(1_000));

        assert_eq!(summary.boosts_applied, 0);
        assert_eq!(summary.elapsed, Duration::from_millis(1_000));
    }

    #[test]
    fn zero_duration_stops_immediately() {
        let config = SwarmConfig::default();
        let summary = run(config.clone(), Vec::new(), &options(0));

        assert_eq!(summary.elapsed, Duration::ZERO);
        assert_eq!(summary.final_population, config.initial_count);
        assert_eq!(summary.trails_fading, 0);
    }

    #[test]
    fn ascii_snapshot_is_captured_before_stop() {
        let config = SwarmConfig {
            trail_enabled: false,
            ..SwarmConfig::default()
        };
        let summary = run(
            config,
            Vec::new(),
            &RunOptions {
                ascii: true,
                ..options(200)
            },
        );

        let snapshot = summary.snapshot.expect("snapshot requested");
        assert_eq!(snapshot.lines().count(), ASCII_ROWS);
        assert!(snapshot.contains('>') || snapshot.contains('<'));
    }
}
