use chrono::{SecondsFormat, Utc};
use clap::Parser;
use pacman_engine::config::load_config;
use pacman_engine::constants::DEFAULT_LAYOUT;
use pacman_engine::engine::{Controls, GameEngine};
use pacman_engine::error::MapError;
use pacman_engine::logging::init_tracing;
use pacman_engine::rng::Rng;
use pacman_engine::ticker::VirtualClock;
use pacman_engine::types::{GameConfig, Key, RuntimeEvent, Snapshot, Vec2};
use pacman_engine::world::{load_layout_file, parse_layout, GridMap, MapSource};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Seed of the first scenario; later scenarios count up from it.
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 3)]
    scenarios: u32,
    /// Tick limit per scenario.
    #[arg(long, default_value_t = 60_000)]
    ticks: u64,
    #[arg(long)]
    ghosts: Option<usize>,
    #[arg(long)]
    map: Option<PathBuf>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    reason: &'static str,
    score: u32,
    level: u32,
    #[serde(rename = "dotsCollected")]
    dots_collected: u32,
    #[serde(rename = "ghostsCaught")]
    ghosts_caught: u32,
    supermodes: u32,
    ticks: u64,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "generatedAtIso")]
    generated_at_iso: String,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Scripted player: every so often it presses a direction that leads into
/// an open cell. The first press starts the round.
struct Autopilot {
    rng: Rng,
    next_press_tick: u64,
}

impl Autopilot {
    fn new(seed: u32) -> Self {
        Self {
            rng: Rng::new(seed ^ 0x9e37_79b9),
            next_press_tick: 0,
        }
    }

    fn drive(&mut self, tick: u64, map: &GridMap, snapshot: &Snapshot, controls: &Controls) {
        if tick < self.next_press_tick {
            return;
        }
        let cell = Vec2::new(
            snapshot.player.x.floor() as i32,
            snapshot.player.y.floor() as i32,
        );
        let options: Vec<_> = map.neighbors(cell).map(|(dir, _)| dir).collect();
        if let Some(dir) = self.rng.pick(&options) {
            controls.press(Key::Move(*dir));
        }
        self.next_press_tick = tick + 20 + (self.rng.next_f32() * 60.0) as u64;
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let source = match load_map(cli.map.as_deref()) {
        Ok(source) => source,
        Err(error) => {
            error!(%error, "failed to load map");
            std::process::exit(1);
        }
    };
    let mut config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "failed to load game config");
            std::process::exit(1);
        }
    };
    if let Some(ghosts) = cli.ghosts {
        config.ghost_count = ghosts.max(1);
    }

    let first_seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(first_seed, Utc::now().timestamp_millis()));

    let mut has_anomaly = false;
    let mut scenario_results = Vec::new();
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;

    for index in 0..cli.scenarios.max(1) {
        let seed = first_seed.wrapping_add(index);
        let name = format!("scenario-{}", index + 1);
        info!(match_id = %match_id, scenario = %name, seed, "scenario started");

        let scenario_run = match run_scenario(&name, seed, &source, &config, cli.ticks) {
            Ok(run) => run,
            Err(error) => {
                error!(%error, "failed to build engine");
                std::process::exit(1);
            }
        };
        for anomaly in &scenario_run.anomaly_records {
            warn!(scenario = %name, tick = anomaly.tick, message = %anomaly.message, "anomaly detected");
        }
        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        *reason_counts
            .entry(scenario_run.result.reason.to_string())
            .or_insert(0) += 1;
        info!(
            scenario = %name,
            reason = scenario_run.result.reason,
            score = scenario_run.result.score,
            ticks = scenario_run.result.ticks,
            "scenario finished"
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => warn!(%error, "failed to serialize scenario result"),
        }
        scenario_results.push(scenario_run.result);
    }

    let summary = build_run_summary(
        match_id.clone(),
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        scenario_results,
        reason_counts,
        total_anomalies,
    );

    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            error!(path = %path.display(), %error, "summary write failed");
            std::process::exit(2);
        }
    }

    info!(
        match_id = %match_id,
        scenarios = summary.scenario_count,
        anomalies = summary.anomaly_count,
        average_score = summary.average_score,
        "run finished"
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_map(path: Option<&Path>) -> Result<MapSource, MapError> {
    match path {
        Some(path) => load_layout_file(path),
        None => parse_layout(&DEFAULT_LAYOUT),
    }
}

fn run_scenario(
    name: &str,
    seed: u32,
    source: &MapSource,
    config: &GameConfig,
    max_ticks: u64,
) -> Result<ScenarioRunResult, MapError> {
    let mut engine = GameEngine::new(source.clone(), config.clone(), seed, 0)?;
    let controls = engine.controls();
    let map = engine.map().clone();
    let mut clock = VirtualClock::new(config.tick_ms);
    let mut pilot = Autopilot::new(seed);

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut supermodes = 0u32;
    let mut finished = None;
    let mut snapshot = engine.build_snapshot(false);

    while clock.ticks() < max_ticks {
        pilot.drive(clock.ticks(), &map, &snapshot, &controls);
        clock.advance(&mut engine, 1);
        snapshot = engine.build_snapshot(true);

        for message in collect_snapshot_anomalies(&map, config, &snapshot) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        supermodes += snapshot
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::SupermodeStarted { .. }))
            .count() as u32;

        if let Some(summary) = engine.take_summary() {
            finished = Some(summary);
            break;
        }
    }

    let reason = if finished.is_some() { "caught" } else { "tick_limit" };
    let summary = finished.unwrap_or_else(|| engine.build_summary());

    Ok(ScenarioRunResult {
        result: ScenarioResultLine {
            scenario: name.to_string(),
            seed,
            reason,
            score: summary.score,
            level: summary.level,
            dots_collected: summary.dots_collected,
            ghosts_caught: summary.ghosts_caught,
            supermodes,
            ticks: summary.ticks,
            duration_ms: summary.duration_ms,
            anomalies,
        },
        anomaly_records,
    })
}

fn collect_snapshot_anomalies(map: &GridMap, config: &GameConfig, snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    let on_open = |x: f64, y: f64| map.is_open(x.floor() as i32, y.floor() as i32);

    if !on_open(snapshot.player.x, snapshot.player.y) {
        anomalies.push(format!(
            "player off the open grid at ({:.3}, {:.3})",
            snapshot.player.x, snapshot.player.y
        ));
    }
    for ghost in &snapshot.ghosts {
        if !on_open(ghost.x, ghost.y) {
            anomalies.push(format!("ghost off the open grid: {}", ghost.id));
        }
    }
    if snapshot.power_remaining_ms > config.power_duration_ms {
        anomalies.push(format!(
            "power timer above its duration: {}",
            snapshot.power_remaining_ms
        ));
    }
    if snapshot.score > snapshot.high_score {
        anomalies.push(format!(
            "score {} above high score {}",
            snapshot.score, snapshot.high_score
        ));
    }
    anomalies
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: i64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn build_run_summary(
    match_id: String,
    generated_at_iso: String,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let scenario_count = scenarios.len();
    let total_score: u64 = scenarios.iter().map(|s| s.score as u64).sum();
    let average_score = if scenario_count == 0 {
        0
    } else {
        (total_score / scenario_count as u64) as u32
    };
    RunSummary {
        match_id,
        generated_at_iso,
        scenario_count,
        anomaly_count,
        average_score,
        reason_counts,
        scenarios,
    }
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_scenario_result(reason: &'static str, score: u32) -> ScenarioResultLine {
        ScenarioResultLine {
            scenario: "test".to_string(),
            seed: 42,
            reason,
            score,
            level: 1,
            dots_collected: score,
            ghosts_caught: 0,
            supermodes: 0,
            ticks: 100,
            duration_ms: 1_000,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn default_match_id_contains_seed_and_timestamp() {
        assert_eq!(default_match_id(42, 123456789), "sim-42-123456789");
    }

    #[test]
    fn build_run_summary_calculates_average_score() {
        let summary = build_run_summary(
            "sim-42-1".to_string(),
            "2026-01-01T00:00:00.000Z".to_string(),
            vec![
                make_scenario_result("caught", 30),
                make_scenario_result("tick_limit", 90),
            ],
            BTreeMap::from([
                ("caught".to_string(), 1usize),
                ("tick_limit".to_string(), 1usize),
            ]),
            0,
        );
        assert_eq!(summary.average_score, 60);
        assert_eq!(summary.scenario_count, 2);
    }

    #[test]
    fn write_summary_returns_error_when_parent_does_not_exist() {
        let target = std::env::temp_dir()
            .join(format!("pacman-missing-{}", rand::random::<u32>()))
            .join("summary.json");
        let summary = build_run_summary(
            "sim-1-1".to_string(),
            "2026-01-01T00:00:00.000Z".to_string(),
            vec![make_scenario_result("caught", 10)],
            BTreeMap::from([("caught".to_string(), 1usize)]),
            0,
        );
        assert!(write_summary(&target, &summary).is_err());
    }

    #[test]
    fn push_anomaly_keeps_records_and_deduplicates_summary_messages() {
        let mut anomalies = Vec::new();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        push_anomaly(&mut anomalies, &mut records, &mut seen, 10, "same".to_string());
        push_anomaly(&mut anomalies, &mut records, &mut seen, 11, "same".to_string());
        assert_eq!(anomalies.len(), 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].tick, 11);
    }

    #[test]
    fn scenarios_replay_from_their_seed() {
        let source = parse_layout(&DEFAULT_LAYOUT).expect("layout parses");
        let config = GameConfig::default();
        let a = run_scenario("a", 77, &source, &config, 3_000).expect("scenario runs");
        let b = run_scenario("b", 77, &source, &config, 3_000).expect("scenario runs");
        assert_eq!(a.result.score, b.result.score);
        assert_eq!(a.result.ticks, b.result.ticks);
        assert_eq!(a.result.reason, b.result.reason);
        assert!(a.result.anomalies.is_empty(), "{:?}", a.result.anomalies);
    }
}
