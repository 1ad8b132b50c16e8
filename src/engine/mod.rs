use std::collections::VecDeque;
use std::sync::Arc;

use tracing::info;

use crate::constants::ENTITY_RADIUS;
use crate::error::MapError;
use crate::rng::Rng;
use crate::types::{
    Direction, GamePhase, GameConfig, GameSummary, GhostState, GhostView, PlayerView,
    RuntimeEvent, Snapshot, Vec2, WorldInit,
};
use crate::world::{GridMap, MapSource};

mod controls;
mod ghost_system;
mod motion;
mod pathfinding;
mod player_system;
mod spawn_system;
mod utils;

pub use self::controls::Controls;
pub use self::motion::{Motion, Step};
pub use self::pathfinding::{find_path, PathPlan};
pub use self::utils::{entities_touch, player_in_view};

#[derive(Clone, Debug, Default)]
struct RoundStats {
    dots: u32,
    ghosts_caught: u32,
    ticks: u64,
    elapsed_ms: u64,
}

#[derive(Clone, Debug)]
struct PlayerInternal {
    motion: Motion,
    blocked: bool,
    denied_turn: Option<Direction>,
}

impl PlayerInternal {
    fn at_cell(cell: Vec2) -> Self {
        Self {
            motion: Motion::at_cell(cell),
            blocked: false,
            denied_turn: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum GhostMode {
    Wandering { target: Option<Vec2> },
    Chasing { remaining_ms: u64 },
    Scared,
    Dead { spawn: Vec2 },
}

impl GhostMode {
    fn state(&self) -> GhostState {
        match self {
            Self::Wandering { .. } => GhostState::Wandering,
            Self::Chasing { .. } => GhostState::Chasing,
            Self::Scared => GhostState::Scared,
            Self::Dead { .. } => GhostState::Dead,
        }
    }
}

#[derive(Clone, Debug)]
struct GhostInternal {
    id: String,
    motion: Motion,
    dir: Option<Direction>,
    mode: GhostMode,
    move_queue: VecDeque<Direction>,
    /// Set once the ghost has left a centre band; a decision consumes it so
    /// each arrival is acted on once.
    decision_armed: bool,
}

#[derive(Debug)]
pub struct GameEngine {
    pub config: GameConfig,
    map: GridMap,

    rng: Rng,
    controls: Arc<Controls>,
    player: PlayerInternal,
    ghosts: Vec<GhostInternal>,
    events: Vec<RuntimeEvent>,

    phase: GamePhase,
    score: u32,
    high_score: u32,
    level: u32,
    power_remaining_ms: Option<u64>,
    stats: RoundStats,
    finished: Option<GameSummary>,

    tick_counter: u64,
    elapsed_ms: u64,
    next_id_counter: u64,
}

impl GameEngine {
    pub fn new(
        source: MapSource,
        config: GameConfig,
        seed: u32,
        high_score: u32,
    ) -> Result<Self, MapError> {
        let mut rng = Rng::new(seed);
        let map = GridMap::build(source, &config, &mut rng)?;
        let player_spawn = map.player_spawns()[0];

        let mut engine = Self {
            config,
            map,
            rng,
            controls: Arc::new(Controls::new()),
            player: PlayerInternal::at_cell(player_spawn),
            ghosts: Vec::new(),
            events: Vec::new(),
            phase: GamePhase::Idle,
            score: 0,
            high_score,
            level: 1,
            power_remaining_ms: None,
            stats: RoundStats::default(),
            finished: None,
            tick_counter: 0,
            elapsed_ms: 0,
            next_id_counter: 1,
        };
        engine.spawn_initial_ghosts();
        engine.spawn_entities();
        Ok(engine)
    }

    pub fn controls(&self) -> Arc<Controls> {
        Arc::clone(&self.controls)
    }

    pub fn map(&self) -> &GridMap {
        &self.map
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn player_cell(&self) -> Vec2 {
        self.player.motion.cell()
    }

    pub fn get_world_init(&self) -> WorldInit {
        self.map.to_world_init()
    }

    pub fn step(&mut self, dt_ms: u64) {
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.sync_controls();
        if self.phase != GamePhase::Running {
            return;
        }
        self.stats.ticks += 1;
        self.stats.elapsed_ms = self.stats.elapsed_ms.saturating_add(dt_ms);

        self.update_player();
        self.update_ghosts(dt_ms);
        self.resolve_collisions();
        if self.phase != GamePhase::Running {
            return;
        }
        self.update_supermode(dt_ms);
        self.check_level_cleared();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            phase: self.phase,
            level: self.level,
            score: self.score,
            high_score: self.high_score,
            power_remaining_ms: self.power_remaining_ms.unwrap_or(0),
            player: PlayerView {
                x: self.player.motion.x,
                y: self.player.motion.y,
                dir: self.controls.heading(),
                queued: self.controls.queued(),
            },
            ghosts: self
                .ghosts
                .iter()
                .map(|ghost| GhostView {
                    id: ghost.id.clone(),
                    x: ghost.motion.x,
                    y: ghost.motion.y,
                    dir: ghost.dir,
                    state: ghost.mode.state(),
                })
                .collect(),
            events: if include_events {
                std::mem::take(&mut self.events)
            } else {
                Vec::new()
            },
        }
    }

    pub fn build_summary(&self) -> GameSummary {
        GameSummary {
            score: self.score,
            high_score: self.high_score,
            level: self.level,
            dots_collected: self.stats.dots,
            ghosts_caught: self.stats.ghosts_caught,
            ticks: self.stats.ticks,
            duration_ms: self.stats.elapsed_ms,
        }
    }

    pub fn take_summary(&mut self) -> Option<GameSummary> {
        self.finished.take()
    }

    fn sync_controls(&mut self) {
        match self.phase {
            GamePhase::Idle | GamePhase::GameOver => {
                if self.controls.take_start_request() {
                    self.start_round();
                }
            }
            GamePhase::Running => {
                if self.controls.pause_requested() {
                    self.phase = GamePhase::Paused;
                    self.events.push(RuntimeEvent::Paused);
                    info!(tick = self.tick_counter, "paused");
                }
            }
            GamePhase::Paused => {
                if !self.controls.pause_requested() {
                    self.phase = GamePhase::Running;
                    self.events.push(RuntimeEvent::Resumed);
                    info!(tick = self.tick_counter, "resumed");
                }
            }
        }
        self.controls.publish_phase(self.phase);
    }

    fn add_score(&mut self, points: u32) {
        if points == 0 {
            return;
        }
        self.score = self.score.saturating_add(points);
        if self.score > self.high_score {
            self.high_score = self.score;
        }
        self.events.push(RuntimeEvent::ScoreChanged {
            score: self.score,
            high_score: self.high_score,
        });
    }

    fn enter_supermode(&mut self) {
        let duration_ms = self.config.power_duration_ms;
        self.power_remaining_ms = Some(duration_ms);
        for ghost in &mut self.ghosts {
            ghost.mode = GhostMode::Scared;
            ghost.move_queue.clear();
        }
        self.events.push(RuntimeEvent::SupermodeStarted { duration_ms });
        info!(duration_ms, "supermode started");
    }

    fn update_supermode(&mut self, dt_ms: u64) {
        let Some(remaining) = self.power_remaining_ms else {
            return;
        };
        let remaining = remaining.saturating_sub(dt_ms);
        if remaining > 0 {
            self.power_remaining_ms = Some(remaining);
            return;
        }
        self.power_remaining_ms = None;
        for ghost in &mut self.ghosts {
            // Caught ghosts keep heading home.
            if ghost.mode == GhostMode::Scared {
                ghost.mode = GhostMode::Wandering { target: None };
                ghost.move_queue.clear();
            }
        }
        self.events.push(RuntimeEvent::SupermodeEnded);
        info!("supermode ended");
    }

    fn resolve_collisions(&mut self) {
        for idx in 0..self.ghosts.len() {
            if !entities_touch(&self.player.motion, &self.ghosts[idx].motion, ENTITY_RADIUS) {
                continue;
            }
            match self.ghosts[idx].mode {
                GhostMode::Dead { .. } => {}
                GhostMode::Scared => self.catch_ghost(idx),
                GhostMode::Wandering { .. } | GhostMode::Chasing { .. } => self.end_round(),
            }
        }
    }

    // Several hostile contacts on one tick still end the round once.
    fn end_round(&mut self) {
        if self.phase != GamePhase::Running {
            return;
        }
        self.phase = GamePhase::GameOver;
        self.power_remaining_ms = None;
        self.controls.clear_movement();
        self.controls.publish_phase(self.phase);
        self.finished = Some(self.build_summary());
        self.events.push(RuntimeEvent::GameOver {
            score: self.score,
            high_score: self.high_score,
        });
        info!(
            score = self.score,
            high_score = self.high_score,
            level = self.level,
            "game over"
        );
    }

    fn check_level_cleared(&mut self) {
        if self.map.remaining_dots() > 0 {
            return;
        }
        let cleared = self.level;
        self.level += 1;
        self.events.push(RuntimeEvent::LevelCleared { level: cleared });
        info!(level = cleared, score = self.score, "level cleared");
        self.map.reset_dots();
        self.power_remaining_ms = None;
        self.controls.clear_movement();
        self.spawn_entities();
        self.events.push(RuntimeEvent::RoundStarted { level: self.level });
    }

    fn make_id(&mut self, prefix: &str) -> String {
        let id = format!("{}_{}", prefix, self.next_id_counter);
        self.next_id_counter = self.next_id_counter.saturating_add(1);
        id
    }
}
