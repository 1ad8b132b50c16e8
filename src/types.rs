use serde::{Deserialize, Serialize};

use crate::constants::{
    DEAD_GHOST_SPEED_MULTIPLIER, FLEE_SAMPLES, GHOST_CATCH_POINTS, GHOST_COUNT, GHOST_SPEED,
    PATHFINDING_ITER_CAP, PATH_MEMORY, PLAYER_SPEED, POINTS_PER_DOT, POWER_DOT_POINTS,
    POWER_DURATION_MS, POWER_NODE_CHANCE, TICK_MS, TRACKING_TIME_MS,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Expansion order used by the pathfinder.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Move(Direction),
    Pause,
}

impl Key {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pause" | "p" => Some(Self::Pause),
            other => Direction::parse(other).map(Self::Move),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: i32,
    pub y: i32,
}

impl Vec2 {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn manhattan(self, other: Vec2) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostState {
    Wandering,
    Chasing,
    Scared,
    Dead,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    Idle,
    Running,
    Paused,
    GameOver,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub tick_ms: u64,
    pub player_speed: f64,
    pub ghost_speed: f64,
    pub dead_ghost_speed_multiplier: f64,
    pub ghost_count: usize,
    pub path_memory: usize,
    pub tracking_time_ms: u64,
    pub pathfinding_iter_cap: usize,
    pub flee_samples: usize,
    pub points_per_dot: u32,
    pub power_dot_points: u32,
    pub ghost_catch_points: u32,
    pub power_node_chance: f32,
    pub power_duration_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tick_ms: TICK_MS,
            player_speed: PLAYER_SPEED,
            ghost_speed: GHOST_SPEED,
            dead_ghost_speed_multiplier: DEAD_GHOST_SPEED_MULTIPLIER,
            ghost_count: GHOST_COUNT,
            path_memory: PATH_MEMORY,
            tracking_time_ms: TRACKING_TIME_MS,
            pathfinding_iter_cap: PATHFINDING_ITER_CAP,
            flee_samples: FLEE_SAMPLES,
            points_per_dot: POINTS_PER_DOT,
            power_dot_points: POWER_DOT_POINTS,
            ghost_catch_points: GHOST_CATCH_POINTS,
            power_node_chance: POWER_NODE_CHANCE,
            power_duration_ms: POWER_DURATION_MS,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub x: f64,
    pub y: f64,
    pub dir: Option<Direction>,
    pub queued: Option<Direction>,
}

#[derive(Clone, Debug, Serialize)]
pub struct GhostView {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub dir: Option<Direction>,
    pub state: GhostState,
}

#[derive(Clone, Debug, Serialize)]
pub struct DotView {
    pub x: i32,
    pub y: i32,
    pub power: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct WorldInit {
    pub side: usize,
    pub tiles: Vec<String>,
    pub dots: Vec<DotView>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    RoundStarted {
        level: u32,
    },
    DotCollected {
        x: i32,
        y: i32,
        power: bool,
    },
    ScoreChanged {
        score: u32,
        #[serde(rename = "highScore")]
        high_score: u32,
    },
    SupermodeStarted {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    SupermodeEnded,
    GhostCaught {
        #[serde(rename = "ghostId")]
        ghost_id: String,
    },
    GhostRevived {
        #[serde(rename = "ghostId")]
        ghost_id: String,
    },
    LevelCleared {
        level: u32,
    },
    Paused,
    Resumed,
    GameOver {
        score: u32,
        #[serde(rename = "highScore")]
        high_score: u32,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub phase: GamePhase,
    pub level: u32,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    #[serde(rename = "powerRemainingMs")]
    pub power_remaining_ms: u64,
    pub player: PlayerView,
    pub ghosts: Vec<GhostView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameSummary {
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    pub level: u32,
    #[serde(rename = "dotsCollected")]
    pub dots_collected: u32,
    #[serde(rename = "ghostsCaught")]
    pub ghosts_caught: u32,
    pub ticks: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}
