pub const TICK_MS: u64 = 10;

pub const MAP_SIDE: usize = 20;
pub const DEFAULT_SAVE_PATH: &str = ".pacman";

// Speeds are in tiles per tick.
pub const PLAYER_SPEED: f64 = 0.025;
pub const GHOST_SPEED: f64 = 0.02;
pub const DEAD_GHOST_SPEED_MULTIPLIER: f64 = 2.0;

/// Half-width of the band around a tile centre that counts as "arrived".
pub const CENTER_TOLERANCE: f64 = 0.015;
/// Margin from the tile edge inside which the player does not yet eat the dot.
pub const DOT_COLLECTION_MARGIN: f64 = 0.1;
pub const ENTITY_RADIUS: f64 = 1.0 / 3.0;

pub const GHOST_COUNT: usize = 4;
pub const PATH_MEMORY: usize = 3;
pub const TRACKING_TIME_MS: u64 = 20_000;
pub const PATHFINDING_ITER_CAP: usize = 1_000;
pub const FLEE_SAMPLES: usize = 5;

pub const POINTS_PER_DOT: u32 = 1;
pub const POWER_DOT_POINTS: u32 = 10;
pub const GHOST_CATCH_POINTS: u32 = 20;
pub const POWER_NODE_CHANCE: f32 = 0.03;
pub const POWER_DURATION_MS: u64 = 8_000;

pub const DEFAULT_LAYOUT: [&str; MAP_SIDE] = [
    "####################",
    "#........##........#",
    "#.##.###.##.###.##.#",
    "#..................#",
    "#.##.#.######.#.##.#",
    "#....#...##...#....#",
    "####.###.##.###.####",
    "####.#........#.####",
    "####.#.##GG##.#.####",
    "#......#GGGG#......#",
    "####.#.######.#.####",
    "####.#........#.####",
    "####.#.######.#.####",
    "#........##........#",
    "#.##.###.##.###.##.#",
    "#..#.....P......#..#",
    "##.#.#.######.#.#.##",
    "#....#...##...#....#",
    "#.######.##.######.#",
    "####################",
];
