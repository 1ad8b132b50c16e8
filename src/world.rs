use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::MapError;
use crate::rng::Rng;
use crate::types::{Direction, DotView, GameConfig, Vec2, WorldInit};

pub const WALL_CHAR: char = '#';
pub const PLAYER_SPAWN_CHAR: char = 'P';
pub const ENEMY_SPAWN_CHAR: char = 'G';

#[derive(Clone, Debug)]
pub struct MapSource {
    pub open: Vec<Vec<bool>>,
    pub player_spawns: Vec<Vec2>,
    pub enemy_spawns: Vec<Vec2>,
}

#[derive(Clone, Debug)]
pub struct Cell {
    pub pos: Vec2,
    pub collected: bool,
    pub point_value: u32,
    pub is_power_node: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Collected {
    pub points: u32,
    pub power: bool,
}

#[derive(Clone, Debug)]
pub struct GridMap {
    side: usize,
    cells: Vec<Option<Cell>>,
    open_cells: Vec<Vec2>,
    player_spawns: Vec<Vec2>,
    enemy_spawns: Vec<Vec2>,
}

/// Parses an ASCII layout: `#` is a wall, `P` a player spawn, `G` an enemy
/// spawn, anything else an open tile.
pub fn parse_layout<S: AsRef<str>>(rows: &[S]) -> Result<MapSource, MapError> {
    if rows.is_empty() {
        return Err(MapError::Empty);
    }
    let side = rows.len();
    let mut open = Vec::with_capacity(side);
    let mut player_spawns = Vec::new();
    let mut enemy_spawns = Vec::new();

    for (y, row) in rows.iter().enumerate() {
        let chars: Vec<char> = row.as_ref().chars().collect();
        if chars.len() != side {
            return Err(MapError::NotSquare {
                row: y,
                len: chars.len(),
                expected: side,
            });
        }
        let mut line = Vec::with_capacity(side);
        for (x, ch) in chars.into_iter().enumerate() {
            let pos = Vec2::new(x as i32, y as i32);
            match ch {
                WALL_CHAR => line.push(false),
                PLAYER_SPAWN_CHAR => {
                    player_spawns.push(pos);
                    line.push(true);
                }
                ENEMY_SPAWN_CHAR => {
                    enemy_spawns.push(pos);
                    line.push(true);
                }
                _ => line.push(true),
            }
        }
        open.push(line);
    }

    Ok(MapSource {
        open,
        player_spawns,
        enemy_spawns,
    })
}

pub fn load_layout_file(path: &Path) -> Result<MapSource, MapError> {
    let text = fs::read_to_string(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let rows: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end())
        .filter(|line| !line.is_empty())
        .collect();
    parse_layout(&rows)
}

impl GridMap {
    pub fn build(source: MapSource, config: &GameConfig, rng: &mut Rng) -> Result<Self, MapError> {
        let side = source.open.len();
        if side == 0 {
            return Err(MapError::Empty);
        }
        for (row, line) in source.open.iter().enumerate() {
            if line.len() != side {
                return Err(MapError::NotSquare {
                    row,
                    len: line.len(),
                    expected: side,
                });
            }
        }
        if source.player_spawns.is_empty() {
            return Err(MapError::NoPlayerSpawn);
        }
        if source.enemy_spawns.is_empty() {
            return Err(MapError::NoEnemySpawn);
        }
        let in_bounds =
            |p: &Vec2| p.x >= 0 && p.y >= 0 && (p.x as usize) < side && (p.y as usize) < side;
        if let Some(bad) = source
            .player_spawns
            .iter()
            .chain(source.enemy_spawns.iter())
            .find(|p| !in_bounds(*p))
        {
            return Err(MapError::SpawnOutOfBounds { x: bad.x, y: bad.y });
        }

        let mut open = source.open;
        for spawn in source.player_spawns.iter().chain(source.enemy_spawns.iter()) {
            open[spawn.y as usize][spawn.x as usize] = true;
        }

        let mut cells = Vec::with_capacity(side * side);
        let mut open_cells = Vec::new();
        let mut power_nodes = 0usize;
        for (y, line) in open.iter().enumerate() {
            for (x, is_open) in line.iter().enumerate() {
                if !is_open {
                    cells.push(None);
                    continue;
                }
                let pos = Vec2::new(x as i32, y as i32);
                let is_power_node = rng.chance(config.power_node_chance);
                if is_power_node {
                    power_nodes += 1;
                }
                cells.push(Some(Cell {
                    pos,
                    collected: false,
                    point_value: if is_power_node {
                        config.power_dot_points
                    } else {
                        config.points_per_dot
                    },
                    is_power_node,
                }));
                open_cells.push(pos);
            }
        }
        debug!(
            side,
            open = open_cells.len(),
            power_nodes,
            "map loaded"
        );

        Ok(Self {
            side,
            cells,
            open_cells,
            player_spawns: source.player_spawns,
            enemy_spawns: source.enemy_spawns,
        })
    }

    pub fn from_layout<S: AsRef<str>>(
        rows: &[S],
        config: &GameConfig,
        rng: &mut Rng,
    ) -> Result<Self, MapError> {
        Self::build(parse_layout(rows)?, config, rng)
    }

    pub fn side(&self) -> usize {
        self.side
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.side || y as usize >= self.side {
            return None;
        }
        Some(y as usize * self.side + x as usize)
    }

    /// Out-of-range coordinates count as walls.
    pub fn is_open(&self, x: i32, y: i32) -> bool {
        self.cell(Vec2::new(x, y)).is_some()
    }

    pub fn is_open_at(&self, pos: Vec2) -> bool {
        self.is_open(pos.x, pos.y)
    }

    pub fn cell(&self, pos: Vec2) -> Option<&Cell> {
        self.index(pos.x, pos.y)
            .and_then(|idx| self.cells.get(idx))
            .and_then(|cell| cell.as_ref())
    }

    fn cell_mut(&mut self, pos: Vec2) -> Option<&mut Cell> {
        let idx = self.index(pos.x, pos.y)?;
        self.cells.get_mut(idx).and_then(|cell| cell.as_mut())
    }

    pub fn open_cells(&self) -> &[Vec2] {
        &self.open_cells
    }

    pub fn random_open_cell(&self, rng: &mut Rng) -> Vec2 {
        // Spawns are forced open, so the list is never empty.
        self.open_cells[rng.pick_index(self.open_cells.len())]
    }

    pub fn player_spawns(&self) -> &[Vec2] {
        &self.player_spawns
    }

    pub fn enemy_spawns(&self) -> &[Vec2] {
        &self.enemy_spawns
    }

    /// Open 4-neighbours, in `Direction::ALL` order, tagged with the move
    /// that reaches them.
    pub fn neighbors(&self, pos: Vec2) -> impl Iterator<Item = (Direction, Vec2)> + '_ {
        Direction::ALL.into_iter().filter_map(move |dir| {
            let next = pos.step(dir);
            self.is_open_at(next).then_some((dir, next))
        })
    }

    pub fn reset_dots(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.collected = false;
        }
    }

    /// Marks the cell collected; returns what it was worth the first time only.
    pub fn collect(&mut self, pos: Vec2) -> Option<Collected> {
        let cell = self.cell_mut(pos)?;
        if cell.collected {
            return None;
        }
        cell.collected = true;
        Some(Collected {
            points: cell.point_value,
            power: cell.is_power_node,
        })
    }

    pub fn remaining_dots(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| !cell.collected)
            .count()
    }

    pub fn to_world_init(&self) -> WorldInit {
        let tiles = (0..self.side as i32)
            .map(|y| {
                (0..self.side as i32)
                    .map(|x| if self.is_open(x, y) { '.' } else { WALL_CHAR })
                    .collect::<String>()
            })
            .collect();
        let dots = self
            .cells
            .iter()
            .flatten()
            .filter(|cell| !cell.collected)
            .map(|cell| DotView {
                x: cell.pos.x,
                y: cell.pos.y,
                power: cell.is_power_node,
            })
            .collect();
        WorldInit {
            side: self.side,
            tiles,
            dots,
        }
    }
}
