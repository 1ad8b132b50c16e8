use crate::types::{Direction, Vec2};
use crate::world::GridMap;

/// Continuous position in tile units; the centre of cell (x, y) is (x + 0.5, y + 0.5).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Moved,
    Blocked,
}

impl Motion {
    pub fn at_cell(cell: Vec2) -> Self {
        Self {
            x: cell.x as f64 + 0.5,
            y: cell.y as f64 + 0.5,
        }
    }

    pub fn cell(&self) -> Vec2 {
        Vec2::new(self.x.floor() as i32, self.y.floor() as i32)
    }

    /// Sub-tile offset in [0, 1) on both axes.
    pub fn offset(&self) -> (f64, f64) {
        (self.x - self.x.floor(), self.y - self.y.floor())
    }

    pub fn at_center(&self, tolerance: f64) -> bool {
        let (ox, oy) = self.offset();
        (ox - 0.5).abs() < tolerance && (oy - 0.5).abs() < tolerance
    }

    pub fn recenter(&mut self) {
        *self = Self::at_cell(self.cell());
    }

    /// Moves `speed` tiles along `dir`. The step is refused (and the entity
    /// snapped to its cell centre) when the next cell is closed and the
    /// centre has already been reached. A step that would jump past the
    /// centre band lands on the centre instead.
    pub fn advance(&mut self, map: &GridMap, dir: Direction, speed: f64, tolerance: f64) -> Step {
        let cell = self.cell();
        let (ox, oy) = self.offset();
        let along = if dir.is_horizontal() { ox } else { oy };
        let before_center = match dir {
            Direction::Up | Direction::Left => along > 0.5,
            Direction::Down | Direction::Right => along < 0.5,
        };

        if !before_center && !map.is_open_at(cell.step(dir)) {
            self.recenter();
            return Step::Blocked;
        }

        let (dx, dy) = dir.delta();
        self.x += dx as f64 * speed;
        self.y += dy as f64 * speed;

        if before_center {
            let next_along = along + (dx + dy) as f64 * speed;
            let overshoot = match dir {
                Direction::Up | Direction::Left => next_along < 0.5 - tolerance,
                Direction::Down | Direction::Right => next_along > 0.5 + tolerance,
            };
            if overshoot {
                if dir.is_horizontal() {
                    self.x = cell.x as f64 + 0.5;
                } else {
                    self.y = cell.y as f64 + 0.5;
                }
            }
        }
        Step::Moved
    }

    pub fn distance_axes(&self, other: &Motion) -> (f64, f64) {
        ((self.x - other.x).abs(), (self.y - other.y).abs())
    }
}
