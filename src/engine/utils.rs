use crate::types::Vec2;
use crate::world::GridMap;

use super::motion::Motion;

/// True when both cells share a row or column and no wall lies strictly
/// between them.
pub fn player_in_view(map: &GridMap, from: Vec2, to: Vec2) -> bool {
    if from.x == to.x {
        let (lo, hi) = (from.y.min(to.y), from.y.max(to.y));
        ((lo + 1)..hi).all(|y| map.is_open(from.x, y))
    } else if from.y == to.y {
        let (lo, hi) = (from.x.min(to.x), from.x.max(to.x));
        ((lo + 1)..hi).all(|x| map.is_open(x, from.y))
    } else {
        false
    }
}

/// Contact test: same grid row or column, and the two bodies of `radius`
/// overlap on both axes.
pub fn entities_touch(a: &Motion, b: &Motion, radius: f64) -> bool {
    let (ca, cb) = (a.cell(), b.cell());
    if ca.x != cb.x && ca.y != cb.y {
        return false;
    }
    let (dx, dy) = a.distance_axes(b);
    dx <= radius * 2.0 && dy <= radius * 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ENTITY_RADIUS;
    use crate::rng::Rng;
    use crate::types::GameConfig;

    fn map() -> GridMap {
        let config = GameConfig {
            power_node_chance: 0.0,
            ..GameConfig::default()
        };
        GridMap::from_layout(
            &["P...G", ".#...", ".....", ".#.#.", "....."],
            &config,
            &mut Rng::new(1),
        )
        .expect("map builds")
    }

    #[test]
    fn clear_row_and_column_are_in_view() {
        let map = map();
        assert!(player_in_view(&map, Vec2::new(0, 0), Vec2::new(4, 0)));
        assert!(player_in_view(&map, Vec2::new(4, 0), Vec2::new(0, 0)));
        assert!(player_in_view(&map, Vec2::new(0, 0), Vec2::new(0, 4)));
        assert!(player_in_view(&map, Vec2::new(2, 2), Vec2::new(2, 2)));
        assert!(player_in_view(&map, Vec2::new(1, 2), Vec2::new(2, 2)));
    }

    #[test]
    fn wall_between_blocks_view() {
        let map = map();
        assert!(!player_in_view(&map, Vec2::new(1, 0), Vec2::new(1, 4)));
        assert!(!player_in_view(&map, Vec2::new(0, 3), Vec2::new(4, 3)));
        assert!(!player_in_view(&map, Vec2::new(2, 3), Vec2::new(4, 3)));
    }

    #[test]
    fn diagonal_is_never_in_view() {
        let map = map();
        assert!(!player_in_view(&map, Vec2::new(0, 0), Vec2::new(2, 2)));
    }

    #[test]
    fn touching_needs_shared_line_and_overlap() {
        let a = Motion { x: 1.5, y: 1.5 };
        assert!(entities_touch(&a, &Motion { x: 2.1, y: 1.5 }, ENTITY_RADIUS));
        assert!(!entities_touch(&a, &Motion { x: 2.3, y: 1.5 }, ENTITY_RADIUS));
        // Close, but diagonal cells.
        assert!(!entities_touch(&a, &Motion { x: 2.05, y: 2.05 }, ENTITY_RADIUS));
        assert!(entities_touch(&a, &a, ENTITY_RADIUS));
    }
}
