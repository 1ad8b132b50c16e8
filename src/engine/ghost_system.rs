use tracing::debug;

use super::*;
use crate::constants::CENTER_TOLERANCE;

impl GameEngine {
    pub(super) fn update_ghosts(&mut self, dt_ms: u64) {
        let player_cell = self.player.motion.cell();
        for idx in 0..self.ghosts.len() {
            self.update_ghost(idx, player_cell, dt_ms);
        }
    }

    fn update_ghost(&mut self, idx: usize, player_cell: Vec2, dt_ms: u64) {
        let speed = match self.ghosts[idx].mode {
            GhostMode::Dead { .. } => {
                self.config.ghost_speed * self.config.dead_ghost_speed_multiplier
            }
            _ => self.config.ghost_speed,
        };

        let ghost = &mut self.ghosts[idx];
        match ghost.dir {
            Some(dir) => {
                if ghost.motion.advance(&self.map, dir, speed, CENTER_TOLERANCE) == Step::Blocked {
                    // A stale plan ran into a wall; re-plan from here.
                    ghost.decision_armed = true;
                }
            }
            None => ghost.decision_armed = true,
        }

        let cell = ghost.motion.cell();
        if ghost.motion.at_center(CENTER_TOLERANCE) {
            let hunting = matches!(
                ghost.mode,
                GhostMode::Wandering { .. } | GhostMode::Chasing { .. }
            );
            if ghost.decision_armed && !(hunting && cell == player_cell) {
                self.decide(idx, cell, player_cell);
            }
        } else {
            ghost.decision_armed = true;
        }

        self.update_tracking(idx, cell, player_cell, dt_ms);
    }

    fn decide(&mut self, idx: usize, cell: Vec2, player_cell: Vec2) {
        if let GhostMode::Dead { spawn } = self.ghosts[idx].mode {
            if cell == spawn {
                let ghost = &mut self.ghosts[idx];
                ghost.mode = GhostMode::Wandering { target: None };
                ghost.move_queue.clear();
                debug!(ghost = %ghost.id, "ghost revived");
                self.events.push(RuntimeEvent::GhostRevived {
                    ghost_id: ghost.id.clone(),
                });
            }
        }

        if self.ghosts[idx].move_queue.is_empty() {
            let target = self.pick_target(idx, cell, player_cell);
            let plan = find_path(&self.map, cell, target, self.config.pathfinding_iter_cap);
            let ghost = &mut self.ghosts[idx];
            // Chasing follows only the first few moves toward where the player
            // was, then plans again.
            let keep = match ghost.mode {
                GhostMode::Chasing { .. } => self.config.path_memory,
                _ => plan.moves.len(),
            };
            ghost.move_queue.extend(plan.moves.into_iter().take(keep));
            if !plan.reached_goal {
                debug!(
                    ghost = %ghost.id,
                    target_x = target.x,
                    target_y = target.y,
                    "ghost heading for best reachable cell"
                );
            }
        }

        let ghost = &mut self.ghosts[idx];
        ghost.dir = ghost.move_queue.pop_front();
        ghost.decision_armed = false;
        ghost.motion.recenter();
    }

    fn pick_target(&mut self, idx: usize, cell: Vec2, player_cell: Vec2) -> Vec2 {
        match self.ghosts[idx].mode {
            GhostMode::Dead { spawn } => spawn,
            GhostMode::Scared => self.pick_flee_target(player_cell),
            GhostMode::Chasing { .. } => player_cell,
            GhostMode::Wandering { target } => match target {
                Some(target) if target != cell => target,
                _ => {
                    let fresh = self.map.random_open_cell(&mut self.rng);
                    self.ghosts[idx].mode = GhostMode::Wandering {
                        target: Some(fresh),
                    };
                    fresh
                }
            },
        }
    }

    fn pick_flee_target(&mut self, player_cell: Vec2) -> Vec2 {
        let mut best = self.map.random_open_cell(&mut self.rng);
        for _ in 1..self.config.flee_samples {
            let candidate = self.map.random_open_cell(&mut self.rng);
            if candidate.manhattan(player_cell) > best.manhattan(player_cell) {
                best = candidate;
            }
        }
        best
    }

    fn update_tracking(&mut self, idx: usize, cell: Vec2, player_cell: Vec2, dt_ms: u64) {
        let tracking_time_ms = self.config.tracking_time_ms;
        let ghost = &mut self.ghosts[idx];

        if let GhostMode::Chasing { remaining_ms } = &mut ghost.mode {
            *remaining_ms = remaining_ms.saturating_sub(dt_ms);
            if *remaining_ms == 0 {
                ghost.mode = GhostMode::Wandering { target: None };
                debug!(ghost = %ghost.id, "ghost lost track of player");
            }
        }

        let hunting = matches!(
            ghost.mode,
            GhostMode::Wandering { .. } | GhostMode::Chasing { .. }
        );
        if !hunting || !player_in_view(&self.map, cell, player_cell) {
            return;
        }
        if matches!(ghost.mode, GhostMode::Wandering { .. }) {
            ghost.move_queue.clear();
            debug!(ghost = %ghost.id, "ghost spotted player");
        }
        ghost.mode = GhostMode::Chasing {
            remaining_ms: tracking_time_ms,
        };
    }

    pub(super) fn catch_ghost(&mut self, idx: usize) {
        let spawn = self.pick_spawn(self.map.enemy_spawns().to_vec());
        let ghost = &mut self.ghosts[idx];
        ghost.mode = GhostMode::Dead { spawn };
        ghost.move_queue.clear();
        let ghost_id = ghost.id.clone();
        self.stats.ghosts_caught += 1;
        debug!(ghost = %ghost_id, spawn_x = spawn.x, spawn_y = spawn.y, "ghost caught");
        self.events.push(RuntimeEvent::GhostCaught { ghost_id });
        self.add_score(self.config.ghost_catch_points);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use crate::constants::TICK_MS;
    use crate::engine::{find_path, GameEngine, GhostMode, Motion};
    use crate::types::{Direction, GameConfig, RuntimeEvent, Vec2};
    use crate::world::parse_layout;

    fn engine(rows: &[&str], config: GameConfig) -> GameEngine {
        let source = parse_layout(rows).expect("layout parses");
        let mut engine = GameEngine::new(source, config, 99, 0).expect("engine builds");
        engine.start_round();
        engine.build_snapshot(true);
        engine
    }

    fn one_ghost() -> GameConfig {
        GameConfig {
            power_node_chance: 0.0,
            ghost_count: 1,
            ..GameConfig::default()
        }
    }

    fn place_ghost(engine: &mut GameEngine, cell: Vec2, mode: GhostMode) {
        let ghost = &mut engine.ghosts[0];
        ghost.motion = Motion::at_cell(cell);
        ghost.dir = None;
        ghost.mode = mode;
        ghost.move_queue.clear();
        ghost.decision_armed = true;
    }

    const OPEN: [&str; 7] = [
        "P......",
        ".......",
        ".......",
        ".......",
        ".......",
        ".......",
        "......G",
    ];

    #[test]
    fn chasing_ghost_remembers_only_a_few_moves() {
        let mut engine = engine(&OPEN, one_ghost());
        engine.player.motion = Motion::at_cell(Vec2::new(0, 0));
        place_ghost(
            &mut engine,
            Vec2::new(6, 6),
            GhostMode::Chasing { remaining_ms: 10_000 },
        );
        engine.decide(0, Vec2::new(6, 6), Vec2::new(0, 0));

        let full = find_path(
            &engine.map,
            Vec2::new(6, 6),
            Vec2::new(0, 0),
            engine.config.pathfinding_iter_cap,
        );
        let memory = engine.config.path_memory;
        let head = &full.moves[..memory];

        let ghost = &engine.ghosts[0];
        assert_eq!(ghost.dir, Some(head[0]));
        assert_eq!(ghost.move_queue.len(), memory - 1);
        assert!(ghost.move_queue.iter().eq(head[1..].iter()));
        assert!(!ghost.decision_armed);
    }

    #[test]
    fn chasing_ghost_follows_the_player_around_a_corner() {
        let mut engine = engine(&["....P", ".####", ".####", ".####", "G####"], one_ghost());
        engine.player.motion = Motion::at_cell(Vec2::new(4, 0));
        place_ghost(
            &mut engine,
            Vec2::new(0, 4),
            GhostMode::Chasing { remaining_ms: 15_000 },
        );

        let mut visited = HashSet::new();
        for _ in 0..1_000 {
            engine.update_ghosts(TICK_MS);
            visited.insert(engine.ghosts[0].motion.cell());
        }

        assert!(visited.contains(&Vec2::new(0, 0)), "visited {visited:?}");
        assert_eq!(engine.ghosts[0].motion.cell(), Vec2::new(4, 0));
    }

    #[test]
    fn only_dead_ghosts_move_faster() {
        let config = one_ghost();
        let start = Vec2::new(3, 3);
        let modes = [
            (
                GhostMode::Dead {
                    spawn: Vec2::new(6, 6),
                },
                config.ghost_speed * config.dead_ghost_speed_multiplier,
            ),
            (GhostMode::Scared, config.ghost_speed),
            (GhostMode::Wandering { target: None }, config.ghost_speed),
        ];

        for (mode, expected) in modes {
            let mut engine = engine(&OPEN, config.clone());
            engine.player.motion = Motion::at_cell(Vec2::new(0, 0));
            place_ghost(&mut engine, start, mode.clone());
            engine.ghosts[0].dir = Some(Direction::Left);
            engine.ghosts[0].decision_armed = false;

            engine.update_ghosts(TICK_MS);

            let (dx, dy) = engine.ghosts[0]
                .motion
                .distance_axes(&Motion::at_cell(start));
            assert!((dx - expected).abs() < 1e-9, "{mode:?} moved {dx}");
            assert_eq!(dy, 0.0);
        }
    }

    #[test]
    fn wandering_ghost_keeps_the_whole_route() {
        let mut engine = engine(&OPEN, one_ghost());
        let target = Vec2::new(0, 6);
        place_ghost(
            &mut engine,
            Vec2::new(6, 6),
            GhostMode::Wandering {
                target: Some(target),
            },
        );
        engine.decide(0, Vec2::new(6, 6), Vec2::new(0, 0));
        let ghost = &engine.ghosts[0];
        assert_eq!(ghost.dir, Some(Direction::Left));
        assert_eq!(ghost.move_queue.len(), 5);
        assert_eq!(ghost.mode, GhostMode::Wandering { target: Some(target) });
    }

    #[test]
    fn wander_target_is_replaced_on_arrival() {
        let mut engine = engine(&OPEN, one_ghost());
        let here = Vec2::new(3, 3);
        place_ghost(&mut engine, here, GhostMode::Wandering { target: Some(here) });
        let target = engine.pick_target(0, here, Vec2::new(0, 0));
        assert_eq!(engine.ghosts[0].mode, GhostMode::Wandering { target: Some(target) });
        assert!(engine.map.is_open_at(target));
    }

    #[test]
    fn scared_ghost_flees_to_a_far_cell() {
        let mut engine = engine(&OPEN, one_ghost());
        place_ghost(&mut engine, Vec2::new(3, 3), GhostMode::Scared);
        let player = Vec2::new(0, 0);
        let mut total = 0;
        for _ in 0..50 {
            total += engine.pick_target(0, Vec2::new(3, 3), player).manhattan(player);
        }
        // A single random cell averages 6 away on this board.
        assert!(total / 50 > 6, "flee targets too close: average {}", total / 50);
    }

    #[test]
    fn sighting_starts_tracking_and_drops_wander_memory() {
        let mut engine = engine(&OPEN, one_ghost());
        place_ghost(&mut engine, Vec2::new(0, 5), GhostMode::Wandering { target: None });
        engine.ghosts[0]
            .move_queue
            .extend([Direction::Right, Direction::Right]);
        engine.update_tracking(0, Vec2::new(0, 5), Vec2::new(0, 0), TICK_MS);
        let ghost = &engine.ghosts[0];
        assert_eq!(
            ghost.mode,
            GhostMode::Chasing {
                remaining_ms: engine.config.tracking_time_ms
            }
        );
        assert!(ghost.move_queue.is_empty());
    }

    #[test]
    fn resighting_refreshes_tracking_but_keeps_memory() {
        let mut engine = engine(&OPEN, one_ghost());
        place_ghost(&mut engine, Vec2::new(0, 5), GhostMode::Chasing { remaining_ms: 40 });
        engine.ghosts[0].move_queue.push_back(Direction::Up);
        engine.update_tracking(0, Vec2::new(0, 5), Vec2::new(0, 0), TICK_MS);
        let ghost = &engine.ghosts[0];
        assert_eq!(
            ghost.mode,
            GhostMode::Chasing {
                remaining_ms: engine.config.tracking_time_ms
            }
        );
        assert_eq!(ghost.move_queue.len(), 1);
    }

    #[test]
    fn tracking_runs_out_without_sighting() {
        let mut engine = engine(&["P.#..", "..#..", "..#..", "..#..", "..#.G"], one_ghost());
        place_ghost(&mut engine, Vec2::new(4, 4), GhostMode::Chasing { remaining_ms: 25 });
        for _ in 0..3 {
            engine.update_tracking(0, Vec2::new(4, 4), Vec2::new(0, 0), TICK_MS);
        }
        assert_eq!(engine.ghosts[0].mode, GhostMode::Wandering { target: None });
    }

    #[test]
    fn scared_and_dead_ghosts_ignore_sightings() {
        let mut engine = engine(&OPEN, one_ghost());
        place_ghost(&mut engine, Vec2::new(0, 3), GhostMode::Scared);
        engine.update_tracking(0, Vec2::new(0, 3), Vec2::new(0, 0), TICK_MS);
        assert_eq!(engine.ghosts[0].mode, GhostMode::Scared);

        let dead = GhostMode::Dead {
            spawn: Vec2::new(6, 6),
        };
        place_ghost(&mut engine, Vec2::new(0, 3), dead.clone());
        engine.update_tracking(0, Vec2::new(0, 3), Vec2::new(0, 0), TICK_MS);
        assert_eq!(engine.ghosts[0].mode, dead);
    }

    #[test]
    fn dead_ghost_returns_home_and_revives() {
        let mut engine = engine(&OPEN, one_ghost());
        let spawn = Vec2::new(6, 6);
        place_ghost(&mut engine, Vec2::new(6, 2), GhostMode::Dead { spawn });
        engine.player.motion = Motion::at_cell(Vec2::new(0, 0));

        let mut revived = false;
        for _ in 0..400 {
            engine.update_ghosts(TICK_MS);
            if engine
                .build_snapshot(true)
                .events
                .iter()
                .any(|event| matches!(event, RuntimeEvent::GhostRevived { .. }))
            {
                revived = true;
                break;
            }
        }
        assert!(revived);
        assert_eq!(engine.ghosts[0].motion.cell(), spawn);
        assert!(matches!(engine.ghosts[0].mode, GhostMode::Wandering { .. }));
    }

    #[test]
    fn boxed_in_ghost_stays_put_without_panicking() {
        let mut engine = engine(&["P.#", "..#", "##G"], one_ghost());
        place_ghost(&mut engine, Vec2::new(2, 2), GhostMode::Chasing { remaining_ms: 1_000 });
        engine.player.motion = Motion::at_cell(Vec2::new(0, 0));
        for _ in 0..5 {
            engine.update_ghosts(TICK_MS);
            let ghost = &engine.ghosts[0];
            assert_eq!(ghost.dir, None);
            assert_eq!(ghost.motion, Motion::at_cell(Vec2::new(2, 2)));
        }
    }

    #[test]
    fn routes_never_cross_walls() {
        let config = GameConfig {
            power_node_chance: 0.0,
            ghost_count: 4,
            ..GameConfig::default()
        };
        let mut engine = engine(&crate::constants::DEFAULT_LAYOUT, config);
        for _ in 0..5_000 {
            engine.update_ghosts(TICK_MS);
            for ghost in &engine.ghosts {
                assert!(engine.map.is_open_at(ghost.motion.cell()));
            }
        }
    }
}
