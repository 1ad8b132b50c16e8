use tracing::info;

use super::*;

impl GameEngine {
    pub(super) fn spawn_initial_ghosts(&mut self) {
        for _ in 0..self.config.ghost_count {
            let id = self.make_id("ghost");
            self.ghosts.push(GhostInternal {
                id,
                motion: Motion::at_cell(self.map.enemy_spawns()[0]),
                dir: None,
                mode: GhostMode::Wandering { target: None },
                move_queue: VecDeque::new(),
                decision_armed: true,
            });
        }
    }

    /// Resets the score and the board and starts level 1.
    pub fn start_round(&mut self) {
        self.map.reset_dots();
        self.score = 0;
        self.level = 1;
        self.stats = RoundStats::default();
        self.finished = None;
        self.power_remaining_ms = None;
        self.spawn_entities();
        self.controls.reset_for_round();
        self.phase = GamePhase::Running;
        self.controls.publish_phase(self.phase);

        self.events.push(RuntimeEvent::RoundStarted { level: self.level });
        self.events.push(RuntimeEvent::ScoreChanged {
            score: self.score,
            high_score: self.high_score,
        });
        info!(
            high_score = self.high_score,
            ghosts = self.ghosts.len(),
            "round started"
        );
    }

    /// Puts the player and every ghost back on a spawn cell of their kind.
    /// The cells they land on give up their dots without scoring.
    pub(super) fn spawn_entities(&mut self) {
        let player_spawn = self.pick_spawn(self.map.player_spawns().to_vec());
        self.player = PlayerInternal::at_cell(player_spawn);
        self.map.collect(player_spawn);

        for idx in 0..self.ghosts.len() {
            self.respawn_ghost(idx);
        }
    }

    pub(super) fn respawn_ghost(&mut self, ghost_idx: usize) {
        let spawn = self.pick_spawn(self.map.enemy_spawns().to_vec());
        self.map.collect(spawn);
        let ghost = &mut self.ghosts[ghost_idx];
        ghost.motion = Motion::at_cell(spawn);
        ghost.dir = None;
        ghost.mode = GhostMode::Wandering { target: None };
        ghost.move_queue.clear();
        ghost.decision_armed = true;
    }

    pub(super) fn pick_spawn(&mut self, candidates: Vec<Vec2>) -> Vec2 {
        // Map construction rejects layouts without spawns of either kind.
        match self.rng.pick(&candidates) {
            Some(spawn) => *spawn,
            None => self.map.random_open_cell(&mut self.rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::GameEngine;
    use crate::types::{GameConfig, Vec2};
    use crate::world::parse_layout;

    #[test]
    fn ghosts_get_distinct_ids_and_enemy_spawns() {
        let source = parse_layout(&["P...", "....", "G..G", "...."]).expect("layout parses");
        let config = GameConfig {
            ghost_count: 5,
            power_node_chance: 0.0,
            ..GameConfig::default()
        };
        let mut engine = GameEngine::new(source, config, 12, 0).expect("engine builds");
        engine.start_round();

        let snapshot = engine.build_snapshot(false);
        assert_eq!(snapshot.ghosts.len(), 5);
        let mut ids: Vec<_> = snapshot.ghosts.iter().map(|ghost| ghost.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        for ghost in &snapshot.ghosts {
            let cell = Vec2::new(ghost.x.floor() as i32, ghost.y.floor() as i32);
            assert!(engine.map().enemy_spawns().contains(&cell));
        }
        assert_eq!(engine.player_cell(), Vec2::new(0, 0));
    }

    #[test]
    fn restarting_resets_score_and_level() {
        let source = parse_layout(&["P..", "...", "..G"]).expect("layout parses");
        let mut engine =
            GameEngine::new(source, GameConfig::default(), 4, 0).expect("engine builds");
        engine.start_round();
        engine.add_score(9);
        engine.level = 3;
        engine.start_round();
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.high_score(), 9);
    }
}
