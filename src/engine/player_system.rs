use tracing::debug;

use super::*;
use crate::constants::{CENTER_TOLERANCE, DOT_COLLECTION_MARGIN};

impl GameEngine {
    pub(super) fn update_player(&mut self) {
        if let Some(queued) = self.controls.queued() {
            self.try_turn(queued);
        }
        if let Some(dir) = self.controls.heading() {
            let step = self
                .player
                .motion
                .advance(&self.map, dir, self.config.player_speed, CENTER_TOLERANCE);
            let blocked = step == Step::Blocked;
            if blocked && !self.player.blocked {
                debug!(?dir, "player blocked");
            }
            self.player.blocked = blocked;
        }
        self.collect_under_player();
    }

    // A refused turn stays queued for the next centre.
    fn try_turn(&mut self, queued: Direction) {
        if !self.player.motion.at_center(CENTER_TOLERANCE) {
            return;
        }
        let cell = self.player.motion.cell();
        if !self.map.is_open_at(cell.step(queued)) {
            if self.player.denied_turn != Some(queued) {
                debug!(?queued, x = cell.x, y = cell.y, "queued move denied");
            }
            self.player.denied_turn = Some(queued);
            return;
        }
        self.player.denied_turn = None;
        if self.controls.commit_queued(queued) {
            self.player.motion.recenter();
        }
    }

    fn collect_under_player(&mut self) {
        let (ox, oy) = self.player.motion.offset();
        let inner = DOT_COLLECTION_MARGIN..=(1.0 - DOT_COLLECTION_MARGIN);
        if !inner.contains(&ox) || !inner.contains(&oy) {
            return;
        }
        let cell = self.player.motion.cell();
        let Some(collected) = self.map.collect(cell) else {
            return;
        };
        self.stats.dots += 1;
        self.events.push(RuntimeEvent::DotCollected {
            x: cell.x,
            y: cell.y,
            power: collected.power,
        });
        self.add_score(collected.points);
        if collected.power {
            self.enter_supermode();
        }
    }
}
