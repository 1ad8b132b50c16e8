use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::types::{Direction, GamePhase, Key};

const NO_DIRECTION: u8 = 0;

fn encode_dir(dir: Option<Direction>) -> u8 {
    match dir {
        None => NO_DIRECTION,
        Some(Direction::Up) => 1,
        Some(Direction::Down) => 2,
        Some(Direction::Left) => 3,
        Some(Direction::Right) => 4,
    }
}

fn decode_dir(code: u8) -> Option<Direction> {
    match code {
        1 => Some(Direction::Up),
        2 => Some(Direction::Down),
        3 => Some(Direction::Left),
        4 => Some(Direction::Right),
        _ => None,
    }
}

fn encode_phase(phase: GamePhase) -> u8 {
    match phase {
        GamePhase::Idle => 0,
        GamePhase::Running => 1,
        GamePhase::Paused => 2,
        GamePhase::GameOver => 3,
    }
}

fn decode_phase(code: u8) -> GamePhase {
    match code {
        1 => GamePhase::Running,
        2 => GamePhase::Paused,
        3 => GamePhase::GameOver,
        _ => GamePhase::Idle,
    }
}

#[derive(Debug)]
pub struct Controls {
    heading: AtomicU8,
    queued: AtomicU8,
    pause_requested: AtomicBool,
    start_requested: AtomicBool,
    phase: AtomicU8,
}

impl Default for Controls {
    fn default() -> Self {
        Self::new()
    }
}

impl Controls {
    pub fn new() -> Self {
        Self {
            heading: AtomicU8::new(NO_DIRECTION),
            queued: AtomicU8::new(NO_DIRECTION),
            pause_requested: AtomicBool::new(false),
            start_requested: AtomicBool::new(false),
            phase: AtomicU8::new(encode_phase(GamePhase::Idle)),
        }
    }

    /// Outside a round any key asks for a new one; while paused any key resumes.
    pub fn press(&self, key: Key) {
        match self.phase() {
            GamePhase::Idle | GamePhase::GameOver => {
                self.start_requested.store(true, Ordering::Release);
            }
            GamePhase::Paused => {
                self.pause_requested.store(false, Ordering::Release);
            }
            GamePhase::Running => match key {
                Key::Pause => self.pause_requested.store(true, Ordering::Release),
                Key::Move(dir) => {
                    let heading = self.heading();
                    if heading == Some(dir) {
                        return;
                    }
                    if heading == Some(dir.opposite()) {
                        self.heading.store(encode_dir(Some(dir)), Ordering::Release);
                    } else {
                        self.queued.store(encode_dir(Some(dir)), Ordering::Release);
                    }
                }
            },
        }
    }

    pub fn heading(&self) -> Option<Direction> {
        decode_dir(self.heading.load(Ordering::Acquire))
    }

    pub fn queued(&self) -> Option<Direction> {
        decode_dir(self.queued.load(Ordering::Acquire))
    }

    pub fn phase(&self) -> GamePhase {
        decode_phase(self.phase.load(Ordering::Acquire))
    }

    pub fn pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::Acquire)
    }

    /// Promotes `dir` from the queue to the heading. Fails when the queue
    /// changed since it was read, so a press landing mid-tick is not lost.
    pub(crate) fn commit_queued(&self, dir: Direction) -> bool {
        let code = encode_dir(Some(dir));
        if self
            .queued
            .compare_exchange(code, NO_DIRECTION, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.heading.store(code, Ordering::Release);
        true
    }

    pub(crate) fn take_start_request(&self) -> bool {
        self.start_requested.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn publish_phase(&self, phase: GamePhase) {
        self.phase.store(encode_phase(phase), Ordering::Release);
    }

    pub(crate) fn clear_movement(&self) {
        self.heading.store(NO_DIRECTION, Ordering::Release);
        self.queued.store(NO_DIRECTION, Ordering::Release);
    }

    pub(crate) fn reset_for_round(&self) {
        self.clear_movement();
        self.pause_requested.store(false, Ordering::Release);
        self.start_requested.store(false, Ordering::Release);
    }

    #[cfg(test)]
    pub(crate) fn force_heading(&self, dir: Option<Direction>) {
        self.heading.store(encode_dir(dir), Ordering::Release);
    }
}
