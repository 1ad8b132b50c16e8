use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::engine::GameEngine;

pub trait Ticker {
    fn tick(&mut self, dt_ms: u64);
}

impl Ticker for GameEngine {
    fn tick(&mut self, dt_ms: u64) {
        self.step(dt_ms);
    }
}

#[derive(Clone, Debug)]
pub struct VirtualClock {
    interval_ms: u64,
    ticks: u64,
}

impl VirtualClock {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            ticks: 0,
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn advance<T: Ticker>(&mut self, ticker: &mut T, ticks: u64) {
        for _ in 0..ticks {
            self.tick_once(ticker);
        }
    }

    fn tick_once<T: Ticker>(&mut self, ticker: &mut T) {
        ticker.tick(self.interval_ms);
        self.ticks += 1;
    }
}

/// Returning `ControlFlow::Break` from `after_tick` ends the task.
pub fn spawn_interval_driver<T, F>(mut ticker: T, interval_ms: u64, mut after_tick: F) -> JoinHandle<()>
where
    T: Ticker + Send + 'static,
    F: FnMut(&mut T) -> ControlFlow<()> + Send + 'static,
{
    let interval_ms = interval_ms.max(1);
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_millis(interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            ticker.tick(interval_ms);
            if after_tick(&mut ticker).is_break() {
                break;
            }
        }
    })
}
