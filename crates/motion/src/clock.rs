use serde::{Deserialize, Serialize};
use tracing::debug;

/// The world's game tick counter. Piston budgets are keyed by its value.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameClock {
    tick: u64,
}

impl GameClock {
    #[must_use]
    pub const fn new() -> Self {
        Self { tick: 0 }
    }

    #[must_use]
    pub const fn now(&self) -> u64 {
        self.tick
    }

    /// Moves to the next tick and returns it.
    pub const fn advance(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Called when a world is (re)loaded.
    pub fn reset(&mut self) {
        debug!(from = self.tick, "resetting game clock");
        self.tick = 0;
    }
}
