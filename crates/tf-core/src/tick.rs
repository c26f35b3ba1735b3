//! Display tick cadence.
//!
//! While any timer runs, the display updates once per tick and the period
//! summary is recomputed every few ticks.

/// Default number of ticks between summary refreshes.
pub const DEFAULT_REFRESH_EVERY: u32 = 5;

/// What a tick should update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Redraw running clocks only.
    Display,
    /// Redraw clocks and recompute the summary.
    DisplayAndRefresh,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSchedule {
    refresh_every: u32,
    counter: u32,
}

impl Default for TickSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_EVERY)
    }
}

impl TickSchedule {
    /// A schedule refreshing every `refresh_every` ticks (at least 1).
    pub fn new(refresh_every: u32) -> Self {
        Self {
            refresh_every: refresh_every.max(1),
            counter: 0,
        }
    }

    /// Advances one tick.
    pub const fn tick(&mut self) -> Tick {
        self.counter += 1;
        if self.counter >= self.refresh_every {
            self.counter = 0;
            Tick::DisplayAndRefresh
        } else {
            Tick::Display
        }
    }

    /// Restarts the cadence, e.g. after the tick was switched off.
    pub const fn reset(&mut self) {
        self.counter = 0;
    }
}
