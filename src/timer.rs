/// Non-blocking countdown, advanced by the main loop tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CountDownTimer {
    remaining_ms: u32,
}

impl CountDownTimer {
    pub const fn new(target_ms: u32) -> CountDownTimer {
        Self { remaining_ms: target_ms }
    }

    /// A timer that is already finished
    pub const fn finished() -> CountDownTimer {
        Self::new(0)
    }

    /// Advance the timer by `elapsed_ms`. Saturates at zero.
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed_ms);
    }

    pub fn set_time(&mut self, ms: u32) {
        self.remaining_ms = ms;
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    pub fn is_finished(&self) -> bool {
        self.remaining_ms == 0
    }
}
