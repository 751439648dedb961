// src/timer.rs
use std::time::Duration;

use crate::records::TimerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Rest-interval countdown between sets. Time is fed in through `tick`, so the
/// caller owns the clock; dropping the timer cancels it.
#[derive(Debug, Clone)]
pub struct RestTimer {
    duration: Duration,
    remaining: Duration,
    state: TimerState,
}

impl RestTimer {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            remaining: duration,
            state: TimerState::Idle,
        }
    }

    #[must_use]
    pub fn from_settings(settings: TimerSettings) -> Self {
        Self::new(Duration::from_secs(u64::from(settings.default_duration)))
    }

    pub fn start(&mut self) {
        if self.remaining.is_zero() {
            self.state = TimerState::Finished;
        } else {
            self.state = TimerState::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.state == TimerState::Running {
            self.state = TimerState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == TimerState::Paused {
            self.state = TimerState::Running;
        }
    }

    /// Advances the countdown. Returns `true` on the tick that finishes it.
    pub fn tick(&mut self, elapsed: Duration) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(elapsed);
        if self.remaining.is_zero() {
            self.state = TimerState::Finished;
            return true;
        }
        false
    }

    /// Extends (or, with a negative value, shortens) the current countdown.
    pub fn add_seconds(&mut self, seconds: i64) {
        let delta = Duration::from_secs(seconds.unsigned_abs());
        self.remaining = if seconds >= 0 {
            self.remaining + delta
        } else {
            self.remaining.saturating_sub(delta)
        };
        if self.remaining.is_zero() && self.state == TimerState::Running {
            self.state = TimerState::Finished;
        } else if !self.remaining.is_zero() && self.state == TimerState::Finished {
            self.state = TimerState::Running;
        }
    }

    pub fn reset(&mut self) {
        self.remaining = self.duration;
        self.state = TimerState::Idle;
    }

    pub const fn remaining(&self) -> Duration {
        self.remaining
    }

    pub const fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == TimerState::Finished
    }
}
