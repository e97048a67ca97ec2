//! Fixed-interval reconnect timer for network streams.
//!
//! Retries are unbounded: a stream that never comes back keeps the watcher
//! ticking until the session stops.

use std::time::{Duration, Instant};

use crate::platform::{TimerId, TimerScheduler};

pub const RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectState {
    pub attempt_count: u32,
    pub last_attempt: Option<Instant>,
    pub interval: Duration,
}

impl ReconnectState {
    fn new(interval: Duration) -> Self {
        Self {
            attempt_count: 0,
            last_attempt: None,
            interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReconnectWatcher {
    #[default]
    Disarmed,
    Armed { timer: TimerId, state: ReconnectState },
}

impl ReconnectWatcher {
    /// Arms the timer unless it is already running. Returns `true` when a new
    /// timer was created.
    pub fn arm<T>(&mut self, timers: &mut T, interval: Duration) -> Result<bool, String>
    where
        T: TimerScheduler + ?Sized,
    {
        if self.is_armed() {
            return Ok(false);
        }

        let timer = timers.arm_timer(interval)?;
        *self = Self::Armed {
            timer,
            state: ReconnectState::new(interval),
        };
        Ok(true)
    }

    /// Records a tick if it belongs to this watcher. The caller performs the
    /// actual reconnect attempt when this returns `true`.
    pub fn on_tick(&mut self, id: TimerId, now: Instant) -> bool {
        match self {
            Self::Armed { timer, state } if *timer == id => {
                state.attempt_count += 1;
                state.last_attempt = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn disarm<T>(&mut self, timers: &mut T) -> Option<ReconnectState>
    where
        T: TimerScheduler + ?Sized,
    {
        match std::mem::take(self) {
            Self::Armed { timer, state } => {
                timers.disarm_timer(timer);
                Some(state)
            }
            Self::Disarmed => None,
        }
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, Self::Armed { .. })
    }

    pub fn state(&self) -> Option<&ReconnectState> {
        match self {
            Self::Armed { state, .. } => Some(state),
            Self::Disarmed => None,
        }
    }

    pub fn timer(&self) -> Option<TimerId> {
        match self {
            Self::Armed { timer, .. } => Some(*timer),
            Self::Disarmed => None,
        }
    }
}
