//! Cancellable timers for the session loop.
//!
//! Both timers are plain values owned by the session. Their `async` waits are
//! meant to sit in a `tokio::select!` branch and pend forever while disarmed,
//! so a stopped timer can never fire late.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// Rolling deadline. Re-arming pushes the deadline out; it never stacks.
#[derive(Debug)]
pub struct Watchdog {
    window: Duration,
    deadline: Option<Instant>,
}

impl Watchdog {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Start or restart the window from now.
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves when the deadline passes. Pends forever while disarmed.
    ///
    /// Does not disarm; the caller decides what firing means.
    pub async fn expired(&self) {
        sleep_until(self.deadline).await
    }
}

/// Once-per-second countdown that stops itself at zero.
#[derive(Debug, Default)]
pub struct Countdown {
    remaining: u8,
    interval: Option<Interval>,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down from `seconds`.
    ///
    /// Returns false, and leaves the running timer alone, if already running.
    pub fn start(&mut self, seconds: u8) -> bool {
        if self.interval.is_some() {
            return false;
        }
        let period = Duration::from_secs(1);
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.remaining = seconds;
        self.interval = Some(interval);
        true
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    /// Wait for the next tick. Pends forever while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }

    /// Apply one tick. Stops the countdown when it reaches zero.
    ///
    /// Returns the seconds left.
    pub fn on_tick(&mut self) -> u8 {
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.stop();
        }
        self.remaining
    }
}

/// `sleep_until` that never resolves for `None`.
pub async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_fires_after_window() {
        let mut dog = Watchdog::new(Duration::from_secs(15));
        dog.arm();
        let start = Instant::now();
        dog.expired().await;
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_watchdog_rearm_extends() {
        let mut dog = Watchdog::new(Duration::from_secs(15));
        dog.arm();
        let first = dog.deadline().unwrap();
        time::advance(Duration::from_secs(10)).await;
        dog.arm();
        assert_eq!(dog.deadline().unwrap() - first, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_watchdog_never_fires() {
        let mut dog = Watchdog::new(Duration::from_secs(1));
        dog.arm();
        dog.disarm();
        let fired = time::timeout(Duration::from_secs(60), dog.expired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_runs_to_zero() {
        let mut countdown = Countdown::new();
        assert!(countdown.start(5));
        let start = Instant::now();

        let mut seen = Vec::new();
        while countdown.is_running() {
            countdown.tick().await;
            seen.push(countdown.on_tick());
        }
        assert_eq!(seen, vec![4, 3, 2, 1, 0]);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_restart_is_noop() {
        let mut countdown = Countdown::new();
        assert!(countdown.start(5));
        countdown.tick().await;
        countdown.on_tick();
        assert!(!countdown.start(5));
        assert_eq!(countdown.remaining(), 4);
    }
}
