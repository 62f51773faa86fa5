//! Cooldown gate
//!
//! Suppresses volume and playback commands for a fixed window after a
//! playback command fires. The gate is process-wide: a command on one device
//! blocks commands on every device until the window expires.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Default cooldown window (milliseconds)
pub const DEFAULT_COOLDOWN_MS: u64 = 2500;

/// Global timestamp gate shared by every volume/playback path
#[derive(Clone)]
pub struct CooldownGate {
    window: Duration,
    /// When the last playback command fired (None until the first one)
    last_fired: Arc<Mutex<Option<Instant>>>,
}

impl CooldownGate {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: Arc::new(Mutex::new(None)),
        }
    }

    /// True iff `now - last_fired < window`
    pub fn is_blocked(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left until the gate opens, if it is currently closed
    pub fn remaining(&self) -> Option<Duration> {
        let last = (*self.last_fired.lock())?;
        let elapsed = Instant::now().saturating_duration_since(last);
        if elapsed < self.window {
            Some(self.window - elapsed)
        } else {
            None
        }
    }

    /// Check and restart the window in one step
    ///
    /// Returns false (and leaves the timestamp alone) while the gate is
    /// closed. Of several concurrent callers at most one wins per window.
    pub fn try_fire(&self) -> bool {
        let mut last = self.last_fired.lock();
        let now = Instant::now();
        if let Some(at) = *last {
            if now.saturating_duration_since(at) < self.window {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    /// Restart the window from now
    pub fn mark_fired(&self) {
        *self.last_fired.lock() = Some(Instant::now());
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_COOLDOWN_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::advance;

    #[tokio::test(start_paused = true)]
    async fn test_open_until_first_fire() {
        let gate = CooldownGate::default();
        assert!(!gate.is_blocked());
        assert_eq!(gate.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocks_inside_window_only() {
        let gate = CooldownGate::new(Duration::from_millis(2500));
        gate.mark_fired();
        assert!(gate.is_blocked());

        advance(Duration::from_millis(2499)).await;
        assert!(gate.is_blocked());
        assert_eq!(gate.remaining(), Some(Duration::from_millis(1)));

        advance(Duration::from_millis(1)).await;
        assert!(!gate.is_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_fired_restarts_window() {
        let gate = CooldownGate::new(Duration::from_millis(100));
        gate.mark_fired();
        advance(Duration::from_millis(80)).await;
        gate.mark_fired();
        advance(Duration::from_millis(80)).await;
        assert!(gate.is_blocked());
        advance(Duration::from_millis(20)).await;
        assert!(!gate.is_blocked());
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_fire_claims_window_once() {
        let gate = CooldownGate::new(Duration::from_millis(2500));
        assert!(gate.try_fire());
        assert!(!gate.try_fire());
        assert!(gate.is_blocked());

        // A rejected attempt does not extend the window
        advance(Duration::from_millis(2500)).await;
        assert!(gate.try_fire());
    }

    #[test]
    fn test_try_fire_single_winner_across_threads() {
        let gate = CooldownGate::default();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                std::thread::spawn(move || gate.try_fire())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_share_state() {
        let gate = CooldownGate::default();
        let other = gate.clone();
        other.mark_fired();
        assert!(gate.is_blocked());
    }
}
