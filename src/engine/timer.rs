//! Per-card countdown.
//!
//! The countdown is keyed by card id and must be cancelled by any manual
//! answer, so an expiry can never land on a card that has already moved on.

use std::time::{Duration, Instant};

/// Seconds left at which the countdown is shown as urgent.
pub const WARNING_SECS: u64 = 5;

#[derive(Debug, Clone)]
struct Countdown {
    card_id: String,
    started_at: Instant,
    duration: Duration,
}

/// A countdown that ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expiry {
    pub card_id: String,
    pub elapsed_secs: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CardTimer {
    armed: Option<Countdown>,
}

impl CardTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown for `card_id`, replacing any previous one.
    pub fn arm(&mut self, card_id: &str, duration: Duration, now: Instant) {
        self.armed = Some(Countdown {
            card_id: card_id.to_string(),
            started_at: now,
            duration,
        });
    }

    /// Drop the countdown. Returns the card it was armed for.
    pub fn cancel(&mut self) -> Option<String> {
        self.armed.take().map(|c| c.card_id)
    }

    pub fn armed_for(&self) -> Option<&str> {
        self.armed.as_ref().map(|c| c.card_id.as_str())
    }

    /// Fires once when the deadline has passed, then disarms.
    pub fn poll(&mut self, now: Instant) -> Option<Expiry> {
        let countdown = self.armed.as_ref()?;
        if now.saturating_duration_since(countdown.started_at) < countdown.duration {
            return None;
        }

        let countdown = self.armed.take()?;
        Some(Expiry {
            card_id: countdown.card_id,
            elapsed_secs: countdown.duration.as_secs() as u32,
        })
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.armed.as_ref().map(|c| {
            c.duration
                .saturating_sub(now.saturating_duration_since(c.started_at))
        })
    }

    pub fn is_warning(&self, now: Instant) -> bool {
        self.remaining(now)
            .map_or(false, |left| left.as_secs() < WARNING_SECS)
    }

    /// Whole seconds since the countdown for `card_id` started.
    pub fn elapsed_secs(&self, card_id: &str, now: Instant) -> u32 {
        match &self.armed {
            Some(c) if c.card_id == card_id => {
                now.saturating_duration_since(c.started_at)
                    .min(c.duration)
                    .as_secs() as u32
            }
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_once_after_deadline() {
        let start = Instant::now();
        let mut timer = CardTimer::new();
        timer.arm("m1", Duration::from_secs(20), start);

        assert!(timer.poll(start + Duration::from_secs(19)).is_none());
        assert_eq!(
            timer.poll(start + Duration::from_secs(20)),
            Some(Expiry { card_id: "m1".into(), elapsed_secs: 20 })
        );
        assert!(timer.poll(start + Duration::from_secs(40)).is_none());
        assert!(timer.armed_for().is_none());
    }

    #[test]
    fn test_cancel_prevents_expiry() {
        let start = Instant::now();
        let mut timer = CardTimer::new();
        timer.arm("s2", Duration::from_secs(3), start);

        assert_eq!(timer.cancel(), Some("s2".to_string()));
        assert!(timer.poll(start + Duration::from_secs(10)).is_none());
    }

    #[test]
    fn test_rearm_replaces_card() {
        let start = Instant::now();
        let mut timer = CardTimer::new();
        timer.arm("a", Duration::from_secs(5), start);
        timer.arm("b", Duration::from_secs(5), start + Duration::from_secs(4));

        assert!(timer.poll(start + Duration::from_secs(6)).is_none());
        assert_eq!(timer.armed_for(), Some("b"));
    }

    #[test]
    fn test_elapsed_and_warning() {
        let start = Instant::now();
        let mut timer = CardTimer::new();
        timer.arm("g4", Duration::from_secs(20), start);

        let later = start + Duration::from_secs(16);
        assert_eq!(timer.elapsed_secs("g4", later), 16);
        assert_eq!(timer.elapsed_secs("other", later), 0);
        assert!(timer.is_warning(later));
        assert!(!timer.is_warning(start + Duration::from_secs(2)));
        assert_eq!(timer.remaining(later), Some(Duration::from_secs(4)));
    }
}
