//! Respawn policy for supervised roles.
//!
//! The default mirrors a "keep trying forever" supervisor: respawn
//! immediately, no backoff, no attempt limit. Tests and cautious deployments
//! can bound the loop with [`RestartPolicy::max_attempts`] or slow it down
//! with a growing delay.
//!
//! The delay before restart `n` (0-indexed) is `first × factor^n`, clamped to
//! `max`.

use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RestartPolicy {
    /// Delay before the first respawn.
    pub first: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Multiplicative growth per restart (`1.0` keeps the delay constant).
    pub factor: f64,
    /// Total launches allowed, `None` for unlimited.
    pub max_attempts: Option<u32>,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            first: Duration::ZERO,
            max: Duration::from_secs(30),
            factor: 1.0,
            max_attempts: None,
        }
    }
}

impl RestartPolicy {
    /// Whether launch number `attempt` (0-indexed) may go ahead.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }

    /// Delay to wait before restart `restart` (0-indexed).
    pub fn delay(&self, restart: u32) -> Duration {
        let max_secs = self.max.as_secs_f64();
        let exp = restart.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > max_secs {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}
