//! Retry timing for the reconnect loop.

use std::time::Duration;

use rand::Rng;
use rosbridge_core::ReconnectConfig;

/// Strategy governing the delay before each reconnect attempt.
///
/// The session loop treats this as an opaque capability: it asks for the next
/// delay after every failed or lost connection and resets after a successful
/// handshake.
pub trait ReconnectPolicy: Send {
    /// Delay to wait before the next connect attempt.
    fn next_delay(&mut self) -> Duration;

    /// Called after a successful handshake so the delays start over.
    fn reset(&mut self);
}

/// Exponential backoff with jitter, parameterized from [`ReconnectConfig`].
pub struct ExponentialBackoff {
    config: ReconnectConfig,
    current_delay_ms: u64,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            current_delay_ms: config.initial_delay_ms,
            config,
            attempt: 0,
        }
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

impl ReconnectPolicy for ExponentialBackoff {
    fn next_delay(&mut self) -> Duration {
        self.attempt += 1;

        let base = if self.attempt == 1 {
            self.config.initial_delay_ms as f64
        } else {
            self.current_delay_ms as f64 * self.config.growth_factor
        };
        let capped = base.min(self.config.max_delay_ms as f64);

        // Jitter is clamped so the configured maximum bounds the final delay.
        let jitter_range = capped * self.config.jitter_factor;
        let delay = if jitter_range > 0.0 {
            (capped + rand::thread_rng().gen_range(-jitter_range..jitter_range))
                .min(self.config.max_delay_ms as f64)
        } else {
            capped
        };

        self.current_delay_ms = delay.max(1.0) as u64;
        Duration::from_millis(self.current_delay_ms)
    }

    fn reset(&mut self) {
        self.current_delay_ms = self.config.initial_delay_ms;
        self.attempt = 0;
    }
}
