//! Reconnection policy and connection lifecycle states

use std::time::Duration;

use rand::Rng;

/// Lifecycle of one live room connection.
///
/// Steady state cycles `Connecting -> Open -> BackingOff -> Connecting`;
/// `Closed` is terminal (explicit close or retry ceiling reached).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Establishing the transport
    Connecting,
    /// Stream is live and dispatching events
    Open,
    /// Waiting out the backoff delay before the next attempt
    BackingOff,
    /// Permanently closed
    Closed,
}

/// Exponential backoff configuration for reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay between reconnection attempts.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub multiplier: f64,
    /// Fraction of each delay randomized (+/-) so a fleet of clients does not
    /// reconnect in lockstep. Zero disables jitter.
    pub jitter: f64,
    /// Maximum number of retries after a failure (None = unlimited).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.15,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// The deterministic delay for a given attempt number (0-indexed),
    /// before jitter.
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis() as f64) as u64)
    }

    /// The jittered delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.base_delay_for_attempt(attempt).as_millis() as f64;
        let spread = base * self.jitter;
        if spread <= 0.0 {
            return Duration::from_millis(base as u64);
        }
        let jittered = base + rand::thread_rng().gen_range(-spread..=spread);
        Duration::from_millis(jittered.max(0.0) as u64)
    }

    /// True once `attempt` retries have been spent
    pub fn exhausted(&self, attempt: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempt >= max)
    }
}
