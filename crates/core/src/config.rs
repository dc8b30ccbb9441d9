//! Tester timing and fixture settings.

use crate::hal::Level;
use crate::{DEBOUNCE_MS, POLL_MS, SETTLE_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TesterConfig {
    /// Wait after driving a stimulus before sampling, in ms
    pub settle_ms: u32,
    /// Gap between the two button samples, in ms
    pub debounce_ms: u32,
    /// Idle loop interval, in ms
    pub poll_ms: u32,
    /// Floating socket inputs read high
    pub idle_level_high: bool,
}

impl TesterConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms as u64)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms as u64)
    }

    pub fn poll(&self) -> Duration {
        Duration::from_millis(self.poll_ms as u64)
    }

    pub fn idle_level(&self) -> Level {
        Level::from(self.idle_level_high)
    }
}

impl Default for TesterConfig {
    fn default() -> Self {
        TesterConfig {
            settle_ms: SETTLE_MS,
            debounce_ms: DEBOUNCE_MS,
            poll_ms: POLL_MS,
            idle_level_high: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixture_timing() {
        let c = TesterConfig::default();
        assert_eq!(c.settle(), Duration::from_millis(20));
        assert_eq!(c.debounce(), Duration::from_millis(50));
        assert_eq!(c.poll(), Duration::from_millis(10));
        assert_eq!(c.idle_level(), Level::High);
    }
}
