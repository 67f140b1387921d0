//! Configuration for the queue engine.

use std::time::Duration;

/// Default channel capacity when none is given.
pub(crate) const DEFAULT_CAPACITY: usize = 64;

/// Default promoter sleep between empty overflow scans.
pub(crate) const DEFAULT_PROMOTER_IDLE_DELAY: Duration = Duration::from_secs(1);

/// Configuration for a [`Queue`](crate::Queue).
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Capacity of the in-memory hand-off channel. `0` means every enqueue
    /// spills to the overflow tier.
    pub capacity: usize,
    /// How long the promoter sleeps when the overflow tier is empty or a
    /// store operation needs to be retried.
    pub promoter_idle_delay: Duration,
    /// Upper bound on items replayed into the channel at startup.
    /// `None` means recover up to `capacity`; the effective bound is always
    /// clamped to `capacity` so recovery cannot overfill the channel.
    pub recovery_limit: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            promoter_idle_delay: DEFAULT_PROMOTER_IDLE_DELAY,
            recovery_limit: None,
        }
    }
}

impl QueueConfig {
    /// Number of default-tier items to replay into the channel at startup.
    pub(crate) fn effective_recovery_limit(&self) -> usize {
        self.recovery_limit
            .unwrap_or(self.capacity)
            .min(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.capacity, 64);
        assert_eq!(config.promoter_idle_delay, Duration::from_secs(1));
        assert!(config.recovery_limit.is_none());
    }

    #[test]
    fn test_recovery_limit_clamped_to_capacity() {
        let config = QueueConfig {
            capacity: 4,
            recovery_limit: Some(100),
            ..Default::default()
        };
        assert_eq!(config.effective_recovery_limit(), 4);

        let config = QueueConfig {
            capacity: 4,
            recovery_limit: Some(2),
            ..Default::default()
        };
        assert_eq!(config.effective_recovery_limit(), 2);

        let config = QueueConfig {
            capacity: 0,
            recovery_limit: None,
            ..Default::default()
        };
        assert_eq!(config.effective_recovery_limit(), 0);
    }
}
