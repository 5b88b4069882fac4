//! Construction-time configuration for sources.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::report::{Reporter, SharedReporter, TracingReporter};

/// Exponential backoff applied by a generator after failed polls.
///
/// The delay after `n` consecutive errors is `min(max_backoff, multiplier × 2^n)`.
/// A zero `max_backoff` disables backoff entirely.
///
/// ```rust
/// use std::time::Duration;
/// use streamline::config::BackoffConfig;
///
/// let backoff = BackoffConfig::from_millis(100, 10);
/// assert_eq!(backoff.delay(1), Duration::from_millis(20));
/// assert_eq!(backoff.delay(2), Duration::from_millis(40));
/// assert_eq!(backoff.delay(4), Duration::from_millis(100));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BackoffConfig {
    /// Upper bound on a single delay; zero disables backoff
    pub max_backoff: Duration,
    /// The `m` in `m × 2^errors`
    pub multiplier: Duration,
}

impl BackoffConfig {
    pub const fn new(max_backoff: Duration, multiplier: Duration) -> Self {
        Self {
            max_backoff,
            multiplier,
        }
    }

    pub const fn from_millis(max_backoff: u64, multiplier: u64) -> Self {
        Self::new(
            Duration::from_millis(max_backoff),
            Duration::from_millis(multiplier),
        )
    }

    /// No delay between polls, whatever the error count.
    pub const fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// At most 10s, growing from 500ms after the first error.
    pub const fn standard() -> Self {
        Self::from_millis(10_000, 250)
    }

    /// Set the maximum delay
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.max_backoff = max_backoff;
        self
    }

    /// Set the multiplier
    pub fn with_multiplier(mut self, multiplier: Duration) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn is_disabled(&self) -> bool {
        self.max_backoff.is_zero()
    }

    /// Delay before the next poll after `consecutive_errors` failures in a row.
    pub fn delay(&self, consecutive_errors: u32) -> Duration {
        if self.is_disabled() || consecutive_errors == 0 {
            return Duration::ZERO;
        }
        1u32.checked_shl(consecutive_errors)
            .and_then(|factor| self.multiplier.checked_mul(factor))
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Settings shared by every source constructor.
#[derive(Clone)]
pub struct SourceConfig {
    /// Where the source reports diagnostics
    pub reporter: SharedReporter,
    /// Poll backoff; only generators use it
    pub backoff: BackoffConfig,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            reporter: Arc::new(TracingReporter::default()),
            backoff: BackoffConfig::none(),
        }
    }
}

impl fmt::Debug for SourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceConfig")
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl SourceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reporter
    pub fn reporter<R: Reporter>(mut self, reporter: R) -> Self {
        self.reporter = Arc::new(reporter);
        self
    }

    /// Set an already shared reporter
    pub fn shared_reporter(mut self, reporter: SharedReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the poll backoff
    pub fn backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::report::{Level, MemoryReporter};

    #[test]
    fn test_disabled_backoff_never_waits() {
        let backoff = BackoffConfig::none();
        for errors in [0, 1, 5, 40] {
            assert_eq!(backoff.delay(errors), Duration::ZERO);
        }
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let backoff = BackoffConfig::from_millis(100, 10);
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_millis(20));
        assert_eq!(backoff.delay(2), Duration::from_millis(40));
        assert_eq!(backoff.delay(3), Duration::from_millis(80));
        assert_eq!(backoff.delay(4), Duration::from_millis(100));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_millis(100));
    }

    #[test]
    fn test_standard_backoff() {
        let backoff = BackoffConfig::standard();
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(10), Duration::from_secs(10));
    }

    #[test]
    fn test_builder_setters() {
        let backoff = BackoffConfig::none()
            .with_max_backoff(Duration::from_secs(1))
            .with_multiplier(Duration::from_millis(1));
        assert!(!backoff.is_disabled());
        assert_eq!(backoff.delay(3), Duration::from_millis(8));
    }

    #[test]
    fn test_source_config_defaults() {
        let config = SourceConfig::default();
        assert!(config.backoff.is_disabled());
        assert!(!config.reporter.enabled(Level::Info));
        assert!(config.reporter.enabled(Level::Error));

        let config = config.reporter(MemoryReporter::new());
        assert!(config.reporter.enabled(Level::Verbose));
    }
}
