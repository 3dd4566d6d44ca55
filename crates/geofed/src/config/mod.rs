use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GeofedError, Result};

/// Tuning knobs for the [`SearchCoordinator`](crate::SearchCoordinator).
///
/// Use [`CoordinatorConfigBuilder`] for an ergonomic way to create configurations,
/// or [`CoordinatorConfig::from_json_str`] to load one from a host configuration
/// file (durations are given in milliseconds).
///
/// ```rust
/// use std::time::Duration;
///
/// use geofed::CoordinatorConfig;
///
/// let config = CoordinatorConfig::builder()
///     .debounce(Duration::from_millis(300))
///     .max_autocomplete_slots(5)
///     .build();
/// assert_eq!(config.max_autocomplete_slots, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Quiet period after the last keystroke before an autocomplete fetch is issued
    #[serde(rename = "debounce_ms", with = "millis")]
    pub debounce: Duration,
    /// Minimum trimmed phrase length (in characters) that triggers autocomplete
    pub min_autocomplete_chars: usize,
    /// Upper bound of the suggestion list
    pub max_autocomplete_slots: usize,
    /// Budget for resolving every plugin's search methods at startup
    #[serde(rename = "adapter_resolution_timeout_ms", with = "millis")]
    pub adapter_resolution_timeout: Duration,
    /// Buffered events per subscriber before slow subscribers start lagging
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            min_autocomplete_chars: 3,
            max_autocomplete_slots: 7,
            adapter_resolution_timeout: Duration::from_secs(5),
            event_capacity: 64,
        }
    }
}

impl CoordinatorConfig {
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_autocomplete_chars == 0 {
            return Err(GeofedError::ConfigError(
                "min_autocomplete_chars must be at least 1".to_string(),
            ));
        }
        if self.max_autocomplete_slots == 0 {
            return Err(GeofedError::ConfigError(
                "max_autocomplete_slots must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(GeofedError::ConfigError(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for creating coordinator configurations with ergonomic defaults
#[derive(Debug, Clone, Default)]
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    /// Create a new builder with sensible defaults
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
        }
    }

    /// Create a builder tuned for fast backends (short debounce)
    pub fn responsive() -> Self {
        let mut builder = Self::new();
        builder.config.debounce = Duration::from_millis(200);
        builder
    }

    /// Create a builder tuned for slow or rate-limited backends (long debounce, fewer suggestions)
    pub fn conservative() -> Self {
        let mut builder = Self::new();
        builder.config.debounce = Duration::from_millis(900);
        builder.config.max_autocomplete_slots = 5;
        builder.config.adapter_resolution_timeout = Duration::from_secs(10);
        builder
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.config.debounce = delay;
        self
    }

    /// Set the minimum phrase length for autocomplete (at least 1)
    pub fn min_autocomplete_chars(mut self, chars: usize) -> Self {
        self.config.min_autocomplete_chars = chars.max(1);
        self
    }

    /// Set the maximum number of suggestions (at least 1)
    pub fn max_autocomplete_slots(mut self, slots: usize) -> Self {
        self.config.max_autocomplete_slots = slots.max(1);
        self
    }

    pub fn adapter_resolution_timeout(mut self, timeout: Duration) -> Self {
        self.config.adapter_resolution_timeout = timeout;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> CoordinatorConfig {
        self.config
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.min_autocomplete_chars, 3);
        assert_eq!(config.max_autocomplete_slots, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_presets() {
        let fast = CoordinatorConfigBuilder::responsive().build();
        assert!(fast.debounce < CoordinatorConfig::default().debounce);

        let slow = CoordinatorConfigBuilder::conservative()
            .max_autocomplete_slots(0)
            .build();
        assert_eq!(slow.max_autocomplete_slots, 1);
    }

    #[test]
    fn test_from_json_millis() {
        let config =
            CoordinatorConfig::from_json_str(r#"{"debounce_ms": 250, "max_autocomplete_slots": 4}"#)
                .unwrap();
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.max_autocomplete_slots, 4);
        assert_eq!(config.min_autocomplete_chars, 3);
    }

    #[test]
    fn test_from_json_rejects_zero_slots() {
        let result = CoordinatorConfig::from_json_str(r#"{"max_autocomplete_slots": 0}"#);
        assert!(matches!(result, Err(GeofedError::ConfigError(_))));
    }
}
