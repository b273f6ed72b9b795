//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Environment variable read by [`EngineConfig::from_env`].
pub const DEBUG_ENV: &str = "LENS_DEBUG";

/// Whether writes through accessor handles emit instrumentation signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrumentation {
    /// Writes are applied silently.
    #[default]
    Off,
    /// Every write emits one `changeDetected` and one `changeResolved` per
    /// live view that contains the written entity.
    On,
}

impl Instrumentation {
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self == Self::On
    }
}

impl From<bool> for Instrumentation {
    fn from(enabled: bool) -> Self {
        if enabled { Self::On } else { Self::Off }
    }
}

/// Configuration for a [`World`](crate::World).
///
/// Each world carries its own copy, so instrumented and silent worlds can
/// coexist in one process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Write instrumentation mode.
    pub instrumentation: Instrumentation,
    /// Initial state of the coarse `change` notification toggle.
    pub emit_changes: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instrumentation: Instrumentation::Off,
            emit_changes: true,
        }
    }
}

impl EngineConfig {
    /// Default configuration with instrumentation turned on.
    #[must_use]
    pub fn debug() -> Self {
        Self::default().with_instrumentation(Instrumentation::On)
    }

    /// Default configuration with instrumentation taken from `LENS_DEBUG`.
    #[must_use]
    pub fn from_env() -> Self {
        let enabled = std::env::var(DEBUG_ENV)
            .map(|v| parse_flag(&v))
            .unwrap_or(false);
        Self::default().with_instrumentation(enabled.into())
    }

    /// Set the instrumentation mode.
    #[must_use]
    pub fn with_instrumentation(mut self, instrumentation: Instrumentation) -> Self {
        self.instrumentation = instrumentation;
        self
    }

    /// Set the initial state of the `change` notification toggle.
    #[must_use]
    pub fn with_emit_changes(mut self, emit_changes: bool) -> Self {
        self.emit_changes = emit_changes;
        self
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_silent_and_emits_changes() {
        let config = EngineConfig::default();
        assert_eq!(config.instrumentation, Instrumentation::Off);
        assert!(config.emit_changes);
    }

    #[test]
    fn test_debug_turns_on_instrumentation() {
        assert!(EngineConfig::debug().instrumentation.is_enabled());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::default()
            .with_instrumentation(true.into())
            .with_emit_changes(false);
        assert_eq!(config.instrumentation, Instrumentation::On);
        assert!(!config.emit_changes);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag("TRUE"));
        assert!(parse_flag(" on "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"instrumentation": "on"}"#).unwrap();
        assert_eq!(config.instrumentation, Instrumentation::On);
        assert!(config.emit_changes);
    }
}
