//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure.
///
/// Every section is optional in a config file; missing fields keep their
/// defaults.
///
/// # Example
///
/// ```
/// use orbit_runtime::config::OrbitConfig;
///
/// let config = OrbitConfig::default();
/// assert_eq!(config.dispatcher.thread_name, "orbit-dispatch");
/// assert!(config.lua.sandbox);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrbitConfig {
    /// Dispatcher thread settings.
    pub dispatcher: DispatcherConfig,

    /// Timer layer settings.
    pub timers: TimerConfig,

    /// Lua bridge settings.
    pub lua: LuaConfig,
}

impl OrbitConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Overlays a config file layer onto this config.
    ///
    /// Every field the layer sets wins, including ones set back to their
    /// default value. Fields the layer leaves out are kept.
    pub fn apply(&mut self, layer: &ConfigLayer) {
        let ConfigLayer { dispatcher, timers, lua } = layer;
        if let Some(name) = &dispatcher.thread_name {
            self.dispatcher.thread_name = name.clone();
        }
        if let Some(ms) = dispatcher.ready_timeout_ms {
            self.dispatcher.ready_timeout_ms = ms;
        }
        if let Some(ms) = timers.min_delay_ms {
            self.timers.min_delay_ms = ms;
        }
        if let Some(sandbox) = lua.sandbox {
            self.lua.sandbox = sandbox;
        }
    }
}

/// One config file as written: only the fields it actually sets.
///
/// Mirrors [`OrbitConfig`] section by section so layers can be stacked
/// without losing explicit values that happen to equal the default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigLayer {
    pub dispatcher: DispatcherLayer,
    pub timers: TimerLayer,
    pub lua: LuaLayer,
}

impl ConfigLayer {
    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// `[dispatcher]` fields present in a layer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherLayer {
    pub thread_name: Option<String>,
    pub ready_timeout_ms: Option<u64>,
}

/// `[timers]` fields present in a layer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimerLayer {
    pub min_delay_ms: Option<u64>,
}

/// `[lua]` fields present in a layer.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LuaLayer {
    pub sandbox: Option<bool>,
}

/// Dispatcher thread configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Name given to the dispatcher OS thread.
    pub thread_name: String,

    /// How long `EventLoop::start` waits for the loop to report ready.
    pub ready_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_name: "orbit-dispatch".into(),
            ready_timeout_ms: 5_000,
        }
    }
}

impl DispatcherConfig {
    /// Ready timeout as a [`Duration`].
    #[must_use]
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Timer layer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimerConfig {
    /// Lower bound applied to every timer delay.
    pub min_delay_ms: u64,
}

impl TimerConfig {
    /// Minimum delay as a [`Duration`].
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }
}

/// Lua bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LuaConfig {
    /// Strip filesystem, process and loader access from script globals.
    pub sandbox: bool,
}

impl Default for LuaConfig {
    fn default() -> Self {
        Self { sandbox: true }
    }
}
