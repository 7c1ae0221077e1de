//! Configuration loader with layered merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Project config (`<project_root>/orbit.toml`, skipped if missing)
//! 3. Explicit config file (must exist)
//! 4. Environment variables (`ORBIT_*`)
//!
//! Each layer overrides the previous.

use super::{ConfigError, ConfigLayer, OrbitConfig, PROJECT_CONFIG_FILE};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parses an environment value into a config field.
macro_rules! parse_env {
    ($lookup:expr, $field:expr, $var:expr, $parse:expr, $expected:literal) => {
        if let Some(val) = $lookup($var) {
            $field = $parse(val.as_str())
                .ok_or_else(|| ConfigError::invalid_env_var($var, $expected))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use orbit_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_config_file("orbit.toml")
///     .skip_env_vars()
///     .load()?;
/// # Ok::<(), orbit_runtime::config::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Directory searched for `orbit.toml`.
    project_root: Option<PathBuf>,

    /// Explicit config file.
    config_file: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project root directory.
    ///
    /// `<project_root>/orbit.toml` is loaded if it exists.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Sets an explicit config file, layered over the project config.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file is missing, any
    /// config file cannot be parsed, or an `ORBIT_*` variable is malformed.
    pub fn load(&self) -> Result<OrbitConfig, ConfigError> {
        let mut config = OrbitConfig::default();

        if let Some(ref root) = self.project_root {
            let path = root.join(PROJECT_CONFIG_FILE);
            if path.exists() {
                config.apply(&load_file(&path)?);
                debug!(path = %path.display(), "Loaded project config");
            }
        }

        if let Some(ref path) = self.config_file {
            config.apply(&load_file(path)?);
            debug!(path = %path.display(), "Loaded config file");
        }

        if !self.skip_env {
            apply_env(&mut config, |name| std::env::var(name).ok())?;
        }

        Ok(config)
    }
}

fn load_file(path: &Path) -> Result<ConfigLayer, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
    ConfigLayer::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Applies `ORBIT_*` overrides read through `lookup`.
fn apply_env(
    config: &mut OrbitConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(name) = lookup("ORBIT_THREAD_NAME") {
        config.dispatcher.thread_name = name;
    }
    parse_env!(
        lookup,
        config.dispatcher.ready_timeout_ms,
        "ORBIT_READY_TIMEOUT_MS",
        parse_millis,
        "expected milliseconds"
    );
    parse_env!(
        lookup,
        config.timers.min_delay_ms,
        "ORBIT_MIN_TIMER_DELAY_MS",
        parse_millis,
        "expected milliseconds"
    );
    parse_env!(
        lookup,
        config.lua.sandbox,
        "ORBIT_LUA_SANDBOX",
        parse_bool,
        "expected bool"
    );
    Ok(())
}

fn parse_millis(s: &str) -> Option<u64> {
    s.trim().parse().ok()
}

/// Parses a boolean from string.
///
/// Accepts: "true", "false", "1", "0", "yes", "no", "on", "off" (case-insensitive).
fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new().skip_env_vars().load().unwrap();
        assert_eq!(config, OrbitConfig::default());
    }

    #[test]
    fn load_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[dispatcher]
thread_name = "custom"

[timers]
min_delay_ms = 4
"#,
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_config_file(&path)
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.dispatcher.thread_name, "custom");
        assert_eq!(config.timers.min_delay_ms, 4);
        assert!(config.lua.sandbox);
    }

    #[test]
    fn config_file_overrides_project() {
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[dispatcher]\nthread_name = \"project\"\nready_timeout_ms = 100\n",
        )
        .unwrap();
        let explicit = project.path().join("override.toml");
        std::fs::write(&explicit, "[dispatcher]\nthread_name = \"explicit\"\n").unwrap();

        let config = ConfigLoader::new()
            .with_project_root(project.path())
            .with_config_file(&explicit)
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.dispatcher.thread_name, "explicit");
        assert_eq!(config.dispatcher.ready_timeout_ms, 100);
    }

    #[test]
    fn config_file_can_restore_defaults() {
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join(PROJECT_CONFIG_FILE),
            "[lua]\nsandbox = false\n\n[timers]\nmin_delay_ms = 50\n",
        )
        .unwrap();
        let explicit = project.path().join("strict.toml");
        std::fs::write(&explicit, "[lua]\nsandbox = true\n\n[timers]\nmin_delay_ms = 0\n").unwrap();

        let config = ConfigLoader::new()
            .with_project_root(project.path())
            .with_config_file(&explicit)
            .skip_env_vars()
            .load()
            .unwrap();

        assert!(config.lua.sandbox);
        assert_eq!(config.timers.min_delay_ms, 0);
    }

    #[test]
    fn missing_project_config_is_ignored() {
        let project = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .with_project_root(project.path())
            .skip_env_vars()
            .load()
            .unwrap();
        assert_eq!(config, OrbitConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = ConfigLoader::new()
            .with_config_file(temp.path().join("absent.toml"))
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.toml");
        std::fs::write(&path, "[dispatcher\n").unwrap();
        let err = ConfigLoader::new()
            .with_config_file(&path)
            .skip_env_vars()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::ParseToml { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = OrbitConfig::default();
        apply_env(
            &mut config,
            env(&[
                ("ORBIT_THREAD_NAME", "env-thread"),
                ("ORBIT_READY_TIMEOUT_MS", "250"),
                ("ORBIT_MIN_TIMER_DELAY_MS", "2"),
                ("ORBIT_LUA_SANDBOX", "off"),
            ]),
        )
        .unwrap();

        assert_eq!(config.dispatcher.thread_name, "env-thread");
        assert_eq!(config.dispatcher.ready_timeout_ms, 250);
        assert_eq!(config.timers.min_delay_ms, 2);
        assert!(!config.lua.sandbox);
    }

    #[test]
    fn invalid_env_value_is_an_error() {
        let mut config = OrbitConfig::default();
        let err = apply_env(&mut config, env(&[("ORBIT_LUA_SANDBOX", "maybe")])).unwrap_err();
        assert!(err.to_string().contains("ORBIT_LUA_SANDBOX"));

        let err = apply_env(&mut config, env(&[("ORBIT_READY_TIMEOUT_MS", "-1")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
    }

    #[test]
    fn parse_bool_values() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("no"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
