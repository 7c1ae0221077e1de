//! Layered configuration.
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌──────────────────────────────────────────┐
//! │  1. Environment Variables (ORBIT_*)      │
//! ├──────────────────────────────────────────┤
//! │  2. Explicit config file (--config)      │
//! ├──────────────────────────────────────────┤
//! │  3. Project config (<root>/orbit.toml)   │
//! ├──────────────────────────────────────────┤
//! │  4. Default Values (compile-time)        │
//! └──────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `ORBIT_THREAD_NAME` | `dispatcher.thread_name` | String |
//! | `ORBIT_READY_TIMEOUT_MS` | `dispatcher.ready_timeout_ms` | u64 |
//! | `ORBIT_MIN_TIMER_DELAY_MS` | `timers.min_delay_ms` | u64 |
//! | `ORBIT_LUA_SANDBOX` | `lua.sandbox` | bool |
//!
//! # Example Configuration
//!
//! ```toml
//! [dispatcher]
//! thread_name = "orbit-dispatch"
//! ready_timeout_ms = 5000
//!
//! [timers]
//! min_delay_ms = 0
//!
//! [lua]
//! sandbox = true
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{
    ConfigLayer, DispatcherConfig, DispatcherLayer, LuaConfig, LuaLayer, OrbitConfig, TimerConfig,
    TimerLayer,
};

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "orbit.toml";
