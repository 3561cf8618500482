//! Agent Configuration Module
//!
//! Operator-tunable values for the monitoring agent, loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `GRIDWATCH_CONFIG` environment variable (path to TOML file)
//! 2. `gridwatch.toml` in the current working directory
//! 3. Built-in defaults
//!
//! `GRIDWATCH_STATE_PATH` and `GRIDWATCH_LOG_PATH` then override the file
//! locations in `[agent]`.
//!
//! The loaded config is handed to `GridMonitorAgent::new`; nothing reads it
//! from a global.
//!
//! ```ignore
//! let config = AgentConfig::load();
//! let agent = GridMonitorAgent::open(config, engine)?;
//! ```

mod agent_config;
pub mod validation;

pub use agent_config::*;
