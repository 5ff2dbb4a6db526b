//! # Orbital Configuration
//!
//! Loads pool settings from TOML with environment overrides and installs the
//! process-wide tracing subscriber.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orbital_config::{init_tracing, PoolConfig};
//!
//! let config = PoolConfig::load(Some(std::path::Path::new("config/pool.toml"))).unwrap();
//! init_tracing(&config.logging).unwrap();
//! println!("{} trades {} tokens", config.pool.name, config.pool.token_count());
//! ```

pub mod logging;
pub mod pool_config;

pub use logging::init_tracing;
pub use pool_config::{LoggingSettings, PoolConfig, PoolSettings, BPS_DENOMINATOR};
