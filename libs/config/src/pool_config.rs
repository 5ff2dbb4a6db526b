//! Pool Configuration Module
//!
//! Provides configuration loading for an Orbital pool.
//! Supports loading from TOML files with environment variable overrides.

use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Basis-point denominator for fee rates (10_000 bps = 100%)
pub const BPS_DENOMINATOR: u32 = 10_000;

/// Default environment variable prefix (`ORBITAL_POOL__FEE_BPS=5`)
pub const ENV_PREFIX: &str = "ORBITAL";

/// Main pool configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoolConfig {
    pub pool: PoolSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Static parameters of a single pool
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoolSettings {
    pub name: String,

    /// Token symbols; the position of a symbol is its token index
    pub tokens: Vec<String>,

    /// Flat proportional fee taken from the input before solving
    #[serde(default)]
    pub fee_bps: u32,
}

/// Tracing subscriber settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. "info" or "orbital_amm=debug"
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl PoolSettings {
    pub fn new(name: impl Into<String>, tokens: &[&str], fee_bps: u32) -> Self {
        Self {
            name: name.into(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            fee_bps,
        }
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Index of a token symbol
    pub fn token_index(&self, symbol: &str) -> Option<usize> {
        self.tokens.iter().position(|t| t == symbol)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokens.len() < 2 {
            bail!(
                "pool '{}' needs at least 2 tokens, got {}",
                self.name,
                self.tokens.len()
            );
        }

        for (index, token) in self.tokens.iter().enumerate() {
            if self.token_index(token) != Some(index) {
                bail!("pool '{}' lists token '{}' twice", self.name, token);
            }
        }

        if self.fee_bps >= BPS_DENOMINATOR {
            bail!(
                "pool '{}' fee of {} bps must be below {}",
                self.name,
                self.fee_bps,
                BPS_DENOMINATOR
            );
        }

        Ok(())
    }
}

impl PoolConfig {
    /// Load configuration from a TOML file with `ORBITAL_` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path.unwrap_or(Path::new("config/pool.toml")), ENV_PREFIX)
    }

    /// Load configuration from a TOML file with overrides under a custom prefix
    pub fn load_from(path: &Path, env_prefix: &str) -> Result<Self> {
        info!("Loading pool config: {:?}", path);

        let config = Config::builder()
            .add_source(File::from(path).required(true))
            .add_source(
                Environment::with_prefix(env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        parsed.pool.validate()?;
        debug!(
            "Pool '{}' configured with {} tokens at {} bps",
            parsed.pool.name,
            parsed.pool.token_count(),
            parsed.pool.fee_bps
        );
        Ok(parsed)
    }

    /// Parse an embedded TOML document without environment overrides
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .context("Failed to build configuration")?;

        let parsed: Self = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        parsed.pool.validate()?;
        Ok(parsed)
    }

    /// Render back to TOML, e.g. to write out a starter config
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
