//! Engine configuration.
//!
//! Layered the usual way: built-in defaults, then an optional `wareflow.toml`
//! in the working directory, then `WAREFLOW__*` environment variables
//! (e.g. `WAREFLOW__MIN_DEPARTURE_FUEL_LEVEL=30`, `WAREFLOW__LOG__JSON=false`).

use config::{Config, Environment, File, Source};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use wareflow_inventory::StockThresholds;
use wareflow_observability::LogSettings;

const CONFIG_FILE: &str = "wareflow";
const ENV_PREFIX: &str = "WAREFLOW";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Policy constants used by the workflows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A product heavier than this (per unit) flags the order as heavy.
    pub heavy_item_threshold_kg: f64,
    pub cycle_count_sample_size: usize,
    pub maintenance_interval_months: u32,
    /// Percent.
    pub min_departure_fuel_level: u8,
    pub low_stock_threshold: i64,
    pub expiry_critical_days: i64,
    pub expiry_approaching_days: i64,
    pub stuck_order_threshold_hours: i64,
    /// Attempts at drawing an unused document number before giving up.
    pub number_retry_attempts: u32,
    /// Attempts at re-planning a stock write after a lot version moved.
    pub stock_write_attempts: u32,
    pub log: LogSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            heavy_item_threshold_kg: 10.0,
            cycle_count_sample_size: 5,
            maintenance_interval_months: 3,
            min_departure_fuel_level: 25,
            low_stock_threshold: 10,
            expiry_critical_days: 30,
            expiry_approaching_days: 60,
            stuck_order_threshold_hours: 48,
            number_retry_attempts: 3,
            stock_write_attempts: 3,
            log: LogSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Load defaults, `wareflow.toml` (optional) and `WAREFLOW__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(File::with_name(CONFIG_FILE).required(false))
    }

    /// Same layering with `file` in place of `wareflow.toml`.
    pub fn load_with<S>(file: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("heavy_item_threshold_kg", defaults.heavy_item_threshold_kg)?
            .set_default(
                "cycle_count_sample_size",
                defaults.cycle_count_sample_size as i64,
            )?
            .set_default(
                "maintenance_interval_months",
                i64::from(defaults.maintenance_interval_months),
            )?
            .set_default(
                "min_departure_fuel_level",
                i64::from(defaults.min_departure_fuel_level),
            )?
            .set_default("low_stock_threshold", defaults.low_stock_threshold)?
            .set_default("expiry_critical_days", defaults.expiry_critical_days)?
            .set_default("expiry_approaching_days", defaults.expiry_approaching_days)?
            .set_default(
                "stuck_order_threshold_hours",
                defaults.stuck_order_threshold_hours,
            )?
            .set_default(
                "number_retry_attempts",
                i64::from(defaults.number_retry_attempts),
            )?
            .set_default(
                "stock_write_attempts",
                i64::from(defaults.stock_write_attempts),
            )?
            .set_default("log.level", defaults.log.level.as_str())?
            .set_default("log.json", defaults.log.json)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        info!(
            sample_size = config.cycle_count_sample_size,
            min_fuel = config.min_departure_fuel_level,
            "engine configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if !self.heavy_item_threshold_kg.is_finite() || self.heavy_item_threshold_kg <= 0.0 {
            return invalid("heavy_item_threshold_kg must be a positive number");
        }
        if self.cycle_count_sample_size == 0 {
            return invalid("cycle_count_sample_size must be at least 1");
        }
        if !(1..=120).contains(&self.maintenance_interval_months) {
            return invalid("maintenance_interval_months must be between 1 and 120");
        }
        if self.min_departure_fuel_level > 100 {
            return invalid("min_departure_fuel_level is a percentage (0-100)");
        }
        if self.low_stock_threshold < 0 {
            return invalid("low_stock_threshold cannot be negative");
        }
        if self.expiry_critical_days <= 0
            || self.expiry_approaching_days <= self.expiry_critical_days
        {
            return invalid("expiry windows must satisfy 0 < critical < approaching");
        }
        if self.stuck_order_threshold_hours <= 0 {
            return invalid("stuck_order_threshold_hours must be positive");
        }
        if self.number_retry_attempts == 0 {
            return invalid("number_retry_attempts must be at least 1");
        }
        if self.stock_write_attempts == 0 {
            return invalid("stock_write_attempts must be at least 1");
        }
        if self.log.level.trim().is_empty() {
            return invalid("log.level cannot be empty");
        }
        Ok(())
    }

    pub fn stock_thresholds(&self) -> StockThresholds {
        StockThresholds {
            low_stock: self.low_stock_threshold,
            expiry_critical_days: self.expiry_critical_days,
            expiry_approaching_days: self.expiry_approaching_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.stock_thresholds(), StockThresholds::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = File::from_str(
            "min_departure_fuel_level = 30\ncycle_count_sample_size = 8\n\n[log]\njson = false\n",
            FileFormat::Toml,
        );
        let config = EngineConfig::load_with(file).unwrap();
        assert_eq!(config.min_departure_fuel_level, 30);
        assert_eq!(config.cycle_count_sample_size, 8);
        assert!(!config.log.json);
        assert_eq!(config.log.level, "info");
        assert_eq!(config.maintenance_interval_months, 3);
    }

    #[test]
    fn nonsensical_values_are_rejected() {
        let file = File::from_str("expiry_critical_days = 90", FileFormat::Toml);
        assert!(matches!(
            EngineConfig::load_with(file),
            Err(ConfigError::Invalid(_))
        ));

        let config = EngineConfig {
            min_departure_fuel_level: 101,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
