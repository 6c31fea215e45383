use anyhow::Context as AnyhowContext;
use derive_more::{Display, Error};
use log_error::LogError;
use recon_types::normalize_sku;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::str::FromStr;

use crate::reconcile::DEFAULT_TOLERANCE;

#[derive(Debug, Display, Error, PartialEq)]
pub enum ConfigError {
    #[error(ignore)]
    #[display("Reconcile tolerance must be within [0, 1), got {_0}")]
    Tolerance(f64),
    #[display("Velocity window must span at least one day")]
    EmptyWindow,
    #[error(ignore)]
    #[display("{_0} must be a non-negative number")]
    Negative(&'static str),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct VelocityConfig {
    /// Length of the recent period; the prior period has the same length.
    pub recent_days: u32,
    pub trend_threshold: f64,
    pub trend_adjust_threshold: f64,
    pub trend_adjustment: f64,
    pub min_confidence: f64,
    pub min_samples: u32,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            recent_days: 14,
            trend_threshold: 0.10,
            trend_adjust_threshold: 0.20,
            trend_adjustment: 0.10,
            min_confidence: 30.0,
            min_samples: 2,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LeadTimeSettings {
    pub default_lead_time_days: u32,
    pub reorder_buffer_days: u32,
    pub overstock_days: u32,
    pub per_sku: BTreeMap<String, u32>,
}

impl Default for LeadTimeSettings {
    fn default() -> Self {
        Self {
            default_lead_time_days: 14,
            reorder_buffer_days: 14,
            overstock_days: 180,
            per_sku: BTreeMap::new(),
        }
    }
}

impl LeadTimeSettings {
    pub fn lead_time_for(&self, sku: &str) -> u32 {
        let key = normalize_sku(sku);
        self.per_sku
            .iter()
            .find(|(k, _)| normalize_sku(k) == key)
            .map(|(_, v)| *v)
            .unwrap_or(self.default_lead_time_days)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReconConfig {
    pub reconcile_tolerance: f64,
    pub velocity: VelocityConfig,
    pub lead_time: LeadTimeSettings,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            reconcile_tolerance: DEFAULT_TOLERANCE,
            velocity: VelocityConfig::default(),
            lead_time: LeadTimeSettings::default(),
        }
    }
}

impl ReconConfig {
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let config = match std::fs::read_to_string(path) {
            Ok(input) => serde_yaml::from_str(&input)
                .with_context(|| format!("Unable to parse settings {}", path.display()))?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("No settings file at {}, using defaults", path.display());
                Self::default()
            }
            Err(err) => {
                return Err(err).context(format!("Unable to read settings {}", path.display()))
            }
        };
        let config = config.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path).log_error("Unable to load settings, using defaults") {
            Some(config) => config,
            None => Self::default().with_env_overrides().validated_or_default(),
        }
    }

    pub fn validated_or_default(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(err) => {
                log::warn!("Ignoring overrides: {err}");
                Self::default()
            }
        }
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_value("RECON_TOLERANCE") {
            self.reconcile_tolerance = v;
        }
        if let Some(v) = env_value("VELOCITY_RECENT_DAYS") {
            self.velocity.recent_days = v;
        }
        if let Some(v) = env_value("VELOCITY_TREND_THRESHOLD") {
            self.velocity.trend_threshold = v;
        }
        if let Some(v) = env_value("VELOCITY_MIN_CONFIDENCE") {
            self.velocity.min_confidence = v;
        }
        if let Some(v) = env_value("VELOCITY_MIN_SAMPLES") {
            self.velocity.min_samples = v;
        }
        if let Some(v) = env_value("LEAD_TIME_DAYS") {
            self.lead_time.default_lead_time_days = v;
        }
        if let Some(v) = env_value("REORDER_BUFFER_DAYS") {
            self.lead_time.reorder_buffer_days = v;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.reconcile_tolerance) {
            return Err(ConfigError::Tolerance(self.reconcile_tolerance));
        }
        if self.velocity.recent_days == 0 {
            return Err(ConfigError::EmptyWindow);
        }
        let v = &self.velocity;
        for (name, value) in [
            ("trend_threshold", v.trend_threshold),
            ("trend_adjust_threshold", v.trend_adjust_threshold),
            ("trend_adjustment", v.trend_adjustment),
            ("min_confidence", v.min_confidence),
        ] {
            if value.is_nan() || value < 0.0 {
                return Err(ConfigError::Negative(name));
            }
        }
        Ok(())
    }
}

fn env_value<T: FromStr>(key: &str) -> Option<T> {
    if !envmnt::exists(key) {
        return None;
    }
    let raw = envmnt::get_or(key, "");
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("Ignoring invalid value {raw:?} for {key}");
            None
        }
    }
}
