//! Layered runtime settings.
//!
//! Resolution order, later layers winning: built-in defaults, an optional JSON
//! file, `TICKFORGE_*` environment variables, then whatever the caller applies
//! on top (the CLI applies its flags last).

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ingestion::DeliveryMode;
use crate::price_walk::{PriceWalkConfig, RangePolicy};
use crate::retry::{Backoff, ProbePolicy};
use crate::store::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS};
use crate::{SettingsError, ValidationError};

/// Simulation worker settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub interval_seconds: u64,
    pub initial_delay_seconds: u64,
    pub min_price_change_percent: f64,
    pub max_price_change_percent: f64,
    pub min_volume: u64,
    pub max_volume: u64,
    pub enable_batch_mode: bool,
    pub health_check_attempts: u32,
    pub health_check_interval_seconds: u64,
    pub error_cooldown_seconds: u64,
    /// Replaces the fixed `health_check_interval_seconds` wait when set.
    pub health_check_backoff: Option<Backoff>,
    pub range_policy: RangePolicy,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            initial_delay_seconds: 10,
            min_price_change_percent: -2.0,
            max_price_change_percent: 2.0,
            min_volume: 100_000,
            max_volume: 10_000_000,
            enable_batch_mode: true,
            health_check_attempts: 10,
            health_check_interval_seconds: 5,
            error_cooldown_seconds: 10,
            health_check_backoff: None,
            range_policy: RangePolicy::default(),
            seed: None,
        }
    }
}

impl SimulationSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_seconds)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_seconds)
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        if self.enable_batch_mode {
            DeliveryMode::Batch
        } else {
            DeliveryMode::PerItem
        }
    }

    pub fn probe_policy(&self) -> ProbePolicy {
        match self.health_check_backoff {
            Some(backoff) => ProbePolicy {
                max_attempts: self.health_check_attempts,
                backoff,
            },
            None => ProbePolicy::fixed(
                Duration::from_secs(self.health_check_interval_seconds),
                self.health_check_attempts,
            ),
        }
    }

    pub fn price_walk_config(&self) -> PriceWalkConfig {
        PriceWalkConfig {
            min_change_percent: self.min_price_change_percent,
            max_change_percent: self.max_price_change_percent,
            min_volume: self.min_volume,
            max_volume: self.max_volume,
            range_policy: self.range_policy,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_seconds == 0 {
            return Err(invalid("interval_seconds", "must be greater than zero"));
        }
        if self.health_check_attempts == 0 {
            return Err(invalid("health_check_attempts", "must be at least 1"));
        }
        if let Some(Backoff::Exponential { factor, .. }) = self.health_check_backoff {
            if !factor.is_finite() || factor < 1.0 {
                return Err(invalid("health_check_backoff", "factor must be at least 1"));
            }
        }
        self.price_walk_config().validate()
    }
}

/// Remote market API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_seconds: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout_seconds: DEFAULT_TIMEOUT_MS / 1_000,
        }
    }
}

impl ApiSettings {
    pub fn timeout_ms(&self) -> u64 {
        self.timeout_seconds.saturating_mul(1_000)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(invalid("base_url", "must start with http:// or https://"));
        }
        if self.timeout_seconds == 0 {
            return Err(invalid("timeout_seconds", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Top-level settings document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub api: ApiSettings,
}

impl Settings {
    /// Defaults, then `path` if given, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: display.clone(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: display,
            source,
        })
    }

    /// Apply `TICKFORGE_*` overrides found through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sim = &mut self.simulation;
        override_from(&lookup, "TICKFORGE_INTERVAL_SECONDS", &mut sim.interval_seconds)?;
        override_from(
            &lookup,
            "TICKFORGE_INITIAL_DELAY_SECONDS",
            &mut sim.initial_delay_seconds,
        )?;
        override_from(
            &lookup,
            "TICKFORGE_MIN_PRICE_CHANGE_PERCENT",
            &mut sim.min_price_change_percent,
        )?;
        override_from(
            &lookup,
            "TICKFORGE_MAX_PRICE_CHANGE_PERCENT",
            &mut sim.max_price_change_percent,
        )?;
        override_from(&lookup, "TICKFORGE_MIN_VOLUME", &mut sim.min_volume)?;
        override_from(&lookup, "TICKFORGE_MAX_VOLUME", &mut sim.max_volume)?;
        override_from(&lookup, "TICKFORGE_BATCH_MODE", &mut sim.enable_batch_mode)?;

        if let Some(seed) = lookup("TICKFORGE_SEED") {
            sim.seed = Some(parse_env("TICKFORGE_SEED", &seed)?);
        }
        if let Some(base_url) = lookup("TICKFORGE_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.simulation.validate()?;
        self.api.validate()
    }
}

fn override_from<T, F>(lookup: &F, name: &'static str, slot: &mut T) -> Result<(), SettingsError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = parse_env(name, &raw)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(name: &'static str, raw: &str) -> Result<T, SettingsError> {
    raw.trim().parse().map_err(|_| SettingsError::InvalidEnv {
        name,
        value: raw.to_owned(),
    })
}

fn invalid(name: &'static str, reason: &str) -> ValidationError {
    ValidationError::InvalidSetting {
        name,
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        settings.validate().expect("defaults");
        assert_eq!(settings.simulation.delivery_mode(), DeliveryMode::Batch);
        assert_eq!(settings.api.timeout_ms(), 30_000);
    }

    #[test]
    fn file_values_fill_only_what_they_name() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("tickforge.json");
        std::fs::write(&path, r#"{"simulation":{"interval_seconds":1,"seed":9}}"#)
            .expect("write");

        let settings = Settings::from_file(&path).expect("settings");

        assert_eq!(settings.simulation.interval_seconds, 1);
        assert_eq!(settings.simulation.seed, Some(9));
        assert_eq!(settings.simulation.max_volume, 10_000_000);
        assert_eq!(settings.api.base_url, "http://localhost:5000");
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut settings = Settings::default();
        settings
            .apply_env(env(&[
                ("TICKFORGE_BATCH_MODE", "false"),
                ("TICKFORGE_MIN_PRICE_CHANGE_PERCENT", "-0.5"),
                ("TICKFORGE_API_BASE_URL", "http://market:8080"),
            ]))
            .expect("env");

        assert_eq!(settings.simulation.delivery_mode(), DeliveryMode::PerItem);
        assert_eq!(settings.simulation.min_price_change_percent, -0.5);
        assert_eq!(settings.api.base_url, "http://market:8080");
    }

    #[test]
    fn malformed_environment_value_is_reported_by_name() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(env(&[("TICKFORGE_MIN_VOLUME", "lots")]))
            .expect_err("bad volume");

        assert!(matches!(
            err,
            SettingsError::InvalidEnv { name: "TICKFORGE_MIN_VOLUME", .. }
        ));
    }

    #[test]
    fn backoff_from_file_replaces_the_fixed_probe_interval() {
        let settings: Settings = serde_json::from_str(
            r#"{"simulation":{"health_check_attempts":4,"health_check_backoff":
                {"kind":"exponential","base":1000,"factor":2.0,"max":4000,"jitter":false}}}"#,
        )
        .expect("settings");

        let policy = settings.simulation.probe_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(
            Settings::default().simulation.probe_policy(),
            ProbePolicy::default()
        );
    }

    #[test]
    fn shrinking_backoff_fails_validation() {
        let mut settings = Settings::default();
        settings.simulation.health_check_backoff = Some(Backoff::Exponential {
            base: Duration::from_secs(1),
            factor: 0.5,
            max: Duration::from_secs(4),
            jitter: false,
        });

        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidSetting { name: "health_check_backoff", .. })
        ));
    }

    #[test]
    fn inverted_bounds_fail_validation() {
        let mut settings = Settings::default();
        settings.simulation.min_volume = 10;
        settings.simulation.max_volume = 5;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.simulation.interval_seconds = 0;
        assert!(matches!(
            settings.validate(),
            Err(ValidationError::InvalidSetting { name: "interval_seconds", .. })
        ));
    }
}
