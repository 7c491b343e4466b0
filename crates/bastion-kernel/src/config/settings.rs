//! Resilience settings: per-dependency circuit and retry tuning, request
//! sensitivity defaults and semantic cache sizing.

use super::{ConfigError, ConfigResult, detect_format, substitute_env_vars};
use crate::error::{KernelError, KernelResult};
use crate::policy::SensitivityConfig;
use config::{Config as Cfg, Environment, File};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Environment prefix for overrides, e.g. `BASTION__DEFAULTS__MAX_RETRIES=4`.
pub const ENV_PREFIX: &str = "BASTION";

/// Circuit and retry tuning for one named dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DependencySettings {
    /// Disabled circuits let every call through
    pub enabled: bool,
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Cool-down before a half-open probe
    pub break_duration_ms: u64,
    /// Additional attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay
    pub max_delay_ms: Option<u64>,
    pub jitter: bool,
}

impl Default for DependencySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            break_duration_ms: 30_000,
            max_retries: 2,
            initial_delay_ms: 200,
            backoff_multiplier: 2.0,
            max_delay_ms: Some(5_000),
            jitter: true,
        }
    }
}

impl DependencySettings {
    pub fn break_duration(&self) -> Duration {
        Duration::from_millis(self.break_duration_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay_ms.map(Duration::from_millis)
    }

    fn validate(&self, name: &str) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                field: format!("{name}.failure_threshold"),
                reason: "must be at least 1".into(),
            });
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            return Err(ConfigError::Invalid {
                field: format!("{name}.backoff_multiplier"),
                reason: format!("must be >= 1.0, got {}", self.backoff_multiplier),
            });
        }
        if let Some(max) = self.max_delay_ms {
            if max < self.initial_delay_ms {
                return Err(ConfigError::Invalid {
                    field: format!("{name}.max_delay_ms"),
                    reason: "must not be below initial_delay_ms".into(),
                });
            }
        }
        Ok(())
    }
}

/// Semantic cache sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3_600,
            max_entries: 10_000,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Top-level settings document.
///
/// ```toml
/// [defaults]
/// failure_threshold = 5
///
/// [dependencies.llm]
/// max_retries = 3
/// initial_delay_ms = 500
///
/// [sensitivity]
/// handling_mode = "redact"
/// ```
///
/// A `[dependencies.<name>]` table replaces the defaults for that name;
/// fields it omits take the built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceSettings {
    pub defaults: DependencySettings,
    pub dependencies: HashMap<String, DependencySettings>,
    pub sensitivity: SensitivityConfig,
    pub cache: CacheSettings,
}

impl ResilienceSettings {
    /// Settings for `name`, falling back to the defaults.
    pub fn for_dependency(&self, name: &str) -> &DependencySettings {
        self.dependencies.get(name).unwrap_or(&self.defaults)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.defaults.validate("defaults")?;
        for (name, settings) in &self.dependencies {
            settings.validate(&format!("dependencies.{name}"))?;
        }
        if self.cache.enabled && self.cache.max_entries == 0 {
            return Err(ConfigError::Invalid {
                field: "cache.max_entries".into(),
                reason: "must be at least 1 when the cache is enabled".into(),
            });
        }
        Ok(())
    }

    /// Load from an optional file, then apply `BASTION__*` environment
    /// overrides, then validate.
    pub fn load(path: Option<&str>) -> KernelResult<Self> {
        let mut builder = Cfg::builder();

        if let Some(path) = path {
            let format = detect_format(path)
                .map_err(KernelError::from)
                .map_err(Report::new)
                .attach(format!("detecting format of {path}"))?;
            let content = std::fs::read_to_string(path)
                .map_err(KernelError::from)
                .map_err(Report::new)
                .attach(format!("reading {path}"))?;
            let substituted = substitute_env_vars(&content)
                .map_err(KernelError::from)
                .map_err(Report::new)?;
            builder = builder.add_source(File::from_str(&substituted, format));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder
            .build()
            .and_then(Cfg::try_deserialize)
            .map_err(|e| KernelError::from(ConfigError::Parse(e.to_string())))
            .map_err(Report::new)
            .attach("building resilience settings")?;

        settings
            .validate()
            .map_err(KernelError::from)
            .map_err(Report::new)
            .attach("validating resilience settings")?;

        tracing::info!(
            dependencies = settings.dependencies.len(),
            cache_enabled = settings.cache.enabled,
            "resilience settings loaded"
        );
        Ok(settings)
    }
}
