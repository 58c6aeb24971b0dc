//! # Maintainer Configuration
//!
//! Tunables are loaded from TOML once at startup and may be replaced later
//! through [`EntityMaintenanceEngine::configure`](crate::EntityMaintenanceEngine::configure).
//!
//! ```toml
//! enabled = true
//! hits_before_promote = 3
//! misses_before_drop = 3
//! cycle_duration_secs = 5.0
//! maintenance_period_secs = 5.0
//! ```

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MaintainerError, MaintainerResult};

/// Default number of observations before a tentative entity is promoted.
pub const DEFAULT_HITS_BEFORE_PROMOTE: u32 = 3;

/// Default number of missed cycles before an entity is dropped.
pub const DEFAULT_MISSES_BEFORE_DROP: u32 = 3;

/// Default domain cycle (scan) duration in seconds.
pub const DEFAULT_CYCLE_DURATION_SECS: f64 = 5.0;

/// Default period of the maintenance timer in seconds.
pub const DEFAULT_MAINTENANCE_PERIOD_SECS: f64 = 5.0;

/// Engine tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MaintainerConfig {
    /// When false, maintenance cycles are skipped.
    pub enabled: bool,
    /// Observations needed before a tentative entity is promoted.
    pub hits_before_promote: u32,
    /// Missed domain cycles tolerated before an entity is dropped.
    pub misses_before_drop: u32,
    /// Duration of one domain cycle, in seconds.
    pub cycle_duration_secs: f64,
    /// Period of the maintenance timer, in seconds.
    pub maintenance_period_secs: f64,
    /// Maximum records retained per entity. `None` keeps everything.
    pub history_limit: Option<usize>,
}

impl Default for MaintainerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hits_before_promote: DEFAULT_HITS_BEFORE_PROMOTE,
            misses_before_drop: DEFAULT_MISSES_BEFORE_DROP,
            cycle_duration_secs: DEFAULT_CYCLE_DURATION_SECS,
            maintenance_period_secs: DEFAULT_MAINTENANCE_PERIOD_SECS,
            history_limit: None,
        }
    }
}

impl MaintainerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::ConfigParse`] for malformed TOML and
    /// [`MaintainerError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> MaintainerResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::ConfigIo`] if the file cannot be read, and
    /// otherwise the same errors as [`from_toml_str`](Self::from_toml_str).
    pub fn from_file(path: impl AsRef<Path>) -> MaintainerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MaintainerError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Rejects non-positive thresholds and durations.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> MaintainerResult<()> {
        if self.hits_before_promote == 0 {
            return Err(MaintainerError::InvalidConfig(
                "hits_before_promote must be positive".into(),
            ));
        }
        if self.misses_before_drop == 0 {
            return Err(MaintainerError::InvalidConfig(
                "misses_before_drop must be positive".into(),
            ));
        }
        validate_secs("cycle_duration_secs", self.cycle_duration_secs)?;
        validate_secs("maintenance_period_secs", self.maintenance_period_secs)?;
        if Duration::try_from_secs_f64(self.maintenance_period_secs).is_err() {
            return Err(MaintainerError::InvalidConfig(format!(
                "maintenance_period_secs is too large to use as a timer period, got {}",
                self.maintenance_period_secs
            )));
        }
        if self.history_limit == Some(0) {
            return Err(MaintainerError::InvalidConfig(
                "history_limit must be positive when set".into(),
            ));
        }
        Ok(())
    }

    /// Returns the maintenance timer period. Values too large to represent
    /// saturate to [`Duration::MAX`].
    #[must_use]
    pub fn maintenance_period(&self) -> Duration {
        Duration::try_from_secs_f64(self.maintenance_period_secs).unwrap_or(Duration::MAX)
    }
}

fn validate_secs(field: &str, secs: f64) -> MaintainerResult<()> {
    if secs.is_finite() && secs > 0.0 {
        Ok(())
    } else {
        Err(MaintainerError::InvalidConfig(format!(
            "{field} must be a positive number of seconds, got {secs}"
        )))
    }
}

/// Live domain cycle duration shared between the host and the engine.
///
/// The host may update it at any time; the engine reads it once at the top
/// of each maintenance cycle.
#[derive(Clone, Debug)]
pub struct CycleDuration {
    bits: Arc<AtomicU64>,
}

impl CycleDuration {
    /// Creates a handle holding `secs`.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::InvalidConfig`] unless `secs` is finite
    /// and positive.
    pub fn new(secs: f64) -> MaintainerResult<Self> {
        validate_secs("cycle duration", secs)?;
        Ok(Self {
            bits: Arc::new(AtomicU64::new(secs.to_bits())),
        })
    }

    /// Returns the current duration in seconds.
    #[must_use]
    pub fn secs(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Replaces the duration.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::InvalidConfig`] unless `secs` is finite
    /// and positive; the old value is kept.
    pub fn set(&self, secs: f64) -> MaintainerResult<()> {
        validate_secs("cycle duration", secs)?;
        self.bits.store(secs.to_bits(), Ordering::Release);
        Ok(())
    }
}
