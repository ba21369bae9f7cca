//! Configuration loading for marga-nav.
//!
//! Every tunable the engine consults lives here, loaded from a TOML file
//! with serde field defaults. The scheduler distance thresholds in
//! particular are deliberately configuration rather than constants: deployed
//! venues have used values between 36 and 400 squared floorplan-units
//! depending on plan scale, so nothing is hard-coded.

use crate::error::{NavError, Result};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct MargaConfig {
    #[serde(default)]
    pub frame: FrameConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub hosting: HostingConfig,
}

/// Reference-frame calibration.
#[derive(Clone, Debug, Deserialize)]
pub struct FrameConfig {
    /// World-units (meters) per floorplan-unit.
    ///
    /// Fixed calibration constant of the floorplan artwork; never derived
    /// at runtime.
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
}

/// Anchor resolution scheduler settings.
#[derive(Clone, Debug, Deserialize)]
pub struct SchedulerConfig {
    /// Priority tick interval in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Admission threshold for nodes on the active route
    /// (squared floorplan-units from the predicted position).
    #[serde(default = "default_route_threshold_sq")]
    pub route_threshold_sq: f32,

    /// Admission threshold for all other nodes (squared floorplan-units).
    #[serde(default = "default_other_threshold_sq")]
    pub other_threshold_sq: f32,

    /// Maximum resolutions admitted per tick.
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,
}

/// Session owner loop settings.
#[derive(Clone, Debug, Deserialize)]
pub struct SessionConfig {
    /// Owner loop interval in milliseconds.
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,

    /// "You are here" publish interval in milliseconds.
    #[serde(default = "default_position_interval_ms")]
    pub position_interval_ms: u64,
}

/// Anchor hosting (author-time) settings.
#[derive(Clone, Debug, Deserialize)]
pub struct HostingConfig {
    /// Time-to-live requested for newly hosted anchors, in days.
    #[serde(default = "default_anchor_ttl_days")]
    pub anchor_ttl_days: u32,
}

// Default value functions
fn default_scale_factor() -> f32 {
    // Floorplans authored at ~150 px per meter: 1 plan-unit = 1/150 m.
    1.0 / 150.0
}
fn default_tick_interval_ms() -> u64 {
    500
}
fn default_route_threshold_sq() -> f32 {
    400.0
}
fn default_other_threshold_sq() -> f32 {
    36.0
}
fn default_batch_cap() -> usize {
    4
}
fn default_loop_interval_ms() -> u64 {
    50
}
fn default_position_interval_ms() -> u64 {
    250
}
fn default_anchor_ttl_days() -> u32 {
    365
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            scale_factor: default_scale_factor(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            route_threshold_sq: default_route_threshold_sq(),
            other_threshold_sq: default_other_threshold_sq(),
            batch_cap: default_batch_cap(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            loop_interval_ms: default_loop_interval_ms(),
            position_interval_ms: default_position_interval_ms(),
        }
    }
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            anchor_ttl_days: default_anchor_ttl_days(),
        }
    }
}

impl MargaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NavError::Config(format!("Failed to read config file: {}", e)))?;
        let config: MargaConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = MargaConfig::default();
        assert_eq!(config.scheduler.tick_interval_ms, 500);
        assert_relative_eq!(config.scheduler.route_threshold_sq, 400.0);
        assert_relative_eq!(config.scheduler.other_threshold_sq, 36.0);
        assert_eq!(config.session.position_interval_ms, 250);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: MargaConfig = toml::from_str(
            r#"
            [scheduler]
            route_threshold_sq = 144.0
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.scheduler.route_threshold_sq, 144.0);
        assert_relative_eq!(config.scheduler.other_threshold_sq, 36.0);
        assert_eq!(config.scheduler.batch_cap, 4);
    }

    #[test]
    fn test_empty_toml() {
        let config: MargaConfig = toml::from_str("").unwrap();
        assert_eq!(config.hosting.anchor_ttl_days, 365);
    }
}
