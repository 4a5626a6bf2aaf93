//! Agent configuration.
//!
//! Field names follow the camelCase layout of the JSON config files the agent
//! has always read, so an existing `config.json` loads unchanged:
//!
//! ```json
//! {
//!   "buildingEnabled": true,
//!   "blockType": "dirt",
//!   "exploreRadius": 20,
//!   "autoSleep": true,
//!   "chestInteraction": { "enabled": true, "depositItems": { "dirt": 16 } },
//!   "combatSettings": { "enabled": true, "engagementDistance": 8 }
//! }
//! ```
//!
//! The file format follows the extension (`.json`, `.toml`, ...). Lifecycle
//! limits can also be overridden from the command line / environment by the
//! binary.

use crate::error::Result;
use crate::types::GameMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentConfig {
    /// Whether the build activity places blocks (otherwise it idles).
    pub building_enabled: bool,
    /// Block item used by the build activity.
    pub block_type: String,
    /// Maximum waypoint distance from the explore anchor.
    pub explore_radius: f64,
    /// Radius searched for an existing bed at night.
    pub bed_search_radius: f64,
    /// Sleep through the night when possible.
    pub auto_sleep: bool,
    /// Whether the movement planner may break blocks in the way.
    pub can_dig: bool,
    /// Privilege mode the mode enforcer maintains.
    pub required_mode: GameMode,
    /// Whether the mode enforcer runs at all.
    pub mode_enforcement: bool,
    pub chest_interaction: ChestInteraction,
    pub combat_settings: CombatSettings,
    pub timings: Timings,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            building_enabled: false,
            block_type: "dirt".into(),
            explore_radius: 20.0,
            bed_search_radius: 16.0,
            auto_sleep: false,
            can_dig: false,
            required_mode: GameMode::Creative,
            mode_enforcement: true,
            chest_interaction: ChestInteraction::default(),
            combat_settings: CombatSettings::default(),
            timings: Timings::default(),
        }
    }
}

impl AgentConfig {
    /// Load from an optional file. A missing file is not an error; defaults
    /// apply to every key the file leaves out.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        Ok(builder.build()?.try_deserialize()?)
    }
}

// ---------------------------------------------------------------------------
// Container interaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChestInteraction {
    pub enabled: bool,
    pub search_radius: f64,
    /// Item-name fragment → count to put into the container.
    pub deposit_items: BTreeMap<String, u32>,
    /// Item-name fragment → count to take out of the container.
    pub withdraw_items: BTreeMap<String, u32>,
}

impl Default for ChestInteraction {
    fn default() -> Self {
        Self {
            enabled: false,
            search_radius: 32.0,
            deposit_items: BTreeMap::new(),
            withdraw_items: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CombatSettings {
    pub enabled: bool,
    /// Hostiles farther than this are not considered at all.
    pub detection_radius: f64,
    /// Hostiles within this distance may be classified as targeting.
    pub engagement_distance: f64,
    pub preferred_weapon: String,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            detection_radius: 16.0,
            engagement_distance: 8.0,
            preferred_weapon: "diamond_sword".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Timings
// ---------------------------------------------------------------------------

/// Monitor periods, thresholds and lifecycle limits, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Timings {
    pub mode_check_ms: u64,
    pub mode_retries: u32,
    pub idle_check_ms: u64,
    pub idle_threshold_min_ms: u64,
    pub idle_threshold_max_ms: u64,
    pub threat_scan_ms: u64,
    pub keepalive_check_ms: u64,
    pub keepalive_threshold_ms: u64,
    pub combat_timeout_ms: u64,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            mode_check_ms: 2_000,
            mode_retries: 3,
            idle_check_ms: 15_000,
            idle_threshold_min_ms: 30_000,
            idle_threshold_max_ms: 120_000,
            threat_scan_ms: 1_000,
            keepalive_check_ms: 20_000,
            keepalive_threshold_ms: 45_000,
            combat_timeout_ms: 30_000,
            reconnect_delay_ms: 5_000,
            max_reconnect_attempts: 10,
        }
    }
}

impl Timings {
    pub fn mode_check(&self) -> Duration {
        Duration::from_millis(self.mode_check_ms)
    }

    pub fn idle_check(&self) -> Duration {
        Duration::from_millis(self.idle_check_ms)
    }

    pub fn threat_scan(&self) -> Duration {
        Duration::from_millis(self.threat_scan_ms)
    }

    pub fn keepalive_check(&self) -> Duration {
        Duration::from_millis(self.keepalive_check_ms)
    }

    pub fn keepalive_threshold(&self) -> Duration {
        Duration::from_millis(self.keepalive_threshold_ms)
    }

    pub fn combat_timeout(&self) -> Duration {
        Duration::from_millis(self.combat_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
