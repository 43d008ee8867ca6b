//! Simulation configuration.

use crate::error::ConfigError;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Tunables loaded once at startup.
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed timestep in seconds (e.g., 1/30 = 0.0333 for 30 Hz).
    pub fixed_timestep: f32,
    /// Live-entity ceiling for the store.
    pub max_entities: usize,
    /// Seconds a corpse stays on the field before removal.
    pub corpse_lifetime: f32,
    /// Player whose units reveal the fog-of-war grid.
    pub local_player: u32,
    /// Grid units a fleeing unit runs away from its threat.
    pub flee_distance: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 30.0,
            max_entities: crate::state::DEFAULT_MAX_ENTITIES,
            corpse_lifetime: 5.0,
            local_player: 1,
            flee_distance: 5.0,
        }
    }
}

impl SimConfig {
    /// Parse a JSON config. Missing fields take their defaults.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_timestep > 0.0) {
            return Err(ConfigError::Invalid {
                field: "fixed_timestep",
                reason: "must be positive",
            });
        }
        if self.max_entities == 0 {
            return Err(ConfigError::Invalid {
                field: "max_entities",
                reason: "must be nonzero",
            });
        }
        if !(self.corpse_lifetime >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "corpse_lifetime",
                reason: "must not be negative",
            });
        }
        if !(self.flee_distance > 0.0) {
            return Err(ConfigError::Invalid {
                field: "flee_distance",
                reason: "must be positive",
            });
        }
        Ok(())
    }
}
