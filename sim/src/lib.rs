//! Tactics Sim - Simulation Core
//!
//! A deterministic, fixed-timestep simulation for grid-based tactical battles.
//! Entities live in a [`GameState`] store with a per-type index and a spatial
//! hash; gameplay systems run in a fixed order on a `bevy_ecs` schedule.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod map;
pub mod spatial;
pub mod spawn;
pub mod state;
pub mod systems;
pub mod targeting;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::SimConfig;
pub use error::{ConfigError, InvariantViolation, StoreError};
pub use map::{GridMap, NavMap, NavResource};
pub use spatial::SpatialHash;
pub use spawn::{spawn_structure, spawn_unit, AttackProfile, UnitTemplate};
pub use state::{EntityRef, GameComponent, GameState};
pub use systems::{build_tick_schedule, DeltaTime, FogCounts, FogOfWar, TileVisibility};
pub use targeting::{find_closest_enemy, find_closest_enemy_where};
pub use world::{EntitySnapshot, Snapshot};
