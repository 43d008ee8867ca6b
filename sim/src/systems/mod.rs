//! Gameplay systems for the tactics simulation.
//!
//! Every system exposes a plain `update` function that takes the
//! [`GameState`](crate::state::GameState) explicitly, plus a bevy system wrapper used by the tick
//! schedule.
//!
//! ## Tick Order
//!
//! Systems run chained on a single thread, in this order:
//!
//! 1. `health_system` - regeneration, alive → dead
//! 2. `flee_system` - calm/fleeing transitions, flee targets
//! 3. `combat_system` - cooldowns, target acquisition, damage, chase
//! 4. `movement_system` - path following and straight-line steps
//! 5. `fog_system` - local player's visibility grid
//! 6. `corpse_system` - corpse aging and removal
//!
//! The order is load-bearing. Combat can drive `hp` to zero or below, and
//! nothing reacts to that until Health runs at the start of the next tick,
//! so a unit killed this tick keeps its `Attack` for one more tick.

pub mod combat;
pub mod corpse;
pub mod flee;
pub mod fog;
pub mod health;
pub mod movement;

pub use combat::combat_system;
pub use corpse::corpse_system;
pub use flee::flee_system;
pub use fog::{fog_system, FogCounts, FogOfWar, TileVisibility};
pub use health::health_system;
pub use movement::{halt, movement_system, set_direct_target, set_move_target};

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

/// Seconds simulated by the current tick.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);

/// Build the per-tick schedule.
///
/// Expects `GameState`, `FogOfWar`, `NavResource`, `DeltaTime` and
/// `SimConfig` resources in the world it runs on.
pub fn build_tick_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.set_executor_kind(ExecutorKind::SingleThreaded);
    schedule.add_systems(
        (
            health_system,
            flee_system,
            combat_system,
            movement_system,
            fog_system,
            corpse_system,
        )
            .chain(),
    );
    schedule
}
