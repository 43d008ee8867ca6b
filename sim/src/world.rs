//! Snapshot types.
//!
//! The `Snapshot` struct provides a serializable view of the simulation state
//! that a renderer or UI can consume.

use crate::components::*;
use crate::state::GameState;
use crate::systems::fog::{FogOfWar, TileVisibility};
use serde::{Deserialize, Serialize};

/// Snapshot of a single entity's state for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub player: Option<u32>,
    pub x: f32,
    pub y: f32,
    pub health: Option<f32>,
    pub health_max: Option<f32>,
    pub dead: bool,
    pub selected: bool,
    pub fleeing: bool,
    pub moving: bool,
    pub attack_target: Option<EntityId>,
    /// Whether the entity's tile is visible to the local player.
    pub visible: bool,
}

impl EntitySnapshot {
    fn capture(state: &GameState, fog: &FogOfWar, id: EntityId, pos: &Position) -> Self {
        let health = state.get_component::<Health>(id);
        Self {
            id,
            player: state.get_component::<Player>(id).map(|p| p.player_id),
            x: pos.x,
            y: pos.y,
            health: health.map(|h| h.hp),
            health_max: health.map(|h| h.max_hp),
            dead: state.has_component::<Dead>(id),
            selected: state
                .get_component::<Selectable>(id)
                .is_some_and(|s| s.is_selected),
            fleeing: state.get_component::<Flee>(id).is_some_and(|f| f.is_fleeing),
            moving: state.get_component::<Movable>(id).is_some_and(Movable::is_moving),
            attack_target: state.get_component::<Attack>(id).and_then(|a| a.target),
            visible: fog.is_entity_visible(state, id),
        }
    }
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    /// Every positioned entity, ascending id.
    pub entities: Vec<EntitySnapshot>,
    /// Tiles the local player currently sees.
    pub visible_tiles: Vec<(i32, i32)>,
    /// Tiles seen before but not in sight now.
    pub explored_tiles: Vec<(i32, i32)>,
}

impl Snapshot {
    /// Capture the store and fog grid.
    pub fn capture(state: &GameState, fog: &FogOfWar, tick: u64, time: f32) -> Self {
        let entities = state
            .get_entities_with_component::<Position>()
            .iter()
            .filter_map(|&id| {
                let pos = state.get_component::<Position>(id)?;
                Some(EntitySnapshot::capture(state, fog, id, pos))
            })
            .collect();

        Self {
            tick,
            time,
            entities,
            visible_tiles: fog.cells_with(TileVisibility::Visible).collect(),
            explored_tiles: fog.cells_with(TileVisibility::Explored).collect(),
        }
    }

    /// Look up one entity.
    pub fn entity(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.entities[idx])
    }

    /// Serialize snapshot to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize snapshot to pretty JSON string.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_skips_unpositioned_and_reports_fog() {
        let mut state = GameState::default();
        let seen = state.create_entity().unwrap();
        state.add_component(seen, Position::new(1.5, 1.5)).unwrap();
        state.add_component(seen, Player::new(1)).unwrap();
        state.add_component(seen, Vision::new(1)).unwrap();
        state.add_component(seen, Health::new(30.0)).unwrap();
        let hidden = state.create_entity().unwrap();
        state.add_component(hidden, Position::new(8.5, 8.5)).unwrap();
        let abstract_entity = state.create_entity().unwrap();
        state.add_component(abstract_entity, Health::new(1.0)).unwrap();

        let mut fog = FogOfWar::new(10, 10);
        fog.update(&state, 1);
        let snapshot = Snapshot::capture(&state, &fog, 7, 0.25);

        assert_eq!(snapshot.tick, 7);
        assert_eq!(snapshot.entities.len(), 2);
        let first = snapshot.entity(seen).unwrap();
        assert!(first.visible);
        assert_eq!(first.health, Some(30.0));
        assert!(!snapshot.entity(hidden).unwrap().visible);
        assert!(snapshot.entity(abstract_entity).is_none());
        assert_eq!(snapshot.visible_tiles.len(), 5);
        assert!(snapshot.explored_tiles.is_empty());
    }

    #[test]
    fn test_snapshot_json() {
        let mut state = GameState::default();
        let id = state.create_entity().unwrap();
        state.add_component(id, Position::new(2.0, 3.0)).unwrap();
        let snapshot = Snapshot::capture(&state, &FogOfWar::new(4, 4), 1, 0.0);

        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"entities\""));
        assert!(json.contains("\"visible_tiles\""));
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entities, snapshot.entities);
    }
}
