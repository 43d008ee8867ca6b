//! Entity/component store with a component-type index and a spatial hash.
//!
//! `GameState` is the single authoritative copy of simulation state. Every
//! system reads and writes through its public operations, which keep three
//! structures in step:
//!
//! - the per-entity component mask and the per-type component columns,
//! - the type index (`ComponentKind` → ids), answering "all entities with C",
//! - the spatial hash (cell → ids), mirroring every `Position`.
//!
//! Iteration is always in ascending `EntityId` order.

use crate::components::*;
use crate::error::{InvariantViolation, StoreError};
use crate::spatial::SpatialHash;
use bevy_ecs::prelude::Resource;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{trace, warn};

/// Live-entity ceiling used by [`GameState::default`].
pub const DEFAULT_MAX_ENTITIES: usize = 10_000;

/// Per-type component storage keyed by entity.
#[doc(hidden)]
#[derive(Debug, Default, Clone)]
pub struct ComponentColumns {
    position: BTreeMap<EntityId, Position>,
    health: BTreeMap<EntityId, Health>,
    attack: BTreeMap<EntityId, Attack>,
    movable: BTreeMap<EntityId, Movable>,
    vision: BTreeMap<EntityId, Vision>,
    flee: BTreeMap<EntityId, Flee>,
    selectable: BTreeMap<EntityId, Selectable>,
    player: BTreeMap<EntityId, Player>,
    dead: BTreeMap<EntityId, Dead>,
}

/// A component type the store knows how to file.
pub trait GameComponent: Clone + Send + Sync + 'static {
    const KIND: ComponentKind;

    #[doc(hidden)]
    fn column(columns: &ComponentColumns) -> &BTreeMap<EntityId, Self>;

    #[doc(hidden)]
    fn column_mut(columns: &mut ComponentColumns) -> &mut BTreeMap<EntityId, Self>;
}

/// Components that may be edited in place.
///
/// `Position` is excluded: moving an entity must go through
/// [`GameState::update_entity_position`] so the spatial hash follows.
pub trait MutableComponent: GameComponent {}

macro_rules! impl_game_component {
    ($($ty:ident => $field:ident),* $(,)?) => {
        $(
            impl GameComponent for $ty {
                const KIND: ComponentKind = ComponentKind::$ty;

                fn column(columns: &ComponentColumns) -> &BTreeMap<EntityId, Self> {
                    &columns.$field
                }

                fn column_mut(columns: &mut ComponentColumns) -> &mut BTreeMap<EntityId, Self> {
                    &mut columns.$field
                }
            }
        )*
    };
}

impl_game_component! {
    Position => position,
    Health => health,
    Attack => attack,
    Movable => movable,
    Vision => vision,
    Flee => flee,
    Selectable => selectable,
    Player => player,
    Dead => dead,
}

impl MutableComponent for Health {}
impl MutableComponent for Attack {}
impl MutableComponent for Movable {}
impl MutableComponent for Vision {}
impl MutableComponent for Flee {}
impl MutableComponent for Selectable {}
impl MutableComponent for Player {}
impl MutableComponent for Dead {}

/// Run `$body` with `$ty` bound to the component type behind `$kind`.
macro_rules! dispatch_kind {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            ComponentKind::Position => { type $ty = Position; $body }
            ComponentKind::Health => { type $ty = Health; $body }
            ComponentKind::Attack => { type $ty = Attack; $body }
            ComponentKind::Movable => { type $ty = Movable; $body }
            ComponentKind::Vision => { type $ty = Vision; $body }
            ComponentKind::Flee => { type $ty = Flee; $body }
            ComponentKind::Selectable => { type $ty = Selectable; $body }
            ComponentKind::Player => { type $ty = Player; $body }
            ComponentKind::Dead => { type $ty = Dead; $body }
        }
    };
}

static NO_ENTITIES: BTreeSet<EntityId> = BTreeSet::new();

/// The entity/component store.
#[derive(Resource, Debug, Clone)]
pub struct GameState {
    entities: BTreeMap<EntityId, ComponentMask>,
    columns: ComponentColumns,
    type_index: [BTreeSet<EntityId>; ComponentKind::COUNT],
    spatial: SpatialHash,
    /// Next id to hand out; `None` once `u64::MAX` has been used.
    next_id: Option<u64>,
    max_entities: usize,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTITIES)
    }
}

impl GameState {
    /// Create an empty store holding at most `max_entities` live entities.
    pub fn new(max_entities: usize) -> Self {
        Self {
            entities: BTreeMap::new(),
            columns: ComponentColumns::default(),
            type_index: Default::default(),
            spatial: SpatialHash::new(),
            next_id: Some(1),
            max_entities,
        }
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Allocate a fresh, never-reused entity id with no components.
    pub fn create_entity(&mut self) -> Result<EntityId, StoreError> {
        if self.entities.len() >= self.max_entities {
            warn!(limit = self.max_entities, "entity_capacity_exceeded");
            return Err(StoreError::CapacityExceeded {
                limit: self.max_entities,
            });
        }
        let raw = self.next_id.ok_or(StoreError::IdSpaceExhausted)?;
        let id = EntityId(raw);
        self.next_id = raw.checked_add(1);
        self.entities.insert(id, ComponentMask::default());
        trace!(entity = %id, "entity_created");
        Ok(id)
    }

    /// Remove an entity and every component it carries.
    /// Returns `false` when the entity was already gone.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        let Some(mask) = self.entities.get(&id).copied() else {
            return false;
        };
        for kind in mask.iter() {
            self.remove_kind(id, kind);
        }
        self.entities.remove(&id);
        trace!(entity = %id, "entity_removed");
        true
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Configured live-entity ceiling.
    pub fn capacity(&self) -> usize {
        self.max_entities
    }

    /// Read-only view of one entity.
    pub fn entity(&self, id: EntityId) -> Option<EntityRef<'_>> {
        self.entities.get(&id).map(|&mask| EntityRef {
            id,
            mask,
            state: self,
        })
    }

    /// Read-only iteration over every live entity, ascending by id.
    pub fn iter_entities(&self) -> impl Iterator<Item = (EntityId, EntityRef<'_>)> + '_ {
        self.entities.iter().map(move |(&id, &mask)| {
            (
                id,
                EntityRef {
                    id,
                    mask,
                    state: self,
                },
            )
        })
    }

    // ------------------------------------------------------------------
    // Components
    // ------------------------------------------------------------------

    /// Attach or overwrite a component. Returns the replaced value, if any.
    pub fn add_component<C: GameComponent>(
        &mut self,
        id: EntityId,
        component: C,
    ) -> Result<Option<C>, StoreError> {
        let mask = self
            .entities
            .get_mut(&id)
            .ok_or(StoreError::NoSuchEntity(id))?;
        mask.insert(C::KIND);
        self.type_index[C::KIND as usize].insert(id);
        let previous = C::column_mut(&mut self.columns).insert(id, component);

        if C::KIND == ComponentKind::Position {
            if let Some(pos) = self.columns.position.get(&id) {
                self.spatial.insert(id, pos.x, pos.y);
            }
        }
        Ok(previous)
    }

    /// Detach a component. No-op (returns `None`) when absent.
    pub fn remove_component<C: GameComponent>(&mut self, id: EntityId) -> Option<C> {
        let removed = C::column_mut(&mut self.columns).remove(&id)?;
        if let Some(mask) = self.entities.get_mut(&id) {
            mask.remove(C::KIND);
        }
        self.type_index[C::KIND as usize].remove(&id);
        if C::KIND == ComponentKind::Position {
            self.spatial.remove(id);
        }
        Some(removed)
    }

    /// Detach a component by runtime kind.
    pub fn remove_kind(&mut self, id: EntityId, kind: ComponentKind) -> bool {
        dispatch_kind!(kind, T => self.remove_component::<T>(id).is_some())
    }

    pub fn get_component<C: GameComponent>(&self, id: EntityId) -> Option<&C> {
        C::column(&self.columns).get(&id)
    }

    pub fn get_component_mut<C: MutableComponent>(&mut self, id: EntityId) -> Option<&mut C> {
        C::column_mut(&mut self.columns).get_mut(&id)
    }

    pub fn has_component<C: GameComponent>(&self, id: EntityId) -> bool {
        C::column(&self.columns).contains_key(&id)
    }

    /// All entities carrying `C`, served from the type index.
    pub fn get_entities_with_component<C: GameComponent>(&self) -> &BTreeSet<EntityId> {
        self.entities_with_kind(C::KIND)
    }

    pub fn entities_with_kind(&self, kind: ComponentKind) -> &BTreeSet<EntityId> {
        self.type_index
            .get(kind as usize)
            .unwrap_or(&NO_ENTITIES)
    }

    /// Owned copy of the ids carrying `C`, for loops that mutate the store.
    pub fn collect_ids<C: GameComponent>(&self) -> Vec<EntityId> {
        self.get_entities_with_component::<C>()
            .iter()
            .copied()
            .collect()
    }

    // ------------------------------------------------------------------
    // Spatial
    // ------------------------------------------------------------------

    /// Grid cell containing a world position.
    #[inline]
    pub fn cell_of(x: f32, y: f32) -> (i32, i32) {
        SpatialHash::cell_of(x, y)
    }

    /// Move an entity. The spatial hash is only touched when the floored
    /// cell changes. Returns `false` if the entity has no `Position`.
    pub fn update_entity_position(&mut self, id: EntityId, x: f32, y: f32) -> bool {
        let Some(pos) = self.columns.position.get_mut(&id) else {
            return false;
        };
        let old_cell = pos.cell();
        pos.x = x;
        pos.y = y;
        if pos.cell() != old_cell {
            self.spatial.insert(id, x, y);
        }
        true
    }

    /// Entities whose position floors to cell `(x, y)`, ascending by id.
    pub fn get_entities_at_position(&self, x: i32, y: i32) -> Vec<EntityId> {
        self.spatial.entities_at((x, y)).collect()
    }

    /// Whether any entity other than `exclude` occupies cell `(x, y)`.
    pub fn is_position_occupied(&self, x: i32, y: i32, exclude: Option<EntityId>) -> bool {
        self.spatial.is_occupied((x, y), exclude)
    }

    pub fn spatial(&self) -> &SpatialHash {
        &self.spatial
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Cross-check masks, columns, the type index, and the spatial hash.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        for (&entity, mask) in &self.entities {
            for kind in ComponentKind::ALL {
                let stored = self.column_contains(kind, entity);
                if mask.contains(kind) != stored {
                    return Err(InvariantViolation::MaskWithoutComponent { entity, kind });
                }
                if self.entities_with_kind(kind).contains(&entity) != stored {
                    return Err(InvariantViolation::TypeIndexMismatch { entity, kind });
                }
            }
        }

        for kind in ComponentKind::ALL {
            for &entity in self.entities_with_kind(kind) {
                if !self.entities.contains_key(&entity) || !self.column_contains(kind, entity) {
                    return Err(InvariantViolation::TypeIndexOrphan { entity, kind });
                }
            }
            if self.column_len(kind) != self.entities_with_kind(kind).len() {
                let entity = dispatch_kind!(kind, T => T::column(&self.columns)
                    .keys()
                    .copied()
                    .find(|id| !self.entities_with_kind(kind).contains(id)))
                .unwrap_or(EntityId(0));
                return Err(InvariantViolation::TypeIndexOrphan { entity, kind });
            }
        }

        for (&entity, pos) in &self.columns.position {
            let expected = Some(pos.cell());
            let cell = self.spatial.cell_of_entity(entity);
            if cell != expected {
                return Err(InvariantViolation::SpatialMismatch {
                    entity,
                    cell,
                    expected,
                });
            }
        }

        for (&cell, entries) in self.spatial.all_cells() {
            if entries.is_empty() {
                return Err(InvariantViolation::EmptySpatialCell(cell));
            }
            for &entity in entries {
                let expected = self.columns.position.get(&entity).map(Position::cell);
                if expected != Some(cell) {
                    return Err(InvariantViolation::SpatialMismatch {
                        entity,
                        cell: Some(cell),
                        expected,
                    });
                }
            }
        }

        Ok(())
    }

    fn column_contains(&self, kind: ComponentKind, id: EntityId) -> bool {
        dispatch_kind!(kind, T => T::column(&self.columns).contains_key(&id))
    }

    fn column_len(&self, kind: ComponentKind) -> usize {
        dispatch_kind!(kind, T => T::column(&self.columns).len())
    }
}

/// Read-only capability view of one entity.
#[derive(Clone, Copy)]
pub struct EntityRef<'a> {
    id: EntityId,
    mask: ComponentMask,
    state: &'a GameState,
}

impl<'a> EntityRef<'a> {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn has<C: GameComponent>(&self) -> bool {
        self.mask.contains(C::KIND)
    }

    pub fn get<C: GameComponent>(&self) -> Option<&'a C> {
        self.state.get_component::<C>(self.id)
    }

    /// Component kinds attached to this entity.
    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> {
        let mask = self.mask;
        ComponentKind::ALL
            .into_iter()
            .filter(move |kind| mask.contains(*kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::HashSet;

    fn positioned(state: &mut GameState, x: f32, y: f32) -> EntityId {
        let id = state.create_entity().unwrap();
        state.add_component(id, Position::new(x, y)).unwrap();
        id
    }

    #[test]
    fn test_ids_unique_until_capacity() {
        let mut state = GameState::new(64);
        let ids: HashSet<_> = (0..64).map(|_| state.create_entity().unwrap()).collect();
        assert_eq!(ids.len(), 64);
        assert_eq!(
            state.create_entity(),
            Err(StoreError::CapacityExceeded { limit: 64 })
        );
    }

    #[test]
    fn test_last_id_is_usable_before_exhaustion() {
        let mut state = GameState::default();
        state.next_id = Some(u64::MAX);
        assert_eq!(state.create_entity(), Ok(EntityId(u64::MAX)));
        assert_eq!(state.create_entity(), Err(StoreError::IdSpaceExhausted));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_ids_never_reused_after_removal() {
        let mut state = GameState::new(2);
        let a = state.create_entity().unwrap();
        let b = state.create_entity().unwrap();
        assert!(state.remove_entity(a));
        let c = state.create_entity().unwrap();
        assert!(c != a && c != b);
        assert!(c > b);
    }

    #[test]
    fn test_add_component_to_missing_entity() {
        let mut state = GameState::default();
        let err = state.add_component(EntityId(99), Health::new(10.0));
        assert_eq!(err, Err(StoreError::NoSuchEntity(EntityId(99))));
        assert!(state.get_entities_with_component::<Health>().is_empty());
    }

    #[test]
    fn test_type_index_tracks_add_and_remove() {
        let mut state = GameState::default();
        let a = state.create_entity().unwrap();
        let b = state.create_entity().unwrap();
        state.add_component(a, Health::new(10.0)).unwrap();
        state.add_component(b, Health::new(20.0)).unwrap();
        state.add_component(b, Vision::new(3)).unwrap();

        assert_eq!(
            state.collect_ids::<Health>(),
            vec![a, b]
        );
        assert_eq!(state.remove_component::<Health>(a).map(|h| h.max_hp), Some(10.0));
        assert_eq!(state.remove_component::<Health>(a), None);
        assert_eq!(state.collect_ids::<Health>(), vec![b]);
        assert!(state.entity(b).unwrap().has::<Vision>());
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_overwrite_returns_previous() {
        let mut state = GameState::default();
        let a = state.create_entity().unwrap();
        state.add_component(a, Vision::new(3)).unwrap();
        let previous = state.add_component(a, Vision::new(5)).unwrap();
        assert_eq!(previous, Some(Vision::new(3)));
        assert_eq!(state.get_component::<Vision>(a), Some(&Vision::new(5)));
        assert_eq!(state.get_entities_with_component::<Vision>().len(), 1);
    }

    #[test]
    fn test_position_feeds_spatial_hash() {
        let mut state = GameState::default();
        let a = positioned(&mut state, 3.5, 4.5);
        let b = positioned(&mut state, 3.1, 4.9);

        assert_eq!(state.get_entities_at_position(3, 4), vec![a, b]);
        assert!(state.is_position_occupied(3, 4, Some(a)));

        state.remove_component::<Position>(b);
        assert!(!state.is_position_occupied(3, 4, Some(a)));
        assert_eq!(state.get_entities_at_position(3, 4), vec![a]);
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_update_position_relocates_only_on_cell_change() {
        let mut state = GameState::default();
        let a = positioned(&mut state, 0.2, 0.2);

        assert!(state.update_entity_position(a, 0.8, 0.9));
        assert_eq!(state.get_entities_at_position(0, 0), vec![a]);

        assert!(state.update_entity_position(a, 1.2, 0.9));
        assert!(state.get_entities_at_position(0, 0).is_empty());
        assert_eq!(state.get_entities_at_position(1, 0), vec![a]);
        assert_eq!(state.spatial().all_cells().count(), 1);

        let unplaced = state.create_entity().unwrap();
        assert!(!state.update_entity_position(unplaced, 1.0, 1.0));
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_remove_entity_is_idempotent() {
        let mut state = GameState::default();
        let a = positioned(&mut state, 1.0, 1.0);
        state.add_component(a, Health::new(5.0)).unwrap();
        state.add_component(a, Player::new(1)).unwrap();

        assert!(state.remove_entity(a));
        assert!(!state.remove_entity(a));
        assert!(!state.contains(a));
        assert!(state.get_entities_with_component::<Player>().is_empty());
        assert!(state.get_entities_at_position(1, 1).is_empty());
        assert!(state.get_component::<Health>(a).is_none());
        state.check_invariants().unwrap();
    }

    #[test]
    fn test_entity_ref_kinds() {
        let mut state = GameState::default();
        let a = positioned(&mut state, 0.0, 0.0);
        state.add_component(a, Dead::default()).unwrap();
        let kinds: Vec<_> = state.entity(a).unwrap().kinds().collect();
        assert_eq!(kinds, vec![ComponentKind::Position, ComponentKind::Dead]);

        let seen: Vec<_> = state.iter_entities().map(|(id, _)| id).collect();
        assert_eq!(seen, vec![a]);
    }

    /// Random operation sequences must keep the spatial hash equal to the
    /// set of live entities whose position floors to each cell.
    #[test]
    fn test_spatial_hash_consistency_under_random_ops() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut state = GameState::new(40);
        let mut live: Vec<EntityId> = Vec::new();

        for _ in 0..2_000 {
            match rng.gen_range(0..5) {
                0 => {
                    if let Ok(id) = state.create_entity() {
                        live.push(id);
                    }
                }
                1 if !live.is_empty() => {
                    let id = live[rng.gen_range(0..live.len())];
                    let pos = Position::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0));
                    state.add_component(id, pos).unwrap();
                }
                2 if !live.is_empty() => {
                    let id = live[rng.gen_range(0..live.len())];
                    state.update_entity_position(
                        id,
                        rng.gen_range(-4.0..4.0),
                        rng.gen_range(-4.0..4.0),
                    );
                }
                3 if !live.is_empty() => {
                    let id = live[rng.gen_range(0..live.len())];
                    state.remove_component::<Position>(id);
                }
                4 if !live.is_empty() => {
                    let idx = rng.gen_range(0..live.len());
                    state.remove_entity(live.swap_remove(idx));
                }
                _ => {}
            }

            state.check_invariants().unwrap();
            for x in -4..4 {
                for y in -4..4 {
                    let expected: Vec<EntityId> = state
                        .get_entities_with_component::<Position>()
                        .iter()
                        .copied()
                        .filter(|&id| state.get_component::<Position>(id).unwrap().cell() == (x, y))
                        .collect();
                    assert_eq!(state.get_entities_at_position(x, y), expected);
                }
            }
        }
    }
}
