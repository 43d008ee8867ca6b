//! Spatial hash mirroring live entity positions.
//!
//! Maps each occupied integer grid cell to the set of entities whose
//! position floors to that cell. Gives O(1) occupancy checks instead of a
//! scan over every positioned entity.

use crate::components::EntityId;
use std::collections::{BTreeSet, HashMap};

/// Grid cell → entity set, plus the reverse lookup.
///
/// Cells never hold an empty set: the entry is dropped when its last
/// entity leaves.
#[derive(Debug, Default, Clone)]
pub struct SpatialHash {
    cells: HashMap<(i32, i32), BTreeSet<EntityId>>,
    entity_cells: HashMap<EntityId, (i32, i32)>,
}

impl SpatialHash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert world coordinates to cell coordinates.
    #[inline]
    pub fn cell_of(x: f32, y: f32) -> (i32, i32) {
        (x.floor() as i32, y.floor() as i32)
    }

    /// Place an entity at a position, moving it out of its old cell if needed.
    /// Returns `true` when the entity's cell changed.
    pub fn insert(&mut self, entity: EntityId, x: f32, y: f32) -> bool {
        let cell = Self::cell_of(x, y);
        match self.entity_cells.insert(entity, cell) {
            Some(old_cell) if old_cell == cell => false,
            Some(old_cell) => {
                self.detach(entity, old_cell);
                self.cells.entry(cell).or_default().insert(entity);
                true
            }
            None => {
                self.cells.entry(cell).or_default().insert(entity);
                true
            }
        }
    }

    /// Remove an entity. No-op when it is not tracked.
    pub fn remove(&mut self, entity: EntityId) {
        if let Some(cell) = self.entity_cells.remove(&entity) {
            self.detach(entity, cell);
        }
    }

    fn detach(&mut self, entity: EntityId, cell: (i32, i32)) {
        if let Some(entries) = self.cells.get_mut(&cell) {
            entries.remove(&entity);
            if entries.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Entities in a cell, ascending by id.
    pub fn entities_at(&self, cell: (i32, i32)) -> impl Iterator<Item = EntityId> + '_ {
        self.cells.get(&cell).into_iter().flatten().copied()
    }

    /// Whether any entity other than `exclude` occupies the cell.
    pub fn is_occupied(&self, cell: (i32, i32), exclude: Option<EntityId>) -> bool {
        self.cells
            .get(&cell)
            .is_some_and(|entries| entries.iter().any(|&e| Some(e) != exclude))
    }

    /// Cell the entity is currently filed under.
    pub fn cell_of_entity(&self, entity: EntityId) -> Option<(i32, i32)> {
        self.entity_cells.get(&entity).copied()
    }

    /// Get count of entities in a cell.
    pub fn cell_count(&self, cell: (i32, i32)) -> usize {
        self.cells.get(&cell).map_or(0, |entries| entries.len())
    }

    /// Get total entity count.
    pub fn total_count(&self) -> usize {
        self.entity_cells.len()
    }

    /// Get all occupied cells (for debugging/visualization).
    pub fn all_cells(&self) -> impl Iterator<Item = (&(i32, i32), &BTreeSet<EntityId>)> {
        self.cells.iter()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.entity_cells.clear();
    }
}
