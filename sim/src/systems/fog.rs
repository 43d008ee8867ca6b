//! Fog-of-war - three-state tile visibility for the local player.
//!
//! Each update first downgrades every `Visible` tile to `Explored`, then
//! re-reveals the circles around friendly units. Tiles never return to
//! `Hidden` once seen.

use crate::components::*;
use crate::config::SimConfig;
use crate::state::GameState;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Visibility of one map tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileVisibility {
    /// Never seen.
    #[default]
    Hidden,
    /// Seen before, not currently in sight.
    Explored,
    /// In a friendly unit's vision radius this tick.
    Visible,
}

/// Per-tile counts, mostly for debugging overlays.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FogCounts {
    pub hidden: usize,
    pub explored: usize,
    pub visible: usize,
}

/// Row-major visibility grid matching the map's dimensions.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct FogOfWar {
    width: u32,
    height: u32,
    tiles: Vec<TileVisibility>,
}

impl FogOfWar {
    /// Fully hidden grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            tiles: vec![TileVisibility::Hidden; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        (x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Visibility at a tile; `None` outside the grid.
    pub fn visibility_at(&self, x: i32, y: i32) -> Option<TileVisibility> {
        self.index(x, y).map(|idx| self.tiles[idx])
    }

    pub fn is_visible(&self, x: i32, y: i32) -> bool {
        self.visibility_at(x, y) == Some(TileVisibility::Visible)
    }

    /// Seen at some point, including right now.
    pub fn is_explored(&self, x: i32, y: i32) -> bool {
        matches!(
            self.visibility_at(x, y),
            Some(TileVisibility::Explored | TileVisibility::Visible)
        )
    }

    /// Whether an entity's tile is currently visible.
    pub fn is_entity_visible(&self, state: &GameState, id: EntityId) -> bool {
        state
            .get_component::<Position>(id)
            .is_some_and(|pos| {
                let (x, y) = pos.cell();
                self.is_visible(x, y)
            })
    }

    /// Mark every tile visible.
    pub fn reveal_all(&mut self) {
        self.tiles.fill(TileVisibility::Visible);
    }

    pub fn counts(&self) -> FogCounts {
        let mut counts = FogCounts::default();
        for tile in &self.tiles {
            match tile {
                TileVisibility::Hidden => counts.hidden += 1,
                TileVisibility::Explored => counts.explored += 1,
                TileVisibility::Visible => counts.visible += 1,
            }
        }
        counts
    }

    /// Cells currently in the given state, row-major.
    pub fn cells_with(&self, visibility: TileVisibility) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.width as usize;
        self.tiles
            .iter()
            .enumerate()
            .filter(move |(_, tile)| **tile == visibility)
            .map(move |(idx, _)| ((idx % width) as i32, (idx / width) as i32))
    }

    /// Recompute visibility from the units owned by `player_id`.
    pub fn update(&mut self, state: &GameState, player_id: u32) {
        for tile in self.tiles.iter_mut() {
            if *tile == TileVisibility::Visible {
                *tile = TileVisibility::Explored;
            }
        }

        for &id in state.get_entities_with_component::<Vision>() {
            if state.has_component::<Dead>(id) {
                continue;
            }
            let Some(player) = state.get_component::<Player>(id) else {
                continue;
            };
            if player.player_id != player_id {
                continue;
            }
            let (Some(pos), Some(vision)) = (
                state.get_component::<Position>(id),
                state.get_component::<Vision>(id),
            ) else {
                continue;
            };
            self.reveal_circle(pos.cell(), vision.range);
        }
    }

    /// Mark every tile within `radius` of `(cx, cy)` visible. Only the part
    /// of the bounding square that overlaps the grid is scanned.
    fn reveal_circle(&mut self, (cx, cy): (i32, i32), radius: u32) {
        let (cx, cy, r) = (i128::from(cx), i128::from(cy), i128::from(radius));
        let radius_sq = r * r;
        let x_range = (cx - r).max(0)..=(cx + r).min(i128::from(self.width) - 1);
        let y_range = (cy - r).max(0)..=(cy + r).min(i128::from(self.height) - 1);
        let width = self.width as usize;

        for y in y_range {
            let dy = y - cy;
            for x in x_range.clone() {
                let dx = x - cx;
                if dx * dx + dy * dy <= radius_sq {
                    self.tiles[y as usize * width + x as usize] = TileVisibility::Visible;
                }
            }
        }
    }
}

/// System wrapper that reveals the fog for the configured local player.
pub fn fog_system(config: Res<SimConfig>, state: Res<GameState>, mut fog: ResMut<FogOfWar>) {
    fog.update(&state, config.local_player);
}
