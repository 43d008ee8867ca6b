//! Map collaborator interface.
//!
//! The simulation consumes the map only through [`NavMap`]: grid bounds,
//! walkability, and an opaque `find_path` service. [`GridMap`] is a plain
//! walkability grid with a breadth-first pathfinder, used by the demo and
//! tests.

use bevy_ecs::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;

/// Map services the simulation depends on.
pub trait NavMap: Send + Sync {
    /// Cells from `start` (exclusive) to `goal` (inclusive). Empty when
    /// `start == goal` or no path exists.
    fn find_path(&self, start: (i32, i32), goal: (i32, i32), can_fly: bool) -> Vec<(i32, i32)>;

    fn is_walkable(&self, x: i32, y: i32) -> bool;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width() && (y as u32) < self.height()
    }
}

/// Resource wrapper for the map, allowing shared access in ECS systems.
#[derive(Resource, Clone)]
pub struct NavResource(pub Arc<dyn NavMap>);

impl NavResource {
    pub fn new(map: impl NavMap + 'static) -> Self {
        Self(Arc::new(map))
    }

    pub fn map(&self) -> &dyn NavMap {
        self.0.as_ref()
    }
}

/// Row-major walkability grid.
#[derive(Debug, Clone)]
pub struct GridMap {
    width: u32,
    height: u32,
    walkable: Vec<bool>,
}

impl GridMap {
    /// Fully walkable map.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            walkable: vec![true; width as usize * height as usize],
        }
    }

    /// Map with a vertical wall spanning `x_range` columns over `y_range` rows.
    pub fn with_wall(
        width: u32,
        height: u32,
        x_range: std::ops::RangeInclusive<i32>,
        y_range: std::ops::RangeInclusive<i32>,
    ) -> Self {
        let mut map = Self::new(width, height);
        for x in x_range {
            for y in y_range.clone() {
                map.set_walkable(x, y, false);
            }
        }
        map
    }

    pub fn set_walkable(&mut self, x: i32, y: i32, walkable: bool) {
        if let Some(idx) = self.index(x, y) {
            self.walkable[idx] = walkable;
        }
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    fn passable(&self, x: i32, y: i32, can_fly: bool) -> bool {
        self.in_bounds(x, y) && (can_fly || self.is_walkable(x, y))
    }
}

impl NavMap for GridMap {
    fn find_path(&self, start: (i32, i32), goal: (i32, i32), can_fly: bool) -> Vec<(i32, i32)> {
        if start == goal || !self.passable(goal.0, goal.1, can_fly) {
            return Vec::new();
        }
        let Some(start_idx) = self.index(start.0, start.1) else {
            return Vec::new();
        };

        let mut came_from: Vec<Option<(i32, i32)>> = vec![None; self.walkable.len()];
        let mut visited = vec![false; self.walkable.len()];
        let mut frontier = VecDeque::from([start]);
        visited[start_idx] = true;

        while let Some(cell) = frontier.pop_front() {
            if cell == goal {
                let mut path = vec![cell];
                let mut current = cell;
                while let Some(prev) = self.index(current.0, current.1).and_then(|i| came_from[i]) {
                    if prev == start {
                        break;
                    }
                    path.push(prev);
                    current = prev;
                }
                path.reverse();
                return path;
            }

            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let next = (cell.0 + dx, cell.1 + dy);
                if !self.passable(next.0, next.1, can_fly) {
                    continue;
                }
                let Some(next_idx) = self.index(next.0, next.1) else {
                    continue;
                };
                if !visited[next_idx] {
                    visited[next_idx] = true;
                    came_from[next_idx] = Some(cell);
                    frontier.push_back(next);
                }
            }
        }

        Vec::new()
    }

    fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.index(x, y).is_some_and(|idx| self.walkable[idx])
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }
}
