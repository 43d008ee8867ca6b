//! Components for the Grid Tactics simulation.
//!
//! Components are plain data records attached to entities. An entity has at
//! most one component of each kind; all behaviour lives in the systems that
//! read and write these records through [`GameState`](crate::state::GameState).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ============================================================================
// IDENTITY
// ============================================================================

/// Opaque entity handle. Allocated monotonically, never reused in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Faction ownership. Equal ids are friendly, unequal ids are hostile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Player {
    pub player_id: u32,
}

impl Player {
    pub fn new(player_id: u32) -> Self {
        Self { player_id }
    }

    pub fn is_hostile_to(&self, other: &Player) -> bool {
        self.player_id != other.player_id
    }
}

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World position in grid units. Sub-tile movement is fractional.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Integer grid cell containing this position.
    #[inline]
    pub fn cell(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

/// Movement capability and the current movement order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Movable {
    /// Grid units per second.
    pub speed: f32,
    pub target_x: Option<f32>,
    pub target_y: Option<f32>,
    /// Remaining waypoints; the front cell is the immediate sub-target.
    pub path: VecDeque<(i32, i32)>,
    pub can_fly: bool,
    /// Intelligent movers follow a pathfinder route; others walk straight.
    pub intelligent: bool,
}

impl Movable {
    pub fn new(speed: f32) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }

    pub fn intelligent(mut self) -> Self {
        self.intelligent = true;
        self
    }

    pub fn flying(mut self) -> Self {
        self.can_fly = true;
        self
    }

    pub fn target(&self) -> Option<(f32, f32)> {
        match (self.target_x, self.target_y) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    pub fn set_target(&mut self, x: f32, y: f32) {
        self.target_x = Some(x);
        self.target_y = Some(y);
    }

    pub fn clear_target(&mut self) {
        self.target_x = None;
        self.target_y = None;
        self.path.clear();
    }

    pub fn is_moving(&self) -> bool {
        !self.path.is_empty() || self.target().is_some()
    }
}

/// Sight radius in whole tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vision {
    pub range: u32,
}

impl Vision {
    pub fn new(range: u32) -> Self {
        Self { range }
    }
}

// ============================================================================
// COMBAT COMPONENTS
// ============================================================================

/// Hit points and passive regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub hp: f32,
    pub max_hp: f32,
    /// Hit points restored per second.
    pub regen_rate: f32,
}

impl Health {
    pub fn new(max_hp: f32) -> Self {
        Self {
            hp: max_hp,
            max_hp,
            regen_rate: 0.0,
        }
    }

    pub fn with_regen(mut self, regen_rate: f32) -> Self {
        self.regen_rate = regen_rate;
        self
    }

    pub fn fraction(&self) -> f32 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            self.hp / self.max_hp
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// Regenerate toward `max_hp` without exceeding it.
    pub fn regenerate(&mut self, dt: f32) {
        if self.hp < self.max_hp {
            self.hp = (self.hp + self.regen_rate * dt).min(self.max_hp);
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Melee or ranged attack capability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub damage: i32,
    pub range: f32,
    /// Attacks per second.
    pub speed: f32,
    pub target: Option<EntityId>,
    /// Seconds until the next attack. Ready once `<= 0`.
    pub cooldown: f32,
}

impl Attack {
    pub fn new(damage: i32, range: f32, speed: f32) -> Self {
        Self {
            damage,
            range,
            speed,
            target: None,
            cooldown: 0.0,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.cooldown <= 0.0
    }

    /// Seconds between attacks, or `None` for an attack that never fires.
    pub fn interval(&self) -> Option<f32> {
        (self.speed > 0.0).then(|| 1.0 / self.speed)
    }
}

// ============================================================================
// BEHAVIOUR COMPONENTS
// ============================================================================

/// Flee capability and state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Flee {
    /// Health fraction at or below which the unit runs from visible enemies.
    pub health_threshold: Option<f32>,
    /// Run from any visible enemy regardless of health.
    pub flees_from_enemies: bool,
    pub is_fleeing: bool,
}

impl Flee {
    pub fn below_health(threshold: f32) -> Self {
        Self {
            health_threshold: Some(threshold.clamp(0.0, 1.0)),
            ..Default::default()
        }
    }

    pub fn from_enemies() -> Self {
        Self {
            flees_from_enemies: true,
            ..Default::default()
        }
    }

    pub fn is_low_health(&self, health: &Health) -> bool {
        match self.health_threshold {
            Some(threshold) if health.max_hp > 0.0 => health.fraction() <= threshold,
            _ => false,
        }
    }
}

/// Marks an entity the player can select.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selectable {
    pub is_selected: bool,
}

/// Corpse marker. Absence means alive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dead {
    /// Seconds since death.
    pub timer: f32,
}

// ============================================================================
// COMPONENT KINDS
// ============================================================================

/// Runtime tag for each component type, used by the type index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    Position,
    Health,
    Attack,
    Movable,
    Vision,
    Flee,
    Selectable,
    Player,
    Dead,
}

impl ComponentKind {
    pub const COUNT: usize = 9;

    pub const ALL: [ComponentKind; Self::COUNT] = [
        ComponentKind::Position,
        ComponentKind::Health,
        ComponentKind::Attack,
        ComponentKind::Movable,
        ComponentKind::Vision,
        ComponentKind::Flee,
        ComponentKind::Selectable,
        ComponentKind::Player,
        ComponentKind::Dead,
    ];

    #[inline]
    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of component kinds attached to one entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentMask(u16);

impl ComponentMask {
    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        ComponentKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regen_stops_at_max() {
        let mut health = Health::new(50.0).with_regen(10.0);
        health.hp = 45.0;
        health.regenerate(1.0);
        assert_eq!(health.hp, 50.0);
        health.regenerate(1.0);
        assert_eq!(health.hp, 50.0);
    }

    #[test]
    fn test_position_cell_floors_negative() {
        assert_eq!(Position::new(2.9, 7.0).cell(), (2, 7));
        assert_eq!(Position::new(-0.5, 0.2).cell(), (-1, 0));
    }

    #[test]
    fn test_flee_low_health_threshold_inclusive() {
        let flee = Flee::below_health(0.5);
        let mut health = Health::new(100.0);
        health.hp = 50.0;
        assert!(flee.is_low_health(&health));
        health.hp = 51.0;
        assert!(!flee.is_low_health(&health));
        assert!(!Flee::from_enemies().is_low_health(&health));
    }

    #[test]
    fn test_component_mask() {
        let mut mask = ComponentMask::default();
        assert!(mask.is_empty());
        mask.insert(ComponentKind::Health);
        mask.insert(ComponentKind::Dead);
        assert!(mask.contains(ComponentKind::Dead));
        assert_eq!(
            mask.iter().collect::<Vec<_>>(),
            vec![ComponentKind::Health, ComponentKind::Dead]
        );
        mask.remove(ComponentKind::Health);
        assert!(!mask.contains(ComponentKind::Health));
    }

    #[test]
    fn test_attack_interval() {
        assert_eq!(Attack::new(5, 1.0, 2.0).interval(), Some(0.5));
        assert_eq!(Attack::new(5, 1.0, 0.0).interval(), None);
    }
}
