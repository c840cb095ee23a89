//! Handles for things that live in the game world.
//!
//! None of these are owned by the relay. Actor handles are resolved through
//! the game adapter and compared by their platform-assigned identity only.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform-assigned actor identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle to a connected actor.
///
/// Equality and hashing use `id` only; `name` is the login name at the time
/// the handle was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRef {
    pub id: ActorId,
    pub name: String,
}

impl ActorRef {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl PartialEq for ActorRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Facing direction as a vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Direction {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Direction {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns the unit vector, or the zero vector unchanged.
    pub fn normalized(&self) -> Self {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z).sqrt();
        if len == 0.0 {
            return *self;
        }
        Self::new(self.x / len, self.y / len, self.z / len)
    }
}

/// A point in a named world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Returns the point `distance` units along `facing`, in the same world.
    pub fn ahead(&self, facing: Direction, distance: f64) -> Location {
        let unit = facing.normalized();
        Location {
            world: self.world.clone(),
            x: self.x + unit.x * distance,
            y: self.y + unit.y * distance,
            z: self.z + unit.z * distance,
        }
    }
}

/// Colour of an entity nameplate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameColor {
    White,
    Yellow,
    Green,
    Red,
    DarkRed,
}

impl NameColor {
    /// Legacy chat formatting code for this colour.
    pub fn code(&self) -> char {
        match self {
            NameColor::White => 'f',
            NameColor::Yellow => 'e',
            NameColor::Green => 'a',
            NameColor::Red => 'c',
            NameColor::DarkRed => '4',
        }
    }
}

/// Visible name attached to an entity.
///
/// Red is reserved: only hostiles spawned by the relay carry it, and the
/// combat rule keys off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nameplate {
    pub text: String,
    pub color: NameColor,
    pub visible: bool,
}

impl Nameplate {
    /// Colour that marks a relay-spawned hostile.
    pub const HOSTILE_MARKER: NameColor = NameColor::Red;

    /// Nameplate for a relay-spawned hostile.
    pub fn hostile(label: impl Into<String>) -> Self {
        Self {
            text: label.into(),
            color: Self::HOSTILE_MARKER,
            visible: true,
        }
    }

    pub fn is_hostile_marker(&self) -> bool {
        self.color == Self::HOSTILE_MARKER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_equality_ignores_name() {
        let id = ActorId::new_v4();
        let a = ActorRef::new(id, "Mira");
        let b = ActorRef::new(id, "mira_renamed");
        assert_eq!(a, b);
        assert_ne!(a, ActorRef::new(ActorId::new_v4(), "Mira"));
    }

    #[test]
    fn test_ahead_uses_unit_vector() {
        let loc = Location::new("mines/deep", 10.0, 64.0, -5.0);
        let spot = loc.ahead(Direction::new(0.0, 0.0, 2.0), 3.0);
        assert_eq!(spot.world, "mines/deep");
        assert_eq!(spot.x, 10.0);
        assert_eq!(spot.y, 64.0);
        assert_eq!(spot.z, -2.0);
    }

    #[test]
    fn test_ahead_with_zero_facing_stays_put() {
        let loc = Location::new("mines/a", 1.0, 2.0, 3.0);
        assert_eq!(loc.ahead(Direction::new(0.0, 0.0, 0.0), 3.0), loc);
    }

    #[test]
    fn test_hostile_nameplate() {
        let plate = Nameplate::hostile("Voss");
        assert!(plate.visible);
        assert!(plate.is_hostile_marker());
        let plain = Nameplate {
            text: "Steve".into(),
            color: NameColor::White,
            visible: true,
        };
        assert!(!plain.is_hostile_marker());
    }
}
