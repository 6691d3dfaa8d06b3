//! World coordinates.
//!
//! `BlockPos` is the integer anchor position used as the key across every
//! encounter store; `Vec3` is a continuous actor position.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::DomainError;

/// Integer block coordinate of an encounter anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Durable key in `x,y,z` form.
    pub fn key(&self) -> String {
        format!("{},{},{}", self.x, self.y, self.z)
    }

    /// Point actors are arranged around: block center, one block up.
    pub fn spawn_center(&self) -> Vec3 {
        Vec3::new(
            f64::from(self.x) + 0.5,
            f64::from(self.y) + 1.0,
            f64::from(self.z) + 0.5,
        )
    }

    pub fn distance_to(&self, other: &BlockPos) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        let dz = f64::from(self.z - other.z);
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl FromStr for BlockPos {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [x, y, z] = parts.as_slice() else {
            return Err(DomainError::parse(format!("Invalid position key: {}", s)));
        };
        let coord = |part: &str| {
            part.parse::<i32>()
                .map_err(|e| DomainError::parse(format!("Invalid coordinate '{}': {}", part, e)))
        };
        Ok(Self::new(coord(x)?, coord(y)?, coord(z)?))
    }
}

/// Continuous world position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

/// Facing of a spawned actor; only yaw is used.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    pub yaw: f64,
}

impl Rotation {
    pub const fn yaw(yaw: f64) -> Self {
        Self { yaw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_key_is_parsed_then_position_is_restored() {
        let pos = BlockPos::new(-12, 64, 300);
        assert_eq!(pos.key(), "-12,64,300");
        assert_eq!(pos.key().parse::<BlockPos>(), Ok(pos));
    }

    #[test]
    fn when_key_is_malformed_then_parse_fails() {
        assert!("1,2".parse::<BlockPos>().is_err());
        assert!("1,a,3".parse::<BlockPos>().is_err());
    }

    #[test]
    fn when_computing_spawn_center_then_it_sits_above_block_center() {
        let center = BlockPos::new(10, 5, -3).spawn_center();
        assert_eq!(center, Vec3::new(10.5, 6.0, -2.5));
    }
}
