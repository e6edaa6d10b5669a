use std::fmt;

use serde::{Deserialize, Serialize};

/// Grid coordinates of a terrain cell. Longitude wraps around the planet;
/// latitude is clamped at the poles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorldPosition {
    pub longitude: u32,
    pub latitude: u32,
}

impl WorldPosition {
    pub fn new(longitude: u32, latitude: u32) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

impl fmt::Display for WorldPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.longitude, self.latitude)
    }
}

/// Compass direction to a neighbouring cell. The discriminants are the
/// clockwise ordinal used by directional random walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Direction {
    North = 0,
    Northeast = 1,
    East = 2,
    Southeast = 3,
    South = 4,
    Southwest = 5,
    West = 6,
    Northwest = 7,
}

string_enum!(Direction {
    North => "north",
    Northeast => "northeast",
    East => "east",
    Southeast => "southeast",
    South => "south",
    Southwest => "southwest",
    West => "west",
    Northwest => "northwest",
});

impl Direction {
    /// All directions in clockwise order starting from north.
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Rotate clockwise by `steps` (mod 8).
    pub fn rotate(self, steps: usize) -> Direction {
        Direction::ALL[(self.index() + steps) % 8]
    }

    /// Longitude and latitude deltas. North increases latitude.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, 1),
            Direction::Northeast => (1, 1),
            Direction::East => (1, 0),
            Direction::Southeast => (1, -1),
            Direction::South => (0, -1),
            Direction::Southwest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::Northwest => (-1, 1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        let (dx, dy) = self.delta();
        dx != 0 && dy != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_wraps() {
        assert_eq!(Direction::North.rotate(1), Direction::Northeast);
        assert_eq!(Direction::Northwest.rotate(1), Direction::North);
        assert_eq!(Direction::North.rotate(7), Direction::Northwest);
        assert_eq!(Direction::South.rotate(6), Direction::East);
    }

    #[test]
    fn direction_string_round_trip() {
        for dir in Direction::ALL {
            let s: String = dir.into();
            assert_eq!(Direction::try_from(s).unwrap(), dir);
        }
        assert!(Direction::try_from("up".to_string()).is_err());
    }

    #[test]
    fn position_display() {
        assert_eq!(WorldPosition::new(3, 9).to_string(), "(3, 9)");
    }
}
