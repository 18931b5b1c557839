use serde::{Deserialize, Serialize};

/// Geographic rectangle in degrees.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Rectangle {
    /// The whole globe.
    pub const MAX: Rectangle = Rectangle {
        west: -180.0,
        south: -90.0,
        east: 180.0,
        north: 90.0,
    };

    pub const fn from_degrees(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Builds from a `[west, south, east, north]` slice; anything but four values is rejected.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [w, s, e, n] => Some(Self::from_degrees(*w, *s, *e, *n)),
            _ => None,
        }
    }
}

impl Default for Rectangle {
    fn default() -> Self {
        Self::MAX
    }
}
