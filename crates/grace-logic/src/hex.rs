//! Axial hex coordinate math.
//!
//! Cells live on an unbounded axial `(q, r)` grid. The direction table in
//! [`DIRECTIONS`] is the only definition of "direction" in the crate: player
//! movement, path walks and neighbor enumeration all index into it.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Axial hex coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

/// The six unit steps, indexed 0..=5: E, NE, NW, W, SW, SE.
pub const DIRECTIONS: [HexCoord; 6] = [
    HexCoord { q: 1, r: 0 },
    HexCoord { q: 1, r: -1 },
    HexCoord { q: 0, r: -1 },
    HexCoord { q: -1, r: 0 },
    HexCoord { q: -1, r: 1 },
    HexCoord { q: 0, r: 1 },
];

/// Canonical packed encoding of a coordinate, used as the world map key.
pub fn key(q: i32, r: i32) -> u64 {
    ((q as u32 as u64) << 32) | (r as u32 as u64)
}

/// Hex distance between two coordinates.
pub fn distance(a: HexCoord, b: HexCoord) -> i32 {
    let dq = a.q - b.q;
    let dr = a.r - b.r;
    (dq.abs() + (dq + dr).abs() + dr.abs()) / 2
}

/// The 6 adjacent coordinates, in direction-table order.
pub fn neighbors(q: i32, r: i32) -> [HexCoord; 6] {
    let origin = HexCoord::new(q, r);
    DIRECTIONS.map(|d| origin + d)
}

/// Look up a direction vector. `None` for indices outside 0..=5.
pub fn direction(index: usize) -> Option<HexCoord> {
    DIRECTIONS.get(index).copied()
}

/// All coordinates at exactly `radius` from `center`, walking the ring
/// counter-clockwise from the south-west corner. Radius 0 yields the center.
pub fn ring(center: HexCoord, radius: i32) -> Vec<HexCoord> {
    if radius <= 0 {
        return vec![center];
    }
    let mut out = Vec::with_capacity(6 * radius as usize);
    let mut hex = center + DIRECTIONS[4] * radius;
    for dir in DIRECTIONS {
        for _ in 0..radius {
            out.push(hex);
            hex = hex + dir;
        }
    }
    out
}

/// Axis-aligned `(q, r)` box of half extent `radius` around `center`,
/// iterated q-major. This is the sweep used for chunk bounds and radius
/// queries; it is a rhombus on screen, not a hexagon.
pub fn bounding_box(center: HexCoord, radius: i32) -> impl Iterator<Item = HexCoord> {
    let (cq, cr) = (center.q, center.r);
    (cq - radius..=cq + radius)
        .flat_map(move |q| (cr - radius..=cr + radius).map(move |r| HexCoord::new(q, r)))
}

impl HexCoord {
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    pub fn key(self) -> u64 {
        key(self.q, self.r)
    }

    pub fn distance(self, other: Self) -> i32 {
        distance(self, other)
    }

    pub fn neighbors(self) -> [HexCoord; 6] {
        neighbors(self.q, self.r)
    }

    /// Whether this coordinate lies in the box of half extent `radius`.
    pub fn within_box(self, center: Self, radius: i32) -> bool {
        (self.q - center.q).abs() <= radius && (self.r - center.r).abs() <= radius
    }

    /// Flat-top pixel center of this hex for a given tile size.
    pub fn to_pixel(self, tile_size: f32) -> (f32, f32) {
        let q = self.q as f32;
        let r = self.r as f32;
        let sqrt3 = 3f32.sqrt();
        (tile_size * 1.5 * q, tile_size * (sqrt3 / 2.0 * q + sqrt3 * r))
    }
}

impl Add for HexCoord {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.q + other.q, self.r + other.r)
    }
}

impl Sub for HexCoord {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.q - other.q, self.r - other.r)
    }
}

impl Mul<i32> for HexCoord {
    type Output = Self;
    fn mul(self, scalar: i32) -> Self {
        Self::new(self.q * scalar, self.r * scalar)
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}
