//! Placement geometry: right-angle rotations, axis mirroring and the
//! library-to-sheet pin transform.
//!
//! Library parts are drawn with y pointing up while the sheet has y pointing
//! down, so the final step of [`transform_pin`] subtracts the rotated y offset.
//! Every coordinate that leaves this module is rounded to 4 decimals, which is
//! what makes exact-coordinate connectivity matching reliable.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Result, SchematicError};

/// Round to the 4-decimal grid used for every coordinate comparison.
pub fn round4(v: f64) -> f64 {
    // `+ 0.0` folds -0.0 into 0.0 so equal points hash equally.
    (v * 10_000.0).round() / 10_000.0 + 0.0
}

/// An absolute sheet coordinate, always on the 4-decimal grid.
#[derive(Debug, Clone, Copy)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point {
            x: round4(x),
            y: round4(y),
        }
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn as_tuple(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits() && self.y.to_bits() == other.y.to_bits()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A right-angle rotation in degrees, counter-clockwise as KiCad stores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    /// Normalise any multiple of 90 degrees (negative or ≥ 360 included).
    pub fn from_degrees(degrees: f64) -> Result<Self> {
        let normalised = degrees.rem_euclid(360.0);
        [Rotation::R0, Rotation::R90, Rotation::R180, Rotation::R270]
            .into_iter()
            .find(|r| r.degrees() as f64 == normalised)
            .ok_or(SchematicError::InvalidRotation(degrees))
    }

    pub fn degrees(self) -> u32 {
        self.quarter_turns() * 90
    }

    pub fn quarter_turns(self) -> u32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 1,
            Rotation::R180 => 2,
            Rotation::R270 => 3,
        }
    }

    /// The rotation 90 degrees further along.
    pub fn next(self) -> Self {
        match self {
            Rotation::R0 => Rotation::R90,
            Rotation::R90 => Rotation::R180,
            Rotation::R180 => Rotation::R270,
            Rotation::R270 => Rotation::R0,
        }
    }

    pub fn flipped(self) -> Self {
        self.next().next()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MirrorAxis {
    X,
    Y,
}

impl MirrorAxis {
    pub fn as_value(self) -> &'static str {
        match self {
            MirrorAxis::X => "x",
            MirrorAxis::Y => "y",
        }
    }

    pub fn from_value(value: &str) -> Option<Self> {
        match value {
            "x" => Some(MirrorAxis::X),
            "y" => Some(MirrorAxis::Y),
            _ => None,
        }
    }
}

impl fmt::Display for MirrorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_value())
    }
}

/// Position plus right-angle rotation, either on the sheet or in part space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub rotation: Rotation,
}

impl Placement {
    pub fn new(x: f64, y: f64, rotation: Rotation) -> Self {
        Placement { x, y, rotation }
    }

    /// Build from raw `(at x y rot)` values, rejecting non-right angles.
    pub fn from_at(x: f64, y: f64, rotation: Option<f64>) -> Result<Self> {
        Ok(Placement {
            x,
            y,
            rotation: Rotation::from_degrees(rotation.unwrap_or(0.0))?,
        })
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// One counter-clockwise quarter turn about the origin.
    pub fn rotate90(&mut self) {
        (self.x, self.y) = (-self.y, self.x);
        self.rotation = self.rotation.next();
    }
}

/// Apply a symbol's mirror to a pin's part-space placement.
pub fn mirror_placement(rel: Placement, mirror: Option<MirrorAxis>) -> Placement {
    match mirror {
        None => rel,
        Some(MirrorAxis::Y) => {
            let rotation = if rel.rotation.degrees() % 180 == 0 {
                rel.rotation.flipped()
            } else {
                rel.rotation
            };
            Placement::new(-rel.x, rel.y, rotation)
        }
        // Every right angle satisfies `rot % 90 == 0`, so mirroring about x always flips.
        Some(MirrorAxis::X) => Placement::new(rel.x, -rel.y, rel.rotation.flipped()),
    }
}

/// Quarter-turn `rel` until the accumulated rotation reaches `target`.
///
/// Returns the rotated placement and the number of steps taken (at most 3).
pub fn rotate_to(mut rel: Placement, target: Rotation) -> (Placement, u32) {
    let mut accumulated = Rotation::R0;
    let mut steps = 0;
    while accumulated != target {
        rel.rotate90();
        accumulated = accumulated.next();
        steps += 1;
    }
    (rel, steps)
}

/// Absolute placement of a library pin on a placed symbol.
pub fn transform_pin(
    symbol: &Placement,
    mirror: Option<MirrorAxis>,
    pin: &Placement,
) -> Placement {
    let (rotated, _) = rotate_to(mirror_placement(*pin, mirror), symbol.rotation);
    Placement {
        x: round4(symbol.x + rotated.x),
        y: round4(symbol.y - rotated.y),
        rotation: rotated.rotation,
    }
}
