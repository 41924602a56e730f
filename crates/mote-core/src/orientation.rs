//! Orientation of a molecule relative to a wall.

use std::fmt;

/// Which side of a surface a molecule faces.
///
/// For surface molecules this is the facing of the molecule itself; in
/// reaction definitions it is a relative orientation that is matched
/// against, and inherited from, the reference reactant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    /// Facing the back of the wall (against the normal).
    Down,
    /// Unoriented.
    #[default]
    None,
    /// Facing the front of the wall (along the normal).
    Up,
}

impl Orientation {
    /// Signed value: -1, 0 or 1.
    pub fn sign(self) -> i8 {
        match self {
            Self::Down => -1,
            Self::None => 0,
            Self::Up => 1,
        }
    }

    /// Build from a signed value; the sign alone matters.
    pub fn from_sign(v: i8) -> Self {
        match v.signum() {
            -1 => Self::Down,
            1 => Self::Up,
            _ => Self::None,
        }
    }

    /// The opposite facing. `None` stays `None`.
    pub fn flipped(self) -> Self {
        Self::from_sign(-self.sign())
    }

    /// Product of two orientations, treating `None` as neutral.
    pub fn compose(self, other: Self) -> Self {
        match (self, other) {
            (Self::None, o) | (o, Self::None) => o,
            (a, b) => Self::from_sign(a.sign() * b.sign()),
        }
    }

    /// Whether two orientations are compatible when matching a reactant.
    ///
    /// `None` on either side matches anything.
    pub fn matches(self, other: Self) -> bool {
        self == Self::None || other == Self::None || self == other
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Down => ",",
            Self::None => ";",
            Self::Up => "'",
        };
        f.write_str(s)
    }
}
