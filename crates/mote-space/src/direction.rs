//! The six face directions of a subvolume.

/// A face of an axis-aligned box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Direction {
    /// Towards smaller x.
    XNeg,
    /// Towards larger x.
    XPos,
    /// Towards smaller y.
    YNeg,
    /// Towards larger y.
    YPos,
    /// Towards smaller z.
    ZNeg,
    /// Towards larger z.
    ZPos,
}

impl Direction {
    /// All six directions, in neighbor-slot order.
    pub const ALL: [Direction; 6] = [
        Direction::XNeg,
        Direction::XPos,
        Direction::YNeg,
        Direction::YPos,
        Direction::ZNeg,
        Direction::ZPos,
    ];

    /// Build from an axis (0 = x, 1 = y, 2 = z) and a sign.
    pub fn from_axis(axis: usize, positive: bool) -> Self {
        Self::ALL[2 * axis.min(2) + usize::from(positive)]
    }

    /// The axis this direction runs along.
    pub fn axis(self) -> usize {
        self.slot() / 2
    }

    /// Whether it points towards larger coordinates.
    pub fn is_positive(self) -> bool {
        self.slot() % 2 == 1
    }

    /// The reverse direction.
    pub fn opposite(self) -> Self {
        Self::from_axis(self.axis(), !self.is_positive())
    }

    /// Index into a subvolume's neighbor array.
    pub fn slot(self) -> usize {
        self as usize
    }
}
