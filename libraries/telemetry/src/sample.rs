use std::fmt;

/// Number of tracked markers, and slots in the cycle buffer.
pub const MARKER_COUNT: usize = 4;

/// One decoded marker position, in the units of the motion-capture source.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
pub struct MarkerSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl MarkerSample {
    pub const ZERO: MarkerSample = MarkerSample {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Position of a marker in the cycle buffer, `1..=4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerSlot(u8);

impl MarkerSlot {
    pub const FIRST: MarkerSlot = MarkerSlot(1);
    pub const LAST: MarkerSlot = MarkerSlot(MARKER_COUNT as u8);

    pub fn new(number: u8) -> Option<Self> {
        (1..=MARKER_COUNT as u8)
            .contains(&number)
            .then_some(Self(number))
    }

    /// Slot written by the `writes`-th successful write, `None` before the first.
    pub fn after_writes(writes: u64) -> Option<Self> {
        if writes == 0 {
            return None;
        }
        Some(Self(((writes - 1) % MARKER_COUNT as u64) as u8 + 1))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Zero-based array index.
    pub fn index(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The slot written after this one; wraps from 4 to 1.
    pub fn next(self) -> Self {
        if self == Self::LAST {
            Self::FIRST
        } else {
            Self(self.0 + 1)
        }
    }
}

impl fmt::Display for MarkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
