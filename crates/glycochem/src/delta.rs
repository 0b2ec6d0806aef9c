// Standard Library Imports
use std::{
    cmp::Ordering,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

// Local Crate Imports
use crate::{Delta, Massive};

// Public API ==========================================================================================================

impl Delta {
    pub const UNMODIFIED: Self = Self(0.0);

    #[must_use]
    pub const fn new(mass: f64) -> Self {
        // NOTE: `-0.0` and `0.0` must compare (and hash) as the same delta
        if mass == 0.0 { Self::UNMODIFIED } else { Self(mass) }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_unmodified(self) -> bool {
        self == Self::UNMODIFIED
    }
}

impl From<f64> for Delta {
    fn from(mass: f64) -> Self {
        Self::new(mass)
    }
}

impl Display for Delta {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:+.4}", self.0)
    }
}

impl Massive for Delta {
    fn monoisotopic_mass(&self) -> f64 {
        self.0
    }
}

// Implementing Ord for Delta ==========================================================================================

impl Ord for Delta {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Delta {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Delta {
    fn eq(&self, other: &Self) -> bool {
        // NOTE: This is *not* equivalent to `self.0 == other.0`! `Ord` and `PartialEq` must agree on which values are
        // equal, so this goes through `.total_cmp()` too
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Delta {}

impl Hash for Delta {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

// Module Tests ========================================================================================================
