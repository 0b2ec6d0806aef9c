// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// External Crate Imports
use itertools::Itertools;

// Local Crate Imports
use crate::{GlobalModification, GlobalModificationLimits, GlobalModificationState, Massive};

// Public API ==========================================================================================================

impl GlobalModificationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn count(&self, modification: GlobalModification) -> u32 {
        self.0.get(&modification).copied().unwrap_or_default()
    }

    pub fn counts(&self) -> impl Iterator<Item = (GlobalModification, u32)> + '_ {
        self.0.iter().map(|(&g, &n)| (g, n))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(GlobalModification, u32)> for GlobalModificationState {
    fn from_iter<T: IntoIterator<Item = (GlobalModification, u32)>>(iter: T) -> Self {
        let mut state = Self::new();
        for (modification, count) in iter.into_iter().filter(|&(_, n)| n > 0) {
            *state.0.entry(modification).or_default() += count;
        }
        state
    }
}

impl Display for GlobalModificationState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (modification, count) in self.counts() {
            write!(f, "{modification}({count})")?;
        }
        Ok(())
    }
}

impl Massive for GlobalModificationState {
    fn monoisotopic_mass(&self) -> f64 {
        self.counts().map(|(g, n)| g.mass() * f64::from(n)).sum()
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl GlobalModificationLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, modification: GlobalModification, max: u32) {
        if max == 0 {
            self.0.remove(&modification);
        } else {
            self.0.insert(modification, max);
        }
    }

    #[must_use]
    pub fn max(&self, modification: GlobalModification) -> u32 {
        self.0.get(&modification).copied().unwrap_or_default()
    }

    /// Every combination of global modification counts within the limits
    ///
    /// States are ordered like nested loops over `Ac`, `P`, then `S`, with the last modification varying fastest. The
    /// unmodified state always comes first, and is the only state when no limits are set.
    #[must_use]
    pub fn states(&self) -> Vec<GlobalModificationState> {
        if self.0.is_empty() {
            return vec![GlobalModificationState::new()];
        }

        self.0
            .iter()
            .map(|(&modification, &max)| (0..=max).map(move |n| (modification, n)))
            .multi_cartesian_product()
            .map(GlobalModificationState::from_iter)
            .collect()
    }

    /// The heaviest mass any state can add to a glycan
    #[must_use]
    pub fn max_mass(&self) -> f64 {
        self.0.iter().map(|(g, &n)| g.mass() * f64::from(n)).sum()
    }
}

impl FromIterator<(GlobalModification, u32)> for GlobalModificationLimits {
    fn from_iter<T: IntoIterator<Item = (GlobalModification, u32)>>(iter: T) -> Self {
        let mut limits = Self::new();
        for (modification, max) in iter {
            limits.set(modification, max);
        }
        limits
    }
}

// Module Tests ========================================================================================================
