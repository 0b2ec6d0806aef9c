// Standard Library Imports
use std::{
    collections::BTreeMap,
    fmt::{self, Display, Formatter},
};

// Local Crate Imports
use crate::{Composition, Delta, Massive, Monosaccharide, Residue};

// Public API ==========================================================================================================

impl Residue {
    #[must_use]
    pub const fn new(monosaccharide: Monosaccharide, delta: Delta) -> Self {
        Self {
            monosaccharide,
            delta,
        }
    }

    #[must_use]
    pub const fn unmodified(monosaccharide: Monosaccharide) -> Self {
        Self::new(monosaccharide, Delta::UNMODIFIED)
    }

    #[must_use]
    pub const fn monosaccharide(&self) -> Monosaccharide {
        self.monosaccharide
    }

    #[must_use]
    pub const fn delta(&self) -> Delta {
        self.delta
    }
}

impl Display for Residue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let Self {
            monosaccharide,
            delta,
        } = self;
        if delta.is_unmodified() {
            write!(f, "{monosaccharide}")
        } else {
            write!(f, "{monosaccharide}[{delta}]")
        }
    }
}

impl Massive for Residue {
    fn monoisotopic_mass(&self) -> f64 {
        self.monosaccharide.mass() + self.delta.value()
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl Composition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an unmodified composition from per-monosaccharide counts, skipping any zero counts
    pub fn from_counts(counts: impl IntoIterator<Item = (Monosaccharide, u32)>) -> Self {
        let mut composition = Self::new();
        for (monosaccharide, count) in counts {
            composition.add(Residue::unmodified(monosaccharide), count);
        }
        composition
    }

    pub fn add(&mut self, residue: Residue, count: u32) {
        if count > 0 {
            *self.0.entry(residue).or_default() += count;
        }
    }

    /// Total number of residues of `monosaccharide`, summed over all of its modified forms
    #[must_use]
    pub fn count(&self, monosaccharide: Monosaccharide) -> u32 {
        self.residues()
            .filter(|(r, _)| r.monosaccharide == monosaccharide)
            .map(|(_, n)| n)
            .sum()
    }

    /// Per-monosaccharide totals, with every modified form folded back into its parent monosaccharide
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Monosaccharide, u32> {
        let mut counts = BTreeMap::new();
        for (residue, count) in self.residues() {
            *counts.entry(residue.monosaccharide).or_default() += count;
        }
        counts
    }

    /// Distinct residues (in label order) and how many of each the composition contains
    pub fn residues(&self) -> impl Iterator<Item = (Residue, u32)> + '_ {
        self.0.iter().map(|(&r, &n)| (r, n))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn residue_count(&self) -> u32 {
        self.0.values().sum()
    }
}

impl FromIterator<(Residue, u32)> for Composition {
    fn from_iter<T: IntoIterator<Item = (Residue, u32)>>(iter: T) -> Self {
        let mut composition = Self::new();
        for (residue, count) in iter {
            composition.add(residue, count);
        }
        composition
    }
}

impl Display for Composition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (residue, count) in self.residues() {
            write!(f, "{residue}({count})")?;
        }
        Ok(())
    }
}

// NOTE: This is the summed residue mass only, the water of the free reducing end is added by `Candidate`
impl Massive for Composition {
    fn monoisotopic_mass(&self) -> f64 {
        self.residues()
            .map(|(r, n)| r.monoisotopic_mass() * f64::from(n))
            .sum()
    }
}

// Module Tests ========================================================================================================
