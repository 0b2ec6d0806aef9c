// Standard Library Imports
use std::ops::RangeInclusive;

// External Crate Imports
use ahash::HashSet;
use tracing::debug;

// Local Crate Imports
use crate::{Candidate, CandidatePool, Composition, IonSettings, ModificationExpander, Result};

// Public API ==========================================================================================================

impl CandidatePool {
    /// Builds a pool from already-generated candidates, dropping repeats (keeping the first one generated)
    #[must_use]
    pub fn new(candidates: impl IntoIterator<Item = Candidate>) -> Self {
        let mut seen = HashSet::default();
        let candidates: Vec<_> = candidates
            .into_iter()
            .filter(|c| seen.insert((c.composition().clone(), c.global_modifications().clone())))
            .collect();

        let mut by_mz: Vec<_> = (0..candidates.len()).collect();
        by_mz.sort_by(|&a, &b| candidates[a].mz().total_cmp(&candidates[b].mz()).then(a.cmp(&b)));

        Self { candidates, by_mz }
    }

    /// Expands every library composition into its modified variants
    ///
    /// The whole library is checked against the modification configuration before any expansion starts.
    pub fn from_library<'c>(
        library: impl IntoIterator<Item = &'c Composition>,
        expander: &ModificationExpander,
        settings: &IonSettings,
    ) -> Result<Self> {
        let library: Vec<_> = library.into_iter().collect();
        for composition in &library {
            expander.validate(&composition.counts())?;
        }

        let mut candidates = Vec::new();
        for composition in library {
            candidates.extend(expander.candidates(composition, settings)?);
        }

        let pool = Self::new(candidates);
        debug!(candidates = pool.len(), "built candidate pool from library");
        Ok(pool)
    }

    /// Candidates in the order they were generated
    #[must_use]
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates with an m/z inside `range`, with their generation indices, in m/z order
    pub fn within(&self, range: RangeInclusive<f64>) -> impl Iterator<Item = (usize, &Candidate)> {
        let (&lo, &hi) = (range.start(), range.end());
        let start = self.by_mz.partition_point(|&i| self.candidates[i].mz() < lo);
        let end = self.by_mz.partition_point(|&i| self.candidates[i].mz() <= hi);

        self.by_mz[start..end.max(start)]
            .iter()
            .map(|&i| (i, &self.candidates[i]))
    }
}

// Module Tests ========================================================================================================
