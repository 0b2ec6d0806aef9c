// Standard Library Imports
use std::{
    collections::BTreeMap,
    iter::{self, FusedIterator},
};

// External Crate Imports
use itertools::{Either, Itertools};

// Local Crate Imports
use crate::{
    Candidate, Composition, Delta, GlobalModificationLimits, GlobalModificationState, GlycoError, IonSettings,
    ModificationTable, Monosaccharide, Residue, Result,
};

// Public API ==========================================================================================================

/// Every way of splitting `n` identical items between `k` ordered bins
///
/// Yields the `C(n + k - 1, k - 1)` partitions in the same order as picking `n` bins with replacement: everything in
/// the first bin, then one item moved right at a time, ending with everything in the last bin. The iterator is lazy,
/// holds a single partition of state, and can be restarted by cloning.
#[derive(Clone, Debug)]
pub struct StarsAndBars {
    parts: Option<Vec<u32>>,
}

impl StarsAndBars {
    #[must_use]
    pub fn new(n: u32, k: usize) -> Self {
        let parts = match (n, k) {
            (_, 0) if n > 0 => None,
            (_, 0) => Some(Vec::new()),
            _ => {
                let mut parts = vec![0; k];
                parts[0] = n;
                Some(parts)
            }
        };

        Self { parts }
    }

    fn advance(parts: &mut [u32]) -> bool {
        let Some((&mut tail, head)) = parts.split_last_mut() else {
            return false;
        };
        let Some(i) = head.iter().rposition(|&p| p > 0) else {
            return false;
        };

        head[i] -= 1;
        // NOTE: The last slot is about to be overwritten, so its stars are carried into the slot after `i`
        let len = parts.len();
        parts[len - 1] = 0;
        parts[i + 1] = tail + 1;
        true
    }
}

impl Iterator for StarsAndBars {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.parts.clone()?;
        if let Some(parts) = &mut self.parts {
            if !Self::advance(parts) {
                self.parts = None;
            }
        }
        Some(current)
    }
}

impl FusedIterator for StarsAndBars {}

// ---------------------------------------------------------------------------------------------------------------------

static UNMODIFIED_ONLY: [Delta; 1] = [Delta::UNMODIFIED];

impl ModificationTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the mass deltas that `monosaccharide` may carry
    ///
    /// Repeated deltas are dropped (keeping the first occurrence), since two identical deltas can't produce distinct
    /// compositions. An empty list is kept as-is and only becomes an error once a composition contains
    /// `monosaccharide`.
    pub fn insert(&mut self, monosaccharide: Monosaccharide, deltas: impl IntoIterator<Item = f64>) {
        let deltas = deltas.into_iter().map(Delta::new).unique().collect();
        self.0.insert(monosaccharide, deltas);
    }

    /// Configured deltas, or just the unmodified form when `monosaccharide` was never configured
    #[must_use]
    pub fn deltas(&self, monosaccharide: Monosaccharide) -> &[Delta] {
        self.0.get(&monosaccharide).map_or(&UNMODIFIED_ONLY[..], Vec::as_slice)
    }

    pub fn check(&self, monosaccharide: Monosaccharide) -> Result<()> {
        if self.deltas(monosaccharide).is_empty() {
            Err(GlycoError::invalid_modification_config(monosaccharide))
        } else {
            Ok(())
        }
    }

    /// The lightest and heaviest delta `monosaccharide` can carry
    #[must_use]
    pub fn delta_range(&self, monosaccharide: Monosaccharide) -> Option<(f64, f64)> {
        let deltas = self.deltas(monosaccharide).iter().map(|d| d.value());
        deltas.minmax_by(f64::total_cmp).into_option()
    }
}

impl FromIterator<(Monosaccharide, Vec<f64>)> for ModificationTable {
    fn from_iter<T: IntoIterator<Item = (Monosaccharide, Vec<f64>)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (monosaccharide, deltas) in iter {
            table.insert(monosaccharide, deltas);
        }
        table
    }
}

// ---------------------------------------------------------------------------------------------------------------------

/// Expands base compositions into all of their modified variants
#[derive(Clone, Debug)]
pub struct ModificationExpander {
    table: ModificationTable,
    limits: GlobalModificationLimits,
    global_states: Vec<GlobalModificationState>,
}

impl ModificationExpander {
    #[must_use]
    pub fn new(table: ModificationTable, limits: GlobalModificationLimits) -> Self {
        let global_states = limits.states();
        Self {
            table,
            limits,
            global_states,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &ModificationTable {
        &self.table
    }

    #[must_use]
    pub const fn limits(&self) -> &GlobalModificationLimits {
        &self.limits
    }

    #[must_use]
    pub fn global_states(&self) -> &[GlobalModificationState] {
        &self.global_states
    }

    /// Fails if any monosaccharide with a non-zero count has nothing it could be expanded into
    pub fn validate(&self, counts: &BTreeMap<Monosaccharide, u32>) -> Result<()> {
        counts
            .iter()
            .filter(|&(_, &n)| n > 0)
            .try_for_each(|(&monosaccharide, _)| self.table.check(monosaccharide))
    }

    /// Every distinct way of distributing each monosaccharide's count among its configured deltas
    ///
    /// Modified residues already present in `base` are folded back into their parent monosaccharide first, so
    /// expanding any variant again reproduces the whole family.
    pub fn local_variants(&self, base: &Composition) -> Result<impl Iterator<Item = Composition>> {
        let counts = base.counts();
        self.validate(&counts)?;

        if counts.is_empty() {
            return Ok(Either::Left(iter::once(Composition::new())));
        }

        let per_type: Vec<_> = counts
            .into_iter()
            .map(|(monosaccharide, n)| {
                let deltas = self.table.deltas(monosaccharide).to_vec();
                StarsAndBars::new(n, deltas.len()).map(move |parts| {
                    deltas
                        .iter()
                        .zip(parts)
                        .map(|(&delta, count)| (Residue::new(monosaccharide, delta), count))
                        .collect_vec()
                })
            })
            .collect();

        let variants = per_type
            .into_iter()
            .multi_cartesian_product()
            .map(|splits| splits.into_iter().flatten().collect::<Composition>());
        Ok(Either::Right(variants))
    }

    /// Local variants, each paired with every global modification state (the latter varying fastest)
    pub fn expand(
        &self,
        base: &Composition,
    ) -> Result<impl Iterator<Item = (Composition, GlobalModificationState)>> {
        let global_states = self.global_states.clone();
        let expanded = self.local_variants(base)?.flat_map(move |composition| {
            global_states
                .clone()
                .into_iter()
                .map(move |state| (composition.clone(), state))
        });
        Ok(expanded)
    }

    pub fn candidates(&self, base: &Composition, settings: &IonSettings) -> Result<impl Iterator<Item = Candidate>> {
        let settings = *settings;
        let candidates = self
            .expand(base)?
            .map(move |(composition, state)| Candidate::new(composition, state, &settings));
        Ok(candidates)
    }
}

// Module Tests ========================================================================================================
