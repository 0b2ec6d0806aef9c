//! Constrained, combinatorial generation of candidate compositions
//!
//! Rather than looking compositions up in a library, De-Novo search enumerates every composition whose per-type
//! monosaccharide counts fall within a set of [`Constraints`]. When a set of [`TargetWindows`] is supplied, whole
//! branches of the search are skipped as soon as no composition below them could land inside any window.

// Standard Library Imports
use std::{collections::BTreeMap, ops::RangeInclusive};

// External Crate Imports
use tracing::debug;

// Local Crate Imports
use crate::{
    CandidatePool, Composition, GlycoError, IonSettings, ModificationExpander, Monosaccharide, Result, WATER_MASS,
};

// Public API ==========================================================================================================

/// Inclusive `(min, max)` count bounds per monosaccharide; anything unconstrained is excluded with `(0, 0)`
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct Constraints(BTreeMap<Monosaccharide, (u32, u32)>);

impl Constraints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, monosaccharide: Monosaccharide, min: u32, max: u32) {
        self.0.insert(monosaccharide, (min, max));
    }

    #[must_use]
    pub fn bounds(&self, monosaccharide: Monosaccharide) -> (u32, u32) {
        self.0.get(&monosaccharide).copied().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<()> {
        match self.0.iter().find(|&(_, &(min, max))| min > max) {
            Some((&monosaccharide, &(min, max))) => Err(GlycoError::invalid_constraint(monosaccharide, min, max)),
            None => Ok(()),
        }
    }
}

impl FromIterator<(Monosaccharide, (u32, u32))> for Constraints {
    fn from_iter<T: IntoIterator<Item = (Monosaccharide, (u32, u32))>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ---------------------------------------------------------------------------------------------------------------------

/// A sorted set of disjoint m/z windows that candidates must fall into
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TargetWindows(Vec<(f64, f64)>);

impl TargetWindows {
    /// Collects windows, merging any that overlap and discarding empty ones
    pub fn new(windows: impl IntoIterator<Item = RangeInclusive<f64>>) -> Self {
        let mut windows: Vec<_> = windows
            .into_iter()
            .map(RangeInclusive::into_inner)
            .filter(|(lo, hi)| lo <= hi)
            .collect();
        windows.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut merged: Vec<(f64, f64)> = Vec::with_capacity(windows.len());
        for (lo, hi) in windows {
            match merged.last_mut() {
                Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
                _ => merged.push((lo, hi)),
            }
        }

        Self(merged)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any window overlaps the closed interval `[lo, hi]`
    #[must_use]
    pub fn intersects(&self, lo: f64, hi: f64) -> bool {
        let i = self.0.partition_point(|&(_, end)| end < lo);
        self.0.get(i).is_some_and(|&(start, _)| start <= hi)
    }

    #[must_use]
    pub fn contains(&self, mz: f64) -> bool {
        self.intersects(mz, mz)
    }
}

// ---------------------------------------------------------------------------------------------------------------------

/// A validated De-Novo search space
#[derive(Clone, Debug)]
pub struct DeNovoSearch {
    expander: ModificationExpander,
    settings: IonSettings,
    levels: Vec<Level>,
}

impl DeNovoSearch {
    /// Checks the constraints and modification configuration up-front, so the search itself can't fail
    pub fn new(constraints: &Constraints, expander: ModificationExpander, settings: IonSettings) -> Result<Self> {
        constraints.validate()?;

        let mut included: Vec<_> = Monosaccharide::ALL
            .into_iter()
            .filter(|&m| constraints.bounds(m).1 > 0)
            .collect();
        for &monosaccharide in &included {
            expander.table().check(monosaccharide)?;
        }

        // NOTE: Heavier residues first, so that the mass bounds of a partial assignment tighten as early as possible
        included.sort_by(|a, b| b.mass().total_cmp(&a.mass()));
        let levels = included
            .into_iter()
            .map(|monosaccharide| {
                let (min, max) = constraints.bounds(monosaccharide);
                // NOTE: `.check()` above guarantees a delta range exists, so the default is never used
                let (lightest, heaviest) = expander
                    .table()
                    .delta_range(monosaccharide)
                    .unwrap_or_default();
                Level {
                    monosaccharide,
                    min,
                    max,
                    lightest: monosaccharide.mass() + lightest,
                    heaviest: monosaccharide.mass() + heaviest,
                }
            })
            .collect();

        Ok(Self {
            expander,
            settings,
            levels,
        })
    }

    /// Every unmodified composition within the constraints, in search order
    ///
    /// With `targets`, branches whose reachable m/z range misses every window are pruned. The empty composition is
    /// never generated.
    #[must_use]
    pub fn compositions(&self, targets: Option<&TargetWindows>) -> Vec<Composition> {
        let mut search = Search {
            levels: &self.levels,
            suffix_bounds: self.suffix_bounds(),
            floor: WATER_MASS + self.settings.ion_offset(),
            global_range: self.expander.limits().max_mass(),
            targets,
            counts: Vec::with_capacity(self.levels.len()),
            found: Vec::new(),
            pruned: 0,
        };
        search.descend(0, 0.0, 0.0);

        debug!(
            compositions = search.found.len(),
            pruned_branches = search.pruned,
            "finished de novo composition search"
        );
        search.found
    }

    /// Expands every composition found into candidates, keeping only those inside a target window (if any)
    pub fn build_pool(&self, targets: Option<&TargetWindows>) -> Result<CandidatePool> {
        let mut candidates = Vec::new();
        for composition in self.compositions(targets) {
            let expanded = self.expander.candidates(&composition, &self.settings)?;
            candidates.extend(expanded.filter(|c| targets.is_none_or(|t| t.contains(c.mz()))));
        }

        let pool = CandidatePool::new(candidates);
        debug!(candidates = pool.len(), "built de novo candidate pool");
        Ok(pool)
    }

    // NOTE: `suffix_bounds[i]` is the lightest and heaviest mass that levels `i..` can contribute together
    fn suffix_bounds(&self) -> Vec<(f64, f64)> {
        let mut bounds = vec![(0.0, 0.0); self.levels.len() + 1];
        for (i, level) in self.levels.iter().enumerate().rev() {
            let (lo, hi) = level.mass_range();
            bounds[i] = (bounds[i + 1].0 + lo, bounds[i + 1].1 + hi);
        }
        bounds
    }
}

// Private Types =======================================================================================================

#[derive(Copy, Clone, Debug)]
struct Level {
    monosaccharide: Monosaccharide,
    min: u32,
    max: u32,
    lightest: f64,
    heaviest: f64,
}

impl Level {
    fn span(&self, count: u32) -> (f64, f64) {
        let count = f64::from(count);
        let (a, b) = (count * self.lightest, count * self.heaviest);
        (a.min(b), a.max(b))
    }

    fn mass_range(&self) -> (f64, f64) {
        let (min_lo, min_hi) = self.span(self.min);
        let (max_lo, max_hi) = self.span(self.max);
        (min_lo.min(max_lo), min_hi.max(max_hi))
    }
}

struct Search<'s> {
    levels: &'s [Level],
    suffix_bounds: Vec<(f64, f64)>,
    floor: f64,
    global_range: f64,
    targets: Option<&'s TargetWindows>,
    counts: Vec<(Monosaccharide, u32)>,
    found: Vec<Composition>,
    pruned: usize,
}

// NOTE: Bounds are loosened by this relative amount so that rounding in the pruning sums can never discard a
// composition whose exact m/z sits right on the edge of a window
const BOUND_SLACK: f64 = 1e-9;

impl Search<'_> {
    fn reachable(&self, depth: usize, partial_lo: f64, partial_hi: f64) -> bool {
        let Some(targets) = self.targets else {
            return true;
        };

        let (rest_lo, rest_hi) = self.suffix_bounds[depth];
        let lo = self.floor + partial_lo + rest_lo;
        let hi = self.floor + partial_hi + rest_hi + self.global_range;
        targets.intersects(lo * (1.0 - BOUND_SLACK), hi * (1.0 + BOUND_SLACK))
    }

    fn descend(&mut self, depth: usize, partial_lo: f64, partial_hi: f64) {
        if !self.reachable(depth, partial_lo, partial_hi) {
            self.pruned += 1;
            return;
        }

        let Some(&level) = self.levels.get(depth) else {
            let composition = Composition::from_counts(self.counts.iter().copied());
            if !composition.is_empty() {
                self.found.push(composition);
            }
            return;
        };

        for count in level.min..=level.max {
            let (lo, hi) = level.span(count);
            self.counts.push((level.monosaccharide, count));
            self.descend(depth + 1, partial_lo + lo, partial_hi + hi);
            self.counts.pop();
        }
    }
}

// Module Tests ========================================================================================================
