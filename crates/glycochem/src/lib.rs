//! Glycan compositions, their modified variants, and the theoretical masses used to annotate MS1 peaks

mod candidate;
mod composition;
mod delta;
pub mod denovo;
pub mod errors;
mod expander;
mod global_modification;
mod monosaccharide;
pub mod parsers;
mod pool;

// Standard Library Imports
use std::collections::BTreeMap;

// Re-exports
pub use denovo::{Constraints, DeNovoSearch, TargetWindows};
pub use errors::{GlycoError, Result};
pub use expander::{ModificationExpander, StarsAndBars};
pub use monosaccharide::residue_mass;

// Public API ==========================================================================================================

/// Monoisotopic mass of the water that every glycan carries at its free reducing end
pub const WATER_MASS: f64 = 18.0106;

// NOTE: Declaration order is significant, since it is the order monosaccharides are written in composition labels
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum Monosaccharide {
    Hex,
    HexNAc,
    DHex,
    Pen,
    NeuAc,
    NeuGc,
    Kdn,
    HexA,
}

/// Position-independent modifications, only ever counted per glycan
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum GlobalModification {
    Ac,
    P,
    S,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub enum ChargeCarrier {
    Proton,
    #[default]
    Sodium,
    Potassium,
}

/// A modification mass delta, totally ordered so that it can key maps and sets
#[derive(Copy, Clone, Debug, Default)]
pub struct Delta(f64);

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Residue {
    monosaccharide: Monosaccharide,
    delta: Delta,
}

// NOTE: Only non-zero counts are ever stored, so two compositions are equal exactly when their (residue, count) maps
// are, no matter what order they were built in
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Composition(BTreeMap<Residue, u32>);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct GlobalModificationState(BTreeMap<GlobalModification, u32>);

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct GlobalModificationLimits(BTreeMap<GlobalModification, u32>);

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct ModificationTable(BTreeMap<Monosaccharide, Vec<Delta>>);

#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct IonSettings {
    pub reducing_end: f64,
    pub charge_carrier: ChargeCarrier,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Candidate {
    composition: Composition,
    global_modifications: GlobalModificationState,
    charge_carrier: ChargeCarrier,
    neutral_mass: f64,
    mz: f64,
}

/// Every candidate of a run, in generation order, plus an index sorted by m/z for window lookups
#[derive(Clone, Debug, Default)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
    by_mz: Vec<usize>,
}

// =====================================================================================================================

pub trait Massive {
    fn monoisotopic_mass(&self) -> f64;
}

// Blanket impls

macro_rules! massive_ref_impls {
    ($($ref_type:ty),+ $(,)?) => {
        $(
            impl<T: Massive> Massive for $ref_type {
                fn monoisotopic_mass(&self) -> f64 {
                    (**self).monoisotopic_mass()
                }
            }
        )+
    };
}

massive_ref_impls!(&T, &mut T, Box<T>);
