// External Crate Imports
use miette::Diagnostic;
use thiserror::Error;

// Local Crate Imports
use crate::Monosaccharide;

// Public API ==========================================================================================================

pub type Result<T, E = GlycoError> = std::result::Result<T, E>;

#[derive(Debug, Diagnostic, Clone, Eq, PartialEq, Error)]
pub enum GlycoError {
    #[diagnostic(help(
        "known monosaccharides are: Hex, HexNAc, dHex, Pen, NeuAc, NeuGc, KDN, and HexA (names are case-sensitive)"
    ))]
    #[error("the monosaccharide {abbr:?} could not be found in the monosaccharide catalog")]
    UnknownMonosaccharide { abbr: String },

    #[diagnostic(help("known global modifications are: Ac, P, and S"))]
    #[error("the global modification {abbr:?} is not supported")]
    UnknownGlobalModification { abbr: String },

    #[diagnostic(help("supported charge carriers are: H+, Na+, and K+"))]
    #[error("the charge carrier {symbol:?} is not supported")]
    UnknownChargeCarrier { symbol: String },

    #[diagnostic(help(
        "either remove the empty modification list, or give it at least one mass delta (0.0 for the unmodified form)"
    ))]
    #[error("{monosaccharide} appears in a composition, but its modification list is empty")]
    InvalidModificationConfig { monosaccharide: Monosaccharide },

    #[diagnostic(help("the minimum count must not be larger than the maximum count"))]
    #[error("the constraint for {monosaccharide} is invalid: minimum {min} > maximum {max}")]
    InvalidConstraint {
        monosaccharide: Monosaccharide,
        min: u32,
        max: u32,
    },
}

impl GlycoError {
    pub(crate) fn unknown_monosaccharide(abbr: &str) -> Self {
        let abbr = abbr.to_owned();

        Self::UnknownMonosaccharide { abbr }
    }

    pub(crate) fn unknown_global_modification(abbr: &str) -> Self {
        let abbr = abbr.to_owned();

        Self::UnknownGlobalModification { abbr }
    }

    pub(crate) fn unknown_charge_carrier(symbol: &str) -> Self {
        let symbol = symbol.to_owned();

        Self::UnknownChargeCarrier { symbol }
    }

    pub(crate) const fn invalid_modification_config(monosaccharide: Monosaccharide) -> Self {
        Self::InvalidModificationConfig { monosaccharide }
    }

    pub(crate) const fn invalid_constraint(monosaccharide: Monosaccharide, min: u32, max: u32) -> Self {
        Self::InvalidConstraint {
            monosaccharide,
            min,
            max,
        }
    }
}
