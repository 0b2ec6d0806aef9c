// Standard Library Imports
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

// Local Crate Imports
use crate::{ChargeCarrier, GlobalModification, GlycoError, Massive, Monosaccharide, Result};

// Public API ==========================================================================================================

impl Monosaccharide {
    pub const ALL: [Self; 8] = [
        Self::Hex,
        Self::HexNAc,
        Self::DHex,
        Self::Pen,
        Self::NeuAc,
        Self::NeuGc,
        Self::Kdn,
        Self::HexA,
    ];

    pub fn from_abbr(abbr: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.abbr() == abbr)
            .ok_or_else(|| GlycoError::unknown_monosaccharide(abbr))
    }

    #[must_use]
    pub const fn abbr(self) -> &'static str {
        match self {
            Self::Hex => "Hex",
            Self::HexNAc => "HexNAc",
            Self::DHex => "dHex",
            Self::Pen => "Pen",
            Self::NeuAc => "NeuAc",
            Self::NeuGc => "NeuGc",
            Self::Kdn => "KDN",
            Self::HexA => "HexA",
        }
    }

    /// Residue (dehydrated) monoisotopic mass, in Daltons
    #[must_use]
    pub const fn mass(self) -> f64 {
        match self {
            Self::Hex => 162.0528,
            Self::HexNAc => 203.0794,
            Self::DHex => 146.0579,
            Self::Pen => 132.0423,
            Self::NeuAc => 291.0954,
            Self::NeuGc => 307.0903,
            Self::Kdn => 250.0689,
            Self::HexA => 176.0321,
        }
    }
}

/// Looks up the residue mass of a monosaccharide by its abbreviation
pub fn residue_mass(abbr: &str) -> Result<f64> {
    Monosaccharide::from_abbr(abbr).map(Monosaccharide::mass)
}

impl FromStr for Monosaccharide {
    type Err = GlycoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_abbr(s)
    }
}

impl Display for Monosaccharide {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbr())
    }
}

impl Massive for Monosaccharide {
    fn monoisotopic_mass(&self) -> f64 {
        self.mass()
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl GlobalModification {
    pub const ALL: [Self; 3] = [Self::Ac, Self::P, Self::S];

    pub fn from_abbr(abbr: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.abbr() == abbr)
            .ok_or_else(|| GlycoError::unknown_global_modification(abbr))
    }

    #[must_use]
    pub const fn abbr(self) -> &'static str {
        match self {
            Self::Ac => "Ac",
            Self::P => "P",
            Self::S => "S",
        }
    }

    #[must_use]
    pub const fn mass(self) -> f64 {
        match self {
            Self::Ac => 42.0106,
            Self::P => 79.9663,
            Self::S => 79.9568,
        }
    }
}

impl FromStr for GlobalModification {
    type Err = GlycoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_abbr(s)
    }
}

impl Display for GlobalModification {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbr())
    }
}

impl Massive for GlobalModification {
    fn monoisotopic_mass(&self) -> f64 {
        self.mass()
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl ChargeCarrier {
    pub const ALL: [Self; 3] = [Self::Proton, Self::Sodium, Self::Potassium];

    pub fn from_symbol(symbol: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.symbol() == symbol)
            .ok_or_else(|| GlycoError::unknown_charge_carrier(symbol))
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Proton => "H+",
            Self::Sodium => "Na+",
            Self::Potassium => "K+",
        }
    }

    #[must_use]
    pub const fn mass(self) -> f64 {
        match self {
            Self::Proton => 1.0073,
            Self::Sodium => 22.9898,
            Self::Potassium => 38.9637,
        }
    }
}

impl FromStr for ChargeCarrier {
    type Err = GlycoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_symbol(s)
    }
}

impl Display for ChargeCarrier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl Massive for ChargeCarrier {
    fn monoisotopic_mass(&self) -> f64 {
        self.mass()
    }
}

// Module Tests ========================================================================================================
