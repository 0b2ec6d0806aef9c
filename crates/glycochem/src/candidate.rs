// Standard Library Imports
use std::fmt::{self, Display, Formatter};

// Local Crate Imports
use crate::{
    Candidate, ChargeCarrier, Composition, GlobalModificationState, IonSettings, Massive, WATER_MASS,
};

// Public API ==========================================================================================================

impl IonSettings {
    #[must_use]
    pub const fn new(reducing_end: f64, charge_carrier: ChargeCarrier) -> Self {
        Self {
            reducing_end,
            charge_carrier,
        }
    }

    /// Everything added on top of a glycan's neutral mass to get the m/z of its singly-charged ion
    #[must_use]
    pub fn ion_offset(&self) -> f64 {
        self.reducing_end + self.charge_carrier.mass()
    }
}

impl Candidate {
    #[must_use]
    pub fn new(
        composition: Composition,
        global_modifications: GlobalModificationState,
        settings: &IonSettings,
    ) -> Self {
        let neutral_mass =
            composition.monoisotopic_mass() + global_modifications.monoisotopic_mass() + WATER_MASS;
        let mz = neutral_mass + settings.ion_offset();

        Self {
            composition,
            global_modifications,
            charge_carrier: settings.charge_carrier,
            neutral_mass,
            mz,
        }
    }

    #[must_use]
    pub const fn composition(&self) -> &Composition {
        &self.composition
    }

    #[must_use]
    pub const fn global_modifications(&self) -> &GlobalModificationState {
        &self.global_modifications
    }

    #[must_use]
    pub const fn charge_carrier(&self) -> ChargeCarrier {
        self.charge_carrier
    }

    /// Residues, global modifications, and the reducing-end water
    #[must_use]
    pub const fn neutral_mass(&self) -> f64 {
        self.neutral_mass
    }

    #[must_use]
    pub const fn mz(&self) -> f64 {
        self.mz
    }

    #[must_use]
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl Display for Candidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.composition, self.global_modifications)
    }
}

impl Massive for Candidate {
    fn monoisotopic_mass(&self) -> f64 {
        self.neutral_mass
    }
}

// Module Tests ========================================================================================================
