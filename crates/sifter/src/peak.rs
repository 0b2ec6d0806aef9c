// Local Crate Imports
use crate::{CalibratedPeak, MassList, Peak};

// Public API ==========================================================================================================

impl Peak {
    #[must_use]
    pub const fn raw_mz(&self) -> f64 {
        self.raw_mz
    }

    #[must_use]
    pub const fn intensity(&self) -> f64 {
        self.intensity
    }

    #[must_use]
    pub const fn area(&self) -> f64 {
        self.area
    }

    #[must_use]
    pub const fn sn(&self) -> f64 {
        self.sn
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl MassList {
    pub fn new(name: impl Into<String>, peaks: impl IntoIterator<Item = Peak>) -> Self {
        Self {
            name: name.into(),
            peaks: peaks.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl CalibratedPeak {
    #[must_use]
    pub const fn new(peak: Peak, calibrated_mz: Option<f64>) -> Self {
        Self {
            peak,
            calibrated_mz,
        }
    }

    #[must_use]
    pub const fn uncalibrated(peak: Peak) -> Self {
        Self::new(peak, None)
    }

    #[must_use]
    pub const fn peak(&self) -> &Peak {
        &self.peak
    }

    #[must_use]
    pub const fn raw_mz(&self) -> f64 {
        self.peak.raw_mz
    }

    // MISSING: I don't want to promise that this method is `const` in my API...
    #[expect(clippy::missing_const_for_fn)]
    #[must_use]
    pub fn calibrated_mz(&self) -> Option<f64> {
        self.calibrated_mz
    }

    /// The m/z used for matching: calibrated when available, raw otherwise
    #[must_use]
    pub fn observed_mz(&self) -> f64 {
        self.calibrated_mz.unwrap_or(self.peak.raw_mz)
    }
}

// Module Tests ========================================================================================================
