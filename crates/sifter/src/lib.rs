//! Calibrating MS1 peak lists and matching their peaks against theoretical glycan candidates

mod calibration;
mod matcher;
mod peak;
mod pipeline;
mod ppm;

// External Crate Imports
use derive_more::Constructor;
use glycochem::{Candidate, CandidatePool};
use miette::Diagnostic;
use thiserror::Error;

// Re-exports
pub use calibration::MIN_CALIBRATION_PEAKS;
pub use pipeline::{annotate_spectra, calibrate_spectra, target_windows};
pub use ppm::{ppm_error, theoretical_window};

// Public API ==========================================================================================================

/// A single centroided peak, exactly as it was read from a mass list
#[derive(Copy, Clone, PartialEq, Debug, Constructor)]
pub struct Peak {
    raw_mz: f64,
    intensity: f64,
    area: f64,
    sn: f64,
}

/// The peaks of one spectrum, in the order they were read
#[derive(Clone, PartialEq, Debug)]
pub struct MassList {
    name: String,
    peaks: Vec<Peak>,
}

/// A peak paired with its calibrated m/z (absent when calibration is switched off)
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct CalibratedPeak {
    peak: Peak,
    calibrated_mz: Option<f64>,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Calibrator {
    references: Vec<f64>,
    tolerance_ppm: f64,
}

/// A fitted ppm error that varies linearly with m/z
#[derive(Copy, Clone, PartialEq, Debug, Constructor)]
pub struct LinearCorrection {
    slope: f64,
    intercept: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub enum CalibrationOutcome {
    Disabled,
    Applied(LinearCorrection),
    Failed(CalibrationError),
}

#[derive(Clone, PartialEq, Debug)]
pub struct CalibratedSpectrum {
    name: String,
    peaks: Vec<CalibratedPeak>,
    outcome: CalibrationOutcome,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum MatchMode {
    /// Keep only the closest candidate for each peak
    #[default]
    BestMatch,
    /// Keep every candidate within tolerance for each peak
    AllCandidates,
}

/// Matches peaks against a shared, read-only candidate pool
#[derive(Copy, Clone, Debug)]
pub struct Matcher<'c> {
    pool: &'c CandidatePool,
    tolerance_ppm: f64,
    mode: MatchMode,
}

#[derive(Clone, PartialEq, Debug)]
pub struct MatchResult<'c> {
    peak_index: usize,
    peak: CalibratedPeak,
    candidate_index: usize,
    candidate: &'c Candidate,
    ppm_error: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct SpectrumAnnotation<'c> {
    spectrum: CalibratedSpectrum,
    matches: Vec<MatchResult<'c>>,
}

// Errors ==============================================================================================================

#[derive(Clone, Eq, PartialEq, Debug, Diagnostic, Error)]
pub enum CalibrationError {
    #[diagnostic(help(
        "raw masses were used for this spectrum; consider widening the calibration tolerance or checking that the \
        reference masses are present"
    ))]
    #[error("only {found} calibration reference(s) matched a peak, but at least {required} are needed")]
    InsufficientCalibrationPeaks { found: usize, required: usize },
}
