// External Crate Imports
use glycochem::TargetWindows;
use rayon::prelude::*;
use tracing::info;

// Local Crate Imports
use crate::{CalibratedSpectrum, Calibrator, MassList, Matcher, SpectrumAnnotation, theoretical_window};

// Public API ==========================================================================================================

/// Calibrates every mass list in parallel, returning spectra in the same order as `mass_lists`
#[must_use]
pub fn calibrate_spectra(mass_lists: &[MassList], calibrator: Option<&Calibrator>) -> Vec<CalibratedSpectrum> {
    mass_lists
        .par_iter()
        .map(|mass_list| CalibratedSpectrum::new(mass_list, calibrator))
        .collect()
}

/// The theoretical m/z windows that could explain any peak of any spectrum
///
/// Spectra must already be calibrated, since windows are centred on each peak's observed m/z.
#[must_use]
pub fn target_windows(spectra: &[CalibratedSpectrum], tolerance_ppm: f64) -> TargetWindows {
    TargetWindows::new(
        spectra
            .iter()
            .flat_map(CalibratedSpectrum::peaks)
            .map(|peak| theoretical_window(peak.observed_mz(), tolerance_ppm)),
    )
}

/// Annotates every spectrum in parallel against one shared pool, preserving spectrum order
#[must_use]
pub fn annotate_spectra<'c>(spectra: Vec<CalibratedSpectrum>, matcher: &Matcher<'c>) -> Vec<SpectrumAnnotation<'c>> {
    spectra
        .into_par_iter()
        .map(|spectrum| {
            let annotation = matcher.annotate(spectrum);
            info!(
                spectrum = annotation.name(),
                peaks = annotation.spectrum().peaks().len(),
                matches = annotation.matches().len(),
                unannotated = annotation.unannotated_peaks().count(),
                "annotated spectrum"
            );
            annotation
        })
        .collect()
}

// Module Tests ========================================================================================================
