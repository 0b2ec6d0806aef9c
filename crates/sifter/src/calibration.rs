// External Crate Imports
use tracing::{debug, warn};

// Local Crate Imports
use crate::{
    CalibratedPeak, CalibratedSpectrum, CalibrationError, CalibrationOutcome, Calibrator, LinearCorrection, MassList,
    Peak,
};

// Public API ==========================================================================================================

/// The fewest matched references a line can be fitted through
pub const MIN_CALIBRATION_PEAKS: usize = 2;

impl Calibrator {
    pub fn new(references: impl IntoIterator<Item = f64>, tolerance_ppm: f64) -> Self {
        Self {
            references: references.into_iter().collect(),
            tolerance_ppm,
        }
    }

    #[must_use]
    pub fn references(&self) -> &[f64] {
        &self.references
    }

    /// Pairs each reference with the most intense peak within tolerance of it, skipping unmatched references
    #[must_use]
    pub fn observations(&self, peaks: &[Peak]) -> Vec<(f64, f64)> {
        self.references
            .iter()
            .filter_map(|&reference| {
                let tolerance = reference * self.tolerance_ppm / 1e6;
                peaks
                    .iter()
                    .filter(|p| (p.raw_mz() - reference).abs() <= tolerance)
                    // NOTE: `.reduce()` keeps the earlier peak when intensities tie, where `.max_by()` would not
                    .reduce(|best, p| if p.intensity() > best.intensity() { p } else { best })
                    .map(|p| (reference, p.raw_mz()))
            })
            .collect()
    }

    /// Fits a ppm correction from the references found among `peaks`
    pub fn fit(&self, peaks: &[Peak]) -> Result<LinearCorrection, CalibrationError> {
        let observations = self.observations(peaks);
        if observations.len() < MIN_CALIBRATION_PEAKS {
            return Err(CalibrationError::InsufficientCalibrationPeaks {
                found: observations.len(),
                required: MIN_CALIBRATION_PEAKS,
            });
        }

        // NOTE: Errors are measured relative to the observed m/z, since that is all the correction ever gets to see
        let points: Vec<_> = observations
            .into_iter()
            .map(|(reference, observed)| (observed, (observed - reference) / observed * 1e6))
            .collect();
        Ok(LinearCorrection::least_squares(&points))
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl LinearCorrection {
    /// Ordinary least-squares line through `(mz, ppm)` points
    ///
    /// Two points give the exact line through both. If every point shares the same m/z, the line is flat at their mean
    /// ppm error.
    #[must_use]
    pub fn least_squares(points: &[(f64, f64)]) -> Self {
        if points.is_empty() {
            return Self::new(0.0, 0.0);
        }

        #[expect(clippy::cast_precision_loss)]
        let n = points.len() as f64;
        let mean_x = points.iter().map(|&(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|&(_, y)| y).sum::<f64>() / n;

        let (sxy, sxx) = points.iter().fold((0.0, 0.0), |(sxy, sxx), &(x, y)| {
            let dx = x - mean_x;
            (dx.mul_add(y - mean_y, sxy), dx.mul_add(dx, sxx))
        });

        if sxx == 0.0 {
            return Self::new(0.0, mean_y);
        }
        let slope = sxy / sxx;
        Self::new(slope, slope.mul_add(-mean_x, mean_y))
    }

    #[must_use]
    pub const fn slope(&self) -> f64 {
        self.slope
    }

    #[must_use]
    pub const fn intercept(&self) -> f64 {
        self.intercept
    }

    /// The systematic ppm error predicted at `mz`
    #[must_use]
    pub fn ppm_at(&self, mz: f64) -> f64 {
        self.slope.mul_add(mz, self.intercept)
    }

    #[must_use]
    pub fn apply(&self, raw_mz: f64) -> f64 {
        raw_mz * (1.0 - self.ppm_at(raw_mz) / 1e6)
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl CalibratedSpectrum {
    /// Calibrates a mass list, or passes it through untouched when no calibrator is given
    ///
    /// A spectrum that can't be calibrated isn't an error: its raw m/z values are used as its calibrated ones, and the
    /// failure is logged and kept in [`CalibratedSpectrum::outcome`].
    #[must_use]
    pub fn new(mass_list: &MassList, calibrator: Option<&Calibrator>) -> Self {
        let name = mass_list.name().to_owned();
        let peaks = mass_list.peaks();

        let Some(calibrator) = calibrator else {
            let peaks = peaks.iter().copied().map(CalibratedPeak::uncalibrated).collect();
            return Self::from_parts(name, peaks, CalibrationOutcome::Disabled);
        };

        match calibrator.fit(peaks) {
            Ok(correction) => {
                debug!(
                    spectrum = %name,
                    slope = correction.slope(),
                    intercept = correction.intercept(),
                    "calibrated spectrum"
                );
                let peaks = peaks
                    .iter()
                    .map(|&p| CalibratedPeak::new(p, Some(correction.apply(p.raw_mz()))))
                    .collect();
                Self::from_parts(name, peaks, CalibrationOutcome::Applied(correction))
            }
            Err(error) => {
                warn!(spectrum = %name, "{error}, so raw masses will be used");
                let peaks = peaks
                    .iter()
                    .map(|&p| CalibratedPeak::new(p, Some(p.raw_mz())))
                    .collect();
                Self::from_parts(name, peaks, CalibrationOutcome::Failed(error))
            }
        }
    }

    #[must_use]
    pub const fn from_parts(name: String, peaks: Vec<CalibratedPeak>, outcome: CalibrationOutcome) -> Self {
        Self {
            name,
            peaks,
            outcome,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn peaks(&self) -> &[CalibratedPeak] {
        &self.peaks
    }

    #[must_use]
    pub const fn outcome(&self) -> &CalibrationOutcome {
        &self.outcome
    }

    #[must_use]
    pub const fn is_calibration_enabled(&self) -> bool {
        !matches!(self.outcome, CalibrationOutcome::Disabled)
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;

    use crate::ppm_error;

    use super::*;

    const REFERENCES: [f64; 4] = [1257.4225, 1581.5281, 1905.6337, 2229.7393];

    fn biased(mz: f64, ppm: f64) -> f64 {
        mz * (1.0 + ppm / 1e6)
    }

    fn peak(mz: f64, intensity: f64) -> Peak {
        Peak::new(mz, intensity, intensity / 10.0, intensity / 100.0)
    }

    #[test]
    fn most_intense_peak_is_observed() {
        let calibrator = Calibrator::new([1257.4225], 500.0);
        let peaks = [
            peak(1256.7, 9000.0),
            peak(1257.40, 100.0),
            peak(1257.43, 400.0),
            peak(1257.44, 400.0),
            peak(1258.1, 9000.0),
        ];
        assert_eq!(calibrator.observations(&peaks), [(1257.4225, 1257.43)]);
    }

    #[test]
    fn too_few_references_fail() {
        let calibrator = Calibrator::new(REFERENCES, 100.0);
        let peaks = [peak(1257.4300, 100.0), peak(1400.0, 100.0)];
        assert_eq!(
            calibrator.fit(&peaks),
            Err(CalibrationError::InsufficientCalibrationPeaks {
                found: 1,
                required: 2
            })
        );
        assert!(calibrator.fit(&[]).is_err());
    }

    #[test]
    fn two_points_give_an_exact_line() {
        let correction = LinearCorrection::least_squares(&[(1000.0, 10.0), (2000.0, 30.0)]);
        assert_float_absolute_eq!(correction.slope(), 0.02, 1e-12);
        assert_float_absolute_eq!(correction.intercept(), -10.0, 1e-9);
        assert_float_absolute_eq!(correction.ppm_at(1500.0), 20.0, 1e-9);
        assert_float_absolute_eq!(correction.ppm_at(3000.0), 50.0, 1e-9);
    }

    #[test]
    fn least_squares_fit() {
        let correction = LinearCorrection::least_squares(&[(1.0, 1.0), (2.0, 2.0), (3.0, 2.0), (4.0, 4.0)]);
        assert_float_absolute_eq!(correction.slope(), 0.9, 1e-12);
        assert_float_absolute_eq!(correction.intercept(), 0.0, 1e-12);

        let flat = LinearCorrection::least_squares(&[(1500.0, 4.0), (1500.0, 8.0)]);
        assert_float_absolute_eq!(flat.slope(), 0.0);
        assert_float_absolute_eq!(flat.intercept(), 6.0);
    }

    #[test]
    fn calibration_round_trip() {
        let calibrator = Calibrator::new(REFERENCES, 500.0);

        for (bias, references) in [(35.0, &REFERENCES[..2]), (-120.0, &REFERENCES[..])] {
            let peaks: Vec<_> = references.iter().map(|&r| peak(biased(r, bias), 1000.0)).collect();
            let mass_list = MassList::new("biased", peaks);

            let spectrum = CalibratedSpectrum::new(&mass_list, Some(&calibrator));
            assert!(matches!(spectrum.outcome(), CalibrationOutcome::Applied(_)));
            for (calibrated, &reference) in spectrum.peaks().iter().zip(references) {
                let error = ppm_error(calibrated.observed_mz(), reference);
                assert_float_absolute_eq!(error, 0.0, 1e-6);
            }
        }
    }

    #[test]
    fn linear_drift_is_removed() {
        let calibrator = Calibrator::new(REFERENCES, 500.0);
        // Drift grows from 20 ppm at the first reference to 50 ppm at the last
        let drift = |mz: f64| 20.0 + (mz - REFERENCES[0]) / (REFERENCES[3] - REFERENCES[0]) * 30.0;
        let peaks: Vec<_> = REFERENCES.iter().map(|&r| peak(biased(r, drift(r)), 500.0)).collect();

        let spectrum = CalibratedSpectrum::new(&MassList::new("drifting", peaks), Some(&calibrator));
        for (calibrated, reference) in spectrum.peaks().iter().zip(REFERENCES) {
            assert_float_absolute_eq!(ppm_error(calibrated.observed_mz(), reference), 0.0, 0.01);
        }
    }

    #[test]
    fn failed_calibration_uses_raw_masses() {
        let calibrator = Calibrator::new(REFERENCES, 10.0);
        let mass_list = MassList::new("sparse", [peak(1257.4225, 10.0), peak(1300.0, 10.0)]);

        let spectrum = CalibratedSpectrum::new(&mass_list, Some(&calibrator));
        assert!(spectrum.is_calibration_enabled());
        assert_eq!(
            spectrum.outcome(),
            &CalibrationOutcome::Failed(CalibrationError::InsufficientCalibrationPeaks {
                found: 1,
                required: 2
            })
        );
        for calibrated in spectrum.peaks() {
            assert_eq!(calibrated.calibrated_mz(), Some(calibrated.raw_mz()));
        }
    }

    #[test]
    fn disabled_calibration_leaves_peaks_alone() {
        let mass_list = MassList::new("raw", [peak(1257.4300, 10.0)]);
        let spectrum = CalibratedSpectrum::new(&mass_list, None);
        assert_eq!(spectrum.name(), "raw");
        assert!(!spectrum.is_calibration_enabled());
        assert_eq!(spectrum.outcome(), &CalibrationOutcome::Disabled);
        assert_eq!(spectrum.peaks()[0].calibrated_mz(), None);
    }
}
