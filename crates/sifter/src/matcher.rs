// External Crate Imports
use glycochem::{Candidate, CandidatePool};

// Local Crate Imports
use crate::{
    CalibratedPeak, CalibratedSpectrum, MatchMode, MatchResult, Matcher, SpectrumAnnotation, ppm_error,
    theoretical_window,
};

// Public API ==========================================================================================================

impl<'c> Matcher<'c> {
    #[must_use]
    pub const fn new(pool: &'c CandidatePool, tolerance_ppm: f64, mode: MatchMode) -> Self {
        Self {
            pool,
            tolerance_ppm,
            mode,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> MatchMode {
        self.mode
    }

    #[must_use]
    pub const fn tolerance_ppm(&self) -> f64 {
        self.tolerance_ppm
    }

    /// Every candidate within tolerance of `mz` as `(generation index, candidate, ppm error)`, in generation order
    #[must_use]
    pub fn candidates_near(&self, mz: f64) -> Vec<(usize, &'c Candidate, f64)> {
        let mut hits: Vec<_> = self
            .pool
            .within(theoretical_window(mz, self.tolerance_ppm))
            .map(|(i, candidate)| (i, candidate, ppm_error(mz, candidate.mz())))
            .filter(|&(_, _, ppm)| ppm.abs() <= self.tolerance_ppm)
            .collect();
        hits.sort_unstable_by_key(|&(i, _, _)| i);
        hits
    }

    /// Matches a single peak; `peak_index` is only carried through to the results
    #[must_use]
    pub fn match_peak(&self, peak_index: usize, peak: CalibratedPeak) -> Vec<MatchResult<'c>> {
        let hits = self.candidates_near(peak.observed_mz());
        let to_result = |(candidate_index, candidate, ppm_error)| MatchResult {
            peak_index,
            peak,
            candidate_index,
            candidate,
            ppm_error,
        };

        match self.mode {
            MatchMode::BestMatch => hits
                .into_iter()
                // NOTE: `.min_by()` returns the first of several equal elements, and `hits` is in generation order
                .min_by(|(_, _, a), (_, _, b)| a.abs().total_cmp(&b.abs()))
                .map(to_result)
                .into_iter()
                .collect(),
            MatchMode::AllCandidates => hits.into_iter().map(to_result).collect(),
        }
    }

    /// Matches every peak of a calibrated spectrum, in peak order
    #[must_use]
    pub fn annotate(&self, spectrum: CalibratedSpectrum) -> SpectrumAnnotation<'c> {
        let matches = spectrum
            .peaks()
            .iter()
            .enumerate()
            .flat_map(|(i, &peak)| self.match_peak(i, peak))
            .collect();

        SpectrumAnnotation { spectrum, matches }
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl<'c> MatchResult<'c> {
    #[must_use]
    pub const fn peak_index(&self) -> usize {
        self.peak_index
    }

    #[must_use]
    pub const fn peak(&self) -> &CalibratedPeak {
        &self.peak
    }

    #[must_use]
    pub const fn candidate_index(&self) -> usize {
        self.candidate_index
    }

    #[must_use]
    pub const fn candidate(&self) -> &'c Candidate {
        self.candidate
    }

    #[must_use]
    pub fn theoretical_mz(&self) -> f64 {
        self.candidate.mz()
    }

    /// Observed minus theoretical m/z
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.peak.observed_mz() - self.candidate.mz()
    }

    #[must_use]
    pub const fn ppm_error(&self) -> f64 {
        self.ppm_error
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl<'c> SpectrumAnnotation<'c> {
    #[must_use]
    pub fn name(&self) -> &str {
        self.spectrum.name()
    }

    #[must_use]
    pub const fn spectrum(&self) -> &CalibratedSpectrum {
        &self.spectrum
    }

    #[must_use]
    pub fn matches(&self) -> &[MatchResult<'c>] {
        &self.matches
    }

    /// Peaks that no candidate matched, in peak order
    pub fn unannotated_peaks(&self) -> impl Iterator<Item = &CalibratedPeak> {
        let mut matched = self.matches.iter().map(MatchResult::peak_index).peekable();
        self.spectrum.peaks().iter().enumerate().filter_map(move |(i, peak)| {
            // NOTE: Matches are grouped by peak index in ascending order, so this single forward pass suffices
            while matched.next_if(|&m| m < i).is_some() {}
            matched.next_if_eq(&i).map_or(Some(peak), |_| {
                while matched.next_if_eq(&i).is_some() {}
                None
            })
        })
    }
}

// Module Tests ========================================================================================================
