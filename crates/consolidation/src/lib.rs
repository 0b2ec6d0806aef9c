// Standard Library Imports
use std::io::Write;

// External Crate Imports
use ahash::{HashMap, HashMapExt};
use polars::prelude::*;
use sifter::{MatchResult, Peak, SpectrumAnnotation};

// Constants ===========================================================================================================

struct OutputColumns;
impl OutputColumns {
    const GLYCAN: &str = "glycan";
    const RAW_MZ: &str = "raw_mz";
    const CALIBRATED_MZ: &str = "calibrated_mz";
    const THEO: &str = "theoretical_mz";
    const DELTA: &str = "delta";
    const PPM: &str = "ppm";
    const INTENSITY: &str = "intensity";
    const AREA: &str = "area";
    const SN: &str = "sn";
    const CHARGE_CARRIER: &str = "charge_carrier";
}

struct SummaryFiles;
impl SummaryFiles {
    const INTENSITY: &str = "summary_intensity";
    const AREA: &str = "summary_area";
    const SN: &str = "summary_sn";
}

// Public API ==========================================================================================================

/// A summary table and the file stem it should be written under
pub type SummaryTable = (&'static str, DataFrame);

/// The file stems of every table returned by [`summary_tables()`]
pub const SUMMARY_FILE_STEMS: [&str; 3] = [SummaryFiles::INTENSITY, SummaryFiles::AREA, SummaryFiles::SN];

/// One row per match, in peak order (then candidate order, when a peak has several matches)
///
/// The `calibrated_mz` column is only present when calibration was switched on for the run.
pub fn spectrum_table(annotation: &SpectrumAnnotation) -> PolarsResult<DataFrame> {
    let matches = annotation.matches();
    DataFrame::new(vec![
        Column::new(
            OutputColumns::GLYCAN.into(),
            matches.iter().map(|m| m.candidate().label()).collect::<Vec<_>>(),
        ),
        float_column(OutputColumns::RAW_MZ, matches, |m| m.peak().raw_mz()),
        Column::new(
            OutputColumns::CALIBRATED_MZ.into(),
            matches.iter().map(|m| m.peak().calibrated_mz()).collect::<Vec<_>>(),
        ),
        float_column(OutputColumns::THEO, matches, MatchResult::theoretical_mz),
        float_column(OutputColumns::DELTA, matches, MatchResult::delta),
        float_column(OutputColumns::PPM, matches, MatchResult::ppm_error),
        float_column(OutputColumns::INTENSITY, matches, |m| m.peak().peak().intensity()),
        float_column(OutputColumns::AREA, matches, |m| m.peak().peak().area()),
        float_column(OutputColumns::SN, matches, |m| m.peak().peak().sn()),
        Column::new(
            OutputColumns::CHARGE_CARRIER.into(),
            matches
                .iter()
                .map(|m| m.candidate().charge_carrier().symbol())
                .collect::<Vec<_>>(),
        ),
    ])?
    .lazy()
    .select(formatted_output_columns(annotation.spectrum().is_calibration_enabled()))
    .collect()
}

/// Glycan-by-spectrum tables of intensity, area, and signal-to-noise
///
/// Glycans are listed in the order they were first matched, and spectra in the order given. When a glycan is the best
/// match for several peaks of one spectrum, the peak with the smallest absolute ppm error supplies the value (the
/// earliest such peak, on ties). Glycans missing from a spectrum are left null.
pub fn summary_tables(annotations: &[SpectrumAnnotation]) -> PolarsResult<[SummaryTable; 3]> {
    let BestMatches { glycans, best } = best_matches(annotations);

    let table = |file_stem: &'static str, value: fn(&Peak) -> f64| -> PolarsResult<SummaryTable> {
        let mut columns = vec![Column::new(OutputColumns::GLYCAN.into(), glycans.clone())];
        columns.extend(annotations.iter().zip(&best).map(|(annotation, best)| {
            let values: Vec<_> = (0..glycans.len())
                .map(|row| best.get(row).copied().flatten().map(|m| value(m.peak().peak())))
                .collect();
            Column::new(annotation.name().into(), values)
        }));
        Ok((file_stem, DataFrame::new(columns)?))
    };

    Ok([
        table(SummaryFiles::INTENSITY, Peak::intensity)?,
        table(SummaryFiles::AREA, Peak::area)?,
        table(SummaryFiles::SN, Peak::sn)?,
    ])
}

pub fn write_csv(df: &mut DataFrame, writer: impl Write) -> PolarsResult<()> {
    CsvWriter::new(writer).finish(df)
}

// Private Types =======================================================================================================

struct BestMatches<'a, 'c> {
    glycans: Vec<String>,
    // NOTE: One row per spectrum, indexed by glycan; rows are only as long as the glycans seen up to that spectrum
    best: Vec<Vec<Option<&'a MatchResult<'c>>>>,
}

// Private Functions ===================================================================================================

fn best_matches<'a, 'c>(annotations: &'a [SpectrumAnnotation<'c>]) -> BestMatches<'a, 'c> {
    let mut glycans = Vec::new();
    let mut rows = HashMap::new();

    let best = annotations
        .iter()
        .map(|annotation| {
            let mut best: Vec<Option<&MatchResult>> = vec![None; glycans.len()];
            for m in annotation.matches() {
                let row = *rows.entry(m.candidate().label()).or_insert_with_key(|label| {
                    glycans.push(label.clone());
                    glycans.len() - 1
                });
                if row >= best.len() {
                    best.resize(row + 1, None);
                }
                if best[row].is_none_or(|b| m.ppm_error().abs() < b.ppm_error().abs()) {
                    best[row] = Some(m);
                }
            }
            best
        })
        .collect();

    BestMatches { glycans, best }
}

fn float_column<'c>(name: &str, matches: &[MatchResult<'c>], value: impl Fn(&MatchResult<'c>) -> f64) -> Column {
    Column::new(name.into(), matches.iter().map(value).collect::<Vec<_>>())
}

fn formatted_output_columns(calibrated: bool) -> Vec<Expr> {
    [
        vec![col(OutputColumns::GLYCAN), col(OutputColumns::RAW_MZ)],
        if calibrated {
            vec![col(OutputColumns::CALIBRATED_MZ).round(4)]
        } else {
            Vec::new()
        },
        vec![
            col(OutputColumns::THEO).round(4),
            col(OutputColumns::DELTA).round(4),
            col(OutputColumns::PPM).round(2),
            col(OutputColumns::INTENSITY),
            col(OutputColumns::AREA),
            col(OutputColumns::SN),
            col(OutputColumns::CHARGE_CARRIER),
        ],
    ]
    .concat()
}

// Unit Tests ==========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use assert_float_eq::assert_float_absolute_eq;
    use glycochem::{
        CandidatePool, ChargeCarrier, Composition, GlobalModificationLimits, IonSettings, ModificationExpander,
        ModificationTable, Monosaccharide,
    };
    use insta::assert_snapshot;
    use sifter::{
        CalibratedPeak, CalibratedSpectrum, CalibrationOutcome, LinearCorrection, MassList, MatchMode, Matcher,
    };

    use super::*;

    static POOL: LazyLock<CandidatePool> = LazyLock::new(|| {
        let library = [
            Composition::from_counts([(Monosaccharide::Hex, 5), (Monosaccharide::HexNAc, 2)]),
            Composition::from_counts([(Monosaccharide::Hex, 6), (Monosaccharide::HexNAc, 2)]),
            Composition::from_counts([(Monosaccharide::Hex, 3), (Monosaccharide::HexNAc, 4)]),
        ];
        let expander = ModificationExpander::new(ModificationTable::default(), GlobalModificationLimits::new());
        let settings = IonSettings::new(0.0, ChargeCarrier::Sodium);
        CandidatePool::from_library(&library, &expander, &settings).unwrap()
    });

    fn annotate(name: &str, peaks: &[(f64, f64)], calibrated: bool) -> SpectrumAnnotation<'static> {
        let peaks = peaks.iter().map(|&(mz, intensity)| Peak::new(mz, intensity, intensity / 2.0, intensity / 10.0));
        let spectrum = if calibrated {
            let peaks = peaks.map(|p| CalibratedPeak::new(p, Some(p.raw_mz()))).collect();
            let correction = LinearCorrection::new(0.0, 0.0);
            CalibratedSpectrum::from_parts(name.to_owned(), peaks, CalibrationOutcome::Applied(correction))
        } else {
            CalibratedSpectrum::new(&MassList::new(name, peaks), None)
        };
        Matcher::new(&POOL, 10.0, MatchMode::BestMatch).annotate(spectrum)
    }

    fn into_csv(mut df: DataFrame) -> String {
        let mut csv = Vec::new();
        write_csv(&mut df, &mut csv).unwrap();
        String::from_utf8(csv).unwrap()
    }

    fn header(df: DataFrame) -> String {
        into_csv(df).lines().next().unwrap_or_default().to_owned()
    }

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        df.column(column).unwrap().f64().unwrap().into_iter().collect()
    }

    fn strings(df: &DataFrame, column: &str) -> Vec<Option<String>> {
        let column = df.column(column).unwrap().str().unwrap();
        column.into_iter().map(|s| s.map(str::to_owned)).collect()
    }

    #[test]
    fn test_spectrum_table_columns() {
        let uncalibrated = annotate("raw", &[(1257.4300, 100.0)], false);
        assert_snapshot!(
            header(spectrum_table(&uncalibrated).unwrap()),
            @"glycan,raw_mz,theoretical_mz,delta,ppm,intensity,area,sn,charge_carrier"
        );

        let calibrated = annotate("calibrated", &[(1257.4300, 100.0)], true);
        assert_snapshot!(
            header(spectrum_table(&calibrated).unwrap()),
            @"glycan,raw_mz,calibrated_mz,theoretical_mz,delta,ppm,intensity,area,sn,charge_carrier"
        );

        let empty = annotate("empty", &[(1500.0, 100.0)], false);
        let table = spectrum_table(&empty).unwrap();
        assert_eq!(table.height(), 0);
        assert_snapshot!(
            header(table),
            @"glycan,raw_mz,theoretical_mz,delta,ppm,intensity,area,sn,charge_carrier"
        );
    }

    #[test]
    fn test_spectrum_table_rows() {
        let annotation = annotate("sample", &[(1257.4300, 100.0), (1500.0, 50.0), (1419.4800, 300.0)], true);
        let table = spectrum_table(&annotation).unwrap();

        assert_eq!(
            strings(&table, "glycan"),
            [Some("Hex(5)HexNAc(2)".to_owned()), Some("Hex(6)HexNAc(2)".to_owned())]
        );
        assert_eq!(
            strings(&table, "charge_carrier"),
            [Some("Na+".to_owned()), Some("Na+".to_owned())]
        );
        assert_eq!(floats(&table, "raw_mz"), [Some(1257.4300), Some(1419.4800)]);
        assert_eq!(floats(&table, "intensity"), [Some(100.0), Some(300.0)]);
        assert_eq!(floats(&table, "area"), [Some(50.0), Some(150.0)]);
        assert_eq!(floats(&table, "sn"), [Some(10.0), Some(30.0)]);

        let theo = floats(&table, "theoretical_mz");
        assert_float_absolute_eq!(theo[0].unwrap(), 1257.4232, 1e-9);
        assert_float_absolute_eq!(theo[1].unwrap(), 1419.4760, 1e-9);
        let delta = floats(&table, "delta");
        assert_float_absolute_eq!(delta[0].unwrap(), 0.0068, 1e-9);
        assert_float_absolute_eq!(delta[1].unwrap(), 0.0040, 1e-9);
        let ppm = floats(&table, "ppm");
        assert_float_absolute_eq!(ppm[0].unwrap(), 5.41, 1e-9);
        assert_float_absolute_eq!(ppm[1].unwrap(), 2.82, 1e-9);
    }

    #[test]
    fn test_summary_tables() {
        let annotations = [
            annotate("a", &[(1257.4300, 100.0), (1257.4240, 200.0), (1419.4800, 300.0), (1500.0, 1.0)], false),
            annotate("b", &[(1339.4770, 400.0), (1257.4232, 500.0)], false),
        ];
        let [(intensity_file, intensity), (area_file, area), (sn_file, sn)] =
            summary_tables(&annotations).unwrap();

        assert_eq!(
            [intensity_file, area_file, sn_file],
            ["summary_intensity", "summary_area", "summary_sn"]
        );
        assert_eq!([intensity_file, area_file, sn_file], SUMMARY_FILE_STEMS);
        assert_snapshot!(header(intensity.clone()), @"glycan,a,b");
        assert_eq!(
            strings(&intensity, "glycan"),
            [
                Some("Hex(5)HexNAc(2)".to_owned()),
                Some("Hex(6)HexNAc(2)".to_owned()),
                Some("Hex(3)HexNAc(4)".to_owned()),
            ]
        );

        // The closer of the two Hex(5)HexNAc(2) peaks in `a` wins
        assert_eq!(floats(&intensity, "a"), [Some(200.0), Some(300.0), None]);
        assert_eq!(floats(&intensity, "b"), [Some(500.0), None, Some(400.0)]);
        assert_eq!(floats(&area, "a"), [Some(100.0), Some(150.0), None]);
        assert_eq!(floats(&sn, "b"), [Some(50.0), None, Some(40.0)]);
    }

    #[test]
    fn test_summary_ties_keep_the_earliest_peak() {
        let annotations = [annotate("tied", &[(1257.4250, 10.0), (1257.4250, 20.0)], false)];
        let [(_, intensity), ..] = summary_tables(&annotations).unwrap();
        assert_eq!(floats(&intensity, "tied"), [Some(10.0)]);
    }

    #[test]
    fn test_summary_of_nothing() {
        let [(_, intensity), ..] = summary_tables(&[]).unwrap();
        assert_eq!(intensity.height(), 0);
        assert_snapshot!(header(intensity), @"glycan");
    }
}
