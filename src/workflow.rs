// Standard Library Imports
use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};

// External Crate Imports
use consolidation::{SUMMARY_FILE_STEMS, spectrum_table, summary_tables, write_csv};
use glycochem::{CandidatePool, DeNovoSearch, parsers::parse_library};
use miette::{Diagnostic, Result};
use polars::prelude::{DataFrame, PolarsError};
use sifter::{MatchMode, Matcher, annotate_spectra, calibrate_spectra, target_windows};
use thiserror::Error;
use tracing::{info, warn};

// Local Crate Imports
use crate::{config::Config, mass_list::read_mass_lists};

// Public API ==========================================================================================================

/// The glycan library bundled with the binary
pub const DEFAULT_DATABASE: &str = include_str!("../data/database.byonic");

const RESULTS_SUFFIX: &str = "_glyhunter_results";

// NOTE: Listed masses are written with four decimal places, so anything further off than this is a different glycan
const LISTED_MASS_TOLERANCE: f64 = 0.01;

/// Where candidate compositions come from
#[derive(Clone, Debug)]
pub enum SearchSpace {
    /// A Byonic library, kept as its file name and text so that parse errors can point into it
    Library { file_name: String, text: String },
    DeNovo,
}

impl SearchSpace {
    #[must_use]
    pub fn embedded_library() -> Self {
        Self::Library {
            file_name: "database.byonic".to_owned(),
            text: DEFAULT_DATABASE.to_owned(),
        }
    }

    pub fn library_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| WorkflowError::Read {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::Library {
            file_name: path.display().to_string(),
            text,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Workflow {
    pub config: Config,
    pub search_space: SearchSpace,
    pub mode: MatchMode,
}

impl Workflow {
    /// Annotates every mass list under `input`, writing result tables into a fresh `output` directory
    ///
    /// Without an explicit `output`, results go next to `input` in `<input stem>_glyhunter_results`. Returns the
    /// directory that was written to.
    pub fn run(&self, input: &Path, output: Option<&Path>) -> Result<PathBuf> {
        let output = output.map_or_else(|| default_output_dir(input), Path::to_owned);
        if output.exists() {
            return Err(WorkflowError::OutputExists { path: output }.into());
        }

        let mass_lists = read_mass_lists(input)?;
        info!(spectra = mass_lists.len(), input = %input.display(), "read mass lists");
        let clash = mass_lists.iter().find(|m| SUMMARY_FILE_STEMS.contains(&m.name()));
        if let Some(clash) = clash.filter(|_| self.mode == MatchMode::BestMatch) {
            return Err(WorkflowError::ReservedName {
                name: clash.name().to_owned(),
            }
            .into());
        }

        // NOTE: Every spectrum must be calibrated before De-Novo search, since its target windows come from
        // calibrated peaks
        let spectra = calibrate_spectra(&mass_lists, self.config.calibrator.as_ref());

        let pool = match &self.search_space {
            SearchSpace::Library { file_name, text } => {
                let library = parse_library(file_name, text)?;
                for entry in &library {
                    let error = entry.listed_mass_error();
                    if let Some(error) = error.filter(|e| e.abs() > LISTED_MASS_TOLERANCE) {
                        warn!(
                            library = %file_name,
                            line = entry.line,
                            glycan = %entry.composition,
                            error,
                            "listed mass disagrees with the composition, so the composition will be used"
                        );
                    }
                }
                let compositions = library.iter().map(|entry| &entry.composition);
                CandidatePool::from_library(compositions, &self.config.expander(), &self.config.ion_settings)?
            }
            SearchSpace::DeNovo => {
                let search = DeNovoSearch::new(
                    &self.config.constraints,
                    self.config.expander(),
                    self.config.ion_settings,
                )?;
                search.build_pool(Some(&target_windows(&spectra, self.config.mz_tol)))?
            }
        };
        info!(candidates = pool.len(), "built candidate pool");

        let matcher = Matcher::new(&pool, self.config.mz_tol, self.mode);
        let annotations = annotate_spectra(spectra, &matcher);

        fs::create_dir_all(&output).map_err(|source| WorkflowError::Write {
            path: output.clone(),
            source,
        })?;

        for annotation in &annotations {
            let path = output.join(format!("{}.csv", annotation.name()));
            let table = spectrum_table(annotation).map_err(|source| WorkflowError::table(&path, source))?;
            write_table(&path, table)?;
        }

        if self.mode == MatchMode::BestMatch {
            let tables = summary_tables(&annotations).map_err(|source| WorkflowError::table(&output, source))?;
            for (file_stem, table) in tables {
                write_table(&output.join(format!("{file_stem}.csv")), table)?;
            }
        }

        Ok(output)
    }
}

#[must_use]
pub fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str()).to_string_lossy();
    input.with_file_name(format!("{stem}{RESULTS_SUFFIX}"))
}

// Private Functions ===================================================================================================

fn write_table(path: &Path, mut table: DataFrame) -> Result<(), WorkflowError> {
    let file = File::create(path).map_err(|source| WorkflowError::Write {
        path: path.to_owned(),
        source,
    })?;
    write_csv(&mut table, BufWriter::new(file)).map_err(|source| WorkflowError::table(path, source))
}

// Errors ==============================================================================================================

#[derive(Debug, Diagnostic, Error)]
pub enum WorkflowError {
    #[diagnostic(help("choose another output directory, or move the old results out of the way"))]
    #[error("the output directory {} already exists", path.display())]
    OutputExists { path: PathBuf },

    #[diagnostic(help("rename the mass list, or run with --all-candidates, which writes no summary tables"))]
    #[error("the mass list {name:?} would be overwritten by a summary table of the same name")]
    ReservedName { name: String },

    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build the result table {}", path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

impl WorkflowError {
    fn table(path: &Path, source: PolarsError) -> Self {
        let path = path.to_owned();

        Self::Table { path, source }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use glycochem::{ChargeCarrier, IonSettings};
    use indoc::indoc;
    use insta::assert_snapshot;

    use super::*;

    // NOTE: Each test gets its own scratch directory, since tests run in parallel
    fn scratch_dir(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("glyhunter-{}-{name}-{n}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config() -> Config {
        let mut config = Config::embedded().unwrap();
        config.mz_tol = 10.0;
        config.calibrator = None;
        config.ion_settings = IonSettings::new(0.0, ChargeCarrier::Sodium);
        config
    }

    const SPECTRUM_A: &str = indoc! {"
        m/z,Intens.,Area,SN
        1257.4240,1000,100,50
        1300.0000,10,1,1
        1419.4770,500,50,25
    "};

    const SPECTRUM_B: &str = indoc! {"
        m/z,Intens.,Area,SN
        1257.4230,800,80,40
    "};

    fn write_inputs(dir: &Path) -> PathBuf {
        let input = dir.join("spectra");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("b.csv"), SPECTRUM_B).unwrap();
        fs::write(input.join("a.csv"), SPECTRUM_A).unwrap();
        fs::write(input.join("notes.txt"), "not a mass list").unwrap();
        input
    }

    fn header(path: &Path) -> String {
        let csv = fs::read_to_string(path).unwrap();
        csv.lines().next().unwrap().to_owned()
    }

    #[test]
    fn default_output_dir_is_a_sibling() {
        assert_eq!(
            default_output_dir(Path::new("/data/run_01.csv")),
            Path::new("/data/run_01_glyhunter_results")
        );
        assert_eq!(
            default_output_dir(Path::new("/data/spectra")),
            Path::new("/data/spectra_glyhunter_results")
        );
    }

    #[test]
    fn library_run() {
        let dir = scratch_dir("library");
        let input = write_inputs(&dir);
        let workflow = Workflow {
            config: config(),
            search_space: SearchSpace::embedded_library(),
            mode: MatchMode::BestMatch,
        };

        let output = workflow.run(&input, None).unwrap();
        assert_eq!(output, dir.join("spectra_glyhunter_results"));

        let mut written: Vec<_> = fs::read_dir(&output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        written.sort();
        assert_eq!(
            written,
            ["a.csv", "b.csv", "summary_area.csv", "summary_intensity.csv", "summary_sn.csv"]
        );

        let a = fs::read_to_string(output.join("a.csv")).unwrap();
        assert_eq!(a.lines().count(), 3);
        assert!(a.lines().nth(1).unwrap().starts_with("Hex(5)HexNAc(2),1257.424"));
        assert!(a.lines().nth(2).unwrap().starts_with("Hex(6)HexNAc(2),1419.477"));
        assert_snapshot!(header(&output.join("summary_intensity.csv")), @"glycan,a,b");

        // Results are never written over
        assert!(workflow.run(&input, None).is_err());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn all_candidates_run_skips_summaries() {
        let dir = scratch_dir("all-candidates");
        let input = write_inputs(&dir);
        let output = dir.join("results");
        let workflow = Workflow {
            config: config(),
            search_space: SearchSpace::embedded_library(),
            mode: MatchMode::AllCandidates,
        };

        workflow.run(&input.join("a.csv"), Some(&output)).unwrap();
        let written: Vec<_> = fs::read_dir(&output).unwrap().collect();
        assert_eq!(written.len(), 1);
        assert_snapshot!(
            header(&output.join("a.csv")),
            @"glycan,raw_mz,theoretical_mz,delta,ppm,intensity,area,sn,charge_carrier"
        );
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn de_novo_run() {
        let dir = scratch_dir("de-novo");
        let input = write_inputs(&dir);
        let mut config = config();
        config.calibrator = Some(sifter::Calibrator::new([1257.4232, 1419.4760], 100.0));
        let workflow = Workflow {
            config,
            search_space: SearchSpace::DeNovo,
            mode: MatchMode::BestMatch,
        };

        let output = workflow.run(&input, None).unwrap();
        // Spectrum `b` has one reference peak, so it falls back to raw masses but keeps the calibrated column
        assert_snapshot!(
            header(&output.join("b.csv")),
            @"glycan,raw_mz,calibrated_mz,theoretical_mz,delta,ppm,intensity,area,sn,charge_carrier"
        );
        let a = fs::read_to_string(output.join("a.csv")).unwrap();
        assert!(a.contains("Hex(5)HexNAc(2),"));
        assert!(a.contains("Hex(6)HexNAc(2),"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_library() {
        let dir = scratch_dir("bad-library");
        let input = write_inputs(&dir);
        let workflow = Workflow {
            config: config(),
            search_space: SearchSpace::Library {
                file_name: "bad.byonic".to_owned(),
                text: "Hex(5)Fuc(1) % 1000.0".to_owned(),
            },
            mode: MatchMode::BestMatch,
        };
        let report = workflow.run(&input, None).unwrap_err();
        assert_eq!(report.to_string(), "failed to parse glycan library file");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn summary_names_are_reserved() {
        let dir = scratch_dir("reserved");
        let input = dir.join("summary_area.csv");
        fs::write(&input, SPECTRUM_B).unwrap();
        let mut workflow = Workflow {
            config: config(),
            search_space: SearchSpace::embedded_library(),
            mode: MatchMode::BestMatch,
        };

        let report = workflow.run(&input, None).unwrap_err();
        assert_eq!(
            report.to_string(),
            r#"the mass list "summary_area" would be overwritten by a summary table of the same name"#
        );
        assert!(!dir.join("summary_area_glyhunter_results").exists());

        // Without summary tables, there is nothing to clash with
        workflow.mode = MatchMode::AllCandidates;
        let output = workflow.run(&input, None).unwrap();
        assert!(output.join("summary_area.csv").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mislisted_library_masses_are_only_warnings() {
        let dir = scratch_dir("mislisted");
        let input = write_inputs(&dir);
        let workflow = Workflow {
            config: config(),
            search_space: SearchSpace::Library {
                file_name: "mislisted.byonic".to_owned(),
                text: "HexNAc(2)Hex(5) % 1234.4334\n".to_owned(),
            },
            mode: MatchMode::BestMatch,
        };

        let output = workflow.run(&input, None).unwrap();
        let a = fs::read_to_string(output.join("a.csv")).unwrap();
        assert!(a.lines().nth(1).unwrap().starts_with("Hex(5)HexNAc(2),"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_input() {
        let dir = scratch_dir("missing");
        let workflow = Workflow {
            config: config(),
            search_space: SearchSpace::embedded_library(),
            mode: MatchMode::BestMatch,
        };
        assert!(workflow.run(&dir.join("nowhere.csv"), None).is_err());

        let empty = dir.join("empty");
        fs::create_dir_all(&empty).unwrap();
        let report = workflow.run(&empty, None).unwrap_err();
        assert!(report.to_string().starts_with("no mass lists were found"));
        fs::remove_dir_all(&dir).unwrap();
    }
}
