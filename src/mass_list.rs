// Standard Library Imports
use std::{
    fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
};

// External Crate Imports
use itertools::izip;
use miette::Diagnostic;
use polars::prelude::*;
use sifter::{MassList, Peak};
use thiserror::Error;
use tracing::debug;

// Constants ===========================================================================================================

// NOTE: These are the column names of a FlexAnalysis mass-list export
struct InputColumns;
impl InputColumns {
    const ALL: [&str; 4] = [Self::MZ, Self::INTENSITY, Self::AREA, Self::SN];
    const MZ: &str = "m/z";
    const INTENSITY: &str = "Intens.";
    const AREA: &str = "Area";
    const SN: &str = "SN";
}

const MASS_LIST_EXTENSION: &str = "csv";

// Public API ==========================================================================================================

/// Reads a single mass-list file, or every mass list in a directory (ordered by file name)
pub fn read_mass_lists(input: &Path) -> Result<Vec<MassList>, MassListError> {
    let paths = if input.is_dir() {
        let mut paths: Vec<_> = fs::read_dir(input)
            .and_then(|entries| entries.map(|e| e.map(|e| e.path())).collect::<io::Result<Vec<_>>>())
            .map_err(|e| MassListError::io(input, e))?
            .into_iter()
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == MASS_LIST_EXTENSION))
            .collect();
        paths.sort();
        paths
    } else {
        vec![input.to_owned()]
    };

    if paths.is_empty() {
        return Err(MassListError::NoMassLists {
            path: input.to_owned(),
        });
    }

    paths.iter().map(|path| read_mass_list(path)).collect()
}

/// Reads one mass-list file, named after its file stem
pub fn read_mass_list(path: &Path) -> Result<MassList, MassListError> {
    let csv = fs::read_to_string(path).map_err(|e| MassListError::io(path, e))?;
    let name = path
        .file_stem()
        .map_or_else(|| path.to_string_lossy(), |s| s.to_string_lossy());

    let mass_list = parse_mass_list(&name, &csv).map_err(|source| MassListError::Csv {
        path: path.to_owned(),
        source,
    })?;
    debug!(path = %path.display(), peaks = mass_list.peaks().len(), "read mass list");
    Ok(mass_list)
}

/// Parses mass-list CSV text; rows missing any of the required values are skipped
pub fn parse_mass_list(name: &str, csv: &str) -> PolarsResult<MassList> {
    let df = CsvReader::new(Cursor::new(csv))
        .finish()?
        .lazy()
        .select(InputColumns::ALL.map(|c| col(c).cast(DataType::Float64)))
        .drop_nulls(None)
        .collect()?;

    let mz = df.column(InputColumns::MZ)?.f64()?;
    let intensity = df.column(InputColumns::INTENSITY)?.f64()?;
    let area = df.column(InputColumns::AREA)?.f64()?;
    let sn = df.column(InputColumns::SN)?.f64()?;

    let peaks = izip!(
        mz.into_no_null_iter(),
        intensity.into_no_null_iter(),
        area.into_no_null_iter(),
        sn.into_no_null_iter()
    )
    .map(|(mz, intensity, area, sn)| Peak::new(mz, intensity, area, sn));

    Ok(MassList::new(name, peaks))
}

// Errors ==============================================================================================================

#[derive(Debug, Diagnostic, Error)]
pub enum MassListError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[diagnostic(help("mass lists need the columns: m/z, Intens., Area, and SN"))]
    #[error("failed to parse the mass list {}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[diagnostic(help("mass lists are read from files ending in .csv"))]
    #[error("no mass lists were found in {}", path.display())]
    NoMassLists { path: PathBuf },
}

impl MassListError {
    fn io(path: &Path, source: io::Error) -> Self {
        let path = path.to_owned();

        Self::Io { path, source }
    }
}

// Module Tests ========================================================================================================
