//! Reading glycan libraries written in the Byonic composition format
//!
//! ```text
//! # N-glycans
//! HexNAc(2)Hex(5) % 1216.4228
//! HexNAc(4)Hex(5)dHex(1)NeuAc(1) % 2059.7349
//! ```

// Standard Library Imports
use std::{collections::BTreeMap, iter};

// External Crate Imports
use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use nom::{
    IResult, Offset,
    character::complete::{alpha1, char, space0, u32},
    combinator::all_consuming,
    multi::many1,
    sequence::{delimited, pair, preceded, terminated},
};
use thiserror::Error;

// Local Crate Imports
use crate::{Composition, GlycoError, Massive, Monosaccharide};

// Public API ==========================================================================================================

#[derive(Clone, PartialEq, Debug)]
pub struct LibraryEntry {
    pub composition: Composition,
    /// The mass written after `%`, which is only ever informational
    pub listed_mass: Option<f64>,
    /// One-based line number in the library file
    pub line: usize,
}

impl LibraryEntry {
    /// The listed mass minus the residue mass of the composition, when a mass was listed
    ///
    /// Byonic masses are plain residue sums, without the water of the free reducing end.
    #[must_use]
    pub fn listed_mass_error(&self) -> Option<f64> {
        self.listed_mass
            .map(|listed| listed - self.composition.monoisotopic_mass())
    }
}

/// Parses every composition in a Byonic library file
///
/// Blank lines and lines starting with `#` are skipped. Any monosaccharide named more than once on a line has its
/// counts summed.
pub fn parse_library(
    file_name: impl AsRef<str>,
    text: impl AsRef<str>,
) -> Result<Vec<LibraryEntry>, LibraryError> {
    let text = text.as_ref();
    parse_lines(text).map_err(|kind| kind.finalize(file_name, text))
}

// Grammar =============================================================================================================

type ParseResult<'a, O> = IResult<&'a str, O>;

/// Composition = Residue Count , { Residue Count } ;
fn composition(i: &str) -> ParseResult<Vec<(&str, u32)>> {
    terminated(many1(preceded(space0, residue_count)), space0)(i)
}

/// Residue Count = Name , "(" , Count , ")" ;
fn residue_count(i: &str) -> ParseResult<(&str, u32)> {
    pair(name, delimited(char('('), count, char(')')))(i)
}

/// Name = letter , { letter } ;
fn name(i: &str) -> ParseResult<&str> {
    alpha1(i)
}

/// Count = digit , { digit } ;
fn count(i: &str) -> ParseResult<u32> {
    u32(i)
}

// ---------------------------------------------------------------------------------------------------------------------

fn parse_lines(text: &str) -> Result<Vec<LibraryEntry>, LibraryErrorKind> {
    let mut entries = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (composition_text, mass_text) = line.split_once('%').unwrap_or((line, ""));
        let residues = match all_consuming(composition)(composition_text) {
            Ok((_, residues)) => residues,
            Err(nom::Err::Error(e) | nom::Err::Failure(e)) if !e.input.trim().is_empty() => {
                return Err(LibraryErrorKind::InvalidSyntax(span_of(text, e.input.trim_end())));
            }
            Err(_) => return Err(LibraryErrorKind::InvalidSyntax(span_of(text, line))),
        };

        let mut counts = BTreeMap::new();
        for (abbr, count) in residues {
            let monosaccharide = Monosaccharide::from_abbr(abbr)
                .map_err(|e| LibraryErrorKind::UnknownMonosaccharide(span_of(text, abbr), e))?;
            let total: &mut u32 = counts.entry(monosaccharide).or_default();
            *total = total
                .checked_add(count)
                .ok_or_else(|| LibraryErrorKind::CountOverflow(span_of(text, abbr)))?;
        }
        let glycan = Composition::from_counts(counts);
        if glycan.is_empty() {
            return Err(LibraryErrorKind::EmptyComposition(span_of(text, composition_text.trim_end())));
        }

        let mass_text = mass_text.trim();
        let listed_mass = if mass_text.is_empty() {
            None
        } else {
            let mass = mass_text
                .parse()
                .map_err(|_| LibraryErrorKind::InvalidMass(span_of(text, mass_text)))?;
            Some(mass)
        };

        entries.push(LibraryEntry {
            composition: glycan,
            listed_mass,
            line: index + 1,
        });
    }

    Ok(entries)
}

fn span_of(text: &str, fragment: &str) -> SourceSpan {
    (text.offset(fragment), fragment.len()).into()
}

// Library Error Types and Trait Implementations =======================================================================

#[derive(Debug, Error)]
#[error("failed to parse glycan library file")]
pub struct LibraryError {
    library: NamedSource<String>,
    #[source]
    kind: LibraryErrorKind,
}

impl LibraryError {
    #[must_use]
    pub const fn kind(&self) -> &LibraryErrorKind {
        &self.kind
    }
}

// NOTE: Manually implemented so that labels can be pulled out of `self.kind`, while the source lives here
impl Diagnostic for LibraryError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.library)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let (span, label) = self.kind.label();
        Some(Box::new(iter::once(LabeledSpan::new_with_span(
            Some(label.to_owned()),
            span,
        ))))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, PartialEq, Debug, Diagnostic, Error)]
pub enum LibraryErrorKind {
    #[error("expected a glycan composition like Hex(5)HexNAc(2)")]
    #[diagnostic(help(
        "each line should list monosaccharides followed by their count in parentheses, optionally followed by '%' \
        and a mass"
    ))]
    InvalidSyntax(SourceSpan),

    #[error("the library contains an unknown monosaccharide")]
    UnknownMonosaccharide(
        SourceSpan,
        #[source]
        #[diagnostic_source]
        GlycoError,
    ),

    #[error("every count in this composition is zero")]
    #[diagnostic(help("remove the line, or give at least one monosaccharide a non-zero count"))]
    EmptyComposition(SourceSpan),

    #[error("the total count of this monosaccharide is too large")]
    #[diagnostic(help("counts summed over one line must fit in a 32-bit unsigned integer"))]
    CountOverflow(SourceSpan),

    #[error("expected a mass after '%'")]
    #[diagnostic(help("the listed mass is ignored, but must be a number like 1216.4229 when present"))]
    InvalidMass(SourceSpan),
}

impl LibraryErrorKind {
    const fn label(&self) -> (SourceSpan, &'static str) {
        match self {
            Self::InvalidSyntax(s) => (*s, "invalid composition"),
            Self::UnknownMonosaccharide(s, _) => (*s, "unknown monosaccharide"),
            Self::EmptyComposition(s) => (*s, "empty composition"),
            Self::CountOverflow(s) => (*s, "count overflows"),
            Self::InvalidMass(s) => (*s, "invalid mass"),
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, text: &str) -> LibraryError {
        let library = NamedSource::new(file_name, text.to_owned());
        LibraryError { library, kind: self }
    }
}

// Module Tests ========================================================================================================
