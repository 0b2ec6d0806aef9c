// Standard Library Imports
use std::{collections::hash_map::Entry, fmt::Display, hash::Hash};

// External Crate Imports
use ahash::{HashMap, HashMapExt};
use glycochem::{
    ChargeCarrier, Constraints, GlobalModification, GlobalModificationLimits, GlycoError, IonSettings,
    ModificationExpander, ModificationTable, Monosaccharide,
};
use knuffel::{
    Decode,
    span::{Span, Spanned},
};
use miette::{Diagnostic, LabeledSpan, NamedSource, Result};
use sifter::{Calibrator, MIN_CALIBRATION_PEAKS};
use thiserror::Error;

// Public API ==========================================================================================================

/// The configuration used whenever no other file is given
pub const DEFAULT_CONFIG: &str = include_str!("../data/config.kdl");

const MAX_MZ_TOL: f64 = 100.0;
const MAX_CALIBRATION_TOL: f64 = 500.0;

#[derive(Clone, Debug)]
pub struct Config {
    /// Matching tolerance, in ppm
    pub mz_tol: f64,
    pub ion_settings: IonSettings,
    /// Absent when calibration is switched off
    pub calibrator: Option<Calibrator>,
    pub modifications: ModificationTable,
    pub global_modifications: GlobalModificationLimits,
    /// Only consulted by De-Novo search
    pub constraints: Constraints,
}

impl Config {
    pub fn from_kdl(file_name: impl AsRef<str>, kdl_text: impl AsRef<str>) -> Result<Self> {
        let parsed_config: ConfigKdl = knuffel::parse(file_name.as_ref(), kdl_text.as_ref())?;
        parsed_config
            .validate()
            .map_err(|e| e.finalize(file_name, kdl_text).into())
    }

    pub fn embedded() -> Result<Self> {
        Self::from_kdl("config.kdl", DEFAULT_CONFIG)
    }

    #[must_use]
    pub fn expander(&self) -> ModificationExpander {
        ModificationExpander::new(self.modifications.clone(), self.global_modifications.clone())
    }
}

// KDL File Schema =====================================================================================================

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ConfigKdl {
    #[knuffel(child, unwrap(argument))]
    mz_tol: Spanned<f64, Span>,
    #[knuffel(child, unwrap(argument))]
    reducing_end: Spanned<f64, Span>,
    #[knuffel(child, unwrap(argument))]
    charge_carrier: Spanned<String, Span>,
    #[knuffel(child)]
    calibration: CalibrationKdl,
    #[knuffel(child, default)]
    modifications: ModificationsKdl,
    #[knuffel(child, default)]
    global_modifications: GlobalModificationsKdl,
    #[knuffel(child, default)]
    constraints: ConstraintsKdl,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct CalibrationKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(property)]
    on: bool,
    #[knuffel(property)]
    tolerance: Spanned<f64, Span>,
    #[knuffel(children(name = "reference"))]
    references: Vec<ReferenceKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ReferenceKdl {
    #[knuffel(argument)]
    mz: f64,
}

// ---------------------------------------------------------------------------------------------------------------------

#[derive(Debug, Default, Decode)]
#[knuffel(span_type=Span)]
struct ModificationsKdl {
    #[knuffel(children)]
    modifications: Vec<ModificationKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ModificationKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    monosaccharide: String,
    #[knuffel(arguments)]
    deltas: Vec<f64>,
}

#[derive(Debug, Default, Decode)]
#[knuffel(span_type=Span)]
struct GlobalModificationsKdl {
    #[knuffel(children)]
    modifications: Vec<GlobalModificationKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct GlobalModificationKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    abbr: String,
    #[knuffel(argument)]
    max: u32,
}

#[derive(Debug, Default, Decode)]
#[knuffel(span_type=Span)]
struct ConstraintsKdl {
    #[knuffel(children)]
    constraints: Vec<ConstraintKdl>,
}

#[derive(Debug, Decode)]
#[knuffel(span_type=Span)]
struct ConstraintKdl {
    #[knuffel(span)]
    span: Span,
    #[knuffel(node_name)]
    monosaccharide: String,
    #[knuffel(argument)]
    min: u32,
    #[knuffel(argument)]
    max: u32,
}

// Validation Trait ====================================================================================================

type ConfigResult<T> = Result<T, ConfigErrorKind>;

trait ValidateInto<T> {
    fn validate(self) -> ConfigResult<T>;
}

// Config Validation ===================================================================================================

impl ValidateInto<Config> for ConfigKdl {
    fn validate(self) -> ConfigResult<Config> {
        let mz_tol = positive_at_most(self.mz_tol, "mz-tol", MAX_MZ_TOL)?;
        let reducing_end = non_negative(self.reducing_end, "reducing-end")?;
        let charge_carrier = ChargeCarrier::from_symbol(&self.charge_carrier)
            .map_err(|e| ConfigErrorKind::Glyco(*self.charge_carrier.span(), e))?;

        Ok(Config {
            mz_tol,
            ion_settings: IonSettings::new(reducing_end, charge_carrier),
            calibrator: self.calibration.validate()?,
            modifications: self.modifications.validate()?,
            global_modifications: self.global_modifications.validate()?,
            constraints: self.constraints.validate()?,
        })
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl ValidateInto<Option<Calibrator>> for CalibrationKdl {
    fn validate(self) -> ConfigResult<Option<Calibrator>> {
        let tolerance = positive_at_most(self.tolerance, "calibration tolerance", MAX_CALIBRATION_TOL)?;
        if !self.on {
            return Ok(None);
        }

        if self.references.len() < MIN_CALIBRATION_PEAKS {
            return Err(ConfigErrorKind::TooFewReferences(self.span, self.references.len()));
        }
        let references = self.references.into_iter().map(|r| r.mz);
        Ok(Some(Calibrator::new(references, tolerance)))
    }
}

// ---------------------------------------------------------------------------------------------------------------------

impl ValidateInto<ModificationTable> for ModificationsKdl {
    fn validate(self) -> ConfigResult<ModificationTable> {
        let mut seen = HashMap::new();
        let mut table = ModificationTable::new();

        for modification in self.modifications {
            let monosaccharide = monosaccharide(&modification.monosaccharide, modification.span)?;
            first_definition(&mut seen, monosaccharide, modification.span)?;
            table.insert(monosaccharide, modification.deltas);
        }

        Ok(table)
    }
}

impl ValidateInto<GlobalModificationLimits> for GlobalModificationsKdl {
    fn validate(self) -> ConfigResult<GlobalModificationLimits> {
        let mut seen = HashMap::new();
        let mut limits = GlobalModificationLimits::new();

        for modification in self.modifications {
            let global_modification = GlobalModification::from_abbr(&modification.abbr)
                .map_err(|e| ConfigErrorKind::Glyco(modification.span, e))?;
            first_definition(&mut seen, global_modification, modification.span)?;
            limits.set(global_modification, modification.max);
        }

        Ok(limits)
    }
}

impl ValidateInto<Constraints> for ConstraintsKdl {
    fn validate(self) -> ConfigResult<Constraints> {
        let mut seen = HashMap::new();
        let mut constraints = Constraints::new();

        for ConstraintKdl {
            span,
            monosaccharide: abbr,
            min,
            max,
        } in self.constraints
        {
            let monosaccharide = monosaccharide(&abbr, span)?;
            first_definition(&mut seen, monosaccharide, span)?;
            if min > max {
                let error = GlycoError::InvalidConstraint {
                    monosaccharide,
                    min,
                    max,
                };
                return Err(ConfigErrorKind::Glyco(span, error));
            }
            constraints.set(monosaccharide, min, max);
        }

        Ok(constraints)
    }
}

// Validation Helpers ==================================================================================================

fn positive_at_most(value: Spanned<f64, Span>, setting: &'static str, max: f64) -> ConfigResult<f64> {
    if *value > 0.0 && *value <= max {
        Ok(*value)
    } else {
        Err(ConfigErrorKind::OutOfRange(*value.span(), setting, max))
    }
}

fn non_negative(value: Spanned<f64, Span>, setting: &'static str) -> ConfigResult<f64> {
    if *value >= 0.0 {
        Ok(*value)
    } else {
        Err(ConfigErrorKind::Negative(*value.span(), setting))
    }
}

fn monosaccharide(abbr: &str, span: Span) -> ConfigResult<Monosaccharide> {
    Monosaccharide::from_abbr(abbr).map_err(|e| ConfigErrorKind::Glyco(span, e))
}

fn first_definition<K: Eq + Hash + Display>(seen: &mut HashMap<K, Span>, key: K, span: Span) -> ConfigResult<()> {
    match seen.entry(key) {
        Entry::Occupied(e) => {
            let (key, first_defined_at) = e.remove_entry();
            Err(ConfigErrorKind::Duplicate(first_defined_at, span, key.to_string()))
        }
        Entry::Vacant(e) => {
            e.insert(span);
            Ok(())
        }
    }
}

// Validation Error Types and Trait Implementations  ===================================================================

#[derive(Debug, Error)]
#[error("failed to validate configuration file")]
pub struct ConfigError {
    kdl: NamedSource<String>,
    #[source]
    kind: ConfigErrorKind,
}

// NOTE: This is manually implemented because the list of labels is dynamic and needs to be extracted from `self.kind`
impl Diagnostic for ConfigError {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.kdl)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(self.kind.labels().into_iter().map(|(s, l)| {
            LabeledSpan::new_with_span(Some(l.to_owned()), *s)
        })))
    }

    fn diagnostic_source(&self) -> Option<&dyn Diagnostic> {
        Some(&self.kind)
    }
}

#[derive(Clone, PartialEq, Debug, Diagnostic, Error)]
enum ConfigErrorKind {
    #[error("{1} must be greater than 0 and at most {2}")]
    #[diagnostic(help("tolerances are given in ppm"))]
    OutOfRange(Span, &'static str, f64),

    #[error("{1} must not be negative")]
    Negative(Span, &'static str),

    #[error("calibration is on, but only {1} reference mass(es) were given")]
    #[diagnostic(help("add at least two `reference` masses, or switch calibration off with `on=false`"))]
    TooFewReferences(Span, usize),

    #[error("{2} has already been configured")]
    #[diagnostic(help("remove or merge the duplicate entry"))]
    Duplicate(Span, Span, String),

    #[error("configuration file contained an invalid entry")]
    Glyco(
        Span,
        #[source]
        #[diagnostic_source]
        GlycoError,
    ),
}

impl ConfigErrorKind {
    fn labels(&self) -> Vec<(&Span, &'static str)> {
        match self {
            Self::OutOfRange(s, _, _) => vec![(s, "out of range")],
            Self::Negative(s, _) => vec![(s, "negative value")],
            Self::TooFewReferences(s, _) => vec![(s, "too few references")],
            Self::Duplicate(s1, s2, _) => vec![(s1, "first defined here"), (s2, "then again here")],
            Self::Glyco(s, _) => vec![(s, "invalid entry")],
        }
    }

    fn finalize(self, file_name: impl AsRef<str>, kdl: impl AsRef<str>) -> ConfigError {
        let kdl = NamedSource::new(file_name, kdl.as_ref().to_owned());
        ConfigError { kdl, kind: self }
    }
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use assert_float_eq::assert_float_absolute_eq;
    use indoc::indoc;

    use super::*;

    const MINIMAL: &str = indoc! {r#"
        mz-tol 20.0
        reducing-end 0.0
        charge-carrier "H+"
        calibration on=false tolerance=100.0
    "#};

    fn parse_config(kdl: &str) -> Result<Config, ConfigError> {
        let config: ConfigKdl = knuffel::parse("test", kdl).unwrap();
        config.validate().map_err(|e| e.finalize("test", kdl))
    }

    // NOTE: Replaces the first line starting with `prefix` in the minimal config
    fn with_line(prefix: &str, line: &str) -> String {
        MINIMAL
            .lines()
            .map(|l| if l.starts_with(prefix) { line } else { l })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn labelled_text(error: &ConfigError, kdl: &str) -> Vec<String> {
        error
            .labels()
            .unwrap()
            .map(|l| kdl[l.offset()..l.offset() + l.len()].to_owned())
            .collect()
    }

    #[test]
    fn embedded_config() {
        let config = Config::embedded().unwrap();
        assert_float_absolute_eq!(config.mz_tol, 50.0);
        assert_eq!(config.ion_settings, IonSettings::new(0.0, ChargeCarrier::Sodium));

        let calibrator = config.calibrator.as_ref().unwrap();
        assert_eq!(calibrator.references().len(), 5);
        assert_eq!(config.modifications.deltas(Monosaccharide::NeuAc).len(), 2);
        assert_eq!(config.modifications.deltas(Monosaccharide::Hex).len(), 1);
        assert_eq!(config.global_modifications, GlobalModificationLimits::new());
        assert_eq!(config.constraints.bounds(Monosaccharide::Hex), (3, 10));
        assert_eq!(config.constraints.bounds(Monosaccharide::Pen), (0, 0));
    }

    #[test]
    fn missing_sections_have_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_float_absolute_eq!(config.mz_tol, 20.0);
        assert_eq!(config.ion_settings.charge_carrier, ChargeCarrier::Proton);
        assert!(config.calibrator.is_none());
        assert_eq!(config.modifications, ModificationTable::new());
        assert_eq!(config.global_modifications, GlobalModificationLimits::new());
        assert_eq!(config.constraints, Constraints::new());
    }

    #[test]
    fn full_config() {
        let kdl = indoc! {r#"
            mz-tol 10.0
            reducing-end 1.5
            charge-carrier "K+"
            calibration on=true tolerance=200.0 {
                reference 1257.4232
                reference 1419.4760
            }
            modifications {
                NeuAc 0.0 13.0316 13.0316
                Hex 0.0 -18.0106
            }
            global-modifications {
                Ac 2
                S 1
            }
            constraints {
                Hex 3 9
                dHex 0 1
            }
        "#};
        let config = parse_config(kdl).unwrap();

        assert_eq!(config.ion_settings, IonSettings::new(1.5, ChargeCarrier::Potassium));
        let calibrator = config.calibrator.unwrap();
        assert_eq!(calibrator.references(), [1257.4232, 1419.4760]);
        // Repeated deltas collapse into one
        assert_eq!(config.modifications.deltas(Monosaccharide::NeuAc).len(), 2);
        assert_eq!(config.modifications.delta_range(Monosaccharide::Hex), Some((-18.0106, 0.0)));
        assert_eq!(config.global_modifications.max(GlobalModification::Ac), 2);
        assert_eq!(config.global_modifications.max(GlobalModification::P), 0);
        assert_eq!(config.global_modifications.max(GlobalModification::S), 1);
        assert_eq!(config.constraints.bounds(Monosaccharide::DHex), (0, 1));
    }

    #[test]
    fn tolerances_out_of_range() {
        for (line, setting) in [
            ("mz-tol 0.0", "mz-tol"),
            ("mz-tol 150.0", "mz-tol"),
            ("mz-tol -5.0", "mz-tol"),
        ] {
            let kdl = with_line("mz-tol", line);
            let error = parse_config(&kdl).unwrap_err();
            assert!(matches!(error.kind, ConfigErrorKind::OutOfRange(_, s, _) if s == setting));
            let value = line.trim_start_matches("mz-tol ");
            assert!(labelled_text(&error, &kdl)[0].contains(value));
        }

        let kdl = with_line("calibration", "calibration on=false tolerance=501.0");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(error.kind, ConfigErrorKind::OutOfRange(_, "calibration tolerance", _)));
        assert_eq!(error.kind.to_string(), "calibration tolerance must be greater than 0 and at most 500");

        assert!(parse_config(&with_line("mz-tol", "mz-tol 100.0")).is_ok());
    }

    #[test]
    fn negative_reducing_end() {
        let kdl = with_line("reducing-end", "reducing-end -1.0");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(error.kind, ConfigErrorKind::Negative(_, "reducing-end")));
    }

    #[test]
    fn unknown_charge_carrier() {
        let kdl = with_line("charge-carrier", r#"charge-carrier "Li+""#);
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(
            error.kind,
            ConfigErrorKind::Glyco(_, GlycoError::UnknownChargeCarrier { ref symbol }) if symbol == "Li+"
        ));
        assert!(labelled_text(&error, &kdl)[0].contains("Li+"));
    }

    #[test]
    fn too_few_references() {
        let kdl = with_line(
            "calibration",
            "calibration on=true tolerance=100.0 {\n    reference 1257.4232\n}",
        );
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(error.kind, ConfigErrorKind::TooFewReferences(_, 1)));

        // References don't matter when calibration is off
        let kdl = with_line("calibration", "calibration on=false tolerance=100.0");
        assert!(parse_config(&kdl).unwrap().calibrator.is_none());
    }

    #[test]
    fn unknown_monosaccharides() {
        let kdl = format!("{MINIMAL}\nmodifications {{\n    Fuc 0.0\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(
            error.kind,
            ConfigErrorKind::Glyco(_, GlycoError::UnknownMonosaccharide { ref abbr }) if abbr == "Fuc"
        ));
        assert!(labelled_text(&error, &kdl)[0].contains("Fuc"));

        let kdl = format!("{MINIMAL}\nconstraints {{\n    hex 1 2\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(
            error.kind,
            ConfigErrorKind::Glyco(_, GlycoError::UnknownMonosaccharide { ref abbr }) if abbr == "hex"
        ));

        let kdl = format!("{MINIMAL}\nglobal-modifications {{\n    Me 1\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(
            error.kind,
            ConfigErrorKind::Glyco(_, GlycoError::UnknownGlobalModification { ref abbr }) if abbr == "Me"
        ));
    }

    #[test]
    fn duplicate_entries() {
        let kdl = format!("{MINIMAL}\nmodifications {{\n    NeuAc 0.0\n    Hex 0.0\n    NeuAc 13.0316\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(error.kind, ConfigErrorKind::Duplicate(_, _, ref name) if name == "NeuAc"));
        let labelled = labelled_text(&error, &kdl);
        assert_eq!(labelled.len(), 2);
        assert!(labelled[0].contains("NeuAc 0.0"));
        assert!(labelled[1].contains("NeuAc 13.0316"));

        let kdl = format!("{MINIMAL}\nglobal-modifications {{\n    Ac 1\n    Ac 2\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(error.kind, ConfigErrorKind::Duplicate(_, _, ref name) if name == "Ac"));

        let kdl = format!("{MINIMAL}\nconstraints {{\n    dHex 0 1\n    dHex 0 2\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(error.kind, ConfigErrorKind::Duplicate(_, _, ref name) if name == "dHex"));
    }

    #[test]
    fn inverted_constraint() {
        let kdl = format!("{MINIMAL}\nconstraints {{\n    Hex 3 9\n    HexNAc 7 2\n}}");
        let error = parse_config(&kdl).unwrap_err();
        assert!(matches!(
            error.kind,
            ConfigErrorKind::Glyco(
                _,
                GlycoError::InvalidConstraint {
                    monosaccharide: Monosaccharide::HexNAc,
                    min: 7,
                    max: 2
                }
            )
        ));
        assert!(labelled_text(&error, &kdl)[0].contains("HexNAc 7 2"));
    }

    #[test]
    fn errors_render_as_diagnostics() {
        let report = Config::from_kdl("bad.kdl", with_line("mz-tol", "mz-tol 0.0")).unwrap_err();
        let error = report.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(error.to_string(), "failed to validate configuration file");
        assert_eq!(error.kind.to_string(), "mz-tol must be greater than 0 and at most 100");
        assert!(error.source_code().is_some());
        assert!(error.diagnostic_source().unwrap().help().is_some());
    }
}
