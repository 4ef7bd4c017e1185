//! # Source formats
//!
//! Every supported source format is a variant of the closed [`SourceFormat`] enum, parsed from
//! its historical name (`txt`, `csv`, `mcsv`, `embaked`, `effi`, `root`, `cMacro`, `canvas`,
//! `pdf`, `svg`, `direct`). Each variant is served by a [`SourceReader`] that turns a
//! [`SourceSpec`] into [`RawRows`]:
//!
//! * [`RawRows::Columns`]: numeric rows addressed by the source's coordinate map,
//! * [`RawRows::MassKeyed`]: rows keyed by a mass array, projected onto the plane by the
//!   handler.
//!
//! Readers of large grids (`txt`, `csv`, histograms) apply the trimming policy of
//! [`crate::data_handler::trimming`].
mod cmacro;
mod csv_reader;
mod direct;
mod embaked;
mod pdf;
mod root;
mod svg;
mod text;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    axes::{BranchMasses, MassEntry},
    constants::RawRow,
    data_handler::{context::IngestionContext, SourceSpec},
    literal::Literal,
    massplane_errors::MassPlaneError,
};

pub(crate) use csv_reader::read_csv_rows;
pub use direct::DirectData;
pub use svg::{AxisCalibration, SvgCalibration};

/// One row keyed by masses (one entry per branch) instead of coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct MassKeyedRow {
    pub masses: Vec<BranchMasses>,
    pub value: f64,
}

/// Output of a [`SourceReader`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawRows {
    Columns(Vec<RawRow>),
    MassKeyed(Vec<MassKeyedRow>),
}

impl RawRows {
    pub fn len(&self) -> usize {
        match self {
            RawRows::Columns(rows) => rows.len(),
            RawRows::MassKeyed(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait SourceReader: Sync {
    /// Read the rows described by `spec`.
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceFormat {
    Txt,
    Csv,
    MultiCsv,
    Embaked,
    Effi,
    Root,
    CMacro,
    Canvas,
    Pdf,
    Svg,
    Direct,
}

impl SourceFormat {
    pub const ALL: [SourceFormat; 11] = [
        SourceFormat::Txt,
        SourceFormat::Csv,
        SourceFormat::MultiCsv,
        SourceFormat::Embaked,
        SourceFormat::Effi,
        SourceFormat::Root,
        SourceFormat::CMacro,
        SourceFormat::Canvas,
        SourceFormat::Pdf,
        SourceFormat::Svg,
        SourceFormat::Direct,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Txt => "txt",
            SourceFormat::Csv => "csv",
            SourceFormat::MultiCsv => "mcsv",
            SourceFormat::Embaked => "embaked",
            SourceFormat::Effi => "effi",
            SourceFormat::Root => "root",
            SourceFormat::CMacro => "cMacro",
            SourceFormat::Canvas => "canvas",
            SourceFormat::Pdf => "pdf",
            SourceFormat::Svg => "svg",
            SourceFormat::Direct => "direct",
        }
    }

    /// Reader serving this format.
    pub fn reader(&self) -> &'static dyn SourceReader {
        match self {
            SourceFormat::Txt => &text::TxtReader,
            SourceFormat::Effi => &text::EffiReader,
            SourceFormat::Csv => &csv_reader::CsvReader,
            SourceFormat::MultiCsv => &csv_reader::MultiCsvReader,
            SourceFormat::Embaked => &embaked::EmbakedReader,
            SourceFormat::Root => &root::RootFileReader,
            SourceFormat::Canvas => &root::CanvasReader,
            SourceFormat::CMacro => &cmacro::CMacroReader,
            SourceFormat::Pdf => &pdf::PdfReader,
            SourceFormat::Svg => &svg::SvgReader,
            SourceFormat::Direct => &direct::DirectReader,
        }
    }

    /// `true` for formats that read a file.
    pub fn needs_path(&self) -> bool {
        !matches!(self, SourceFormat::Direct)
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SourceFormat {
    type Err = MassPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceFormat::ALL
            .into_iter()
            .find(|f| f.name() == s.trim())
            .ok_or_else(|| MassPlaneError::UnknownFormat(s.to_string()))
    }
}

/// Signal-region name with its suffix removed: `SR1_MET100` → `SR1`.
///
/// Return
/// ----------
/// * `None` for keys that do not name a signal region.
pub(crate) fn normalize_region(key: &str) -> Option<&str> {
    if !key.starts_with("SR") {
        return None;
    }
    Some(key.split('_').next().unwrap_or(key))
}

/// Parse a signal-region selection: `SR1`, `[SR1, SR2]` or `[(SR1, 0.5), (SR2, 0.5)]`.
///
/// Return
/// ----------
/// * `(normalized region, weight)` pairs; unit weights when none are given.
pub(crate) fn region_selection(text: &str) -> Result<Vec<(String, f64)>, MassPlaneError> {
    let invalid = || MassPlaneError::MissingObject(format!("invalid region selection {text}"));
    let entry = |lit: &Literal| -> Option<(String, f64)> {
        match lit {
            Literal::Str(name) => Some((name.clone(), 1.0)),
            Literal::Tuple(items) | Literal::List(items) if items.len() == 2 => {
                Some((items[0].as_str()?.to_string(), items[1].as_f64()?))
            }
            _ => None,
        }
    };

    let lit = Literal::parse(text)?;
    let entries: Vec<(String, f64)> = match &lit {
        Literal::Str(_) => vec![entry(&lit).ok_or_else(invalid)?],
        Literal::Tuple(items) if items.len() == 2 && items[1].as_f64().is_some() => {
            vec![entry(&lit).ok_or_else(invalid)?]
        }
        Literal::List(items) | Literal::Tuple(items) => items
            .iter()
            .map(|i| entry(i).ok_or_else(invalid))
            .collect::<Result<_, _>>()?,
        _ => return Err(invalid()),
    };
    Ok(entries
        .into_iter()
        .map(|(name, w)| {
            let normalized = normalize_region(&name).unwrap_or(&name).to_string();
            (normalized, w)
        })
        .collect())
}

/// Key of an embaked or direct entry.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PointKey {
    Coordinates(Vec<f64>),
    Masses(Vec<BranchMasses>),
}

/// Classify a literal key: a flat number sequence is a coordinate tuple, a nested one is a
/// mass array (one sequence or `*` per branch, `(mass, width)` pairs allowed).
pub(crate) fn point_key(lit: &Literal) -> Option<PointKey> {
    if let Some(v) = lit.as_f64() {
        return Some(PointKey::Coordinates(vec![v]));
    }
    let items = lit.as_sequence()?;
    if !lit.is_nested() {
        return Some(PointKey::Coordinates(lit.flatten_numbers()?));
    }
    let branches = items
        .iter()
        .map(|branch| match branch {
            Literal::Str(s) if s == "*" => Some(BranchMasses::Wildcard),
            _ => branch_entries(branch).map(BranchMasses::Values),
        })
        .collect::<Option<Vec<_>>>()?;
    Some(PointKey::Masses(branches))
}

fn branch_entries(branch: &Literal) -> Option<smallvec::SmallVec<[MassEntry; 4]>> {
    branch
        .as_sequence()?
        .iter()
        .map(|entry| match entry {
            Literal::Number(m) => Some(MassEntry::Mass(*m)),
            Literal::Tuple(pair) | Literal::List(pair) if pair.len() == 2 => {
                Some(MassEntry::MassWidth(pair[0].as_f64()?, pair[1].as_f64()?))
            }
            _ => None,
        })
        .collect()
}

/// Split `(key, value)` pairs into coordinate rows or mass-keyed rows; a source must not mix
/// both kinds.
pub(crate) fn keyed_rows(
    entries: Vec<(PointKey, f64)>,
    source: &str,
) -> Result<RawRows, MassPlaneError> {
    let mass_keyed = entries
        .first()
        .is_some_and(|(key, _)| matches!(key, PointKey::Masses(_)));
    let mut columns = Vec::new();
    let mut masses = Vec::new();
    for (key, value) in entries {
        match (key, mass_keyed) {
            (PointKey::Coordinates(mut coords), false) => {
                coords.push(value);
                columns.push(coords);
            }
            (PointKey::Masses(m), true) => masses.push(MassKeyedRow { masses: m, value }),
            _ => {
                return Err(MassPlaneError::InconsistentSources(format!(
                    "{source} mixes coordinate and mass keys"
                )))
            }
        }
    }
    Ok(if mass_keyed {
        RawRows::MassKeyed(masses)
    } else {
        RawRows::Columns(columns)
    })
}

/// Parse every whitespace- or comma-separated field of `line` as a number.
pub(crate) fn numeric_fields(line: &str) -> Option<RawRow> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .map(|f| f.parse::<f64>().ok())
        .collect()
}

#[cfg(test)]
mod formats_test {
    use super::*;

    #[test]
    fn test_format_names() {
        for format in SourceFormat::ALL {
            assert_eq!(format.name().parse::<SourceFormat>(), Ok(format));
        }
        assert_eq!(
            "xls".parse::<SourceFormat>(),
            Err(MassPlaneError::UnknownFormat("xls".into()))
        );
    }

    #[test]
    fn test_region_selection() {
        assert_eq!(region_selection("SR1").unwrap(), vec![("SR1".into(), 1.0)]);
        assert_eq!(
            region_selection("['SR1_MET100', 'SR2']").unwrap(),
            vec![("SR1".into(), 1.0), ("SR2".into(), 1.0)]
        );
        assert_eq!(
            region_selection("[('SR1', 0.5), ('SR2', 0.25)]").unwrap(),
            vec![("SR1".into(), 0.5), ("SR2".into(), 0.25)]
        );
        assert_eq!(
            region_selection("('SR3', 2)").unwrap(),
            vec![("SR3".into(), 2.0)]
        );
        assert!(region_selection("{1: 2}").is_err());
    }

    #[test]
    fn test_point_keys() {
        let flat = Literal::parse("(500., 100.)").unwrap();
        assert_eq!(
            point_key(&flat),
            Some(PointKey::Coordinates(vec![500.0, 100.0]))
        );

        let nested = Literal::parse("((500., (100., 1e-16)), '*')").unwrap();
        assert_eq!(
            point_key(&nested),
            Some(PointKey::Masses(vec![
                BranchMasses::entries([
                    MassEntry::Mass(500.0),
                    MassEntry::MassWidth(100.0, 1e-16)
                ]),
                BranchMasses::Wildcard
            ]))
        );
        assert_eq!(point_key(&Literal::parse("'SR1'").unwrap()), None);
    }

    #[test]
    fn test_numeric_fields() {
        assert_eq!(numeric_fields("1 2.5\t3e2"), Some(vec![1.0, 2.5, 300.0]));
        assert_eq!(numeric_fields("1, 2"), Some(vec![1.0, 2.0]));
        assert_eq!(numeric_fields("mass eff"), None);
    }
}
