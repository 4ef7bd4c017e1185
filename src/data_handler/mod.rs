//! # Data handlers
//!
//! A data handler turns one external source (ROOT object, CSV, text grid, embaked dict,
//! SVG path, …) into the ordered points of one physical quantity of a mass plane:
//!
//! * [`DataHandler`]: maps (efficiencies, upper limits, acceptances): `(coordinates, value)`
//!   points.
//! * [`ExclusionHandler`]: exclusion curves: `(x, y)` points of a line.
//!
//! ## Ingestion pipeline
//! -----------------
//! 1. The [`SourceFormat`] reader produces raw rows; oversized grids are trimmed
//!    ([`trimming`]).
//! 2. Coordinate rows are addressed through the source's [`CoordinateMap`]; mass-keyed rows
//!    are projected onto the plane by a [`MassProjection`]. Rows that cannot be resolved are
//!    dropped with a single "could not retrieve data" warning per source.
//! 3. Units are applied ([`Unit`]), then the positivity policy: negative values are dropped,
//!    and zeros too for cross sections.
//! 4. Optionally, upper limits are extended to a massless LSP.
//!
//! Handlers are filled only by `load_data`; afterwards their points are read-only, apart from
//! the area removal of [`crate::mass_plane::SourceSet::remove_area`].
pub mod context;
pub mod formats;
pub mod root_files;
pub mod trimming;
pub mod units;

use std::{collections::BTreeMap, fmt, str::FromStr};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::{
    axes::BranchMasses,
    coordinates::{AxisVariable, Coordinates},
    literal::Literal,
    massplane_errors::MassPlaneError,
};

pub use context::{
    Histogram, IngestionContext, IngestionParams, IngestionParamsBuilder, PdfDigitizer,
    RootObject, RootReader, Tree,
};
pub use formats::{
    AxisCalibration, DirectData, MassKeyedRow, RawRows, SourceFormat, SourceReader,
    SvgCalibration,
};
pub use root_files::OxyrootReader;
pub use units::Unit;

/// Physical quantity a source provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataLabel {
    EfficiencyMap,
    UpperLimits,
    ExpectedUpperLimits,
    AcceptanceMap,
    ObsExclusion,
    ObsExclusionP1,
    ObsExclusionM1,
    ExpExclusion,
    ExpExclusionP1,
    ExpExclusionM1,
}

impl DataLabel {
    pub const ALL: [DataLabel; 10] = [
        DataLabel::EfficiencyMap,
        DataLabel::UpperLimits,
        DataLabel::ExpectedUpperLimits,
        DataLabel::AcceptanceMap,
        DataLabel::ObsExclusion,
        DataLabel::ObsExclusionP1,
        DataLabel::ObsExclusionM1,
        DataLabel::ExpExclusion,
        DataLabel::ExpExclusionP1,
        DataLabel::ExpExclusionM1,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataLabel::EfficiencyMap => "efficiencyMap",
            DataLabel::UpperLimits => "upperLimits",
            DataLabel::ExpectedUpperLimits => "expectedUpperLimits",
            DataLabel::AcceptanceMap => "acceptanceMap",
            DataLabel::ObsExclusion => "obsExclusion",
            DataLabel::ObsExclusionP1 => "obsExclusionP1",
            DataLabel::ObsExclusionM1 => "obsExclusionM1",
            DataLabel::ExpExclusion => "expExclusion",
            DataLabel::ExpExclusionP1 => "expExclusionP1",
            DataLabel::ExpExclusionM1 => "expExclusionM1",
        }
    }

    /// Exclusion curves are handled by an [`ExclusionHandler`].
    pub fn is_exclusion(&self) -> bool {
        matches!(
            self,
            DataLabel::ObsExclusion
                | DataLabel::ObsExclusionP1
                | DataLabel::ObsExclusionM1
                | DataLabel::ExpExclusion
                | DataLabel::ExpExclusionP1
                | DataLabel::ExpExclusionM1
        )
    }

    pub fn is_upper_limit(&self) -> bool {
        matches!(self, DataLabel::UpperLimits | DataLabel::ExpectedUpperLimits)
    }
}

impl fmt::Display for DataLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataLabel {
    type Err = MassPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataLabel::ALL
            .into_iter()
            .find(|l| l.name() == s.trim())
            .ok_or_else(|| MassPlaneError::UnknownDataLabel(s.to_string()))
    }
}

/// Column of each axis variable in a raw row, and of the value.
///
/// Negative value columns count from the end (`-1` is the last column). Exclusion curves have
/// no value column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateMap {
    pub axes: BTreeMap<AxisVariable, usize>,
    pub value: Option<isize>,
}

fn column(row: &[f64], index: isize) -> Option<f64> {
    let i = if index < 0 {
        row.len().checked_sub(index.unsigned_abs())?
    } else {
        index as usize
    };
    row.get(i).copied()
}

impl CoordinateMap {
    /// `{x: 0, y: 1, …, value: -1}` for the given variables.
    pub fn default_for(vars: &[AxisVariable]) -> Self {
        CoordinateMap {
            axes: vars.iter().enumerate().map(|(i, v)| (*v, i)).collect(),
            value: Some(-1),
        }
    }

    /// `{x: 0, y: 1}`, the layout of an exclusion line.
    pub fn curve() -> Self {
        CoordinateMap {
            axes: [(AxisVariable::X, 0), (AxisVariable::Y, 1)].into_iter().collect(),
            value: None,
        }
    }

    /// Parse a dict literal such as `{x: 0, y: 1, 'value': 2}` (`value: None` for curves).
    pub fn from_literal(text: &str) -> Result<Self, MassPlaneError> {
        let invalid = || MassPlaneError::InvalidCoordinateMap(text.to_string());
        let lit = Literal::parse(text).map_err(|_| invalid())?;
        let mut map = CoordinateMap {
            axes: BTreeMap::new(),
            value: None,
        };
        for (key, column) in lit.as_dict().ok_or_else(invalid)? {
            let name = key.as_str().ok_or_else(invalid)?;
            if name == "value" {
                map.value = match column {
                    Literal::None => None,
                    other => Some(other.as_f64().ok_or_else(invalid)? as isize),
                };
                continue;
            }
            let var = name.parse::<AxisVariable>().map_err(|_| invalid())?;
            let index = column.as_f64().filter(|c| *c >= 0.0).ok_or_else(invalid)?;
            map.axes.insert(var, index as usize);
        }
        Ok(map)
    }

    /// Last axis variable, carrying the LSP mass.
    pub fn last_variable(&self) -> Option<AxisVariable> {
        self.axes.keys().next_back().copied()
    }

    pub fn coordinates(&self, row: &[f64]) -> Option<Coordinates> {
        self.axes
            .iter()
            .map(|(var, i)| Some((*var, *row.get(*i)?)))
            .collect()
    }

    pub fn value(&self, row: &[f64]) -> Option<f64> {
        column(row, self.value?)
    }
}

impl fmt::Display for CoordinateMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (var, i) in &self.axes {
            write!(f, "{var}: {i}, ")?;
        }
        match self.value {
            Some(v) => write!(f, "value: {v}}}"),
            None => write!(f, "value: None}}"),
        }
    }
}

/// Where and how to read one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub path: Option<Utf8PathBuf>,
    pub format: SourceFormat,
    pub object_name: Option<String>,
    pub index: Option<usize>,
    pub unit: Option<String>,
    pub coordinate_map: Option<CoordinateMap>,
    pub scale: Option<f64>,
    pub direct: Option<DirectData>,
    pub svg_calibration: Option<SvgCalibration>,
    /// Exclusion curves: sort the points by x.
    pub sort: bool,
    /// Exclusion curves: reverse the point order.
    pub reverse: bool,
    /// Upper limits: duplicate the lightest-LSP rows at a massless LSP.
    pub extend_to_massless_lsp: bool,
}

impl SourceSpec {
    pub fn new(path: impl Into<Utf8PathBuf>, format: SourceFormat) -> Self {
        SourceSpec {
            path: Some(path.into()),
            ..Self::bare(format)
        }
    }

    /// Source whose data is given inline.
    pub fn direct(data: DirectData) -> Self {
        SourceSpec {
            direct: Some(data),
            ..Self::bare(SourceFormat::Direct)
        }
    }

    fn bare(format: SourceFormat) -> Self {
        SourceSpec {
            path: None,
            format,
            object_name: None,
            index: None,
            unit: None,
            coordinate_map: None,
            scale: None,
            direct: None,
            svg_calibration: None,
            sort: false,
            reverse: false,
            extend_to_massless_lsp: false,
        }
    }

    pub fn with_object(mut self, name: impl Into<String>) -> Self {
        self.object_name = Some(name.into());
        self
    }
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
    pub fn with_coordinate_map(mut self, map: CoordinateMap) -> Self {
        self.coordinate_map = Some(map);
        self
    }
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }
    pub fn with_svg_calibration(mut self, calibration: SvgCalibration) -> Self {
        self.svg_calibration = Some(calibration);
        self
    }
    pub fn sorted(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }
    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = reverse;
        self
    }
    pub fn with_massless_lsp_extension(mut self, extend: bool) -> Self {
        self.extend_to_massless_lsp = extend;
        self
    }

    pub fn path(&self) -> Result<&Utf8Path, MassPlaneError> {
        self.path
            .as_deref()
            .ok_or_else(|| MassPlaneError::MissingPath(self.format.to_string()))
    }

    pub fn object(&self) -> Result<&str, MassPlaneError> {
        self.object_name
            .as_deref()
            .ok_or_else(|| MassPlaneError::MissingObject(self.describe()))
    }

    /// `path:object` (or the format name for inline data), for log lines.
    pub fn describe(&self) -> String {
        match (&self.path, &self.object_name) {
            (Some(p), Some(o)) => format!("{p}:{o}"),
            (Some(p), None) => p.to_string(),
            (None, _) => format!("{} source", self.format),
        }
    }

    fn resolved_unit(&self) -> Result<Unit, MassPlaneError> {
        self.unit.as_deref().unwrap_or("").parse()
    }
}

/// Map from a mass array to plane coordinates, implemented by the mass planes.
pub trait MassProjection {
    fn project(&self, masses: &[BranchMasses]) -> Result<Option<Coordinates>, MassPlaneError>;
}

/// One point of a map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub coordinates: Coordinates,
    pub value: f64,
}

/// Positivity policy: negative (or non-finite) values are dropped; zeros too when the quantity
/// must be strictly positive.
pub fn positive_value(value: f64, strictly_positive: bool) -> bool {
    value.is_finite() && value >= 0.0 && !(strictly_positive && value == 0.0)
}

/// Source of a map-type quantity.
#[derive(Debug, Clone)]
pub struct DataHandler {
    label: DataLabel,
    spec: SourceSpec,
    unit: Unit,
    coordinate_map: CoordinateMap,
    points: Vec<DataPoint>,
}

impl DataHandler {
    /// Build a handler; the unit is checked here, before any file is read.
    ///
    /// A missing coordinate map defaults to `{x: 0, y: 1, value: -1}`.
    pub fn new(label: DataLabel, spec: SourceSpec) -> Result<Self, MassPlaneError> {
        let unit = spec.resolved_unit()?;
        let coordinate_map = spec
            .coordinate_map
            .clone()
            .unwrap_or_else(|| CoordinateMap::default_for(&[AxisVariable::X, AxisVariable::Y]));
        if coordinate_map.value.is_none() {
            return Err(MassPlaneError::InvalidCoordinateMap(format!(
                "{label} needs a value column"
            )));
        }
        Ok(DataHandler {
            label,
            spec,
            unit,
            coordinate_map,
            points: Vec::new(),
        })
    }

    pub fn label(&self) -> DataLabel {
        self.label
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    pub fn coordinate_map(&self) -> &CoordinateMap {
        &self.coordinate_map
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Read the source and fill the points.
    ///
    /// Arguments
    /// -----------------
    /// * `ctx`: ingestion context (limits, caches, ROOT readers)
    /// * `projection`: maps mass-keyed rows to coordinates; required by such sources only
    ///
    /// Return
    /// ----------
    /// * The number of points kept, or the first configuration/I/O error.
    pub fn load_data(
        &mut self,
        ctx: &mut IngestionContext,
        projection: Option<&dyn MassProjection>,
    ) -> Result<usize, MassPlaneError> {
        let source = self.spec.describe();
        let raw = self.spec.format.reader().read(&self.spec, ctx)?;
        let nraw = raw.len();

        let mut points = Vec::with_capacity(nraw);
        let mut unresolved = 0;
        match raw {
            RawRows::Columns(rows) => {
                for row in rows {
                    match self.point_from_row(&row) {
                        Some(point) => points.push(point),
                        None => {
                            log::debug!("{source}: could not retrieve data from row {row:?}");
                            unresolved += 1;
                        }
                    }
                }
            }
            RawRows::MassKeyed(rows) => {
                let projection = projection.ok_or(MassPlaneError::MissingProjection)?;
                for row in rows {
                    match projection.project(&row.masses)? {
                        Some(coordinates) => points.push(DataPoint {
                            coordinates,
                            value: row.value,
                        }),
                        None => {
                            log::debug!("{source}: mass point {:?} is not in the plane", row.masses);
                            unresolved += 1;
                        }
                    }
                }
            }
        }
        if unresolved > 0 {
            ctx.warn_once(format!(
                "{source}: could not retrieve data for {unresolved} of {nraw} rows"
            ));
        }

        let scale = self.spec.scale.unwrap_or(1.0);
        let strictly_positive = self.unit.is_strictly_positive();
        points.retain_mut(|p| {
            p.value = self.unit.apply(p.value) * scale;
            let keep = positive_value(p.value, strictly_positive);
            if !keep {
                log::debug!("{source}: dropping {} = {}", p.coordinates, p.value);
            }
            keep
        });

        if self.spec.extend_to_massless_lsp {
            if self.label.is_upper_limit() {
                self.extend_to_massless_lsp(&mut points, ctx);
            } else {
                ctx.warn_once(format!(
                    "{source}: massless LSP extension applies to upper limits only"
                ));
            }
        }

        self.points = points;
        Ok(self.points.len())
    }

    fn point_from_row(&self, row: &[f64]) -> Option<DataPoint> {
        let mut coordinates = self.coordinate_map.coordinates(row)?;
        let value = self.coordinate_map.value(row)?;
        if self.unit.converts_lifetime() {
            let tau = coordinates.get(AxisVariable::Y)?;
            if tau <= 0.0 {
                return None;
            }
            coordinates.insert(AxisVariable::Y, units::lifetime_to_width(tau));
        }
        Some(DataPoint { coordinates, value })
    }

    /// Duplicate the rows at the lightest LSP with the LSP made massless.
    fn extend_to_massless_lsp(&self, points: &mut Vec<DataPoint>, ctx: &mut IngestionContext) {
        let Some(lsp) = self.coordinate_map.last_variable() else {
            return;
        };
        let Some(min_lsp) = points
            .iter()
            .filter_map(|p| p.coordinates.get(lsp))
            .min_by(|a, b| a.total_cmp(b))
        else {
            return;
        };
        if min_lsp == 0.0 {
            return;
        }
        if min_lsp > ctx.params().extend_lsp_max_mass {
            ctx.warn_once(format!(
                "{}: lightest LSP is {min_lsp} GeV, not extending to a massless LSP",
                self.spec.describe()
            ));
            return;
        }
        let extension: Vec<DataPoint> = points
            .iter()
            .filter(|p| p.coordinates.get(lsp) == Some(min_lsp))
            .map(|p| {
                let mut extended = *p;
                extended.coordinates.insert(lsp, 0.0);
                extended
            })
            .collect();
        log::info!(
            "{}: extended {} points from {lsp} = {min_lsp} to {lsp} = 0",
            self.spec.describe(),
            extension.len()
        );
        points.extend(extension);
    }

    /// Keep only the points satisfying `keep`; returns the number removed.
    pub fn retain(&mut self, keep: impl FnMut(&DataPoint) -> bool) -> usize {
        let before = self.points.len();
        self.points.retain(keep);
        before - self.points.len()
    }
}

/// Source of an exclusion line.
#[derive(Debug, Clone)]
pub struct ExclusionHandler {
    label: DataLabel,
    spec: SourceSpec,
    unit: Unit,
    coordinate_map: CoordinateMap,
    points: Vec<(f64, f64)>,
}

impl ExclusionHandler {
    pub fn new(label: DataLabel, spec: SourceSpec) -> Result<Self, MassPlaneError> {
        let unit = spec.resolved_unit()?;
        let coordinate_map = spec.coordinate_map.clone().unwrap_or_else(CoordinateMap::curve);
        for var in [AxisVariable::X, AxisVariable::Y] {
            if !coordinate_map.axes.contains_key(&var) {
                return Err(MassPlaneError::InvalidCoordinateMap(format!(
                    "{label} needs an {var} column"
                )));
            }
        }
        Ok(ExclusionHandler {
            label,
            spec,
            unit,
            coordinate_map,
            points: Vec::new(),
        })
    }

    pub fn label(&self) -> DataLabel {
        self.label
    }

    pub fn spec(&self) -> &SourceSpec {
        &self.spec
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Read the curve; with a `(GeV,ns)` unit the y axis is converted to a width.
    pub fn load_data(&mut self, ctx: &mut IngestionContext) -> Result<usize, MassPlaneError> {
        let source = self.spec.describe();
        let RawRows::Columns(rows) = self.spec.format.reader().read(&self.spec, ctx)? else {
            return Err(MassPlaneError::InconsistentSources(format!(
                "{source}: an exclusion line cannot be keyed by masses"
            )));
        };

        let mut points = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(c) = self.coordinate_map.coordinates(row) else {
                ctx.warn_once(format!("{source}: could not retrieve data"));
                continue;
            };
            let (Some(x), Some(mut y)) = (c.get(AxisVariable::X), c.get(AxisVariable::Y)) else {
                continue;
            };
            if self.unit.converts_lifetime() {
                if y <= 0.0 {
                    continue;
                }
                y = units::lifetime_to_width(y);
            }
            points.push((x, y));
        }

        if self.spec.sort {
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
        }
        if self.spec.reverse {
            points.reverse();
        }
        self.points = points;
        Ok(self.points.len())
    }
}

#[cfg(test)]
mod data_handler_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_labels() {
        assert_eq!("upperLimits".parse::<DataLabel>(), Ok(DataLabel::UpperLimits));
        assert!(DataLabel::ExpExclusionM1.is_exclusion());
        assert!(!DataLabel::AcceptanceMap.is_exclusion());
        assert_eq!(
            "crossSection".parse::<DataLabel>(),
            Err(MassPlaneError::UnknownDataLabel("crossSection".into()))
        );
    }

    #[test]
    fn test_coordinate_map() {
        let map = CoordinateMap::from_literal("{x: 1, y: 0, 'value': 2}").unwrap();
        assert_eq!(
            map.coordinates(&[100.0, 500.0, 1.5]),
            Some(Coordinates::xy(500.0, 100.0))
        );
        assert_eq!(map.value(&[100.0, 500.0, 1.5]), Some(1.5));
        assert_eq!(map.value(&[100.0, 500.0]), None);

        let default = CoordinateMap::default_for(&[AxisVariable::X, AxisVariable::Y]);
        assert_eq!(default.value(&[1.0, 2.0, 3.0, 4.0]), Some(4.0));
        assert_eq!(default.last_variable(), Some(AxisVariable::Y));
        assert_eq!(default.to_string(), "{x: 0, y: 1, value: -1}");

        assert!(CoordinateMap::from_literal("{q: 1}").is_err());
        assert!(CoordinateMap::from_literal("[1, 2]").is_err());
    }

    #[test]
    fn test_positivity() {
        assert!(!positive_value(0.0, true));
        assert!(positive_value(0.0, false));
        assert!(!positive_value(-1.0, false));
        assert!(!positive_value(-1.0, true));
        assert!(positive_value(1e-9, true));
        assert!(!positive_value(f64::NAN, false));
    }

    #[test]
    fn test_unknown_unit_before_reading() {
        let spec = SourceSpec::new("does/not/exist.txt", SourceFormat::Txt).with_unit("barn");
        assert_eq!(
            DataHandler::new(DataLabel::UpperLimits, spec).err(),
            Some(MassPlaneError::UnknownUnit("barn".into()))
        );
    }

    #[test]
    fn test_direct_rows_with_units() {
        let spec = SourceSpec::direct(DirectData::Rows(vec![
            vec![500.0, 100.0, 0.0],
            vec![600.0, 100.0, -1.0],
            vec![700.0, 100.0, 1e-9],
            vec![800.0],
        ]))
        .with_unit("fb");
        let mut handler = DataHandler::new(DataLabel::UpperLimits, spec).unwrap();
        let mut ctx = IngestionContext::default();
        assert_eq!(handler.load_data(&mut ctx, None).unwrap(), 1);
        assert_eq!(handler.points()[0].coordinates, Coordinates::xy(700.0, 100.0));

        let spec = SourceSpec::direct(DirectData::Rows(vec![vec![500.0, 100.0, 12.5]]))
            .with_unit("%")
            .with_scale(2.0);
        let mut handler = DataHandler::new(DataLabel::EfficiencyMap, spec).unwrap();
        handler.load_data(&mut ctx, None).unwrap();
        assert_relative_eq!(handler.points()[0].value, 0.25);
    }

    #[test]
    fn test_mass_keyed_needs_projection() {
        let spec = SourceSpec::direct(DirectData::Literal(
            "[[[[500, 100], [500, 100]], 1.2]]".into(),
        ));
        let mut handler = DataHandler::new(DataLabel::UpperLimits, spec).unwrap();
        assert_eq!(
            handler.load_data(&mut IngestionContext::default(), None),
            Err(MassPlaneError::MissingProjection)
        );
    }

    #[test]
    fn test_extend_to_massless_lsp() {
        let rows = vec![
            vec![500.0, 10.0, 1.0],
            vec![600.0, 10.0, 2.0],
            vec![600.0, 100.0, 3.0],
        ];
        let spec = SourceSpec::direct(DirectData::Rows(rows.clone()))
            .with_unit("fb")
            .with_massless_lsp_extension(true);
        let mut handler = DataHandler::new(DataLabel::UpperLimits, spec).unwrap();
        let mut ctx = IngestionContext::default();
        assert_eq!(handler.load_data(&mut ctx, None).unwrap(), 5);
        assert_eq!(handler.points()[3].coordinates, Coordinates::xy(500.0, 0.0));
        assert_eq!(handler.points()[4].value, 2.0);

        // lightest LSP above 25 GeV: refused
        let far: Vec<_> = rows.iter().map(|r| vec![r[0], r[1] + 30.0, r[2]]).collect();
        let spec = SourceSpec::direct(DirectData::Rows(far))
            .with_unit("fb")
            .with_massless_lsp_extension(true);
        let mut handler = DataHandler::new(DataLabel::UpperLimits, spec).unwrap();
        assert_eq!(handler.load_data(&mut ctx, None).unwrap(), 3);

        // efficiency maps are never extended
        let spec = SourceSpec::direct(DirectData::Rows(rows)).with_massless_lsp_extension(true);
        let mut handler = DataHandler::new(DataLabel::EfficiencyMap, spec).unwrap();
        assert_eq!(handler.load_data(&mut ctx, None).unwrap(), 3);
    }

    #[test]
    fn test_exclusion_lifetime_and_sort() {
        let spec = SourceSpec::direct(DirectData::Rows(vec![
            vec![600.0, 2.0],
            vec![400.0, 1.0],
            vec![500.0, 0.0],
        ]))
        .with_unit("(GeV,ns)")
        .sorted(true);
        let mut curve = ExclusionHandler::new(DataLabel::ObsExclusion, spec).unwrap();
        assert_eq!(curve.load_data(&mut IngestionContext::default()).unwrap(), 2);
        assert_eq!(curve.points()[0].0, 400.0);
        assert_relative_eq!(curve.points()[0].1, 6.582119514e-16);
        assert_relative_eq!(curve.points()[1].1, 6.582119514e-16 / 2.0);
    }
}
