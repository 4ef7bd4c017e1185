//! Data sources attached to a mass plane, one per physical quantity.
use std::collections::BTreeMap;

use camino::Utf8PathBuf;

use crate::{
    coordinates::AxisVariable,
    data_handler::{
        CoordinateMap, DataHandler, DataLabel, ExclusionHandler, IngestionContext,
        MassProjection, SourceFormat, SourceSpec,
    },
    mass_plane::hull,
    massplane_errors::MassPlaneError,
};

/// A loaded (or loadable) source: a map or an exclusion line.
#[derive(Debug, Clone)]
pub enum DataSource {
    Map(DataHandler),
    Curve(ExclusionHandler),
}

impl DataSource {
    pub fn label(&self) -> DataLabel {
        match self {
            DataSource::Map(h) => h.label(),
            DataSource::Curve(h) => h.label(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DataSource::Map(h) => h.len(),
            DataSource::Curve(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Parallel source lists, as given by a dataset description: entry `i` of every list
/// describes source `i`. Optional lists default to `None` everywhere.
#[derive(Debug, Clone, Default)]
pub struct SourceLists {
    pub labels: Vec<String>,
    pub paths: Vec<Utf8PathBuf>,
    pub formats: Vec<String>,
    pub object_names: Option<Vec<Option<String>>>,
    pub indices: Option<Vec<Option<usize>>>,
    pub units: Option<Vec<Option<String>>>,
    pub coordinate_maps: Option<Vec<Option<CoordinateMap>>>,
    pub scales: Option<Vec<Option<f64>>>,
}

fn pick<T: Clone>(list: &Option<Vec<Option<T>>>, i: usize) -> Option<T> {
    list.as_ref().and_then(|l| l[i].clone())
}

impl SourceLists {
    fn check_lengths(&self) -> Result<(), MassPlaneError> {
        let n = self.labels.len();
        let lengths = [
            ("paths", Some(self.paths.len())),
            ("formats", Some(self.formats.len())),
            ("object names", self.object_names.as_ref().map(Vec::len)),
            ("indices", self.indices.as_ref().map(Vec::len)),
            ("units", self.units.as_ref().map(Vec::len)),
            ("coordinate maps", self.coordinate_maps.as_ref().map(Vec::len)),
            ("scales", self.scales.as_ref().map(Vec::len)),
        ];
        for (name, len) in lengths {
            if let Some(len) = len.filter(|len| *len != n) {
                return Err(MassPlaneError::InconsistentSources(format!(
                    "{n} labels but {len} {name}"
                )));
            }
        }
        Ok(())
    }

    fn spec(&self, i: usize) -> Result<SourceSpec, MassPlaneError> {
        let format: SourceFormat = self.formats[i].parse()?;
        let mut spec = SourceSpec::new(self.paths[i].clone(), format);
        spec.object_name = pick(&self.object_names, i);
        spec.index = pick(&self.indices, i);
        spec.unit = pick(&self.units, i);
        spec.coordinate_map = pick(&self.coordinate_maps, i);
        spec.scale = pick(&self.scales, i);
        Ok(spec)
    }
}

/// Sources of one plane, keyed by label.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    sources: BTreeMap<DataLabel, DataSource>,
}

impl SourceSet {
    /// Attach a source under `label`, replacing any previous one.
    ///
    /// Maps without a coordinate map get `{x: 0, y: 1, …, value: -1}` over the plane
    /// variables; exclusion lines get `{x: 0, y: 1}`.
    ///
    /// Arguments
    /// -----------------
    /// * `label`: one of the data labels (`upperLimits`, `obsExclusion`, …)
    /// * `spec`: where and how to read the source
    /// * `xvars`: variables of the plane
    ///
    /// Return
    /// ----------
    /// * [`MassPlaneError::UnknownDataLabel`] or [`MassPlaneError::UnknownUnit`] on bad input;
    ///   nothing is read yet.
    pub fn add_source(
        &mut self,
        label: &str,
        mut spec: SourceSpec,
        xvars: &[AxisVariable],
    ) -> Result<(), MassPlaneError> {
        let label: DataLabel = label.parse()?;
        let source = if label.is_exclusion() {
            DataSource::Curve(ExclusionHandler::new(label, spec)?)
        } else {
            if spec.coordinate_map.is_none() {
                let vars = if xvars.is_empty() {
                    &[AxisVariable::X, AxisVariable::Y][..]
                } else {
                    xvars
                };
                spec.coordinate_map = Some(CoordinateMap::default_for(vars));
            }
            DataSource::Map(DataHandler::new(label, spec)?)
        };
        if self.sources.insert(label, source).is_some() {
            log::debug!("replacing source {label}");
        }
        Ok(())
    }

    /// Attach every source of `lists`; list lengths must all match.
    pub fn set_sources(
        &mut self,
        lists: &SourceLists,
        xvars: &[AxisVariable],
    ) -> Result<(), MassPlaneError> {
        lists.check_lengths()?;
        for (i, label) in lists.labels.iter().enumerate() {
            self.add_source(label, lists.spec(i)?, xvars)?;
        }
        Ok(())
    }

    /// Load every source in label order.
    ///
    /// Return
    /// ----------
    /// * The total number of points loaded, or the first error.
    pub fn load_data(
        &mut self,
        ctx: &mut IngestionContext,
        projection: Option<&dyn MassProjection>,
    ) -> Result<usize, MassPlaneError> {
        let mut total = 0;
        for (label, source) in self.sources.iter_mut() {
            let n = match source {
                DataSource::Map(handler) => handler.load_data(ctx, projection)?,
                DataSource::Curve(handler) => handler.load_data(ctx)?,
            };
            log::info!("{label}: loaded {n} points");
            total += n;
        }
        Ok(total)
    }

    pub fn get(&self, label: DataLabel) -> Option<&DataSource> {
        self.sources.get(&label)
    }

    pub fn map(&self, label: DataLabel) -> Option<&DataHandler> {
        match self.sources.get(&label)? {
            DataSource::Map(handler) => Some(handler),
            DataSource::Curve(_) => None,
        }
    }

    pub fn curve(&self, label: DataLabel) -> Option<&ExclusionHandler> {
        match self.sources.get(&label)? {
            DataSource::Curve(handler) => Some(handler),
            DataSource::Map(_) => None,
        }
    }

    pub fn labels(&self) -> impl Iterator<Item = DataLabel> + '_ {
        self.sources.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Drop every loaded map point whose `(x, y)` lies inside or on the convex hull of
    /// `polygon`. Exclusion lines are left untouched.
    ///
    /// Return
    /// ----------
    /// * The number of removed points; 0 when the polygon has no area.
    pub fn remove_area(&mut self, polygon: &[(f64, f64)]) -> usize {
        let hull = hull::convex_hull(polygon);
        if hull.len() < 3 {
            log::warn!("cannot remove area: polygon {polygon:?} has no area");
            return 0;
        }
        let mut removed = 0;
        for source in self.sources.values_mut() {
            let DataSource::Map(handler) = source else {
                continue;
            };
            let n = handler.retain(|p| {
                match (
                    p.coordinates.get(AxisVariable::X),
                    p.coordinates.get(AxisVariable::Y),
                ) {
                    (Some(x), Some(y)) => !hull::contains(&hull, (x, y)),
                    _ => true,
                }
            });
            if n > 0 {
                log::info!("{}: removed {n} points inside {hull:?}", handler.label());
            }
            removed += n;
        }
        removed
    }
}
