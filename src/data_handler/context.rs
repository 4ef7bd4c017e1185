//! # Ingestion context
//!
//! Everything an ingestion run shares between its sources lives in an [`IngestionContext`]:
//!
//! * the ingestion limits ([`IngestionParams`]),
//! * the trim factor, computed on the first oversized grid and only ever increased,
//! * the set of already emitted warnings (each degraded-behaviour message is logged once),
//! * the parsed embaked files and the ROOT tree points, cached per file,
//! * the ROOT readers (the bundled `oxyroot` one first, tried in order) and the optional PDF
//!   digitizer.
//!
//! Nothing is process-global: concurrent ingestion uses one context per worker. Readers are
//! `Send` so a context can be moved into a worker thread.
use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    constants::{
        RawRow, EXTEND_LSP_MAX_MASS, MAX_NBINS, TRIM_TARGET, Z_AXIS_TRIM_THRESHOLD,
    },
    data_handler::root_files::OxyrootReader,
    literal::Literal,
    massplane_errors::MassPlaneError,
};

/// Binned histogram (TH1, TH2 or TH3) with its bin centres.
///
/// `contents` is laid out with the x index running fastest:
/// `contents[ix + nx * (iy + ny * iz)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub axes: Vec<Vec<f64>>,
    pub contents: Vec<f64>,
}

impl Histogram {
    pub fn new(axes: Vec<Vec<f64>>, contents: Vec<f64>) -> Result<Self, MassPlaneError> {
        let expected: usize = axes.iter().map(|a| a.len()).product();
        if axes.is_empty() || axes.len() > 3 || contents.len() != expected {
            return Err(MassPlaneError::DimensionMismatch {
                expected,
                found: contents.len(),
            });
        }
        Ok(Histogram { axes, contents })
    }

    pub fn dimension(&self) -> usize {
        self.axes.len()
    }

    pub fn nbins(&self) -> usize {
        self.contents.len()
    }

    /// Content of the bin at `index` (one entry per axis).
    pub fn content(&self, index: &[usize]) -> f64 {
        let mut flat = 0;
        let mut stride = 1;
        for (axis, i) in self.axes.iter().zip(index) {
            flat += i * stride;
            stride *= axis.len();
        }
        self.contents[flat]
    }
}

/// Named columns of a ROOT tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub branches: Vec<(String, Vec<f64>)>,
}

/// Object returned by a [`RootReader`].
#[derive(Debug, Clone, PartialEq)]
pub enum RootObject {
    Histogram(Histogram),
    /// TGraph points `[x, y]`.
    Graph(Vec<RawRow>),
    /// TGraph2D points `[x, y, z]`.
    Graph2D(Vec<RawRow>),
    Tree(Tree),
}

impl RootObject {
    pub fn kind(&self) -> &'static str {
        match self {
            RootObject::Histogram(h) => match h.dimension() {
                1 => "TH1",
                2 => "TH2",
                _ => "TH3",
            },
            RootObject::Graph(_) => "TGraph",
            RootObject::Graph2D(_) => "TGraph2D",
            RootObject::Tree(_) => "TTree",
        }
    }
}

/// Access to ROOT files. A context starts with the bundled [`OxyrootReader`]; further
/// implementations are registered after it and tried in registration order.
///
/// [`OxyrootReader`]: crate::data_handler::root_files::OxyrootReader
pub trait RootReader: Send {
    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Read the object `name` from the file at `path`.
    fn read_object(&self, path: &Utf8Path, name: &str) -> Result<RootObject, MassPlaneError>;

    /// List the primitives drawn on the canvas `name`, in drawing order.
    fn canvas_objects(
        &self,
        path: &Utf8Path,
        name: &str,
    ) -> Result<Vec<RootObject>, MassPlaneError>;
}

/// Digitizer turning a plot in a PDF file into data points.
pub trait PdfDigitizer: Send {
    fn digitize(&self, path: &Utf8Path, object: Option<&str>) -> Result<Vec<RawRow>, MassPlaneError>;
}

/// Limits applied while ingesting sources.
///
/// Defaults
/// -----------------
/// * `max_nbins`: 12000
/// * `trim_target`: 6000
/// * `allow_trimming`: true
/// * `z_axis_trim_threshold`: 50
/// * `extend_lsp_max_mass`: 25 GeV
#[derive(Debug, Clone, PartialEq)]
pub struct IngestionParams {
    /// Largest number of rows or bins kept without trimming.
    pub max_nbins: usize,
    /// Divisor of the trim factor `ceil(sqrt(n / trim_target))²`.
    pub trim_target: usize,
    /// When `false`, oversized grids are kept whole (warned once).
    pub allow_trimming: bool,
    /// A histogram z axis longer than this is trimmed first.
    pub z_axis_trim_threshold: usize,
    /// Minimal LSP mass (GeV) above which the massless-LSP extension is refused.
    pub extend_lsp_max_mass: f64,
}

impl IngestionParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`IngestionParamsBuilder`].
    ///
    /// ```rust
    /// use massplane::data_handler::IngestionParams;
    ///
    /// let params = IngestionParams::builder()
    ///     .max_nbins(20_000)
    ///     .allow_trimming(false)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(params.trim_target, 6_000);
    /// ```
    pub fn builder() -> IngestionParamsBuilder {
        IngestionParamsBuilder::new()
    }
}

impl Default for IngestionParams {
    fn default() -> Self {
        IngestionParams {
            max_nbins: MAX_NBINS,
            trim_target: TRIM_TARGET,
            allow_trimming: true,
            z_axis_trim_threshold: Z_AXIS_TRIM_THRESHOLD,
            extend_lsp_max_mass: EXTEND_LSP_MAX_MASS,
        }
    }
}

/// Builder for [`IngestionParams`], with validation.
#[derive(Debug, Clone, Default)]
pub struct IngestionParamsBuilder {
    params: IngestionParams,
}

impl IngestionParamsBuilder {
    pub fn new() -> Self {
        Self {
            params: IngestionParams::default(),
        }
    }

    pub fn max_nbins(mut self, v: usize) -> Self {
        self.params.max_nbins = v;
        self
    }
    pub fn trim_target(mut self, v: usize) -> Self {
        self.params.trim_target = v;
        self
    }
    pub fn allow_trimming(mut self, v: bool) -> Self {
        self.params.allow_trimming = v;
        self
    }
    pub fn z_axis_trim_threshold(mut self, v: usize) -> Self {
        self.params.z_axis_trim_threshold = v;
        self
    }
    pub fn extend_lsp_max_mass(mut self, v: f64) -> Self {
        self.params.extend_lsp_max_mass = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `max_nbins ≥ 1`, `trim_target ≥ 1`.
    /// * `extend_lsp_max_mass` finite and non-negative.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(IngestionParams)`, or `Err(MassPlaneError::InvalidIngestionParameter)`.
    pub fn build(self) -> Result<IngestionParams, MassPlaneError> {
        let p = &self.params;
        if p.max_nbins == 0 {
            return Err(MassPlaneError::InvalidIngestionParameter(
                "max_nbins must be >= 1".into(),
            ));
        }
        if p.trim_target == 0 {
            return Err(MassPlaneError::InvalidIngestionParameter(
                "trim_target must be >= 1".into(),
            ));
        }
        if !(p.extend_lsp_max_mass.is_finite() && p.extend_lsp_max_mass >= 0.0) {
            return Err(MassPlaneError::InvalidIngestionParameter(
                "extend_lsp_max_mass must be finite and >= 0".into(),
            ));
        }
        Ok(self.params)
    }
}

/// Key of the tree points cache: file, tree and normalized signal-region name.
pub(crate) type TreeKey = (Utf8PathBuf, String, String);

/// State shared by all sources of one ingestion run.
pub struct IngestionContext {
    params: IngestionParams,
    trim_factor: Option<usize>,
    warned: AHashSet<String>,
    pub(crate) embaked_cache: AHashMap<Utf8PathBuf, Arc<Literal>>,
    pub(crate) tree_cache: AHashMap<TreeKey, Arc<Vec<RawRow>>>,
    root_readers: Vec<Box<dyn RootReader>>,
    pdf_digitizer: Option<Box<dyn PdfDigitizer>>,
}

impl Default for IngestionContext {
    fn default() -> Self {
        Self::new(IngestionParams::default())
    }
}

impl std::fmt::Debug for IngestionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionContext")
            .field("params", &self.params)
            .field("trim_factor", &self.trim_factor)
            .field("warned", &self.warned.len())
            .field("embaked_cache", &self.embaked_cache.len())
            .field("tree_cache", &self.tree_cache.len())
            .field("root_readers", &self.root_reader_names())
            .field("pdf_digitizer", &self.pdf_digitizer.is_some())
            .finish()
    }
}

impl IngestionContext {
    pub fn new(params: IngestionParams) -> Self {
        IngestionContext {
            params,
            trim_factor: None,
            warned: AHashSet::new(),
            embaked_cache: AHashMap::new(),
            tree_cache: AHashMap::new(),
            root_readers: vec![Box::new(OxyrootReader)],
            pdf_digitizer: None,
        }
    }

    /// Register a ROOT reader; readers are tried in registration order.
    pub fn with_root_reader(mut self, reader: impl RootReader + 'static) -> Self {
        self.root_readers.push(Box::new(reader));
        self
    }

    /// Drop every registered ROOT reader, the bundled one included.
    pub fn without_root_readers(mut self) -> Self {
        self.root_readers.clear();
        self
    }

    /// Names of the ROOT readers, in the order they are tried.
    pub fn root_reader_names(&self) -> Vec<&str> {
        self.root_readers.iter().map(|r| r.name()).collect()
    }

    pub fn with_pdf_digitizer(mut self, digitizer: impl PdfDigitizer + 'static) -> Self {
        self.pdf_digitizer = Some(Box::new(digitizer));
        self
    }

    pub fn params(&self) -> &IngestionParams {
        &self.params
    }

    /// Current trim factor, `None` until an oversized grid has been met.
    pub fn trim_factor(&self) -> Option<usize> {
        self.trim_factor
    }

    /// Trim factor for a grid of `n` rows: `ceil(sqrt(n / trim_target))²`.
    ///
    /// The first oversized grid fixes the factor; a later grid only raises it.
    pub(crate) fn trim_factor_for(&mut self, n: usize) -> usize {
        let root = (n as f64 / self.params.trim_target as f64).sqrt().ceil() as usize;
        let factor = (root * root).max(1);
        let factor = match self.trim_factor {
            Some(current) if current >= factor => current,
            _ => {
                log::warn!("grid of {n} points: trim factor set to {factor}");
                factor
            }
        };
        self.trim_factor = Some(factor);
        factor
    }

    /// Log `message` at warn level the first time only.
    ///
    /// Return
    /// ----------
    /// * `true` if the message was emitted.
    pub fn warn_once(&mut self, message: impl Into<String>) -> bool {
        let message = message.into();
        if self.warned.contains(&message) {
            return false;
        }
        log::warn!("{message}");
        self.warned.insert(message);
        true
    }

    /// Read a ROOT object through the registered readers: the first success wins, otherwise the
    /// last error is returned.
    pub fn read_root_object(
        &self,
        path: &Utf8Path,
        name: &str,
    ) -> Result<RootObject, MassPlaneError> {
        self.with_readers(|reader| reader.read_object(path, name))
    }

    pub fn read_canvas(
        &self,
        path: &Utf8Path,
        name: &str,
    ) -> Result<Vec<RootObject>, MassPlaneError> {
        self.with_readers(|reader| reader.canvas_objects(path, name))
    }

    fn with_readers<T>(
        &self,
        read: impl Fn(&dyn RootReader) -> Result<T, MassPlaneError>,
    ) -> Result<T, MassPlaneError> {
        let mut last_error = MassPlaneError::NoRootReader;
        for reader in &self.root_readers {
            match read(reader.as_ref()) {
                Ok(object) => return Ok(object),
                Err(e) => {
                    log::debug!("ROOT reader {} failed: {e}", reader.name());
                    last_error = e;
                }
            }
        }
        Err(last_error)
    }

    pub(crate) fn pdf_digitizer(&self) -> Result<&dyn PdfDigitizer, MassPlaneError> {
        self.pdf_digitizer
            .as_deref()
            .ok_or(MassPlaneError::NoPdfDigitizer)
    }
}
