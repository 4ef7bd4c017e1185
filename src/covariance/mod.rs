//! # Covariance handling
//!
//! Builds the background covariance matrix of a set of signal regions and reduces it to the
//! regions actually used.
//!
//! ## Pipeline of [`CovarianceHandler::new`]
//! -----------------
//! 1. Read the matrix: a 2-D ROOT histogram (through the context's ROOT readers), a CSV file
//!    or a literal matrix.
//! 2. Keep the first `max_datasets` regions.
//! 3. Scale every entry by `scale_cov`.
//! 4. Aggregate groups of regions by block sums ([`aggregate_me`]).
//! 5. Floor the diagonal at `min_variance`.
//! 6. Check the result ([`check_covariance_matrix`]): symmetric, invertible, with a finite
//!    multivariate-normal log-density.
//!
//! Reported background errors can later replace too small variances, see
//! [`CovarianceHandler::override_with_conservative_errors`].
pub mod aggregators;

use std::f64::consts::PI;

use camino::Utf8PathBuf;
use nalgebra::DMatrix;

use crate::{
    constants::{
        Aggregation, CovarianceMatrix, CONSERVATIVE_ERROR_RATIO, DEFAULT_AGGPREFIX, MIN_VARIANCE,
    },
    data_handler::{formats::read_csv_rows, IngestionContext, RootObject},
    massplane_errors::MassPlaneError,
};

/// Where the covariance matrix comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CovarianceSource {
    /// 2-D histogram `histogram` in the ROOT file `path`.
    Root {
        path: Utf8PathBuf,
        histogram: String,
    },
    /// Square numeric CSV matrix.
    Csv { path: Utf8PathBuf },
    Matrix(CovarianceMatrix),
}

/// Options of [`CovarianceHandler::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceOptions {
    /// Number of leading regions kept; all when `None`.
    pub max_datasets: Option<usize>,
    /// Groups of region indices to aggregate.
    pub aggregate: Option<Aggregation>,
    /// Prefix of aggregated region names.
    pub aggprefix: String,
    /// Indices in `aggregate` start at 0 instead of 1.
    pub zero_indexed: bool,
    pub scale_cov: f64,
    /// Region names; `SR1, SR2, …` when `None`.
    pub dataset_names: Option<Vec<String>>,
    pub min_variance: f64,
}

impl Default for CovarianceOptions {
    fn default() -> Self {
        CovarianceOptions {
            max_datasets: None,
            aggregate: None,
            aggprefix: DEFAULT_AGGPREFIX.to_string(),
            zero_indexed: false,
            scale_cov: 1.0,
            dataset_names: None,
            min_variance: MIN_VARIANCE,
        }
    }
}

impl CovarianceOptions {
    pub fn builder() -> CovarianceOptionsBuilder {
        CovarianceOptionsBuilder::default()
    }
}

/// Builder for [`CovarianceOptions`], with validation.
#[derive(Debug, Clone, Default)]
pub struct CovarianceOptionsBuilder {
    options: CovarianceOptions,
}

impl CovarianceOptionsBuilder {
    pub fn max_datasets(mut self, n: usize) -> Self {
        self.options.max_datasets = Some(n);
        self
    }
    pub fn aggregate(mut self, groups: Aggregation) -> Self {
        self.options.aggregate = Some(groups);
        self
    }
    pub fn aggprefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.aggprefix = prefix.into();
        self
    }
    pub fn zero_indexed(mut self, v: bool) -> Self {
        self.options.zero_indexed = v;
        self
    }
    pub fn scale_cov(mut self, v: f64) -> Self {
        self.options.scale_cov = v;
        self
    }
    pub fn dataset_names(mut self, names: Vec<String>) -> Self {
        self.options.dataset_names = Some(names);
        self
    }
    pub fn min_variance(mut self, v: f64) -> Self {
        self.options.min_variance = v;
        self
    }

    /// Finalize the builder.
    ///
    /// Validation rules
    /// -----------------
    /// * `scale_cov` finite and strictly positive.
    /// * `min_variance` finite and non-negative.
    /// * `max_datasets ≥ 1` when given.
    pub fn build(self) -> Result<CovarianceOptions, MassPlaneError> {
        let o = &self.options;
        if !(o.scale_cov.is_finite() && o.scale_cov > 0.0) {
            return Err(MassPlaneError::InvalidCovarianceParameter(
                "scale_cov must be finite and > 0".into(),
            ));
        }
        if !(o.min_variance.is_finite() && o.min_variance >= 0.0) {
            return Err(MassPlaneError::InvalidCovarianceParameter(
                "min_variance must be finite and >= 0".into(),
            ));
        }
        if o.max_datasets == Some(0) {
            return Err(MassPlaneError::InvalidCovarianceParameter(
                "max_datasets must be >= 1".into(),
            ));
        }
        Ok(self.options)
    }
}

/// Block-sum aggregation of a covariance matrix.
///
/// Entry `(g1, g2)` of the result is the sum of `cov[i][j]` for `i` in group `g1` and `j` in
/// group `g2`; the sum of all entries is therefore unchanged when every region belongs to
/// exactly one group.
///
/// Arguments
/// -----------------
/// * `covariance`: square matrix
/// * `aggregate`: groups of region indices
/// * `aggprefix`: prefix of the new region names
/// * `zero_indexed`: indices start at 0 (otherwise at 1)
///
/// Return
/// ----------
/// * The aggregated matrix and the names `<aggprefix>0, <aggprefix>1, …`.
/// * [`MassPlaneError::AggregationIndex`] for an index outside the matrix.
pub fn aggregate_me(
    covariance: &CovarianceMatrix,
    aggregate: &Aggregation,
    aggprefix: &str,
    zero_indexed: bool,
) -> Result<(CovarianceMatrix, Vec<String>), MassPlaneError> {
    let size = covariance.len();
    let groups: Vec<Vec<usize>> = aggregate
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|&index| {
                    let i = if zero_indexed {
                        Some(index)
                    } else {
                        index.checked_sub(1)
                    };
                    i.filter(|i| *i < size)
                        .ok_or(MassPlaneError::AggregationIndex { index, size })
                })
                .collect::<Result<Vec<usize>, _>>()
        })
        .collect::<Result<_, _>>()?;

    let matrix: CovarianceMatrix = groups
        .iter()
        .map(|g1| {
            groups
                .iter()
                .map(|g2| {
                    g1.iter()
                        .flat_map(|i| g2.iter().map(move |j| covariance[*i][*j]))
                        .sum::<f64>()
                })
                .collect()
        })
        .collect();
    let names: Vec<String> = (0..groups.len()).map(|k| format!("{aggprefix}{k}")).collect();
    Ok((matrix, names))
}

/// Validate a covariance matrix.
///
/// The matrix must be square, finite and symmetric, invertible, and admit a Cholesky
/// factorization giving a finite multivariate-normal log-density at the mean.
///
/// Return
/// ----------
/// * The log-density at the mean, `-(n·ln 2π + ln det C) / 2`.
/// * [`MassPlaneError::CovarianceCheck`] describing the first failed check.
pub fn check_covariance_matrix(covariance: &CovarianceMatrix) -> Result<f64, MassPlaneError> {
    let n = covariance.len();
    if n == 0 {
        return Err(MassPlaneError::CovarianceCheck("empty matrix".into()));
    }
    if let Some(row) = covariance.iter().position(|r| r.len() != n) {
        return Err(MassPlaneError::CovarianceCheck(format!(
            "row {row} has {} entries, expected {n}",
            covariance[row].len()
        )));
    }
    let m = DMatrix::from_fn(n, n, |i, j| covariance[i][j]);
    if m.iter().any(|v| !v.is_finite()) {
        return Err(MassPlaneError::CovarianceCheck("non-finite entry".into()));
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (m[(i, j)], m[(j, i)]);
            if (a - b).abs() > 1e-9 * a.abs().max(b.abs()).max(1.0) {
                return Err(MassPlaneError::CovarianceCheck(format!(
                    "not symmetric at ({i}, {j}): {a} vs {b}"
                )));
            }
        }
    }
    if m.clone().try_inverse().is_none() {
        return Err(MassPlaneError::CovarianceCheck("matrix is singular".into()));
    }
    let Some(cholesky) = m.cholesky() else {
        return Err(MassPlaneError::CovarianceCheck(
            "matrix is not positive definite".into(),
        ));
    };
    let log_det: f64 = 2.0 * cholesky.l().diagonal().iter().map(|d| d.ln()).sum::<f64>();
    let log_density = -0.5 * (n as f64 * (2.0 * PI).ln() + log_det);
    if !log_density.is_finite() {
        return Err(MassPlaneError::CovarianceCheck(format!(
            "log-density {log_density} is not finite"
        )));
    }
    Ok(log_density)
}

fn read_covariance(
    source: &CovarianceSource,
    ctx: &IngestionContext,
) -> Result<CovarianceMatrix, MassPlaneError> {
    match source {
        CovarianceSource::Matrix(m) => Ok(m.clone()),
        CovarianceSource::Csv { path } => read_csv_rows(path),
        CovarianceSource::Root { path, histogram } => {
            match ctx.read_root_object(path, histogram)? {
                RootObject::Histogram(h) if h.dimension() == 2 => {
                    let n = h.axes[0].len();
                    if h.axes[1].len() != n {
                        return Err(MassPlaneError::DimensionMismatch {
                            expected: n,
                            found: h.axes[1].len(),
                        });
                    }
                    Ok((0..n)
                        .map(|i| (0..n).map(|j| h.content(&[i, j])).collect())
                        .collect())
                }
                other => Err(MassPlaneError::UnexpectedRootObject(format!(
                    "{path}:{histogram} is a {}, expected a TH2",
                    other.kind()
                ))),
            }
        }
    }
}

/// Checked covariance matrix with the names of its regions.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceHandler {
    covariance: CovarianceMatrix,
    dataset_order: Vec<String>,
}

impl CovarianceHandler {
    /// Read, reduce and check a covariance matrix.
    ///
    /// Arguments
    /// -----------------
    /// * `source`: ROOT histogram, CSV file or literal matrix
    /// * `options`: truncation, scaling, aggregation and flooring
    /// * `ctx`: ingestion context providing the ROOT readers
    ///
    /// Return
    /// ----------
    /// * The handler, or the first read / aggregation / check error.
    pub fn new(
        source: &CovarianceSource,
        options: &CovarianceOptions,
        ctx: &IngestionContext,
    ) -> Result<Self, MassPlaneError> {
        let mut covariance = read_covariance(source, ctx)?;
        let n = covariance.len();
        if let Some(row) = covariance.iter().find(|r| r.len() < n) {
            return Err(MassPlaneError::DimensionMismatch {
                expected: n,
                found: row.len(),
            });
        }

        let keep = options.max_datasets.map_or(n, |m| m.min(n));
        covariance.truncate(keep);
        for row in covariance.iter_mut() {
            row.truncate(keep);
            for v in row.iter_mut() {
                *v *= options.scale_cov;
            }
        }

        let mut dataset_order = match &options.dataset_names {
            Some(names) if names.len() < keep => {
                return Err(MassPlaneError::InvalidCovarianceParameter(format!(
                    "{} dataset names for {keep} signal regions",
                    names.len()
                )))
            }
            Some(names) => names[..keep].to_vec(),
            None => (1..=keep).map(|i| format!("SR{i}")).collect(),
        };

        if let Some(aggregate) = &options.aggregate {
            let (aggregated, names) = aggregate_me(
                &covariance,
                aggregate,
                &options.aggprefix,
                options.zero_indexed,
            )?;
            log::info!(
                "aggregated {} signal regions into {}",
                covariance.len(),
                aggregated.len()
            );
            covariance = aggregated;
            dataset_order = names;
        }

        for (i, row) in covariance.iter_mut().enumerate() {
            if row[i] < options.min_variance {
                log::debug!(
                    "{}: variance {} raised to {}",
                    dataset_order[i],
                    row[i],
                    options.min_variance
                );
                row[i] = options.min_variance;
            }
        }

        check_covariance_matrix(&covariance)?;
        Ok(CovarianceHandler {
            covariance,
            dataset_order,
        })
    }

    pub fn covariance(&self) -> &CovarianceMatrix {
        &self.covariance
    }

    pub fn dataset_order(&self) -> &[String] {
        &self.dataset_order
    }

    pub fn len(&self) -> usize {
        self.covariance.len()
    }

    pub fn is_empty(&self) -> bool {
        self.covariance.is_empty()
    }

    /// Replace the variances that are too small compared to independently reported
    /// background errors.
    ///
    /// A variance `v` of region `i` is replaced by `bg_errors[i]²` when `bg_errors[i]² / v`
    /// exceeds 1.2. Every override is logged.
    ///
    /// Return
    /// ----------
    /// * The number of overridden entries.
    pub fn override_with_conservative_errors(
        &mut self,
        bg_errors: &[f64],
    ) -> Result<usize, MassPlaneError> {
        if bg_errors.len() != self.covariance.len() {
            return Err(MassPlaneError::DimensionMismatch {
                expected: self.covariance.len(),
                found: bg_errors.len(),
            });
        }
        let mut overridden = 0;
        for (i, error) in bg_errors.iter().enumerate() {
            let variance = error * error;
            let diagonal = self.covariance[i][i];
            if variance / diagonal > CONSERVATIVE_ERROR_RATIO {
                log::info!(
                    "{}: covariance diagonal {diagonal} is smaller than the reported background error² {variance}, using the latter",
                    self.dataset_order[i]
                );
                self.covariance[i][i] = variance;
                overridden += 1;
            }
        }
        Ok(overridden)
    }

    /// Correlation matrix `C_ij / sqrt(C_ii C_jj)`.
    pub fn correlations(&self) -> CovarianceMatrix {
        correlations(&self.covariance)
    }
}

pub(crate) fn correlations(covariance: &CovarianceMatrix) -> CovarianceMatrix {
    let sigma: Vec<f64> = (0..covariance.len())
        .map(|i| covariance[i][i].sqrt())
        .collect();
    covariance
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, c)| c / (sigma[i] * sigma[j]))
                .collect()
        })
        .collect()
}
