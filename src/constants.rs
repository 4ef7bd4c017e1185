//! # Constants and type definitions for massplane
//!
//! This module centralizes the **physical constants**, **numerical tolerances**, and **common type
//! definitions** used throughout the `massplane` library.
//!
//! ## Overview
//!
//! - Physical constants (reduced Planck constant in GeV·ns)
//! - Tolerances of the coordinate ↔ mass transformation
//! - Default ingestion limits (bin cap, trimming target)
//! - Core type aliases used across the crate
//!
//! These definitions are used by all main modules: axes, mass planes, data handlers and
//! covariance handling.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// Reduced Planck constant in GeV·ns, used for width ↔ lifetime conversions (Γ = ħ / τ)
pub const HBAR_GEV_NS: f64 = 6.582119514e-16;

/// Percent → fraction
pub const PERCENT: f64 = 100.0;

// -------------------------------------------------------------------------------------------------
// Transformation tolerances
// -------------------------------------------------------------------------------------------------

/// Maximal Euclidean distance (GeV) between an input mass array and the mass array recomputed
/// from the derived coordinates. Points beyond this distance are rejected.
pub const XY_ROUND_TRIP_TOLERANCE: f64 = 0.11;

/// Maximal relative difference `|a-b|/|a+b|` between two branches determining the same coordinate
pub const CROSS_BRANCH_RELATIVE_TOLERANCE: f64 = 1e-4;

/// Significant figures kept in the numeric literals of mass equations
pub const MASS_SIGNIFICANT_DIGITS: u32 = 5;

/// Significant figures kept in the numeric literals of width equations
pub const WIDTH_SIGNIFICANT_DIGITS: u32 = 2;

/// Pivot threshold below which a linear system is considered singular
pub const SINGULAR_EPS: f64 = 1e-12;

// -------------------------------------------------------------------------------------------------
// Ingestion defaults
// -------------------------------------------------------------------------------------------------

/// Largest number of rows/bins ingested without trimming
pub const MAX_NBINS: usize = 12_000;

/// Target grid size used in the trim factor `ceil(sqrt(n / TRIM_TARGET))²`
pub const TRIM_TARGET: usize = 6_000;

/// A z axis with more bins than this is trimmed first
pub const Z_AXIS_TRIM_THRESHOLD: usize = 50;

/// Extending upper limits to a massless LSP is refused above this minimal LSP mass (GeV)
pub const EXTEND_LSP_MAX_MASS: f64 = 25.0;

/// An efficiency is set to zero when it is below this many statistical errors (`effi` format)
pub const EFFI_ZERO_SIGMAS: f64 = 4.0;

// -------------------------------------------------------------------------------------------------
// Covariance defaults
// -------------------------------------------------------------------------------------------------

/// Floor applied to the covariance diagonal
pub const MIN_VARIANCE: f64 = 1e-4;

/// A reported background error² larger than the covariance diagonal by this ratio replaces it
pub const CONSERVATIVE_ERROR_RATIO: f64 = 1.2;

/// Prefix of aggregated signal-region names
pub const DEFAULT_AGGPREFIX: &str = "ar";

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Mass or width in GeV
pub type GeV = f64;

/// Lifetime in nanoseconds
pub type Nanosecond = f64;

/// One raw row as delivered by a source reader (coordinates first, values after)
pub type RawRow = Vec<f64>;

/// A square covariance matrix indexed by signal-region position
pub type CovarianceMatrix = Vec<Vec<f64>>;

/// Groups of signal-region indices to be aggregated together
pub type Aggregation = Vec<Vec<usize>>;
