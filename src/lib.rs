//! # massplane
//!
//! Coordinate systems of simplified-model result plots and the ingestion of their data.
//!
//! * [`mass_plane`]: mass planes (`[[x, y], [x, y]]`) mapping plot coordinates to particle
//!   masses and back, with the data sources read in that coordinate system.
//! * [`axes`]: the per-branch solver behind a mass plane.
//! * [`data_handler`]: source readers (ROOT objects, CSV, text grids, embaked dicts, SVG, …),
//!   unit handling and the bounded-grid trimming policy.
//! * [`covariance`]: covariance matrices of signal regions, their aggregation and checks.
//!
//! ```rust
//! use massplane::{coordinates::Coordinates, mass_plane::MassPlane};
//!
//! let plane = MassPlane::from_string("T2tt", "[[x, y], [x, y]]").unwrap();
//! let masses = plane.get_particle_masses(&Coordinates::xy(500.0, 100.0));
//! let back = plane.get_xy_values(&masses, None).unwrap();
//! assert_eq!(back, Some(Coordinates::xy(500.0, 100.0)));
//! ```
pub mod axes;
pub mod constants;
pub mod coordinates;
pub mod covariance;
pub mod data_handler;
pub mod expression;
pub mod literal;
pub mod mass_plane;
pub mod massplane_errors;

pub use coordinates::{AxisVariable, Coordinates};
pub use mass_plane::{AnyMassPlane, GraphMassPlane, MassPlane};
pub use massplane_errors::MassPlaneError;
