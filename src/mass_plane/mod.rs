//! # Mass planes
//!
//! A [`MassPlane`] composes one [`Branch`] per decay chain of a topology into the coordinate
//! system of a publication plot, and owns the data sources read in that system.
//!
//! ```text
//! [[x, y], [x, y]]      symmetric two-branch plane, also written 2*[[x, y]]
//! [[x, y], *]           second branch unconstrained
//! {0: 'x', 1: 'y'}      vertex map, see GraphMassPlane
//! ```
//!
//! ## Inverse transform
//! -----------------
//! [`MassPlane::get_xy_values`] inverts every constrained branch and merges the coordinates.
//! Any branch rejecting the point rejects it; a coordinate found by several branches must
//! agree within `|a-b|/|a+b| < 1e-4`.
//!
//! ## Sources
//! -----------------
//! Sources are attached per label (`upperLimits`, `obsExclusion`, …) with
//! [`MassPlane::add_source`] and read by [`MassPlane::load_data`]. Mass-keyed rows are
//! projected through the plane's own inverse transform.
mod descriptor;
mod graph;
mod hull;
mod sources;

use std::{collections::BTreeSet, fmt};

use crate::{
    axes::{AxisSolver, Branch, BranchMasses, WildAxes},
    constants::{GeV, CROSS_BRANCH_RELATIVE_TOLERANCE},
    coordinates::{AxisVariable, Coordinates},
    data_handler::{IngestionContext, MassProjection, SourceSpec},
    massplane_errors::MassPlaneError,
};

pub use descriptor::{BranchDescriptor, PlaneDescriptor};
pub use graph::{GraphMassPlane, GraphSolver};
pub use sources::{DataSource, SourceLists, SourceSet};

fn agree(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() / (a + b).abs() < CROSS_BRANCH_RELATIVE_TOLERANCE
}

/// Inverse transform over a branch list.
fn xy_values(
    branches: &[Branch],
    masses: &[BranchMasses],
    widths: Option<&[Vec<Option<GeV>>]>,
) -> Result<Option<Coordinates>, MassPlaneError> {
    if masses.len() != branches.len() {
        return Err(MassPlaneError::DimensionMismatch {
            expected: branches.len(),
            found: masses.len(),
        });
    }
    if let Some(widths) = widths {
        if widths.len() != branches.len() {
            return Err(MassPlaneError::DimensionMismatch {
                expected: branches.len(),
                found: widths.len(),
            });
        }
    }

    let mut merged = Coordinates::new();
    for (i, (branch, branch_masses)) in branches.iter().zip(masses).enumerate() {
        if branch.is_wild() {
            continue;
        }
        let branch_widths = widths.map(|w| w[i].as_slice());
        let Some(coordinates) = branch.get_xy_values(branch_masses, branch_widths)? else {
            log::debug!("branch {i} rejects {branch_masses}");
            return Ok(None);
        };
        for (var, value) in coordinates.iter() {
            match merged.get(var) {
                Some(previous) if !agree(previous, value) => {
                    log::debug!(
                        "branches disagree on {var}: {previous} vs {value} for {}",
                        masses.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(", ")
                    );
                    return Ok(None);
                }
                Some(_) => {}
                None => {
                    merged.insert(var, value);
                }
            }
        }
    }
    Ok(Some(merged))
}

struct PlaneProjection<'a> {
    branches: &'a [Branch],
}

impl MassProjection for PlaneProjection<'_> {
    fn project(&self, masses: &[BranchMasses]) -> Result<Option<Coordinates>, MassPlaneError> {
        xy_values(self.branches, masses, None)
    }
}

/// Coordinate system of one topology, made of independent branches.
#[derive(Debug, Clone)]
pub struct MassPlane {
    txname: String,
    branches: Vec<Branch>,
    sources: SourceSet,
}

impl MassPlane {
    /// Build a plane from parsed branches.
    ///
    /// Arguments
    /// -----------------
    /// * `txname`: topology name (`T2tt`, …)
    /// * `branches`: one descriptor per branch
    ///
    /// Return
    /// ----------
    /// * [`MassPlaneError::Underconstrained`] if a branch has more coordinates than equations.
    pub fn new(
        txname: impl Into<String>,
        branches: Vec<BranchDescriptor>,
    ) -> Result<Self, MassPlaneError> {
        let mut built = Vec::with_capacity(branches.len());
        for (i, branch) in branches.into_iter().enumerate() {
            match branch {
                BranchDescriptor::Wild => built.push(Branch::Wild(WildAxes)),
                BranchDescriptor::Vertices(vertices) => {
                    let axes = AxisSolver::from_convert(vertices);
                    if axes.is_underconstrained() {
                        return Err(MassPlaneError::Underconstrained {
                            branch: i,
                            nvars: axes.xvars().len(),
                            neqs: axes.equations().len(),
                        });
                    }
                    built.push(Branch::Axes(axes));
                }
            }
        }
        Ok(MassPlane {
            txname: txname.into(),
            branches: built,
            sources: SourceSet::default(),
        })
    }

    /// Parse a branch-list descriptor such as `2*[[x, y]]`.
    ///
    /// See also
    /// ------------
    /// * [`AnyMassPlane::from_string`] – also accepts the vertex-map form.
    pub fn from_string(txname: impl Into<String>, descriptor: &str) -> Result<Self, MassPlaneError> {
        match PlaneDescriptor::parse(descriptor)? {
            PlaneDescriptor::Branches(branches) => Self::new(txname, branches),
            PlaneDescriptor::Graph(_) => Err(MassPlaneError::DescriptorParse(format!(
                "{descriptor} is a vertex map, use a graph mass plane"
            ))),
        }
    }

    pub fn txname(&self) -> &str {
        &self.txname
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Sorted coordinate variables of the plane.
    pub fn xvars(&self) -> Vec<AxisVariable> {
        let vars: BTreeSet<AxisVariable> = self
            .branches
            .iter()
            .flat_map(|b| b.xvars().iter().copied())
            .collect();
        vars.into_iter().collect()
    }

    /// Forward transform: one [`BranchMasses`] per branch.
    pub fn get_particle_masses(&self, coordinates: &Coordinates) -> Vec<BranchMasses> {
        self.branches
            .iter()
            .map(|b| b.get_particle_masses(coordinates))
            .collect()
    }

    /// Inverse transform: mass array → coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `masses`: one entry per branch (`*` for wildcard branches)
    /// * `widths`: optional per-branch widths, parallel to `masses`
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` when a branch rejects the point or two branches disagree.
    /// * [`MassPlaneError::DimensionMismatch`] when the branch counts differ.
    pub fn get_xy_values(
        &self,
        masses: &[BranchMasses],
        widths: Option<&[Vec<Option<GeV>>]>,
    ) -> Result<Option<Coordinates>, MassPlaneError> {
        xy_values(&self.branches, masses, widths)
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    /// Attach a source; see [`SourceSet::add_source`].
    pub fn add_source(&mut self, label: &str, spec: SourceSpec) -> Result<(), MassPlaneError> {
        let xvars = self.xvars();
        self.sources.add_source(label, spec, &xvars)
    }

    pub fn set_sources(&mut self, lists: &SourceLists) -> Result<(), MassPlaneError> {
        let xvars = self.xvars();
        self.sources.set_sources(lists, &xvars)
    }

    /// Read every attached source.
    pub fn load_data(&mut self, ctx: &mut IngestionContext) -> Result<usize, MassPlaneError> {
        let projection = PlaneProjection {
            branches: &self.branches,
        };
        self.sources.load_data(ctx, Some(&projection))
    }

    pub fn remove_area(&mut self, polygon: &[(f64, f64)]) -> usize {
        self.sources.remove_area(polygon)
    }
}

impl MassProjection for MassPlane {
    fn project(&self, masses: &[BranchMasses]) -> Result<Option<Coordinates>, MassPlaneError> {
        xy_values(&self.branches, masses, None)
    }
}

impl fmt::Display for MassPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let branches: Vec<String> = self.branches.iter().map(|b| b.to_string()).collect();
        if branches.len() > 1 && branches.iter().all(|b| *b == branches[0]) {
            return write!(f, "{}*[{}]", branches.len(), branches[0]);
        }
        write!(f, "[{}]", branches.join(", "))
    }
}

/// Planes compare by descriptor.
impl PartialEq for MassPlane {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

/// Either kind of mass plane, as built from a descriptor string.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyMassPlane {
    Branches(MassPlane),
    Graph(GraphMassPlane),
}

impl AnyMassPlane {
    pub fn from_string(txname: impl Into<String>, descriptor: &str) -> Result<Self, MassPlaneError> {
        Ok(match PlaneDescriptor::parse(descriptor)? {
            PlaneDescriptor::Branches(b) => AnyMassPlane::Branches(MassPlane::new(txname, b)?),
            PlaneDescriptor::Graph(g) => AnyMassPlane::Graph(GraphMassPlane::new(txname, g)?),
        })
    }

    pub fn txname(&self) -> &str {
        match self {
            AnyMassPlane::Branches(p) => p.txname(),
            AnyMassPlane::Graph(p) => p.txname(),
        }
    }

    pub fn xvars(&self) -> Vec<AxisVariable> {
        match self {
            AnyMassPlane::Branches(p) => p.xvars(),
            AnyMassPlane::Graph(p) => p.xvars(),
        }
    }

    pub fn sources(&self) -> &SourceSet {
        match self {
            AnyMassPlane::Branches(p) => p.sources(),
            AnyMassPlane::Graph(p) => p.sources(),
        }
    }

    pub fn add_source(&mut self, label: &str, spec: SourceSpec) -> Result<(), MassPlaneError> {
        match self {
            AnyMassPlane::Branches(p) => p.add_source(label, spec),
            AnyMassPlane::Graph(p) => p.add_source(label, spec),
        }
    }

    pub fn load_data(&mut self, ctx: &mut IngestionContext) -> Result<usize, MassPlaneError> {
        match self {
            AnyMassPlane::Branches(p) => p.load_data(ctx),
            AnyMassPlane::Graph(p) => p.load_data(ctx),
        }
    }

    pub fn remove_area(&mut self, polygon: &[(f64, f64)]) -> usize {
        match self {
            AnyMassPlane::Branches(p) => p.remove_area(polygon),
            AnyMassPlane::Graph(p) => p.remove_area(polygon),
        }
    }
}

impl fmt::Display for AnyMassPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnyMassPlane::Branches(p) => write!(f, "{p}"),
            AnyMassPlane::Graph(p) => write!(f, "{p}"),
        }
    }
}

#[cfg(test)]
mod mass_plane_test {
    use super::*;

    #[test]
    fn test_agree() {
        assert!(agree(0.0, 0.0));
        assert!(agree(500.0, 500.04));
        assert!(!agree(500.0, 500.2));
        assert!(!agree(1.0, -1.0));
    }

    #[test]
    fn test_display_collapses_identical_branches() {
        let plane = MassPlane::from_string("T2", "[[x, y], [x, y]]").unwrap();
        assert_eq!(plane.to_string(), "2*[[x, y]]");
        let plane = MassPlane::from_string("T2", "[[x, y], *]").unwrap();
        assert_eq!(plane.to_string(), "[[x, y], *]");
        let plane = MassPlane::from_string("T1", "[[x, y]]").unwrap();
        assert_eq!(plane.to_string(), "[[x, y]]");
    }

    #[test]
    fn test_underconstrained_plane() {
        assert_eq!(
            MassPlane::from_string("T", "[[x + y], [x]]"),
            Err(MassPlaneError::Underconstrained {
                branch: 0,
                nvars: 2,
                neqs: 1
            })
        );
        assert!(matches!(
            MassPlane::from_string("T", "{0: 'x'}"),
            Err(MassPlaneError::DescriptorParse(_))
        ));
    }

    #[test]
    fn test_any_plane_dispatch() {
        assert!(matches!(
            AnyMassPlane::from_string("T", "{0: 'x', 1: 'y'}"),
            Ok(AnyMassPlane::Graph(_))
        ));
        let any = AnyMassPlane::from_string("T", "2*[[x, y]]").unwrap();
        assert_eq!(any.xvars(), vec![AxisVariable::X, AxisVariable::Y]);
        assert_eq!(any.txname(), "T");
    }
}
