//! Mass plane given as a vertex map of the topology graph.
//!
//! Some topologies do not split into independent branches. Their plane is written as a map
//! from vertex index to expression, `{0: 'x', 1: 'y', 2: ('z', 1e-10)}`, and the whole system
//! is solved at once in the least-squares sense. The system must have full column rank.
use std::{collections::BTreeMap, collections::BTreeSet, fmt};

use crate::{
    axes::{BranchMasses, Equation, LinearInverse, MassEntry, Parameter, VertexExpression},
    constants::{GeV, MASS_SIGNIFICANT_DIGITS, WIDTH_SIGNIFICANT_DIGITS, XY_ROUND_TRIP_TOLERANCE},
    coordinates::{AxisVariable, Coordinates},
    data_handler::{IngestionContext, MassProjection, SourceSpec},
    expression::AffineForm,
    mass_plane::{descriptor::PlaneDescriptor, sources::SourceSet},
    massplane_errors::MassPlaneError,
};

/// Forward and inverse maps of a vertex-map plane.
#[derive(Debug, Clone)]
pub struct GraphSolver {
    vertices: BTreeMap<usize, VertexExpression>,
    equations: Vec<Equation>,
    xvars: Vec<AxisVariable>,
    inverse_full: LinearInverse,
    inverse_masses: Option<LinearInverse>,
}

impl GraphSolver {
    /// Build the equations (rounded like branch equations) and solve the system.
    ///
    /// Return
    /// ----------
    /// * [`MassPlaneError::Underconstrained`] when the affine equations do not determine
    ///   every coordinate.
    pub fn new(vertices: BTreeMap<usize, VertexExpression>) -> Result<Self, MassPlaneError> {
        let vertices: BTreeMap<usize, VertexExpression> = vertices
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    VertexExpression::Mass(m) => {
                        VertexExpression::Mass(m.rounded(MASS_SIGNIFICANT_DIGITS))
                    }
                    VertexExpression::MassWidth(m, w) => VertexExpression::MassWidth(
                        m.rounded(MASS_SIGNIFICANT_DIGITS),
                        w.rounded(WIDTH_SIGNIFICANT_DIGITS),
                    ),
                };
                (k, v)
            })
            .collect();

        let mut equations = Vec::new();
        for (vertex, expr) in &vertices {
            match expr {
                VertexExpression::Mass(m) => {
                    equations.push(Equation::new(Parameter::Mass(*vertex), m.clone()))
                }
                VertexExpression::MassWidth(m, w) => {
                    equations.push(Equation::new(Parameter::Mass(*vertex), m.clone()));
                    equations.push(Equation::new(Parameter::Width(*vertex), w.clone()));
                }
            }
        }

        let variables = |masses_only: bool| -> Vec<AxisVariable> {
            let set: BTreeSet<AxisVariable> = equations
                .iter()
                .filter(|eq| !masses_only || matches!(eq.lhs, Parameter::Mass(_)))
                .flat_map(|eq| eq.variables())
                .collect();
            set.into_iter().collect()
        };
        let forms = |masses_only: bool| -> Vec<(usize, AffineForm)> {
            equations
                .iter()
                .enumerate()
                .filter(|(_, eq)| !masses_only || matches!(eq.lhs, Parameter::Mass(_)))
                .filter_map(|(i, eq)| eq.rhs.affine().map(|form| (i, form)))
                .collect()
        };

        let xvars = variables(false);
        let full_forms = forms(false);
        let Some(inverse_full) = LinearInverse::least_squares(&full_forms, &xvars) else {
            return Err(MassPlaneError::Underconstrained {
                branch: 0,
                nvars: xvars.len(),
                neqs: full_forms.len(),
            });
        };
        let inverse_masses = LinearInverse::least_squares(&forms(true), &variables(true));

        Ok(GraphSolver {
            vertices,
            equations,
            xvars,
            inverse_full,
            inverse_masses,
        })
    }

    pub fn vertices(&self) -> &BTreeMap<usize, VertexExpression> {
        &self.vertices
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn xvars(&self) -> &[AxisVariable] {
        &self.xvars
    }

    /// Coordinates → mass (and width) of every vertex; empty when an expression cannot be
    /// evaluated.
    pub fn get_particle_masses(&self, coordinates: &Coordinates) -> BTreeMap<usize, MassEntry> {
        let mut masses = BTreeMap::new();
        for (vertex, expr) in &self.vertices {
            let entry = match expr {
                VertexExpression::Mass(m) => m.eval(coordinates).map(MassEntry::Mass),
                VertexExpression::MassWidth(m, w) => m
                    .eval(coordinates)
                    .zip(w.eval(coordinates))
                    .map(|(m, w)| MassEntry::MassWidth(m, w)),
            };
            let Some(entry) = entry else {
                log::debug!("could not evaluate vertex {vertex} = {expr} at {coordinates}");
                return BTreeMap::new();
            };
            masses.insert(*vertex, entry);
        }
        masses
    }

    /// Vertex masses → coordinates, checked by a round trip (0.11 GeV).
    pub fn get_xy_values(
        &self,
        masses: &BTreeMap<usize, MassEntry>,
    ) -> Result<Option<Coordinates>, MassPlaneError> {
        if masses.len() != self.vertices.len()
            || !self.vertices.keys().all(|k| masses.contains_key(k))
        {
            return Err(MassPlaneError::DimensionMismatch {
                expected: self.vertices.len(),
                found: masses.len(),
            });
        }
        if masses.values().any(|m| m.mass() < 0.0 || !m.mass().is_finite()) {
            log::debug!("negative or invalid mass in {masses:?}");
            return Ok(None);
        }

        let has_all_widths = self.vertices.iter().all(|(k, v)| {
            !matches!(v, VertexExpression::MassWidth(..)) || masses[k].width().is_some()
        });
        let inverse = if has_all_widths {
            &self.inverse_full
        } else {
            match &self.inverse_masses {
                Some(inverse) => inverse,
                None => {
                    log::debug!("graph plane needs widths to be inverted");
                    return Ok(None);
                }
            }
        };

        let values: Vec<Option<GeV>> = self
            .equations
            .iter()
            .map(|eq| match eq.lhs {
                Parameter::Mass(v) => Some(masses[&v].mass()),
                Parameter::Width(v) => masses[&v].width(),
            })
            .collect();
        let Some(coordinates) = inverse.apply(&values) else {
            return Ok(None);
        };

        let mut squared = 0.0;
        for (vertex, expr) in &self.vertices {
            let entry = masses[vertex];
            let (mass_expr, width_expr) = match expr {
                VertexExpression::Mass(m) => (m, None),
                VertexExpression::MassWidth(m, w) => (m, Some(w)),
            };
            let Some(back) = mass_expr.eval(&coordinates) else {
                return Ok(None);
            };
            squared += (back - entry.mass()).powi(2);
            if let (true, Some(w_expr), Some(w)) = (has_all_widths, width_expr, entry.width()) {
                let Some(back) = w_expr.eval(&coordinates) else {
                    return Ok(None);
                };
                squared += (back - w).powi(2);
            }
        }
        if squared.sqrt() > XY_ROUND_TRIP_TOLERANCE {
            log::debug!(
                "round trip of {masses:?} through {coordinates} is off by {:.3} GeV",
                squared.sqrt()
            );
            return Ok(None);
        }
        Ok(Some(coordinates))
    }
}

impl MassProjection for GraphSolver {
    /// Mass-keyed sources give the vertex masses as a single branch, in vertex order.
    fn project(&self, masses: &[BranchMasses]) -> Result<Option<Coordinates>, MassPlaneError> {
        let values = match masses {
            [BranchMasses::Values(values)] => values,
            _ => {
                return Err(MassPlaneError::DimensionMismatch {
                    expected: 1,
                    found: masses.len(),
                })
            }
        };
        if values.len() != self.vertices.len() {
            return Err(MassPlaneError::DimensionMismatch {
                expected: self.vertices.len(),
                found: values.len(),
            });
        }
        let keyed = self.vertices.keys().copied().zip(values.iter().copied()).collect();
        self.get_xy_values(&keyed)
    }
}

impl fmt::Display for GraphSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (vertex, expr)) in self.vertices.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match expr {
                VertexExpression::Mass(m) => write!(f, "{vertex}: '{m}'")?,
                VertexExpression::MassWidth(m, w) => write!(f, "{vertex}: ('{m}', '{w}')")?,
            }
        }
        write!(f, "}}")
    }
}

/// Mass plane over a vertex map, with its data sources.
#[derive(Debug, Clone)]
pub struct GraphMassPlane {
    txname: String,
    solver: GraphSolver,
    sources: SourceSet,
}

impl GraphMassPlane {
    pub fn new(
        txname: impl Into<String>,
        vertices: BTreeMap<usize, VertexExpression>,
    ) -> Result<Self, MassPlaneError> {
        Ok(GraphMassPlane {
            txname: txname.into(),
            solver: GraphSolver::new(vertices)?,
            sources: SourceSet::default(),
        })
    }

    /// Parse `{vertex: expression, …}`.
    pub fn from_string(txname: impl Into<String>, descriptor: &str) -> Result<Self, MassPlaneError> {
        match PlaneDescriptor::parse(descriptor)? {
            PlaneDescriptor::Graph(vertices) => Self::new(txname, vertices),
            PlaneDescriptor::Branches(_) => Err(MassPlaneError::DescriptorParse(format!(
                "{descriptor} is a branch list, not a vertex map"
            ))),
        }
    }

    pub fn txname(&self) -> &str {
        &self.txname
    }

    pub fn solver(&self) -> &GraphSolver {
        &self.solver
    }

    pub fn xvars(&self) -> Vec<AxisVariable> {
        self.solver.xvars().to_vec()
    }

    pub fn get_particle_masses(&self, coordinates: &Coordinates) -> BTreeMap<usize, MassEntry> {
        self.solver.get_particle_masses(coordinates)
    }

    pub fn get_xy_values(
        &self,
        masses: &BTreeMap<usize, MassEntry>,
    ) -> Result<Option<Coordinates>, MassPlaneError> {
        self.solver.get_xy_values(masses)
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn add_source(&mut self, label: &str, spec: SourceSpec) -> Result<(), MassPlaneError> {
        self.sources.add_source(label, spec, self.solver.xvars())
    }

    pub fn load_data(&mut self, ctx: &mut IngestionContext) -> Result<usize, MassPlaneError> {
        self.sources.load_data(ctx, Some(&self.solver))
    }

    pub fn remove_area(&mut self, polygon: &[(f64, f64)]) -> usize {
        self.sources.remove_area(polygon)
    }
}

impl fmt::Display for GraphMassPlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.solver)
    }
}

impl PartialEq for GraphMassPlane {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

#[cfg(test)]
mod graph_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_graph_round_trip() {
        let plane =
            GraphMassPlane::from_string("TGQ", "{0: 'x', 1: 'y', 2: '0.5*x + 0.5*y'}").unwrap();
        assert_eq!(plane.xvars(), vec![AxisVariable::X, AxisVariable::Y]);

        let masses = plane.get_particle_masses(&Coordinates::xy(800.0, 200.0));
        assert_eq!(masses[&2], MassEntry::Mass(500.0));

        let back = plane.get_xy_values(&masses).unwrap().unwrap();
        assert_relative_eq!(back.get(AxisVariable::X).unwrap(), 800.0, epsilon = 1e-9);
        assert_relative_eq!(back.get(AxisVariable::Y).unwrap(), 200.0, epsilon = 1e-9);

        // over-determined: an inconsistent middle vertex fails the round trip
        let mut off = masses.clone();
        off.insert(2, MassEntry::Mass(520.0));
        assert_eq!(plane.get_xy_values(&off), Ok(None));

        off.remove(&2);
        assert!(plane.get_xy_values(&off).is_err());
    }

    #[test]
    fn test_graph_display_and_rank() {
        let plane = GraphMassPlane::from_string("T", "{0: x, 1: (y, 1e-10)}").unwrap();
        assert_eq!(plane.to_string(), "{0: 'x', 1: ('y', '1e-10')}");
        assert_eq!(
            GraphMassPlane::from_string("T", &plane.to_string()).unwrap(),
            plane
        );

        assert!(matches!(
            GraphMassPlane::from_string("T", "{0: 'x + y', 1: '2*x + 2*y'}"),
            Err(MassPlaneError::Underconstrained { nvars: 2, .. })
        ));
    }

    #[test]
    fn test_projection() {
        let plane = GraphMassPlane::from_string("T", "{0: 'x', 1: 'y'}").unwrap();
        let c = plane
            .solver()
            .project(&[BranchMasses::masses(&[400.0, 100.0])])
            .unwrap()
            .unwrap();
        assert_relative_eq!(c.get(AxisVariable::X).unwrap(), 400.0, epsilon = 1e-9);
        assert_relative_eq!(c.get(AxisVariable::Y).unwrap(), 100.0, epsilon = 1e-9);
        assert!(plane
            .solver()
            .project(&[BranchMasses::masses(&[400.0]), BranchMasses::Wildcard])
            .is_err());
    }
}
