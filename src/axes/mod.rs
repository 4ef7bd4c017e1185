//! # Branch axes: coordinates ↔ masses for one decay branch
//!
//! A simplified-model topology is parameterised in a publication plot by a handful of
//! coordinates (`x, y, z, w`). For one decay branch, every vertex mass (and optionally width)
//! is given as an expression in these coordinates:
//!
//! ```text
//! [x, 0.5*x + 0.5*y, y]        three masses
//! [(x, 1e-10), y]              mass and width at the first vertex
//! ```
//!
//! This module turns such a list into a solver:
//!
//! * **Forward**: [`AxisSolver::get_particle_masses`]: coordinates → masses (and widths).
//! * **Inverse**: [`AxisSolver::get_xy_values`]: masses → coordinates, followed by a
//!   **round trip**: the masses recomputed from the coordinates must lie within
//!   [`XY_ROUND_TRIP_TOLERANCE`] (0.11 GeV, Euclidean over masses and widths) of the input,
//!   otherwise the point is rejected.
//!
//! A branch written `*` ([`WildAxes`]) carries no kinematic constraint: it produces the
//! wildcard marker and never contributes coordinates.
//!
//! ## Equations
//! -----------------
//! Vertex `i` gets the parameters `Mass<i>` (`MassA, MassB, …`) and, when a width is given,
//! `Width<i>`. Numeric literals are rounded to 5 significant figures for masses and 2 for
//! widths. Equations render as `Eq(MassA, x)`.
//!
//! ## Constraint policy
//! -----------------
//! A branch with more coordinates than equations is *underconstrained*. [`AxisSolver`]
//! accepts it, logs a warning, and leaves its inverse empty; the mass plane refuses it.
mod linear_system;

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    constants::{GeV, MASS_SIGNIFICANT_DIGITS, WIDTH_SIGNIFICANT_DIGITS, XY_ROUND_TRIP_TOLERANCE},
    coordinates::{format_number, AxisVariable, Coordinates},
    expression::{AffineForm, Expression},
    massplane_errors::MassPlaneError,
};

pub(crate) use linear_system::LinearInverse;

/// Left-hand side of a branch equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Parameter {
    Mass(usize),
    Width(usize),
}

fn vertex_letter(vertex: usize) -> String {
    let mut n = vertex;
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}

impl Parameter {
    pub fn vertex(&self) -> usize {
        match self {
            Parameter::Mass(i) | Parameter::Width(i) => *i,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parameter::Mass(i) => write!(f, "Mass{}", vertex_letter(*i)),
            Parameter::Width(i) => write!(f, "Width{}", vertex_letter(*i)),
        }
    }
}

/// `Eq(lhs, rhs)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    pub lhs: Parameter,
    pub rhs: Expression,
    affine: Option<AffineForm>,
}

impl Equation {
    pub fn new(lhs: Parameter, rhs: Expression) -> Self {
        let affine = rhs.affine();
        Equation { lhs, rhs, affine }
    }

    pub fn is_affine(&self) -> bool {
        self.affine.is_some()
    }

    pub fn variables(&self) -> BTreeSet<AxisVariable> {
        self.rhs.variables()
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Eq({}, {})", self.lhs, self.rhs)
    }
}

/// Expression(s) of one vertex: its mass, or its mass and width.
#[derive(Debug, Clone, PartialEq)]
pub enum VertexExpression {
    Mass(Expression),
    MassWidth(Expression, Expression),
}

impl fmt::Display for VertexExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexExpression::Mass(m) => write!(f, "{m}"),
            VertexExpression::MassWidth(m, w) => write!(f, "({m}, {w})"),
        }
    }
}

/// Mass (GeV) of a vertex, with its width when known.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MassEntry {
    Mass(GeV),
    MassWidth(GeV, GeV),
}

impl MassEntry {
    pub fn mass(&self) -> GeV {
        match self {
            MassEntry::Mass(m) | MassEntry::MassWidth(m, _) => *m,
        }
    }

    pub fn width(&self) -> Option<GeV> {
        match self {
            MassEntry::Mass(_) => None,
            MassEntry::MassWidth(_, w) => Some(*w),
        }
    }
}

impl From<GeV> for MassEntry {
    fn from(mass: GeV) -> Self {
        MassEntry::Mass(mass)
    }
}

impl From<(GeV, GeV)> for MassEntry {
    fn from((mass, width): (GeV, GeV)) -> Self {
        MassEntry::MassWidth(mass, width)
    }
}

impl fmt::Display for MassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassEntry::Mass(m) => write!(f, "{}", format_number(*m)),
            MassEntry::MassWidth(m, w) => {
                write!(f, "({}, {})", format_number(*m), format_number(*w))
            }
        }
    }
}

/// Masses of one branch, or the `*` marker of a wildcard branch.
#[derive(Debug, Clone, PartialEq)]
pub enum BranchMasses {
    Wildcard,
    Values(SmallVec<[MassEntry; 4]>),
}

impl BranchMasses {
    /// Mass-only branch.
    pub fn masses(masses: &[GeV]) -> Self {
        BranchMasses::Values(masses.iter().map(|m| MassEntry::Mass(*m)).collect())
    }

    pub fn entries(entries: impl IntoIterator<Item = MassEntry>) -> Self {
        BranchMasses::Values(entries.into_iter().collect())
    }

    pub fn values(&self) -> Option<&[MassEntry]> {
        match self {
            BranchMasses::Wildcard => None,
            BranchMasses::Values(v) => Some(v),
        }
    }
}

impl fmt::Display for BranchMasses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchMasses::Wildcard => write!(f, "*"),
            BranchMasses::Values(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Solver for one branch.
#[derive(Debug, Clone)]
pub struct AxisSolver {
    vertices: Vec<VertexExpression>,
    equations: Vec<Equation>,
    xvars: Vec<AxisVariable>,
    mass_xvars: Vec<AxisVariable>,
    underconstrained: bool,
    /// Inverse using mass and width equations.
    inverse_full: Option<LinearInverse>,
    /// Inverse using mass equations only, for inputs without widths.
    inverse_masses: Option<LinearInverse>,
}

impl AxisSolver {
    /// Build a branch solver from its vertex expressions.
    ///
    /// Vertex `i` yields `Eq(Mass<i>, m)` (literals rounded to 5 significant figures) and, for
    /// a `(mass, width)` vertex, `Eq(Width<i>, w)` (2 significant figures). The inverse is
    /// prepared immediately; see [`AxisSolver::is_underconstrained`].
    ///
    /// Arguments
    /// -----------------
    /// * `vertices`: one expression (or pair) per vertex, mother first
    ///
    /// Return
    /// ----------
    /// * The solver. Never fails: unsolvable systems only lose their inverse.
    pub fn from_convert(vertices: Vec<VertexExpression>) -> Self {
        let vertices: Vec<VertexExpression> = vertices
            .into_iter()
            .map(|v| match v {
                VertexExpression::Mass(m) => {
                    VertexExpression::Mass(m.rounded(MASS_SIGNIFICANT_DIGITS))
                }
                VertexExpression::MassWidth(m, w) => VertexExpression::MassWidth(
                    m.rounded(MASS_SIGNIFICANT_DIGITS),
                    w.rounded(WIDTH_SIGNIFICANT_DIGITS),
                ),
            })
            .collect();

        let mut equations = Vec::new();
        for (i, vertex) in vertices.iter().enumerate() {
            match vertex {
                VertexExpression::Mass(m) => equations.push(Equation::new(Parameter::Mass(i), m.clone())),
                VertexExpression::MassWidth(m, w) => {
                    equations.push(Equation::new(Parameter::Mass(i), m.clone()));
                    equations.push(Equation::new(Parameter::Width(i), w.clone()));
                }
            }
        }

        let mut solver = AxisSolver {
            vertices,
            equations,
            xvars: Vec::new(),
            mass_xvars: Vec::new(),
            underconstrained: false,
            inverse_full: None,
            inverse_masses: None,
        };
        solver.set_xy_function();
        solver
    }

    /// Prepare the inverse transforms.
    fn set_xy_function(&mut self) {
        let xvars: BTreeSet<AxisVariable> =
            self.equations.iter().flat_map(|eq| eq.variables()).collect();
        self.xvars = xvars.into_iter().collect();

        let mass_xvars: BTreeSet<AxisVariable> = self
            .equations
            .iter()
            .filter(|eq| matches!(eq.lhs, Parameter::Mass(_)))
            .flat_map(|eq| eq.variables())
            .collect();
        self.mass_xvars = mass_xvars.into_iter().collect();

        if self.xvars.len() > self.equations.len() {
            log::warn!(
                "branch {} is underconstrained: {} variables for {} equations",
                self,
                self.xvars.len(),
                self.equations.len()
            );
            self.underconstrained = true;
            return;
        }

        let forms = |with_widths: bool| -> Vec<(usize, AffineForm)> {
            self.equations
                .iter()
                .enumerate()
                .filter(|(_, eq)| with_widths || matches!(eq.lhs, Parameter::Mass(_)))
                .filter_map(|(i, eq)| eq.affine.map(|form| (i, form)))
                .collect()
        };

        self.inverse_full = LinearInverse::search_subsets(&forms(true), &self.xvars);
        self.inverse_masses = if self.has_widths() {
            LinearInverse::search_subsets(&forms(false), &self.mass_xvars)
        } else {
            self.inverse_full.clone()
        };

        if self.inverse_full.is_none() {
            log::warn!("could not solve branch {} for {:?}", self, self.xvars);
        }
    }

    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub fn vertices(&self) -> &[VertexExpression] {
        &self.vertices
    }

    /// Coordinates referenced by the branch, sorted.
    pub fn xvars(&self) -> &[AxisVariable] {
        &self.xvars
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn has_widths(&self) -> bool {
        self.vertices
            .iter()
            .any(|v| matches!(v, VertexExpression::MassWidth(..)))
    }

    pub fn is_underconstrained(&self) -> bool {
        self.underconstrained
    }

    /// `true` when masses can be mapped back to coordinates.
    pub fn is_invertible(&self) -> bool {
        self.inverse_full.is_some() || self.inverse_masses.is_some()
    }

    /// Forward transform: coordinates → masses (and widths).
    ///
    /// Every coordinate of the branch must be present and finite in `coordinates`.
    ///
    /// Return
    /// ----------
    /// * One [`MassEntry`] per vertex; an empty vector for a branch without equations, or,
    ///   after a log line, when an input coordinate is missing or an expression cannot be
    ///   evaluated. Callers skip such points.
    pub fn get_particle_masses(&self, coordinates: &Coordinates) -> Vec<MassEntry> {
        if self.equations.is_empty() {
            return Vec::new();
        }
        for var in &self.xvars {
            match coordinates.get(*var) {
                Some(v) if v.is_finite() => {}
                Some(v) => {
                    log::debug!("coordinate {var} = {v} is not a number for branch {self}");
                    return Vec::new();
                }
                None => {
                    log::debug!("coordinate {var} missing in {coordinates} for branch {self}");
                    return Vec::new();
                }
            }
        }

        let mut masses = Vec::with_capacity(self.vertices.len());
        for vertex in &self.vertices {
            let entry = match vertex {
                VertexExpression::Mass(m) => m.eval(coordinates).map(MassEntry::Mass),
                VertexExpression::MassWidth(m, w) => m
                    .eval(coordinates)
                    .zip(w.eval(coordinates))
                    .map(|(m, w)| MassEntry::MassWidth(m, w)),
            };
            match entry {
                Some(entry) => masses.push(entry),
                None => {
                    log::debug!("could not evaluate {vertex} at {coordinates}");
                    return Vec::new();
                }
            }
        }
        masses
    }

    /// Inverse transform: masses → coordinates, checked by a round trip.
    ///
    /// Widths can be given inside `masses` (`MassEntry::MassWidth`) or as a parallel
    /// `widths` array; without widths the mass-only inverse is used.
    ///
    /// Arguments
    /// -----------------
    /// * `masses`: one entry per vertex, mother first
    /// * `widths`: optional widths, one per vertex
    ///
    /// Return
    /// ----------
    /// * `Ok(Some(coordinates))` for an accepted point.
    /// * `Ok(None)` for a skipped point: negative mass, parent lighter than its daughter, no
    ///   usable inverse, or round-trip distance above 0.11 GeV.
    /// * `Err(MassPlaneError::DimensionMismatch)` if the input length does not match the
    ///   branch.
    pub fn get_xy_values(
        &self,
        masses: &[MassEntry],
        widths: Option<&[Option<GeV>]>,
    ) -> Result<Option<Coordinates>, MassPlaneError> {
        if masses.len() != self.vertices.len() {
            return Err(MassPlaneError::DimensionMismatch {
                expected: self.vertices.len(),
                found: masses.len(),
            });
        }
        if let Some(widths) = widths {
            if widths.len() != masses.len() {
                return Err(MassPlaneError::DimensionMismatch {
                    expected: masses.len(),
                    found: widths.len(),
                });
            }
        }
        if self.equations.is_empty() {
            return Ok(Some(Coordinates::new()));
        }

        let mass_values: Vec<GeV> = masses.iter().map(|m| m.mass()).collect();
        let width_values: Vec<Option<GeV>> = masses
            .iter()
            .enumerate()
            .map(|(i, m)| m.width().or_else(|| widths.and_then(|w| w[i])))
            .collect();

        if let Some(m) = mass_values.iter().find(|m| **m < 0.0 || !m.is_finite()) {
            log::debug!("negative or invalid mass {m} in {mass_values:?}");
            return Ok(None);
        }
        if mass_values.windows(2).any(|pair| pair[0] < pair[1]) {
            log::debug!("parent lighter than daughter in {mass_values:?}");
            return Ok(None);
        }

        let use_widths = self.has_widths()
            && self.vertices.iter().enumerate().all(|(i, v)| {
                !matches!(v, VertexExpression::MassWidth(..)) || width_values[i].is_some()
            });
        if self.has_widths() && !use_widths {
            log::debug!("no width information for branch {self}, using masses only");
        }

        let inverse = if use_widths {
            self.inverse_full.as_ref()
        } else {
            self.inverse_masses.as_ref()
        };
        let Some(inverse) = inverse else {
            log::debug!("branch {self} cannot be inverted");
            return Ok(None);
        };

        let values: Vec<Option<f64>> = self
            .equations
            .iter()
            .map(|eq| match eq.lhs {
                Parameter::Mass(i) => Some(mass_values[i]),
                Parameter::Width(i) => width_values[i],
            })
            .collect();
        let Some(coordinates) = inverse.apply(&values) else {
            return Ok(None);
        };

        let Some(distance) = self.round_trip_distance(&coordinates, &mass_values, &width_values, use_widths) else {
            log::debug!("could not recompute masses from {coordinates}");
            return Ok(None);
        };
        if distance > XY_ROUND_TRIP_TOLERANCE {
            log::debug!(
                "round trip of {mass_values:?} through {coordinates} is off by {distance:.3} GeV"
            );
            return Ok(None);
        }
        Ok(Some(coordinates))
    }

    fn round_trip_distance(
        &self,
        coordinates: &Coordinates,
        masses: &[GeV],
        widths: &[Option<GeV>],
        use_widths: bool,
    ) -> Option<f64> {
        let mut squared = 0.0;
        for (i, vertex) in self.vertices.iter().enumerate() {
            let (mass_expr, width_expr) = match vertex {
                VertexExpression::Mass(m) => (m, None),
                VertexExpression::MassWidth(m, w) => (m, Some(w)),
            };
            squared += (mass_expr.eval(coordinates)? - masses[i]).powi(2);
            if let (true, Some(w_expr), Some(w)) = (use_widths, width_expr, widths[i]) {
                squared += (w_expr.eval(coordinates)? - w).powi(2);
            }
        }
        Some(squared.sqrt())
    }
}

impl fmt::Display for AxisSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.vertices.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

/// Branch without kinematic constraint, written `*`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WildAxes;

impl WildAxes {
    pub fn get_particle_masses(&self, _coordinates: &Coordinates) -> BranchMasses {
        BranchMasses::Wildcard
    }

    pub fn get_xy_values(&self, _masses: &BranchMasses) -> Option<Coordinates> {
        None
    }
}

impl fmt::Display for WildAxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "*")
    }
}

/// One branch of a mass plane.
#[derive(Debug, Clone)]
pub enum Branch {
    Axes(AxisSolver),
    Wild(WildAxes),
}

impl Branch {
    pub fn is_wild(&self) -> bool {
        matches!(self, Branch::Wild(_))
    }

    pub fn xvars(&self) -> &[AxisVariable] {
        match self {
            Branch::Axes(axes) => axes.xvars(),
            Branch::Wild(_) => &[],
        }
    }

    pub fn get_particle_masses(&self, coordinates: &Coordinates) -> BranchMasses {
        match self {
            Branch::Axes(axes) => BranchMasses::Values(
                axes.get_particle_masses(coordinates).into_iter().collect(),
            ),
            Branch::Wild(wild) => wild.get_particle_masses(coordinates),
        }
    }

    /// Inverse transform of one branch; a wildcard input on a constrained branch is a
    /// dimension mismatch.
    pub fn get_xy_values(
        &self,
        masses: &BranchMasses,
        widths: Option<&[Option<GeV>]>,
    ) -> Result<Option<Coordinates>, MassPlaneError> {
        match (self, masses) {
            (Branch::Wild(wild), _) => Ok(wild.get_xy_values(masses)),
            (Branch::Axes(axes), BranchMasses::Values(values)) => {
                axes.get_xy_values(values, widths)
            }
            (Branch::Axes(axes), BranchMasses::Wildcard) => {
                Err(MassPlaneError::DimensionMismatch {
                    expected: axes.vertex_count(),
                    found: 0,
                })
            }
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Branch::Axes(axes) => write!(f, "{axes}"),
            Branch::Wild(wild) => write!(f, "{wild}"),
        }
    }
}

#[cfg(test)]
mod axes_test {
    use super::*;
    use approx::assert_relative_eq;

    fn solver(exprs: &[&str]) -> AxisSolver {
        AxisSolver::from_convert(
            exprs
                .iter()
                .map(|e| VertexExpression::Mass(Expression::parse(e).unwrap()))
                .collect(),
        )
    }

    fn coords(pairs: &[(AxisVariable, f64)]) -> Coordinates {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_equations_display() {
        let axes = solver(&["x", "0.5*x + 0.5*y", "y"]);
        let eqs: Vec<String> = axes.equations().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            eqs,
            vec!["Eq(MassA, x)", "Eq(MassB, 0.5*x + 0.5*y)", "Eq(MassC, y)"]
        );
        assert_eq!(axes.to_string(), "[x, 0.5*x + 0.5*y, y]");
        assert_eq!(vertex_letter(27), "AB");
    }

    #[test]
    fn test_forward_and_inverse() {
        let axes = solver(&["x", "x - y", "60."]);
        assert_eq!(axes.xvars(), &[AxisVariable::X, AxisVariable::Y]);

        let masses = axes.get_particle_masses(&Coordinates::xy(500.0, 100.0));
        assert_eq!(
            masses,
            vec![
                MassEntry::Mass(500.0),
                MassEntry::Mass(400.0),
                MassEntry::Mass(60.0)
            ]
        );

        let xy = axes.get_xy_values(&masses, None).unwrap().unwrap();
        assert_relative_eq!(xy.get(AxisVariable::X).unwrap(), 500.0);
        assert_relative_eq!(xy.get(AxisVariable::Y).unwrap(), 100.0);
    }

    #[test]
    fn test_round_trip_rejection() {
        let axes = solver(&["x", "x - y", "60."]);
        // the constant vertex is 0.2 GeV off
        let masses = [500.0, 400.0, 60.2].map(MassEntry::Mass);
        assert_eq!(axes.get_xy_values(&masses, None), Ok(None));
        // within tolerance
        let masses = [500.0, 400.0, 60.1].map(MassEntry::Mass);
        assert!(axes.get_xy_values(&masses, None).unwrap().is_some());
    }

    #[test]
    fn test_point_skips() {
        let axes = solver(&["x", "y"]);
        let negative = [500.0, -1.0].map(MassEntry::Mass);
        assert_eq!(axes.get_xy_values(&negative, None), Ok(None));
        let inverted = [100.0, 500.0].map(MassEntry::Mass);
        assert_eq!(axes.get_xy_values(&inverted, None), Ok(None));
        assert_eq!(
            axes.get_xy_values(&[MassEntry::Mass(1.0)], None),
            Err(MassPlaneError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
        assert!(axes
            .get_particle_masses(&coords(&[(AxisVariable::X, 1.0)]))
            .is_empty());
        assert!(axes
            .get_particle_masses(&Coordinates::xy(f64::NAN, 1.0))
            .is_empty());
    }

    #[test]
    fn test_widths() {
        let axes = AxisSolver::from_convert(vec![
            VertexExpression::MassWidth(
                Expression::parse("x").unwrap(),
                Expression::parse("z").unwrap(),
            ),
            VertexExpression::Mass(Expression::parse("y").unwrap()),
        ]);
        let point = coords(&[
            (AxisVariable::X, 500.0),
            (AxisVariable::Y, 100.0),
            (AxisVariable::Z, 1e-14),
        ]);
        let masses = axes.get_particle_masses(&point);
        assert_eq!(
            masses,
            vec![MassEntry::MassWidth(500.0, 1e-14), MassEntry::Mass(100.0)]
        );

        // legacy tuples
        let xy = axes.get_xy_values(&masses, None).unwrap().unwrap();
        assert_relative_eq!(xy.get(AxisVariable::Z).unwrap(), 1e-14);

        // parallel width array
        let mass_only = [500.0, 100.0].map(MassEntry::Mass);
        let xy = axes
            .get_xy_values(&mass_only, Some(&[Some(1e-14), None]))
            .unwrap()
            .unwrap();
        assert_relative_eq!(xy.get(AxisVariable::Z).unwrap(), 1e-14);

        // mass only degrades to the mass coordinates
        let xy = axes.get_xy_values(&mass_only, None).unwrap().unwrap();
        assert_eq!(xy.get(AxisVariable::Z), None);
        assert_relative_eq!(xy.get(AxisVariable::X).unwrap(), 500.0);
    }

    #[test]
    fn test_width_rounding() {
        let axes = AxisSolver::from_convert(vec![VertexExpression::MassWidth(
            Expression::parse("x").unwrap(),
            Expression::parse("6.582119514e-16").unwrap(),
        )]);
        assert_eq!(axes.equations()[1].to_string(), "Eq(WidthA, 6.6e-16)");
    }

    #[test]
    fn test_underconstrained_is_graceful() {
        let axes = solver(&["x + y"]);
        assert!(axes.is_underconstrained());
        assert!(!axes.is_invertible());
        assert_eq!(
            axes.get_xy_values(&[MassEntry::Mass(600.0)], None),
            Ok(None)
        );
        assert_eq!(
            axes.get_particle_masses(&Coordinates::xy(500.0, 100.0)),
            vec![MassEntry::Mass(600.0)]
        );
    }

    #[test]
    fn test_empty_branch() {
        let axes = solver(&[]);
        assert!(axes.get_particle_masses(&Coordinates::xy(1.0, 2.0)).is_empty());
        assert_eq!(axes.get_xy_values(&[], None), Ok(Some(Coordinates::new())));
    }

    #[test]
    fn test_wild_branch() {
        let branch = Branch::Wild(WildAxes);
        assert_eq!(
            branch.get_particle_masses(&Coordinates::xy(1.0, 2.0)),
            BranchMasses::Wildcard
        );
        assert_eq!(
            branch.get_xy_values(&BranchMasses::masses(&[500.0]), None),
            Ok(None)
        );
        assert_eq!(branch.to_string(), "*");
    }
}
