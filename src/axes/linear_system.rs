//! Small-system solvers behind the inverse transform (masses → coordinates).
//!
//! Every usable equation is affine in the axis variables, `p_k = a_k · X + b_k`, so solving for
//! the coordinates `X` is linear algebra over the selected equations:
//!
//! * [`LinearInverse::search_subsets`] tries the equation subsets of size `nvars` in
//!   lexicographic order and keeps the first non-singular one. The search is combinatorial in
//!   the number of equations; branches carry a handful of equations (≤ 4 in practice).
//! * [`LinearInverse::least_squares`] solves all equations at once through an SVD
//!   pseudo-inverse, requiring full column rank.
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};

use crate::{
    constants::SINGULAR_EPS,
    coordinates::{AxisVariable, Coordinates},
    expression::AffineForm,
};

/// Precomputed affine map from parameter values to coordinates.
#[derive(Debug, Clone)]
pub(crate) struct LinearInverse {
    xvars: Vec<AxisVariable>,
    /// Equation indices feeding the map, in column order.
    equations: Vec<usize>,
    /// `nvars × equations.len()` matrix.
    matrix: DMatrix<f64>,
    /// Constant terms `b_k` of the selected equations.
    offsets: DVector<f64>,
}

fn design_matrix(
    forms: &[(usize, AffineForm)],
    selection: &[usize],
    xvars: &[AxisVariable],
) -> (DMatrix<f64>, DVector<f64>) {
    let a = DMatrix::from_fn(selection.len(), xvars.len(), |r, c| {
        forms[selection[r]].1.coefficient(xvars[c])
    });
    let b = DVector::from_fn(selection.len(), |r, _| forms[selection[r]].1.constant);
    (a, b)
}

impl LinearInverse {
    /// Search the subsets of `forms` with `xvars.len()` elements for the first non-singular
    /// system.
    ///
    /// Arguments
    /// -----------------
    /// * `forms`: `(equation index, affine form)` of the candidate equations
    /// * `xvars`: the coordinates to solve for
    ///
    /// Return
    /// ----------
    /// * The inverse map, or `None` if no subset determines every coordinate.
    pub(crate) fn search_subsets(
        forms: &[(usize, AffineForm)],
        xvars: &[AxisVariable],
    ) -> Option<Self> {
        let nvars = xvars.len();
        if nvars == 0 {
            return Some(LinearInverse {
                xvars: Vec::new(),
                equations: Vec::new(),
                matrix: DMatrix::zeros(0, 0),
                offsets: DVector::zeros(0),
            });
        }
        if forms.len() < nvars {
            return None;
        }

        for selection in (0..forms.len()).combinations(nvars) {
            let (a, b) = design_matrix(forms, &selection, xvars);
            let lu = a.lu();
            if lu.determinant().abs() <= SINGULAR_EPS {
                continue;
            }
            if let Some(inverse) = lu.try_inverse() {
                return Some(LinearInverse {
                    xvars: xvars.to_vec(),
                    equations: selection.iter().map(|s| forms[*s].0).collect(),
                    matrix: inverse,
                    offsets: b,
                });
            }
        }
        None
    }

    /// Solve all `forms` at once in the least-squares sense.
    ///
    /// Return
    /// ----------
    /// * The inverse map, or `None` if the system does not have full column rank.
    pub(crate) fn least_squares(
        forms: &[(usize, AffineForm)],
        xvars: &[AxisVariable],
    ) -> Option<Self> {
        let nvars = xvars.len();
        if nvars == 0 {
            return Self::search_subsets(forms, xvars);
        }
        if forms.len() < nvars {
            return None;
        }
        let selection: Vec<usize> = (0..forms.len()).collect();
        let (a, b) = design_matrix(forms, &selection, xvars);
        let svd = a.svd(true, true);
        if svd.rank(SINGULAR_EPS) < nvars {
            return None;
        }
        let pseudo_inverse = svd.pseudo_inverse(SINGULAR_EPS).ok()?;
        Some(LinearInverse {
            xvars: xvars.to_vec(),
            equations: forms.iter().map(|(i, _)| *i).collect(),
            matrix: pseudo_inverse,
            offsets: b,
        })
    }

    /// Apply the map to parameter values indexed by equation; `None` if a needed value is
    /// missing or a coordinate is not finite.
    pub(crate) fn apply(&self, values: &[Option<f64>]) -> Option<Coordinates> {
        let mut shifted = DVector::zeros(self.equations.len());
        for (k, eq) in self.equations.iter().enumerate() {
            shifted[k] = values.get(*eq).copied().flatten()? - self.offsets[k];
        }
        let solution = &self.matrix * shifted;
        let mut coordinates = Coordinates::new();
        for (var, value) in self.xvars.iter().zip(solution.iter()) {
            if !value.is_finite() {
                return None;
            }
            coordinates.insert(*var, *value);
        }
        Some(coordinates)
    }

    pub(crate) fn xvars(&self) -> &[AxisVariable] {
        &self.xvars
    }
}

#[cfg(test)]
mod linear_system_test {
    use super::*;
    use crate::expression::Expression;
    use approx::assert_relative_eq;

    fn forms(exprs: &[&str]) -> Vec<(usize, AffineForm)> {
        exprs
            .iter()
            .enumerate()
            .map(|(i, e)| (i, Expression::parse(e).unwrap().affine().unwrap()))
            .collect()
    }

    #[test]
    fn test_subset_search_skips_singular() {
        // the constant equation cannot be part of the solving subset
        let forms = forms(&["60.", "x", "x - y"]);
        let inverse =
            LinearInverse::search_subsets(&forms, &[AxisVariable::X, AxisVariable::Y]).unwrap();
        assert_eq!(inverse.equations, vec![1, 2]);

        let coords = inverse
            .apply(&[Some(60.0), Some(500.0), Some(100.0)])
            .unwrap();
        assert_relative_eq!(coords.get(AxisVariable::X).unwrap(), 500.0);
        assert_relative_eq!(coords.get(AxisVariable::Y).unwrap(), 400.0);
    }

    #[test]
    fn test_subset_search_underdetermined() {
        let forms = forms(&["x + y", "2*x + 2*y"]);
        assert!(
            LinearInverse::search_subsets(&forms, &[AxisVariable::X, AxisVariable::Y]).is_none()
        );
    }

    #[test]
    fn test_least_squares() {
        let forms = forms(&["x", "y", "0.5*x + 0.5*y"]);
        let inverse =
            LinearInverse::least_squares(&forms, &[AxisVariable::X, AxisVariable::Y]).unwrap();
        let coords = inverse
            .apply(&[Some(500.0), Some(100.0), Some(300.0)])
            .unwrap();
        assert_relative_eq!(coords.get(AxisVariable::X).unwrap(), 500.0, epsilon = 1e-9);
        assert_relative_eq!(coords.get(AxisVariable::Y).unwrap(), 100.0, epsilon = 1e-9);
        assert!(inverse.apply(&[Some(500.0), None, Some(300.0)]).is_none());
    }
}
