//! # Plot coordinates
//!
//! The axis variables `x, y, z, w` of a publication plot and the [`Coordinates`] mapping
//! produced by the inverse transform (masses → coordinates) and consumed by the forward
//! transform (coordinates → masses). Coordinates carry no unit.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::massplane_errors::MassPlaneError;

/// One of the four plot coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AxisVariable {
    X,
    Y,
    Z,
    W,
}

impl AxisVariable {
    pub const ALL: [AxisVariable; 4] = [
        AxisVariable::X,
        AxisVariable::Y,
        AxisVariable::Z,
        AxisVariable::W,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AxisVariable::X => "x",
            AxisVariable::Y => "y",
            AxisVariable::Z => "z",
            AxisVariable::W => "w",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            AxisVariable::X => 0,
            AxisVariable::Y => 1,
            AxisVariable::Z => 2,
            AxisVariable::W => 3,
        }
    }
}

impl fmt::Display for AxisVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AxisVariable {
    type Err = MassPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "x" => Ok(AxisVariable::X),
            "y" => Ok(AxisVariable::Y),
            "z" => Ok(AxisVariable::Z),
            "w" => Ok(AxisVariable::W),
            other => Err(MassPlaneError::UnknownSymbol(other.to_string())),
        }
    }
}

/// A point of the plot plane: a partial mapping from [`AxisVariable`] to a value.
///
/// Iteration and display follow the axis order `x, y, z, w`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    values: [Option<f64>; 4],
}

impl Coordinates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build coordinates from `(x, y)`.
    pub fn xy(x: f64, y: f64) -> Self {
        [(AxisVariable::X, x), (AxisVariable::Y, y)]
            .into_iter()
            .collect()
    }

    pub fn get(&self, var: AxisVariable) -> Option<f64> {
        self.values[var.index()]
    }

    /// Set a coordinate, returning the previous value if any.
    pub fn insert(&mut self, var: AxisVariable, value: f64) -> Option<f64> {
        self.values[var.index()].replace(value)
    }

    pub fn remove(&mut self, var: AxisVariable) -> Option<f64> {
        self.values[var.index()].take()
    }

    pub fn contains(&self, var: AxisVariable) -> bool {
        self.values[var.index()].is_some()
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisVariable, f64)> + '_ {
        AxisVariable::ALL
            .iter()
            .filter_map(move |var| self.get(*var).map(|v| (*var, v)))
    }

    pub fn variables(&self) -> impl Iterator<Item = AxisVariable> + '_ {
        self.iter().map(|(var, _)| var)
    }
}

impl FromIterator<(AxisVariable, f64)> for Coordinates {
    fn from_iter<I: IntoIterator<Item = (AxisVariable, f64)>>(iter: I) -> Self {
        let mut coordinates = Coordinates::new();
        for (var, value) in iter {
            coordinates.insert(var, value);
        }
        coordinates
    }
}

/// Shortest representation that parses back to `value`, without a trailing `.0`:
/// `10`, `0.5`, `1e-10`.
pub fn format_number(value: f64) -> String {
    let repr = format!("{value:?}");
    match repr.strip_suffix(".0") {
        Some(integer) => integer.to_string(),
        None => repr,
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}: {}", format_number(value))?;
        }
        write!(f, "}}")
    }
}
