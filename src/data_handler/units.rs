//! # Units of ingested values
//!
//! A source declares one unit token. Value units rescale the data value, axis units
//! (`(GeV,GeV)`, `(GeV,ns)`) describe the plot axes:
//!
//! | token        | effect                                                  |
//! |--------------|---------------------------------------------------------|
//! | `''`, `none` | dimensionless, unchanged                                |
//! | `%`          | value ÷ 100                                             |
//! | `/10000`     | value ÷ 10000 (any `/N` divides by `N`)                 |
//! | `*N`         | value × `N`                                             |
//! | `fb`, `pb`   | cross section; zero values are dropped                  |
//! | `GeV`, `ns`  | unchanged                                               |
//! | `(GeV,GeV)`  | unchanged                                               |
//! | `(GeV,ns)`   | second axis is a lifetime τ (ns), converted to Γ = ħ/τ  |
//!
//! Any other token is rejected before a file is opened.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{GeV, Nanosecond, HBAR_GEV_NS, PERCENT},
    coordinates::format_number,
    massplane_errors::MassPlaneError,
};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    Dimensionless,
    Percent,
    Divide(f64),
    Multiply(f64),
    Femtobarn,
    Picobarn,
    GeV,
    Nanosecond,
    MassMass,
    MassLifetime,
}

/// Lifetime (ns) → width (GeV).
pub fn lifetime_to_width(tau: Nanosecond) -> GeV {
    HBAR_GEV_NS / tau
}

impl Unit {
    /// Multiplicative factor applied to data values.
    pub fn value_factor(&self) -> f64 {
        match self {
            Unit::Percent => 1.0 / PERCENT,
            Unit::Divide(n) => 1.0 / n,
            Unit::Multiply(n) => *n,
            _ => 1.0,
        }
    }

    /// Convert a raw value to the internal representation.
    pub fn apply(&self, value: f64) -> f64 {
        value * self.value_factor()
    }

    /// Cross sections must be strictly positive: a zero upper limit is meaningless.
    pub fn is_strictly_positive(&self) -> bool {
        matches!(self, Unit::Femtobarn | Unit::Picobarn)
    }

    /// `true` when the second plot axis is a lifetime to be converted into a width.
    pub fn converts_lifetime(&self) -> bool {
        matches!(self, Unit::MassLifetime)
    }
}

impl FromStr for Unit {
    type Err = MassPlaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '\'' && *c != '"')
            .collect();
        let factor = |n: &str| -> Result<f64, MassPlaneError> {
            n.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v != 0.0)
                .ok_or_else(|| MassPlaneError::UnknownUnit(s.to_string()))
        };
        match token.as_str() {
            "" | "none" | "None" => Ok(Unit::Dimensionless),
            "%" => Ok(Unit::Percent),
            "fb" => Ok(Unit::Femtobarn),
            "pb" => Ok(Unit::Picobarn),
            "GeV" => Ok(Unit::GeV),
            "ns" => Ok(Unit::Nanosecond),
            "(GeV,GeV)" | "[GeV,GeV]" => Ok(Unit::MassMass),
            "(GeV,ns)" | "[GeV,ns]" => Ok(Unit::MassLifetime),
            t if t.starts_with('/') => Ok(Unit::Divide(factor(&t[1..])?)),
            t if t.starts_with('*') => Ok(Unit::Multiply(factor(&t[1..])?)),
            _ => Err(MassPlaneError::UnknownUnit(s.to_string())),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Dimensionless => write!(f, ""),
            Unit::Percent => write!(f, "%"),
            Unit::Divide(n) => write!(f, "/{}", format_number(*n)),
            Unit::Multiply(n) => write!(f, "*{}", format_number(*n)),
            Unit::Femtobarn => write!(f, "fb"),
            Unit::Picobarn => write!(f, "pb"),
            Unit::GeV => write!(f, "GeV"),
            Unit::Nanosecond => write!(f, "ns"),
            Unit::MassMass => write!(f, "(GeV,GeV)"),
            Unit::MassLifetime => write!(f, "(GeV,ns)"),
        }
    }
}

#[cfg(test)]
mod units_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse() {
        assert_eq!("".parse::<Unit>(), Ok(Unit::Dimensionless));
        assert_eq!("%".parse::<Unit>(), Ok(Unit::Percent));
        assert_eq!("/10000".parse::<Unit>(), Ok(Unit::Divide(10000.0)));
        assert_eq!("*2.5".parse::<Unit>(), Ok(Unit::Multiply(2.5)));
        assert_eq!("('GeV', 'ns')".parse::<Unit>(), Ok(Unit::MassLifetime));
        assert_eq!("(GeV,GeV)".parse::<Unit>(), Ok(Unit::MassMass));
        assert_eq!(
            "barn".parse::<Unit>(),
            Err(MassPlaneError::UnknownUnit("barn".into()))
        );
        assert!("/0".parse::<Unit>().is_err());
        assert!("/abc".parse::<Unit>().is_err());
    }

    #[test]
    fn test_display_reparses() {
        for unit in [
            Unit::Percent,
            Unit::Divide(10000.0),
            Unit::Femtobarn,
            Unit::MassLifetime,
            Unit::Dimensionless,
        ] {
            assert_eq!(unit.to_string().parse::<Unit>(), Ok(unit));
        }
    }

    #[test]
    fn test_percent_idempotence() {
        let values = [0.0, 1.0, 12.5, 99.9, 1e-3];
        for v in values {
            assert_relative_eq!(Unit::Percent.apply(v) * 100.0, v, max_relative = 1e-12);
        }
        assert_relative_eq!(Unit::Divide(10000.0).apply(5000.0), 0.5);
    }

    #[test]
    fn test_strictness_and_lifetime() {
        assert!(Unit::Femtobarn.is_strictly_positive());
        assert!(Unit::Picobarn.is_strictly_positive());
        assert!(!Unit::Percent.is_strictly_positive());
        assert!(Unit::MassLifetime.converts_lifetime());
        assert_relative_eq!(lifetime_to_width(1.0), 6.582119514e-16);
    }
}
