//! Values given in the source itself (`direct`), no file involved.
//!
//! Either numeric rows, or a literal list of `[key, value]` pairs whose keys are coordinate
//! tuples or mass arrays:
//!
//! ```text
//! [[[[500., 100.], [500., 100.]], 1.2], [[[600., 100.], [600., 100.]], 0.8]]
//! ```
use serde::{Deserialize, Serialize};

use crate::{
    constants::RawRow,
    data_handler::{
        context::IngestionContext,
        formats::{keyed_rows, point_key, RawRows, SourceReader},
        SourceSpec,
    },
    literal::Literal,
    massplane_errors::MassPlaneError,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DirectData {
    Rows(Vec<RawRow>),
    Literal(String),
}

fn literal_entries(text: &str) -> Result<RawRows, MassPlaneError> {
    let lit = Literal::parse(text)?;
    let invalid = |what: &Literal| MassPlaneError::LiteralParse(format!("direct entry {what:?}"));
    let items = lit.as_sequence().ok_or_else(|| invalid(&lit))?;

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let pair = item
            .as_sequence()
            .filter(|p| p.len() == 2)
            .ok_or_else(|| invalid(item))?;
        let key = point_key(&pair[0]).ok_or_else(|| invalid(&pair[0]))?;
        let value = pair[1].as_f64().ok_or_else(|| invalid(&pair[1]))?;
        entries.push((key, value));
    }
    keyed_rows(entries, "direct source")
}

pub(crate) struct DirectReader;

impl SourceReader for DirectReader {
    fn read(&self, spec: &SourceSpec, _ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        match &spec.direct {
            Some(DirectData::Rows(rows)) => Ok(RawRows::Columns(rows.clone())),
            Some(DirectData::Literal(text)) => literal_entries(text),
            None => Err(MassPlaneError::MissingObject("direct source without data".into())),
        }
    }
}

#[cfg(test)]
mod direct_test {
    use super::*;
    use crate::axes::BranchMasses;

    #[test]
    fn test_literal_entries() {
        let rows = literal_entries("[[(500, 100), 1.5], [(600, 100), 0.5]]").unwrap();
        assert_eq!(
            rows,
            RawRows::Columns(vec![vec![500.0, 100.0, 1.5], vec![600.0, 100.0, 0.5]])
        );

        let rows = literal_entries("[[[[500, 100], [500, 100]], 1.2]]").unwrap();
        let RawRows::MassKeyed(rows) = rows else {
            panic!("expected mass-keyed rows");
        };
        assert_eq!(rows[0].value, 1.2);
        assert_eq!(rows[0].masses[0], BranchMasses::masses(&[500.0, 100.0]));

        assert!(literal_entries("[[1, 2, 3]]").is_err());
    }
}
