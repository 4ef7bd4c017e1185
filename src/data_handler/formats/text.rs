//! Whitespace-separated text grids (`txt`) and the legacy efficiency format (`effi`).
use std::fs;

use crate::{
    constants::{RawRow, EFFI_ZERO_SIGMAS},
    data_handler::{
        context::IngestionContext,
        formats::{numeric_fields, RawRows, SourceReader},
        trimming::trim_rows,
        SourceSpec,
    },
    massplane_errors::MassPlaneError,
};

/// Numeric rows of a text file; `#` starts a comment, non-numeric lines are skipped.
pub(crate) fn read_text_rows(content: &str) -> Vec<RawRow> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .filter_map(numeric_fields)
        .collect()
}

pub(crate) struct TxtReader;

impl SourceReader for TxtReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let rows = read_text_rows(&fs::read_to_string(path)?);
        Ok(RawRows::Columns(trim_rows(rows, path.as_str(), ctx)))
    }
}

/// Legacy efficiency tables: `coordinates…, efficiency, error`.
///
/// An efficiency below `4·error` is compatible with zero and set to zero; the error column is
/// dropped.
pub(crate) struct EffiReader;

impl SourceReader for EffiReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let mut rows = Vec::new();
        for mut row in read_text_rows(&fs::read_to_string(path)?) {
            if row.len() < 3 {
                ctx.warn_once(format!("{path}: effi rows need coordinates, efficiency and error"));
                continue;
            }
            let error = row.pop().unwrap_or(0.0);
            if let Some(efficiency) = row.last_mut() {
                if *efficiency < EFFI_ZERO_SIGMAS * error {
                    *efficiency = 0.0;
                }
            }
            rows.push(row);
        }
        Ok(RawRows::Columns(trim_rows(rows, path.as_str(), ctx)))
    }
}
