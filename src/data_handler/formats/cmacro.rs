//! Points of `SetPoint` calls in a ROOT C macro (`cMacro`).
use std::{fs, sync::LazyLock};

use regex::Regex;

use crate::{
    constants::RawRow,
    data_handler::{
        context::IngestionContext,
        formats::{RawRows, SourceReader},
        SourceSpec,
    },
    massplane_errors::MassPlaneError,
};

static SET_POINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?P<object>\w+)\s*->\s*SetPoint\s*\(\s*[^,()]+,(?P<args>[^()]*)\)",
    )
    .expect("valid SetPoint regex")
});

/// Extract the `SetPoint(i, x, y[, z])` coordinates, optionally restricted to one object.
pub(crate) fn set_points(content: &str, object: Option<&str>) -> Vec<RawRow> {
    SET_POINT
        .captures_iter(content)
        .filter(|c| object.is_none_or(|o| &c["object"] == o))
        .filter_map(|c| {
            c["args"]
                .split(',')
                .map(|a| a.trim().parse::<f64>().ok())
                .collect::<Option<RawRow>>()
        })
        .filter(|row| (2..=3).contains(&row.len()))
        .collect()
}

pub(crate) struct CMacroReader;

impl SourceReader for CMacroReader {
    fn read(&self, spec: &SourceSpec, _ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let content = fs::read_to_string(path)?;
        let rows = set_points(&content, spec.object_name.as_deref());
        if rows.is_empty() {
            log::warn!("{path}: no SetPoint call found");
        }
        Ok(RawRows::Columns(rows))
    }
}
