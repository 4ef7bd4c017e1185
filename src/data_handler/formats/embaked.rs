//! Efficiency maps baked into a Python dict literal (`embaked`).
//!
//! ```text
//! { (500., 100.): {'SR1': 0.01, 'SR2_MET100': 0.02, '__nevents__': 10000},
//!   ... }
//! ```
//!
//! The object name selects and weights signal regions. Parsed files are cached in the ingestion
//! context, so several selections over the same file parse it once.
use std::{fs, sync::Arc};

use ahash::AHashMap;

use crate::{
    data_handler::{
        context::IngestionContext,
        formats::{keyed_rows, normalize_region, point_key, region_selection, RawRows, SourceReader},
        SourceSpec,
    },
    literal::Literal,
    massplane_errors::MassPlaneError,
};

pub(crate) struct EmbakedReader;

impl SourceReader for EmbakedReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let selection = region_selection(spec.object()?)?;

        let table = match ctx.embaked_cache.get(path) {
            Some(table) => Arc::clone(table),
            None => {
                let table = Arc::new(Literal::parse(&fs::read_to_string(path)?)?);
                ctx.embaked_cache
                    .insert(path.to_path_buf(), Arc::clone(&table));
                table
            }
        };
        let Some(points) = table.as_dict() else {
            return Err(MassPlaneError::LiteralParse(format!(
                "{path}: top level is not a dict"
            )));
        };

        let mut entries = Vec::with_capacity(points.len());
        for (key, yields) in points {
            let Some(key) = point_key(key) else {
                ctx.warn_once(format!("{path}: could not interpret key {key:?}"));
                continue;
            };
            let mut regions: AHashMap<&str, (&str, f64)> = AHashMap::new();
            for (k, v) in yields.as_dict().unwrap_or(&[]) {
                let (Some(full), Some(y)) = (k.as_str(), v.as_f64()) else {
                    continue;
                };
                let Some(region) = normalize_region(full) else {
                    continue;
                };
                // the first key of a region wins
                match regions.get(region) {
                    Some((kept, _)) => {
                        ctx.warn_once(format!(
                            "{path}: {full} and {kept} both name region {region}, keeping {kept}"
                        ));
                    }
                    None => {
                        regions.insert(region, (full, y));
                    }
                }
            }

            let mut value = 0.0;
            let mut complete = true;
            for (region, weight) in &selection {
                match regions.get(region.as_str()) {
                    Some((_, y)) => value += weight * y,
                    None => {
                        log::debug!("{path}: no {region} at {key:?}");
                        complete = false;
                        break;
                    }
                }
            }
            if complete {
                entries.push((key, value));
            }
        }
        keyed_rows(entries, path.as_str())
    }
}
