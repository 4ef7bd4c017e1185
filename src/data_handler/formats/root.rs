//! ROOT sources: histograms, graphs and trees (`root`), and canvas primitives (`canvas`).
//!
//! Decoding is delegated to the [`RootReader`](crate::data_handler::RootReader)s of the
//! context. A tree is addressed as `tree:selection`, where `selection` picks and weights
//! its signal-region branches (`effs:[('SR1', 0.5), ('SR2', 0.5)]`); its other branches are the
//! coordinate columns, in tree order.
use std::sync::Arc;

use camino::Utf8Path;

use crate::{
    constants::RawRow,
    data_handler::{
        context::{IngestionContext, RootObject, Tree, TreeKey},
        formats::{normalize_region, region_selection, RawRows, SourceReader},
        trimming::{histogram_rows, trim_rows},
        SourceSpec,
    },
    massplane_errors::MassPlaneError,
};

/// Rows of a histogram or graph object.
fn object_rows(
    object: RootObject,
    source: &str,
    ctx: &mut IngestionContext,
) -> Result<Vec<RawRow>, MassPlaneError> {
    match object {
        RootObject::Histogram(hist) => Ok(histogram_rows(&hist, source, ctx)),
        RootObject::Graph(points) | RootObject::Graph2D(points) => Ok(points),
        RootObject::Tree(_) => Err(MassPlaneError::UnexpectedRootObject(format!(
            "{source} is a tree; address it as tree:selection"
        ))),
    }
}

/// Fill the points cache with every signal region of `tree`.
///
/// Each cached row holds the coordinate branches followed by the region's value.
fn cache_tree_points(path: &Utf8Path, tree_name: &str, tree: &Tree, ctx: &mut IngestionContext) {
    let (regions, coordinates): (Vec<_>, Vec<_>) = tree
        .branches
        .iter()
        .partition(|(name, _)| normalize_region(name).is_some());
    let nrows = tree
        .branches
        .iter()
        .map(|(_, values)| values.len())
        .min()
        .unwrap_or(0);

    for (name, values) in regions {
        let Some(region) = normalize_region(name) else {
            continue;
        };
        let rows: Vec<RawRow> = (0..nrows)
            .map(|i| {
                let mut row: RawRow = coordinates.iter().map(|(_, c)| c[i]).collect();
                row.push(values[i]);
                row
            })
            .collect();
        ctx.tree_cache.insert(
            (path.to_path_buf(), tree_name.to_string(), region.to_string()),
            Arc::new(rows),
        );
    }
    log::debug!("{path}:{tree_name}: cached {nrows} points per signal region");
}

fn read_tree(
    path: &Utf8Path,
    tree_name: &str,
    selection: &str,
    ctx: &mut IngestionContext,
) -> Result<Vec<RawRow>, MassPlaneError> {
    let selection = region_selection(selection)?;
    let key = |region: &str| -> TreeKey {
        (path.to_path_buf(), tree_name.to_string(), region.to_string())
    };

    if selection
        .iter()
        .any(|(region, _)| !ctx.tree_cache.contains_key(&key(region)))
    {
        match ctx.read_root_object(path, tree_name)? {
            RootObject::Tree(tree) => cache_tree_points(path, tree_name, &tree, ctx),
            other => {
                return Err(MassPlaneError::UnexpectedRootObject(format!(
                    "{path}:{tree_name} is a {}, not a tree",
                    other.kind()
                )))
            }
        }
    }

    let mut combined: Option<Vec<RawRow>> = None;
    for (region, weight) in &selection {
        let Some(points) = ctx.tree_cache.get(&key(region)) else {
            return Err(MassPlaneError::RootRead(format!(
                "{path}:{tree_name} has no branch {region}"
            )));
        };
        match combined.as_mut() {
            None => {
                combined = Some(
                    points
                        .iter()
                        .map(|row| {
                            let mut row = row.clone();
                            if let Some(v) = row.last_mut() {
                                *v *= weight;
                            }
                            row
                        })
                        .collect(),
                )
            }
            Some(rows) => {
                for (row, cached) in rows.iter_mut().zip(points.iter()) {
                    if let (Some(v), Some(c)) = (row.last_mut(), cached.last()) {
                        *v += weight * c;
                    }
                }
            }
        }
    }
    Ok(combined.unwrap_or_default())
}

pub(crate) struct RootFileReader;

impl SourceReader for RootFileReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let object = spec.object()?;
        let source = format!("{path}:{object}");

        let rows = match object.split_once(':') {
            Some((tree, selection)) => {
                let rows = read_tree(path, tree.trim(), selection, ctx)?;
                trim_rows(rows, &source, ctx)
            }
            None => {
                let object = ctx.read_root_object(path, object)?;
                object_rows(object, &source, ctx)?
            }
        };
        Ok(RawRows::Columns(rows))
    }
}

/// The `index`-th primitive (default 0) drawn on a canvas.
pub(crate) struct CanvasReader;

impl SourceReader for CanvasReader {
    fn read(&self, spec: &SourceSpec, ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let canvas = spec.object()?;
        let index = spec.index.unwrap_or(0);
        let mut primitives = ctx.read_canvas(path, canvas)?;
        if index >= primitives.len() {
            return Err(MassPlaneError::RootRead(format!(
                "{path}:{canvas} has {} primitives, no index {index}",
                primitives.len()
            )));
        }
        let object = primitives.swap_remove(index);
        let rows = object_rows(object, &format!("{path}:{canvas}[{index}]"), ctx)?;
        Ok(RawRows::Columns(rows))
    }
}
