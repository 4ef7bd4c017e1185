//! ROOT files decoded in-process with `oxyroot`.
//!
//! [`OxyrootReader`] is the first reader of every [`IngestionContext`]. It decodes TTrees with
//! numeric scalar branches; histograms, graphs and canvases are left to the readers registered
//! after it, which the context tries in order.
//!
//! [`IngestionContext`]: crate::data_handler::IngestionContext
use std::fmt::Display;

use camino::Utf8Path;
use oxyroot::{Branch, RootFile};

use crate::{
    data_handler::context::{RootObject, RootReader, Tree},
    massplane_errors::MassPlaneError,
};

fn root_error(path: &Utf8Path, name: &str, e: impl Display) -> MassPlaneError {
    MassPlaneError::RootRead(format!("{path}:{name}: {e}"))
}

/// Values of a scalar numeric branch, `None` for other branch types.
fn numeric_column(branch: &Branch) -> oxyroot::Result<Option<Vec<f64>>> {
    let values = match branch.item_type_name().as_str() {
        "double" | "Double_t" => branch.as_iter::<f64>()?.collect(),
        "float" | "Float_t" => branch.as_iter::<f32>()?.map(f64::from).collect(),
        "int32_t" | "int" | "Int_t" => branch.as_iter::<i32>()?.map(f64::from).collect(),
        "uint32_t" | "unsigned int" | "UInt_t" => {
            branch.as_iter::<u32>()?.map(f64::from).collect()
        }
        "int64_t" | "long" | "Long64_t" => branch.as_iter::<i64>()?.map(|v| v as f64).collect(),
        _ => return Ok(None),
    };
    Ok(Some(values))
}

/// Native reader for the TTrees of a ROOT file.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxyrootReader;

impl RootReader for OxyrootReader {
    fn name(&self) -> &str {
        "oxyroot"
    }

    fn read_object(&self, path: &Utf8Path, name: &str) -> Result<RootObject, MassPlaneError> {
        let mut file = RootFile::open(path.as_std_path()).map_err(|e| root_error(path, name, e))?;
        let tree = file.get_tree(name).map_err(|e| root_error(path, name, e))?;

        let mut branches = Vec::new();
        for branch in tree.branches() {
            match numeric_column(branch).map_err(|e| root_error(path, name, e))? {
                Some(values) => branches.push((branch.name().to_string(), values)),
                None => log::debug!(
                    "{path}:{name}: skipping branch {} of type {}",
                    branch.name(),
                    branch.item_type_name()
                ),
            }
        }
        if branches.is_empty() {
            return Err(root_error(path, name, "no numeric branch"));
        }
        Ok(RootObject::Tree(Tree { branches }))
    }

    fn canvas_objects(
        &self,
        path: &Utf8Path,
        name: &str,
    ) -> Result<Vec<RootObject>, MassPlaneError> {
        Err(root_error(path, name, "canvases are not decoded by oxyroot"))
    }
}

#[cfg(test)]
mod root_files_test {
    use super::*;

    #[test]
    fn test_unreadable_files() {
        let reader = OxyrootReader;
        assert!(matches!(
            reader.read_object(Utf8Path::new("tests/data/missing.root"), "limits"),
            Err(MassPlaneError::RootRead(_))
        ));
        assert!(matches!(
            reader.canvas_objects(Utf8Path::new("tests/data/missing.root"), "c1"),
            Err(MassPlaneError::RootRead(_))
        ));
    }
}
