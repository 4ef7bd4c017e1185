#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use approx::assert_relative_eq;
use camino::Utf8Path;
use massplane::{
    coordinates::Coordinates,
    data_handler::{RootObject, RootReader},
    AxisVariable, MassPlaneError,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory ROOT files, keyed by `(path, object)`.
#[derive(Default)]
pub struct MockRootReader {
    objects: HashMap<(String, String), RootObject>,
    canvases: HashMap<(String, String), Vec<RootObject>>,
    reads: Arc<AtomicUsize>,
}

impl MockRootReader {
    pub fn with_object(mut self, path: &str, name: &str, object: RootObject) -> Self {
        self.objects
            .insert((path.to_string(), name.to_string()), object);
        self
    }

    pub fn with_canvas(mut self, path: &str, name: &str, primitives: Vec<RootObject>) -> Self {
        self.canvases
            .insert((path.to_string(), name.to_string()), primitives);
        self
    }

    /// Counter of `read_object` calls, shared with the reader once it is moved into a context.
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl RootReader for MockRootReader {
    fn name(&self) -> &str {
        "mock"
    }

    fn read_object(&self, path: &Utf8Path, name: &str) -> Result<RootObject, MassPlaneError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.objects
            .get(&(path.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| MassPlaneError::RootRead(format!("{path}:{name}")))
    }

    fn canvas_objects(
        &self,
        path: &Utf8Path,
        name: &str,
    ) -> Result<Vec<RootObject>, MassPlaneError> {
        self.canvases
            .get(&(path.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| MassPlaneError::RootRead(format!("{path}:{name}")))
    }
}

pub fn assert_coordinates_close(actual: &Coordinates, expected: &Coordinates, epsilon: f64) {
    assert_eq!(
        actual.variables().collect::<Vec<AxisVariable>>(),
        expected.variables().collect::<Vec<AxisVariable>>(),
        "{actual} vs {expected}"
    );
    for (var, value) in expected.iter() {
        assert_relative_eq!(
            actual.get(var).unwrap_or(f64::NAN),
            value,
            epsilon = epsilon
        );
    }
}
