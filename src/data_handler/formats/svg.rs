//! Exclusion lines drawn as an SVG `<path>` (`svg`).
//!
//! The document is resolved with `usvg`: comments and `<defs>` are ignored, group transforms
//! are applied and every path command is reduced to move, line, quadratic and cubic segments.
//! The first path of the file (or the one whose `id` is the object name) is read; curves are
//! sampled at [`CURVE_SAMPLES`] points. Pixel coordinates are mapped to plot coordinates
//! through an optional [`SvgCalibration`].
use std::fs;

use serde::{Deserialize, Serialize};
use usvg::{
    tiny_skia_path::{PathSegment, Point},
    Group, Node, Options, Transform, Tree,
};

use crate::{
    constants::RawRow,
    data_handler::{
        context::IngestionContext,
        formats::{RawRows, SourceReader},
        SourceSpec,
    },
    massplane_errors::MassPlaneError,
};

/// Points kept per Bézier segment, its end point included.
pub const CURVE_SAMPLES: usize = 8;

/// Linear (or logarithmic) map between two reference pixels and their plot values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub pixels: (f64, f64),
    pub values: (f64, f64),
    pub log: bool,
}

impl AxisCalibration {
    pub fn linear(pixels: (f64, f64), values: (f64, f64)) -> Self {
        AxisCalibration {
            pixels,
            values,
            log: false,
        }
    }

    pub fn log(pixels: (f64, f64), values: (f64, f64)) -> Self {
        AxisCalibration {
            pixels,
            values,
            log: true,
        }
    }

    pub fn apply(&self, pixel: f64) -> f64 {
        let t = (pixel - self.pixels.0) / (self.pixels.1 - self.pixels.0);
        if self.log {
            let (a, b) = (self.values.0.log10(), self.values.1.log10());
            10f64.powf(a + t * (b - a))
        } else {
            self.values.0 + t * (self.values.1 - self.values.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SvgCalibration {
    pub x: AxisCalibration,
    pub y: AxisCalibration,
}

/// First path of `group` in document order, or the one with the given `id`.
fn find_path<'a>(group: &'a Group, id: Option<&str>) -> Option<&'a usvg::Path> {
    group.children().iter().find_map(|node| match node {
        Node::Path(path) if id.is_none_or(|id| path.id() == id) => Some(path.as_ref()),
        Node::Group(group) => find_path(group, id),
        _ => None,
    })
}

fn mapped(transform: &Transform, point: Point) -> (f64, f64) {
    let mut point = point;
    transform.map_point(&mut point);
    (point.x as f64, point.y as f64)
}

/// Vertices of a resolved path in document coordinates.
fn path_points(path: &usvg::Path) -> Vec<(f64, f64)> {
    let transform = path.abs_transform();
    let mut points = Vec::new();
    let mut current = Point::zero();
    let mut start = Point::zero();

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                start = p;
                current = p;
                points.push(mapped(&transform, p));
            }
            PathSegment::LineTo(p) => {
                current = p;
                points.push(mapped(&transform, p));
            }
            PathSegment::QuadTo(c, p) => {
                for i in 1..=CURVE_SAMPLES {
                    let t = i as f32 / CURVE_SAMPLES as f32;
                    let s = 1.0 - t;
                    let q = Point::from_xy(
                        s * s * current.x + 2.0 * s * t * c.x + t * t * p.x,
                        s * s * current.y + 2.0 * s * t * c.y + t * t * p.y,
                    );
                    points.push(mapped(&transform, q));
                }
                current = p;
            }
            PathSegment::CubicTo(c1, c2, p) => {
                for i in 1..=CURVE_SAMPLES {
                    let t = i as f32 / CURVE_SAMPLES as f32;
                    let s = 1.0 - t;
                    let (a, b, c, d) = (s * s * s, 3.0 * s * s * t, 3.0 * s * t * t, t * t * t);
                    let q = Point::from_xy(
                        a * current.x + b * c1.x + c * c2.x + d * p.x,
                        a * current.y + b * c1.y + c * c2.y + d * p.y,
                    );
                    points.push(mapped(&transform, q));
                }
                current = p;
            }
            PathSegment::Close => {
                current = start;
                points.push(mapped(&transform, start));
            }
        }
    }
    points
}

/// Vertices of the selected path of an SVG document.
pub(crate) fn document_points(
    content: &str,
    id: Option<&str>,
) -> Result<Vec<(f64, f64)>, MassPlaneError> {
    let tree = Tree::from_str(content, &Options::default())
        .map_err(|e| MassPlaneError::SvgParse(e.to_string()))?;
    let path = find_path(tree.root(), id).ok_or_else(|| {
        MassPlaneError::SvgParse(match id {
            Some(id) => format!("no <path> with id '{id}'"),
            None => "no <path>".to_string(),
        })
    })?;
    Ok(path_points(path))
}

pub(crate) struct SvgReader;

impl SourceReader for SvgReader {
    fn read(&self, spec: &SourceSpec, _ctx: &mut IngestionContext) -> Result<RawRows, MassPlaneError> {
        let path = spec.path()?;
        let content = fs::read_to_string(path)?;
        let points = document_points(&content, spec.object_name.as_deref())
            .map_err(|e| MassPlaneError::SvgParse(format!("{path}: {e}")))?;
        let rows: Vec<RawRow> = points
            .into_iter()
            .map(|(x, y)| match &spec.svg_calibration {
                Some(cal) => vec![cal.x.apply(x), cal.y.apply(y)],
                None => vec![x, y],
            })
            .collect();
        Ok(RawRows::Columns(rows))
    }
}

#[cfg(test)]
mod svg_test {
    use super::*;
    use approx::assert_relative_eq;

    fn svg(body: &str) -> String {
        format!(r#"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="400">{body}</svg>"#)
    }

    #[test]
    fn test_path_selection() {
        let content = svg(
            r#"<path id="axis" d="M 0 0 H 10" stroke="black"/>
               <g><path id="obs" d="M1,1 L2,2" stroke="red"/></g>"#,
        );
        assert_eq!(
            document_points(&content, None).unwrap(),
            vec![(0.0, 0.0), (10.0, 0.0)]
        );
        assert_eq!(
            document_points(&content, Some("obs")).unwrap(),
            vec![(1.0, 1.0), (2.0, 2.0)]
        );
        assert!(matches!(
            document_points(&content, Some("exp")),
            Err(MassPlaneError::SvgParse(_))
        ));
        assert!(document_points("<svg", None).is_err());
    }

    #[test]
    fn test_relative_commands() {
        let content = svg(r#"<path d="M 10 20 l 5 0 5 5 V 40 h -10 z" stroke="black"/>"#);
        assert_eq!(
            document_points(&content, None).unwrap(),
            vec![
                (10.0, 20.0),
                (15.0, 20.0),
                (20.0, 25.0),
                (20.0, 40.0),
                (10.0, 40.0),
                (10.0, 20.0)
            ]
        );
    }

    #[test]
    fn test_comments_and_group_transforms() {
        let content = r#"<svg><!-- old <path d="M 9 9 L 9 9"/> -->
            <g transform="translate(100,0)"><path d="M 0 0 L 10 10"/></g></svg>"#;
        assert_eq!(
            document_points(content, None).unwrap(),
            vec![(100.0, 0.0), (110.0, 10.0)]
        );
    }

    #[test]
    fn test_curves_are_sampled() {
        let content = svg(r#"<path d="M 0 0 C 0 10 10 10 10 0" stroke="black"/>"#);
        let points = document_points(&content, None).unwrap();
        assert_eq!(points.len(), 1 + CURVE_SAMPLES);
        assert_eq!(points[0], (0.0, 0.0));

        let (x, y) = points[CURVE_SAMPLES / 2];
        assert_relative_eq!(x, 5.0, epsilon = 1e-4);
        assert_relative_eq!(y, 7.5, epsilon = 1e-4);

        let (x, y) = points[CURVE_SAMPLES];
        assert_relative_eq!(x, 10.0, epsilon = 1e-4);
        assert_relative_eq!(y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_calibration() {
        let x = AxisCalibration::linear((100.0, 500.0), (0.0, 1000.0));
        assert_relative_eq!(x.apply(300.0), 500.0);
        let y = AxisCalibration::log((400.0, 0.0), (1e-3, 1e1));
        assert_relative_eq!(y.apply(200.0), 0.1, max_relative = 1e-12);
    }
}
