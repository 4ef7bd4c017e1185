//! Convex hull of a polygon and point-in-hull test, used to cut areas out of loaded maps.
use ordered_float::OrderedFloat;

/// Distance a point may lie outside a hull edge, relative to the edge length.
const EDGE_TOLERANCE: f64 = 1e-9;

fn cross(o: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
}

/// Counter-clockwise convex hull (Andrew's monotone chain), collinear points removed.
pub(crate) fn convex_hull(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut sorted: Vec<(f64, f64)> = points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();
    sorted.sort_by_key(|(x, y)| (OrderedFloat(*x), OrderedFloat(*y)));
    sorted.dedup();
    if sorted.len() < 3 {
        return sorted;
    }

    let reversed: Vec<(f64, f64)> = sorted.iter().rev().copied().collect();
    let mut hull: Vec<(f64, f64)> = Vec::with_capacity(2 * sorted.len());
    // lower chain, then upper chain
    for pass in [&sorted, &reversed] {
        let start = hull.len();
        for &p in pass {
            while hull.len() >= start + 2
                && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();
    }
    hull
}

/// `true` if `p` lies inside or on a counter-clockwise convex hull.
pub(crate) fn contains(hull: &[(f64, f64)], p: (f64, f64)) -> bool {
    if hull.len() < 3 {
        return false;
    }
    // cross = edge length * signed distance of p to the edge
    hull.iter().zip(hull.iter().cycle().skip(1)).all(|(a, b)| {
        let length2 = (b.0 - a.0).powi(2) + (b.1 - a.1).powi(2);
        cross(*a, *b, p) >= -EDGE_TOLERANCE * length2
    })
}
