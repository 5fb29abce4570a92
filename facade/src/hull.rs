use crate::geometry::{cross, Point2D};

/// Convex hull by Andrew's monotone chain.
///
/// Returns the hull vertices with positive signed area, starting from the
/// point with the smallest x (then smallest y). Collinear boundary points are
/// dropped, so a fully collinear input yields its two extreme points.
pub fn convex_hull(points: &[Point2D]) -> Vec<Point2D> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let mut hull: Vec<Point2D> = Vec::with_capacity(pts.len() * 2);

    // Lower chain
    for p in &pts {
        while hull.len() >= 2 && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }

    // Upper chain
    let lower_len = hull.len() + 1;
    for p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len
            && cross(&hull[hull.len() - 2], &hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(*p);
    }

    // Last point repeats the first
    hull.pop();
    hull
}
