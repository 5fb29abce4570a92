use crate::error::{Error, Result};
use crate::geometry::{collinear, cross, Corner, Point2D, Quadrilateral};

/// Order four points into a top-left, top-right, bottom-right, bottom-left
/// quadrilateral by their position relative to the centroid.
///
/// A point is "left" when `x <= cx` and "top" when `y <= cy`. Every corner
/// must be claimed by exactly one point; any three collinear points are
/// rejected before assignment.
pub fn order_quadrant(points: &[Point2D; 4]) -> Result<Quadrilateral> {
    reject_collinear(points)?;

    let cx = points.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / 4.0;

    let mut slots: [Option<Point2D>; 4] = [None; 4];
    for p in points {
        let corner = Corner::from_halves(p.y <= cy, p.x <= cx);
        let slot = &mut slots[corner.index()];
        if let Some(first) = *slot {
            return Err(Error::AmbiguousQuadrant {
                corner,
                first,
                second: *p,
            });
        }
        *slot = Some(*p);
    }

    match slots {
        [Some(tl), Some(tr), Some(br), Some(bl)] => Quadrilateral::new([tl, tr, br, bl]),
        _ => unreachable!("four points without a shared slot fill all four slots"),
    }
}

fn reject_collinear(points: &[Point2D; 4]) -> Result<()> {
    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    for [a, b, c] in TRIPLES {
        let (pa, pb, pc) = (&points[a], &points[b], &points[c]);
        if collinear(pa, pb, pc) {
            return Err(Error::DegenerateQuadrilateral {
                area: cross(pa, pb, pc).abs() / 2.0,
                min_area: 0.0,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn orders_axis_aligned_rectangle() {
        let q = order_quadrant(&[p(100.0, 80.0), p(0.0, 0.0), p(0.0, 80.0), p(100.0, 0.0)]).unwrap();
        assert_eq!(q.corners(), &[p(0.0, 0.0), p(100.0, 0.0), p(100.0, 80.0), p(0.0, 80.0)]);
    }

    #[test]
    fn order_is_permutation_invariant() {
        let logical = [p(12.0, 30.0), p(410.0, 5.0), p(395.0, 620.0), p(20.0, 600.0)];
        let expected = order_quadrant(&logical).unwrap();

        // All 24 permutations of four indices
        let mut perms = Vec::new();
        for a in 0..4 {
            for b in 0..4 {
                for c in 0..4 {
                    for d in 0..4 {
                        let idx = [a, b, c, d];
                        let mut seen = [false; 4];
                        idx.iter().for_each(|&i| seen[i] = true);
                        if seen.iter().all(|&s| s) {
                            perms.push(idx);
                        }
                    }
                }
            }
        }
        assert_eq!(perms.len(), 24);

        for idx in perms {
            let shuffled = idx.map(|i| logical[i]);
            let q = order_quadrant(&shuffled).unwrap();
            assert_eq!(q, expected, "permutation {idx:?}");
        }
    }

    #[test]
    fn ties_break_toward_top_left() {
        // A kite whose top vertex sits exactly on the centroid's x
        let q = order_quadrant(&[p(50.0, 0.0), p(110.0, 10.0), p(90.0, 100.0), p(-50.0, 90.0)])
            .unwrap();
        assert_eq!(q.corner(Corner::TopLeft), p(50.0, 0.0));
    }

    #[test]
    fn two_points_in_one_quadrant_is_ambiguous() {
        // Diamond: the top and left vertices both fall in the top-left half-planes.
        let err = order_quadrant(&[p(50.0, 0.0), p(100.0, 50.0), p(50.0, 100.0), p(0.0, 50.0)])
            .unwrap_err();
        match err {
            Error::AmbiguousQuadrant { corner, first, second } => {
                assert_eq!(corner, Corner::TopLeft);
                assert_eq!(first, p(50.0, 0.0));
                assert_eq!(second, p(0.0, 50.0));
            }
            other => panic!("expected AmbiguousQuadrant, got {other:?}"),
        }
    }

    #[test]
    fn collinear_triple_is_degenerate() {
        let err = order_quadrant(&[p(0.0, 0.0), p(50.0, 0.0), p(100.0, 0.0), p(50.0, 100.0)])
            .unwrap_err();
        assert!(
            matches!(err, Error::DegenerateQuadrilateral { area, .. } if area.abs() < 1e-9),
            "got {err:?}"
        );
    }
}
