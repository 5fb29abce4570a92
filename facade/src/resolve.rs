//! Corner resolution: turn a loose set of marked points into one ordered
//! quadrilateral.
//!
//! The strategy is picked from the shape of the input: four points are
//! classified directly, three points get their missing corner inferred, larger
//! sets are pruned through their convex hull, and edge markers are intersected
//! pairwise. Every path ends in the same area check.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::classify::order_quadrant;
use crate::diagnostics::{record, Diagnostic};
use crate::error::{Error, Result};
use crate::geometry::{dedup_within, intersect_lines, Point2D, Quadrilateral};
use crate::hull::convex_hull;

/// Resolver tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Points closer than this (pixels) are treated as one.
    pub dedup_tolerance: f64,
    /// The resolved quadrilateral must have a larger area than this.
    pub min_area: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dedup_tolerance: 5.0,
            min_area: 1000.0,
        }
    }
}

/// Which construction produced the quadrilateral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    FourPoints,
    ThreePoints,
    Hull,
    EdgePairs,
}

/// Two points on each facade edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeMarkers {
    pub top: [Point2D; 2],
    pub bottom: [Point2D; 2],
    pub left: [Point2D; 2],
    pub right: [Point2D; 2],
}

impl EdgeMarkers {
    /// Build from eight points given as top, bottom, left, right pairs.
    pub fn from_sequence(points: &[Point2D]) -> Result<Self> {
        let &[t0, t1, b0, b1, l0, l1, r0, r1] = points else {
            return Err(Error::InsufficientPoints {
                supplied: points.len(),
                required: 8,
            });
        };
        Ok(Self {
            top: [t0, t1],
            bottom: [b0, b1],
            left: [l0, l1],
            right: [r0, r1],
        })
    }

    /// Corners at the edge-line intersections, in TL, TR, BR, BL order.
    pub fn corners(&self) -> Option<[Point2D; 4]> {
        let meet = |a: &[Point2D; 2], b: &[Point2D; 2]| intersect_lines(&a[0], &a[1], &b[0], &b[1]);
        Some([
            meet(&self.top, &self.left)?,
            meet(&self.top, &self.right)?,
            meet(&self.bottom, &self.right)?,
            meet(&self.bottom, &self.left)?,
        ])
    }
}

/// Raw corner input as supplied by a point-acquisition surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CornerInput {
    Points(Vec<Point2D>),
    Edges(EdgeMarkers),
}

/// Anything that can hand over marked points: an interactive UI, a recorded
/// fixture, a test.
pub trait PointSource {
    fn corner_input(&self) -> Result<CornerInput>;
}

impl PointSource for CornerInput {
    fn corner_input(&self) -> Result<CornerInput> {
        Ok(self.clone())
    }
}

impl PointSource for [Point2D] {
    fn corner_input(&self) -> Result<CornerInput> {
        Ok(CornerInput::Points(self.to_vec()))
    }
}

/// A recorded point set stored as JSON, either `{"points": [[x, y], ...]}`
/// or `{"edges": {"top": [[x, y], [x, y]], ...}}`.
#[derive(Debug, Clone)]
pub struct PointFixture {
    input: CornerInput,
}

impl PointFixture {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(Self {
            input: serde_json::from_str(json)?,
        })
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

impl PointSource for PointFixture {
    fn corner_input(&self) -> Result<CornerInput> {
        Ok(self.input.clone())
    }
}

/// A resolved quadrilateral with the construction that produced it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub quad: Quadrilateral,
    pub strategy: Strategy,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolve any corner input.
pub fn resolve(input: &CornerInput, config: &ResolverConfig) -> Result<Resolution> {
    match input {
        CornerInput::Points(points) => resolve_corners(points, config),
        CornerInput::Edges(edges) => resolve_edges(edges, config),
    }
}

/// Resolve three or more marked points into a quadrilateral.
///
/// `InsufficientPoints::supplied` reports the number of distinct points when
/// de-duplication leaves fewer than three.
pub fn resolve_corners(points: &[Point2D], config: &ResolverConfig) -> Result<Resolution> {
    if points.len() < 3 {
        return Err(Error::InsufficientPoints {
            supplied: points.len(),
            required: 3,
        });
    }

    let mut diagnostics = Vec::new();
    let unique = dedup_within(points, config.dedup_tolerance);
    if unique.len() < points.len() {
        record(
            &mut diagnostics,
            Diagnostic::DuplicatesMerged {
                removed: points.len() - unique.len(),
            },
        );
    }

    log::debug!("resolving {} distinct of {} points", unique.len(), points.len());

    let (quad, strategy) = match unique.len() {
        0..=2 => {
            return Err(Error::InsufficientPoints {
                supplied: unique.len(),
                required: 3,
            })
        }
        3 => (classify_candidates(&unique, config, &mut diagnostics)?, Strategy::ThreePoints),
        4 => (classify_candidates(&unique, config, &mut diagnostics)?, Strategy::FourPoints),
        _ => (select_from_hull(&unique, config, &mut diagnostics)?, Strategy::Hull),
    };

    finish(quad, strategy, config, diagnostics)
}

/// Resolve edge markers by intersecting the four edge lines.
pub fn resolve_edges(edges: &EdgeMarkers, config: &ResolverConfig) -> Result<Resolution> {
    let corners = edges.corners().ok_or(Error::DegenerateQuadrilateral {
        area: 0.0,
        min_area: config.min_area,
    })?;
    let quad = Quadrilateral::new(corners).map_err(|e| with_min_area(e, config))?;
    finish(quad, Strategy::EdgePairs, config, Vec::new())
}

/// Infer the fourth corner of three points sorted top to bottom.
///
/// With `top`, `middle`, `bottom` ordered by ascending y, the missing corner
/// completes the parallelogram opposite `bottom`, on the row of `top`: right of
/// `top` when `top.x <= middle.x`, left otherwise.
pub fn infer_fourth_corner(points: &[Point2D; 3]) -> Point2D {
    let mut sorted = *points;
    sorted.sort_by(|a, b| a.y.total_cmp(&b.y));
    let [top, middle, bottom] = sorted;
    Point2D::new(top.x + (middle.x - bottom.x), top.y)
}

/// Classify 3 or 4 candidate corners; anything else is degenerate.
fn classify_candidates(
    candidates: &[Point2D],
    config: &ResolverConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Quadrilateral> {
    let result = match *candidates {
        [a, b, c] => {
            let corner = infer_fourth_corner(&[a, b, c]);
            record(diagnostics, Diagnostic::CornerInferred { corner });
            order_quadrant(&[a, b, c, corner])
        }
        [a, b, c, d] => order_quadrant(&[a, b, c, d]),
        _ => Err(Error::DegenerateQuadrilateral {
            area: 0.0,
            min_area: config.min_area,
        }),
    };
    result.map_err(|e| with_min_area(e, config))
}

/// Pick four corners from more than four distinct points via the convex hull.
fn select_from_hull(
    points: &[Point2D],
    config: &ResolverConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Quadrilateral> {
    let hull = convex_hull(points);
    if hull.len() < points.len() {
        record(
            diagnostics,
            Diagnostic::InteriorPointsDiscarded {
                count: points.len() - hull.len(),
            },
        );
    }

    if hull.len() <= 4 {
        return classify_candidates(&hull, config, diagnostics);
    }

    // Rank hull edges by length, longest first
    let n = hull.len();
    let mut edges: Vec<(usize, f64)> = (0..n)
        .map(|i| (i, hull[i].distance(&hull[(i + 1) % n])))
        .collect();
    edges.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut endpoints: SmallVec<[Point2D; 8]> = SmallVec::new();
    for &(i, _) in edges.iter().take(4) {
        endpoints.push(hull[i]);
        endpoints.push(hull[(i + 1) % n]);
    }
    let candidates = dedup_within(&endpoints, config.dedup_tolerance);
    if candidates.len() == 4 {
        return classify_candidates(&candidates, config, diagnostics);
    }

    record(
        diagnostics,
        Diagnostic::ExtremePointFallback {
            candidates: candidates.len(),
        },
    );
    let pool = if candidates.len() > 4 { &candidates } else { &hull };
    let extremes = dedup_within(&extreme_points(pool), config.dedup_tolerance);
    classify_candidates(&extremes, config, diagnostics)
}

/// The min-y, max-y, min-x and max-x points.
///
/// Ties resolve toward the corner reached clockwise along that side: leftmost
/// on top, rightmost on the bottom, lowest on the left, highest on the right.
/// An axis-aligned side therefore contributes a true corner, and the four
/// picks stay distinct for a rectangle.
fn extreme_points(points: &[Point2D]) -> [Point2D; 4] {
    let mut ext = [points[0]; 4];
    for p in &points[1..] {
        if p.y < ext[0].y || (p.y == ext[0].y && p.x < ext[0].x) {
            ext[0] = *p;
        }
        if p.y > ext[1].y || (p.y == ext[1].y && p.x > ext[1].x) {
            ext[1] = *p;
        }
        if p.x < ext[2].x || (p.x == ext[2].x && p.y > ext[2].y) {
            ext[2] = *p;
        }
        if p.x > ext[3].x || (p.x == ext[3].x && p.y < ext[3].y) {
            ext[3] = *p;
        }
    }
    ext
}

fn finish(
    quad: Quadrilateral,
    strategy: Strategy,
    config: &ResolverConfig,
    mut diagnostics: Vec<Diagnostic>,
) -> Result<Resolution> {
    let area = quad.area();
    if area <= config.min_area {
        return Err(Error::DegenerateQuadrilateral {
            area,
            min_area: config.min_area,
        });
    }

    if !quad.is_convex() {
        record(&mut diagnostics, Diagnostic::NonConvex);
    }

    let (top, bottom) = (quad.top_width(), quad.bottom_width());
    if top.max(bottom) > 1.2 * top.min(bottom) {
        record(&mut diagnostics, Diagnostic::EdgeWidthMismatch { top, bottom });
    }

    log::debug!("resolved {:?} quad with area {area:.1}", strategy);
    Ok(Resolution {
        quad,
        strategy,
        diagnostics,
    })
}

/// Degenerate errors raised below the resolver carry no threshold; fill it in.
fn with_min_area(err: Error, config: &ResolverConfig) -> Error {
    match err {
        Error::DegenerateQuadrilateral { area, .. } => Error::DegenerateQuadrilateral {
            area,
            min_area: config.min_area,
        },
        other => other,
    }
}
