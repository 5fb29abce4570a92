//! Planar primitives shared by the resolver, the homography engine and the
//! annotation mapper.
//!
//! All coordinates are image pixels with the origin at the top-left and the
//! y axis pointing down. Under that convention a quadrilateral listed
//! top-left, top-right, bottom-right, bottom-left has positive shoelace area.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 2D point, serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point2D> for [f64; 2] {
    fn from(p: Point2D) -> Self {
        [p.x, p.y]
    }
}

impl From<(f64, f64)> for Point2D {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// The coordinate space a geometry value lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    Original,
    Rectified,
}

/// Mapping direction between the two spaces.
///
/// `Forward` goes original → rectified through the forward matrix, `Reverse`
/// goes rectified → original through the inverse matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn source(self) -> Space {
        match self {
            Direction::Forward => Space::Original,
            Direction::Reverse => Space::Rectified,
        }
    }

    pub fn target(self) -> Space {
        match self {
            Direction::Forward => Space::Rectified,
            Direction::Reverse => Space::Original,
        }
    }
}

/// Semantic corner slot of a [`Quadrilateral`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

impl Corner {
    /// Corners in storage order.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomRight,
        Corner::BottomLeft,
    ];

    pub fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomRight => 2,
            Corner::BottomLeft => 3,
        }
    }

    /// Corner selected by the top/left half-plane tests.
    pub fn from_halves(top: bool, left: bool) -> Self {
        match (top, left) {
            (true, true) => Corner::TopLeft,
            (true, false) => Corner::TopRight,
            (false, false) => Corner::BottomRight,
            (false, true) => Corner::BottomLeft,
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Corner::TopLeft => "top-left",
            Corner::TopRight => "top-right",
            Corner::BottomRight => "bottom-right",
            Corner::BottomLeft => "bottom-left",
        };
        f.write_str(name)
    }
}

/// Pixel extent of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether `p` lies inside `[0, width] × [0, height]`.
    pub fn contains(&self, p: &Point2D) -> bool {
        p.x >= 0.0 && p.y >= 0.0 && p.x <= self.width as f64 && p.y <= self.height as f64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Four corners in top-left, top-right, bottom-right, bottom-left order with
/// strictly positive signed area. Serialized as `[[x, y]; 4]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[Point2D; 4]", into = "[Point2D; 4]")]
pub struct Quadrilateral {
    corners: [Point2D; 4],
}

impl Quadrilateral {
    pub fn new(corners: [Point2D; 4]) -> Result<Self> {
        let area = signed_area(&corners);
        if area.is_nan() || area <= 0.0 {
            return Err(Error::DegenerateQuadrilateral {
                area,
                min_area: 0.0,
            });
        }
        Ok(Self { corners })
    }

    /// Axis-aligned rectangle `[(0,0), (w,0), (w,h), (0,h)]`.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Self::new([
            Point2D::new(0.0, 0.0),
            Point2D::new(width, 0.0),
            Point2D::new(width, height),
            Point2D::new(0.0, height),
        ])
    }

    pub fn corners(&self) -> &[Point2D; 4] {
        &self.corners
    }

    pub fn corner(&self, corner: Corner) -> Point2D {
        self.corners[corner.index()]
    }

    pub fn area(&self) -> f64 {
        signed_area(&self.corners)
    }

    pub fn top_width(&self) -> f64 {
        self.corners[0].distance(&self.corners[1])
    }

    pub fn bottom_width(&self) -> f64 {
        self.corners[3].distance(&self.corners[2])
    }

    pub fn left_height(&self) -> f64 {
        self.corners[0].distance(&self.corners[3])
    }

    pub fn right_height(&self) -> f64 {
        self.corners[1].distance(&self.corners[2])
    }

    pub fn is_convex(&self) -> bool {
        is_convex(&self.corners)
    }
}

impl TryFrom<[Point2D; 4]> for Quadrilateral {
    type Error = Error;

    fn try_from(corners: [Point2D; 4]) -> Result<Self> {
        Self::new(corners)
    }
}

impl From<Quadrilateral> for [Point2D; 4] {
    fn from(q: Quadrilateral) -> Self {
        q.corners
    }
}

/// Signed polygon area via the shoelace formula.
pub fn signed_area(points: &[Point2D]) -> f64 {
    let n = points.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area / 2.0
}

/// Z component of `(b - a) × (c - a)`.
pub fn cross(a: &Point2D, b: &Point2D, c: &Point2D) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Whether three points lie on one line, relative to the lengths involved.
pub fn collinear(a: &Point2D, b: &Point2D, c: &Point2D) -> bool {
    let scale = a.distance(b) * a.distance(c);
    if scale < 1e-12 {
        return true;
    }
    (cross(a, b, c) / scale).abs() < 1e-9
}

/// Convexity of a closed polygon with positive winding.
pub fn is_convex(points: &[Point2D]) -> bool {
    let n = points.len();
    (0..n).all(|i| cross(&points[i], &points[(i + 1) % n], &points[(i + 2) % n]) >= 0.0)
}

/// Drop every point closer than `tolerance` to an earlier kept point.
pub fn dedup_within(points: &[Point2D], tolerance: f64) -> Vec<Point2D> {
    let mut kept: Vec<Point2D> = Vec::with_capacity(points.len());
    for p in points {
        if kept.iter().all(|k| k.distance(p) >= tolerance) {
            kept.push(*p);
        }
    }
    kept
}

/// Intersection of the infinite lines through `(a0, a1)` and `(b0, b1)`.
pub fn intersect_lines(a0: &Point2D, a1: &Point2D, b0: &Point2D, b1: &Point2D) -> Option<Point2D> {
    let (dax, day) = (a1.x - a0.x, a1.y - a0.y);
    let (dbx, dby) = (b1.x - b0.x, b1.y - b0.y);

    let denom = dby * dax - dbx * day;
    if denom.abs() < 1e-9 {
        return None;
    }

    let ua = (dbx * (a0.y - b0.y) - dby * (a0.x - b0.x)) / denom;
    Some(Point2D::new(a0.x + ua * dax, a0.y + ua * day))
}
