use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Point2D, Quadrilateral, Size};

const SINGULAR_EPS: f64 = 1e-10;

/// A 3x3 homography matrix, serialized as a nested row-major array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Homography {
    pub data: [[f64; 3]; 3],
}

impl Homography {
    pub const IDENTITY: Homography = Homography {
        data: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
    };

    /// Compute the homography mapping each `src[i]` onto `dst[i]`.
    ///
    /// Both point sets are Hartley-normalized before solving the 8x9 DLT
    /// system with `h22 = 1`, then the result is denormalized.
    pub fn from_correspondences(src: &[Point2D; 4], dst: &[Point2D; 4]) -> Result<Self> {
        let (src_n, t_src, _) = normalize_points(src);
        let (dst_n, _, t_dst_inv) = normalize_points(dst);

        // Build 8x9 DLT system
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (sx, sy) = (src_n[i].x, src_n[i].y);
            let (dx, dy) = (dst_n[i].x, dst_n[i].y);

            let row0 = i * 2;
            a[row0][0] = sx;
            a[row0][1] = sy;
            a[row0][2] = 1.0;
            a[row0][6] = -sx * dx;
            a[row0][7] = -sy * dx;
            a[row0][8] = dx;

            let row1 = i * 2 + 1;
            a[row1][3] = sx;
            a[row1][4] = sy;
            a[row1][5] = 1.0;
            a[row1][6] = -sx * dy;
            a[row1][7] = -sy * dy;
            a[row1][8] = dy;
        }

        // Gaussian elimination with partial pivoting (8x9 augmented)
        for col in 0..8 {
            let mut max_val = a[col][col].abs();
            let mut max_row = col;
            for row in (col + 1)..8 {
                let v = a[row][col].abs();
                if v > max_val {
                    max_val = v;
                    max_row = row;
                }
            }
            if max_val < SINGULAR_EPS {
                return Err(Error::SingularMatrix {
                    quantity: "correspondence pivot",
                    value: max_val,
                });
            }

            if max_row != col {
                a.swap(col, max_row);
            }

            let pivot = a[col][col];
            for row in (col + 1)..8 {
                let factor = a[row][col] / pivot;
                for c in col..9 {
                    a[row][c] -= factor * a[col][c];
                }
            }
        }

        // Back-substitute (h[8] = 1, solve for h[0..8])
        let mut h = [0.0f64; 9];
        h[8] = 1.0;
        for row in (0..8).rev() {
            let mut sum = a[row][8];
            for c in (row + 1)..8 {
                sum -= a[row][c] * h[c];
            }
            h[row] = sum / a[row][row];
        }

        let hn = Homography {
            data: [
                [h[0], h[1], h[2]],
                [h[3], h[4], h[5]],
                [h[6], h[7], h[8]],
            ],
        };

        // Denormalize: H = T_dst^-1 * Hn * T_src
        let h = t_dst_inv.compose(&hn).compose(&t_src);
        h.normalized()
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.data;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    /// Compute the inverse homography.
    pub fn inverse(&self) -> Result<Self> {
        let m = &self.data;
        let det = self.determinant();

        if det.abs() < SINGULAR_EPS {
            return Err(Error::SingularMatrix {
                quantity: "determinant",
                value: det,
            });
        }

        let inv_det = 1.0 / det;
        let mut inv = [[0.0f64; 3]; 3];

        inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
        inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
        inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
        inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
        inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;

        Ok(Homography { data: inv })
    }

    /// Matrix product `self * rhs` (apply `rhs` first).
    pub fn compose(&self, rhs: &Homography) -> Homography {
        let (a, b) = (&self.data, &rhs.data);
        let mut out = [[0.0f64; 3]; 3];
        for (r, row) in out.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (0..3).map(|k| a[r][k] * b[k][c]).sum();
            }
        }
        Homography { data: out }
    }

    /// Scale so that `h22 == 1`.
    pub fn normalized(&self) -> Result<Self> {
        let s = self.data[2][2];
        if s.abs() < SINGULAR_EPS {
            return Err(Error::SingularMatrix {
                quantity: "h22 scale",
                value: s,
            });
        }
        Ok(Homography {
            data: self.data.map(|row| row.map(|v| v / s)),
        })
    }

    /// Map a point through the homography, dividing out the homogeneous scale.
    pub fn map_point(&self, x: f64, y: f64) -> Result<Point2D> {
        let h = &self.data;
        let xx = h[0][0] * x + h[0][1] * y + h[0][2];
        let yy = h[1][0] * x + h[1][1] * y + h[1][2];
        let zz = h[2][0] * x + h[2][1] * y + h[2][2];
        if zz.abs() < f64::EPSILON {
            return Err(Error::SingularMatrix {
                quantity: "homogeneous scale",
                value: zz,
            });
        }
        Ok(Point2D::new(xx / zz, yy / zz))
    }

    /// Largest absolute deviation of `self * other` from the identity, after
    /// normalizing the product by its `[2][2]` entry.
    pub fn inverse_residual(&self, other: &Homography) -> f64 {
        let p = self.compose(other);
        let s = p.data[2][2];
        if s.abs() < SINGULAR_EPS {
            return f64::INFINITY;
        }
        let mut worst = 0.0f64;
        for r in 0..3 {
            for c in 0..3 {
                let expected = if r == c { 1.0 } else { 0.0 };
                worst = worst.max((p.data[r][c] / s - expected).abs());
            }
        }
        worst
    }
}

/// Translate to the centroid and scale to a mean distance of sqrt(2).
///
/// Returns the normalized points, the similarity `T` and its inverse.
fn normalize_points(pts: &[Point2D; 4]) -> ([Point2D; 4], Homography, Homography) {
    let cx = pts.iter().map(|p| p.x).sum::<f64>() / 4.0;
    let cy = pts.iter().map(|p| p.y).sum::<f64>() / 4.0;
    let mean_dist = pts.iter().map(|p| (p.x - cx).hypot(p.y - cy)).sum::<f64>() / 4.0;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Homography {
        data: [[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]],
    };
    let t_inv = Homography {
        data: [[1.0 / s, 0.0, cx], [0.0, 1.0 / s, cy], [0.0, 0.0, 1.0]],
    };
    let out = pts.map(|p| Point2D::new(s * (p.x - cx), s * (p.y - cy)));
    (out, t, t_inv)
}

/// How the rectified height is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeightPolicy {
    /// Keep the original image height.
    #[default]
    PassThrough,
    /// Mean of the left and right edges, stretched by the top/bottom width
    /// ratio to undo vertical foreshortening.
    AspectNormalized,
    /// A caller-chosen height.
    Fixed(u32),
}

impl HeightPolicy {
    pub fn height(&self, source: &Quadrilateral, original: Size) -> u32 {
        match *self {
            HeightPolicy::PassThrough => original.height,
            HeightPolicy::AspectNormalized => {
                let (top, bottom) = (source.top_width(), source.bottom_width());
                let w_min = top.min(bottom);
                let aspect = if w_min > 0.0 { top.max(bottom) / w_min } else { 1.0 };
                let mean_side = (source.left_height() + source.right_height()) / 2.0;
                (mean_side * aspect).round() as u32
            }
            HeightPolicy::Fixed(h) => h,
        }
    }
}

/// Rectified width: the longer of the top and bottom edges, rounded.
pub fn destination_width(source: &Quadrilateral) -> u32 {
    source.top_width().max(source.bottom_width()).round() as u32
}

/// Forward and inverse transforms between a source quadrilateral and its
/// axis-aligned destination rectangle.
#[derive(Debug, Clone, Copy)]
pub struct PlanarTransform {
    /// Original → rectified.
    pub forward: Homography,
    /// Rectified → original.
    pub inverse: Homography,
    pub destination: Quadrilateral,
    pub rectified_size: Size,
}

/// Compute the transform from `source` onto a `W x height` rectangle.
pub fn compute_transform(source: &Quadrilateral, height: u32) -> Result<PlanarTransform> {
    let width = destination_width(source);
    if width == 0 || height == 0 {
        return Err(Error::DegenerateQuadrilateral {
            area: width as f64 * height as f64,
            min_area: 0.0,
        });
    }

    let destination = Quadrilateral::rectangle(width as f64, height as f64)?;
    let forward = Homography::from_correspondences(source.corners(), destination.corners())?;
    let inverse = forward.inverse()?.normalized()?;

    log::debug!(
        "homography det {:.3e}, rectified {}x{}",
        forward.determinant(),
        width,
        height
    );

    Ok(PlanarTransform {
        forward,
        inverse,
        destination,
        rectified_size: Size::new(width, height),
    })
}
