//! The persisted result of one rectification.
//!
//! A [`TransformRecord`] is validated whenever it is built or loaded, so any
//! value of the type upholds the record invariants: both matrices invertible,
//! mutually inverse, an axis-aligned destination anchored at the origin, and a
//! forward matrix that carries the source corners onto the destination.
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::{Direction, Point2D, Quadrilateral, Size};
use crate::homography::{Homography, PlanarTransform};

/// Tolerance on `forward * inverse` against the identity.
pub const INVERSE_TOLERANCE: f64 = 1e-3;
/// Tolerance on destination corner placement.
pub const AXIS_TOLERANCE: f64 = 1e-3;
/// Tolerance (pixels) on `forward(source[i]) == destination[i]`.
pub const CORNER_TOLERANCE: f64 = 0.5;

const MIN_DETERMINANT: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    source_image: String,
    original_size: Size,
    rectified_size: Size,
    source_points: Quadrilateral,
    destination_points: Quadrilateral,
    transform_matrix: Homography,
    inverse_matrix: Homography,
}

impl TransformRecord {
    pub fn new(
        source_image: impl Into<String>,
        original_size: Size,
        source: Quadrilateral,
        transform: &PlanarTransform,
    ) -> Result<Self> {
        let record = Self {
            source_image: source_image.into(),
            original_size,
            rectified_size: transform.rectified_size,
            source_points: source,
            destination_points: transform.destination,
            transform_matrix: transform.forward,
            inverse_matrix: transform.inverse,
        };
        record.validate()?;
        Ok(record)
    }

    pub fn source_image(&self) -> &str {
        &self.source_image
    }

    pub fn original_size(&self) -> Size {
        self.original_size
    }

    pub fn rectified_size(&self) -> Size {
        self.rectified_size
    }

    pub fn source_quadrilateral(&self) -> &Quadrilateral {
        &self.source_points
    }

    pub fn destination_rectangle(&self) -> &Quadrilateral {
        &self.destination_points
    }

    /// Original → rectified.
    pub fn forward_matrix(&self) -> &Homography {
        &self.transform_matrix
    }

    /// Rectified → original.
    pub fn inverse_matrix(&self) -> &Homography {
        &self.inverse_matrix
    }

    pub fn matrix(&self, direction: Direction) -> &Homography {
        match direction {
            Direction::Forward => &self.transform_matrix,
            Direction::Reverse => &self.inverse_matrix,
        }
    }

    /// Check every record invariant, naming the first violation.
    pub fn validate(&self) -> Result<()> {
        for (name, m) in [
            ("transform_matrix", &self.transform_matrix),
            ("inverse_matrix", &self.inverse_matrix),
        ] {
            if m.data.iter().flatten().any(|v| !v.is_finite()) {
                return Err(Error::corrupt(format!("{name} has non-finite entries")));
            }
            let det = m.determinant();
            if det.abs() < MIN_DETERMINANT {
                return Err(Error::corrupt(format!("{name} is singular (determinant {det:e})")));
            }
        }

        let residual = self.transform_matrix.inverse_residual(&self.inverse_matrix);
        if !(residual <= INVERSE_TOLERANCE) {
            return Err(Error::corrupt(format!(
                "matrices are not mutually inverse (residual {residual:e})"
            )));
        }

        let [tl, tr, br, bl] = *self.destination_points.corners();
        let aligned = tl.x.abs() <= AXIS_TOLERANCE
            && tl.y.abs() <= AXIS_TOLERANCE
            && tr.y.abs() <= AXIS_TOLERANCE
            && bl.x.abs() <= AXIS_TOLERANCE
            && (tr.x - br.x).abs() <= AXIS_TOLERANCE
            && (bl.y - br.y).abs() <= AXIS_TOLERANCE;
        if !aligned {
            return Err(Error::corrupt(
                "destination points are not an origin-anchored axis-aligned rectangle",
            ));
        }

        let pairs = self
            .source_points
            .corners()
            .iter()
            .zip(self.destination_points.corners());
        for (i, (src, dst)) in pairs.enumerate() {
            let mapped = self
                .transform_matrix
                .map_point(src.x, src.y)
                .map_err(|e| Error::corrupt(format!("source point {i}: {e}")))?;
            let err = mapped.distance(dst);
            if !(err <= CORNER_TOLERANCE) {
                return Err(Error::corrupt(format!(
                    "source point {i} maps {err:.3}px away from its destination"
                )));
            }
        }

        Ok(())
    }

    /// Fraction of a `samples x samples` grid over the rectified image whose
    /// back-projection falls outside the original image.
    pub fn out_of_frame_ratio(&self, samples: usize) -> f64 {
        let samples = samples.max(1);
        let (w, h) = (
            self.rectified_size.width as f64,
            self.rectified_size.height as f64,
        );
        let mut outside = 0usize;
        for j in 0..samples {
            for i in 0..samples {
                let x = (i as f64 + 0.5) / samples as f64 * w;
                let y = (j as f64 + 0.5) / samples as f64 * h;
                let inside = self
                    .inverse_matrix
                    .map_point(x, y)
                    .map(|p| self.original_size.contains(&p))
                    .unwrap_or(false);
                if !inside {
                    outside += 1;
                }
            }
        }
        outside as f64 / (samples * samples) as f64
    }

    pub fn map_point(&self, p: Point2D, direction: Direction) -> Result<Point2D> {
        self.matrix(direction).map_point(p.x, p.y)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let record: Self = serde_json::from_str(json).map_err(|e| Error::corrupt(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read and validate a record. Any defect is reported as
    /// [`Error::TransformFileCorrupt`]; nothing is repaired.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let record = Self::from_json_str(&json)?;
        log::debug!(
            "loaded transform {} ({} -> {})",
            path.display(),
            record.original_size,
            record.rectified_size
        );
        Ok(record)
    }

    /// Write the record as pretty JSON. The data goes to a temporary file in
    /// the target directory and is persisted over `path`, so readers never
    /// see a partial record.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json_string()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut file = tempfile::Builder::new()
            .prefix(".transform-")
            .suffix(".json")
            .tempfile_in(dir)?;
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| Error::Io(e.error))?;
        log::debug!("saved transform {}", path.display());
        Ok(())
    }
}
