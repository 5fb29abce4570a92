#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::annotation::{
    Annotation, AnnotationEntry, CircleOrigin, MappedGeometry, MappedShape, Shape,
};
use crate::error::{Error, Result};
use crate::geometry::{Direction, Point2D};
use crate::record::TransformRecord;

pub const DEFAULT_CIRCLE_SAMPLES: usize = 16;

/// Maps annotation primitives between the original and rectified spaces of
/// one [`TransformRecord`].
#[derive(Debug, Clone, Copy)]
pub struct AnnotationMapper<'a> {
    record: &'a TransformRecord,
    circle_samples: usize,
}

/// Result of [`AnnotationMapper::map_annotation_batch`]. Indices refer to the
/// input slice.
#[derive(Debug, Default)]
pub struct BatchMapping {
    pub mapped: Vec<(usize, MappedShape)>,
    pub skipped: Vec<SkippedAnnotation>,
}

#[derive(Debug)]
pub struct SkippedAnnotation {
    pub index: usize,
    pub error: Error,
}

impl<'a> AnnotationMapper<'a> {
    pub fn new(record: &'a TransformRecord) -> Self {
        Self {
            record,
            circle_samples: DEFAULT_CIRCLE_SAMPLES,
        }
    }

    /// Number of boundary samples used when mapping circles.
    pub fn with_circle_samples(mut self, samples: usize) -> Self {
        self.circle_samples = samples;
        self
    }

    pub fn record(&self) -> &'a TransformRecord {
        self.record
    }

    pub fn map_point(&self, x: f64, y: f64, direction: Direction) -> Result<Point2D> {
        self.record.matrix(direction).map_point(x, y)
    }

    /// Map an axis-aligned rectangle given by two opposite corners. The
    /// result lists the images of TL, TR, BR, BL of the normalized rectangle.
    pub fn map_rectangle(
        &self,
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        direction: Direction,
    ) -> Result<MappedGeometry> {
        let (left, right) = (x1.min(x2), x1.max(x2));
        let (top, bottom) = (y1.min(y2), y1.max(y2));
        let points = [
            self.map_point(left, top, direction)?,
            self.map_point(right, top, direction)?,
            self.map_point(right, bottom, direction)?,
            self.map_point(left, bottom, direction)?,
        ];
        Ok(MappedGeometry::Quadrilateral {
            points,
            original: [x1, y1, x2, y2],
        })
    }

    /// Map a circle as `samples` evenly spaced boundary points starting at
    /// angle zero, plus the mapped center.
    pub fn map_circle(
        &self,
        cx: f64,
        cy: f64,
        radius: f64,
        direction: Direction,
        samples: usize,
    ) -> Result<MappedGeometry> {
        if samples < 3 {
            return Err(Error::InsufficientPoints {
                supplied: samples,
                required: 3,
            });
        }
        let step = std::f64::consts::TAU / samples as f64;
        let boundary_points = (0..samples)
            .map(|i| {
                let angle = i as f64 * step;
                self.map_point(cx + radius * angle.cos(), cy + radius * angle.sin(), direction)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MappedGeometry::Ellipse {
            center: self.map_point(cx, cy, direction)?,
            boundary_points,
            original: CircleOrigin {
                center: Point2D::new(cx, cy),
                radius,
            },
        })
    }

    pub fn map_polygon(&self, points: &[Point2D], direction: Direction) -> Result<MappedGeometry> {
        if points.len() < 3 {
            return Err(Error::InsufficientPoints {
                supplied: points.len(),
                required: 3,
            });
        }
        let mapped = points
            .iter()
            .map(|p| self.map_point(p.x, p.y, direction))
            .collect::<Result<Vec<_>>>()?;
        Ok(MappedGeometry::Polygon {
            points: mapped,
            original: points.to_vec(),
        })
    }

    pub fn map_annotation(&self, annotation: &Annotation, direction: Direction) -> Result<MappedShape> {
        let geometry = match &annotation.shape {
            Shape::Point { x, y } => MappedGeometry::Point {
                point: self.map_point(*x, *y, direction)?,
            },
            Shape::Rectangle { x1, y1, x2, y2 } => {
                self.map_rectangle(*x1, *y1, *x2, *y2, direction)?
            }
            Shape::Circle {
                center_x,
                center_y,
                radius,
            } => self.map_circle(*center_x, *center_y, *radius, direction, self.circle_samples)?,
            Shape::Polygon { points } => self.map_polygon(points, direction)?,
        };
        Ok(MappedShape {
            label: annotation.label.clone(),
            space: direction.target(),
            geometry,
        })
    }

    fn map_entry(&self, entry: &AnnotationEntry, direction: Direction) -> Result<MappedShape> {
        match entry {
            AnnotationEntry::Known(annotation) => self.map_annotation(annotation, direction),
            AnnotationEntry::Unsupported { tag, .. } => {
                Err(Error::UnsupportedAnnotationType { tag: tag.clone() })
            }
            AnnotationEntry::Malformed { tag, reason, .. } => Err(Error::MalformedAnnotation {
                tag: tag.clone(),
                reason: reason.clone(),
            }),
        }
    }

    /// Map every entry independently. A failing entry is reported in
    /// `skipped` and never aborts the rest of the batch.
    pub fn map_annotation_batch(&self, entries: &[AnnotationEntry], direction: Direction) -> BatchMapping {
        #[cfg(feature = "parallel")]
        let results: Vec<(usize, Result<MappedShape>)> = entries
            .par_iter()
            .enumerate()
            .map(|(i, e)| (i, self.map_entry(e, direction)))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let results: Vec<(usize, Result<MappedShape>)> = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, self.map_entry(e, direction)))
            .collect();

        let mut batch = BatchMapping::default();
        for (index, result) in results {
            match result {
                Ok(shape) => batch.mapped.push((index, shape)),
                Err(error) => {
                    log::warn!("annotation {index} skipped: {error}");
                    batch.skipped.push(SkippedAnnotation { index, error });
                }
            }
        }
        batch
    }
}
