//! Annotation primitives and the annotation file format.
//!
//! Annotations are drawn in one coordinate space and carried into the other
//! by an [`AnnotationMapper`]. The file helpers keep every field of the input
//! entries and attach the mapped geometry under `mapped_shape`.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::geometry::{Direction, Point2D, Space};
use crate::mapper::AnnotationMapper;

/// A labelled shape, as found in an annotation file entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default)]
    pub label: String,
    #[serde(flatten)]
    pub shape: Shape,
}

impl Annotation {
    pub fn new(label: impl Into<String>, shape: Shape) -> Self {
        Self {
            label: label.into(),
            shape,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Point { x: f64, y: f64 },
    /// Two opposite corners in any order.
    Rectangle { x1: f64, y1: f64, x2: f64, y2: f64 },
    Circle { center_x: f64, center_y: f64, radius: f64 },
    Polygon { points: Vec<Point2D> },
}

impl Shape {
    pub const TAGS: [&'static str; 4] = ["point", "rectangle", "circle", "polygon"];

    pub fn tag(&self) -> &'static str {
        match self {
            Shape::Point { .. } => "point",
            Shape::Rectangle { .. } => "rectangle",
            Shape::Circle { .. } => "circle",
            Shape::Polygon { .. } => "polygon",
        }
    }
}

/// One entry of an annotation list. Entries that cannot be mapped are kept
/// as values so a batch can report them by position.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationEntry {
    Known(Annotation),
    /// A `type` tag this crate does not map.
    Unsupported { tag: String, label: String },
    /// A known tag whose fields are missing or ill-typed.
    Malformed { tag: String, label: String, reason: String },
}

impl AnnotationEntry {
    /// Interpret a raw JSON entry without failing.
    pub fn parse(value: &Value) -> Self {
        let tag = value.get("type").and_then(Value::as_str).unwrap_or_default();
        let label = || {
            value
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        if !Shape::TAGS.contains(&tag) {
            return AnnotationEntry::Unsupported {
                tag: tag.to_string(),
                label: label(),
            };
        }
        match Annotation::deserialize(value) {
            Ok(annotation) => AnnotationEntry::Known(annotation),
            Err(e) => AnnotationEntry::Malformed {
                tag: tag.to_string(),
                label: label(),
                reason: e.to_string(),
            },
        }
    }

    /// Like [`AnnotationEntry::parse`], but a known tag with missing or
    /// malformed fields is an error.
    pub fn from_value(value: &Value) -> Result<Self> {
        match Self::parse(value) {
            AnnotationEntry::Malformed { tag, reason, .. } => {
                Err(Error::MalformedAnnotation { tag, reason })
            }
            entry => Ok(entry),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AnnotationEntry::Known(a) => &a.label,
            AnnotationEntry::Unsupported { label, .. } | AnnotationEntry::Malformed { label, .. } => {
                label
            }
        }
    }
}

impl From<Annotation> for AnnotationEntry {
    fn from(annotation: Annotation) -> Self {
        AnnotationEntry::Known(annotation)
    }
}

/// The geometry of an annotation after mapping into `space`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedShape {
    pub label: String,
    pub space: Space,
    #[serde(flatten)]
    pub geometry: MappedGeometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MappedGeometry {
    Point {
        point: Point2D,
    },
    /// A rectangle becomes a general quadrilateral, TL/TR/BR/BL of the input
    /// rectangle in order.
    Quadrilateral {
        points: [Point2D; 4],
        original: [f64; 4],
    },
    /// A circle becomes an ellipse approximated by its mapped boundary.
    Ellipse {
        center: Point2D,
        boundary_points: Vec<Point2D>,
        original: CircleOrigin,
    },
    Polygon {
        points: Vec<Point2D>,
        original: Vec<Point2D>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CircleOrigin {
    pub center: Point2D,
    pub radius: f64,
}

/// Counts reported by [`map_annotation_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FileMappingSummary {
    pub mapped: usize,
    pub skipped: usize,
}

/// Map every entry of an annotation file and write the result to `output`.
///
/// Each written entry keeps its input fields and gains `mapped_shape` and
/// `mapped: true`; the document gains a top-level `transform_file`. Entries
/// that cannot be mapped are dropped and counted as skipped.
pub fn map_annotation_file(
    mapper: &AnnotationMapper<'_>,
    transform_path: impl AsRef<Path>,
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    direction: Direction,
) -> Result<FileMappingSummary> {
    let input = input.as_ref();
    let mut document: Map<String, Value> = serde_json::from_str(&fs::read_to_string(input)?)?;

    let mut raw = match document.remove("annotations") {
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(Error::Json(serde::de::Error::custom(
                "`annotations` must be an array",
            )))
        }
        None => Vec::new(),
    };

    let entries: Vec<AnnotationEntry> = raw.iter().map(AnnotationEntry::parse).collect();
    let batch = mapper.map_annotation_batch(&entries, direction);
    let summary = FileMappingSummary {
        mapped: batch.mapped.len(),
        skipped: batch.skipped.len(),
    };

    let mut written = Vec::with_capacity(batch.mapped.len());
    for (index, shape) in batch.mapped {
        let mut value = std::mem::take(&mut raw[index]);
        if let Value::Object(fields) = &mut value {
            fields.insert("mapped_shape".into(), serde_json::to_value(&shape)?);
            fields.insert("mapped".into(), Value::Bool(true));
        }
        written.push(value);
    }

    document.insert(
        "transform_file".into(),
        Value::String(transform_path.as_ref().display().to_string()),
    );
    document.insert("annotations".into(), Value::Array(written));

    fs::write(output.as_ref(), serde_json::to_string_pretty(&document)?)?;
    log::info!(
        "mapped {} annotations from {} ({} skipped)",
        summary.mapped,
        input.display(),
        summary.skipped
    );
    Ok(summary)
}
