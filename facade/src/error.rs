use thiserror::Error;

use crate::geometry::{Corner, Point2D};

#[derive(Debug, Error)]
pub enum Error {
    #[error("insufficient points: {supplied} supplied, at least {required} required")]
    InsufficientPoints { supplied: usize, required: usize },

    #[error("ambiguous quadrant: {corner} claimed by both {first} and {second}")]
    AmbiguousQuadrant {
        corner: Corner,
        first: Point2D,
        second: Point2D,
    },

    #[error("degenerate quadrilateral: area {area:.2} does not exceed minimum {min_area:.2}")]
    DegenerateQuadrilateral { area: f64, min_area: f64 },

    #[error("singular matrix: {quantity} {value:e} is too close to zero")]
    SingularMatrix { quantity: &'static str, value: f64 },

    #[error("unsupported annotation type '{tag}'")]
    UnsupportedAnnotationType { tag: String },

    #[error("malformed '{tag}' annotation: {reason}")]
    MalformedAnnotation { tag: String, reason: String },

    #[error("corrupt transform file: {reason}")]
    TransformFileCorrupt { reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        Error::TransformFileCorrupt {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
