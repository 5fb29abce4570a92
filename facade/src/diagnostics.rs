use serde::Serialize;

use crate::geometry::Point2D;

/// Observations recorded while resolving corners and building a transform.
///
/// None of these abort a run. Warnings flag results a human should look at
/// before committing to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// De-duplication removed points closer than the tolerance.
    DuplicatesMerged { removed: usize },
    /// Points strictly inside the convex hull were ignored.
    InteriorPointsDiscarded { count: usize },
    /// A missing corner was inferred from three points.
    CornerInferred { corner: Point2D },
    /// Longest-edge corner selection did not yield four points.
    ExtremePointFallback { candidates: usize },
    /// The resolved quadrilateral is not convex.
    NonConvex,
    /// Top and bottom edges differ by more than 20 %.
    EdgeWidthMismatch { top: f64, bottom: f64 },
    /// Share of the rectified rectangle that maps outside the original image.
    OutOfFrame { ratio: f64 },
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Diagnostic::CornerInferred { .. }
                | Diagnostic::ExtremePointFallback { .. }
                | Diagnostic::NonConvex
                | Diagnostic::EdgeWidthMismatch { .. }
                | Diagnostic::OutOfFrame { .. }
        )
    }
}

/// Append a diagnostic, logging it at a level matching its severity.
pub(crate) fn record(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    if diagnostic.is_warning() {
        log::warn!("{diagnostic:?}");
    } else {
        log::debug!("{diagnostic:?}");
    }
    diagnostics.push(diagnostic);
}
