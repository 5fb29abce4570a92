use serde::Serialize;

use crate::config::RectifyConfig;
use crate::diagnostics::{record, Diagnostic};
use crate::error::Result;
use crate::geometry::Size;
use crate::homography::compute_transform;
use crate::record::TransformRecord;
use crate::resolve::{resolve, CornerInput, PointSource, Strategy};

/// Grid resolution used to estimate the out-of-frame share.
const FRAME_SAMPLES: usize = 32;

/// Runs the whole geometric pipeline: corner resolution, destination sizing,
/// homography and record construction.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    config: RectifyConfig,
}

/// A validated record plus how it was obtained.
#[derive(Debug, Clone, Serialize)]
pub struct Rectification {
    pub record: TransformRecord,
    pub strategy: Strategy,
    pub diagnostics: Vec<Diagnostic>,
}

impl Rectification {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

impl Rectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RectifyConfig {
        &self.config
    }

    pub fn rectify(
        &self,
        input: &CornerInput,
        source_image: &str,
        original_size: Size,
    ) -> Result<Rectification> {
        let resolution = resolve(input, &self.config.resolver)?;
        let mut diagnostics = resolution.diagnostics;

        let height = self.config.height.height(&resolution.quad, original_size);
        let transform = compute_transform(&resolution.quad, height)?;
        let transform_record = TransformRecord::new(source_image, original_size, resolution.quad, &transform)?;

        let ratio = transform_record.out_of_frame_ratio(FRAME_SAMPLES);
        if ratio > self.config.out_of_frame_warn {
            record(&mut diagnostics, Diagnostic::OutOfFrame { ratio });
        }

        log::info!(
            "rectified {source_image} via {:?}: {} -> {}",
            resolution.strategy,
            original_size,
            transform_record.rectified_size()
        );

        Ok(Rectification {
            record: transform_record,
            strategy: resolution.strategy,
            diagnostics,
        })
    }

    /// Pull the corner input from `source` and rectify it.
    pub fn rectify_from<S: PointSource + ?Sized>(
        &self,
        source: &S,
        source_image: &str,
        original_size: Size,
    ) -> Result<Rectification> {
        self.rectify(&source.corner_input()?, source_image, original_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point2D;
    use crate::homography::HeightPolicy;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn pass_through_height_and_max_width() {
        let input = CornerInput::Points(vec![p(100.0, 50.0), p(900.0, 80.0), p(880.0, 700.0), p(120.0, 690.0)]);
        let out = Rectifier::default()
            .rectify(&input, "front.jpg", Size::new(1024, 768))
            .unwrap();
        let size = out.record.rectified_size();
        assert_eq!(size.height, 768);
        // top edge is the longer one: hypot(800, 30)
        assert_eq!(size.width, (800.0f64).hypot(30.0).round() as u32);
        assert_eq!(out.strategy, Strategy::FourPoints);
        assert_eq!(out.warnings().count(), 0, "{:?}", out.diagnostics);
    }

    #[test]
    fn fixed_height_policy() {
        let config = RectifyConfig {
            height: HeightPolicy::Fixed(400),
            ..RectifyConfig::default()
        };
        let input = CornerInput::Points(vec![p(0.0, 0.0), p(600.0, 0.0), p(600.0, 300.0), p(0.0, 300.0)]);
        let out = Rectifier::new(config).rectify(&input, "a.png", Size::new(600, 300)).unwrap();
        assert_eq!(out.record.rectified_size(), Size::new(600, 400));
    }

    #[test]
    fn quad_reaching_outside_frame_warns() {
        let input = CornerInput::Points(vec![p(-400.0, -300.0), p(900.0, -300.0), p(900.0, 500.0), p(-400.0, 500.0)]);
        let out = Rectifier::default()
            .rectify(&input, "crop.png", Size::new(500, 400))
            .unwrap();
        let ratio = out
            .diagnostics
            .iter()
            .find_map(|d| match d {
                Diagnostic::OutOfFrame { ratio } => Some(*ratio),
                _ => None,
            })
            .expect("out-of-frame warning");
        assert!(ratio > 0.5 && ratio < 1.0, "ratio {ratio}");
    }

    #[test]
    fn rectify_from_point_source() {
        let points = [p(10.0, 10.0), p(210.0, 10.0), p(210.0, 110.0), p(10.0, 110.0)];
        let out = Rectifier::default()
            .rectify_from(&points[..], "s.png", Size::new(300, 200))
            .unwrap();
        assert_eq!(out.record.source_quadrilateral().corners(), &points);
    }
}
