/// End-to-end tests: marked points → rectification → record on disk → mapping.
use facade::annotation::{self, Annotation, AnnotationEntry, MappedGeometry, Shape};
use facade::classify::order_quadrant;
use facade::config::RectifyConfig;
use facade::geometry::{Direction, Point2D, Size, Space};
use facade::homography::HeightPolicy;
use facade::mapper::AnnotationMapper;
use facade::record::TransformRecord;
use facade::rectify::Rectifier;
use facade::resolve::{resolve_corners, CornerInput, EdgeMarkers, PointFixture, ResolverConfig, Strategy};
use facade::Error;

fn p(x: f64, y: f64) -> Point2D {
    Point2D::new(x, y)
}

fn oblique_points() -> Vec<Point2D> {
    vec![p(210.0, 95.0), p(1450.0, 180.0), p(1390.0, 1010.0), p(160.0, 960.0)]
}

#[test]
fn rectify_save_load_and_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let transform_path = dir.path().join("building_transform.json");

    let out = Rectifier::default()
        .rectify(&CornerInput::Points(oblique_points()), "building.jpg", Size::new(1600, 1200))
        .unwrap();
    out.record.save(&transform_path).unwrap();

    let record = TransformRecord::load(&transform_path).unwrap();
    assert_eq!(record, out.record);

    let mapper = AnnotationMapper::new(&record);
    for x in (0..1600).step_by(200) {
        for y in (0..1200).step_by(200) {
            let q = p(x as f64, y as f64);
            let fwd = mapper.map_point(q.x, q.y, Direction::Forward).unwrap();
            let back = mapper.map_point(fwd.x, fwd.y, Direction::Reverse).unwrap();
            assert!(back.distance(&q) <= 1e-2, "round trip of {q} ended at {back}");
        }
    }
}

#[test]
fn classification_ignores_input_order() {
    let pts = oblique_points();
    let expected = order_quadrant(&[pts[0], pts[1], pts[2], pts[3]]).unwrap();
    for rotation in 0..4 {
        let mut shifted = pts.clone();
        shifted.rotate_left(rotation);
        shifted.swap(1, 3);
        let q = order_quadrant(&[shifted[0], shifted[1], shifted[2], shifted[3]]).unwrap();
        assert_eq!(q, expected, "rotation {rotation}");
        assert!(q.area() > 0.0);
    }
}

#[test]
fn three_point_inference() {
    let config = ResolverConfig {
        min_area: 10.0,
        ..ResolverConfig::default()
    };
    let resolution = resolve_corners(&[p(0.0, 0.0), p(10.0, 5.0), p(0.0, 10.0)], &config).unwrap();
    assert_eq!(resolution.strategy, Strategy::ThreePoints);
    assert!(resolution.quad.corners().contains(&p(10.0, 0.0)));
}

#[test]
fn identity_record_keeps_rectangle_orientation() {
    let source = facade::geometry::Quadrilateral::rectangle(400.0, 300.0).unwrap();
    let config = RectifyConfig {
        height: HeightPolicy::PassThrough,
        ..RectifyConfig::default()
    };
    let out = Rectifier::new(config)
        .rectify(
            &CornerInput::Points(source.corners().to_vec()),
            "flat.png",
            Size::new(400, 300),
        )
        .unwrap();
    let mapper = AnnotationMapper::new(&out.record);
    let MappedGeometry::Quadrilateral { points, .. } = mapper
        .map_rectangle(10.0, 10.0, 50.0, 50.0, Direction::Reverse)
        .unwrap()
    else {
        panic!("rectangle should map to a quadrilateral");
    };
    let expected = [p(10.0, 10.0), p(50.0, 10.0), p(50.0, 50.0), p(10.0, 50.0)];
    for (got, want) in points.iter().zip(expected) {
        assert!(got.distance(&want) < 1e-6, "{got} vs {want}");
    }
}

#[test]
fn batch_partial_failure() {
    let out = Rectifier::default()
        .rectify(&CornerInput::Points(oblique_points()), "building.jpg", Size::new(1600, 1200))
        .unwrap();
    let mapper = AnnotationMapper::new(&out.record);
    let entries = [
        serde_json::json!({"type": "point", "x": 100, "y": 200, "label": "window"}),
        serde_json::json!({"type": "rectangle", "x1": 10, "y1": 20, "x2": 110, "y2": 120, "label": "door"}),
        serde_json::json!({"type": "bezier", "label": "arch"}),
    ]
    .iter()
    .map(|v| AnnotationEntry::from_value(v).unwrap())
    .collect::<Vec<_>>();

    let batch = mapper.map_annotation_batch(&entries, Direction::Reverse);
    assert_eq!(batch.mapped.len(), 2);
    assert_eq!(batch.skipped.len(), 1);
    assert!(batch.mapped.iter().all(|(_, s)| s.space == Space::Original));
}

#[test]
fn singular_input_is_rejected() {
    let err = Rectifier::default()
        .rectify(
            &CornerInput::Points(vec![p(0.0, 0.0), p(100.0, 0.0), p(200.0, 0.0), p(300.0, 0.0)]),
            "line.png",
            Size::new(400, 300),
        )
        .unwrap_err();
    assert!(
        matches!(err, Error::DegenerateQuadrilateral { .. } | Error::SingularMatrix { .. }),
        "collinear points should be rejected, got {err:?}"
    );
}

#[test]
fn edge_marker_fixture() {
    let fixture = PointFixture::from_json_str(
        r#"{"edges": {
            "top":    [[100, 100], [900, 100]],
            "bottom": [[100, 700], [900, 700]],
            "left":   [[150, 200], [150, 600]],
            "right":  [[850, 200], [850, 600]]
        }}"#,
    )
    .unwrap();
    let out = Rectifier::default()
        .rectify_from(&fixture, "edges.jpg", Size::new(1000, 800))
        .unwrap();
    assert_eq!(out.strategy, Strategy::EdgePairs);
    assert_eq!(
        out.record.source_quadrilateral().corners(),
        &[p(150.0, 100.0), p(850.0, 100.0), p(850.0, 700.0), p(150.0, 700.0)]
    );

    let seq = EdgeMarkers::from_sequence(&[p(0.0, 0.0); 7]).unwrap_err();
    assert!(matches!(seq, Error::InsufficientPoints { supplied: 7, required: 8 }));
}

#[test]
fn annotation_file_mapping() {
    let dir = tempfile::tempdir().unwrap();
    let transform_path = dir.path().join("transform.json");
    let input = dir.path().join("annotations.json");
    let output = dir.path().join("annotations_mapped.json");

    let out = Rectifier::default()
        .rectify(&CornerInput::Points(oblique_points()), "building.jpg", Size::new(1600, 1200))
        .unwrap();
    out.record.save(&transform_path).unwrap();

    std::fs::write(
        &input,
        serde_json::json!({
            "image": "building_rectified.jpg",
            "annotations": [
                {"type": "point", "x": 100, "y": 200, "label": "window", "floor": 2},
                {"type": "circle", "center_x": 500, "center_y": 300, "radius": 40, "label": "rosette"},
                {"type": "polygon", "points": [[0, 0], [50, 0], [25, 40]], "label": "gable"},
                {"type": "spline", "label": "cornice"}
            ]
        })
        .to_string(),
    )
    .unwrap();

    let record = TransformRecord::load(&transform_path).unwrap();
    let mapper = AnnotationMapper::new(&record);
    let summary =
        annotation::map_annotation_file(&mapper, &transform_path, &input, &output, Direction::Reverse).unwrap();
    assert_eq!(summary.mapped, 3);
    assert_eq!(summary.skipped, 1);

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(written["image"], "building_rectified.jpg");
    assert_eq!(written["transform_file"], transform_path.display().to_string());
    let anns = written["annotations"].as_array().unwrap();
    assert_eq!(anns.len(), 3);
    assert_eq!(anns[0]["floor"], 2, "original fields are kept");
    assert_eq!(anns[0]["mapped_shape"]["type"], "point");
    assert_eq!(anns[1]["mapped_shape"]["type"], "ellipse");
    assert_eq!(anns[1]["mapped_shape"]["boundary_points"].as_array().unwrap().len(), 16);
    assert_eq!(anns[2]["mapped_shape"]["points"].as_array().unwrap().len(), 3);
    assert_eq!(anns[2]["mapped"], true);
}

#[test]
fn mapping_shapes_in_both_directions() {
    let out = Rectifier::default()
        .rectify(&CornerInput::Points(oblique_points()), "building.jpg", Size::new(1600, 1200))
        .unwrap();
    let mapper = AnnotationMapper::new(&out.record);
    let polygon = Annotation::new(
        "bay",
        Shape::Polygon {
            points: vec![p(300.0, 300.0), p(600.0, 320.0), p(580.0, 700.0), p(310.0, 690.0)],
        },
    );
    let there = mapper.map_annotation(&polygon, Direction::Forward).unwrap();
    assert_eq!(there.space, Space::Rectified);
    let MappedGeometry::Polygon { points, .. } = there.geometry else {
        panic!("polygon should stay a polygon");
    };
    let back = mapper
        .map_annotation(&Annotation::new("bay", Shape::Polygon { points }), Direction::Reverse)
        .unwrap();
    let MappedGeometry::Polygon { points: restored, .. } = back.geometry else {
        panic!("polygon should stay a polygon");
    };
    let Shape::Polygon { points: original } = &polygon.shape else {
        unreachable!()
    };
    for (a, b) in restored.iter().zip(original) {
        assert!(a.distance(b) <= 1e-2, "{a} vs {b}");
    }
}
