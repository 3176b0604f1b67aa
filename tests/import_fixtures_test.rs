// End-to-end imports of the .dae documents under tests/fixtures
use collada_import::{import_file, Diagnostic, ImportError, ImportOptions, NormalMode, SubMesh};

const QUAD_SEAM: &str = "tests/fixtures/quad_seam.dae";
const CUBE: &str = "tests/fixtures/cube.dae";
const COUNT_MISMATCH: &str = "tests/fixtures/count_mismatch.dae";
const MULTI_GEOMETRY: &str = "tests/fixtures/multi_geometry.dae";

#[test]
fn test_quad_uv_seam_duplicates_two_corners() {
    let report = import_file(QUAD_SEAM, &ImportOptions::default()).expect("Failed to import quad");
    assert!(report.failures.is_empty(), "unexpected failures: {:?}", report.failures);

    let mesh = report.model("model").expect("model not found");
    println!("quad: {} vertices, indices {:?}", mesh.vertex_count(), mesh.indices);

    assert_eq!(mesh.vertex_count(), 6);
    assert_eq!(mesh.indices, vec![0, 1, 2, 4, 5, 3]);
    assert_eq!(mesh.normals.count(), 6);
    assert_eq!(mesh.texcoords.count(), 6);

    // seam duplicates copy the original positions
    assert_eq!(mesh.vertices.get(4), Some(&[0.0, 0.0, 0.0][..]));
    assert_eq!(mesh.vertices.get(5), Some(&[1.0, 1.0, 0.0][..]));
    assert_eq!(mesh.texcoords.get(3), Some(&[0.5, 1.0][..]));
    assert_eq!(mesh.texcoords.get(5), Some(&[0.75, 0.75][..]));

    // supplied normals are kept in auto mode
    for i in 0..6 {
        assert_eq!(mesh.normals.get(i), Some(&[0.0, 0.0, 1.0][..]));
    }

    assert_eq!(
        mesh.submeshes,
        vec![SubMesh { material: Some("quadMaterial".to_string()), first_index: 0, index_count: 6 }]
    );
    assert!(mesh.validate().is_ok());

    println!("\n✓ UV seam split into 6 vertices");
}

#[test]
fn test_reimport_is_deterministic() {
    let options = ImportOptions::default();
    let first = import_file(QUAD_SEAM, &options).unwrap();
    let second = import_file(QUAD_SEAM, &options).unwrap();
    assert_eq!(first.model("model"), second.model("model"));
}

#[test]
fn test_cube_without_texcoords_keeps_position_indices() {
    let report = import_file(CUBE, &ImportOptions::default()).expect("Failed to import cube");
    let mesh = report.model("model").expect("model not found");
    println!("cube: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());

    assert_eq!(mesh.vertex_count(), 8);
    assert_eq!(mesh.indices.len(), 36);
    assert_eq!(&mesh.indices[..6], &[0, 3, 2, 0, 2, 1]);
    assert!(mesh.texcoords.data.iter().all(|v| *v == 0.0));

    // the first face to reach a vertex supplies its normal
    assert_eq!(mesh.normals.get(0), Some(&[0.0, 0.0, -1.0][..]));
    assert_eq!(mesh.normals.get(4), Some(&[0.0, 0.0, 1.0][..]));

    let bounds = mesh.bounds().unwrap();
    assert_eq!(bounds.min, [-1.0, -1.0, -1.0]);
    assert_eq!(bounds.max, [1.0, 1.0, 1.0]);

    println!("\n✓ Cube imported without splitting");
}

#[test]
fn test_cube_synthesized_normals_are_unit_length() {
    let options = ImportOptions { normals: NormalMode::Always, ..Default::default() };
    let report = import_file(CUBE, &options).unwrap();
    let mesh = report.model("model").unwrap();

    for i in 0..mesh.vertex_count() {
        let n = mesh.normals.get(i).unwrap();
        let length = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        assert!((length - 1.0).abs() < 1e-4, "vertex {} normal {:?}", i, n);
    }
}

#[test]
fn test_count_mismatch_is_reported_not_fatal() {
    let report = import_file(COUNT_MISMATCH, &ImportOptions::default()).unwrap();
    let mesh = report.model("model").expect("model should still import");

    assert_eq!(mesh.vertex_count(), 3);
    assert_eq!(mesh.indices, vec![0, 1, 2]);
    assert_eq!(mesh.normals.get(1), Some(&[0.0, 0.0, 1.0][..]));
    assert_eq!(
        report.diagnostics_for("model"),
        &[Diagnostic::DataCountMismatch {
            source_id: "short-positions".to_string(),
            declared: 12,
            parsed: 9,
        }]
    );

    println!("\n✓ Count mismatch recorded as a diagnostic");
}

#[test]
fn test_failed_geometry_does_not_stop_siblings() {
    let options = ImportOptions { model_name: Some("part".to_string()), ..Default::default() };
    let report = import_file(MULTI_GEOMETRY, &options).unwrap();

    let names: Vec<&String> = report.models.keys().collect();
    println!("models: {:?}", names);
    assert_eq!(names, vec!["part1", "part3", "part7"]);

    assert_eq!(report.failures.len(), 3);
    let failure = &report.failures[0];
    assert_eq!(failure.name, "part2");
    assert_eq!(failure.geometry_id.as_deref(), Some("broken-mesh"));
    assert_eq!(
        failure.error,
        ImportError::IndexOutOfRange {
            semantic: "POSITION",
            source_id: "broken-positions".to_string(),
            index: 7,
            count: 3,
        }
    );

    // <polygons> quad is fan-triangulated
    assert_eq!(report.model("part3").unwrap().indices, vec![0, 1, 2, 0, 2, 3]);

    // the spline geometry has no mesh and is only noted
    assert!(matches!(
        report.diagnostics_for("part4"),
        [Diagnostic::SkippedGeometry { .. }]
    ));

    // a non-numeric token fails only its own geometry
    assert_eq!(report.failures[1].name, "part5");
    assert_eq!(
        report.failures[1].error,
        ImportError::MalformedData {
            context: "garbled-positions".to_string(),
            token: "x".to_string(),
            expected: "float",
        }
    );

    assert_eq!(report.failures[2].name, "part6");
    assert_eq!(
        report.failures[2].error,
        ImportError::MissingPositionChannel { face_group: "triangles".to_string() }
    );

    // COLOR on <vertices> is skipped once for the whole mesh, not per face group
    let colored = report.model("part7").unwrap();
    assert_eq!(colored.indices, vec![0, 1, 2, 0, 2, 3]);
    assert_eq!(colored.submeshes.len(), 2);
    assert_eq!(
        report.diagnostics_for("part7"),
        &[Diagnostic::UnsupportedSemantic {
            semantic: "COLOR".to_string(),
            source_id: "colored-colors".to_string(),
        }]
    );

    println!("\n✓ Broken geometry isolated from its siblings");
}

#[test]
fn test_missing_file_is_an_error() {
    assert!(import_file("tests/fixtures/does_not_exist.dae", &ImportOptions::default()).is_err());
}
