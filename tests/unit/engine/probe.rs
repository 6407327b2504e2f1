use super::*;

fn fixture_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("probe_unit").join(name);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_png(path: &Path, w: u32, h: u32) {
    let data = vec![128u8; (w * h * 4) as usize];
    image::save_buffer_with_format(
        path,
        &data,
        w,
        h,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .unwrap();
}

fn bound(kind: OperatorKind, raw: ParamSet) -> ParamSet {
    crate::graph::param::bind_params(kind, &raw).unwrap()
}

fn eval(
    engine: &mut ProbeEngine,
    id: &str,
    kind: OperatorKind,
    params: &ParamSet,
    frame: i64,
    inputs: &[Option<&ProbeStream>],
    dry_run: bool,
) -> Result<ProbeStream, EngineError> {
    let id = NodeId::from(id);
    let ports = kind.inputs();
    let inputs: Vec<StreamInput<'_, ProbeStream>> = inputs
        .iter()
        .zip(ports)
        .map(|(v, p)| StreamInput {
            port: p.name,
            value: *v,
        })
        .collect();
    engine.evaluate(
        &NodeContext {
            id: &id,
            kind,
            params,
        },
        Frame(frame),
        &inputs,
        dry_run,
    )
}

#[test]
fn read_probes_the_frame_file_header() {
    let dir = fixture_dir("read_header");
    write_png(&dir.join("plate.0002.png"), 8, 4);

    let mut engine = ProbeEngine::new().with_base_dir(&dir);
    let params = bound(
        OperatorKind::Read,
        ParamSet::new()
            .with("file_path", "plate.####.png")
            .with("start_frame", 2i64)
            .with("end_frame", 2i64),
    );

    let out = eval(&mut engine, "read1", OperatorKind::Read, &params, 2, &[], true).unwrap();
    assert_eq!(out.size, Some((8, 4)));

    // Hold maps frame 5 back onto frame 2.
    let held = eval(&mut engine, "read1", OperatorKind::Read, &params, 5, &[], true).unwrap();
    assert_eq!(held, out);
}

#[test]
fn missing_read_file_is_a_missing_resource() {
    let dir = fixture_dir("read_missing");
    let mut engine = ProbeEngine::new().with_base_dir(&dir);
    let params = bound(
        OperatorKind::Read,
        ParamSet::new().with("file_path", "nothing.####.png"),
    );
    let err = eval(&mut engine, "read1", OperatorKind::Read, &params, 1, &[], true).unwrap_err();
    assert!(matches!(err, EngineError::MissingResource { ref param, .. } if param == "file_path"));
}

#[test]
fn disabled_read_skips_the_file_check() {
    let mut engine = ProbeEngine::new();
    let params = bound(
        OperatorKind::Read,
        ParamSet::new()
            .with("file_path", "/definitely/not/here.png")
            .with("enable", 0i64),
    );
    let out = eval(&mut engine, "read1", OperatorKind::Read, &params, 1, &[], true).unwrap();
    assert_eq!(out.size, None);
}

#[test]
fn fingerprints_are_stable_and_parameter_sensitive() {
    let dir = fixture_dir("fingerprints");
    write_png(&dir.join("a.png"), 4, 4);
    let mut engine = ProbeEngine::new().with_base_dir(&dir);
    let read = bound(OperatorKind::Read, ParamSet::new().with("file_path", "a.png"));
    let src = eval(&mut engine, "r", OperatorKind::Read, &read, 1, &[], true).unwrap();

    let g1 = bound(OperatorKind::ColorGrade, ParamSet::new().with("mix", 0.5));
    let g2 = bound(OperatorKind::ColorGrade, ParamSet::new().with("mix", 0.25));
    let a = eval(&mut engine, "g", OperatorKind::ColorGrade, &g1, 1, &[Some(&src)], true).unwrap();
    let b = eval(&mut engine, "g", OperatorKind::ColorGrade, &g1, 1, &[Some(&src)], true).unwrap();
    let c = eval(&mut engine, "g", OperatorKind::ColorGrade, &g2, 1, &[Some(&src)], true).unwrap();

    assert_eq!(a.fingerprint, b.fingerprint);
    assert_ne!(a.fingerprint, c.fingerprint);
    assert_ne!(a.fingerprint, src.fingerprint);
    assert_eq!(a.size, Some((4, 4)));
}

#[test]
fn merge_order_matters() {
    let mut engine = ProbeEngine::new();
    let black = bound(
        OperatorKind::Read,
        ParamSet::new().with("file_path", "x.png").with("enable", 0i64),
    );
    let x = eval(&mut engine, "x", OperatorKind::Read, &black, 1, &[], true).unwrap();
    let grade = bound(OperatorKind::ColorGrade, ParamSet::new());
    let y = eval(&mut engine, "y", OperatorKind::ColorGrade, &grade, 1, &[Some(&x)], true).unwrap();

    let merge = bound(OperatorKind::Merge, ParamSet::new());
    let ab = eval(&mut engine, "m", OperatorKind::Merge, &merge, 1, &[Some(&x), Some(&y)], true)
        .unwrap();
    let ba = eval(&mut engine, "m", OperatorKind::Merge, &merge, 1, &[Some(&y), Some(&x)], true)
        .unwrap();
    assert_ne!(ab.fingerprint, ba.fingerprint);
}

#[test]
fn resample_and_crop_change_the_stream_size() {
    let src = ProbeStream {
        fingerprint: StableHasher::new().finish(),
        size: Some((100, 50)),
        camera: None,
    };
    let mut engine = ProbeEngine::new();

    let down = bound(OperatorKind::Resample, ParamSet::new().with("factor", -1i64));
    let out = eval(&mut engine, "rs", OperatorKind::Resample, &down, 1, &[Some(&src)], true).unwrap();
    assert_eq!(out.size, Some((50, 25)));

    let crop = bound(
        OperatorKind::Crop,
        ParamSet::new()
            .with("window_max_x", 20i64)
            .with("window_max_y", 10i64)
            .with("reformat", 1i64),
    );
    let out = eval(&mut engine, "c", OperatorKind::Crop, &crop, 1, &[Some(&src)], true).unwrap();
    assert_eq!(out.size, Some((20, 10)));

    let empty = bound(
        OperatorKind::Crop,
        ParamSet::new().with("window_max_x", 0i64),
    );
    let err = eval(&mut engine, "c", OperatorKind::Crop, &empty, 1, &[Some(&src)], true).unwrap_err();
    assert!(matches!(err, EngineError::BadParameter { .. }));
}

#[test]
fn image_plane_updates_viewport_only_for_real_runs() {
    let src = ProbeStream {
        fingerprint: StableHasher::new().finish(),
        size: Some((2, 2)),
        camera: None,
    };
    let mut engine = ProbeEngine::new();
    let plane = bound(OperatorKind::ImagePlane, ParamSet::new());

    eval(&mut engine, "p", OperatorKind::ImagePlane, &plane, 3, &[Some(&src)], true).unwrap();
    assert_eq!(engine.viewport().updates(), 0);

    eval(&mut engine, "p", OperatorKind::ImagePlane, &plane, 3, &[Some(&src)], false).unwrap();
    assert_eq!(engine.viewport().updates(), 1);
    let shown = engine.viewport().get(&NodeId::from("p")).unwrap();
    assert_eq!(shown.frame, Frame(3));
    assert_eq!(shown.fingerprint, src.fingerprint);
}

#[test]
fn write_commits_only_for_real_runs() {
    let dir = fixture_dir("write_commit");
    let src = ProbeStream {
        fingerprint: StableHasher::new().finish(),
        size: Some((2, 2)),
        camera: None,
    };
    let mut engine = ProbeEngine::new().with_base_dir(&dir);
    let write = bound(
        OperatorKind::Write,
        ParamSet::new().with("file_path", "out/comp.####.png"),
    );

    eval(&mut engine, "w", OperatorKind::Write, &write, 4, &[Some(&src)], true).unwrap();
    assert!(engine.committed_writes().is_empty());
    assert!(!dir.join("out").exists());

    eval(&mut engine, "w", OperatorKind::Write, &write, 4, &[Some(&src)], false).unwrap();
    assert!(dir.join("out").is_dir());
    let w = &engine.committed_writes()[0];
    assert_eq!(w.path, dir.join("out/comp.0004.png"));
    assert_eq!(w.frame, Frame(4));
}

#[test]
fn write_rejects_unknown_extensions_and_file_parents() {
    let dir = fixture_dir("write_reject");
    std::fs::write(dir.join("blocker"), b"x").unwrap();
    let src = ProbeStream {
        fingerprint: StableHasher::new().finish(),
        size: None,
        camera: None,
    };
    let mut engine = ProbeEngine::new().with_base_dir(&dir);

    let bad_ext = bound(OperatorKind::Write, ParamSet::new().with("file_path", "out.nope"));
    let err = eval(&mut engine, "w", OperatorKind::Write, &bad_ext, 1, &[Some(&src)], true)
        .unwrap_err();
    assert!(matches!(err, EngineError::BadParameter { .. }));

    let blocked = bound(
        OperatorKind::Write,
        ParamSet::new().with("file_path", "blocker/out.png"),
    );
    let err = eval(&mut engine, "w", OperatorKind::Write, &blocked, 1, &[Some(&src)], true)
        .unwrap_err();
    assert!(matches!(err, EngineError::MissingResource { .. }));
}

#[test]
fn camera_reference_tags_the_stream() {
    let mut engine = ProbeEngine::new();
    let cam = bound(
        OperatorKind::CameraReference,
        ParamSet::new().with("camera", "shotCam"),
    );
    let out = eval(&mut engine, "cam", OperatorKind::CameraReference, &cam, 1, &[None], true)
        .unwrap();
    assert_eq!(out.camera.as_deref(), Some("shotCam"));
    assert_eq!(out.size, None);
}

#[test]
fn disabled_filter_passes_its_input_through() {
    let src = ProbeStream {
        fingerprint: StableHasher::new().finish(),
        size: Some((3, 3)),
        camera: None,
    };
    let mut engine = ProbeEngine::new();
    let t = bound(
        OperatorKind::Transform,
        ParamSet::new().with("enable", 0i64).with("rotate", 10.0),
    );
    let out = eval(&mut engine, "t", OperatorKind::Transform, &t, 1, &[Some(&src)], true).unwrap();
    assert_eq!(out, src);
}
