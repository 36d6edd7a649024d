//! Integration tests for gtforge-annotate
//!
//! These run the whole pipeline against meshes, trajectories and images
//! written to a scratch directory, with a CPU splat renderer standing in for
//! the offscreen rasterizer.

mod common;

use approx::assert_relative_eq;
use common::{occluded, side_by_side, translation, Fixture, Frame, SplatRenderer, HEIGHT, WIDTH};
use gtforge_annotate::export::bop::{
    SceneCameraEntry, SceneGtEntry, SceneGtInfoEntry, SCENE_CAMERA_FILE, SCENE_GT_FILE,
    SCENE_GT_INFO_FILE,
};
use gtforge_annotate::*;
use gtforge_core::{compose_camera_pose, BoundingBox, Error, Transform3D};
use gtforge_io::pose_file::read_matrix;
use gtforge_io::FileMeshLoader;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::Path;

const PAD_X: u32 = 16;
const PAD_Y: u32 = 8;

fn single_frame() -> Vec<Frame> {
    vec![Frame {
        id: "000000.png",
        camera: [0.0, 0.0, 0.0],
    }]
}

fn bop_config(fixture: &Fixture) -> AnnotationConfig {
    fixture
        .config()
        .with_export(ExportMode::Bop(BopOptions::default().with_padding(PAD_X, PAD_Y)))
}

fn run(config: AnnotationConfig) -> RunSummary {
    AnnotationPipeline::new(config)
        .unwrap()
        .run(FileMeshLoader, |w, h| Ok(SplatRenderer::new(w, h)))
        .unwrap()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> T {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

fn gt_info(out: &Path) -> BTreeMap<String, Vec<SceneGtInfoEntry>> {
    read_json(&out.join(SCENE_GT_INFO_FILE))
}

fn mask_pixels(path: &Path) -> image::GrayImage {
    image::open(path).unwrap().to_luma8()
}

#[test]
fn test_scenario_a_two_unobstructed_objects() {
    let fixture = side_by_side().with_frames(&single_frame());
    let summary = run(bop_config(&fixture));
    assert_eq!(summary, RunSummary { frames: 1, instances: 2 });

    let out = fixture.output_dir();
    let info = gt_info(&out);
    let frame = &info["0"];
    assert_eq!(frame.len(), 2);
    for inst in frame {
        assert!(inst.px_count_all > 0);
        assert_eq!(inst.px_count_visib, inst.px_count_all);
        assert_eq!(inst.visib_fract, 1.0);
        assert_eq!(inst.bbox_obj, inst.bbox_visib);
        // valid depth everywhere the plates land
        assert_eq!(inst.px_count_valid, inst.px_count_all);
    }
    // left plate ends before the right one starts
    let left = frame[0].bbox_obj;
    let right = frame[1].bbox_obj;
    assert!(left.left + left.width < right.left);

    let mug = mask_pixels(&out.join("mask_visib").join("000000_000000.png"));
    assert_eq!(mug.dimensions(), (WIDTH, HEIGHT));
    assert_eq!(mug.get_pixel(22, 24).0, [255]);
    assert_eq!(mug.get_pixel(42, 24).0, [0]);
    let cracker = mask_pixels(&out.join("mask").join("000000_000001.png"));
    assert_eq!(cracker.get_pixel(42, 24).0, [255]);
}

#[test]
fn test_scenario_b_hidden_object() {
    let fixture = occluded().with_frames(&single_frame());
    run(bop_config(&fixture));

    let info = gt_info(&fixture.output_dir());
    let front = &info["0"][0];
    let back = &info["0"][1];

    assert_eq!(front.visib_fract, 1.0);
    assert!(back.px_count_all > 0);
    assert_eq!(back.px_count_visib, 0);
    assert_eq!(back.visib_fract, 0.0);
    assert_eq!(back.bbox_visib, BoundingBox::default());
    assert_ne!(back.bbox_obj, BoundingBox::default());

    let hidden = mask_pixels(&fixture.output_dir().join("mask_visib").join("000000_000001.png"));
    assert!(hidden.pixels().all(|p| p.0 == [0]));
}

#[test]
fn test_scene_records() {
    let fixture = side_by_side().with_frames(&[
        Frame {
            id: "000000.png",
            camera: [0.0, 0.0, 0.0],
        },
        Frame {
            id: "000001.png",
            camera: [0.1, 0.0, -0.5],
        },
    ]);
    let config = bop_config(&fixture).with_depth_scale(0.1234567);
    run(config);
    let out = fixture.output_dir();

    let cameras: BTreeMap<String, SceneCameraEntry> = read_json(&out.join(SCENE_CAMERA_FILE));
    assert_eq!(cameras.len(), 2);
    let second = &cameras["1"];
    // unpadded intrinsics
    assert_eq!(second.cam_k, [50.0, 0.0, 32.0, 0.0, 50.0, 24.0, 0.0, 0.0, 1.0]);
    assert_eq!(second.depth_scale, 0.12346);
    assert_eq!(second.mode, 0);
    // world-to-camera is the inverse of the camera position
    assert_relative_eq!(second.cam_t_w2c[0], -0.1, epsilon = 1e-9);
    assert_relative_eq!(second.cam_t_w2c[2], 0.5, epsilon = 1e-9);

    let gt: BTreeMap<String, Vec<SceneGtEntry>> = read_json(&out.join(SCENE_GT_FILE));
    let ids: Vec<u32> = gt["0"].iter().map(|e| e.obj_id).collect();
    assert_eq!(ids, vec![9, 2]);
    let mug = &gt["1"][0];
    assert_relative_eq!(mug.cam_t_m2c[0], -0.5, epsilon = 1e-9);
    assert_relative_eq!(mug.cam_t_m2c[1], 0.0, epsilon = 1e-9);
    assert_relative_eq!(mug.cam_t_m2c[2], 2.5, epsilon = 1e-9);
    assert_eq!(mug.cam_r_m2c, [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    assert!(out.join("rgb").join("000001.png").is_file());
    assert_eq!(
        std::fs::read(fixture.path().join("data").join("depth").join("000001.png")).unwrap(),
        std::fs::read(out.join("depth").join("000001.png")).unwrap()
    );
}

#[test]
fn test_cropping_and_depth_validity() {
    // plate straddling the left image border, over the columns without depth
    let fixture = Fixture::new()
        .with_plate("025_mug", 0.2, translation(-1.1, 0.0, 2.0))
        .with_frames(&single_frame());
    run(bop_config(&fixture));

    let out = fixture.output_dir();
    let inst = &gt_info(&out)["0"][0];
    let published = mask_pixels(&out.join("mask").join("000000_000000.png"))
        .pixels()
        .filter(|p| p.0 == [255])
        .count();

    assert!(published > 0);
    assert!(inst.px_count_all > published);
    assert!(inst.px_count_valid > 0);
    assert!(inst.px_count_valid < published);
    assert!(inst.visib_fract > 0.0 && inst.visib_fract < 1.0);
    assert_relative_eq!(
        inst.visib_fract,
        inst.px_count_visib as f64 / inst.px_count_all as f64
    );
    assert_eq!(inst.bbox_obj.left, 0);
}

#[test]
fn test_runs_are_deterministic() {
    let fixture = occluded().with_frames(&[
        Frame {
            id: "000000.png",
            camera: [0.0, 0.0, 0.0],
        },
        Frame {
            id: "000001.png",
            camera: [0.05, -0.05, 0.2],
        },
    ]);
    let out = fixture.output_dir();

    run(bop_config(&fixture));
    let gt = std::fs::read(out.join(SCENE_GT_FILE)).unwrap();
    let info = std::fs::read(out.join(SCENE_GT_INFO_FILE)).unwrap();

    run(bop_config(&fixture));
    assert_eq!(gt, std::fs::read(out.join(SCENE_GT_FILE)).unwrap());
    assert_eq!(info, std::fs::read(out.join(SCENE_GT_INFO_FILE)).unwrap());

    let text = String::from_utf8(info).unwrap();
    assert!(text.starts_with("{\n \"0\": [\n  {\n   \"bbox_obj\""));
}

#[test]
fn test_per_object_outputs() {
    let fixture = side_by_side().with_frames(&[
        Frame {
            id: "000000.png",
            camera: [0.0, 0.0, 0.0],
        },
        Frame {
            id: "000001.png",
            camera: [0.1, 0.0, 0.0],
        },
    ]);
    run(fixture.config());
    let out = fixture.output_dir();

    // render-convention pose: y and z flipped relative to the raw camera
    let pose = read_matrix(out.join("025_mug").join("pose").join("000001.txt")).unwrap();
    let t = pose.translation();
    assert_relative_eq!(t.x, -0.5, epsilon = 1e-6);
    assert_relative_eq!(t.y, 0.0, epsilon = 1e-6);
    assert_relative_eq!(t.z, -2.0, epsilon = 1e-6);

    let source = image::open(fixture.path().join("data").join("rgb").join("000000.png"))
        .unwrap()
        .to_rgb8();
    let masked = image::open(out.join("025_mug").join("rgb").join("000000.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(masked.get_pixel(22, 24), source.get_pixel(22, 24));
    assert_eq!(masked.get_pixel(42, 24).0, [0, 0, 0]);

    let other = image::open(out.join("003_cracker_box").join("rgb").join("000000.png"))
        .unwrap()
        .to_rgb8();
    assert_eq!(other.get_pixel(42, 24), source.get_pixel(42, 24));
    assert_eq!(other.get_pixel(22, 24).0, [0, 0, 0]);

    for name in ["025_mug", "003_cracker_box"] {
        let mut poses: Vec<_> = std::fs::read_dir(out.join(name).join("pose"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        poses.sort();
        assert_eq!(poses, vec!["000000.txt", "000001.txt"]);
    }
}

#[test]
fn test_object_outside_view_keeps_frame() {
    // plate behind the camera never reaches the depth buffer
    let fixture = Fixture::new()
        .with_plate("025_mug", 0.2, translation(0.0, 0.0, -2.0))
        .with_frames(&single_frame());

    let mut renderer = SplatRenderer::new(WIDTH + 2 * PAD_X, HEIGHT + 2 * PAD_Y);
    let handle = &mut renderer;
    AnnotationPipeline::new(bop_config(&fixture))
        .unwrap()
        .run(FileMeshLoader, move |_, _| Ok(handle))
        .unwrap();
    // only the full-scene pass was issued
    assert_eq!(renderer.passes, 1);

    let inst = &gt_info(&fixture.output_dir())["0"][0];
    assert_eq!(inst.px_count_all, 0);
    assert_eq!(inst.visib_fract, 0.0);
    assert_eq!(inst.bbox_obj, BoundingBox::default());
}

#[test]
fn test_segmentation_invariants() {
    // partial overlap: the nearer plate cuts into the farther one
    let fixture = Fixture::new()
        .with_plate("near", 0.2, translation(0.0, 0.0, 2.0))
        .with_plate("far", 0.3, translation(0.3, 0.1, 3.0))
        .with_plate("side", 0.1, translation(-0.5, 0.0, 2.5));
    let pipeline = AnnotationPipeline::new(fixture.config()).unwrap();
    let mut scene = pipeline.build_scene(FileMeshLoader).unwrap();
    scene.set_camera_pose(compose_camera_pose(&Transform3D::identity()));

    let mut renderer = SplatRenderer::new(WIDTH, HEIGHT);
    let seg = OcclusionSegmenter::new().segment(&mut renderer, &mut scene).unwrap();
    assert_eq!(renderer.passes, 1 + scene.len());
    assert!(scene.all_visible());

    for (index, coverage) in seg.instances.iter().enumerate() {
        assert!(coverage.visible.is_subset_of(&coverage.all));
        assert_eq!(coverage.visible, seg.labels.instance_mask(index));
    }
    for &label in seg.labels.labels() {
        assert!(label as usize <= scene.len());
    }

    let far = &seg.instances[1];
    assert!(far.visible.count() > 0);
    assert!(far.visible.count() < far.all.count());
    assert_eq!(seg.instances[0].visible.count(), seg.instances[0].all.count());
}

#[test]
fn test_split_object_parts() {
    let fixture = Fixture::new()
        .with_split(
            "drill",
            &[("part_b", 0.1, [0.2, 0.0, 0.0]), ("part_a", 0.1, [-0.2, 0.0, 0.0])],
            translation(0.0, 0.0, 2.0),
        )
        .with_frames(&single_frame());
    let options = BopOptions::default()
        .with_padding(PAD_X, PAD_Y)
        .with_category("part_a", 20)
        .with_category("part_b", 21);
    run(fixture.config().with_export(ExportMode::Bop(options)));

    let gt: BTreeMap<String, Vec<SceneGtEntry>> =
        read_json(&fixture.output_dir().join(SCENE_GT_FILE));
    let ids: Vec<u32> = gt["0"].iter().map(|e| e.obj_id).collect();
    assert_eq!(ids, vec![20, 21]);
    // parts share the parent's transform
    assert_eq!(gt["0"][0].cam_t_m2c, gt["0"][1].cam_t_m2c);

    let info = gt_info(&fixture.output_dir());
    let a = info["0"][0].bbox_obj;
    let b = info["0"][1].bbox_obj;
    assert!(a.left < b.left);
}

#[test]
fn test_unknown_category_fails_before_rendering() {
    let fixture = Fixture::new()
        .with_plate("mystery", 0.2, translation(0.0, 0.0, 2.0))
        .with_frames(&single_frame());

    let mut renderer_created = false;
    let result = AnnotationPipeline::new(bop_config(&fixture))
        .unwrap()
        .run(FileMeshLoader, |w, h| {
            renderer_created = true;
            Ok(SplatRenderer::new(w, h))
        });

    assert!(matches!(result, Err(Error::UnknownCategory(name)) if name == "mystery"));
    assert!(!renderer_created);
    assert!(!fixture.output_dir().join(SCENE_GT_FILE).exists());
}

#[test]
fn test_missing_input_image_aborts_run() {
    let fixture = side_by_side().with_frames(&single_frame());
    std::fs::remove_file(fixture.path().join("data").join("rgb").join("000000.png")).unwrap();

    let result = AnnotationPipeline::new(fixture.config())
        .unwrap()
        .run(FileMeshLoader, |w, h| Ok(SplatRenderer::new(w, h)));
    assert!(result.is_err());
}

#[test]
fn test_aborted_bop_run_keeps_completed_frames() {
    let frames = [
        Frame {
            id: "000000.png",
            camera: [0.0, 0.0, 0.0],
        },
        Frame {
            id: "000001.png",
            camera: [0.05, 0.0, 0.0],
        },
    ];
    let fixture = side_by_side().with_frames(&frames);
    std::fs::remove_file(fixture.path().join("data").join("rgb").join("000001.png")).unwrap();

    let result = AnnotationPipeline::new(bop_config(&fixture))
        .unwrap()
        .run(FileMeshLoader, |w, h| Ok(SplatRenderer::new(w, h)));
    assert!(matches!(result, Err(Error::Io(_))));

    let out = fixture.output_dir();
    let camera: BTreeMap<String, SceneCameraEntry> = read_json(&out.join(SCENE_CAMERA_FILE));
    let gt: BTreeMap<String, Vec<SceneGtEntry>> = read_json(&out.join(SCENE_GT_FILE));
    let info = gt_info(&out);
    assert_eq!(camera.keys().collect::<Vec<_>>(), vec!["0"]);
    assert_eq!(gt.keys().collect::<Vec<_>>(), vec!["0"]);
    assert_eq!(info.keys().collect::<Vec<_>>(), vec!["0"]);
    assert_eq!(gt["0"].len(), 2);
    assert!(out.join("rgb").join("000000.png").is_file());
    assert!(!out.join("rgb").join("000001.png").exists());
}
