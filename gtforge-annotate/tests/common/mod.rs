//! Shared fixtures for the annotation integration tests

#![allow(dead_code)]

use gtforge_annotate::{AnnotationConfig, ObjectEntry, ObjectKind};
use gtforge_core::{
    CameraIntrinsics, DepthMap, DepthRenderer, Point3f, Result, SceneGraph, Transform3D,
    TriangleMesh, UnitQuaternion, Vector3,
};
use image::{ImageBuffer, Luma, Rgb, RgbImage};
use nalgebra::Point3;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;
/// Depth image columns left of this have no sensor reading
pub const INVALID_DEPTH_COLUMNS: u32 = 8;

pub fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics::new(50.0, 50.0, 32.0, 24.0, WIDTH, HEIGHT)
}

pub fn translation(x: f64, y: f64, z: f64) -> Transform3D {
    Transform3D::from_translation_rotation(Vector3::new(x, y, z), UnitQuaternion::identity())
}

/// CPU depth renderer that projects mesh vertices as single-pixel splats
///
/// Uses the render convention of the scene camera: the camera looks down
/// its local -z axis with +y up, so depth is `-z` in camera space.
pub struct SplatRenderer {
    width: u32,
    height: u32,
    pub passes: usize,
}

impl SplatRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            passes: 0,
        }
    }
}

impl DepthRenderer for SplatRenderer {
    fn viewport(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn render_depth(&mut self, scene: &SceneGraph) -> Result<DepthMap> {
        self.passes += 1;
        let camera = scene.camera();
        let k = camera.intrinsics;
        let world_to_camera = camera.pose.try_inverse()?;
        let mut depth = DepthMap::zeros(self.width, self.height);
        let width = self.width as usize;

        for instance in scene.visible_instances() {
            let model_to_camera = world_to_camera * instance.transform;
            for vertex in &instance.mesh.vertices {
                let local = Point3::new(vertex.x as f64, vertex.y as f64, vertex.z as f64);
                let p = model_to_camera.matrix.transform_point(&local);
                let z = -p.z;
                if z <= camera.znear || z >= camera.zfar {
                    continue;
                }
                let u = (k.fx * p.x / z + k.cx).floor();
                let v = (k.cy - k.fy * p.y / z).floor();
                if u < 0.0 || v < 0.0 || u >= self.width as f64 || v >= self.height as f64 {
                    continue;
                }
                let slot = &mut depth.as_mut_slice()[v as usize * width + u as usize];
                let z = z as f32;
                if *slot == 0.0 || z < *slot {
                    *slot = z;
                }
            }
        }
        Ok(depth)
    }
}

/// Planar grid in the model's xy plane, centered on the origin
pub fn grid_mesh(half_width: f32, half_height: f32, step: f32) -> TriangleMesh {
    let cols = (2.0 * half_width / step).round() as usize + 1;
    let rows = (2.0 * half_height / step).round() as usize + 1;
    let mut vertices = Vec::with_capacity(cols * rows);
    for r in 0..rows {
        for c in 0..cols {
            vertices.push(Point3f::new(
                -half_width + c as f32 * step,
                -half_height + r as f32 * step,
                0.0,
            ));
        }
    }

    let mut faces = Vec::new();
    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let i = r * cols + c;
            faces.push([i, i + 1, i + cols]);
            faces.push([i + 1, i + cols + 1, i + cols]);
        }
    }
    TriangleMesh::from_vertices_and_faces(vertices, faces)
}

pub fn write_obj(mesh: &TriangleMesh, path: &Path) {
    let mut text = String::new();
    for v in &mesh.vertices {
        writeln!(text, "v {} {} {}", v.x, v.y, v.z).unwrap();
    }
    for f in &mesh.faces {
        writeln!(text, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1).unwrap();
    }
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, text).unwrap();
}

/// One trajectory record: frame id plus camera-to-world translation
pub struct Frame {
    pub id: &'static str,
    pub camera: [f64; 3],
}

/// Scratch model repository, input frames and trajectory
pub struct Fixture {
    pub dir: TempDir,
    pub objects: Vec<ObjectEntry>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("data").join("rgb")).unwrap();
        std::fs::create_dir_all(dir.path().join("data").join("depth")).unwrap();
        Self {
            dir,
            objects: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn model_dir(&self) -> PathBuf {
        self.path().join("models")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    /// Add a square plate of half size `half` placed by `transform`
    pub fn with_plate(mut self, name: &str, half: f32, transform: Transform3D) -> Self {
        let path = self.model_dir().join(name).join(format!("{name}.obj"));
        write_obj(&grid_mesh(half, half, 0.01), &path);
        self.objects.push(ObjectEntry::new(name, ObjectKind::Normal, &transform));
        self
    }

    /// Add a split object whose parts are plates at the given model offsets
    pub fn with_split(
        mut self,
        name: &str,
        parts: &[(&str, f32, [f32; 3])],
        transform: Transform3D,
    ) -> Self {
        for (part, half, offset) in parts {
            let mut mesh = grid_mesh(*half, *half, 0.01);
            for v in &mut mesh.vertices {
                v.x += offset[0];
                v.y += offset[1];
                v.z += offset[2];
            }
            let path = self.model_dir().join(name).join("split").join(format!("{part}.obj"));
            write_obj(&mesh, &path);
        }
        self.objects.push(ObjectEntry::new(name, ObjectKind::Split, &transform));
        self
    }

    /// Write the trajectory and one RGB/depth pair per frame
    pub fn with_frames(self, frames: &[Frame]) -> Self {
        let mut text = String::from("# IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME\n");
        for (i, frame) in frames.iter().enumerate() {
            let [x, y, z] = frame.camera;
            writeln!(text, "{} 1 0 0 0 {x} {y} {z} 1 {}", i + 1, frame.id).unwrap();
            self.write_images(frame.id);
        }
        std::fs::write(self.trajectory_path(), text).unwrap();
        self
    }

    pub fn trajectory_path(&self) -> PathBuf {
        self.path().join("images.txt")
    }

    fn write_images(&self, frame_id: &str) {
        let data = self.path().join("data");
        let rgb = RgbImage::from_fn(WIDTH, HEIGHT, |x, y| Rgb([(x * 3) as u8, (y * 5) as u8, 200]));
        rgb.save(data.join("rgb").join(frame_id)).unwrap();

        let depth: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::from_fn(WIDTH, HEIGHT, |x, _| {
            Luma([if x < INVALID_DEPTH_COLUMNS { 0 } else { 2000 }])
        });
        depth.save(data.join("depth").join(frame_id)).unwrap();
    }

    pub fn config(&self) -> AnnotationConfig {
        let mut config = AnnotationConfig::new(
            self.model_dir(),
            self.path().join("data"),
            self.output_dir(),
            self.trajectory_path(),
            intrinsics(),
        )
        .with_depth_scale(1.0);
        for entry in &self.objects {
            config = config.with_object(entry.clone());
        }
        config
    }
}

/// Two plates side by side, two meters in front of the camera
pub fn side_by_side() -> Fixture {
    Fixture::new()
        .with_plate("025_mug", 0.2, translation(-0.4, 0.0, 2.0))
        .with_plate("003_cracker_box", 0.2, translation(0.4, 0.0, 2.0))
}

/// A small plate hidden behind a larger one
pub fn occluded() -> Fixture {
    Fixture::new()
        .with_plate("025_mug", 0.3, translation(0.0, 0.0, 2.0))
        .with_plate("003_cracker_box", 0.4, translation(0.0, 0.0, 4.0))
}
