//! Run configuration
//!
//! The host fills an [`AnnotationConfig`] (directly or from JSON) and hands
//! it to the pipeline; nothing is read from the environment.

use gtforge_core::{CameraIntrinsics, Error, PublishWindow, Registration, Result, Transform3D};
use gtforge_io::TrajectoryOptions;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default tolerance when matching a solo depth pass against the full scene.
/// Tied to the depth buffer's units; raise it for renderers with lossy depth.
pub const DEFAULT_DEPTH_EPSILON: f32 = 1e-6;

/// Default horizontal margin of the BOP render canvas, per side
pub const DEFAULT_BOP_PAD_X: u32 = 320;
/// Default vertical margin of the BOP render canvas, per side
pub const DEFAULT_BOP_PAD_Y: u32 = 120;

fn default_depth_epsilon() -> f32 {
    DEFAULT_DEPTH_EPSILON
}

/// Category ids of the YCB-Video objects used by the BOP export
pub fn ycb_video_categories() -> BTreeMap<String, u32> {
    [
        ("002_master_chef_can", 1),
        ("003_cracker_box", 2),
        ("004_sugar_box", 3),
        ("005_tomato_soup_can", 4),
        ("006_mustard_bottle", 5),
        ("007_tuna_fish_can", 6),
        ("009_gelatin_box", 7),
        ("010_potted_meat_can", 8),
        ("025_mug", 9),
        ("040_large_marker", 10),
    ]
    .into_iter()
    .map(|(name, id)| (name.to_string(), id))
    .collect()
}

/// How a catalog entry maps onto scene instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// One mesh, `<model_dir>/<name>/<name>.obj`
    Normal,
    /// One instance per `<model_dir>/<name>/split/*.obj`
    Split,
}

/// One object of the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectEntry {
    pub name: String,
    pub kind: ObjectKind,
    /// Row-major model-to-world transform
    pub transform: [[f64; 4]; 4],
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>, kind: ObjectKind, transform: &Transform3D) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: transform.to_rows(),
        }
    }

    pub fn model_transform(&self) -> Transform3D {
        Transform3D::from_rows(&self.transform)
    }
}

/// BOP export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BopOptions {
    /// Extra columns rendered on each side of the image
    pub pad_x: u32,
    /// Extra rows rendered above and below the image
    pub pad_y: u32,
    /// Object name to category id
    pub categories: BTreeMap<String, u32>,
}

impl Default for BopOptions {
    fn default() -> Self {
        Self {
            pad_x: DEFAULT_BOP_PAD_X,
            pad_y: DEFAULT_BOP_PAD_Y,
            categories: ycb_video_categories(),
        }
    }
}

impl BopOptions {
    pub fn with_padding(mut self, pad_x: u32, pad_y: u32) -> Self {
        self.pad_x = pad_x;
        self.pad_y = pad_y;
        self
    }

    pub fn with_categories(mut self, categories: BTreeMap<String, u32>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_category(mut self, name: impl Into<String>, id: u32) -> Self {
        self.categories.insert(name.into(), id);
        self
    }
}

/// Output layout, fixed for the whole run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExportMode {
    /// One folder per instance with `pose/` and `rgb/`
    PerObject,
    /// BOP scene layout
    Bop(BopOptions),
}

impl ExportMode {
    /// Intrinsics of the offscreen canvas for images described by `intrinsics`
    pub fn render_intrinsics(&self, intrinsics: &CameraIntrinsics) -> CameraIntrinsics {
        match self {
            ExportMode::PerObject => *intrinsics,
            ExportMode::Bop(options) => intrinsics.padded(options.pad_x, options.pad_y),
        }
    }

    /// Region of the canvas that corresponds to the input images
    pub fn publish_window(&self, intrinsics: &CameraIntrinsics) -> PublishWindow {
        match self {
            ExportMode::PerObject => PublishWindow::full(intrinsics.width, intrinsics.height),
            ExportMode::Bop(options) => PublishWindow::new(
                options.pad_x,
                options.pad_y,
                intrinsics.width,
                intrinsics.height,
            ),
        }
    }
}

/// Everything a run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationConfig {
    /// Mesh repository root
    pub model_dir: PathBuf,
    /// Input frames (`rgb/` and `depth/` sub-folders)
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub trajectory_file: PathBuf,
    #[serde(default)]
    pub trajectory: TrajectoryOptions,
    /// Intrinsics and resolution of the input images
    pub intrinsics: CameraIntrinsics,
    /// Depth image units per meter factor recorded in `scene_camera.json`
    pub depth_scale: f64,
    /// Objects in scene order
    pub objects: Vec<ObjectEntry>,
    pub export: ExportMode,
    #[serde(default)]
    pub registration: Option<Registration>,
    #[serde(default = "default_depth_epsilon")]
    pub depth_epsilon: f32,
}

impl AnnotationConfig {
    /// Create a per-object configuration with no objects
    pub fn new(
        model_dir: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        trajectory_file: impl Into<PathBuf>,
        intrinsics: CameraIntrinsics,
    ) -> Self {
        Self {
            model_dir: model_dir.into(),
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            trajectory_file: trajectory_file.into(),
            trajectory: TrajectoryOptions::default(),
            intrinsics,
            depth_scale: 1.0,
            objects: Vec::new(),
            export: ExportMode::PerObject,
            registration: None,
            depth_epsilon: DEFAULT_DEPTH_EPSILON,
        }
    }

    pub fn with_object(mut self, entry: ObjectEntry) -> Self {
        self.objects.push(entry);
        self
    }

    pub fn with_export(mut self, export: ExportMode) -> Self {
        self.export = export;
        self
    }

    pub fn with_depth_scale(mut self, depth_scale: f64) -> Self {
        self.depth_scale = depth_scale;
        self
    }

    pub fn with_registration(mut self, registration: Registration) -> Self {
        self.registration = Some(registration);
        self
    }

    pub fn with_trajectory_options(mut self, options: TrajectoryOptions) -> Self {
        self.trajectory = options;
        self
    }

    pub fn with_depth_epsilon(mut self, epsilon: f32) -> Self {
        self.depth_epsilon = epsilon;
        self
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let k = &self.intrinsics;
        if k.width == 0 || k.height == 0 {
            return Err(Error::InvalidData("image resolution must be non-zero".to_string()));
        }
        if ![k.fx, k.fy, k.cx, k.cy].iter().all(|v| v.is_finite()) || k.fx <= 0.0 || k.fy <= 0.0 {
            return Err(Error::InvalidData(format!("invalid intrinsics {k:?}")));
        }
        if let ExportMode::Bop(options) = &self.export {
            if k.checked_padded(options.pad_x, options.pad_y).is_none() {
                return Err(Error::InvalidData(format!(
                    "padding {}x{} overflows the {}x{} canvas",
                    options.pad_x, options.pad_y, k.width, k.height
                )));
            }
        }
        if !self.depth_scale.is_finite() || self.depth_scale <= 0.0 {
            return Err(Error::InvalidData(format!("invalid depth scale {}", self.depth_scale)));
        }
        if !self.depth_epsilon.is_finite() || self.depth_epsilon <= 0.0 {
            return Err(Error::InvalidData(format!("invalid depth epsilon {}", self.depth_epsilon)));
        }
        if let Some(registration) = &self.registration {
            if !registration.scale.is_finite() || registration.scale <= 0.0 {
                return Err(Error::InvalidData(format!(
                    "invalid registration scale {}",
                    registration.scale
                )));
            }
        }
        for entry in &self.objects {
            if !entry.model_transform().is_finite() {
                return Err(Error::InvalidData(format!(
                    "object '{}' has a non-finite transform",
                    entry.name
                )));
            }
        }
        Ok(())
    }

    /// Intrinsics of the offscreen canvas
    pub fn render_intrinsics(&self) -> CameraIntrinsics {
        self.export.render_intrinsics(&self.intrinsics)
    }

    /// Canvas size `(width, height)` the renderer must be created with
    pub fn canvas_size(&self) -> (u32, u32) {
        let k = self.render_intrinsics();
        (k.width, k.height)
    }

    pub fn publish_window(&self) -> PublishWindow {
        self.export.publish_window(&self.intrinsics)
    }

    /// Raw RGB image of a frame
    pub fn rgb_path(&self, frame_id: &str) -> PathBuf {
        self.data_dir.join("rgb").join(frame_id)
    }

    /// Raw depth image of a frame
    pub fn depth_path(&self, frame_id: &str) -> PathBuf {
        self.data_dir.join("depth").join(frame_id)
    }
}
