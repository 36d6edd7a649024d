//! Camera trajectory files
//!
//! The reconstruction step writes one pose per line in the COLMAP
//! `images.txt` layout:
//!
//! ```text
//! # IMAGE_ID QW QX QY QZ TX TY TZ [CAMERA_ID] NAME
//! 1 1.0 0.0 0.0 0.0 0.1 0.2 0.3 1 000000.png
//! ```
//!
//! Only lines whose first token parses as a number are pose records; headers
//! and comments are skipped. The frame identifier is always the last token.

use gtforge_core::{CameraPose, Error, Result, Transform3D};
use log::{debug, warn};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Tokens in the shortest valid record: id, 4 quaternion, 3 translation, name
const MIN_RECORD_TOKENS: usize = 9;
const QUATERNION_COLUMNS: std::ops::Range<usize> = 1..5;
const TRANSLATION_COLUMNS: std::ops::Range<usize> = 5..8;

/// What to do when a frame identifier appears more than once
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DuplicateFrames {
    /// Later records replace earlier ones, keeping the first position
    #[default]
    LastWins,
    /// A repeated identifier is a parse error
    Reject,
}

/// Options for reading trajectory files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TrajectoryOptions {
    pub duplicate_frames: DuplicateFrames,
}

impl TrajectoryOptions {
    pub fn with_duplicate_frames(mut self, policy: DuplicateFrames) -> Self {
        self.duplicate_frames = policy;
        self
    }
}

/// Conventional trajectory file name for an interpolation type
/// (`<recon_dir>/campose_all_<interpolation>.txt`)
pub fn trajectory_file_for<P: AsRef<Path>>(reconstruction_dir: P, interpolation: &str) -> PathBuf {
    reconstruction_dir
        .as_ref()
        .join(format!("campose_all_{interpolation}.txt"))
}

/// Frame-id to camera-pose map that preserves file order
#[derive(Debug, Clone, Default)]
pub struct PoseCatalog {
    poses: Vec<CameraPose>,
    by_frame: HashMap<String, usize>,
}

impl PoseCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a trajectory file with default options
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with_options(path, &TrajectoryOptions::default())
    }

    /// Parse a trajectory file
    pub fn from_file_with_options<P: AsRef<Path>>(
        path: P,
        options: &TrajectoryOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let catalog = Self::from_reader(BufReader::new(file), options)?;
        debug!("Loaded {} camera poses from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Parse trajectory records from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R, options: &TrajectoryOptions) -> Result<Self> {
        let mut catalog = Self::new();

        for (line_idx, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line_no = line_idx + 1;
            if let Some(pose) = parse_record(&line, line_no)? {
                if catalog.contains(&pose.frame_id) {
                    match options.duplicate_frames {
                        DuplicateFrames::LastWins => {
                            warn!(
                                "Frame '{}' repeated at line {}, keeping the later pose",
                                pose.frame_id, line_no
                            );
                        }
                        DuplicateFrames::Reject => {
                            return Err(Error::parse(
                                line_no,
                                format!("duplicate frame identifier '{}'", pose.frame_id),
                            ));
                        }
                    }
                }
                catalog.insert(pose);
            }
        }

        Ok(catalog)
    }

    /// Insert or replace a pose; a replaced pose keeps its position
    pub fn insert(&mut self, pose: CameraPose) {
        match self.by_frame.get(&pose.frame_id) {
            Some(&idx) => self.poses[idx] = pose,
            None => {
                self.by_frame.insert(pose.frame_id.clone(), self.poses.len());
                self.poses.push(pose);
            }
        }
    }

    pub fn get(&self, frame_id: &str) -> Option<&CameraPose> {
        self.by_frame.get(frame_id).map(|&idx| &self.poses[idx])
    }

    pub fn contains(&self, frame_id: &str) -> bool {
        self.by_frame.contains_key(frame_id)
    }

    pub fn len(&self) -> usize {
        self.poses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Poses in file order
    pub fn iter(&self) -> std::slice::Iter<'_, CameraPose> {
        self.poses.iter()
    }

    /// Replace every pose transform, e.g. to apply a registration
    pub fn try_map_transforms<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(&CameraPose) -> Result<Transform3D>,
    {
        for pose in &mut self.poses {
            pose.transform = f(pose)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PoseCatalog {
    type Item = &'a CameraPose;
    type IntoIter = std::slice::Iter<'a, CameraPose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}

/// Parse one line; `Ok(None)` for lines that are not pose records
fn parse_record(line: &str, line_no: usize) -> Result<Option<CameraPose>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = parts.first() else {
        return Ok(None);
    };
    // words such as `inf` or `nan` parse as floats but never start a record
    if !first.parse::<f64>().is_ok_and(f64::is_finite) {
        return Ok(None);
    }

    if parts.len() < MIN_RECORD_TOKENS {
        return Err(Error::parse(
            line_no,
            format!("expected at least {MIN_RECORD_TOKENS} fields, found {}", parts.len()),
        ));
    }

    let field = |idx: usize, name: &str| -> Result<f64> {
        let value = parts[idx]
            .parse::<f64>()
            .map_err(|_| Error::parse(line_no, format!("invalid {name} value '{}'", parts[idx])))?;
        if !value.is_finite() {
            return Err(Error::parse(line_no, format!("non-finite {name} value")));
        }
        Ok(value)
    };

    let q: Vec<f64> = QUATERNION_COLUMNS
        .map(|i| field(i, "quaternion"))
        .collect::<Result<_>>()?;
    let t: Vec<f64> = TRANSLATION_COLUMNS
        .map(|i| field(i, "translation"))
        .collect::<Result<_>>()?;

    let quaternion = Quaternion::new(q[0], q[1], q[2], q[3]);
    if quaternion.norm() < f64::EPSILON {
        return Err(Error::parse(line_no, "zero-norm quaternion"));
    }
    let rotation = UnitQuaternion::from_quaternion(quaternion);
    let translation = Vector3::new(t[0], t[1], t[2]);

    let frame_id = parts[parts.len() - 1].to_string();
    Ok(Some(CameraPose::camera_to_world(
        frame_id,
        Transform3D::from_translation_rotation(translation, rotation),
    )))
}
