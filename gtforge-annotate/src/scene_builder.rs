//! Scene construction from the object catalog

use crate::config::{AnnotationConfig, ExportMode, ObjectEntry, ObjectKind};
use gtforge_core::{
    CameraIntrinsics, CameraNode, Error, MeshLoader, ObjectInstance, Result, SceneGraph,
};
use gtforge_io::list_files_with_extension;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Sub-directory holding the parts of a split object
pub const SPLIT_DIR: &str = "split";
const MESH_EXTENSION: &str = "obj";

/// Builds the static [`SceneGraph`] for a run
pub struct SceneBuilder<L: MeshLoader> {
    model_dir: PathBuf,
    loader: L,
    categories: Option<BTreeMap<String, u32>>,
}

impl<L: MeshLoader> SceneBuilder<L> {
    /// Builder reading meshes below `model_dir`; category ids equal indices
    pub fn new(model_dir: impl Into<PathBuf>, loader: L) -> Self {
        Self {
            model_dir: model_dir.into(),
            loader,
            categories: None,
        }
    }

    /// Builder configured for the run's export mode
    pub fn from_config(config: &AnnotationConfig, loader: L) -> Self {
        let builder = Self::new(config.model_dir.clone(), loader);
        match &config.export {
            ExportMode::PerObject => builder,
            ExportMode::Bop(options) => builder.with_categories(options.categories.clone()),
        }
    }

    /// Resolve category ids through a name table; unknown names become errors
    pub fn with_categories(mut self, categories: BTreeMap<String, u32>) -> Self {
        self.categories = Some(categories);
        self
    }

    /// Mesh file of a normal object
    pub fn normal_mesh_path(&self, name: &str) -> PathBuf {
        self.model_dir
            .join(name)
            .join(format!("{name}.{MESH_EXTENSION}"))
    }

    /// Directory with the parts of a split object
    pub fn split_dir(&self, name: &str) -> PathBuf {
        self.model_dir.join(name).join(SPLIT_DIR)
    }

    /// Expand the catalog into instances and attach a camera with `intrinsics`
    pub fn build(
        &self,
        objects: &[ObjectEntry],
        intrinsics: CameraIntrinsics,
    ) -> Result<SceneGraph> {
        let mut instances = Vec::new();

        for entry in objects {
            let transform = entry.model_transform();
            match entry.kind {
                ObjectKind::Normal => {
                    let path = self.normal_mesh_path(&entry.name);
                    let instance = self.make_instance(instances.len(), &entry.name, &path, entry)?;
                    instances.push(instance);
                }
                ObjectKind::Split => {
                    let parts =
                        list_files_with_extension(self.split_dir(&entry.name), MESH_EXTENSION)?;
                    if parts.is_empty() {
                        return Err(Error::InvalidData(format!(
                            "split object '{}' has no parts in {}",
                            entry.name,
                            self.split_dir(&entry.name).display()
                        )));
                    }
                    for part in parts {
                        let name = part_name(&part)?;
                        let instance = self.make_instance(instances.len(), &name, &part, entry)?;
                        instances.push(instance);
                    }
                }
            }
            debug!("Catalog entry '{}' -> transform {:?}", entry.name, transform.translation());
        }

        info!(
            "Built scene with {} instances from {} catalog entries",
            instances.len(),
            objects.len()
        );
        SceneGraph::new(CameraNode::new(intrinsics), instances)
    }

    fn make_instance(
        &self,
        index: usize,
        name: &str,
        path: &Path,
        entry: &ObjectEntry,
    ) -> Result<ObjectInstance> {
        let category_id = self.category_id(index, name)?;
        let mesh = self.loader.load_mesh(path)?;
        debug!(
            "Instance {index} '{name}' (category {category_id}): {} vertices, {} faces",
            mesh.vertex_count(),
            mesh.face_count()
        );

        Ok(ObjectInstance::new(index, name, Arc::new(mesh), entry.model_transform())
            .with_category_id(category_id)
            .with_mesh_path(path))
    }

    fn category_id(&self, index: usize, name: &str) -> Result<u32> {
        match &self.categories {
            None => u32::try_from(index)
                .map_err(|_| Error::InvalidData(format!("instance index {index} exceeds u32"))),
            Some(table) => table
                .get(name)
                .copied()
                .ok_or_else(|| Error::UnknownCategory(name.to_string())),
        }
    }
}

fn part_name(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidData(format!("bad mesh file name {}", path.display())))
}
