//! Host scene abstraction.
//!
//! `SceneHandle` is the scene-graph mutation surface scripts are allowed to
//! reach; `SceneHost` owns scenes and is used by the preview flow to create
//! and tear down throwaway ones. Both live on the main context only.

pub mod memory;

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::assets::AssetFormat;

pub use memory::{MemoryHost, MemoryScene};

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("object not found: {0}")]
    ObjectNotFound(String),

    #[error("material not found: {0}")]
    MaterialNotFound(String),

    #[error("scene not found: {0}")]
    SceneNotFound(String),

    #[error("scene already exists: {0}")]
    SceneExists(String),

    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("render failed: {0}")]
    Render(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mesh primitives the host can add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    Cube,
    UvSphere,
    Cylinder,
    Cone,
    Plane,
}

impl PrimitiveKind {
    /// Accepts `cube`, `uv_sphere`/`sphere`, `cylinder`, `cone`, `plane`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "cube" => Some(PrimitiveKind::Cube),
            "uv_sphere" | "sphere" => Some(PrimitiveKind::UvSphere),
            "cylinder" => Some(PrimitiveKind::Cylinder),
            "cone" => Some(PrimitiveKind::Cone),
            "plane" => Some(PrimitiveKind::Plane),
            _ => None,
        }
    }

    /// Host-style default object name.
    pub fn default_name(self) -> &'static str {
        match self {
            PrimitiveKind::Cube => "Cube",
            PrimitiveKind::UvSphere => "Sphere",
            PrimitiveKind::Cylinder => "Cylinder",
            PrimitiveKind::Cone => "Cone",
            PrimitiveKind::Plane => "Plane",
        }
    }
}

/// Parameters for [`SceneHandle::add_primitive`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimitiveSpec {
    pub kind: PrimitiveKind,
    pub size: f64,
    pub radius: f64,
    pub depth: f64,
    pub location: [f64; 3],
}

impl PrimitiveSpec {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            size: 2.0,
            radius: 1.0,
            depth: 2.0,
            location: [0.0; 3],
        }
    }
}

/// Value for a material node input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaterialValue {
    Scalar(f64),
    Color([f64; 4]),
}

/// Structured scene metadata handed to the generation backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSummary {
    pub scene: String,
    pub objects: Vec<String>,
    pub active: Option<String>,
    pub collections: Vec<String>,
}

/// Scene-graph mutation API exposed to scripts.
pub trait SceneHandle {
    fn name(&self) -> &str;

    /// Add a primitive and make it active. Returns the final object name.
    fn add_primitive(&mut self, spec: &PrimitiveSpec) -> Result<String, SceneError>;

    fn active_object(&self) -> Option<String>;

    /// Rename an object. Returns the final (possibly de-duplicated) name.
    fn rename_object(&mut self, object: &str, new_name: &str) -> Result<String, SceneError>;

    fn set_location(&mut self, object: &str, location: [f64; 3]) -> Result<(), SceneError>;

    fn set_scale(&mut self, object: &str, scale: [f64; 3]) -> Result<(), SceneError>;

    /// Create a node material. Returns the final material name.
    fn create_material(&mut self, name: &str) -> Result<String, SceneError>;

    fn set_material_input(
        &mut self,
        material: &str,
        input: &str,
        value: MaterialValue,
    ) -> Result<(), SceneError>;

    fn assign_material(&mut self, object: &str, material: &str) -> Result<(), SceneError>;

    /// Append every object from a native scene library. Returns object names.
    fn link_library(&mut self, path: &Path) -> Result<Vec<String>, SceneError>;

    /// Run the host importer for `format`. Returns the new object names.
    fn import_file(&mut self, format: AssetFormat, path: &Path) -> Result<Vec<String>, SceneError>;

    /// Name of the collection new objects land in.
    fn current_collection(&self) -> String;

    fn link_to_collection(&mut self, object: &str, collection: &str) -> Result<(), SceneError>;

    fn object_names(&self) -> Vec<String>;

    fn remove_object(&mut self, object: &str) -> Result<(), SceneError>;

    /// Remove every object, leaving an empty scene.
    fn clear(&mut self);

    /// Render a still to `output`. Returns the written path.
    fn render_still(&mut self, output: &Path) -> Result<PathBuf, SceneError>;

    /// File extension of the artifact `render_still` writes.
    fn render_extension(&self) -> &'static str {
        "png"
    }

    fn collections(&self) -> Vec<String> {
        vec![self.current_collection()]
    }

    fn summary(&self) -> SceneSummary {
        SceneSummary {
            scene: self.name().to_string(),
            objects: self.object_names(),
            active: self.active_object(),
            collections: self.collections(),
        }
    }
}

/// A scene shared between the host and a running script. Main context only.
pub type SharedScene = Rc<RefCell<dyn SceneHandle>>;

/// Wrap a concrete scene for sharing.
pub fn share<S: SceneHandle + 'static>(scene: S) -> SharedScene {
    Rc::new(RefCell::new(scene))
}

/// Owner of the scenes in a running host.
pub trait SceneHost {
    fn active_scene(&self) -> SharedScene;

    /// Create a new, non-active scene.
    fn create_scene(&mut self, name: &str) -> Result<SharedScene, SceneError>;

    fn remove_scene(&mut self, name: &str) -> Result<(), SceneError>;

    fn scene_names(&self) -> Vec<String>;
}
