//! In-memory scene and host used by the CLI, the daemon and tests.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::Serialize;

use crate::assets::AssetFormat;

use super::{
    MaterialValue, PrimitiveKind, PrimitiveSpec, SceneError, SceneHandle, SceneHost, SharedScene,
};

pub const DEFAULT_COLLECTION: &str = "Collection";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectSource {
    Primitive { kind: PrimitiveKind },
    Library { path: PathBuf },
    Imported { format: AssetFormat, path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneObject {
    pub name: String,
    pub source: ObjectSource,
    pub location: [f64; 3],
    pub scale: [f64; 3],
    pub material: Option<String>,
    pub collection: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Material {
    pub inputs: BTreeMap<String, MaterialValue>,
}

/// Scene graph held in memory. Renders a JSON snapshot as its artifact.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryScene {
    name: String,
    objects: Vec<SceneObject>,
    materials: BTreeMap<String, Material>,
    collections: Vec<String>,
    active: Option<String>,
    #[serde(skip)]
    render_failure: Option<String>,
}

impl MemoryScene {
    /// A scene holding the host's default collection and nothing else.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
            materials: BTreeMap::new(),
            collections: vec![DEFAULT_COLLECTION.to_string()],
            active: None,
            render_failure: None,
        }
    }

    /// A scene with the host's startup cube, as a fresh file would have.
    pub fn with_default_cube(name: impl Into<String>) -> Self {
        let mut scene = Self::new(name);
        let startup = ObjectSource::Primitive {
            kind: PrimitiveKind::Cube,
        };
        scene.push_object("Cube", startup, [0.0; 3]);
        scene
    }

    /// Make every subsequent render fail with `reason`.
    pub fn set_render_failure(&mut self, reason: Option<String>) {
        self.render_failure = reason;
    }

    pub fn object(&self, name: &str) -> Option<&SceneObject> {
        self.objects.iter().find(|o| o.name == name)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials.get(name)
    }

    fn object_mut(&mut self, name: &str) -> Result<&mut SceneObject, SceneError> {
        self.objects
            .iter_mut()
            .find(|o| o.name == name)
            .ok_or_else(|| SceneError::ObjectNotFound(name.to_string()))
    }

    fn unique_object_name(&self, base: &str) -> String {
        unique_name(base, |n| self.object(n).is_some())
    }

    fn push_object(&mut self, base: &str, source: ObjectSource, location: [f64; 3]) -> String {
        let name = self.unique_object_name(base);
        self.objects.push(SceneObject {
            name: name.clone(),
            source,
            location,
            scale: [1.0; 3],
            material: None,
            collection: DEFAULT_COLLECTION.to_string(),
        });
        self.active = Some(name.clone());
        name
    }

    fn require_file(path: &Path) -> Result<String, SceneError> {
        if !path.is_file() {
            return Err(SceneError::FileNotFound(path.to_path_buf()));
        }
        Ok(path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Imported")
            .to_string())
    }
}

/// Host-style de-duplication: `Cube`, `Cube.001`, `Cube.002`, ...
fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}.{n:03}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

impl SceneHandle for MemoryScene {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_primitive(&mut self, spec: &PrimitiveSpec) -> Result<String, SceneError> {
        if spec.size <= 0.0 || spec.radius <= 0.0 || spec.depth <= 0.0 {
            return Err(SceneError::InvalidArgument(
                "primitive dimensions must be positive".to_string(),
            ));
        }
        Ok(self.push_object(
            spec.kind.default_name(),
            ObjectSource::Primitive { kind: spec.kind },
            spec.location,
        ))
    }

    fn active_object(&self) -> Option<String> {
        self.active.clone()
    }

    fn rename_object(&mut self, object: &str, new_name: &str) -> Result<String, SceneError> {
        if new_name.trim().is_empty() {
            return Err(SceneError::InvalidArgument("empty object name".to_string()));
        }
        if object == new_name {
            self.object_mut(object)?;
            return Ok(new_name.to_string());
        }
        let final_name = self.unique_object_name(new_name);
        let obj = self.object_mut(object)?;
        obj.name = final_name.clone();
        if self.active.as_deref() == Some(object) {
            self.active = Some(final_name.clone());
        }
        Ok(final_name)
    }

    fn set_location(&mut self, object: &str, location: [f64; 3]) -> Result<(), SceneError> {
        self.object_mut(object)?.location = location;
        Ok(())
    }

    fn set_scale(&mut self, object: &str, scale: [f64; 3]) -> Result<(), SceneError> {
        self.object_mut(object)?.scale = scale;
        Ok(())
    }

    fn create_material(&mut self, name: &str) -> Result<String, SceneError> {
        if name.trim().is_empty() {
            return Err(SceneError::InvalidArgument("empty material name".to_string()));
        }
        let final_name = unique_name(name, |n| self.materials.contains_key(n));
        self.materials.insert(final_name.clone(), Material::default());
        Ok(final_name)
    }

    fn set_material_input(
        &mut self,
        material: &str,
        input: &str,
        value: MaterialValue,
    ) -> Result<(), SceneError> {
        let mat = self
            .materials
            .get_mut(material)
            .ok_or_else(|| SceneError::MaterialNotFound(material.to_string()))?;
        mat.inputs.insert(input.to_string(), value);
        Ok(())
    }

    fn assign_material(&mut self, object: &str, material: &str) -> Result<(), SceneError> {
        if !self.materials.contains_key(material) {
            return Err(SceneError::MaterialNotFound(material.to_string()));
        }
        self.object_mut(object)?.material = Some(material.to_string());
        Ok(())
    }

    fn link_library(&mut self, path: &Path) -> Result<Vec<String>, SceneError> {
        let stem = Self::require_file(path)?;
        let name = self.push_object(
            &stem,
            ObjectSource::Library {
                path: path.to_path_buf(),
            },
            [0.0; 3],
        );
        Ok(vec![name])
    }

    fn import_file(&mut self, format: AssetFormat, path: &Path) -> Result<Vec<String>, SceneError> {
        let stem = Self::require_file(path)?;
        let name = self.push_object(
            &stem,
            ObjectSource::Imported {
                format,
                path: path.to_path_buf(),
            },
            [0.0; 3],
        );
        Ok(vec![name])
    }

    fn current_collection(&self) -> String {
        DEFAULT_COLLECTION.to_string()
    }

    fn link_to_collection(&mut self, object: &str, collection: &str) -> Result<(), SceneError> {
        if !self.collections.iter().any(|c| c == collection) {
            self.collections.push(collection.to_string());
        }
        self.object_mut(object)?.collection = collection.to_string();
        Ok(())
    }

    fn object_names(&self) -> Vec<String> {
        self.objects.iter().map(|o| o.name.clone()).collect()
    }

    fn remove_object(&mut self, object: &str) -> Result<(), SceneError> {
        let before = self.objects.len();
        self.objects.retain(|o| o.name != object);
        if self.objects.len() == before {
            return Err(SceneError::ObjectNotFound(object.to_string()));
        }
        if self.active.as_deref() == Some(object) {
            self.active = None;
        }
        Ok(())
    }

    fn clear(&mut self) {
        self.objects.clear();
        self.active = None;
    }

    fn render_still(&mut self, output: &Path) -> Result<PathBuf, SceneError> {
        if let Some(reason) = &self.render_failure {
            return Err(SceneError::Render(reason.clone()));
        }
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let snapshot = serde_json::to_vec_pretty(self)
            .map_err(|e| SceneError::Render(e.to_string()))?;
        std::fs::write(output, snapshot)?;
        Ok(output.to_path_buf())
    }

    fn render_extension(&self) -> &'static str {
        "json"
    }

    fn collections(&self) -> Vec<String> {
        self.collections.clone()
    }
}

/// Host owning several in-memory scenes; the first one is active.
pub struct MemoryHost {
    scenes: Vec<Rc<RefCell<MemoryScene>>>,
    active: usize,
    render_failure: Option<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::with_scene(MemoryScene::with_default_cube("Scene"))
    }

    pub fn with_scene(scene: MemoryScene) -> Self {
        Self {
            scenes: vec![Rc::new(RefCell::new(scene))],
            active: 0,
            render_failure: None,
        }
    }

    /// Scenes created from now on fail to render with `reason`.
    pub fn fail_new_scene_renders(mut self, reason: impl Into<String>) -> Self {
        self.render_failure = Some(reason.into());
        self
    }

    /// Concrete handle to the active scene, for inspection.
    pub fn active_memory_scene(&self) -> Rc<RefCell<MemoryScene>> {
        Rc::clone(&self.scenes[self.active])
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.scenes.iter().position(|s| s.borrow().name == name)
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneHost for MemoryHost {
    fn active_scene(&self) -> SharedScene {
        self.scenes[self.active].clone()
    }

    fn create_scene(&mut self, name: &str) -> Result<SharedScene, SceneError> {
        if self.position(name).is_some() {
            return Err(SceneError::SceneExists(name.to_string()));
        }
        let mut scene = MemoryScene::with_default_cube(name);
        scene.set_render_failure(self.render_failure.clone());
        let scene = Rc::new(RefCell::new(scene));
        self.scenes.push(Rc::clone(&scene));
        Ok(scene)
    }

    fn remove_scene(&mut self, name: &str) -> Result<(), SceneError> {
        let idx = self
            .position(name)
            .ok_or_else(|| SceneError::SceneNotFound(name.to_string()))?;
        if idx == self.active {
            return Err(SceneError::InvalidArgument(
                "cannot remove the active scene".to_string(),
            ));
        }
        self.scenes.remove(idx);
        if idx < self.active {
            self.active -= 1;
        }
        Ok(())
    }

    fn scene_names(&self) -> Vec<String> {
        self.scenes.iter().map(|s| s.borrow().name.clone()).collect()
    }
}
