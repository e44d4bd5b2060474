//! The `context` value handed to `rendermind_action`.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use rhai::{Array, Dynamic, Engine, EvalAltResult, Map};

use crate::assets::AssetFormat;
use crate::scene::{MaterialValue, PrimitiveKind, PrimitiveSpec, SceneError, SharedScene};

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Per-run log shared between the context and the engine's print hook.
pub type RunLog = Rc<RefCell<Vec<String>>>;

/// Script-facing wrapper around the target scene.
#[derive(Clone)]
pub struct ScriptContext {
    scene: SharedScene,
    log: RunLog,
}

fn scene_err(err: SceneError) -> Box<EvalAltResult> {
    err.to_string().into()
}

fn number(value: &Dynamic) -> Option<f64> {
    value
        .as_float()
        .ok()
        .or_else(|| value.as_int().ok().map(|i| i as f64))
}

fn vec3(value: Array, what: &str) -> ScriptResult<[f64; 3]> {
    let nums: Option<Vec<f64>> = value.iter().map(number).collect();
    match nums.as_deref() {
        Some([x, y, z]) => Ok([*x, *y, *z]),
        _ => Err(format!("{what} must be an array of three numbers").into()),
    }
}

fn opt_number(opts: &Map, key: &str, default: f64) -> ScriptResult<f64> {
    match opts.get(key) {
        None => Ok(default),
        Some(v) => number(v).ok_or_else(|| format!("option '{key}' must be a number").into()),
    }
}

impl ScriptContext {
    pub fn new(scene: SharedScene, log: RunLog) -> Self {
        Self { scene, log }
    }

    fn spec_from(kind: PrimitiveKind, opts: &Map) -> ScriptResult<PrimitiveSpec> {
        let mut spec = PrimitiveSpec::new(kind);
        spec.size = opt_number(opts, "size", spec.size)?;
        spec.radius = opt_number(opts, "radius", spec.radius)?;
        spec.depth = opt_number(opts, "depth", spec.depth)?;
        if let Some(loc) = opts.get("location") {
            let arr = loc
                .clone()
                .into_array()
                .map_err(|_| Box::<EvalAltResult>::from("option 'location' must be an array"))?;
            spec.location = vec3(arr, "location")?;
        }
        Ok(spec)
    }

    fn add(&mut self, kind: PrimitiveKind, opts: Map) -> ScriptResult<String> {
        let spec = Self::spec_from(kind, &opts)?;
        self.scene.borrow_mut().add_primitive(&spec).map_err(scene_err)
    }

    fn add_primitive(&mut self, kind: &str, opts: Map) -> ScriptResult<String> {
        let kind =
            PrimitiveKind::from_name(kind).ok_or_else(|| format!("unknown primitive '{kind}'"))?;
        self.add(kind, opts)
    }

    fn add_cube(&mut self, opts: Map) -> ScriptResult<String> {
        self.add(PrimitiveKind::Cube, opts)
    }

    fn add_cube_default(&mut self) -> ScriptResult<String> {
        self.add(PrimitiveKind::Cube, Map::new())
    }

    fn add_uv_sphere(&mut self, opts: Map) -> ScriptResult<String> {
        self.add(PrimitiveKind::UvSphere, opts)
    }

    fn add_uv_sphere_default(&mut self) -> ScriptResult<String> {
        self.add(PrimitiveKind::UvSphere, Map::new())
    }

    fn add_cylinder(&mut self, opts: Map) -> ScriptResult<String> {
        self.add(PrimitiveKind::Cylinder, opts)
    }

    fn add_cylinder_default(&mut self) -> ScriptResult<String> {
        self.add(PrimitiveKind::Cylinder, Map::new())
    }

    /// Name of the active object, or `()` when nothing is active.
    fn active_object(&mut self) -> Dynamic {
        self.scene
            .borrow()
            .active_object()
            .map(Dynamic::from)
            .unwrap_or(Dynamic::UNIT)
    }

    fn rename(&mut self, object: &str, new_name: &str) -> ScriptResult<String> {
        self.scene
            .borrow_mut()
            .rename_object(object, new_name)
            .map_err(scene_err)
    }

    fn set_location(&mut self, object: &str, location: Array) -> ScriptResult<()> {
        let location = vec3(location, "location")?;
        self.scene
            .borrow_mut()
            .set_location(object, location)
            .map_err(scene_err)
    }

    fn set_scale(&mut self, object: &str, scale: Array) -> ScriptResult<()> {
        let scale = vec3(scale, "scale")?;
        self.scene
            .borrow_mut()
            .set_scale(object, scale)
            .map_err(scene_err)
    }

    fn new_material(&mut self, name: &str) -> ScriptResult<String> {
        self.scene.borrow_mut().create_material(name).map_err(scene_err)
    }

    fn set_material_input(&mut self, material: &str, input: &str, value: Dynamic) -> ScriptResult<()> {
        let value = if let Some(scalar) = number(&value) {
            MaterialValue::Scalar(scalar)
        } else if let Ok(arr) = value.into_array() {
            let nums: Option<Vec<f64>> = arr.iter().map(number).collect();
            match nums.as_deref() {
                Some([r, g, b]) => MaterialValue::Color([*r, *g, *b, 1.0]),
                Some([r, g, b, a]) => MaterialValue::Color([*r, *g, *b, *a]),
                _ => return Err("color must have three or four components".into()),
            }
        } else {
            return Err("material input must be a number or a color array".into());
        };
        self.scene
            .borrow_mut()
            .set_material_input(material, input, value)
            .map_err(scene_err)
    }

    fn assign_material(&mut self, object: &str, material: &str) -> ScriptResult<()> {
        self.scene
            .borrow_mut()
            .assign_material(object, material)
            .map_err(scene_err)
    }

    fn link_library(&mut self, path: &str) -> ScriptResult<Array> {
        let names = self
            .scene
            .borrow_mut()
            .link_library(Path::new(path))
            .map_err(scene_err)?;
        Ok(names.into_iter().map(Dynamic::from).collect())
    }

    fn import_asset(&mut self, format: &str, path: &str) -> ScriptResult<Array> {
        let format = AssetFormat::from_extension(format)
            .filter(|f| !f.is_library())
            .ok_or_else(|| format!("unsupported import format '{format}'"))?;
        let names = self
            .scene
            .borrow_mut()
            .import_file(format, Path::new(path))
            .map_err(scene_err)?;
        Ok(names.into_iter().map(Dynamic::from).collect())
    }

    fn collection(&mut self) -> String {
        self.scene.borrow().current_collection()
    }

    fn link_to_collection(&mut self, object: &str, collection: &str) -> ScriptResult<()> {
        self.scene
            .borrow_mut()
            .link_to_collection(object, collection)
            .map_err(scene_err)
    }

    fn objects(&mut self) -> Array {
        self.scene
            .borrow()
            .object_names()
            .into_iter()
            .map(Dynamic::from)
            .collect()
    }

    fn remove_object(&mut self, object: &str) -> ScriptResult<()> {
        self.scene.borrow_mut().remove_object(object).map_err(scene_err)
    }

    fn scene_name(&mut self) -> String {
        self.scene.borrow().name().to_string()
    }

    fn log(&mut self, message: Dynamic) {
        self.log.borrow_mut().push(message.to_string());
    }
}

/// Register the `Context` type and its methods.
pub fn register_context(engine: &mut Engine) {
    engine.register_type_with_name::<ScriptContext>("Context");
    engine.register_fn("add_primitive", ScriptContext::add_primitive);
    engine.register_fn("add_cube", ScriptContext::add_cube);
    engine.register_fn("add_cube", ScriptContext::add_cube_default);
    engine.register_fn("add_uv_sphere", ScriptContext::add_uv_sphere);
    engine.register_fn("add_uv_sphere", ScriptContext::add_uv_sphere_default);
    engine.register_fn("add_cylinder", ScriptContext::add_cylinder);
    engine.register_fn("add_cylinder", ScriptContext::add_cylinder_default);
    engine.register_fn("active_object", ScriptContext::active_object);
    engine.register_fn("rename", ScriptContext::rename);
    engine.register_fn("set_location", ScriptContext::set_location);
    engine.register_fn("set_scale", ScriptContext::set_scale);
    engine.register_fn("new_material", ScriptContext::new_material);
    engine.register_fn("set_material_input", ScriptContext::set_material_input);
    engine.register_fn("assign_material", ScriptContext::assign_material);
    engine.register_fn("link_library", ScriptContext::link_library);
    engine.register_fn("import_asset", ScriptContext::import_asset);
    engine.register_fn("collection", ScriptContext::collection);
    engine.register_fn("link_to_collection", ScriptContext::link_to_collection);
    engine.register_fn("objects", ScriptContext::objects);
    engine.register_fn("remove_object", ScriptContext::remove_object);
    engine.register_fn("scene_name", ScriptContext::scene_name);
    engine.register_fn("log", ScriptContext::log);
}
