//! Importable modules. Imports resolve against this static table only;
//! nothing is ever loaded from the filesystem.

use rand::Rng;
use rhai::module_resolvers::StaticModuleResolver;
use rhai::{Array, Dynamic, EvalAltResult, Module, FLOAT, INT};

use crate::safety::ImportAllowlist;

fn math_module() -> Module {
    let mut m = Module::new();
    m.set_var("PI", std::f64::consts::PI);
    m.set_var("TAU", std::f64::consts::TAU);
    m.set_native_fn("radians", |deg: FLOAT| Ok(deg.to_radians()));
    m.set_native_fn("degrees", |rad: FLOAT| Ok(rad.to_degrees()));
    m.set_native_fn("clamp", |v: FLOAT, lo: FLOAT, hi: FLOAT| Ok(v.clamp(lo, hi.max(lo))));
    m
}

fn random_module() -> Module {
    let mut m = Module::new();
    m.set_native_fn("random", || Ok(rand::thread_rng().gen::<FLOAT>()));
    m.set_native_fn("uniform", |lo: FLOAT, hi: FLOAT| {
        if lo >= hi {
            return Ok(lo);
        }
        Ok(rand::thread_rng().gen_range(lo..hi))
    });
    m.set_native_fn("randint", |lo: INT, hi: INT| {
        if lo > hi {
            return Err::<INT, Box<EvalAltResult>>(format!("empty range {lo}..={hi}").into());
        }
        Ok(rand::thread_rng().gen_range(lo..=hi))
    });
    m
}

fn datetime_module() -> Module {
    let mut m = Module::new();
    m.set_native_fn("now", || Ok(chrono::Utc::now().to_rfc3339()));
    m.set_native_fn("timestamp", || Ok(chrono::Utc::now().timestamp() as INT));
    m
}

fn mathutils_module() -> Module {
    let mut m = Module::new();
    m.set_native_fn("vector", |x: FLOAT, y: FLOAT, z: FLOAT| {
        Ok(vec![Dynamic::from(x), Dynamic::from(y), Dynamic::from(z)])
    });
    m.set_native_fn("distance", |a: Array, b: Array| {
        let coords = |v: &Array| -> Option<Vec<FLOAT>> {
            v.iter().map(|d| d.as_float().ok()).collect()
        };
        match (coords(&a), coords(&b)) {
            (Some(a), Some(b)) if a.len() == b.len() => Ok(a
                .iter()
                .zip(&b)
                .map(|(p, q)| (p - q).powi(2))
                .sum::<FLOAT>()
                .sqrt()),
            _ => Err::<FLOAT, Box<EvalAltResult>>("vectors must be equal-length float arrays".into()),
        }
    });
    m
}

fn bpy_module() -> Module {
    let mut m = Module::new();
    m.set_var("api_version", crate::VERSION.to_string());
    m.set_native_fn("primitive_kinds", || {
        Ok(["cube", "uv_sphere", "cylinder", "cone", "plane"]
            .into_iter()
            .map(Dynamic::from)
            .collect::<Array>())
    });
    m
}

/// Mesh editing has no scripted surface yet; importing it is harmless.
fn bmesh_module() -> Module {
    Module::new()
}

/// Build a resolver containing every built-in module the allowlist permits.
pub fn resolver_for(allowlist: &ImportAllowlist) -> StaticModuleResolver {
    let mut resolver = StaticModuleResolver::new();
    let builtins: [(&str, fn() -> Module); 6] = [
        ("math", math_module),
        ("random", random_module),
        ("datetime", datetime_module),
        ("mathutils", mathutils_module),
        ("bpy", bpy_module),
        ("bmesh", bmesh_module),
    ];
    for (name, build) in builtins {
        if allowlist.allows(name) {
            let mut module = build();
            module.build_index();
            resolver.insert(name, module);
        }
    }
    resolver
}
