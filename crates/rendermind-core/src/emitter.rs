//! Deterministic plan-to-script emitter.
//!
//! A tiny keyword DSL: the plan text picks one primitive template, each of
//! which creates one deterministically named object with one material tweak.
//! Unknown plans produce a no-op placeholder script.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::{quote_literal, GeneratedScript, ScriptOrigin, ENTRY_POINT};

pub const DEFAULT_SPHERE_RADIUS: f64 = 0.5;

/// Which template a plan selects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanTemplate {
    Sphere { radius: f64 },
    Cylinder,
    Cube,
    Placeholder,
}

impl PlanTemplate {
    pub fn select(plan: &str) -> Self {
        let p = plan.to_lowercase();
        if p.contains("uv_sphere") || p.contains("sphere") {
            PlanTemplate::Sphere {
                radius: parse_radius(&p).unwrap_or(DEFAULT_SPHERE_RADIUS),
            }
        } else if p.contains("cylinder") || p.contains("vase") {
            PlanTemplate::Cylinder
        } else if p.contains("cube") || p.contains("box") {
            PlanTemplate::Cube
        } else {
            PlanTemplate::Placeholder
        }
    }
}

fn radius_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^a-z0-9_])r=([^,\s;)]+)").ok())
        .as_ref()
}

/// `r=<value>`, accepted only when it is a sane positive length.
fn parse_radius(plan: &str) -> Option<f64> {
    let caps = radius_regex()?.captures(plan)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    (0.001..=1000.0).contains(&value).then_some(value)
}

/// Render a float so the script parser always reads it as a float.
fn float(value: f64) -> String {
    let text = format!("{value:?}");
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

struct Template<'a> {
    add_call: String,
    name: &'a str,
    material: &'a str,
    input: &'a str,
    value: &'a str,
}

fn render(t: Template<'_>) -> String {
    format!(
        "fn {ENTRY_POINT}(context) {{\n    \
         let obj = {add};\n    \
         obj = context.rename(obj, {name});\n    \
         let mat = context.new_material({material});\n    \
         context.set_material_input(mat, {input}, {value});\n    \
         context.assign_material(obj, mat);\n}}\n",
        add = t.add_call,
        name = quote_literal(t.name),
        material = quote_literal(t.material),
        input = quote_literal(t.input),
        value = t.value,
    )
}

/// Compile a plan into a script. Never fails.
pub fn emit(plan: &str) -> GeneratedScript {
    let source = match PlanTemplate::select(plan) {
        PlanTemplate::Sphere { radius } => render(Template {
            add_call: format!(
                "context.add_uv_sphere(#{{ radius: {}, location: [0.0, 0.0, 0.5] }})",
                float(radius)
            ),
            name: "rm_sphere",
            material: "rm_mat",
            input: "Base Color",
            value: "[0.8, 0.2, 0.2, 1.0]",
        }),
        PlanTemplate::Cylinder => render(Template {
            add_call: "context.add_cylinder(#{ radius: 0.25, depth: 0.6, location: [0.0, 1.0, 0.3] })"
                .to_string(),
            name: "rm_cylinder",
            material: "rm_ceramic",
            input: "Roughness",
            value: "0.15",
        }),
        PlanTemplate::Cube => render(Template {
            add_call: "context.add_cube(#{ size: 1.0, location: [0.0, 0.0, 0.5] })".to_string(),
            name: "rm_cube",
            material: "rm_matte",
            input: "Roughness",
            value: "0.8",
        }),
        PlanTemplate::Placeholder => format!(
            "fn {ENTRY_POINT}(context) {{\n    \
             // Plan not implemented in emitter placeholder\n    \
             context.log(\"Plan not implemented\");\n}}\n"
        ),
    };
    GeneratedScript::new(source, ScriptOrigin::Emitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_selection() {
        assert_eq!(
            PlanTemplate::select("uv_sphere r=1.25 at origin"),
            PlanTemplate::Sphere { radius: 1.25 }
        );
        assert_eq!(PlanTemplate::select("Cylinder vase"), PlanTemplate::Cylinder);
        assert_eq!(PlanTemplate::select("a box"), PlanTemplate::Cube);
        assert_eq!(PlanTemplate::select("teapot"), PlanTemplate::Placeholder);
    }

    #[test]
    fn test_radius_parse_falls_back() {
        assert_eq!(
            PlanTemplate::select("sphere r=abc"),
            PlanTemplate::Sphere { radius: 0.5 }
        );
        assert_eq!(
            PlanTemplate::select("sphere r=-2"),
            PlanTemplate::Sphere { radius: 0.5 }
        );
        assert_eq!(
            PlanTemplate::select("sphere r=2);"),
            PlanTemplate::Sphere { radius: 2.0 }
        );
        // `color=` must not be read as a radius.
        assert_eq!(
            PlanTemplate::select("sphere color=3"),
            PlanTemplate::Sphere { radius: 0.5 }
        );
    }

    #[test]
    fn test_emitted_sphere_is_deterministic() {
        let a = emit("uv_sphere r=2");
        let b = emit("uv_sphere r=2");
        assert_eq!(a, b);
        assert!(a.source.contains("radius: 2.0"));
        assert!(a.source.contains("\"rm_sphere\""));
        assert!(a.source.contains("\"Base Color\""));
        assert_eq!(a.origin, ScriptOrigin::Emitter);
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(float(2.0), "2.0");
        assert_eq!(float(0.25), "0.25");
    }
}
