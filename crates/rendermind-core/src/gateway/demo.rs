//! Offline provider returning canned scripts.

use async_trait::async_trait;

use super::backend::{GenerationBackend, GenerationRequest};
use super::error::BackendError;

pub const DEMO_MESSAGE: &str = "Here's a simple example:";

/// Canned script chosen by keyword.
pub fn demo_script(prompt: &str) -> String {
    let p = prompt.to_lowercase();
    let (comment, call, name) = if p.contains("cube") || p.contains("box") {
        (
            "Create a cube",
            "context.add_cube(#{ size: 2.0, location: [0.0, 0.0, 1.0] })",
            "RenderMind_Cube",
        )
    } else if p.contains("sphere") || p.contains("ball") {
        (
            "Create a sphere",
            "context.add_uv_sphere(#{ radius: 1.0, location: [0.0, 0.0, 1.0] })",
            "RenderMind_Sphere",
        )
    } else if p.contains("cylinder") || p.contains("vase") {
        (
            "Create a cylinder (vase-like)",
            "context.add_cylinder(#{ radius: 0.5, depth: 2.0, location: [0.0, 0.0, 1.0] })",
            "RenderMind_Cylinder",
        )
    } else {
        (
            "Create a default object",
            "context.add_uv_sphere(#{ radius: 1.0, location: [0.0, 0.0, 1.0] })",
            "RenderMind_Object",
        )
    };
    format!(
        "fn rendermind_action(context) {{\n    // {comment}\n    let obj = {call};\n    context.rename(obj, \"{name}\");\n}}\n"
    )
}

pub struct DemoBackend;

#[async_trait]
impl GenerationBackend for DemoBackend {
    fn name(&self) -> &str {
        "demo"
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<String, BackendError> {
        Ok(format!(
            "{DEMO_MESSAGE}\n```rhai\n{}```",
            demo_script(&request.instruction)
        ))
    }
}
