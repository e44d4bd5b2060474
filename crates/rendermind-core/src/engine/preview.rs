//! Preview execution in a throwaway scene.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::domain::GeneratedScript;
use crate::obs;
use crate::scene::{SceneHost, SharedScene};

use super::error::ExecutionError;
use super::{ExecutionEngine, ExecutionReport};

/// Rendered output of a preview run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewArtifact {
    pub path: PathBuf,
    /// Name the temporary scene had while it existed.
    pub scene: String,
    pub report: ExecutionReport,
}

/// Temporary scene removed from its host when dropped, on every exit path.
struct TempScene<'h> {
    host: &'h mut dyn SceneHost,
    name: String,
    scene: SharedScene,
}

impl<'h> TempScene<'h> {
    fn acquire(host: &'h mut dyn SceneHost, name: String) -> Result<Self, ExecutionError> {
        let scene = host.create_scene(&name)?;
        scene.borrow_mut().clear();
        Ok(Self { host, name, scene })
    }

    fn scene(&self) -> SharedScene {
        self.scene.clone()
    }
}

impl Drop for TempScene<'_> {
    fn drop(&mut self) {
        let removed = match self.host.remove_scene(&self.name) {
            Ok(()) => true,
            Err(err) => {
                warn!(scene = %self.name, error = %err, "failed to remove preview scene");
                false
            }
        };
        obs::emit_preview_teardown(&self.name, removed);
    }
}

impl ExecutionEngine {
    /// Run `script` in a fresh empty scene and render it into `output_dir`.
    ///
    /// Unsafe scripts are rejected before any scene is created. Once the
    /// temporary scene exists it is torn down whether the run or the render
    /// succeeds or fails.
    pub fn preview(
        &self,
        script: &GeneratedScript,
        host: &mut dyn SceneHost,
        output_dir: &Path,
    ) -> Result<PreviewArtifact, ExecutionError> {
        self.screen(script)?;

        let simple = Uuid::new_v4().simple().to_string();
        let name = format!("rm_preview_{}", &simple[..8]);
        let temp = TempScene::acquire(host, name)?;

        let report = self.run_screened(script, temp.scene())?;

        let ext = temp.scene.borrow().render_extension();
        let output = output_dir.join(format!("{}.{ext}", temp.name));
        let path = temp
            .scene
            .borrow_mut()
            .render_still(&output)
            .map_err(|e| ExecutionError::Render(e.to_string()))?;

        Ok(PreviewArtifact {
            path,
            scene: temp.name.clone(),
            report,
        })
    }
}
