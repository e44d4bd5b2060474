//! Recognised 3D file formats.

use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    /// Native scene library, linked rather than imported.
    Blend,
    Fbx,
    Obj,
    Gltf,
    Glb,
    Stl,
}

impl AssetFormat {
    pub const ALL: [AssetFormat; 6] = [
        AssetFormat::Blend,
        AssetFormat::Fbx,
        AssetFormat::Obj,
        AssetFormat::Gltf,
        AssetFormat::Glb,
        AssetFormat::Stl,
    ];

    /// Lowercase extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            AssetFormat::Blend => "blend",
            AssetFormat::Fbx => "fbx",
            AssetFormat::Obj => "obj",
            AssetFormat::Gltf => "gltf",
            AssetFormat::Glb => "glb",
            AssetFormat::Stl => "stl",
        }
    }

    /// Accepts `obj`, `.obj`, `OBJ`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn is_library(self) -> bool {
        self == AssetFormat::Blend
    }
}

impl std::fmt::Display for AssetFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}
