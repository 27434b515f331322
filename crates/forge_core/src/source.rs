use std::path::{Path, PathBuf};

use crate::errors::{ForgeError, Result};
use crate::stage::Stage;

/// A shader source file and the stage inferred from its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderSource {
    path: PathBuf,
    name: String,
    stage: Stage,
}

impl ShaderSource {
    /// Creates the source and infers its stage from the file stem.
    ///
    /// Fails with a configuration error when the path has no usable file
    /// stem, since no artifact name could be derived from it.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| {
                ForgeError::configuration(&path, "shader source needs a UTF-8 file name")
            })?
            .to_string();
        let stage = Stage::infer(&name);

        Ok(Self { path, name, stage })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name without extension.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Directory holding the source (the root of its `precompiled/` tree).
    #[must_use]
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}
