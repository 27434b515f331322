//! Artifact Layout
//!
//! ```text
//! <output>/shaders/[<family subdir>/][multiview/][fovDecode/][yuv3PlaneFmt/]<name>.<ext>
//! <source dir>/precompiled/<same relative path>
//! <output>/.fingerprints/<same relative path>.dep
//! ```
//!
//! Toggle-off states contribute no segment. The relative part is a pure
//! function of (artifact name, feature set, family profile), shared by the
//! compile and the fallback paths.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::family::FamilyProfile;
use crate::features::FeatureSet;

/// Directory under the output root that holds compiled artifacts.
pub const SHADERS_DIR: &str = "shaders";

/// Directory beside the sources that mirrors the artifact tree.
pub const PRECOMPILED_DIR: &str = "precompiled";

/// Directory under the output root holding one build fingerprint per
/// artifact. Never inside `shaders/`, which holds artifacts only.
pub const FINGERPRINT_DIR: &str = ".fingerprints";

/// Relative location of one artifact, independent of the root it is placed
/// under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactPath {
    relative: PathBuf,
}

impl ArtifactPath {
    #[must_use]
    pub fn new(profile: &FamilyProfile, features: FeatureSet, artifact_name: &str) -> Self {
        let mut relative = PathBuf::new();
        if let Some(subdir) = &profile.output_subdir {
            relative.push(subdir);
        }
        for segment in features.path_segments() {
            relative.push(segment);
        }
        relative.push(format!(
            "{artifact_name}.{}",
            profile.family.binary_extension()
        ));

        Self { relative }
    }

    #[inline]
    #[must_use]
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    /// Output location: `<output_root>/shaders/<relative>`.
    #[must_use]
    pub fn output_in(&self, output_root: &Path) -> PathBuf {
        output_root.join(SHADERS_DIR).join(&self.relative)
    }

    /// Fallback location: `<source_dir>/precompiled/<relative>`.
    #[must_use]
    pub fn precompiled_in(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(PRECOMPILED_DIR).join(&self.relative)
    }

    /// Fingerprint location: `<output_root>/.fingerprints/<relative>.dep`.
    #[must_use]
    pub fn fingerprint_in(&self, output_root: &Path) -> PathBuf {
        let mut stamp = output_root.join(FINGERPRINT_DIR).join(&self.relative).into_os_string();
        stamp.push(".dep");
        PathBuf::from(stamp)
    }
}

impl fmt::Display for ArtifactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Forward slashes on every host so logs and manifests agree.
        let parts: Vec<_> = self
            .relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        f.write_str(&parts.join("/"))
    }
}
