//! Build Target Registration
//!
//! Collects the artifacts of every unit (across sources, variants and
//! families) into one named [`BuildTarget`]. Downstream consumers depend on
//! the target name only.
//!
//! # Manifest
//!
//! After a fully successful build the target is written to
//! `<output>/shaders/<name>.json`:
//!
//! ```json
//! {
//!   "target": "engine_shaders",
//!   "artifacts": [
//!     {
//!       "path": "multiview/overlay_frag.spv",
//!       "family": "spirv",
//!       "stage": "fragment",
//!       "features": ["multiview"],
//!       "source": "shaders/overlay_frag.glsl",
//!       "xxh3": "5d7c1f0e9a3b2c41"
//!     }
//!   ]
//! }
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use forge_core::{ArtifactPath, ForgeError, Result, SHADERS_DIR, TargetFamily, Variant};

use crate::executor::BuildUnit;

/// One artifact owned by a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetArtifact {
    pub family: TargetFamily,
    pub variant: Variant,
    pub artifact: ArtifactPath,
    pub output: PathBuf,
    pub source: PathBuf,
    /// Files the artifact is produced from (source or precompiled copy).
    pub inputs: Vec<PathBuf>,
}

/// Accumulates units into a [`BuildTarget`].
#[derive(Debug)]
pub struct BuildTargetRegistrar {
    name: String,
    shader_dir: PathBuf,
    artifacts: Vec<TargetArtifact>,
    claimed: FxHashMap<PathBuf, usize>,
}

impl BuildTargetRegistrar {
    pub fn new(name: impl Into<String>, output_root: &Path) -> Self {
        Self {
            name: name.into(),
            shader_dir: output_root.join(SHADERS_DIR),
            artifacts: Vec::new(),
            claimed: FxHashMap::default(),
        }
    }

    /// Adds a unit's artifact. Two units claiming the same output path is a
    /// configuration error.
    pub fn register(&mut self, unit: &BuildUnit) -> Result<()> {
        if let Some(&index) = self.claimed.get(&unit.output) {
            let first = &self.artifacts[index];
            return Err(ForgeError::configuration(
                &unit.output,
                format!(
                    "artifact produced twice in target '{}': by {} {} from '{}' and by {} {} from '{}'",
                    self.name,
                    first.family,
                    first.variant,
                    first.source.display(),
                    unit.family,
                    unit.variant,
                    unit.source.display()
                ),
            ));
        }

        self.claimed.insert(unit.output.clone(), self.artifacts.len());
        self.artifacts.push(TargetArtifact {
            family: unit.family,
            variant: unit.variant,
            artifact: unit.artifact.clone(),
            output: unit.output.clone(),
            source: unit.source.clone(),
            inputs: unit.inputs().into_iter().map(Path::to_path_buf).collect(),
        });
        Ok(())
    }

    pub fn register_all<'a>(&mut self, units: impl IntoIterator<Item = &'a BuildUnit>) -> Result<()> {
        units.into_iter().try_for_each(|unit| self.register(unit))
    }

    /// Seals the target. The name must be usable as a file name and as an
    /// environment variable prefix.
    pub fn finish(self) -> Result<BuildTarget> {
        let valid = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ForgeError::configuration(
                &self.shader_dir,
                format!(
                    "invalid target name '{}' (use letters, digits, '_' and '-')",
                    self.name
                ),
            ));
        }

        let mut seen = FxHashSet::default();
        let sources = self
            .artifacts
            .iter()
            .filter(|artifact| seen.insert(artifact.source.clone()))
            .map(|artifact| artifact.source.clone())
            .collect();

        Ok(BuildTarget {
            name: self.name,
            shader_dir: self.shader_dir,
            artifacts: self.artifacts,
            sources,
        })
    }
}

/// A named, ordered set of artifacts and the sources they come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTarget {
    name: String,
    shader_dir: PathBuf,
    artifacts: Vec<TargetArtifact>,
    sources: Vec<PathBuf>,
}

impl BuildTarget {
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `<output>/shaders`, the root of every artifact.
    #[inline]
    #[must_use]
    pub fn shader_dir(&self) -> &Path {
        &self.shader_dir
    }

    /// Artifacts in registration order.
    #[inline]
    #[must_use]
    pub fn artifacts(&self) -> &[TargetArtifact] {
        &self.artifacts
    }

    pub fn artifact_paths(&self) -> impl Iterator<Item = &ArtifactPath> {
        self.artifacts.iter().map(|entry| &entry.artifact)
    }

    /// Source files, deduplicated, in first-registration order.
    #[inline]
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Path of the JSON manifest.
    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.shader_dir.join(format!("{}.json", self.name))
    }

    /// Hashes every artifact and writes the JSON manifest. All artifacts
    /// must exist.
    pub fn write_manifest(&self) -> Result<PathBuf> {
        let mut entries = Vec::with_capacity(self.artifacts.len());
        for entry in &self.artifacts {
            let bytes = fs::read(&entry.output).map_err(|err| ForgeError::io(&entry.output, err))?;
            entries.push(ManifestEntry {
                path: entry.artifact.to_string(),
                family: entry.family,
                stage: entry.variant.stage.to_string(),
                features: entry.variant.features.path_segments().collect(),
                source: entry.source.display().to_string(),
                xxh3: format!("{:016x}", xxh3_64(&bytes)),
            });
        }

        let manifest = TargetManifest {
            target: &self.name,
            artifacts: entries,
        };
        let path = self.manifest_path();
        let json = serde_json::to_string_pretty(&manifest).map_err(|err| ForgeError::Manifest {
            path: path.clone(),
            message: err.to_string(),
        })?;

        fs::create_dir_all(&self.shader_dir).map_err(|err| ForgeError::io(&self.shader_dir, err))?;
        fs::write(&path, json).map_err(|err| ForgeError::io(&path, err))?;
        log::info!("target '{}': {} artifacts, manifest {}", self.name, self.len(), path.display());
        Ok(path)
    }

    /// Name of the environment variable exported to build scripts,
    /// `ENGINE_SHADERS_DIR` for `engine-shaders`.
    #[must_use]
    pub fn env_var(&self) -> String {
        format!("{}_DIR", self.name.to_ascii_uppercase().replace('-', "_"))
    }

    /// Writes `cargo:` directives for a build script: a rerun trigger per
    /// input and the shader directory as a compile-time variable.
    pub fn emit_cargo_directives(&self, out: &mut impl Write) -> io::Result<()> {
        let mut seen = FxHashSet::default();
        let inputs = self
            .sources
            .iter()
            .chain(self.artifacts.iter().flat_map(|entry| entry.inputs.iter()));
        for input in inputs {
            if seen.insert(input) {
                writeln!(out, "cargo:rerun-if-changed={}", input.display())?;
            }
        }
        writeln!(out, "cargo:rustc-env={}={}", self.env_var(), self.shader_dir.display())
    }
}

#[derive(Serialize)]
struct TargetManifest<'a> {
    target: &'a str,
    artifacts: Vec<ManifestEntry>,
}

#[derive(Serialize)]
struct ManifestEntry {
    path: String,
    family: TargetFamily,
    stage: String,
    features: Vec<&'static str>,
    source: String,
    xxh3: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::plan_units;
    use crate::matrix::expand;
    use crate::toolchain::ToolchainSelection;
    use forge_core::ShaderSource;

    fn units(path: &str, family: TargetFamily) -> Vec<BuildUnit> {
        let source = ShaderSource::new(path).unwrap();
        let plans = expand(&source, &family.default_profile()).unwrap();
        plan_units(
            &source,
            family,
            plans,
            &ToolchainSelection::Precompiled,
            Path::new("out"),
        )
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registrar = BuildTargetRegistrar::new("engine_shaders", Path::new("out"));
        registrar.register_all(&units("a/lobby_vert.glsl", TargetFamily::SpirV)).unwrap();
        registrar.register_all(&units("a/lobby_frag.glsl", TargetFamily::SpirV)).unwrap();
        registrar.register_all(&units("h/lobby.hlsl", TargetFamily::Sm5)).unwrap();
        let target = registrar.finish().unwrap();

        assert_eq!(target.len(), 2 + 4 + 4);
        assert_eq!(target.artifacts()[0].artifact.to_string(), "lobby_vert.spv");
        assert_eq!(target.artifacts()[6].artifact.to_string(), "SM5/lobby_vert.cso");
        assert_eq!(
            target.sources(),
            [
                PathBuf::from("a/lobby_vert.glsl"),
                PathBuf::from("a/lobby_frag.glsl"),
                PathBuf::from("h/lobby.hlsl"),
            ]
        );
    }

    #[test]
    fn test_collision_is_rejected() {
        let mut registrar = BuildTargetRegistrar::new("engine_shaders", Path::new("out"));
        registrar.register_all(&units("a/overlay_frag.glsl", TargetFamily::SpirV)).unwrap();
        let err = registrar
            .register_all(&units("b/overlay_frag.glsl", TargetFamily::SpirV))
            .unwrap_err();
        assert!(matches!(err, ForgeError::Configuration { .. }));
        assert!(err.to_string().contains("produced twice"));
    }

    #[test]
    fn test_hlsl_families_do_not_collide() {
        let mut registrar = BuildTargetRegistrar::new("engine_shaders", Path::new("out"));
        registrar.register_all(&units("h/lobby.hlsl", TargetFamily::Sm5)).unwrap();
        registrar.register_all(&units("h/lobby.hlsl", TargetFamily::Sm6)).unwrap();
        assert_eq!(registrar.finish().unwrap().len(), 8);
    }

    #[test]
    fn test_invalid_target_name() {
        let registrar = BuildTargetRegistrar::new("engine shaders", Path::new("out"));
        assert!(matches!(registrar.finish(), Err(ForgeError::Configuration { .. })));
    }

    #[test]
    fn test_cargo_directives() {
        let mut registrar = BuildTargetRegistrar::new("engine-shaders", Path::new("out"));
        registrar.register_all(&units("a/lobby_vert.glsl", TargetFamily::SpirV)).unwrap();
        let target = registrar.finish().unwrap();

        let mut out = Vec::new();
        target.emit_cargo_directives(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines[0], "cargo:rerun-if-changed=a/lobby_vert.glsl");
        assert!(lines.contains(&"cargo:rerun-if-changed=a/precompiled/multiview/lobby_vert.spv"));
        assert_eq!(lines.len(), 1 + 2 + 1);
        assert!(lines[3].starts_with("cargo:rustc-env=ENGINE_SHADERS_DIR=out"));
    }
}
