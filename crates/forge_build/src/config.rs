//! Build Manifest
//!
//! `Shaders.toml` describes one aggregate target:
//!
//! ```toml
//! target = "engine_shaders"
//! output_dir = "build"
//! jobs = 0
//! keep_going = false
//!
//! [families.spirv]
//! sources = ["shaders/lobby_vert.glsl", "shaders/video"]
//! compiler = "auto"                  # "auto" | "none" | path to the executable
//!
//! [families.sm5]
//! sources = ["shaders/hlsl"]
//! fragment_axes = ["foveation_decode", "yuv_three_plane"]
//! target_env = "5_0"
//! ```
//!
//! Relative paths resolve against the directory holding the manifest.
//! Every profile field left out keeps the family's default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use forge_core::{EntryPoints, FamilyProfile, FeatureToggle, ForgeError, Result, TargetFamily};

use crate::pipeline::{FamilyRequest, Pipeline};
use crate::schedule::{FailurePolicy, Scheduler};
use crate::toolchain::CompilerPreference;

/// Manifest file name looked up by default.
pub const MANIFEST_FILE: &str = "Shaders.toml";

/// Target name when none is configured.
pub const DEFAULT_TARGET: &str = "shaders";

/// Output directory when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "build";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForgeManifest {
    pub target: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub jobs: Option<usize>,
    pub keep_going: bool,
    pub families: FamiliesManifest,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FamiliesManifest {
    pub spirv: Option<FamilyManifest>,
    pub sm6: Option<FamilyManifest>,
    pub sm5: Option<FamilyManifest>,
}

/// One `[families.<key>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FamilyManifest {
    pub sources: Vec<PathBuf>,
    pub compiler: CompilerPreference,
    pub fragment_axes: Option<Vec<FeatureToggle>>,
    pub output_subdir: Option<String>,
    pub entry_points: Option<EntryPoints>,
    pub target_env: Option<String>,
}

impl FamilyManifest {
    /// The family's default profile with this table's overrides applied.
    #[must_use]
    pub fn profile(&self, family: TargetFamily) -> FamilyProfile {
        let mut profile = family.default_profile();
        if let Some(axes) = &self.fragment_axes {
            profile.fragment_axes = axes.iter().copied().collect();
        }
        if let Some(subdir) = &self.output_subdir {
            profile.output_subdir = (!subdir.is_empty()).then(|| subdir.clone());
        }
        if let Some(entry_points) = &self.entry_points {
            profile.entry_points = Some(entry_points.clone());
        }
        if let Some(target_env) = &self.target_env {
            profile.target_env.clone_from(target_env);
        }
        profile
    }
}

impl ForgeManifest {
    /// Reads and validates a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| ForgeError::io(path, err))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base_dir).map_err(|err| match err {
            ForgeError::Manifest { message, .. } => ForgeError::Manifest {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parses manifest text, resolving relative paths against `base_dir`.
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        let mut manifest: Self = toml::from_str(text).map_err(|err| ForgeError::Manifest {
            path: base_dir.join(MANIFEST_FILE),
            message: err.to_string(),
        })?;
        manifest.resolve_paths(base_dir);
        manifest.validate(base_dir)?;
        Ok(manifest)
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };

        if let Some(output_dir) = &mut self.output_dir {
            resolve(output_dir);
        }
        for family in TargetFamily::ALL {
            if let Some(table) = self.families.get_mut(family) {
                table.sources.iter_mut().for_each(resolve);
                if let CompilerPreference::Path(path) = &mut table.compiler {
                    resolve(path);
                }
            }
        }
    }

    fn validate(&self, base_dir: &Path) -> Result<()> {
        let Some(table) = &self.families.spirv else {
            return Ok(());
        };
        if table.entry_points.is_some() {
            return Err(ForgeError::configuration(
                base_dir.join(MANIFEST_FILE),
                "[families.spirv] cannot set entry_points, GLSL sources have a single main",
            ));
        }
        // SPIR-V has no plane-format axis.
        if table
            .fragment_axes
            .as_ref()
            .is_some_and(|axes| axes.contains(&FeatureToggle::YuvThreePlane))
        {
            return Err(ForgeError::configuration(
                base_dir.join(MANIFEST_FILE),
                "[families.spirv] fragment_axes cannot include yuv_three_plane",
            ));
        }
        Ok(())
    }

    /// Configured families in canonical order.
    pub fn families(&self) -> impl Iterator<Item = (TargetFamily, &FamilyManifest)> {
        TargetFamily::ALL
            .into_iter()
            .filter_map(|family| self.families.get(family).map(|table| (family, table)))
    }

    #[must_use]
    pub fn target_name(&self) -> &str {
        self.target.as_deref().unwrap_or(DEFAULT_TARGET)
    }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        let policy = if self.keep_going {
            FailurePolicy::KeepGoing
        } else {
            FailurePolicy::FailFast
        };
        Scheduler::new().jobs(self.jobs.unwrap_or(0)).policy(policy)
    }

    /// A pipeline building everything the manifest describes.
    #[must_use]
    pub fn pipeline(&self) -> Pipeline {
        let mut pipeline =
            Pipeline::new(self.target_name(), self.output_dir()).with_scheduler(self.scheduler());
        for (family, table) in self.families() {
            pipeline.add_family(
                FamilyRequest::new(family)
                    .profile(table.profile(family))
                    .sources(table.sources.iter().cloned())
                    .compiler(table.compiler.clone()),
            );
        }
        pipeline
    }
}

impl FamiliesManifest {
    #[must_use]
    pub fn get(&self, family: TargetFamily) -> Option<&FamilyManifest> {
        match family {
            TargetFamily::SpirV => self.spirv.as_ref(),
            TargetFamily::Sm6 => self.sm6.as_ref(),
            TargetFamily::Sm5 => self.sm5.as_ref(),
        }
    }

    pub fn get_mut(&mut self, family: TargetFamily) -> Option<&mut FamilyManifest> {
        match family {
            TargetFamily::SpirV => self.spirv.as_mut(),
            TargetFamily::Sm6 => self.sm6.as_mut(),
            TargetFamily::Sm5 => self.sm5.as_mut(),
        }
    }
}
