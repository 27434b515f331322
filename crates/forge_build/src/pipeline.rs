//! Build Pipeline
//!
//! Ties the stages together for one aggregate target:
//!
//! ```text
//! sources ─► ShaderSource (stage) ─► expand (variants) ─► plan_units ─► register
//!                                                            │
//!                     ToolchainSelector (once per family) ───┘
//! ```
//!
//! Every intermediate result is a plain value. [`Pipeline::plan`] stops
//! before execution; [`Pipeline::run`] schedules the units and writes the
//! target manifest when every unit succeeded.
//!
//! # Usage
//!
//! ```rust,ignore
//! use forge_build::{FamilyRequest, Pipeline};
//! use forge_core::TargetFamily;
//!
//! // build.rs
//! let result = Pipeline::new("engine_shaders", std::env::var("OUT_DIR")?)
//!     .family(FamilyRequest::new(TargetFamily::SpirV).source("shaders/glsl"))
//!     .run()?;
//! result.into_target()?.emit_cargo_directives(&mut std::io::stdout())?;
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use forge_core::{FamilyProfile, ForgeError, PRECOMPILED_DIR, Result, ShaderSource, TargetFamily};

use crate::executor::{BuildUnit, plan_units};
use crate::matrix::expand;
use crate::registrar::{BuildTarget, BuildTargetRegistrar};
use crate::schedule::{BuildReport, Scheduler};
use crate::toolchain::{CompilerPreference, ToolProbe, ToolchainSelection, ToolchainSelector};

// ============================================================================
// Requests
// ============================================================================

/// Sources and policy for one target family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyRequest {
    pub profile: FamilyProfile,
    /// Files (kept in order) and directories (searched recursively).
    pub sources: Vec<PathBuf>,
    pub compiler: CompilerPreference,
}

impl FamilyRequest {
    /// A request with the family's default profile and no sources.
    #[must_use]
    pub fn new(family: TargetFamily) -> Self {
        Self {
            profile: family.default_profile(),
            sources: Vec::new(),
            compiler: CompilerPreference::Auto,
        }
    }

    #[inline]
    #[must_use]
    pub fn family(&self) -> TargetFamily {
        self.profile.family
    }

    #[must_use]
    pub fn source(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(path.into());
        self
    }

    #[must_use]
    pub fn sources<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.sources.extend(paths.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn compiler(mut self, preference: CompilerPreference) -> Self {
        self.compiler = preference;
        self
    }

    #[must_use]
    pub fn profile(mut self, profile: FamilyProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Source files of the request: listed files in order, then the matching
    /// files of each listed directory in sorted order. `precompiled/` trees
    /// are never searched.
    pub fn resolve_sources(&self) -> Result<Vec<PathBuf>> {
        let extension = self.family().source_extension();
        let mut files = Vec::new();

        for path in &self.sources {
            if !path.is_dir() {
                files.push(path.clone());
                continue;
            }

            let mut found = Vec::new();
            let walker = WalkDir::new(path)
                .into_iter()
                .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != PRECOMPILED_DIR);
            for entry in walker {
                let entry = entry.map_err(|err| ForgeError::io(path, err.into()))?;
                let matches = entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
                if matches {
                    found.push(entry.into_path());
                }
            }
            found.sort();
            log::debug!(
                "{}: {} .{extension} sources under {}",
                self.family(),
                found.len(),
                path.display()
            );
            files.extend(found);
        }

        Ok(files)
    }
}

/// Units of one family without executing them.
///
/// For callers that drive execution themselves (a build-graph executor or a
/// custom scheduler).
pub fn plan_family(
    request: &FamilyRequest,
    selection: &ToolchainSelection,
    output_root: &Path,
) -> Result<Vec<BuildUnit>> {
    let mut units = Vec::new();
    for path in request.resolve_sources()? {
        let source = ShaderSource::new(path)?;
        let plans = expand(&source, &request.profile)?;
        units.extend(plan_units(&source, request.family(), plans, selection, output_root));
    }
    Ok(units)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Planned but not executed build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub target: BuildTarget,
    /// Units in registration order.
    pub units: Vec<BuildUnit>,
    /// Toolchain chosen for each requested family.
    pub selections: Vec<(TargetFamily, ToolchainSelection)>,
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug)]
pub struct BuildResult {
    pub target: BuildTarget,
    pub report: BuildReport,
    /// Written only when every unit succeeded.
    pub manifest: Option<PathBuf>,
}

impl BuildResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.report.is_success()
    }

    /// The target, or the first unit failure.
    pub fn into_target(self) -> Result<BuildTarget> {
        self.report.into_result()?;
        Ok(self.target)
    }
}

/// Builds one aggregate target from any number of families.
#[derive(Debug, Clone)]
pub struct Pipeline {
    target: String,
    output_root: PathBuf,
    families: Vec<FamilyRequest>,
    selector: ToolchainSelector,
    scheduler: Scheduler,
}

impl Pipeline {
    /// A pipeline probing the process environment for compilers.
    pub fn new(target: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
            output_root: output_root.into(),
            families: Vec::new(),
            selector: ToolchainSelector::new(ToolProbe::from_env()),
            scheduler: Scheduler::new(),
        }
    }

    #[must_use]
    pub fn family(mut self, request: FamilyRequest) -> Self {
        self.add_family(request);
        self
    }

    /// Adds a family. A request for a family that is already present only
    /// contributes its sources; the existing profile and compiler preference
    /// are kept.
    pub fn add_family(&mut self, request: FamilyRequest) {
        match self
            .families
            .iter_mut()
            .find(|existing| existing.family() == request.family())
        {
            Some(existing) => {
                if existing.profile != request.profile || existing.compiler != request.compiler {
                    log::warn!(
                        "{}: merged request differs in profile or compiler, keeping the first",
                        request.family()
                    );
                }
                existing.sources.extend(request.sources);
            }
            None => self.families.push(request),
        }
    }

    #[must_use]
    pub fn with_probe(mut self, probe: ToolProbe) -> Self {
        self.selector = ToolchainSelector::new(probe);
        self
    }

    #[must_use]
    pub fn with_scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    #[must_use]
    pub fn with_output_root(mut self, output_root: impl Into<PathBuf>) -> Self {
        self.output_root = output_root.into();
        self
    }

    /// Drops every family not in `keep`.
    pub fn retain_families(&mut self, keep: &[TargetFamily]) {
        self.families.retain(|request| keep.contains(&request.family()));
    }

    /// Forces precompiled mode for every family.
    pub fn disable_compilers(&mut self) {
        for request in &mut self.families {
            request.compiler = CompilerPreference::Disabled;
        }
    }

    #[must_use]
    pub fn requests(&self) -> &[FamilyRequest] {
        &self.families
    }

    #[must_use]
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.target
    }

    /// Selects toolchains, expands all sources and registers every unit.
    pub fn plan(&self) -> Result<BuildPlan> {
        let mut registrar = BuildTargetRegistrar::new(&self.target, &self.output_root);
        let mut units = Vec::new();
        let mut selections = Vec::with_capacity(self.families.len());

        for request in &self.families {
            let family = request.family();
            let selection = self.selector.select(family, &request.compiler)?;
            let family_units = plan_family(request, &selection, &self.output_root)?;
            log::info!(
                "{family}: {} artifacts ({})",
                family_units.len(),
                selection
            );

            registrar.register_all(&family_units)?;
            units.extend(family_units);
            selections.push((family, selection));
        }

        let target = registrar.finish()?;
        if target.is_empty() {
            log::warn!("target '{}' has no artifacts", target.name());
        }

        Ok(BuildPlan {
            target,
            units,
            selections,
        })
    }

    /// Plans and executes the build. Planning errors are returned directly;
    /// unit failures are collected in the report.
    ///
    /// A manifest left by an earlier run is removed before any unit runs, so
    /// after a failed build no manifest exists.
    pub fn run(&self) -> Result<BuildResult> {
        let BuildPlan { target, units, .. } = self.plan()?;
        let previous = target.manifest_path();
        match fs::remove_file(&previous) {
            Err(err) if err.kind() != io::ErrorKind::NotFound => {
                return Err(ForgeError::io(previous, err));
            }
            _ => {}
        }

        let report = self.scheduler.run(&units);
        log::info!("target '{}': {report}", target.name());

        let manifest = if report.is_success() {
            Some(target.write_manifest()?)
        } else {
            None
        };

        Ok(BuildResult {
            target,
            report,
            manifest,
        })
    }
}
