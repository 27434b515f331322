//! Compile-or-Fallback Execution
//!
//! Every artifact becomes one [`BuildUnit`] with a single output. With a
//! compiler available the unit invokes it; without one the unit copies the
//! artifact from the `precompiled/` tree beside the source. Both paths share
//! the relative [`ArtifactPath`], so switching between them never changes
//! where outputs land.
//!
//! Outputs are written to a sibling `<file>.partial` and renamed into place,
//! so a failed unit leaves nothing at its output path.
//!
//! Each produced output gets a fingerprint of the action that made it
//! (compiler path and full argv, or the precompiled file it was copied from).
//! An output made by a different action is out of date regardless of file
//! times, so switching from fallback copies to an installed compiler, or
//! changing flags, rebuilds.

use std::fs;
use std::path::{Path, PathBuf};

use xxhash_rust::xxh3::xxh3_64;

use forge_core::{ArtifactPath, ForgeError, Result, ShaderSource, TargetFamily, Variant};

use crate::matrix::{ArtifactPlan, CompileFlags};
use crate::toolchain::{Toolchain, ToolchainSelection};

/// How a unit produces its output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitAction {
    /// Run the compiler on the source.
    Compile {
        toolchain: Toolchain,
        flags: CompileFlags,
    },
    /// Copy a pre-built artifact verbatim.
    CopyPrecompiled { from: PathBuf },
}

/// One independent unit of work: one source, one variant, one output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildUnit {
    pub source: PathBuf,
    pub family: TargetFamily,
    pub variant: Variant,
    pub artifact: ArtifactPath,
    /// Absolute or root-relative output file.
    pub output: PathBuf,
    /// Fingerprint of the action that last produced `output`.
    pub stamp: PathBuf,
    pub action: UnitAction,
}

impl BuildUnit {
    /// Files the output depends on.
    #[must_use]
    pub fn inputs(&self) -> Vec<&Path> {
        match &self.action {
            UnitAction::Compile { .. } => vec![self.source.as_path()],
            UnitAction::CopyPrecompiled { from } => vec![from.as_path()],
        }
    }

    #[must_use]
    pub fn is_compile(&self) -> bool {
        matches!(self.action, UnitAction::Compile { .. })
    }

    /// xxh3 of the action: kind, compiler path and rendered argv for a
    /// compile, the precompiled path for a copy.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut key: Vec<u8> = Vec::new();
        let mut field = |bytes: &[u8]| {
            key.extend_from_slice(bytes);
            key.push(0);
        };
        match &self.action {
            UnitAction::Compile { toolchain, flags } => {
                field(b"compile");
                field(toolchain.path().as_os_str().as_encoded_bytes());
                for arg in toolchain.arguments(flags, &self.source, &self.output) {
                    field(arg.as_encoded_bytes());
                }
            }
            UnitAction::CopyPrecompiled { from } => {
                field(b"copy");
                field(from.as_os_str().as_encoded_bytes());
            }
        }
        xxh3_64(&key)
    }

    fn fingerprint_text(&self) -> String {
        format!("{:016x}", self.fingerprint())
    }

    /// True when the output was made by this unit's action and is not older
    /// than any input.
    #[must_use]
    pub fn is_up_to_date(&self) -> bool {
        let recorded = fs::read_to_string(&self.stamp).unwrap_or_default();
        if recorded.trim() != self.fingerprint_text() {
            return false;
        }

        let Ok(built) = fs::metadata(&self.output).and_then(|meta| meta.modified()) else {
            return false;
        };
        self.inputs().into_iter().all(|input| {
            fs::metadata(input)
                .and_then(|meta| meta.modified())
                .is_ok_and(|changed| changed <= built)
        })
    }
}

/// Result of executing one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitOutcome {
    Compiled,
    Copied,
    UpToDate,
}

/// Creates one unit per plan. A `Precompiled` selection never yields a
/// compile unit.
#[must_use]
pub fn plan_units(
    source: &ShaderSource,
    family: TargetFamily,
    plans: Vec<ArtifactPlan>,
    selection: &ToolchainSelection,
    output_root: &Path,
) -> Vec<BuildUnit> {
    plans
        .into_iter()
        .map(|plan| {
            let action = match selection {
                ToolchainSelection::Compiler(toolchain) => UnitAction::Compile {
                    toolchain: toolchain.clone(),
                    flags: plan.flags,
                },
                ToolchainSelection::Precompiled => UnitAction::CopyPrecompiled {
                    from: plan.artifact.precompiled_in(source.directory()),
                },
            };
            BuildUnit {
                source: source.path().to_path_buf(),
                family,
                variant: plan.variant,
                output: plan.artifact.output_in(output_root),
                stamp: plan.artifact.fingerprint_in(output_root),
                artifact: plan.artifact,
                action,
            }
        })
        .collect()
}

/// Runs build units.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOrFallbackExecutor {
    force: bool,
}

impl CompileOrFallbackExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild units even when their output is up to date.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn execute(&self, unit: &BuildUnit) -> Result<UnitOutcome> {
        if !self.force && unit.is_up_to_date() {
            log::trace!("{}: up to date", unit.artifact);
            return Ok(UnitOutcome::UpToDate);
        }

        // A stale stamp must not outlive a rebuild that fails to record one.
        discard(&unit.stamp);
        let outcome = match &unit.action {
            UnitAction::Compile { toolchain, flags } => {
                Self::compile(unit, toolchain, flags)?;
                UnitOutcome::Compiled
            }
            UnitAction::CopyPrecompiled { from } => {
                Self::copy_precompiled(unit, from)?;
                UnitOutcome::Copied
            }
        };
        Self::record_fingerprint(unit)?;
        Ok(outcome)
    }

    fn record_fingerprint(unit: &BuildUnit) -> Result<()> {
        create_parent(&unit.stamp)?;
        fs::write(&unit.stamp, unit.fingerprint_text())
            .map_err(|err| ForgeError::io(&unit.stamp, err))
    }

    fn compile(unit: &BuildUnit, toolchain: &Toolchain, flags: &CompileFlags) -> Result<()> {
        create_parent(&unit.output)?;
        let partial = partial_path(&unit.output);

        log::debug!(
            "{} {}: {}",
            unit.family,
            unit.variant,
            toolchain.command_line(flags, &unit.source, &partial)
        );

        let output = toolchain
            .command(flags, &unit.source, &partial)
            .output()
            .map_err(|err| ForgeError::io(toolchain.path(), err))?;

        if !output.status.success() {
            discard(&partial);
            let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(ForgeError::CompilerInvocation {
                tool: toolchain.kind().to_string(),
                source_path: unit.source.clone(),
                status: output.status.code(),
                diagnostics: diagnostics.trim_end().to_string(),
            });
        }

        promote(&partial, &unit.output)
    }

    fn copy_precompiled(unit: &BuildUnit, from: &Path) -> Result<()> {
        // Checked before any directory is created under the output root.
        if !from.is_file() {
            return Err(ForgeError::MissingPrecompiledArtifact {
                expected: from.to_path_buf(),
                artifact: unit.output.clone(),
            });
        }

        create_parent(&unit.output)?;
        let partial = partial_path(&unit.output);
        log::debug!("{} {}: copy {}", unit.family, unit.variant, from.display());

        if let Err(err) = fs::copy(from, &partial) {
            discard(&partial);
            return Err(ForgeError::io(from, err));
        }
        promote(&partial, &unit.output)
    }
}

/// `<dir>/<file>.partial` beside the final output.
#[must_use]
pub fn partial_path(output: &Path) -> PathBuf {
    let mut name = output.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    output.with_file_name(name)
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|err| ForgeError::io(dir, err))
        }
        _ => Ok(()),
    }
}

fn promote(partial: &Path, output: &Path) -> Result<()> {
    fs::rename(partial, output).map_err(|err| {
        discard(partial);
        ForgeError::io(output, err)
    })
}

fn discard(path: &Path) {
    if path.exists()
        && let Err(err) = fs::remove_file(path)
    {
        log::warn!("could not remove '{}': {err}", path.display());
    }
}
