//! Toolchain Selection
//!
//! Locates the shader compiler for each target family. Families are probed
//! independently and only for existence; no version is queried.
//!
//! | Family | Candidates (in order)         | SDK directory                          |
//! |--------|-------------------------------|----------------------------------------|
//! | SPIR-V | `glslc`, `glslangValidator`   | `$VULKAN_SDK/bin`, `$VULKAN_SDK/Bin`   |
//! | SM6    | `dxc`                         | `$VULKAN_SDK/bin`, `$VULKAN_SDK/Bin`   |
//! | SM5    | `fxc`                         | `$WindowsSdkVerBinPath/x64`, itself    |
//!
//! SDK directories are searched before the executable search path. When
//! nothing is found the family builds in precompiled mode.
//!
//! # Usage
//!
//! ```rust,ignore
//! use forge_build::toolchain::{CompilerPreference, ToolProbe, ToolchainSelector};
//! use forge_core::TargetFamily;
//!
//! let selector = ToolchainSelector::new(ToolProbe::from_env());
//! let selection = selector.select(TargetFamily::SpirV, &CompilerPreference::Auto)?;
//! ```

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use forge_core::{ForgeError, Result, Stage, TargetFamily};

use crate::matrix::CompileFlags;

// ============================================================================
// Tool Kinds
// ============================================================================

/// A supported shader compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Glslc,
    GlslangValidator,
    Dxc,
    Fxc,
}

impl ToolKind {
    /// Executable name without platform suffix.
    #[must_use]
    pub fn executable(self) -> &'static str {
        match self {
            Self::Glslc => "glslc",
            Self::GlslangValidator => "glslangValidator",
            Self::Dxc => "dxc",
            Self::Fxc => "fxc",
        }
    }

    /// Compilers able to produce the family's binaries, preferred first.
    #[must_use]
    pub fn candidates(family: TargetFamily) -> &'static [ToolKind] {
        match family {
            TargetFamily::SpirV => &[Self::Glslc, Self::GlslangValidator],
            TargetFamily::Sm6 => &[Self::Dxc],
            TargetFamily::Sm5 => &[Self::Fxc],
        }
    }

    /// Infers the kind from an executable path (`/opt/sdk/bin/glslc.exe`).
    #[must_use]
    pub fn from_executable(path: &Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        [Self::Glslc, Self::GlslangValidator, Self::Dxc, Self::Fxc]
            .into_iter()
            .find(|kind| kind.executable().eq_ignore_ascii_case(stem))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

// ============================================================================
// Toolchain
// ============================================================================

/// A located compiler executable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Toolchain {
    kind: ToolKind,
    path: PathBuf,
}

impl Toolchain {
    #[must_use]
    pub fn new(kind: ToolKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ToolKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Renders the argument list for one source/output pair.
    #[must_use]
    pub fn arguments(&self, flags: &CompileFlags, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        let stage = match flags.stage {
            Stage::Vertex => "vert",
            Stage::Fragment | Stage::Unspecified => "frag",
        };

        match self.kind {
            ToolKind::Glslc => {
                args.extend(["-O", "-Werror"].map(OsString::from));
                args.push(format!("--target-env={}", flags.target_env).into());
                args.push(format!("-fshader-stage={stage}").into());
                args.extend(
                    flags.defines.assignments().map(|def| OsString::from(format!("-D{def}"))),
                );
                args.push("-o".into());
                args.push(output.into());
            }
            ToolKind::GlslangValidator => {
                args.extend(["-V", "-g0", "--target-env"].map(OsString::from));
                args.push(flags.target_env.clone().into());
                args.push("-S".into());
                args.push(stage.into());
                args.extend(
                    flags.defines.assignments().map(|def| OsString::from(format!("-D{def}"))),
                );
                args.push("-o".into());
                args.push(output.into());
            }
            ToolKind::Dxc | ToolKind::Fxc => {
                // Same switch set, dxc spells it with '-' and fxc with '/'.
                let sw = if self.kind == ToolKind::Dxc { "-" } else { "/" };
                let switch = |name: &str| OsString::from(format!("{sw}{name}"));

                args.push(switch("nologo"));
                args.push(switch("T"));
                args.push(flags.shader_model().into());
                if let Some(entry) = &flags.entry_point {
                    args.push(switch("E"));
                    args.push(entry.into());
                }
                for name in ["O3", "WX", "Qstrip_debug", "Qstrip_reflect"] {
                    args.push(switch(name));
                }
                for def in flags.defines.assignments() {
                    args.push(switch("D"));
                    args.push(def.into());
                }
                args.push(switch("Fo"));
                args.push(output.into());
            }
        }

        args.push(input.into());
        args
    }

    /// Process ready to spawn for one source/output pair.
    #[must_use]
    pub fn command(&self, flags: &CompileFlags, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.path);
        command.args(self.arguments(flags, input, output));
        command
    }

    /// Human readable command line, for logs.
    #[must_use]
    pub fn command_line(&self, flags: &CompileFlags, input: &Path, output: &Path) -> String {
        std::iter::once(self.path.as_os_str().to_string_lossy().into_owned())
            .chain(
                self.arguments(flags, input, output)
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for Toolchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.path.display())
    }
}

/// Outcome of toolchain selection for one family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolchainSelection {
    /// Compile from source with this compiler.
    Compiler(Toolchain),
    /// No compiler; copy artifacts from the `precompiled/` tree.
    Precompiled,
}

impl ToolchainSelection {
    #[must_use]
    pub fn toolchain(&self) -> Option<&Toolchain> {
        match self {
            Self::Compiler(toolchain) => Some(toolchain),
            Self::Precompiled => None,
        }
    }
}

impl fmt::Display for ToolchainSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compiler(toolchain) => write!(f, "{toolchain}"),
            Self::Precompiled => f.write_str("precompiled"),
        }
    }
}

// ============================================================================
// Preference
// ============================================================================

/// Per-family compiler override, written as `"auto"`, `"none"` or a path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum CompilerPreference {
    /// Search the SDK directories and the executable search path.
    #[default]
    Auto,
    /// Never compile; always copy precompiled artifacts.
    Disabled,
    /// Use this executable. The kind is inferred from its file name.
    Path(PathBuf),
}

impl From<String> for CompilerPreference {
    fn from(value: String) -> Self {
        match value.as_str() {
            "auto" | "" => Self::Auto,
            "none" | "off" => Self::Disabled,
            _ => Self::Path(PathBuf::from(value)),
        }
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Where compilers are looked for.
///
/// Captures the relevant environment once so that detection can be driven
/// with explicit directories in tests.
#[derive(Debug, Clone, Default)]
pub struct ToolProbe {
    vulkan_sdk: Option<PathBuf>,
    windows_sdk_bin: Option<PathBuf>,
    search_path: Option<OsString>,
    cwd: PathBuf,
}

impl ToolProbe {
    /// Reads `VULKAN_SDK`, `WindowsSdkVerBinPath` and `PATH`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            vulkan_sdk: std::env::var_os("VULKAN_SDK").map(PathBuf::from),
            windows_sdk_bin: std::env::var_os("WindowsSdkVerBinPath").map(PathBuf::from),
            search_path: std::env::var_os("PATH"),
            cwd: current_dir(),
        }
    }

    /// A probe that only searches the given path list and no SDK.
    #[must_use]
    pub fn isolated(search_path: impl Into<OsString>) -> Self {
        Self {
            vulkan_sdk: None,
            windows_sdk_bin: None,
            search_path: Some(search_path.into()),
            cwd: current_dir(),
        }
    }

    #[must_use]
    pub fn with_vulkan_sdk(mut self, root: impl Into<PathBuf>) -> Self {
        self.vulkan_sdk = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_windows_sdk_bin(mut self, dir: impl Into<PathBuf>) -> Self {
        self.windows_sdk_bin = Some(dir.into());
        self
    }

    /// SDK directories searched for a kind, in order.
    fn sdk_dirs(&self, kind: ToolKind) -> Vec<PathBuf> {
        match kind {
            ToolKind::Glslc | ToolKind::GlslangValidator | ToolKind::Dxc => self
                .vulkan_sdk
                .iter()
                .flat_map(|root| [root.join("bin"), root.join("Bin")])
                .collect(),
            ToolKind::Fxc => self
                .windows_sdk_bin
                .iter()
                .flat_map(|dir| [dir.join("x64"), dir.clone()])
                .collect(),
        }
    }

    /// Looks a kind up in its SDK directories, then on the search path.
    #[must_use]
    pub fn locate(&self, kind: ToolKind) -> Option<PathBuf> {
        let name = kind.executable();
        self.sdk_dirs(kind)
            .into_iter()
            .filter(|dir| dir.is_dir())
            .find_map(|dir| which::which_in(name, Some(dir.as_os_str()), &self.cwd).ok())
            .or_else(|| {
                let paths = self.search_path.as_deref().unwrap_or(OsStr::new(""));
                which::which_in(name, Some(paths), &self.cwd).ok()
            })
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ============================================================================
// Selector
// ============================================================================

/// Chooses a [`ToolchainSelection`] per family.
#[derive(Debug, Clone, Default)]
pub struct ToolchainSelector {
    probe: ToolProbe,
}

impl ToolchainSelector {
    #[must_use]
    pub fn new(probe: ToolProbe) -> Self {
        Self { probe }
    }

    #[must_use]
    pub fn probe_settings(&self) -> &ToolProbe {
        &self.probe
    }

    /// Finds the preferred compiler of a family, or `ToolNotFound`.
    pub fn probe(&self, family: TargetFamily) -> Result<Toolchain> {
        ToolKind::candidates(family)
            .iter()
            .find_map(|&kind| self.probe.locate(kind).map(|path| Toolchain::new(kind, path)))
            .ok_or(ForgeError::ToolNotFound { family })
    }

    /// Resolves an explicit executable. A path that is not a file is
    /// `ToolNotFound`; a compiler of the wrong family is a configuration
    /// error.
    pub fn explicit(&self, family: TargetFamily, path: &Path) -> Result<Toolchain> {
        let candidates = ToolKind::candidates(family);
        let kind = ToolKind::from_executable(path)
            .filter(|kind| candidates.contains(kind))
            .ok_or_else(|| {
                let expected: Vec<_> = candidates.iter().map(|kind| kind.executable()).collect();
                ForgeError::configuration(
                    path,
                    format!("not a {family} compiler, expected {}", expected.join(" or ")),
                )
            })?;

        if path.is_file() {
            Ok(Toolchain::new(kind, path))
        } else {
            Err(ForgeError::ToolNotFound { family })
        }
    }

    /// Selects how a family is built. A missing compiler is not an error:
    /// the family falls back to precompiled mode.
    pub fn select(
        &self,
        family: TargetFamily,
        preference: &CompilerPreference,
    ) -> Result<ToolchainSelection> {
        let found = match preference {
            CompilerPreference::Disabled => {
                log::info!("{family}: compiler disabled, using precompiled artifacts");
                return Ok(ToolchainSelection::Precompiled);
            }
            CompilerPreference::Auto => self.probe(family),
            CompilerPreference::Path(path) => self.explicit(family, path),
        };

        match found {
            Ok(toolchain) => {
                log::info!("{family}: using {toolchain}");
                Ok(ToolchainSelection::Compiler(toolchain))
            }
            Err(err) if !err.is_fatal() => {
                log::warn!("{err}, falling back to precompiled artifacts");
                Ok(ToolchainSelection::Precompiled)
            }
            Err(err) => Err(err),
        }
    }
}
