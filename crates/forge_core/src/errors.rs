//! Error Types
//!
//! This module defines the error types used throughout the forge.
//!
//! # Overview
//!
//! The main error type [`ForgeError`] covers every failure mode of a shader
//! build:
//! - Build-definition bugs (unsupported source naming, artifact collisions)
//! - Missing toolchains (non-fatal, switches a family to precompiled mode)
//! - Missing precompiled artifacts in fallback mode
//! - Compiler invocations that exit with a non-zero status
//!
//! # Usage
//!
//! All public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ForgeError>`.
//!
//! ```rust,ignore
//! use forge_core::errors::{ForgeError, Result};
//!
//! fn plan() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::family::TargetFamily;

/// The main error type for the shader forge.
#[derive(Error, Debug)]
pub enum ForgeError {
    // ========================================================================
    // Build Definition Errors
    // ========================================================================
    /// The build definition is wrong: a source name cannot be mapped to a
    /// stage or entry point, two units claim the same artifact, or the
    /// manifest is inconsistent.
    #[error("Configuration error for '{}': {reason}", .subject.display())]
    Configuration {
        /// The source file, artifact or manifest the problem was found in.
        subject: PathBuf,
        /// Human readable description.
        reason: String,
    },

    /// Manifest could not be read, parsed or written.
    #[error("Manifest error in '{}': {message}", .path.display())]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Parser or serializer message.
        message: String,
    },

    // ========================================================================
    // Toolchain Errors
    // ========================================================================
    /// No compiler was found for a family. Not fatal: the family switches to
    /// precompiled mode.
    #[error("No shader compiler found for {family}")]
    ToolNotFound {
        /// The family that has no usable compiler.
        family: TargetFamily,
    },

    /// A found compiler exited with a non-zero status.
    #[error(
        "{tool} failed on '{}' ({}):\n{diagnostics}",
        .source_path.display(),
        describe_status(.status)
    )]
    CompilerInvocation {
        /// Name of the compiler executable.
        tool: String,
        /// Shader source that was being compiled.
        source_path: PathBuf,
        /// Exit code, `None` when the process was killed by a signal.
        status: Option<i32>,
        /// Compiler stdout and stderr, verbatim.
        diagnostics: String,
    },

    // ========================================================================
    // Artifact Errors
    // ========================================================================
    /// Fallback mode could not find the precompiled artifact to copy.
    #[error(
        "Missing precompiled artifact '{}' (needed for '{}')",
        .expected.display(),
        .artifact.display()
    )]
    MissingPrecompiledArtifact {
        /// Where the precompiled file was expected.
        expected: PathBuf,
        /// The output the copy would have produced.
        artifact: PathBuf,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error with the path involved.
    #[error("IO error on '{}': {source}", .path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ForgeError {
    /// Shorthand for [`ForgeError::Configuration`].
    pub fn configuration(subject: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ForgeError::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the error stops the affected artifact from being produced.
    ///
    /// Only [`ForgeError::ToolNotFound`] is recoverable, it selects
    /// precompiled mode instead.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ToolNotFound { .. })
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Alias for `Result<T, ForgeError>`.
pub type Result<T> = std::result::Result<T, ForgeError>;
