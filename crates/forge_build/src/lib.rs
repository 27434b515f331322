//! Forge Build
//!
//! Turns shader sources into the artifacts of one aggregate target:
//!
//! - [`toolchain`]: compiler discovery per target family
//! - [`matrix`]: variant matrix expansion
//! - [`executor`]: compile-or-fallback build units
//! - [`registrar`]: aggregate target and its manifest
//! - [`schedule`]: parallel unit execution
//! - [`pipeline`]: the stages wired together
//! - [`config`]: `Shaders.toml`

pub mod config;
pub mod executor;
pub mod matrix;
pub mod pipeline;
pub mod registrar;
pub mod schedule;
pub mod toolchain;

pub use config::{FamilyManifest, ForgeManifest, MANIFEST_FILE};
pub use executor::{BuildUnit, CompileOrFallbackExecutor, UnitAction, UnitOutcome, plan_units};
pub use matrix::{ArtifactPlan, CompileFlags, expand};
pub use pipeline::{BuildPlan, BuildResult, FamilyRequest, Pipeline, plan_family};
pub use registrar::{BuildTarget, BuildTargetRegistrar, TargetArtifact};
pub use schedule::{BuildReport, FailurePolicy, Scheduler, UnitFailure};
pub use toolchain::{
    CompilerPreference, ToolKind, ToolProbe, Toolchain, ToolchainSelection, ToolchainSelector,
};
