#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Shader Forge
//!
//! Build-time shader variant compiler. Every shader source is compiled once
//! per combination of the rendering toggles its stage and target family
//! support (multiview, foveated decode, three-plane YUV sampling). When no
//! compiler is installed the artifacts are copied from a `precompiled/` tree
//! instead. All artifacts of a build belong to one named target.
//!
//! # Usage
//!
//! From a build script:
//!
//! ```rust,ignore
//! use shader_forge::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let out_dir = std::env::var("OUT_DIR")?;
//!     let target = Pipeline::new("engine_shaders", out_dir)
//!         .family(FamilyRequest::new(TargetFamily::SpirV).source("shaders/glsl"))
//!         .family(FamilyRequest::new(TargetFamily::Sm5).source("shaders/hlsl"))
//!         .run()?
//!         .into_target()?;
//!     target.emit_cargo_directives(&mut std::io::stdout())?;
//!     Ok(())
//! }
//! ```

pub use forge_build;
pub use forge_core;

pub use forge_build::{
    BuildPlan, BuildReport, BuildResult, BuildTarget, CompilerPreference, FailurePolicy,
    FamilyRequest, ForgeManifest, Pipeline, Scheduler, ToolProbe, ToolchainSelection,
    ToolchainSelector,
};
pub use forge_core::{
    FamilyProfile, FeatureSet, ForgeError, Result, ShaderSource, Stage, TargetFamily, Variant,
};

pub mod prelude {
    pub use forge_build::{
        BuildTarget, CompilerPreference, FailurePolicy, FamilyRequest, ForgeManifest, Pipeline,
        Scheduler, ToolProbe,
    };
    pub use forge_core::{FeatureSet, ForgeError, Stage, TargetFamily};
}
