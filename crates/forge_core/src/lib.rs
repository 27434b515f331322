//! Forge Core
//!
//! Data model shared by every stage of the shader build:
//!
//! - [`Stage`] and [`ShaderSource`]: what a source file is
//! - [`FeatureSet`] and [`Variant`]: which toggles an artifact is built for
//! - [`TargetFamily`] and [`FamilyProfile`]: per-family expansion policy
//! - [`ArtifactPath`]: where an artifact lives
//! - [`ShaderDefines`]: preprocessor defines for one variant
//! - [`ForgeError`]: every failure mode

pub mod defines;
pub mod errors;
pub mod family;
pub mod features;
pub mod layout;
pub mod source;
pub mod stage;

pub use defines::ShaderDefines;
pub use errors::{ForgeError, Result};
pub use family::{EntryPoints, FamilyProfile, TargetFamily};
pub use features::{FeatureSet, FeatureToggle, Variant};
pub use layout::{ArtifactPath, FINGERPRINT_DIR, PRECOMPILED_DIR, SHADERS_DIR};
pub use source::ShaderSource;
pub use stage::Stage;
