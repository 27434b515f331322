//! Target Families
//!
//! A target family is one binary shader ecosystem (SPIR-V, HLSL shader model
//! 6, HLSL shader model 5). The families do not expand the same variant axes:
//! SPIR-V has no plane-format axis, and SM6 in its default profile only uses
//! the multiview axis. These differences are kept as per-family profile data
//! in [`FamilyProfile`] rather than as branches in the expander.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::features::FeatureSet;
use crate::stage::Stage;

/// A binary shader format ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFamily {
    #[serde(rename = "spirv")]
    SpirV,
    Sm6,
    Sm5,
}

impl TargetFamily {
    pub const ALL: [TargetFamily; 3] = [TargetFamily::SpirV, TargetFamily::Sm6, TargetFamily::Sm5];

    /// Extension of compiled artifacts.
    #[must_use]
    pub fn binary_extension(self) -> &'static str {
        match self {
            Self::SpirV => "spv",
            Self::Sm6 | Self::Sm5 => "cso",
        }
    }

    /// Extension of shader sources picked up when a directory is given.
    #[must_use]
    pub fn source_extension(self) -> &'static str {
        match self {
            Self::SpirV => "glsl",
            Self::Sm6 | Self::Sm5 => "hlsl",
        }
    }

    /// Identifier used in manifests and on the command line.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::SpirV => "spirv",
            Self::Sm6 => "sm6",
            Self::Sm5 => "sm5",
        }
    }

    /// Built-in profile for the family.
    #[must_use]
    pub fn default_profile(self) -> FamilyProfile {
        match self {
            Self::SpirV => FamilyProfile {
                family: self,
                fragment_axes: FeatureSet::FOVEATION_DECODE,
                output_subdir: None,
                entry_points: None,
                target_env: "vulkan1.1".to_string(),
            },
            Self::Sm6 => FamilyProfile {
                family: self,
                fragment_axes: FeatureSet::empty(),
                output_subdir: Some("SM6".to_string()),
                entry_points: Some(EntryPoints::default()),
                target_env: "6_0".to_string(),
            },
            Self::Sm5 => FamilyProfile {
                family: self,
                fragment_axes: FeatureSet::FOVEATION_DECODE | FeatureSet::YUV_THREE_PLANE,
                output_subdir: Some("SM5".to_string()),
                entry_points: Some(EntryPoints::default()),
                target_env: "5_0".to_string(),
            },
        }
    }
}

impl fmt::Display for TargetFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SpirV => "SPIR-V",
            Self::Sm6 => "HLSL SM6",
            Self::Sm5 => "HLSL SM5",
        })
    }
}

impl FromStr for TargetFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|family| family.key().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown target family '{s}' (expected spirv, sm6 or sm5)"))
    }
}

/// Entry point names of a multi-stage source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoints {
    pub vertex: String,
    pub fragment: String,
}

impl Default for EntryPoints {
    fn default() -> Self {
        Self {
            vertex: "MainVS".to_string(),
            fragment: "MainPS".to_string(),
        }
    }
}

impl EntryPoints {
    /// Entry point for a concrete stage.
    #[must_use]
    pub fn for_stage(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Vertex => Some(&self.vertex),
            Stage::Fragment => Some(&self.fragment),
            Stage::Unspecified => None,
        }
    }
}

/// Per-family expansion and invocation policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FamilyProfile {
    pub family: TargetFamily,
    /// Toggles layered on top of multiview for fragment sources.
    pub fragment_axes: FeatureSet,
    /// Directory between `shaders/` and the toggle folders.
    pub output_subdir: Option<String>,
    /// Entry point convention. `None` means sources have a single `main`
    /// and multi-stage sources cannot be expanded.
    pub entry_points: Option<EntryPoints>,
    /// Target environment (`vulkan1.1`) or shader model suffix (`6_0`).
    pub target_env: String,
}

impl FamilyProfile {
    /// Axes expanded for an output of the given concrete stage. Multiview is
    /// always present.
    #[must_use]
    pub fn axes_for(&self, stage: Stage) -> FeatureSet {
        match stage {
            Stage::Fragment => FeatureSet::MULTIVIEW | self.fragment_axes,
            Stage::Vertex | Stage::Unspecified => FeatureSet::MULTIVIEW,
        }
    }
}
