//! Variant Matrix Expansion
//!
//! Turns one [`ShaderSource`] into the exhaustive list of artifacts a family
//! needs from it. The toggle axes per stage come from the [`FamilyProfile`]:
//!
//! | Stage       | Axes                                         | SPIR-V | SM6 | SM5 |
//! |-------------|----------------------------------------------|--------|-----|-----|
//! | vertex      | multiview                                    | 2      | 2   | 2   |
//! | fragment    | multiview × profile fragment axes            | 4      | 2   | 8   |
//! | unspecified | multiview, once per entry point (VS and PS)  | error  | 4   | 4   |

use forge_core::{
    ArtifactPath, FamilyProfile, FeatureSet, ForgeError, Result, ShaderDefines, ShaderSource, Stage,
    Variant,
};

/// Everything a toolchain needs to know about one variant, independent of
/// the compiler's own flag syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompileFlags {
    /// Concrete stage of the output.
    pub stage: Stage,
    /// Entry point for HLSL families, `None` for GLSL `main`.
    pub entry_point: Option<String>,
    /// `vulkan1.1` for SPIR-V, shader model suffix (`5_0`) for HLSL.
    pub target_env: String,
    /// One define per active toggle.
    pub defines: ShaderDefines,
}

impl CompileFlags {
    /// Shader model profile for HLSL compilers (`vs_5_0`, `ps_6_0`).
    #[must_use]
    pub fn shader_model(&self) -> String {
        let prefix = match self.stage {
            Stage::Vertex => "vs",
            Stage::Fragment | Stage::Unspecified => "ps",
        };
        format!("{prefix}_{}", self.target_env)
    }
}

/// One expanded artifact of a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactPlan {
    pub variant: Variant,
    /// File name stem of the artifact; differs from the source name only for
    /// multi-stage sources.
    pub artifact_name: String,
    pub artifact: ArtifactPath,
    pub flags: CompileFlags,
}

/// Expands a source into its artifact plans for one family.
///
/// The order is deterministic: outputs in stage order (vertex before
/// fragment for multi-stage sources), then toggle combinations counted with
/// multiview as the lowest bit.
pub fn expand(source: &ShaderSource, profile: &FamilyProfile) -> Result<Vec<ArtifactPlan>> {
    // (output stage, artifact name, toggle axes)
    let outputs: Vec<(Stage, String, FeatureSet)> = match source.stage() {
        stage @ (Stage::Vertex | Stage::Fragment) => {
            vec![(stage, source.name().to_string(), profile.axes_for(stage))]
        }
        Stage::Unspecified => {
            if profile.entry_points.is_none() {
                return Err(ForgeError::configuration(
                    source.path(),
                    format!(
                        "cannot infer a stage from '{}' and {} has no entry-point convention; \
                         name the file <name>_vert or <name>_frag",
                        source.name(),
                        profile.family
                    ),
                ));
            }
            // Multi-stage sources only carry the multiview axis.
            [Stage::Vertex, Stage::Fragment]
                .into_iter()
                .filter_map(|stage| {
                    stage.keyword().map(|keyword| {
                        (stage, format!("{}_{keyword}", source.name()), FeatureSet::MULTIVIEW)
                    })
                })
                .collect()
        }
    };

    let mut plans = Vec::new();
    for (stage, artifact_name, axes) in outputs {
        let entry_point = profile
            .entry_points
            .as_ref()
            .and_then(|entries| entries.for_stage(stage))
            .map(str::to_string);

        for features in FeatureSet::combinations(axes) {
            plans.push(ArtifactPlan {
                variant: Variant::new(stage, features),
                artifact: ArtifactPath::new(profile, features, &artifact_name),
                artifact_name: artifact_name.clone(),
                flags: CompileFlags {
                    stage,
                    entry_point: entry_point.clone(),
                    target_env: profile.target_env.clone(),
                    defines: ShaderDefines::from_features(features),
                },
            });
        }
    }

    log::trace!(
        "{}: {} {} artifacts for {}",
        source.path().display(),
        plans.len(),
        source.stage(),
        profile.family
    );

    Ok(plans)
}
