//! Shader Stage Inference
//!
//! Sources are named `<token>_<stage>` (`overlay_frag`, `lobby_vert`). The
//! part after the first underscore selects the pipeline stage. Anything that
//! is not a known stage keyword is a combined source that carries both a
//! vertex and a fragment entry point.

use std::fmt;

use serde::Serialize;

/// Pipeline role of a shader source or artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Vertex,
    Fragment,
    /// Multi-stage source. Expands into one vertex and one fragment
    /// artifact, selected by entry point.
    Unspecified,
}

impl Stage {
    /// Infers the stage from a base name (file name without extension).
    ///
    /// Never fails: names without a stage keyword are [`Stage::Unspecified`].
    ///
    /// Only the text before the first `_` is dropped, and the rest must be
    /// exactly `vert` or `frag`. A name with more than one underscore, such
    /// as `passthrough_blend_frag`, is therefore multi-stage: an HLSL family
    /// expands it to `passthrough_blend_frag_vert` and
    /// `passthrough_blend_frag_frag`, a GLSL family rejects it.
    ///
    /// ```rust,ignore
    /// assert_eq!(Stage::infer("overlay_frag"), Stage::Fragment);
    /// assert_eq!(Stage::infer("lobby"), Stage::Unspecified);
    /// assert_eq!(Stage::infer("passthrough_blend_frag"), Stage::Unspecified);
    /// ```
    #[must_use]
    pub fn infer(base_name: &str) -> Self {
        let keyword = base_name
            .split_once('_')
            .map_or(base_name, |(_, suffix)| suffix);

        match keyword {
            "vert" => Self::Vertex,
            "frag" => Self::Fragment,
            _ => Self::Unspecified,
        }
    }

    /// Keyword used in file names, `None` for [`Stage::Unspecified`].
    #[must_use]
    pub fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Vertex => Some("vert"),
            Self::Fragment => Some("frag"),
            Self::Unspecified => None,
        }
    }

    /// Whether this is a concrete single stage.
    #[inline]
    #[must_use]
    pub fn is_concrete(self) -> bool {
        !matches!(self, Self::Unspecified)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Unspecified => "unspecified",
        })
    }
}
