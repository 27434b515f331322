//! Rendering Feature Toggles
//!
//! Each toggle is an independent boolean axis. A [`FeatureSet`] is one point
//! in the cross product; together with the output stage it forms a
//! [`Variant`].
//!
//! The canonical axis order is multiview, foveated decode, three-plane YUV.
//! It drives both the nesting of output directories and the enumeration
//! order of the variant matrix, so it must never change.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
    pub struct FeatureSet: u8 {
        /// Single-pass stereo rendering.
        const MULTIVIEW        = 1 << 0;
        /// Foveated-render decode in the fragment stage.
        const FOVEATION_DECODE = 1 << 1;
        /// Sampling from three-plane YUV formats.
        const YUV_THREE_PLANE  = 1 << 2;
    }
}

impl FeatureSet {
    /// Single-flag sets in canonical order.
    pub const ORDERED: [FeatureSet; 3] = [
        FeatureSet::MULTIVIEW,
        FeatureSet::FOVEATION_DECODE,
        FeatureSet::YUV_THREE_PLANE,
    ];

    /// Directory segment contributed when the toggle is on.
    ///
    /// Returns `None` for empty or multi-flag sets.
    #[must_use]
    pub fn path_segment(self) -> Option<&'static str> {
        Self::describe(self).map(|(segment, _)| segment)
    }

    /// Preprocessor define passed to the compiler when the toggle is on.
    #[must_use]
    pub fn define_name(self) -> Option<&'static str> {
        Self::describe(self).map(|(_, define)| define)
    }

    fn describe(flag: FeatureSet) -> Option<(&'static str, &'static str)> {
        const TABLE: [(FeatureSet, &str, &str); 3] = [
            (FeatureSet::MULTIVIEW, "multiview", "ENABLE_MULTIVIEW_EXT"),
            (FeatureSet::FOVEATION_DECODE, "fovDecode", "ENABLE_FOVEATED_DECODE"),
            (FeatureSet::YUV_THREE_PLANE, "yuv3PlaneFmt", "ENABLE_3PLANE_FMT_SAMPLER"),
        ];
        TABLE
            .iter()
            .find(|(candidate, _, _)| *candidate == flag)
            .map(|&(_, segment, define)| (segment, define))
    }

    /// Active single flags in canonical order.
    pub fn active(self) -> impl Iterator<Item = FeatureSet> {
        Self::ORDERED.into_iter().filter(move |flag| self.contains(*flag))
    }

    /// Path segments of all active toggles, outermost first.
    pub fn path_segments(self) -> impl Iterator<Item = &'static str> {
        self.active().filter_map(FeatureSet::path_segment)
    }

    /// Every subset of `axes`, enumerated as a binary counter over the
    /// canonical order (the first active axis flips fastest).
    ///
    /// `combinations(MULTIVIEW | FOVEATION_DECODE)` yields
    /// `[empty, MULTIVIEW, FOVEATION_DECODE, MULTIVIEW | FOVEATION_DECODE]`.
    #[must_use]
    pub fn combinations(axes: FeatureSet) -> Vec<FeatureSet> {
        let flags: Vec<FeatureSet> = axes.active().collect();
        (0..1u32 << flags.len())
            .map(|counter| {
                flags
                    .iter()
                    .enumerate()
                    .filter(|(bit, _)| counter & (1 << bit) != 0)
                    .fold(FeatureSet::empty(), |set, (_, flag)| set | *flag)
            })
            .collect()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("base");
        }
        let names: Vec<_> = self.path_segments().collect();
        f.write_str(&names.join("+"))
    }
}

/// A single toggle as named in manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureToggle {
    Multiview,
    FoveationDecode,
    YuvThreePlane,
}

impl From<FeatureToggle> for FeatureSet {
    fn from(toggle: FeatureToggle) -> Self {
        match toggle {
            FeatureToggle::Multiview => FeatureSet::MULTIVIEW,
            FeatureToggle::FoveationDecode => FeatureSet::FOVEATION_DECODE,
            FeatureToggle::YuvThreePlane => FeatureSet::YUV_THREE_PLANE,
        }
    }
}

impl FromIterator<FeatureToggle> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureToggle>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FeatureSet::empty(), |set, toggle| set | toggle.into())
    }
}

/// One artifact's identity within a source: its concrete output stage and
/// the toggle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variant {
    pub stage: Stage,
    pub features: FeatureSet,
}

impl Variant {
    #[must_use]
    pub fn new(stage: Stage, features: FeatureSet) -> Self {
        Self { stage, features }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.stage, self.features)
    }
}
