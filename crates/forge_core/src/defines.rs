//! Shader Macro Definitions
//!
//! Preprocessor defines handed to the compiler for one variant. Stored as a
//! sorted list so that the same macro set always renders the same command
//! line, independent of insertion order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use forge_core::{FeatureSet, ShaderDefines};
//!
//! let defines = ShaderDefines::from_features(FeatureSet::MULTIVIEW);
//! assert_eq!(defines.get("ENABLE_MULTIVIEW_EXT"), Some("1"));
//! ```

use crate::features::FeatureSet;

/// A collection of shader macro definitions, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderDefines {
    defines: Vec<(String, String)>,
}

impl ShaderDefines {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            defines: Vec::new(),
        }
    }

    /// Defines for every active toggle, each set to `1`.
    #[must_use]
    pub fn from_features(features: FeatureSet) -> Self {
        let mut defines = Self::new();
        for name in features.active().filter_map(FeatureSet::define_name) {
            defines.set(name, "1");
        }
        defines
    }

    /// Inserts or overwrites `key`, keeping the list sorted.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.defines.binary_search_by(|(k, _)| k.as_str().cmp(key)) {
            Ok(idx) => value.clone_into(&mut self.defines[idx].1),
            Err(idx) => self.defines.insert(idx, (key.to_string(), value.to_string())),
        }
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.defines
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.defines[idx].1.as_str())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.defines.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Defines in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defines.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `NAME=VALUE` pairs in name order, as passed to `-D`.
    pub fn assignments(&self) -> impl Iterator<Item = String> + '_ {
        self.iter().map(|(k, v)| format!("{k}={v}"))
    }
}

impl From<&[(&str, &str)]> for ShaderDefines {
    fn from(defines: &[(&str, &str)]) -> Self {
        let mut result = Self::new();
        for (k, v) in defines {
            result.set(k, v);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut defines = ShaderDefines::new();
        defines.set("ENABLE_MULTIVIEW_EXT", "1");

        assert!(defines.contains("ENABLE_MULTIVIEW_EXT"));
        assert!(!defines.contains("ENABLE_FOVEATED_DECODE"));
        assert_eq!(defines.get("ENABLE_MULTIVIEW_EXT"), Some("1"));
    }

    #[test]
    fn test_insertion_order_does_not_matter() {
        let d1 = ShaderDefines::from(&[("B", "1"), ("A", "2")][..]);
        let d2 = ShaderDefines::from(&[("A", "2"), ("B", "1")][..]);
        assert_eq!(d1, d2);
        assert_eq!(d1.assignments().collect::<Vec<_>>(), ["A=2", "B=1"]);
    }

    #[test]
    fn test_set_overwrites() {
        let mut defines = ShaderDefines::from(&[("A", "1"), ("B", "2")][..]);
        defines.set("B", "3");

        assert_eq!(defines.len(), 2);
        assert_eq!(defines.get("A"), Some("1"));
        assert_eq!(defines.get("B"), Some("3"));
    }

    #[test]
    fn test_from_features() {
        assert!(ShaderDefines::from_features(FeatureSet::empty()).is_empty());

        let defines = ShaderDefines::from_features(FeatureSet::all());
        assert_eq!(defines.len(), 3);
        assert_eq!(defines.get("ENABLE_3PLANE_FMT_SAMPLER"), Some("1"));
        assert_eq!(defines.get("ENABLE_FOVEATED_DECODE"), Some("1"));
    }
}
