//! Three-way validity classification of referenced names.

use serde::{Deserialize, Serialize};

use crate::registry::FieldRegistry;

/// Validity bucket for a referenced name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    /// In the valid subset
    Valid,
    /// Has a descriptor but is outside the valid subset
    KnownUnregistered,
    /// Not in the registry at all
    Unknown,
}

/// Classify a name against the registry. Total for any input, including "".
pub fn classify(registry: &FieldRegistry, name: &str) -> Classification {
    if registry.is_valid(name) {
        Classification::Valid
    } else if registry.lookup(name).is_some() {
        Classification::KnownUnregistered
    } else {
        Classification::Unknown
    }
}

/// Outward visual bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualClass {
    Valid,
    Unknown,
}

impl VisualClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisualClass::Valid => "valid",
            VisualClass::Unknown => "unknown",
        }
    }

    /// Inline CSS class applied by browser hosts
    pub fn css_class(&self) -> &'static str {
        match self {
            VisualClass::Valid => "text-bg-success",
            VisualClass::Unknown => "text-bg-info",
        }
    }
}

/// Which classifications render as valid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HighlightPolicy {
    /// Only names in the valid subset
    #[default]
    ValidSubset,
    /// Any name with a descriptor
    AnyDescriptor,
}

impl HighlightPolicy {
    pub fn visual_class(self, classification: Classification) -> VisualClass {
        match (self, classification) {
            (_, Classification::Valid) => VisualClass::Valid,
            (HighlightPolicy::AnyDescriptor, Classification::KnownUnregistered) => {
                VisualClass::Valid
            }
            (HighlightPolicy::ValidSubset, Classification::KnownUnregistered) => {
                VisualClass::Unknown
            }
            (_, Classification::Unknown) => VisualClass::Unknown,
        }
    }
}

impl std::str::FromStr for HighlightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "valid-subset" => Ok(HighlightPolicy::ValidSubset),
            "any-descriptor" => Ok(HighlightPolicy::AnyDescriptor),
            other => Err(format!(
                "unknown highlight policy '{}' (expected valid-subset or any-descriptor)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_valid_subset() {
        let registry = FieldRegistry::sample();
        for name in registry.valid_names() {
            assert_eq!(classify(&registry, name), Classification::Valid);
        }
    }

    #[test]
    fn test_classify_known_unregistered() {
        let registry = FieldRegistry::sample();
        for name in registry.names().filter(|n| !registry.is_valid(n)) {
            assert_eq!(classify(&registry, name), Classification::KnownUnregistered);
        }
        assert_eq!(
            classify(&registry, "wdxNetIncome"),
            Classification::KnownUnregistered
        );
    }

    #[test]
    fn test_classify_unknown() {
        let registry = FieldRegistry::sample();
        assert_eq!(classify(&registry, "doesNotExist"), Classification::Unknown);
        assert_eq!(classify(&registry, ""), Classification::Unknown);
        // Names are case-sensitive
        assert_eq!(classify(&registry, "WDXTOTALASSETS"), Classification::Unknown);
    }

    #[test]
    fn test_policies_differ_only_on_known_unregistered() {
        use Classification::*;
        let strict = HighlightPolicy::ValidSubset;
        let loose = HighlightPolicy::AnyDescriptor;

        assert_eq!(strict.visual_class(Valid), VisualClass::Valid);
        assert_eq!(loose.visual_class(Valid), VisualClass::Valid);
        assert_eq!(strict.visual_class(KnownUnregistered), VisualClass::Unknown);
        assert_eq!(loose.visual_class(KnownUnregistered), VisualClass::Valid);
        assert_eq!(strict.visual_class(Unknown), VisualClass::Unknown);
        assert_eq!(loose.visual_class(Unknown), VisualClass::Unknown);
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "any-descriptor".parse::<HighlightPolicy>(),
            Ok(HighlightPolicy::AnyDescriptor)
        );
        assert!("strict".parse::<HighlightPolicy>().is_err());
    }
}
