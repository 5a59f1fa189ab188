//! Field registry: the authoritative set of known field names.
//!
//! The registry holds every [`FieldDescriptor`] in declaration order plus the
//! curated "valid" subset used for stricter highlighting. It is built once from
//! a [`RegistryConfig`] and is read-only afterwards.

use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{unknown_field_help, FieldRefError, FieldRefResult};

/// Type of a field: either a numeric type code or a type name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TypeTag {
    Code(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TypeTagVisitor)
    }
}

struct TypeTagVisitor;

impl<'de> Visitor<'de> for TypeTagVisitor {
    type Value = TypeTag;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a type name or an integer type code")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<TypeTag, E> {
        Ok(TypeTag::Code(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<TypeTag, E> {
        i64::try_from(value)
            .map(TypeTag::Code)
            .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(value), &self))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<TypeTag, E> {
        Ok(TypeTag::Name(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<TypeTag, E> {
        Ok(TypeTag::Name(value))
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Code(code) => write!(f, "{}", code),
            TypeTag::Name(name) => f.write_str(name),
        }
    }
}

/// Metadata for a single field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: TypeTag,
    /// Human-readable description
    #[serde(alias = "value")]
    pub label: String,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, type_tag: TypeTag, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag,
            label: label.into(),
        }
    }
}

/// Raw registry contents as loaded from configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Names from `fields` that count as valid
    #[serde(default)]
    pub valid: Vec<String>,
}

impl RegistryConfig {
    /// The five fields the editor ships with when no settings file is found
    pub fn sample() -> Self {
        let field = |name: &str, type_tag: TypeTag, label: &str| {
            FieldDescriptor::new(name, type_tag, label)
        };
        let string = || TypeTag::Name("string".to_string());

        Self {
            fields: vec![
                field("wdxTotalAssets", TypeTag::Code(450), "wdx Total Assets"),
                field("DYNAMIC_servicetypes", string(), "Service types"),
                field(
                    "wdxFinancialOtherLiabilitiesAmount",
                    string(),
                    "wdx Financial Other Liabilities Amount",
                ),
                field("wdxNetIncome", string(), "wdx Net Income"),
                field("DYNAMIC_clientcategory", string(), "DYNAMIC client category"),
            ],
            valid: vec![
                "wdxTotalAssets".to_string(),
                "DYNAMIC_servicetypes".to_string(),
            ],
        }
    }
}

/// Validated, read-only field registry
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: IndexMap<String, FieldDescriptor>,
    valid: IndexSet<String>,
}

impl FieldRegistry {
    /// Build a registry, enforcing that every valid name has a descriptor.
    ///
    /// A valid name without a descriptor would highlight as valid while hover
    /// reports no data for it, so the whole load fails instead.
    pub fn from_config(config: RegistryConfig) -> FieldRefResult<Self> {
        let mut fields = IndexMap::with_capacity(config.fields.len());

        for (index, descriptor) in config.fields.into_iter().enumerate() {
            if descriptor.name.is_empty() {
                return Err(FieldRefError::EmptyFieldName { index });
            }
            if matches!(&descriptor.type_tag, TypeTag::Name(name) if name.trim().is_empty()) {
                return Err(FieldRefError::InvalidTypeTag {
                    name: descriptor.name,
                });
            }
            if fields.contains_key(&descriptor.name) {
                return Err(FieldRefError::DuplicateField {
                    name: descriptor.name,
                });
            }
            fields.insert(descriptor.name.clone(), descriptor);
        }

        let valid: IndexSet<String> = config.valid.into_iter().collect();
        let orphans: Vec<String> = valid
            .iter()
            .filter(|name| !fields.contains_key(name.as_str()))
            .cloned()
            .collect();

        if !orphans.is_empty() {
            let help = orphans
                .iter()
                .map(|name| {
                    format!(
                        "'{}': {}",
                        name,
                        unknown_field_help(name, fields.keys().map(String::as_str))
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FieldRefError::ValidFieldWithoutDescriptor {
                names: orphans,
                help,
            });
        }

        tracing::debug!(
            fields = fields.len(),
            valid = valid.len(),
            "field registry loaded"
        );

        Ok(Self { fields, valid })
    }

    /// The sample registry; its valid subset is consistent by construction
    pub fn sample() -> Self {
        let config = RegistryConfig::sample();
        Self {
            fields: config
                .fields
                .into_iter()
                .map(|descriptor| (descriptor.name.clone(), descriptor))
                .collect(),
            valid: config.valid.into_iter().collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.valid.contains(name)
    }

    /// All descriptors in declaration order
    pub fn descriptors(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn valid_names(&self) -> impl Iterator<Item = &str> {
        self.valid.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Back to the configuration shape (used by `registry --format json`)
    pub fn to_config(&self) -> RegistryConfig {
        RegistryConfig {
            fields: self.fields.values().cloned().collect(),
            valid: self.valid.iter().cloned().collect(),
        }
    }
}
