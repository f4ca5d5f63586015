//! Asset model.
//!
//! The wire shape follows the catalog's entity JSON: identity at the top
//! level, everything else under `attributes`, custom metadata under
//! `businessAttributes`. Optional fields distinguish "absent / null"
//! (`None`) from "present but empty" (`Some(empty)`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Attribute-set name → attribute name → value.
pub type CustomMetadata = BTreeMap<String, BTreeMap<String, Value>>;

/// Type names whose instances never carry process links, even though the
/// catalog may still answer with a precomputed lineage flag for them.
const NON_CATALOG_TYPES: &[&str] = &[
    "Connection",
    "Readme",
    "Link",
    "Badge",
    "Persona",
    "Purpose",
    "AuthPolicy",
];

const GLOSSARY_TYPE_PREFIX: &str = "AtlasGlossary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CertificateStatus {
    Verified,
    Draft,
    Deprecated,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Verified => "VERIFIED",
            CertificateStatus::Draft => "DRAFT",
            CertificateStatus::Deprecated => "DEPRECATED",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VERIFIED" => Ok(CertificateStatus::Verified),
            "DRAFT" => Ok(CertificateStatus::Draft),
            "DEPRECATED" => Ok(CertificateStatus::Deprecated),
            other => Err(format!("unknown certificate status '{other}'")),
        }
    }
}

/// Reference to a related entity (process, term, anchor glossary).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
}

impl AssetRef {
    pub fn by_guid(type_name: &str, guid: &str) -> Self {
        Self {
            guid: Some(guid.to_string()),
            type_name: Some(type_name.to_string()),
            display_text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_guid: Option<String>,
}

impl Classification {
    pub fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            entity_guid: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAttributes {
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_users: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_groups: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_status: Option<CertificateStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_status_message: Option<String>,
    #[serde(
        default,
        rename = "__hasLineage",
        skip_serializing_if = "Option::is_none"
    )]
    pub has_lineage: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_to_processes: Option<Vec<AssetRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_from_processes: Option<Vec<AssetRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meanings: Option<Vec<AssetRef>>,
    /// Terms linked from the term side; some types answer with this
    /// instead of `meanings`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_terms: Option<Vec<AssetRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<AssetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws_arn: Option<String>,
}

/// Full domain entity, keyed by `guid` and by (`type_name`, `qualified_name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub guid: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub attributes: AssetAttributes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifications: Option<Vec<Classification>>,
    #[serde(
        default,
        rename = "businessAttributes",
        skip_serializing_if = "Option::is_none"
    )]
    pub custom_metadata: Option<CustomMetadata>,
}

impl Asset {
    pub fn new(guid: &str, type_name: &str, qualified_name: &str) -> Self {
        Self {
            guid: guid.to_string(),
            type_name: type_name.to_string(),
            status: Some("ACTIVE".to_string()),
            attributes: AssetAttributes {
                qualified_name: qualified_name.to_string(),
                ..Default::default()
            },
            classifications: None,
            custom_metadata: None,
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.attributes.qualified_name
    }

    pub fn is_active(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "ACTIVE")
    }

    /// Glossaries, terms and categories.
    pub fn is_glossary_type(&self) -> bool {
        self.type_name.starts_with(GLOSSARY_TYPE_PREFIX)
    }

    /// Whether this type carries direct `inputToProcesses` / `outputFromProcesses` links.
    pub fn exposes_process_links(&self) -> bool {
        !self.is_glossary_type() && !NON_CATALOG_TYPES.contains(&self.type_name.as_str())
    }

    pub fn custom_metadata_value(&self, set: &str, attribute: &str) -> Option<&Value> {
        self.custom_metadata.as_ref()?.get(set)?.get(attribute)
    }

    /// Minimal pointer back to this asset, as an event would carry it.
    pub fn snapshot(&self) -> AssetSnapshot {
        let mut attributes = serde_json::Map::new();
        attributes.insert(
            "qualifiedName".to_string(),
            Value::String(self.attributes.qualified_name.clone()),
        );
        AssetSnapshot {
            guid: self.guid.clone(),
            type_name: self.type_name.clone(),
            attributes,
        }
    }

    // ── builder-style helpers, mostly for fixtures ─────────────

    pub fn with_description(mut self, description: &str) -> Self {
        self.attributes.description = Some(description.to_string());
        self
    }

    pub fn with_user_description(mut self, description: &str) -> Self {
        self.attributes.user_description = Some(description.to_string());
        self
    }

    pub fn with_owner_users<'a>(mut self, users: impl IntoIterator<Item = &'a str>) -> Self {
        self.attributes.owner_users = Some(users.into_iter().map(str::to_string).collect());
        self
    }

    pub fn with_owner_groups<'a>(mut self, groups: impl IntoIterator<Item = &'a str>) -> Self {
        self.attributes.owner_groups = Some(groups.into_iter().map(str::to_string).collect());
        self
    }

    pub fn with_certificate(mut self, status: CertificateStatus) -> Self {
        self.attributes.certificate_status = Some(status);
        self
    }

    pub fn with_input_to_process(mut self, process_guid: &str) -> Self {
        self.attributes
            .input_to_processes
            .get_or_insert_with(Vec::new)
            .push(AssetRef::by_guid("Process", process_guid));
        self
    }

    pub fn with_term(mut self, term_guid: &str) -> Self {
        self.attributes
            .meanings
            .get_or_insert_with(Vec::new)
            .push(AssetRef::by_guid("AtlasGlossaryTerm", term_guid));
        self
    }

    pub fn with_classification(mut self, name: &str) -> Self {
        self.classifications
            .get_or_insert_with(Vec::new)
            .push(Classification::named(name));
        self
    }
}

/// Identity plus whatever attributes the notification carried.
///
/// Never authoritative: handlers re-resolve the asset from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetSnapshot {
    #[serde(default)]
    pub guid: String,
    pub type_name: String,
    #[serde(default)]
    pub attributes: serde_json::Map<String, Value>,
}

impl AssetSnapshot {
    pub fn qualified_name(&self) -> Option<&str> {
        self.attributes.get("qualifiedName").and_then(Value::as_str)
    }
}
