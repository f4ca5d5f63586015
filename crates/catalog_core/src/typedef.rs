//! Custom-metadata type definitions and the badges drawn over them.
//!
//! The catalog keys custom metadata on assets, in searches and in updates
//! by the internal names it assigns at creation, never by display name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetadataDef {
    /// Internal (hashed) name assigned by the catalog; empty until created.
    #[serde(default)]
    pub name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub attribute_defs: Vec<AttributeDef>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl CustomMetadataDef {
    pub fn creator(display_name: &str) -> Self {
        Self {
            name: String::new(),
            display_name: display_name.to_string(),
            description: None,
            attribute_defs: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeDef) -> Self {
        self.attribute_defs.push(attribute);
        self
    }

    pub fn emoji(mut self, emoji: &str) -> Self {
        self.options
            .insert("logoType".to_string(), "emoji".to_string());
        self.options.insert("emoji".to_string(), emoji.to_string());
        self
    }

    pub fn has_attribute(&self, display_name: &str) -> bool {
        self.attribute_named(display_name).is_some()
    }

    pub fn attribute_named(&self, display_name: &str) -> Option<&AttributeDef> {
        self.attribute_defs
            .iter()
            .find(|a| a.display_name == display_name)
    }

    /// `(set, attribute)` internal names for an attribute given by display
    /// name. `None` until the catalog has assigned names.
    pub fn internal_names(&self, attribute: &str) -> Option<(&str, &str)> {
        let attribute = self.attribute_named(attribute)?;
        if self.name.is_empty() || attribute.name.is_empty() {
            return None;
        }
        Some((self.name.as_str(), attribute.name.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDef {
    #[serde(default)]
    pub name: String,
    pub display_name: String,
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_optional")]
    pub is_optional: bool,
}

fn default_optional() -> bool {
    true
}

impl AttributeDef {
    pub fn decimal(display_name: &str) -> Self {
        Self {
            name: String::new(),
            display_name: display_name.to_string(),
            type_name: "float".to_string(),
            description: None,
            is_optional: true,
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

// ── Badges ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeComparison {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeColor {
    Green,
    Yellow,
    Red,
    Gray,
}

impl BadgeColor {
    pub fn hex(&self) -> &'static str {
        match self {
            BadgeColor::Green => "#047960",
            BadgeColor::Yellow => "#F7B43D",
            BadgeColor::Red => "#BF1B1B",
            BadgeColor::Gray => "#525C73",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeCondition {
    #[serde(rename = "badgeConditionOperator")]
    pub operator: BadgeComparison,
    #[serde(rename = "badgeConditionValue")]
    pub value: String,
    #[serde(rename = "badgeConditionColorhex")]
    pub color_hex: String,
}

/// Coloured badge shown for one custom-metadata attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeDef {
    pub name: String,
    /// `<set>.<attribute>` in internal names.
    pub metadata_attribute: String,
    pub user_description: Option<String>,
    pub conditions: Vec<BadgeCondition>,
}

impl BadgeDef {
    pub fn creator(name: &str, set_id: &str, attribute_id: &str) -> Self {
        Self {
            name: name.to_string(),
            metadata_attribute: format!("{set_id}.{attribute_id}"),
            user_description: None,
            conditions: Vec::new(),
        }
    }

    pub fn described(mut self, description: &str) -> Self {
        self.user_description = Some(description.to_string());
        self
    }

    pub fn condition(mut self, operator: BadgeComparison, value: &str, color: BadgeColor) -> Self {
        self.conditions.push(BadgeCondition {
            operator,
            value: value.to_string(),
            color_hex: color.hex().to_string(),
        });
        self
    }

    pub fn qualified_name(&self) -> String {
        format!("badges/global/{}", self.metadata_attribute)
    }

    /// Entity JSON for the bulk endpoint; badges are stored as assets.
    pub fn to_json(&self) -> Value {
        let mut attributes = json!({
            "name": self.name,
            "qualifiedName": self.qualified_name(),
            "badgeMetadataAttribute": self.metadata_attribute,
            "badgeConditions": self.conditions,
        });
        if let Some(description) = &self.user_description {
            attributes["userDescription"] = Value::String(description.clone());
        }
        json!({ "typeName": "Badge", "attributes": attributes })
    }
}
