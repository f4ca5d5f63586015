//! Partial update payload ("trimmed" asset).
//!
//! Carries the identity fields a catalog needs to locate and validate an
//! entity plus only the attributes a handler decided to touch. Anything
//! left as [`Patch::Keep`] is omitted from the wire payload, so untouched
//! attributes edited concurrently by other writers are never clobbered.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::asset::{Asset, AssetRef, CertificateStatus, CustomMetadata};
use crate::patch::Patch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetUpdate {
    pub guid: String,
    pub type_name: String,
    pub qualified_name: String,
    pub name: Option<String>,
    pub anchor: Option<AssetRef>,
    pub aws_arn: Option<String>,

    pub description: Patch<String>,
    pub user_description: Patch<String>,
    pub certificate_status: Patch<CertificateStatus>,
    pub certificate_status_message: Patch<String>,
    pub owner_users: Patch<BTreeSet<String>>,
    pub owner_groups: Patch<BTreeSet<String>>,
    pub custom_metadata: CustomMetadata,
}

impl AssetUpdate {
    /// Identity-only stub of `asset`: nothing touched yet.
    pub fn trim_to_required(asset: &Asset) -> Self {
        Self {
            guid: asset.guid.clone(),
            type_name: asset.type_name.clone(),
            qualified_name: asset.attributes.qualified_name.clone(),
            name: asset.attributes.name.clone(),
            anchor: asset.attributes.anchor.clone(),
            aws_arn: asset.attributes.aws_arn.clone(),
            ..Default::default()
        }
    }

    pub fn touched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let patches: [(&'static str, bool); 6] = [
            ("description", self.description.is_keep()),
            ("userDescription", self.user_description.is_keep()),
            ("certificateStatus", self.certificate_status.is_keep()),
            (
                "certificateStatusMessage",
                self.certificate_status_message.is_keep(),
            ),
            ("ownerUsers", self.owner_users.is_keep()),
            ("ownerGroups", self.owner_groups.is_keep()),
        ];
        for (field, keep) in patches {
            if !keep {
                fields.push(field);
            }
        }
        if !self.custom_metadata.is_empty() {
            fields.push("businessAttributes");
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.touched_fields().is_empty()
    }

    /// Entity JSON for the bulk update endpoint. Cleared fields are sent
    /// as explicit `null`; kept fields are omitted.
    pub fn to_json(&self) -> Value {
        let mut attributes = Map::new();
        attributes.insert(
            "qualifiedName".to_string(),
            Value::String(self.qualified_name.clone()),
        );
        if let Some(name) = &self.name {
            attributes.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(anchor) = &self.anchor {
            if let Ok(value) = serde_json::to_value(anchor) {
                attributes.insert("anchor".to_string(), value);
            }
        }
        if let Some(arn) = &self.aws_arn {
            attributes.insert("awsArn".to_string(), Value::String(arn.clone()));
        }

        let patches = [
            ("description", self.description.to_json()),
            ("userDescription", self.user_description.to_json()),
            ("certificateStatus", self.certificate_status.to_json()),
            (
                "certificateStatusMessage",
                self.certificate_status_message.to_json(),
            ),
            ("ownerUsers", self.owner_users.to_json()),
            ("ownerGroups", self.owner_groups.to_json()),
        ];
        for (field, value) in patches {
            if let Some(value) = value {
                attributes.insert(field.to_string(), value);
            }
        }

        let mut entity = Map::new();
        entity.insert("guid".to_string(), Value::String(self.guid.clone()));
        entity.insert(
            "typeName".to_string(),
            Value::String(self.type_name.clone()),
        );
        entity.insert("attributes".to_string(), Value::Object(attributes));
        if !self.custom_metadata.is_empty() {
            if let Ok(value) = serde_json::to_value(&self.custom_metadata) {
                entity.insert("businessAttributes".to_string(), value);
            }
        }
        Value::Object(entity)
    }

    /// Fold this update into `asset` the way the catalog would.
    pub fn apply_to(&self, asset: &mut Asset) {
        let attrs = &mut asset.attributes;
        attrs.description = self.description.clone().apply_to(attrs.description.take());
        attrs.user_description = self
            .user_description
            .clone()
            .apply_to(attrs.user_description.take());
        attrs.certificate_status = self
            .certificate_status
            .clone()
            .apply_to(attrs.certificate_status.take());
        attrs.certificate_status_message = self
            .certificate_status_message
            .clone()
            .apply_to(attrs.certificate_status_message.take());
        attrs.owner_users = self.owner_users.clone().apply_to(attrs.owner_users.take());
        attrs.owner_groups = self
            .owner_groups
            .clone()
            .apply_to(attrs.owner_groups.take());

        if !self.custom_metadata.is_empty() {
            let existing = asset.custom_metadata.get_or_insert_with(Default::default);
            for (set, values) in &self.custom_metadata {
                existing
                    .entry(set.clone())
                    .or_default()
                    .extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Asset {
        let mut asset = Asset::new("g-1", "Table", "db/sch/orders")
            .with_description("orders")
            .with_owner_users(["alice"]);
        asset.attributes.name = Some("orders".to_string());
        asset
    }

    #[test]
    fn trimmed_stub_touches_nothing() {
        let update = AssetUpdate::trim_to_required(&table());
        assert!(update.is_empty());
        let json = update.to_json();
        assert_eq!(
            json["attributes"],
            json!({"qualifiedName": "db/sch/orders", "name": "orders"})
        );
    }

    #[test]
    fn cleared_field_serializes_as_null() {
        let mut update = AssetUpdate::trim_to_required(&table());
        update.owner_users = Patch::Clear;
        update.certificate_status = Patch::Set(CertificateStatus::Draft);
        let json = update.to_json();
        assert_eq!(json["attributes"]["ownerUsers"], Value::Null);
        assert!(json["attributes"]
            .as_object()
            .unwrap()
            .contains_key("ownerUsers"));
        assert_eq!(json["attributes"]["certificateStatus"], json!("DRAFT"));
        assert!(json["attributes"].get("description").is_none());
        assert_eq!(
            update.touched_fields(),
            vec!["certificateStatus", "ownerUsers"]
        );
    }

    #[test]
    fn apply_to_only_changes_touched_fields() {
        let mut asset = table();
        let mut update = AssetUpdate::trim_to_required(&asset);
        update.owner_users = Patch::Clear;
        update
            .custom_metadata
            .entry("DaaP".to_string())
            .or_default()
            .insert("Score".to_string(), json!(75.0));
        update.apply_to(&mut asset);

        assert_eq!(asset.attributes.owner_users, None);
        assert_eq!(asset.attributes.description.as_deref(), Some("orders"));
        assert_eq!(asset.custom_metadata_value("DaaP", "Score"), Some(&json!(75.0)));
    }
}
