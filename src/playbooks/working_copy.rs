//! Paired working copies of an asset under mutation.
//!
//! `full` starts as a complete clone of the resolved asset and exists only
//! to decide whether anything changed. `trimmed` starts as an identity-only
//! stub and becomes the literal update payload. Every change goes through
//! [`WorkingCopies::apply`], which writes it to both, so the set of touched
//! fields can never diverge between them.

use catalog_core::{Asset, AssetUpdate, CertificateStatus, Patch};

use super::owners::OwnerChange;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Description(Patch<String>),
    UserDescription(Patch<String>),
    CertificateStatus(Patch<CertificateStatus>),
    Owners(OwnerChange),
}

#[derive(Debug, Clone)]
pub struct WorkingCopies {
    full: Asset,
    trimmed: AssetUpdate,
}

impl WorkingCopies {
    pub fn new(original: &Asset) -> Self {
        Self {
            full: original.clone(),
            trimmed: AssetUpdate::trim_to_required(original),
        }
    }

    pub fn full(&self) -> &Asset {
        &self.full
    }

    pub fn trimmed(&self) -> &AssetUpdate {
        &self.trimmed
    }

    pub fn into_parts(self) -> (Asset, AssetUpdate) {
        (self.full, self.trimmed)
    }

    pub fn apply(&mut self, change: FieldChange) {
        let attrs = &mut self.full.attributes;
        match change {
            FieldChange::Description(patch) => {
                write(&mut attrs.description, &mut self.trimmed.description, patch)
            }
            FieldChange::UserDescription(patch) => write(
                &mut attrs.user_description,
                &mut self.trimmed.user_description,
                patch,
            ),
            FieldChange::CertificateStatus(patch) => write(
                &mut attrs.certificate_status,
                &mut self.trimmed.certificate_status,
                patch,
            ),
            FieldChange::Owners(OwnerChange { users, groups }) => {
                write(&mut attrs.owner_users, &mut self.trimmed.owner_users, users);
                write(
                    &mut attrs.owner_groups,
                    &mut self.trimmed.owner_groups,
                    groups,
                );
            }
        }
    }
}

/// A `Keep` leaves both sides alone, including any earlier change recorded
/// in the trimmed copy. Anything else overwrites both.
fn write<T: Clone>(full: &mut Option<T>, trimmed: &mut Patch<T>, patch: Patch<T>) {
    if patch.is_keep() {
        return;
    }
    *full = patch.clone().apply_to(full.take());
    *trimmed = patch;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Asset {
        Asset::new("g-1", "Table", "db/orders")
            .with_description("orders")
            .with_owner_users(["alice"])
    }

    #[test]
    fn new_copies_start_full_and_empty() {
        let copies = WorkingCopies::new(&orders());
        assert_eq!(copies.full(), &orders());
        assert!(copies.trimmed().is_empty());
        assert_eq!(copies.trimmed().guid, "g-1");
    }

    #[test]
    fn changes_land_on_both_copies() {
        let mut copies = WorkingCopies::new(&orders());
        copies.apply(FieldChange::Description(Patch::Set("new".into())));
        copies.apply(FieldChange::Owners(OwnerChange {
            users: Patch::Clear,
            groups: Patch::Keep,
        }));

        assert_eq!(copies.full().attributes.description.as_deref(), Some("new"));
        assert_eq!(copies.trimmed().description, Patch::Set("new".into()));
        assert_eq!(copies.full().attributes.owner_users, None);
        assert_eq!(copies.trimmed().owner_users, Patch::Clear);
        assert_eq!(copies.trimmed().owner_groups, Patch::Keep);
    }

    #[test]
    fn later_change_wins() {
        let mut copies = WorkingCopies::new(&orders());
        copies.apply(FieldChange::Description(Patch::Set("first".into())));
        copies.apply(FieldChange::Description(Patch::Set("second".into())));
        assert_eq!(
            copies.full().attributes.description.as_deref(),
            Some("second")
        );
        assert_eq!(copies.trimmed().description, Patch::Set("second".into()));
    }

    #[test]
    fn keep_does_not_erase_an_earlier_change() {
        let mut copies = WorkingCopies::new(&orders());
        copies.apply(FieldChange::Owners(OwnerChange {
            users: Patch::Keep,
            groups: Patch::Set(["eng".to_string()].into()),
        }));
        copies.apply(FieldChange::Owners(OwnerChange {
            users: Patch::Set(["bob".to_string()].into()),
            groups: Patch::Keep,
        }));
        assert_eq!(copies.trimmed().touched_fields(), vec!["ownerUsers", "ownerGroups"]);
    }
}
