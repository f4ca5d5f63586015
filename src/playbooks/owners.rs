//! Owner-set algebra.
//!
//! Given the current owner users `U` and groups `G` and a requested payload
//! `P`, work out what each side becomes:
//!
//! | operator  | users                                   | groups   |
//! |-----------|-----------------------------------------|----------|
//! | `ADD`     | `U ∪ P.users` if mentioned, else kept; kept when the union is empty | likewise |
//! | `REMOVE`  | `U − P.users` if mentioned, null when empty, else kept | likewise |
//! | `REPLACE` | `P.users` if mentioned, else null       | likewise |
//!
//! `REPLACE` always touches both sides. An `ADD` whose union is empty
//! (nothing held, nothing requested) leaves that side untouched rather
//! than writing an empty set.

use std::collections::BTreeSet;

use catalog_core::{ActionOperator, OwnersValue, Patch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerChange {
    pub users: Patch<BTreeSet<String>>,
    pub groups: Patch<BTreeSet<String>>,
}

/// `None` for an operator the algebra does not define.
pub fn plan_owner_change(
    current_users: Option<&BTreeSet<String>>,
    current_groups: Option<&BTreeSet<String>>,
    operator: &ActionOperator,
    requested: &OwnersValue,
) -> Option<OwnerChange> {
    let requested_users = requested.owner_users.as_ref();
    let requested_groups = requested.owner_groups.as_ref();
    let change = match operator {
        ActionOperator::Add => OwnerChange {
            users: add(current_users, requested_users),
            groups: add(current_groups, requested_groups),
        },
        ActionOperator::Remove => OwnerChange {
            users: remove(current_users, requested_users),
            groups: remove(current_groups, requested_groups),
        },
        ActionOperator::Replace => OwnerChange {
            users: replace(requested_users),
            groups: replace(requested_groups),
        },
        ActionOperator::Unknown(_) => return None,
    };
    Some(change)
}

fn add(
    current: Option<&BTreeSet<String>>,
    requested: Option<&BTreeSet<String>>,
) -> Patch<BTreeSet<String>> {
    let Some(requested) = requested else {
        return Patch::Keep;
    };
    let union: BTreeSet<String> = current
        .into_iter()
        .flatten()
        .chain(requested)
        .cloned()
        .collect();
    // Adding nothing to nothing leaves the field as it was.
    if union.is_empty() {
        Patch::Keep
    } else {
        Patch::Set(union)
    }
}

fn remove(
    current: Option<&BTreeSet<String>>,
    requested: Option<&BTreeSet<String>>,
) -> Patch<BTreeSet<String>> {
    let Some(requested) = requested else {
        return Patch::Keep;
    };
    let remaining: BTreeSet<String> = current
        .into_iter()
        .flatten()
        .filter(|owner| !requested.contains(*owner))
        .cloned()
        .collect();
    if remaining.is_empty() {
        Patch::Clear
    } else {
        Patch::Set(remaining)
    }
}

fn replace(requested: Option<&BTreeSet<String>>) -> Patch<BTreeSet<String>> {
    match requested {
        Some(owners) => Patch::Set(owners.clone()),
        None => Patch::Clear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn owners(users: Option<&[&str]>, groups: Option<&[&str]>) -> OwnersValue {
        OwnersValue {
            owner_users: users.map(set),
            owner_groups: groups.map(set),
        }
    }

    #[test]
    fn add_unions_only_mentioned_sides() {
        let users = set(&["alice"]);
        let change = plan_owner_change(
            Some(&users),
            None,
            &ActionOperator::Add,
            &owners(Some(&["bob"]), None),
        )
        .unwrap();
        assert_eq!(change.users, Patch::Set(set(&["alice", "bob"])));
        assert_eq!(change.groups, Patch::Keep);
    }

    #[test]
    fn add_with_empty_union_keeps_the_side() {
        let nobody: &[&str] = &[];
        let change = plan_owner_change(
            None,
            None,
            &ActionOperator::Add,
            &owners(Some(nobody), None),
        )
        .unwrap();
        assert_eq!(change.users, Patch::Keep);
        assert_eq!(change.groups, Patch::Keep);
    }

    #[test]
    fn remove_everyone_yields_explicit_null() {
        let users = set(&["alice", "bob"]);
        let change = plan_owner_change(
            Some(&users),
            None,
            &ActionOperator::Remove,
            &owners(Some(&["alice", "bob"]), None),
        )
        .unwrap();
        assert_eq!(change.users, Patch::Clear);
        assert_eq!(change.groups, Patch::Keep);
    }

    #[test]
    fn remove_keeps_the_rest() {
        let groups = set(&["eng", "ops"]);
        let change = plan_owner_change(
            None,
            Some(&groups),
            &ActionOperator::Remove,
            &owners(None, Some(&["ops"])),
        )
        .unwrap();
        assert_eq!(change.groups, Patch::Set(set(&["eng"])));
    }

    #[test]
    fn replace_with_empty_payload_clears_both() {
        let users = set(&["alice"]);
        let groups = set(&["eng"]);
        let change = plan_owner_change(
            Some(&users),
            Some(&groups),
            &ActionOperator::Replace,
            &OwnersValue::default(),
        )
        .unwrap();
        assert_eq!(change.users, Patch::Clear);
        assert_eq!(change.groups, Patch::Clear);
    }

    #[test]
    fn replace_touches_both_even_if_one_mentioned() {
        let groups = set(&["eng"]);
        let change = plan_owner_change(
            None,
            Some(&groups),
            &ActionOperator::Replace,
            &owners(Some(&["carol"]), None),
        )
        .unwrap();
        assert_eq!(change.users, Patch::Set(set(&["carol"])));
        assert_eq!(change.groups, Patch::Clear);
    }

    #[test]
    fn unknown_operator_plans_nothing() {
        assert!(plan_owner_change(
            None,
            None,
            &ActionOperator::Unknown("MERGE".into()),
            &owners(Some(&["x"]), None)
        )
        .is_none());
    }

    proptest! {
        #[test]
        fn remove_never_leaves_an_empty_set(
            current in proptest::collection::btree_set("[a-d]", 0..4),
            removed in proptest::collection::btree_set("[a-d]", 0..4),
        ) {
            let patch = remove(Some(&current), Some(&removed));
            prop_assert!(!matches!(patch, Patch::Set(ref s) if s.is_empty()));
            if let Patch::Set(remaining) = patch {
                prop_assert!(remaining.is_disjoint(&removed));
                prop_assert!(remaining.is_subset(&current));
            }
        }

        #[test]
        fn add_result_contains_both_inputs(
            current in proptest::collection::btree_set("[a-d]", 0..4),
            added in proptest::collection::btree_set("[a-d]", 1..4),
        ) {
            match add(Some(&current), Some(&added)) {
                Patch::Set(union) => {
                    prop_assert!(current.is_subset(&union));
                    prop_assert!(added.is_subset(&union));
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }
    }
}
