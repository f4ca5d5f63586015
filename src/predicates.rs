//! Enrichment predicates shared by the scorer and the enforcer.
//!
//! Each takes an asset as resolved (possibly projected to a subset of
//! attributes) and answers from whatever that projection carries.

use catalog_core::Asset;

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|s| !s.is_empty())
}

/// User-supplied description first, then the system one.
pub fn has_description(asset: &Asset) -> bool {
    let attrs = &asset.attributes;
    non_empty(attrs.user_description.as_deref()) || non_empty(attrs.description.as_deref())
}

pub fn has_owner(asset: &Asset) -> bool {
    let attrs = &asset.attributes;
    attrs.owner_users.as_ref().is_some_and(|u| !u.is_empty())
        || attrs.owner_groups.as_ref().is_some_and(|g| !g.is_empty())
}

/// Terms from either `meanings` or `assignedTerms`.
pub fn has_assigned_terms(asset: &Asset) -> bool {
    let attrs = &asset.attributes;
    attrs.meanings.as_ref().is_some_and(|m| !m.is_empty())
        || attrs.assigned_terms.as_ref().is_some_and(|t| !t.is_empty())
}

pub fn has_classifications(asset: &Asset) -> bool {
    asset
        .classifications
        .as_ref()
        .is_some_and(|c| !c.is_empty())
}

/// Direct process links when the type has them, else the precomputed flag.
pub fn has_lineage(asset: &Asset) -> bool {
    let attrs = &asset.attributes;
    if asset.exposes_process_links() {
        let downstream = attrs.input_to_processes.as_ref();
        let upstream = attrs.output_from_processes.as_ref();
        downstream.is_some_and(|p| !p.is_empty()) || upstream.is_some_and(|p| !p.is_empty())
    } else {
        attrs.has_lineage.unwrap_or(false)
    }
}
