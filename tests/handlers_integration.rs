//! End-to-end handler tests against the in-memory catalog.
//!
//! Each test drives a handler through `routing::process` exactly as the
//! transport would: raw event bytes in, one routed message out.
//!
//! Run with: cargo test --test handlers_integration

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use asset_reactor::handlers::enforcer::ENFORCEMENT_MESSAGE;
use asset_reactor::handlers::scorer::{CM_ATTR_SCORE, CM_DAAP};
use asset_reactor::handlers::{EventHandler, PlaybookRunner, ScoreCalculator, VerificationEnforcer};
use asset_reactor::routing::{process, RoutedMessage, DROP_TAG, FAILURE_TAG, SUCCESS_TAG};
use catalog_client::InMemoryCatalog;
use catalog_core::{Asset, CatalogEvent, CertificateStatus, WorkflowDefinition};
use serde_json::{json, Value};
use tokio::sync::watch;

// ── Helpers ──────────────────────────────────────────────────────────

fn event_bytes(asset: &Asset) -> Vec<u8> {
    serde_json::to_vec(&CatalogEvent::for_asset(asset.snapshot())).unwrap()
}

async fn run(handler: &dyn EventHandler, asset: &Asset) -> RoutedMessage {
    process(handler, &["key".to_string()], &event_bytes(asset)).await
}

fn orders() -> Asset {
    Asset::new("g-orders", "Table", "default/snowflake/db/sch/orders")
}

fn runner(catalog: Arc<InMemoryCatalog>) -> PlaybookRunner {
    PlaybookRunner::new(catalog, Duration::ZERO, 50)
}

fn all_tables() -> Value {
    json!({"dsl": {"query": {"term": {"__typeName.keyword": {"value": "Table"}}}}})
}

fn rule(name: &str, actions: Value) -> Value {
    json!({"name": name, "config": {"query": all_tables()}, "actions": actions})
}

fn metadata_update(operand: &str, operator: &str, value: Value) -> Value {
    json!({
        "type": "METADATA_UPDATE",
        "actionsSchema": {"operand": operand, "operator": operator, "value": value}
    })
}

/// Playbook whose rules are stored the way the catalog stores them: as a
/// JSON string parameter.
fn playbook(name: &str, rules: Value) -> WorkflowDefinition {
    WorkflowDefinition::with_rules(name, rules.to_string())
}

// ── Scorer ───────────────────────────────────────────────────────────

#[tokio::test]
async fn scorer_writes_75_for_described_owned_table_with_lineage() {
    let asset = orders()
        .with_description("All customer orders")
        .with_owner_groups(["data-eng"])
        .with_input_to_process("p-load");
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(asset.clone()));
    let scorer = ScoreCalculator::new(catalog.clone());

    let msg = run(&scorer, &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    assert_eq!(msg.value, event_bytes(&asset));

    assert_eq!(
        catalog
            .custom_metadata_value("g-orders", CM_DAAP, CM_ATTR_SCORE)
            .await,
        Some(json!(75.0))
    );

    // Same state again: score unchanged, nothing written.
    let msg = run(&scorer, &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    assert_eq!(catalog.updates().await.len(), 1);
}

#[tokio::test]
async fn scorer_update_carries_only_identity_and_score() {
    let asset = orders().with_description("d");
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(asset.clone()));
    run(&ScoreCalculator::new(catalog.clone()), &asset).await;

    let updates = catalog.updates().await;
    assert_eq!(updates[0].touched_fields(), vec!["businessAttributes"]);
    let body = updates[0].to_json();
    let def = &catalog.custom_metadata_defs().await[0];
    let (set_id, attribute_id) = def.internal_names(CM_ATTR_SCORE).unwrap();
    assert_eq!(body["businessAttributes"][set_id][attribute_id], json!(25.0));
    assert!(body["businessAttributes"].get(CM_DAAP).is_none());
    assert!(body["attributes"].get("description").is_none());
}

#[tokio::test]
async fn scorer_excludes_lineage_for_glossary_terms() {
    let mut term = Asset::new("g-term", "AtlasGlossaryTerm", "revenue@sales")
        .with_description("Money in")
        .with_owner_users(["alice"]);
    term.attributes.has_lineage = Some(true);
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(term.clone()));
    run(&ScoreCalculator::new(catalog.clone()), &term).await;

    assert_eq!(
        catalog
            .custom_metadata_value("g-term", CM_DAAP, CM_ATTR_SCORE)
            .await,
        Some(json!(50.0))
    );
}

#[tokio::test]
async fn scorer_creates_the_score_badge_once() {
    let asset = orders().with_description("d");
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(asset.clone()));
    let scorer = ScoreCalculator::new(catalog.clone());
    run(&scorer, &asset).await;
    run(&scorer, &asset).await;

    let badges = catalog.badges().await;
    assert_eq!(badges.len(), 1);
    let def = &catalog.custom_metadata_defs().await[0];
    let (set_id, attribute_id) = def.internal_names(CM_ATTR_SCORE).unwrap();
    assert_eq!(badges[0].metadata_attribute, format!("{set_id}.{attribute_id}"));
    assert_eq!(badges[0].conditions.len(), 3);
}

#[tokio::test]
async fn scorer_treats_unindexed_asset_as_nothing_to_do() {
    let catalog = Arc::new(InMemoryCatalog::new().with_manual_index_refresh());
    let asset = orders().with_description("d");
    catalog.insert(asset.clone()).await;
    assert!(catalog.asset("g-orders").await.is_some());

    let msg = run(&ScoreCalculator::new(catalog.clone()), &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    assert!(catalog.updates().await.is_empty());
}

#[tokio::test]
async fn scorer_routes_catalog_outage_to_failure() {
    let asset = orders();
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(asset.clone()));
    catalog.fail_with_status(Some(503)).await;
    let msg = run(&ScoreCalculator::new(catalog), &asset).await;
    assert_eq!(msg.tags, vec![FAILURE_TAG]);
}

// ── Enforcer ─────────────────────────────────────────────────────────

#[tokio::test]
async fn enforcer_downgrades_verified_asset_missing_owners() {
    let asset = orders()
        .with_certificate(CertificateStatus::Verified)
        .with_description("All customer orders")
        .with_input_to_process("p-load");
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(asset.clone()));

    let msg = run(&VerificationEnforcer::new(catalog.clone()), &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);

    let updates = catalog.updates().await;
    assert_eq!(updates.len(), 1);
    let attributes = updates[0].to_json()["attributes"].clone();
    let keys: BTreeSet<&str> = attributes
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        keys,
        BTreeSet::from(["certificateStatus", "certificateStatusMessage", "qualifiedName"])
    );
    assert_eq!(attributes["certificateStatus"], "DRAFT");
    assert_eq!(attributes["certificateStatusMessage"], ENFORCEMENT_MESSAGE);

    let stored = catalog.asset("g-orders").await.unwrap();
    assert_eq!(
        stored.attributes.certificate_status,
        Some(CertificateStatus::Draft)
    );
}

#[tokio::test]
async fn enforcer_drops_when_nothing_to_enforce() {
    let complete = orders()
        .with_certificate(CertificateStatus::Verified)
        .with_description("d")
        .with_owner_users(["alice"])
        .with_input_to_process("p-load");
    let catalog = Arc::new(InMemoryCatalog::new().with_asset(complete.clone()));
    let enforcer = VerificationEnforcer::new(catalog.clone());

    let msg = run(&enforcer, &complete).await;
    assert_eq!(msg.tags, vec![DROP_TAG]);
    assert!(catalog.updates().await.is_empty());

    // Unknown asset: nothing to do either.
    let msg = run(&enforcer, &Asset::new("g-gone", "Table", "gone")).await;
    assert_eq!(msg.tags, vec![DROP_TAG]);
}

#[tokio::test]
async fn enforcer_drops_asset_not_yet_indexed() {
    let catalog = Arc::new(InMemoryCatalog::new().with_manual_index_refresh());
    let verified = orders().with_certificate(CertificateStatus::Verified);
    catalog.insert(verified.clone()).await;
    assert!(catalog.asset("g-orders").await.is_some());

    let msg = run(&VerificationEnforcer::new(catalog.clone()), &verified).await;
    assert_eq!(msg.tags, vec![DROP_TAG]);
    assert!(catalog.updates().await.is_empty());
}

// ── Playbooks ────────────────────────────────────────────────────────

#[tokio::test]
async fn owners_come_from_the_store_not_a_stale_index() {
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(orders().with_owner_users(["alice"]))
            .with_manual_index_refresh()
            .with_playbook(playbook(
                "add-bob",
                json!([rule(
                    "r",
                    json!([metadata_update("owners", "ADD", json!({"ownerUsers": ["bob"]}))])
                )]),
            )),
    );
    // carol lands in the store; the index still only knows alice.
    let current = orders().with_owner_users(["alice", "carol"]);
    catalog.insert(current.clone()).await;

    let msg = run(&runner(catalog.clone()), &current).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);

    let updates = catalog.updates().await;
    assert_eq!(updates.len(), 1);
    let written: BTreeSet<String> =
        serde_json::from_value(updates[0].to_json()["attributes"]["ownerUsers"].clone()).unwrap();
    assert_eq!(
        written,
        BTreeSet::from(["alice".to_string(), "bob".to_string(), "carol".to_string()])
    );
}


#[tokio::test]
async fn replace_with_empty_owners_nulls_both_fields() {
    let asset = orders()
        .with_owner_users(["alice"])
        .with_owner_groups(["data-eng"]);
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(playbook(
                "reset-owners",
                json!([rule("r", json!([metadata_update("owners", "REPLACE", json!({}))]))]),
            )),
    );

    let msg = run(&runner(catalog.clone()), &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);

    let body = catalog.updates().await[0].to_json();
    assert_eq!(body["attributes"]["ownerUsers"], Value::Null);
    assert_eq!(body["attributes"]["ownerGroups"], Value::Null);
    assert!(body["attributes"].as_object().unwrap().contains_key("ownerUsers"));

    let stored = catalog.asset("g-orders").await.unwrap();
    assert_eq!(stored.attributes.owner_users, None);
    assert_eq!(stored.attributes.owner_groups, None);
}

#[tokio::test]
async fn removing_every_owner_user_writes_null() {
    let asset = orders()
        .with_owner_users(["alice", "bob"])
        .with_owner_groups(["data-eng"]);
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(playbook(
                "offboard",
                json!([rule(
                    "r",
                    json!([metadata_update(
                        "owners",
                        "REMOVE",
                        json!({"ownerUsers": ["alice", "bob"]})
                    )])
                )]),
            )),
    );

    run(&runner(catalog.clone()), &asset).await;

    let body = catalog.updates().await[0].to_json();
    assert_eq!(body["attributes"]["ownerUsers"], Value::Null);
    assert!(body["attributes"].get("ownerGroups").is_none());
}

#[tokio::test]
async fn zero_match_rule_leaves_asset_untouched() {
    let asset = orders().with_description("original");
    let views_only = json!({
        "name": "views",
        "config": {"query": {"dsl": {"query": {"term": {"__typeName.keyword": {"value": "View"}}}}}},
        "actions": [metadata_update("description", "REPLACE", json!("rewritten"))]
    });
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(playbook("views", json!([views_only]))),
    );

    let msg = run(&runner(catalog.clone()), &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    assert!(catalog.updates().await.is_empty());
}

#[tokio::test]
async fn later_rule_wins_and_net_change_is_written() {
    let asset = orders()
        .with_description("original")
        .with_owner_users(["alice"]);
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(playbook(
                "docs",
                json!([
                    rule(
                        "first",
                        json!([
                            metadata_update("description", "REPLACE", json!("one")),
                            metadata_update("owners", "ADD", json!({"ownerUsers": ["bob"]})),
                        ])
                    ),
                    rule(
                        "second",
                        json!([
                            metadata_update("description", "REPLACE", json!("two")),
                            metadata_update("owners", "REMOVE", json!({"ownerUsers": ["bob"]})),
                        ])
                    ),
                ]),
            )),
    );

    let msg = run(&runner(catalog.clone()), &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);

    let stored = catalog.asset("g-orders").await.unwrap();
    assert_eq!(stored.attributes.description.as_deref(), Some("two"));
    assert_eq!(stored.attributes.owner_users, asset.attributes.owner_users);
}

#[tokio::test]
async fn net_no_op_playbook_issues_no_update() {
    let asset = orders().with_owner_users(["alice"]);
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(playbook(
                "churn",
                json!([rule(
                    "r",
                    json!([
                        metadata_update("owners", "ADD", json!({"ownerUsers": ["bob"]})),
                        metadata_update("owners", "REMOVE", json!({"ownerUsers": ["bob"]})),
                    ])
                )]),
            )),
    );

    let msg = run(&runner(catalog.clone()), &asset).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    assert!(catalog.updates().await.is_empty());
}

#[tokio::test]
async fn malformed_playbook_does_not_block_others() {
    let asset = orders();
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(WorkflowDefinition::with_rules("broken", "[{not json"))
            .with_playbook(playbook(
                "certify",
                json!([rule(
                    "r",
                    json!([metadata_update("certificateStatus", "REPLACE", json!("VERIFIED"))])
                )]),
            )),
    );

    run(&runner(catalog.clone()), &asset).await;
    let stored = catalog.asset("g-orders").await.unwrap();
    assert_eq!(
        stored.attributes.certificate_status,
        Some(CertificateStatus::Verified)
    );
}

#[tokio::test]
async fn playbook_runner_handles_bad_input_and_missing_assets() {
    let catalog = Arc::new(InMemoryCatalog::new());
    let runner = runner(catalog);

    let msg = process(&runner, &[], b"\x00garbage").await;
    assert_eq!(msg.tags, vec![FAILURE_TAG]);

    let msg = process(&runner, &[], br#"{"payload":{}}"#).await;
    assert_eq!(msg.tags, vec![FAILURE_TAG]);

    let msg = run(&runner, &Asset::new("g-gone", "Table", "gone")).await;
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
}

#[tokio::test]
async fn shutdown_cuts_the_consistency_wait_short() {
    let asset = orders();
    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_asset(asset.clone())
            .with_playbook(playbook(
                "certify",
                json!([rule(
                    "r",
                    json!([metadata_update("certificateStatus", "REPLACE", json!("DRAFT"))])
                )]),
            )),
    );
    let (tx, rx) = watch::channel(false);
    let runner = PlaybookRunner::new(catalog.clone(), Duration::from_secs(3600), 50).with_shutdown(rx);
    tx.send(true).unwrap();

    let msg = tokio::time::timeout(Duration::from_secs(5), run(&runner, &asset))
        .await
        .expect("wait was not interrupted");
    assert_eq!(msg.tags, vec![SUCCESS_TAG]);
    assert_eq!(catalog.updates().await.len(), 1);
}
