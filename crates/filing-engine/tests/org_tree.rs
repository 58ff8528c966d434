//! Organizational tree, cascade and change-event tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use filing_access::{AccessLevel, NewAccessRule};
use filing_engine::{AccessEngine, EngineError};
use filing_events::{
    Event, EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, MemoryEventBus,
    OrgUnitEvent, Subscription,
};
use filing_org::{Member, NewOrgUnit, OrgUnit, OrgUnitUpdate, PlatformRole, UnitType};
use uuid::Uuid;

/// Build a small tree:
///
/// ```text
/// presidency
/// ├── finance
/// │   ├── accounting
/// │   │   └── payroll
/// │   └── treasury
/// └── legal
/// ```
struct Tree {
    presidency: OrgUnit,
    finance: OrgUnit,
    accounting: OrgUnit,
    payroll: OrgUnit,
    treasury: OrgUnit,
    legal: OrgUnit,
}

async fn build_tree(engine: &AccessEngine, org_id: Uuid) -> Tree {
    let units = engine.org_units();
    let create = |name: &str, unit_type: UnitType, parent: Option<Uuid>| {
        let mut input = NewOrgUnit::new(org_id, name, unit_type);
        input.parent_id = parent;
        let units = units.clone();
        async move { units.create(input).await.unwrap() }
    };

    let presidency = create("Presidency", UnitType::Presidency, None).await;
    let finance = create("Finance", UnitType::Direction, Some(presidency.id)).await;
    let legal = create("Legal", UnitType::Direction, Some(presidency.id)).await;
    let accounting = create("Accounting", UnitType::Department, Some(finance.id)).await;
    let treasury = create("Treasury", UnitType::Department, Some(finance.id)).await;
    let payroll = create("Payroll", UnitType::Service, Some(accounting.id)).await;

    Tree {
        presidency,
        finance,
        accounting,
        payroll,
        treasury,
        legal,
    }
}

#[tokio::test]
async fn move_under_own_descendant_is_rejected() {
    let engine = AccessEngine::builder().build().unwrap();
    let org_id = Uuid::now_v7();
    let tree = build_tree(&engine, org_id).await;
    let before = engine.org_units().list(org_id).await;

    let err = engine
        .org_units()
        .move_unit(tree.finance.id, Some(tree.accounting.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));
    assert_eq!(err.status_code(), 422);

    let err = engine
        .org_units()
        .move_unit(tree.presidency.id, Some(tree.payroll.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));

    let after = engine.org_units().list(org_id).await;
    let parents = |units: &[OrgUnit]| -> Vec<(Uuid, Option<Uuid>)> {
        units.iter().map(|u| (u.id, u.parent_id)).collect()
    };
    assert_eq!(parents(&before), parents(&after));
}

#[tokio::test]
async fn valid_moves_keep_the_tree_acyclic() {
    let engine = AccessEngine::builder().build().unwrap();
    let org_id = Uuid::now_v7();
    let tree = build_tree(&engine, org_id).await;
    let units = engine.org_units();

    units.move_unit(tree.accounting.id, Some(tree.legal.id)).await.unwrap();
    units.move_unit(tree.treasury.id, Some(tree.payroll.id)).await.unwrap();
    units.move_unit(tree.legal.id, None).await.unwrap();
    let err = units
        .move_unit(tree.legal.id, Some(tree.treasury.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOperation(_)));

    for unit in units.list(org_id).await {
        let ancestors = units.ancestors(unit.id).await.unwrap();
        assert!(ancestors.iter().all(|a| a.id != unit.id));
    }

    let chain: Vec<String> = units
        .ancestors(tree.treasury.id)
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(chain, vec!["Payroll", "Accounting", "Legal"]);
}

#[tokio::test]
async fn move_to_missing_parent_is_not_found() {
    let engine = AccessEngine::builder().build().unwrap();
    let tree = build_tree(&engine, Uuid::now_v7()).await;

    let err = engine
        .org_units()
        .move_unit(tree.legal.id, Some(Uuid::now_v7()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = engine
        .org_units()
        .move_unit(Uuid::now_v7(), None)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn cascading_delete_removes_subtree_and_detaches_members() {
    let engine = AccessEngine::builder().build().unwrap();
    let org_id = Uuid::now_v7();
    let tree = build_tree(&engine, org_id).await;

    let placements = [
        ("u-finance", tree.finance.id),
        ("u-payroll", tree.payroll.id),
        ("u-treasury", tree.treasury.id),
        ("u-legal", tree.legal.id),
    ];
    for (user, unit) in placements {
        engine
            .members()
            .upsert(Member::new(org_id, user, PlatformRole::Member).in_unit(unit))
            .await
            .unwrap();
    }

    let deleted = engine.org_units().remove(tree.finance.id).await.unwrap();
    assert_eq!(deleted, 4);

    let remaining: HashSet<Uuid> = engine
        .org_units()
        .list(org_id)
        .await
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(remaining, HashSet::from([tree.presidency.id, tree.legal.id]));

    for user in ["u-finance", "u-payroll", "u-treasury"] {
        let member = engine.members().get(org_id, user).await.unwrap();
        assert_eq!(member.org_unit_id, None, "{}", user);
    }
    let legal = engine.members().get(org_id, "u-legal").await.unwrap();
    assert_eq!(legal.org_unit_id, Some(tree.legal.id));

    // No orphan points at a deleted parent.
    for unit in engine.org_units().list(org_id).await {
        if let Some(parent) = unit.parent_id {
            assert!(remaining.contains(&parent));
        }
    }
}

#[tokio::test]
async fn tree_orders_siblings_by_display_order() {
    let engine = AccessEngine::builder().build().unwrap();
    let org_id = Uuid::now_v7();
    let tree = build_tree(&engine, org_id).await;

    engine
        .org_units()
        .update(
            tree.finance.id,
            OrgUnitUpdate {
                display_order: Some(5),
                ..OrgUnitUpdate::default()
            },
        )
        .await
        .unwrap();

    let forest = engine.org_units().get_tree(org_id).await;
    assert_eq!(forest.len(), 1);
    let names: Vec<&str> = forest[0]
        .children
        .iter()
        .map(|n| n.unit.name.as_str())
        .collect();
    assert_eq!(names, vec!["Legal", "Finance"]);
    assert_eq!(forest[0].size(), 6);

    let children = engine.org_units().get_children(tree.finance.id).await.unwrap();
    let names: Vec<String> = children.into_iter().map(|u| u.name).collect();
    assert_eq!(names, vec!["Accounting", "Treasury"]);
}

#[tokio::test]
async fn cascade_events_are_published_leaves_first() {
    let engine = AccessEngine::builder().build().unwrap();
    let org_id = Uuid::now_v7();
    let tree = build_tree(&engine, org_id).await;
    let mut sub = engine.subscribe("filing.org_unit.deleted").await.unwrap();

    engine.org_units().remove(tree.finance.id).await.unwrap();

    let mut order = Vec::new();
    while let Some(event) = sub.try_recv() {
        assert_eq!(event.org_id, Some(org_id));
        match event.parse_payload::<OrgUnitEvent>().unwrap() {
            OrgUnitEvent::Deleted { unit_id, .. } => order.push(unit_id),
            other => panic!("unexpected event {:?}", other),
        }
    }

    assert_eq!(order.len(), 4);
    let position = |id: Uuid| order.iter().position(|u| *u == id).unwrap();
    assert!(position(tree.payroll.id) < position(tree.accounting.id));
    assert!(position(tree.accounting.id) < position(tree.finance.id));
    assert!(position(tree.treasury.id) < position(tree.finance.id));
    assert_eq!(*order.last().unwrap(), tree.finance.id);
}

#[tokio::test]
async fn rule_mutations_publish_events() {
    let engine = AccessEngine::builder().build().unwrap();
    let org_id = Uuid::now_v7();
    let mut sub = engine.subscribe("filing.access_rule.*").await.unwrap();

    let rule = engine
        .rules()
        .create_rule(NewAccessRule::new(org_id, Uuid::now_v7(), AccessLevel::Read))
        .await
        .unwrap();
    engine.rules().remove_rule(rule.id).await.unwrap();

    let types: Vec<String> = std::iter::from_fn(|| sub.try_recv())
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec!["access_rule.created", "access_rule.deleted"]);
}

/// Bus that rejects every publish.
struct UnavailableBus {
    inner: MemoryEventBus,
}

#[async_trait]
impl EventBus for UnavailableBus {
    async fn publish(&self, _event: Event) -> EventBusResult<()> {
        Err(EventBusError::PublishError("broker unavailable".to_string()))
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        self.inner.subscribe(topic).await
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        self.inner.register_handler(handler).await
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        self.inner.unsubscribe(subscription_id).await
    }

    async fn stats(&self) -> EventBusStats {
        self.inner.stats().await
    }
}

#[tokio::test]
async fn publish_failures_do_not_fail_mutations() {
    let engine = AccessEngine::builder()
        .event_bus(Arc::new(UnavailableBus {
            inner: MemoryEventBus::new(),
        }))
        .build()
        .unwrap();
    let org_id = Uuid::now_v7();

    let tree = build_tree(&engine, org_id).await;
    assert_eq!(engine.org_units().remove(tree.presidency.id).await.unwrap(), 6);
    assert!(engine.org_units().list(org_id).await.is_empty());
}
