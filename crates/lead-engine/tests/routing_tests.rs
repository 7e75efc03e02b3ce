//! End-to-end tests of contact registration on an in-memory SQLite database
//!
//! These cover lead resolution, weighted distribution, the load cap and the
//! eligibility rules through the same path the API uses.

use lead_engine::types::{
    ContactRequest, ContactView, CreateOperatorRequest, CreateSourceRequest, Operator, OperatorWeightInput,
    Source, UpdateOperatorRequest,
};
use lead_engine::{resolve_lead, AssignmentEngine, DatabaseManager, LeadError, LeadRouter, RandomDraw, RoutingStore};
use rand::rngs::StdRng;
use rand::SeedableRng;

async fn create_test_router(seed: u64) -> LeadRouter {
    let database = DatabaseManager::new_in_memory()
        .await
        .expect("Failed to create test database");
    let engine = AssignmentEngine::with_draw(RandomDraw::new(StdRng::seed_from_u64(seed)));
    LeadRouter::with_engine(database, engine)
}

async fn add_operator(router: &LeadRouter, name: &str, max_load: i64) -> Operator {
    router
        .database()
        .create_operator(CreateOperatorRequest::new(name, max_load))
        .await
        .unwrap()
}

async fn add_source(router: &LeadRouter, name: &str, code: &str) -> Source {
    router
        .database()
        .create_source(CreateSourceRequest {
            name: name.to_string(),
            code: Some(code.to_string()),
        })
        .await
        .unwrap()
}

async fn set_weights(router: &LeadRouter, source: &Source, weights: &[(&Operator, i64)]) {
    let weights = weights
        .iter()
        .map(|(op, weight)| OperatorWeightInput {
            operator_id: op.id,
            weight: *weight,
        })
        .collect();
    router
        .database()
        .replace_source_weights(source.id, weights)
        .await
        .unwrap();
}

async fn register(router: &LeadRouter, external_id: &str, source: &Source) -> ContactView {
    router
        .register_contact(ContactRequest {
            lead_external_id: external_id.to_string(),
            lead_name: Some(format!("Lead {}", external_id)),
            source_id: source.id,
            message: Some("ping".to_string()),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_weighted_distribution_favours_heavier_operator() {
    let router = create_test_router(1).await;
    let op1 = add_operator(&router, "op1", 1000).await;
    let op2 = add_operator(&router, "op2", 1000).await;
    let source = add_source(&router, "botA", "A").await;
    set_weights(&router, &source, &[(&op1, 10), (&op2, 30)]).await;

    let (mut light, mut heavy) = (0, 0);
    for i in 0..200 {
        let contact = register(&router, &format!("lead-{}", i), &source).await;
        let operator = contact.operator.expect("capacity is never reached");
        if operator.id == op1.id {
            light += 1;
        } else {
            assert_eq!(operator.id, op2.id);
            heavy += 1;
        }
    }

    assert!(heavy > light, "op2 got {}, op1 got {}", heavy, light);
}

#[tokio::test]
async fn test_max_load_respected_and_overflow_unassigned() {
    let router = create_test_router(2).await;
    let op1 = add_operator(&router, "limit-op1", 1).await;
    let op2 = add_operator(&router, "limit-op2", 1).await;
    let source = add_source(&router, "botB", "B").await;
    set_weights(&router, &source, &[(&op1, 1), (&op2, 1)]).await;

    let mut counts = [0; 2];
    let mut unassigned = 0;
    for i in 0..10 {
        match register(&router, &format!("limit-lead-{}", i), &source).await.operator {
            Some(op) if op.id == op1.id => counts[0] += 1,
            Some(_) => counts[1] += 1,
            None => unassigned += 1,
        }
    }

    assert!(counts[0] <= 1);
    assert!(counts[1] <= 1);
    assert!(unassigned > 0);
    // Sequentially both fill up exactly
    assert_eq!(counts, [1, 1]);
    assert_eq!(unassigned, 8);
}

#[tokio::test]
async fn test_single_operator_never_exceeds_cap() {
    let router = create_test_router(3).await;
    let op = add_operator(&router, "solo", 3).await;
    let source = add_source(&router, "landing", "web").await;
    set_weights(&router, &source, &[(&op, 5)]).await;

    let assigned = {
        let mut assigned = 0;
        for i in 0..12 {
            if register(&router, &format!("web-{}", i), &source).await.operator.is_some() {
                assigned += 1;
            }
        }
        assigned
    };

    assert_eq!(assigned, 3);
}

#[tokio::test]
async fn test_unassigned_contact_is_still_stored() {
    let router = create_test_router(4).await;
    let op = add_operator(&router, "busy", 1).await;
    let source = add_source(&router, "bot", "b").await;
    set_weights(&router, &source, &[(&op, 1)]).await;

    assert!(register(&router, "first", &source).await.operator.is_some());
    let overflow = register(&router, "second", &source).await;
    assert!(overflow.operator.is_none());

    let leads = router.database().list_leads_with_contacts().await.unwrap();
    let second = leads.iter().find(|l| l.lead.external_id == "second").unwrap();
    assert_eq!(second.contacts.len(), 1);
    assert_eq!(second.contacts[0].id, overflow.id);
    assert!(second.contacts[0].operator.is_none());
    assert!(second.contacts[0].is_active);
}

#[tokio::test]
async fn test_inactive_contacts_do_not_count_towards_load() {
    let router = create_test_router(5).await;
    let op = add_operator(&router, "closer", 1).await;
    let source = add_source(&router, "chat", "c").await;
    set_weights(&router, &source, &[(&op, 1)]).await;

    let first = register(&router, "l1", &source).await;
    assert!(first.operator.is_some());
    assert!(register(&router, "l2", &source).await.operator.is_none());

    sqlx::query("UPDATE contacts SET is_active = 0 WHERE id = ?")
        .bind(first.id)
        .execute(router.database().pool())
        .await
        .unwrap();

    assert_eq!(register(&router, "l3", &source).await.operator.map(|o| o.id), Some(op.id));
}

#[tokio::test]
async fn test_deactivated_operator_is_skipped() {
    let router = create_test_router(6).await;
    let op1 = add_operator(&router, "day", 100).await;
    let op2 = add_operator(&router, "night", 100).await;
    let source = add_source(&router, "phone", "p").await;
    set_weights(&router, &source, &[(&op1, 1), (&op2, 1000)]).await;

    router
        .database()
        .update_operator(
            op2.id,
            UpdateOperatorRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    for i in 0..20 {
        let contact = register(&router, &format!("p-{}", i), &source).await;
        assert_eq!(contact.operator.map(|o| o.id), Some(op1.id));
    }
}

#[tokio::test]
async fn test_replacing_weights_discards_previous_set() {
    let router = create_test_router(7).await;
    let op1 = add_operator(&router, "old", 100).await;
    let op2 = add_operator(&router, "new", 100).await;
    let source = add_source(&router, "ads", "ads").await;

    set_weights(&router, &source, &[(&op1, 1)]).await;
    assert_eq!(register(&router, "a-1", &source).await.operator.map(|o| o.id), Some(op1.id));

    set_weights(&router, &source, &[(&op2, 1)]).await;
    for i in 0..10 {
        let contact = register(&router, &format!("a-{}", i + 2), &source).await;
        assert_eq!(contact.operator.map(|o| o.id), Some(op2.id));
    }

    set_weights(&router, &source, &[]).await;
    assert!(register(&router, "a-99", &source).await.operator.is_none());
}

#[tokio::test]
async fn test_repeat_contact_reuses_lead_and_backfills_name() {
    let router = create_test_router(8).await;
    let source = add_source(&router, "form", "f").await;

    let first = router
        .register_contact(ContactRequest {
            lead_external_id: "crm-42".to_string(),
            lead_name: None,
            source_id: source.id,
            message: None,
        })
        .await
        .unwrap();
    assert!(first.lead.name.is_none());

    let second = router
        .register_contact(ContactRequest {
            lead_external_id: "crm-42".to_string(),
            lead_name: Some("Olga".to_string()),
            source_id: source.id,
            message: Some("again".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(first.lead.id, second.lead.id);
    assert_eq!(second.lead.name.as_deref(), Some("Olga"));

    let leads = router.database().list_leads_with_contacts().await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].contacts.len(), 2);
    assert_eq!(leads[0].lead.name.as_deref(), Some("Olga"));
}

#[tokio::test]
async fn test_empty_lead_name_is_treated_as_missing() {
    let router = create_test_router(11).await;
    let source = add_source(&router, "chat", "c").await;

    let contact = |name: &str| ContactRequest {
        lead_external_id: "crm-77".to_string(),
        lead_name: Some(name.to_string()),
        source_id: source.id,
        message: None,
    };

    let first = router.register_contact(contact("")).await.unwrap();
    assert!(first.lead.name.is_none());

    let second = router.register_contact(contact("Nadia")).await.unwrap();
    assert_eq!(second.lead.name.as_deref(), Some("Nadia"));

    let third = router.register_contact(contact("")).await.unwrap();
    assert_eq!(third.lead.name.as_deref(), Some("Nadia"));

    let stored = router.database().get_lead_by_external_id("crm-77").await.unwrap().unwrap();
    assert_eq!(stored.name.as_deref(), Some("Nadia"));
}

#[tokio::test]
async fn test_stored_empty_lead_name_is_backfilled() {
    let router = create_test_router(12).await;
    let source = add_source(&router, "site", "s").await;

    let mut tx = router.database().begin_transaction().await.unwrap();
    tx.insert_lead("crm-78", Some("")).await.unwrap();
    tx.commit().await.unwrap();

    let contact = router
        .register_contact(ContactRequest {
            lead_external_id: "crm-78".to_string(),
            lead_name: Some("Boris".to_string()),
            source_id: source.id,
            message: None,
        })
        .await
        .unwrap();
    assert_eq!(contact.lead.name.as_deref(), Some("Boris"));
}

#[tokio::test]
async fn test_resolve_lead_inside_transaction() {
    let router = create_test_router(9).await;
    let mut tx = router.database().begin_transaction().await.unwrap();

    let lead = resolve_lead(&mut *tx, "ext-1", None).await.unwrap();
    let again = resolve_lead(&mut *tx, "ext-1", Some("Named")).await.unwrap();
    assert_eq!(lead.id, again.id);
    assert_eq!(again.name.as_deref(), Some("Named"));

    let kept = resolve_lead(&mut *tx, "ext-1", Some("Renamed")).await.unwrap();
    assert_eq!(kept.name.as_deref(), Some("Named"));

    // The unique constraint backs the resolver up
    let err = tx.insert_lead("ext-1", None).await.unwrap_err();
    assert!(err.is_conflict());

    tx.commit().await.unwrap();

    let stored = router.database().get_lead_by_external_id("ext-1").await.unwrap().unwrap();
    assert_eq!(stored.id, lead.id);
    assert_eq!(stored.name.as_deref(), Some("Named"));
}

#[tokio::test]
async fn test_unknown_source_is_not_found() {
    let router = create_test_router(10).await;

    let err = router
        .register_contact(ContactRequest {
            lead_external_id: "nobody".to_string(),
            lead_name: None,
            source_id: 999,
            message: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, LeadError::NotFound(_)));
    assert!(router.database().get_lead_by_external_id("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_capacity_scenarios_across_sources() {
    let router = create_test_router(11).await;
    let a = add_operator(&router, "A", 1000).await;
    let b = add_operator(&router, "B", 1000).await;
    let c = add_operator(&router, "C", 1).await;
    let d = add_operator(&router, "D", 1).await;
    let s = add_source(&router, "S", "s").await;
    let s2 = add_source(&router, "S2", "s2").await;
    set_weights(&router, &s, &[(&a, 10), (&b, 30)]).await;
    set_weights(&router, &s2, &[(&c, 1), (&d, 1)]).await;

    for i in 0..200 {
        register(&router, &format!("s-{}", i), &s).await;
    }
    let mut unassigned = 0;
    for i in 0..10 {
        if register(&router, &format!("s2-{}", i), &s2).await.operator.is_none() {
            unassigned += 1;
        }
    }

    let stats = router.database().operator_stats().await.unwrap();
    let count = |id: i64| {
        stats
            .iter()
            .find(|s| s.operator_id == id)
            .map(|s| s.total_contacts)
            .unwrap_or(0)
    };

    assert!(count(b.id) > count(a.id));
    assert_eq!(count(a.id) + count(b.id), 200);
    assert!(count(c.id) <= 1);
    assert!(count(d.id) <= 1);
    assert!(unassigned >= 1);
}
