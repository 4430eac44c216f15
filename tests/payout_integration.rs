// tests/payout_integration.rs

use alphaearth_rs::payout::{
    Coverage, Evaluation, PayoutStatus, PolicyDraft, PolicyHolder, TriggerDraft,
};
use alphaearth_rs::types::AdminCredentials;
use alphaearth_rs::AlphaEarthError;
use serde_json::{json, Value};


use api_test_utils::{CannedResponse, StubServer};

fn payout(id: &str, status: &str) -> Value {
    json!({
        "id": id,
        "policyId": "POLICY-1",
        "status": status,
        "amount": 50000,
        "currency": "USD",
        "trigger": {"type": "wind_speed", "threshold": 74, "description": "Category 1 winds"},
        "createdAt": "2024-09-01T00:00:00.000Z"
    })
}

fn admin() -> AdminCredentials {
    AdminCredentials::new("admin@example.com", "hunter2")
}

#[tokio::test]
async fn test_parametric_policy_listing_and_lookup() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({"success": true, "count": 2, "policies": [
                {"id": "POLICY-1", "active": true, "holder": {"name": "Acme"}},
                {"id": "POLICY-2", "active": false, "location": {"lat": 25.7, "lon": -80.2}}
            ]}),
        ),
        CannedResponse::json(200, json!({"success": true, "policy": {"id": "POLICY-2"}})),
    ])
    .await;
    let client = server.client();
    let program = client.parametric_program();

    let policies = program.policies().await.unwrap();
    assert_eq!(policies.len(), 2);
    assert!(policies[0].active);
    assert!(policies[1].other_fields.contains_key("location"));
    assert_eq!(server.next_request().await.path(), "/api/parametric/policies");

    let policy = program.policy("POLICY-2").await.unwrap();
    assert_eq!(policy.id, "POLICY-2");
    assert!(!policy.active);
    assert_eq!(
        server.next_request().await.path(),
        "/api/parametric/policies/POLICY-2"
    );
}

#[tokio::test]
async fn test_evaluate_accepts_both_reply_shapes() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({"success": true, "result": {"policyId": "F-1", "triggered": false}}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "results": [{"triggered": true}, {"triggered": false}]}),
        ),
    ])
    .await;
    let client = server.client();

    let single = client.flight_program().evaluate("F-1", None).await.unwrap();
    assert_eq!(
        single,
        Evaluation::Single(json!({"policyId": "F-1", "triggered": false}))
    );
    let recorded = server.next_request().await;
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path(), "/api/flight/evaluate/F-1");
    assert_eq!(recorded.json(), json!({"eventContext": {}}));

    let context = json!({"stormId": "AL052024"});
    match client
        .parametric_program()
        .evaluate("P-1", Some(&context))
        .await
        .unwrap()
    {
        Evaluation::PerTrigger(results) => assert_eq!(results.len(), 2),
        other => panic!("unexpected evaluation {:?}", other),
    }
    assert_eq!(
        server.next_request().await.json(),
        json!({"eventContext": {"stormId": "AL052024"}})
    );
}

#[tokio::test]
async fn test_pending_payout_approval() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({"success": true, "count": 1, "payouts": [payout("PAYOUT-1", "pending")]}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "message": "Payout approved successfully", "payout": {
                "id": "PAYOUT-1", "policyId": "POLICY-1", "status": "approved", "amount": 50000,
                "approvedBy": "admin@example.com", "approvedAt": "2024-09-02T00:00:00.000Z"
            }}),
        ),
    ])
    .await;
    let client = server.client();
    let program = client.parametric_program();

    let pending = program.pending_payouts().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].is_pending());
    assert_eq!(
        pending[0].trigger.as_ref().map(|t| t.trigger_type.as_str()),
        Some("wind_speed")
    );
    assert_eq!(
        server.next_request().await.path(),
        "/api/parametric/payouts/pending"
    );

    let approved = program.approve("PAYOUT-1", &admin()).await.unwrap();
    assert_eq!(approved.status, PayoutStatus::Approved);
    assert_eq!(approved.approved_by.as_deref(), Some("admin@example.com"));
    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/parametric/payouts/PAYOUT-1/approve");
    assert_eq!(
        recorded.json(),
        json!({"adminEmail": "admin@example.com", "adminPassword": "hunter2"})
    );
}

#[tokio::test]
async fn test_reject_sends_reason_and_validates_locally() {
    let mut server = StubServer::start(vec![CannedResponse::json(
        200,
        json!({"success": true, "payout": {
            "id": "PAYOUT-9", "policyId": "F-1", "status": "rejected",
            "rejectionReason": "Delay caused by airline", "rejectedBy": "admin@example.com"
        }}),
    )])
    .await;
    let client = server.client();
    let program = client.flight_program();

    assert!(matches!(
        program.reject("PAYOUT-9", &admin(), "   ").await,
        Err(AlphaEarthError::Validation(_))
    ));
    assert!(matches!(
        program
            .approve("PAYOUT-9", &AdminCredentials::new("", "secret"))
            .await,
        Err(AlphaEarthError::Validation(_))
    ));
    assert!(server.drain().is_empty(), "invalid calls must not reach the backend");

    let rejected = program
        .reject("PAYOUT-9", &admin(), "Delay caused by airline")
        .await
        .unwrap();
    assert_eq!(rejected.status, PayoutStatus::Rejected);
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("Delay caused by airline")
    );
    let body = server.next_request().await.json();
    assert_eq!(body["reason"], "Delay caused by airline");
    assert_eq!(body["adminEmail"], "admin@example.com");
}

#[tokio::test]
async fn test_processed_and_single_payout() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({"success": true, "count": 2, "payouts": [
                payout("PAYOUT-1", "approved"),
                payout("PAYOUT-2", "rejected")
            ]}),
        ),
        CannedResponse::json(404, json!({"success": false, "error": "Payout not found"})),
    ])
    .await;
    let client = server.client();
    let program = client.flight_program();

    let processed = program.processed_payouts().await.unwrap();
    assert_eq!(processed[1].status, PayoutStatus::Rejected);
    assert_eq!(server.next_request().await.path(), "/api/flight/payouts/processed");

    assert!(matches!(
        program.payout("PAYOUT-404").await,
        Err(AlphaEarthError::NotFound(_))
    ));
    assert_eq!(
        server.next_request().await.path(),
        "/api/flight/payouts/PAYOUT-404"
    );
}

#[tokio::test]
async fn test_reply_without_expected_key_is_unrecognized() {
    let server = StubServer::start(vec![CannedResponse::json(200, json!({"success": true}))]).await;
    let client = server.client();

    assert!(matches!(
        client.parametric_program().statistics().await,
        Err(AlphaEarthError::UnrecognizedPayload(_))
    ));
}

#[tokio::test]
async fn test_ids_cannot_rewrite_the_route() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(404, json!({"success": false, "error": "Payout not found"})),
        CannedResponse::json(404, json!({"success": false, "error": "Policy not found"})),
    ])
    .await;
    let client = server.client();

    assert!(matches!(
        client.flight_program().payout("PAY-1?admin=true").await,
        Err(AlphaEarthError::NotFound(_))
    ));
    let recorded = server.next_request().await;
    assert_eq!(recorded.target, "/api/flight/payouts/PAY-1%3Fadmin=true");
    assert!(recorded.query().is_empty());

    assert!(client
        .parametric_program()
        .approve("../policies/P-1#x", &admin())
        .await
        .is_err());
    let recorded = server.next_request().await;
    assert_eq!(
        recorded.path(),
        "/api/parametric/payouts/..%2Fpolicies%2FP-1%23x/approve"
    );
}

#[tokio::test]
async fn test_create_policy_posts_the_draft() {
    let mut server = StubServer::start(vec![CannedResponse::json(
        201,
        json!({"success": true, "policy": {
            "id": "PARAM-POLICY-1700000000000",
            "active": true,
            "propertyId": "PROP-000042",
            "holder": {"name": "Jane Doe", "email": "jane@example.com"}
        }}),
    )])
    .await;
    let client = server.client();
    let draft = PolicyDraft::new(
        PolicyHolder {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
        },
        Coverage {
            amount: 100000.0,
            currency: "USD".to_string(),
            coverage_type: "parametric".to_string(),
        },
    )
    .with_trigger(TriggerDraft {
        trigger_type: "wind_speed".to_string(),
        threshold: 74.0,
        payout: 25000.0,
        description: "Category 1 winds".to_string(),
    })
    .with_detail("propertyId", json!("PROP-000042"))
    .with_detail("location", json!({"lat": 25.76, "lon": -80.19, "address": "Miami, FL"}));

    let policy = client.parametric_program().create_policy(&draft).await.unwrap();
    assert_eq!(policy.id, "PARAM-POLICY-1700000000000");
    assert!(policy.active);

    let recorded = server.next_request().await;
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path(), "/api/parametric/policies");
    let body = recorded.json();
    assert_eq!(body["propertyId"], "PROP-000042");
    assert_eq!(body["triggers"][0]["threshold"], 74.0);
    assert_eq!(body["coverage"]["type"], "parametric");
}

#[tokio::test]
async fn test_bulk_evaluation_is_flight_only() {
    let mut server = StubServer::start(vec![CannedResponse::json(
        200,
        json!({"success": true, "results": {
            "evaluatedAt": "2024-10-09T12:00:00.000Z",
            "policiesEvaluated": 3,
            "triggersActivated": 1,
            "payoutsCreated": 1,
            "policies": [{"policyId": "F-1", "triggered": true, "payoutsCreated": 1}]
        }}),
    )])
    .await;
    let client = server.client();

    assert!(matches!(
        client.parametric_program().evaluate_all().await,
        Err(AlphaEarthError::Validation(_))
    ));
    assert!(server.drain().is_empty());

    let summary = client.flight_program().evaluate_all().await.unwrap();
    assert_eq!(summary.policies_evaluated, 3);
    assert_eq!(summary.payouts_created, 1);
    assert_eq!(summary.policies.len(), 1);

    let recorded = server.next_request().await;
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path(), "/api/flight/evaluate");
}
