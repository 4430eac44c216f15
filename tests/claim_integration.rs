// tests/claim_integration.rs

use alphaearth_rs::claim::{ClaimForm, ClaimProcessingResponse, Hazard};
use alphaearth_rs::status::CANCELLED;
use alphaearth_rs::{AlphaEarth, AlphaEarthError, JobState, ProcessingController};
use serde_json::{json, Value};
use std::time::Duration;


use api_test_utils::{CannedResponse, StubServer};

fn claim_reply() -> Value {
    json!({
        "hazard": {"damage_pct": 37.5},
        "validation": {
            "cross_sensor": 0.71,
            "meteorology": 0.9,
            "spatial_coherence": 0.66,
            "confidence": {"confidence_score": 82, "label": "HIGH"}
        },
        "claim": {"fused_score": 0.74, "confidence_label": "HIGH"},
        "ranked_hazards": [
            {"hazard": "flood", "fused_score": 0.74, "damage_pct": 37.5},
            {"hazard": "roof", "fused_score": 0.21}
        ],
        "summary": "Significant flooding detected",
        "preprocessing": {
            "aoi": [-80.24, 25.71, -80.14, 25.81],
            "pre": {"url_template": "https://tiles.example/pre/{z}/{x}/{y}"},
            "post": {"url_template": "https://tiles.example/post/{z}/{x}/{y}"}
        }
    })
}

fn miami_form() -> ClaimForm {
    ClaimForm {
        latitude: "25.7617".to_string(),
        longitude: "-80.1918".to_string(),
        radius_km: "5".to_string(),
        start_date: "2024-10-01".to_string(),
        end_date: "2024-10-10".to_string(),
        hazard: Some(Hazard::Flood),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_process_claim_posts_windows_and_reads_result() {
    let mut server = StubServer::start(vec![CannedResponse::json(200, claim_reply())]).await;
    let client = server.client();
    let request = miami_form().validate().expect("valid form");

    let response = client.process_claim(&request).await.expect("claim processed");

    let recorded = server.next_request().await;
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path(), "/api/claim_processing_basic");
    assert_eq!(recorded.header("content-type"), Some("application/json"));
    assert_eq!(recorded.header("user-agent"), Some("AlphaEarth-Insurance/1.0"));

    let body = recorded.json();
    assert_eq!(body["preprocessing"]["pre"], json!({"start": "2024-10-01", "end": "2024-10-04"}));
    assert_eq!(body["preprocessing"]["post"], json!({"start": "2024-10-07", "end": "2024-10-10"}));
    assert_eq!(body["hazard"]["hazard"], "flood");

    assert_eq!(response.damage_pct(), 37.5);
    assert!((response.confidence() - 0.82).abs() < 1e-12);
    assert_eq!(response.top_hazard().map(|h| h.hazard.as_str()), Some("flood"));
    assert_eq!(
        response.pre_image_url(),
        Some("https://tiles.example/pre/{z}/{x}/{y}")
    );
    let (lat, lon) = response.map_center().expect("aoi echoed");
    assert!((lat - 25.76).abs() < 1e-9);
    assert!((lon + 80.19).abs() < 1e-9);
}

#[tokio::test]
async fn test_earth_engine_failure_is_reported() {
    let mut server = StubServer::start(vec![CannedResponse::json(
        500,
        json!({"detail": "Earth Engine quota exceeded"}),
    )])
    .await;
    let client = server.client();
    let request = miami_form().validate().unwrap();

    let result = client.process_claim(&request).await;
    server.next_request().await;
    match result {
        Err(AlphaEarthError::Server(message)) => {
            assert!(message.contains("Earth Engine"), "message: {}", message)
        }
        other => panic!("expected a server error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_claim_timeout_maps_to_timeout_error() {
    let server = StubServer::start(vec![
        CannedResponse::json(200, claim_reply()).delayed(Duration::from_secs(3))
    ])
    .await;
    let client = AlphaEarth::new(server.config().with_claim_timeout(Duration::from_millis(200)))
        .unwrap();
    let request = miami_form().validate().unwrap();

    let result = client.process_claim(&request).await;
    assert!(
        matches!(result, Err(AlphaEarthError::Timeout(_))),
        "expected timeout, got {:?}",
        result
    );
}

#[tokio::test]
async fn test_tracked_claim_drives_the_controller() {
    let server = StubServer::start(vec![
        CannedResponse::json(200, claim_reply()),
        CannedResponse::json(503, json!({"error": "down"})),
    ])
    .await;
    let client = server.client();
    let controller: ProcessingController<ClaimProcessingResponse> = ProcessingController::new();
    let mut updates = controller.subscribe();
    let request = miami_form().validate().unwrap();

    let response = client
        .process_claim_tracked(&request, &controller)
        .await
        .expect("first claim succeeds");
    updates.changed().await.unwrap();
    let status = controller.snapshot();
    assert!(status.popup_visible);
    match status.state {
        JobState::Succeeded { result, .. } => assert_eq!(result, response),
        other => panic!("unexpected state {:?}", other),
    }

    controller.dismiss();
    let err = client
        .process_claim_tracked(&request, &controller)
        .await
        .unwrap_err();
    assert!(matches!(err, AlphaEarthError::BackendUnavailable));
    let status = controller.snapshot();
    assert!(status.state.error().is_some());
    assert!(status.popup_visible, "a new job clears the earlier dismissal");
}

#[tokio::test]
async fn test_second_tracked_claim_is_refused_while_running() {
    let server = StubServer::start(vec![
        CannedResponse::json(200, claim_reply()).delayed(Duration::from_millis(500))
    ])
    .await;
    let client = server.client();
    let controller: ProcessingController<ClaimProcessingResponse> = ProcessingController::new();
    let request = miami_form().validate().unwrap();

    let (first, second) = tokio::join!(
        client.process_claim_tracked(&request, &controller),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            client.process_claim_tracked(&request, &controller).await
        }
    );
    assert!(first.is_ok());
    assert!(matches!(second, Err(AlphaEarthError::Validation(_))));
    assert!(!controller.snapshot().state.is_running());
}

#[tokio::test]
async fn test_abandoned_tracked_claim_releases_the_controller() {
    let server = StubServer::start(vec![
        CannedResponse::json(200, claim_reply()).delayed(Duration::from_secs(3))
    ])
    .await;
    let client = server.client();
    let controller: ProcessingController<ClaimProcessingResponse> = ProcessingController::new();
    let request = miami_form().validate().unwrap();

    let outcome = tokio::time::timeout(
        Duration::from_millis(200),
        client.process_claim_tracked(&request, &controller),
    )
    .await;
    assert!(outcome.is_err(), "the claim should still be in flight");

    let status = controller.snapshot();
    assert!(!status.state.is_running());
    assert_eq!(status.state.error(), Some(CANCELLED));
    assert!(controller.reset());
    assert!(controller.start());
}
