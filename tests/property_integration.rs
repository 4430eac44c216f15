// tests/property_integration.rs

use alphaearth_rs::disaster::{AnalysisOptions, DisasterKind, EarthquakeFilter};
use alphaearth_rs::{AlphaEarthError, GeoPoint, RiskAssessment, RiskTier};
use serde_json::json;


use api_test_utils::{CannedResponse, StubServer};

#[tokio::test]
async fn test_portfolio_request_caps_count() {
    let mut server = StubServer::start(vec![CannedResponse::json(
        200,
        json!({
            "success": true,
            "count": 1,
            "statistics": {"totalProperties": 1, "totalValue": 350000, "averageValue": 350000},
            "data": [{
                "propertyId": "PROP-000000",
                "address": "1 Bayshore Dr, Tampa, FL",
                "latitude": 27.94,
                "longitude": -82.46,
                "propertyValue": 350000,
                "riskScore": 55
            }]
        }),
    )])
    .await;
    let client = server.client();

    let page = client.portfolio("Florida", 50_000).await.unwrap();
    assert_eq!(page.properties.len(), 1);
    assert_eq!(page.properties[0].risk_tier(), Some(RiskTier::Medium));
    assert_eq!(page.statistics.unwrap().total_value, 350000.0);

    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/properties/portfolio");
    assert_eq!(recorded.query_value("region").as_deref(), Some("florida"));
    assert_eq!(recorded.query_value("count").as_deref(), Some("10000"));
}

#[tokio::test]
async fn test_region_query_and_mixed_shapes() {
    let mut server = StubServer::start(vec![CannedResponse::json(
        200,
        json!({
            "success": true,
            "data": [
                {"id": "a", "coordinates": {"lat": 25.78, "lon": -80.13}},
                {"id": "b", "geometry": {"type": "Point", "coordinates": [-80.19, 25.76]}}
            ]
        }),
    )])
    .await;
    let client = server.client();
    let center = GeoPoint::new(25.7617, -80.1918).unwrap();

    let page = client.properties_in_region(center, 25.0).await.unwrap();
    assert_eq!(page.properties[1].location.longitude, -80.19);
    assert!(page.statistics.is_none());

    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/properties/region");
    assert_eq!(recorded.query_value("lat").as_deref(), Some("25.7617"));
    assert_eq!(recorded.query_value("radius").as_deref(), Some("25"));
}

#[tokio::test]
async fn test_unrecognized_property_shape_fails_the_call() {
    let server = StubServer::start(vec![CannedResponse::json(
        200,
        json!({"success": true, "data": [{"id": "x", "where": "somewhere"}]}),
    )])
    .await;
    let client = server.client();

    assert!(matches!(
        client.coastal_properties("florida", 10.0).await,
        Err(AlphaEarthError::UnrecognizedPayload(_))
    ));
    assert!(matches!(
        client.high_value_properties("florida", -1.0).await,
        Err(AlphaEarthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_active_disasters_and_analysis() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({
                "success": true,
                "count": 2,
                "data": [
                    {"id": "AL142024", "name": "Hurricane Milton", "type": "hurricane",
                     "status": "active", "coordinates": {"lat": 23.1, "lon": -88.4}},
                    {"id": "nasa-fire-1", "name": "Active Fire 1", "type": "wildfire",
                     "coordinates": {"lat": 34.2, "lon": -118.5}, "acres": 1200}
                ],
                "metadata": {"usingMockData": false}
            }),
        ),
        CannedResponse::json(
            200,
            json!({
                "success": true,
                "data": {
                    "disaster": {"id": "AL142024"},
                    "portfolioMetrics": {"totalProperties": 5000, "propertiesAtRisk": 820, "expectedLoss": 98500000},
                    "topRiskProperties": [],
                    "aiSummary": null
                }
            }),
        ),
    ])
    .await;
    let client = server.client();

    let disasters = client.active_disasters().await.unwrap();
    assert_eq!(disasters.len(), 2);
    assert_eq!(disasters[0].kind, Some(DisasterKind::Hurricane));
    assert_eq!(disasters[1].location.unwrap().latitude, 34.2);
    assert_eq!(server.next_request().await.path(), "/api/disasters/active");

    let options = AnalysisOptions {
        num_properties: Some(2500),
        ..Default::default()
    };
    let analysis = client
        .analyze_disaster(DisasterKind::Hurricane, "AL142024", &options)
        .await
        .unwrap();
    assert_eq!(analysis.portfolio_metrics.properties_at_risk, 820);

    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/analysis/hurricane");
    assert_eq!(
        recorded.json(),
        json!({"stormId": "AL142024", "numProperties": 2500})
    );

    assert!(matches!(
        client
            .analyze_disaster(DisasterKind::Wildfire, " ", &options)
            .await,
        Err(AlphaEarthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_per_kind_disaster_feeds() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({"success": true, "count": 1, "data": [
                {"id": "al092024", "name": "Hurricane Helene", "type": "hurricane",
                 "coordinates": {"lat": 26.1, "lon": -84.9}}
            ], "metadata": {"usingMockData": true}}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "data": {
                "stormId": "al092024", "center": {"lat": 26.1, "lon": -84.9},
                "maxWindSpeed": 120, "forecastTrack": []
            }}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "data": {
                "fireId": "ca-park-2024", "name": "Park Fire",
                "center": {"lat": 39.8, "lon": -121.7}, "acres": 429000
            }}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "count": 1, "data": [
                {"id": "ci40789999", "type": "earthquake", "magnitude": 5.2,
                 "coordinates": {"lat": 35.7, "lon": -117.5}}
            ]}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "count": 1, "data": [
                {"id": "urn:oid:2.49.0.1.840.0.abc", "type": "tornado", "severity": "Extreme"}
            ]}),
        ),
        CannedResponse::json(200, json!({"success": true, "count": 0, "data": []})),
    ])
    .await;
    let client = server.client();

    let hurricanes = client.hurricanes().await.unwrap();
    assert_eq!(hurricanes[0].kind, Some(DisasterKind::Hurricane));
    assert_eq!(server.next_request().await.path(), "/api/disasters/hurricanes");

    let forecast = client.hurricane("al092024").await.unwrap();
    assert_eq!(forecast.id, "al092024");
    assert_eq!(forecast.location.unwrap().latitude, 26.1);
    assert_eq!(forecast.raw["maxWindSpeed"], 120);
    assert_eq!(server.next_request().await.path(), "/api/disasters/hurricanes/al092024");

    let fire = client.wildfire("ca-park-2024").await.unwrap();
    assert_eq!(fire.name, "Park Fire");
    assert_eq!(fire.kind, Some(DisasterKind::Wildfire));
    assert_eq!(server.next_request().await.path(), "/api/disasters/wildfires/ca-park-2024");

    let filter = EarthquakeFilter {
        min_magnitude: Some(5.0),
        timeframe: Some("Day".to_string()),
    };
    let quakes = client.earthquakes(&filter).await.unwrap();
    assert_eq!(quakes[0].kind, Some(DisasterKind::Earthquake));
    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/earthquakes/active");
    assert_eq!(recorded.query_value("magnitude").as_deref(), Some("5"));
    assert_eq!(recorded.query_value("timeframe").as_deref(), Some("day"));

    let alerts = client.severe_weather_alerts(&["fl", "tx"]).await.unwrap();
    assert_eq!(alerts[0].kind, Some(DisasterKind::SevereWeather));
    assert!(alerts[0].location.is_none());
    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/severe-weather/active");
    assert_eq!(recorded.query_value("states").as_deref(), Some("FL,TX"));

    assert!(client.alerts_by_state(&["ca"]).await.unwrap().is_empty());
    assert_eq!(
        server.next_request().await.path(),
        "/api/severe-weather/by-state/CA"
    );
    assert!(matches!(
        client.alerts_by_state(&[]).await,
        Err(AlphaEarthError::Validation(_))
    ));
}

#[tokio::test]
async fn test_property_risk_and_portfolio_tools() {
    let mut server = StubServer::start(vec![
        CannedResponse::json(
            200,
            json!({"success": true, "data": {
                "propertyId": "PROP-000007",
                "explanation": null,
                "riskAssessment": {
                    "propertyId": "PROP-000007",
                    "coverageAmount": 300000,
                    "damageProbability": 0.72,
                    "expectedLoss": 216000,
                    "riskTier": "extreme"
                }
            }}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "data": {
                "meanLoss": 90000, "medianLoss": 85000, "lossStd": 20000,
                "loss95Percentile": 130000, "loss99Percentile": 150000, "numSimulations": 1000
            }}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "data": {
                "metrics": {"totalProperties": 2, "propertiesAtRisk": 1, "expectedLoss": 216000},
                "distribution": {"high": 1, "low": 1}
            }}),
        ),
        CannedResponse::json(
            200,
            json!({"success": true, "data": {
                "scenarioType": "cat_5",
                "portfolioMetrics": {"totalProperties": 900, "expectedLoss": 450000000},
                "monteCarloResults": {"meanLoss": 440000000, "numSimulations": 1000}
            }}),
        ),
    ])
    .await;
    let client = server.client();
    let assessment = RiskAssessment::new("PROP-000007", 300000.0, 0.72);

    let report = client.calculate_property_risk(&assessment).await.unwrap();
    assert_eq!(report.tier(), RiskTier::High);
    assert_eq!(report.risk_assessment.risk_tier.as_deref(), Some("extreme"));
    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/analysis/property-risk");
    let body = recorded.json();
    assert_eq!(body["propertyId"], "PROP-000007");
    assert_eq!(body["riskAssessment"]["damageProbability"], 0.72);

    let portfolio = vec![assessment.clone(), RiskAssessment::new("PROP-000008", 200000.0, 0.1)];
    let simulation = client.run_monte_carlo(&portfolio, 0).await.unwrap();
    assert_eq!(simulation.loss95_percentile, 130000.0);
    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/risk/monte-carlo");
    assert_eq!(recorded.json()["numSimulations"], 1000);
    assert_eq!(recorded.json()["riskAssessments"].as_array().unwrap().len(), 2);

    let risk = client.portfolio_risk(&portfolio).await.unwrap();
    assert_eq!(risk.metrics.properties_at_risk, 1);
    assert_eq!(server.next_request().await.path(), "/api/risk/portfolio-metrics");

    let scenario = client
        .run_scenario(DisasterKind::Hurricane, "al092024", None, Some("Florida"))
        .await
        .unwrap();
    assert_eq!(scenario.scenario_type, "cat_5");
    assert_eq!(scenario.monte_carlo_results.unwrap().num_simulations, 1000);
    let recorded = server.next_request().await;
    assert_eq!(recorded.path(), "/api/analysis/scenario");
    assert_eq!(
        recorded.json(),
        json!({"disasterType": "hurricane", "disasterId": "al092024", "region": "florida"})
    );

    assert!(matches!(
        client.run_monte_carlo(&[], 10).await,
        Err(AlphaEarthError::Validation(_))
    ));
    assert!(matches!(
        client
            .run_scenario(DisasterKind::Earthquake, "ci40789999", None, None)
            .await,
        Err(AlphaEarthError::Validation(_))
    ));
    assert!(server.drain().is_empty());
}
