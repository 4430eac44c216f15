// src/normalize.rs

//! Maps the differently-shaped property payloads returned by the backend onto one record.
//!
//! Property services disagree on where coordinates live: nested `coordinates.{lat,lon}`,
//! flat `latitude`/`longitude`, flat `lat`/`lon` (or `lng`), a nested `location` object,
//! or a GeoJSON point under `geometry`. Every shape is resolved here, at the API boundary.
//! A payload matching none of them is logged and rejected rather than defaulted.

use crate::error::AlphaEarthError;
use crate::geo::GeoPoint;
use crate::severity::{classify_risk_score, RiskTier};
use serde::Serialize;
use serde_json::Value;

/// Canonical property record used throughout the crate.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PropertyRecord {
    pub property_id: String,
    pub address: Option<String>,
    pub location: GeoPoint,
    pub property_value: Option<f64>,
    pub coverage_amount: Option<f64>,
    pub property_type: Option<String>,
    pub risk_score: Option<f64>,
    pub raw: Value,
}

impl PropertyRecord {
    pub fn risk_tier(&self) -> Option<RiskTier> {
        self.risk_score.map(classify_risk_score)
    }
}

/// Accepts JSON numbers and numeric strings.
fn as_f64(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn first_f64(payload: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| as_f64(payload.get(*key)))
}

fn first_str(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match payload.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lat_lon_of(object: &Value) -> Option<(f64, f64)> {
    let lat = first_f64(object, &["lat", "latitude"])?;
    let lon = first_f64(object, &["lon", "lng", "longitude"])?;
    Some((lat, lon))
}

fn geojson_point(object: &Value) -> Option<(f64, f64)> {
    let coords = object.get("coordinates")?.as_array()?;
    if coords.len() < 2 {
        return None;
    }
    let lon = as_f64(coords.first())?;
    let lat = as_f64(coords.get(1))?;
    Some((lat, lon))
}

/// Extracts a coordinate from any of the known payload shapes.
pub fn extract_location(payload: &Value) -> Result<GeoPoint, AlphaEarthError> {
    let found = payload
        .get("coordinates")
        .and_then(|c| lat_lon_of(c).or_else(|| geojson_point(payload)))
        .or_else(|| lat_lon_of(payload))
        .or_else(|| payload.get("location").and_then(lat_lon_of))
        .or_else(|| payload.get("location").and_then(geojson_point))
        .or_else(|| payload.get("geometry").and_then(geojson_point));

    match found {
        Some((lat, lon)) => GeoPoint::new(lat, lon),
        None => {
            log::error!("No known coordinate shape in payload: {}", payload);
            Err(AlphaEarthError::UnrecognizedPayload(format!(
                "no coordinates found in payload with keys {:?}",
                payload
                    .as_object()
                    .map(|o| o.keys().cloned().collect::<Vec<_>>())
                    .unwrap_or_default()
            )))
        }
    }
}

/// Normalizes one property payload.
pub fn normalize_property(payload: &Value) -> Result<PropertyRecord, AlphaEarthError> {
    if !payload.is_object() {
        log::error!("Property payload is not an object: {}", payload);
        return Err(AlphaEarthError::UnrecognizedPayload(
            "property payload must be a JSON object".to_string(),
        ));
    }
    let location = extract_location(payload)?;
    let property_id = first_str(payload, &["propertyId", "property_id", "id"]).ok_or_else(|| {
        log::error!("Property payload without an id: {}", payload);
        AlphaEarthError::UnrecognizedPayload("property payload has no id".to_string())
    })?;

    Ok(PropertyRecord {
        property_id,
        address: first_str(payload, &["address", "displayName", "display_name"]),
        location,
        property_value: first_f64(payload, &["propertyValue", "property_value", "value"]),
        coverage_amount: first_f64(payload, &["coverageAmount", "coverage_amount"]),
        property_type: first_str(payload, &["propertyType", "property_type", "type"]),
        risk_score: first_f64(payload, &["riskScore", "risk_score", "overallRisk"]),
        raw: payload.clone(),
    })
}

/// Normalizes a list, failing on the first payload that matches no known shape.
pub fn normalize_properties(payloads: &[Value]) -> Result<Vec<PropertyRecord>, AlphaEarthError> {
    payloads.iter().map(normalize_property).collect()
}
