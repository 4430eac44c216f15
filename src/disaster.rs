// src/disaster.rs

//! Disaster feeds (hurricanes, wildfires, earthquakes, severe weather) and per-event
//! portfolio impact analysis.

use crate::client::path_segment;
use crate::error::AlphaEarthError;
use crate::geo::GeoPoint;
use crate::normalize::extract_location;
use crate::requests::NoQuery;
use crate::types::ApiEnvelope;
use crate::AlphaEarth;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisasterKind {
    Hurricane,
    Wildfire,
    Earthquake,
    SevereWeather,
}

impl DisasterKind {
    /// Path segment under `analysis/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterKind::Hurricane => "hurricane",
            DisasterKind::Wildfire => "wildfire",
            DisasterKind::Earthquake => "earthquake",
            DisasterKind::SevereWeather => "severe-weather",
        }
    }

    /// Body key naming the event to analyze.
    pub fn id_field(&self) -> &'static str {
        match self {
            DisasterKind::Hurricane => "stormId",
            DisasterKind::Wildfire => "fireId",
            DisasterKind::Earthquake => "earthquakeId",
            DisasterKind::SevereWeather => "alertId",
        }
    }

    pub fn from_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "hurricane" => Some(DisasterKind::Hurricane),
            "wildfire" => Some(DisasterKind::Wildfire),
            "earthquake" => Some(DisasterKind::Earthquake),
            "severe-weather" | "severeweather" => Some(DisasterKind::SevereWeather),
            _ => None,
        }
    }
}

impl fmt::Display for DisasterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry of the active disaster feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Disaster {
    pub id: String,
    pub name: String,
    pub kind: Option<DisasterKind>,
    pub status: Option<String>,
    /// Some alerts carry no point location.
    pub location: Option<GeoPoint>,
    pub raw: Value,
}

impl Disaster {
    /// Reads an entry of a single-kind feed. Entries whose `type` is missing or more
    /// specific than the feed (`tornado`, `flood`, ...) take the feed's kind, and detail
    /// payloads keyed by `stormId` / `fireId` instead of `id` are accepted.
    pub fn from_feed(payload: &Value, kind: DisasterKind) -> Result<Self, AlphaEarthError> {
        Self::parse(payload, Some(kind))
    }

    pub fn from_payload(payload: &Value) -> Result<Self, AlphaEarthError> {
        Self::parse(payload, None)
    }

    fn parse(payload: &Value, feed: Option<DisasterKind>) -> Result<Self, AlphaEarthError> {
        let raw_id = payload
            .get("id")
            .or_else(|| feed.and_then(|kind| payload.get(kind.id_field())));
        let id = match raw_id {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                log::error!("Disaster payload without an id: {}", payload);
                return Err(AlphaEarthError::UnrecognizedPayload(
                    "disaster payload has no id".to_string(),
                ));
            }
        };
        let text = |key: &str| payload.get(key).and_then(Value::as_str).map(str::to_string);
        // Forecast and perimeter details put the point under `center`.
        let location = match payload.get("center") {
            Some(center) => extract_location(center),
            None => extract_location(payload),
        };
        let location = match location {
            Ok(point) => Some(point),
            Err(e) => {
                log::debug!("Disaster {} has no usable location: {}", id, e);
                None
            }
        };
        Ok(Disaster {
            name: text("name").unwrap_or_else(|| id.clone()),
            kind: text("type").as_deref().and_then(DisasterKind::from_type).or(feed),
            status: text("status"),
            location,
            raw: payload.clone(),
            id,
        })
    }
}

/// Optional knobs of an impact analysis; unset fields use the backend defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOptions {
    pub region: Option<String>,
    pub num_properties: Option<u32>,
    pub radius_miles: Option<f64>,
}

impl AnalysisOptions {
    fn body(&self, kind: DisasterKind, event_id: &str) -> Value {
        let mut body = Map::new();
        body.insert(kind.id_field().to_string(), Value::String(event_id.to_string()));
        if let Some(region) = &self.region {
            body.insert("region".to_string(), Value::String(region.clone()));
        }
        if let Some(n) = self.num_properties {
            body.insert("numProperties".to_string(), Value::from(n));
        }
        if let Some(radius) = self.radius_miles {
            body.insert("radius".to_string(), Value::from(radius));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioMetrics {
    pub total_properties: u64,
    pub properties_at_risk: u64,
    pub total_insured_value: f64,
    pub expected_loss: f64,
    pub percentile50_loss: f64,
    pub percentile90_loss: f64,
    pub percentile99_loss: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisasterAnalysis {
    pub disaster: Option<Value>,
    #[serde(default)]
    pub portfolio_metrics: PortfolioMetrics,
    pub risk_distribution: Option<Value>,
    pub monte_carlo_results: Option<Value>,
    #[serde(default)]
    pub top_risk_properties: Vec<Value>,
    pub ai_summary: Option<Value>,
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

const NO_QUERY: &NoQuery = &[];

/// Filters of the earthquake feed; unset fields use the backend defaults (M4.5+, past week).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarthquakeFilter {
    pub min_magnitude: Option<f64>,
    /// `hour`, `day`, `week` or `month`.
    pub timeframe: Option<String>,
}

fn state_codes(states: &[&str]) -> Result<String, AlphaEarthError> {
    let codes: Vec<String> = states
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if codes.is_empty() {
        return Err(AlphaEarthError::Validation(
            "At least one state code is required".to_string(),
        ));
    }
    Ok(codes.join(","))
}

impl AlphaEarth {
    async fn feed<Q>(
        &self,
        endpoint: &str,
        query: &Q,
        kind: Option<DisasterKind>,
    ) -> Result<Vec<Disaster>, AlphaEarthError>
    where
        Q: Serialize + Send + Sync + ?Sized,
    {
        let envelope: ApiEnvelope<Vec<Value>> = self.get_with_query(endpoint, query).await?;
        let payloads = envelope.into_data(endpoint)?;
        log::debug!("'{}' returned {} events", endpoint, payloads.len());
        payloads
            .iter()
            .map(|payload| match kind {
                Some(kind) => Disaster::from_feed(payload, kind),
                None => Disaster::from_payload(payload),
            })
            .collect()
    }

    async fn feed_entry(&self, endpoint: &str, kind: DisasterKind) -> Result<Disaster, AlphaEarthError> {
        let envelope: ApiEnvelope<Value> = self.get(endpoint).await?;
        Disaster::from_feed(&envelope.into_data(endpoint)?, kind)
    }

    /// Every active event across the hurricane and wildfire feeds.
    pub async fn active_disasters(&self) -> Result<Vec<Disaster>, AlphaEarthError> {
        self.feed("disasters/active", NO_QUERY, None).await
    }

    pub async fn hurricanes(&self) -> Result<Vec<Disaster>, AlphaEarthError> {
        self.feed("disasters/hurricanes", NO_QUERY, Some(DisasterKind::Hurricane))
            .await
    }

    /// Forecast track and wind radii of one storm; the extra fields stay in `raw`.
    pub async fn hurricane(&self, storm_id: &str) -> Result<Disaster, AlphaEarthError> {
        let endpoint = format!("disasters/hurricanes/{}", path_segment(storm_id)?);
        self.feed_entry(&endpoint, DisasterKind::Hurricane).await
    }

    pub async fn wildfires(&self) -> Result<Vec<Disaster>, AlphaEarthError> {
        self.feed("disasters/wildfires", NO_QUERY, Some(DisasterKind::Wildfire))
            .await
    }

    /// Perimeter of one fire; the extra fields stay in `raw`.
    pub async fn wildfire(&self, fire_id: &str) -> Result<Disaster, AlphaEarthError> {
        let endpoint = format!("disasters/wildfires/{}", path_segment(fire_id)?);
        self.feed_entry(&endpoint, DisasterKind::Wildfire).await
    }

    pub async fn earthquakes(&self, filter: &EarthquakeFilter) -> Result<Vec<Disaster>, AlphaEarthError> {
        let mut query = Vec::new();
        if let Some(magnitude) = filter.min_magnitude {
            if !magnitude.is_finite() {
                return Err(AlphaEarthError::Validation(
                    "Magnitude must be a number".to_string(),
                ));
            }
            query.push(("magnitude", magnitude.to_string()));
        }
        if let Some(timeframe) = filter.timeframe.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            query.push(("timeframe", timeframe.to_ascii_lowercase()));
        }
        self.feed("earthquakes/active", &query, Some(DisasterKind::Earthquake))
            .await
    }

    pub async fn significant_earthquakes(&self) -> Result<Vec<Disaster>, AlphaEarthError> {
        self.feed("earthquakes/significant", NO_QUERY, Some(DisasterKind::Earthquake))
            .await
    }

    /// Active severe weather alerts, optionally limited to some states (`["FL", "TX"]`).
    pub async fn severe_weather_alerts(&self, states: &[&str]) -> Result<Vec<Disaster>, AlphaEarthError> {
        let mut query = Vec::new();
        if !states.is_empty() {
            query.push(("states", state_codes(states)?));
        }
        self.feed("severe-weather/active", &query, Some(DisasterKind::SevereWeather))
            .await
    }

    pub async fn tornado_warnings(&self) -> Result<Vec<Disaster>, AlphaEarthError> {
        self.feed("severe-weather/tornadoes", NO_QUERY, Some(DisasterKind::SevereWeather))
            .await
    }

    pub async fn flood_warnings(&self) -> Result<Vec<Disaster>, AlphaEarthError> {
        self.feed("severe-weather/floods", NO_QUERY, Some(DisasterKind::SevereWeather))
            .await
    }

    pub async fn alerts_by_state(&self, states: &[&str]) -> Result<Vec<Disaster>, AlphaEarthError> {
        let endpoint = format!("severe-weather/by-state/{}", path_segment(&state_codes(states)?)?);
        self.feed(&endpoint, NO_QUERY, Some(DisasterKind::SevereWeather))
            .await
    }

    /// Runs the portfolio impact analysis for one event.
    pub async fn analyze_disaster(
        &self,
        kind: DisasterKind,
        event_id: &str,
        options: &AnalysisOptions,
    ) -> Result<DisasterAnalysis, AlphaEarthError> {
        if event_id.trim().is_empty() {
            return Err(AlphaEarthError::Validation(format!(
                "{} is required",
                kind.id_field()
            )));
        }
        let endpoint = format!("analysis/{}", kind.as_str());
        log::info!("Starting {} analysis for {}", kind, event_id);
        let envelope: ApiEnvelope<DisasterAnalysis> =
            self.post(&endpoint, &options.body(kind, event_id.trim())).await?;
        let analysis = envelope.into_data(&endpoint)?;
        log::info!(
            "{} analysis complete, expected loss {}",
            kind,
            crate::format::format_compact_usd(analysis.portfolio_metrics.expected_loss)
        );
        Ok(analysis)
    }
}
