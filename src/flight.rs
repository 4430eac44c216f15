// src/flight.rs

use crate::error::AlphaEarthError;
use crate::geo::GeoPoint;
use crate::payout::PayoutStatistics;
use crate::requests::NoQuery;
use crate::severity::{classify_flight_delay, DelayTier};
use crate::types::{date::api_date, ApiEnvelope};
use crate::AlphaEarth;

use chrono::NaiveDate;
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

pub const FLIGHT_DELAY_ENDPOINT: &str = "flight_delay_analysis";

fn iata_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}$").ok()).as_ref()
}

fn time_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").ok())
        .as_ref()
}

/// Uppercases and validates a three-letter IATA airport code.
pub fn parse_airport_code(code: &str) -> Result<String, AlphaEarthError> {
    let upper = code.trim().to_ascii_uppercase();
    if iata_pattern().is_some_and(|re| re.is_match(&upper)) {
        Ok(upper)
    } else {
        Err(AlphaEarthError::Validation(format!(
            "'{}' is not a three-letter airport code",
            code
        )))
    }
}

fn lon_lat<S: Serializer>(point: &GeoPoint, serializer: S) -> Result<S::Ok, S::Error> {
    point.lon_lat().serialize(serializer)
}

/// Body of `POST flight_delay_analysis`. Coordinates go out as `[longitude, latitude]`.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FlightDelayRequest {
    pub origin_code: String,
    #[serde(serialize_with = "lon_lat")]
    pub origin_coords: GeoPoint,
    pub dest_code: String,
    #[serde(serialize_with = "lon_lat")]
    pub dest_coords: GeoPoint,
    #[serde(with = "api_date")]
    pub departure_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_duration_hours: Option<f64>,
}

impl FlightDelayRequest {
    pub fn new(
        origin_code: &str,
        origin_coords: GeoPoint,
        dest_code: &str,
        dest_coords: GeoPoint,
        departure_date: NaiveDate,
    ) -> Result<Self, AlphaEarthError> {
        let origin_code = parse_airport_code(origin_code)?;
        let dest_code = parse_airport_code(dest_code)?;
        if origin_code == dest_code {
            return Err(AlphaEarthError::Validation(
                "Origin and destination airports must differ".to_string(),
            ));
        }
        Ok(Self {
            origin_code,
            origin_coords,
            dest_code,
            dest_coords,
            departure_date,
            departure_time: None,
            flight_duration_hours: None,
        })
    }

    /// Sets the scheduled departure as `HH:MM` (24-hour clock).
    pub fn with_departure_time(mut self, time: &str) -> Result<Self, AlphaEarthError> {
        let time = time.trim();
        if !time_pattern().is_some_and(|re| re.is_match(time)) {
            return Err(AlphaEarthError::Validation(format!(
                "Departure time '{}' must be HH:MM",
                time
            )));
        }
        self.departure_time = Some(time.to_string());
        Ok(self)
    }

    pub fn with_duration_hours(mut self, hours: f64) -> Result<Self, AlphaEarthError> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(AlphaEarthError::Validation(
                "Flight duration must be a positive number of hours".to_string(),
            ));
        }
        self.flight_duration_hours = Some(hours);
        Ok(self)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DelaySeverity {
    Low,
    Medium,
    High,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct WeatherData {
    pub precipitation_mm: f64,
    pub wind_speed_mph: f64,
    pub has_storm: bool,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RouteWeather {
    pub route_precipitation_mm: f64,
    pub max_precipitation_mm: f64,
    pub has_storm_along_route: bool,
    pub route_length_km: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DelayFactors {
    pub origin_storm: bool,
    pub dest_storm: bool,
    pub route_storm: bool,
    pub origin_precip: f64,
    pub dest_precip: f64,
    pub origin_wind: f64,
    pub dest_wind: f64,
    pub origin_congestion: f64,
    pub dest_congestion: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct RouteWeatherReport {
    pub origin: WeatherData,
    pub destination: WeatherData,
    pub route: RouteWeather,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Congestion {
    pub origin: f64,
    pub destination: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FlightDelayResponse {
    pub delay_probability: f64,
    pub severity: DelaySeverity,
    pub payout_amount: f64,
    pub should_payout: bool,
    #[serde(default)]
    pub delay_reason: String,
    #[serde(default)]
    pub factors: DelayFactors,
    #[serde(default)]
    pub weather: RouteWeatherReport,
    #[serde(default)]
    pub congestion: Congestion,
    pub error: Option<String>,
}

impl FlightDelayResponse {
    /// Delay probability as a 0..1 fraction (the backend may report a percentage).
    pub fn probability(&self) -> f64 {
        crate::severity::normalize_confidence(self.delay_probability)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Airport {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    pub lat: f64,
    pub lon: f64,
}

impl Airport {
    pub fn location(&self) -> Result<GeoPoint, AlphaEarthError> {
        GeoPoint::new(self.lat, self.lon)
    }
}

/// Live delay estimate for one airport, as served by `GET flight/delays`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AirportDelay {
    pub airport: Airport,
    pub delay_minutes: f64,
    pub delay_category: Option<String>,
    pub delay_reason: Option<String>,
    pub factors: Option<Value>,
    pub weather: Option<Value>,
    pub alerts: Option<Vec<Value>>,
    pub timestamp: Option<String>,
    pub error: Option<String>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

impl AirportDelay {
    /// Tier derived locally from `delay_minutes`; the server's own category is ignored.
    pub fn tier(&self) -> DelayTier {
        classify_flight_delay(self.delay_minutes)
    }

    /// The server-reported category, when it names a known tier.
    pub fn reported_tier(&self) -> Option<DelayTier> {
        self.delay_category.as_deref().and_then(DelayTier::from_category)
    }
}

impl AlphaEarth {
    /// Runs the satellite weather delay model for one flight.
    pub async fn analyze_flight_delay(
        &self,
        request: &FlightDelayRequest,
    ) -> Result<FlightDelayResponse, AlphaEarthError> {
        log::info!(
            "Analyzing flight delay {} -> {} on {}",
            request.origin_code,
            request.dest_code,
            request.departure_date
        );
        let response: FlightDelayResponse = self.post(FLIGHT_DELAY_ENDPOINT, request).await?;
        if let Some(err) = &response.error {
            log::warn!("Flight delay analysis reported an error: {}", err);
        }
        Ok(response)
    }

    pub async fn airport_delays(&self) -> Result<Vec<AirportDelay>, AlphaEarthError> {
        let envelope: ApiEnvelope<Vec<AirportDelay>> = self.get("flight/delays").await?;
        envelope.into_data("flight/delays")
    }

    pub async fn airport_delay(&self, code: &str) -> Result<AirportDelay, AlphaEarthError> {
        let endpoint = format!("flight/delays/{}", parse_airport_code(code)?);
        let envelope: ApiEnvelope<AirportDelay> = self
            ._request(Method::GET, &endpoint, None::<&Value>, None::<&NoQuery>, None)
            .await?;
        envelope.into_data(&endpoint)
    }

    /// Policy and payout totals of the flight insurance product.
    pub async fn flight_statistics(&self) -> Result<PayoutStatistics, AlphaEarthError> {
        self.flight_program().statistics().await
    }
}
