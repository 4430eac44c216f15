//! Nominatim / OpenStreetMap geocoding of free-text addresses and postal codes.
//!
//! Results are turned into an [`AreaOfInterest`] around the matched point so they can be
//! submitted directly as a claim area. The public instance requires a `User-Agent`, which
//! the client sends on every request.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use crate::error::AlphaEarthError;
use crate::geo::{AreaOfInterest, GeoPoint};
use crate::AlphaEarth;

use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::OnceLock;

/// Continental US bounds used to sanity-check US postal code matches.
const US_LAT_RANGE: (f64, f64) = (24.0, 50.0);
const US_LON_RANGE: (f64, f64) = (-125.0, -66.0);

/// A matched location with the area of interest around it.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeResult {
    pub bbox: AreaOfInterest,
    pub center: GeoPoint,
    pub display_name: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct PlaceAddress {
    pub country_code: Option<String>,
    pub country: Option<String>,
    pub postcode: Option<String>,
    pub postal_code: Option<String>,
}

/// One entry of a Nominatim `search` response.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Place {
    #[serde(default, deserialize_with = "coordinate")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "coordinate")]
    pub lon: Option<f64>,
    pub display_name: Option<String>,
    pub importance: Option<f64>,
    pub address: Option<PlaceAddress>,
}

// Nominatim sends coordinates as strings; tolerate numbers and garbage alike.
fn coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    })
}

impl Place {
    fn point(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }

    fn country_code(&self) -> String {
        self.address
            .as_ref()
            .and_then(|a| a.country_code.as_deref())
            .unwrap_or_default()
            .to_ascii_lowercase()
    }

    /// `country` is only consulted when the result has no `country_code`.
    fn is_us(&self) -> bool {
        let Some(address) = self.address.as_ref() else {
            return false;
        };
        match (address.country_code.as_deref(), address.country.as_deref()) {
            (Some(code), _) => code.eq_ignore_ascii_case("us"),
            (None, Some(country)) => country.eq_ignore_ascii_case("united states"),
            (None, None) => false,
        }
    }

    fn postcode_matches(&self, zip: &str) -> bool {
        self.address.as_ref().is_some_and(|a| {
            a.postcode.as_deref() == Some(zip) || a.postal_code.as_deref() == Some(zip)
        })
    }
}

fn zip_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{5}$").ok()).as_ref()
}

pub fn is_us_zip(code: &str) -> bool {
    zip_pattern().is_some_and(|re| re.is_match(code))
}

pub fn in_continental_us(lat: f64, lon: f64) -> bool {
    (US_LAT_RANGE.0..=US_LAT_RANGE.1).contains(&lat) && (US_LON_RANGE.0..=US_LON_RANGE.1).contains(&lon)
}

/// The candidate with the highest `importance` (missing counts as 0).
pub fn most_important(places: &[Place]) -> Option<&Place> {
    places.iter().reduce(|best, p| {
        if p.importance.unwrap_or(0.0) > best.importance.unwrap_or(0.0) {
            p
        } else {
            best
        }
    })
}

/// Picks the result of a structured postal code search: US results inside the continental
/// bounds only, ranked by importance, an exact postcode match first, otherwise the top one.
pub fn select_postal_match<'a>(places: &'a [Place], zip: &str) -> Option<&'a Place> {
    let mut us_results: Vec<&Place> = places
        .iter()
        .filter(|p| p.country_code() == "us")
        .filter(|p| p.point().is_some_and(|(lat, lon)| in_continental_us(lat, lon)))
        .collect();
    // Stable: equal importance keeps the service's order.
    us_results.sort_by(|a, b| {
        b.importance
            .unwrap_or(0.0)
            .total_cmp(&a.importance.unwrap_or(0.0))
    });
    us_results
        .iter()
        .find(|p| p.postcode_matches(zip))
        .or_else(|| us_results.first())
        .copied()
}

/// Picks the result of a free-text search. US postal codes only accept a US result, or
/// failing that a first result that falls inside the continental bounds.
pub fn select_free_text_match(places: &[Place], us_zip: bool) -> Option<&Place> {
    let first = places.first()?;
    if !us_zip {
        return first.point().map(|_| first);
    }
    let candidate = places.iter().find(|p| p.is_us()).unwrap_or(first);
    candidate
        .point()
        .filter(|(lat, lon)| in_continental_us(*lat, *lon))
        .map(|_| candidate)
}

fn to_result(place: &Place, radius_km: f64, fallback_name: &str) -> Result<GeocodeResult, AlphaEarthError> {
    let (lat, lon) = place.point().ok_or_else(|| {
        AlphaEarthError::Geocode(format!("Invalid coordinates returned for: {}", fallback_name))
    })?;
    let center = GeoPoint::new(lat, lon)?;
    Ok(GeocodeResult {
        bbox: AreaOfInterest::around(center, radius_km)?,
        center,
        display_name: place
            .display_name
            .clone()
            .unwrap_or_else(|| fallback_name.to_string()),
    })
}

impl AlphaEarth {
    async fn nominatim_search(&self, params: &[(&str, String)]) -> Result<Vec<Place>, AlphaEarthError> {
        let url = format!("{}/search", self.geocoder_url);
        log::debug!("Nominatim search: {} {:?}", url, params);
        let response = self
            .http_client
            .get(&url)
            .query(params)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(AlphaEarthError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Nominatim responded with status {}", status);
            return Err(AlphaEarthError::Geocode(format!("HTTP error! status: {}", status.as_u16())));
        }
        let body: Value = response.json().await?;
        if !body.is_array() {
            return Err(AlphaEarthError::Geocode(
                "Nominatim response is not an array".to_string(),
            ));
        }
        serde_json::from_value(body).map_err(AlphaEarthError::from)
    }

    /// Geocodes a street address and returns the area of `radius_km` around the best match.
    pub async fn geocode_address(
        &self,
        address: &str,
        radius_km: f64,
    ) -> Result<GeocodeResult, AlphaEarthError> {
        let clean = address.trim();
        if clean.is_empty() {
            return Err(AlphaEarthError::Validation("Address cannot be empty".to_string()));
        }
        let params = [
            ("format", "json".to_string()),
            ("q", clean.to_string()),
            ("limit", "5".to_string()),
            ("addressdetails", "1".to_string()),
            ("extratags", "1".to_string()),
        ];
        let places = self.nominatim_search(&params).await?;
        let best = most_important(&places).ok_or_else(|| {
            AlphaEarthError::Geocode(format!("Could not find location for address: {}", clean))
        })?;
        to_result(best, radius_km, clean)
    }

    /// Geocodes a zip or postal code.
    ///
    /// Five-digit codes are treated as US zip codes: a structured `postalcode` search runs
    /// first, then a fixed sequence of free-text query formats. The first acceptable match
    /// wins. A non-2xx reply to the structured search is skipped silently; when nothing
    /// matches the last recorded failure is returned, or a plain "could not geocode" error.
    pub async fn geocode_zip(&self, zip: &str, radius_km: f64) -> Result<GeocodeResult, AlphaEarthError> {
        let clean = zip.trim();
        if clean.is_empty() {
            return Err(AlphaEarthError::Validation("Zip code cannot be empty".to_string()));
        }
        let us_zip = is_us_zip(clean);
        let mut last_error: Option<AlphaEarthError> = None;

        if us_zip {
            let params = [
                ("format", "json".to_string()),
                ("postalcode", clean.to_string()),
                ("countrycodes", "us".to_string()),
                ("limit", "5".to_string()),
                ("addressdetails", "1".to_string()),
            ];
            match self.nominatim_search(&params).await {
                Ok(places) => {
                    if let Some(place) = select_postal_match(&places, clean) {
                        return to_result(place, radius_km, clean);
                    }
                }
                // A refused or malformed reply just moves on to the free-text queries.
                Err(AlphaEarthError::Geocode(message)) => {
                    log::debug!("Structured postal code search skipped: {}", message);
                }
                Err(e) => {
                    log::debug!("Structured postal code search failed: {}", e);
                    last_error = Some(e);
                }
            }
        }

        for query in zip_queries(clean, us_zip) {
            let mut params = vec![
                ("format", "json".to_string()),
                ("limit", "10".to_string()),
                ("addressdetails", "1".to_string()),
                ("q", query.clone()),
            ];
            if us_zip {
                params.push(("countrycodes", "us".to_string()));
            }
            match self.nominatim_search(&params).await {
                Ok(places) => {
                    if let Some(place) = select_free_text_match(&places, us_zip) {
                        return to_result(place, radius_km, clean);
                    }
                    log::debug!("No acceptable match for query '{}'", query);
                }
                Err(e) => {
                    log::debug!("Query '{}' failed: {}", query, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AlphaEarthError::Geocode(format!("Could not geocode zip code: {}", clean))))
    }
}

/// Free-text query formats tried, in order, for a postal code.
pub fn zip_queries(zip: &str, us_zip: bool) -> Vec<String> {
    if us_zip {
        vec![
            format!("{} United States", zip),
            format!("{}, USA", zip),
            format!("postalcode:{} country:US", zip),
            zip.to_string(),
        ]
    } else {
        vec![
            format!("{}, USA", zip),
            zip.to_string(),
            format!("postal code {}", zip),
        ]
    }
}
