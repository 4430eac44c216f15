// src/claim.rs

use crate::error::AlphaEarthError;
use crate::geo::{AreaOfInterest, GeoPoint};
use crate::requests::NoQuery;
use crate::severity::normalize_confidence;
use crate::status::ProcessingController;
use crate::types::{DateRange, EventWindows};
use crate::AlphaEarth;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Instant;

pub const CLAIM_ENDPOINT: &str = "claim_processing_basic";

/// Default search radius, in kilometres, around a claim location.
pub const DEFAULT_RADIUS_KM: f64 = 5.0;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Satellite {
    Sentinel2,
    Landsat8,
    Landsat9,
    Modis,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Median,
    Mosaic,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Hazard {
    Flood,
    Wildfire,
    Roof,
}

/// Imagery selection: where and when to compare before/after scenes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PreprocessingSchema {
    pub aoi: AreaOfInterest,
    pub pre: DateRange,
    pub post: DateRange,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite: Option<Satellite>,
    /// Maximum cloud cover, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_cloud: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reducer: Option<Reducer>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct HazardDetectionSchema {
    /// `None` lets the backend auto-detect the hazard.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hazard: Option<Hazard>,
    /// Nominal reducer scale in meters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct ClaimDecisionSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tiles: Option<bool>,
}

/// Body of `POST claim_processing_basic`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClaimProcessingRequest {
    pub preprocessing: PreprocessingSchema,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hazard: Option<HazardDetectionSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claim: Option<ClaimDecisionSchema>,
}

impl ClaimProcessingRequest {
    /// A request over `aoi` whose pre/post windows are derived from the outer `range`.
    pub fn new(aoi: AreaOfInterest, range: &DateRange) -> Self {
        let EventWindows { pre, post } = EventWindows::split(range);
        ClaimProcessingRequest {
            preprocessing: PreprocessingSchema {
                aoi,
                pre,
                post,
                satellite: None,
                max_cloud: None,
                reducer: None,
            },
            hazard: None,
            claim: None,
        }
    }

    pub fn with_satellite(mut self, satellite: Satellite) -> Self {
        self.preprocessing.satellite = Some(satellite);
        self
    }

    pub fn with_reducer(mut self, reducer: Reducer) -> Self {
        self.preprocessing.reducer = Some(reducer);
        self
    }

    pub fn with_max_cloud(mut self, percent: u8) -> Result<Self, AlphaEarthError> {
        if percent > 100 {
            return Err(AlphaEarthError::Validation(format!(
                "Maximum cloud cover must be between 0 and 100, got {}",
                percent
            )));
        }
        self.preprocessing.max_cloud = Some(percent);
        Ok(self)
    }

    pub fn with_hazard(mut self, hazard: Hazard) -> Self {
        self.hazard.get_or_insert_with(Default::default).hazard = Some(hazard);
        self
    }

    pub fn with_summary(mut self, include_summary: bool) -> Self {
        self.claim.get_or_insert_with(Default::default).include_summary = Some(include_summary);
        self
    }

    pub fn with_tiles(mut self, include_tiles: bool) -> Self {
        self.claim.get_or_insert_with(Default::default).include_tiles = Some(include_tiles);
        self
    }
}

/// Claim form input exactly as typed by the user.
#[derive(Debug, Clone, Default)]
pub struct ClaimForm {
    pub latitude: String,
    pub longitude: String,
    /// Empty means [`DEFAULT_RADIUS_KM`].
    pub radius_km: String,
    pub start_date: String,
    pub end_date: String,
    pub hazard: Option<Hazard>,
    pub satellite: Option<Satellite>,
    pub max_cloud: Option<u8>,
    pub reducer: Option<Reducer>,
    pub include_summary: bool,
    pub include_tiles: bool,
}

impl ClaimForm {
    /// Validates the raw fields and derives the request body.
    ///
    /// Non-numeric coordinates, out-of-range values, malformed dates and `start >= end` are
    /// rejected with a descriptive [`AlphaEarthError::Validation`].
    pub fn validate(&self) -> Result<ClaimProcessingRequest, AlphaEarthError> {
        let latitude = parse_number("Latitude", &self.latitude)?;
        let longitude = parse_number("Longitude", &self.longitude)?;
        let radius_km = if self.radius_km.trim().is_empty() {
            DEFAULT_RADIUS_KM
        } else {
            parse_number("Radius", &self.radius_km)?
        };

        let center = GeoPoint::new(latitude, longitude)?;
        let aoi = AreaOfInterest::around(center, radius_km)?;
        let range = DateRange::parse(&self.start_date, &self.end_date)?;

        let mut request = ClaimProcessingRequest::new(aoi, &range);
        if let Some(satellite) = self.satellite {
            request = request.with_satellite(satellite);
        }
        if let Some(percent) = self.max_cloud {
            request = request.with_max_cloud(percent)?;
        }
        if let Some(reducer) = self.reducer {
            request = request.with_reducer(reducer);
        }
        if let Some(hazard) = self.hazard {
            request = request.with_hazard(hazard);
        }
        if self.include_summary {
            request = request.with_summary(true);
        }
        if self.include_tiles {
            request = request.with_tiles(true);
        }
        Ok(request)
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64, AlphaEarthError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AlphaEarthError::Validation(format!("{} is required", field)));
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(AlphaEarthError::Validation(format!(
            "{} must be a number, got '{}'",
            field, trimmed
        ))),
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Confidence {
    #[serde(default)]
    pub confidence_score: f64,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Validation {
    pub cross_sensor: f64,
    pub meteorology: f64,
    pub spatial_coherence: f64,
    pub confidence: Confidence,
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct HazardResult {
    pub damage_pct: Option<f64>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClaimResult {
    pub fused_score: Option<f64>,
    pub confidence_label: Option<String>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RankedHazard {
    pub hazard: String,
    pub fused_score: f64,
    pub damage_pct: Option<f64>,
    pub confidence_label: Option<String>,
}

/// Tile layers for the before/after imagery comparison.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Visualization {
    pub pre_tile: String,
    pub post_tile: String,
    pub dataset: String,
    #[serde(default)]
    pub bands: Vec<String>,
    pub aoi: AreaOfInterest,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ImageryWindow {
    pub url_template: Option<String>,
}

/// Echo of the preprocessing stage, present on some backend versions.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PreprocessingEcho {
    pub aoi: Option<AreaOfInterest>,
    #[serde(default)]
    pub pre: ImageryWindow,
    #[serde(default)]
    pub post: ImageryWindow,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ClaimProcessingResponse {
    #[serde(default)]
    pub hazard: HazardResult,
    #[serde(default)]
    pub validation: Validation,
    #[serde(default)]
    pub claim: ClaimResult,
    #[serde(default)]
    pub ranked_hazards: Vec<RankedHazard>,
    pub summary: Option<String>,
    pub visualization: Option<Visualization>,
    pub preprocessing: Option<PreprocessingEcho>,
}

impl ClaimProcessingResponse {
    /// Confidence on the 0-1 scale, whatever scale the backend reported.
    pub fn confidence(&self) -> f64 {
        normalize_confidence(self.validation.confidence.confidence_score)
    }

    pub fn damage_pct(&self) -> f64 {
        self.hazard.damage_pct.unwrap_or(0.0)
    }

    /// The hazard with the highest fused score.
    pub fn top_hazard(&self) -> Option<&RankedHazard> {
        self.ranked_hazards
            .iter()
            .max_by(|a, b| a.fused_score.total_cmp(&b.fused_score))
    }

    pub fn pre_image_url(&self) -> Option<&str> {
        self.preprocessing
            .as_ref()
            .and_then(|p| p.pre.url_template.as_deref())
            .or_else(|| self.visualization.as_ref().map(|v| v.pre_tile.as_str()))
    }

    pub fn post_image_url(&self) -> Option<&str> {
        self.preprocessing
            .as_ref()
            .and_then(|p| p.post.url_template.as_deref())
            .or_else(|| self.visualization.as_ref().map(|v| v.post_tile.as_str()))
    }

    /// Map center `(lat, lon)` of the processed area, if the backend echoed it.
    pub fn map_center(&self) -> Option<(f64, f64)> {
        self.preprocessing
            .as_ref()
            .and_then(|p| p.aoi)
            .or_else(|| self.visualization.as_ref().map(|v| v.aoi))
            .map(|aoi| aoi.center())
    }
}

/// Fills the `{z}`, `{x}` and `{y}` placeholders of an XYZ tile URL template.
pub fn tile_url(template: &str, z: u32, x: u32, y: u32) -> String {
    template
        .replace("{z}", &z.to_string())
        .replace("{x}", &x.to_string())
        .replace("{y}", &y.to_string())
}

impl AlphaEarth {
    /// Submits a claim for satellite damage assessment.
    ///
    /// Processing can take up to half an hour server-side; the request uses the claim
    /// timeout from [`ClientConfig`](crate::ClientConfig) (60 minutes by default). There is
    /// no cancellation: once issued, the call runs to completion or timeout.
    pub async fn process_claim(
        &self,
        request: &ClaimProcessingRequest,
    ) -> Result<ClaimProcessingResponse, AlphaEarthError> {
        log::info!(
            "Starting claim processing: aoi={:?}, hazard={}",
            request.preprocessing.aoi.to_bbox(),
            request
                .hazard
                .as_ref()
                .and_then(|h| h.hazard)
                .map(|h| format!("{:?}", h))
                .unwrap_or_else(|| "auto-detect".to_string())
        );
        let started = Instant::now();
        let result: Result<ClaimProcessingResponse, AlphaEarthError> = self
            ._request(
                Method::POST,
                CLAIM_ENDPOINT,
                Some(request),
                None::<&NoQuery>,
                Some(self.config.claim_timeout),
            )
            .await;
        match &result {
            Ok(response) => log::info!(
                "Claim processing completed in {:.2} minutes (damage {:.1}%)",
                started.elapsed().as_secs_f64() / 60.0,
                response.damage_pct()
            ),
            Err(e) => log::error!("Claim processing failed: {}", e),
        }
        result
    }

    /// [`process_claim`](Self::process_claim) with its progress mirrored into `controller`.
    ///
    /// Fails fast with a validation error if the controller already has a running job. If the
    /// returned future is dropped early the job ends as failed with "cancelled".
    pub async fn process_claim_tracked(
        &self,
        request: &ClaimProcessingRequest,
        controller: &ProcessingController<ClaimProcessingResponse>,
    ) -> Result<ClaimProcessingResponse, AlphaEarthError> {
        let Some(job) = controller.begin() else {
            return Err(AlphaEarthError::Validation(
                "A claim is already being processed".to_string(),
            ));
        };
        // Dropping this future before it resolves drops `job`, which fails it as cancelled.
        match self.process_claim(request).await {
            Ok(response) => {
                job.succeed(response.clone());
                Ok(response)
            }
            Err(e) => {
                job.fail(e.to_string());
                Err(e)
            }
        }
    }
}
