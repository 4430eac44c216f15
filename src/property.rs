// src/property.rs

use crate::error::AlphaEarthError;
use crate::geo::GeoPoint;
use crate::normalize::{normalize_properties, PropertyRecord};
use crate::types::ApiEnvelope;
use crate::AlphaEarth;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Largest portfolio the backend will generate in one request.
pub const MAX_PORTFOLIO_SIZE: u32 = 10_000;
pub const DEFAULT_REGION: &str = "florida";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct PortfolioStatistics {
    pub total_properties: u64,
    pub total_value: f64,
    pub total_coverage: f64,
    /// `null` for an empty portfolio.
    pub average_value: Option<f64>,
    pub type_distribution: HashMap<String, u64>,
}

/// Normalized properties plus the backend's aggregate, when it sent one.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPage {
    pub properties: Vec<PropertyRecord>,
    pub statistics: Option<PortfolioStatistics>,
}

#[derive(Debug, Deserialize)]
struct PropertyReply {
    #[serde(flatten)]
    envelope: ApiEnvelope<Vec<Value>>,
    statistics: Option<PortfolioStatistics>,
}

impl PropertyReply {
    fn into_page(self, endpoint: &str) -> Result<PropertyPage, AlphaEarthError> {
        let statistics = self.statistics;
        let payloads = self.envelope.into_data(endpoint)?;
        let properties = normalize_properties(&payloads)?;
        log::debug!("'{}' returned {} properties", endpoint, properties.len());
        Ok(PropertyPage {
            properties,
            statistics,
        })
    }
}

fn region_or_default(region: &str) -> String {
    let region = region.trim();
    if region.is_empty() {
        DEFAULT_REGION.to_string()
    } else {
        region.to_ascii_lowercase()
    }
}

fn positive(value: f64, what: &str) -> Result<f64, AlphaEarthError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AlphaEarthError::Validation(format!("{} must be a positive number", what)))
    }
}

impl AlphaEarth {
    /// A generated portfolio of `count` properties in `region`, capped at
    /// [`MAX_PORTFOLIO_SIZE`].
    pub async fn portfolio(&self, region: &str, count: u32) -> Result<PropertyPage, AlphaEarthError> {
        let count = count.clamp(1, MAX_PORTFOLIO_SIZE);
        let query = [
            ("region", region_or_default(region)),
            ("count", count.to_string()),
        ];
        let reply: PropertyReply = self.get_with_query("properties/portfolio", &query).await?;
        reply.into_page("properties/portfolio")
    }

    /// Properties within `radius_miles` of `center`.
    pub async fn properties_in_region(
        &self,
        center: GeoPoint,
        radius_miles: f64,
    ) -> Result<PropertyPage, AlphaEarthError> {
        let radius = positive(radius_miles, "Radius")?;
        let query = [
            ("lat", center.latitude.to_string()),
            ("lon", center.longitude.to_string()),
            ("radius", radius.to_string()),
        ];
        let reply: PropertyReply = self.get_with_query("properties/region", &query).await?;
        reply.into_page("properties/region")
    }

    pub async fn high_value_properties(
        &self,
        region: &str,
        threshold: f64,
    ) -> Result<Vec<PropertyRecord>, AlphaEarthError> {
        let query = [
            ("region", region_or_default(region)),
            ("threshold", positive(threshold, "Threshold")?.to_string()),
        ];
        let reply: PropertyReply = self.get_with_query("properties/high-value", &query).await?;
        Ok(reply.into_page("properties/high-value")?.properties)
    }

    pub async fn coastal_properties(
        &self,
        region: &str,
        max_distance_miles: f64,
    ) -> Result<Vec<PropertyRecord>, AlphaEarthError> {
        let query = [
            ("region", region_or_default(region)),
            ("maxDistance", positive(max_distance_miles, "Distance")?.to_string()),
        ];
        let reply: PropertyReply = self.get_with_query("properties/coastal", &query).await?;
        Ok(reply.into_page("properties/coastal")?.properties)
    }
}
