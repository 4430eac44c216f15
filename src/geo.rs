// src/geo.rs

use crate::error::AlphaEarthError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kilometres per degree of latitude used by the flat-earth approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Largest absolute latitude accepted by [`AreaOfInterest::around`]. Beyond this the
/// longitude offset grows without bound as `cos(latitude)` approaches zero.
pub const MAX_AOI_LATITUDE: f64 = 85.0;

/// A validated WGS84 coordinate.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a new `GeoPoint`.
    ///
    /// Returns a validation error if latitude is not within [-90, 90] or longitude is not
    /// within [-180, 180]. NaN fails both range checks.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, AlphaEarthError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(AlphaEarthError::Validation(format!(
                "Latitude must be between -90 and 90 degrees, got {}",
                latitude
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(AlphaEarthError::Validation(format!(
                "Longitude must be between -180 and 180 degrees, got {}",
                longitude
            )));
        }
        Ok(GeoPoint {
            latitude,
            longitude,
        })
    }

    /// The `[longitude, latitude]` pair the backend expects for airport and route coordinates.
    pub fn lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

/// A rectangular bounding box submitted to the imagery/claims backend.
///
/// Serialized as `[minLon, minLat, maxLon, maxLat]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaOfInterest {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl AreaOfInterest {
    /// Derives the bounding box of `radius_km` around `center`.
    ///
    /// Rejects non-positive or non-finite radii and centers closer to a pole than
    /// [`MAX_AOI_LATITUDE`].
    pub fn around(center: GeoPoint, radius_km: f64) -> Result<Self, AlphaEarthError> {
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(AlphaEarthError::Validation(format!(
                "Radius must be a positive number of kilometres, got {}",
                radius_km
            )));
        }
        if center.latitude.abs() > MAX_AOI_LATITUDE {
            return Err(AlphaEarthError::Validation(format!(
                "Latitude {} is too close to a pole to derive an area of interest (limit ±{})",
                center.latitude, MAX_AOI_LATITUDE
            )));
        }
        Ok(Self::around_unchecked(center, radius_km))
    }

    /// The raw derivation without input guards.
    ///
    /// Near the poles the longitude offset diverges and the box becomes degenerate.
    pub fn around_unchecked(center: GeoPoint, radius_km: f64) -> Self {
        let lat_offset = radius_km / KM_PER_DEGREE;
        let lon_offset = radius_km / (KM_PER_DEGREE * center.latitude.to_radians().cos());
        AreaOfInterest {
            min_lon: center.longitude - lon_offset,
            min_lat: center.latitude - lat_offset,
            max_lon: center.longitude + lon_offset,
            max_lat: center.latitude + lat_offset,
        }
    }

    pub fn from_bbox(bbox: [f64; 4]) -> Result<Self, AlphaEarthError> {
        let [min_lon, min_lat, max_lon, max_lat] = bbox;
        if !(min_lon < max_lon && min_lat < max_lat) {
            return Err(AlphaEarthError::Validation(format!(
                "Bounding box {:?} must satisfy minLon < maxLon and minLat < maxLat",
                bbox
            )));
        }
        Ok(AreaOfInterest {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        })
    }

    pub fn to_bbox(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

impl Serialize for AreaOfInterest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_bbox().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AreaOfInterest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bbox = <[f64; 4]>::deserialize(deserializer)?;
        AreaOfInterest::from_bbox(bbox).map_err(serde::de::Error::custom)
    }
}

/// Convenience wrapper over [`AreaOfInterest::around`].
pub fn derive_aoi(center: GeoPoint, radius_km: f64) -> Result<AreaOfInterest, AlphaEarthError> {
    AreaOfInterest::around(center, radius_km)
}
