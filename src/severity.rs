// src/severity.rs

//! Threshold tables mapping raw measurements onto display tiers.
//!
//! Every dashboard view that shows delay minutes, risk scores or confidence scores goes
//! through these functions so the cut points stay identical across screens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Flight delay severity, in ascending order.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum DelayTier {
    OnTime,
    Minor,
    Moderate,
    Severe,
    Critical,
}

impl DelayTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelayTier::OnTime => "on-time",
            DelayTier::Minor => "minor",
            DelayTier::Moderate => "moderate",
            DelayTier::Severe => "severe",
            DelayTier::Critical => "critical",
        }
    }

    /// Map marker color as an `rgb()` string.
    pub fn color(&self) -> &'static str {
        match self {
            DelayTier::OnTime => "rgb(34, 197, 94)",
            DelayTier::Minor => "rgb(234, 179, 8)",
            DelayTier::Moderate => "rgb(249, 115, 22)",
            DelayTier::Severe => "rgb(239, 68, 68)",
            DelayTier::Critical => "rgb(185, 28, 28)",
        }
    }

    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Parses the category string the backend sends (`"on-time"`, `"minor"`, ...).
    pub fn from_category(category: &str) -> Option<Self> {
        match category.trim().to_ascii_lowercase().as_str() {
            "on-time" | "ontime" | "on_time" => Some(DelayTier::OnTime),
            "minor" => Some(DelayTier::Minor),
            "moderate" => Some(DelayTier::Moderate),
            "severe" => Some(DelayTier::Severe),
            "critical" => Some(DelayTier::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for DelayTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Property risk tier for a 0-100 score.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RiskTier::Low => "green",
            RiskTier::Medium => "yellow",
            RiskTier::High => "red",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const MINOR_DELAY_MINUTES: f64 = 5.0;
pub const MODERATE_DELAY_MINUTES: f64 = 30.0;
pub const SEVERE_DELAY_MINUTES: f64 = 60.0;
pub const CRITICAL_DELAY_MINUTES: f64 = 120.0;

pub const MEDIUM_RISK_SCORE: f64 = 40.0;
pub const HIGH_RISK_SCORE: f64 = 70.0;

/// Classifies a delay in minutes. Lower bounds are inclusive.
///
/// Negative delays (early departures) and NaN count as on time.
pub fn classify_flight_delay(minutes: f64) -> DelayTier {
    if minutes >= CRITICAL_DELAY_MINUTES {
        DelayTier::Critical
    } else if minutes >= SEVERE_DELAY_MINUTES {
        DelayTier::Severe
    } else if minutes >= MODERATE_DELAY_MINUTES {
        DelayTier::Moderate
    } else if minutes >= MINOR_DELAY_MINUTES {
        DelayTier::Minor
    } else {
        DelayTier::OnTime
    }
}

/// Classifies a 0-100 risk score. Scores outside the range are clamped first.
pub fn classify_risk_score(score: f64) -> RiskTier {
    let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 100.0) };
    if score >= HIGH_RISK_SCORE {
        RiskTier::High
    } else if score >= MEDIUM_RISK_SCORE {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Brings a confidence score onto the 0-1 scale.
///
/// Values strictly greater than 1 are read as percentages; anything else is assumed to be
/// normalized already, so `1.0` stays `1.0`.
pub fn normalize_confidence(raw: f64) -> f64 {
    if raw > 1.0 {
        raw / 100.0
    } else {
        raw
    }
}
