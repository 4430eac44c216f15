// src/risk.rs

//! Per-property risk assessments and the portfolio tools built on them: the property risk
//! explanation, Monte Carlo loss simulation, portfolio metrics and worst-case scenarios.

use crate::disaster::{DisasterKind, PortfolioMetrics};
use crate::error::AlphaEarthError;
use crate::severity::{classify_risk_score, RiskTier};
use crate::types::ApiEnvelope;
use crate::AlphaEarth;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

pub const DEFAULT_SIMULATIONS: u32 = 1000;

/// One property's exposure to an event, as produced by an impact analysis.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub property_id: String,
    #[serde(default)]
    pub coverage_amount: f64,
    /// 0 to 1.
    #[serde(default)]
    pub damage_probability: f64,
    #[serde(default)]
    pub expected_loss: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    /// The backend's own tier label, kept as sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_tier: Option<String>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

impl RiskAssessment {
    pub fn new(property_id: impl Into<String>, coverage_amount: f64, damage_probability: f64) -> Self {
        RiskAssessment {
            property_id: property_id.into(),
            coverage_amount,
            damage_probability,
            expected_loss: coverage_amount * damage_probability,
            risk_score: None,
            risk_tier: None,
            other_fields: HashMap::new(),
        }
    }

    /// The 0-100 score: `riskScore` when present, otherwise the damage probability as a
    /// percentage.
    pub fn score(&self) -> f64 {
        self.risk_score.unwrap_or(self.damage_probability * 100.0)
    }

    /// Tier from the local score thresholds, regardless of the backend's label.
    pub fn tier(&self) -> RiskTier {
        classify_risk_score(self.score())
    }
}

/// Reply of `analysis/property-risk`. `explanation` is only filled when the backend has
/// an AI provider configured.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PropertyRiskReport {
    pub property_id: String,
    pub explanation: Option<Value>,
    pub risk_assessment: RiskAssessment,
}

impl PropertyRiskReport {
    pub fn tier(&self) -> RiskTier {
        self.risk_assessment.tier()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct MonteCarloResults {
    pub mean_loss: f64,
    pub median_loss: f64,
    pub loss_std: f64,
    pub loss95_percentile: f64,
    pub loss99_percentile: f64,
    pub num_simulations: u32,
}

/// Reply of `risk/portfolio-metrics`.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PortfolioRisk {
    pub metrics: PortfolioMetrics,
    pub distribution: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioAnalysis {
    pub scenario_type: String,
    #[serde(default)]
    pub portfolio_metrics: PortfolioMetrics,
    pub risk_distribution: Option<Value>,
    pub monte_carlo_results: Option<MonteCarloResults>,
    pub timestamp: Option<String>,
}

fn require_assessments(assessments: &[RiskAssessment]) -> Result<(), AlphaEarthError> {
    if assessments.is_empty() {
        return Err(AlphaEarthError::Validation(
            "riskAssessments array is required".to_string(),
        ));
    }
    Ok(())
}

impl AlphaEarth {
    /// Sends one assessment for a detailed explanation.
    pub async fn calculate_property_risk(
        &self,
        assessment: &RiskAssessment,
    ) -> Result<PropertyRiskReport, AlphaEarthError> {
        if assessment.property_id.trim().is_empty() {
            return Err(AlphaEarthError::Validation(
                "propertyId is required".to_string(),
            ));
        }
        let body = json!({
            "propertyId": assessment.property_id,
            "riskAssessment": assessment,
        });
        let envelope: ApiEnvelope<PropertyRiskReport> =
            self.post("analysis/property-risk", &body).await?;
        let report = envelope.into_data("analysis/property-risk")?;
        log::debug!(
            "Property {} scored {:.1} ({})",
            report.property_id,
            report.risk_assessment.score(),
            report.tier().as_str()
        );
        Ok(report)
    }

    pub async fn run_monte_carlo(
        &self,
        assessments: &[RiskAssessment],
        num_simulations: u32,
    ) -> Result<MonteCarloResults, AlphaEarthError> {
        require_assessments(assessments)?;
        let simulations = if num_simulations == 0 {
            DEFAULT_SIMULATIONS
        } else {
            num_simulations
        };
        let body = json!({"riskAssessments": assessments, "numSimulations": simulations});
        log::info!(
            "Running {} simulations over {} assessments",
            simulations,
            assessments.len()
        );
        let envelope: ApiEnvelope<MonteCarloResults> = self.post("risk/monte-carlo", &body).await?;
        envelope.into_data("risk/monte-carlo")
    }

    pub async fn portfolio_risk(&self, assessments: &[RiskAssessment]) -> Result<PortfolioRisk, AlphaEarthError> {
        require_assessments(assessments)?;
        let body = json!({"riskAssessments": assessments});
        let envelope: ApiEnvelope<PortfolioRisk> = self.post("risk/portfolio-metrics", &body).await?;
        envelope.into_data("risk/portfolio-metrics")
    }

    /// Reruns an event at its worst case (`cat_5` by default). Only hurricanes and
    /// wildfires have scenario models.
    pub async fn run_scenario(
        &self,
        kind: DisasterKind,
        event_id: &str,
        modifier: Option<&str>,
        region: Option<&str>,
    ) -> Result<ScenarioAnalysis, AlphaEarthError> {
        if !matches!(kind, DisasterKind::Hurricane | DisasterKind::Wildfire) {
            return Err(AlphaEarthError::Validation(format!(
                "No scenario model for {}",
                kind
            )));
        }
        if event_id.trim().is_empty() {
            return Err(AlphaEarthError::Validation(
                "disasterType and disasterId are required".to_string(),
            ));
        }
        let mut body = json!({"disasterType": kind.as_str(), "disasterId": event_id.trim()});
        if let Some(modifier) = modifier {
            body["scenarioModifier"] = Value::String(modifier.to_string());
        }
        if let Some(region) = region {
            body["region"] = Value::String(region.to_ascii_lowercase());
        }
        let envelope: ApiEnvelope<ScenarioAnalysis> = self.post("analysis/scenario", &body).await?;
        envelope.into_data("analysis/scenario")
    }
}
