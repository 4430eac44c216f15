// src/payout.rs

//! Policy and payout administration shared by the flight delay and parametric products.
//!
//! Both products expose the same routes under their own prefix (`flight/...` and
//! `parametric/...`). Payouts are created server-side when a policy trigger fires and wait
//! in a pending queue until an admin approves or rejects them.

use crate::client::path_segment;
use crate::error::AlphaEarthError;
use crate::requests::NoQuery;
use crate::types::AdminCredentials;
use crate::AlphaEarth;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Product {
    Flight,
    Parametric,
}

impl Product {
    pub fn path(&self) -> &'static str {
        match self {
            Product::Flight => "flight",
            Product::Parametric => "parametric",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: String,
    #[serde(default)]
    pub active: bool,
    pub created_at: Option<String>,
    pub holder: Option<Value>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTrigger {
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub threshold: Option<Value>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub id: String,
    pub policy_id: String,
    pub status: PayoutStatus,
    #[serde(default)]
    pub amount: f64,
    pub currency: Option<String>,
    pub trigger: Option<PayoutTrigger>,
    pub evidence: Option<Value>,
    pub created_at: Option<String>,
    pub approved_by: Option<String>,
    pub approved_at: Option<String>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<String>,
    pub rejection_reason: Option<String>,
    #[serde(flatten)]
    pub other_fields: HashMap<String, Value>,
}

impl Payout {
    pub fn is_pending(&self) -> bool {
        self.status == PayoutStatus::Pending
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AmountBucket {
    pub count: u64,
    pub total_amount: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PolicyCounts {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct PayoutCounts {
    pub pending: AmountBucket,
    pub approved: AmountBucket,
    pub rejected: AmountBucket,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct PayoutStatistics {
    pub policies: PolicyCounts,
    pub payouts: PayoutCounts,
}

/// Outcome of evaluating one policy's triggers.
///
/// The flight product replies with a single `result`, the parametric one with a list of
/// per-trigger `results`; both are kept as returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Single(Value),
    PerTrigger(Vec<Value>),
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct PolicyHolder {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Coverage {
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub coverage_type: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct TriggerDraft {
    #[serde(rename = "type")]
    pub trigger_type: String,
    pub threshold: f64,
    pub payout: f64,
    pub description: String,
}

/// Body of `POST {product}/policies`.
///
/// Product-specific parts (`flight` for flight delay cover, `propertyId` and `location`
/// for parametric cover) go in `details` and are sent flattened next to the common fields.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PolicyDraft {
    pub holder: PolicyHolder,
    pub coverage: Coverage,
    pub triggers: Vec<TriggerDraft>,
    #[serde(flatten)]
    pub details: serde_json::Map<String, Value>,
}

impl PolicyDraft {
    pub fn new(holder: PolicyHolder, coverage: Coverage) -> Self {
        PolicyDraft {
            holder,
            coverage,
            triggers: Vec::new(),
            details: serde_json::Map::new(),
        }
    }

    pub fn with_trigger(mut self, trigger: TriggerDraft) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_detail(mut self, key: &str, value: Value) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }

    fn validate(&self) -> Result<(), AlphaEarthError> {
        non_empty(&self.holder.name, "Policy holder name")?;
        non_empty(&self.holder.email, "Policy holder email")?;
        if !(self.coverage.amount.is_finite() && self.coverage.amount > 0.0) {
            return Err(AlphaEarthError::Validation(
                "Coverage amount must be a positive number".to_string(),
            ));
        }
        if self.triggers.is_empty() {
            return Err(AlphaEarthError::Validation(
                "A policy needs at least one trigger".to_string(),
            ));
        }
        Ok(())
    }
}

/// Summary returned by a bulk evaluation run.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BulkEvaluation {
    pub evaluated_at: Option<String>,
    pub policies_evaluated: u64,
    pub triggers_activated: u64,
    pub payouts_created: u64,
    pub policies: Vec<Value>,
}

/// Product routes reply with named payload keys instead of `data`.
#[derive(Debug, Deserialize)]
struct ProgramReply {
    #[serde(default = "default_success")]
    success: bool,
    error: Option<String>,
    message: Option<String>,
    policies: Option<Vec<Policy>>,
    policy: Option<Policy>,
    payouts: Option<Vec<Payout>>,
    payout: Option<Payout>,
    result: Option<Value>,
    results: Option<Value>,
    statistics: Option<PayoutStatistics>,
}

fn default_success() -> bool {
    true
}

impl ProgramReply {
    fn checked(self, endpoint: &str) -> Result<Self, AlphaEarthError> {
        if self.success {
            Ok(self)
        } else {
            Err(AlphaEarthError::Api {
                status: 200,
                message: self
                    .error
                    .or(self.message)
                    .unwrap_or_else(|| format!("'{}' reported failure", endpoint)),
            })
        }
    }
}

fn required<T>(field: Option<T>, key: &str, endpoint: &str) -> Result<T, AlphaEarthError> {
    field.ok_or_else(|| {
        log::error!("'{}' responded without '{}'", endpoint, key);
        AlphaEarthError::UnrecognizedPayload(format!("'{}' responded without '{}'", endpoint, key))
    })
}

fn non_empty(value: &str, what: &str) -> Result<(), AlphaEarthError> {
    if value.trim().is_empty() {
        return Err(AlphaEarthError::Validation(format!("{} cannot be empty", what)));
    }
    Ok(())
}

/// Handle for one product's policy and payout routes, borrowed from an [`AlphaEarth`] client.
#[derive(Debug, Clone, Copy)]
pub struct PayoutProgram<'a> {
    client: &'a AlphaEarth,
    product: Product,
}

impl<'a> PayoutProgram<'a> {
    pub(crate) fn new(client: &'a AlphaEarth, product: Product) -> Self {
        PayoutProgram { client, product }
    }

    pub fn product(&self) -> Product {
        self.product
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.product.path(), path)
    }

    async fn call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ProgramReply, AlphaEarthError> {
        let endpoint = self.endpoint(path);
        let reply: ProgramReply = self
            .client
            ._request(method, &endpoint, body, None::<&NoQuery>, None)
            .await?;
        reply.checked(&endpoint)
    }

    pub async fn policies(&self) -> Result<Vec<Policy>, AlphaEarthError> {
        let reply = self.call(Method::GET, "policies", None).await?;
        required(reply.policies, "policies", &self.endpoint("policies"))
    }

    pub async fn policy(&self, policy_id: &str) -> Result<Policy, AlphaEarthError> {
        non_empty(policy_id, "Policy id")?;
        let path = format!("policies/{}", path_segment(policy_id)?);
        let reply = self.call(Method::GET, &path, None).await?;
        required(reply.policy, "policy", &self.endpoint(&path))
    }

    /// Registers a new policy. The backend assigns the id and replies with `201 Created`.
    pub async fn create_policy(&self, draft: &PolicyDraft) -> Result<Policy, AlphaEarthError> {
        draft.validate()?;
        let body = serde_json::to_value(draft)?;
        log::info!("Creating {} policy for {}", self.product.path(), draft.holder.name);
        let reply = self.call(Method::POST, "policies", Some(&body)).await?;
        let policy = required(reply.policy, "policy", &self.endpoint("policies"))?;
        log::info!("Created {} policy {}", self.product.path(), policy.id);
        Ok(policy)
    }

    /// Evaluates every active policy against current airport delays. Only the flight
    /// product has a bulk route.
    pub async fn evaluate_all(&self) -> Result<BulkEvaluation, AlphaEarthError> {
        if self.product != Product::Flight {
            return Err(AlphaEarthError::Validation(format!(
                "Bulk evaluation is not available for {} policies",
                self.product.path()
            )));
        }
        log::info!("Evaluating all active {} policies", self.product.path());
        let reply = self.call(Method::POST, "evaluate", None).await?;
        let results = required(reply.results, "results", &self.endpoint("evaluate"))?;
        let summary: BulkEvaluation = serde_json::from_value(results)?;
        log::info!(
            "Evaluated {} policies, {} payouts created",
            summary.policies_evaluated,
            summary.payouts_created
        );
        Ok(summary)
    }

    /// Evaluates a policy's triggers now. `event_context` is only read by the parametric
    /// product.
    pub async fn evaluate(
        &self,
        policy_id: &str,
        event_context: Option<&Value>,
    ) -> Result<Evaluation, AlphaEarthError> {
        non_empty(policy_id, "Policy id")?;
        let path = format!("evaluate/{}", path_segment(policy_id)?);
        let body = json!({ "eventContext": event_context.cloned().unwrap_or_else(|| json!({})) });
        log::info!("Evaluating {} policy {}", self.product.path(), policy_id);
        let reply = self.call(Method::POST, &path, Some(&body)).await?;
        match (reply.result, reply.results) {
            (_, Some(Value::Array(results))) => Ok(Evaluation::PerTrigger(results)),
            (Some(result), _) => Ok(Evaluation::Single(result)),
            (None, Some(other)) => Ok(Evaluation::Single(other)),
            (None, None) => required(None, "result", &self.endpoint(&path)),
        }
    }

    pub async fn pending_payouts(&self) -> Result<Vec<Payout>, AlphaEarthError> {
        let reply = self.call(Method::GET, "payouts/pending", None).await?;
        required(reply.payouts, "payouts", &self.endpoint("payouts/pending"))
    }

    pub async fn processed_payouts(&self) -> Result<Vec<Payout>, AlphaEarthError> {
        let reply = self.call(Method::GET, "payouts/processed", None).await?;
        required(reply.payouts, "payouts", &self.endpoint("payouts/processed"))
    }

    pub async fn payout(&self, payout_id: &str) -> Result<Payout, AlphaEarthError> {
        non_empty(payout_id, "Payout id")?;
        let path = format!("payouts/{}", path_segment(payout_id)?);
        let reply = self.call(Method::GET, &path, None).await?;
        required(reply.payout, "payout", &self.endpoint(&path))
    }

    /// Approves a pending payout. Credentials are checked locally before anything is sent.
    pub async fn approve(
        &self,
        payout_id: &str,
        credentials: &AdminCredentials,
    ) -> Result<Payout, AlphaEarthError> {
        non_empty(payout_id, "Payout id")?;
        credentials.validate()?;
        let path = format!("payouts/{}/approve", path_segment(payout_id)?);
        let body = serde_json::to_value(credentials)?;
        log::info!("Approving {} payout {}", self.product.path(), payout_id);
        let reply = self.call(Method::POST, &path, Some(&body)).await?;
        required(reply.payout, "payout", &self.endpoint(&path))
    }

    /// Rejects a pending payout with a reason, which is mandatory.
    pub async fn reject(
        &self,
        payout_id: &str,
        credentials: &AdminCredentials,
        reason: &str,
    ) -> Result<Payout, AlphaEarthError> {
        non_empty(payout_id, "Payout id")?;
        credentials.validate()?;
        if reason.trim().is_empty() {
            return Err(AlphaEarthError::Validation(
                "Rejection reason required".to_string(),
            ));
        }
        let path = format!("payouts/{}/reject", path_segment(payout_id)?);
        let mut body = serde_json::to_value(credentials)?;
        if let Value::Object(map) = &mut body {
            map.insert("reason".to_string(), Value::String(reason.trim().to_string()));
        }
        log::info!("Rejecting {} payout {}", self.product.path(), payout_id);
        let reply = self.call(Method::POST, &path, Some(&body)).await?;
        required(reply.payout, "payout", &self.endpoint(&path))
    }

    pub async fn statistics(&self) -> Result<PayoutStatistics, AlphaEarthError> {
        let reply = self.call(Method::GET, "statistics", None).await?;
        required(reply.statistics, "statistics", &self.endpoint("statistics"))
    }
}
