use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned risk label. The cut-points live on the backend, so the
/// label is never recomputed from `risk`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RiskCategory {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl RiskCategory {
    pub const KNOWN: [RiskCategory; 3] = [Self::High, Self::Medium, Self::Low];

    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<String> for RiskCategory {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_lowercase().replace('é', "e");
        match normalized.as_str() {
            "high" | "alto" => Self::High,
            "medium" | "medio" => Self::Medium,
            "low" | "baixo" => Self::Low,
            _ => Self::Unrecognized(value),
        }
    }
}

impl From<&str> for RiskCategory {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<RiskCategory> for String {
    fn from(value: RiskCategory) -> Self {
        value.as_str().to_string()
    }
}

impl Display for RiskCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverPrediction {
    pub employee_id: u32,
    #[serde(rename = "desligamento_risk")]
    pub risk: f64,
    pub risk_category: RiskCategory,
    pub confidence: f64,
}

/// Lifecycle of the backend model. Unknown keeps whatever text arrived.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModelStatus {
    NotTrained,
    Training,
    Trained,
    Error,
    Unknown(String),
}

impl ModelStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NotTrained => "not_trained",
            Self::Training => "training",
            Self::Trained => "trained",
            Self::Error => "error",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ModelStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_trained" => Self::NotTrained,
            "training" => Self::Training,
            "trained" => Self::Trained,
            "error" => Self::Error,
            _ => Self::Unknown(value),
        }
    }
}

impl From<ModelStatus> for String {
    fn from(value: ModelStatus) -> Self {
        value.as_str().to_string()
    }
}

impl Display for ModelStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
    pub test_auc: f64,
    pub turnover_rate: f64,
    #[serde(rename = "hmm_states")]
    pub state_count: u32,
    #[serde(rename = "n_employees", default, skip_serializing_if = "Option::is_none")]
    pub employee_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    pub model_status: ModelStatus,
    pub total_employees: u64,
    #[serde(rename = "avg_desligamento_risk")]
    pub avg_risk: f64,
    pub high_risk_count: u64,
    pub medium_risk_count: u64,
    pub low_risk_count: u64,
    #[serde(
        rename = "last_trained",
        default,
        deserialize_with = "optional_timestamp"
    )]
    pub last_trained_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "optional_performance")]
    pub model_performance: Option<ModelPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    #[serde(rename = "feature")]
    pub feature_key: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingOptions {
    pub use_synthetic: bool,
    #[serde(rename = "n_employees")]
    pub employee_count: u32,
    #[serde(rename = "n_months")]
    pub month_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            use_synthetic: true,
            employee_count: 500,
            month_count: 12,
            filepath: None,
        }
    }
}

/// Acceptance of a training job. Completion is observed through
/// [`TrainingStatus`], never through this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingAcknowledgment {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub test_auc: Option<f64>,
    #[serde(rename = "n_employees", default)]
    pub employee_count: Option<u64>,
    #[serde(default)]
    pub turnover_rate: Option<f64>,
    #[serde(default)]
    pub training_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub status: ModelStatus,
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_trained: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "optional_performance")]
    pub metrics: Option<ModelPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDataRequest {
    #[serde(rename = "n_employees")]
    pub employee_count: u32,
    #[serde(rename = "n_months")]
    pub month_count: u32,
}

impl Default for SampleDataRequest {
    fn default() -> Self {
        Self {
            employee_count: 500,
            month_count: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDataset {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub filepath: Option<String>,
    #[serde(rename = "n_employees", default)]
    pub employee_count: Option<u64>,
    #[serde(default)]
    pub turnover_rate: Option<f64>,
    #[serde(default)]
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
}

/// Accepts ISO-8601 with or without an offset; the backend emits naive
/// local timestamps.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
    }
}

/// The backend sends `{}` before the first training run.
fn optional_performance<'de, D>(deserializer: D) -> Result<Option<ModelPerformance>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
