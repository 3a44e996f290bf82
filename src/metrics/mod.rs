pub mod labels;
pub mod percent;
pub mod summary;

use serde::{Deserialize, Serialize};

use crate::types::DashboardMetrics;

pub use labels::{
    risk_category_presentation, status_label, translate_feature_label, RiskPresentation,
};
pub use percent::{format_percentage, risk_bucket_percentage};
pub use summary::{DashboardSummary, FeatureImportanceRow, PredictionSummary};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskBucket {
    High,
    Medium,
    Low,
}

impl RiskBucket {
    pub const ALL: [RiskBucket; 3] = [RiskBucket::High, RiskBucket::Medium, RiskBucket::Low];

    pub fn count(self, metrics: &DashboardMetrics) -> u64 {
        match self {
            Self::High => metrics.high_risk_count,
            Self::Medium => metrics.medium_risk_count,
            Self::Low => metrics.low_risk_count,
        }
    }
}

/// Employees that landed in one of the three buckets.
pub fn scored_employees(metrics: &DashboardMetrics) -> u64 {
    RiskBucket::ALL
        .iter()
        .map(|bucket| bucket.count(metrics))
        .fold(0u64, u64::saturating_add)
}
