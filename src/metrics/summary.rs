use std::cmp::Ordering;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::metrics::labels::{
    risk_category_presentation, status_label, translate_feature_label, RiskPresentation,
};
use crate::metrics::percent::{format_percentage, relative_shares, risk_bucket_percentage};
use crate::metrics::RiskBucket;
use crate::types::{
    DashboardMetrics, FeatureImportance, ModelStatus, RiskCategory, TurnoverPrediction,
};

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BucketShare {
    pub bucket: RiskBucket,
    pub count: u64,
    pub percentage: f64,
    pub display: String,
}

/// Display-ready snapshot of the dashboard screen.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub status: ModelStatus,
    pub status_label: &'static str,
    pub total_employees: u64,
    pub avg_risk: String,
    pub buckets: Vec<BucketShare>,
    pub last_trained: Option<String>,
    pub test_auc: Option<String>,
    pub turnover_rate: Option<String>,
    pub state_count: Option<u32>,
}

impl DashboardSummary {
    pub fn from_metrics(metrics: &DashboardMetrics) -> Self {
        let buckets = RiskBucket::ALL
            .iter()
            .map(|bucket| {
                let percentage = risk_bucket_percentage(metrics, *bucket);
                BucketShare {
                    bucket: *bucket,
                    count: bucket.count(metrics),
                    percentage,
                    display: format_percentage(percentage / 100.0, 1),
                }
            })
            .collect();
        let performance = metrics.model_performance.as_ref();
        Self {
            status: metrics.model_status.clone(),
            status_label: status_label(&metrics.model_status),
            total_employees: metrics.total_employees,
            avg_risk: format_percentage(metrics.avg_risk, 1),
            buckets,
            last_trained: metrics.last_trained_at.as_ref().map(format_timestamp),
            test_auc: performance.map(|p| format!("{:.3}", p.test_auc)),
            turnover_rate: performance.map(|p| format_percentage(p.turnover_rate, 1)),
            state_count: performance.map(|p| p.state_count),
        }
    }

    pub fn bucket(&self, bucket: RiskBucket) -> Option<&BucketShare> {
        self.buckets.iter().find(|share| share.bucket == bucket)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionSummary {
    pub employee_id: u32,
    pub category: RiskCategory,
    pub presentation: RiskPresentation,
    pub risk: String,
    pub confidence: String,
}

impl PredictionSummary {
    pub fn from_prediction(prediction: &TurnoverPrediction) -> Self {
        Self {
            employee_id: prediction.employee_id,
            category: prediction.risk_category.clone(),
            presentation: risk_category_presentation(&prediction.risk_category),
            risk: format_percentage(prediction.risk, 1),
            confidence: format_percentage(prediction.confidence, 1),
        }
    }
}

/// Most severe category first, then highest risk.
pub fn sort_by_severity(predictions: &mut [TurnoverPrediction]) {
    predictions.sort_by(|a, b| {
        let rank_a = risk_category_presentation(&a.risk_category).severity_rank;
        let rank_b = risk_category_presentation(&b.risk_category).severity_rank;
        rank_b
            .cmp(&rank_a)
            .then_with(|| b.risk.partial_cmp(&a.risk).unwrap_or(Ordering::Equal))
    });
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureImportanceRow {
    pub rank: usize,
    pub feature: String,
    pub label: String,
    pub importance: f64,
    /// Importance relative to the top entry, in `[0, 1]`.
    pub relative: f64,
}

impl FeatureImportanceRow {
    /// Keeps the backend's order.
    pub fn from_entries(entries: &[FeatureImportance]) -> Vec<Self> {
        let values = entries.iter().map(|e| e.importance).collect::<Vec<_>>();
        entries
            .iter()
            .zip(relative_shares(&values))
            .enumerate()
            .map(|(idx, (entry, relative))| Self {
                rank: idx + 1,
                feature: entry.feature_key.clone(),
                label: translate_feature_label(&entry.feature_key).to_string(),
                importance: entry.importance,
                relative,
            })
            .collect()
    }
}
