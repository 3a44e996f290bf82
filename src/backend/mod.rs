//! Typed boundary to the prediction backend.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::employee::validation::check_features;
use crate::employee::{EmployeeFeatures, FieldError, Reason, ValidationErrors};
use crate::types::{
    DashboardMetrics, FeatureImportance, GeneratedDataset, HealthStatus, ModelPerformance,
    ModelStatus, SampleDataRequest, TrainingAcknowledgment, TrainingOptions, TrainingStatus,
    TurnoverPrediction,
};

pub use http::HttpBackend;

pub const DEFAULT_TOP_N: u32 = 15;
pub const EMPLOYEE_COUNT_RANGE: (u32, u32) = (100, 2000);
pub const MONTH_COUNT_RANGE: (u32, u32) = (6, 24);

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("backend unreachable: {0}")]
    Network(String),
    #[error("backend returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from {endpoint}: {detail}")]
    Decode { endpoint: String, detail: String },
}

#[async_trait]
pub trait TurnoverBackend: Send + Sync {
    async fn request_prediction(
        &self,
        employee: &EmployeeFeatures,
    ) -> Result<TurnoverPrediction, ApiError>;

    /// All or nothing: the backend never returns a partial batch.
    async fn request_batch_prediction(
        &self,
        employees: &[EmployeeFeatures],
    ) -> Result<Vec<TurnoverPrediction>, ApiError>;

    async fn fetch_dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError>;

    /// Ordered by descending importance as returned by the backend.
    async fn fetch_feature_importance(
        &self,
        top_n: u32,
    ) -> Result<Vec<FeatureImportance>, ApiError>;

    async fn submit_training_job(
        &self,
        options: &TrainingOptions,
    ) -> Result<TrainingAcknowledgment, ApiError>;

    async fn fetch_training_status(&self) -> Result<TrainingStatus, ApiError>;

    async fn generate_sample_data(
        &self,
        request: &SampleDataRequest,
    ) -> Result<GeneratedDataset, ApiError>;

    async fn health_check(&self) -> Result<HealthStatus, ApiError>;
}

pub fn check_prediction_request(employee: &EmployeeFeatures) -> Result<(), ApiError> {
    check_features(employee).map_err(ApiError::from)
}

pub fn check_batch_request(employees: &[EmployeeFeatures]) -> Result<(), ApiError> {
    if employees.is_empty() {
        return Err(ValidationErrors::single("employees", Reason::Missing).into());
    }
    let mut errors = ValidationErrors::default();
    for (idx, employee) in employees.iter().enumerate() {
        if let Err(found) = check_features(employee) {
            errors.extend_prefixed(&format!("employees[{idx}]"), found);
        }
    }
    errors.into_result().map_err(ApiError::from)
}

pub fn check_top_n(top_n: u32) -> Result<(), ApiError> {
    if top_n == 0 {
        return Err(ValidationErrors::single("top_n", Reason::OutOfRange).into());
    }
    Ok(())
}

pub fn check_training_options(options: &TrainingOptions) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::default();
    let (min_employees, max_employees) = EMPLOYEE_COUNT_RANGE;
    if !(min_employees..=max_employees).contains(&options.employee_count) {
        errors.push(FieldError::new("n_employees", Reason::OutOfRange));
    }
    let (min_months, max_months) = MONTH_COUNT_RANGE;
    if !(min_months..=max_months).contains(&options.month_count) {
        errors.push(FieldError::new("n_months", Reason::OutOfRange));
    }
    let has_path = options
        .filepath
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    if !options.use_synthetic && !has_path {
        errors.push(FieldError::new("filepath", Reason::Missing));
    }
    errors.into_result().map_err(ApiError::from)
}

pub fn check_sample_request(request: &SampleDataRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrors::default();
    if request.employee_count == 0 {
        errors.push(FieldError::new("n_employees", Reason::OutOfRange));
    }
    if request.month_count == 0 {
        errors.push(FieldError::new("n_months", Reason::OutOfRange));
    }
    errors.into_result().map_err(ApiError::from)
}

/// Shape checks applied after decoding; a failure makes the whole response a decode error.
pub trait Conform {
    fn conform(&self) -> Result<(), String>;
}

fn unit_interval(name: &str, value: f64) -> Result<(), String> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(format!("{name} {value} outside [0, 1]"))
    }
}

impl Conform for TurnoverPrediction {
    fn conform(&self) -> Result<(), String> {
        unit_interval("desligamento_risk", self.risk)?;
        unit_interval("confidence", self.confidence)
    }
}

impl Conform for ModelPerformance {
    fn conform(&self) -> Result<(), String> {
        unit_interval("test_auc", self.test_auc)?;
        unit_interval("turnover_rate", self.turnover_rate)?;
        if self.state_count == 0 {
            return Err("hmm_states must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Conform for DashboardMetrics {
    fn conform(&self) -> Result<(), String> {
        unit_interval("avg_desligamento_risk", self.avg_risk)?;
        self.model_performance.as_ref().map_or(Ok(()), Conform::conform)
    }
}

impl Conform for FeatureImportance {
    fn conform(&self) -> Result<(), String> {
        if self.importance.is_finite() {
            Ok(())
        } else {
            Err(format!("importance of {} is not a number", self.feature_key))
        }
    }
}

impl Conform for TrainingStatus {
    fn conform(&self) -> Result<(), String> {
        self.metrics.as_ref().map_or(Ok(()), Conform::conform)
    }
}

impl Conform for TrainingAcknowledgment {
    fn conform(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Conform for GeneratedDataset {
    fn conform(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Conform for HealthStatus {
    fn conform(&self) -> Result<(), String> {
        Ok(())
    }
}

impl<T: Conform> Conform for Vec<T> {
    fn conform(&self) -> Result<(), String> {
        self.iter()
            .enumerate()
            .try_for_each(|(idx, item)| item.conform().map_err(|e| format!("item {idx}: {e}")))
    }
}

/// Polls until the model leaves `training` or `max_polls` is reached.
pub async fn poll_training_status(
    backend: &dyn TurnoverBackend,
    interval: Duration,
    max_polls: u32,
) -> Result<TrainingStatus, ApiError> {
    let max_polls = max_polls.max(1);
    let mut polls = 0;
    loop {
        let status = backend.fetch_training_status().await?;
        polls += 1;
        if status.status != ModelStatus::Training || polls >= max_polls {
            return Ok(status);
        }
        debug!(polls, "model still training");
        tokio::time::sleep(interval).await;
    }
}
