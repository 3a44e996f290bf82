use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::backend::{
    check_batch_request, check_prediction_request, check_sample_request, check_top_n,
    check_training_options, ApiError, Conform, TurnoverBackend,
};
use crate::config::BackendConfig;
use crate::employee::EmployeeFeatures;
use crate::types::{
    DashboardMetrics, FeatureImportance, GeneratedDataset, HealthStatus, SampleDataRequest,
    TrainingAcknowledgment, TrainingOptions, TrainingStatus, TurnoverPrediction,
};

pub const TRAIN_MODELS_PATH: &str = "/api/train/models";
pub const TRAINING_STATUS_PATH: &str = "/api/train/status";
pub const BATCH_PREDICT_PATH: &str = "/api/predict/desligamento";
pub const SINGLE_PREDICT_PATH: &str = "/api/predict/single";
pub const FEATURE_IMPORTANCE_PATH: &str = "/api/analytics/feature-importance";
pub const DASHBOARD_PATH: &str = "/api/analytics/dashboard";
pub const GENERATE_DATA_PATH: &str = "/api/data/generate";
pub const HEALTH_PATH: &str = "/health";

const USER_AGENT: &str = concat!("turnover-dashboard/", env!("CARGO_PKG_VERSION"));
const ERROR_PREVIEW_CHARS: usize = 180;

/// reqwest implementation of [`TurnoverBackend`].
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
    training_timeout: Duration,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            training_timeout: Duration::from_secs(config.training_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T>(&self, request: RequestBuilder, path: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Conform,
    {
        debug!(endpoint = path, "issuing backend request");
        let response = request.send().await.map_err(|e| transport_error(path, &e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(path, &e))?;
        if !status.is_success() {
            let err = server_error(status, &body);
            warn!(endpoint = path, %status, "backend rejected request: {err}");
            return Err(err);
        }
        decode_body(path, &body)
    }
}

/// Parses and shape-checks a success body.
pub fn decode_body<T>(path: &str, body: &str) -> Result<T, ApiError>
where
    T: DeserializeOwned + Conform,
{
    let decoded = serde_json::from_str::<T>(body)
        .map_err(|e| e.to_string())
        .and_then(|value| value.conform().map(|_| value));
    decoded.map_err(|detail| {
        error!(endpoint = path, %detail, "response did not match the expected shape");
        ApiError::Decode {
            endpoint: path.to_string(),
            detail,
        }
    })
}

fn transport_error(path: &str, err: &reqwest::Error) -> ApiError {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    ApiError::Network(format!("{path} {kind}: {err}"))
}

/// Builds a server error, preferring FastAPI's `detail` field.
pub fn server_error(status: StatusCode, body: &str) -> ApiError {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").cloned())
        .map(|detail| match detail {
            serde_json::Value::String(text) => text,
            other => other.to_string(),
        });
    let message = match detail {
        Some(text) => text,
        None if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        None => body.chars().take(ERROR_PREVIEW_CHARS).collect(),
    };
    ApiError::Server {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl TurnoverBackend for HttpBackend {
    async fn request_prediction(
        &self,
        employee: &EmployeeFeatures,
    ) -> Result<TurnoverPrediction, ApiError> {
        check_prediction_request(employee)?;
        let request = self.client.post(self.url(SINGLE_PREDICT_PATH)).json(employee);
        self.send(request, SINGLE_PREDICT_PATH).await
    }

    async fn request_batch_prediction(
        &self,
        employees: &[EmployeeFeatures],
    ) -> Result<Vec<TurnoverPrediction>, ApiError> {
        check_batch_request(employees)?;
        let request = self.client.post(self.url(BATCH_PREDICT_PATH)).json(employees);
        let predictions: Vec<TurnoverPrediction> = self.send(request, BATCH_PREDICT_PATH).await?;
        if predictions.len() != employees.len() {
            let detail = format!(
                "expected {} predictions, received {}",
                employees.len(),
                predictions.len()
            );
            error!(endpoint = BATCH_PREDICT_PATH, %detail, "partial batch response");
            return Err(ApiError::Decode {
                endpoint: BATCH_PREDICT_PATH.to_string(),
                detail,
            });
        }
        Ok(predictions)
    }

    async fn fetch_dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError> {
        let request = self.client.get(self.url(DASHBOARD_PATH));
        self.send(request, DASHBOARD_PATH).await
    }

    async fn fetch_feature_importance(
        &self,
        top_n: u32,
    ) -> Result<Vec<FeatureImportance>, ApiError> {
        check_top_n(top_n)?;
        let request = self
            .client
            .get(self.url(FEATURE_IMPORTANCE_PATH))
            .query(&[("top_n", top_n)]);
        self.send(request, FEATURE_IMPORTANCE_PATH).await
    }

    async fn submit_training_job(
        &self,
        options: &TrainingOptions,
    ) -> Result<TrainingAcknowledgment, ApiError> {
        check_training_options(options)?;
        info!(
            employees = options.employee_count,
            months = options.month_count,
            synthetic = options.use_synthetic,
            "submitting training job"
        );
        let request = self
            .client
            .post(self.url(TRAIN_MODELS_PATH))
            .timeout(self.training_timeout)
            .json(options);
        self.send(request, TRAIN_MODELS_PATH).await
    }

    async fn fetch_training_status(&self) -> Result<TrainingStatus, ApiError> {
        let request = self.client.get(self.url(TRAINING_STATUS_PATH));
        self.send(request, TRAINING_STATUS_PATH).await
    }

    async fn generate_sample_data(
        &self,
        request: &SampleDataRequest,
    ) -> Result<GeneratedDataset, ApiError> {
        check_sample_request(request)?;
        let builder = self
            .client
            .post(self.url(GENERATE_DATA_PATH))
            .timeout(self.training_timeout)
            .json(request);
        self.send(builder, GENERATE_DATA_PATH).await
    }

    async fn health_check(&self) -> Result<HealthStatus, ApiError> {
        let request = self.client.get(self.url(HEALTH_PATH));
        self.send(request, HEALTH_PATH).await
    }
}
