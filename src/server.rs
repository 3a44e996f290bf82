use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::backend::{check_training_options, HttpBackend, TurnoverBackend};
use crate::config::Config;
use crate::employee::{DecodedForm, FieldError};
use crate::metrics::{DashboardSummary, FeatureImportanceRow, PredictionSummary};
use crate::types::{
    DashboardMetrics, TrainingAcknowledgment, TrainingOptions, TrainingStatus, TurnoverPrediction,
};
use crate::view::{Failure, FailureKind, ViewOrchestrator, ViewState};

/// Shared by every handler; each screen's state lives in the orchestrator.
#[derive(Clone)]
pub struct ApiState {
    views: Arc<ViewOrchestrator>,
    default_top_n: u32,
    training: TrainingOptions,
}

impl ApiState {
    pub fn new(views: Arc<ViewOrchestrator>, config: &Config) -> Self {
        Self {
            views,
            default_top_n: config.analytics.top_n,
            training: config.training.options(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

#[derive(Debug)]
struct ViewError {
    status: StatusCode,
    message: String,
    fields: Vec<FieldError>,
}

impl ViewError {
    fn unprocessable(failure: &Failure) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: failure.message.clone(),
            fields: failure.fields.clone(),
        }
    }
}

impl From<JsonRejection> for ViewError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            message: rejection.body_text(),
            fields: Vec::new(),
        }
    }
}

impl IntoResponse for ViewError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
            fields: self.fields,
        });
        (self.status, body).into_response()
    }
}

type ViewResult<T> = std::result::Result<Json<ApiResponse<T>>, ViewError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct DashboardView {
    metrics: DashboardMetrics,
    summary: DashboardSummary,
}

impl From<DashboardMetrics> for DashboardView {
    fn from(metrics: DashboardMetrics) -> Self {
        Self {
            summary: DashboardSummary::from_metrics(&metrics),
            metrics,
        }
    }
}

#[derive(Debug, Serialize)]
struct PredictionView {
    prediction: TurnoverPrediction,
    summary: PredictionSummary,
}

impl From<TurnoverPrediction> for PredictionView {
    fn from(prediction: TurnoverPrediction) -> Self {
        Self {
            summary: PredictionSummary::from_prediction(&prediction),
            prediction,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    top_n: Option<u32>,
}

/// Unset fields fall back to the configured training defaults.
#[derive(Debug, Clone, Default, Deserialize)]
struct TrainingRequest {
    use_synthetic: Option<bool>,
    #[serde(rename = "n_employees")]
    employee_count: Option<u32>,
    #[serde(rename = "n_months")]
    month_count: Option<u32>,
    filepath: Option<String>,
}

impl TrainingRequest {
    fn resolve(self, defaults: &TrainingOptions) -> TrainingOptions {
        TrainingOptions {
            use_synthetic: self.use_synthetic.unwrap_or(defaults.use_synthetic),
            employee_count: self.employee_count.unwrap_or(defaults.employee_count),
            month_count: self.month_count.unwrap_or(defaults.month_count),
            filepath: self.filepath.or_else(|| defaults.filepath.clone()),
        }
    }
}

pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/view/dashboard", get(dashboard))
        .route(
            "/view/prediction",
            get(current_prediction).post(predict).delete(clear_prediction),
        )
        .route("/view/analytics", get(analytics))
        .route("/view/training", get(current_training).post(submit_training))
        .route("/view/training/status", get(training_status))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let backend = HttpBackend::new(&config.backend).context("failed building backend client")?;
    info!(backend = backend.base_url(), "view server using backend");
    let backend: Arc<dyn TurnoverBackend> = Arc::new(backend);
    let state = ApiState::new(Arc::new(ViewOrchestrator::new(backend)), &config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed binding {bind}"))?;
    info!("view server listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn dashboard(State(state): State<ApiState>) -> ViewResult<ViewState<DashboardView>> {
    respond(state.views.load_dashboard().await.map(DashboardView::from))
}

async fn current_prediction(
    State(state): State<ApiState>,
) -> Json<ApiResponse<ViewState<PredictionView>>> {
    ok(state.views.prediction().map(PredictionView::from))
}

/// The body is read field by field; a wrongly typed value is one more field error.
async fn predict(
    State(state): State<ApiState>,
    body: std::result::Result<Json<Value>, JsonRejection>,
) -> ViewResult<ViewState<PredictionView>> {
    let Json(body) = body?;
    let decoded = DecodedForm::from_json(&body);
    respond(state.views.predict_decoded(&decoded).await.map(PredictionView::from))
}

async fn clear_prediction(
    State(state): State<ApiState>,
) -> Json<ApiResponse<ViewState<PredictionView>>> {
    state.views.clear_prediction();
    ok(state.views.prediction().map(PredictionView::from))
}

async fn analytics(
    State(state): State<ApiState>,
    Query(query): Query<AnalyticsQuery>,
) -> ViewResult<ViewState<Vec<FeatureImportanceRow>>> {
    let top_n = query.top_n.unwrap_or(state.default_top_n);
    let loaded = state.views.load_feature_importance(top_n).await;
    respond(loaded.map(|entries| FeatureImportanceRow::from_entries(&entries)))
}

async fn current_training(
    State(state): State<ApiState>,
) -> Json<ApiResponse<ViewState<TrainingAcknowledgment>>> {
    ok(state.views.training())
}

/// Accepts the job and returns at once; the browser polls the status route.
async fn submit_training(
    State(state): State<ApiState>,
    request: std::result::Result<Json<TrainingRequest>, JsonRejection>,
) -> std::result::Result<
    (StatusCode, Json<ApiResponse<ViewState<TrainingAcknowledgment>>>),
    ViewError,
> {
    let Json(request) = request?;
    let options = request.resolve(&state.training);
    if let Err(err) = check_training_options(&options) {
        return Err(ViewError::unprocessable(&Failure::from(&err)));
    }
    let accepted = Arc::clone(&state.views).start_training(options);
    Ok((StatusCode::ACCEPTED, ok(accepted)))
}

async fn training_status(State(state): State<ApiState>) -> ViewResult<ViewState<TrainingStatus>> {
    respond(state.views.refresh_training_status().await)
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

/// Local validation failures answer 422; every other outcome is a view state.
fn respond<T: Serialize>(view: ViewState<T>) -> ViewResult<ViewState<T>> {
    match view.failure() {
        Some(failure) if failure.kind == FailureKind::Validation => {
            Err(ViewError::unprocessable(failure))
        }
        _ => Ok(ok(view)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ApiError;
    use crate::employee::{Reason, ValidationErrors};

    #[test]
    fn validation_failures_become_422() {
        let failure = Failure::from(&ApiError::Validation(ValidationErrors::single(
            "top_n",
            Reason::OutOfRange,
        )));
        let err = respond::<u8>(ViewState::Failed { failure }).expect_err("rejected");
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.fields[0].field, "top_n");
    }

    #[test]
    fn backend_failures_stay_in_the_view_state() {
        let failure = Failure::from(&ApiError::Network("timed out".to_string()));
        let Json(body) = respond::<u8>(ViewState::Failed { failure }).expect("view state");
        assert!(body.ok);
        assert!(body.data.failure().is_some_and(|f| f.retryable));
    }

    #[test]
    fn training_request_falls_back_to_defaults() {
        let defaults = TrainingOptions::default();
        let resolved = TrainingRequest {
            employee_count: Some(800),
            ..TrainingRequest::default()
        }
        .resolve(&defaults);
        assert_eq!(resolved.employee_count, 800);
        assert_eq!(resolved.month_count, defaults.month_count);
        assert!(resolved.use_synthetic);
    }
}
