use std::sync::{Arc, Mutex};

use tracing::info;

use crate::backend::{ApiError, TurnoverBackend};
use crate::employee::{validate, DecodedForm, EmployeeFeatures, EmployeeForm, ValidationErrors};
use crate::types::{
    DashboardMetrics, FeatureImportance, TrainingAcknowledgment, TrainingOptions,
    TrainingStatus, TurnoverPrediction,
};
use crate::view::{drive, finish, lock, ViewModel, ViewState};

/// Owns one [`ViewModel`] per screen and runs backend calls through them.
pub struct ViewOrchestrator {
    backend: Arc<dyn TurnoverBackend>,
    dashboard: Mutex<ViewModel<DashboardMetrics>>,
    prediction: Mutex<ViewModel<TurnoverPrediction>>,
    batch: Mutex<ViewModel<Vec<TurnoverPrediction>>>,
    analytics: Mutex<ViewModel<Vec<FeatureImportance>>>,
    training: Mutex<ViewModel<TrainingAcknowledgment>>,
    training_status: Mutex<ViewModel<TrainingStatus>>,
}

impl ViewOrchestrator {
    pub fn new(backend: Arc<dyn TurnoverBackend>) -> Self {
        Self {
            backend,
            dashboard: Mutex::new(ViewModel::new("dashboard")),
            prediction: Mutex::new(ViewModel::new("prediction")),
            batch: Mutex::new(ViewModel::new("batch")),
            analytics: Mutex::new(ViewModel::new("analytics")),
            training: Mutex::new(ViewModel::new("training")),
            training_status: Mutex::new(ViewModel::new("training_status")),
        }
    }

    pub async fn load_dashboard(&self) -> ViewState<DashboardMetrics> {
        drive(&self.dashboard, self.backend.fetch_dashboard_metrics()).await;
        self.dashboard()
    }

    /// Validates the form first; an invalid form never leaves the client.
    pub async fn predict(&self, form: &EmployeeForm) -> ViewState<TurnoverPrediction> {
        self.run_prediction(validate(form)).await
    }

    /// Same as [`Self::predict`], with mistyped fields reported alongside the rest.
    pub async fn predict_decoded(&self, decoded: &DecodedForm) -> ViewState<TurnoverPrediction> {
        self.run_prediction(decoded.validate()).await
    }

    async fn run_prediction(
        &self,
        checked: Result<EmployeeFeatures, ValidationErrors>,
    ) -> ViewState<TurnoverPrediction> {
        match checked {
            Ok(features) => {
                drive(&self.prediction, self.backend.request_prediction(&features)).await;
            }
            Err(errors) => lock(&self.prediction).fail_locally(ApiError::Validation(errors)),
        }
        self.prediction()
    }

    pub async fn predict_batch(
        &self,
        forms: &[EmployeeForm],
    ) -> ViewState<Vec<TurnoverPrediction>> {
        let mut employees = Vec::with_capacity(forms.len());
        let mut errors = ValidationErrors::default();
        for (idx, form) in forms.iter().enumerate() {
            match validate(form) {
                Ok(features) => employees.push(features),
                Err(found) => errors.extend_prefixed(&format!("employees[{idx}]"), found),
            }
        }
        if errors.is_empty() {
            drive(&self.batch, self.backend.request_batch_prediction(&employees)).await;
        } else {
            lock(&self.batch).fail_locally(ApiError::Validation(errors));
        }
        self.batch()
    }

    pub async fn load_feature_importance(
        &self,
        top_n: u32,
    ) -> ViewState<Vec<FeatureImportance>> {
        drive(&self.analytics, self.backend.fetch_feature_importance(top_n)).await;
        self.analytics()
    }

    /// Submits training and returns once the backend accepts it; progress is
    /// observed with [`Self::refresh_training_status`].
    pub async fn submit_training(
        &self,
        options: &TrainingOptions,
    ) -> ViewState<TrainingAcknowledgment> {
        info!(employees = options.employee_count, "training requested");
        drive(&self.training, self.backend.submit_training_job(options)).await;
        self.training()
    }

    /// Puts the training screen into `Loading` before returning and settles it
    /// from a background task.
    pub fn start_training(
        self: Arc<Self>,
        options: TrainingOptions,
    ) -> ViewState<TrainingAcknowledgment> {
        info!(employees = options.employee_count, "training requested");
        let ticket = lock(&self.training).begin();
        let state = self.training();
        tokio::spawn(async move {
            let submitted = self.backend.submit_training_job(&options);
            finish(&self.training, ticket, submitted).await;
        });
        state
    }

    pub async fn refresh_training_status(&self) -> ViewState<TrainingStatus> {
        drive(&self.training_status, self.backend.fetch_training_status()).await;
        self.training_status()
    }

    pub fn backend(&self) -> &dyn TurnoverBackend {
        self.backend.as_ref()
    }

    pub fn clear_prediction(&self) {
        lock(&self.prediction).clear();
    }

    pub fn dashboard(&self) -> ViewState<DashboardMetrics> {
        lock(&self.dashboard).state().clone()
    }

    pub fn prediction(&self) -> ViewState<TurnoverPrediction> {
        lock(&self.prediction).state().clone()
    }

    pub fn batch(&self) -> ViewState<Vec<TurnoverPrediction>> {
        lock(&self.batch).state().clone()
    }

    pub fn analytics(&self) -> ViewState<Vec<FeatureImportance>> {
        lock(&self.analytics).state().clone()
    }

    pub fn training(&self) -> ViewState<TrainingAcknowledgment> {
        lock(&self.training).state().clone()
    }

    pub fn training_status(&self) -> ViewState<TrainingStatus> {
        lock(&self.training_status).state().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::employee::{EmployeeFeatures, Reason};
    use crate::metrics::risk_category_presentation;
    use crate::types::{
        GeneratedDataset, HealthStatus, ModelStatus, RiskCategory, SampleDataRequest,
    };
    use crate::view::FailureKind;

    #[derive(Default)]
    struct CountingBackend {
        predictions: AtomicUsize,
    }

    #[async_trait]
    impl TurnoverBackend for CountingBackend {
        async fn request_prediction(
            &self,
            employee: &EmployeeFeatures,
        ) -> Result<TurnoverPrediction, ApiError> {
            self.predictions.fetch_add(1, Ordering::SeqCst);
            Ok(TurnoverPrediction {
                employee_id: employee.employee_id,
                risk: 0.73,
                risk_category: RiskCategory::High,
                confidence: 0.88,
            })
        }

        async fn request_batch_prediction(
            &self,
            employees: &[EmployeeFeatures],
        ) -> Result<Vec<TurnoverPrediction>, ApiError> {
            Ok(employees
                .iter()
                .map(|e| TurnoverPrediction {
                    employee_id: e.employee_id,
                    risk: 0.1,
                    risk_category: RiskCategory::Low,
                    confidence: 0.9,
                })
                .collect())
        }

        async fn fetch_dashboard_metrics(&self) -> Result<DashboardMetrics, ApiError> {
            Err(ApiError::Network("connection refused".to_string()))
        }

        async fn fetch_feature_importance(
            &self,
            _top_n: u32,
        ) -> Result<Vec<FeatureImportance>, ApiError> {
            Err(ApiError::Server {
                status: 400,
                message: "Model not trained".to_string(),
            })
        }

        async fn submit_training_job(
            &self,
            _options: &TrainingOptions,
        ) -> Result<TrainingAcknowledgment, ApiError> {
            Ok(TrainingAcknowledgment {
                status: "Models trained successfully".to_string(),
                test_auc: Some(0.81),
                employee_count: Some(500),
                turnover_rate: Some(0.2),
                training_time: None,
            })
        }

        async fn fetch_training_status(&self) -> Result<TrainingStatus, ApiError> {
            Ok(TrainingStatus {
                status: ModelStatus::Trained,
                progress: None,
                last_trained: None,
                metrics: None,
            })
        }

        async fn generate_sample_data(
            &self,
            _request: &SampleDataRequest,
        ) -> Result<GeneratedDataset, ApiError> {
            unimplemented!()
        }

        async fn health_check(&self) -> Result<HealthStatus, ApiError> {
            unimplemented!()
        }
    }

    fn orchestrator() -> (Arc<CountingBackend>, ViewOrchestrator) {
        let backend = Arc::new(CountingBackend::default());
        let views = ViewOrchestrator::new(backend.clone());
        (backend, views)
    }

    #[tokio::test]
    async fn valid_form_reaches_success() {
        let (backend, views) = orchestrator();
        let state = views.predict(&EmployeeForm::sample()).await;
        assert_eq!(
            state,
            ViewState::Success {
                data: TurnoverPrediction {
                    employee_id: 1,
                    risk: 0.73,
                    risk_category: RiskCategory::High,
                    confidence: 0.88,
                }
            }
        );
        assert_eq!(backend.predictions.load(Ordering::SeqCst), 1);

        let rank = |c: RiskCategory| risk_category_presentation(&c).severity_rank;
        assert!(rank(RiskCategory::High) > rank(RiskCategory::Medium));
        assert!(rank(RiskCategory::High) > rank(RiskCategory::Low));
    }

    #[tokio::test]
    async fn invalid_form_never_calls_the_backend() {
        let (backend, views) = orchestrator();
        let form = EmployeeForm {
            age: Some(17),
            ..EmployeeForm::sample()
        };
        let state = views.predict(&form).await;
        let failure = state.failure().expect("failed");
        assert_eq!(failure.kind, FailureKind::Validation);
        assert_eq!(failure.fields[0].reason, Reason::OutOfRange);
        assert_eq!(backend.predictions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failures_map_to_failed_states() {
        let (_, views) = orchestrator();
        let dashboard = views.load_dashboard().await;
        assert!(dashboard.failure().expect("failed").retryable);
        let analytics = views.load_feature_importance(15).await;
        assert_eq!(
            analytics.failure().map(|f| f.message.as_str()),
            Some("Model not trained")
        );
    }

    #[tokio::test]
    async fn batch_reports_indexed_form_errors() {
        let (_, views) = orchestrator();
        let forms = vec![
            EmployeeForm::sample(),
            EmployeeForm {
                location: Some("Marte".to_string()),
                ..EmployeeForm::sample()
            },
        ];
        let state = views.predict_batch(&forms).await;
        let failure = state.failure().expect("failed");
        assert_eq!(failure.fields[0].field, "employees[1].localizacao");

        let state = views.predict_batch(&forms[..1]).await;
        assert_eq!(state.data().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn training_is_acknowledged_then_polled() {
        let (_, views) = orchestrator();
        assert!(views.submit_training(&TrainingOptions::default()).await.data().is_some());
        let status = views.refresh_training_status().await;
        assert_eq!(status.data().map(|s| &s.status), Some(&ModelStatus::Trained));
    }

    #[tokio::test]
    async fn started_training_is_loading_until_settled() {
        let (_, views) = orchestrator();
        let views = Arc::new(views);
        let state = Arc::clone(&views).start_training(TrainingOptions::default());
        assert!(state.is_loading());
        assert!(views.training().is_loading());
        for _ in 0..50 {
            if !views.training().is_loading() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(
            views.training().data().map(|ack| ack.employee_count),
            Some(Some(500))
        );
    }

    #[tokio::test]
    async fn mistyped_body_fails_without_a_request() {
        let (backend, views) = orchestrator();
        let mut body = serde_json::to_value(EmployeeForm::sample()).expect("serialize");
        body["idade"] = serde_json::json!("trinta");
        let state = views.predict_decoded(&DecodedForm::from_json(&body)).await;
        let failure = state.failure().expect("failed");
        assert_eq!(failure.fields[0].field, "idade");
        assert_eq!(failure.fields[0].reason, Reason::OutOfRange);
        assert_eq!(backend.predictions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn clearing_resets_prediction() {
        let (_, views) = orchestrator();
        views.predict(&EmployeeForm::sample()).await;
        views.clear_prediction();
        assert_eq!(views.prediction(), ViewState::Idle);
    }
}
