#![allow(dead_code)]

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use turnover_dashboard::backend::HttpBackend;
use turnover_dashboard::config::BackendConfig;

pub async fn spawn_backend(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

pub fn client_for(base_url: &str) -> HttpBackend {
    HttpBackend::new(&BackendConfig {
        base_url: base_url.to_string(),
        timeout_secs: 5,
        connect_timeout_secs: 2,
        ..BackendConfig::default()
    })
    .expect("client")
}

/// A closed port: binding then dropping the listener frees it.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

#[derive(Debug, Deserialize)]
struct TopN {
    top_n: usize,
}

const FEATURES: [(&str, f64); 4] = [
    ("avg_engajamento", 0.31),
    ("satisfacao_media", 0.22),
    ("tempo_empresa", 0.12),
    ("idade", 0.05),
];

fn prediction_for(employee: &Value) -> Value {
    json!({
        "employee_id": employee["employee_id"],
        "desligamento_risk": 0.73,
        "risk_category": "Alto",
        "confidence": 0.88,
    })
}

/// Well-behaved backend mirroring the production payloads.
pub fn healthy_backend() -> Router {
    Router::new()
        .route(
            "/health",
            get(|| async { Json(json!({"status": "healthy", "service": "turnover-api"})) }),
        )
        .route(
            "/api/predict/single",
            post(|Json(employee): Json<Value>| async move { Json(prediction_for(&employee)) }),
        )
        .route(
            "/api/predict/desligamento",
            post(|Json(employees): Json<Vec<Value>>| async move {
                Json(employees.iter().map(prediction_for).collect::<Vec<_>>())
            }),
        )
        .route(
            "/api/analytics/dashboard",
            get(|| async {
                Json(json!({
                    "model_status": "trained",
                    "total_employees": 500,
                    "avg_desligamento_risk": 0.27,
                    "high_risk_count": 50,
                    "medium_risk_count": 150,
                    "low_risk_count": 300,
                    "last_trained": "2024-03-05T14:30:00.123456",
                    "model_performance": {
                        "test_auc": 0.8123,
                        "n_employees": 500,
                        "turnover_rate": 0.2,
                        "hmm_states": 3
                    }
                }))
            }),
        )
        .route(
            "/api/analytics/feature-importance",
            get(|Query(query): Query<TopN>| async move {
                Json(
                    FEATURES
                        .iter()
                        .take(query.top_n)
                        .map(|(feature, importance)| {
                            json!({"feature": feature, "importance": importance})
                        })
                        .collect::<Vec<_>>(),
                )
            }),
        )
        .route(
            "/api/train/models",
            post(|Json(_options): Json<Value>| async {
                Json(json!({
                    "status": "Models trained successfully",
                    "test_auc": 0.81,
                    "n_employees": 500,
                    "turnover_rate": 0.2,
                    "training_time": "2024-03-05T14:30:00"
                }))
            }),
        )
        .route(
            "/api/train/status",
            get(|| async {
                Json(json!({"status": "trained", "last_trained": "2024-03-05T14:30:00"}))
            }),
        )
        .route(
            "/api/data/generate",
            post(|Json(request): Json<Value>| async move {
                Json(json!({
                    "status": "Dataset generated",
                    "filepath": "data/employees_data.csv",
                    "n_employees": request["n_employees"],
                    "turnover_rate": 0.19,
                    "columns": ["employee_id", "idade"]
                }))
            }),
        )
}

/// Backend whose model has not been trained yet.
pub fn untrained_backend() -> Router {
    let not_trained = || async {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Models not trained. Call /api/train/models first"})),
        )
    };
    Router::new()
        .route("/api/predict/single", post(not_trained))
        .route("/api/analytics/feature-importance", get(not_trained))
        .route(
            "/api/analytics/dashboard",
            get(|| async {
                Json(json!({
                    "model_status": "not_trained",
                    "total_employees": 0,
                    "avg_desligamento_risk": 0.0,
                    "high_risk_count": 0,
                    "medium_risk_count": 0,
                    "low_risk_count": 0,
                    "last_trained": null,
                    "model_performance": {}
                }))
            }),
        )
}

/// Backend answering with bodies that do not match the contract.
pub fn broken_backend() -> Router {
    Router::new()
        .route(
            "/api/predict/single",
            post(|| async { Json(json!({"employee_id": 1, "desligamento_risk": 1.7})) }),
        )
        .route(
            "/api/predict/desligamento",
            post(|Json(employees): Json<Vec<Value>>| async move {
                Json(
                    employees
                        .iter()
                        .skip(1)
                        .map(prediction_for)
                        .collect::<Vec<_>>(),
                )
            }),
        )
        .route("/api/train/status", get(|| async { "<html>gateway</html>" }))
}
