//! The view server routes, backed by the fake prediction service.

mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use turnover_dashboard::config::Config;
use turnover_dashboard::server::{build_router, ApiState};
use turnover_dashboard::view::ViewOrchestrator;

use common::{client_for, healthy_backend, spawn_backend, unreachable_url, untrained_backend};

async fn view_router(base_url: &str) -> Router {
    let backend = Arc::new(client_for(base_url));
    let views = Arc::new(ViewOrchestrator::new(backend));
    build_router(ApiState::new(views, &Config::default()))
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router dispatch");
    let status = response.status();
    let body = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    let payload = serde_json::from_slice(&body).expect("json");
    (status, payload)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn prediction_reaches_success_with_the_exact_record() {
    let router = view_router(&spawn_backend(healthy_backend()).await).await;
    let (status, payload) = call(
        &router,
        post_json(
            "/view/prediction",
            json!({
                "employee_id": 1, "idade": 30, "tempo_empresa": 24,
                "departamento": "Engineering", "nivel": "Pleno",
                "faixa_salarial": "Mid", "localizacao": "Híbrido",
                "promovido": 0, "aumento_salarial": 5.0, "manidader_change": 0,
                "treinamentos": 2, "avaliacao_performance": 3.5,
                "avg_engidadement": 3.2, "satisfacao_media": 3.1,
                "reconhecimento_medio": 3.0, "crescimento_medio": 2.8,
                "avg_manidader_rel": 3.4, "equilibrio_vida_trabalho_medio": 3.3
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let data = &payload["data"];
    assert_eq!(data["state"], "success");
    assert_eq!(data["data"]["prediction"]["desligamento_risk"], 0.73);
    assert_eq!(data["data"]["prediction"]["confidence"], 0.88);
    assert_eq!(data["data"]["summary"]["presentation"]["severity_rank"], 3);

    let (_, snapshot) = call(&router, get("/view/prediction")).await;
    assert_eq!(snapshot["data"]["state"], "success");

    let (status, cleared) = call(&router, delete("/view/prediction")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["data"]["state"], "idle");
}

#[tokio::test]
async fn mistyped_field_is_reported_with_the_others() {
    let router = view_router(&unreachable_url().await).await;
    let (status, payload) = call(
        &router,
        post_json("/view/prediction", json!({"idade": 30.5, "localizacao": "Marte"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["ok"], false);
    let fields = payload["fields"].as_array().expect("fields");
    assert_eq!(fields.len(), 18);
    assert_eq!(fields[1]["field"], "idade");
    assert_eq!(fields[1]["reason"], "OUT_OF_RANGE");
    assert!(fields
        .iter()
        .any(|f| f["field"] == "localizacao" && f["reason"] == "INVALID_ENUM_VALUE"));
}

#[tokio::test]
async fn malformed_body_answers_with_the_error_envelope() {
    let router = view_router(&unreachable_url().await).await;
    let request = Request::builder()
        .method("POST")
        .uri("/view/prediction")
        .header("content-type", "application/json")
        .body(Body::from("{\"idade\": "))
        .expect("request");
    let (status, payload) = call(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(payload["ok"], false);
    assert!(payload["error"].as_str().is_some_and(|e| !e.is_empty()));
}

#[tokio::test]
async fn invalid_form_answers_422_with_ordered_fields() {
    let router = view_router(&unreachable_url().await).await;
    let (status, payload) = call(
        &router,
        post_json("/view/prediction", json!({"idade": 17, "localizacao": "Marte"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(payload["ok"], false);
    let fields = payload["fields"].as_array().expect("fields");
    assert_eq!(fields[0]["field"], "employee_id");
    assert_eq!(fields[1]["field"], "idade");
    assert_eq!(fields[1]["reason"], "OUT_OF_RANGE");
    assert!(fields
        .iter()
        .any(|f| f["field"] == "localizacao" && f["reason"] == "INVALID_ENUM_VALUE"));
}

#[tokio::test]
async fn dashboard_view_carries_summary() {
    let router = view_router(&spawn_backend(healthy_backend()).await).await;
    let (status, payload) = call(&router, get("/view/dashboard")).await;
    assert_eq!(status, StatusCode::OK);
    let summary = &payload["data"]["data"]["summary"];
    assert_eq!(summary["status_label"], "Treinado");
    assert_eq!(summary["last_trained"], "05/03/2024 14:30:00");
    assert_eq!(summary["test_auc"], "0.812");
}

#[tokio::test]
async fn analytics_rows_are_ranked_and_labelled() {
    let router = view_router(&spawn_backend(healthy_backend()).await).await;
    let (status, payload) = call(&router, get("/view/analytics?top_n=3")).await;
    assert_eq!(status, StatusCode::OK);
    let rows = payload["data"]["data"].as_array().expect("rows");
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["rank"], 1);
    assert_eq!(rows[0]["label"], "Engajamento Médio");
    assert_eq!(rows[0]["relative"], 1.0);

    let (status, _) = call(&router, get("/view/analytics?top_n=0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn backend_failures_are_reported_inside_the_view_state() {
    let router = view_router(&spawn_backend(untrained_backend()).await).await;
    let (status, payload) = call(&router, get("/view/analytics")).await;
    assert_eq!(status, StatusCode::OK);
    let failure = &payload["data"]["failure"];
    assert_eq!(payload["data"]["state"], "failed");
    assert_eq!(failure["kind"], "server");
    assert_eq!(
        failure["message"],
        "Models not trained. Call /api/train/models first"
    );
    assert_eq!(failure["retryable"], false);

    let router = view_router(&unreachable_url().await).await;
    let (_, payload) = call(&router, get("/view/dashboard")).await;
    assert_eq!(payload["data"]["failure"]["kind"], "network");
    assert_eq!(payload["data"]["failure"]["retryable"], true);
}

#[tokio::test]
async fn training_is_accepted_then_observed_through_status() {
    let router = view_router(&spawn_backend(healthy_backend()).await).await;
    let (status, payload) = call(&router, post_json("/view/training", json!({}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(payload["data"]["state"], "loading");

    let (_, current) = call(&router, get("/view/training")).await;
    assert_ne!(current["data"]["state"], "idle");

    let (status, _) = call(
        &router,
        post_json("/view/training", json!({"n_employees": 5000})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, payload) = call(&router, get("/view/training/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["data"]["status"], "trained");
}

#[tokio::test]
async fn health_is_local() {
    let router = view_router(&unreachable_url().await).await;
    let (status, payload) = call(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["status"], "ok");
}
