//! Integration tests for the prediction API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use strength_lib::{
    artifact::{LinearRegressor, ModelArtifact, ModelMetrics},
    health::HealthRegistry,
    history::HistoryStore,
    observability::{StrengthMetrics, StructuredLogger},
    predictor::{FeatureMatrix, Regressor},
    InferenceEngine,
};
use strength_server::api::{create_router, AppState, SESSION_HEADER};
use tower::ServiceExt;

const BATCH_HEADER: &str =
    "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate,Age";

struct FailingModel;

impl Regressor for FailingModel {
    fn predict(&self, _features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        anyhow::bail!("model exploded")
    }

    fn algorithm(&self) -> &str {
        "Failing"
    }
}

/// Linear in cement, but fails whenever a mix uses exactly 150 kg/m³
struct CementGuardModel;

impl Regressor for CementGuardModel {
    fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        if features.rows().iter().any(|row| row[0] == 150.0) {
            anyhow::bail!("solver diverged");
        }
        Ok(features.rows().iter().map(|row| row[0] * 0.1).collect())
    }

    fn algorithm(&self) -> &str {
        "CementGuard"
    }
}

/// Strength is a tenth of the cement content
fn cement_artifact() -> ModelArtifact {
    let mut coefficients = vec![0.0; 11];
    coefficients[0] = 0.1;
    ModelArtifact::new(
        Box::new(LinearRegressor {
            coefficients,
            intercept: 0.0,
        }),
        None,
        Vec::new(),
        Some(ModelMetrics {
            r2: Some(0.91),
            rmse: Some(5.2),
            mae: Some(3.9),
        }),
    )
    .unwrap()
}

fn build_state(
    artifact: ModelArtifact,
    health_registry: HealthRegistry,
    max_sessions: usize,
) -> Arc<AppState> {
    Arc::new(AppState::new(
        Arc::new(InferenceEngine::new(Arc::new(artifact))),
        Arc::new(HistoryStore::new(100, max_sessions)),
        health_registry,
        StrengthMetrics::new(),
        StructuredLogger::new("test-instance"),
        10,
    ))
}

async fn setup_app_with_sessions(
    artifact: ModelArtifact,
    max_sessions: usize,
) -> (Router, Arc<AppState>) {
    let health_registry = HealthRegistry::new();
    health_registry
        .record_artifact_loaded("LinearRegression (default schema)")
        .await;
    let state = build_state(artifact, health_registry, max_sessions);
    (create_router(state.clone()), state)
}

async fn setup_app(artifact: ModelArtifact) -> (Router, Arc<AppState>) {
    setup_app_with_sessions(artifact, 100).await
}

async fn setup_test_app() -> (Router, Arc<AppState>) {
    setup_app(cement_artifact()).await
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, session: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .header(SESSION_HEADER, session)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_csv(uri: &str, csv: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "text/csv")
        .body(Body::from(csv.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

fn example_mix() -> serde_json::Value {
    serde_json::json!({
        "cement": 540.0,
        "slag": 0.0,
        "fly_ash": 0.0,
        "water": 162.0,
        "superplasticizer": 2.5,
        "coarse_aggregate": 1040.0,
        "fine_aggregate": 676.0,
        "age": 28
    })
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["artifact"].is_object());
    assert!(health["components"]["history"].is_object());
}

#[tokio::test]
async fn test_healthz_returns_503_before_artifact_loaded() {
    let state = build_state(cement_artifact(), HealthRegistry::new(), 100);
    let app = create_router(state);

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let health = body_json(response).await;
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(health["components"]["artifact"]["status"], "unhealthy");
}

#[tokio::test]
async fn test_predictor_health_recovers_after_successful_prediction() {
    let (app, _state) = setup_app(ModelArtifact::bare(Box::new(CementGuardModel))).await;
    let mut failing = example_mix();
    failing["cement"] = serde_json::json!(150.0);

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/predict", "s5", failing))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let health = body_json(app.clone().oneshot(get("/healthz")).await.unwrap()).await;
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["predictor"]["status"], "degraded");

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/predict", "s5", example_mix()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let health = body_json(response).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["components"]["predictor"]["status"], "healthy");
}

#[tokio::test]
async fn test_repeated_inference_failures_fail_readiness() {
    let (app, state) = setup_app(ModelArtifact::bare(Box::new(FailingModel))).await;
    state.health_registry.set_ready(true).await;

    for _ in 0..strength_lib::health::UNHEALTHY_AFTER_FAILURES {
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/predict", "s6", example_mix()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body_json(response).await["reason"],
        "Critical component unhealthy"
    );
}

#[tokio::test]
async fn test_readyz_follows_initialization() {
    let (app, state) = setup_test_app().await;

    let response = app.clone().oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["ready"], false);

    state.health_registry.set_ready(true).await;
    let response = app.oneshot(get("/readyz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_predict_example_mix() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json("/api/v1/predict", "s1", example_mix()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["prediction"], 54.0);
    assert_eq!(body["grade"]["code"], "K-400+");
    assert_eq!(body["grade"]["severity"], "ultra");
    assert!((body["water_cement_ratio"].as_f64().unwrap() - 0.3).abs() < 1e-12);
    assert_eq!(body["total_material"], 2420.5);
    assert_eq!(body["age"], 28);
    assert_eq!(body["features"]["total_binder"], 540.0);
}

#[tokio::test]
async fn test_predict_rejects_low_cement() {
    let (app, state) = setup_test_app().await;
    let mut mix = example_mix();
    mix["cement"] = serde_json::json!(50.0);

    let response = app
        .oneshot(post_json("/api/v1/predict", "s2", mix))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "validation");
    assert_eq!(
        body["messages"],
        serde_json::json!(["Cement too low - expected 100-540 kg/m³."])
    );
    assert_eq!(state.history.len("s2"), 0);
}

#[tokio::test]
async fn test_predict_missing_required_fields() {
    let (app, _state) = setup_test_app().await;

    let response = app
        .oneshot(post_json(
            "/api/v1/predict",
            "s3",
            serde_json::json!({ "slag": 100.0, "age": 7 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(
        body["messages"][0],
        "Cement, Water, Coarse Aggregate, and Fine Aggregate are required."
    );
}

#[tokio::test]
async fn test_predict_inference_failure_is_500() {
    let (app, state) = setup_app(ModelArtifact::bare(Box::new(FailingModel))).await;

    let response = app
        .oneshot(post_json("/api/v1/predict", "s4", example_mix()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["error"], "inference");
    assert!(body["messages"][0]
        .as_str()
        .unwrap()
        .starts_with("Prediction error:"));
    assert_eq!(state.history.len("s4"), 0);
}

#[tokio::test]
async fn test_history_is_session_scoped() {
    let (app, state) = setup_test_app().await;

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/predict", "alice", example_mix()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/history?limit=2")
                .header(SESSION_HEADER, "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total"], 3);
    assert_eq!(body["records"].as_array().unwrap().len(), 2);
    assert_eq!(body["records"][0]["prediction"], 54.0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/history")
                .header(SESSION_HEADER, "bob")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 0);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/history")
                .header(SESSION_HEADER, "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["removed"], 3);
    assert_eq!(state.history.session_count(), 0);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/history")
                .header(SESSION_HEADER, "alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["total"], 0);
}

#[tokio::test]
async fn test_batch_predictions_and_summary() {
    let (app, _state) = setup_test_app().await;
    let csv = format!(
        "{}\n300,0,0,180,0,950,750,28\n150,0,0,180,0,950,750,28\n",
        BATCH_HEADER.to_uppercase()
    );

    let response = app
        .oneshot(post_csv("/api/v1/predict/batch", &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);
    assert_eq!(body["rows"][0]["prediction"], 30.0);
    assert_eq!(body["rows"][0]["grade"]["code"], "K-300");
    assert_eq!(body["rows"][1]["grade"]["code"], "K-175");
    assert_eq!(body["summary"]["count"], 2);
    assert_eq!(body["summary"]["mean"], 22.5);
    assert_eq!(body["headers"][0], "Cement");
}

#[tokio::test]
async fn test_batch_csv_download() {
    let (app, _state) = setup_test_app().await;
    let csv = format!("{}\n300,0,0,150,0,950,750,28\n", BATCH_HEADER);

    let response = app
        .oneshot(post_csv("/api/v1/predict/batch?format=csv", &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = body_text(response).await;
    let mut lines = text.lines();
    assert!(lines
        .next()
        .unwrap()
        .ends_with("Predicted Strength (MPa),Grade,W/C Ratio"));
    assert_eq!(lines.next().unwrap(), "300,0,0,150,0,950,750,28,30,K-300,0.5");
}

#[tokio::test]
async fn test_batch_missing_columns_is_422() {
    let (app, _state) = setup_test_app().await;
    let csv = "Cement,Blast Furnace Slag,Fly Ash,Water,Superplasticizer,Coarse Aggregate,Fine Aggregate\n\
               300,0,0,180,0,950,750\n";

    let response = app
        .oneshot(post_csv("/api/v1/predict/batch", csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_json(response).await;
    assert_eq!(body["error"], "missing_columns");
    assert_eq!(body["messages"], serde_json::json!(["Missing column: Age"]));
}

#[tokio::test]
async fn test_batch_bad_cell_is_400() {
    let (app, _state) = setup_test_app().await;
    let csv = format!("{}\n300,0,0,180,0,950,abc,28\n", BATCH_HEADER);

    let response = app
        .oneshot(post_csv("/api/v1/predict/batch", &csv))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "table");
}

#[tokio::test]
async fn test_model_info_reports_feature_impact() {
    let (app, _state) = setup_test_app().await;

    let response = app.oneshot(get("/api/v1/model")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["algorithm"], "LinearRegression");
    assert_eq!(body["schema"], "default");
    assert_eq!(body["feature_count"], 11);
    assert_eq!(body["metrics"]["r2"], 0.91);
    let impact = body["feature_impact"].as_array().unwrap();
    assert_eq!(impact.len(), 8);
    assert_eq!(impact[0]["feature"], "Cement");
    assert_eq!(impact[0]["coefficient"], 0.1);
    assert_eq!(body["inference"]["total_inferences"], 0);
}

#[tokio::test]
async fn test_model_info_reports_inference_counters() {
    let (app, _state) = setup_app(ModelArtifact::bare(Box::new(CementGuardModel))).await;
    let mut failing = example_mix();
    failing["cement"] = serde_json::json!(150.0);

    for mix in [example_mix(), example_mix(), failing] {
        app.clone()
            .oneshot(post_json("/api/v1/predict", "s7", mix))
            .await
            .unwrap();
    }

    let body = body_json(app.oneshot(get("/api/v1/model")).await.unwrap()).await;
    assert_eq!(body["inference"]["total_inferences"], 3);
    assert_eq!(body["inference"]["failed_inferences"], 1);
}

#[tokio::test]
async fn test_history_sessions_are_capped() {
    let (app, state) = setup_app_with_sessions(cement_artifact(), 2).await;

    for session in ["alice", "bob", "carol"] {
        let response = app
            .clone()
            .oneshot(post_json("/api/v1/predict", session, example_mix()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
    assert_eq!(state.history.session_count(), 2);
    assert_eq!(state.history.len("alice"), 0);

    let health = body_json(app.oneshot(get("/healthz")).await.unwrap()).await;
    assert_eq!(health["components"]["history"]["status"], "degraded");
}

#[tokio::test]
async fn test_template_and_example() {
    let (app, _state) = setup_test_app().await;

    let response = app.clone().oneshot(get("/api/v1/template")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/csv"));
    let text = body_text(response).await;
    assert_eq!(text.lines().next().unwrap(), BATCH_HEADER);
    assert_eq!(text.lines().count(), 4);

    let response = app.oneshot(get("/api/v1/example")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["cement"], 540.0);
    assert_eq!(body["superplasticizer"], 2.5);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, state) = setup_test_app().await;

    let response = app
        .clone()
        .oneshot(post_json("/api/v1/predict", "metrics", example_mix()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    state.metrics.set_model_info("LinearRegression", "default");

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let metrics_text = body_text(response).await;
    assert!(metrics_text.contains("concreteiq_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("concreteiq_predictions_total"));
    assert!(metrics_text.contains("concreteiq_model_info"));
}
