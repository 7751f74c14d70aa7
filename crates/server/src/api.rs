//! HTTP API for predictions, history, health checks and Prometheus metrics

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    routing::post,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use strength_lib::{
    batch::{run_batch, template_csv, BatchTable},
    health::{ComponentStatus, HealthRegistry},
    history::{HistoryStore, DEFAULT_SESSION},
    observability::{StrengthMetrics, StructuredLogger},
    FeatureVector, GradeResult, InferenceEngine, InferenceStats, MixDesign, ModelMetrics,
    PredictionRecord, StrengthError,
};
use tracing::info;

/// Header carrying the caller's session id
pub const SESSION_HEADER: &str = "x-session-id";

/// Age used when a request leaves it out
const DEFAULT_AGE_DAYS: u32 = 28;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub history: Arc<HistoryStore>,
    pub health_registry: HealthRegistry,
    pub metrics: StrengthMetrics,
    pub logger: StructuredLogger,
    pub history_view_limit: usize,
}

impl AppState {
    pub fn new(
        engine: Arc<InferenceEngine>,
        history: Arc<HistoryStore>,
        health_registry: HealthRegistry,
        metrics: StrengthMetrics,
        logger: StructuredLogger,
        history_view_limit: usize,
    ) -> Self {
        Self {
            engine,
            history,
            health_registry,
            metrics,
            logger,
            history_view_limit,
        }
    }
}

/// Error body returned for rejected or failed requests
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub messages: Vec<String>,
}

/// Library error mapped onto an HTTP status
#[derive(Debug)]
pub struct ApiError(pub StrengthError);

impl From<StrengthError> for ApiError {
    fn from(err: StrengthError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StrengthError::Validation(_) | StrengthError::MissingColumns(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StrengthError::Table(_) => StatusCode::BAD_REQUEST,
            StrengthError::Inference(_) | StrengthError::ArtifactLoad(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            error: self.0.kind().to_string(),
            messages: self.0.messages(),
        };
        (status, Json(body)).into_response()
    }
}

/// Mix design as submitted by the dashboard form.
///
/// Blank material inputs count as zero so that validation, not the JSON
/// decoder, reports the missing required fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MixDesignInput {
    pub cement: Option<f64>,
    pub slag: Option<f64>,
    pub fly_ash: Option<f64>,
    pub water: Option<f64>,
    pub superplasticizer: Option<f64>,
    pub coarse_aggregate: Option<f64>,
    pub fine_aggregate: Option<f64>,
    pub age: Option<u32>,
}

impl From<MixDesignInput> for MixDesign {
    fn from(input: MixDesignInput) -> Self {
        Self {
            cement: input.cement.unwrap_or(0.0),
            slag: input.slag.unwrap_or(0.0),
            fly_ash: input.fly_ash.unwrap_or(0.0),
            water: input.water.unwrap_or(0.0),
            superplasticizer: input.superplasticizer.unwrap_or(0.0),
            coarse_aggregate: input.coarse_aggregate.unwrap_or(0.0),
            fine_aggregate: input.fine_aggregate.unwrap_or(0.0),
            age: input.age.unwrap_or(DEFAULT_AGE_DAYS),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: f64,
    pub grade: GradeResult,
    pub water_cement_ratio: f64,
    pub total_material: f64,
    pub age: u32,
    pub features: FeatureVector,
}

#[derive(Debug, Serialize)]
pub struct FeatureImpact {
    pub feature: String,
    pub coefficient: f64,
}

#[derive(Debug, Serialize)]
pub struct ModelInfoResponse {
    pub algorithm: String,
    pub schema: &'static str,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
    pub has_scaler: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<ModelMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_impact: Option<Vec<FeatureImpact>>,
    /// Engine counters since startup
    pub inference: InferenceStats,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub session: String,
    pub total: usize,
    pub records: Vec<PredictionRecord>,
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub session: String,
    pub removed: usize,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// `csv` returns the output table instead of JSON
    pub format: Option<String>,
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

/// Count and log a failed request before handing it to the caller
async fn reject(state: &AppState, err: StrengthError) -> ApiError {
    match &err {
        StrengthError::Inference(msg) => {
            state.metrics.inc_prediction_errors();
            state.logger.log_failure(msg);
            state
                .health_registry
                .record_prediction_failure(msg.clone())
                .await;
        }
        StrengthError::Validation(_) => {
            state.metrics.inc_validation_failures();
            state.logger.log_rejected(err.kind(), &err.messages());
        }
        _ => state.logger.log_rejected(err.kind(), &err.messages()),
    }
    ApiError(err)
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfoResponse> {
    let artifact = state.engine.artifact();
    let feature_names = if artifact.feature_names().is_empty() {
        artifact.schema().column_names()
    } else {
        artifact.feature_names().to_vec()
    };

    Json(ModelInfoResponse {
        algorithm: artifact.algorithm().to_string(),
        schema: artifact.schema().label(),
        feature_count: artifact.feature_count(),
        feature_names,
        has_scaler: artifact.has_scaler(),
        metrics: artifact.metrics().cloned(),
        feature_impact: artifact.feature_impact().map(|pairs| {
            pairs
                .into_iter()
                .map(|(feature, coefficient)| FeatureImpact {
                    feature,
                    coefficient,
                })
                .collect()
        }),
        inference: state.engine.stats(),
    })
}

async fn predict(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<MixDesignInput>,
) -> Result<Json<PredictResponse>, ApiError> {
    let session = session_id(&headers);
    let mix = MixDesign::from(input);

    let start = Instant::now();
    let assessment = match state.engine.assess(&mix) {
        Ok(a) => a,
        Err(e) => return Err(reject(&state, e).await),
    };
    state
        .metrics
        .observe_prediction_latency(start.elapsed().as_secs_f64());
    state.metrics.inc_predictions();
    state.health_registry.record_prediction_success().await;

    state
        .history
        .record(&session, PredictionRecord::new(mix, assessment.prediction));
    state
        .health_registry
        .record_history_usage(state.history.session_count(), state.history.max_sessions())
        .await;
    state.logger.log_prediction(
        &session,
        assessment.prediction,
        assessment.grade.code,
        assessment.water_cement_ratio,
    );

    Ok(Json(PredictResponse {
        prediction: assessment.prediction,
        grade: assessment.grade,
        water_cement_ratio: assessment.water_cement_ratio,
        total_material: assessment.total_material,
        age: mix.age,
        features: assessment.features,
    }))
}

async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BatchQuery>,
    body: String,
) -> Result<Response, ApiError> {
    let start = Instant::now();
    let outcome = match BatchTable::from_reader(body.as_bytes())
        .and_then(|table| run_batch(&state.engine, &table))
    {
        Ok(o) => o,
        Err(e) => return Err(reject(&state, e).await),
    };
    state
        .metrics
        .observe_prediction_latency(start.elapsed().as_secs_f64());
    state.metrics.observe_batch(outcome.rows.len());
    state.health_registry.record_prediction_success().await;

    let summary = &outcome.summary;
    state
        .logger
        .log_batch(summary.count, summary.mean, summary.min, summary.max);

    if query.format.as_deref() == Some("csv") {
        let csv = outcome.to_csv_string()?;
        return Ok((
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"strength_predictions.csv\"",
                ),
            ],
            csv,
        )
            .into_response());
    }

    Ok(Json(outcome).into_response())
}

async fn history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let session = session_id(&headers);
    let limit = query.limit.unwrap_or(state.history_view_limit);

    Json(HistoryResponse {
        total: state.history.len(&session),
        records: state.history.recent(&session, limit),
        session,
    })
}

async fn clear_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<ClearHistoryResponse> {
    let session = session_id(&headers);
    let removed = state.history.clear(&session);
    state
        .health_registry
        .record_history_usage(state.history.session_count(), state.history.max_sessions())
        .await;
    state.logger.log_history_cleared(&session, removed);

    Json(ClearHistoryResponse { session, removed })
}

async fn template() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"concrete_mix_template.csv\"",
            ),
        ],
        template_csv(),
    )
}

async fn example() -> Json<MixDesign> {
    Json(MixDesign::example())
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/v1/model", get(model_info))
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/predict/batch", post(predict_batch))
        .route("/api/v1/history", get(history).delete(clear_history))
        .route("/api/v1/template", get(template))
        .route("/api/v1/example", get(example))
        .with_state(state)
}

/// Start the API server, returning once `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
