//! HTTP server exposing the prediction pipeline to external clients.
//!
//! This module provides an HTTP server that:
//! - Runs the full pipeline via POST /predict (calendar + symptoms +
//!   external predictions -> reconciled window + quality assessment)
//! - Normalizes raw CSV exports via POST /import
//! - Emits data-quality insights via POST /insights
//!
//! Requests may carry a shared secret in the `x-api-key` header; when no
//! secrets are configured every request is admitted. All endpoints answer
//! CORS preflight.

use crate::config::Config;
use crate::import::{infer_cycles, parse_csv, rows_to_observations, validate_structure};
use crate::insights::{analyze, DataInsights};
use crate::model::{Cycle, Observation, Prediction, Source, SourceWeights};
use crate::predict::{predict_from_calendar, predict_from_symptoms, CalendarParams, SymptomOptions};
use crate::reconcile::{
    assess_quality, reconcile, QualityAssessment, ReconcileOptions, ReconciledPrediction,
};
use crate::store::RecordStore;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};

/// Header carrying the optional shared secret.
const API_KEY_HEADER: &str = "x-api-key";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Accepted shared secrets; empty admits everything
    pub shared_secrets: Vec<String>,
    /// Source-weight overrides for the reconciler
    pub source_weights: SourceWeights,
}

impl ServerConfig {
    pub fn new(port: u16, shared_secrets: Vec<String>, source_weights: SourceWeights) -> Self {
        Self {
            port,
            shared_secrets,
            source_weights,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.port,
            config.shared_secrets.clone(),
            config.source_weights.clone(),
        )
    }
}

/// Shared server state
pub struct ServerState {
    /// Session-durable record store
    store: RwLock<RecordStore>,
    /// Source-weight overrides
    source_weights: SourceWeights,
    /// Accepted shared secrets
    shared_secrets: Vec<String>,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            store: RwLock::new(RecordStore::new()),
            source_weights: config.source_weights.clone(),
            shared_secrets: config.shared_secrets.clone(),
        }
    }
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: code.to_string(),
        }),
    )
}

/// Reject the request unless it carries a configured secret. A server
/// with no secrets admits everything.
fn authorize(headers: &HeaderMap, shared_secrets: &[String]) -> Result<(), HandlerError> {
    if shared_secrets.is_empty() {
        return Ok(());
    }
    let supplied = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    match supplied {
        Some(key) if shared_secrets.iter().any(|secret| secret == key) => Ok(()),
        _ => Err(error_response(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "missing or invalid api key",
        )),
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// An externally produced prediction on the wire; identifiers and
/// timestamps are minted on arrival.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPrediction {
    pub source: Source,
    pub fertile_start: NaiveDate,
    pub fertile_end: NaiveDate,
    #[serde(default)]
    pub ovulation_date: Option<NaiveDate>,
    /// Defaults to 50 when the source reports none
    #[serde(default)]
    pub confidence: Option<u8>,
}

impl ExternalPrediction {
    fn into_prediction(self, now: chrono::DateTime<Utc>) -> Prediction {
        Prediction::new(
            self.source,
            self.fertile_start,
            self.fertile_end,
            self.ovulation_date,
            self.confidence.unwrap_or(50),
            now,
        )
    }
}

/// Request body for POST /predict
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub current_cycle_start: NaiveDate,
    /// Falls back to the stored cycle history when absent
    #[serde(default)]
    pub historical_cycles: Option<Vec<Cycle>>,
    /// Falls back to the stored observations when absent
    #[serde(default)]
    pub observations: Option<Vec<Observation>>,
    #[serde(default)]
    pub external_predictions: Vec<ExternalPrediction>,
}

/// Response from POST /predict
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<ReconciledPrediction>,
    pub quality: QualityAssessment,
}

/// POST /predict
///
/// Runs the calendar and symptom predictors over the supplied data, fuses
/// them with any external predictions, and scores the input quality.
async fn predict(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, HandlerError> {
    authorize(&headers, &state.shared_secrets)?;
    let now = Utc::now();

    let (history, observations) = {
        let store = state.store.read().await;
        let history = request
            .historical_cycles
            .unwrap_or_else(|| store.cycles());
        let observations = request
            .observations
            .unwrap_or_else(|| store.observations());
        (history, observations)
    };

    let external: Vec<Prediction> = request
        .external_predictions
        .into_iter()
        .map(|p| p.into_prediction(now))
        .collect();

    let mut predictions = Vec::new();
    predictions.push(predict_from_calendar(
        request.current_cycle_start,
        &history,
        &CalendarParams::default(),
        now,
    ));
    if let Some(symptom_prediction) =
        predict_from_symptoms(&observations, &SymptomOptions::default(), now)
    {
        predictions.push(symptom_prediction);
    }
    predictions.extend(external.iter().cloned());

    let quality = assess_quality(&history, &observations, &external);
    let prediction = reconcile(
        &predictions,
        &state.source_weights,
        &ReconcileOptions::default(),
    );

    tracing::info!(
        inputs = predictions.len(),
        reconciled = prediction.is_some(),
        "prediction request served"
    );

    Ok(Json(PredictResponse {
        prediction,
        quality,
    }))
}

/// Response from POST /import
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub success: bool,
    pub observations: Vec<Observation>,
    pub inferred_cycles: Vec<Cycle>,
    pub errors: Vec<crate::import::ImportIssue>,
    pub warnings: Vec<crate::import::ImportIssue>,
    pub validation: crate::import::StructureValidation,
}

/// POST /import
///
/// Accepts raw CSV text, normalizes it into observations, infers cycles
/// from observation gaps, and stores both. A missing date column fails
/// the whole request; row-level failures drop only their row.
async fn import(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<ImportResponse>, HandlerError> {
    authorize(&headers, &state.shared_secrets)?;

    let validation = validate_structure(&body);
    if !validation.valid {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "MISSING_DATE_COLUMN",
            "no date column found in CSV header",
        ));
    }

    let result = parse_csv(&body);
    let now = Utc::now();
    let observations = rows_to_observations(&result.rows, now);
    let inferred_cycles = infer_cycles(&observations, now);

    {
        let mut store = state.store.write().await;
        for observation in &observations {
            store.upsert_observation(observation.clone());
        }
        for cycle in &inferred_cycles {
            store.upsert_cycle(cycle.clone());
        }
    }

    tracing::info!(
        rows = result.rows.len(),
        observations = observations.len(),
        cycles = inferred_cycles.len(),
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        "csv import processed"
    );

    Ok(Json(ImportResponse {
        success: result.success,
        observations,
        inferred_cycles,
        errors: result.errors,
        warnings: result.warnings,
        validation,
    }))
}

/// Request body for POST /insights
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsRequest {
    /// Falls back to the stored cycle history when absent
    #[serde(default)]
    pub cycles: Option<Vec<Cycle>>,
    /// Falls back to the stored observations when absent
    #[serde(default)]
    pub observations: Option<Vec<Observation>>,
}

/// POST /insights
async fn insights(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<InsightsRequest>,
) -> Result<Json<DataInsights>, HandlerError> {
    authorize(&headers, &state.shared_secrets)?;

    let (cycles, observations) = {
        let store = state.store.read().await;
        let cycles = request.cycles.unwrap_or_else(|| store.cycles());
        let observations = request.observations.unwrap_or_else(|| store.observations());
        (cycles, observations)
    };

    Ok(Json(analyze(&cycles, &observations)))
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));

    let app = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/import", post(import))
        .route("/insights", post(insights))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("cyclefuse server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
