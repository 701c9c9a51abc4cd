//! HTTP detection service.
//!
//! Exposes the local saliency extractor to remote clients (`/landmark`)
//! and answers whole-pair analysis requests (`/analyze`) in the multipart
//! format the mobile client uploads.

pub mod protocol;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::algorithms::SaliencyModel;
use crate::analyzer::AlignmentAnalyzer;
use crate::config::{Config, ExtractorBackend, ImageConfig, ServerConfig};
use crate::data::decode_image;
use crate::error::{AlignError, AlignResult};
use crate::logging::{MetricsCollector, PerformanceStats};
use crate::pipeline::{AnalysisResult, Landmark};
use protocol::{
    ErrorResponse, HealthResponse, LandmarkResponse, IMAGE_FIELD, REFERENCE_IMAGE_FIELD,
    USER_IMAGE_FIELD,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Detection service state
#[derive(Clone)]
pub struct ServiceState {
    pub model: Arc<SaliencyModel>,
    pub analyzer: AlignmentAnalyzer,
    pub limits: ImageConfig,
}

impl ServiceState {
    pub fn with_config(config: &Config) -> anyhow::Result<Self> {
        let model = Arc::new(SaliencyModel::new(config.extractor.local.clone())?);

        // The service always extracts locally, whatever the client config says
        let mut local = config.clone();
        local.extractor.backend = ExtractorBackend::Local;
        let analyzer = AlignmentAnalyzer::from_config(&local)?;

        Ok(Self {
            model,
            analyzer,
            limits: config.image.clone(),
        })
    }

    fn metrics(&self) -> &Arc<MetricsCollector> {
        self.analyzer.metrics()
    }

    async fn locate_bytes(&self, label: &'static str, bytes: Bytes) -> AlignResult<Option<Landmark>> {
        let model = Arc::clone(&self.model);
        let limits = self.limits.clone();
        let start = instant::Instant::now();

        let outcome = tokio::task::spawn_blocking(move || -> AlignResult<Option<Landmark>> {
            let gray = decode_image(label, &bytes, &limits)?;
            Ok(model.locate(&gray))
        })
        .await
        .map_err(|e| AlignError::DetectorUnavailable(format!("extraction task failed: {e}")))?;

        self.metrics().record("service_extract", start.elapsed(), None);
        outcome
    }
}

pub struct DetectionServer {
    state: ServiceState,
    config: ServerConfig,
}

impl DetectionServer {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            state: ServiceState::with_config(config)?,
            config: config.server.clone(),
        })
    }

    pub fn router(&self) -> Router {
        let cors = if self.config.enable_cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        };

        let body_limit = self.config.max_upload_size_mb.saturating_mul(1024 * 1024);

        Router::new()
            .route("/health", get(health))
            .route("/landmark", post(landmark))
            .route("/analyze", post(analyze))
            .route("/metrics", get(metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(DefaultBodyLimit::max(body_limit))
                    .layer(cors),
            )
            .with_state(self.state.clone())
    }

    /// Bind `0.0.0.0:<port>` and serve until the process stops
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.config.port)).await?;
        self.serve(listener).await
    }

    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let app = self.router();
        info!(address = %listener.local_addr()?, "Detection service listening");
        axum::serve(listener, app).await?;
        Ok(())
    }
}

async fn read_fields(mut multipart: Multipart) -> Result<HashMap<String, Bytes>, ApiError> {
    let mut fields = HashMap::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("failed to read field: {e}")))?;
        fields.insert(name, data);
    }
    Ok(fields)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        extractor: "saliency".to_string(),
    })
}

async fn landmark(
    State(state): State<ServiceState>,
    multipart: Multipart,
) -> Result<Json<LandmarkResponse>, ApiError> {
    let mut fields = read_fields(multipart).await?;
    let bytes = fields.remove(IMAGE_FIELD).ok_or_else(|| {
        api_error(
            StatusCode::BAD_REQUEST,
            format!("missing '{IMAGE_FIELD}' file"),
        )
    })?;

    match state.locate_bytes("upload", bytes).await {
        Ok(landmark) => {
            debug!(found = landmark.is_some(), "Landmark request served");
            Ok(Json(LandmarkResponse { landmark }))
        }
        Err(e @ AlignError::Decode { .. }) => {
            warn!(error = %e, "Rejected undecodable upload");
            Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn analyze(
    State(state): State<ServiceState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ApiError> {
    let start = instant::Instant::now();
    let mut fields = read_fields(multipart).await?;
    let (Some(user), Some(reference)) = (
        fields.remove(USER_IMAGE_FIELD),
        fields.remove(REFERENCE_IMAGE_FIELD),
    ) else {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Both userImage and referenceImage files are required.",
        ));
    };

    let analyzer = &state.analyzer;
    let (captured, reference) = tokio::join!(
        analyzer.within_budget(state.locate_bytes(USER_IMAGE_FIELD, user)),
        analyzer.within_budget(state.locate_bytes(REFERENCE_IMAGE_FIELD, reference))
    );

    let result = analyzer
        .conclude(captured, reference)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(
        alignment = %result.alignment,
        confidence = format!("{:.3}", result.confidence),
        "Pair analysis served"
    );
    state.metrics().record("service_analyze", start.elapsed(), None);
    Ok(Json(result))
}

async fn metrics(State(state): State<ServiceState>) -> Json<BTreeMap<String, PerformanceStats>> {
    Json(state.metrics().summary())
}
