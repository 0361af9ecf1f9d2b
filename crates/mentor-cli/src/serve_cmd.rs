use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use mentor_core::llm::BackendError;
use mentor_core::pipeline::{PipelineError, StudyPlanPipeline};
use mentor_core::plan::{GenerateStudyPlanRequest, get_plan_with_tasks};
use mentor_core::token::{TokenConfig, validate_token};
use mentor_db::models::{PlanStatus, StudyPlan, StudyTask};
use mentor_db::queries::study_plans::{self, PlanListFilter};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pipeline: StudyPlanPipeline,
    pool: PgPool,
    tokens: Arc<TokenConfig>,
}

impl AppState {
    pub fn new(pipeline: StudyPlanPipeline, pool: PgPool, tokens: TokenConfig) -> Self {
        Self {
            pipeline,
            pool,
            tokens: Arc::new(tokens),
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    details: Option<Value>,
}

impl AppError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, msg)
    }

    pub fn bad_gateway(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, msg)
    }

    /// 502 carrying the upstream HTTP status when the AI service sent one.
    pub fn upstream(err: &BackendError) -> Self {
        Self::bad_gateway(err.to_string())
            .with_details(json!({ "upstream_status": err.upstream_status() }))
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{err:#}"))
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidRequest(e) => {
                Self::unprocessable("invalid study plan request").with_details(json!(e.problems))
            }
            PipelineError::Backend(e) => Self::upstream(&e),
            PipelineError::Schema(e) => Self::unprocessable(e.to_string()).with_details(json!({
                "parse_error": e.parse_error,
                "repair_error": e.repair_error,
                "snippet": e.snippet,
            })),
            PipelineError::Validation(e) => {
                Self::unprocessable("generated plan failed validation")
                    .with_details(json!(e.violations))
            }
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::unprocessable(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, message = %self.message, "request failed");
        }
        let body = json!({
            "code": self.status.as_u16(),
            "message": self.message,
            "details": self.details,
        });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// The caller, identified by a valid `Authorization: Bearer` token.
pub struct AuthUser(pub Uuid);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("authorization header must use the Bearer scheme"))?;
        let claims = validate_token(&state.tokens, token.trim())
            .map_err(|e| AppError::unauthorized(format!("invalid bearer token: {e}")))?;
        Ok(AuthUser(claims.user_id))
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Success envelope shared by every API route.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub message: String,
    pub data: T,
}

impl<T> Envelope<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            code: 0,
            message: message.into(),
            data,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PlanDetailResponse {
    #[serde(flatten)]
    pub plan: StudyPlan,
    pub tasks: Vec<StudyTask>,
}

/// Query string of `GET /api/v1/study-plans`.
#[derive(Debug, Default, Deserialize)]
pub struct ListPlansQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListPlansQuery {
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;

    /// Check the parameters and turn them into a store filter.
    ///
    /// Status matching ignores case and surrounding whitespace.
    pub fn to_filter(&self) -> Result<PlanListFilter, AppError> {
        let mut problems = Vec::new();

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.to_ascii_lowercase().parse::<PlanStatus>() {
                Ok(status) => Some(status),
                Err(e) => {
                    problems.push(json!({ "field": "status", "message": e.to_string() }));
                    None
                }
            },
        };

        let page = self.page.unwrap_or(1);
        if page < 1 {
            problems.push(json!({ "field": "page", "message": "must be at least 1" }));
        }
        let per_page = self.per_page.unwrap_or(Self::DEFAULT_PER_PAGE);
        if !(1..=Self::MAX_PER_PAGE).contains(&per_page) {
            problems.push(json!({
                "field": "per_page",
                "message": format!("must be between 1 and {}", Self::MAX_PER_PAGE),
            }));
        }

        if !problems.is_empty() {
            return Err(AppError::unprocessable("invalid list parameters")
                .with_details(Value::Array(problems)));
        }

        Ok(PlanListFilter {
            status,
            limit: per_page,
            offset: (page - 1) * per_page,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub backend: String,
    pub reply: String,
    pub tokens_used: i64,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/study-plans/generate", post(generate_plan))
        .route("/api/v1/study-plans", get(list_plans))
        .route("/api/v1/study-plans/{id}", get(get_plan_detail))
        .route("/api/v1/ai/ping", post(ping_backend))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("mentor serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("mentor serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate_plan(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<GenerateStudyPlanRequest>, JsonRejection>,
) -> Result<axum::response::Response, AppError> {
    let Json(request) = payload?;
    let outcome = state.pipeline.generate(user_id, &request).await?;

    let message = if outcome.from_cache {
        "Study plan retrieved from cache"
    } else {
        "Study plan generated successfully"
    };
    Ok(Envelope::ok(message, outcome.plan).into_response())
}

async fn list_plans(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    query: Result<Query<ListPlansQuery>, QueryRejection>,
) -> Result<axum::response::Response, AppError> {
    let Query(query) = query?;
    let filter = query.to_filter()?;
    let plans = study_plans::list_study_plans_for_user(&state.pool, user_id, &filter)
        .await
        .map_err(AppError::internal)?;

    Ok(Envelope::ok(format!("{} study plan(s)", plans.len()), plans).into_response())
}

async fn get_plan_detail(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<axum::response::Response, AppError> {
    let Path(id) = id?;
    let (plan, tasks) = get_plan_with_tasks(&state.pool, id, user_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("study plan {id} not found")))?;

    Ok(Envelope::ok("Study plan retrieved", PlanDetailResponse { plan, tasks }).into_response())
}

async fn ping_backend(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<axum::response::Response, AppError> {
    let generation = state
        .pipeline
        .ping()
        .await
        .map_err(|e| AppError::upstream(&e))?;

    tracing::info!(%user_id, tokens_used = generation.tokens_used, "AI backend ping succeeded");
    Ok(Envelope::ok(
        "AI backend reachable",
        PingResponse {
            backend: state.pipeline.backend_name().to_owned(),
            reply: generation.text,
            tokens_used: generation.tokens_used,
        },
    )
    .into_response())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
