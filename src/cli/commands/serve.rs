//! HTTP API server for the course assistant.
//!
//! Provides the query and course statistics endpoints, plus an optional
//! static frontend.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::SyllabusError;
use crate::rag::RagSystem;
use crate::tools::SourceCitation;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub rag: RagSystem,
}

/// Build the API router, serving `frontend_dir` for every other path when set.
pub fn router(state: Arc<AppState>, frontend_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses));

    if let Some(dir) = frontend_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    app.layer(cors).with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let frontend_dir = settings
        .server
        .frontend_dir
        .as_deref()
        .map(Settings::expand_path);
    let docs_dir = settings.server.docs_dir.as_deref().map(Settings::expand_path);

    let rag = RagSystem::new(settings)?;

    if let Some(dir) = docs_dir.filter(|d| d.is_dir()) {
        load_initial_documents(&rag, &dir).await;
    }

    let state = Arc::new(AppState { rag });
    let app = router(state, frontend_dir.as_deref());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Syllabus API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    if let Some(dir) = &frontend_dir {
        Output::kv("Frontend", &dir.display().to_string());
    }
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

async fn load_initial_documents(rag: &RagSystem, dir: &Path) {
    Output::info(&format!("Loading course documents from {}...", dir.display()));
    match rag.add_course_folder(dir, false).await {
        Ok((courses, chunks)) => {
            info!("Startup load: {} courses, {} chunks", courses, chunks);
            Output::success(&format!("Loaded {} courses with {} chunks", courses, chunks));
        }
        Err(e) => {
            warn!("Startup load failed: {}", e);
            Output::warning(&format!("Error loading documents: {}", e));
        }
    }
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<String>,
    pub source_metadata: Vec<SourceCitation>,
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CourseStats {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Any failure while handling a request: HTTP 500 with a `detail` message.
#[derive(Debug)]
pub struct ApiError(String);

impl From<SyllabusError> for ApiError {
    fn from(e: SyllabusError) -> Self {
        ApiError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.0 })),
        )
            .into_response()
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let session_id = match req.session_id.filter(|id| !id.is_empty()) {
        Some(id) => id,
        None => state.rag.create_session()?,
    };

    let answer = state.rag.query(&req.query, Some(&session_id)).await?;

    Ok(Json(QueryResponse {
        answer: answer.answer,
        sources: answer.sources,
        source_metadata: answer.source_metadata,
        session_id,
    }))
}

async fn courses(State(state): State<Arc<AppState>>) -> Result<Json<CourseStats>, ApiError> {
    let analytics = state.rag.course_analytics().await?;

    Ok(Json(CourseStats {
        total_courses: analytics.total_courses,
        course_titles: analytics.course_titles,
    }))
}
