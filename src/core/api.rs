//! HTTP API for the table producers
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /tables - Configured table layouts
//! - POST /events - Produce every table for one event

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::ProducerSet;
use crate::error::Error;
use crate::types::{ColumnSpec, Event, Table};

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub tables: usize,
}

/// Layout of one configured table
#[derive(Debug, Serialize)]
pub struct TableLayout {
    pub name: String,
    pub kind: String,
    pub src: String,
    pub cut: String,
    pub columns: Vec<ColumnSpec>,
}

/// Tables produced for one event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event: u64,
    pub tables: Vec<Table>,
}

/// Error body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps a failed event run onto a status code
struct ApiError(Error);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_fetch_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

/// Create the API router around an already-built producer set
pub fn create_router(producers: Arc<ProducerSet>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tables", get(tables))
        .route("/events", post(produce_event))
        .with_state(producers)
}

/// Health check endpoint
async fn health(State(producers): State<Arc<ProducerSet>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        tables: producers.len(),
    })
}

/// Configured layouts, in production order
async fn tables(State(producers): State<Arc<ProducerSet>>) -> Json<Vec<TableLayout>> {
    Json(layouts(&producers))
}

/// Run every producer on the posted event
async fn produce_event(
    State(producers): State<Arc<ProducerSet>>,
    Json(event): Json<Event>,
) -> Result<Json<EventResponse>, ApiError> {
    match producers.run(&event) {
        Ok(tables) => Ok(Json(EventResponse { event: event.id, tables })),
        Err(e) => {
            warn!(event = event.id, error = %e, "event rejected");
            Err(ApiError(e))
        }
    }
}

/// Column layouts of every configured table
pub fn layouts(producers: &ProducerSet) -> Vec<TableLayout> {
    producers
        .producers()
        .iter()
        .map(|p| TableLayout {
            name: p.name().to_string(),
            kind: p.candidate_kind().to_string(),
            src: p.src().to_string(),
            cut: p.cut().to_string(),
            columns: p.columns().to_vec(),
        })
        .collect()
}

/// Run the API server
pub async fn run_server(addr: &str, producers: Arc<ProducerSet>) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(producers);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "ntuplizer API listening");
    println!("ntuplizer API running on {}", addr);
    println!("  GET  /health  - Health check");
    println!("  GET  /tables  - Table layouts");
    println!("  POST /events  - Produce tables for one event");
    axum::serve(listener, router).await?;
    Ok(())
}
