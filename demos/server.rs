//! Simple REST API server example for the point ledger engine.
//!
//! Run with: `cargo run --example server`
//!
//! ## Endpoints
//!
//! - `GET /point/{id}` - Get a user's current balance
//! - `GET /point/{id}/histories` - Get a user's charge/use history
//! - `PATCH /point/{id}/charge` - Charge points to a user
//! - `PATCH /point/{id}/use` - Use points from a user's balance
//!
//! ## Example Usage
//!
//! ```bash
//! # Charge
//! curl -X PATCH http://localhost:3000/point/1/charge \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": 1000}'
//!
//! # Use
//! curl -X PATCH http://localhost:3000/point/1/use \
//!   -H "Content-Type: application/json" \
//!   -d '{"amount": 300}'
//!
//! # Balance
//! curl http://localhost:3000/point/1
//!
//! # History
//! curl http://localhost:3000/point/1/histories
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch},
};
use point_ledger_rs::{HistoryEntry, LedgerError, PointEngine, UserId, UserPoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;

// === Request/Response DTOs ===

/// Request body for charge and use operations.
///
/// ```json
/// {"amount": 1000}
/// ```
#[derive(Debug, Deserialize)]
pub struct AmountRequest {
    pub amount: i64,
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the ledger engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PointEngine>,
}

// === Error Handling ===

/// Wrapper for converting `LedgerError` into HTTP responses.
pub struct AppError(LedgerError);

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            LedgerError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
            LedgerError::InsufficientFunds { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_FUNDS")
            }
            LedgerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        };

        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// GET /point/{id} - Get balance by user id.
async fn get_point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserPoint>, AppError> {
    let point = state.engine.get_balance(UserId(id))?;
    Ok(Json(point))
}

/// GET /point/{id}/histories - Get charge/use history by user id.
async fn get_histories(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let histories = state.engine.get_history(UserId(id))?;
    Ok(Json(histories))
}

/// PATCH /point/{id}/charge - Charge points to a user.
async fn charge_point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<UserPoint>, AppError> {
    let point = state.engine.charge(UserId(id), request.amount)?;
    Ok(Json(point))
}

/// PATCH /point/{id}/use - Use points from a user's balance.
async fn use_point(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<AmountRequest>,
) -> Result<Json<UserPoint>, AppError> {
    let point = state.engine.use_points(UserId(id), request.amount)?;
    Ok(Json(point))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/point/{id}", get(get_point))
        .route("/point/{id}/histories", get(get_histories))
        .route("/point/{id}/charge", patch(charge_point))
        .route("/point/{id}/use", patch(use_point))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    let state = AppState {
        engine: Arc::new(PointEngine::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    println!("Point ledger API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  GET   /point/:id            - Get balance");
    println!("  GET   /point/:id/histories  - Get history");
    println!("  PATCH /point/:id/charge     - Charge points");
    println!("  PATCH /point/:id/use        - Use points");

    axum::serve(listener, app).await.unwrap();
}
