pub mod report;

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use nagriksetu_common::{Category, Page, Ticket, TicketStatus};
use nagriksetu_intake::IntakeError;

use crate::AppState;

// --- Query structs ---

#[derive(Deserialize)]
pub struct TicketsQuery {
    limit: Option<u32>,
    offset: Option<u32>,
}

// --- Response bodies ---

/// One map marker. The stored point is split into plain numbers.
#[derive(Debug, Serialize)]
pub struct TicketView {
    pub id: Uuid,
    pub category: Category,
    pub description: String,
    pub status: TicketStatus,
    pub report_count: u32,
    pub lat: f64,
    pub lng: f64,
}

impl From<Ticket> for TicketView {
    fn from(t: Ticket) -> Self {
        Self {
            id: t.id,
            category: t.category,
            description: t.description,
            status: t.status,
            report_count: t.report_count,
            lat: t.location.lat,
            lng: t.location.lng,
        }
    }
}

// --- Helpers ---

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({ "error": message.into() })),
    )
        .into_response()
}

/// Validation problems go back to the caller verbatim. Store problems are
/// logged and reported without detail.
pub fn intake_error_response(err: &IntakeError) -> Response {
    match err {
        IntakeError::Validation(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
        IntakeError::Store(e) => {
            warn!(error = %e, "Ticket store failure");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}

// --- Handlers ---

pub async fn api_tickets(
    State(state): State<Arc<AppState>>,
    query: Result<Query<TicketsQuery>, QueryRejection>,
) -> Response {
    let Query(params) = match query {
        Ok(q) => q,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.body_text()),
    };

    match state
        .gateway
        .tickets(Page::new(params.limit, params.offset))
        .await
    {
        Ok(tickets) => {
            let body: Vec<TicketView> = tickets.into_iter().map(TicketView::from).collect();
            Json(body).into_response()
        }
        Err(e) => intake_error_response(&e),
    }
}
