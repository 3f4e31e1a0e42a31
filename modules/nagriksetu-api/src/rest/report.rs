use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Form,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use nagriksetu_common::{Category, Outcome, TicketStatus};
use nagriksetu_intake::{Attachment, CoordinateInput, ReportForm};

use super::{error_response, intake_error_response};
use crate::AppState;

pub const DUPLICATE_MESSAGE: &str = "Duplicate found. Increased report count.";

/// A report in any of the encodings clients send: multipart (with an
/// optional `image` part), JSON, or a urlencoded form. Any other body is
/// treated as an empty form so validation names the missing fields.
#[derive(Debug, Default)]
pub struct ReportPayload {
    pub form: ReportForm,
    pub image: Option<Attachment>,
}

/// Urlencoded bodies carry every value as text.
#[derive(Deserialize)]
struct TextFields {
    category: Option<String>,
    description: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
}

impl From<TextFields> for ReportForm {
    fn from(f: TextFields) -> Self {
        ReportForm {
            category: f.category,
            description: f.description,
            lat: f.lat.map(CoordinateInput::Text),
            lng: f.lng.map(CoordinateInput::Text),
        }
    }
}

impl<S> FromRequest<S> for ReportPayload
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
            read_multipart(multipart).await
        } else if content_type.starts_with("application/json") {
            let Json(form) = Json::<ReportForm>::from_request(req, state)
                .await
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
            Ok(Self { form, image: None })
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = Form::<TextFields>::from_request(req, state)
                .await
                .map_err(|e| error_response(StatusCode::BAD_REQUEST, e.body_text()))?;
            Ok(Self {
                form: fields.into(),
                image: None,
            })
        } else {
            Ok(Self::default())
        }
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<ReportPayload, Response> {
    let mut payload = ReportPayload::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid multipart field: {e}"),
        )
    })? {
        let name = field.name().map(|s| s.to_string()).unwrap_or_default();

        if name == "image" {
            let file_name = field.file_name().map(|s| s.to_string());
            let content_type = field.content_type().map(|s| s.to_string());
            let bytes = field.bytes().await.map_err(|e| {
                error_response(StatusCode::BAD_REQUEST, format!("Invalid image upload: {e}"))
            })?;
            // An empty file part means the client sent no photo.
            if !bytes.is_empty() {
                payload.image = Some(Attachment {
                    file_name,
                    content_type,
                    size: bytes.len(),
                });
            }
            continue;
        }

        let text = field.text().await.map_err(|e| {
            error_response(
                StatusCode::BAD_REQUEST,
                format!("Invalid multipart field text: {e}"),
            )
        })?;

        match name.as_str() {
            "category" => payload.form.category = Some(text),
            "description" => payload.form.description = Some(text),
            "lat" => payload.form.lat = Some(CoordinateInput::Text(text)),
            "lng" => payload.form.lng = Some(CoordinateInput::Text(text)),
            _ => {}
        }
    }

    Ok(payload)
}

// --- Response bodies ---

#[derive(Debug, Serialize)]
pub struct CreatedTicket {
    pub id: Uuid,
    pub category: Category,
    pub status: TicketStatus,
    pub report_count: u32,
}

#[derive(Debug, Serialize)]
pub struct DuplicateTicket {
    pub message: &'static str,
    pub ticket: TicketRef,
}

#[derive(Debug, Serialize)]
pub struct TicketRef {
    pub id: Uuid,
    pub report_count: u32,
}

// --- Handler ---

pub async fn api_report(State(state): State<Arc<AppState>>, payload: ReportPayload) -> Response {
    let result = match state
        .gateway
        .ingest(&payload.form, payload.image.as_ref())
        .await
    {
        Ok(r) => r,
        Err(e) => return intake_error_response(&e),
    };

    let ticket = result.ticket;
    match result.outcome {
        Outcome::Duplicate => (
            StatusCode::OK,
            Json(DuplicateTicket {
                message: DUPLICATE_MESSAGE,
                ticket: TicketRef {
                    id: ticket.id,
                    report_count: ticket.report_count,
                },
            }),
        )
            .into_response(),
        Outcome::Created => (
            StatusCode::CREATED,
            Json(CreatedTicket {
                id: ticket.id,
                category: ticket.category,
                status: ticket.status,
                report_count: ticket.report_count,
            }),
        )
            .into_response(),
    }
}
