use tracing::{debug, info, warn};

use nagriksetu_common::{Page, Ticket, TicketResult};

use crate::engine::DedupEngine;
use crate::error::IntakeError;
use crate::validation::{Attachment, ReportForm};

/// Front door for reports: validates at the boundary, then hands off to the
/// [`DedupEngine`]. Invalid reports never reach the store.
#[derive(Clone)]
pub struct IngestionGateway {
    engine: DedupEngine,
}

impl IngestionGateway {
    pub fn new(engine: DedupEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &DedupEngine {
        &self.engine
    }

    /// Validate and record one report. The photo, if any, is logged and
    /// otherwise ignored.
    pub async fn ingest(
        &self,
        form: &ReportForm,
        image: Option<&Attachment>,
    ) -> Result<TicketResult, IntakeError> {
        match image {
            Some(a) => info!(
                file_name = a.file_name.as_deref().unwrap_or("<unnamed>"),
                size = a.size,
                "Image attached"
            ),
            None => debug!("No image received"),
        }

        let report = form.validate().inspect_err(|e| {
            warn!(fields = ?e.fields(), "Rejected report: {e}");
        })?;

        Ok(self.engine.submit_ticket(report).await?)
    }

    /// Every ticket, for map display.
    pub async fn tickets(&self, page: Page) -> Result<Vec<Ticket>, IntakeError> {
        Ok(self.engine.list(page).await?)
    }
}
