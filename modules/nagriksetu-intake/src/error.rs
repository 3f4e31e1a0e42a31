use nagriksetu_store::StoreError;

use crate::validation::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IntakeError {
    /// True when the caller sent something wrong, as opposed to the store failing.
    pub fn is_client_error(&self) -> bool {
        matches!(self, IntakeError::Validation(_))
    }
}
