use thiserror::Error;

use crate::domain::SettlementError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Trip not found: {0}")]
    TripNotFound(String),

    #[error("Trip already exists: {0}")]
    TripAlreadyExists(String),

    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Participant already exists in this trip: {0}")]
    ParticipantAlreadyExists(String),

    #[error("Invalid expense: {0}")]
    InvalidExpense(String),

    #[error("Invalid settlement: {0}")]
    Validation(#[from] SettlementError),

    /// The store could not complete a read or write. The cause is kept as
    /// the error source and left out of the message.
    #[error("Storage failure")]
    Storage(#[from] anyhow::Error),
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::TripNotFound(_) | AppError::ParticipantNotFound(_)
        )
    }
}
