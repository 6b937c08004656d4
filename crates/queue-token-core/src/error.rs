use thiserror::Error;
use uuid::Uuid;

use crate::TokenStatus;

/// Everything that can go wrong while serving a request
///
/// Each variant carries a message meant for the person in front of the
/// screen, and maps onto one HTTP status via [`QueueError::status_code()`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The request body could not be understood
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A staff request came without the right staff key
    #[error("staff key missing or invalid")]
    Unauthorized,

    /// No service with this id exists
    #[error("service {0} not found")]
    ServiceNotFound(Uuid),

    /// The service exists but does not accept new tokens
    #[error("service {0} is not accepting tokens")]
    ServiceInactive(Uuid),

    /// No token with this id exists
    #[error("token {0} not found")]
    TokenNotFound(Uuid),

    /// The status change would move the token backwards or out of a
    /// terminal state
    #[error("cannot move token from {from} to {to}")]
    InvalidTransition {
        /// Current status
        from: TokenStatus,
        /// Requested status
        to: TokenStatus,
    },

    /// The number was never handed out for this service
    #[error("token number {number} was not issued for service {service}")]
    NumberNotIssued {
        /// Owning service
        service: Uuid,
        /// Offending number
        number: u32,
    },

    /// Another token of this service already carries the number
    #[error("token number {number} is already taken for service {service}")]
    DuplicateNumber {
        /// Owning service
        service: Uuid,
        /// Offending number
        number: u32,
    },

    /// Something on our side broke, e.g., a response failed to serialize
    #[error("internal error: {0}")]
    Internal(String),
}

impl QueueError {
    /// HTTP status code to answer with
    pub fn status_code(&self) -> u16 {
        match self {
            QueueError::BadRequest(_) => 400,
            QueueError::Unauthorized => 401,
            QueueError::ServiceNotFound(_) | QueueError::TokenNotFound(_) => 404,
            QueueError::ServiceInactive(_)
            | QueueError::InvalidTransition { .. }
            | QueueError::NumberNotIssued { .. }
            | QueueError::DuplicateNumber { .. } => 409,
            QueueError::Internal(_) => 500,
        }
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::BadRequest(err.to_string())
    }
}
