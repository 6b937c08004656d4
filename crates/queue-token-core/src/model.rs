use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{QueueError, TokenStatus};

/// A counter or desk customers can queue for
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Service {
    /// The service's id
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Short description shown next to the name
    pub description: String,
    /// Average wait time in minutes
    pub average_wait_time: u32,
    /// Whether customers may currently take tokens
    pub is_active: bool,
}

/// Seed record for a [`Service`], as found in the settings file
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceSeed {
    /// Display name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// Average wait time in minutes
    #[serde(default)]
    pub average_wait_time: u32,
    /// Whether customers may take tokens
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl ServiceSeed {
    /// An active service without description or wait estimate
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            average_wait_time: 0,
            is_active: true,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the average wait time (in minutes)
    pub fn with_wait(mut self, minutes: u32) -> Self {
        self.average_wait_time = minutes;
        self
    }

    /// Mark the service as not accepting tokens
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Turn the seed into a service with a fresh id
    pub fn into_service(self) -> Service {
        Service {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            average_wait_time: self.average_wait_time,
            is_active: self.is_active,
        }
    }
}

/// A customer's place in line
///
/// `token_number` and `service_id` are fixed at creation. Only the status and
/// the matching timestamps change afterwards, through [`Token::advance()`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Token {
    /// The token's id
    pub id: Uuid,
    /// Sequential number, unique within the owning service
    pub token_number: u32,
    /// Owning service
    pub service_id: Uuid,
    /// Customer name, if given
    pub customer_name: Option<String>,
    /// Customer phone, if given
    pub customer_phone: Option<String>,
    /// Lifecycle status
    pub status: TokenStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// First time the token was called or served
    pub called_at: Option<DateTime<Utc>>,
    /// Time the token was completed
    pub completed_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a `waiting` token from an insert request
    pub fn new(new: NewToken, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token_number: new.token_number,
            service_id: new.service_id,
            customer_name: normalize(new.customer_name),
            customer_phone: normalize(new.customer_phone),
            status: TokenStatus::Waiting,
            created_at,
            called_at: None,
            completed_at: None,
        }
    }

    /// Move the token to `next`, stamping the transition time
    ///
    /// Entering `called` or `serving` stamps `called_at` unless it is already
    /// set; entering `completed` stamps `completed_at`. On error the token is
    /// left untouched.
    pub fn advance(&mut self, next: TokenStatus, now: DateTime<Utc>) -> Result<(), QueueError> {
        if !self.status.can_advance_to(next) {
            return Err(QueueError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }

        match next {
            TokenStatus::Called | TokenStatus::Serving => {
                self.called_at.get_or_insert(now);
            }
            TokenStatus::Completed => self.completed_at = Some(now),
            TokenStatus::Waiting | TokenStatus::Cancelled => {}
        }
        self.status = next;
        Ok(())
    }
}

/// Blank inputs count as not given, anything else is kept as entered
fn normalize(field: Option<String>) -> Option<String> {
    field.filter(|s| !s.trim().is_empty())
}

/// A token joined with the name of its service
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct TokenView {
    /// The token itself
    #[serde(flatten)]
    pub token: Token,
    /// Name of the owning service
    pub service_name: String,
}

/// Request body for inserting a token
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NewToken {
    /// Number previously handed out by the numbering service
    pub token_number: u32,
    /// Owning service
    pub service_id: Uuid,
    /// Customer name
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Customer phone
    #[serde(default)]
    pub customer_phone: Option<String>,
}

/// Request body for taking a number and inserting the token in one go
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct IssueToken {
    /// Service to queue for
    pub service_id: Uuid,
    /// Customer name
    #[serde(default)]
    pub customer_name: Option<String>,
    /// Customer phone
    #[serde(default)]
    pub customer_phone: Option<String>,
}

/// Request body for the numbering service
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct NumberRequest {
    /// Service whose sequence to advance
    pub service_id: Uuid,
}

/// Request body for a staff status change
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// Token to move
    pub token_id: Uuid,
    /// Status to move it to
    pub status: TokenStatus,
}

/// Counts over today's tokens
///
/// `called` and `cancelled` tokens only count towards `total`.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Tokens waiting
    pub waiting: u32,
    /// Tokens being served
    pub serving: u32,
    /// Tokens completed
    pub completed: u32,
    /// All tokens created today
    pub total: u32,
}

/// Staff view: today's counts and tokens, newest first
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Dashboard {
    /// Counts over `tokens`
    pub stats: DashboardStats,
    /// Today's tokens, newest first
    pub tokens: Vec<TokenView>,
}
