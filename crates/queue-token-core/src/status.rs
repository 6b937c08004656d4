use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::QueueError;

/// Where a token stands in its lifecycle
///
/// Tokens only ever move forward: `waiting → called → serving → completed`,
/// with `cancelled` reachable from every state that is not terminal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    /// Issued, not yet called
    Waiting,
    /// Called to a counter
    Called,
    /// Being served at a counter
    Serving,
    /// Served (terminal)
    Completed,
    /// Dropped out of the queue (terminal)
    Cancelled,
}

impl TokenStatus {
    /// All statuses in lifecycle order
    pub const ALL: [TokenStatus; 5] = [
        TokenStatus::Waiting,
        TokenStatus::Called,
        TokenStatus::Serving,
        TokenStatus::Completed,
        TokenStatus::Cancelled,
    ];

    /// Whether no further transition is possible
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, TokenStatus::Completed | TokenStatus::Cancelled)
    }

    /// Whether tokens in this status show up in the queue view
    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    /// Position along the forward path; `cancelled` sits off the path
    fn rank(self) -> Option<u8> {
        match self {
            TokenStatus::Waiting => Some(0),
            TokenStatus::Called => Some(1),
            TokenStatus::Serving => Some(2),
            TokenStatus::Completed => Some(3),
            TokenStatus::Cancelled => None,
        }
    }

    /// Whether a token in `self` may move to `next`
    pub fn can_advance_to(self, next: TokenStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }

    /// Lowercase name as used on the wire
    pub fn as_str(self) -> &'static str {
        match self {
            TokenStatus::Waiting => "waiting",
            TokenStatus::Called => "called",
            TokenStatus::Serving => "serving",
            TokenStatus::Completed => "completed",
            TokenStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TokenStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TokenStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| QueueError::BadRequest(format!("unknown token status `{s}`")))
    }
}
