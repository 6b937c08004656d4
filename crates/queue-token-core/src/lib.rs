//! 🏗 Domain model and infrastructure for handling requests, etc.
#![warn(missing_docs)]

mod error;
mod model;
mod request;
mod status;

pub use error::QueueError;
pub use model::{
    Dashboard, DashboardStats, IssueToken, NewToken, NumberRequest, Service, ServiceSeed,
    StatusUpdate, Token, TokenView,
};
pub use request::{RawRequest, Request, RequestHandler, RequestKind, RequestMethod};
pub use status::TokenStatus;

/// Default long-poll window for change requests, in seconds
pub const DEFAULT_CHANGE_TIMEOUT: u32 = 25;

/// Configuration of the queue token desk
#[derive(Clone, Debug)]
pub struct Config {
    /// Services available for queueing, seeded at launch
    pub services: Vec<ServiceSeed>,
    /// Key staff requests must present in `X-Staff-Key`
    ///
    /// [`None`] leaves the staff requests open.
    pub staff_key: Option<String>,
    /// Time in seconds a change request waits for a new change
    pub change_timeout: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            staff_key: None,
            change_timeout: DEFAULT_CHANGE_TIMEOUT,
        }
    }
}
