use std::io;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::QueueError;

/// Kind of the request
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[repr(u8)]
pub enum RequestKind {
    /// List the services customers can queue for, ordered by name
    ListServices,

    /// Take the next number of a service's sequence
    ///
    /// The payload names the service. The response is the number.
    NextTokenNumber,

    /// Insert a token carrying a previously taken number
    CreateToken,

    /// Take a number and insert the token in one step
    IssueToken,

    /// Retrieve the queue view, i.e., all tokens that are not done yet
    QueueTokens,

    /// Retrieve today's tokens and their counts
    ///
    /// 📌 Staff only.
    DashboardTokens,

    /// Move a token to another status
    ///
    /// 📌 Staff only.
    UpdateTokenStatus,

    /// Wait until the token table changed past a given version
    ///
    /// The payload is the last version the client has seen. The response is
    /// the current version, sent as soon as it exceeds the payload or once
    /// the change timeout ran out.
    WaitForChange,

    /// Useful for sending information for debugging
    Debug,
}

/// Request sent from a web browser
pub struct Request {
    kind: RequestKind,
    staff_key: Option<String>,
    raw: Box<dyn RawRequest + Send>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("kind", &self.kind)
            .field("staff_key", &self.staff_key.as_ref().map(|_| ".."))
            .field("raw", &format_args!(".."))
            .finish()
    }
}

/// HTTP request method
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum RequestMethod {
    /// GET request
    Get,
    /// POST request, may have a payload
    Post,
}

/// Interface for handling requests from a web browser
pub trait RequestHandler {
    /// Handle a request from a web browser
    ///
    /// This method may be called concurrently from different threads.
    fn handle(&self, request: Request);

    /// Shut the desk down
    ///
    /// This method waits for all threads spawned by the desk to have
    /// terminated.
    fn shutdown(self);
}

/// A raw request, implemented by the HTTP server and the test harness
pub trait RawRequest {
    /// Get the URL
    fn url(&self) -> &str;
    /// Get the request method
    fn method(&self) -> RequestMethod;

    /// Read the request body as string
    fn read_string(&mut self) -> io::Result<String>;

    /// Respond with an error message and HTTP status
    fn respond_with_err(self: Box<Self>, status: u16, err: String);
    /// Respond with an integer
    fn respond_with_int(self: Box<Self>, int: u64);
    /// Respond with a JSON document
    fn respond_with_json(self: Box<Self>, json: String);
    /// Respond with a plain string
    fn respond_with_string(self: Box<Self>, s: String);
}

impl Request {
    /// Get the request's kind
    #[inline]
    pub fn kind(&self) -> &RequestKind {
        &self.kind
    }

    /// Get the value of the staff key header, if present
    #[inline]
    pub fn staff_key(&self) -> Option<&str> {
        self.staff_key.as_deref()
    }

    /// Get the request URL
    #[inline]
    pub fn url(&self) -> &str {
        self.raw.url()
    }

    /// Get the request method
    #[inline]
    pub fn method(&self) -> RequestMethod {
        self.raw.method()
    }

    /// Read the payload as a UTF-8 string
    ///
    /// 📌 Hint: This method has side effects and should be called only once
    /// per request.
    #[inline]
    pub fn read_string(&mut self) -> io::Result<String> {
        self.raw.read_string()
    }

    /// Parse the payload as a decimal [`u64`]
    ///
    /// In case the browser did not provide an integer (or some communication
    /// error happened), [`None`] is returned.
    pub fn read_u64(&mut self) -> Option<u64> {
        self.raw.read_string().ok()?.trim().parse().ok()
    }

    /// Parse the payload as JSON
    pub fn read_json<T: DeserializeOwned>(&mut self) -> Result<T, QueueError> {
        let body = self
            .raw
            .read_string()
            .map_err(|err| QueueError::BadRequest(err.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Respond with the message and status code of `err`
    ///
    /// This method blocks until the response has been sent.
    #[inline]
    pub fn respond_with_err(self, err: &QueueError) {
        self.raw.respond_with_err(err.status_code(), err.to_string());
    }

    /// Respond with an integer, e.g., a token number or a change version
    #[inline]
    pub fn respond_with_int(self, int: u64) {
        self.raw.respond_with_int(int);
    }

    /// Respond with `value` serialized as JSON
    pub fn respond_with_json<T: Serialize + ?Sized>(self, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => self.raw.respond_with_json(json),
            Err(err) => self.respond_with_err(&QueueError::Internal(err.to_string())),
        }
    }

    /// Respond with an arbitrary string
    #[inline]
    pub fn respond_with_string(self, s: impl Into<String>) {
        self.raw.respond_with_string(s.into());
    }

    /// Create a new request from a [`RawRequest`]
    #[inline]
    pub fn from_raw(
        kind: RequestKind,
        staff_key: Option<String>,
        raw: Box<dyn RawRequest + Send>,
    ) -> Self {
        Self {
            kind,
            staff_key,
            raw,
        }
    }
}
