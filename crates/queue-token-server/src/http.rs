//! 🏗 HTTP request implementation

use std::io;
use std::io::Read;

use queue_token_core::{RawRequest, Request, RequestKind, RequestMethod};
use tiny_http::{Header, Response};

struct HTTPRequest(tiny_http::Request);

impl RawRequest for HTTPRequest {
    fn url(&self) -> &str {
        self.0.url()
    }

    fn method(&self) -> RequestMethod {
        match self.0.method() {
            tiny_http::Method::Post => RequestMethod::Post,
            // only GET and POST make it past `parse()`
            _ => RequestMethod::Get,
        }
    }

    fn read_string(&mut self) -> io::Result<String> {
        let mut s = String::with_capacity(self.0.body_length().unwrap_or(0));
        self.0.as_reader().read_to_string(&mut s)?;
        Ok(s)
    }

    fn respond_with_err(self: Box<Self>, status: u16, err: String) {
        self.respond(Response::from_string(err).with_status_code(status))
    }

    fn respond_with_int(self: Box<Self>, int: u64) {
        self.respond(Response::from_string(int.to_string()).with_status_code(200))
    }

    fn respond_with_json(self: Box<Self>, json: String) {
        let mut res = Response::from_string(json).with_status_code(200);
        res.add_header(header(b"Content-Type", b"application/json"));
        self.respond(res)
    }

    fn respond_with_string(self: Box<Self>, s: String) {
        self.respond(Response::from_string(s).with_status_code(200))
    }
}

impl HTTPRequest {
    /// Add CORS headers to `res` and send it
    fn respond<R: Read>(self, mut res: Response<R>) {
        add_response_cors_headers(&mut res);
        send(self.0, res);
    }
}

/// Send `res`, logging failures instead of bringing the worker down
fn send<R: Read>(rq: tiny_http::Request, res: Response<R>) {
    if let Err(err) = rq.respond(res) {
        tracing::warn!(%err, "HTTP response failed");
    }
}

/// Where a request goes, decided by method and path alone
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Route {
    Handle(RequestKind),
    /// CORS preflight
    Preflight,
    NotFound,
    MethodNotAllowed,
}

const ROUTES: &str = "🎫 could not find the service you are looking for!

Valid requests are:
  GET  /api/services
  POST /api/services/next_number
  POST /api/tokens
  POST /api/tokens/issue
  GET  /api/queue
  GET  /api/dashboard          (staff)
  POST /api/tokens/status      (staff)
  POST /api/changes
  GET  /api/debug(.*)
  POST /api/debug(.*)";

/// Map a request line to its [`Route`]; the query string plays no role
fn route(method: &tiny_http::Method, url: &str) -> Route {
    use tiny_http::Method::*;

    let path = url.split('?').next().unwrap_or_default();
    match (method, path) {
        (Options, _) => Route::Preflight,
        (Get, "/api/services") => Route::Handle(RequestKind::ListServices),
        (Post, "/api/services/next_number") => Route::Handle(RequestKind::NextTokenNumber),
        (Post, "/api/tokens") => Route::Handle(RequestKind::CreateToken),
        (Post, "/api/tokens/issue") => Route::Handle(RequestKind::IssueToken),
        (Get, "/api/queue") => Route::Handle(RequestKind::QueueTokens),
        (Get, "/api/dashboard") => Route::Handle(RequestKind::DashboardTokens),
        (Post, "/api/tokens/status") => Route::Handle(RequestKind::UpdateTokenStatus),
        (Post, "/api/changes") => Route::Handle(RequestKind::WaitForChange),
        (Get, path) | (Post, path) if path.starts_with("/api/debug") => {
            Route::Handle(RequestKind::Debug)
        }
        (Get, _) | (Post, _) => Route::NotFound,
        _ => Route::MethodNotAllowed,
    }
}

/// Value of the `X-Staff-Key` header, if present
fn staff_key(headers: &[Header]) -> Option<String> {
    headers
        .iter()
        .find(|hdr| hdr.field.equiv("x-staff-key"))
        .map(|hdr| hdr.value.as_str().to_owned())
}

/// Parse the given HTTP request
///
/// If [`None`] is returned, the request was already answered with a
/// corresponding error message.
pub fn parse(rq: tiny_http::Request) -> Option<Request> {
    let kind = match route(rq.method(), rq.url()) {
        Route::Handle(kind) => kind,
        Route::Preflight => {
            let mut res = Response::empty(204);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        Route::NotFound => {
            let mut res = Response::from_string(ROUTES).with_status_code(404);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
        Route::MethodNotAllowed => {
            let mut res = Response::empty(405);
            add_response_cors_headers(&mut res);
            send(rq, res);
            return None;
        }
    };

    let key = staff_key(rq.headers());
    Some(Request::from_raw(kind, key, Box::new(HTTPRequest(rq))))
}

/// Build a header from static parts
fn header(field: &'static [u8], value: &'static [u8]) -> Header {
    Header::from_bytes(field, value).expect("static header is valid")
}

/// Add CORS headers to `res`
fn add_response_cors_headers<R: Read>(res: &mut Response<R>) {
    res.add_header(header(b"Access-Control-Request-Method", b"*"));
    res.add_header(header(b"Access-Control-Allow-Origin", b"*"));
    res.add_header(header(b"Access-Control-Allow-Headers", b"*"));
    res.add_header(header(b"Access-Control-Expose-Headers", b"*"));
}

#[cfg(test)]
mod tests {
    use tiny_http::Method;

    use super::*;

    #[test]
    fn test_routes() {
        let table = [
            (Method::Get, "/api/services", RequestKind::ListServices),
            (Method::Post, "/api/services/next_number", RequestKind::NextTokenNumber),
            (Method::Post, "/api/tokens", RequestKind::CreateToken),
            (Method::Post, "/api/tokens/issue", RequestKind::IssueToken),
            (Method::Get, "/api/queue", RequestKind::QueueTokens),
            (Method::Get, "/api/dashboard", RequestKind::DashboardTokens),
            (Method::Post, "/api/tokens/status", RequestKind::UpdateTokenStatus),
            (Method::Post, "/api/changes", RequestKind::WaitForChange),
            (Method::Get, "/api/debug", RequestKind::Debug),
            (Method::Post, "/api/debug/queue", RequestKind::Debug),
        ];
        for (method, url, kind) in table {
            assert_eq!(route(&method, url), Route::Handle(kind), "{method} {url}");
        }
    }

    #[test]
    fn test_query_string_is_ignored() {
        assert_eq!(
            route(&Method::Get, "/api/queue?since=3"),
            Route::Handle(RequestKind::QueueTokens)
        );
        assert_eq!(route(&Method::Get, "/api/queue/?x"), Route::NotFound);
    }

    #[test]
    fn test_unroutable_requests() {
        // wrong method on a known path is a 404, like any unknown path
        assert_eq!(route(&Method::Get, "/api/tokens"), Route::NotFound);
        assert_eq!(route(&Method::Post, "/nowhere"), Route::NotFound);
        assert_eq!(route(&Method::Delete, "/api/tokens"), Route::MethodNotAllowed);
        assert_eq!(route(&Method::Put, "/api/services"), Route::MethodNotAllowed);
        assert_eq!(route(&Method::Options, "/api/tokens"), Route::Preflight);
        assert_eq!(route(&Method::Options, "/anything"), Route::Preflight);
        assert!(ROUTES.contains("POST /api/tokens/status"));
    }

    #[test]
    fn test_cors_headers() {
        let mut res = Response::empty(204);
        add_response_cors_headers(&mut res);
        assert_eq!(res.status_code().0, 204);
        for field in [
            "Access-Control-Allow-Origin",
            "Access-Control-Allow-Headers",
            "Access-Control-Expose-Headers",
        ] {
            let header = res
                .headers()
                .iter()
                .find(|h| h.field.equiv(field))
                .unwrap_or_else(|| panic!("missing {field}"));
            assert_eq!(header.value.as_str(), "*");
        }
    }

    #[test]
    fn test_staff_key_header() {
        let headers: Vec<Header> = ["Content-Type: application/json", "x-staff-key: s3cret"]
            .iter()
            .map(|h| h.parse().unwrap())
            .collect();
        assert_eq!(staff_key(&headers).as_deref(), Some("s3cret"));

        let headers: Vec<Header> = vec!["X-Staff-Key: other".parse().unwrap()];
        assert_eq!(staff_key(&headers).as_deref(), Some("other"));

        assert_eq!(staff_key(&headers[..0]), None);
    }
}
