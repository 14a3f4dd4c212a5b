//! Response builder: a mutable accumulator for status, headers, and
//! body that every handler in the chain shares, finalized exactly once.
//!
//! The state machine is `Unset → Configured → Finalized`. Finalization
//! is an atomic check-and-set: the first [`Response::end`] wins, every
//! later call is a no-op, and all mutators silently stop applying once
//! the response is finalized. The transport reads the frozen state via
//! [`Response::to_parts`] and performs its single write.

use crate::cookies::{CookieOptions, format_set_cookie};
use crate::error::Error;
use crate::headers::HeaderMap;
use crate::request::Request;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// A body payload with its inferred representation.
///
/// [`Response::send`] picks the content type from the variant: raw
/// bytes become `application/octet-stream`, text becomes `text/html`,
/// and JSON values become `application/json`.
#[derive(Clone, Debug)]
pub enum Payload {
    Binary(Bytes),
    Text(String),
    Json(Value),
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Payload::Text(s.to_string())
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Payload::Text(s)
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Binary(b)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(b: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(b))
    }
}

impl From<&[u8]> for Payload {
    fn from(b: &[u8]) -> Self {
        Payload::Binary(Bytes::copy_from_slice(b))
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(b: &[u8; N]) -> Self {
        Payload::Binary(Bytes::copy_from_slice(b))
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

#[derive(Debug, Default)]
struct State {
    status: Option<u16>,
    headers: HeaderMap,
    body: Bytes,
}

/// The finalized response snapshot handed to the transport.
#[derive(Clone, Debug)]
pub struct ResponseParts {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The per-request response accumulator.
#[derive(Debug, Default)]
pub struct Response {
    state: Mutex<State>,
    finalized: AtomicBool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether [`Response::end`] has already run.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized.load(Ordering::Acquire)
    }

    /// Set the status code. Last call wins.
    pub fn status(&self, code: u16) -> &Self {
        if !self.is_finalized() {
            self.state.lock().status = Some(code);
        }
        self
    }

    pub fn status_code(&self) -> Option<u16> {
        self.state.lock().status
    }

    /// Set the body, inferring content type from the payload variant
    /// and recording `Content-Length` from the resulting byte length.
    pub fn send(&self, payload: impl Into<Payload>) -> &Self {
        if self.is_finalized() {
            return self;
        }
        let (content_type, body) = match payload.into() {
            Payload::Binary(bytes) => ("application/octet-stream", bytes),
            Payload::Text(text) => ("text/html", Bytes::from(text)),
            Payload::Json(value) => (
                "application/json",
                Bytes::from(serde_json::to_vec(&value).unwrap_or_default()),
            ),
        };
        let mut state = self.state.lock();
        state.headers.set("Content-Type", content_type);
        state.headers.set("Content-Length", body.len().to_string());
        state.body = body;
        self
    }

    /// Serialize any value as JSON regardless of shape.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<&Self, Error> {
        if self.is_finalized() {
            return Ok(self);
        }
        let body = serde_json::to_vec(value).map_err(|e| Error::Serialization(e.to_string()))?;
        let mut state = self.state.lock();
        state.headers.set("Content-Type", "application/json");
        state.headers.set("Content-Length", body.len().to_string());
        state.body = Bytes::from(body);
        Ok(self)
    }

    /// Set body bytes without touching `Content-Type`. The caller is
    /// expected to have set one already (the partial-content path).
    pub fn raw(&self, body: impl Into<Bytes>) -> &Self {
        if self.is_finalized() {
            return self;
        }
        let body = body.into();
        let mut state = self.state.lock();
        state.headers.set("Content-Length", body.len().to_string());
        state.body = body;
        self
    }

    /// Set a header, replacing any existing value. Names compare
    /// case-insensitively.
    pub fn set(&self, name: &str, value: &str) -> &Self {
        if !self.is_finalized() {
            self.state.lock().headers.set(name, value);
        }
        self
    }

    /// Append to a header value with a `,` join; the first call on a
    /// field behaves like [`Response::set`].
    pub fn append(&self, name: &str, value: &str) -> &Self {
        if !self.is_finalized() {
            self.state.lock().headers.append(name, value);
        }
        self
    }

    /// First value currently recorded for a header.
    pub fn get(&self, name: &str) -> Option<String> {
        self.state.lock().headers.get(name).map(str::to_string)
    }

    /// Every value recorded for a header, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .headers
            .get_all(name)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn content_type(&self, value: &str) -> &Self {
        self.set("Content-Type", value)
    }

    /// Add one `Set-Cookie` entry. Existing entries are kept; each call
    /// contributes its own header line.
    pub fn cookie(&self, name: &str, value: &str, options: &CookieOptions) -> &Self {
        if !self.is_finalized() {
            let line = format_set_cookie(name, value, options);
            self.state.lock().headers.add("Set-Cookie", line);
        }
        self
    }

    /// Set the `Location` header. The literal `"back"` resolves to the
    /// request's first `Referer` value, or `/` when absent; the request
    /// is passed in rather than held as a back-reference.
    pub fn location(&self, path: &str, req: &Request) -> &Self {
        let target = if path == "back" {
            req.get("referer").unwrap_or("/")
        } else {
            path
        };
        self.set("Location", target)
    }

    /// Redirect with the default 302 status.
    pub fn redirect(&self, path: &str, req: &Request) -> &Self {
        self.redirect_with(302, path, req)
    }

    pub fn redirect_with(&self, status: u16, path: &str, req: &Request) -> &Self {
        self.status(status).location(path, req)
    }

    /// Append to the `Vary` header.
    pub fn vary(&self, value: &str) -> &Self {
        self.append("Vary", value)
    }

    /// Finalize the response. Idempotent: only the first call moves the
    /// state machine to `Finalized` (filling in the 200 default status
    /// and a `Content-Length` if none was recorded); all later calls
    /// are no-ops and the transport write happens at most once.
    pub fn end(&self) -> &Self {
        if self
            .finalized
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            let mut state = self.state.lock();
            if state.status.is_none() {
                state.status = Some(200);
            }
            if !state.headers.contains("Content-Length") {
                let len = state.body.len().to_string();
                state.headers.set("Content-Length", len);
            }
        }
        self
    }

    /// Snapshot of status, headers, and body for the transport write.
    pub fn to_parts(&self) -> ResponseParts {
        let state = self.state.lock();
        ResponseParts {
            status: state.status.unwrap_or(200),
            headers: state.headers.clone(),
            body: state.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use crate::http::HttpMethod;

    #[test]
    fn test_status_last_call_wins() {
        let res = Response::new();
        res.status(404).status(200);
        assert_eq!(res.status_code(), Some(200));
    }

    #[test]
    fn test_send_infers_text_as_html() {
        let res = Response::new();
        res.send("Hello");
        assert_eq!(res.get("Content-Type").as_deref(), Some("text/html"));
        assert_eq!(res.get("Content-Length").as_deref(), Some("5"));
        assert_eq!(res.to_parts().body, Bytes::from_static(b"Hello"));
    }

    #[test]
    fn test_send_infers_bytes_as_octet_stream() {
        let res = Response::new();
        res.send(vec![1u8, 2, 3]);
        assert_eq!(
            res.get("Content-Type").as_deref(),
            Some("application/octet-stream")
        );
        assert_eq!(res.get("Content-Length").as_deref(), Some("3"));
    }

    #[test]
    fn test_send_infers_json_value() {
        let res = Response::new();
        res.send(serde_json::json!(["Hello World", "from gantry"]));
        assert_eq!(res.get("Content-Type").as_deref(), Some("application/json"));
        assert_eq!(
            res.to_parts().body,
            Bytes::from_static(b"[\"Hello World\",\"from gantry\"]")
        );
    }

    #[test]
    fn test_json_always_serializes() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
            y: i32,
        }
        let res = Response::new();
        res.json(&Point { x: 1, y: 2 }).unwrap();
        assert_eq!(res.get("Content-Type").as_deref(), Some("application/json"));
        assert_eq!(res.to_parts().body, Bytes::from_static(b"{\"x\":1,\"y\":2}"));
    }

    #[test]
    fn test_raw_preserves_content_type() {
        let res = Response::new();
        res.content_type("image/png").raw(Bytes::from_static(b"png"));
        assert_eq!(res.get("Content-Type").as_deref(), Some("image/png"));
        assert_eq!(res.get("Content-Length").as_deref(), Some("3"));
    }

    #[test]
    fn test_set_then_append() {
        let res = Response::new();
        res.append("X-List", "a").append("x-list", "b");
        assert_eq!(res.get("X-List").as_deref(), Some("a,b"));
        res.set("x-list", "c");
        assert_eq!(res.get("X-List").as_deref(), Some("c"));
    }

    #[test]
    fn test_cookie_entries_accumulate() {
        let res = Response::new();
        res.cookie("a", "1", &CookieOptions::default());
        res.cookie("b", "2", &CookieOptions::default().http_only(true));
        let cookies = res.get_all("Set-Cookie");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0], "a=1; Path=/");
        assert_eq!(cookies[1], "b=2; Path=/; HttpOnly");
    }

    #[test]
    fn test_location_back_uses_referer() {
        let headers: HeaderMap = [("Referer", "/previous")].into_iter().collect();
        let req = Request::from_parts(HttpMethod::GET, "/now", headers, None);
        let res = Response::new();
        res.location("back", &req);
        assert_eq!(res.get("Location").as_deref(), Some("/previous"));
    }

    #[test]
    fn test_location_back_defaults_to_root() {
        let req = Request::new(HttpMethod::GET, "/now");
        let res = Response::new();
        res.location("back", &req);
        assert_eq!(res.get("Location").as_deref(), Some("/"));
    }

    #[test]
    fn test_redirect_defaults_to_302() {
        let req = Request::new(HttpMethod::GET, "/");
        let res = Response::new();
        res.redirect("/elsewhere", &req);
        assert_eq!(res.status_code(), Some(302));
        assert_eq!(res.get("Location").as_deref(), Some("/elsewhere"));

        let res = Response::new();
        res.redirect_with(301, "/moved", &req);
        assert_eq!(res.status_code(), Some(301));
    }

    #[test]
    fn test_vary_appends() {
        let res = Response::new();
        res.vary("Origin").vary("Accept-Encoding");
        assert_eq!(res.get("Vary").as_deref(), Some("Origin,Accept-Encoding"));
    }

    #[test]
    fn test_end_is_idempotent_and_freezes_state() {
        let res = Response::new();
        res.status(201).send("created");
        res.end();
        assert!(res.is_finalized());

        // Every mutation after finalization is a no-op.
        res.status(500)
            .send("changed")
            .set("X-Late", "1")
            .append("Vary", "Origin")
            .cookie("late", "1", &CookieOptions::default());
        res.end().end();

        let parts = res.to_parts();
        assert_eq!(parts.status, 201);
        assert_eq!(parts.body, Bytes::from_static(b"created"));
        assert_eq!(parts.headers.get("X-Late"), None);
        assert_eq!(parts.headers.get("Vary"), None);
        assert!(parts.headers.get_all("Set-Cookie").is_empty());
    }

    #[test]
    fn test_end_fills_defaults() {
        let res = Response::new();
        res.end();
        let parts = res.to_parts();
        assert_eq!(parts.status, 200);
        assert_eq!(parts.headers.get("Content-Length"), Some("0"));
        assert!(parts.body.is_empty());
    }

    #[test]
    fn test_json_after_end_is_noop() {
        let res = Response::new();
        res.send("first").end();
        res.json(&serde_json::json!({"late": true})).unwrap();
        assert_eq!(res.to_parts().body, Bytes::from_static(b"first"));
    }
}
