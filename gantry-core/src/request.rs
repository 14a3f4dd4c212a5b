// Request context: the read-mostly view of one inbound request

use crate::cookies::parse_cookie_header;
use crate::headers::HeaderMap;
use crate::http::HttpMethod;
use crate::query::{QueryMap, parse_query};
use bytes::Bytes;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// The request body slot.
///
/// The transport buffers the payload in full before dispatch begins and
/// stores it as [`Body::Raw`]; body-parser handlers may replace it with
/// a decoded representation. The dispatch engine itself never touches it.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    /// Raw bytes as delivered by the transport.
    Raw(Bytes),
    /// A decoded text payload.
    Text(String),
    /// A payload decoded by the JSON body parser.
    Json(Value),
    /// A payload decoded by the urlencoded body parser.
    Form(QueryMap),
}

impl Body {
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Raw(bytes) => bytes.is_empty(),
            Body::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// View the payload as text, if it is textual.
    ///
    /// Raw bytes are accepted only when valid UTF-8; decoded JSON/form
    /// payloads are not re-serialized.
    pub fn text(&self) -> Option<String> {
        match self {
            Body::Empty => Some(String::new()),
            Body::Raw(bytes) => String::from_utf8(bytes.to_vec()).ok(),
            Body::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn form(&self) -> Option<&QueryMap> {
        match self {
            Body::Form(map) => Some(map),
            _ => None,
        }
    }
}

/// One inbound request: method, path, query, cookies, headers, and the
/// body slot. Created once per request and shared by reference with
/// every handler in the chain; the response is always passed alongside
/// rather than stored here.
#[derive(Debug)]
pub struct Request {
    pub method: HttpMethod,
    pub path: String,
    pub original_url: String,
    pub host: String,
    pub ip: Option<String>,
    pub headers: HeaderMap,
    pub cookies: HashMap<String, String>,
    pub query: QueryMap,
    body: RwLock<Body>,
}

impl Request {
    /// Build a request from already-parsed transport parts.
    pub fn from_parts(
        method: HttpMethod,
        url: &str,
        headers: HeaderMap,
        ip: Option<String>,
    ) -> Self {
        let (path, query_string) = match url.split_once('?') {
            Some((p, q)) => (p, q),
            None => (url, ""),
        };
        let path = if path.is_empty() { "/" } else { path };

        let mut cookies = HashMap::new();
        for header in headers.get_all("cookie") {
            cookies.extend(parse_cookie_header(header));
        }

        Self {
            method,
            path: path.to_string(),
            original_url: url.to_string(),
            host: headers.get("host").unwrap_or_default().to_string(),
            ip,
            query: parse_query(query_string),
            cookies,
            headers,
            body: RwLock::new(Body::Empty),
        }
    }

    /// Convenience constructor for tests and embedders.
    pub fn new(method: HttpMethod, url: &str) -> Self {
        Self::from_parts(method, url, HeaderMap::new(), None)
    }

    /// Case-insensitive header lookup (first value).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Snapshot of the current body slot.
    pub fn body(&self) -> Body {
        self.body.read().clone()
    }

    /// Replace the body slot. Used by the transport to attach the
    /// buffered payload and by body-parser handlers to swap in the
    /// decoded value.
    pub fn set_body(&self, body: Body) {
        *self.body.write() = body;
    }
}
