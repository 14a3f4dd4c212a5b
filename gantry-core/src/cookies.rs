//! Cookie parsing and `Set-Cookie` formatting.

use std::collections::HashMap;
use std::time::SystemTime;

/// `SameSite` attribute values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// Options for one `Set-Cookie` line.
///
/// `path` defaults to `/`; everything else is off unless set.
#[derive(Clone, Debug)]
pub struct CookieOptions {
    pub domain: Option<String>,
    pub path: String,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    pub max_age: Option<i64>,
    pub expires: Option<SystemTime>,
    /// Percent-encode the cookie value. On by default.
    pub encode: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            domain: None,
            path: "/".to_string(),
            http_only: false,
            secure: false,
            same_site: None,
            max_age: None,
            expires: None,
            encode: true,
        }
    }
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn http_only(mut self, enable: bool) -> Self {
        self.http_only = enable;
        self
    }

    pub fn secure(mut self, enable: bool) -> Self {
        self.secure = enable;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn expires(mut self, at: SystemTime) -> Self {
        self.expires = Some(at);
        self
    }
}

/// Parse a request `Cookie` header into a name→value map.
///
/// Malformed fragments (no `=`) are skipped; values are percent-decoded.
pub fn parse_cookie_header(header: &str) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for fragment in header.split(';') {
        let Some((name, value)) = fragment.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().trim_matches('"');
        let decoded = urlencoding::decode(value)
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| value.to_string());
        cookies.insert(name.to_string(), decoded);
    }
    cookies
}

/// Format one `Set-Cookie` header value.
///
/// Directive order: `name=value; Path=<p>[; Domain=<d>][; HttpOnly]
/// [; SameSite=<s>][; Secure][; Max-Age=<n>][; Expires=<date>]`.
pub fn format_set_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let encoded;
    let value = if options.encode {
        encoded = urlencoding::encode(value);
        encoded.as_ref()
    } else {
        value
    };

    let mut line = format!("{}={}; Path={}", name, value, options.path);
    if let Some(domain) = &options.domain {
        line.push_str("; Domain=");
        line.push_str(domain);
    }
    if options.http_only {
        line.push_str("; HttpOnly");
    }
    if let Some(same_site) = options.same_site {
        line.push_str("; SameSite=");
        line.push_str(same_site.as_str());
    }
    if options.secure {
        line.push_str("; Secure");
    }
    if let Some(max_age) = options.max_age {
        line.push_str("; Max-Age=");
        line.push_str(&max_age.to_string());
    }
    if let Some(expires) = options.expires {
        line.push_str("; Expires=");
        line.push_str(&httpdate::fmt_http_date(expires));
    }
    line
}
