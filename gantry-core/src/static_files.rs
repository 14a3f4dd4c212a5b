//! Static asset serving with caching headers and single-range
//! partial-content support.
//!
//! [`StaticFiles`] is an ordinary chain handler: requests outside its
//! root fall through via the continuation, requests inside it are
//! answered terminally. The root is validated against parent-directory
//! references at construction time; request paths are re-checked per
//! request anyway.

use crate::error::Error;
use crate::http::HttpMethod;
use crate::request::Request;
use crate::response::Response;
use crate::router::{Handle, Handler, Next, service};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::{debug, warn};

/// `Cache-Control` max-age: raw seconds or a duration expression such
/// as `90s`, `15m`, `2h`, `1d`, `1w`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MaxAge {
    Secs(u64),
    Expr(String),
}

impl MaxAge {
    /// Resolve to whole seconds. An unparseable expression resolves to
    /// nothing, which disables the `Cache-Control` header.
    pub fn resolve(&self) -> Option<u64> {
        match self {
            MaxAge::Secs(secs) => Some(*secs),
            MaxAge::Expr(expr) => parse_duration_secs(expr),
        }
    }
}

impl Default for MaxAge {
    fn default() -> Self {
        MaxAge::Secs(0)
    }
}

impl From<u64> for MaxAge {
    fn from(secs: u64) -> Self {
        MaxAge::Secs(secs)
    }
}

impl From<&str> for MaxAge {
    fn from(expr: &str) -> Self {
        MaxAge::Expr(expr.to_string())
    }
}

/// Options for [`StaticFiles`]. Ranges and caching are on, fallthrough
/// is off, assets are not immutable, and max-age is zero unless set.
#[derive(Clone, Debug)]
pub struct ServeStaticOptions {
    pub accept_ranges: bool,
    pub cache_control: bool,
    pub fallthrough: bool,
    pub immutable: bool,
    pub last_modified: bool,
    pub max_age: MaxAge,
}

impl Default for ServeStaticOptions {
    fn default() -> Self {
        Self {
            accept_ranges: true,
            cache_control: true,
            fallthrough: false,
            immutable: false,
            last_modified: true,
            max_age: MaxAge::default(),
        }
    }
}

impl ServeStaticOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept_ranges(mut self, enable: bool) -> Self {
        self.accept_ranges = enable;
        self
    }

    pub fn cache_control(mut self, enable: bool) -> Self {
        self.cache_control = enable;
        self
    }

    pub fn fallthrough(mut self, enable: bool) -> Self {
        self.fallthrough = enable;
        self
    }

    pub fn immutable(mut self, enable: bool) -> Self {
        self.immutable = enable;
        self
    }

    pub fn last_modified(mut self, enable: bool) -> Self {
        self.last_modified = enable;
        self
    }

    pub fn max_age(mut self, max_age: impl Into<MaxAge>) -> Self {
        self.max_age = max_age.into();
        self
    }
}

/// The static asset handler.
pub struct StaticFiles {
    root: String,
    options: ServeStaticOptions,
}

impl StaticFiles {
    /// Create a handler rooted at `root` (relative to the working
    /// directory). Fails immediately if the root references a parent
    /// directory; that is a configuration error, not a request error.
    pub fn new(root: &str, options: ServeStaticOptions) -> Result<Self, Error> {
        let root = normalize_fs_path(root);
        if references_parent(&root) {
            return Err(Error::BadStaticRoot(root));
        }
        Ok(Self { root, options })
    }

    pub fn into_handler(self) -> Handler {
        service(self)
    }
}

/// Build a static handler with default options.
pub fn serve_static(root: &str) -> Result<Handler, Error> {
    Ok(StaticFiles::new(root, ServeStaticOptions::default())?.into_handler())
}

/// Build a static handler with explicit options.
pub fn serve_static_with(root: &str, options: ServeStaticOptions) -> Result<Handler, Error> {
    Ok(StaticFiles::new(root, options)?.into_handler())
}

#[async_trait]
impl Handle for StaticFiles {
    async fn call(&self, req: Arc<Request>, res: Arc<Response>, next: Next) -> Result<(), Error> {
        let filepath = normalize_fs_path(&req.path);
        if filepath != self.root && !filepath.starts_with(&format!("{}/", self.root)) {
            next.proceed();
            return Ok(());
        }

        // The root was validated at construction; reject any request
        // path that still escapes it.
        if references_parent(&filepath) {
            warn!(path = %req.path, "rejected parent-directory reference");
            res.status(400).send("Path traversal rejected").end();
            return Ok(());
        }

        if !matches!(req.method, HttpMethod::GET | HttpMethod::HEAD) {
            res.status(404).end();
            return Ok(());
        }

        // Do not follow symbolic links out of the root.
        let metadata = match tokio::fs::symlink_metadata(&filepath).await {
            Ok(metadata) => metadata,
            Err(_) => {
                if self.options.fallthrough {
                    next.proceed();
                    return Ok(());
                }
                res.status(404)
                    .send(format!("File {} not found", filepath))
                    .end();
                return Ok(());
            }
        };

        if metadata.is_dir() {
            res.status(404)
                .send(format!("File {} not found", filepath))
                .end();
            return Ok(());
        }

        res.content_type(mime_type(&filepath));

        if self.options.last_modified {
            if let Ok(modified) = metadata.modified() {
                res.set("Last-Modified", &httpdate::fmt_http_date(modified));
            }
        }

        if self.options.cache_control {
            if let Some(secs) = self.options.max_age.resolve().filter(|&secs| secs > 0) {
                let value = if self.options.immutable {
                    format!("max-age={}, immutable", secs)
                } else {
                    format!("max-age={}", secs)
                };
                res.set("Cache-Control", &value);
            }
        }

        if self.options.accept_ranges {
            res.set("Accept-Ranges", "bytes");
        }

        let size = metadata.len();
        let range_header = if self.options.accept_ranges {
            req.get("range").map(str::to_string)
        } else {
            None
        };

        let Some(range_header) = range_header else {
            if req.method == HttpMethod::HEAD {
                res.status(200)
                    .set("Content-Length", &size.to_string())
                    .end();
                return Ok(());
            }
            match tokio::fs::read(&filepath).await {
                Ok(content) => {
                    debug!(path = %filepath, bytes = content.len(), "serving full file");
                    res.status(200).raw(content).end();
                }
                Err(_) => {
                    res.status(500).send("Internal server error").end();
                }
            }
            return Ok(());
        };

        let ranges = parse_range_header(&range_header);
        if ranges.len() != 1 {
            res.status(416).send("Only a single range is supported").end();
            return Ok(());
        }
        let (start, end) = ranges[0];
        let start = start.unwrap_or(0);
        let end = end.unwrap_or(size.saturating_sub(1));
        if end >= size || start > end {
            res.status(416).send("Range out-of-bound").end();
            return Ok(());
        }

        let length = end - start + 1;
        res.status(206)
            .set("Content-Length", &length.to_string())
            .set("Content-Range", &format!("bytes {}-{}/{}", start, end, size));

        if req.method == HttpMethod::HEAD {
            res.end();
            return Ok(());
        }

        debug!(path = %filepath, start, end, "serving byte range");
        match read_slice(&filepath, start, length as usize).await {
            // The content type is already set, so the body goes through
            // the raw path rather than `send`'s inference.
            Ok(slice) => {
                res.raw(slice);
            }
            Err(_) => {
                res.status(500).send("Internal server error").end();
            }
        }
        Ok(())
    }
}

async fn read_slice(path: &str, start: u64, length: usize) -> std::io::Result<Bytes> {
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(SeekFrom::Start(start)).await?;
    let mut buffer = vec![0u8; length];
    file.read_exact(&mut buffer).await?;
    Ok(Bytes::from(buffer))
}

/// Turn a request path into a relative file-system path: no leading or
/// trailing separator.
fn normalize_fs_path(path: &str) -> String {
    path.trim_start_matches('/').trim_end_matches('/').to_string()
}

/// Whether any segment of the path is a parent-directory reference.
fn references_parent(path: &str) -> bool {
    path.split('/').any(|segment| segment == "..")
}

/// Parse a `Range` header: `bytes=<start>-<end>`, comma-separated.
/// Entries with unparseable offsets are dropped, which surfaces as an
/// unsatisfiable request upstream.
fn parse_range_header(value: &str) -> Vec<(Option<u64>, Option<u64>)> {
    let Some(spec) = value.strip_prefix("bytes=") else {
        return Vec::new();
    };
    spec.split(',')
        .filter_map(|range| {
            let (start, end) = range.trim().split_once('-')?;
            let parse = |s: &str| -> Option<Option<u64>> {
                if s.is_empty() {
                    Some(None)
                } else {
                    s.parse::<u64>().ok().map(Some)
                }
            };
            Some((parse(start)?, parse(end)?))
        })
        .collect()
}

/// MIME type from the file extension; `text/plain` when unknown.
fn mime_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some("html") | Some("htm") => "text/html",
        Some("css") => "text/css",
        Some("js") | Some("mjs") => "application/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("ogg") => "audio/ogg",
        _ => "text/plain",
    }
}

/// Parse duration expressions like `500ms`, `90s`, `15m`, `2h`, `1d`,
/// `1w` into whole seconds.
fn parse_duration_secs(expr: &str) -> Option<u64> {
    let expr = expr.trim();
    let digits_end = expr
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(expr.len());
    let number: u64 = expr[..digits_end].parse().ok()?;
    match expr[digits_end..].trim() {
        "" | "s" | "sec" | "secs" => Some(number),
        "ms" => Some(number / 1000),
        "m" | "min" | "mins" => Some(number * 60),
        "h" | "hr" | "hrs" => Some(number * 3600),
        "d" | "day" | "days" => Some(number * 86_400),
        "w" => Some(number * 604_800),
        _ => None,
    }
}
