//! CORS handler: a subset of Express's `cors()` middleware expressed
//! as an ordinary chain handler.

use crate::http::HttpMethod;
use crate::router::{Handler, handler};
use std::sync::Arc;

/// CORS configuration.
#[derive(Clone, Debug)]
pub struct CorsOptions {
    pub origin: String,
    pub methods: Vec<HttpMethod>,
    pub allowed_headers: Option<Vec<String>>,
    pub exposed_headers: Option<Vec<String>>,
    pub credentials: bool,
    /// Pass preflight requests on to later handlers instead of
    /// answering them here.
    pub preflight_continue: bool,
    /// Status used when answering preflight requests.
    pub options_success_status: u16,
}

impl Default for CorsOptions {
    fn default() -> Self {
        Self {
            origin: "*".to_string(),
            methods: vec![
                HttpMethod::GET,
                HttpMethod::HEAD,
                HttpMethod::PUT,
                HttpMethod::PATCH,
                HttpMethod::POST,
                HttpMethod::DELETE,
            ],
            allowed_headers: None,
            exposed_headers: None,
            credentials: false,
            preflight_continue: false,
            options_success_status: 204,
        }
    }
}

impl CorsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn methods(mut self, methods: Vec<HttpMethod>) -> Self {
        self.methods = methods;
        self
    }

    pub fn allowed_headers(mut self, headers: Vec<String>) -> Self {
        self.allowed_headers = Some(headers);
        self
    }

    pub fn exposed_headers(mut self, headers: Vec<String>) -> Self {
        self.exposed_headers = Some(headers);
        self
    }

    pub fn credentials(mut self, enable: bool) -> Self {
        self.credentials = enable;
        self
    }

    pub fn preflight_continue(mut self, enable: bool) -> Self {
        self.preflight_continue = enable;
        self
    }

    pub fn options_success_status(mut self, status: u16) -> Self {
        self.options_success_status = status;
        self
    }
}

/// Build a CORS handler from the given options.
pub fn cors(options: CorsOptions) -> Handler {
    let options = Arc::new(options);
    let methods = options
        .methods
        .iter()
        .map(HttpMethod::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    handler(move |req, res, next| {
        let options = options.clone();
        let methods = methods.clone();
        async move {
            res.set("Access-Control-Allow-Origin", &options.origin);
            if options.credentials {
                res.set("Access-Control-Allow-Credentials", "true");
            }
            if let Some(exposed) = &options.exposed_headers {
                res.set("Access-Control-Expose-Headers", &exposed.join(", "));
            }

            if req.method == HttpMethod::OPTIONS {
                res.set("Access-Control-Allow-Methods", &methods);
                // Echo the requested headers unless an explicit list is
                // configured, as the Express middleware does.
                let allowed = match &options.allowed_headers {
                    Some(list) => Some(list.join(", ")),
                    None => req
                        .get("access-control-request-headers")
                        .map(str::to_string),
                };
                if let Some(allowed) = allowed {
                    res.set("Access-Control-Allow-Headers", &allowed);
                }
                if options.preflight_continue {
                    next.proceed();
                } else {
                    res.status(options.options_success_status)
                        .set("Content-Length", "0")
                        .end();
                }
                return Ok(());
            }

            next.proceed();
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::HeaderMap;
    use crate::request::Request;
    use crate::response::Response;
    use crate::router::Next;

    #[tokio::test]
    async fn test_simple_request_gets_origin_and_continues() {
        let handler = cors(CorsOptions::new().origin("https://example.com"));
        let req = Arc::new(Request::new(HttpMethod::GET, "/api"));
        let res = Arc::new(Response::new());
        let next = Next::new();

        handler(req, res.clone(), next.clone()).await.unwrap();

        assert!(next.called());
        assert_eq!(
            res.get("Access-Control-Allow-Origin").as_deref(),
            Some("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_preflight_is_answered_with_success_status() {
        let handler = cors(CorsOptions::default());
        let headers: HeaderMap = [("Access-Control-Request-Headers", "X-Custom")]
            .into_iter()
            .collect();
        let req = Arc::new(Request::from_parts(HttpMethod::OPTIONS, "/api", headers, None));
        let res = Arc::new(Response::new());
        let next = Next::new();

        handler(req, res.clone(), next.clone()).await.unwrap();

        assert!(!next.called());
        let parts = res.to_parts();
        assert_eq!(parts.status, 204);
        assert_eq!(
            parts.headers.get("Access-Control-Allow-Methods"),
            Some("GET, HEAD, PUT, PATCH, POST, DELETE")
        );
        assert_eq!(
            parts.headers.get("Access-Control-Allow-Headers"),
            Some("X-Custom")
        );
        assert!(res.is_finalized());
    }

    #[tokio::test]
    async fn test_preflight_continue_hands_off() {
        let handler = cors(CorsOptions::new().preflight_continue(true));
        let req = Arc::new(Request::new(HttpMethod::OPTIONS, "/api"));
        let res = Arc::new(Response::new());
        let next = Next::new();

        handler(req, res.clone(), next.clone()).await.unwrap();

        assert!(next.called());
        assert!(!res.is_finalized());
    }

    #[tokio::test]
    async fn test_credentials_flag() {
        let handler = cors(CorsOptions::new().credentials(true));
        let req = Arc::new(Request::new(HttpMethod::GET, "/"));
        let res = Arc::new(Response::new());

        handler(req, res.clone(), Next::new()).await.unwrap();

        assert_eq!(
            res.get("Access-Control-Allow-Credentials").as_deref(),
            Some("true")
        );
    }
}
