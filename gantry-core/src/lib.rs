// Core library for the Gantry HTTP framework
// Routing, middleware dispatch, request/response lifecycle, and static
// asset serving.

pub mod app;
pub mod body_parser;
pub mod cookies;
pub mod cors;
pub mod error;
pub mod headers;
pub mod http;
pub mod logging;
pub mod query;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod static_files;

// Re-export commonly used types
pub use app::App;
pub use cookies::{CookieOptions, SameSite};
pub use cors::{CorsOptions, cors};
pub use error::Error;
pub use headers::HeaderMap;
pub use http::HttpMethod;
pub use query::{QueryMap, QueryValue};
pub use request::{Body, Request};
pub use response::{Payload, Response, ResponseParts};
pub use route::RoutePattern;
pub use router::{Handle, Handler, Next, Router, handler, service};
pub use static_files::{
    MaxAge, ServeStaticOptions, StaticFiles, serve_static, serve_static_with,
};
