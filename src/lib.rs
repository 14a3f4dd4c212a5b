// Gantry - an Express-style HTTP framework for Rust
//
// This library provides an ordered middleware chain over compiled route
// patterns, a per-request request/response pair threaded through every
// handler, and batteries like static asset serving and body parsing.

// Re-export core functionality
pub use gantry_core::*;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        App,
        Body,
        CookieOptions,
        Error,
        Handler,
        HeaderMap,
        HttpMethod,
        Next,
        Request,
        Response,
        Router,
        handler,
        serve_static,
        service,
    };
}
