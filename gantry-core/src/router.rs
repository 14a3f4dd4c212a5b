//! The dispatch engine: an ordered middleware chain over compiled
//! route patterns.
//!
//! Registration builds a process-lifetime table of
//! `(pattern, method-or-any, handler)` entries; dispatch walks it in
//! registration order, awaiting each matching handler to completion
//! before consulting its continuation signal. A handler that does not
//! call [`Next::proceed`] is terminal. Handlers never run concurrently
//! within one request.

use crate::error::Error;
use crate::http::HttpMethod;
use crate::request::Request;
use crate::response::Response;
use crate::route::RoutePattern;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, trace};

/// The single-shot continuation signal handed to each handler.
///
/// Invoking [`Next::proceed`] asks the engine to continue to the next
/// matching entry after the handler returns; not invoking it ends the
/// chain. The engine creates a fresh signal per handler invocation and
/// reads it only after the handler's future completes, so suspending
/// handlers cannot race it.
#[derive(Clone, Debug, Default)]
pub struct Next {
    called: Arc<AtomicBool>,
}

impl Next {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal that dispatch should continue past this handler.
    pub fn proceed(&self) {
        self.called.store(true, Ordering::Release);
    }

    pub fn called(&self) -> bool {
        self.called.load(Ordering::Acquire)
    }
}

/// A boxed handler future.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send>>;

/// A registered handler: the one fixed signature every unit of
/// request-processing logic shares.
pub type Handler =
    Arc<dyn Fn(Arc<Request>, Arc<Response>, Next) -> HandlerFuture + Send + Sync>;

/// Wrap an async closure into a [`Handler`].
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Arc<Request>, Arc<Response>, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Error>> + Send + 'static,
{
    Arc::new(move |req, res, next| -> HandlerFuture { Box::pin(f(req, res, next)) })
}

/// Trait form of the handler signature, for handlers with state of
/// their own (the static asset handler implements this).
#[async_trait]
pub trait Handle: Send + Sync {
    async fn call(&self, req: Arc<Request>, res: Arc<Response>, next: Next) -> Result<(), Error>;
}

/// Adapt a [`Handle`] implementation into a [`Handler`].
pub fn service(h: impl Handle + 'static) -> Handler {
    let h = Arc::new(h);
    Arc::new(move |req, res, next| -> HandlerFuture {
        let h = h.clone();
        Box::pin(async move { h.call(req, res, next).await })
    })
}

/// One entry in the middleware chain.
struct RouteEntry {
    pattern: RoutePattern,
    method: Option<HttpMethod>,
    handler: Handler,
}

/// The ordered middleware chain. Registration order is the sole
/// tie-break between matching entries; the table is read-only once
/// serving begins.
#[derive(Default)]
pub struct Router {
    entries: Vec<RouteEntry>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The registration funnel: one entry per pattern, all sharing the
    /// handler. Every public registration method ends up here.
    pub fn register(
        &mut self,
        patterns: &[&str],
        method: Option<HttpMethod>,
        as_prefix: bool,
        handler: Handler,
    ) -> &mut Self {
        for pattern in patterns {
            self.entries.push(RouteEntry {
                pattern: RoutePattern::compile(pattern, as_prefix),
                method,
                handler: handler.clone(),
            });
        }
        self
    }

    /// Register a prefix-matched handler for any method.
    pub fn use_handler(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], None, true, handler)
    }

    /// Register one handler under several prefix patterns.
    pub fn use_many(&mut self, patterns: &[&str], handler: Handler) -> &mut Self {
        self.register(patterns, None, true, handler)
    }

    /// Register a handler that sees every request (the empty prefix).
    pub fn use_all(&mut self, handler: Handler) -> &mut Self {
        self.register(&[""], None, true, handler)
    }

    /// Register an exact-path handler for any method.
    pub fn all(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], None, false, handler)
    }

    pub fn get(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::GET), false, handler)
    }

    pub fn head(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::HEAD), false, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::POST), false, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::PUT), false, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::PATCH), false, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::DELETE), false, handler)
    }

    pub fn options(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::OPTIONS), false, handler)
    }

    pub fn trace(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::TRACE), false, handler)
    }

    pub fn connect(&mut self, pattern: &str, handler: Handler) -> &mut Self {
        self.register(&[pattern], Some(HttpMethod::CONNECT), false, handler)
    }

    /// Run the chain for one request/response pair.
    ///
    /// Entries are evaluated in registration order; each matching
    /// handler runs to completion (its future is awaited) before the
    /// continuation flag is read. When no entry matched at all the
    /// response becomes `404 Cannot <METHOD> <path>`. Finalization
    /// runs unconditionally afterwards and is a no-op if some handler
    /// already finalized. A handler error propagates to the caller
    /// untouched; no error boundary is installed here.
    pub async fn dispatch(
        &self,
        req: &Arc<Request>,
        res: &Arc<Response>,
    ) -> Result<(), Error> {
        debug!(
            method = %req.method,
            path = %req.path,
            entries = self.entries.len(),
            "dispatching request"
        );

        let mut matched_any = false;
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(method) = entry.method {
                if method != req.method {
                    continue;
                }
            }
            if !entry.pattern.matches(&req.path) {
                continue;
            }
            matched_any = true;

            trace!(index, pattern = entry.pattern.raw(), "invoking handler");
            let next = Next::new();
            (entry.handler)(req.clone(), res.clone(), next.clone()).await?;
            if !next.called() {
                break;
            }
        }

        if !matched_any {
            debug!(method = %req.method, path = %req.path, "no route matched");
            res.status(404)
                .send(format!("Cannot {} {}", req.method, req.path));
        }

        res.end();
        Ok(())
    }
}
