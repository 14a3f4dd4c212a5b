// Application bootstrapper and HTTP server glue
//
// The transport boundary: accepts connections, buffers each request
// body in full, builds the per-request context/builder pair, runs the
// dispatch chain, and writes the finalized response exactly once.

use crate::error::Error;
use crate::headers::HeaderMap;
use crate::http::HttpMethod;
use crate::request::{Body, Request};
use crate::response::Response;
use crate::router::Router;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming as IncomingBody;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// The main application: a router plus the HTTP/1 serving loop.
#[derive(Default)]
pub struct App {
    pub router: Router,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start serving on the given port. Registration must be complete
    /// before this is called; the chain is read-only while serving.
    pub async fn listen(self, port: u16) -> Result<(), Error> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "gantry server listening");

        let router = Arc::new(self.router);

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let router = router.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: hyper::Request<IncomingBody>| {
                    let router = router.clone();
                    async move { handle_request(req, router, peer).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(error = %err, "error serving connection");
                }
            });
        }
    }
}

/// Handle one inbound request end to end.
async fn handle_request(
    req: hyper::Request<IncomingBody>,
    router: Arc<Router>,
    peer: SocketAddr,
) -> Result<hyper::Response<Full<Bytes>>, hyper::Error> {
    let Some(method) = HttpMethod::from_str(req.method().as_str()) else {
        return Ok(plain_response(501, "Not Implemented"));
    };

    let url = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut headers = HeaderMap::new();
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            headers.add(name.as_str(), value);
        }
    }

    // The whole body is buffered before dispatch begins; handlers see a
    // complete payload, never a stream.
    let body_bytes = req.collect().await?.to_bytes();

    let request = Arc::new(Request::from_parts(
        method,
        &url,
        headers,
        Some(peer.ip().to_string()),
    ));
    if !body_bytes.is_empty() {
        request.set_body(Body::Raw(body_bytes));
    }
    let response = Arc::new(Response::new());

    if let Err(err) = router.dispatch(&request, &response).await {
        // No error boundary exists inside the chain; this is the
        // process boundary, so log and answer with a bare 500.
        error!(
            error = %err,
            method = %request.method,
            path = %request.path,
            "handler failed"
        );
        return Ok(plain_response(500, "Internal Server Error"));
    }

    let parts = response.to_parts();
    let mut builder = hyper::Response::builder().status(parts.status);
    for (name, value) in parts.headers.iter() {
        builder = builder.header(name, value);
    }
    Ok(builder
        .body(Full::new(parts.body))
        .unwrap_or_else(|_| plain_response(500, "Internal Server Error")))
}

fn plain_response(status: u16, body: &'static str) -> hyper::Response<Full<Bytes>> {
    let mut response = hyper::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() =
        hyper::StatusCode::from_u16(status).unwrap_or(hyper::StatusCode::INTERNAL_SERVER_ERROR);
    response
}
