//! Body-parsing handlers.
//!
//! These are ordinary chain handlers layered on top of the core: each
//! is gated on the request content type, decodes the buffered body,
//! replaces the request's body slot with the decoded value, and
//! continues the chain. A malformed body terminates with a 400.

use crate::request::Body;
use crate::router::{Handler, handler};

/// Decode `application/json` bodies into [`Body::Json`].
pub fn json() -> Handler {
    handler(|req, res, next| async move {
        if media_type(req.get("content-type")) != Some("application/json") {
            next.proceed();
            return Ok(());
        }
        let parsed = req
            .body()
            .text()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok());
        match parsed {
            Some(value) => {
                req.set_body(Body::Json(value));
                next.proceed();
            }
            None => {
                res.status(400).send("Query parser fails to parse JSON").end();
            }
        }
        Ok(())
    })
}

/// Decode `application/x-www-form-urlencoded` bodies into [`Body::Form`].
pub fn urlencoded() -> Handler {
    handler(|req, res, next| async move {
        if media_type(req.get("content-type")) != Some("application/x-www-form-urlencoded") {
            next.proceed();
            return Ok(());
        }
        match req.body().text() {
            Some(text) => {
                req.set_body(Body::Form(crate::query::parse_query(&text)));
                next.proceed();
            }
            None => {
                res.status(400)
                    .send("Query parser fails to parse urlencoded string")
                    .end();
            }
        }
        Ok(())
    })
}

/// Reject requests whose buffered body exceeds `max_size` bytes with a
/// 413. The transport buffers bodies in full, so this bounds what later
/// handlers ever see, not what was read.
pub fn limit(max_size: usize) -> Handler {
    handler(move |req, res, next| async move {
        let too_large = match req.body() {
            Body::Raw(bytes) => bytes.len() > max_size,
            Body::Text(text) => text.len() > max_size,
            _ => false,
        };
        if too_large {
            res.status(413)
                .send("Request body exceeds the configured limit")
                .end();
        } else {
            next.proceed();
        }
        Ok(())
    })
}

/// The media type of a `Content-Type` value, without parameters.
fn media_type(value: Option<&str>) -> Option<&str> {
    value.map(|v| v.split(';').next().unwrap_or(v).trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use crate::request::Request;
    use crate::response::Response;
    use crate::router::Router;
    use bytes::Bytes;
    use std::sync::Arc;

    fn post_with_body(content_type: &str, body: &'static [u8]) -> Arc<Request> {
        let headers: crate::headers::HeaderMap =
            [("Content-Type", content_type)].into_iter().collect();
        let req = Request::from_parts(HttpMethod::POST, "/submit", headers, None);
        req.set_body(Body::Raw(Bytes::from_static(body)));
        Arc::new(req)
    }

    #[tokio::test]
    async fn test_json_body_is_decoded_and_chain_continues() {
        let mut router = Router::new();
        router.use_all(json());
        router.post(
            "/submit",
            handler(|req, res, _next| async move {
                let body = req.body();
                let value = body.json().cloned().unwrap_or_default();
                res.json(&value)?;
                Ok(())
            }),
        );

        let req = post_with_body("application/json", b"{\"name\":\"ada\"}");
        let res = Arc::new(Response::new());
        router.dispatch(&req, &res).await.unwrap();

        assert_eq!(res.to_parts().status, 200);
        assert_eq!(res.to_parts().body, Bytes::from_static(b"{\"name\":\"ada\"}"));
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_400() {
        let mut router = Router::new();
        router.use_all(json());
        router.post(
            "/submit",
            handler(|_req, res, _next| async move {
                res.send("should not run");
                Ok(())
            }),
        );

        let req = post_with_body("application/json", b"{not json");
        let res = Arc::new(Response::new());
        router.dispatch(&req, &res).await.unwrap();

        let parts = res.to_parts();
        assert_eq!(parts.status, 400);
        assert_eq!(
            parts.body,
            Bytes::from_static(b"Query parser fails to parse JSON")
        );
    }

    #[tokio::test]
    async fn test_other_content_types_pass_through_untouched() {
        let req = post_with_body("text/plain", b"just text");
        let res = Arc::new(Response::new());
        let next = crate::router::Next::new();

        json()(req.clone(), res.clone(), next.clone()).await.unwrap();

        assert!(next.called());
        assert_eq!(req.body(), Body::Raw(Bytes::from_static(b"just text")));
    }

    #[tokio::test]
    async fn test_content_type_parameters_are_ignored() {
        let req = post_with_body("application/json; charset=utf-8", b"[1,2]");
        let res = Arc::new(Response::new());
        let next = crate::router::Next::new();

        json()(req.clone(), res.clone(), next.clone()).await.unwrap();

        assert!(next.called());
        assert_eq!(req.body().json(), Some(&serde_json::json!([1, 2])));
    }

    #[tokio::test]
    async fn test_urlencoded_body_is_decoded() {
        let req = post_with_body(
            "application/x-www-form-urlencoded",
            b"name=ada&tags[]=a&tags[]=b",
        );
        let res = Arc::new(Response::new());
        let next = crate::router::Next::new();

        urlencoded()(req.clone(), res.clone(), next.clone())
            .await
            .unwrap();

        assert!(next.called());
        let body = req.body();
        let form = body.form().unwrap();
        assert_eq!(form.get_str("name"), Some("ada"));
        assert_eq!(
            form.get("tags").and_then(|v| v.as_seq()).map(|s| s.len()),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_limit_rejects_oversized_bodies() {
        let req = post_with_body("application/json", b"0123456789");
        let res = Arc::new(Response::new());
        let next = crate::router::Next::new();

        limit(4)(req, res.clone(), next.clone()).await.unwrap();

        assert!(!next.called());
        assert_eq!(res.to_parts().status, 413);
    }

    #[tokio::test]
    async fn test_limit_passes_small_bodies() {
        let req = post_with_body("application/json", b"[1]");
        let res = Arc::new(Response::new());
        let next = crate::router::Next::new();

        limit(1024)(req, res.clone(), next.clone()).await.unwrap();

        assert!(next.called());
        assert!(!res.is_finalized());
    }

    #[tokio::test]
    async fn test_urlencoded_rejects_invalid_utf8() {
        let req = post_with_body("application/x-www-form-urlencoded", &[0xff, 0xfe, 0xfd]);
        let res = Arc::new(Response::new());
        let next = crate::router::Next::new();

        urlencoded()(req, res.clone(), next.clone()).await.unwrap();

        assert!(!next.called());
        assert_eq!(res.to_parts().status, 400);
    }
}
