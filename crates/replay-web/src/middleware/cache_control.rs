use crate::body::ReqBody;
use crate::decorator::Decorator;
use crate::handler::{HandlerResult, RequestHandler};
use crate::responder::into_response;
use async_trait::async_trait;
use http::header::{CACHE_CONTROL, EXPIRES, PRAGMA};
use http::{HeaderValue, Request};

/// Tells clients and proxies not to cache anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct CacheControlDecorator;

#[derive(Debug)]
pub struct CacheControlHandler<H> {
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for CacheControlDecorator {
    type Out = CacheControlHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        CacheControlHandler { handler: raw }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for CacheControlHandler<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        let mut response = into_response(self.handler.invoke(req).await);

        let headers = response.headers_mut();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers.insert(EXPIRES, HeaderValue::from_static("0"));

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::CacheControlDecorator;
    use crate::decorator::Decorator;
    use crate::error::HandlerError;
    use crate::handler::RequestHandler;
    use crate::middleware::test_support::{Recorder, request};
    use http::{Method, StatusCode};

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_headers_set() {
        let handler = CacheControlDecorator.decorate(Recorder::default());

        let response = handler.invoke(request(Method::POST, "/upload", b"")).await.unwrap();

        assert_eq!(response.headers()["cache-control"], "no-cache, no-store");
        assert_eq!(response.headers()["pragma"], "no-cache");
        assert_eq!(response.headers()["expires"], "0");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_headers_set_on_error() {
        let handler = CacheControlDecorator
            .decorate(Recorder { fail_with: Some(|| HandlerError::NotFound { path: "/x".into() }), ..Recorder::default() });

        let response = handler.invoke(request(Method::GET, "/x", b"")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["cache-control"], "no-cache, no-store");
    }
}
