//! The middleware pipeline wrapped around the router.
//!
//! Each middleware is a [`Decorator`](crate::decorator::Decorator) turning a
//! handler into a handler. [`app`](crate::app::app) chains them around the router,
//! outermost first:
//!
//! 1. [`RecoverDecorator`]: panics become `500` responses
//! 2. [`SecureHeadersDecorator`]: XSS, sniffing and framing protection headers
//! 3. [`RequestIdDecorator`]: `X-Request-ID` on request and response
//! 4. [`AccessLogDecorator`]: one JSON access line per request
//! 5. [`CacheControlDecorator`]: disables client and proxy caching
//!
//! [`BodyTapDecorator`] is not part of that chain: it wraps the `/upload` handler
//! alone, so only bodies sent to that route are compared with each other.

mod access_log;
mod body_tap;
mod cache_control;
mod recover;
mod request_id;
mod secure;

pub use access_log::{AccessLogDecorator, AccessLogHandler, Skipper};
pub use body_tap::{BodyTapDecorator, BodyTapHandler};
pub use cache_control::{CacheControlDecorator, CacheControlHandler};
pub use recover::{RecoverDecorator, RecoverHandler};
pub use request_id::{RequestIdDecorator, RequestIdHandler, X_REQUEST_ID};
pub use secure::{SecureHeaders, SecureHeadersDecorator, SecureHeadersHandler};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::body::{ReqBody, ResponseBody, req_body};
    use crate::error::HandlerError;
    use crate::handler::{HandlerResult, RequestHandler};
    use async_trait::async_trait;
    use bytes::Bytes;
    use http::{Method, Request, Response, StatusCode};
    use http_body_util::{BodyExt, Full};
    use std::sync::Mutex;

    pub fn request(method: Method, path: &str, body: &'static [u8]) -> Request<ReqBody> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(req_body(Full::new(Bytes::from_static(body))))
            .unwrap()
    }

    /// Answers with a fixed status and remembers what it was handed.
    #[derive(Default)]
    pub struct Recorder {
        pub status: Option<StatusCode>,
        pub fail_with: Option<fn() -> HandlerError>,
        pub seen: Mutex<Vec<(http::HeaderMap, Bytes)>>,
    }

    #[async_trait]
    impl RequestHandler for Recorder {
        async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
            let (parts, body) = req.into_parts();
            let bytes = body.collect().await.map_err(HandlerError::body)?.to_bytes();
            self.seen.lock().unwrap().push((parts.headers, bytes));

            if let Some(fail_with) = self.fail_with {
                return Err(fail_with());
            }
            let mut response = Response::new(ResponseBody::empty());
            *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
            Ok(response)
        }
    }
}
