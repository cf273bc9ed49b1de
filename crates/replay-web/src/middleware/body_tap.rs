use crate::body::{ReqBody, req_body};
use crate::decorator::Decorator;
use crate::handler::{HandlerResult, RequestHandler};
use crate::middleware::X_REQUEST_ID;
use async_trait::async_trait;
use http::Request;
use replay_check::{BodyTap, ComparisonOutcome, ExchangeMeta, Tapped};
use tracing::debug;

/// Puts a [`BodyTap`] in front of the wrapped handler.
///
/// The handler gets the request with a reader over the captured bytes. After it has
/// answered, the capture is compared with the baseline; the comparison never
/// changes the response.
#[derive(Debug, Clone)]
pub struct BodyTapDecorator {
    tap: BodyTap,
}

impl BodyTapDecorator {
    pub fn new(tap: BodyTap) -> Self {
        Self { tap }
    }
}

#[derive(Debug)]
pub struct BodyTapHandler<H> {
    tap: BodyTap,
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for BodyTapDecorator {
    type Out = BodyTapHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        BodyTapHandler { tap: self.tap.clone(), handler: raw }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for BodyTapHandler<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        let mut meta = ExchangeMeta {
            request_id: req.headers().get(X_REQUEST_ID).and_then(|id| id.to_str().ok()).map(str::to_owned),
            method: Some(req.method().clone()),
            path: Some(req.uri().path().to_owned()),
            status: None,
        };

        let Tapped { request, captured } = self.tap.intercept(req).await?;

        let result = self.handler.invoke(request.map(req_body)).await;

        meta.status = Some(match &result {
            Ok(response) => response.status(),
            Err(e) => e.status(),
        });

        match self.tap.observe(captured, &meta) {
            ComparisonOutcome::BaselineSet { sequence } => debug!(sequence, "baseline body recorded"),
            ComparisonOutcome::Consistent { sequence } => debug!(sequence, "body matches baseline"),
            ComparisonOutcome::Diverged(_) => {}
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::BodyTapDecorator;
    use crate::body::req_body;
    use crate::decorator::Decorator;
    use crate::error::HandlerError;
    use crate::handler::RequestHandler;
    use crate::middleware::test_support::{Recorder, request};
    use bytes::Bytes;
    use futures::stream;
    use http::{Method, Request, StatusCode};
    use http_body::Frame;
    use http_body_util::StreamBody;
    use replay_check::{BodyTap, ConsistencyChecker, DiagnosticSink, DivergenceReport, ExchangeMeta};
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Collect {
        reports: Mutex<Vec<(Bytes, Bytes, ExchangeMeta)>>,
    }

    impl DiagnosticSink for Collect {
        fn report(&self, report: &DivergenceReport, meta: &ExchangeMeta) {
            self.reports.lock().unwrap().push((report.before().clone(), report.after().clone(), meta.clone()));
        }
    }

    fn decorator() -> (BodyTapDecorator, Arc<ConsistencyChecker>, Arc<Collect>) {
        let checker = Arc::new(ConsistencyChecker::new());
        let sink = Arc::new(Collect::default());
        let tap = BodyTap::with_sink(checker.clone(), sink.clone());
        (BodyTapDecorator::new(tap), checker, sink)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_handler_sees_full_body() {
        let (decorator, checker, sink) = decorator();
        let handler = decorator.decorate(Recorder::default());

        let mut req = request(Method::POST, "/upload", b"payload bytes");
        req.headers_mut().insert("x-custom", "kept".parse().unwrap());
        let response = handler.invoke(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let seen = handler.handler.seen.lock().unwrap();
        assert_eq!(seen[0].0["x-custom"], "kept");
        assert_eq!(seen[0].1.as_ref(), b"payload bytes");

        assert_eq!(checker.baseline().unwrap().bytes().as_ref(), b"payload bytes");
        assert!(sink.reports.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_divergence_is_reported_with_exchange() {
        let (decorator, _checker, sink) = decorator();
        let handler = decorator.decorate(Recorder { status: Some(StatusCode::BAD_REQUEST), ..Recorder::default() });

        handler.invoke(request(Method::POST, "/upload", b"first")).await.unwrap();

        let mut req = request(Method::POST, "/upload", b"");
        req.headers_mut().insert("x-request-id", "abc".parse().unwrap());
        let response = handler.invoke(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let reports = sink.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        let (before, after, meta) = &reports[0];
        assert_eq!(before.as_ref(), b"first");
        assert!(after.is_empty());
        assert_eq!(meta.request_id.as_deref(), Some("abc"));
        assert_eq!(meta.method, Some(Method::POST));
        assert_eq!(meta.path.as_deref(), Some("/upload"));
        assert_eq!(meta.status, Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_handler_error_is_passed_through() {
        let (decorator, checker, _sink) = decorator();
        let handler = decorator.decorate(Recorder {
            fail_with: Some(|| HandlerError::UnsupportedMediaType { content_type: "text/plain".into() }),
            ..Recorder::default()
        });

        let result = handler.invoke(request(Method::POST, "/upload", b"abc")).await;

        assert!(matches!(result, Err(HandlerError::UnsupportedMediaType { .. })));
        assert!(checker.is_armed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_capture_failure_skips_comparison() {
        let (decorator, checker, sink) = decorator();
        let handler = decorator.decorate(Recorder::default());

        let chunks: Vec<Result<Frame<Bytes>, io::Error>> =
            vec![Ok(Frame::data(Bytes::from_static(b"par"))), Err(io::Error::other("connection reset"))];
        let req = Request::builder()
            .method(Method::POST)
            .uri("/upload")
            .body(req_body(StreamBody::new(stream::iter(chunks))))
            .unwrap();

        let result = handler.invoke(req).await;

        let error = result.unwrap_err();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(handler.handler.seen.lock().unwrap().is_empty());
        assert!(!checker.is_armed());
        assert!(sink.reports.lock().unwrap().is_empty());
    }
}
