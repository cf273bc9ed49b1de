use crate::body::ReqBody;
use crate::decorator::Decorator;
use crate::error::HandlerError;
use crate::handler::{HandlerResult, RequestHandler};
use async_trait::async_trait;
use futures::FutureExt;
use http::Request;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::error;

/// Turns a panic anywhere below it into [`HandlerError::Panic`].
#[derive(Debug, Default, Clone, Copy)]
pub struct RecoverDecorator;

#[derive(Debug)]
pub struct RecoverHandler<H> {
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for RecoverDecorator {
    type Out = RecoverHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        RecoverHandler { handler: raw }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for RecoverHandler<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        let method = req.method().clone();
        let uri = req.uri().clone();

        match AssertUnwindSafe(self.handler.invoke(req)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(%method, %uri, %message, "[PANIC RECOVER] handler panicked");
                Err(HandlerError::Panic { message })
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::RecoverDecorator;
    use crate::body::ReqBody;
    use crate::decorator::Decorator;
    use crate::error::HandlerError;
    use crate::handler::{HandlerResult, RequestHandler, handler_fn};
    use crate::middleware::test_support::{Recorder, request};
    use http::{Method, Request, StatusCode};

    async fn explode(req: Request<ReqBody>) -> HandlerResult {
        panic!("boom while handling {}", req.uri());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_panic_becomes_error() {
        let handler = RecoverDecorator.decorate(handler_fn(explode));

        let result = handler.invoke(request(Method::POST, "/upload", b"")).await;

        match result {
            Err(HandlerError::Panic { message }) => assert_eq!(message, "boom while handling /upload"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_passes_through() {
        let handler = RecoverDecorator.decorate(Recorder::default());

        let response = handler.invoke(request(Method::GET, "/healthcheck", b"")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
