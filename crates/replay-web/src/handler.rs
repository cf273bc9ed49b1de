use crate::body::{ReqBody, ResponseBody};
use crate::error::HandlerError;
use async_trait::async_trait;
use http::{Request, Response};
use std::sync::Arc;

pub type HandlerResult = Result<Response<ResponseBody>, HandlerError>;

#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult;
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Box<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        (**self).invoke(req).await
    }
}

#[async_trait]
impl<H: RequestHandler + ?Sized> RequestHandler for Arc<H> {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        (**self).invoke(req).await
    }
}

/// a handler backed by an async fn taking the whole request
#[derive(Debug, Clone, Copy)]
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(Request<ReqBody>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        (self.f)(req).await
    }
}
