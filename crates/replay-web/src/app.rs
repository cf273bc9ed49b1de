use crate::decorator::{Decorator, DecoratorExt};
use crate::error::RouterError;
use crate::handler::{RequestHandler, handler_fn};
use crate::middleware::{
    AccessLogDecorator, BodyTapDecorator, CacheControlDecorator, RecoverDecorator, RequestIdDecorator,
    SecureHeadersDecorator,
};
use crate::router::{Router, get, post};
use crate::upload::{healthcheck, upload};
use replay_check::BodyTap;

/// Routes of the service; `tap` watches the bodies sent to `/upload` and nothing else.
pub fn router(tap: BodyTap) -> Result<Router, RouterError> {
    Router::builder()
        .route("/upload", post(BodyTapDecorator::new(tap).decorate(handler_fn(upload))))
        .route("/healthcheck", get(handler_fn(healthcheck)))
        .build()
}

/// The router wrapped in the full middleware pipeline.
pub fn app(tap: BodyTap) -> Result<impl RequestHandler + 'static, RouterError> {
    let decorator = CacheControlDecorator
        .and_then(AccessLogDecorator::default())
        .and_then(RequestIdDecorator)
        .and_then(SecureHeadersDecorator::default())
        .and_then(RecoverDecorator);

    Ok(decorator.decorate(router(tap)?))
}
