use crate::body::ReqBody;
use crate::error::{HandlerError, RouterError};
use crate::handler::{HandlerResult, RequestHandler};
use async_trait::async_trait;
use http::{Method, Request};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

type InnerRouter<T> = matchit::Router<T>;

/// Path and method based dispatch to request handlers.
///
/// An unknown path yields [`HandlerError::NotFound`], a known path without a
/// handler for the request method yields [`HandlerError::MethodNotAllowed`].
pub struct Router {
    inner_router: InnerRouter<Vec<RouterItem>>,
}

/// A handler bound to one method.
pub struct RouterItem {
    method: Method,
    handler: Box<dyn RequestHandler>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// The handlers registered for `path`, empty when nothing matches.
    pub fn at(&self, path: &str) -> &[RouterItem] {
        self.inner_router.at(path).map(|matched| matched.value.as_slice()).unwrap_or(&[])
    }
}

impl RouterItem {
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router").finish_non_exhaustive()
    }
}

impl fmt::Debug for RouterItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterItem").field("method", &self.method).finish_non_exhaustive()
    }
}

#[async_trait]
impl RequestHandler for Router {
    async fn invoke(&self, req: Request<ReqBody>) -> HandlerResult {
        let items = self.at(req.uri().path());
        if items.is_empty() {
            debug!(path = req.uri().path(), "no route matched");
            return Err(HandlerError::NotFound { path: req.uri().path().to_owned() });
        }

        match items.iter().find(|item| item.method == req.method()) {
            Some(item) => item.handler.invoke(req).await,
            None => Err(HandlerError::MethodNotAllowed { method: req.method().clone(), path: req.uri().path().to_owned() }),
        }
    }
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    data: HashMap<String, Vec<RouterItem>>,
}

impl RouterBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, route: impl Into<String>, item: RouterItem) -> Self {
        self.data.entry(route.into()).or_default().push(item);
        self
    }

    pub fn build(self) -> Result<Router, RouterError> {
        let mut inner_router = InnerRouter::new();

        for (path, items) in self.data {
            inner_router
                .insert(path.clone(), items)
                .map_err(|source| RouterError::InvalidRoute { path, source })?;
        }

        Ok(Router { inner_router })
    }
}

macro_rules! method_router_item {
    ($method:ident, $method_const:ident) => {
        pub fn $method<H: RequestHandler + 'static>(handler: H) -> RouterItem {
            RouterItem { method: Method::$method_const, handler: Box::new(handler) }
        }
    };
}

method_router_item!(get, GET);
method_router_item!(post, POST);

#[cfg(test)]
mod tests {
    use super::{Router, get, post};
    use crate::body::{ReqBody, ResponseBody, req_body};
    use crate::error::HandlerError;
    use crate::handler::{HandlerResult, RequestHandler, handler_fn};
    use bytes::Bytes;
    use http::{Method, Request, Response, StatusCode};
    use http_body_util::{BodyExt, Empty};

    async fn upload(_req: Request<ReqBody>) -> HandlerResult {
        Ok(Response::new(ResponseBody::from("uploaded")))
    }

    async fn health(_req: Request<ReqBody>) -> HandlerResult {
        Ok(Response::new(ResponseBody::from("ok")))
    }

    fn router() -> Router {
        Router::builder()
            .route("/upload", post(handler_fn(upload)))
            .route("/healthcheck", get(handler_fn(health)))
            .build()
            .unwrap()
    }

    fn request(method: Method, path: &str) -> Request<ReqBody> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(req_body(Empty::<Bytes>::new()))
            .unwrap()
    }

    #[test]
    fn test_route_lookup() {
        let router = router();

        let items = router.at("/upload");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].method(), Method::POST);

        assert!(router.at("/missing").is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_dispatch() {
        let router = router();

        let response = router.invoke(request(Method::POST, "/upload")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body.as_ref(), b"uploaded");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_not_found() {
        let result = router().invoke(request(Method::POST, "/nowhere")).await;
        assert!(matches!(result, Err(HandlerError::NotFound { ref path }) if path == "/nowhere"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_method_not_allowed() {
        let result = router().invoke(request(Method::GET, "/upload")).await;
        assert!(matches!(result, Err(HandlerError::MethodNotAllowed { ref method, .. }) if method == Method::GET));
    }

    #[test]
    fn test_conflicting_routes_fail_to_build() {
        let result = Router::builder()
            .route("/{id}", get(handler_fn(health)))
            .route("/{name}", get(handler_fn(health)))
            .build();
        assert!(result.is_err());
    }
}
