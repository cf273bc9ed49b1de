use crate::body::ReqBody;
use crate::decorator::Decorator;
use crate::handler::{HandlerResult, RequestHandler};
use crate::responder::into_response;
use async_trait::async_trait;
use http::{HeaderName, HeaderValue, Request};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Makes sure every exchange carries an `X-Request-ID`.
///
/// An id sent by the client is kept, otherwise a random one is generated. The id is
/// written to the request, for the handlers below, and to the response.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdDecorator;

#[derive(Debug)]
pub struct RequestIdHandler<H> {
    handler: H,
}

impl<H: RequestHandler> Decorator<H> for RequestIdDecorator {
    type Out = RequestIdHandler<H>;

    fn decorate(&self, raw: H) -> Self::Out {
        RequestIdHandler { handler: raw }
    }
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for RequestIdHandler<H> {
    async fn invoke(&self, mut req: Request<ReqBody>) -> HandlerResult {
        let request_id = req.headers().get(X_REQUEST_ID).filter(|id| !id.is_empty()).cloned().or_else(generate);

        if let Some(id) = &request_id {
            req.headers_mut().insert(X_REQUEST_ID, id.clone());
        }

        let mut response = into_response(self.handler.invoke(req).await);

        if let Some(id) = request_id {
            response.headers_mut().insert(X_REQUEST_ID, id);
        }
        Ok(response)
    }
}

fn generate() -> Option<HeaderValue> {
    HeaderValue::try_from(Uuid::new_v4().simple().to_string()).ok()
}
