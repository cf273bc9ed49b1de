//! Conversion of handler results into HTTP responses.
//!
//! Handlers and decorators return `Result<Response<ResponseBody>, HandlerError>`.
//! The [`Responder`] trait turns either side of that into a response, which is how
//! errors reach the client once they leave the pipeline.

use crate::body::ResponseBody;
use crate::error::HandlerError;
use http::{HeaderValue, Response, StatusCode};

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self) -> Response<ResponseBody>;
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(),
            Err(e) => e.response_to(),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

/// Sets the status code on top of whatever `T` produces.
impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to();
        *response.status_mut() = status;
        response
    }
}

/// Empty `200 OK`.
impl Responder for () {
    fn response_to(self) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

impl Responder for &'static str {
    fn response_to(self) -> Response<ResponseBody> {
        text_response(ResponseBody::from(self))
    }
}

impl Responder for String {
    fn response_to(self) -> Response<ResponseBody> {
        text_response(ResponseBody::from(self))
    }
}

impl Responder for HandlerError {
    fn response_to(self) -> Response<ResponseBody> {
        let status = self.status();
        let reason = match self {
            HandlerError::Capture { .. } => "request body could not be read",
            HandlerError::Body { .. } => "invalid body",
            HandlerError::UnsupportedMediaType { .. } => "unsupported media type",
            HandlerError::Multipart { .. } => "invalid multipart form",
            HandlerError::NotFound { .. } => "not found",
            HandlerError::MethodNotAllowed { .. } => "method not allowed",
            HandlerError::Panic { .. } => "internal server error",
        };
        (status, reason).response_to()
    }
}

fn text_response(body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response
        .headers_mut()
        .insert(http::header::CONTENT_TYPE, HeaderValue::from_static(mime::TEXT_PLAIN_UTF_8.as_ref()));
    response
}

/// Flattens a handler result into the response that goes back to the client.
pub fn into_response(result: Result<Response<ResponseBody>, HandlerError>) -> Response<ResponseBody> {
    result.response_to()
}
