//! An upload service watched by a request body replay checker.
//!
//! Every request passes a middleware pipeline; the [`BodyTapDecorator`](middleware::BodyTapDecorator)
//! in it captures the body, hands the handler an identical copy and compares the
//! capture with the first body the server ever received. The [`client`] module
//! produces both well-formed and corrupted uploads to exercise it.

pub mod app;
mod body;
pub mod cli;
pub mod client;
mod decorator;
mod error;
mod handler;
pub mod middleware;
pub mod multipart;
mod responder;
mod router;
mod server;
mod upload;

pub use body::{ReqBody, ResponseBody, req_body};
pub use decorator::{Decorator, DecoratorComposer, DecoratorExt, IdentityDecorator};
pub use error::{ClientError, HandlerError, RouterError, ServerBuildError, ServerError};
pub use handler::{FnHandler, HandlerResult, RequestHandler, handler_fn};
pub use responder::{Responder, into_response};
pub use router::{Router, RouterBuilder, RouterItem, get, post};
pub use server::{RemoteAddr, Server, ServerBuilder};
pub use upload::{UploadInput, healthcheck, upload};
