use crate::multipart::MultipartError;
use http::{Method, StatusCode};
use replay_check::{BoxError, CaptureError};
use std::io;
use thiserror::Error;

/// Everything a handler in the pipeline can fail with.
///
/// Each variant maps to a response status through [`HandlerError::status`]; the
/// server never drops a request because of one.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("request body capture failed: {source}")]
    Capture {
        #[from]
        source: CaptureError,
    },

    #[error("failed to read request body: {source}")]
    Body { source: BoxError },

    #[error("unsupported content type: {content_type:?}")]
    UnsupportedMediaType { content_type: String },

    #[error("invalid multipart form: {source}")]
    Multipart {
        #[from]
        source: MultipartError,
    },

    #[error("no route matches {path}")]
    NotFound { path: String },

    #[error("method {method} not allowed for {path}")]
    MethodNotAllowed { method: Method, path: String },

    #[error("handler panicked: {message}")]
    Panic { message: String },
}

impl HandlerError {
    pub fn body<E: Into<BoxError>>(e: E) -> Self {
        Self::Body { source: e.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Capture { .. } | Self::Body { .. } | Self::Multipart { .. } => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Self::Panic { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("invalid route {path:?}: {source}")]
    InvalidRoute { path: String, source: matchit::InsertError },
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("handler must be set")]
    MissingHandler,
    #[error("address must be set")]
    MissingAddress,
    #[error("invalid address: {source}")]
    InvalidAddress { source: io::Error },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("bind server error: {source}")]
    Bind {
        #[from]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("http error: {source}")]
    Http {
        #[from]
        source: hyper::Error,
    },

    #[error("invalid request: {source}")]
    InvalidRequest {
        #[from]
        source: http::Error,
    },

    #[error("invalid target {target:?}: {reason}")]
    InvalidTarget { target: String, reason: String },
}
