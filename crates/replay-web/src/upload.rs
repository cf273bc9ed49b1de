use crate::body::{ReqBody, ResponseBody};
use crate::error::HandlerError;
use crate::handler::HandlerResult;
use crate::multipart::{self, MultipartError, MultipartForm};
use http::header::CONTENT_TYPE;
use http::{Request, Response};
use http_body_util::BodyExt;
use tracing::info;

/// The form fields `/upload` binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInput {
    pub types: String,
    pub document_types: Vec<String>,
}

impl UploadInput {
    pub fn from_form(form: &MultipartForm) -> Self {
        Self { types: form.value("types").unwrap_or_default().to_owned(), document_types: Vec::new() }
    }

    /// Splits `types` into `document_types`, trimmed and without empty labels.
    pub fn build(&mut self) {
        self.document_types =
            self.types.split(',').map(str::trim).filter(|label| !label.is_empty()).map(str::to_owned).collect();
    }
}

/// `POST /upload`
pub async fn upload(req: Request<ReqBody>) -> HandlerResult {
    let content_type = req.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()).unwrap_or_default();

    let boundary = multipart::boundary(content_type).map_err(|e| match e {
        MultipartError::NotMultipart { content_type } => HandlerError::UnsupportedMediaType { content_type },
        e => HandlerError::from(e),
    })?;

    let body = req.into_body().collect().await.map_err(HandlerError::body)?.to_bytes();
    let form = MultipartForm::parse(&body, &boundary)?;

    let mut input = UploadInput::from_form(&form);
    info!(?input, "beforeBuild");
    input.build();
    info!(?input, "afterBuild");
    info!("form:\n{form}");

    Ok(Response::new(ResponseBody::empty()))
}

/// `GET /healthcheck`
pub async fn healthcheck(_req: Request<ReqBody>) -> HandlerResult {
    Ok(Response::new(ResponseBody::from("ok")))
}
