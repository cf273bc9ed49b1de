//! Traffic generators for the `/upload` endpoint.
//!
//! [`ClientMode::Normal`] sends a well-formed upload. The other modes reproduce
//! the two ways a retrying client typically corrupts a replayed body.

use crate::error::ClientError;
use crate::multipart::MultipartWriter;
use bytes::Bytes;
use futures::TryStreamExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use http::{Method, Request, StatusCode, Uri};
use http_body::Frame;
use http_body_util::{BodyExt, StreamBody};
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::io::{self, Cursor};
use std::path::Path;
use tokio::net::TcpStream;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

/// A readable upload body.
pub type BodyReader = Cursor<Bytes>;

/// Boundary of the bodies [`make_body`] builds, fixed so that the same file always
/// produces the same bytes.
pub const DEFAULT_BOUNDARY: &str = "ReplayCheckFormBoundary7MA4YWxk";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientMode {
    /// One upload with `Content-Length`.
    #[default]
    Normal,
    /// The body reader is drained before the request is sent, as if by an earlier
    /// attempt, and then sent as is. The server receives an empty body.
    Exhausted,
    /// The headers of one body are sent with another body built with a different
    /// boundary.
    Swapped,
}

/// Builds a `multipart/form-data` upload of `file`.
///
/// The file is sent as part `files` under its base name, preceded by a `types`
/// field when `types` is not empty. Returns the body and its `Content-Type`.
pub fn make_body(file: &Path, types: &[String]) -> io::Result<(BodyReader, String)> {
    make_body_with(MultipartWriter::with_boundary(DEFAULT_BOUNDARY), file, types)
}

fn make_body_with(mut writer: MultipartWriter, file: &Path, types: &[String]) -> io::Result<(BodyReader, String)> {
    let data = std::fs::read(file)?;
    let file_name = file.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();

    if !types.is_empty() {
        writer.text("types", &types.join(","));
    }
    writer.file("files", &file_name, sniff_content_type(&data), &data);

    let content_type = writer.content_type();
    Ok((Cursor::new(writer.finish()), content_type))
}

/// Content type from the leading bytes of `data`.
pub fn sniff_content_type(data: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
    ];

    if let Some((_, content_type)) = SIGNATURES.iter().find(|(magic, _)| data.starts_with(magic)) {
        return *content_type;
    }

    let head = &data[..data.len().min(512)];
    let is_text = match std::str::from_utf8(head) {
        Ok(text) => !text.chars().any(|c| c.is_control() && !c.is_ascii_whitespace()),
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > head.len(),
    };
    if is_text && !data.is_empty() { "text/plain; charset=utf-8" } else { "application/octet-stream" }
}

/// Uploads `file` to `target` the way `mode` describes and returns the response
/// status.
pub async fn send(target: &str, mode: ClientMode, file: &Path, types: &[String]) -> Result<StatusCode, ClientError> {
    let uri: Uri = target
        .parse()
        .map_err(|e: http::uri::InvalidUri| ClientError::InvalidTarget { target: target.to_owned(), reason: e.to_string() })?;
    let (Some(host), Some(authority)) = (uri.host(), uri.authority()) else {
        return Err(ClientError::InvalidTarget { target: target.to_owned(), reason: "missing host".into() });
    };
    let port = uri.port_u16().unwrap_or(80);

    let (reader, content_type) = make_body(file, types)?;
    let (reader, content_length) = match mode {
        ClientMode::Normal => {
            let len = reader.get_ref().len();
            (reader, Some(len))
        }
        ClientMode::Exhausted => {
            let mut reader = reader;
            let drained = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
            debug!(drained, "body reader consumed before sending");
            (reader, None)
        }
        ClientMode::Swapped => {
            let (swapped, _) = make_body_with(MultipartWriter::new(), file, types)?;
            let len = swapped.get_ref().len();
            (swapped, Some(len))
        }
    };

    let body = StreamBody::new(ReaderStream::new(reader).map_ok(Frame::data)).boxed();

    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri.path_and_query().map_or("/", |path| path.as_str()))
        .header(HOST, authority.as_str())
        .header(CONTENT_TYPE, content_type);
    if let Some(len) = content_length {
        builder = builder.header(CONTENT_LENGTH, len);
    }
    let request = builder.body(body)?;

    let stream = TcpStream::connect((host, port)).await?;
    let (mut sender, connection) = http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(cause = %e, "client connection failed");
        }
    });

    let response = sender.send_request(request).await?;
    info!(?mode, status = %response.status(), "upload answered");
    Ok(response.status())
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_BOUNDARY, make_body, make_body_with, sniff_content_type};
    use crate::multipart::{MultipartForm, MultipartWriter};
    use bytes::Bytes;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR\x00\x00\x00\x01";

    fn fixture(data: &[u8]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(data).unwrap();
        file
    }

    #[test]
    fn test_sniff_content_type() {
        assert_eq!(sniff_content_type(PNG), "image/png");
        assert_eq!(sniff_content_type(b"\xff\xd8\xff\xe0rest"), "image/jpeg");
        assert_eq!(sniff_content_type(b"GIF89a..."), "image/gif");
        assert_eq!(sniff_content_type(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff_content_type(b"hello\nworld"), "text/plain; charset=utf-8");
        assert_eq!(sniff_content_type(b"\x00\x01\x02"), "application/octet-stream");
        assert_eq!(sniff_content_type(b""), "application/octet-stream");
    }

    #[test]
    fn test_make_body() {
        let file = fixture(PNG);
        let types = vec!["invoice".to_owned(), "receipt".to_owned()];

        let (reader, content_type) = make_body(file.path(), &types).unwrap();

        assert_eq!(content_type, format!("multipart/form-data; boundary={DEFAULT_BOUNDARY}"));
        let form = MultipartForm::parse(reader.get_ref(), DEFAULT_BOUNDARY).unwrap();
        assert_eq!(form.value("types"), Some("invoice,receipt"));

        let part = &form.all_files()[0];
        assert_eq!(part.field, "files");
        assert_eq!(part.file_name, file.path().file_name().unwrap().to_string_lossy());
        assert_eq!(part.content_type, "image/png");
        assert_eq!(part.data, Bytes::from_static(PNG));
    }

    #[test]
    fn test_make_body_is_deterministic() {
        let file = fixture(PNG);

        let (first, _) = make_body(file.path(), &[]).unwrap();
        let (second, _) = make_body(file.path(), &[]).unwrap();

        assert_eq!(first.get_ref(), second.get_ref());
        assert!(MultipartForm::parse(first.get_ref(), DEFAULT_BOUNDARY).unwrap().value("types").is_none());
    }

    #[test]
    fn test_swapped_body_differs() {
        let file = fixture(PNG);

        let (first, _) = make_body(file.path(), &[]).unwrap();
        let (swapped, _) = make_body_with(MultipartWriter::new(), file.path(), &[]).unwrap();

        assert_ne!(first.get_ref(), swapped.get_ref());
        assert!(MultipartForm::parse(swapped.get_ref(), DEFAULT_BOUNDARY).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(make_body(&dir.path().join("absent.png"), &[]).is_err());
    }
}
