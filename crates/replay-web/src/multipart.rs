//! `multipart/form-data` decoding and encoding.
//!
//! [`MultipartForm::parse`] works on a fully collected body. Part headers are parsed
//! with `httparse`; part contents are zero-copy slices of the body. [`MultipartWriter`]
//! produces the framing the parser accepts and is what the traffic generators use.

use bytes::{BufMut, Bytes, BytesMut};
use httparse::Status;
use memchr::memmem;
use mime::Mime;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

const MAX_PART_HEADERS: usize = 16;

const CRLF: &[u8] = b"\r\n";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MultipartError {
    #[error("content type {content_type:?} is not multipart/form-data")]
    NotMultipart { content_type: String },

    #[error("multipart content type has no boundary")]
    MissingBoundary,

    #[error("body does not start with the boundary")]
    MissingOpeningBoundary,

    #[error("part #{index} is not terminated by a boundary")]
    UnterminatedPart { index: usize },

    #[error("invalid headers in part #{index}: {reason}")]
    InvalidPartHeaders { index: usize, reason: String },

    #[error("part #{index} has no form-data disposition with a name")]
    MissingDisposition { index: usize },

    #[error("value of field {name:?} is not utf-8")]
    InvalidFieldValue { name: String },
}

/// Extracts the boundary from a `multipart/form-data` content type.
pub fn boundary(content_type: &str) -> Result<String, MultipartError> {
    let not_multipart = || MultipartError::NotMultipart { content_type: content_type.to_owned() };

    let mime: Mime = content_type.parse().map_err(|_| not_multipart())?;
    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return Err(not_multipart());
    }

    match mime.get_param(mime::BOUNDARY) {
        Some(boundary) if !boundary.as_str().is_empty() => Ok(boundary.as_str().to_owned()),
        _ => Err(MultipartError::MissingBoundary),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    values: Vec<(String, String)>,
    files: Vec<FilePart>,
}

impl MultipartForm {
    pub fn parse(body: &Bytes, boundary: &str) -> Result<Self, MultipartError> {
        let delimiter = [b"--".as_slice(), boundary.as_bytes()].concat();
        let closing = [CRLF, delimiter.as_slice()].concat();

        if !body.starts_with(&delimiter) {
            return Err(MultipartError::MissingOpeningBoundary);
        }

        let mut form = Self::default();
        let mut pos = delimiter.len();
        let mut index = 0;

        loop {
            let rest = &body[pos..];
            if rest.starts_with(b"--") {
                return Ok(form);
            }
            if !rest.starts_with(CRLF) {
                return Err(MultipartError::UnterminatedPart { index });
            }
            pos += CRLF.len();

            let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
            let (consumed, disposition, content_type) = match httparse::parse_headers(&body[pos..], &mut headers) {
                Ok(Status::Complete((consumed, headers))) => {
                    let disposition = header_value(headers, "content-disposition", index)?;
                    let content_type = header_value(headers, "content-type", index)?;
                    (consumed, disposition, content_type)
                }
                Ok(Status::Partial) => return Err(MultipartError::UnterminatedPart { index }),
                Err(e) => return Err(MultipartError::InvalidPartHeaders { index, reason: e.to_string() }),
            };

            let start = pos + consumed;
            let Some(len) = memmem::find(&body[start..], &closing) else {
                return Err(MultipartError::UnterminatedPart { index });
            };
            let data = body.slice(start..start + len);
            pos = start + len + closing.len();

            let disposition = disposition
                .as_deref()
                .and_then(Disposition::parse)
                .ok_or(MultipartError::MissingDisposition { index })?;

            match disposition.file_name {
                Some(file_name) => form.files.push(FilePart {
                    field: disposition.name,
                    file_name,
                    content_type: content_type.unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string()),
                    data,
                }),
                None => {
                    let value = String::from_utf8(data.to_vec())
                        .map_err(|_| MultipartError::InvalidFieldValue { name: disposition.name.clone() })?;
                    form.values.push((disposition.name, value));
                }
            }

            index += 1;
        }
    }

    /// The first value of field `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(field, _)| field == name).map(|(_, value)| value.as_str())
    }

    pub fn values<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.values.iter().filter(move |(field, _)| field == name).map(|(_, value)| value.as_str())
    }

    pub fn files<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a FilePart> + use<'a, 'n> {
        self.files.iter().filter(move |file| file.field == name)
    }

    pub fn all_files(&self) -> &[FilePart] {
        &self.files
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }
}

impl fmt::Display for MultipartForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.values {
            writeln!(f, "value {name}={value:?}")?;
        }
        for file in &self.files {
            writeln!(f, "file {}={:?} ({}, {} bytes)", file.field, file.file_name, file.content_type, file.data.len())?;
        }
        Ok(())
    }
}

fn header_value(headers: &[httparse::Header<'_>], name: &str, index: usize) -> Result<Option<String>, MultipartError> {
    let Some(header) = headers.iter().find(|header| header.name.eq_ignore_ascii_case(name)) else {
        return Ok(None);
    };
    std::str::from_utf8(header.value)
        .map(|value| Some(value.trim().to_owned()))
        .map_err(|_| MultipartError::InvalidPartHeaders { index, reason: format!("{name} is not utf-8") })
}

struct Disposition {
    name: String,
    file_name: Option<String>,
}

impl Disposition {
    /// Parses `form-data; name="..."; filename="..."`.
    fn parse(value: &str) -> Option<Self> {
        let (kind, mut rest) = value.split_once(';').unwrap_or((value, ""));
        if !kind.trim().eq_ignore_ascii_case("form-data") {
            return None;
        }

        let mut name = None;
        let mut file_name = None;

        while !rest.trim().is_empty() {
            let (key, after_key) = rest.split_once('=')?;
            let (param, remaining) = param_value(after_key.trim_start())?;
            match key.trim().to_ascii_lowercase().as_str() {
                "name" => name = Some(param),
                "filename" => file_name = Some(param),
                _ => {}
            }
            rest = remaining.trim_start().strip_prefix(';').unwrap_or(remaining);
        }

        Some(Self { name: name.filter(|name| !name.is_empty())?, file_name })
    }
}

/// Reads a token or quoted string, returning it and what follows.
fn param_value(input: &str) -> Option<(String, &str)> {
    let Some(quoted) = input.strip_prefix('"') else {
        let end = input.find(';').unwrap_or(input.len());
        return Some((input[..end].trim().to_owned(), &input[end..]));
    };

    let mut value = String::new();
    let mut chars = quoted.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => value.push(chars.next()?.1),
            '"' => return Some((value, &quoted[i + 1..])),
            c => value.push(c),
        }
    }
    None
}

/// Builds a `multipart/form-data` body.
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    buf: BytesMut,
    parts: usize,
}

impl MultipartWriter {
    /// A writer with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(Uuid::new_v4().simple().to_string())
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self { boundary: boundary.into(), buf: BytesMut::new(), parts: 0 }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` header value announcing this writer's boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open_part(&format!("Content-Disposition: form-data; name=\"{}\"\r\n", escape_quotes(name)));
        self.buf.put_slice(value.as_bytes());
        self
    }

    pub fn file(&mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> &mut Self {
        self.open_part(&format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {content_type}\r\n",
            escape_quotes(name),
            escape_quotes(file_name),
        ));
        self.buf.put_slice(data);
        self
    }

    fn open_part(&mut self, headers: &str) {
        if self.parts > 0 {
            self.buf.put_slice(CRLF);
        }
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
        self.buf.put_slice(CRLF);
        self.buf.put_slice(headers.as_bytes());
        self.buf.put_slice(CRLF);
        self.parts += 1;
    }

    pub fn finish(mut self) -> Bytes {
        if self.parts > 0 {
            self.buf.put_slice(CRLF);
        }
        self.buf.put_slice(b"--");
        self.buf.put_slice(self.boundary.as_bytes());
        self.buf.put_slice(b"--\r\n");
        self.buf.freeze()
    }
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::{MultipartError, MultipartForm, MultipartWriter, boundary};
    use bytes::Bytes;
    use indoc::indoc;

    fn crlf(text: &str) -> Bytes {
        Bytes::from(text.replace('\n', "\r\n"))
    }

    #[test]
    fn test_boundary() {
        assert_eq!(boundary("multipart/form-data; boundary=abc").unwrap(), "abc");
        assert_eq!(boundary("multipart/form-data"), Err(MultipartError::MissingBoundary));
        assert!(matches!(boundary("application/json"), Err(MultipartError::NotMultipart { .. })));
        assert!(matches!(boundary(""), Err(MultipartError::NotMultipart { .. })));
    }

    #[test]
    fn test_parse_form() {
        let body = crlf(indoc! {r#"
            --xyz
            Content-Disposition: form-data; name="types"

            invoice, receipt
            --xyz
            Content-Disposition: form-data; name="files"; filename="scan \"1\".png"
            Content-Type: image/png

            PNGDATA
            --xyz--
        "#});

        let form = MultipartForm::parse(&body, "xyz").unwrap();

        assert_eq!(form.value("types"), Some("invoice, receipt"));
        assert_eq!(form.value("missing"), None);

        let files: Vec<_> = form.files("files").collect();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_name, "scan \"1\".png");
        assert_eq!(files[0].content_type, "image/png");
        assert_eq!(files[0].data.as_ref(), b"PNGDATA");
    }

    #[test]
    fn test_lookups_outlive_the_field_name() {
        let mut writer = MultipartWriter::with_boundary("b");
        writer.text("types", "a").text("types", "b").file("files", "x.bin", "application/octet-stream", b"1");
        let form = MultipartForm::parse(&writer.finish(), "b").unwrap();

        let first = {
            let name = String::from("types");
            form.value(&name)
        };
        let all: Vec<&str> = {
            let name = String::from("types");
            form.values(&name).collect()
        };
        let files: Vec<_> = {
            let name = String::from("files");
            form.files(&name).collect()
        };

        assert_eq!(first, Some("a"));
        assert_eq!(all, vec!["a", "b"]);
        assert_eq!(files[0].file_name, "x.bin");
    }

    #[test]
    fn test_file_without_content_type() {
        let body = crlf(indoc! {r#"
            --b
            content-disposition: form-data; name=files; filename=raw.bin

            ..
            --b--
        "#});

        let form = MultipartForm::parse(&body, "b").unwrap();

        assert_eq!(form.all_files()[0].file_name, "raw.bin");
        assert_eq!(form.all_files()[0].content_type, "application/octet-stream");
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(MultipartForm::parse(&Bytes::new(), "b"), Err(MultipartError::MissingOpeningBoundary));
    }

    #[test]
    fn test_wrong_boundary() {
        let body = crlf("--other\nContent-Disposition: form-data; name=\"a\"\n\nv\n--other--\n");
        assert_eq!(MultipartForm::parse(&body, "b"), Err(MultipartError::MissingOpeningBoundary));
    }

    #[test]
    fn test_unterminated_part() {
        let body = crlf("--b\nContent-Disposition: form-data; name=\"a\"\n\nvalue without end");
        assert_eq!(MultipartForm::parse(&body, "b"), Err(MultipartError::UnterminatedPart { index: 0 }));
    }

    #[test]
    fn test_missing_disposition() {
        let body = crlf("--b\nContent-Type: text/plain\n\nv\n--b--\n");
        assert_eq!(MultipartForm::parse(&body, "b"), Err(MultipartError::MissingDisposition { index: 0 }));
    }

    #[test]
    fn test_writer_output_parses() {
        let mut writer = MultipartWriter::with_boundary("fixed");
        writer.text("types", "a,b").file("files", "x.png", "image/png", b"\x89PNG\r\n--fixe");
        assert_eq!(writer.content_type(), "multipart/form-data; boundary=fixed");

        let body = writer.finish();
        assert!(body.starts_with(b"--fixed\r\nContent-Disposition: form-data; name=\"types\"\r\n\r\na,b\r\n--fixed\r\n"));
        assert!(body.ends_with(b"\r\n--fixed--\r\n"));

        let form = MultipartForm::parse(&body, "fixed").unwrap();
        assert_eq!(form.value("types"), Some("a,b"));
        assert_eq!(form.all_files()[0].data.as_ref(), b"\x89PNG\r\n--fixe");
    }

    #[test]
    fn test_random_boundaries_differ() {
        let first = MultipartWriter::new();
        let second = MultipartWriter::new();

        assert_eq!(first.boundary().len(), 32);
        assert_ne!(first.boundary(), second.boundary());
    }

    #[test]
    fn test_empty_writer() {
        let body = MultipartWriter::with_boundary("b").finish();
        assert_eq!(body.as_ref(), b"--b--\r\n");
        assert!(MultipartForm::parse(&body, "b").unwrap().is_empty());
    }
}
