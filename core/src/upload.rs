//! File upload helpers.
//!
//! An upload is two exchanges: `POST /upload-requests` negotiates a storage
//! URL for a file name, then the bytes are `PUT` straight to that URL. The
//! storage path (the upload request id) is what gets stored in file fields.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::descriptor::UPLOAD_REQUEST;
use crate::error::{ClientError, ConfigurationError};
use crate::http::{Body, HttpMethod, HttpRequest};
use crate::resource::{check_status, send, ResourceClient};
use crate::transport::Transport;

/// Result of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Storage path to reference from file fields.
    pub path: String,
    pub size: usize,
}

#[derive(Clone)]
pub struct Uploader {
    requests: ResourceClient,
    transport: Arc<dyn Transport>,
}

impl Uploader {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            requests: ResourceClient::new(&UPLOAD_REQUEST, Arc::clone(&transport)),
            transport,
        }
    }

    pub fn upload_file(&self, path: impl AsRef<Path>) -> Result<UploadedFile, ClientError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        self.upload_bytes(&filename, bytes)
    }

    /// Download `url` and upload the bytes under the URL's last path segment.
    pub fn upload_image(&self, url: &str) -> Result<UploadedFile, ClientError> {
        let request = HttpRequest::new(HttpMethod::Get, url);
        // relative paths would resolve against the site API with its token
        if !request.is_absolute() {
            return Err(ConfigurationError::InvalidUrl {
                url: url.to_string(),
            }
            .into());
        }
        let response = send(self.transport.as_ref(), UPLOAD_REQUEST.kind, &request)?;
        check_status(&response)?;
        self.upload_bytes(&filename_from_url(url), response.body)
    }

    pub fn upload_bytes(&self, filename: &str, bytes: Vec<u8>) -> Result<UploadedFile, ClientError> {
        let mut input = serde_json::Map::new();
        input.insert("filename".to_string(), json!(filename));
        let negotiated = self.requests.create(&input, None)?;

        let target = negotiated
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Deserialization("upload request has no url".to_string()))?;

        let size = bytes.len();
        let mut request = HttpRequest::new(HttpMethod::Put, target);
        request.body = Some(Body::Binary {
            content_type: content_type_for(filename).to_string(),
            bytes,
        });
        let response = send(self.transport.as_ref(), UPLOAD_REQUEST.kind, &request)?;
        check_status(&response)?;

        Ok(UploadedFile {
            path: negotiated.id,
            size,
        })
    }
}

fn filename_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or("image")
        .to_string()
}

fn content_type_for(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_is_last_segment_without_query() {
        assert_eq!(
            filename_from_url("https://www.datocms.com/static/2-00c287793580e47fbe1222a1d44a6e25-95c66.png?w=10"),
            "2-00c287793580e47fbe1222a1d44a6e25-95c66.png"
        );
        assert_eq!(filename_from_url("https://example.com/"), "image");
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("photo.JPG"), "image/jpeg");
        assert_eq!(content_type_for("file.txt"), "text/plain");
        assert_eq!(content_type_for("archive"), "application/octet-stream");
    }
}
