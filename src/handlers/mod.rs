//! HTTP handlers for the DocVault API.
//!
//! Handlers are organized by domain and stay thin: extract, call the
//! service, wrap the result.

pub mod activities;
pub mod auth;
pub mod comments;
pub mod documents;
pub mod extract;
pub mod folders;
pub mod health;
pub mod tags;
pub mod versions;

pub use health::health_check;

use crate::error::{AppError, AppResult};
use crate::services::Download;
use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, ETAG};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// `Content-Disposition` for a download; non-ASCII names also get `filename*`
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", fallback);
    }

    let mut encoded = String::with_capacity(file_name.len() * 3);
    for byte in file_name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    format!("attachment; filename=\"{}\"; filename*=UTF-8''{}", fallback, encoded)
}

/// Send file contents as an attachment
pub fn attachment(file: Download) -> AppResult<Response> {
    let disposition = HeaderValue::from_str(&content_disposition(&file.file_name))
        .map_err(|e| AppError::Message(format!("Invalid download name: {}", e)))?;
    let etag = HeaderValue::from_str(&format!("\"{}\"", file.checksum))
        .map_err(|e| AppError::Message(format!("Invalid checksum: {}", e)))?;
    let length = HeaderValue::from(file.bytes.len());

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
            (CONTENT_LENGTH, length),
            (ETAG, etag),
        ],
        Body::from(file.bytes),
    )
        .into_response())
}

/// JSON 404 for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "detail": "Not found." })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition() {
        assert_eq!(
            content_disposition("report_v2.pdf"),
            "attachment; filename=\"report_v2.pdf\""
        );
        assert_eq!(
            content_disposition("say \"hi\".txt"),
            "attachment; filename=\"say _hi_.txt\"; filename*=UTF-8''say%20%22hi%22.txt"
        );
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_attachment_headers() {
        let response = attachment(Download {
            file_name: "notes.txt".into(),
            checksum: "abc123".into(),
            bytes: b"hello".to_vec(),
        })
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[CONTENT_LENGTH], "5");
        assert_eq!(headers[ETAG], "\"abc123\"");
        assert_eq!(headers[CONTENT_DISPOSITION], "attachment; filename=\"notes.txt\"");
    }
}
