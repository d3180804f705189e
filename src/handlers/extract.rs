//! Request extractors shared by the API handlers.
//!
//! Every rejection is turned into an [`AppError`] so clients always get the
//! `{"detail": ...}` body.

use crate::auth::AuthUser;
use crate::dto::{DocumentInput, Upload};
use crate::error::{AppError, AppResult};
use crate::services::Actor;
use crate::SharedState;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts, Multipart, Path, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};
use std::net::{IpAddr, SocketAddr};
use uuid::Uuid;

/// JSON body with our error shape on rejection
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Query string with our error shape on rejection
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);

/// `{id}` path segment parsed as a UUID
#[derive(Debug, Clone, Copy)]
pub struct IdPath(pub Uuid);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(IdPath(Uuid::parse_str(raw.trim())?))
    }
}

/// Address of the client: first `X-Forwarded-For` hop, else the socket peer
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|hop| hop.trim().parse::<IpAddr>().ok());

    forwarded
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map(|ip| ip.to_string())
}

impl FromRequestParts<SharedState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &SharedState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(Actor {
            id: user.id,
            privileged: user.is_privileged(),
            ip_address: client_ip(&parts.headers, &parts.extensions),
        })
    }
}

fn parse_bool(field: &str, raw: &str) -> AppResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "on" | "yes" | "y" | "t" => Ok(true),
        "false" | "0" | "off" | "no" | "n" | "f" => Ok(false),
        _ => Err(AppError::Validation(format!("{}: Must be a valid boolean.", field))),
    }
}

fn parse_id(field: &str, raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("{}: \"{}\" is not a valid UUID.", field, raw.trim())))
}

/// Empty means "no folder"
fn parse_optional_id(field: &str, raw: &str) -> AppResult<Option<Uuid>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    parse_id(field, raw).map(Some)
}

/// Query-string boolean filter; blank means unfiltered
pub fn query_bool(field: &str, raw: Option<&str>) -> AppResult<Option<bool>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => parse_bool(field, raw).map(Some),
    }
}

/// Query-string id filter; blank means unfiltered
pub fn query_id(field: &str, raw: Option<&str>) -> AppResult<Option<Uuid>> {
    match raw {
        None => Ok(None),
        Some(raw) => parse_optional_id(field, raw),
    }
}

/// Form lists arrive as repeated fields, comma separated values, or both
fn push_ids(target: &mut Option<Vec<Uuid>>, field: &str, raw: &str) -> AppResult<()> {
    let ids = target.get_or_insert_with(Vec::new);
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        ids.push(parse_id(field, part)?);
    }
    Ok(())
}

async fn read_multipart(mut multipart: Multipart) -> AppResult<DocumentInput> {
    let mut input = DocumentInput::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::Validation(
                            "file: The submitted data was not a file. Check the encoding type on the form."
                                .into(),
                        )
                    })?;
                let bytes = field.bytes().await?;
                input.file = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => input.title = Some(field.text().await?),
            "description" => input.description = Some(field.text().await?),
            "folder_id" => {
                let text = field.text().await?;
                input.folder_id = Some(parse_optional_id("folder_id", &text)?);
            }
            "tag_ids" => {
                let text = field.text().await?;
                push_ids(&mut input.tag_ids, "tag_ids", &text)?;
            }
            "shared_users_ids" => {
                let text = field.text().await?;
                push_ids(&mut input.shared_users_ids, "shared_users_ids", &text)?;
            }
            "is_public" => {
                let text = field.text().await?;
                input.is_public = Some(parse_bool("is_public", &text)?);
            }
            _ => {}
        }
    }

    Ok(input)
}

/// Document create/update payload, multipart or JSON
#[derive(Debug)]
pub struct DocumentForm(pub DocumentInput);

impl<S> FromRequest<S> for DocumentForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_ascii_lowercase().starts_with("multipart/form-data"))
            .unwrap_or(false);

        if is_multipart {
            let multipart = Multipart::from_request(req, state).await?;
            return Ok(DocumentForm(read_multipart(multipart).await?));
        }

        let JsonBody(input) = JsonBody::<DocumentInput>::from_request(req, state).await?;
        Ok(DocumentForm(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        assert_eq!(client_ip(&headers, &extensions).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("not-an-ip"));
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 20], 4000))));

        assert_eq!(client_ip(&headers, &extensions).as_deref(), Some("192.168.1.20"));
        assert_eq!(client_ip(&HeaderMap::new(), &Extensions::new()), None);
    }

    #[test]
    fn test_form_value_parsing() {
        assert!(parse_bool("is_public", "True").unwrap());
        assert!(!parse_bool("is_public", "0").unwrap());
        assert!(parse_bool("is_public", "maybe").is_err());

        assert_eq!(parse_optional_id("folder_id", "").unwrap(), None);
        assert!(parse_optional_id("folder_id", "abc").is_err());

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert_eq!(query_bool("is_public", Some("True")).unwrap(), Some(true));
        assert_eq!(query_bool("is_public", Some("1")).unwrap(), Some(true));
        assert_eq!(query_bool("is_public", Some("false")).unwrap(), Some(false));
        assert_eq!(query_bool("is_public", Some("")).unwrap(), None);
        assert!(query_bool("is_public", Some("sometimes")).is_err());
        assert_eq!(query_id("folder", Some("")).unwrap(), None);
        assert_eq!(query_id("folder", None).unwrap(), None);
        assert_eq!(query_id("folder", Some(&a.to_string())).unwrap(), Some(a));
        assert!(query_id("folder", Some("abc")).is_err());

        let mut ids = None;
        push_ids(&mut ids, "tag_ids", &format!("{}, {}", a, b)).unwrap();
        push_ids(&mut ids, "tag_ids", "").unwrap();
        assert_eq!(ids, Some(vec![a, b]));
    }
}
