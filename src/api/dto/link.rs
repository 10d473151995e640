//! DTOs for the link management endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::dto::pagination::PageMeta;
use crate::application::services::LinkDetails;
pub use crate::domain::entities::MAX_EXPIRATION_SECONDS;
use crate::domain::entities::{Click, Link};

/// Body of `POST /api/url`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLinkRequest {
    /// Destination of the short link (absolute http/https URL).
    #[serde(rename = "originalUrl")]
    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,

    /// Lifetime in seconds.
    #[validate(range(min = 1, max = 315_360_000, message = "Expiration must be between 1 and 315360000 seconds"))]
    pub expiration: i64,
}

/// Body of `PUT /api/url/{id}`. Both fields are replaced.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLinkRequest {
    #[serde(rename = "originalUrl")]
    #[validate(url(message = "Invalid URL format"))]
    pub original_url: String,

    #[validate(range(min = 1, max = 315_360_000, message = "Expiration must be between 1 and 315360000 seconds"))]
    pub expiration: i64,
}

/// A link as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResponse {
    pub id: i64,
    pub token: String,
    pub short_url: String,
    pub original_url: String,
    pub expiration: i64,
    pub owner_id: i64,
    pub click_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LinkResponse {
    pub fn from_link(link: Link, short_url: String) -> Self {
        Self {
            expires_at: link.expires_at(),
            id: link.id,
            token: link.token,
            short_url,
            original_url: link.original_url,
            expiration: link.expiration_seconds,
            owner_id: link.owner_id,
            click_count: link.click_count,
            created_at: link.created_at,
            updated_at: link.updated_at,
        }
    }
}

/// One entry of a click ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickResponse {
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

impl From<Click> for ClickResponse {
    fn from(click: Click) -> Self {
        Self {
            ip_address: click.ip_address,
            timestamp: click.clicked_at,
        }
    }
}

/// A link with its click ledger.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkDetailsResponse {
    #[serde(flatten)]
    pub link: LinkResponse,
    pub click_details: Vec<ClickResponse>,
}

impl LinkDetailsResponse {
    pub fn from_details(details: LinkDetails, short_url: String) -> Self {
        Self {
            link: LinkResponse::from_link(details.link, short_url),
            click_details: details.clicks.into_iter().map(Into::into).collect(),
        }
    }
}

/// `{ "data": ..., "message": ... }` envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
    pub message: String,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: message.into(),
        }
    }
}

/// List envelope with pagination metadata.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    pub data: Vec<T>,
    pub message: String,
    pub meta: PageMeta,
}

/// `{ "message": ... }` for operations without a payload.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
