//! Handlers for link management under `/api/url`.

use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde_json::json;

use crate::api::dto::link::{
    CreateLinkRequest, DataResponse, LinkDetailsResponse, LinkResponse, ListResponse,
    MessageResponse, UpdateLinkRequest,
};
use crate::api::dto::pagination::{ListQuery, PageMeta};
use crate::api::extract::ValidatedJson;
use crate::api::middleware::auth::AuthenticatedOwner;
use crate::error::AppError;
use crate::state::AppState;

fn link_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    let Path(id) = path.map_err(|e| {
        AppError::bad_request("Invalid url ID", json!({ "reason": e.body_text() }))
    })?;
    Ok(id)
}

/// Creates a short link owned by the caller.
///
/// `POST /api/url` → `201 Created`
///
/// ```json
/// { "originalUrl": "https://example.com/page", "expiration": 3600 }
/// ```
pub async fn create_link_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    ValidatedJson(payload): ValidatedJson<CreateLinkRequest>,
) -> Result<(StatusCode, Json<DataResponse<LinkResponse>>), AppError> {
    let link = state
        .link_service
        .create_link(owner_id, payload.original_url, payload.expiration)
        .await?;

    let short_url = state.link_service.short_url(&link.token);

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new(
            LinkResponse::from_link(link, short_url),
            "Short URL created",
        )),
    ))
}

/// Lists the caller's links, newest first.
///
/// `GET /api/url?page=1&perPage=10`
pub async fn list_links_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<ListResponse<LinkResponse>>, AppError> {
    let Query(query) = query.map_err(|e| {
        AppError::bad_request("Invalid query parameters", json!({ "reason": e.body_text() }))
    })?;
    let (page, per_page) = query.resolve();

    let result = state
        .link_service
        .list_links(owner_id, page, per_page)
        .await?;

    let data = result
        .links
        .into_iter()
        .map(|link| {
            let short_url = state.link_service.short_url(&link.token);
            LinkResponse::from_link(link, short_url)
        })
        .collect();

    Ok(Json(ListResponse {
        data,
        message: "Links retrieved".to_string(),
        meta: PageMeta::new(result.page, result.per_page, result.total),
    }))
}

/// Returns one of the caller's links with its click ledger.
///
/// `GET /api/url/{id}`
///
/// # Errors
///
/// - 404 if no link has this id
/// - 403 if the link belongs to someone else
pub async fn get_link_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<DataResponse<LinkDetailsResponse>>, AppError> {
    let id = link_id(path)?;
    let details = state.link_service.get_link(owner_id, id).await?;
    let short_url = state.link_service.short_url(&details.link.token);

    Ok(Json(DataResponse::new(
        LinkDetailsResponse::from_details(details, short_url),
        "Link retrieved",
    )))
}

/// Replaces the destination and lifetime of one of the caller's links.
///
/// `PUT /api/url/{id}`
pub async fn update_link_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    path: Result<Path<i64>, PathRejection>,
    ValidatedJson(payload): ValidatedJson<UpdateLinkRequest>,
) -> Result<Json<DataResponse<LinkResponse>>, AppError> {
    let id = link_id(path)?;
    let link = state
        .link_service
        .update_link(owner_id, id, payload.original_url, payload.expiration)
        .await?;

    let short_url = state.link_service.short_url(&link.token);

    Ok(Json(DataResponse::new(
        LinkResponse::from_link(link, short_url),
        "Link updated",
    )))
}

/// Deletes one of the caller's links and stops its token from resolving.
///
/// `DELETE /api/url/{id}`
pub async fn delete_link_handler(
    State(state): State<AppState>,
    Extension(AuthenticatedOwner(owner_id)): Extension<AuthenticatedOwner>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = link_id(path)?;
    state.link_service.delete_link(owner_id, id).await?;

    Ok(Json(MessageResponse {
        message: "Link deleted".to_string(),
    }))
}
