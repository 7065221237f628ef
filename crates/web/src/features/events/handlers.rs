use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use storage::{
    dto::{
        common::{DEFAULT_EVENTS_PAGE_SIZE, DEFAULT_PARTICIPANTS_PAGE_SIZE, PaginationParams},
        event::{
            CreateEventRequest, EventListQuery, EventsResponse, UpdateEventRequest,
            UpdateImageRequest, UpdateStatusRequest,
        },
        participant::{ComparisonQuery, ComparisonResponse, ParticipantsResponse, UploadResult},
    },
    models::{Event, EventStatus},
    query::ParticipantFilter,
};
use validator::Validate;

use crate::error::WebError;
use crate::extract::{JsonBody, Path, Query, Upload};
use crate::middleware::auth::Caller;
use crate::state::AppState;

use super::services::{self, ResultsUpload};

#[utoipa::path(
    get,
    path = "/api/events",
    params(EventListQuery, PaginationParams),
    responses(
        (status = 200, description = "Events matching the filters", body = EventsResponse),
        (status = 400, description = "Invalid date filter")
    ),
    tag = "events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    caller: Caller,
    Query(query): Query<EventListQuery>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, WebError> {
    let filter = query
        .into_filter()
        .map_err(|e| WebError::BadRequest(e.to_string()))?;
    let page = pagination.resolve(DEFAULT_EVENTS_PAGE_SIZE);

    let events = services::list_events(state.store(), filter, page, caller).await?;

    Ok(Json(events).into_response())
}

#[utoipa::path(
    get,
    path = "/api/events/{event}",
    params(
        ("event" = String, Path, description = "Event id or slug")
    ),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 400, description = "Malformed event reference"),
        (status = 404, description = "Event not found")
    ),
    tag = "events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
) -> Result<Response, WebError> {
    let event = services::visible_event(state.store(), &reference, caller).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    get,
    path = "/api/events/slug/{slug}",
    params(
        ("slug" = String, Path, description = "Event slug")
    ),
    responses(
        (status = 200, description = "Event found", body = Event),
        (status = 404, description = "Event not found")
    ),
    tag = "events"
)]
pub async fn get_event_by_slug(
    State(state): State<AppState>,
    caller: Caller,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    let event = services::get_event_by_slug(state.store(), &slug, caller).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/create",
    request_body = CreateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "Event created successfully", body = Event),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Slug already exists")
    ),
    tag = "events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateEventRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let new_event = req
        .into_new_event()
        .map_err(|e| WebError::BadRequest(e.to_string()))?;

    let event = services::create_event(state.store(), new_event).await?;

    Ok((StatusCode::CREATED, Json(event)).into_response())
}

#[utoipa::path(
    put,
    path = "/api/events/{event}",
    params(
        ("event" = String, Path, description = "Event id or slug")
    ),
    request_body = UpdateEventRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Event updated successfully", body = Event),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found"),
        (status = 409, description = "Slug already exists")
    ),
    tag = "events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    JsonBody(req): JsonBody<UpdateEventRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let event = services::update_event(state.store(), &reference, req).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/events/{event}/status",
    params(
        ("event" = String, Path, description = "Event id or slug")
    ),
    request_body = UpdateStatusRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Status changed", body = Event),
        (status = 400, description = "Unknown status"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found")
    ),
    tag = "events"
)]
pub async fn update_status(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    JsonBody(req): JsonBody<UpdateStatusRequest>,
) -> Result<Response, WebError> {
    let status = req
        .status
        .trim()
        .parse::<EventStatus>()
        .map_err(WebError::BadRequest)?;

    let event = services::update_status(state.store(), &reference, status).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    patch,
    path = "/api/events/{event}/image",
    params(
        ("event" = String, Path, description = "Event id or slug")
    ),
    request_body = UpdateImageRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Image changed", body = Event),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found")
    ),
    tag = "events"
)]
pub async fn update_image(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    JsonBody(req): JsonBody<UpdateImageRequest>,
) -> Result<Response, WebError> {
    req.validate()?;

    let event = services::update_image(state.store(), &reference, &req.image_url).await?;

    Ok(Json(event).into_response())
}

#[utoipa::path(
    delete,
    path = "/api/events/{event}",
    params(
        ("event" = String, Path, description = "Event id or slug")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 204, description = "Event deleted successfully"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found")
    ),
    tag = "events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Response, WebError> {
    services::delete_event(state.store(), &reference).await?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/upload",
    request_body(content_type = "multipart/form-data", description = "`file` (results file) and `hash` (hex SHA-256 of the file)"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "File ingested or already current", body = UploadResult),
        (status = 400, description = "Bad extension, hash mismatch or malformed file"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "uploads"
)]
pub async fn upload_results(
    State(state): State<AppState>,
    Upload(multipart): Upload,
) -> Result<Response, WebError> {
    let upload = read_upload(multipart).await?;

    let result = services::upload_new(state.store(), &state.uploads, upload).await?;

    Ok(Json(result).into_response())
}

#[utoipa::path(
    post,
    path = "/api/events/{event}/upload",
    params(
        ("event" = String, Path, description = "Event id or slug")
    ),
    request_body(content_type = "multipart/form-data", description = "`file` (results file) and `hash` (hex SHA-256 of the file)"),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "File ingested or already current", body = UploadResult),
        (status = 400, description = "Bad extension, hash mismatch or malformed file"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Event not found")
    ),
    tag = "uploads"
)]
pub async fn upload_event_results(
    State(state): State<AppState>,
    Path(reference): Path<String>,
    Upload(multipart): Upload,
) -> Result<Response, WebError> {
    let upload = read_upload(multipart).await?;

    let result =
        services::upload_to_event(state.store(), &state.uploads, &reference, upload).await?;

    Ok(Json(result).into_response())
}

#[utoipa::path(
    get,
    path = "/api/events/{event}/participants",
    params(
        ("event" = String, Path, description = "Event id or slug"),
        ParticipantFilter,
        PaginationParams
    ),
    responses(
        (status = 200, description = "One page of matching participants", body = ParticipantsResponse),
        (status = 400, description = "Invalid filter"),
        (status = 404, description = "Event not found")
    ),
    tag = "participants"
)]
pub async fn list_participants(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
    Query(filter): Query<ParticipantFilter>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, WebError> {
    let page = pagination.resolve(DEFAULT_PARTICIPANTS_PAGE_SIZE);

    let participants =
        services::list_participants(state.store(), &reference, &filter, page, caller).await?;

    Ok(Json(participants).into_response())
}

#[utoipa::path(
    get,
    path = "/api/events/{event}/participants/comparison",
    params(
        ("event" = String, Path, description = "Event id or slug"),
        ComparisonQuery
    ),
    responses(
        (status = 200, description = "Leader and up to five finishers ahead of the bib", body = ComparisonResponse),
        (status = 400, description = "bib or distance missing"),
        (status = 404, description = "Event not found")
    ),
    tag = "participants"
)]
pub async fn get_comparison(
    State(state): State<AppState>,
    caller: Caller,
    Path(reference): Path<String>,
    Query(query): Query<ComparisonQuery>,
) -> Result<Response, WebError> {
    let comparison = services::get_comparison(state.store(), &reference, &query, caller).await?;

    Ok(Json(comparison).into_response())
}

async fn read_upload(mut multipart: Multipart) -> Result<ResultsUpload, WebError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut hash: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WebError::BadRequest(e.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| WebError::BadRequest(e.body_text()))?;
                file = Some((file_name, bytes.to_vec()));
            }
            Some("hash") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| WebError::BadRequest(e.body_text()))?;
                hash = Some(value.trim().to_string());
            }
            _ => {}
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| WebError::BadRequest("file is required".to_string()))?;
    let hash = hash
        .filter(|h| !h.is_empty())
        .ok_or_else(|| WebError::BadRequest("hash is required".to_string()))?;

    Ok(ResultsUpload {
        file_name,
        bytes,
        hash,
    })
}
