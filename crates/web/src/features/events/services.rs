use storage::{
    dto::{
        common::Page,
        event::{EventFilter, EventsResponse, NewEvent, UpdateEventRequest},
        participant::{ComparisonQuery, ComparisonResponse, ParticipantsResponse, UploadResult},
    },
    error::{Result, StorageError},
    ingest::{ParsedResults, hashes_match, parse_results, sha256_hex},
    models::{Event, EventStatus, slug::is_valid_slug},
    query::{ParticipantFilter, locate_in_ranking},
    store::{IngestTarget, ResultsStore},
};
use uuid::Uuid;

use crate::middleware::auth::Caller;
use crate::state::UploadSettings;

/// A results file received from a client, with the digest it claims to have.
#[derive(Debug, Clone)]
pub struct ResultsUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub hash: String,
}

/// Look an event up by UUID or by slug
pub async fn resolve_event(store: &dyn ResultsStore, reference: &str) -> Result<Event> {
    let reference = reference.trim();

    if let Ok(id) = Uuid::parse_str(reference) {
        return store.find_event(id).await;
    }

    if is_valid_slug(reference) {
        return store.find_event_by_slug(reference).await;
    }

    Err(StorageError::Validation(format!(
        "'{}' is neither an event id nor a slug",
        reference
    )))
}

/// Look an event up for a read. Unpublished events are not found unless the caller is an admin.
pub async fn visible_event(store: &dyn ResultsStore, reference: &str, caller: Caller) -> Result<Event> {
    let event = resolve_event(store, reference).await?;
    visible_to(event, caller)
}

fn visible_to(event: Event, caller: Caller) -> Result<Event> {
    if event.status == EventStatus::Published || caller.is_admin() {
        Ok(event)
    } else {
        Err(StorageError::NotFound)
    }
}

/// List events; draft and hidden ones are only listed for admins
pub async fn list_events(
    store: &dyn ResultsStore,
    mut filter: EventFilter,
    page: Page,
    caller: Caller,
) -> Result<EventsResponse> {
    filter.include_hidden &= caller.is_admin();

    let (events, total_count) = store.list_events(&filter, page).await?;
    Ok(EventsResponse {
        events,
        total_count,
    })
}

/// Get event by slug
pub async fn get_event_by_slug(store: &dyn ResultsStore, slug: &str, caller: Caller) -> Result<Event> {
    let event = store.find_event_by_slug(slug.trim()).await?;
    visible_to(event, caller)
}

/// Create a new event
pub async fn create_event(store: &dyn ResultsStore, event: NewEvent) -> Result<Event> {
    let event = store.create_event(event).await?;
    tracing::info!(event_id = %event.id, slug = %event.slug, "Created event");
    Ok(event)
}

/// Update an event's descriptive fields
pub async fn update_event(
    store: &dyn ResultsStore,
    reference: &str,
    request: UpdateEventRequest,
) -> Result<Event> {
    let existing = resolve_event(store, reference).await?;
    let changes = request
        .into_changes(&existing)
        .map_err(|e| StorageError::Validation(e.to_string()))?;

    store.update_event(existing.id, changes).await
}

pub async fn update_status(
    store: &dyn ResultsStore,
    reference: &str,
    status: EventStatus,
) -> Result<Event> {
    let existing = resolve_event(store, reference).await?;
    store.update_status(existing.id, status).await
}

pub async fn update_image(store: &dyn ResultsStore, reference: &str, image_url: &str) -> Result<Event> {
    let existing = resolve_event(store, reference).await?;
    store.update_image(existing.id, image_url.trim()).await
}

/// Delete an event and its participants
pub async fn delete_event(store: &dyn ResultsStore, reference: &str) -> Result<()> {
    let existing = resolve_event(store, reference).await?;
    store.delete_event(existing.id).await?;
    tracing::info!(event_id = %existing.id, "Deleted event");
    Ok(())
}

/// Ingest a results file into the event named on its first line
pub async fn upload_new(
    store: &dyn ResultsStore,
    settings: &UploadSettings,
    upload: ResultsUpload,
) -> Result<UploadResult> {
    check_upload(settings, &upload)?;
    let parsed = parse_upload(&upload)?;

    let target = IngestTarget::New {
        file_name: upload.file_name,
        file_extension: settings.extension.clone(),
    };

    store.ingest(target, &parsed, &upload.hash).await
}

/// Replace the results of an existing event with an uploaded file
pub async fn upload_to_event(
    store: &dyn ResultsStore,
    settings: &UploadSettings,
    reference: &str,
    upload: ResultsUpload,
) -> Result<UploadResult> {
    check_upload(settings, &upload)?;

    let event = resolve_event(store, reference).await?;
    if event.has_file_hash(&upload.hash) {
        tracing::info!(event_id = %event.id, "Results file unchanged, skipping");
        return Ok(UploadResult::unchanged(&event));
    }

    let parsed = parse_upload(&upload)?;
    store
        .ingest(IngestTarget::Existing(event.id), &parsed, &upload.hash)
        .await
}

fn check_upload(settings: &UploadSettings, upload: &ResultsUpload) -> Result<()> {
    let extension = settings.extension.to_ascii_lowercase();
    if !upload.file_name.to_ascii_lowercase().ends_with(&extension) {
        return Err(StorageError::Validation(format!(
            "invalid file extension, expected {}",
            settings.extension
        )));
    }

    if !hashes_match(&upload.hash, &sha256_hex(&upload.bytes)) {
        tracing::warn!(file = %upload.file_name, "Rejected upload with mismatching hash");
        return Err(StorageError::Validation("file hash mismatch".to_string()));
    }

    Ok(())
}

fn parse_upload(upload: &ResultsUpload) -> Result<ParsedResults> {
    let parsed = parse_results(&upload.bytes)?;

    tracing::info!(
        file = %upload.file_name,
        event = %parsed.event_name,
        lines_read = parsed.lines_read,
        records = parsed.rows.len(),
        skipped = parsed.records_skipped,
        "Parsed results file"
    );
    if parsed.rows.is_empty() {
        tracing::warn!(file = %upload.file_name, "Results file contains no records");
    }

    Ok(parsed)
}

/// One filtered page of an event's participants
pub async fn list_participants(
    store: &dyn ResultsStore,
    reference: &str,
    filter: &ParticipantFilter,
    page: Page,
    caller: Caller,
) -> Result<ParticipantsResponse> {
    let criteria = filter.criteria()?;
    let event = visible_event(store, reference, caller).await?;

    let (participants, total_count) = store.list_participants(event.id, &criteria, page).await?;

    Ok(ParticipantsResponse {
        participants,
        total_count,
    })
}

/// Leader and closest finishers ahead of the participant wearing `bib`
pub async fn get_comparison(
    store: &dyn ResultsStore,
    reference: &str,
    query: &ComparisonQuery,
    caller: Caller,
) -> Result<ComparisonResponse> {
    let bib = required(query.bib.as_deref(), "bib")?;
    let distance = required(query.distance.as_deref(), "distance")?;
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let event = visible_event(store, reference, caller).await?;
    let ranking = store.comparison_pool(event.id, distance, category).await?;

    Ok(locate_in_ranking(ranking, bib))
}

fn required<'q>(value: Option<&'q str>, name: &str) -> Result<&'q str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| StorageError::Validation(format!("{} is required", name)))
}
