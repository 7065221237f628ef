use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::models::event::DEFAULT_FILE_EXTENSION;
use crate::models::{Event, EventStatus};

/// Request payload for creating an event by hand
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "validate_name")
    )]
    pub name: String,

    /// Calendar date as `YYYY-MM-DD`; empty means no date
    pub date: Option<String>,

    #[validate(length(max = 64))]
    pub time: Option<String>,

    #[validate(length(max = 512))]
    pub address: Option<String>,

    #[validate(length(max = 2048))]
    pub image_url: Option<String>,

    #[validate(length(max = 255))]
    pub file_name: Option<String>,

    #[validate(length(max = 32))]
    pub file_extension: Option<String>,
}

/// Request payload for editing an event. Status and results file state are kept.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "validate_name")
    )]
    pub name: String,

    pub date: Option<String>,

    #[validate(length(max = 64))]
    pub time: Option<String>,

    #[validate(length(max = 512))]
    pub address: Option<String>,

    #[validate(length(max = 2048))]
    pub image_url: Option<String>,

    #[validate(length(max = 255))]
    pub file_name: Option<String>,

    #[validate(length(max = 32))]
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    /// One of `DRAFT`, `PUBLISHED`, `HIDDEN`
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateImageRequest {
    #[validate(length(min = 1, max = 2048, message = "imageUrl is required"))]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EventListQuery {
    /// Case-insensitive substring of the event name
    pub name: Option<String>,
    /// Exact day as `YYYY-MM-DD`
    pub date: Option<String>,
    /// Also list draft and hidden events
    pub include_hidden: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub events: Vec<Event>,
    pub total_count: i64,
}

/// Store input for a new event; the store derives the unique slug from `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub file_name: Option<String>,
    pub file_extension: String,
    pub status: EventStatus,
}

/// Store input for editing an event's descriptive fields.
#[derive(Debug, Clone, PartialEq)]
pub struct EventChanges {
    pub name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub file_name: Option<String>,
    pub file_extension: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    pub name: Option<String>,
    pub date: Option<NaiveDate>,
    pub include_hidden: bool,
}

/// Parses an optional `YYYY-MM-DD` value, treating blank input as absent.
pub fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, &'static str> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| "invalid date format, expected YYYY-MM-DD"),
    }
}

fn validate_name(name: &str) -> Result<(), validator::ValidationError> {
    if name.trim().is_empty() {
        let mut error = validator::ValidationError::new("required");
        error.message = Some("name is required".into());
        Err(error)
    } else {
        Ok(())
    }
}

fn required_name(name: &str) -> Result<String, &'static str> {
    let name = name.trim();
    if name.is_empty() {
        Err("name is required")
    } else {
        Ok(name.to_string())
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extension_or_default(value: Option<String>) -> String {
    blank_to_none(value).unwrap_or_else(|| DEFAULT_FILE_EXTENSION.to_string())
}

impl CreateEventRequest {
    pub fn into_new_event(self) -> Result<NewEvent, &'static str> {
        let name = required_name(&self.name)?;
        let date = parse_optional_date(self.date.as_deref())?;

        Ok(NewEvent {
            name,
            date,
            time: blank_to_none(self.time),
            address: blank_to_none(self.address),
            image_url: blank_to_none(self.image_url),
            file_name: blank_to_none(self.file_name),
            file_extension: extension_or_default(self.file_extension),
            status: EventStatus::Published,
        })
    }
}

impl UpdateEventRequest {
    /// A blank date keeps whatever date the event already has.
    pub fn into_changes(self, current: &Event) -> Result<EventChanges, &'static str> {
        let name = required_name(&self.name)?;
        let date = parse_optional_date(self.date.as_deref())?.or(current.date);

        Ok(EventChanges {
            name,
            date,
            time: blank_to_none(self.time),
            address: blank_to_none(self.address),
            image_url: blank_to_none(self.image_url),
            file_name: blank_to_none(self.file_name),
            file_extension: extension_or_default(self.file_extension),
        })
    }
}

impl EventListQuery {
    pub fn into_filter(self) -> Result<EventFilter, &'static str> {
        Ok(EventFilter {
            date: parse_optional_date(self.date.as_deref())?,
            name: blank_to_none(self.name),
            include_hidden: self.include_hidden.unwrap_or(false),
        })
    }
}
