use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Default extension for results files produced by the timing software.
pub const DEFAULT_FILE_EXTENSION: &str = ".racecheck";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Draft,
    #[default]
    Published,
    Hidden,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
            Self::Hidden => "HIDDEN",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "PUBLISHED" => Ok(Self::Published),
            "HIDDEN" => Ok(Self::Hidden),
            other => Err(format!(
                "invalid status '{}'. Valid options are: PUBLISHED, HIDDEN, DRAFT",
                other
            )),
        }
    }
}

/// A race event and the bookkeeping of its last ingested results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub file_name: Option<String>,
    pub file_extension: String,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub file_hash: Option<String>,
    pub records_count: i32,
    pub unique_modalities: Vec<String>,
    pub unique_categories: Vec<String>,
}

impl Event {
    /// True when `hash` is the digest of the file this event was last loaded from.
    pub fn has_file_hash(&self, hash: &str) -> bool {
        self.file_hash
            .as_deref()
            .is_some_and(|stored| stored.eq_ignore_ascii_case(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in [EventStatus::Draft, EventStatus::Published, EventStatus::Hidden] {
            assert_eq!(status.as_str().parse::<EventStatus>(), Ok(status));
        }
        assert!("published".parse::<EventStatus>().is_err());
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&EventStatus::Hidden).unwrap();
        assert_eq!(json, "\"HIDDEN\"");
    }
}
