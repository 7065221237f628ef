use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::models::{Event, Participant};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsResponse {
    pub participants: Vec<Participant>,
    /// Size of the whole filtered set, not just this page
    pub total_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ComparisonQuery {
    /// Bib of the participant to compare
    pub bib: Option<String>,
    /// Distance / modality the participant ran
    pub distance: Option<String>,
    /// Restricts the comparison to this category as well
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    pub first_place: Option<Participant>,
    pub previous_participants: Vec<Participant>,
}

/// Outcome of a results file upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadResult {
    #[serde(rename = "EventID")]
    pub event_id: Uuid,
    #[serde(rename = "RecordsInserted")]
    pub records_inserted: i64,
    /// False when the event already held this exact file
    #[serde(rename = "Reprocessed")]
    pub reprocessed: bool,
}

impl UploadResult {
    /// Result of re-sending the file an event was already loaded from.
    pub fn unchanged(event: &Event) -> Self {
        Self {
            event_id: event.id,
            records_inserted: i64::from(event.records_count),
            reprocessed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_result_uses_wire_names() {
        let result = UploadResult {
            event_id: Uuid::nil(),
            records_inserted: 10,
            reprocessed: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["RecordsInserted"], 10);
        assert_eq!(json["Reprocessed"], true);
        assert_eq!(json["EventID"], "00000000-0000-0000-0000-000000000000");
    }
}
