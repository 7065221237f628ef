//! Persistence seam between the HTTP services and the backing database.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::dto::common::Page;
use crate::dto::event::{EventChanges, EventFilter, NewEvent};
use crate::dto::participant::UploadResult;
use crate::error::Result;
use crate::ingest::ParsedResults;
use crate::models::{Event, EventStatus, Participant};
use crate::query::Criterion;

/// Which event an uploaded results file belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestTarget {
    /// Replace the results of this event.
    Existing(Uuid),
    /// Bind to the event named on the file's first line, creating it when missing.
    New {
        file_name: String,
        file_extension: String,
    },
}

#[async_trait]
pub trait ResultsStore: Send + Sync {
    /// Events matching `filter`, newest date first, and the size of the whole match.
    async fn list_events(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64)>;

    async fn find_event(&self, id: Uuid) -> Result<Event>;

    async fn find_event_by_slug(&self, slug: &str) -> Result<Event>;

    async fn create_event(&self, event: NewEvent) -> Result<Event>;

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> Result<Event>;

    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Event>;

    async fn update_image(&self, id: Uuid, image_url: &str) -> Result<Event>;

    /// Removes the event together with its participants.
    async fn delete_event(&self, id: Uuid) -> Result<()>;

    /// Swaps the participant set of the target event for `results` in one step.
    ///
    /// Uploads for the same event are serialised. When the event already holds
    /// `file_hash` nothing is written and the result reports `reprocessed: false`.
    async fn ingest(
        &self,
        target: IngestTarget,
        results: &ParsedResults,
        file_hash: &str,
    ) -> Result<UploadResult>;

    /// One page of the participants matching every criterion, in ranking order.
    async fn list_participants(
        &self,
        event_id: Uuid,
        criteria: &[Criterion],
        page: Page,
    ) -> Result<(Vec<Participant>, i64)>;

    /// Participants of one distance (and optionally one category) ordered by
    /// position, unranked rows last.
    async fn comparison_pool(
        &self,
        event_id: Uuid,
        distance: &str,
        category: Option<&str>,
    ) -> Result<Vec<Participant>>;

    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}

/// Slug seed for an event name; names without letters or digits fall back to `event`.
pub(crate) fn slug_base(name: &str) -> String {
    let slug = crate::models::slug::generate_slug(name);
    if slug.is_empty() {
        "event".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_base_falls_back_for_symbol_names() {
        assert_eq!(slug_base("Maratón Test"), "maraton-test");
        assert_eq!(slug_base("***"), "event");
    }
}
