use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IngestTarget, ResultsStore, slug_base};
use crate::dto::common::Page;
use crate::dto::event::{EventChanges, EventFilter, NewEvent};
use crate::dto::participant::UploadResult;
use crate::error::{Result, StorageError};
use crate::ingest::ParsedResults;
use crate::models::slug::first_free_slug;
use crate::models::{Event, EventStatus, Participant};
use crate::query::{Criterion, ParticipantFields};

struct StoredParticipant {
    participant: Participant,
    fields: ParticipantFields,
}

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    /// Kept in listing order: distance, position (unranked last), file order.
    participants: HashMap<Uuid, Vec<StoredParticipant>>,
}

impl Inner {
    fn event(&self, id: Uuid) -> Result<&Event> {
        self.events.get(&id).ok_or(StorageError::NotFound)
    }

    fn event_mut(&mut self, id: Uuid) -> Result<&mut Event> {
        self.events.get_mut(&id).ok_or(StorageError::NotFound)
    }

    fn unique_slug(&self, name: &str, except: Option<Uuid>) -> String {
        let taken: HashSet<String> = self
            .events
            .values()
            .filter(|event| Some(event.id) != except)
            .map(|event| event.slug.clone())
            .collect();

        first_free_slug(&slug_base(name), &taken)
    }

    fn replace_results(&mut self, event_id: Uuid, results: &ParsedResults, file_hash: &str) -> Result<i64> {
        let mut stored: Vec<StoredParticipant> = results
            .rows
            .iter()
            .enumerate()
            .map(|(row_index, row)| StoredParticipant {
                fields: ParticipantFields::extract(&row.data),
                participant: Participant {
                    id: Uuid::new_v4(),
                    event_id,
                    row_index: row_index as i32,
                    race: row.race.clone(),
                    data: row.data.clone(),
                },
            })
            .collect();

        stored.sort_by(|a, b| {
            (a.fields.distance.is_none(), &a.fields.distance)
                .cmp(&(b.fields.distance.is_none(), &b.fields.distance))
                .then_with(|| ranking_key(a).cmp(&ranking_key(b)))
        });

        let records = stored.len();
        let event = self.event_mut(event_id)?;
        event.file_hash = Some(file_hash.to_ascii_lowercase());
        event.records_count = records as i32;
        event.unique_modalities = results.unique_modalities();
        event.unique_categories = results.unique_categories();

        self.participants.insert(event_id, stored);

        Ok(records as i64)
    }
}

fn ranking_key(stored: &StoredParticipant) -> (bool, Option<i32>, i32) {
    (
        stored.fields.position.is_none(),
        stored.fields.position,
        stored.participant.row_index,
    )
}

fn same_text(candidate: Option<&str>, expected: &str) -> bool {
    candidate.is_some_and(|value| value.to_lowercase() == expected.trim().to_lowercase())
}

/// Process-local store for development and tests. Holds everything behind one lock,
/// so an ingest is never observed half applied.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultsStore for MemoryStore {
    async fn list_events(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64)> {
        let inner = self.inner.read().await;
        let name = filter.name.as_deref().map(str::to_lowercase);

        let mut events: Vec<&Event> = inner
            .events
            .values()
            .filter(|event| filter.include_hidden || event.status == EventStatus::Published)
            .filter(|event| {
                name.as_deref()
                    .is_none_or(|name| event.name.to_lowercase().contains(name))
            })
            .filter(|event| filter.date.is_none_or(|date| event.date == Some(date)))
            .collect();

        events.sort_by(|a, b| {
            (b.date.is_some(), b.date)
                .cmp(&(a.date.is_some(), a.date))
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = events.len() as i64;
        let events = events
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();

        Ok((events, total))
    }

    async fn find_event(&self, id: Uuid) -> Result<Event> {
        self.inner.read().await.event(id).cloned()
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Event> {
        self.inner
            .read()
            .await
            .events
            .values()
            .find(|event| event.slug == slug)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn create_event(&self, new: NewEvent) -> Result<Event> {
        let mut inner = self.inner.write().await;

        let event = Event {
            id: Uuid::new_v4(),
            slug: inner.unique_slug(&new.name, None),
            name: new.name,
            date: new.date,
            time: new.time,
            address: new.address,
            image_url: new.image_url,
            file_name: new.file_name,
            file_extension: new.file_extension,
            status: new.status,
            created_at: Utc::now(),
            file_hash: None,
            records_count: 0,
            unique_modalities: Vec::new(),
            unique_categories: Vec::new(),
        };

        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> Result<Event> {
        let mut inner = self.inner.write().await;

        let renamed = inner.event(id)?.name != changes.name;
        let slug = renamed.then(|| inner.unique_slug(&changes.name, Some(id)));

        let event = inner.event_mut(id)?;
        if let Some(slug) = slug {
            event.slug = slug;
        }
        event.name = changes.name;
        event.date = changes.date;
        event.time = changes.time;
        event.address = changes.address;
        event.image_url = changes.image_url;
        event.file_name = changes.file_name;
        event.file_extension = changes.file_extension;

        Ok(event.clone())
    }

    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Event> {
        let mut inner = self.inner.write().await;
        let event = inner.event_mut(id)?;
        event.status = status;
        Ok(event.clone())
    }

    async fn update_image(&self, id: Uuid, image_url: &str) -> Result<Event> {
        let mut inner = self.inner.write().await;
        let event = inner.event_mut(id)?;
        event.image_url = Some(image_url.to_string());
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.events.remove(&id).ok_or(StorageError::NotFound)?;
        inner.participants.remove(&id);
        Ok(())
    }

    async fn ingest(
        &self,
        target: IngestTarget,
        results: &ParsedResults,
        file_hash: &str,
    ) -> Result<UploadResult> {
        let mut inner = self.inner.write().await;

        let (event_id, reprocessed) = match target {
            IngestTarget::Existing(id) => {
                let event = inner.event(id)?;
                if event.has_file_hash(file_hash) {
                    return Ok(UploadResult::unchanged(event));
                }
                (id, true)
            }
            IngestTarget::New {
                file_name,
                file_extension,
            } => {
                let existing = inner
                    .events
                    .values()
                    .filter(|event| event.name == results.event_name)
                    .min_by_key(|event| (event.created_at, event.id));

                match existing {
                    Some(event) if event.has_file_hash(file_hash) => {
                        return Ok(UploadResult::unchanged(event));
                    }
                    Some(event) => (event.id, true),
                    None => {
                        let event = Event {
                            id: Uuid::new_v4(),
                            slug: inner.unique_slug(&results.event_name, None),
                            name: results.event_name.clone(),
                            date: Some(Utc::now().date_naive()),
                            time: None,
                            address: None,
                            image_url: None,
                            file_name: Some(file_name),
                            file_extension,
                            status: EventStatus::Published,
                            created_at: Utc::now(),
                            file_hash: None,
                            records_count: 0,
                            unique_modalities: Vec::new(),
                            unique_categories: Vec::new(),
                        };
                        let id = event.id;
                        inner.events.insert(id, event);
                        (id, false)
                    }
                }
            }
        };

        let records_inserted = inner.replace_results(event_id, results, file_hash)?;

        Ok(UploadResult {
            event_id,
            records_inserted,
            reprocessed,
        })
    }

    async fn list_participants(
        &self,
        event_id: Uuid,
        criteria: &[Criterion],
        page: Page,
    ) -> Result<(Vec<Participant>, i64)> {
        let inner = self.inner.read().await;
        inner.event(event_id)?;

        let matching: Vec<&StoredParticipant> = inner
            .participants
            .get(&event_id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| criteria.iter().all(|c| c.matches(&row.fields)))
                    .collect()
            })
            .unwrap_or_default();

        let total = matching.len() as i64;
        let participants = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|row| row.participant.clone())
            .collect();

        Ok((participants, total))
    }

    async fn comparison_pool(
        &self,
        event_id: Uuid,
        distance: &str,
        category: Option<&str>,
    ) -> Result<Vec<Participant>> {
        let inner = self.inner.read().await;
        inner.event(event_id)?;

        let mut pool: Vec<&StoredParticipant> = inner
            .participants
            .get(&event_id)
            .map(|rows| {
                rows.iter()
                    .filter(|row| same_text(row.fields.distance.as_deref(), distance))
                    .filter(|row| {
                        category.is_none_or(|category| {
                            same_text(row.fields.category.as_deref(), category)
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        pool.sort_by_key(|row| ranking_key(row));

        Ok(pool.into_iter().map(|row| row.participant.clone()).collect())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
