use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::{IngestTarget, ResultsStore, slug_base};
use crate::dto::common::Page;
use crate::dto::event::{EventChanges, EventFilter, NewEvent};
use crate::dto::participant::UploadResult;
use crate::error::Result;
use crate::ingest::ParsedResults;
use crate::models::{Event, EventStatus, Participant};
use crate::query::Criterion;
use crate::repository::event::{self, EventRepository};
use crate::repository::participant::{self, ParticipantRepository};

/// Postgres backed store
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn events(&self) -> EventRepository<'_> {
        EventRepository::new(&self.pool)
    }

    fn participants(&self) -> ParticipantRepository<'_> {
        ParticipantRepository::new(&self.pool)
    }
}

#[async_trait]
impl ResultsStore for PgStore {
    async fn list_events(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64)> {
        self.events().list(filter, page).await
    }

    async fn find_event(&self, id: Uuid) -> Result<Event> {
        self.events().find_by_id(id).await
    }

    async fn find_event_by_slug(&self, slug: &str) -> Result<Event> {
        self.events().find_by_slug(slug).await
    }

    async fn create_event(&self, new: NewEvent) -> Result<Event> {
        self.events().create(&slug_base(&new.name), &new).await
    }

    async fn update_event(&self, id: Uuid, changes: EventChanges) -> Result<Event> {
        let current = self.events().find_by_id(id).await?;

        let slug = if current.name != changes.name {
            Some(event::free_slug(&self.pool, &slug_base(&changes.name), Some(id)).await?)
        } else {
            None
        };

        self.events().update(id, &changes, slug.as_deref()).await
    }

    async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Event> {
        self.events().update_status(id, status).await
    }

    async fn update_image(&self, id: Uuid, image_url: &str) -> Result<Event> {
        self.events().update_image(id, image_url).await
    }

    async fn delete_event(&self, id: Uuid) -> Result<()> {
        self.events().delete(id).await
    }

    async fn ingest(
        &self,
        target: IngestTarget,
        results: &ParsedResults,
        file_hash: &str,
    ) -> Result<UploadResult> {
        let mut tx = self.pool.begin().await?;

        let (current, reprocessed) = match target {
            IngestTarget::Existing(id) => (event::lock_by_id(&mut *tx, id).await?, true),
            IngestTarget::New {
                file_name,
                file_extension,
            } => {
                event::lock_name(&mut *tx, &results.event_name).await?;

                match event::lock_by_name(&mut *tx, &results.event_name).await? {
                    Some(existing) => (existing, true),
                    None => {
                        let slug =
                            event::free_slug(&mut *tx, &slug_base(&results.event_name), None)
                                .await?;
                        let new = NewEvent {
                            name: results.event_name.clone(),
                            date: Some(Utc::now().date_naive()),
                            time: None,
                            address: None,
                            image_url: None,
                            file_name: Some(file_name),
                            file_extension,
                            status: EventStatus::Published,
                        };
                        let created = event::insert(&mut *tx, &slug, &new).await?;
                        tracing::info!(event_id = %created.id, slug = %created.slug, "Created event from upload");
                        (created, false)
                    }
                }
            }
        };

        if current.has_file_hash(file_hash) {
            tx.rollback().await?;
            tracing::info!(event_id = %current.id, "Results file unchanged, skipping");
            return Ok(UploadResult::unchanged(&current));
        }

        let removed = participant::delete_for_event(&mut *tx, current.id).await?;
        let inserted = participant::insert_rows(&mut *tx, current.id, &results.rows).await?;
        event::record_upload(
            &mut *tx,
            current.id,
            file_hash,
            results.rows.len() as i32,
            &results.unique_modalities(),
            &results.unique_categories(),
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            event_id = %current.id,
            removed,
            inserted,
            "Replaced event results"
        );

        Ok(UploadResult {
            event_id: current.id,
            records_inserted: inserted as i64,
            reprocessed,
        })
    }

    async fn list_participants(
        &self,
        event_id: Uuid,
        criteria: &[Criterion],
        page: Page,
    ) -> Result<(Vec<Participant>, i64)> {
        self.events().find_by_id(event_id).await?;
        self.participants().list(event_id, criteria, page).await
    }

    async fn comparison_pool(
        &self,
        event_id: Uuid,
        distance: &str,
        category: Option<&str>,
    ) -> Result<Vec<Participant>> {
        self.events().find_by_id(event_id).await?;
        self.participants()
            .comparison_pool(event_id, distance, category)
            .await
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Database;
    use crate::ingest::{parse_results, sha256_hex};

    /// Store on `DATABASE_URL`, or `None` when no database is configured.
    async fn test_store() -> Option<PgStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let database = Database::new(&url).await.unwrap();
        database.run_migrations().await.unwrap();
        Some(database.store())
    }

    fn results_file(event_name: &str, finishers: usize) -> String {
        let mut file = format!("{}\n;SEXO|NOMBRE|DORSAL|MODALIDAD|POSICION\n", event_name);
        for n in 1..=finishers {
            file.push_str(&format!("M|Corredor {n}|{n:03}|10K|{n}\n"));
        }
        file
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn participant_pages_agree_with_their_count_during_ingest() {
        let Some(store) = test_store().await else {
            return;
        };
        let store = Arc::new(store);

        let event_name = format!("Carrera {}", Uuid::new_v4());
        let full = results_file(&event_name, 10);
        let single = results_file(&event_name, 1);
        let files = Arc::new([
            (parse_results(full.as_bytes()).unwrap(), sha256_hex(full.as_bytes())),
            (parse_results(single.as_bytes()).unwrap(), sha256_hex(single.as_bytes())),
        ]);

        let event_id = store
            .ingest(
                IngestTarget::New {
                    file_name: "carrera.racecheck".to_string(),
                    file_extension: ".racecheck".to_string(),
                },
                &files[0].0,
                &files[0].1,
            )
            .await
            .unwrap()
            .event_id;

        let writer = {
            let store = store.clone();
            let files = files.clone();
            tokio::spawn(async move {
                for round in 1..=20 {
                    let (parsed, hash) = &files[round % 2];
                    store
                        .ingest(IngestTarget::Existing(event_id), parsed, hash)
                        .await
                        .unwrap();
                }
            })
        };

        let mut readers = Vec::new();
        for _ in 0..3 {
            let store = store.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let (page, total) = store
                        .list_participants(event_id, &[], Page::new(1, 5))
                        .await
                        .unwrap();
                    assert!(
                        (page.len() == 5 && total == 10) || (page.len() == 1 && total == 1),
                        "{} rows with total {}",
                        page.len(),
                        total
                    );
                }
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            reader.await.unwrap();
        }

        store.delete_event(event_id).await.unwrap();
    }
}
