use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgExecutor, PgPool, QueryBuilder};
use uuid::Uuid;

use crate::dto::common::Page;
use crate::dto::event::{EventChanges, EventFilter, NewEvent};
use crate::error::{Result, StorageError};
use crate::models::slug::first_free_slug;
use crate::models::{Event, EventStatus};
use crate::query::escape_like;
use crate::repository::snapshot;

const EVENT_COLUMNS: &str = "id, slug, name, date, time, address, image_url, file_name, \
     file_extension, status, created_at, file_hash, records_count, unique_modalities, \
     unique_categories";

#[derive(FromRow)]
struct EventRow {
    id: Uuid,
    slug: String,
    name: String,
    date: Option<NaiveDate>,
    time: Option<String>,
    address: Option<String>,
    image_url: Option<String>,
    file_name: Option<String>,
    file_extension: String,
    status: String,
    created_at: DateTime<Utc>,
    file_hash: Option<String>,
    records_count: i32,
    unique_modalities: Vec<String>,
    unique_categories: Vec<String>,
}

impl TryFrom<EventRow> for Event {
    type Error = StorageError;

    fn try_from(row: EventRow) -> Result<Self> {
        let status = row
            .status
            .parse::<EventStatus>()
            .map_err(StorageError::Validation)?;

        Ok(Event {
            id: row.id,
            slug: row.slug,
            name: row.name,
            date: row.date,
            time: row.time,
            address: row.address,
            image_url: row.image_url,
            file_name: row.file_name,
            file_extension: row.file_extension,
            status,
            created_at: row.created_at,
            file_hash: row.file_hash,
            records_count: row.records_count,
            unique_modalities: row.unique_modalities,
            unique_categories: row.unique_categories,
        })
    }
}

fn into_event(row: Option<EventRow>) -> Result<Event> {
    row.ok_or(StorageError::NotFound)?.try_into()
}

/// Repository for event rows
pub struct EventRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Events matching the filter, most recent date first, plus the total match count
    pub async fn list(&self, filter: &EventFilter, page: Page) -> Result<(Vec<Event>, i64)> {
        let mut tx = snapshot(self.pool).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM events WHERE TRUE");
        push_filter(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        let mut query = QueryBuilder::new(format!("SELECT {} FROM events WHERE TRUE", EVENT_COLUMNS));
        push_filter(&mut query, filter);
        query.push(" ORDER BY date DESC NULLS LAST, created_at DESC, id ASC LIMIT ");
        query.push_bind(page.limit());
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let rows: Vec<EventRow> = query.build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;
        let events = rows
            .into_iter()
            .map(Event::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((events, total))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Event> {
        find_by_id(self.pool, id).await
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {} FROM events WHERE slug = $1",
            EVENT_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        into_event(row)
    }

    /// Insert a new event under the first free slug derived from `base_slug`
    pub async fn create(&self, base_slug: &str, event: &NewEvent) -> Result<Event> {
        let slug = free_slug(self.pool, base_slug, None).await?;
        insert(self.pool, &slug, event).await
    }

    /// Update the descriptive fields; `slug` is only set when the name changed
    pub async fn update(&self, id: Uuid, changes: &EventChanges, slug: Option<&str>) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            UPDATE events
            SET name = $2,
                slug = COALESCE($3, slug),
                date = $4,
                time = $5,
                address = $6,
                image_url = $7,
                file_name = $8,
                file_extension = $9
            WHERE id = $1
            RETURNING {}
            "#,
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(slug)
        .bind(changes.date)
        .bind(&changes.time)
        .bind(&changes.address)
        .bind(&changes.image_url)
        .bind(&changes.file_name)
        .bind(&changes.file_extension)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| StorageError::from(e).slug_conflict())?;

        into_event(row)
    }

    pub async fn update_status(&self, id: Uuid, status: EventStatus) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET status = $2 WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(self.pool)
        .await?;

        into_event(row)
    }

    pub async fn update_image(&self, id: Uuid, image_url: &str) -> Result<Event> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "UPDATE events SET image_url = $2 WHERE id = $1 RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(id)
        .bind(image_url)
        .fetch_optional(self.pool)
        .await?;

        into_event(row)
    }

    /// Delete an event; participants go with it through the foreign key cascade
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}

fn push_filter(query: &mut QueryBuilder<'_, sqlx::Postgres>, filter: &EventFilter) {
    if !filter.include_hidden {
        query.push(" AND status = ");
        query.push_bind(EventStatus::Published.as_str());
    }

    if let Some(ref name) = filter.name {
        query.push(" AND name ILIKE ");
        query.push_bind(format!("%{}%", escape_like(name)));
        query.push(" ESCAPE '\\'");
    }

    if let Some(date) = filter.date {
        query.push(" AND date = ");
        query.push_bind(date);
    }
}

pub async fn find_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Event> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {} FROM events WHERE id = $1",
        EVENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    into_event(row)
}

/// Row-locks the event for the rest of the transaction
pub async fn lock_by_id<'e>(executor: impl PgExecutor<'e>, id: Uuid) -> Result<Event> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {} FROM events WHERE id = $1 FOR UPDATE",
        EVENT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(executor)
    .await?;

    into_event(row)
}

/// Serialises uploads that resolve their event by name until the transaction ends
pub async fn lock_name<'e>(executor: impl PgExecutor<'e>, name: &str) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(name)
        .execute(executor)
        .await?;

    Ok(())
}

/// Oldest event carrying exactly this name, row-locked
pub async fn lock_by_name<'e>(executor: impl PgExecutor<'e>, name: &str) -> Result<Option<Event>> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        "SELECT {} FROM events WHERE name = $1 ORDER BY created_at, id LIMIT 1 FOR UPDATE",
        EVENT_COLUMNS
    ))
    .bind(name)
    .fetch_optional(executor)
    .await?;

    row.map(Event::try_from).transpose()
}

/// First of `base`, `base-1`, ... not used by another event
pub async fn free_slug<'e>(
    executor: impl PgExecutor<'e>,
    base: &str,
    except: Option<Uuid>,
) -> Result<String> {
    let taken: HashSet<String> = sqlx::query_scalar(
        r#"
        SELECT slug FROM events
        WHERE (slug = $1 OR slug LIKE $2 ESCAPE '\')
          AND ($3::uuid IS NULL OR id <> $3)
        "#,
    )
    .bind(base)
    .bind(format!("{}-%", escape_like(base)))
    .bind(except)
    .fetch_all(executor)
    .await?
    .into_iter()
    .collect();

    Ok(first_free_slug(base, &taken))
}

pub async fn insert<'e>(executor: impl PgExecutor<'e>, slug: &str, event: &NewEvent) -> Result<Event> {
    let row = sqlx::query_as::<_, EventRow>(&format!(
        r#"
        INSERT INTO events (
            id, slug, name, date, time, address, image_url, file_name, file_extension, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {}
        "#,
        EVENT_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(slug)
    .bind(&event.name)
    .bind(event.date)
    .bind(&event.time)
    .bind(&event.address)
    .bind(&event.image_url)
    .bind(&event.file_name)
    .bind(&event.file_extension)
    .bind(event.status.as_str())
    .fetch_one(executor)
    .await
    .map_err(|e| StorageError::from(e).slug_conflict())?;

    row.try_into()
}

/// Stores the digest and summary of the file the event was just loaded from
pub async fn record_upload<'e>(
    executor: impl PgExecutor<'e>,
    id: Uuid,
    file_hash: &str,
    records_count: i32,
    unique_modalities: &[String],
    unique_categories: &[String],
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE events
        SET file_hash = $2,
            records_count = $3,
            unique_modalities = $4,
            unique_categories = $5
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(file_hash.to_ascii_lowercase())
    .bind(records_count)
    .bind(unique_modalities)
    .bind(unique_categories)
    .execute(executor)
    .await?;

    Ok(())
}
