use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::dto::common::Page;
use crate::error::Result;
use crate::ingest::ParsedRow;
use crate::models::{Participant, ParticipantData};
use crate::query::{Criterion, ParticipantFields};
use crate::repository::snapshot;

/// Rows per INSERT statement; 14 binds each keeps a statement well under the
/// Postgres limit of 65535 parameters.
const INSERT_CHUNK: usize = 1000;

const LISTING_ORDER: &str =
    " ORDER BY distance ASC NULLS LAST, position ASC NULLS LAST, row_index ASC";

#[derive(FromRow)]
struct ParticipantRow {
    id: Uuid,
    event_id: Uuid,
    row_index: i32,
    race: Option<String>,
    data: Json<Vec<(String, String)>>,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Participant {
            id: row.id,
            event_id: row.event_id,
            row_index: row.row_index,
            race: row.race,
            data: ParticipantData::new(row.data.0),
        }
    }
}

pub struct ParticipantRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ParticipantRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of an event's participants matching every criterion, and the match count
    pub async fn list(
        &self,
        event_id: Uuid,
        criteria: &[Criterion],
        page: Page,
    ) -> Result<(Vec<Participant>, i64)> {
        let mut tx = snapshot(self.pool).await?;

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM participants WHERE event_id = ");
        count.push_bind(event_id);
        for criterion in criteria {
            criterion.push_sql(&mut count);
        }
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&mut *tx)
            .await?;

        let mut query = QueryBuilder::new(
            "SELECT id, event_id, row_index, race, data FROM participants WHERE event_id = ",
        );
        query.push_bind(event_id);
        for criterion in criteria {
            criterion.push_sql(&mut query);
        }
        query.push(LISTING_ORDER);
        query.push(" LIMIT ");
        query.push_bind(page.limit());
        query.push(" OFFSET ");
        query.push_bind(page.offset());

        let rows: Vec<ParticipantRow> = query.build_query_as().fetch_all(&mut *tx).await?;
        tx.commit().await?;

        Ok((rows.into_iter().map(Participant::from).collect(), total))
    }

    /// Ranking of one distance, optionally narrowed to a category
    pub async fn comparison_pool(
        &self,
        event_id: Uuid,
        distance: &str,
        category: Option<&str>,
    ) -> Result<Vec<Participant>> {
        let rows = sqlx::query_as::<_, ParticipantRow>(
            r#"
            SELECT id, event_id, row_index, race, data
            FROM participants
            WHERE event_id = $1
              AND lower(distance) = lower($2)
              AND ($3::text IS NULL OR lower(category) = lower($3))
            ORDER BY position ASC NULLS LAST, row_index ASC
            "#,
        )
        .bind(event_id)
        .bind(distance.trim())
        .bind(category.map(str::trim))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Participant::from).collect())
    }
}

pub async fn delete_for_event<'e>(executor: impl PgExecutor<'e>, event_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM participants WHERE event_id = $1")
        .bind(event_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Bulk inserts parsed rows, numbering them in file order
pub async fn insert_rows(conn: &mut PgConnection, event_id: Uuid, rows: &[ParsedRow]) -> Result<u64> {
    let mut inserted = 0;

    for (chunk_index, chunk) in rows.chunks(INSERT_CHUNK).enumerate() {
        let mut query = QueryBuilder::<Postgres>::new(
            "INSERT INTO participants (id, event_id, row_index, race, data, name, bib, chip, \
             category, distance, sex, city, team, position) ",
        );

        query.push_values(chunk.iter().enumerate(), |mut b, (offset, row)| {
            let fields = ParticipantFields::extract(&row.data);
            b.push_bind(Uuid::new_v4())
                .push_bind(event_id)
                .push_bind((chunk_index * INSERT_CHUNK + offset) as i32)
                .push_bind(row.race.clone())
                .push_bind(Json(row.data.columns().to_vec()))
                .push_bind(fields.name)
                .push_bind(fields.bib)
                .push_bind(fields.chip)
                .push_bind(fields.category)
                .push_bind(fields.distance)
                .push_bind(fields.sex)
                .push_bind(fields.city)
                .push_bind(fields.team)
                .push_bind(fields.position);
        });

        inserted += query.build().execute(&mut *conn).await?.rows_affected();
    }

    Ok(inserted)
}
