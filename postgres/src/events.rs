//! PostgreSQL event repository.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use eventpass_core::error::Result;
use eventpass_core::repository::{
    AttendanceOutcome, EventFilter, EventRepository, RegistrationOutcome, TierWrite,
    UpdateOutcome,
};
use eventpass_core::types::{
    Event, EventDate, EventDetails, EventId, Money, RegistrationRecord, TicketTier, UserId,
    Visibility,
};
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row};
use uuid::Uuid;

use crate::{corrupt, storage_error};

/// PostgreSQL-backed [`EventRepository`].
///
/// Events, tiers and registrations live in three tables. Membership sets on
/// [`Event`] are assembled from `event_registrations` on every read.
#[derive(Clone, Debug)]
pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    /// Create a repository over `pool`.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a migration fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| corrupt("run migrations", e))?;

        tracing::info!("EventPass migrations applied");
        Ok(())
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn column<'r, T>(row: &'r PgRow, name: &str, context: &'static str) -> Result<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name).map_err(|e| storage_error(context, &e))
}

fn event_from_row(row: &PgRow) -> Result<Event> {
    const CONTEXT: &str = "decode event";

    let visibility: String = column(row, "visibility", CONTEXT)?;
    let visibility: Visibility = visibility
        .parse()
        .map_err(|e| corrupt("event visibility", e))?;
    let version: i64 = column(row, "version", CONTEXT)?;

    let mut event = Event::publish(
        EventId::from_uuid(column(row, "id", CONTEXT)?),
        UserId::from_uuid(column(row, "organizer_id", CONTEXT)?),
        EventDetails {
            title: column(row, "title", CONTEXT)?,
            description: column(row, "description", CONTEXT)?,
            date: EventDate::new(column(row, "starts_at", CONTEXT)?),
            location: column(row, "location", CONTEXT)?,
            visibility,
            tiers: Vec::new(),
        },
        column(row, "created_at", CONTEXT)?,
    );
    event.version = u64::try_from(version).map_err(|e| corrupt("event version", e))?;
    event.updated_at = column(row, "updated_at", CONTEXT)?;
    Ok(event)
}

fn registration_from_row(row: &PgRow) -> Result<RegistrationRecord> {
    const CONTEXT: &str = "decode registration";

    Ok(RegistrationRecord {
        event_id: EventId::from_uuid(column(row, "event_id", CONTEXT)?),
        user_id: UserId::from_uuid(column(row, "user_id", CONTEXT)?),
        tier: column(row, "tier", CONTEXT)?,
        registered_at: column(row, "registered_at", CONTEXT)?,
        attended_at: column(row, "attended_at", CONTEXT)?,
    })
}

/// Fill in tiers and membership sets for `events` with two batched queries.
async fn hydrate(conn: &mut PgConnection, events: &mut [Event]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }

    let ids: Vec<Uuid> = events.iter().map(|event| *event.id.as_uuid()).collect();
    let index: HashMap<Uuid, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let tiers = sqlx::query(
        "SELECT event_id, name, price_cents, remaining FROM event_tiers
         WHERE event_id = ANY($1)
         ORDER BY event_id, position",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| storage_error("load tiers", &e))?;

    for row in &tiers {
        let event_id: Uuid = column(row, "event_id", "load tiers")?;
        let price: i64 = column(row, "price_cents", "load tiers")?;
        let remaining: i64 = column(row, "remaining", "load tiers")?;
        let tier = TicketTier {
            name: column(row, "name", "load tiers")?,
            price: Money::from_cents(u64::try_from(price).map_err(|e| corrupt("tier price", e))?),
            remaining: u32::try_from(remaining).map_err(|e| corrupt("tier remaining", e))?,
        };
        if let Some(&i) = index.get(&event_id) {
            events[i].details.tiers.push(tier);
        }
    }

    let registrations = sqlx::query(
        "SELECT event_id, user_id, attended_at FROM event_registrations
         WHERE event_id = ANY($1)",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| storage_error("load registrations", &e))?;

    for row in &registrations {
        let event_id: Uuid = column(row, "event_id", "load registrations")?;
        let user_id = UserId::from_uuid(column(row, "user_id", "load registrations")?);
        let attended_at: Option<DateTime<Utc>> =
            column(row, "attended_at", "load registrations")?;
        if let Some(&i) = index.get(&event_id) {
            events[i].registered.insert(user_id);
            if attended_at.is_some() {
                events[i].attended.insert(user_id);
            }
        }
    }

    Ok(())
}

async fn fetch_event(conn: &mut PgConnection, id: EventId) -> Result<Option<Event>> {
    let row = sqlx::query(
        "SELECT id, organizer_id, title, description, starts_at, location, visibility,
                version, created_at, updated_at
         FROM events WHERE id = $1",
    )
    .bind(*id.as_uuid())
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| storage_error("load event", &e))?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut events = [event_from_row(&row)?];
    hydrate(conn, &mut events).await?;
    let [event] = events;
    Ok(Some(event))
}

async fn insert_tiers(conn: &mut PgConnection, id: EventId, tiers: &[TicketTier]) -> Result<()> {
    for (position, tier) in tiers.iter().enumerate() {
        let position = i32::try_from(position).map_err(|e| corrupt("tier position", e))?;
        let price = i64::try_from(tier.price.cents()).map_err(|e| corrupt("tier price", e))?;

        sqlx::query(
            "INSERT INTO event_tiers (event_id, position, name, price_cents, remaining)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(*id.as_uuid())
        .bind(position)
        .bind(&tier.name)
        .bind(price)
        .bind(i64::from(tier.remaining))
        .execute(&mut *conn)
        .await
        .map_err(|e| storage_error("insert tier", &e))?;
    }
    Ok(())
}

async fn event_exists(conn: &mut PgConnection, id: EventId) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM events WHERE id = $1")
        .bind(*id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| storage_error("check event", &e))?;
    Ok(row.is_some())
}

// ============================================================================
// Repository
// ============================================================================

impl EventRepository for PostgresEventRepository {
    async fn insert(&self, event: &Event) -> Result<()> {
        let version = i64::try_from(event.version).map_err(|e| corrupt("event version", e))?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", &e))?;

        sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, starts_at, location,
                                 visibility, version, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(*event.id.as_uuid())
        .bind(*event.organizer.as_uuid())
        .bind(&event.details.title)
        .bind(&event.details.description)
        .bind(*event.details.date.as_datetime())
        .bind(&event.details.location)
        .bind(event.details.visibility.as_str())
        .bind(version)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("insert event", &e))?;

        insert_tiers(&mut tx, event.id, &event.details.tiers).await?;

        tx.commit()
            .await
            .map_err(|e| storage_error("commit transaction", &e))?;

        tracing::debug!(event_id = %event.id, "Event stored");
        Ok(())
    }

    async fn get(&self, id: EventId) -> Result<Option<Event>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| storage_error("acquire connection", &e))?;
        fetch_event(&mut conn, id).await
    }

    async fn list(&self, filter: &EventFilter) -> Result<Vec<Event>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| storage_error("acquire connection", &e))?;

        let rows = sqlx::query(
            "SELECT id, organizer_id, title, description, starts_at, location, visibility,
                    version, created_at, updated_at
             FROM events
             WHERE ($1::timestamptz IS NULL OR starts_at >= $1)
               AND ($2::text IS NULL OR strpos(lower(location), lower($2)) > 0)
               AND ($3::text IS NULL OR visibility = $3)
               AND ($4::text IS NULL
                    OR strpos(lower(title), lower($4)) > 0
                    OR strpos(lower(description), lower($4)) > 0)
             ORDER BY created_at, id",
        )
        .bind(filter.date_from)
        .bind(filter.location.as_deref())
        .bind(filter.visibility.map(|v| v.as_str()))
        .bind(filter.search.as_deref())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| storage_error("list events", &e))?;

        let mut events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>>>()?;
        hydrate(&mut conn, &mut events).await?;
        Ok(events)
    }

    async fn update_details(
        &self,
        id: EventId,
        expected_version: u64,
        details: &EventDetails,
        tiers: TierWrite,
        updated_at: DateTime<Utc>,
    ) -> Result<UpdateOutcome> {
        let expected =
            i64::try_from(expected_version).map_err(|e| corrupt("event version", e))?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", &e))?;

        let updated = sqlx::query(
            "UPDATE events
             SET title = $3, description = $4, starts_at = $5, location = $6,
                 visibility = $7, version = version + 1, updated_at = $8
             WHERE id = $1 AND version = $2",
        )
        .bind(*id.as_uuid())
        .bind(expected)
        .bind(&details.title)
        .bind(&details.description)
        .bind(*details.date.as_datetime())
        .bind(&details.location)
        .bind(details.visibility.as_str())
        .bind(updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("update event", &e))?
        .rows_affected();

        if updated == 0 {
            let outcome = if event_exists(&mut tx, id).await? {
                UpdateOutcome::VersionMismatch
            } else {
                UpdateOutcome::NotFound
            };
            return Ok(outcome);
        }

        if tiers == TierWrite::Replace {
            sqlx::query("DELETE FROM event_tiers WHERE event_id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| storage_error("replace tiers", &e))?;
            insert_tiers(&mut tx, id, &details.tiers).await?;
        }

        let stored = fetch_event(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| storage_error("commit transaction", &e))?;

        Ok(stored.map_or(UpdateOutcome::NotFound, UpdateOutcome::Updated))
    }

    async fn delete(&self, id: EventId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("delete event", &e))?
            .rows_affected();
        Ok(deleted > 0)
    }

    async fn add_registration(&self, record: &RegistrationRecord) -> Result<RegistrationOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("begin transaction", &e))?;

        // Holds the event row against a concurrent delete until commit.
        let exists = sqlx::query("SELECT 1 FROM events WHERE id = $1 FOR KEY SHARE")
            .bind(*record.event_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| storage_error("lock event", &e))?
            .is_some();
        if !exists {
            return Ok(RegistrationOutcome::EventNotFound);
        }

        let inserted = sqlx::query(
            "INSERT INTO event_registrations (event_id, user_id, tier, registered_at, attended_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (event_id, user_id) DO NOTHING",
        )
        .bind(*record.event_id.as_uuid())
        .bind(*record.user_id.as_uuid())
        .bind(record.tier.as_deref())
        .bind(record.registered_at)
        .bind(record.attended_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("insert registration", &e))?
        .rows_affected();
        if inserted == 0 {
            return Ok(RegistrationOutcome::AlreadyRegistered);
        }

        if let Some(tier) = record.tier.as_deref() {
            let decremented = sqlx::query(
                "UPDATE event_tiers SET remaining = remaining - 1
                 WHERE event_id = $1 AND name = $2 AND remaining > 0",
            )
            .bind(*record.event_id.as_uuid())
            .bind(tier)
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("decrement tier", &e))?
            .rows_affected();

            if decremented == 0 {
                let tier_exists =
                    sqlx::query("SELECT 1 FROM event_tiers WHERE event_id = $1 AND name = $2")
                        .bind(*record.event_id.as_uuid())
                        .bind(tier)
                        .fetch_optional(&mut *tx)
                        .await
                        .map_err(|e| storage_error("check tier", &e))?
                        .is_some();
                tx.rollback()
                    .await
                    .map_err(|e| storage_error("rollback transaction", &e))?;

                return Ok(if tier_exists {
                    RegistrationOutcome::SoldOut
                } else {
                    RegistrationOutcome::UnknownTier
                });
            }
        }

        tx.commit()
            .await
            .map_err(|e| storage_error("commit transaction", &e))?;
        Ok(RegistrationOutcome::Registered)
    }

    async fn mark_attended(
        &self,
        event_id: EventId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<AttendanceOutcome> {
        let marked = sqlx::query(
            "UPDATE event_registrations SET attended_at = $3
             WHERE event_id = $1 AND user_id = $2 AND attended_at IS NULL
             RETURNING attended_at",
        )
        .bind(*event_id.as_uuid())
        .bind(*user_id.as_uuid())
        .bind(at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("mark attendance", &e))?;

        if let Some(row) = marked {
            return Ok(AttendanceOutcome::Marked(column(
                &row,
                "attended_at",
                "mark attendance",
            )?));
        }

        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| storage_error("acquire connection", &e))?;
        let registered = sqlx::query(
            "SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(*event_id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| storage_error("check registration", &e))?
        .is_some();

        if registered {
            Ok(AttendanceOutcome::AlreadyCheckedIn)
        } else if event_exists(&mut conn, event_id).await? {
            Ok(AttendanceOutcome::NotRegistered)
        } else {
            Ok(AttendanceOutcome::EventNotFound)
        }
    }

    async fn registration(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Option<RegistrationRecord>> {
        let row = sqlx::query(
            "SELECT event_id, user_id, tier, registered_at, attended_at
             FROM event_registrations WHERE event_id = $1 AND user_id = $2",
        )
        .bind(*event_id.as_uuid())
        .bind(*user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("load registration", &e))?;

        row.as_ref().map(registration_from_row).transpose()
    }

    async fn registrations(&self, event_id: EventId) -> Result<Vec<RegistrationRecord>> {
        let rows = sqlx::query(
            "SELECT event_id, user_id, tier, registered_at, attended_at
             FROM event_registrations WHERE event_id = $1
             ORDER BY registered_at, user_id",
        )
        .bind(*event_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("load registrations", &e))?;

        rows.iter().map(registration_from_row).collect()
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("ping", &e))?;
        Ok(())
    }
}
