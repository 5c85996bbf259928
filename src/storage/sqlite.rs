//! SQLite backend
//!
//! Each change set runs in one transaction. Capacity reservations are
//! conditional updates (`... WHERE current_tickets < max_capacity`) whose
//! affected-row count decides success, so two concurrent reservations for a
//! technician's last slot cannot both commit.

use super::{ChangeSet, DeskStore, MetricsUpdate, SlotChange, TicketWrite};
use crate::core::{
    ActorId, Availability, AuditNote, CustomerId, PerformanceMetrics, Status,
    StatusHistoryEntry, TechnicianId, Technician, Ticket, TicketId,
};
use crate::error::{Result, ServiceDeskError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS tickets (
        id TEXT PRIMARY KEY,
        subject TEXT NOT NULL,
        customer_id TEXT NOT NULL,
        status TEXT NOT NULL,
        priority TEXT NOT NULL,
        assigned_to TEXT NULL REFERENCES technicians(id),
        created_at TEXT NOT NULL,
        reopened_at TEXT NULL,
        completed_at TEXT NULL,
        resolution_notes TEXT NULL,
        resolution_time_hours REAL NULL,
        time_spent_hours REAL NULL,
        customer_rating INTEGER NULL,
        version INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS technicians (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        can_handle_tickets INTEGER NOT NULL,
        availability TEXT NOT NULL,
        max_capacity INTEGER NOT NULL CHECK (max_capacity >= 1),
        current_tickets INTEGER NOT NULL DEFAULT 0,
        CHECK (current_tickets >= 0 AND current_tickets <= max_capacity)
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS performance_metrics (
        technician_id TEXT PRIMARY KEY REFERENCES technicians(id),
        tickets_resolved INTEGER NOT NULL,
        avg_resolution_hours REAL NOT NULL,
        ratings_count INTEGER NOT NULL,
        avg_rating REAL NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS status_history (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        ticket_id TEXT NOT NULL,
        prior_status TEXT NULL,
        new_status TEXT NOT NULL,
        actor_id TEXT NOT NULL,
        reason TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS audit_notes (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        ticket_id TEXT NOT NULL,
        author_id TEXT NOT NULL,
        body TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    ",
    "CREATE INDEX IF NOT EXISTS idx_tickets_assigned ON tickets(assigned_to, status)",
    "CREATE INDEX IF NOT EXISTS idx_history_ticket ON status_history(ticket_id)",
];

/// Store backed by a SQLite database through `sqlx`
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect (creating the database file if needed) and bootstrap the schema
    pub async fn connect(database_url: &str, acquire_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(acquire_timeout);
        let pool = SqlitePoolOptions::new()
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        info!("Connected to SQLite store at {}", database_url);
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn write_ticket(tx: &mut Transaction<'_, Sqlite>, write: &TicketWrite) -> Result<()> {
        match write {
            TicketWrite::Insert(ticket) => {
                sqlx::query(
                    r"
                    INSERT INTO tickets (
                        id, subject, customer_id, status, priority, assigned_to, created_at,
                        reopened_at, completed_at, resolution_notes, resolution_time_hours,
                        time_spent_hours, customer_rating, version
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                    ",
                )
                .bind(ticket.id.to_string())
                .bind(&ticket.subject)
                .bind(ticket.customer_id.to_string())
                .bind(ticket.status.as_str())
                .bind(ticket.priority.as_str())
                .bind(ticket.assigned_to.map(|id| id.to_string()))
                .bind(ticket.created_at)
                .bind(ticket.reopened_at)
                .bind(ticket.completed_at)
                .bind(&ticket.resolution_notes)
                .bind(ticket.resolution_time_hours)
                .bind(ticket.time_spent_hours)
                .bind(ticket.customer_rating)
                .bind(ticket.version)
                .execute(&mut **tx)
                .await?;
            },
            TicketWrite::Update {
                ticket,
                expected_version,
            } => {
                let result = sqlx::query(
                    r"
                    UPDATE tickets
                    SET subject = ?1, status = ?2, priority = ?3, assigned_to = ?4,
                        reopened_at = ?5, completed_at = ?6, resolution_notes = ?7,
                        resolution_time_hours = ?8, time_spent_hours = ?9,
                        customer_rating = ?10, version = ?11
                    WHERE id = ?12 AND version = ?13
                    ",
                )
                .bind(&ticket.subject)
                .bind(ticket.status.as_str())
                .bind(ticket.priority.as_str())
                .bind(ticket.assigned_to.map(|id| id.to_string()))
                .bind(ticket.reopened_at)
                .bind(ticket.completed_at)
                .bind(&ticket.resolution_notes)
                .bind(ticket.resolution_time_hours)
                .bind(ticket.time_spent_hours)
                .bind(ticket.customer_rating)
                .bind(ticket.version)
                .bind(ticket.id.to_string())
                .bind(expected_version)
                .execute(&mut **tx)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(Self::missing_or_conflict(tx, &ticket.id).await);
                }
            },
            TicketWrite::Delete {
                id,
                expected_version,
            } => {
                let result = sqlx::query("DELETE FROM tickets WHERE id = ?1 AND version = ?2")
                    .bind(id.to_string())
                    .bind(expected_version)
                    .execute(&mut **tx)
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(Self::missing_or_conflict(tx, id).await);
                }
            },
        }
        Ok(())
    }

    async fn missing_or_conflict(
        tx: &mut Transaction<'_, Sqlite>,
        id: &TicketId,
    ) -> ServiceDeskError {
        let exists = sqlx::query("SELECT 1 FROM tickets WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&mut **tx)
            .await;
        match exists {
            Ok(Some(_)) => ServiceDeskError::Conflict { id: id.to_string() },
            Ok(None) => ServiceDeskError::ticket_not_found(id),
            Err(e) => e.into(),
        }
    }

    async fn reserve_slot(tx: &mut Transaction<'_, Sqlite>, id: &TechnicianId) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE technicians
            SET current_tickets = current_tickets + 1,
                availability = CASE
                    WHEN current_tickets + 1 >= max_capacity AND availability = 'AVAILABLE'
                    THEN 'BUSY'
                    ELSE availability
                END
            WHERE id = ?1
              AND can_handle_tickets = 1
              AND availability <> 'OFFLINE'
              AND current_tickets < max_capacity
            ",
        )
        .bind(id.to_string())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        // The conditional update matched nothing; report why.
        let technician = Self::fetch_technician(&mut **tx, id)
            .await?
            .ok_or_else(|| ServiceDeskError::technician_not_found(id))?;
        if let Some(reason) = technician.unavailability_reason() {
            return Err(ServiceDeskError::TechnicianUnavailable {
                id: id.to_string(),
                reason: reason.to_string(),
            });
        }
        Err(ServiceDeskError::CapacityExceeded {
            id: id.to_string(),
            current: technician.current_tickets,
            max: technician.max_capacity,
        })
    }

    async fn release_slot(tx: &mut Transaction<'_, Sqlite>, id: &TechnicianId) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE technicians
            SET current_tickets = current_tickets - 1,
                availability = CASE
                    WHEN availability = 'BUSY' THEN 'AVAILABLE'
                    ELSE availability
                END
            WHERE id = ?1 AND current_tickets > 0
            ",
        )
        .bind(id.to_string())
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return match Self::fetch_technician(&mut **tx, id).await? {
                None => Err(ServiceDeskError::technician_not_found(id)),
                Some(_) => Err(ServiceDeskError::InvariantViolation(format!(
                    "release on technician {id} with no active tickets"
                ))),
            };
        }
        Ok(())
    }

    async fn update_metrics(
        tx: &mut Transaction<'_, Sqlite>,
        update: &MetricsUpdate,
    ) -> Result<()> {
        let technician = match update {
            MetricsUpdate::Resolution { technician, .. } | MetricsUpdate::Rating { technician, .. } => {
                *technician
            },
        };

        let row = sqlx::query("SELECT * FROM performance_metrics WHERE technician_id = ?1")
            .bind(technician.to_string())
            .fetch_optional(&mut **tx)
            .await?;
        let mut metrics = match row {
            Some(row) => metrics_from_row(&row)?,
            None => PerformanceMetrics::default(),
        };

        match *update {
            MetricsUpdate::Resolution { hours, .. } => metrics.record_resolution(hours),
            MetricsUpdate::Rating { rating, .. } => metrics.record_rating(rating),
        }

        sqlx::query(
            r"
            INSERT INTO performance_metrics (
                technician_id, tickets_resolved, avg_resolution_hours, ratings_count, avg_rating
            )
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(technician_id) DO UPDATE SET
                tickets_resolved = excluded.tickets_resolved,
                avg_resolution_hours = excluded.avg_resolution_hours,
                ratings_count = excluded.ratings_count,
                avg_rating = excluded.avg_rating
            ",
        )
        .bind(technician.to_string())
        .bind(metrics.tickets_resolved)
        .bind(metrics.avg_resolution_hours)
        .bind(metrics.ratings_count)
        .bind(metrics.avg_rating)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn fetch_technician<'e, E>(executor: E, id: &TechnicianId) -> Result<Option<Technician>>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let row = sqlx::query("SELECT * FROM technicians WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(executor)
            .await?;
        row.as_ref().map(technician_from_row).transpose()
    }
}

#[async_trait]
impl DeskStore for SqliteStore {
    async fn ticket(&self, id: &TicketId) -> Result<Ticket> {
        let row = sqlx::query("SELECT * FROM tickets WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(ticket_from_row)
            .transpose()?
            .ok_or_else(|| ServiceDeskError::ticket_not_found(id))
    }

    async fn tickets(&self) -> Result<Vec<Ticket>> {
        let rows = sqlx::query("SELECT * FROM tickets ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(ticket_from_row).collect()
    }

    async fn technician(&self, id: &TechnicianId) -> Result<Technician> {
        Self::fetch_technician(&self.pool, id)
            .await?
            .ok_or_else(|| ServiceDeskError::technician_not_found(id))
    }

    async fn technicians(&self) -> Result<Vec<Technician>> {
        let rows = sqlx::query("SELECT * FROM technicians ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(technician_from_row).collect()
    }

    async fn metrics(&self, id: &TechnicianId) -> Result<PerformanceMetrics> {
        let row = sqlx::query("SELECT * FROM performance_metrics WHERE technician_id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(metrics_from_row)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    async fn status_history(&self, id: &TicketId) -> Result<Vec<StatusHistoryEntry>> {
        let rows = sqlx::query("SELECT * FROM status_history WHERE ticket_id = ?1 ORDER BY seq")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(history_from_row).collect()
    }

    async fn audit_notes(&self, id: &TicketId) -> Result<Vec<AuditNote>> {
        let rows = sqlx::query("SELECT * FROM audit_notes WHERE ticket_id = ?1 ORDER BY seq")
            .bind(id.to_string())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(note_from_row).collect()
    }

    async fn register_technician(&self, technician: &Technician) -> Result<()> {
        if technician.max_capacity == 0 {
            return Err(ServiceDeskError::validation(
                "Technician capacity must be at least 1",
            ));
        }

        let result = sqlx::query(
            r"
            INSERT INTO technicians (id, name, can_handle_tickets, availability, max_capacity, current_tickets)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(technician.id.to_string())
        .bind(&technician.name)
        .bind(technician.can_handle_tickets)
        .bind(technician.availability.as_str())
        .bind(technician.max_capacity)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceDeskError::validation(format!(
                "Technician {} already exists",
                technician.id
            )));
        }
        Ok(())
    }

    async fn set_availability(
        &self,
        id: &TechnicianId,
        availability: Availability,
    ) -> Result<()> {
        let result = sqlx::query("UPDATE technicians SET availability = ?1 WHERE id = ?2")
            .bind(availability.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ServiceDeskError::technician_not_found(id));
        }
        Ok(())
    }

    async fn apply(&self, change: ChangeSet) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // Any early return drops `tx`, which rolls the transaction back.
        Self::write_ticket(&mut tx, change.ticket()).await?;

        for slot in change.slots() {
            match slot {
                SlotChange::Reserve(id) => Self::reserve_slot(&mut tx, id).await?,
                SlotChange::Release(id) => Self::release_slot(&mut tx, id).await?,
            }
        }

        for update in change.metrics() {
            Self::update_metrics(&mut tx, update).await?;
        }

        for entry in change.history() {
            sqlx::query(
                r"
                INSERT INTO status_history (id, ticket_id, prior_status, new_status, actor_id, reason, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ",
            )
            .bind(entry.id.to_string())
            .bind(entry.ticket_id.to_string())
            .bind(entry.prior_status.map(Status::as_str))
            .bind(entry.new_status.as_str())
            .bind(entry.actor_id.to_string())
            .bind(&entry.reason)
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await?;
        }

        for note in change.notes() {
            sqlx::query(
                r"
                INSERT INTO audit_notes (id, ticket_id, author_id, body, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(note.id.to_string())
            .bind(note.ticket_id.to_string())
            .bind(note.author_id.to_string())
            .bind(&note.body)
            .bind(note.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Committed change set for ticket {}", change.ticket().ticket_id());
        Ok(())
    }
}

fn parse_uuid(row: &SqliteRow, column: &str) -> Result<Uuid> {
    let raw: String = row.try_get(column)?;
    Uuid::parse_str(&raw).map_err(|e| {
        ServiceDeskError::InvariantViolation(format!("column {column} holds invalid uuid: {e}"))
    })
}

fn parse_enum<T: FromStr<Err = String>>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(ServiceDeskError::InvariantViolation)
}

fn ticket_from_row(row: &SqliteRow) -> Result<Ticket> {
    let assigned_to: Option<String> = row.try_get("assigned_to")?;
    let assigned_to = assigned_to
        .map(|raw| TechnicianId::parse_str(&raw))
        .transpose()
        .map_err(|e| ServiceDeskError::InvariantViolation(format!("invalid assignee: {e}")))?;

    Ok(Ticket {
        id: TicketId::from_uuid(parse_uuid(row, "id")?),
        subject: row.try_get("subject")?,
        customer_id: CustomerId::from_uuid(parse_uuid(row, "customer_id")?),
        status: parse_enum(row, "status")?,
        priority: parse_enum(row, "priority")?,
        assigned_to,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        reopened_at: row.try_get("reopened_at")?,
        completed_at: row.try_get("completed_at")?,
        resolution_notes: row.try_get("resolution_notes")?,
        resolution_time_hours: row.try_get("resolution_time_hours")?,
        time_spent_hours: row.try_get("time_spent_hours")?,
        customer_rating: row.try_get("customer_rating")?,
        version: row.try_get("version")?,
    })
}

fn technician_from_row(row: &SqliteRow) -> Result<Technician> {
    Ok(Technician {
        id: TechnicianId::from_uuid(parse_uuid(row, "id")?),
        name: row.try_get("name")?,
        can_handle_tickets: row.try_get("can_handle_tickets")?,
        availability: parse_enum(row, "availability")?,
        max_capacity: row.try_get("max_capacity")?,
        current_tickets: row.try_get("current_tickets")?,
    })
}

fn metrics_from_row(row: &SqliteRow) -> Result<PerformanceMetrics> {
    Ok(PerformanceMetrics {
        tickets_resolved: row.try_get("tickets_resolved")?,
        avg_resolution_hours: row.try_get("avg_resolution_hours")?,
        ratings_count: row.try_get("ratings_count")?,
        avg_rating: row.try_get("avg_rating")?,
    })
}

fn history_from_row(row: &SqliteRow) -> Result<StatusHistoryEntry> {
    let prior_status: Option<String> = row.try_get("prior_status")?;
    let prior_status = prior_status
        .map(|raw| raw.parse::<Status>())
        .transpose()
        .map_err(ServiceDeskError::InvariantViolation)?;

    Ok(StatusHistoryEntry {
        id: parse_uuid(row, "id")?,
        ticket_id: TicketId::from_uuid(parse_uuid(row, "ticket_id")?),
        prior_status,
        new_status: parse_enum(row, "new_status")?,
        actor_id: ActorId::from_uuid(parse_uuid(row, "actor_id")?),
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
    })
}

fn note_from_row(row: &SqliteRow) -> Result<AuditNote> {
    Ok(AuditNote {
        id: parse_uuid(row, "id")?,
        ticket_id: TicketId::from_uuid(parse_uuid(row, "ticket_id")?),
        author_id: ActorId::from_uuid(parse_uuid(row, "author_id")?),
        body: row.try_get("body")?,
        created_at: row.try_get("created_at")?,
    })
}
