//! Tickets in PostgreSQL with a PostGIS geography column.
//!
//! Distances use the PostGIS sphere (`use_spheroid = false`) so they agree
//! with [`nagriksetu_common::haversine_m`]. Radius lookups hit the GiST index
//! on `location` through `ST_DWithin`.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use nagriksetu_common::{
    Category, DatabaseConfig, GeoPoint, NewTicket, Page, Ticket, TicketResult, TicketStatus,
    RADIUS_TOLERANCE_M,
};

use crate::cells::WriteLocks;
use crate::error::{Result, StoreError};
use crate::store::TicketStore;

const TICKET_COLUMNS: &str = "id, category, description, status, report_count, \
     ST_Y(location::geometry) AS lat, ST_X(location::geometry) AS lng, \
     created_at, last_reported_at";

#[derive(Clone)]
pub struct PgTicketStore {
    pool: PgPool,
}

impl PgTicketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool. `acquire_timeout` bounds how long a caller waits for a
    /// connection before the call fails.
    pub async fn connect(
        db: &DatabaseConfig,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let options = connect_options(db)?;
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await?;
        info!(max_connections, "Connected to database");
        Ok(Self { pool })
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub fn connect_options(db: &DatabaseConfig) -> Result<PgConnectOptions> {
    Ok(match db {
        DatabaseConfig::Url(url) => PgConnectOptions::from_str(url)?,
        DatabaseConfig::Parts {
            host,
            port,
            user,
            password,
            name,
        } => PgConnectOptions::new()
            .host(host)
            .port(*port)
            .username(user)
            .password(password)
            .database(name),
    })
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct TicketRow {
    id: Uuid,
    category: String,
    description: String,
    status: String,
    report_count: i32,
    lat: f64,
    lng: f64,
    created_at: DateTime<Utc>,
    last_reported_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for Ticket {
    type Error = StoreError;

    fn try_from(row: TicketRow) -> Result<Self> {
        let corrupt = |reason: String| StoreError::Corrupt { id: row.id, reason };
        let category = Category::from_str(&row.category).map_err(|e| corrupt(e.to_string()))?;
        let status = TicketStatus::from_str(&row.status).map_err(|e| corrupt(e.to_string()))?;
        let report_count = u32::try_from(row.report_count)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| corrupt(format!("report_count {}", row.report_count)))?;
        let location = GeoPoint::new(row.lat, row.lng).map_err(|e| corrupt(e.to_string()))?;

        Ok(Ticket {
            id: row.id,
            category,
            description: row.description,
            location,
            status,
            report_count,
            created_at: row.created_at,
            last_reported_at: row.last_reported_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Queries, generic over pool or transaction
// ---------------------------------------------------------------------------

async fn find_nearest<'e, E: PgExecutor<'e>>(
    exec: E,
    category: Category,
    point: GeoPoint,
    radius_m: f64,
) -> Result<Option<Ticket>> {
    let sql = format!(
        r#"
        SELECT {TICKET_COLUMNS}
        FROM civic_tickets
        WHERE category = $1
          AND status = 'open'
          AND ST_DWithin(location, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography, $4, false)
        ORDER BY ST_Distance(location, ST_SetSRID(ST_MakePoint($2, $3), 4326)::geography, false),
                 created_at, id
        LIMIT 1
        "#
    );
    let row = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(category.as_str())
        .bind(point.lng)
        .bind(point.lat)
        .bind(radius_m + RADIUS_TOLERANCE_M)
        .fetch_optional(exec)
        .await?;
    row.map(Ticket::try_from).transpose()
}

async fn insert_row<'e, E: PgExecutor<'e>>(exec: E, ticket: &NewTicket) -> Result<Ticket> {
    let sql = format!(
        r#"
        INSERT INTO civic_tickets (id, category, description, location, status, report_count)
        VALUES ($1, $2, $3, ST_SetSRID(ST_MakePoint($4, $5), 4326)::geography, 'open', 1)
        RETURNING {TICKET_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(ticket.category.as_str())
        .bind(&ticket.description)
        .bind(ticket.location.lng)
        .bind(ticket.location.lat)
        .fetch_one(exec)
        .await?;
    Ticket::try_from(row)
}

async fn increment_row<'e, E: PgExecutor<'e>>(exec: E, id: Uuid) -> Result<Ticket> {
    let sql = format!(
        r#"
        UPDATE civic_tickets
        SET report_count = report_count + 1, last_reported_at = now()
        WHERE id = $1
        RETURNING {TICKET_COLUMNS}
        "#
    );
    let row = sqlx::query_as::<_, TicketRow>(&sql)
        .bind(id)
        .fetch_optional(exec)
        .await?
        .ok_or(StoreError::NotFound(id))?;
    Ticket::try_from(row)
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

/// Transaction-scoped advisory lock on a text key, released at commit or
/// rollback.
async fn advisory_lock<'e, E: PgExecutor<'e>>(exec: E, key: &str, mode: LockMode) -> Result<()> {
    let sql = match mode {
        LockMode::Shared => "SELECT pg_advisory_xact_lock_shared(hashtextextended($1, 0))",
        LockMode::Exclusive => "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
    };
    sqlx::query(sql).bind(key).execute(exec).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// TicketStore
// ---------------------------------------------------------------------------

#[async_trait]
impl TicketStore for PgTicketStore {
    async fn find_within_radius(
        &self,
        category: Category,
        point: GeoPoint,
        radius_m: f64,
    ) -> Result<Option<Ticket>> {
        find_nearest(&self.pool, category, point, radius_m).await
    }

    async fn insert(&self, ticket: NewTicket) -> Result<Ticket> {
        insert_row(&self.pool, &ticket).await
    }

    async fn increment_report_count(&self, id: Uuid) -> Result<Ticket> {
        increment_row(&self.pool, id).await
    }

    async fn list(&self, page: Page) -> Result<Vec<Ticket>> {
        let sql = format!(
            r#"
            SELECT {TICKET_COLUMNS}
            FROM civic_tickets
            ORDER BY created_at, id
            LIMIT $1 OFFSET $2
            "#
        );
        let rows = sqlx::query_as::<_, TicketRow>(&sql)
            .bind(page.limit.map(i64::from))
            .bind(i64::from(page.offset))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Ticket::try_from).collect()
    }

    /// Runs in one transaction holding advisory locks on the cells around the
    /// point. The category key is always taken first and cell keys in sorted
    /// order, so concurrent writers cannot deadlock. A dropped future rolls
    /// the transaction back.
    async fn record_report(&self, report: NewTicket, radius_m: f64) -> Result<TicketResult> {
        let mut tx = self.pool.begin().await?;

        match WriteLocks::for_report(report.category, report.location, radius_m) {
            WriteLocks::Cells { category, cells } => {
                advisory_lock(&mut *tx, &category, LockMode::Shared).await?;
                for cell in &cells {
                    advisory_lock(&mut *tx, cell, LockMode::Exclusive).await?;
                }
            }
            WriteLocks::Category(category) => {
                advisory_lock(&mut *tx, &category, LockMode::Exclusive).await?;
            }
        }

        let result = match find_nearest(&mut *tx, report.category, report.location, radius_m).await?
        {
            Some(existing) => {
                debug!(ticket_id = %existing.id, "Report falls within an existing ticket");
                TicketResult::duplicate(increment_row(&mut *tx, existing.id).await?)
            }
            None => TicketResult::created(insert_row(&mut *tx, &report).await?),
        };

        tx.commit().await?;
        Ok(result)
    }
}
