//! # PostgreSQL Adapters
//!
//! Two connection paths:
//!
//! - [`PgNotificationSource`] opens a dedicated direct connection per
//!   subscription session. LISTEN state lives on the server session, so this
//!   path must not go through a transaction-pooling proxy.
//! - [`PgReferenceStore`] runs the point lookups and the health counts over a
//!   small pool, typically pointed at the pooling proxy.

use crate::domain::{affiliation_at, CharacterRecord, Membership, RelayError};
use crate::ports::{NotificationSession, NotificationSource, ReferenceLookup, StoreCounts, StoreStats};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgListener, PgPool, PgPoolOptions};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection parameters for one PostgreSQL endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct PgEndpoint {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl PgEndpoint {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }
}

impl fmt::Debug for PgEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PgEndpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Notification source
// =============================================================================

/// Opens LISTEN sessions over a dedicated direct connection.
pub struct PgNotificationSource {
    endpoint: PgEndpoint,
}

impl PgNotificationSource {
    pub fn new(endpoint: PgEndpoint) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl NotificationSource for PgNotificationSource {
    type Session = PgNotificationSession;

    async fn connect(&self) -> Result<PgNotificationSession, RelayError> {
        // A fresh single-connection pool per session, so a torn-down session
        // never hands its broken connection to the next one.
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_with(self.endpoint.connect_options())
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;

        let listener = PgListener::connect_with(&pool)
            .await
            .map_err(|e| RelayError::Connect(e.to_string()))?;

        info!(
            host = %self.endpoint.host,
            port = self.endpoint.port,
            database = %self.endpoint.database,
            "Opened notification connection"
        );
        Ok(PgNotificationSession { listener })
    }
}

/// One LISTEN session.
pub struct PgNotificationSession {
    listener: PgListener,
}

#[async_trait]
impl NotificationSession for PgNotificationSession {
    async fn subscribe(&mut self, channel: &str) -> Result<(), RelayError> {
        self.listener
            .listen(channel)
            .await
            .map_err(|e| RelayError::Subscribe {
                channel: channel.to_string(),
                reason: e.to_string(),
            })
    }

    async fn next_notification(&mut self, wait: Duration) -> Result<Option<String>, RelayError> {
        match tokio::time::timeout(wait, self.listener.try_recv()).await {
            Err(_) => Ok(None),
            Ok(Ok(Some(notification))) => {
                debug!(
                    channel = notification.channel(),
                    process_id = notification.process_id(),
                    "Notification received"
                );
                Ok(Some(notification.payload().to_string()))
            }
            // try_recv reports a dropped connection once as Ok(None).
            Ok(Ok(None)) => Err(RelayError::ConnectionLost(
                "server closed the notification connection".into(),
            )),
            Ok(Err(e)) => Err(RelayError::ConnectionLost(e.to_string())),
        }
    }

    async fn probe(&mut self) -> Result<(), RelayError> {
        sqlx::query("SELECT 1")
            .execute(&mut self.listener)
            .await
            .map(|_| ())
            .map_err(|e| RelayError::Probe(e.to_string()))
    }
}

// =============================================================================
// Reference lookups and counts
// =============================================================================

#[derive(sqlx::FromRow)]
struct CharacterRow {
    name: Option<String>,
    address: Option<Vec<u8>>,
}

#[derive(sqlx::FromRow)]
struct MembershipRow {
    tribe_name: String,
    joined_at: i64,
    left_at: Option<i64>,
}

/// Reference data and counters over the pooled read path.
#[derive(Clone)]
pub struct PgReferenceStore {
    pool: PgPool,
}

impl PgReferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build the pool without connecting; connections open on first use.
    pub fn connect_lazy(endpoint: &PgEndpoint, max_connections: u32) -> Self {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(CONNECT_TIMEOUT)
            .connect_lazy_with(endpoint.connect_options());
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn memberships_until(
        &self,
        character_id: i64,
        at: i64,
    ) -> Result<Vec<Membership>, RelayError> {
        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT COALESCE(t.name, '') AS tribe_name, m.joined_at, m.left_at
            FROM character_tribe_membership m
            LEFT JOIN tribes t ON m.tribe_id = t.id
            WHERE m.character_id = $1 AND m.joined_at <= $2
            "#,
        )
        .bind(character_id)
        .bind(at)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RelayError::Lookup(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| Membership::new(row.tribe_name, row.joined_at, row.left_at))
            .collect())
    }
}

#[async_trait]
impl ReferenceLookup for PgReferenceStore {
    async fn character_at(
        &self,
        character_id: i64,
        at: i64,
    ) -> Result<Option<CharacterRecord>, RelayError> {
        let row = sqlx::query_as::<_, CharacterRow>(
            "SELECT name, address FROM characters WHERE id = $1",
        )
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelayError::Lookup(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let memberships = self.memberships_until(character_id, at).await?;
        let affiliation = affiliation_at(&memberships, at).map(|m| m.tribe_name.clone());

        Ok(Some(CharacterRecord {
            name: row.name.unwrap_or_default(),
            address: row.address.map(hex::encode).unwrap_or_default(),
            affiliation,
        }))
    }

    async fn system_name(&self, system_id: i64) -> Result<Option<String>, RelayError> {
        sqlx::query_scalar::<_, String>(
            "SELECT solar_system_name FROM systems WHERE solar_system_id = $1",
        )
        .bind(system_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RelayError::Lookup(e.to_string()))
    }
}

#[async_trait]
impl StoreStats for PgReferenceStore {
    async fn counts(&self) -> Result<StoreCounts, RelayError> {
        let (characters, incidents) = sqlx::query_as::<_, (i64, i64)>(
            "SELECT (SELECT COUNT(*) FROM characters), (SELECT COUNT(*) FROM incident)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RelayError::Lookup(e.to_string()))?;

        Ok(StoreCounts {
            characters,
            incidents,
        })
    }
}
