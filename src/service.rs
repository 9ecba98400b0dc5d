//! Connection manager: one reusable session plus the read operations built on it.

use mongodb::bson::Document;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::driver::{Driver, Session};
use crate::profile::ConnectionProfile;

/// Errors surfaced by [`ConnectionManager`].
///
/// Each variant carries the driver's error unchanged as its source.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The session could not be opened or did not answer the ping.
    #[error("Connection error")]
    Connection(#[source] anyhow::Error),

    /// A metadata, count or find call failed on an established session.
    #[error("Query error")]
    Query(#[source] anyhow::Error),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// What `connect` had to do to satisfy the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectOutcome {
    /// The held session already matched the profile's URI.
    Reused,
    /// A new session was opened and answered the ping.
    Opened,
}

struct ActiveConnection {
    uri: String,
    session: Arc<dyn Session>,
}

/// Holds at most one session and reuses it while the requested URI is unchanged.
///
/// The slot is locked for the whole open-and-ping sequence, so two callers racing
/// on a cold or stale slot end up sharing one session.
pub struct ConnectionManager {
    driver: Arc<dyn Driver>,
    active: Mutex<Option<ActiveConnection>>,
}

impl ConnectionManager {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            active: Mutex::new(None),
        }
    }

    /// URI of the held session, if any.
    #[allow(dead_code)]
    pub async fn current_uri(&self) -> Option<String> {
        self.active.lock().await.as_ref().map(|a| a.uri.clone())
    }

    pub async fn connect(&self, profile: &ConnectionProfile) -> ServiceResult<ConnectOutcome> {
        self.acquire(profile).await.map(|(_, outcome)| outcome)
    }

    /// Precondition for every read operation: reuse or open the session for `profile`.
    pub async fn ensure_connected(
        &self,
        profile: &ConnectionProfile,
    ) -> ServiceResult<Arc<dyn Session>> {
        self.acquire(profile).await.map(|(session, _)| session)
    }

    async fn acquire(
        &self,
        profile: &ConnectionProfile,
    ) -> ServiceResult<(Arc<dyn Session>, ConnectOutcome)> {
        let uri = profile.connection_uri();
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref().filter(|a| a.uri == uri) {
            tracing::debug!("Reusing session for connection '{}'", profile.name);
            return Ok((current.session.clone(), ConnectOutcome::Reused));
        }

        tracing::info!(
            "Opening session for connection '{}' ({})",
            profile.name,
            profile.redacted_uri()
        );

        let session = self
            .driver
            .open(&uri)
            .await
            .map_err(ServiceError::Connection)?;
        session.ping().await.map_err(ServiceError::Connection)?;

        // The previous session, if any, is dropped here without an explicit close
        *active = Some(ActiveConnection {
            uri,
            session: session.clone(),
        });

        tracing::info!("Connected to '{}'", profile.name);
        Ok((session, ConnectOutcome::Opened))
    }

    /// Drop the held session.
    pub async fn disconnect(&self) {
        if self.active.lock().await.take().is_some() {
            tracing::info!("Session dropped");
        }
    }

    pub async fn list_databases(&self, profile: &ConnectionProfile) -> ServiceResult<Vec<String>> {
        let session = self.ensure_connected(profile).await?;
        session
            .list_database_names()
            .await
            .map_err(ServiceError::Query)
    }

    pub async fn list_collections(
        &self,
        database: &str,
        profile: &ConnectionProfile,
    ) -> ServiceResult<Vec<String>> {
        let session = self.ensure_connected(profile).await?;
        tracing::debug!("Listing collections in {}", database);
        session
            .list_collection_names(database)
            .await
            .map_err(ServiceError::Query)
    }

    pub async fn count_documents(
        &self,
        collection: &str,
        database: &str,
        profile: &ConnectionProfile,
    ) -> ServiceResult<u64> {
        let session = self.ensure_connected(profile).await?;
        tracing::debug!("Counting documents in {}.{}", database, collection);
        session
            .count_documents(database, collection)
            .await
            .map_err(ServiceError::Query)
    }

    /// One page of documents in server order. `limit` of 0 means no limit.
    pub async fn find_documents(
        &self,
        collection: &str,
        database: &str,
        profile: &ConnectionProfile,
        limit: i64,
        skip: u64,
    ) -> ServiceResult<Vec<Document>> {
        let session = self.ensure_connected(profile).await?;
        tracing::debug!(
            "Finding documents in {}.{} (limit {}, skip {})",
            database,
            collection,
            limit,
            skip
        );
        session
            .find(database, collection, limit, skip)
            .await
            .map_err(ServiceError::Query)
    }
}
