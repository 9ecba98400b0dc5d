//! MongoDB driver abstraction.
//! The connection manager only talks to these traits, so it can run against a fake in tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    Client,
    bson::{Document, doc},
    options::{ClientOptions, FindOptions},
};
use std::sync::Arc;

/// Opens sessions from connection URIs.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Parse the URI and create a client. Must not require a server round-trip.
    async fn open(&self, uri: &str) -> Result<Arc<dyn Session>>;
}

/// An open client against one deployment.
#[async_trait]
pub trait Session: Send + Sync {
    /// Administrative liveness check
    async fn ping(&self) -> Result<()>;

    async fn list_database_names(&self) -> Result<Vec<String>>;

    /// All collection names of a database, in server order
    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>>;

    /// Exact number of documents in a collection
    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64>;

    /// Fetch one page of documents, draining the cursor
    async fn find(
        &self,
        database: &str,
        collection: &str,
        limit: i64,
        skip: u64,
    ) -> Result<Vec<Document>>;
}

/// Driver backed by the official `mongodb` crate.
pub struct MongoDriver {
    app_name: String,
}

impl MongoDriver {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

#[async_trait]
impl Driver for MongoDriver {
    async fn open(&self, uri: &str) -> Result<Arc<dyn Session>> {
        let mut client_options = ClientOptions::parse(uri)
            .await
            .context("Failed to parse MongoDB connection URL")?;

        client_options.app_name = Some(self.app_name.clone());

        let client = Client::with_options(client_options).context("Failed to create MongoDB client")?;
        Ok(Arc::new(MongoSession { client }))
    }
}

struct MongoSession {
    client: Client,
}

#[async_trait]
impl Session for MongoSession {
    async fn ping(&self) -> Result<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .context("Ping to MongoDB server failed")?;
        Ok(())
    }

    async fn list_database_names(&self) -> Result<Vec<String>> {
        self.client
            .list_database_names()
            .await
            .context("Failed to list databases")
    }

    async fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
        self.client
            .database(database)
            .list_collection_names()
            .await
            .with_context(|| format!("Failed to list collections in '{database}'"))
    }

    async fn count_documents(&self, database: &str, collection: &str) -> Result<u64> {
        self.client
            .database(database)
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .with_context(|| format!("Failed to count documents in {database}.{collection}"))
    }

    async fn find(
        &self,
        database: &str,
        collection: &str,
        limit: i64,
        skip: u64,
    ) -> Result<Vec<Document>> {
        let coll = self.client.database(database).collection::<Document>(collection);

        let mut find_options = FindOptions::default();
        find_options.limit = Some(limit);
        find_options.skip = Some(skip);

        let cursor = coll
            .find(doc! {})
            .with_options(find_options)
            .await
            .context("Find query failed")?;

        cursor
            .try_collect()
            .await
            .context("Failed to collect find results")
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory driver for exercising the connection manager.

    use super::*;
    use anyhow::bail;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Collections keyed by `(database, collection)`, documents in insertion order.
    pub type Contents = BTreeMap<(String, String), Vec<Document>>;

    #[derive(Default)]
    pub struct FakeDriver {
        pub contents: Arc<Mutex<Contents>>,
        pub open_count: AtomicUsize,
        /// URIs that open fine but fail the ping
        pub unreachable: Mutex<Vec<String>>,
        pub fail_queries: Arc<Mutex<bool>>,
        pub open_delay: Option<Duration>,
    }

    impl FakeDriver {
        pub fn with_collection(self, database: &str, collection: &str, docs: Vec<Document>) -> Self {
            self.contents
                .lock()
                .unwrap()
                .insert((database.to_string(), collection.to_string()), docs);
            self
        }

        pub fn opens(&self) -> usize {
            self.open_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Driver for FakeDriver {
        async fn open(&self, uri: &str) -> Result<Arc<dyn Session>> {
            if !uri.starts_with("mongodb://") && !uri.starts_with("mongodb+srv://") {
                bail!("Invalid scheme in '{uri}'");
            }
            if let Some(delay) = self.open_delay {
                tokio::time::sleep(delay).await;
            }
            self.open_count.fetch_add(1, Ordering::SeqCst);

            let reachable = !self.unreachable.lock().unwrap().iter().any(|u| u == uri);
            Ok(Arc::new(FakeSession {
                reachable,
                contents: self.contents.clone(),
                fail_queries: self.fail_queries.clone(),
            }))
        }
    }

    struct FakeSession {
        reachable: bool,
        contents: Arc<Mutex<Contents>>,
        fail_queries: Arc<Mutex<bool>>,
    }

    impl FakeSession {
        fn check(&self) -> Result<()> {
            if *self.fail_queries.lock().unwrap() {
                bail!("not authorized");
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn ping(&self) -> Result<()> {
            if !self.reachable {
                bail!("Server selection timeout: no available servers");
            }
            Ok(())
        }

        async fn list_database_names(&self) -> Result<Vec<String>> {
            self.check()?;
            let mut names: Vec<String> = self
                .contents
                .lock()
                .unwrap()
                .keys()
                .map(|(db, _)| db.clone())
                .collect();
            names.dedup();
            Ok(names)
        }

        async fn list_collection_names(&self, database: &str) -> Result<Vec<String>> {
            self.check()?;
            Ok(self
                .contents
                .lock()
                .unwrap()
                .keys()
                .filter(|(db, _)| db == database)
                .map(|(_, coll)| coll.clone())
                .collect())
        }

        async fn count_documents(&self, database: &str, collection: &str) -> Result<u64> {
            self.check()?;
            let contents = self.contents.lock().unwrap();
            let docs = contents.get(&(database.to_string(), collection.to_string()));
            Ok(docs.map_or(0, |d| d.len() as u64))
        }

        async fn find(
            &self,
            database: &str,
            collection: &str,
            limit: i64,
            skip: u64,
        ) -> Result<Vec<Document>> {
            self.check()?;
            let contents = self.contents.lock().unwrap();
            let docs = contents
                .get(&(database.to_string(), collection.to_string()))
                .cloned()
                .unwrap_or_default();
            let iter = docs.into_iter().skip(skip as usize);
            // A limit of zero means no limit, as in the server
            Ok(if limit == 0 {
                iter.collect()
            } else {
                iter.take(limit.unsigned_abs() as usize).collect()
            })
        }
    }
}
