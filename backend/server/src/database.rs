//! # Document store
//!
//! Reference content lives in an external document store. Documents are JSON
//! objects addressed by `collection` + `id`, see [`DocumentRef`].
//!
//! ## Backends
//!
//! - **Redis**: one hash per collection, `{prefix}:{collection}`, field is the
//!   document id and the value is the JSON text. Nested collections such as
//!   `sinaisSintomas/{adminId}/combinacoes` are just longer hash names.
//! - **Memory**: ordered maps behind a lock, for local runs and tests.
//!
//! ## Semantics
//!
//! - `set` overwrites the whole document, last write wins
//! - `merge` replaces top-level fields only, like a merge-set
//! - no transactions, no optimistic locking
//! - `list_ids` is sorted so fan-out and aggregation order is stable
use std::{collections::BTreeMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use catalog::DocumentRef;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::config::{Config, StoreBackend};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Corrupt document {document}: {source}")]
    Corrupt {
        document: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document {0} must be a JSON object")]
    NotAnObject(String),

    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>>;

    async fn set(&self, doc: &DocumentRef, value: Value) -> StoreResult<()>;

    async fn list_ids(&self, collection: &str) -> StoreResult<Vec<String>>;

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>>;

    async fn merge(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        let merged = match self.get(doc).await? {
            Some(existing) => merge_fields(doc, existing, value)?,
            None => value,
        };

        self.set(doc, merged).await
    }

    /// Stores `value` under a fresh random id and returns that id.
    async fn add(&self, collection: &str, value: Value) -> StoreResult<String> {
        let id = Uuid::new_v4().simple().to_string();
        self.set(&DocumentRef::new(collection, id.as_str()), value)
            .await?;

        Ok(id)
    }
}

fn merge_fields(doc: &DocumentRef, existing: Value, update: Value) -> StoreResult<Value> {
    let (Value::Object(mut fields), Value::Object(updates)) = (existing, update) else {
        return Err(StoreError::NotAnObject(doc.to_string()));
    };

    fields.extend(updates);

    Ok(Value::Object(fields))
}

pub async fn init_store(config: &Config) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.store {
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::default()))
        }
        StoreBackend::Redis => {
            info!("Using Redis document store at {}", config.redis_url);
            let connection = init_redis(&config.redis_url).await?;
            Ok(Arc::new(RedisStore::new(connection, &config.redis_prefix)))
        }
    }
}

pub async fn init_redis(redis_url: &str) -> StoreResult<ConnectionManager> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(500));

    let client = Client::open(redis_url)?;
    let connection_manager = client.get_connection_manager_with_config(config).await?;

    Ok(connection_manager)
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<BTreeMap<String, BTreeMap<String, Value>>>,
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(&doc.collection)
            .and_then(|documents| documents.get(&doc.id))
            .cloned())
    }

    async fn set(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        if !value.is_object() {
            return Err(StoreError::NotAnObject(doc.to_string()));
        }

        self.collections
            .write()
            .await
            .entry(doc.collection.clone())
            .or_default()
            .insert(doc.id.clone(), value);

        Ok(())
    }

    async fn list_ids(&self, collection: &str) -> StoreResult<Vec<String>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|documents| documents.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, value)| (id.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn merge(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        let Value::Object(updates) = value else {
            return Err(StoreError::NotAnObject(doc.to_string()));
        };

        let mut collections = self.collections.write().await;
        let entry = collections
            .entry(doc.collection.clone())
            .or_default()
            .entry(doc.id.clone())
            .or_insert_with(|| Value::Object(Map::new()));

        match entry {
            Value::Object(fields) => fields.extend(updates),
            _ => return Err(StoreError::NotAnObject(doc.to_string())),
        }

        Ok(())
    }
}

pub struct RedisStore {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager, prefix: &str) -> Self {
        Self {
            connection,
            prefix: prefix.to_string(),
        }
    }

    fn hash_key(&self, collection: &str) -> String {
        format!("{}:{collection}", self.prefix)
    }
}

fn decode(document: String, raw: &str) -> StoreResult<Value> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt { document, source })
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        let mut connection = self.connection.clone();
        let raw: Option<String> = connection
            .hget(self.hash_key(&doc.collection), &doc.id)
            .await?;

        raw.map(|raw| decode(doc.to_string(), &raw)).transpose()
    }

    async fn set(&self, doc: &DocumentRef, value: Value) -> StoreResult<()> {
        if !value.is_object() {
            return Err(StoreError::NotAnObject(doc.to_string()));
        }

        let mut connection = self.connection.clone();
        connection
            .hset::<_, _, _, ()>(
                self.hash_key(&doc.collection),
                &doc.id,
                serde_json::to_string(&value)?,
            )
            .await?;

        Ok(())
    }

    async fn list_ids(&self, collection: &str) -> StoreResult<Vec<String>> {
        let mut connection = self.connection.clone();
        let mut ids: Vec<String> = connection.hkeys(self.hash_key(collection)).await?;
        ids.sort();

        Ok(ids)
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<(String, Value)>> {
        let mut connection = self.connection.clone();
        let raw: BTreeMap<String, String> = connection.hgetall(self.hash_key(collection)).await?;

        raw.into_iter()
            .map(|(id, raw)| {
                let value = decode(format!("{collection}/{id}"), &raw)?;
                Ok((id, value))
            })
            .collect()
    }
}
