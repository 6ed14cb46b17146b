// src/store/sqlite.rs

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite, SqlitePool, sqlite::SqlitePoolOptions};

use super::{
    Collection, FilterValue, ListQuery, Record, RecordStore, new_record_id, timestamp_now,
    validate_id,
};
use crate::error::AppError;

/// Document store on SQLite: one `records` table, JSON bodies queried with `json_extract`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connects, retrying while the database is not reachable, then applies migrations.
    pub async fn connect_with_retry(database_url: &str) -> Result<Self, AppError> {
        let mut retry_count = 0;
        let pool = loop {
            match SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Duration::from_secs(3))
                .connect(database_url)
                .await
            {
                Ok(pool) => break pool,
                Err(e) => {
                    retry_count += 1;
                    if retry_count > 5 {
                        return Err(AppError::InternalServerError(format!(
                            "Failed to connect to database after 5 retries: {}",
                            e
                        )));
                    }
                    tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        };

        tracing::info!("Database connected...");
        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection that never expires,
    /// since every SQLite memory connection is its own database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, AppError> {
        tracing::info!("Running migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied successfully.");
        Ok(Self { pool })
    }

    /// Maps a failed write, turning unique index violations into `Conflict`.
    fn write_error(collection: Collection, e: sqlx::Error) -> AppError {
        if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
            return collection.conflict();
        }
        tracing::error!("Failed to write {} record: {:?}", collection, e);
        AppError::from(e)
    }

    fn decode(data: &str) -> Result<Record, AppError> {
        serde_json::from_str::<Record>(data)
            .map_err(|e| AppError::InternalServerError(format!("Corrupt record body: {}", e)))
    }

    async fn fetch_body(
        &self,
        executor: impl sqlx::SqliteExecutor<'_>,
        collection: Collection,
        id: &str,
    ) -> Result<Record, AppError> {
        let data = sqlx::query_scalar::<_, String>(
            "SELECT data FROM records WHERE collection = ? AND id = ?",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| collection.not_found())?;

        Self::decode(&data)
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        query.validate()?;

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT data FROM records WHERE collection = ");
        builder.push_bind(collection.name());

        for filter in &query.filters {
            builder.push(" AND json_extract(data, ");
            builder.push_bind(format!("$.{}", filter.field));
            builder.push(") = ");
            match &filter.value {
                FilterValue::Text(v) => builder.push_bind(v.clone()),
                FilterValue::Int(v) => builder.push_bind(*v),
                // json_extract yields 1/0 for JSON booleans
                FilterValue::Bool(v) => builder.push_bind(i64::from(*v)),
            };
        }

        builder.push(" ORDER BY ");
        if let Some(sort) = &query.sort {
            builder.push("json_extract(data, ");
            builder.push_bind(format!("$.{}", sort.field));
            builder.push(if sort.descending { ") DESC, " } else { ") ASC, " });
        }
        builder.push("rowid ASC");

        let bodies: Vec<String> = builder
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list {}: {:?}", collection, e);
                AppError::from(e)
            })?;

        bodies.iter().map(|b| Self::decode(b)).collect()
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Record, AppError> {
        validate_id(id)?;
        self.fetch_body(&self.pool, collection, id).await
    }

    async fn create(&self, collection: Collection, mut data: Record) -> Result<Record, AppError> {
        let id = new_record_id();
        let now = timestamp_now();
        data.insert("id".to_string(), Value::String(id.clone()));
        data.insert("created".to_string(), Value::String(now.clone()));
        data.insert("updated".to_string(), Value::String(now.clone()));

        let body = serde_json::to_string(&data)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        sqlx::query(
            "INSERT INTO records (collection, id, data, created, updated) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection.name())
        .bind(&id)
        .bind(body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::write_error(collection, e))?;

        Ok(data)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, AppError> {
        validate_id(id)?;

        let mut tx = self.pool.begin().await?;
        let mut record = self.fetch_body(&mut *tx, collection, id).await?;

        for (key, value) in patch {
            if matches!(key.as_str(), "id" | "created" | "updated") {
                continue;
            }
            record.insert(key, value);
        }
        let now = timestamp_now();
        record.insert("updated".to_string(), Value::String(now.clone()));

        let body = serde_json::to_string(&record)
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        sqlx::query("UPDATE records SET data = ?, updated = ? WHERE collection = ? AND id = ?")
            .bind(body)
            .bind(&now)
            .bind(collection.name())
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Self::write_error(collection, e))?;

        tx.commit().await?;
        Ok(record)
    }
}
