use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{
    sqlite::{Sqlite, SqlitePool, SqlitePoolOptions, SqliteRow},
    QueryBuilder, Row,
};

use super::document_store::{
    already_exists, not_found, stale_revision, Collection, Document, DocumentList, DocumentStore,
    Fields, Predicate,
};
use super::query;
use crate::error::{AppError, AppResult};

/// Attempts for an unguarded `update` that keeps racing other writers
const UPDATE_ATTEMPTS: u32 = 5;

/// SQLite implementation of the document store
/// Every collection shares one table; field maps are stored as JSON text.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub async fn connect(url: &str) -> AppResult<Self> {
        // An in-memory database only lives as long as its single connection
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| {
                AppError::ConfigurationError(format!("Failed to connect to {}: {}", url, e))
            })?;

        let store = Self { pool };
        store.initialize().await?;
        Ok(store)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                revision INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                fields TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::upstream(format!("Failed to create documents table: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_documents_collection_created ON documents(collection, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::upstream(format!("Failed to create documents index: {}", e)))?;

        Ok(())
    }

    /// Health check to verify database connectivity
    pub async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(collection: Collection, row: &SqliteRow) -> AppResult<Document> {
        let raw_fields: String = row.try_get("fields")?;
        let fields: Fields = serde_json::from_str(&raw_fields)?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
        Ok(Document {
            id: row.try_get("id")?,
            collection,
            revision: row.try_get::<i64, _>("revision")? as u64,
            created_at,
            updated_at,
            fields,
        })
    }

    async fn fetch(&self, collection: Collection, id: &str) -> AppResult<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, revision, created_at, updated_at, fields FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| Self::row_to_document(collection, &row))
            .transpose()
    }

    async fn write_fields(
        &self,
        collection: Collection,
        id: &str,
        expected_revision: Option<u64>,
        fields: Fields,
    ) -> AppResult<Document> {
        let mut current = self
            .fetch(collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))?;
        if let Some(expected) = expected_revision {
            if current.revision != expected {
                return Err(stale_revision(collection, id, expected, current.revision));
            }
        }

        current.fields.extend(fields);
        let now = Utc::now();
        let encoded = serde_json::to_string(&current.fields)?;

        // The revision guard in WHERE keeps concurrent writers from overwriting each other
        let result = sqlx::query(
            "UPDATE documents SET fields = ?, revision = revision + 1, updated_at = ? WHERE collection = ? AND id = ? AND revision = ?",
        )
        .bind(encoded)
        .bind(now)
        .bind(collection.as_str())
        .bind(id)
        .bind(current.revision as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.fetch(collection, id).await? {
                Some(latest) => Err(stale_revision(
                    collection,
                    id,
                    current.revision,
                    latest.revision,
                )),
                None => Err(not_found(collection, id)),
            };
        }

        current.revision += 1;
        current.updated_at = now;
        Ok(current)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: Collection, id: &str) -> AppResult<Document> {
        self.fetch(collection, id)
            .await?
            .ok_or_else(|| not_found(collection, id))
    }

    async fn list(
        &self,
        collection: Collection,
        predicates: &[Predicate],
    ) -> AppResult<DocumentList> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, revision, created_at, updated_at, fields FROM documents WHERE collection = ",
        );
        builder.push_bind(collection.as_str());
        // Narrow by string equality in SQL; a scalar field yields one json_each row, an array one per item
        for (path, value) in sql_equality_filters(predicates) {
            builder.push(" AND EXISTS (SELECT 1 FROM json_each(documents.fields, ");
            builder.push_bind(path);
            builder.push(") WHERE json_each.value = ");
            builder.push_bind(value);
            builder.push(")");
        }
        let rows = builder.build().fetch_all(&self.pool).await?;

        let candidates = rows
            .iter()
            .map(|row| Self::row_to_document(collection, row))
            .collect::<AppResult<Vec<_>>>()?;
        Ok(query::evaluate(candidates, predicates))
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> AppResult<Document> {
        let now = Utc::now();
        let encoded = serde_json::to_string(&fields)?;
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, revision, created_at, updated_at, fields) VALUES (?, ?, 1, ?, ?, ?)",
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(now)
        .bind(now)
        .bind(encoded)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Document {
                id: id.to_string(),
                collection,
                revision: 1,
                created_at: now,
                updated_at: now,
                fields,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(already_exists(collection, id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        fields: Fields,
    ) -> AppResult<Document> {
        let mut attempt = 1;
        loop {
            match self.write_fields(collection, id, None, fields.clone()).await {
                Err(AppError::Conflict(_)) if attempt < UPDATE_ATTEMPTS => attempt += 1,
                result => return result,
            }
        }
    }

    async fn update_at_revision(
        &self,
        collection: Collection,
        id: &str,
        revision: u64,
        fields: Fields,
    ) -> AppResult<Document> {
        self.write_fields(collection, id, Some(revision), fields)
            .await
    }

    async fn delete(&self, collection: Collection, id: &str) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }
}

/// Top-level equality filters on plain field names with string values, as JSON paths
fn sql_equality_filters(predicates: &[Predicate]) -> Vec<(String, String)> {
    predicates
        .iter()
        .filter_map(|p| match p {
            Predicate::Equal(field, Value::String(value))
                if !field.is_empty()
                    && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') =>
            {
                Some((format!("$.{}", field), value.clone()))
            }
            _ => None,
        })
        .collect()
}
