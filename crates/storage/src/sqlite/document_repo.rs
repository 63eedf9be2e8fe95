use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use crate::repository::{DocumentPath, DocumentStore, Fields, StorageError, WriteMode, merge_fields};

use super::SqliteRepository;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn parse_fields(path: &DocumentPath, raw: &str) -> Result<Fields, StorageError> {
    match serde_json::from_str::<Value>(raw).map_err(ser)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StorageError::Serialization(format!(
            "document {path} is not an object: {other}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for SqliteRepository {
    async fn document_exists(&self, path: &DocumentPath) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM documents WHERE path = ?1")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn read_document(&self, path: &DocumentPath) -> Result<Option<Fields>, StorageError> {
        let row = sqlx::query("SELECT fields FROM documents WHERE path = ?1")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let raw: String = row.try_get("fields").map_err(ser)?;
        parse_fields(path, &raw).map(Some)
    }

    async fn write_document(
        &self,
        path: &DocumentPath,
        fields: Fields,
        mode: WriteMode,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let merged = match mode {
            WriteMode::Replace => fields,
            WriteMode::Merge => {
                let existing = sqlx::query("SELECT fields FROM documents WHERE path = ?1")
                    .bind(path.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(conn)?;
                let mut current = match existing {
                    Some(row) => {
                        let raw: String = row.try_get("fields").map_err(ser)?;
                        parse_fields(path, &raw)?
                    }
                    None => Fields::new(),
                };
                merge_fields(&mut current, fields);
                current
            }
        };

        let encoded = serde_json::to_string(&merged).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO documents (path, fields, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(path) DO UPDATE SET
                fields = excluded.fields,
                updated_at = excluded.updated_at
            ",
        )
        .bind(path.as_str())
        .bind(encoded)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
