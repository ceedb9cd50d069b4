use async_trait::async_trait;
use rusqlite::{params, TransactionBehavior};
use serde_json::{Map, Value};

use super::query::{self, Query};
use super::{
    timestamp_now, Collection, Document, DocumentPage, DocumentStore, PlatformError,
    PlatformResult,
};
use crate::state::DbPool;

/// JSON documents in a single SQLite table, keyed by (database, collection, id).
pub struct SqliteDocumentStore {
    pool: DbPool,
}

impl SqliteDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn load(
        conn: &rusqlite::Connection,
        collection: &Collection,
        document_id: &str,
    ) -> PlatformResult<Document> {
        let result = conn.query_row(
            "SELECT id, data, created_at, updated_at FROM documents
             WHERE database_id = ?1 AND collection_id = ?2 AND id = ?3",
            params![collection.database_id, collection.collection_id, document_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        );

        match result {
            Ok(row) => decode(row),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(PlatformError::NotFound(format!(
                "document {} in {}",
                document_id, collection.collection_id
            ))),
            Err(e) => Err(e.into()),
        }
    }
}

type Row = (String, String, String, String);

fn decode((id, data, created_at, updated_at): Row) -> PlatformResult<Document> {
    let fields: Map<String, Value> = serde_json::from_str(&data)?;
    Ok(Document {
        id,
        created_at,
        updated_at,
        fields,
    })
}

/// Meta attributes belong to the store; callers cannot write them.
fn strip_meta(mut fields: Map<String, Value>) -> Map<String, Value> {
    fields.retain(|key, _| !key.starts_with('$'));
    fields
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn create_document(
        &self,
        collection: &Collection,
        document_id: &str,
        fields: Map<String, Value>,
    ) -> PlatformResult<Document> {
        if document_id.is_empty() {
            return Err(PlatformError::Invalid("document id is required".into()));
        }

        let conn = self.pool.get()?;
        let fields = strip_meta(fields);
        let data = serde_json::to_string(&fields)?;
        let now = timestamp_now();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO documents
                (database_id, collection_id, id, data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                collection.database_id,
                collection.collection_id,
                document_id,
                data,
                now
            ],
        )?;

        if inserted == 0 {
            return Err(PlatformError::Conflict(format!(
                "document {} already exists in {}",
                document_id, collection.collection_id
            )));
        }

        Ok(Document {
            id: document_id.to_string(),
            created_at: now.clone(),
            updated_at: now,
            fields,
        })
    }

    async fn get_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> PlatformResult<Document> {
        let conn = self.pool.get()?;
        Self::load(&conn, collection, document_id)
    }

    async fn list_documents(
        &self,
        collection: &Collection,
        queries: &[Query],
    ) -> PlatformResult<DocumentPage> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, data, created_at, updated_at FROM documents
             WHERE database_id = ?1 AND collection_id = ?2",
        )?;

        let rows = stmt
            .query_map(
                params![collection.database_id, collection.collection_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?
            .collect::<Result<Vec<Row>, _>>()?;

        let documents = rows
            .into_iter()
            .map(decode)
            .collect::<PlatformResult<Vec<_>>>()?;

        query::apply(documents, queries)
    }

    async fn update_document(
        &self,
        collection: &Collection,
        document_id: &str,
        fields: Map<String, Value>,
    ) -> PlatformResult<Document> {
        let mut conn = self.pool.get()?;
        // Read and write under one write lock so concurrent merges see each other.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut document = Self::load(&tx, collection, document_id)?;

        for (key, value) in strip_meta(fields) {
            document.fields.insert(key, value);
        }
        document.updated_at = timestamp_now();

        tx.execute(
            "UPDATE documents SET data = ?1, updated_at = ?2
             WHERE database_id = ?3 AND collection_id = ?4 AND id = ?5",
            params![
                serde_json::to_string(&document.fields)?,
                document.updated_at,
                collection.database_id,
                collection.collection_id,
                document_id
            ],
        )?;
        tx.commit()?;

        Ok(document)
    }

    async fn delete_document(
        &self,
        collection: &Collection,
        document_id: &str,
    ) -> PlatformResult<()> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "DELETE FROM documents WHERE database_id = ?1 AND collection_id = ?2 AND id = ?3",
            params![collection.database_id, collection.collection_id, document_id],
        )?;

        if rows == 0 {
            return Err(PlatformError::NotFound(format!(
                "document {} in {}",
                document_id, collection.collection_id
            )));
        }
        Ok(())
    }
}
