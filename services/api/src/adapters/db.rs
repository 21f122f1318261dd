//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DocumentStore` port from the `core` crate. Every collection is kept in a
//! single PostgreSQL table of JSONB bodies, accessed with `sqlx`.

use async_stream::try_stream;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use serde_json::Value;
use sqlx::{postgres::PgRow, PgPool, Row};
use taskboard_core::domain::{
    Collection, DeleteOutcome, Document, DocumentId, InsertOutcome, UpdateOutcome, ID_FIELD,
};
use taskboard_core::ports::{
    DocumentStore, DocumentStream, Filter, PortError, PortResult, Sort, SortDirection, Update,
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DocumentStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Runs an update against the first match (`single`) or every match, returning
    /// the post-image of each touched row and whether it changed.
    async fn apply_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        single: bool,
    ) -> PortResult<Vec<(Document, bool)>> {
        let sql = update_sql(update, single);
        let query = sqlx::query(&sql)
            .bind(collection.name())
            .bind(filter.to_json());
        let query = match update {
            Update::Set(fields) => {
                let fields: Document = fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != ID_FIELD)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                query.bind(Value::Object(fields))
            }
            Update::Increment { field, by } => query.bind(field.as_str()).bind(*by),
        };

        let rows = query.fetch_all(&self.pool).await.map_err(store_error)?;
        rows.into_iter()
            .map(|row| {
                let modified: bool = row.try_get("modified").map_err(store_error)?;
                Ok((body_of(&row)?, modified))
            })
            .collect()
    }
}

//=========================================================================================
// SQL Helpers
//=========================================================================================

const TARGET_FIRST: &str = "ORDER BY seq LIMIT 1";

fn update_sql(update: &Update, single: bool) -> String {
    let new_body = match update {
        Update::Set(_) => "d.body || $3",
        Update::Increment { .. } => {
            "jsonb_set(d.body, ARRAY[$3::text], to_jsonb(COALESCE((d.body ->> $3::text)::bigint, 0) + $4::bigint))"
        }
    };
    let limit = if single { TARGET_FIRST } else { "" };
    format!(
        r#"
        WITH target AS (
            SELECT id, body FROM documents
            WHERE collection = $1 AND body @> $2
            {limit}
            FOR UPDATE
        )
        UPDATE documents AS d
        SET body = {new_body}
        FROM target
        WHERE d.collection = $1 AND d.id = target.id
        RETURNING d.body, d.body IS DISTINCT FROM target.body AS modified
        "#
    )
}

fn find_sql(sort: Option<&Sort>) -> String {
    let order = match sort.map(|sort| sort.direction) {
        None => "ORDER BY seq".to_string(),
        Some(SortDirection::Ascending) => "ORDER BY body -> $3 ASC NULLS FIRST, seq".to_string(),
        Some(SortDirection::Descending) => "ORDER BY body -> $3 DESC NULLS LAST, seq".to_string(),
    };
    format!("SELECT body FROM documents WHERE collection = $1 AND body @> $2 {order}")
}

fn body_of(row: &PgRow) -> PortResult<Document> {
    match row.try_get::<Value, _>("body").map_err(store_error)? {
        Value::Object(document) => Ok(document),
        other => Err(PortError::Unexpected(format!(
            "stored body is not an object: {}",
            other
        ))),
    }
}

/// Translates a driver error into the port taxonomy.
fn store_error(e: sqlx::Error) -> PortError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("23505") {
            return PortError::Conflict(db.message().to_string());
        }
    }
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => PortError::Unavailable(e.to_string()),
        _ => PortError::Unexpected(e.to_string()),
    }
}

fn stream_rows(
    pool: PgPool,
    collection: Collection,
    filter: Value,
    sort: Option<Sort>,
) -> impl Stream<Item = PortResult<Document>> + Send {
    try_stream! {
        let sql = find_sql(sort.as_ref());
        let mut query = sqlx::query(&sql).bind(collection.name()).bind(filter);
        if let Some(sort) = &sort {
            query = query.bind(sort.field.clone());
        }
        let mut rows = query.fetch(&pool);
        while let Some(row) = rows.try_next().await.map_err(store_error)? {
            yield body_of(&row)?;
        }
    }
}

//=========================================================================================
// `DocumentStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentStore for DbAdapter {
    async fn insert_one(
        &self,
        collection: Collection,
        mut document: Document,
    ) -> PortResult<InsertOutcome> {
        let id = DocumentId::generate();
        document.insert(ID_FIELD.into(), id.into());

        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.name())
            .bind(id.as_uuid())
            .bind(Value::Object(document))
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(InsertOutcome::new(id))
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> PortResult<Option<Document>> {
        let sql = format!(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 {}",
            TARGET_FIRST
        );
        let row = sqlx::query(&sql)
            .bind(collection.name())
            .bind(filter.to_json())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.as_ref().map(body_of).transpose()
    }

    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<Sort>,
    ) -> PortResult<DocumentStream> {
        Ok(Box::pin(stream_rows(
            self.pool.clone(),
            collection,
            filter.to_json(),
            sort,
        )))
    }

    async fn update_one(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
        upsert: bool,
    ) -> PortResult<UpdateOutcome> {
        let touched = self.apply_update(collection, filter, update, true).await?;
        match touched.first() {
            Some((_, modified)) => Ok(UpdateOutcome::new(1, *modified as u64)),
            None if upsert => {
                let inserted = self.insert_one(collection, update.seed(filter)).await?;
                Ok(UpdateOutcome::upserted(inserted.inserted_id))
            }
            None => Ok(UpdateOutcome::new(0, 0)),
        }
    }

    async fn update_many(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> PortResult<UpdateOutcome> {
        let touched = self.apply_update(collection, filter, update, false).await?;
        let modified = touched.iter().filter(|(_, modified)| *modified).count();
        Ok(UpdateOutcome::new(touched.len() as u64, modified as u64))
    }

    async fn find_one_and_update(
        &self,
        collection: Collection,
        filter: &Filter,
        update: &Update,
    ) -> PortResult<Option<Document>> {
        let touched = self.apply_update(collection, filter, update, true).await?;
        Ok(touched.into_iter().next().map(|(document, _)| document))
    }

    async fn delete_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> PortResult<DeleteOutcome> {
        let sql = format!(
            "DELETE FROM documents WHERE seq = (SELECT seq FROM documents WHERE collection = $1 AND body @> $2 {})",
            TARGET_FIRST
        );
        let result = sqlx::query(&sql)
            .bind(collection.name())
            .bind(filter.to_json())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(DeleteOutcome::new(result.rows_affected()))
    }
}
