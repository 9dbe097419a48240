use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    BasketId, Document, Result, StoreError, Version,
    store::{DocumentStore, SaveOptions, validate_batch, validate_for_save},
};

/// PostgreSQL-backed document store.
///
/// Documents live in a single `documents` table with a JSONB payload.
/// `save_all` runs in one transaction, which gives use cases relational
/// all-or-nothing semantics.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to the database at the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        Ok(Self::new(PgPool::connect(url).await?))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            id: BasketId::from_uuid(row.try_get::<Uuid, _>("id")?),
            kind: row.try_get("kind")?,
            version: Version::new(row.try_get("version")?),
            updated_at: row.try_get("updated_at")?,
            payload: row.try_get("payload")?,
        })
    }

    async fn stored_version(
        conn: &mut PgConnection,
        kind: &str,
        id: BasketId,
    ) -> Result<Version> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE kind = $1 AND id = $2")
                .bind(kind)
                .bind(id.as_uuid())
                .fetch_optional(&mut *conn)
                .await?;
        Ok(Version::new(version.unwrap_or(0)))
    }

    /// Writes one document on an open connection, enforcing the expected version.
    async fn write(
        conn: &mut PgConnection,
        document: &Document,
        options: &SaveOptions,
    ) -> Result<Version> {
        let conflict = |actual: Version, expected: Version| {
            metrics::counter!("document_store_conflicts_total", "backend" => "postgres")
                .increment(1);
            StoreError::ConcurrencyConflict {
                kind: document.kind.clone(),
                id: document.id,
                expected,
                actual,
            }
        };

        match options.expected_version {
            Some(expected) if expected == Version::initial() => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO documents (kind, id, version, updated_at, payload)
                    VALUES ($1, $2, 1, $3, $4)
                    ON CONFLICT (kind, id) DO NOTHING
                    "#,
                )
                .bind(&document.kind)
                .bind(document.id.as_uuid())
                .bind(document.updated_at)
                .bind(&document.payload)
                .execute(&mut *conn)
                .await?;

                if inserted.rows_affected() == 0 {
                    let actual = Self::stored_version(conn, &document.kind, document.id).await?;
                    return Err(conflict(actual, expected));
                }
                Ok(Version::first())
            }
            Some(expected) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE documents
                    SET version = version + 1, updated_at = $3, payload = $4
                    WHERE kind = $1 AND id = $2 AND version = $5
                    "#,
                )
                .bind(&document.kind)
                .bind(document.id.as_uuid())
                .bind(document.updated_at)
                .bind(&document.payload)
                .bind(expected.as_i64())
                .execute(&mut *conn)
                .await?;

                if updated.rows_affected() == 0 {
                    let actual = Self::stored_version(conn, &document.kind, document.id).await?;
                    return Err(conflict(actual, expected));
                }
                Ok(expected.next())
            }
            None => {
                let version: i64 = sqlx::query_scalar(
                    r#"
                    INSERT INTO documents (kind, id, version, updated_at, payload)
                    VALUES ($1, $2, 1, $3, $4)
                    ON CONFLICT (kind, id) DO UPDATE
                    SET version = documents.version + 1,
                        updated_at = EXCLUDED.updated_at,
                        payload = EXCLUDED.payload
                    RETURNING version
                    "#,
                )
                .bind(&document.kind)
                .bind(document.id.as_uuid())
                .bind(document.updated_at)
                .bind(&document.payload)
                .fetch_one(&mut *conn)
                .await?;
                Ok(Version::new(version))
            }
        }
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, kind: &str, id: BasketId) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT kind, id, version, updated_at, payload
            FROM documents
            WHERE kind = $1 AND id = $2
            "#,
        )
        .bind(kind)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    #[tracing::instrument(skip(self, document), fields(kind = %document.kind, id = %document.id))]
    async fn save(&self, document: Document, options: SaveOptions) -> Result<Version> {
        validate_for_save(&document, &options)?;

        let mut conn = self.pool.acquire().await?;
        let version = Self::write(&mut *conn, &document, &options).await?;
        metrics::counter!("document_store_saves_total", "backend" => "postgres").increment(1);

        Ok(version)
    }

    #[tracing::instrument(skip(self, writes), fields(count = writes.len()))]
    async fn save_all(&self, writes: Vec<(Document, SaveOptions)>) -> Result<Vec<Version>> {
        validate_batch(&writes)?;

        // Start a transaction
        let mut tx = self.pool.begin().await?;

        let mut versions = Vec::with_capacity(writes.len());
        for (document, options) in &writes {
            versions.push(Self::write(&mut *tx, document, options).await?);
        }

        tx.commit().await?;
        metrics::counter!("document_store_saves_total", "backend" => "postgres")
            .increment(versions.len() as u64);
        Ok(versions)
    }

    async fn current_version(&self, kind: &str, id: BasketId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT version FROM documents WHERE kind = $1 AND id = $2")
                .bind(kind)
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await?;
        Ok(version.map(Version::new))
    }
}
