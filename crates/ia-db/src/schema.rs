//! Table definitions

use sqlx::PgPool;
use tracing::info;

use crate::error::RepositoryResult;

/// Statements creating the attachments and versions tables
pub const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS attachments (
        id BIGSERIAL PRIMARY KEY,
        owner_type VARCHAR(255),
        owner_id VARCHAR(255),
        file_name VARCHAR(255) NOT NULL,
        content_type VARCHAR(255) NOT NULL,
        file_size BIGINT NOT NULL,
        file_modified_at TIMESTAMPTZ,
        digest VARCHAR(64),
        file_revision BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS index_attachments_on_owner ON attachments (owner_type, owner_id)",
    "CREATE INDEX IF NOT EXISTS index_attachments_on_file_name ON attachments (file_name)",
    r#"
    CREATE TABLE IF NOT EXISTS versions (
        id BIGSERIAL PRIMARY KEY,
        item_type VARCHAR(255) NOT NULL,
        item_id VARCHAR(255) NOT NULL,
        event VARCHAR(16) NOT NULL,
        actor VARCHAR(255),
        object TEXT,
        object_changes TEXT,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS index_versions_on_item ON versions (item_type, item_id)",
];

/// Create missing tables and indexes
pub async fn ensure_schema(pool: &PgPool) -> RepositoryResult<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(statements = SCHEMA.len(), "Schema ensured");
    Ok(())
}
