//! Attachments repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ia_attachments::{Attachment, AttachmentResult, AttachmentStore};
use ia_core::{EntityRef, Id, ValidationErrors};
use sqlx::{FromRow, PgPool};

use crate::error::RepositoryError;

const COLUMNS: &str = "id, owner_type, owner_id, file_name, content_type, file_size, \
                       file_modified_at, digest, file_revision, created_at, updated_at";

/// Attachment row from database
#[derive(Debug, Clone, FromRow)]
pub struct AttachmentRow {
    pub id: i64,
    pub owner_type: Option<String>,
    pub owner_id: Option<String>,
    pub file_name: String,
    pub content_type: String,
    pub file_size: i64,
    pub file_modified_at: Option<DateTime<Utc>>,
    pub digest: Option<String>,
    pub file_revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AttachmentRow> for Attachment {
    fn from(row: AttachmentRow) -> Self {
        Attachment {
            id: Some(row.id),
            owner_type: row.owner_type,
            owner_id: row.owner_id,
            file_name: row.file_name,
            content_type: row.content_type,
            file_size: row.file_size,
            file_modified_at: row.file_modified_at,
            digest: row.digest,
            file_revision: row.file_revision,
            created_at: row.created_at,
            updated_at: row.updated_at,
            errors: ValidationErrors::new(),
            reified_from: None,
        }
    }
}

/// PostgreSQL-backed [`AttachmentStore`]
#[derive(Clone)]
pub struct PgAttachmentStore {
    pool: PgPool,
}

impl PgAttachmentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentStore for PgAttachmentStore {
    async fn create(&self, attachment: &mut Attachment) -> AttachmentResult<Id> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO attachments (owner_type, owner_id, file_name, content_type, file_size,
                                     file_modified_at, digest, file_revision, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(&attachment.owner_type)
        .bind(&attachment.owner_id)
        .bind(&attachment.file_name)
        .bind(&attachment.content_type)
        .bind(attachment.file_size)
        .bind(attachment.file_modified_at)
        .bind(&attachment.digest)
        .bind(attachment.file_revision)
        .bind(attachment.created_at)
        .bind(attachment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        attachment.id = Some(id);
        Ok(id)
    }

    async fn get(&self, id: Id) -> AttachmentResult<Option<Attachment>> {
        let row = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {COLUMNS} FROM attachments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.map(Attachment::from))
    }

    async fn get_for_owner(&self, owner: &EntityRef) -> AttachmentResult<Vec<Attachment>> {
        let rows = sqlx::query_as::<_, AttachmentRow>(&format!(
            "SELECT {COLUMNS} FROM attachments WHERE owner_type = $1 AND owner_id = $2 ORDER BY id"
        ))
        .bind(&owner.type_name)
        .bind(&owner.id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(Attachment::from).collect())
    }

    async fn update(&self, attachment: &Attachment) -> AttachmentResult<()> {
        let id = attachment.id.ok_or_else(|| {
            RepositoryError::CorruptRow("cannot update an unsaved attachment".to_string())
        })?;

        let result = sqlx::query(
            r#"
            UPDATE attachments
            SET owner_type = $2, owner_id = $3, file_name = $4, content_type = $5,
                file_size = $6, file_modified_at = $7, digest = $8, file_revision = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&attachment.owner_type)
        .bind(&attachment.owner_id)
        .bind(&attachment.file_name)
        .bind(&attachment.content_type)
        .bind(attachment.file_size)
        .bind(attachment.file_modified_at)
        .bind(&attachment.digest)
        .bind(attachment.file_revision)
        .bind(attachment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(ia_attachments::AttachmentError::NotFound(id));
        }
        Ok(())
    }

    async fn delete(&self, id: Id) -> AttachmentResult<()> {
        sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;
        Ok(())
    }
}
