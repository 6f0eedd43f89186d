//! Versions repository

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use ia_core::{EntityRef, Id};
use ia_versions::{Version, VersionEvent, VersionResult, VersionStore};
use sqlx::{FromRow, PgPool};

use crate::error::RepositoryError;

const COLUMNS: &str = "id, item_type, item_id, event, actor, object, object_changes, created_at";

/// Earliest year a Postgres `timestamptz` can hold (4713 BC)
const PG_MIN_YEAR: i32 = -4712;

/// Lower bound for an age filter, or `None` when it precedes every storable time
fn age_bound(since: DateTime<Utc>) -> Option<DateTime<Utc>> {
    (since.year() > PG_MIN_YEAR).then_some(since)
}

/// Version row from database
#[derive(Debug, Clone, FromRow)]
pub struct VersionRow {
    pub id: i64,
    pub item_type: String,
    pub item_id: String,
    pub event: String,
    pub actor: Option<String>,
    pub object: Option<String>,
    pub object_changes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<VersionRow> for Version {
    type Error = RepositoryError;

    fn try_from(row: VersionRow) -> Result<Self, Self::Error> {
        let event = VersionEvent::from_str(&row.event).ok_or_else(|| {
            RepositoryError::CorruptRow(format!("version {} has unknown event {:?}", row.id, row.event))
        })?;

        Ok(Version {
            id: Some(row.id),
            item_type: row.item_type,
            item_id: row.item_id,
            event,
            actor: row.actor,
            object: row.object,
            object_changes: row.object_changes,
            created_at: row.created_at,
        })
    }
}

fn into_versions(rows: Vec<VersionRow>) -> VersionResult<Vec<Version>> {
    rows.into_iter()
        .map(|row| Version::try_from(row).map_err(Into::into))
        .collect()
}

/// PostgreSQL-backed [`VersionStore`]. Rows are only ever inserted.
#[derive(Clone)]
pub struct PgVersionStore {
    pool: PgPool,
}

impl PgVersionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VersionStore for PgVersionStore {
    async fn append(&self, version: &Version) -> VersionResult<Id> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO versions (item_type, item_id, event, actor, object, object_changes, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&version.item_type)
        .bind(&version.item_id)
        .bind(version.event.as_str())
        .bind(&version.actor)
        .bind(&version.object)
        .bind(&version.object_changes)
        .bind(version.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(id)
    }

    async fn get(&self, id: Id) -> VersionResult<Option<Version>> {
        let row = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {COLUMNS} FROM versions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        match row {
            Some(row) => Ok(Some(Version::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn for_item(&self, item: &EntityRef) -> VersionResult<Vec<Version>> {
        let rows = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {COLUMNS} FROM versions WHERE item_type = $1 AND item_id = $2 ORDER BY id"
        ))
        .bind(&item.type_name)
        .bind(&item.id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        into_versions(rows)
    }

    async fn count_for_item(&self, item: &EntityRef) -> VersionResult<usize> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM versions WHERE item_type = $1 AND item_id = $2",
        )
        .bind(&item.type_name)
        .bind(&item.id)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(count.max(0) as usize)
    }

    async fn object_contains(&self, pattern: &str) -> VersionResult<Vec<Version>> {
        // strpos keeps LIKE wildcards in the pattern literal
        let rows = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {COLUMNS} FROM versions WHERE strpos(object, $1) > 0 ORDER BY id"
        ))
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        into_versions(rows)
    }

    async fn created_after(&self, since: DateTime<Utc>) -> VersionResult<Vec<Version>> {
        let rows = sqlx::query_as::<_, VersionRow>(&format!(
            "SELECT {COLUMNS} FROM versions \
             WHERE $1::timestamptz IS NULL OR created_at > $1 ORDER BY id"
        ))
        .bind(age_bound(since))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        into_versions(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(event: &str) -> VersionRow {
        VersionRow {
            id: 9,
            item_type: "Attachment".to_string(),
            item_id: "3".to_string(),
            event: event.to_string(),
            actor: Some("importer".to_string()),
            object: Some("file_name: invoice.csv\n".to_string()),
            object_changes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_into_version() {
        let version = Version::try_from(row("destroy")).unwrap();
        assert_eq!(version.id, Some(9));
        assert_eq!(version.event, VersionEvent::Destroy);
        assert!(version.is_for(&EntityRef::new("Attachment", 3)));
        assert!(version.object_contains("invoice.csv"));
    }

    #[test]
    fn test_age_bound_drops_unstorable_times() {
        let now = Utc::now();
        assert_eq!(age_bound(now), Some(now));
        assert_eq!(age_bound(DateTime::<Utc>::MIN_UTC), None);
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(matches!(
            Version::try_from(row("archive")),
            Err(RepositoryError::CorruptRow(_))
        ));
    }
}
