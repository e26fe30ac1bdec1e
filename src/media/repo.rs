use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// File attached to an achievement: certificate scan, photo, clip.
/// Only the URL is stored; the bytes live wherever the client uploaded them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Media {
    pub id: Uuid,
    pub achievement_id: Uuid,
    pub file_url: String,
    pub file_type: String,
    pub caption: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const COLUMNS: &str = "id, achievement_id, file_url, file_type, caption, created_at, updated_at";

pub async fn list_by_achievement(db: &PgPool, achievement_id: Uuid) -> anyhow::Result<Vec<Media>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM media WHERE achievement_id = $1 ORDER BY created_at ASC"
    );
    let rows = sqlx::query_as::<_, Media>(&sql)
        .bind(achievement_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Media>> {
    let sql = format!("SELECT {COLUMNS} FROM media WHERE id = $1");
    let row = sqlx::query_as::<_, Media>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(
    db: &PgPool,
    achievement_id: Uuid,
    file_url: &str,
    file_type: &str,
    caption: Option<&str>,
) -> anyhow::Result<Media> {
    let sql = format!(
        "INSERT INTO media (achievement_id, file_url, file_type, caption) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Media>(&sql)
        .bind(achievement_id)
        .bind(file_url)
        .bind(file_type)
        .bind(caption)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM media WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
