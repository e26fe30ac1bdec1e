use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Achievement {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub date_achieved: Option<OffsetDateTime>,
    pub importance_level: i32,
    pub is_public: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewAchievement {
    pub category_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub date_achieved: Option<OffsetDateTime>,
    pub importance_level: i32,
    pub is_public: bool,
}

#[derive(Debug, Default)]
pub struct AchievementChanges {
    pub category_id: Option<Uuid>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_achieved: Option<OffsetDateTime>,
    pub importance_level: Option<i32>,
    pub is_public: Option<bool>,
}

const COLUMNS: &str = "id, user_id, category_id, title, description, date_achieved, \
    importance_level, is_public, created_at, updated_at";

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
    category_id: Option<Uuid>,
) -> anyhow::Result<Vec<Achievement>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM achievements \
         WHERE user_id = $1 AND ($4::uuid IS NULL OR category_id = $4) \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, Achievement>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .bind(category_id)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn list_public(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Achievement>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM achievements \
         WHERE is_public \
         ORDER BY created_at DESC \
         LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, Achievement>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Achievement>> {
    let sql = format!("SELECT {COLUMNS} FROM achievements WHERE id = $1");
    let row = sqlx::query_as::<_, Achievement>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(db: &PgPool, user_id: Uuid, new: &NewAchievement) -> anyhow::Result<Achievement> {
    let sql = format!(
        "INSERT INTO achievements \
            (user_id, category_id, title, description, date_achieved, importance_level, is_public) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Achievement>(&sql)
        .bind(user_id)
        .bind(new.category_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.date_achieved)
        .bind(new.importance_level)
        .bind(new.is_public)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn update(
    db: &PgPool,
    id: Uuid,
    changes: &AchievementChanges,
) -> anyhow::Result<Achievement> {
    let sql = format!(
        "UPDATE achievements SET \
            category_id = COALESCE($2, category_id), \
            title = COALESCE($3, title), \
            description = COALESCE($4, description), \
            date_achieved = COALESCE($5, date_achieved), \
            importance_level = COALESCE($6, importance_level), \
            is_public = COALESCE($7, is_public), \
            updated_at = now() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Achievement>(&sql)
        .bind(id)
        .bind(changes.category_id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.date_achieved)
        .bind(changes.importance_level)
        .bind(changes.is_public)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM achievements WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
