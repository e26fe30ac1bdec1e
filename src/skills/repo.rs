use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub proficiency_level: i32,
    pub category: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct SkillChanges {
    pub name: Option<String>,
    pub proficiency_level: Option<i32>,
    pub category: Option<String>,
}

const COLUMNS: &str = "id, user_id, name, proficiency_level, category, created_at, updated_at";

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Skill>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM skills \
         WHERE user_id = $1 \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, Skill>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Skill>> {
    let sql = format!("SELECT {COLUMNS} FROM skills WHERE id = $1");
    let row = sqlx::query_as::<_, Skill>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    proficiency_level: i32,
    category: Option<&str>,
) -> anyhow::Result<Skill> {
    let sql = format!(
        "INSERT INTO skills (user_id, name, proficiency_level, category) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Skill>(&sql)
        .bind(user_id)
        .bind(name)
        .bind(proficiency_level)
        .bind(category)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, changes: &SkillChanges) -> anyhow::Result<Skill> {
    let sql = format!(
        "UPDATE skills SET \
            name = COALESCE($2, name), \
            proficiency_level = COALESCE($3, proficiency_level), \
            category = COALESCE($4, category), \
            updated_at = now() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Skill>(&sql)
        .bind(id)
        .bind(&changes.name)
        .bind(changes.proficiency_level)
        .bind(&changes.category)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM skills WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
