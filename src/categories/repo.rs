use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

const COLUMNS: &str = "id, name, icon, color, description, created_at, updated_at";

pub async fn list(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Category>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM categories ORDER BY name ASC LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, Category>(&sql)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM categories WHERE id = $1");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn find_by_name(db: &PgPool, name: &str) -> anyhow::Result<Option<Category>> {
    let sql = format!("SELECT {COLUMNS} FROM categories WHERE name = $1");
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(name)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(
    db: &PgPool,
    name: &str,
    icon: Option<&str>,
    color: Option<&str>,
    description: Option<&str>,
) -> anyhow::Result<Category> {
    let sql = format!(
        "INSERT INTO categories (name, icon, color, description) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(name)
        .bind(icon)
        .bind(color)
        .bind(description)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, changes: &CategoryChanges) -> anyhow::Result<Category> {
    let sql = format!(
        "UPDATE categories SET \
            name = COALESCE($2, name), \
            icon = COALESCE($3, icon), \
            color = COALESCE($4, color), \
            description = COALESCE($5, description), \
            updated_at = now() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Category>(&sql)
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.icon)
        .bind(&changes.color)
        .bind(&changes.description)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
