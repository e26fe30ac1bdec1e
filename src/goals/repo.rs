use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "goal_status", rename_all = "snake_case")]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<OffsetDateTime>,
    pub status: GoalStatus,
    pub progress_percentage: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewGoal {
    pub title: String,
    pub description: Option<String>,
    pub target_date: Option<OffsetDateTime>,
    pub status: GoalStatus,
    pub progress_percentage: i32,
}

#[derive(Debug, Default)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<OffsetDateTime>,
    pub status: Option<GoalStatus>,
    pub progress_percentage: Option<i32>,
}

const COLUMNS: &str =
    "id, user_id, title, description, target_date, status, progress_percentage, \
     created_at, updated_at";

pub async fn list_by_user(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<Goal>> {
    let sql = format!(
        "SELECT {COLUMNS} FROM goals \
         WHERE user_id = $1 \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query_as::<_, Goal>(&sql)
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Goal>> {
    let sql = format!("SELECT {COLUMNS} FROM goals WHERE id = $1");
    let row = sqlx::query_as::<_, Goal>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

pub async fn create(db: &PgPool, user_id: Uuid, new: &NewGoal) -> anyhow::Result<Goal> {
    let sql = format!(
        "INSERT INTO goals (user_id, title, description, target_date, status, progress_percentage) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Goal>(&sql)
        .bind(user_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.target_date)
        .bind(new.status)
        .bind(new.progress_percentage)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn update(db: &PgPool, id: Uuid, changes: &GoalChanges) -> anyhow::Result<Goal> {
    let sql = format!(
        "UPDATE goals SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            target_date = COALESCE($4, target_date), \
            status = COALESCE($5, status), \
            progress_percentage = COALESCE($6, progress_percentage), \
            updated_at = now() \
         WHERE id = $1 \
         RETURNING {COLUMNS}"
    );
    let row = sqlx::query_as::<_, Goal>(&sql)
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.target_date)
        .bind(changes.status)
        .bind(changes.progress_percentage)
        .fetch_one(db)
        .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM goals WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goal_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&GoalStatus::NotStarted).unwrap(),
            "\"not_started\""
        );
        assert_eq!(
            serde_json::to_string(&GoalStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }
}
