use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::auth::repo::SubscriptionTier;

/// User row as the admin panel sees it, with owned-content counts.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserWithCounts {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_email_verified: bool,
    pub is_phone_verified: bool,
    pub subscription_tier: SubscriptionTier,
    pub subscription_expires_at: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub achievement_count: i64,
    pub skill_count: i64,
    pub goal_count: i64,
}

const COLUMNS: &str = "u.id, u.email, u.full_name, u.is_active, u.is_admin, \
    u.is_email_verified, u.is_phone_verified, u.subscription_tier, u.subscription_expires_at, \
    u.created_at, u.updated_at, \
    (SELECT count(*) FROM achievements a WHERE a.user_id = u.id) AS achievement_count, \
    (SELECT count(*) FROM skills s WHERE s.user_id = u.id) AS skill_count, \
    (SELECT count(*) FROM goals g WHERE g.user_id = u.id) AS goal_count";

pub async fn list_users(
    db: &PgPool,
    limit: i64,
    offset: i64,
    search: Option<&str>,
) -> anyhow::Result<Vec<UserWithCounts>> {
    let pattern = search.map(|s| format!("%{s}%"));
    let sql = format!(
        "SELECT {COLUMNS} FROM users u \
         WHERE $3::text IS NULL OR u.email ILIKE $3 OR u.full_name ILIKE $3 \
         ORDER BY u.created_at DESC \
         LIMIT $1 OFFSET $2"
    );
    let rows = sqlx::query_as::<_, UserWithCounts>(&sql)
        .bind(limit)
        .bind(offset)
        .bind(pattern)
        .fetch_all(db)
        .await?;
    Ok(rows)
}

pub async fn get_user(db: &PgPool, id: Uuid) -> anyhow::Result<Option<UserWithCounts>> {
    let sql = format!("SELECT {COLUMNS} FROM users u WHERE u.id = $1");
    let row = sqlx::query_as::<_, UserWithCounts>(&sql)
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row)
}

#[derive(Debug, Serialize)]
pub struct SystemStats {
    pub total_users: i64,
    pub active_users: i64,
    pub verified_users: i64,
    pub pro_users: i64,
    pub total_achievements: i64,
    pub total_skills: i64,
    pub total_goals: i64,
    pub users_created_today: i64,
}

async fn count(db: &PgPool, sql: &str) -> anyhow::Result<i64> {
    let n: i64 = sqlx::query_scalar(sql).fetch_one(db).await?;
    Ok(n)
}

pub async fn system_stats(db: &PgPool) -> anyhow::Result<SystemStats> {
    Ok(SystemStats {
        total_users: count(db, "SELECT count(*) FROM users").await?,
        active_users: count(db, "SELECT count(*) FROM users WHERE is_active").await?,
        verified_users: count(db, "SELECT count(*) FROM users WHERE is_email_verified").await?,
        pro_users: count(db, "SELECT count(*) FROM users WHERE subscription_tier = 'pro'").await?,
        total_achievements: count(db, "SELECT count(*) FROM achievements").await?,
        total_skills: count(db, "SELECT count(*) FROM skills").await?,
        total_goals: count(db, "SELECT count(*) FROM goals").await?,
        users_created_today: count(
            db,
            "SELECT count(*) FROM users WHERE created_at >= date_trunc('day', now())",
        )
        .await?,
    })
}

#[derive(Debug, Serialize)]
pub struct GrowthPoint {
    pub date: String,
    pub new_users: i64,
    pub total_users: i64,
}

/// Daily signups over the window plus a running cumulative total.
/// Days without signups are filled with zero.
pub async fn user_growth(db: &PgPool, days: i64) -> anyhow::Result<Vec<GrowthPoint>> {
    let start = OffsetDateTime::now_utc() - Duration::days(days);

    let rows: Vec<(OffsetDateTime, i64)> = sqlx::query_as(
        "SELECT date_trunc('day', created_at) AS day, count(*) \
         FROM users WHERE created_at >= $1 \
         GROUP BY day ORDER BY day",
    )
    .bind(start)
    .fetch_all(db)
    .await?;

    let baseline: i64 = sqlx::query_scalar("SELECT count(*) FROM users WHERE created_at < $1")
        .bind(start)
        .fetch_one(db)
        .await?;

    let by_day: HashMap<Date, i64> = rows.into_iter().map(|(d, n)| (d.date(), n)).collect();

    let mut points = Vec::with_capacity(days as usize + 1);
    let mut running = baseline;
    let today = OffsetDateTime::now_utc().date();
    let mut day = start.date();
    while day <= today {
        let new_users = by_day.get(&day).copied().unwrap_or(0);
        running += new_users;
        points.push(GrowthPoint {
            date: day.to_string(),
            new_users,
            total_users: running,
        });
        let Some(next) = day.next_day() else { break };
        day = next;
    }
    Ok(points)
}
