use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

pub(crate) fn default_limit() -> i64 {
    50
}

/// List filter: pagination plus an optional category.
#[derive(Debug, Deserialize)]
pub struct AchievementFilter {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateAchievementRequest {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_achieved: Option<OffsetDateTime>,
    #[serde(default = "default_importance")]
    pub importance_level: i32,
    #[serde(default)]
    pub is_public: bool,
}

fn default_importance() -> i32 {
    3
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateAchievementRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date_achieved: Option<OffsetDateTime>,
    pub importance_level: Option<i32>,
    pub is_public: Option<bool>,
}
