use serde::Deserialize;
use time::OffsetDateTime;

use super::repo::GoalStatus;

#[derive(Debug, Deserialize)]
pub struct CreateGoalRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub target_date: Option<OffsetDateTime>,
    #[serde(default = "default_status")]
    pub status: GoalStatus,
    #[serde(default)]
    pub progress_percentage: i32,
}

fn default_status() -> GoalStatus {
    GoalStatus::NotStarted
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateGoalRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub target_date: Option<OffsetDateTime>,
    pub status: Option<GoalStatus>,
    pub progress_percentage: Option<i32>,
}
