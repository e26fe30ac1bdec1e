use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct UserSearch {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub search: Option<String>,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct GrowthQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    30
}
