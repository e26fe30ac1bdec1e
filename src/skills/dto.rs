use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateSkillRequest {
    pub name: String,
    #[serde(default = "default_proficiency")]
    pub proficiency_level: i32,
    pub category: Option<String>,
}

fn default_proficiency() -> i32 {
    1
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSkillRequest {
    pub name: Option<String>,
    pub proficiency_level: Option<i32>,
    pub category: Option<String>,
}
