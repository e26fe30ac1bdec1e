use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AttachMediaRequest {
    pub file_url: String,
    pub file_type: String,
    pub caption: Option<String>,
}
