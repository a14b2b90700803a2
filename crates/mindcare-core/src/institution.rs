use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionSettings {
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
}

/// A tenant. Users are matched to an institution by email domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: Uuid,
    pub name: String,
    pub domain: String,
    pub settings: InstitutionSettings,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Institution {
    pub fn new(
        name: impl Into<String>,
        domain: impl Into<String>,
        supported_languages: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            domain: domain.into().trim().to_lowercase(),
            settings: InstitutionSettings {
                supported_languages,
                primary_color: None,
            },
            is_active: true,
            created_at: Utc::now(),
        }
    }
}
