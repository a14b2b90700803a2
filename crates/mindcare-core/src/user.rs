use crate::types::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account as known to the identity provider, plus the profile fields
/// this service manages (role, institution, language).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub institution_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_preference: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: Option<String>, email: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            email: email.map(|e| e.trim().to_lowercase()),
            role: None,
            institution_id: None,
            language_preference: None,
            is_anonymous: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Domain part of the email, used to match the user to an institution.
    pub fn email_domain(&self) -> Option<&str> {
        self.email
            .as_deref()
            .and_then(|e| e.split_once('@'))
            .map(|(_, domain)| domain)
            .filter(|d| !d.is_empty())
    }

    pub fn has_email(&self, candidates: &[String]) -> bool {
        match self.email.as_deref() {
            Some(email) => candidates.iter().any(|c| c.eq_ignore_ascii_case(email)),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized_and_domain_extracted() {
        let u = User::new(None, Some("  Asha@Campus.EDU ".into()));
        assert_eq!(u.email.as_deref(), Some("asha@campus.edu"));
        assert_eq!(u.email_domain(), Some("campus.edu"));
    }

    #[test]
    fn missing_domain_yields_none() {
        assert_eq!(User::new(None, Some("asha@".into())).email_domain(), None);
        assert_eq!(User::new(None, None).email_domain(), None);
    }

    #[test]
    fn has_email_ignores_case() {
        let u = User::new(None, Some("admin@campus.edu".into()));
        assert!(u.has_email(&["ADMIN@campus.edu".to_string()]));
        assert!(!u.has_email(&[]));
    }
}
