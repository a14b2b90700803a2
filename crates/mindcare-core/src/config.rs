use crate::error::{CareError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "mindcare".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, every API request must carry `Authorization: Bearer <token>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

fn default_port() -> u16 {
    3141
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            api_token: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Only accept slots listed in the counsellor's weekly availability.
    #[serde(default)]
    pub enforce_availability: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Reject status changes outside the transition table.
    #[serde(default)]
    pub strict_transitions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionSeed {
    pub name: String,
    pub domain: String,
    #[serde(default = "default_languages")]
    pub supported_languages: Vec<String>,
}

fn default_languages() -> Vec<String> {
    vec!["en".into()]
}

impl Default for InstitutionSeed {
    fn default() -> Self {
        Self {
            name: "Default Institution".into(),
            domain: "example.edu".into(),
            supported_languages: default_languages(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    #[serde(default)]
    pub admin_emails: Vec<String>,
    #[serde(default)]
    pub counsellor_emails: Vec<String>,
    /// Created on demand when a user needs an institution and none exists.
    #[serde(default)]
    pub default_institution: InstitutionSeed,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub booking: BookingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl Config {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service: ServiceConfig {
                name: service_name.into(),
            },
            ..Default::default()
        }
    }

    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(CareError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        for email in &self.bootstrap.admin_emails {
            if !email.contains('@') {
                warnings.push(ConfigWarning::warning(format!(
                    "bootstrap.admin_emails entry '{email}' is not an email address"
                )));
            }
            if self
                .bootstrap
                .counsellor_emails
                .iter()
                .any(|c| c.eq_ignore_ascii_case(email))
            {
                warnings.push(ConfigWarning::warning(format!(
                    "'{email}' is listed as both admin and counsellor; admin wins"
                )));
            }
        }
        for email in &self.bootstrap.counsellor_emails {
            if !email.contains('@') {
                warnings.push(ConfigWarning::warning(format!(
                    "bootstrap.counsellor_emails entry '{email}' is not an email address"
                )));
            }
        }

        let seed = &self.bootstrap.default_institution;
        if seed.domain.trim().is_empty() || seed.domain.contains('@') {
            warnings.push(ConfigWarning::error(format!(
                "bootstrap.default_institution.domain '{}' is not a domain",
                seed.domain
            )));
        }

        if self.server.port == 0 {
            warnings.push(ConfigWarning::warning(
                "server.port is 0; the OS will pick a port",
            ));
        }
        if matches!(self.server.api_token.as_deref(), Some(t) if t.trim().is_empty()) {
            warnings.push(ConfigWarning::error(
                "server.api_token is set but empty; every request would be rejected",
            ));
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_are_permissive() {
        let cfg = Config::new("campus");
        assert_eq!(cfg.server.port, 3141);
        assert!(!cfg.booking.enforce_availability);
        assert!(!cfg.lifecycle.strict_transitions);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cfg = Config::new("campus");
        cfg.bootstrap.admin_emails.push("dean@campus.edu".into());
        cfg.lifecycle.strict_transitions = true;
        cfg.save(dir.path()).unwrap();

        let loaded = Config::load(dir.path()).unwrap();
        assert_eq!(loaded.service.name, "campus");
        assert_eq!(loaded.bootstrap.admin_emails, vec!["dean@campus.edu"]);
        assert!(loaded.lifecycle.strict_transitions);
    }

    #[test]
    fn load_without_init_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Config::load(dir.path()), Err(CareError::NotInitialized)));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = serde_yaml::from_str("service:\n  name: x\n").unwrap();
        assert_eq!(cfg.server.port, 3141);
        assert_eq!(cfg.bootstrap.default_institution.domain, "example.edu");
    }

    #[test]
    fn validate_flags_overlapping_bootstrap_lists() {
        let mut cfg = Config::default();
        cfg.bootstrap.admin_emails.push("a@x.edu".into());
        cfg.bootstrap.counsellor_emails.push("A@x.edu".into());
        let w = cfg.validate();
        assert_eq!(w.len(), 1);
        assert!(w[0].message.contains("both admin and counsellor"));
    }

    #[test]
    fn validate_rejects_empty_token() {
        let mut cfg = Config::default();
        cfg.server.api_token = Some(" ".into());
        let w = cfg.validate();
        assert!(w.iter().any(|w| w.level == WarnLevel::Error));
    }
}
