use crate::error::CareError;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Student,
    Counsellor,
    PeerVolunteer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Counsellor => "counsellor",
            Role::PeerVolunteer => "peer_volunteer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            "counsellor" => Ok(Role::Counsellor),
            "peer_volunteer" | "peer-volunteer" => Ok(Role::PeerVolunteer),
            _ => Err(CareError::InvalidRole(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// AppointmentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn all() -> &'static [AppointmentStatus] {
        &[
            AppointmentStatus::Pending,
            AppointmentStatus::Confirmed,
            AppointmentStatus::Completed,
            AppointmentStatus::Cancelled,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// A cancelled appointment releases its slot; every other status holds it.
    pub fn holds_slot(self) -> bool {
        !matches!(self, AppointmentStatus::Cancelled)
    }

    /// Whether the pre-session form may be edited in this status.
    pub fn is_upcoming(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }

    /// Transition table used when strict transitions are enabled.
    ///
    /// Re-asserting the current status is always legal. `completed` and
    /// `cancelled` are terminal: a completed appointment only returns to
    /// `pending` through an accepted follow-up, which bypasses this table.
    pub fn can_transition_to(self, target: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        if self == target {
            return true;
        }
        match self {
            Pending => matches!(target, Confirmed | Completed | Cancelled),
            Confirmed => matches!(target, Pending | Completed | Cancelled),
            Completed | Cancelled => false,
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(CareError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ScreeningTool
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreeningTool {
    Phq9,
    Gad7,
    Ghq,
}

impl ScreeningTool {
    pub fn all() -> &'static [ScreeningTool] {
        &[ScreeningTool::Phq9, ScreeningTool::Gad7, ScreeningTool::Ghq]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScreeningTool::Phq9 => "phq9",
            ScreeningTool::Gad7 => "gad7",
            ScreeningTool::Ghq => "ghq",
        }
    }

    /// Number of items the instrument asks, if fixed.
    pub fn item_count(self) -> Option<usize> {
        match self {
            ScreeningTool::Phq9 => Some(9),
            ScreeningTool::Gad7 => Some(7),
            ScreeningTool::Ghq => None,
        }
    }
}

impl fmt::Display for ScreeningTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScreeningTool {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "phq9" | "phq-9" => Ok(ScreeningTool::Phq9),
            "gad7" | "gad-7" => Ok(ScreeningTool::Gad7),
            "ghq" => Ok(ScreeningTool::Ghq),
            _ => Err(CareError::InvalidTool(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// RiskLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_parses_every_variant() {
        for status in AppointmentStatus::all() {
            assert_eq!(AppointmentStatus::from_str(status.as_str()).unwrap(), *status);
        }
        assert!(AppointmentStatus::from_str("rescheduled").is_err());
    }

    #[test]
    fn only_cancelled_releases_slot() {
        assert!(AppointmentStatus::Pending.holds_slot());
        assert!(AppointmentStatus::Completed.holds_slot());
        assert!(!AppointmentStatus::Cancelled.holds_slot());
    }

    #[test]
    fn terminal_statuses_reject_transitions() {
        use AppointmentStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Confirmed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Confirmed));
        assert!(Completed.can_transition_to(Completed));
    }

    #[test]
    fn role_accepts_hyphenated_peer_volunteer() {
        assert_eq!(Role::from_str("peer-volunteer").unwrap(), Role::PeerVolunteer);
        assert!(matches!(Role::from_str("root"), Err(CareError::InvalidRole(_))));
    }

    #[test]
    fn risk_levels_order_by_severity() {
        assert!(RiskLevel::Low < RiskLevel::Moderate);
        assert!(RiskLevel::Moderate < RiskLevel::High);
    }
}
