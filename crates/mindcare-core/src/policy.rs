//! Who may touch an appointment.
//!
//! Access is a pure function of the actor, the appointment, and the actor's
//! counsellor profile (if any). The profile lookup is the caller's job: a
//! counsellor's profile id differs from their user id, and appointments
//! reference the profile.

use crate::appointment::Appointment;
use crate::counsellor::Counsellor;
use crate::error::{CareError, Result};
use crate::store::Records;
use crate::types::Role;
use crate::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The caller of an operation, resolved by the transport from the identity
/// provider and passed explicitly into every operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub institution_id: Option<Uuid>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }

    pub fn is_counsellor(&self) -> bool {
        self.role == Some(Role::Counsellor)
    }

    pub fn require_admin(&self, what: &str) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CareError::unauthorized(format!("admin role required to {what}")))
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            institution_id: user.institution_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Access
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    OwnerStudent,
    OwnerCounsellor,
    Admin,
    None,
}

impl Access {
    /// Student owner, counsellor owner, or admin.
    pub fn is_participant(self) -> bool {
        !matches!(self, Access::None)
    }

    /// Counsellor owner or admin: may record session outcomes.
    pub fn can_manage(self) -> bool {
        matches!(self, Access::OwnerCounsellor | Access::Admin)
    }

    pub fn require_participant(self, what: &str) -> Result<Self> {
        if self.is_participant() {
            Ok(self)
        } else {
            Err(denied(what))
        }
    }

    pub fn require_manager(self, what: &str) -> Result<Self> {
        if self.can_manage() {
            Ok(self)
        } else {
            Err(denied(what))
        }
    }

    pub fn require_student(self, what: &str) -> Result<Self> {
        if self == Access::OwnerStudent {
            Ok(self)
        } else {
            Err(denied(what))
        }
    }
}

fn denied(what: &str) -> CareError {
    tracing::warn!(operation = what, "access denied");
    CareError::unauthorized(format!("not permitted to {what} on this appointment"))
}

/// Resolve the actor's relation to `appointment`.
///
/// Ownership wins over role: whoever booked the appointment is
/// `OwnerStudent` even after being promoted, unless they are now an admin.
/// `profile` must be the counsellor profile whose `user_id` is the actor, or
/// `None`.
pub fn resolve(actor: &Actor, appointment: &Appointment, profile: Option<&Counsellor>) -> Access {
    if actor.user_id == appointment.student_id && !actor.is_admin() {
        return Access::OwnerStudent;
    }
    if actor.is_counsellor() {
        if let Some(p) = profile {
            if p.user_id == actor.user_id && p.id == appointment.counsellor_id {
                return Access::OwnerCounsellor;
            }
        }
    }
    if actor.is_admin() {
        return Access::Admin;
    }
    Access::None
}

/// [`resolve`] with the actor's counsellor profile looked up in `records`.
pub fn access_in<R: Records + ?Sized>(
    records: &R,
    actor: &Actor,
    appointment: &Appointment,
) -> Result<Access> {
    let profile = if actor.is_counsellor() {
        records.counsellor_for_user(actor.user_id)?
    } else {
        None
    };
    Ok(resolve(actor, appointment, profile.as_ref()))
}
