//! Users, roles, counsellor profiles and institutions.

use crate::config::Config;
use crate::counsellor::{Availability, Counsellor};
use crate::error::{CareError, Result};
use crate::institution::Institution;
use crate::policy::Actor;
use crate::store::{Records, Store, StoreTx};
use crate::types::Role;
use crate::user::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCard {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserCard {
    fn from(u: &User) -> Self {
        Self {
            id: Some(u.id),
            name: u.name.clone().unwrap_or_default(),
            email: u.email.clone().unwrap_or_default(),
        }
    }
}

/// A counsellor profile with the owning user's contact details.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounsellorCard {
    #[serde(flatten)]
    pub profile: Counsellor,
    pub user: Option<UserCard>,
}

pub(crate) fn card<R: Records + ?Sized>(records: &R, profile: Counsellor) -> Result<CounsellorCard> {
    let user = records.user(profile.user_id)?.as_ref().map(UserCard::from);
    Ok(CounsellorCard { profile, user })
}

// ---------------------------------------------------------------------------
// Institutions
// ---------------------------------------------------------------------------

/// Make sure `user` belongs to an institution and return its id.
///
/// Tries the institution matching the user's email domain, then the first
/// institution on record, then creates the configured default. The user is
/// saved when it changes.
pub fn ensure_institution(tx: &StoreTx, cfg: &Config, user: &mut User) -> Result<Uuid> {
    if let Some(id) = user.institution_id {
        return Ok(id);
    }
    let by_domain = match user.email_domain() {
        Some(domain) => tx.institution_by_domain(domain)?,
        None => None,
    };
    let id = match by_domain {
        Some(inst) => inst.id,
        None => fallback_institution(tx, cfg)?,
    };
    user.institution_id = Some(id);
    tx.put_user(user)?;
    tracing::debug!(user = %user.id, institution = %id, "assigned institution");
    Ok(id)
}

fn fallback_institution(tx: &StoreTx, cfg: &Config) -> Result<Uuid> {
    if let Some(first) = tx.institutions()?.into_iter().next() {
        return Ok(first.id);
    }
    let seed = &cfg.bootstrap.default_institution;
    let inst = Institution::new(&seed.name, &seed.domain, seed.supported_languages.clone());
    tx.put_institution(&inst)?;
    tracing::info!(institution = %inst.id, domain = %inst.domain, "created default institution");
    Ok(inst.id)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInstitution {
    pub name: String,
    pub domain: String,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub primary_color: Option<String>,
}

pub fn create_institution(store: &Store, actor: &Actor, req: NewInstitution) -> Result<Institution> {
    actor.require_admin("create institutions")?;
    if req.name.trim().is_empty() {
        return Err(CareError::Validation("institution name is empty".into()));
    }
    let domain = req.domain.trim().trim_start_matches('@').to_string();
    if domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err(CareError::Validation(format!("invalid domain '{}'", req.domain)));
    }

    let mut inst = Institution::new(req.name.trim(), domain, req.supported_languages);
    inst.settings.primary_color = req.primary_color;
    store.write(|tx| tx.put_institution(&inst))?;
    tracing::info!(institution = %inst.id, domain = %inst.domain, "institution created");
    Ok(inst)
}

pub fn list_institutions(store: &Store, actor: &Actor) -> Result<Vec<Institution>> {
    actor.require_admin("list institutions")?;
    store.snapshot()?.institutions()
}

pub fn institution_by_domain(store: &Store, domain: &str) -> Result<Option<Institution>> {
    store.snapshot()?.institution_by_domain(domain)
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Create an account record, as the identity provider would on first sign-in.
pub fn register_user(store: &Store, name: Option<String>, email: Option<String>) -> Result<User> {
    let user = User::new(name, email);
    store.write(|tx| {
        if let Some(email) = user.email.as_deref() {
            if !email.contains('@') {
                return Err(CareError::Validation(format!("invalid email '{email}'")));
            }
            if tx.user_by_email(email)?.is_some() {
                return Err(CareError::Validation(format!("email already registered: {email}")));
            }
        }
        tx.put_user(&user)
    })?;
    tracing::info!(user = %user.id, "user registered");
    Ok(user)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapOutcome {
    pub changed: bool,
    pub role: Option<Role>,
    pub institution_id: Uuid,
}

/// First-login bootstrap: assign an institution and a starting role.
///
/// Emails in `bootstrap.admin_emails` become admins and emails in
/// `bootstrap.counsellor_emails` become counsellors with a profile. Anyone
/// else without a role becomes a student. Existing roles of other users are
/// left alone.
pub fn ensure_initial_roles(store: &Store, cfg: &Config, actor: &Actor) -> Result<BootstrapOutcome> {
    store.write(|tx| {
        let mut user = tx.require_user(actor.user_id)?;
        let institution_id = ensure_institution(tx, cfg, &mut user)?;

        let wanted = if user.has_email(&cfg.bootstrap.admin_emails) {
            Some(Role::Admin)
        } else if user.has_email(&cfg.bootstrap.counsellor_emails) {
            Some(Role::Counsellor)
        } else if user.role.is_none() {
            Some(Role::Student)
        } else {
            None
        };

        let changed = match wanted {
            Some(role) if user.role != Some(role) => {
                user.role = Some(role);
                tx.put_user(&user)?;
                tracing::info!(user = %user.id, %role, "initial role assigned");
                true
            }
            _ => false,
        };
        if user.role == Some(Role::Counsellor) {
            ensure_profile(tx, cfg, &user, None)?;
        }

        Ok(BootstrapOutcome {
            changed,
            role: user.role,
            institution_id,
        })
    })
}

fn ensure_profile(tx: &StoreTx, cfg: &Config, user: &User, fallback: Option<Uuid>) -> Result<Counsellor> {
    if let Some(existing) = tx.counsellor_for_user(user.id)? {
        return Ok(existing);
    }
    let institution_id = match user.institution_id.or(fallback) {
        Some(id) => id,
        None => fallback_institution(tx, cfg)?,
    };
    let profile = Counsellor::new(user.id, institution_id);
    tx.put_counsellor(&profile)?;
    tracing::info!(user = %user.id, counsellor = %profile.id, "counsellor profile created");
    Ok(profile)
}

/// Change a user's role. Promoting to counsellor creates an empty profile
/// when the user has none.
pub fn set_role(store: &Store, cfg: &Config, actor: &Actor, user_id: Uuid, role: Role) -> Result<User> {
    actor.require_admin("change user roles")?;
    store.write(|tx| {
        let mut user = tx.require_user(user_id)?;
        let previous = user.role;
        user.role = Some(role);
        tx.put_user(&user)?;
        if role == Role::Counsellor {
            ensure_profile(tx, cfg, &user, actor.institution_id)?;
        }
        tracing::info!(user = %user_id, from = ?previous, to = %role, "role changed");
        Ok(user)
    })
}

pub fn list_users(store: &Store, actor: &Actor) -> Result<Vec<User>> {
    actor.require_admin("list users")?;
    store.snapshot()?.users()
}

pub fn has_admin(store: &Store) -> Result<bool> {
    Ok(store
        .snapshot()?
        .users()?
        .iter()
        .any(|u| u.role == Some(Role::Admin)))
}

/// Delete a user together with their counsellor profile and every
/// appointment they are part of. Admins cannot remove themselves.
pub fn remove_user(store: &Store, actor: &Actor, user_id: Uuid) -> Result<()> {
    actor.require_admin("remove users")?;
    if actor.user_id == user_id {
        return Err(CareError::Validation("cannot remove yourself".into()));
    }
    store.write(|tx| {
        tx.require_user(user_id)?;
        let mut removed = 0usize;
        if let Some(profile) = tx.counsellor_for_user(user_id)? {
            for appt in tx.appointments_for_counsellor(profile.id)? {
                tx.delete_appointment(&appt)?;
                removed += 1;
            }
            tx.delete_counsellor(&profile)?;
        }
        for appt in tx.appointments_for_student(user_id)? {
            tx.delete_appointment(&appt)?;
            removed += 1;
        }
        tx.delete_user(user_id)?;
        tracing::info!(user = %user_id, appointments = removed, "user removed");
        Ok(())
    })
}

// ---------------------------------------------------------------------------
// Counsellors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCounsellor {
    pub user_id: Uuid,
    pub institution_id: Uuid,
    #[serde(default)]
    pub specialization: Vec<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub qualifications: Option<String>,
    #[serde(default)]
    pub availability: Availability,
}

pub fn create_counsellor(store: &Store, actor: &Actor, req: NewCounsellor) -> Result<Counsellor> {
    if !actor.is_admin() && !actor.is_counsellor() {
        return Err(CareError::unauthorized("only admins and counsellors can create profiles"));
    }
    req.availability.validate()?;

    store.write(|tx| {
        tx.require_user(req.user_id)?;
        if tx.institution(req.institution_id)?.is_none() {
            return Err(CareError::InstitutionNotFound(req.institution_id.to_string()));
        }
        if tx.counsellor_for_user(req.user_id)?.is_some() {
            return Err(CareError::Validation(format!(
                "user {} already has a counsellor profile",
                req.user_id
            )));
        }
        let mut profile = Counsellor::new(req.user_id, req.institution_id);
        profile.specialization = req.specialization;
        profile.bio = req.bio;
        profile.qualifications = req.qualifications;
        profile.availability = req.availability;
        tx.put_counsellor(&profile)?;
        tracing::info!(counsellor = %profile.id, user = %profile.user_id, "counsellor profile created");
        Ok(profile)
    })
}

/// Replace a counsellor's weekly availability. Admins, or the counsellor
/// themselves.
pub fn update_availability(
    store: &Store,
    actor: &Actor,
    counsellor_id: Uuid,
    availability: Availability,
) -> Result<Counsellor> {
    availability.validate()?;
    store.write(|tx| {
        let mut profile = tx.require_counsellor(counsellor_id)?;
        if !actor.is_admin() && profile.user_id != actor.user_id {
            return Err(CareError::unauthorized("only the counsellor or an admin can change availability"));
        }
        profile.availability = availability;
        tx.put_counsellor(&profile)?;
        tracing::info!(counsellor = %counsellor_id, "availability updated");
        Ok(profile)
    })
}

/// Active counsellors of the actor's institution, or of the first
/// institution when the actor has none yet.
pub fn list_counsellors(store: &Store, actor: &Actor) -> Result<Vec<CounsellorCard>> {
    let snap = store.snapshot()?;
    let institution_id = match actor.institution_id {
        Some(id) => id,
        None => match snap.institutions()?.into_iter().next() {
            Some(first) => first.id,
            None => return Ok(Vec::new()),
        },
    };

    snap.counsellors()?
        .into_iter()
        .filter(|c| c.is_active && c.institution_id == institution_id)
        .map(|c| card(&snap, c))
        .collect()
}

pub fn get_counsellor(store: &Store, counsellor_id: Uuid) -> Result<CounsellorCard> {
    let snap = store.snapshot()?;
    let profile = snap.require_counsellor(counsellor_id)?;
    card(&snap, profile)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::NewAppointment;
    use crate::booking;
    use crate::testutil::Fixture;
    use chrono::Weekday;

    #[test]
    fn bootstrap_assigns_roles_from_config() {
        let mut fx = Fixture::new();
        fx.config.bootstrap.admin_emails = vec!["dean@uni.edu".into()];
        fx.config.bootstrap.counsellor_emails = vec!["rao@uni.edu".into()];

        let dean = Actor::from(&register_user(&fx.store, None, Some("Dean@uni.edu".into())).unwrap());
        let rao = Actor::from(&register_user(&fx.store, None, Some("rao@uni.edu".into())).unwrap());
        let asha = Actor::from(&register_user(&fx.store, None, Some("asha@uni.edu".into())).unwrap());

        let out = ensure_initial_roles(&fx.store, &fx.config, &dean).unwrap();
        assert_eq!(out.role, Some(Role::Admin));
        assert!(out.changed);
        assert_eq!(out.institution_id, fx.institution.id);

        assert_eq!(
            ensure_initial_roles(&fx.store, &fx.config, &rao).unwrap().role,
            Some(Role::Counsellor)
        );
        let snap = fx.store.snapshot().unwrap();
        assert!(snap.counsellor_for_user(rao.user_id).unwrap().is_some());

        let first = ensure_initial_roles(&fx.store, &fx.config, &asha).unwrap();
        assert_eq!(first.role, Some(Role::Student));
        let again = ensure_initial_roles(&fx.store, &fx.config, &asha).unwrap();
        assert!(!again.changed);
        assert!(has_admin(&fx.store).unwrap());
    }

    #[test]
    fn bootstrap_keeps_promoted_roles() {
        let fx = Fixture::new();
        let admin = fx.user(Role::Admin, "dean@uni.edu");
        let peer = fx.user(Role::PeerVolunteer, "peer@uni.edu");
        let out = ensure_initial_roles(&fx.store, &fx.config, &peer).unwrap();
        assert_eq!(out.role, Some(Role::PeerVolunteer));
        assert!(!out.changed);
        assert!(list_users(&fx.store, &admin).unwrap().len() >= 2);
    }

    #[test]
    fn unknown_domain_falls_back_to_first_institution() {
        let fx = Fixture::new();
        let u = Actor::from(&register_user(&fx.store, None, Some("x@elsewhere.org".into())).unwrap());
        let out = ensure_initial_roles(&fx.store, &fx.config, &u).unwrap();
        assert_eq!(out.institution_id, fx.institution.id);
    }

    #[test]
    fn default_institution_created_when_none_exist() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = Store::open(&dir.path().join("db.redb")).unwrap();
        let cfg = Config::default();
        let u = Actor::from(&register_user(&store, None, Some("x@y.org".into())).unwrap());
        let out = ensure_initial_roles(&store, &cfg, &u).unwrap();
        let inst = store.snapshot().unwrap().institution(out.institution_id).unwrap().unwrap();
        assert_eq!(inst.domain, "example.edu");
    }

    #[test]
    fn set_role_requires_admin_and_creates_profile() {
        let fx = Fixture::new();
        let admin = fx.user(Role::Admin, "dean@uni.edu");
        let student = fx.user(Role::Student, "asha@uni.edu");

        assert!(matches!(
            set_role(&fx.store, &fx.config, &student, student.user_id, Role::Admin),
            Err(CareError::Unauthorized(_))
        ));
        let user = set_role(&fx.store, &fx.config, &admin, student.user_id, Role::Counsellor).unwrap();
        assert_eq!(user.role, Some(Role::Counsellor));
        let profile = fx.store.snapshot().unwrap().counsellor_for_user(user.id).unwrap().unwrap();
        assert_eq!(profile.institution_id, fx.institution.id);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let fx = Fixture::new();
        register_user(&fx.store, None, Some("a@uni.edu".into())).unwrap();
        assert!(matches!(
            register_user(&fx.store, None, Some("A@uni.edu".into())),
            Err(CareError::Validation(_))
        ));
    }

    #[test]
    fn availability_is_owner_or_admin() {
        let fx = Fixture::new();
        let (counsellor, profile) = fx.counsellor("rao@uni.edu");
        let (other, _) = fx.counsellor("lee@uni.edu");
        let mut week = Availability::default();
        week.set_day(Weekday::Tue, vec!["14:00".into()]).unwrap();

        assert!(update_availability(&fx.store, &other, profile.id, week.clone()).is_err());
        let updated = update_availability(&fx.store, &counsellor, profile.id, week).unwrap();
        assert_eq!(updated.availability.tuesday, vec!["14:00"]);

        let listed = list_counsellors(&fx.store, &other).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|c| c.user.is_some()));
    }

    #[test]
    fn create_counsellor_checks_role_and_duplicates() {
        let fx = Fixture::new();
        let admin = fx.user(Role::Admin, "dean@uni.edu");
        let student = fx.user(Role::Student, "asha@uni.edu");
        let target = fx.user(Role::Counsellor, "new@uni.edu");
        let req = || NewCounsellor {
            user_id: target.user_id,
            institution_id: fx.institution.id,
            specialization: vec!["anxiety".into()],
            bio: None,
            qualifications: None,
            availability: Availability::default(),
        };

        assert!(matches!(
            create_counsellor(&fx.store, &student, req()),
            Err(CareError::Unauthorized(_))
        ));
        let c = create_counsellor(&fx.store, &admin, req()).unwrap();
        assert_eq!(c.specialization, vec!["anxiety"]);
        assert!(create_counsellor(&fx.store, &admin, req()).is_err());
        assert_eq!(get_counsellor(&fx.store, c.id).unwrap().profile.id, c.id);
    }

    #[test]
    fn institutions_are_admin_managed() {
        let fx = Fixture::new();
        let admin = fx.user(Role::Admin, "dean@uni.edu");
        let student = fx.user(Role::Student, "asha@uni.edu");
        let req = |domain: &str| NewInstitution {
            name: "College".into(),
            domain: domain.into(),
            supported_languages: vec!["en".into(), "hi".into()],
            primary_color: Some("#336699".into()),
        };

        assert!(create_institution(&fx.store, &student, req("college.edu")).is_err());
        assert!(matches!(
            create_institution(&fx.store, &admin, req("not a domain")),
            Err(CareError::Validation(_))
        ));
        let inst = create_institution(&fx.store, &admin, req("College.edu")).unwrap();
        assert_eq!(inst.settings.primary_color.as_deref(), Some("#336699"));
        assert!(matches!(
            create_institution(&fx.store, &admin, req("college.edu")),
            Err(CareError::InstitutionExists(_))
        ));
        assert_eq!(list_institutions(&fx.store, &admin).unwrap().len(), 2);
        assert!(institution_by_domain(&fx.store, "college.edu").unwrap().is_some());
    }

    #[test]
    fn removing_a_counsellor_drops_their_appointments() {
        let fx = Fixture::new();
        let admin = fx.user(Role::Admin, "dean@uni.edu");
        let (counsellor, profile) = fx.counsellor("rao@uni.edu");
        let student = fx.user(Role::Student, "asha@uni.edu");
        let appt = booking::create_appointment(
            &fx.store,
            &fx.config,
            &student,
            NewAppointment {
                counsellor_id: profile.id,
                scheduled_date: "2099-01-05".into(),
                time_slot: "10:00".into(),
                notes: None,
                is_anonymous: false,
            },
        )
        .unwrap();

        assert!(remove_user(&fx.store, &admin, admin.user_id).is_err());
        remove_user(&fx.store, &admin, counsellor.user_id).unwrap();

        let snap = fx.store.snapshot().unwrap();
        assert!(snap.user(counsellor.user_id).unwrap().is_none());
        assert!(snap.counsellor(profile.id).unwrap().is_none());
        assert!(snap.appointment(appt.id).unwrap().is_none());
        assert!(snap.appointments_for_student(student.user_id).unwrap().is_empty());
    }
}
