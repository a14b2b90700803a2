//! Booking: creating appointments and the read views over them.

use crate::appointment::{Appointment, NewAppointment};
use crate::config::Config;
use crate::counsellor::Counsellor;
use crate::directory::{self, CounsellorCard, UserCard};
use crate::error::{CareError, Result};
use crate::policy::{self, Actor};
use crate::schedule;
use crate::screening::ScreeningResult;
use crate::store::{Records, Store};
use crate::types::Role;
use serde::Serialize;
use uuid::Uuid;

/// How many earlier sessions a counsellor sees next to each booking.
pub const PREVIOUS_SESSIONS: usize = 5;

const ANONYMOUS_NAME: &str = "Anonymous Student";
const ANONYMOUS_EMAIL: &str = "anonymous@student.com";

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Book a slot for the actor.
///
/// A user without a role becomes a student on their first booking. The
/// slot check and insert share one write transaction.
pub fn create_appointment(
    store: &Store,
    cfg: &Config,
    actor: &Actor,
    req: NewAppointment,
) -> Result<Appointment> {
    req.validate()?;

    store.write(|tx| {
        let mut student = tx.require_user(actor.user_id)?;
        match student.role {
            None => {
                student.role = Some(Role::Student);
                tx.put_user(&student)?;
                tracing::info!(user = %student.id, "first booking, role set to student");
            }
            Some(Role::Student) => {}
            Some(other) => {
                return Err(CareError::unauthorized(format!(
                    "only students can book appointments (role is {other})"
                )));
            }
        }

        let counsellor = tx.require_counsellor(req.counsellor_id)?;
        if cfg.booking.enforce_availability {
            check_availability(&counsellor, &req.scheduled_date, &req.time_slot)?;
        }

        let appt = Appointment::new(student.id, &counsellor, req);
        tx.save_appointment(&appt)?;
        tracing::info!(
            appointment = %appt.id,
            counsellor = %appt.counsellor_id,
            date = %appt.scheduled_date,
            slot = %appt.time_slot,
            "appointment booked"
        );
        Ok(appt)
    })
}

fn check_availability(counsellor: &Counsellor, date: &str, slot: &str) -> Result<()> {
    if !counsellor.is_active {
        return Err(CareError::Validation(format!(
            "counsellor {} is not taking bookings",
            counsellor.id
        )));
    }
    let day = schedule::weekday_of(date)?;
    if !counsellor.availability.offers(day, slot.trim()) {
        return Err(CareError::Validation(format!(
            "counsellor does not offer {slot} on {day}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// A student's booking with the counsellor it is with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub counsellor: Option<CounsellorCard>,
}

/// A booking as its counsellor sees it: the student (masked when the
/// booking is anonymous), their screening history newest first, and their
/// most recent other sessions.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounsellorAppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub student: Option<UserCard>,
    pub screenings: Vec<ScreeningResult>,
    pub previous_sessions: Vec<Appointment>,
}

fn newest_first(appts: &mut [Appointment]) {
    appts.sort_by(|a, b| {
        (b.scheduled_date.as_str(), b.time_slot.as_str())
            .cmp(&(a.scheduled_date.as_str(), a.time_slot.as_str()))
    });
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn list_for_student(store: &Store, actor: &Actor) -> Result<Vec<StudentAppointmentView>> {
    let snap = store.snapshot()?;
    let mut appts = snap.appointments_for_student(actor.user_id)?;
    newest_first(&mut appts);

    appts
        .into_iter()
        .map(|appointment| {
            let counsellor = match snap.counsellor(appointment.counsellor_id)? {
                Some(profile) => Some(directory::card(&snap, profile)?),
                None => None,
            };
            Ok(StudentAppointmentView {
                appointment,
                counsellor,
            })
        })
        .collect()
}

pub fn list_for_counsellor(store: &Store, actor: &Actor) -> Result<Vec<CounsellorAppointmentView>> {
    if !actor.is_counsellor() {
        return Err(CareError::unauthorized("only counsellors have a caseload"));
    }
    let snap = store.snapshot()?;
    let profile = snap
        .counsellor_for_user(actor.user_id)?
        .ok_or_else(|| CareError::CounsellorProfileMissing(actor.user_id.to_string()))?;

    let mut appts = snap.appointments_for_counsellor(profile.id)?;
    newest_first(&mut appts);

    appts
        .into_iter()
        .map(|appointment| {
            let student = if appointment.is_anonymous {
                Some(UserCard {
                    id: None,
                    name: ANONYMOUS_NAME.into(),
                    email: ANONYMOUS_EMAIL.into(),
                })
            } else {
                snap.user(appointment.student_id)?.as_ref().map(UserCard::from)
            };

            let mut screenings = snap.screenings_for_user(appointment.student_id)?;
            screenings.reverse();

            let mut previous: Vec<Appointment> = snap
                .appointments_for_student(appointment.student_id)?
                .into_iter()
                .filter(|a| a.id != appointment.id)
                .collect();
            previous.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            previous.truncate(PREVIOUS_SESSIONS);

            Ok(CounsellorAppointmentView {
                appointment,
                student,
                screenings,
                previous_sessions: previous,
            })
        })
        .collect()
}

/// One appointment, for anyone with access to it.
pub fn get(store: &Store, actor: &Actor, appointment_id: Uuid) -> Result<Appointment> {
    let snap = store.snapshot()?;
    let appt = snap.require_appointment(appointment_id)?;
    policy::access_in(&snap, actor, &appt)?.require_participant("view")?;
    Ok(appt)
}

/// Live bookings of a counsellor on `date`. Visible to admins and to users
/// of the counsellor's institution.
pub fn booked_slots(
    store: &Store,
    actor: &Actor,
    counsellor_id: Uuid,
    date: &str,
) -> Result<Vec<Appointment>> {
    schedule::parse_date(date)?;
    let snap = store.snapshot()?;
    let counsellor = snap.require_counsellor(counsellor_id)?;
    if !actor.is_admin() && actor.institution_id != Some(counsellor.institution_id) {
        return Err(CareError::unauthorized(
            "booked slots are visible within the counsellor's institution only",
        ));
    }
    snap.booked_on(counsellor_id, date.trim())
}

/// The counsellor's offered slots on `date` that nobody holds yet.
pub fn open_slots(
    store: &Store,
    actor: &Actor,
    counsellor_id: Uuid,
    date: &str,
) -> Result<Vec<String>> {
    let booked = booked_slots(store, actor, counsellor_id, date)?;
    let counsellor = store.snapshot()?.require_counsellor(counsellor_id)?;
    let day = schedule::weekday_of(date)?;

    Ok(counsellor
        .availability
        .slots(day)
        .iter()
        .filter(|slot| !booked.iter().any(|a| &a.time_slot == *slot))
        .cloned()
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle;
    use crate::testutil::Fixture;
    use chrono::Weekday;

    fn request(counsellor: &Counsellor, date: &str, slot: &str) -> NewAppointment {
        NewAppointment {
            counsellor_id: counsellor.id,
            scheduled_date: date.into(),
            time_slot: slot.into(),
            notes: Some("exam stress".into()),
            is_anonymous: false,
        }
    }

    #[test]
    fn second_booking_of_same_slot_conflicts() {
        let fx = Fixture::new();
        let (_, c) = fx.counsellor("rao@uni.edu");
        let a = fx.user(Role::Student, "a@uni.edu");
        let b = fx.user(Role::Student, "b@uni.edu");

        create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-07", "10:00")).unwrap();
        let err = create_appointment(&fx.store, &fx.config, &b, request(&c, "2030-01-07", "10:00"))
            .unwrap_err();
        assert!(matches!(err, CareError::SlotTaken { .. }));
        assert!(err.to_string().contains("already booked"));

        // a different slot is fine
        create_appointment(&fx.store, &fx.config, &b, request(&c, "2030-01-07", "11:00")).unwrap();
    }

    #[test]
    fn cancelling_frees_the_slot() {
        let fx = Fixture::new();
        let (_, c) = fx.counsellor("rao@uni.edu");
        let a = fx.user(Role::Student, "a@uni.edu");
        let b = fx.user(Role::Student, "b@uni.edu");

        let first =
            create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-07", "10:00")).unwrap();
        lifecycle::cancel(&fx.store, &a, first.id).unwrap();
        let second =
            create_appointment(&fx.store, &fx.config, &b, request(&c, "2030-01-07", "10:00")).unwrap();
        assert_eq!(second.status, crate::types::AppointmentStatus::Pending);
    }

    #[test]
    fn first_booking_promotes_roleless_user() {
        let fx = Fixture::new();
        let (_, c) = fx.counsellor("rao@uni.edu");
        let newcomer = fx.newcomer("new@uni.edu");

        let appt =
            create_appointment(&fx.store, &fx.config, &newcomer, request(&c, "2030-01-07", "10:00"))
                .unwrap();
        assert_eq!(appt.institution_id, c.institution_id);
        let stored = fx.store.snapshot().unwrap().require_user(newcomer.user_id).unwrap();
        assert_eq!(stored.role, Some(Role::Student));
    }

    #[test]
    fn non_students_cannot_book() {
        let fx = Fixture::new();
        let (counsellor, c) = fx.counsellor("rao@uni.edu");
        let err = create_appointment(&fx.store, &fx.config, &counsellor, request(&c, "2030-01-07", "10:00"))
            .unwrap_err();
        assert!(matches!(err, CareError::Unauthorized(_)));
    }

    #[test]
    fn unknown_counsellor_and_bad_input() {
        let fx = Fixture::new();
        let a = fx.user(Role::Student, "a@uni.edu");
        let ghost = Counsellor::new(a.user_id, fx.institution.id);
        assert!(matches!(
            create_appointment(&fx.store, &fx.config, &a, request(&ghost, "2030-01-07", "10:00")),
            Err(CareError::CounsellorNotFound(_))
        ));
        assert!(matches!(
            create_appointment(&fx.store, &fx.config, &a, request(&ghost, "07/01/2030", "10:00")),
            Err(CareError::Validation(_))
        ));
    }

    #[test]
    fn enforced_availability_rejects_unlisted_slot() {
        let mut fx = Fixture::new();
        fx.config.booking.enforce_availability = true;
        let (_, mut c) = fx.counsellor("rao@uni.edu");
        c.availability.set_day(Weekday::Mon, vec!["10:00".into()]).unwrap();
        fx.store.write(|tx| tx.put_counsellor(&c)).unwrap();
        let a = fx.user(Role::Student, "a@uni.edu");

        // 2030-01-07 is a Monday
        assert!(matches!(
            create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-07", "11:00")),
            Err(CareError::Validation(_))
        ));
        create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-07", "10:00")).unwrap();
    }

    #[test]
    fn counsellor_view_masks_anonymous_students() {
        let fx = Fixture::new();
        let (counsellor, c) = fx.counsellor("rao@uni.edu");
        let a = fx.user(Role::Student, "a@uni.edu");
        let mut req = request(&c, "2030-01-07", "10:00");
        req.is_anonymous = true;
        create_appointment(&fx.store, &fx.config, &a, req).unwrap();
        create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-08", "10:00")).unwrap();

        let views = list_for_counsellor(&fx.store, &counsellor).unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].appointment.scheduled_date, "2030-01-08");
        assert_eq!(views[0].student.as_ref().map(|s| s.name.as_str()), Some("a"));
        let anon = views[1].student.as_ref().unwrap();
        assert_eq!(anon.name, ANONYMOUS_NAME);
        assert!(anon.id.is_none());
        assert_eq!(views[1].previous_sessions.len(), 1);

        let mine = list_for_student(&fx.store, &a).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine[0].counsellor.is_some());
    }

    #[test]
    fn counsellor_listing_requires_profile() {
        let fx = Fixture::new();
        let bare = fx.user(Role::Counsellor, "bare@uni.edu");
        assert!(matches!(
            list_for_counsellor(&fx.store, &bare),
            Err(CareError::CounsellorProfileMissing(_))
        ));
        let student = fx.user(Role::Student, "a@uni.edu");
        assert!(list_for_counsellor(&fx.store, &student).is_err());
    }

    #[test]
    fn open_slots_subtract_bookings() {
        let fx = Fixture::new();
        let (_, mut c) = fx.counsellor("rao@uni.edu");
        c.availability
            .set_day(Weekday::Mon, vec!["09:00".into(), "10:00".into()])
            .unwrap();
        fx.store.write(|tx| tx.put_counsellor(&c)).unwrap();
        let a = fx.user(Role::Student, "a@uni.edu");
        create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-07", "10:00")).unwrap();

        assert_eq!(open_slots(&fx.store, &a, c.id, "2030-01-07").unwrap(), vec!["09:00"]);
        assert_eq!(booked_slots(&fx.store, &a, c.id, "2030-01-07").unwrap().len(), 1);
    }

    #[test]
    fn get_is_limited_to_participants() {
        let fx = Fixture::new();
        let (counsellor, c) = fx.counsellor("rao@uni.edu");
        let a = fx.user(Role::Student, "a@uni.edu");
        let other = fx.user(Role::Student, "b@uni.edu");
        let appt =
            create_appointment(&fx.store, &fx.config, &a, request(&c, "2030-01-07", "10:00")).unwrap();

        assert!(get(&fx.store, &a, appt.id).is_ok());
        assert!(get(&fx.store, &counsellor, appt.id).is_ok());
        assert!(matches!(get(&fx.store, &other, appt.id), Err(CareError::Unauthorized(_))));
        assert!(matches!(
            get(&fx.store, &a, Uuid::new_v4()),
            Err(CareError::AppointmentNotFound(_))
        ));
    }
}
