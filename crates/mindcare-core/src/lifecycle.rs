//! Session lifecycle: status changes, the pre-session form, session results
//! and the follow-up negotiation.
//!
//! Each operation loads the appointment, resolves the actor's access and
//! applies one transition inside a single write transaction.

use crate::appointment::{Appointment, FollowUp, FollowUpTerms, SessionResult};
use crate::config::Config;
use crate::error::{CareError, Result};
use crate::policy::{self, Access, Actor};
use crate::screening::ScreeningSummary;
use crate::store::{Records, Store, StoreTx};
use crate::types::AppointmentStatus;
use chrono::{Local, NaiveDateTime, Utc};
use uuid::Uuid;

fn load(tx: &StoreTx, actor: &Actor, id: Uuid) -> Result<(Appointment, Access)> {
    let appt = tx.require_appointment(id)?;
    let access = policy::access_in(tx, actor, &appt)?;
    Ok((appt, access))
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

pub fn update_status(
    store: &Store,
    cfg: &Config,
    actor: &Actor,
    id: Uuid,
    status: AppointmentStatus,
) -> Result<Appointment> {
    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_participant("change status")?;
        let from = appt.status;
        appt.set_status(status, cfg.lifecycle.strict_transitions)?;
        tx.save_appointment(&appt)?;
        tracing::info!(appointment = %id, %from, to = %status, "status updated");
        Ok(appt)
    })
}

pub fn cancel(store: &Store, actor: &Actor, id: Uuid) -> Result<Appointment> {
    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_participant("cancel")?;
        appt.status = AppointmentStatus::Cancelled;
        tx.save_appointment(&appt)?;
        tracing::info!(appointment = %id, by = %actor.user_id, "appointment cancelled");
        Ok(appt)
    })
}

// ---------------------------------------------------------------------------
// Pre-session form
// ---------------------------------------------------------------------------

pub fn submit_pre_session_form(
    store: &Store,
    actor: &Actor,
    id: Uuid,
    general_queries: String,
) -> Result<Appointment> {
    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_student("fill in the pre-session form")?;
        appt.set_pre_session_form(general_queries, local_now())?;
        tx.save_appointment(&appt)?;
        Ok(appt)
    })
}

pub fn clear_pre_session_form(store: &Store, actor: &Actor, id: Uuid) -> Result<Appointment> {
    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_student("clear the pre-session form")?;
        appt.clear_pre_session_form(local_now())?;
        tx.save_appointment(&appt)?;
        Ok(appt)
    })
}

// ---------------------------------------------------------------------------
// Session result
// ---------------------------------------------------------------------------

/// Record the outcome of a session and mark it completed.
///
/// The student's most recent screening is copied onto the appointment. A
/// follow-up proposal in `result` opens a negotiation the student answers
/// with [`accept_follow_up`] or [`reject_follow_up`].
pub fn add_session_result(
    store: &Store,
    actor: &Actor,
    id: Uuid,
    result: SessionResult,
) -> Result<Appointment> {
    if let Some(FollowUp::Proposal(terms)) = &result.follow_up {
        terms.validate()?;
    }

    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_manager("record a session result")?;

        let summary = tx
            .latest_screening(appt.student_id)?
            .as_ref()
            .map(ScreeningSummary::from);
        appt.record_session_result(actor, result, summary, Utc::now());
        tx.save_appointment(&appt)?;
        tracing::info!(
            appointment = %id,
            audit_entries = appt.session_audit.len(),
            "session result recorded"
        );
        Ok(appt)
    })
}

// ---------------------------------------------------------------------------
// Follow-up negotiation
// ---------------------------------------------------------------------------

/// Propose a follow-up on a completed appointment, replacing any earlier
/// proposal.
pub fn propose_follow_up(
    store: &Store,
    actor: &Actor,
    id: Uuid,
    terms: FollowUpTerms,
) -> Result<Appointment> {
    terms.validate()?;

    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_manager("propose a follow-up")?;
        if appt.status != AppointmentStatus::Completed {
            return Err(CareError::invalid_state(format!(
                "follow-ups are proposed on completed appointments, this one is {}",
                appt.status
            )));
        }
        if appt.proposed_follow_up.as_ref().is_some_and(|p| p.accepted.is_none()) {
            tracing::debug!(appointment = %id, "replacing undecided follow-up proposal");
        }
        appt.propose_follow_up(actor, terms, Utc::now());
        tx.save_appointment(&appt)?;
        tracing::info!(appointment = %id, "follow-up proposed");
        Ok(appt)
    })
}

/// Accept the outstanding proposal. The appointment moves to the proposed
/// date and slot; that fails with `SlotTaken` if someone else holds it.
pub fn accept_follow_up(store: &Store, actor: &Actor, id: Uuid) -> Result<Appointment> {
    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_student("accept a follow-up")?;
        appt.accept_follow_up(actor.user_id, Utc::now())?;
        tx.save_appointment(&appt)?;
        tracing::info!(
            appointment = %id,
            date = %appt.scheduled_date,
            slot = %appt.time_slot,
            "follow-up accepted"
        );
        Ok(appt)
    })
}

pub fn reject_follow_up(
    store: &Store,
    actor: &Actor,
    id: Uuid,
    reason: Option<String>,
) -> Result<Appointment> {
    store.write(|tx| {
        let (mut appt, access) = load(tx, actor, id)?;
        access.require_student("reject a follow-up")?;
        appt.reject_follow_up(actor.user_id, reason, Utc::now())?;
        tx.save_appointment(&appt)?;
        tracing::info!(appointment = %id, "follow-up rejected");
        Ok(appt)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::{AuditAction, NewAppointment};
    use crate::booking;
    use crate::counsellor::Counsellor;
    use crate::screening;
    use crate::testutil::Fixture;
    use crate::types::{Role, ScreeningTool};

    struct Scene {
        fx: Fixture,
        student: Actor,
        counsellor: Actor,
        profile: Counsellor,
        appt: Appointment,
    }

    fn scene(date: &str, slot: &str) -> Scene {
        let fx = Fixture::new();
        let (counsellor, profile) = fx.counsellor("rao@uni.edu");
        let student = fx.user(Role::Student, "asha@uni.edu");
        let appt = booking::create_appointment(
            &fx.store,
            &fx.config,
            &student,
            NewAppointment {
                counsellor_id: profile.id,
                scheduled_date: date.into(),
                time_slot: slot.into(),
                notes: None,
                is_anonymous: false,
            },
        )
        .unwrap();
        Scene {
            fx,
            student,
            counsellor,
            profile,
            appt,
        }
    }

    fn stored(s: &Scene) -> Appointment {
        s.fx.store.snapshot().unwrap().require_appointment(s.appt.id).unwrap()
    }

    fn complete_with(s: &Scene, follow_up: &str) {
        add_session_result(
            &s.fx.store,
            &s.counsellor,
            s.appt.id,
            SessionResult {
                session_notes: Some("talked".into()),
                diagnosis: None,
                follow_up: FollowUp::from_legacy(follow_up),
            },
        )
        .unwrap();
    }

    #[test]
    fn stranger_cannot_cancel_and_nothing_changes() {
        let s = scene("2099-01-05", "10:00");
        let other = s.fx.user(Role::Student, "other@uni.edu");
        let err = cancel(&s.fx.store, &other, s.appt.id).unwrap_err();
        assert!(matches!(err, CareError::Unauthorized(_)));
        assert_eq!(stored(&s).status, AppointmentStatus::Pending);
    }

    #[test]
    fn peer_volunteer_cannot_change_status() {
        let s = scene("2099-01-05", "10:00");
        let peer = s.fx.user(Role::PeerVolunteer, "peer@uni.edu");
        assert!(update_status(&s.fx.store, &s.fx.config, &peer, s.appt.id, AppointmentStatus::Confirmed)
            .is_err());
    }

    #[test]
    fn other_counsellor_is_not_owner() {
        let s = scene("2099-01-05", "10:00");
        let (other, _) = s.fx.counsellor("lee@uni.edu");
        assert!(matches!(
            update_status(&s.fx.store, &s.fx.config, &other, s.appt.id, AppointmentStatus::Confirmed),
            Err(CareError::Unauthorized(_))
        ));
        update_status(&s.fx.store, &s.fx.config, &s.counsellor, s.appt.id, AppointmentStatus::Confirmed)
            .unwrap();
        assert_eq!(stored(&s).status, AppointmentStatus::Confirmed);
    }

    #[test]
    fn strict_transitions_are_opt_in() {
        let mut s = scene("2099-01-05", "10:00");
        let admin = s.fx.user(Role::Admin, "dean@uni.edu");
        update_status(&s.fx.store, &s.fx.config, &admin, s.appt.id, AppointmentStatus::Completed)
            .unwrap();
        update_status(&s.fx.store, &s.fx.config, &admin, s.appt.id, AppointmentStatus::Pending)
            .unwrap();

        s.fx.config.lifecycle.strict_transitions = true;
        update_status(&s.fx.store, &s.fx.config, &admin, s.appt.id, AppointmentStatus::Completed)
            .unwrap();
        assert!(matches!(
            update_status(&s.fx.store, &s.fx.config, &admin, s.appt.id, AppointmentStatus::Pending),
            Err(CareError::InvalidState(_))
        ));
    }

    #[test]
    fn pre_session_form_only_before_the_session() {
        let future = scene("2099-01-05", "10:00");
        let appt = submit_pre_session_form(&future.fx.store, &future.student, future.appt.id, "sleep".into())
            .unwrap();
        assert_eq!(appt.pre_session_form.map(|f| f.general_queries).as_deref(), Some("sleep"));
        let cleared = clear_pre_session_form(&future.fx.store, &future.student, future.appt.id).unwrap();
        assert!(cleared.pre_session_form.is_none());

        // counsellors may not fill it in
        assert!(matches!(
            submit_pre_session_form(&future.fx.store, &future.counsellor, future.appt.id, "x".into()),
            Err(CareError::Unauthorized(_))
        ));

        let yesterday = (Local::now() - chrono::Duration::days(1)).format("%Y-%m-%d").to_string();
        let past = scene(&yesterday, "10:00");
        assert!(matches!(
            submit_pre_session_form(&past.fx.store, &past.student, past.appt.id, "late".into()),
            Err(CareError::InvalidState(_))
        ));
    }

    #[test]
    fn session_result_snapshots_latest_screening_and_audits_once_per_call() {
        let s = scene("2099-01-05", "10:00");
        screening::submit(&s.fx.store, &s.fx.config, &s.student, ScreeningTool::Gad7, vec![3; 7], false)
            .unwrap();

        complete_with(&s, "");
        complete_with(&s, "rest well");

        let appt = stored(&s);
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.session_audit.len(), 2);
        assert!(appt
            .session_audit
            .iter()
            .all(|e| e.action == AuditAction::CompletedSession));
        assert_eq!(appt.follow_up.as_deref(), Some("rest well"));
        let summary = appt.screening_summary.unwrap();
        assert_eq!(summary.score, 21);
        assert_eq!(summary.tool_type, ScreeningTool::Gad7);
    }

    #[test]
    fn students_cannot_record_results() {
        let s = scene("2099-01-05", "10:00");
        assert!(matches!(
            add_session_result(&s.fx.store, &s.student, s.appt.id, SessionResult::default()),
            Err(CareError::Unauthorized(_))
        ));
        assert!(stored(&s).session_audit.is_empty());
    }

    #[test]
    fn accept_reschedules_once() {
        let s = scene("2099-01-05", "10:00");
        complete_with(&s, r#"{"proposed":true,"date":"2099-03-01","timeSlot":"10:00"}"#);

        let appt = accept_follow_up(&s.fx.store, &s.student, s.appt.id).unwrap();
        assert_eq!(appt.scheduled_date, "2099-03-01");
        assert_eq!(appt.time_slot, "10:00");
        assert_eq!(appt.status, AppointmentStatus::Pending);

        let err = accept_follow_up(&s.fx.store, &s.student, s.appt.id).unwrap_err();
        assert!(matches!(err, CareError::InvalidState(ref m) if m.contains("already accepted")));

        let snap = s.fx.store.snapshot().unwrap();
        assert_eq!(snap.slot_holder(s.profile.id, "2099-01-05", "10:00").unwrap(), None);
        assert_eq!(
            snap.slot_holder(s.profile.id, "2099-03-01", "10:00").unwrap(),
            Some(s.appt.id)
        );
    }

    #[test]
    fn blank_proposal_completes_and_accept_keeps_schedule() {
        let s = scene("2099-01-05", "10:00");
        complete_with(&s, r#"{"proposed":true,"date":"","timeSlot":"","note":"check in"}"#);

        let appt = stored(&s);
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.session_audit.len(), 1);
        let proposal = appt.proposed_follow_up.unwrap();
        assert_eq!(proposal.terms.date, None);
        assert_eq!(proposal.terms.note.as_deref(), Some("check in"));

        let appt = accept_follow_up(&s.fx.store, &s.student, s.appt.id).unwrap();
        assert_eq!(appt.scheduled_date, "2099-01-05");
        assert_eq!(appt.time_slot, "10:00");
        assert_eq!(appt.status, AppointmentStatus::Pending);
        let snap = s.fx.store.snapshot().unwrap();
        assert_eq!(
            snap.slot_holder(s.profile.id, "2099-01-05", "10:00").unwrap(),
            Some(s.appt.id)
        );
    }

    #[test]
    fn partial_proposal_moves_only_the_slot() {
        let s = scene("2099-01-05", "10:00");
        complete_with(&s, r#"{"proposed":true,"date":null,"timeSlot":"14:00"}"#);

        let appt = accept_follow_up(&s.fx.store, &s.student, s.appt.id).unwrap();
        assert_eq!(appt.scheduled_date, "2099-01-05");
        assert_eq!(appt.time_slot, "14:00");
        let snap = s.fx.store.snapshot().unwrap();
        assert_eq!(snap.slot_holder(s.profile.id, "2099-01-05", "10:00").unwrap(), None);
    }

    #[test]
    fn accept_into_taken_slot_conflicts_and_rolls_back() {
        let s = scene("2099-01-05", "10:00");
        let other = s.fx.user(Role::Student, "b@uni.edu");
        booking::create_appointment(
            &s.fx.store,
            &s.fx.config,
            &other,
            NewAppointment {
                counsellor_id: s.profile.id,
                scheduled_date: "2099-03-01".into(),
                time_slot: "10:00".into(),
                notes: None,
                is_anonymous: false,
            },
        )
        .unwrap();
        complete_with(&s, r#"{"proposed":true,"date":"2099-03-01","timeSlot":"10:00"}"#);

        assert!(matches!(
            accept_follow_up(&s.fx.store, &s.student, s.appt.id),
            Err(CareError::SlotTaken { .. })
        ));
        let appt = stored(&s);
        assert_eq!(appt.scheduled_date, "2099-01-05");
        assert_eq!(appt.proposed_follow_up.and_then(|p| p.accepted), None);
    }

    #[test]
    fn reject_is_one_shot_and_keeps_schedule() {
        let s = scene("2099-01-05", "10:00");
        complete_with(&s, "");
        propose_follow_up(
            &s.fx.store,
            &s.counsellor,
            s.appt.id,
            FollowUpTerms {
                date: Some("2099-02-01".into()),
                time_slot: None,
                note: Some("two weeks".into()),
            },
        )
        .unwrap();

        reject_follow_up(&s.fx.store, &s.student, s.appt.id, Some("exams".into())).unwrap();
        assert!(matches!(
            reject_follow_up(&s.fx.store, &s.student, s.appt.id, None),
            Err(CareError::InvalidState(_))
        ));
        let appt = stored(&s);
        assert_eq!(appt.scheduled_date, "2099-01-05");
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(
            appt.proposed_follow_up.and_then(|p| p.rejection_reason).as_deref(),
            Some("exams")
        );
    }

    #[test]
    fn proposals_need_a_completed_session_and_valid_terms() {
        let s = scene("2099-01-05", "10:00");
        let terms = FollowUpTerms {
            date: Some("2099-02-01".into()),
            ..Default::default()
        };
        assert!(matches!(
            propose_follow_up(&s.fx.store, &s.counsellor, s.appt.id, terms.clone()),
            Err(CareError::InvalidState(_))
        ));
        assert!(matches!(
            propose_follow_up(
                &s.fx.store,
                &s.counsellor,
                s.appt.id,
                FollowUpTerms {
                    date: Some("soon".into()),
                    ..Default::default()
                }
            ),
            Err(CareError::Validation(_))
        ));

        complete_with(&s, "");
        propose_follow_up(&s.fx.store, &s.counsellor, s.appt.id, terms.clone()).unwrap();
        propose_follow_up(&s.fx.store, &s.counsellor, s.appt.id, terms).unwrap();
        let appt = stored(&s);
        let proposals = appt
            .session_audit
            .iter()
            .filter(|e| e.action == AuditAction::ProposedFollowUp)
            .count();
        assert_eq!(proposals, 2);
    }
}
