//! The appointment record and its in-memory state transitions.
//!
//! Every mutation here is pure: it checks the record's own state and edits
//! it in place. Authorization, persistence and slot uniqueness live in
//! `booking`, `lifecycle`, `chat` and `store`.

use crate::counsellor::Counsellor;
use crate::error::{CareError, Result};
use crate::policy::Actor;
use crate::schedule;
use crate::screening::ScreeningSummary;
use crate::types::{AppointmentStatus, Role};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Booking request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub counsellor_id: Uuid,
    pub scheduled_date: String,
    pub time_slot: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

impl NewAppointment {
    pub fn validate(&self) -> Result<()> {
        schedule::validate(&self.scheduled_date, &self.time_slot)
    }
}

// ---------------------------------------------------------------------------
// Session records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreSessionForm {
    pub general_queries: String,
}

/// Date, slot and note of a follow-up session. Any part may be absent; a
/// missing date or slot keeps the current one on acceptance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpTerms {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl FollowUpTerms {
    pub fn validate(&self) -> Result<()> {
        if let Some(date) = &self.date {
            schedule::parse_date(date)?;
        }
        if let Some(slot) = &self.time_slot {
            schedule::parse_slot(slot)?;
        }
        Ok(())
    }
}

/// What a counsellor leaves behind after a session: a plain note, or a
/// proposal the student must accept or reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FollowUp {
    Note { text: String },
    Proposal(FollowUpTerms),
}

impl FollowUp {
    /// Decode the single-string encoding older clients send.
    ///
    /// A JSON object with `"proposed": true` is a proposal; anything else,
    /// including malformed JSON, is kept verbatim as a note. Empty input
    /// means no follow-up. Proposal fields that are missing, null, blank or
    /// not strings are left unset, so accepting keeps the current schedule.
    pub fn from_legacy(raw: &str) -> Option<FollowUp> {
        if raw.is_empty() {
            return None;
        }
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(raw) {
            if map.get("proposed") == Some(&serde_json::Value::Bool(true)) {
                let field = |k: &str| {
                    map.get(k)
                        .and_then(|v| v.as_str())
                        .map(str::trim)
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                };
                return Some(FollowUp::Proposal(FollowUpTerms {
                    date: field("date"),
                    time_slot: field("timeSlot"),
                    note: field("note"),
                }));
            }
        }
        Some(FollowUp::Note {
            text: raw.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpProposal {
    pub proposed_by: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_by_name: Option<String>,
    pub proposed_at: DateTime<Utc>,
    #[serde(flatten)]
    pub terms: FollowUpTerms,
    /// `None` while undecided.
    pub accepted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    CompletedSession,
    ProposedFollowUp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<FollowUpTerms>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub actor: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_name: Option<String>,
    pub role: Option<Role>,
    pub timestamp: DateTime<Utc>,
    pub action: AuditAction,
    pub changes: AuditChanges,
}

impl AuditEntry {
    fn by(actor: &Actor, at: DateTime<Utc>, action: AuditAction, changes: AuditChanges) -> Self {
        Self {
            actor: actor.user_id,
            actor_name: actor.name.clone(),
            role: actor.role,
            timestamp: at,
            action,
            changes,
        }
    }
}

/// Outcome of a session as entered by the counsellor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResult {
    pub session_notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Admin,
    Student,
    Counsellor,
    PeerVolunteer,
    System,
}

impl From<Role> for Speaker {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => Speaker::Admin,
            Role::Student => Speaker::Student,
            Role::Counsellor => Speaker::Counsellor,
            Role::PeerVolunteer => Speaker::PeerVolunteer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub from_user_id: Uuid,
    pub from_name: Option<String>,
    pub role: Speaker,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSessionForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    pub submitted_by: Uuid,
    pub submitted_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Appointment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub student_id: Uuid,
    pub counsellor_id: Uuid,
    pub institution_id: Uuid,
    pub scheduled_date: String,
    pub time_slot: String,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_session_form: Option<PreSessionForm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screening_summary: Option<ScreeningSummary>,
    #[serde(default)]
    pub session_audit: Vec<AuditEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_follow_up: Option<FollowUpProposal>,
    #[serde(default)]
    pub chat_messages: Vec<ChatMessage>,
    #[serde(default)]
    pub chat_ended_by_student: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_ended_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counsellor_post_session_form: Option<PostSessionForm>,
}

/// Index key for one bookable slot. Date and slot are fixed-width, so keys
/// for one counsellor and day sort by time.
pub fn slot_key(counsellor_id: Uuid, date: &str, slot: &str) -> String {
    format!("{}|{}|{}", counsellor_id, date, slot)
}

pub fn day_prefix(counsellor_id: Uuid, date: &str) -> String {
    format!("{}|{}|", counsellor_id, date)
}

impl Appointment {
    pub fn new(student_id: Uuid, counsellor: &Counsellor, req: NewAppointment) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            student_id,
            counsellor_id: counsellor.id,
            institution_id: counsellor.institution_id,
            scheduled_date: req.scheduled_date.trim().to_string(),
            time_slot: req.time_slot.trim().to_string(),
            status: AppointmentStatus::Pending,
            notes: req.notes.filter(|n| !n.trim().is_empty()),
            is_anonymous: req.is_anonymous,
            pre_session_form: None,
            session_notes: None,
            diagnosis: None,
            follow_up: None,
            screening_summary: None,
            session_audit: Vec::new(),
            proposed_follow_up: None,
            chat_messages: Vec::new(),
            chat_ended_by_student: false,
            chat_ended_at: None,
            chat_ended_by: None,
            counsellor_post_session_form: None,
        }
    }

    pub fn slot_key(&self) -> String {
        slot_key(self.counsellor_id, &self.scheduled_date, &self.time_slot)
    }

    pub fn scheduled_at(&self) -> Option<NaiveDateTime> {
        schedule::scheduled_at(&self.scheduled_date, &self.time_slot)
    }

    // -- status -------------------------------------------------------------

    pub fn set_status(&mut self, target: AppointmentStatus, strict: bool) -> Result<()> {
        if strict && !self.status.can_transition_to(target) {
            return Err(CareError::invalid_state(format!(
                "cannot move appointment from {} to {}",
                self.status, target
            )));
        }
        self.status = target;
        Ok(())
    }

    // -- pre-session form ---------------------------------------------------

    /// The form is editable while the appointment is pending or confirmed
    /// and its start has not passed.
    pub fn ensure_form_window(&self, now: NaiveDateTime) -> Result<()> {
        if !self.status.is_upcoming() {
            return Err(CareError::invalid_state(format!(
                "pre-session form is closed for {} appointments",
                self.status
            )));
        }
        if !schedule::is_upcoming(&self.scheduled_date, &self.time_slot, now) {
            return Err(CareError::invalid_state(
                "pre-session form is closed once the session has started",
            ));
        }
        Ok(())
    }

    pub fn set_pre_session_form(&mut self, general_queries: String, now: NaiveDateTime) -> Result<()> {
        self.ensure_form_window(now)?;
        self.pre_session_form = Some(PreSessionForm { general_queries });
        Ok(())
    }

    pub fn clear_pre_session_form(&mut self, now: NaiveDateTime) -> Result<()> {
        self.ensure_form_window(now)?;
        self.pre_session_form = None;
        Ok(())
    }

    // -- session outcome ----------------------------------------------------

    /// Record a completed session. Appends exactly one audit entry.
    ///
    /// `summary` is the student's latest screening; when absent any earlier
    /// snapshot on the record is kept.
    pub fn record_session_result(
        &mut self,
        by: &Actor,
        result: SessionResult,
        summary: Option<ScreeningSummary>,
        at: DateTime<Utc>,
    ) {
        let mut changes = AuditChanges {
            session_notes: result.session_notes.clone(),
            diagnosis: result.diagnosis.clone(),
            ..Default::default()
        };

        match result.follow_up {
            Some(FollowUp::Note { text }) => {
                changes.follow_up = Some(text.clone());
                self.follow_up = Some(text);
            }
            Some(FollowUp::Proposal(terms)) => {
                changes.proposal = Some(terms.clone());
                self.proposed_follow_up = Some(proposal(by, terms, at));
            }
            None => {}
        }

        self.session_audit
            .push(AuditEntry::by(by, at, AuditAction::CompletedSession, changes));
        self.session_notes = result.session_notes;
        self.diagnosis = result.diagnosis;
        if summary.is_some() {
            self.screening_summary = summary;
        }
        self.status = AppointmentStatus::Completed;
    }

    // -- follow-up negotiation ----------------------------------------------

    /// Replace any outstanding proposal. The replaced one stays visible in
    /// the audit log.
    pub fn propose_follow_up(&mut self, by: &Actor, terms: FollowUpTerms, at: DateTime<Utc>) {
        let changes = AuditChanges {
            proposal: Some(terms.clone()),
            ..Default::default()
        };
        self.session_audit
            .push(AuditEntry::by(by, at, AuditAction::ProposedFollowUp, changes));
        self.proposed_follow_up = Some(proposal(by, terms, at));
    }

    /// Accept the outstanding proposal, moving the appointment to its
    /// proposed date and slot and back to `pending`.
    pub fn accept_follow_up(&mut self, by: Uuid, at: DateTime<Utc>) -> Result<()> {
        let p = self
            .proposed_follow_up
            .as_mut()
            .ok_or_else(|| CareError::invalid_state("no follow-up has been proposed"))?;
        if p.accepted == Some(true) {
            return Err(CareError::invalid_state("follow-up already accepted"));
        }

        p.accepted = Some(true);
        p.accepted_at = Some(at);
        p.accepted_by = Some(by);
        if let Some(date) = &p.terms.date {
            self.scheduled_date = date.clone();
        }
        if let Some(slot) = &p.terms.time_slot {
            self.time_slot = slot.clone();
        }
        self.status = AppointmentStatus::Pending;
        Ok(())
    }

    pub fn reject_follow_up(&mut self, by: Uuid, reason: Option<String>, at: DateTime<Utc>) -> Result<()> {
        let p = self
            .proposed_follow_up
            .as_mut()
            .ok_or_else(|| CareError::invalid_state("no follow-up has been proposed"))?;
        if p.accepted == Some(false) {
            return Err(CareError::invalid_state("follow-up already rejected"));
        }

        p.accepted = Some(false);
        p.rejected_at = Some(at);
        p.rejected_by = Some(by);
        p.rejection_reason = reason;
        Ok(())
    }

    // -- chat -----------------------------------------------------------------

    pub fn post_chat_message(&mut self, by: &Actor, content: String, at: DateTime<Utc>) -> &ChatMessage {
        self.chat_messages.push(ChatMessage {
            from_user_id: by.user_id,
            from_name: by.name.clone(),
            role: by.role.map_or(Speaker::Student, Speaker::from),
            content,
            created_at: at,
        });
        &self.chat_messages[self.chat_messages.len() - 1]
    }

    /// Close the chat from the student's side and leave a system message.
    pub fn end_chat(&mut self, by: &Actor, at: DateTime<Utc>) {
        self.chat_ended_by_student = true;
        self.chat_ended_at = Some(at);
        self.chat_ended_by = Some(by.user_id);
        self.chat_messages.push(ChatMessage {
            from_user_id: by.user_id,
            from_name: by.name.clone(),
            role: Speaker::System,
            content: "Student ended the chat".into(),
            created_at: at,
        });
    }

    pub fn submit_post_chat_form(
        &mut self,
        by: Uuid,
        session_notes: Option<String>,
        diagnosis: Option<String>,
        follow_up: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<()> {
        if !self.chat_ended_by_student {
            return Err(CareError::invalid_state("the student has not ended the chat"));
        }
        self.counsellor_post_session_form = Some(PostSessionForm {
            session_notes,
            diagnosis,
            follow_up,
            submitted_by: by,
            submitted_at: at,
        });
        self.status = AppointmentStatus::Completed;
        Ok(())
    }
}

fn proposal(by: &Actor, terms: FollowUpTerms, at: DateTime<Utc>) -> FollowUpProposal {
    FollowUpProposal {
        proposed_by: by.user_id,
        proposed_by_name: by.name.clone(),
        proposed_at: at,
        terms,
        accepted: None,
        accepted_at: None,
        accepted_by: None,
        rejected_at: None,
        rejected_by: None,
        rejection_reason: None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn counsellor_actor() -> Actor {
        Actor {
            user_id: Uuid::new_v4(),
            name: Some("Dr. Rao".into()),
            email: None,
            role: Some(Role::Counsellor),
            institution_id: None,
        }
    }

    fn appointment(date: &str, slot: &str) -> Appointment {
        let c = Counsellor::new(Uuid::new_v4(), Uuid::new_v4());
        Appointment::new(
            Uuid::new_v4(),
            &c,
            NewAppointment {
                counsellor_id: c.id,
                scheduled_date: date.into(),
                time_slot: slot.into(),
                notes: Some("  ".into()),
                is_anonymous: false,
            },
        )
    }

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    #[test]
    fn new_copies_institution_and_starts_pending() {
        let appt = appointment("2030-01-07", "10:00");
        assert_eq!(appt.status, AppointmentStatus::Pending);
        assert!(appt.notes.is_none());
        assert!(appt.slot_key().ends_with("|2030-01-07|10:00"));
    }

    #[test]
    fn legacy_follow_up_decoding() {
        assert_eq!(FollowUp::from_legacy(""), None);
        assert_eq!(
            FollowUp::from_legacy("see again in two weeks"),
            Some(FollowUp::Note {
                text: "see again in two weeks".into()
            })
        );
        assert_eq!(
            FollowUp::from_legacy(r#"{"proposed":true,"date":"2025-03-01","timeSlot":"10:00"}"#),
            Some(FollowUp::Proposal(FollowUpTerms {
                date: Some("2025-03-01".into()),
                time_slot: Some("10:00".into()),
                note: None,
            }))
        );
        assert_eq!(
            FollowUp::from_legacy(r#"{"proposed":true,"date":"","timeSlot":"  ","note":"x"}"#),
            Some(FollowUp::Proposal(FollowUpTerms {
                date: None,
                time_slot: None,
                note: Some("x".into()),
            }))
        );
        assert_eq!(
            FollowUp::from_legacy(r#"{"proposed":true,"date":null,"timeSlot":"11:00"}"#),
            Some(FollowUp::Proposal(FollowUpTerms {
                date: None,
                time_slot: Some("11:00".into()),
                note: None,
            }))
        );
        // non-string values are ignored, not coerced
        assert_eq!(
            FollowUp::from_legacy(r#"{"proposed":true,"date":20990301,"note":7}"#),
            Some(FollowUp::Proposal(FollowUpTerms::default()))
        );
        // proposed must be literally true
        assert!(matches!(
            FollowUp::from_legacy(r#"{"proposed":"yes","date":"2025-03-01"}"#),
            Some(FollowUp::Note { .. })
        ));
        assert!(matches!(
            FollowUp::from_legacy(r#"{"proposed":true"#),
            Some(FollowUp::Note { .. })
        ));
    }

    #[test]
    fn form_window_closes_after_start_and_on_terminal_status() {
        let mut appt = appointment("2025-03-01", "10:00");
        assert!(appt.set_pre_session_form("q".into(), at("2025-03-01 09:00")).is_ok());
        assert!(matches!(
            appt.set_pre_session_form("q".into(), at("2025-03-02 09:00")),
            Err(CareError::InvalidState(_))
        ));

        appt.status = AppointmentStatus::Completed;
        assert!(appt.clear_pre_session_form(at("2025-02-01 09:00")).is_err());
    }

    #[test]
    fn each_session_result_appends_one_audit_entry() {
        let by = counsellor_actor();
        let mut appt = appointment("2025-03-01", "10:00");

        appt.record_session_result(
            &by,
            SessionResult {
                session_notes: Some("first".into()),
                ..Default::default()
            },
            None,
            Utc::now(),
        );
        let first = appt.session_audit[0].clone();

        appt.record_session_result(
            &by,
            SessionResult {
                session_notes: Some("second".into()),
                diagnosis: Some("stress".into()),
                follow_up: FollowUp::from_legacy("check in"),
            },
            None,
            Utc::now(),
        );

        assert_eq!(appt.session_audit.len(), 2);
        assert_eq!(appt.session_audit[0], first);
        assert_eq!(appt.session_audit[1].changes.session_notes.as_deref(), Some("second"));
        assert_eq!(appt.session_notes.as_deref(), Some("second"));
        assert_eq!(appt.follow_up.as_deref(), Some("check in"));
        assert_eq!(appt.status, AppointmentStatus::Completed);
    }

    #[test]
    fn accepting_proposal_reschedules_and_reopens() {
        let by = counsellor_actor();
        let mut appt = appointment("2025-02-01", "15:00");
        appt.record_session_result(
            &by,
            SessionResult {
                follow_up: FollowUp::from_legacy(
                    r#"{"proposed":true,"date":"2025-03-01","timeSlot":"10:00","note":"review"}"#,
                ),
                ..Default::default()
            },
            None,
            Utc::now(),
        );
        assert!(appt.follow_up.is_none());

        let student = appt.student_id;
        appt.accept_follow_up(student, Utc::now()).unwrap();
        assert_eq!(appt.scheduled_date, "2025-03-01");
        assert_eq!(appt.time_slot, "10:00");
        assert_eq!(appt.status, AppointmentStatus::Pending);

        assert!(matches!(
            appt.accept_follow_up(student, Utc::now()),
            Err(CareError::InvalidState(msg)) if msg.contains("already accepted")
        ));
    }

    #[test]
    fn reject_twice_fails_and_leaves_schedule() {
        let by = counsellor_actor();
        let mut appt = appointment("2025-02-01", "15:00");
        appt.status = AppointmentStatus::Completed;
        appt.propose_follow_up(
            &by,
            FollowUpTerms {
                date: Some("2025-03-01".into()),
                ..Default::default()
            },
            Utc::now(),
        );

        let student = appt.student_id;
        appt.reject_follow_up(student, Some("exams".into()), Utc::now()).unwrap();
        assert!(appt.reject_follow_up(student, None, Utc::now()).is_err());
        assert_eq!(appt.scheduled_date, "2025-02-01");
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.session_audit[0].action, AuditAction::ProposedFollowUp);
    }

    #[test]
    fn accept_without_proposal_is_invalid_state() {
        let mut appt = appointment("2025-02-01", "15:00");
        assert!(matches!(
            appt.accept_follow_up(Uuid::new_v4(), Utc::now()),
            Err(CareError::InvalidState(_))
        ));
    }

    #[test]
    fn strict_status_blocks_reopening_completed() {
        let mut appt = appointment("2025-02-01", "15:00");
        appt.set_status(AppointmentStatus::Completed, true).unwrap();
        assert!(appt.set_status(AppointmentStatus::Pending, true).is_err());
        appt.set_status(AppointmentStatus::Pending, false).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Pending);
    }

    #[test]
    fn post_chat_form_requires_ended_chat() {
        let mut appt = appointment("2025-02-01", "15:00");
        let c = Uuid::new_v4();
        assert!(appt.submit_post_chat_form(c, None, None, None, Utc::now()).is_err());

        let student = Actor {
            user_id: appt.student_id,
            name: None,
            email: None,
            role: Some(Role::Student),
            institution_id: None,
        };
        appt.end_chat(&student, Utc::now());
        assert_eq!(appt.chat_messages.last().map(|m| m.role), Some(Speaker::System));
        appt.submit_post_chat_form(c, Some("ok".into()), None, None, Utc::now())
            .unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);
    }

    #[test]
    fn proposal_serializes_flat_with_camel_case() {
        let by = counsellor_actor();
        let mut appt = appointment("2025-02-01", "15:00");
        appt.propose_follow_up(
            &by,
            FollowUpTerms {
                time_slot: Some("11:00".into()),
                ..Default::default()
            },
            Utc::now(),
        );
        let v = serde_json::to_value(&appt).unwrap();
        assert_eq!(v["proposedFollowUp"]["timeSlot"], "11:00");
        assert!(v["proposedFollowUp"]["accepted"].is_null());
    }
}
