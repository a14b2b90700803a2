use crate::cmd::{load_config, open_store};
use crate::identity;
use crate::output::{or_dash, print_json, print_table, short_id};
use anyhow::Context;
use clap::Subcommand;
use mindcare_core::appointment::{Appointment, NewAppointment};
use mindcare_core::booking;
use mindcare_core::lifecycle;
use mindcare_core::policy::Actor;
use mindcare_core::store::Store;
use mindcare_core::types::AppointmentStatus;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum AppointmentSubcommand {
    /// Book a slot with a counsellor
    Book {
        /// Counsellor profile id
        #[arg(long)]
        counsellor: Uuid,
        /// Date as YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// Slot as HH:MM
        #[arg(long)]
        slot: String,
        #[arg(long)]
        notes: Option<String>,
        /// Hide the student's identity from the counsellor
        #[arg(long)]
        anonymous: bool,
    },
    /// List the acting user's appointments
    List {
        /// Show the counsellor caseload instead of own bookings
        #[arg(long)]
        caseload: bool,
    },
    /// Show one appointment
    Show { id: Uuid },
    /// Set the status (pending, confirmed, completed, cancelled)
    Status { id: Uuid, status: String },
    /// Cancel an appointment and free its slot
    Cancel { id: Uuid },
    /// Fill in the pre-session form (student, before the session)
    PreForm {
        id: Uuid,
        /// What the student wants to talk about
        text: String,
    },
    /// Clear the pre-session form (student, before the session)
    ClearPreForm { id: Uuid },
}

pub fn run(
    root: &Path,
    subcmd: AppointmentSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;

    let appt = match subcmd {
        AppointmentSubcommand::Book {
            counsellor,
            date,
            slot,
            notes,
            anonymous,
        } => {
            let config = load_config(root)?;
            let req = NewAppointment {
                counsellor_id: counsellor,
                scheduled_date: date,
                time_slot: slot,
                notes,
                is_anonymous: anonymous,
            };
            booking::create_appointment(&store, &config, &actor, req)
                .context("failed to book appointment")?
        }
        AppointmentSubcommand::List { caseload } => return list(&store, &actor, caseload, json),
        AppointmentSubcommand::Show { id } => booking::get(&store, &actor, id)?,
        AppointmentSubcommand::Status { id, status } => {
            let status: AppointmentStatus = status.parse()?;
            let config = load_config(root)?;
            lifecycle::update_status(&store, &config, &actor, id, status)?
        }
        AppointmentSubcommand::Cancel { id } => lifecycle::cancel(&store, &actor, id)?,
        AppointmentSubcommand::PreForm { id, text } => {
            lifecycle::submit_pre_session_form(&store, &actor, id, text)?
        }
        AppointmentSubcommand::ClearPreForm { id } => {
            lifecycle::clear_pre_session_form(&store, &actor, id)?
        }
    };

    if json {
        print_json(&appt)
    } else {
        print_appointment(&appt);
        Ok(())
    }
}

fn list(store: &Store, actor: &Actor, caseload: bool, json: bool) -> anyhow::Result<()> {
    if caseload {
        let list = booking::list_for_counsellor(store, actor)?;
        if json {
            return print_json(&list);
        }
        let rows = list
            .iter()
            .map(|v| {
                let student = v.student.as_ref().map(|s| s.name.as_str());
                row(&v.appointment, or_dash(student))
            })
            .collect();
        print_table(&["ID", "DATE", "SLOT", "STATUS", "STUDENT"], rows);
    } else {
        let list = booking::list_for_student(store, actor)?;
        if json {
            return print_json(&list);
        }
        let rows = list
            .iter()
            .map(|v| {
                let counsellor = v
                    .counsellor
                    .as_ref()
                    .and_then(|c| c.user.as_ref())
                    .map(|u| u.name.as_str());
                row(&v.appointment, or_dash(counsellor))
            })
            .collect();
        print_table(&["ID", "DATE", "SLOT", "STATUS", "COUNSELLOR"], rows);
    }
    Ok(())
}

fn row(appt: &Appointment, other: String) -> Vec<String> {
    vec![
        short_id(&appt.id),
        appt.scheduled_date.clone(),
        appt.time_slot.clone(),
        appt.status.to_string(),
        other,
    ]
}

pub(crate) fn print_appointment(appt: &Appointment) {
    println!(
        "{}  {} {}  [{}]",
        appt.id, appt.scheduled_date, appt.time_slot, appt.status
    );
    if let Some(notes) = &appt.notes {
        println!("notes: {notes}");
    }
    if let Some(form) = &appt.pre_session_form {
        println!("pre-session: {}", form.general_queries);
    }
    if let Some(notes) = &appt.session_notes {
        println!("session notes: {notes}");
    }
    if let Some(follow_up) = &appt.follow_up {
        println!("follow-up: {follow_up}");
    }
    if let Some(p) = &appt.proposed_follow_up {
        let state = match p.accepted {
            None => "awaiting answer",
            Some(true) => "accepted",
            Some(false) => "rejected",
        };
        println!(
            "proposed follow-up: {} {} ({state})",
            or_dash(p.terms.date.as_deref()),
            or_dash(p.terms.time_slot.as_deref())
        );
    }
}
