use crate::cmd::appointment::print_appointment;
use crate::cmd::open_store;
use crate::identity;
use crate::output::print_json;
use clap::Subcommand;
use mindcare_core::appointment::{FollowUp, FollowUpTerms, SessionResult};
use mindcare_core::lifecycle;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// Record the outcome of a session and complete it (counsellor)
    Result {
        id: Uuid,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        diagnosis: Option<String>,
        /// Free-text follow-up note
        #[arg(long, conflicts_with_all = ["propose_date", "propose_slot"])]
        follow_up: Option<String>,
        /// Propose a follow-up on this date instead of leaving a note
        #[arg(long)]
        propose_date: Option<String>,
        #[arg(long)]
        propose_slot: Option<String>,
    },
    /// Propose a follow-up on a completed appointment (counsellor)
    Propose {
        id: Uuid,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        slot: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
    /// Accept the proposed follow-up (student)
    Accept { id: Uuid },
    /// Reject the proposed follow-up (student)
    Reject {
        id: Uuid,
        #[arg(long)]
        reason: Option<String>,
    },
}

pub fn run(
    root: &Path,
    subcmd: SessionSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;

    let appt = match subcmd {
        SessionSubcommand::Result {
            id,
            notes,
            diagnosis,
            follow_up,
            propose_date,
            propose_slot,
        } => {
            let follow_up = if propose_date.is_some() || propose_slot.is_some() {
                Some(FollowUp::Proposal(FollowUpTerms {
                    date: propose_date,
                    time_slot: propose_slot,
                    note: None,
                }))
            } else {
                follow_up.map(|text| FollowUp::Note { text })
            };
            let result = SessionResult {
                session_notes: notes,
                diagnosis,
                follow_up,
            };
            lifecycle::add_session_result(&store, &actor, id, result)?
        }
        SessionSubcommand::Propose {
            id,
            date,
            slot,
            note,
        } => {
            let terms = FollowUpTerms {
                date,
                time_slot: slot,
                note,
            };
            lifecycle::propose_follow_up(&store, &actor, id, terms)?
        }
        SessionSubcommand::Accept { id } => lifecycle::accept_follow_up(&store, &actor, id)?,
        SessionSubcommand::Reject { id, reason } => {
            lifecycle::reject_follow_up(&store, &actor, id, reason)?
        }
    };

    if json {
        print_json(&appt)
    } else {
        print_appointment(&appt);
        Ok(())
    }
}
