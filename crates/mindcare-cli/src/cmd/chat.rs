use crate::cmd::appointment::print_appointment;
use crate::cmd::open_store;
use crate::identity;
use crate::output::{or_dash, print_json};
use clap::Subcommand;
use mindcare_core::chat::{self, PostChatForm};
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ChatSubcommand {
    /// Post a message on an appointment
    Send { id: Uuid, message: String },
    /// Print the conversation
    Log { id: Uuid },
    /// End the chat (student)
    End { id: Uuid },
    /// Submit the post-chat form once the student has ended the chat (counsellor)
    Close {
        id: Uuid,
        #[arg(long)]
        notes: Option<String>,
        #[arg(long)]
        diagnosis: Option<String>,
        #[arg(long)]
        follow_up: Option<String>,
    },
}

pub fn run(
    root: &Path,
    subcmd: ChatSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;

    match subcmd {
        ChatSubcommand::Send { id, message } => {
            let msg = chat::send_message(&store, &actor, id, message)?;
            if json {
                print_json(&msg)?;
            } else {
                println!("sent at {}", msg.created_at.format("%H:%M:%S"));
            }
        }
        ChatSubcommand::Log { id } => {
            let messages = chat::list_messages(&store, &actor, id)?;
            if json {
                return print_json(&messages);
            }
            for m in &messages {
                println!(
                    "[{}] {} ({:?}): {}",
                    m.created_at.format("%Y-%m-%d %H:%M"),
                    or_dash(m.from_name.as_deref()),
                    m.role,
                    m.content
                );
            }
        }
        ChatSubcommand::End { id } => {
            let appt = chat::end_chat(&store, &actor, id)?;
            if json {
                print_json(&appt)?;
            } else {
                println!("Chat ended.");
            }
        }
        ChatSubcommand::Close {
            id,
            notes,
            diagnosis,
            follow_up,
        } => {
            let form = PostChatForm {
                session_notes: notes,
                diagnosis,
                follow_up,
            };
            let appt = chat::submit_post_chat_form(&store, &actor, id, form)?;
            if json {
                print_json(&appt)?;
            } else {
                print_appointment(&appt);
            }
        }
    }
    Ok(())
}
