//! In-session chat on an appointment and the counsellor's post-chat form.

use crate::appointment::{Appointment, ChatMessage};
use crate::error::Result;
use crate::policy::{self, Actor};
use crate::store::{Records, Store};
use chrono::Utc;
use uuid::Uuid;

/// Post a message. Any participant of the appointment may write.
pub fn send_message(store: &Store, actor: &Actor, id: Uuid, content: String) -> Result<ChatMessage> {
    store.write(|tx| {
        let mut appt = tx.require_appointment(id)?;
        policy::access_in(tx, actor, &appt)?.require_participant("send chat messages")?;
        let message = appt.post_chat_message(actor, content, Utc::now()).clone();
        tx.save_appointment(&appt)?;
        tracing::debug!(appointment = %id, messages = appt.chat_messages.len(), "chat message posted");
        Ok(message)
    })
}

/// Every message in posting order.
pub fn list_messages(store: &Store, actor: &Actor, id: Uuid) -> Result<Vec<ChatMessage>> {
    let snap = store.snapshot()?;
    let appt = snap.require_appointment(id)?;
    policy::access_in(&snap, actor, &appt)?.require_participant("read chat messages")?;
    Ok(appt.chat_messages)
}

pub fn end_chat(store: &Store, actor: &Actor, id: Uuid) -> Result<Appointment> {
    store.write(|tx| {
        let mut appt = tx.require_appointment(id)?;
        policy::access_in(tx, actor, &appt)?.require_student("end the chat")?;
        appt.end_chat(actor, Utc::now());
        tx.save_appointment(&appt)?;
        tracing::info!(appointment = %id, "chat ended by student");
        Ok(appt)
    })
}

#[derive(Debug, Clone, Default)]
pub struct PostChatForm {
    pub session_notes: Option<String>,
    pub diagnosis: Option<String>,
    pub follow_up: Option<String>,
}

/// Record the counsellor's notes once the student has ended the chat, and
/// complete the appointment.
pub fn submit_post_chat_form(
    store: &Store,
    actor: &Actor,
    id: Uuid,
    form: PostChatForm,
) -> Result<Appointment> {
    store.write(|tx| {
        let mut appt = tx.require_appointment(id)?;
        policy::access_in(tx, actor, &appt)?.require_manager("submit the post-chat form")?;
        appt.submit_post_chat_form(
            actor.user_id,
            form.session_notes,
            form.diagnosis,
            form.follow_up,
            Utc::now(),
        )?;
        tx.save_appointment(&appt)?;
        tracing::info!(appointment = %id, "post-chat form submitted");
        Ok(appt)
    })
}
