//! Who the CLI acts as.
//!
//! The CLI stands in for the identity provider: `--as` names a registered
//! user by email or id, and every operation runs with that user's role.

use anyhow::{anyhow, Context};
use mindcare_core::policy::Actor;
use mindcare_core::store::{Records, Store};
use mindcare_core::user::User;
use uuid::Uuid;

/// Look up a registered user by id or email.
pub fn lookup(store: &Store, who: &str) -> anyhow::Result<User> {
    let snap = store.snapshot().context("failed to read store")?;
    let found = match Uuid::parse_str(who.trim()) {
        Ok(id) => snap.user(id)?,
        Err(_) => snap.user_by_email(&who.trim().to_lowercase())?,
    };
    found.ok_or_else(|| anyhow!("unknown user '{who}'; register it with 'mindcare user add'"))
}

/// The acting user named by `--as`.
pub fn actor(store: &Store, who: Option<&str>) -> anyhow::Result<Actor> {
    let who = who.ok_or_else(|| anyhow!("no acting user: pass --as <email|id> or set MINDCARE_AS"))?;
    let user = lookup(store, who)?;
    tracing::debug!(user = %user.id, role = ?user.role, "acting user resolved");
    Ok(Actor::from(&user))
}
