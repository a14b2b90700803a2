use crate::cmd::{load_config, open_store};
use crate::identity;
use crate::output::{or_dash, print_json, print_table, short_id};
use anyhow::Context;
use clap::Subcommand;
use mindcare_core::directory;
use mindcare_core::policy::Actor;
use mindcare_core::types::Role;
use std::path::Path;

#[derive(Subcommand)]
pub enum UserSubcommand {
    /// Register a user and run their first-login bootstrap
    Add {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// List all users (admin)
    List,
    /// Show the acting user
    Whoami,
    /// Change a user's role (admin)
    SetRole {
        /// Email or id
        user: String,
        /// admin, student, counsellor or peer_volunteer
        role: String,
    },
    /// Delete a user with their profile and appointments (admin)
    Remove {
        /// Email or id
        user: String,
    },
}

pub fn run(
    root: &Path,
    subcmd: UserSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        UserSubcommand::Add { email, name } => add(root, email, name, json),
        UserSubcommand::List => list(root, who, json),
        UserSubcommand::Whoami => whoami(root, who, json),
        UserSubcommand::SetRole { user, role } => set_role(root, who, &user, &role, json),
        UserSubcommand::Remove { user } => remove(root, who, &user, json),
    }
}

fn add(root: &Path, email: String, name: Option<String>, json: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let store = open_store(root)?;
    let user = directory::register_user(&store, name, Some(email))
        .context("failed to register user")?;
    let outcome = directory::ensure_initial_roles(&store, &config, &Actor::from(&user))
        .context("failed to assign initial role")?;

    if json {
        print_json(&serde_json::json!({
            "id": user.id,
            "email": user.email,
            "name": user.name,
            "role": outcome.role,
            "institutionId": outcome.institution_id,
        }))?;
    } else {
        let role = outcome.role.map(|r| r.to_string());
        println!(
            "Registered {} ({}) as {}",
            or_dash(user.email.as_deref()),
            user.id,
            or_dash(role.as_deref())
        );
    }
    Ok(())
}

fn list(root: &Path, who: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    let users = directory::list_users(&store, &actor)?;

    if json {
        return print_json(&users);
    }
    let rows = users
        .iter()
        .map(|u| {
            vec![
                short_id(&u.id),
                or_dash(u.email.as_deref()),
                or_dash(u.name.as_deref()),
                u.role.map_or_else(|| "-".to_string(), |r| r.to_string()),
            ]
        })
        .collect();
    print_table(&["ID", "EMAIL", "NAME", "ROLE"], rows);
    Ok(())
}

fn whoami(root: &Path, who: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    if json {
        return print_json(&actor);
    }
    let role = actor.role.map(|r| r.to_string());
    println!("{} {}", actor.user_id, or_dash(actor.email.as_deref()));
    println!("role: {}", or_dash(role.as_deref()));
    Ok(())
}

fn set_role(
    root: &Path,
    who: Option<&str>,
    target: &str,
    role: &str,
    json: bool,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let config = load_config(root)?;
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    let target = identity::lookup(&store, target)?;
    let user = directory::set_role(&store, &config, &actor, target.id, role)?;

    if json {
        print_json(&user)?;
    } else {
        println!("{} is now {role}", or_dash(user.email.as_deref()));
    }
    Ok(())
}

fn remove(root: &Path, who: Option<&str>, target: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    let target = identity::lookup(&store, target)?;
    directory::remove_user(&store, &actor, target.id)?;

    if json {
        print_json(&serde_json::json!({ "removed": target.id }))?;
    } else {
        println!("Removed {}", or_dash(target.email.as_deref()));
    }
    Ok(())
}
