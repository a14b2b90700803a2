use crate::cmd::{load_config, open_store};
use crate::identity;
use crate::output::{or_dash, print_json, print_table, short_id};
use anyhow::anyhow;
use clap::Subcommand;
use mindcare_core::booking;
use mindcare_core::counsellor::parse_weekday;
use mindcare_core::directory::{self, NewCounsellor};
use mindcare_core::types::Role;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum CounsellorSubcommand {
    /// Create a counsellor profile for a user and give them the counsellor role
    Add {
        /// Email or id of the user
        #[arg(long)]
        user: String,
        /// Area of focus (repeatable)
        #[arg(long = "specialization")]
        specialization: Vec<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        qualifications: Option<String>,
    },
    /// List active counsellors of the acting user's institution
    List,
    /// Show one counsellor
    Show { id: Uuid },
    /// Replace one weekday's offered slots
    Availability {
        id: Uuid,
        /// Weekday, e.g. monday or mon
        #[arg(long)]
        day: String,
        /// Slots as HH:MM, comma separated; empty clears the day
        #[arg(long, value_delimiter = ',')]
        slots: Vec<String>,
    },
    /// Offered slots on a date that are still free
    Open {
        id: Uuid,
        #[arg(long)]
        date: String,
    },
}

pub fn run(
    root: &Path,
    subcmd: CounsellorSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        CounsellorSubcommand::Add {
            user,
            specialization,
            bio,
            qualifications,
        } => add(root, who, &user, specialization, bio, qualifications, json),
        CounsellorSubcommand::List => list(root, who, json),
        CounsellorSubcommand::Show { id } => show(root, id, json),
        CounsellorSubcommand::Availability { id, day, slots } => {
            availability(root, who, id, &day, slots, json)
        }
        CounsellorSubcommand::Open { id, date } => open(root, who, id, &date, json),
    }
}

fn add(
    root: &Path,
    who: Option<&str>,
    target: &str,
    specialization: Vec<String>,
    bio: Option<String>,
    qualifications: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    let target = identity::lookup(&store, target)?;
    let institution_id = target
        .institution_id
        .or(actor.institution_id)
        .ok_or_else(|| anyhow!("neither user belongs to an institution yet"))?;

    let profile = directory::create_counsellor(
        &store,
        &actor,
        NewCounsellor {
            user_id: target.id,
            institution_id,
            specialization,
            bio,
            qualifications,
            availability: Default::default(),
        },
    )?;
    if target.role != Some(Role::Counsellor) {
        directory::set_role(&store, &config, &actor, target.id, Role::Counsellor)?;
    }

    if json {
        print_json(&profile)?;
    } else {
        println!(
            "Counsellor profile {} created for {}",
            profile.id,
            or_dash(target.email.as_deref())
        );
        println!(
            "Next: mindcare counsellor availability {} --day monday --slots 09:00,10:00",
            profile.id
        );
    }
    Ok(())
}

fn list(root: &Path, who: Option<&str>, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    let cards = directory::list_counsellors(&store, &actor)?;

    if json {
        return print_json(&cards);
    }
    let rows = cards
        .iter()
        .map(|c| {
            vec![
                c.profile.id.to_string(),
                c.user.as_ref().map_or_else(|| "-".into(), |u| u.name.clone()),
                c.profile.specialization.join(", "),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "SPECIALIZATION"], rows);
    Ok(())
}

fn show(root: &Path, id: Uuid, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let card = directory::get_counsellor(&store, id)?;

    if json {
        return print_json(&card);
    }
    let name = card.user.as_ref().map(|u| u.name.as_str());
    println!("{} {}", short_id(&card.profile.id), or_dash(name));
    if !card.profile.specialization.is_empty() {
        println!("specialization: {}", card.profile.specialization.join(", "));
    }
    if let Some(bio) = &card.profile.bio {
        println!("bio: {bio}");
    }
    println!("active: {}", card.profile.is_active);
    print!("{}", serde_yaml::to_string(&card.profile.availability)?);
    Ok(())
}

fn availability(
    root: &Path,
    who: Option<&str>,
    id: Uuid,
    day: &str,
    slots: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let day = parse_weekday(day)?;
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;

    let mut availability = directory::get_counsellor(&store, id)?.profile.availability;
    let slots = slots.into_iter().filter(|s| !s.trim().is_empty()).collect();
    availability.set_day(day, slots)?;
    let profile = directory::update_availability(&store, &actor, id, availability)?;

    if json {
        print_json(&profile.availability)?;
    } else {
        let slots = profile.availability.slots(day);
        println!("{day}: {}", if slots.is_empty() { "-".to_string() } else { slots.join(", ") });
    }
    Ok(())
}

fn open(root: &Path, who: Option<&str>, id: Uuid, date: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;
    let slots = booking::open_slots(&store, &actor, id, date)?;

    if json {
        print_json(&slots)?;
    } else if slots.is_empty() {
        println!("No open slots on {date}.");
    } else {
        println!("{}", slots.join("  "));
    }
    Ok(())
}
