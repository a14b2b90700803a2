mod cmd;
mod identity;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    appointment::AppointmentSubcommand, chat::ChatSubcommand, config::ConfigSubcommand,
    counsellor::CounsellorSubcommand, institution::InstitutionSubcommand,
    screening::ScreeningSubcommand, session::SessionSubcommand, user::UserSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mindcare",
    about = "MindCare counselling service: appointments, sessions, chat and screenings",
    version,
    propagate_version = true
)]
struct Cli {
    /// Service root (default: auto-detect from .mindcare/)
    #[arg(long, global = true, env = "MINDCARE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Act as this user (email or id)
    #[arg(long = "as", global = true, env = "MINDCARE_AS", value_name = "USER")]
    as_user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a service root in the current directory
    Init {
        /// Service name (default: directory name)
        #[arg(long)]
        name: Option<String>,
        /// Email that becomes an admin on first sign-in (repeatable)
        #[arg(long = "admin", value_name = "EMAIL")]
        admins: Vec<String>,
        /// Email that becomes a counsellor on first sign-in (repeatable)
        #[arg(long = "counsellor", value_name = "EMAIL")]
        counsellors: Vec<String>,
    },

    /// Run the HTTP API
    Serve {
        /// Port to listen on (default: server.port from config; 0 = OS-assigned)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Manage users and roles
    User {
        #[command(subcommand)]
        subcommand: UserSubcommand,
    },

    /// Manage counsellor profiles and availability
    Counsellor {
        #[command(subcommand)]
        subcommand: CounsellorSubcommand,
    },

    /// Book and manage appointments
    Appointment {
        #[command(subcommand)]
        subcommand: AppointmentSubcommand,
    },

    /// Record session outcomes and negotiate follow-ups
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// In-session chat
    Chat {
        #[command(subcommand)]
        subcommand: ChatSubcommand,
    },

    /// Submit and review screening questionnaires
    Screening {
        #[command(subcommand)]
        subcommand: ScreeningSubcommand,
    },

    /// Manage institutions
    Institution {
        #[command(subcommand)]
        subcommand: InstitutionSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());
    let who = cli.as_user.as_deref();

    let result = match cli.command {
        Commands::Init {
            name,
            admins,
            counsellors,
        } => cmd::init::run(&root, name.as_deref(), admins, counsellors),
        Commands::Serve { port } => cmd::serve::run(&root, port),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::User { subcommand } => cmd::user::run(&root, subcommand, who, cli.json),
        Commands::Counsellor { subcommand } => {
            cmd::counsellor::run(&root, subcommand, who, cli.json)
        }
        Commands::Appointment { subcommand } => {
            cmd::appointment::run(&root, subcommand, who, cli.json)
        }
        Commands::Session { subcommand } => cmd::session::run(&root, subcommand, who, cli.json),
        Commands::Chat { subcommand } => cmd::chat::run(&root, subcommand, who, cli.json),
        Commands::Screening { subcommand } => {
            cmd::screening::run(&root, subcommand, who, cli.json)
        }
        Commands::Institution { subcommand } => {
            cmd::institution::run(&root, subcommand, who, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
