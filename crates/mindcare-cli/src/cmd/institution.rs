use crate::cmd::open_store;
use crate::identity;
use crate::output::{print_json, print_table};
use anyhow::anyhow;
use clap::Subcommand;
use mindcare_core::directory::{self, NewInstitution};
use std::path::Path;

#[derive(Subcommand)]
pub enum InstitutionSubcommand {
    /// Register an institution by its email domain (admin)
    Add {
        #[arg(long)]
        name: String,
        /// Email domain, e.g. uni.edu
        #[arg(long)]
        domain: String,
        /// Supported language codes, comma separated
        #[arg(long, value_delimiter = ',', default_value = "en")]
        languages: Vec<String>,
        /// Brand colour as a CSS value
        #[arg(long)]
        color: Option<String>,
    },
    /// List institutions (admin)
    List,
    /// Look up the institution owning an email domain
    Show { domain: String },
}

pub fn run(
    root: &Path,
    subcmd: InstitutionSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;

    match subcmd {
        InstitutionSubcommand::Add {
            name,
            domain,
            languages,
            color,
        } => {
            let actor = identity::actor(&store, who)?;
            let inst = directory::create_institution(
                &store,
                &actor,
                NewInstitution {
                    name,
                    domain,
                    supported_languages: languages,
                    primary_color: color,
                },
            )?;
            if json {
                return print_json(&inst);
            }
            println!("Created institution {} ({}) id {}", inst.name, inst.domain, inst.id);
        }
        InstitutionSubcommand::List => {
            let actor = identity::actor(&store, who)?;
            let list = directory::list_institutions(&store, &actor)?;
            if json {
                return print_json(&list);
            }
            let rows = list
                .iter()
                .map(|i| {
                    vec![
                        i.id.to_string(),
                        i.name.clone(),
                        i.domain.clone(),
                        i.settings.supported_languages.join(","),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "DOMAIN", "LANGUAGES"], rows);
        }
        InstitutionSubcommand::Show { domain } => {
            let inst = directory::institution_by_domain(&store, &domain)?
                .ok_or_else(|| anyhow!("no institution for domain '{domain}'"))?;
            if json {
                return print_json(&inst);
            }
            println!("{} ({})", inst.name, inst.domain);
            println!("id: {}", inst.id);
            println!("languages: {}", inst.settings.supported_languages.join(", "));
        }
    }
    Ok(())
}
