use crate::cmd::{load_config, open_store};
use crate::identity;
use crate::output::{print_json, print_table, short_id};
use clap::Subcommand;
use mindcare_core::screening;
use mindcare_core::types::ScreeningTool;
use std::path::Path;
use uuid::Uuid;

#[derive(Subcommand)]
pub enum ScreeningSubcommand {
    /// Score and store a questionnaire for the acting user
    Submit {
        /// phq9, gad7 or ghq
        #[arg(long)]
        tool: String,
        /// Item answers, comma separated (0-3 each)
        #[arg(long, value_delimiter = ',', required = true)]
        responses: Vec<u32>,
        #[arg(long)]
        anonymous: bool,
    },
    /// The acting user's screenings, newest first
    List,
    /// Aggregate screening results of an institution (admin)
    Analytics { institution: Uuid },
}

pub fn run(
    root: &Path,
    subcmd: ScreeningSubcommand,
    who: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(root)?;
    let actor = identity::actor(&store, who)?;

    match subcmd {
        ScreeningSubcommand::Submit {
            tool,
            responses,
            anonymous,
        } => {
            let tool: ScreeningTool = tool.parse()?;
            let config = load_config(root)?;
            let result = screening::submit(&store, &config, &actor, tool, responses, anonymous)?;
            if json {
                return print_json(&result);
            }
            println!("{} score {} → {} risk", result.tool_type, result.score, result.risk_level);
            for r in &result.recommendations {
                println!("  - {r}");
            }
        }
        ScreeningSubcommand::List => {
            let results = screening::list_for_user(&store, &actor)?;
            if json {
                return print_json(&results);
            }
            let rows = results
                .iter()
                .map(|r| {
                    vec![
                        short_id(&r.id),
                        r.created_at.format("%Y-%m-%d").to_string(),
                        r.tool_type.to_string(),
                        r.score.to_string(),
                        r.risk_level.to_string(),
                    ]
                })
                .collect();
            print_table(&["ID", "DATE", "TOOL", "SCORE", "RISK"], rows);
        }
        ScreeningSubcommand::Analytics { institution } => {
            let report = screening::institution_analytics(&store, &actor, institution)?;
            if json {
                return print_json(&report);
            }
            println!("total screenings: {}", report.total_screenings);
            println!(
                "risk: low {}  moderate {}  high {}",
                report.risk_levels.low, report.risk_levels.moderate, report.risk_levels.high
            );
            println!(
                "usage: phq9 {}  gad7 {}  ghq {}",
                report.tool_usage.phq9, report.tool_usage.gad7, report.tool_usage.ghq
            );
            println!(
                "average: phq9 {:.1}  gad7 {:.1}  ghq {:.1}",
                report.average_scores.phq9, report.average_scores.gad7, report.average_scores.ghq
            );
        }
    }
    Ok(())
}
