use anyhow::Context;
use mindcare_core::config::Config;
use mindcare_core::paths;
use mindcare_core::store::Store;
use std::path::Path;

pub fn run(
    root: &Path,
    name: Option<&str>,
    admins: Vec<String>,
    counsellors: Vec<String>,
) -> anyhow::Result<()> {
    let service_name = match name {
        Some(n) => n.to_string(),
        None => root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mindcare".to_string()),
    };

    println!("Initializing MindCare in: {}", root.display());

    let dir = paths::mindcare_dir(root);
    std::fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let mut cfg = if paths::is_initialized(root) {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to load config")?
    } else {
        println!("  created: {}", paths::CONFIG_FILE);
        Config::new(service_name)
    };

    // Seed emails are merged so re-running init can add more of them.
    merge_emails(&mut cfg.bootstrap.admin_emails, admins);
    merge_emails(&mut cfg.bootstrap.counsellor_emails, counsellors);
    cfg.save(root).context("failed to write config.yaml")?;

    let db = paths::db_path(root);
    let existed = db.exists();
    Store::open(&db).context("failed to create store")?;
    if existed {
        println!("  exists:  {}", paths::DB_FILE);
    } else {
        println!("  created: {}", paths::DB_FILE);
    }

    for w in cfg.validate() {
        println!("  warning: {}", w.message);
    }
    println!("\nNext: mindcare user add --email <you@institution.edu> --name <Name>");
    Ok(())
}

fn merge_emails(into: &mut Vec<String>, extra: Vec<String>) {
    for email in extra {
        let email = email.trim().to_lowercase();
        if !into.iter().any(|e| e.eq_ignore_ascii_case(&email)) {
            into.push(email);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_skips_duplicates_case_insensitively() {
        let mut list = vec!["dean@uni.edu".to_string()];
        merge_emails(&mut list, vec!["Dean@Uni.edu".into(), "Vice@uni.edu ".into()]);
        assert_eq!(list, vec!["dean@uni.edu", "vice@uni.edu"]);
    }
}
