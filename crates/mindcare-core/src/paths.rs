use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const MINDCARE_DIR: &str = ".mindcare";
pub const CONFIG_FILE: &str = ".mindcare/config.yaml";
pub const DB_FILE: &str = ".mindcare/mindcare.redb";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn mindcare_dir(root: &Path) -> PathBuf {
    root.join(MINDCARE_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn db_path(root: &Path) -> PathBuf {
    root.join(DB_FILE)
}

pub fn is_initialized(root: &Path) -> bool {
    config_path(root).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_under_mindcare_dir() {
        let root = Path::new("/srv/care");
        assert_eq!(config_path(root), PathBuf::from("/srv/care/.mindcare/config.yaml"));
        assert!(db_path(root).starts_with(mindcare_dir(root)));
    }
}
