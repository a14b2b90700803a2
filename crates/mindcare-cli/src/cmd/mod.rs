pub mod appointment;
pub mod chat;
pub mod config;
pub mod counsellor;
pub mod init;
pub mod institution;
pub mod screening;
pub mod serve;
pub mod session;
pub mod user;

use anyhow::Context;
use mindcare_core::config::Config;
use mindcare_core::store::Store;
use std::path::Path;

pub(crate) fn open_store(root: &Path) -> anyhow::Result<Store> {
    Store::open_root(root).context("failed to open store")
}

pub(crate) fn load_config(root: &Path) -> anyhow::Result<Config> {
    Config::load(root).context("failed to load config")
}
