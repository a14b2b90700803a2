pub mod appointment;
pub mod booking;
pub mod chat;
pub mod config;
pub mod counsellor;
pub mod directory;
pub mod error;
pub mod institution;
pub mod io;
pub mod lifecycle;
pub mod paths;
pub mod policy;
pub mod schedule;
pub mod screening;
pub mod store;
pub mod types;
pub mod user;

#[cfg(test)]
mod testutil;

pub use error::{CareError, Result};
