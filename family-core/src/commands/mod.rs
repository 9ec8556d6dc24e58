// src/commands/mod.rs
pub mod init;
mod api;

pub use api::PersonService;

pub use init::{InitReport, default_root, ensure_initialized, ensure_initialized_once};
