pub mod auth_cmd;
pub mod book;
pub mod common;
pub mod completions;
pub mod config;
pub mod queue;
pub mod status;
pub mod sync;
