//! Database layer for caresync

mod connection;
mod migrations;

pub use connection::Database;
