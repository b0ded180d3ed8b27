//! Core modules: the store abstraction, both stores, the migration engine,
//! and the configuration and audit plumbing around them.

pub mod audit;
pub mod config;
pub mod database;
pub mod db;
pub mod error;
pub mod memory;
pub mod migration;
pub mod schemas;
pub mod sqlite;
pub mod store;
pub mod task;
pub mod time;
