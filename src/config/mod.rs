//! ETL Configuration Module
//!
//! TOML configuration for the record store, aggregate database, table export
//! and blob storage.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `ETL_CONFIG` environment variable (path to TOML file)
//! 3. `etl_config.toml` in the current working directory
//! 4. Built-in defaults
//!
//! `DATABASE_URL` always overrides `database.url`.

mod etl_config;

pub use etl_config::*;
