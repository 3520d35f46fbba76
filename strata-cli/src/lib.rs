//! strata CLI - command-line interface for strata schema migrations.
//!
//! This crate provides the `strata` binary, which upgrades an application's
//! SQLite database to the newest schema version and reports where it stands.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
