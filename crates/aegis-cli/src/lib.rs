//! # aegis-cli
//!
//! Command-line administration for the Aegis security core.
//!
//! Provides commands for:
//! - Secret vault CRUD, backup, restore and health checks
//! - Audit log inspection
//! - Abuse-state status and admin clear
//!
//! The master passphrase comes from `--passphrase` or `AEGIS_MASTER_KEY`;
//! every file lives under `--dir` / `AEGIS_DIR`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod output;

pub use cli::{AuditCommands, Cli, Commands, Format, GuardCommands, VaultCommands};
pub use context::Context;
pub use error::CliError;
pub use output::OutputFormat;
