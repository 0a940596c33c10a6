//! Command-line argument parsing with clap.

use std::path::PathBuf;

use aegis_vault::CorruptionPolicy;
use clap::{Parser, Subcommand, ValueEnum};

/// Aegis - local secret vault and abuse-state administration.
#[derive(Parser, Debug, Clone)]
#[command(name = "aegis")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the vault, audit log and abuse state.
    #[arg(short, long, env = "AEGIS_DIR", default_value = ".aegis")]
    pub dir: PathBuf,

    /// Master passphrase the encryption key is derived from.
    #[arg(long, env = "AEGIS_MASTER_KEY", hide_env_values = true)]
    pub passphrase: Option<String>,

    /// User id recorded in access and audit logs.
    #[arg(short, long, env = "AEGIS_USER", default_value = "cli")]
    pub user: String,

    /// What to do if the vault file cannot be decrypted.
    #[arg(long, value_enum, default_value_t = CorruptionArg::Fail)]
    pub on_corruption: CorruptionArg,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Table)]
    pub format: Format,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON output for scripting.
    Json,
}

/// Corruption policy as a CLI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CorruptionArg {
    /// Refuse to open an unreadable vault.
    Fail,
    /// Move an unreadable vault aside and start empty.
    Quarantine,
}

impl From<CorruptionArg> for CorruptionPolicy {
    fn from(arg: CorruptionArg) -> Self {
        match arg {
            CorruptionArg::Fail => Self::Fail,
            CorruptionArg::Quarantine => Self::Quarantine,
        }
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Secret vault operations.
    Vault {
        /// Vault subcommand to execute.
        #[command(subcommand)]
        command: VaultCommands,
    },

    /// Audit log inspection.
    Audit {
        /// Audit subcommand to execute.
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Abuse-state administration.
    Guard {
        /// Guard subcommand to execute.
        #[command(subcommand)]
        command: GuardCommands,
    },
}

/// Vault subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum VaultCommands {
    /// List entries (never shows secret data).
    List,

    /// Print the data stored under an id.
    Get {
        /// Entry id.
        id: String,
    },

    /// Show metadata and access log of an entry.
    Info {
        /// Entry id.
        id: String,
    },

    /// Store data under an id, replacing any existing entry.
    Put {
        /// Entry id.
        id: String,

        /// Data to store. Parsed as JSON if possible, else kept as a string.
        data: String,

        /// Entry label.
        #[arg(short = 't', long = "type", default_value = "secret")]
        kind: String,
    },

    /// Replace the data of an existing entry.
    Update {
        /// Entry id.
        id: String,

        /// New data. Parsed as JSON if possible, else kept as a string.
        data: String,
    },

    /// Delete an entry.
    Delete {
        /// Entry id.
        id: String,
    },

    /// Check directory and file permissions.
    Health,

    /// Copy the encrypted vault file.
    Backup {
        /// Destination file.
        path: PathBuf,
    },

    /// Replace the vault with a backup.
    ///
    /// The current file is kept next to the vault with a `.bak` suffix.
    Restore {
        /// Backup file to restore.
        path: PathBuf,
    },
}

/// Audit subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum AuditCommands {
    /// Show the most recent audit events.
    Tail {
        /// Number of events.
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,
    },
}

/// Guard subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum GuardCommands {
    /// Show the standing of a request key.
    Status {
        /// Request key.
        key: String,
    },

    /// Clear a key's timeout and suspicion score.
    Clear {
        /// Request key.
        key: String,
    },
}
