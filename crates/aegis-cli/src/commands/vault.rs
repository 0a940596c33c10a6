//! Vault command implementation.

use std::io::Write;
use std::path::Path;

use aegis_vault::SecureVault;
use serde_json::Value;

use crate::cli::VaultCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, EntryList, OutputFormat, SecretData};

/// Handler for vault subcommands.
pub struct VaultCommand<'a> {
    ctx: &'a Context,
}

impl<'a> VaultCommand<'a> {
    /// Creates a new vault command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the vault subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the vault cannot be opened or the operation fails.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &VaultCommands,
    ) -> Result<(), CliError> {
        let vault = self.ctx.vault()?;
        let who = self.ctx.requester();

        match command {
            VaultCommands::List => {
                let entries = vault.list(who).await?;
                format.write(out, &EntryList { entries })
            }
            VaultCommands::Get { id } => {
                let data = vault
                    .retrieve(id, who)
                    .await?
                    .ok_or_else(|| CliError::NotFound(id.clone()))?;
                format.write(out, &SecretData { id: id.clone(), data })
            }
            VaultCommands::Info { id } => {
                let details = vault
                    .get_metadata(id, who)
                    .await?
                    .ok_or_else(|| CliError::NotFound(id.clone()))?;
                format.write(out, &details)
            }
            VaultCommands::Put { id, data, kind } => {
                vault.store(id, kind, parse_data(data), who, None).await?;
                format.write(out, &ActionResult::ok(format!("Stored '{id}'")))
            }
            VaultCommands::Update { id, data } => {
                let version = vault.update(id, parse_data(data), who).await?;
                format.write(out, &ActionResult::ok(format!("Updated '{id}' to version {version}")))
            }
            VaultCommands::Delete { id } => {
                let result = if vault.delete(id, who).await? {
                    ActionResult::ok(format!("Deleted '{id}'"))
                } else {
                    ActionResult::noop(format!("No entry '{id}'"))
                };
                format.write(out, &result)
            }
            VaultCommands::Health => health(out, format, &vault).await,
            VaultCommands::Backup { path } => {
                vault.backup(path).await?;
                format.write(out, &ActionResult::ok(format!("Backed up to {}", path.display())))
            }
            VaultCommands::Restore { path } => restore(out, format, &vault, path).await,
        }
    }
}

/// Prints the report and fails the command if anything is wrong.
async fn health<W: Write>(out: &mut W, format: &OutputFormat, vault: &SecureVault) -> Result<(), CliError> {
    let report = vault.health_check().await;
    format.write(out, &report)?;
    if report.healthy {
        Ok(())
    } else {
        Err(CliError::Config(format!(
            "{} health issue(s) in {}",
            report.issues.len(),
            vault.config().dir().display()
        )))
    }
}

async fn restore<W: Write>(
    out: &mut W,
    format: &OutputFormat,
    vault: &SecureVault,
    path: &Path,
) -> Result<(), CliError> {
    vault.restore(path).await?;
    let previous = vault.config().backup_path();
    format.write(
        out,
        &ActionResult::ok(format!(
            "Restored from {}; previous vault kept at {}",
            path.display(),
            previous.display()
        )),
    )
}

/// Stored data is JSON when the argument parses as JSON, else a plain string.
fn parse_data(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
