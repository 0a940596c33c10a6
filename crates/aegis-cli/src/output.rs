//! Output formatting for CLI commands.
//!
//! Supports table (human-readable) and JSON output formats.

use std::io::Write;

use aegis_guard::KeyReport;
use aegis_vault::{AuditLogEntry, EntryDetails, EntrySummary, HealthReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cli::Format;
use crate::error::CliError;

/// Output formatter that handles both table and JSON output.
#[derive(Debug, Clone)]
pub struct OutputFormat {
    format: Format,
}

impl OutputFormat {
    /// Create a new output formatter.
    #[must_use]
    pub const fn new(format: Format) -> Self {
        Self { format }
    }

    /// Write a serializable value to the output.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write<W, T>(&self, writer: &mut W, value: &T) -> Result<(), CliError>
    where
        W: Write,
        T: Serialize + TableDisplay,
    {
        match self.format {
            Format::Json => {
                serde_json::to_writer_pretty(&mut *writer, value)
                    .map_err(|e| CliError::Format(format!("JSON serialization failed: {e}")))?;
                writeln!(writer)?;
            }
            Format::Table => {
                value.write_table(writer)?;
            }
        }
        Ok(())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::new(Format::Table)
    }
}

/// Trait for types that can be displayed as a table.
pub trait TableDisplay {
    /// Write the value as a human-readable table.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError>;
}

fn time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

/// Entries returned by `vault list`.
#[derive(Debug, Clone, Serialize)]
pub struct EntryList {
    /// Entry summaries.
    pub entries: Vec<EntrySummary>,
}

impl TableDisplay for EntryList {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.entries.is_empty() {
            writeln!(writer, "Vault is empty")?;
            return Ok(());
        }

        writeln!(
            writer,
            "{:<24}  {:<12}  {:>7}  {:<19}  {:<19}",
            "ID", "TYPE", "VERSION", "UPDATED", "LAST ACCESSED"
        )?;
        writeln!(writer, "{}", "─".repeat(89))?;

        for entry in &self.entries {
            writeln!(
                writer,
                "{:<24}  {:<12}  {:>7}  {:<19}  {:<19}",
                truncate(&entry.id, 24),
                truncate(&entry.kind, 12),
                entry.version,
                time(entry.updated_at),
                entry.last_accessed.map_or_else(|| "-".to_string(), time),
            )?;
        }

        writeln!(writer)?;
        let plural = if self.entries.len() == 1 { "y" } else { "ies" };
        writeln!(writer, "Total: {} entr{plural}", self.entries.len())?;
        Ok(())
    }
}

/// Data returned by `vault get`.
#[derive(Debug, Clone, Serialize)]
pub struct SecretData {
    /// Entry id.
    pub id: String,
    /// Stored payload.
    pub data: Value,
}

impl TableDisplay for SecretData {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        match &self.data {
            Value::String(s) => writeln!(writer, "{s}")?,
            other => writeln!(writer, "{other}")?,
        }
        Ok(())
    }
}

impl TableDisplay for EntryDetails {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Entry: {}", self.id)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Type:       {}", self.kind)?;
        writeln!(writer, "Version:    {}", self.metadata.version)?;
        writeln!(writer, "Created:    {}", time(self.metadata.created_at))?;
        writeln!(writer, "Updated:    {}", time(self.metadata.updated_at))?;
        for (key, value) in &self.metadata.extra {
            writeln!(writer, "{:<11} {value}", format!("{key}:"))?;
        }

        writeln!(writer)?;
        writeln!(writer, "Access Log ({} records)", self.access_log.len())?;
        for record in &self.access_log {
            writeln!(
                writer,
                "  {}  {:<8}  {}{}",
                time(record.timestamp),
                record.action.to_string(),
                record.user_id,
                record.ip.as_deref().map(|ip| format!(" ({ip})")).unwrap_or_default(),
            )?;
        }
        Ok(())
    }
}

impl TableDisplay for HealthReport {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Vault Health")?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Status:   {}", if self.healthy { "healthy" } else { "UNHEALTHY" })?;
        if let Some(entries) = self.entries {
            writeln!(writer, "Entries:  {entries}")?;
        }
        if !self.issues.is_empty() {
            writeln!(writer)?;
            writeln!(writer, "Issues")?;
            for issue in &self.issues {
                writeln!(writer, "  - {issue}")?;
            }
        }
        Ok(())
    }
}

/// Events returned by `audit tail`.
#[derive(Debug, Clone, Serialize)]
pub struct AuditTail {
    /// Events, oldest first.
    pub events: Vec<AuditLogEntry>,
}

impl TableDisplay for AuditTail {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        if self.events.is_empty() {
            writeln!(writer, "No audit events")?;
            return Ok(());
        }

        writeln!(writer, "{:<19}  {:<13}  DETAILS", "TIME", "ACTION")?;
        writeln!(writer, "{}", "─".repeat(72))?;
        for event in &self.events {
            writeln!(
                writer,
                "{:<19}  {:<13}  {}",
                time(event.timestamp),
                event.action.to_string(),
                event.details
            )?;
        }
        Ok(())
    }
}

/// Standing of one request key.
#[derive(Debug, Clone, Serialize)]
pub struct KeyStatusView {
    /// The key as given on the command line.
    pub key: String,
    /// Its report.
    #[serde(flatten)]
    pub report: KeyReport,
}

impl TableDisplay for KeyStatusView {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "Key: {}", self.key)?;
        writeln!(writer, "══════════════════════════════════")?;
        writeln!(writer, "Status:           {}", self.report.status)?;
        writeln!(writer, "Suspicion Score:  {}", self.report.suspicion_score)?;
        writeln!(writer, "Recent Requests:  {}", self.report.recent_requests)?;
        if self.report.timeout_remaining > 0 {
            writeln!(writer, "Timeout:          {}s remaining", self.report.timeout_remaining)?;
        }
        Ok(())
    }
}

/// Outcome of a command that changes state.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    /// Whether anything changed.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
}

impl ActionResult {
    /// A successful outcome.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// An outcome where nothing changed.
    #[must_use]
    pub fn noop(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl TableDisplay for ActionResult {
    fn write_table<W: Write>(&self, writer: &mut W) -> Result<(), CliError> {
        writeln!(writer, "{}", self.message)?;
        Ok(())
    }
}
