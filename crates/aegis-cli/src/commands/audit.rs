//! Audit command implementation.

use std::io::Write;

use crate::cli::AuditCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{AuditTail, OutputFormat};

/// Handler for audit subcommands.
pub struct AuditCommand<'a> {
    ctx: &'a Context,
}

impl<'a> AuditCommand<'a> {
    /// Creates a new audit command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the audit subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if the log cannot be read.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &AuditCommands,
    ) -> Result<(), CliError> {
        match command {
            AuditCommands::Tail { lines } => {
                let events = self.ctx.audit_log().tail(*lines).await?;
                format.write(out, &AuditTail { events })
            }
        }
    }
}
