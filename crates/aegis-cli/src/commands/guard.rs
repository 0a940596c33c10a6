//! Guard command implementation.

use std::io::Write;

use crate::cli::GuardCommands;
use crate::context::Context;
use crate::error::CliError;
use crate::output::{ActionResult, KeyStatusView, OutputFormat};

/// Handler for guard subcommands.
pub struct GuardCommand<'a> {
    ctx: &'a Context,
}

impl<'a> GuardCommand<'a> {
    /// Creates a new guard command handler.
    #[must_use]
    pub const fn new(ctx: &'a Context) -> Self {
        Self { ctx }
    }

    /// Executes the guard subcommand.
    ///
    /// # Errors
    ///
    /// Returns error if no passphrase is configured or the state cannot be
    /// written back.
    pub async fn execute<W: Write>(
        &self,
        out: &mut W,
        format: &OutputFormat,
        command: &GuardCommands,
    ) -> Result<(), CliError> {
        let limiter = self.ctx.limiter().await?;

        match command {
            GuardCommands::Status { key } => {
                let report = limiter.report(key).await;
                format.write(
                    out,
                    &KeyStatusView {
                        key: key.clone(),
                        report,
                    },
                )
            }
            GuardCommands::Clear { key } => {
                let cleared = limiter.clear(key).await;
                limiter.tracker().flush().await?;
                let result = if cleared {
                    ActionResult::ok(format!("Cleared '{key}'"))
                } else {
                    ActionResult::noop(format!("No state for '{key}'"))
                };
                format.write(out, &result)
            }
        }
    }
}
