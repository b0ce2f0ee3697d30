//! Emit command.

use std::io::Write;

use anyhow::{Context, Result};
use jobrouter_rules::emit::emit;

use super::CommandContext;

pub(super) fn run<W: Write>(ctx: &CommandContext, out: &mut W) -> Result<()> {
    let rules = &ctx.compilation.rules;
    emit(ctx.config.format.renderer(), rules, out).context("failed to write rules")?;
    tracing::info!(
        rules = rules.len(),
        format = ?ctx.config.format,
        "rules emitted"
    );
    Ok(())
}
