//! Check command: a summary of what the policy compiles to.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::Result;
use jobrouter_rules::Category;
use serde::Serialize;

use super::CommandContext;
use crate::config::OutputFormat;

#[derive(Debug, Serialize)]
struct Summary {
    rules: usize,
    categories: BTreeMap<Category, usize>,
    skipped: Vec<String>,
    fingerprint: String,
}

pub(super) fn run<W: Write>(ctx: &CommandContext, out: &mut W) -> Result<()> {
    let compilation = &ctx.compilation;
    let summary = Summary {
        rules: compilation.rules.len(),
        categories: compilation.counts().into_iter().collect(),
        skipped: compilation.skipped.iter().map(ToString::to_string).collect(),
        fingerprint: compilation.rules.fingerprint()?.to_string(),
    };

    match ctx.config.format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, &summary)?;
            writeln!(out)?;
        }
        OutputFormat::Classad => {
            writeln!(out, "Rules: {}", summary.rules)?;
            // BTreeMap on Category keeps emission order.
            for (category, count) in &summary.categories {
                writeln!(out, "  {:<20} {count}", category.as_str())?;
            }
            writeln!(out, "Skipped: {}", summary.skipped.len())?;
            for entry in &summary.skipped {
                writeln!(out, "  {entry}")?;
            }
            writeln!(out, "Fingerprint: {}", summary.fingerprint)?;
        }
    }
    Ok(())
}
