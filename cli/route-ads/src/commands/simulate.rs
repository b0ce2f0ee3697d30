//! Simulate command: dry-run the compiled rules on one job.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use jobrouter_expr::JobAd;
use jobrouter_rules::Router;

use super::CommandContext;
use crate::config::OutputFormat;

const DEFAULT_MAX_CYCLES: usize = 64;

#[derive(Debug, Args)]
pub struct SimulateCommand {
    /// Job ad as a JSON object of attribute values.
    #[arg(long)]
    job: PathBuf,

    /// Give up after this many rule applications.
    #[arg(long, default_value_t = DEFAULT_MAX_CYCLES)]
    max_cycles: usize,
}

impl SimulateCommand {
    pub(super) async fn run<W: Write>(self, ctx: &CommandContext, out: &mut W) -> Result<()> {
        let text = tokio::fs::read_to_string(&self.job)
            .await
            .with_context(|| format!("failed to read job ad {}", self.job.display()))?;
        let json: serde_json::Value = serde_json::from_str(&text)
            .with_context(|| format!("job ad {} is not valid JSON", self.job.display()))?;
        let mut ad = JobAd::from_json(&json)
            .with_context(|| format!("invalid job ad {}", self.job.display()))?;

        let trace = Router::new(&ctx.compilation.rules).run(&mut ad, self.max_cycles);
        if !trace.converged {
            tracing::warn!(
                cycles = trace.cycles(),
                "job did not converge; a rule keeps re-enabling another"
            );
        }

        match ctx.config.format {
            OutputFormat::Json => {
                let report = serde_json::json!({
                    "fired": trace.fired,
                    "converged": trace.converged,
                    "ad": ad.to_json(),
                });
                serde_json::to_writer_pretty(&mut *out, &report)?;
                writeln!(out)?;
            }
            OutputFormat::Classad => {
                for name in &trace.fired {
                    writeln!(out, "fired: {name}")?;
                }
                writeln!(out, "converged: {}", trace.converged)?;
                serde_json::to_writer_pretty(&mut *out, &ad.to_json())?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}
