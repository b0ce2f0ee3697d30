//! CLI commands.

mod check;
mod emit;
mod simulate;

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jobrouter_policy::PolicyDocument;
use jobrouter_rules::{compile, Compilation};

use crate::config::Config;
use crate::source::PolicySource;

pub use simulate::SimulateCommand;

/// Compile job-router policies into routing rules.
#[derive(Debug, Parser)]
#[command(name = "route-ads")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Write the compiled rules to stdout (default).
    Emit,

    /// Summarize the compiled rules without writing them.
    Check,

    /// Replay the rules against one job ad.
    Simulate(SimulateCommand),
}

impl Cli {
    /// Run the command, writing to stdout.
    pub async fn run(self) -> Result<()> {
        let mut stdout = io::stdout().lock();
        self.run_with(&mut stdout).await
    }

    /// Run the command, writing to `out`.
    ///
    /// Nothing is written unless the policy loads and compiles.
    pub async fn run_with<W: Write>(self, out: &mut W) -> Result<()> {
        let Some(location) = self.config.policy_location() else {
            tracing::info!("no policy configured; nothing to emit");
            return Ok(());
        };

        let source = PolicySource::parse(location)?;
        let text = source
            .fetch(self.config.fetch_timeout())
            .await
            .with_context(|| format!("failed to load policy from {source}"))?;
        let doc: PolicyDocument = text
            .parse()
            .with_context(|| format!("invalid policy document at {source}"))?;

        let compilation = compile(&doc, &self.config.compile_options());
        let ctx = CommandContext {
            config: self.config,
            compilation,
        };

        match self.command.unwrap_or(Commands::Emit) {
            Commands::Emit => emit::run(&ctx, out),
            Commands::Check => check::run(&ctx, out),
            Commands::Simulate(cmd) => cmd.run(&ctx, out).await,
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub compilation: Compilation,
}
