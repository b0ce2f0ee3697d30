//! Error display for the CLI.

use colored::Colorize;
use jobrouter_policy::PolicyError;
use jobrouter_rules::EmitError;

use crate::source::SourceError;

/// Prints an error and its causes to stderr, with a hint where one helps.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    for cause in err.chain().skip(1) {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
    }

    if let Some(hint) = hint(err) {
        eprintln!("\n{}", format!("Hint: {hint}").yellow());
    }
}

fn hint(err: &anyhow::Error) -> Option<&'static str> {
    for cause in err.chain() {
        if let Some(source) = cause.downcast_ref::<SourceError>() {
            return Some(match source {
                SourceError::UnsupportedLocation(_) => {
                    "Set --policy (or JOBROUTER_POLICY) to a path or an http(s):// URL."
                }
                SourceError::Read { .. } => "Check that the policy file exists and is readable.",
                SourceError::Http { .. } | SourceError::Status { .. } => {
                    "Check the policy URL and your network connection."
                }
            });
        }
        if let Some(policy) = cause.downcast_ref::<PolicyError>() {
            return Some(if policy.is_threshold() {
                "Threshold keys must be numbers, e.g. \"2000\"."
            } else {
                "The policy document must be a JSON object of category sections."
            });
        }
        if cause.downcast_ref::<EmitError>().is_some() {
            return Some("No rules were written.");
        }
    }
    None
}
