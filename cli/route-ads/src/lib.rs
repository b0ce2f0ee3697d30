//! route-ads: compile a job-router policy into routing rules.
//!
//! Fetches a policy document (file or HTTP), compiles it with
//! [`jobrouter_rules::compile`] and writes the rule stream to stdout.
//! With no policy configured the process does nothing and exits cleanly,
//! so it can run unconditionally from the router's configuration hook.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod source;

pub use commands::Cli;
