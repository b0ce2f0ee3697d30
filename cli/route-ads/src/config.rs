//! Command-line and environment configuration.
//!
//! Every option can be given as a flag or through its `JOBROUTER_*`
//! environment variable; flags win.

use std::time::Duration;

use clap::{Args, ValueEnum};
use jobrouter_rules::compile::{DEFAULT_DRAIN_PRIO, DEFAULT_HIGHPRIO_GROUP, DEFAULT_HOLD_SITE};
use jobrouter_rules::{ClassAdFormat, CompileOptions, JsonFormat, RuleFormat};

/// Default policy fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Rule output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// New-style ClassAds, one per rule.
    #[default]
    Classad,
    /// A JSON array of rules.
    Json,
}

impl OutputFormat {
    pub fn renderer(self) -> &'static dyn RuleFormat {
        match self {
            OutputFormat::Classad => &ClassAdFormat,
            OutputFormat::Json => &JsonFormat,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

/// Global options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Policy document location: a path, a file:// URL or an http(s):// URL.
    ///
    /// When unset, nothing is emitted.
    #[arg(long, global = true, env = "JOBROUTER_POLICY")]
    pub policy: Option<String>,

    /// Output format.
    #[arg(
        long,
        global = true,
        env = "JOBROUTER_FORMAT",
        value_enum,
        default_value_t = OutputFormat::Classad
    )]
    pub format: OutputFormat,

    /// Timeout for fetching the policy over HTTP, in seconds.
    #[arg(
        long,
        global = true,
        env = "JOBROUTER_FETCH_TIMEOUT_SECS",
        default_value_t = DEFAULT_FETCH_TIMEOUT_SECS
    )]
    pub fetch_timeout_secs: u64,

    /// Whitelist assigned to held tasks.
    #[arg(long, global = true, env = "JOBROUTER_HOLD_SITE", default_value = DEFAULT_HOLD_SITE)]
    pub hold_site: String,

    /// Accounting group for high-priority workflows.
    #[arg(
        long,
        global = true,
        env = "JOBROUTER_HIGHPRIO_GROUP",
        default_value = DEFAULT_HIGHPRIO_GROUP
    )]
    pub highprio_group: String,

    /// Job priority given to idle jobs of draining agents.
    #[arg(
        long,
        global = true,
        env = "JOBROUTER_DRAIN_PRIO",
        default_value_t = DEFAULT_DRAIN_PRIO
    )]
    pub drain_prio: i64,

    /// Do not emit the whitelist-sorting rule.
    #[arg(long, global = true)]
    pub no_sort: bool,

    /// Do not emit the built-in ad-hoc corrections.
    #[arg(long, global = true)]
    pub no_adhoc: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, global = true, env = "JOBROUTER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format.
    #[arg(
        long,
        global = true,
        env = "JOBROUTER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact
    )]
    pub log_format: LogFormat,
}

impl Config {
    /// The configured policy location, ignoring blank values.
    pub fn policy_location(&self) -> Option<&str> {
        self.policy
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            sort_whitelist: !self.no_sort,
            adhoc: !self.no_adhoc,
            hold_site: self.hold_site.clone(),
            highprio_group: self.highprio_group.clone(),
            drain_prio: self.drain_prio,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        config: Config,
    }

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["route-ads"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().config
    }

    #[test]
    fn test_flags_map_to_compile_options() {
        let config = parse(&[
            "--hold-site",
            "T3_XX_Nowhere",
            "--drain-prio",
            "5",
            "--no-sort",
        ]);
        let options = config.compile_options();
        assert_eq!(options.hold_site, "T3_XX_Nowhere");
        assert_eq!(options.drain_prio, 5);
        assert!(!options.sort_whitelist);
        assert!(options.adhoc);
    }

    #[test]
    fn test_format_values() {
        assert_eq!(parse(&["--format", "json"]).format, OutputFormat::Json);
        assert!(TestCli::try_parse_from(["route-ads", "--format", "xml"]).is_err());
    }

    #[test]
    fn test_blank_policy_is_unset() {
        let config = parse(&["--policy", "  "]);
        assert_eq!(config.policy_location(), None);
    }

    #[test]
    fn test_fetch_timeout() {
        let config = parse(&["--fetch-timeout-secs", "5"]);
        assert_eq!(config.fetch_timeout(), Duration::from_secs(5));
    }
}
