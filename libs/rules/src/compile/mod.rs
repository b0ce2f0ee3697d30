//! Policy → rule compilation.
//!
//! [`compile`] walks [`EMISSION_ORDER`] and asks each category for its rules.
//! Compilation never fails: entries that cannot become a sound rule are
//! skipped, logged and reported in [`Compilation::skipped`].
//!
//! # Invariants
//!
//! - A task appears in at most one rule per category
//! - Entries with identical parameters share one rule
//! - No rule is emitted with an empty selector set

mod adhoc;
mod drain;
mod highprio;
mod hold;
mod overflow;
mod prio;
mod reset;
mod resize;
mod site_hold;
mod sort;
mod tuning;

use std::fmt;

use std::collections::BTreeSet;

use jobrouter_policy::PolicyDocument;
use jobrouter_sites::SiteName;
use thiserror::Error;

use crate::{Category, Rule, RuleSet, EMISSION_ORDER};

/// Default whitelist written on held jobs; matches no real site.
pub const DEFAULT_HOLD_SITE: &str = "T2_NW_NOWHERE";

/// Default accounting group for raised workflows.
pub const DEFAULT_HIGHPRIO_GROUP: &str = "highprio.cmsdataops";

/// Default priority given to idle jobs of draining agents.
pub const DEFAULT_DRAIN_PRIO: i64 = 200_000;

/// Compiler knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Emit the whitelist-sorting rule.
    pub sort_whitelist: bool,

    /// Emit the built-in ad-hoc corrections.
    pub adhoc: bool,

    /// Whitelist assigned to held tasks.
    pub hold_site: String,

    /// Accounting group for high-priority workflows.
    pub highprio_group: String,

    /// Job priority for draining agents.
    pub drain_prio: i64,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            sort_whitelist: true,
            adhoc: true,
            hold_site: DEFAULT_HOLD_SITE.to_string(),
            highprio_group: DEFAULT_HIGHPRIO_GROUP.to_string(),
            drain_prio: DEFAULT_DRAIN_PRIO,
        }
    }
}

/// Why a policy entry produced no rule.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// A site identifier does not follow the naming convention.
    #[error("invalid site identifier {site:?}")]
    InvalidSite { site: String },

    /// A rule would select from an empty set and could never match.
    #[error("rule {rule:?} has an empty selector set")]
    EmptySelector { rule: String },

    /// A task already belongs to another group of the same category.
    #[error("task {task:?} already grouped under {kept}; ignoring {ignored}")]
    DuplicateTask {
        task: String,
        kept: String,
        ignored: String,
    },

    /// A task or site is listed for both hold and release; release wins.
    #[error("{subject:?} is listed for both hold and release; only releasing")]
    HoldReleaseConflict { subject: String },

    /// No source site maps into the group's whitelist.
    #[error("no source site maps into whitelist {whitelist}")]
    EmptySiteMapping { whitelist: String },

    /// A pattern is not a valid regular expression.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A whitelist modification lists no site.
    #[error("task {task:?} has an empty whitelist")]
    EmptyWhitelist { task: String },
}

/// A skipped entry and the category it belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub category: Category,
    pub reason: SkipReason,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.reason)
    }
}

/// Result of compiling a policy.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub rules: RuleSet,
    pub skipped: Vec<Skipped>,
}

impl Compilation {
    /// Number of rules per category, in emission order. Categories without
    /// rules are omitted.
    pub fn counts(&self) -> Vec<(Category, usize)> {
        EMISSION_ORDER
            .iter()
            .map(|c| (*c, self.rules.iter().filter(|r| r.category() == *c).count()))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

/// Per-invocation compiler state.
struct Context<'a> {
    options: &'a CompileOptions,
    skipped: Vec<Skipped>,
}

impl<'a> Context<'a> {
    fn new(options: &'a CompileOptions) -> Self {
        Self {
            options,
            skipped: Vec::new(),
        }
    }

    fn skip(&mut self, category: Category, reason: SkipReason) {
        tracing::warn!(category = %category, reason = %reason, "skipping policy entry");
        self.skipped.push(Skipped { category, reason });
    }

    /// Valid, deduplicated sites in input order. Invalid entries are skipped.
    fn valid_sites<S: AsRef<str>>(&mut self, category: Category, sites: &[S]) -> Vec<SiteName> {
        let mut seen = BTreeSet::new();
        let mut valid = Vec::new();
        for raw in sites {
            let raw = raw.as_ref();
            match SiteName::parse(raw.trim()) {
                Ok(site) => {
                    if seen.insert(site.clone()) {
                        valid.push(site);
                    }
                }
                Err(_) => self.skip(
                    category,
                    SkipReason::InvalidSite {
                        site: raw.to_string(),
                    },
                ),
            }
        }
        valid
    }

    fn category(&mut self, category: Category, doc: &PolicyDocument) -> Vec<Rule> {
        match category {
            Category::Overflow => overflow::compile(doc, self),
            Category::SortWhitelist => sort::compile(self),
            Category::PriorityCorrection => prio::compile(),
            Category::Memory => tuning::compile(tuning::MEMORY, &doc.memory, self),
            Category::Time => tuning::compile(tuning::TIME, &doc.time, self),
            Category::Slope => tuning::compile(tuning::SLOPE, &doc.slope, self),
            Category::Resize => resize::compile(&doc.resizing, self),
            Category::Read => tuning::compile(tuning::READ, &doc.read, self),
            Category::Hold => hold::compile_hold(doc, self),
            Category::Release => hold::compile_release(doc, self),
            Category::HoldSite => site_hold::compile_hold(doc, self),
            Category::ReleaseSite => site_hold::compile_release(doc, self),
            Category::PriorityRaise => highprio::compile(&doc.highprio, self),
            Category::Drain => drain::compile(&doc.speed_drain, self),
            Category::AdHoc => adhoc::compile(self),
            Category::Reset => reset::compile(&doc.reset_routing),
        }
    }
}

/// Compiles a policy document into rules in [`EMISSION_ORDER`].
pub fn compile(doc: &PolicyDocument, options: &CompileOptions) -> Compilation {
    let mut ctx = Context::new(options);
    let mut rules = Vec::new();

    for category in EMISSION_ORDER {
        let compiled = ctx.category(category, doc);
        tracing::debug!(category = %category, rules = compiled.len(), "compiled category");
        rules.extend(compiled);
    }

    tracing::info!(
        rules = rules.len(),
        skipped = ctx.skipped.len(),
        "policy compiled"
    );

    Compilation {
        rules: RuleSet::new(rules),
        skipped: ctx.skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_policy_compiles_fixed_rules_only() {
        let compilation = compile(&PolicyDocument::default(), &CompileOptions::default());
        let categories: Vec<Category> = compilation.counts().into_iter().map(|(c, _)| c).collect();
        assert_eq!(
            categories,
            vec![
                Category::SortWhitelist,
                Category::PriorityCorrection,
                Category::AdHoc
            ]
        );
        assert!(compilation.skipped.is_empty());
    }

    #[test]
    fn test_options_disable_optional_rules() {
        let options = CompileOptions {
            sort_whitelist: false,
            adhoc: false,
            ..CompileOptions::default()
        };
        let compilation = compile(&PolicyDocument::default(), &options);
        let categories: Vec<Category> = compilation.counts().into_iter().map(|(c, _)| c).collect();
        assert_eq!(categories, vec![Category::PriorityCorrection]);
    }

    #[test]
    fn test_skipped_display_names_category() {
        let skipped = Skipped {
            category: Category::HoldSite,
            reason: SkipReason::InvalidSite {
                site: "CERN".to_string(),
            },
        };
        assert_eq!(
            skipped.to_string(),
            "hold-site: invalid site identifier \"CERN\""
        );
    }
}
