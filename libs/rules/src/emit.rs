//! Rule rendering.
//!
//! A [`RuleFormat`] turns a whole [`RuleSet`] into one string. Nothing is
//! written until rendering has succeeded, so output is all-or-nothing.
//!
//! # Invariants
//!
//! - A rule never carries two directives with the same name (compared
//!   case-insensitively, like ClassAd attribute names)
//! - Rendering is deterministic; [`RuleSet::fingerprint`] hashes the ClassAd
//!   form

use std::collections::BTreeSet;
use std::io;

use jobrouter_expr::render::{attribute_name, quote};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::{Category, Mutation, Rule};

/// Routed jobs stay on the local pool.
pub const GRID_RESOURCE: &str = "condor localhost localhost";

/// Vanilla universe.
pub const TARGET_UNIVERSE: i64 = 5;

/// Attributes every route carries besides its directives.
const FIXED_ATTRIBUTES: [&str; 4] = ["Name", "GridResource", "TargetUniverse", "Requirements"];

/// Errors that can occur when rendering rules.
#[derive(Debug, Error)]
pub enum EmitError {
    /// Two directives in one rule would set the same attribute.
    #[error("rule {rule:?} has more than one {key} directive")]
    DuplicateDirective { rule: String, key: String },

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Writing the rendered rules failed.
    #[error("failed to write rules")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for EmitError {
    fn from(err: serde_json::Error) -> Self {
        EmitError::Serialization(err.to_string())
    }
}

/// An ordered, compiled rule set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet(Vec<Rule>);

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self(rules)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Rule] {
        &self.0
    }

    /// Rules of one category, in emission order.
    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &Rule> {
        self.0.iter().filter(move |r| r.category() == category)
    }

    /// Looks a rule up by name.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.0.iter().find(|r| r.name() == name)
    }

    /// Checks every rule for conflicting directives.
    pub fn validate(&self) -> Result<(), EmitError> {
        self.0.iter().try_for_each(check_directives)
    }

    /// SHA-256 of the ClassAd rendering.
    pub fn fingerprint(&self) -> Result<Fingerprint, EmitError> {
        let text = ClassAdFormat.render(self)?;
        Ok(Fingerprint::of(&text))
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<T: IntoIterator<Item = Rule>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identifies one generation of rendered rules.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    fn of(text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        Self(format!("sha256:{}", hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn check_directives(rule: &Rule) -> Result<(), EmitError> {
    let mut seen: BTreeSet<String> = FIXED_ATTRIBUTES
        .iter()
        .map(|a| a.to_ascii_lowercase())
        .collect();

    let keys = rule
        .mutations()
        .iter()
        .map(Mutation::directive)
        .chain(rule.markers().iter().map(|m| m.directive()));
    for key in keys {
        if !seen.insert(key.to_ascii_lowercase()) {
            return Err(EmitError::DuplicateDirective {
                rule: rule.name().to_string(),
                key,
            });
        }
    }
    Ok(())
}

/// Renders a rule set to text.
pub trait RuleFormat {
    fn render(&self, rules: &RuleSet) -> Result<String, EmitError>;
}

/// Renders and writes a rule set in a single write.
pub fn emit<W: io::Write>(
    format: &dyn RuleFormat,
    rules: &RuleSet,
    out: &mut W,
) -> Result<(), EmitError> {
    let text = format.render(rules)?;
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}

/// One new-style ClassAd per rule, as the job router reads them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassAdFormat;

impl ClassAdFormat {
    fn render_rule(rule: &Rule, out: &mut String) {
        let mut lines: Vec<String> = vec![
            format!("Name = {}", quote(rule.name())),
            format!("GridResource = {}", quote(GRID_RESOURCE)),
            format!("TargetUniverse = {TARGET_UNIVERSE}"),
            format!("Requirements = {}", rule.guard()),
        ];

        for mutation in rule.mutations() {
            let key = attribute_name(&mutation.directive());
            let line = match mutation {
                Mutation::Copy { to, .. } => format!("{key} = {}", quote(to)),
                Mutation::Set { expr, .. } | Mutation::EvalSet { expr, .. } => {
                    format!("{key} = {expr}")
                }
                Mutation::Delete { .. } => format!("{key} = true"),
            };
            lines.push(line);
        }
        for marker in rule.markers() {
            lines.push(format!(
                "{} = {}",
                attribute_name(&marker.directive()),
                marker.value
            ));
        }

        out.push_str("[\n");
        for line in lines {
            out.push_str("    ");
            out.push_str(&line);
            out.push_str(";\n");
        }
        out.push_str("]\n");
    }
}

impl RuleFormat for ClassAdFormat {
    fn render(&self, rules: &RuleSet) -> Result<String, EmitError> {
        rules.validate()?;

        let mut out = String::new();
        for (i, rule) in rules.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            Self::render_rule(rule, &mut out);
        }
        Ok(out)
    }
}

/// A JSON array of rule objects; expressions are shown in ClassAd syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

#[derive(Serialize)]
struct RuleView<'a> {
    name: &'a str,
    category: Category,
    requirements: String,
    mutations: Vec<MutationView<'a>>,
    markers: Vec<MarkerView<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum MutationView<'a> {
    Copy { from: &'a str, to: &'a str },
    Set { attr: &'a str, expr: String },
    EvalSet { attr: &'a str, expr: String },
    Delete { attr: &'a str },
}

#[derive(Serialize)]
struct MarkerView<'a> {
    flag: &'a str,
    value: bool,
}

impl<'a> From<&'a Rule> for RuleView<'a> {
    fn from(rule: &'a Rule) -> Self {
        let mutations = rule
            .mutations()
            .iter()
            .map(|m| match m {
                Mutation::Copy { from, to } => MutationView::Copy { from, to },
                Mutation::Set { attr, expr } => MutationView::Set {
                    attr,
                    expr: expr.to_string(),
                },
                Mutation::EvalSet { attr, expr } => MutationView::EvalSet {
                    attr,
                    expr: expr.to_string(),
                },
                Mutation::Delete { attr } => MutationView::Delete { attr },
            })
            .collect();

        RuleView {
            name: rule.name(),
            category: rule.category(),
            requirements: rule.guard().to_string(),
            mutations,
            markers: rule
                .markers()
                .iter()
                .map(|m| MarkerView {
                    flag: &m.flag,
                    value: m.value,
                })
                .collect(),
        }
    }
}

impl RuleFormat for JsonFormat {
    fn render(&self, rules: &RuleSet) -> Result<String, EmitError> {
        rules.validate()?;

        let views: Vec<RuleView<'_>> = rules.iter().map(RuleView::from).collect();
        let mut text = serde_json::to_string_pretty(&views)?;
        text.push('\n');
        Ok(text)
    }
}
