//! Agent drain: boost idle jobs of selected agents so they clear first.

use std::collections::BTreeSet;

use jobrouter_expr::{guard, CmpOp, Expr};
use regex::Regex;

use super::{Context, SkipReason};
use crate::{attr, Category, Rule};

const CATEGORY: Category = Category::Drain;

/// Idle status in the scheduler's job status codes.
const IDLE: i64 = 1;

/// One rule per agent pattern. The rule is idempotent without a marker: it
/// raises `JobPrio` to the drain priority, which the guard excludes.
pub(super) fn compile(agents: &[String], ctx: &mut Context<'_>) -> Vec<Rule> {
    let prio = ctx.options.drain_prio;
    let mut seen = BTreeSet::new();
    let mut rules = Vec::new();

    for agent in agents.iter().map(|a| a.trim()) {
        if agent.is_empty() || !seen.insert(agent) {
            continue;
        }
        if let Err(err) = Regex::new(agent) {
            ctx.skip(
                CATEGORY,
                SkipReason::InvalidPattern {
                    pattern: agent.to_string(),
                    reason: err.to_string(),
                },
            );
            continue;
        }

        let rule = Rule::builder(CATEGORY, format!("Drain agent {agent}"))
            .guard(guard::matches_regex(agent, attr::GLOBAL_JOB_ID))
            .guard(guard::compare(attr::JOB_STATUS, CmpOp::Eq, IDLE))
            .guard(guard::compare(attr::JOB_PRIO, CmpOp::Lt, prio))
            .set(attr::JOB_PRIO, Expr::lit(prio))
            .build();
        rules.push(rule);
    }
    rules
}
