//! Multicore resizing.

use std::collections::{BTreeMap, BTreeSet};

use jobrouter_expr::{guard, AttrRef, CmpOp, Expr};
use jobrouter_policy::ResizePolicy;

use super::{Context, SkipReason};
use crate::{attr, marker, Category, Rule};

const CATEGORY: Category = Category::Resize;

/// One rule per distinct `(minCores, maxCores, memoryPerThread)`.
///
/// Only jobs the agent flagged as resizable (`WMCore_ResizeJob` explicitly
/// false) are selected; the rule flips the flag to true.
pub(super) fn compile(resizing: &BTreeMap<String, ResizePolicy>, ctx: &mut Context<'_>) -> Vec<Rule> {
    let mut groups: BTreeMap<ResizePolicy, BTreeSet<&str>> = BTreeMap::new();
    for (task, policy) in resizing {
        groups.entry(*policy).or_default().insert(task.as_str());
    }

    let mut rules = Vec::new();
    for (policy, tasks) in groups {
        let name = format!(
            "Resize Jobs ({}-{} cores, {} MB/thread)",
            policy.min_cores, policy.max_cores, policy.memory_per_thread
        );
        let Some(selector) = guard::member_of(attr::SUBTASK_NAME, tasks) else {
            ctx.skip(CATEGORY, SkipReason::EmptySelector { rule: name });
            continue;
        };

        let rule = Rule::builder(CATEGORY, name)
            .guard(guard::compare(AttrRef::target(marker::RESIZE_JOB), CmpOp::Is, false))
            .guard(selector)
            .set(attr::MIN_CORES, Expr::lit(policy.min_cores))
            .set(attr::MAX_CORES, Expr::lit(policy.max_cores))
            .set(attr::EXTRA_MEMORY, Expr::lit(policy.memory_per_thread))
            .marker(marker::RESIZE_JOB, true)
            .build();
        rules.push(rule);
    }
    rules
}
