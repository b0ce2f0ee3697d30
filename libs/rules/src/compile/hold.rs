//! Task-level hold and release.
//!
//! A held task has its whitelist parked in `Held_DESIRED_Sites` and replaced
//! by a site that matches nothing. Release restores it. A task listed under
//! both is only released; otherwise the two rules would keep undoing each
//! other.

use std::collections::BTreeSet;

use jobrouter_expr::{guard, Value};
use jobrouter_policy::PolicyDocument;

use super::{Context, SkipReason};
use crate::{attr, marker, Category, Rule};

pub(super) fn compile_hold(doc: &PolicyDocument, ctx: &mut Context<'_>) -> Vec<Rule> {
    let mut tasks: BTreeSet<&str> = BTreeSet::new();
    for (task, sites) in &doc.hold {
        if doc.release.contains(task) {
            ctx.skip(
                Category::Hold,
                SkipReason::HoldReleaseConflict {
                    subject: task.clone(),
                },
            );
            continue;
        }
        if !sites.is_empty() {
            tracing::debug!(task = %task, "per-site task hold is not supported; holding everywhere");
        }
        tasks.insert(task.as_str());
    }

    let Some(selector) = guard::member_of(attr::SUBTASK_NAME, tasks) else {
        return Vec::new();
    };

    let rule = Rule::builder(Category::Hold, "Holding tasks")
        .guard(guard::flag_is_not_true(marker::HAS_BEEN_SET_HELD))
        .guard(selector)
        .copy(attr::DESIRED_SITES, attr::HELD_DESIRED_SITES)
        .set(attr::DESIRED_SITES, Value::from(ctx.options.hold_site.as_str()))
        .marker(marker::HAS_BEEN_SET_HELD, true)
        .build();
    vec![rule]
}

pub(super) fn compile_release(doc: &PolicyDocument, _ctx: &mut Context<'_>) -> Vec<Rule> {
    let Some(selector) = guard::member_of(attr::SUBTASK_NAME, doc.release.iter().cloned()) else {
        return Vec::new();
    };

    let rule = Rule::builder(Category::Release, "Releasing tasks")
        .guard(guard::flag_is_true(marker::HAS_BEEN_SET_HELD))
        .guard(selector)
        .copy(attr::HELD_DESIRED_SITES, attr::DESIRED_SITES)
        .delete(attr::HELD_DESIRED_SITES)
        .marker(marker::HAS_BEEN_SET_HELD, false)
        .build();
    vec![rule]
}
