//! Priority raise for selected workflows.

use jobrouter_expr::{guard, AttrRef, Value};

use super::Context;
use crate::{attr, marker, Category, Rule};

/// One rule moving every listed workflow's jobs into the high-priority
/// accounting group. Workflows are matched on the request name.
pub(super) fn compile(workflows: &[String], ctx: &mut Context<'_>) -> Vec<Rule> {
    let names = workflows
        .iter()
        .map(|w| w.trim())
        .filter(|w| !w.is_empty());
    let Some(selector) = guard::member_of(AttrRef::target(attr::REQUEST_NAME), names) else {
        return Vec::new();
    };

    let rule = Rule::builder(Category::PriorityRaise, "Raising to highprio group")
        .guard(guard::flag_is_not_true(marker::HAS_BEEN_RAISED_HIGH_PRIO))
        .guard(selector)
        .set(
            attr::ACCOUNTING_GROUP,
            Value::from(ctx.options.highprio_group.as_str()),
        )
        .marker(marker::HAS_BEEN_RAISED_HIGH_PRIO, true)
        .build();
    vec![rule]
}
