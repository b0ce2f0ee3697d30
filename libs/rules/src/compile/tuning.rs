//! Threshold tuning: memory, time, slope and read.
//!
//! Each threshold becomes one rule covering every task listed under it. The
//! guard also requires the attribute to differ from the target value, so a
//! job that already carries it is not re-routed.

use std::collections::BTreeMap;

use jobrouter_expr::{guard, CmpOp, Expr};
use jobrouter_policy::ThresholdMap;

use super::{Context, SkipReason};
use crate::{attr, marker, Category, Rule};

/// How one threshold category maps onto job attributes.
pub(super) struct Tuning {
    category: Category,
    attr: &'static str,
    marker: &'static str,
    label: &'static str,
    extra: Option<fn() -> (&'static str, Expr)>,
}

pub(super) const MEMORY: Tuning = Tuning {
    category: Category::Memory,
    attr: attr::ORIGINAL_MEMORY,
    marker: marker::HAS_BEEN_MEMORY_TUNED,
    label: "memory requirement",
    extra: None,
};

pub(super) const TIME: Tuning = Tuning {
    category: Category::Time,
    attr: attr::ESTIMATED_SINGLE_CORE_MINS,
    marker: marker::HAS_BEEN_TIMING_TUNED,
    label: "timing requirement",
    extra: Some(wall_time_per_core),
};

pub(super) const SLOPE: Tuning = Tuning {
    category: Category::Slope,
    attr: attr::EXTRA_MEMORY,
    marker: marker::HAS_BEEN_SLOPE_TUNED,
    label: "memory per thread requirement",
    extra: None,
};

pub(super) const READ: Tuning = Tuning {
    category: Category::Read,
    attr: attr::ESTIMATED_INPUT_RATE,
    marker: marker::HAS_BEEN_READ_TUNED,
    label: "read requirement",
    extra: None,
};

fn wall_time_per_core() -> (&'static str, Expr) {
    (
        attr::ORIGINAL_MAX_WALL_TIME,
        Expr::attr(attr::ESTIMATED_SINGLE_CORE_MINS) / Expr::attr(attr::ORIGINAL_CPUS),
    )
}

pub(super) fn compile(tuning: Tuning, thresholds: &ThresholdMap, ctx: &mut Context<'_>) -> Vec<Rule> {
    // Lowest threshold claims a task first.
    let mut claimed: BTreeMap<&str, i64> = BTreeMap::new();
    let mut rules = Vec::new();

    for (threshold, tasks) in thresholds.iter() {
        let mut selected = Vec::new();
        for task in tasks {
            match claimed.get(task.as_str()) {
                Some(kept) => ctx.skip(
                    tuning.category,
                    SkipReason::DuplicateTask {
                        task: task.clone(),
                        kept: kept.to_string(),
                        ignored: threshold.to_string(),
                    },
                ),
                None => {
                    claimed.insert(task.as_str(), threshold);
                    selected.push(task.as_str());
                }
            }
        }

        let name = format!("Set {} to {threshold}", tuning.label);
        let Some(selector) = guard::member_of(attr::SUBTASK_NAME, selected) else {
            ctx.skip(tuning.category, SkipReason::EmptySelector { rule: name });
            continue;
        };

        let mut builder = Rule::builder(tuning.category, name)
            .guard(selector)
            .guard(guard::flag_is_not_true(tuning.marker))
            .guard(guard::compare(tuning.attr, CmpOp::Isnt, threshold))
            .set(tuning.attr, Expr::lit(threshold));
        if let Some(extra) = tuning.extra {
            let (attr, expr) = extra();
            builder = builder.eval_set(attr, expr);
        }
        rules.push(builder.marker(tuning.marker, true).build());
    }

    rules
}
