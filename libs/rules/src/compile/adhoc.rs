//! Built-in ad-hoc corrections.
//!
//! A fixed table of value-guarded fixes for known bad requests. Each guard
//! tests the value the rule writes, or a marker, so every entry applies at
//! most once.

use jobrouter_expr::{guard, CmpOp, Expr, Func, Value};

use super::Context;
use crate::{attr, marker, Category, Rule};

const CATEGORY: Category = Category::AdHoc;

const T0_SITE: &str = "T0_CH_CERN";
const T0_OVERFLOW_SITE: &str = "T2_CH_CERN";
const T0_MEMORY_CAP: i64 = 14_800;
const KIT_WALL_TIME_CAP: i64 = 1_400;

pub(super) fn compile(ctx: &Context<'_>) -> Vec<Rule> {
    if !ctx.options.adhoc {
        return Vec::new();
    }

    vec![
        memory_fix(22_092, 18_000),
        memory_fix(23_260, 19_500),
        Rule::builder(CATEGORY, "Correcting memory requirement of 15200 for T0")
            .guard(guard::compare(attr::ORIGINAL_MEMORY, CmpOp::Gt, T0_MEMORY_CAP))
            .guard(guard::matches_regex("T0", attr::DESIRED_SITES))
            .set(attr::ORIGINAL_MEMORY, Expr::lit(T0_MEMORY_CAP))
            .build(),
        t0_spill_over(),
        Rule::builder(CATEGORY, "Routing multicore job from IFCA to other sites")
            .guard(guard::compare(attr::DESIRED_SITES, CmpOp::Eq, "T2_ES_IFCA"))
            .guard(guard::compare(attr::REQUEST_CPUS, CmpOp::Isnt, 1))
            .set(attr::DESIRED_SITES, Value::from("T1_ES_PIC,T2_ES_CIEMAT"))
            .build(),
        Rule::builder(CATEGORY, "Shortening long job on KIT")
            .guard(guard::compare(attr::DESIRED_SITES, CmpOp::Eq, "T1_DE_KIT"))
            .guard(guard::compare(attr::ORIGINAL_MAX_WALL_TIME, CmpOp::Gt, KIT_WALL_TIME_CAP))
            .set(attr::ORIGINAL_MAX_WALL_TIME, Expr::lit(KIT_WALL_TIME_CAP))
            .set(
                attr::ESTIMATED_SINGLE_CORE_MINS,
                Expr::attr(attr::ORIGINAL_MAX_WALL_TIME) * Expr::attr(attr::ORIGINAL_CPUS),
            )
            .build(),
    ]
}

fn memory_fix(from: i64, to: i64) -> Rule {
    Rule::builder(CATEGORY, format!("Correcting memory requirement of {from}"))
        .guard(guard::compare(attr::ORIGINAL_MEMORY, CmpOp::Is, from))
        .set(attr::ORIGINAL_MEMORY, Expr::lit(to))
        .build()
}

/// Lets T0 jobs spill over to the CERN T2.
fn t0_spill_over() -> Rule {
    let saved = Expr::attr(attr::T0_OFF_DESIRED_SITES);
    let already_listed = Expr::call(
        Func::StringListMember,
        vec![Expr::lit(T0_OVERFLOW_SITE), saved.clone()],
    );
    let appended = Expr::call(
        Func::Strcat,
        vec![saved.clone(), Expr::lit(format!(",{T0_OVERFLOW_SITE}"))],
    );

    Rule::builder(CATEGORY, "Draining T0 VMs")
        .guard(guard::matches_regex(T0_SITE, attr::DESIRED_SITES))
        .guard(guard::flag_is_not_true(marker::OUT_OF_T0))
        .copy(attr::DESIRED_SITES, attr::T0_OFF_DESIRED_SITES)
        .eval_set(
            attr::DESIRED_SITES,
            Expr::if_then_else(already_listed, saved, appended),
        )
        .marker(marker::OUT_OF_T0, true)
        .build()
}
