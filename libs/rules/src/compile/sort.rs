//! Whitelist sorting.

use jobrouter_expr::{guard, AttrRef, Expr, Func, Value};

use super::Context;
use crate::{attr, marker, Category, Rule};

/// One rule that rewrites `DESIRED_Sites` into sorted, deduplicated form
/// after the job has been routed once.
///
/// The `sortStringSet("")` probe keeps the rule inert on routers that lack
/// the function.
pub(super) fn compile(ctx: &Context<'_>) -> Vec<Rule> {
    if !ctx.options.sort_whitelist {
        return Vec::new();
    }

    let probe = Expr::call(Func::SortStringSet, vec![Expr::lit("")]).isnt(Expr::lit(Value::Error));
    let routed = Expr::from(AttrRef::target(marker::HAS_BEEN_ROUTED)).is(Expr::lit(false));

    let rule = Rule::builder(Category::SortWhitelist, "Sort Ads")
        .guard(probe)
        .guard(routed)
        .guard(guard::flag_is_not_true(AttrRef::target(marker::HAS_BEEN_SORTED)))
        .copy(attr::DESIRED_SITES, attr::PREV_DESIRED_SITES)
        .eval_set(
            attr::DESIRED_SITES,
            Expr::call(Func::SortStringSet, vec![Expr::attr(attr::PREV_DESIRED_SITES)]),
        )
        .marker(marker::HAS_BEEN_SORTED, true)
        .build();
    vec![rule]
}
