//! Site-level hold and release.
//!
//! Holding a site removes it from every whitelist that mentions it and
//! records `HasBeenHeldFrom<site>`; releasing appends it back unless the
//! whitelist already lists it.

use std::collections::BTreeSet;

use jobrouter_expr::{guard, BinaryOp, Expr, Func};
use jobrouter_policy::PolicyDocument;
use super::{Context, SkipReason};
use crate::{attr, marker, Category, Rule};

pub(super) fn compile_hold(doc: &PolicyDocument, ctx: &mut Context<'_>) -> Vec<Rule> {
    let released: BTreeSet<&str> = doc.release_site.iter().map(|s| s.trim()).collect();

    let mut rules = Vec::new();
    for site in ctx.valid_sites(Category::HoldSite, &doc.hold_site) {
        if released.contains(site.as_str()) {
            ctx.skip(
                Category::HoldSite,
                SkipReason::HoldReleaseConflict {
                    subject: site.to_string(),
                },
            );
            continue;
        }

        let held = marker::held_from(&site);
        let rule = Rule::builder(Category::HoldSite, format!("Holding jobs from {site}"))
            .guard(guard::matches_regex(site.as_str(), attr::DESIRED_SITES))
            .guard(guard::flag_is_not_true(held.as_str()))
            .copy(attr::DESIRED_SITES, attr::HOLDING_DESIRED_SITES)
            .eval_set(
                attr::DESIRED_SITES,
                Expr::call(
                    Func::RemoveSite,
                    vec![
                        Expr::lit(site.as_str()),
                        Expr::attr(attr::HOLDING_DESIRED_SITES),
                    ],
                ),
            )
            .marker(&held, true)
            .build();
        rules.push(rule);
    }
    rules
}

pub(super) fn compile_release(doc: &PolicyDocument, ctx: &mut Context<'_>) -> Vec<Rule> {
    let mut rules = Vec::new();
    for site in ctx.valid_sites(Category::ReleaseSite, &doc.release_site) {
        let held = marker::held_from(&site);
        let saved = Expr::attr(attr::RELEASING_DESIRED_SITES);
        let appended = Expr::if_then_else(
            Expr::call(
                Func::StringListMember,
                vec![Expr::lit(site.as_str()), saved.clone()],
            ),
            saved.clone(),
            Expr::call(
                Func::Strcat,
                vec![saved.clone(), Expr::lit(format!(",{site}"))],
            ),
        );
        let restored = Expr::if_then_else(
            Expr::binary(BinaryOp::Eq, saved, Expr::lit("")),
            Expr::lit(site.as_str()),
            appended,
        );

        let rule = Rule::builder(Category::ReleaseSite, format!("Releasing jobs for {site}"))
            .guard(guard::flag_is_true(held.as_str()))
            .copy(attr::DESIRED_SITES, attr::RELEASING_DESIRED_SITES)
            .eval_set(attr::DESIRED_SITES, restored)
            .delete(attr::RELEASING_DESIRED_SITES)
            .marker(&held, false)
            .build();
        rules.push(rule);
    }
    rules
}
