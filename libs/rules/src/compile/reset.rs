//! Reset pass: clears listed marker flags so their rules can fire again.

use jobrouter_expr::guard;

use crate::{marker, Category, Rule};

/// One rule per distinct flag. Flags compare case-insensitively, like all
/// attribute names; the first spelling wins.
pub(super) fn compile(flags: &[String]) -> Vec<Rule> {
    let mut seen: Vec<&str> = Vec::new();
    let mut rules = Vec::new();

    for flag in flags.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
        if seen.iter().any(|s| marker::same_flag(s, flag)) {
            continue;
        }
        seen.push(flag);

        rules.push(
            Rule::builder(Category::Reset, format!("Reset routing for {flag}"))
                .guard(guard::flag_is_true(flag))
                .marker(flag, false)
                .build(),
        );
    }
    rules
}
