//! Dry-run router.
//!
//! Replays a [`RuleSet`] against one job ad the way the external router
//! does: each cycle applies the first rule, in emission order, whose guard
//! holds. A sound rule set converges; reset rules deliberately undo markers
//! and may keep a job cycling.

use jobrouter_expr::JobAd;

use crate::{Rule, RuleSet};

/// The outcome of [`Router::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    /// Names of the rules that fired, in order.
    pub fired: Vec<String>,

    /// True if a cycle ended with no matching rule.
    pub converged: bool,
}

impl Trace {
    /// Number of cycles that applied a rule.
    pub fn cycles(&self) -> usize {
        self.fired.len()
    }
}

/// Applies rules to job ads.
#[derive(Debug, Clone, Copy)]
pub struct Router<'a> {
    rules: &'a RuleSet,
}

impl<'a> Router<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// The first rule whose guard holds on `ad`.
    pub fn first_match(&self, ad: &JobAd) -> Option<&'a Rule> {
        self.rules.iter().find(|rule| rule.matches(ad))
    }

    /// Applies at most one rule and returns its name.
    pub fn cycle(&self, ad: &mut JobAd) -> Option<&'a str> {
        let rule = self.first_match(ad)?;
        tracing::debug!(rule = rule.name(), category = %rule.category(), "rule matched");
        rule.apply(ad);
        Some(rule.name())
    }

    /// Cycles until no rule matches or `max_cycles` rules have fired.
    pub fn run(&self, ad: &mut JobAd, max_cycles: usize) -> Trace {
        let mut trace = Trace::default();
        while trace.fired.len() < max_cycles {
            match self.cycle(ad) {
                Some(name) => trace.fired.push(name.to_string()),
                None => {
                    trace.converged = true;
                    return trace;
                }
            }
        }
        trace.converged = self.first_match(ad).is_none();
        trace
    }
}

#[cfg(test)]
mod tests {
    use jobrouter_expr::{guard, Value};

    use super::*;
    use crate::{marker, Category};

    fn one_shot(name: &str, flag: &str) -> Rule {
        Rule::builder(Category::AdHoc, name)
            .guard(guard::flag_is_not_true(flag))
            .marker(flag, true)
            .build()
    }

    #[test]
    fn test_first_match_wins_each_cycle() {
        let rules = RuleSet::new(vec![one_shot("first", "A"), one_shot("second", "B")]);
        let router = Router::new(&rules);
        let mut ad = JobAd::new();

        assert_eq!(router.cycle(&mut ad), Some("first"));
        assert_eq!(router.cycle(&mut ad), Some("second"));
        assert_eq!(router.cycle(&mut ad), None);
        assert_eq!(ad.eval_attr(marker::HAS_BEEN_ROUTED), Value::Bool(false));
    }

    #[test]
    fn test_run_reports_convergence() {
        let rules = RuleSet::new(vec![one_shot("first", "A"), one_shot("second", "B")]);
        let trace = Router::new(&rules).run(&mut JobAd::new(), 10);
        assert_eq!(trace.fired, vec!["first", "second"]);
        assert!(trace.converged);
        assert_eq!(trace.cycles(), 2);
    }

    #[test]
    fn test_run_stops_at_limit() {
        let flip = Rule::builder(Category::Reset, "flip")
            .guard(guard::flag_is_true("A"))
            .marker("A", false)
            .build();
        let rules = RuleSet::new(vec![one_shot("set", "A"), flip]);
        let trace = Router::new(&rules).run(&mut JobAd::new(), 5);
        assert_eq!(trace.cycles(), 5);
        assert!(!trace.converged);
    }
}
