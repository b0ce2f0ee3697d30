//! Priority correction.

use jobrouter_expr::{guard, AttrRef, Expr};

use crate::priority::{primary_expr, secondary_expr};
use crate::{attr, marker, Category, Rule};

/// One rule that saves the agent's native priorities and replaces them with
/// the composite keys from [`crate::priority`].
pub(super) fn compile() -> Vec<Rule> {
    let rule = Rule::builder(Category::PriorityCorrection, "Prio Corrections")
        .guard(guard::flag_is_not_true(AttrRef::target(marker::HAS_PRIO_CORRECTION)))
        .copy(attr::POST_JOB_PRIO1, attr::AGENT_POST_JOB_PRIO1)
        .copy(attr::POST_JOB_PRIO2, attr::AGENT_POST_JOB_PRIO2)
        .eval_set(attr::ROUTER_POST_JOB_PRIO1, primary_expr())
        .eval_set(attr::ROUTER_POST_JOB_PRIO2, secondary_expr())
        .set(attr::POST_JOB_PRIO1, Expr::attr(attr::ROUTER_POST_JOB_PRIO1))
        .set(attr::POST_JOB_PRIO2, Expr::attr(attr::ROUTER_POST_JOB_PRIO2))
        .marker(marker::HAS_PRIO_CORRECTION, true)
        .build();
    vec![rule]
}

#[cfg(test)]
mod tests {
    use jobrouter_expr::{JobAd, Value};

    use super::*;
    use crate::PriorityInputs;

    #[test]
    fn test_correction_matches_pure_encoder() {
        let rule = compile().remove(0);

        let mut ad = JobAd::new();
        ad.set(attr::POST_JOB_PRIO1, -2);
        ad.set(attr::POST_JOB_PRIO2, 40);
        ad.set(attr::SUBTASK_NAME, "/wf/Task");
        ad.set(attr::MAX_WALL_TIME, 600);
        ad.set(attr::REQUEST_DISK, 2_000_000);

        let inputs = PriorityInputs::from_ad(&ad).unwrap();
        assert!(rule.matches(&ad));
        rule.apply(&mut ad);

        assert_eq!(
            ad.eval_attr(attr::POST_JOB_PRIO1),
            Value::Int(inputs.primary_key().unwrap())
        );
        assert_eq!(
            ad.eval_attr(attr::POST_JOB_PRIO2),
            Value::Int(inputs.secondary_key().unwrap())
        );
        assert_eq!(ad.eval_attr(attr::AGENT_POST_JOB_PRIO1), Value::Int(-2));
        assert!(!rule.matches(&ad));
    }

    #[test]
    fn test_priorities_are_references() {
        let rule = compile().remove(0);
        let mut ad = JobAd::new();
        rule.apply(&mut ad);
        assert_eq!(
            ad.get_expr(attr::POST_JOB_PRIO1),
            Some(&Expr::attr(attr::ROUTER_POST_JOB_PRIO1))
        );
    }
}
