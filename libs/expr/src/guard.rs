//! Guard expression builder.
//!
//! A [`Guard`] is a conjunction of predicates. There is no OR; the only
//! negations available are [`flag_is_not_true`] and the `isnt` comparison.
//!
//! # Invariants
//!
//! - `member_of` renders its set sorted and deduplicated, so the output does
//!   not depend on input order.
//! - `member_of` over an empty set returns `None`: such a guard could never
//!   hold, and the caller must skip the rule instead of emitting it.
//! - Regex matches are unanchored: `T2_CH_CERN` also matches
//!   `T2_CH_CERN_HLT`.

use std::collections::BTreeSet;
use std::fmt;

use crate::expr::{AttrRef, BinaryOp, Expr};
use crate::{eval, JobAd, Value};

/// Comparison operators accepted by [`compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Is,
    Isnt,
}

impl From<CmpOp> for BinaryOp {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Eq => BinaryOp::Eq,
            CmpOp::Ne => BinaryOp::Ne,
            CmpOp::Lt => BinaryOp::Lt,
            CmpOp::Le => BinaryOp::Le,
            CmpOp::Gt => BinaryOp::Gt,
            CmpOp::Ge => BinaryOp::Ge,
            CmpOp::Is => BinaryOp::Is,
            CmpOp::Isnt => BinaryOp::Isnt,
        }
    }
}

/// `member(attr, { ... })` over a sorted, deduplicated set.
///
/// Returns `None` when the set is empty.
pub fn member_of<I, S>(attr: impl Into<AttrRef>, set: I) -> Option<Expr>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let items: BTreeSet<String> = set.into_iter().map(Into::into).collect();
    if items.is_empty() {
        return None;
    }
    Some(Expr::member(
        Expr::Attr(attr.into()),
        Expr::lit(Value::string_list(items)),
    ))
}

/// `regexp(pattern, attr)`.
pub fn matches_regex(pattern: impl Into<String>, attr: impl Into<AttrRef>) -> Expr {
    Expr::regexp(pattern, Expr::Attr(attr.into()))
}

/// `attr =?= true`.
pub fn flag_is_true(attr: impl Into<AttrRef>) -> Expr {
    Expr::Attr(attr.into()).is(Expr::lit(true))
}

/// `attr =!= true`. Holds when the flag is absent.
pub fn flag_is_not_true(attr: impl Into<AttrRef>) -> Expr {
    Expr::Attr(attr.into()).isnt(Expr::lit(true))
}

/// `attr <op> literal`.
pub fn compare(attr: impl Into<AttrRef>, op: CmpOp, literal: impl Into<Value>) -> Expr {
    Expr::binary(op.into(), Expr::Attr(attr.into()), Expr::lit(literal))
}

/// A conjunction of predicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Guard {
    clauses: Vec<Expr>,
}

impl Guard {
    /// Creates an empty guard, which always holds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause.
    #[must_use]
    pub fn and(mut self, clause: Expr) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn clauses(&self) -> &[Expr] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Folds the clauses left to right into one `&&` chain.
    pub fn to_expr(&self) -> Expr {
        let mut clauses = self.clauses.iter().cloned();
        match clauses.next() {
            Some(first) => clauses.fold(first, Expr::and),
            None => Expr::lit(true),
        }
    }

    /// Evaluates the guard against a job ad.
    pub fn evaluate(&self, ad: &JobAd) -> Value {
        eval(&self.to_expr(), ad)
    }

    /// True only when the guard evaluates to exactly `true`.
    pub fn is_satisfied(&self, ad: &JobAd) -> bool {
        self.evaluate(ad).is_true()
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_expr())
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_member_of_sorts_and_dedups() {
        let expr = member_of("WMAgent_SubTaskName", ["/b", "/a", "/b"]).unwrap();
        assert_eq!(
            expr.to_string(),
            r#"member(WMAgent_SubTaskName, { "/a", "/b" })"#
        );
    }

    #[test]
    fn test_member_of_empty_set_is_none() {
        assert!(member_of("WMAgent_SubTaskName", Vec::<String>::new()).is_none());
    }

    #[test]
    fn test_empty_guard_holds() {
        let guard = Guard::new();
        assert!(guard.is_empty());
        assert!(guard.is_satisfied(&JobAd::new()));
        assert_eq!(guard.to_string(), "true");
    }

    #[test]
    fn test_guard_rendering_and_evaluation() {
        let guard = Guard::new()
            .and(member_of("WMAgent_SubTaskName", ["/wf/A"]).unwrap())
            .and(flag_is_not_true("HasBeenMemoryTuned"))
            .and(compare("OriginalMemory", CmpOp::Isnt, 2000));

        assert_eq!(
            guard.to_string(),
            r#"member(WMAgent_SubTaskName, { "/wf/A" }) && HasBeenMemoryTuned =!= true && OriginalMemory =!= 2000"#
        );

        let mut ad = JobAd::new();
        ad.set("WMAgent_SubTaskName", "/wf/A");
        ad.set("OriginalMemory", 4000);
        assert!(guard.is_satisfied(&ad));

        ad.set("HasBeenMemoryTuned", true);
        assert!(!guard.is_satisfied(&ad));
    }

    #[test]
    fn test_undefined_guard_is_not_satisfied() {
        let guard = Guard::new().and(compare("JobStatus", CmpOp::Eq, 1));
        let ad = JobAd::new();
        assert_eq!(guard.evaluate(&ad), Value::Undefined);
        assert!(!guard.is_satisfied(&ad));
    }

    #[test]
    fn test_target_scope_renders() {
        let expr = flag_is_not_true(AttrRef::target("HasBeenSorted"));
        assert_eq!(expr.to_string(), "target.HasBeenSorted =!= true");
    }

    proptest! {
        #[test]
        fn test_member_of_is_order_insensitive(mut tasks in prop::collection::vec("[a-z/]{1,8}", 1..8)) {
            let forward = member_of("T", tasks.clone()).unwrap().to_string();
            tasks.reverse();
            let backward = member_of("T", tasks).unwrap().to_string();
            prop_assert_eq!(forward, backward);
        }
    }
}
