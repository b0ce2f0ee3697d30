//! Rules and their construction.

use jobrouter_expr::{Expr, Guard, JobAd};

use crate::marker;
use crate::Category;

/// One attribute mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Copies attribute `from` to `to`; `from` is left in place.
    Copy { from: String, to: String },

    /// Stores `expr` unevaluated.
    Set { attr: String, expr: Expr },

    /// Evaluates `expr` against the job and stores the result.
    EvalSet { attr: String, expr: Expr },

    /// Removes the attribute.
    Delete { attr: String },
}

impl Mutation {
    /// The ClassAd directive name, e.g. `eval_set_DESIRED_Sites`.
    pub fn directive(&self) -> String {
        match self {
            Mutation::Copy { from, .. } => format!("copy_{from}"),
            Mutation::Set { attr, .. } => format!("set_{attr}"),
            Mutation::EvalSet { attr, .. } => format!("eval_set_{attr}"),
            Mutation::Delete { attr } => format!("delete_{attr}"),
        }
    }

    /// Applies the mutation to `ad`.
    ///
    /// Copying an absent attribute leaves the destination untouched.
    pub fn apply(&self, ad: &mut JobAd) {
        match self {
            Mutation::Copy { from, to } => {
                if let Some(expr) = ad.get_expr(from).cloned() {
                    ad.set_expr(to, expr);
                }
            }
            Mutation::Set { attr, expr } => ad.set_expr(attr, expr.clone()),
            Mutation::EvalSet { attr, expr } => {
                let value = ad.evaluate(expr);
                ad.set(attr, value);
            }
            Mutation::Delete { attr } => {
                ad.remove(attr);
            }
        }
    }
}

/// A marker flag assignment, applied after all mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerUpdate {
    pub flag: String,
    pub value: bool,
}

impl MarkerUpdate {
    pub fn directive(&self) -> String {
        format!("set_{}", self.flag)
    }
}

/// A compiled routing rule.
///
/// Built with [`RuleBuilder`] and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    name: String,
    category: Category,
    guard: Guard,
    mutations: Vec<Mutation>,
    markers: Vec<MarkerUpdate>,
}

impl Rule {
    /// Starts building a rule.
    pub fn builder(category: Category, name: impl Into<String>) -> RuleBuilder {
        RuleBuilder {
            rule: Rule {
                name: name.into(),
                category,
                guard: Guard::new(),
                mutations: Vec::new(),
                markers: Vec::new(),
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn markers(&self) -> &[MarkerUpdate] {
        &self.markers
    }

    /// True when the guard evaluates to exactly `true` on `ad`.
    pub fn matches(&self, ad: &JobAd) -> bool {
        self.guard.is_satisfied(ad)
    }

    /// Applies mutations in order, then marker updates.
    pub fn apply(&self, ad: &mut JobAd) {
        for mutation in &self.mutations {
            mutation.apply(ad);
        }
        for marker in &self.markers {
            ad.set(&marker.flag, marker.value);
        }
    }
}

/// Builder for [`Rule`].
#[derive(Debug, Clone)]
#[must_use]
pub struct RuleBuilder {
    rule: Rule,
}

impl RuleBuilder {
    /// ANDs a clause onto the guard.
    pub fn guard(mut self, clause: Expr) -> Self {
        self.rule.guard = self.rule.guard.and(clause);
        self
    }

    pub fn copy(mut self, from: &str, to: &str) -> Self {
        self.rule.mutations.push(Mutation::Copy {
            from: from.to_string(),
            to: to.to_string(),
        });
        self
    }

    pub fn set(mut self, attr: &str, expr: impl Into<Expr>) -> Self {
        self.rule.mutations.push(Mutation::Set {
            attr: attr.to_string(),
            expr: expr.into(),
        });
        self
    }

    pub fn eval_set(mut self, attr: &str, expr: impl Into<Expr>) -> Self {
        self.rule.mutations.push(Mutation::EvalSet {
            attr: attr.to_string(),
            expr: expr.into(),
        });
        self
    }

    pub fn delete(mut self, attr: &str) -> Self {
        self.rule.mutations.push(Mutation::Delete {
            attr: attr.to_string(),
        });
        self
    }

    /// Sets a marker flag after the mutations run.
    pub fn marker(mut self, flag: &str, value: bool) -> Self {
        self.rule.markers.push(MarkerUpdate {
            flag: flag.to_string(),
            value,
        });
        self
    }

    /// Finishes the rule, appending `HasBeenRouted = false` unless a marker
    /// for it is already present.
    pub fn build(mut self) -> Rule {
        let has_routed = self
            .rule
            .markers
            .iter()
            .any(|m| marker::same_flag(&m.flag, marker::HAS_BEEN_ROUTED));
        if !has_routed {
            self.rule.markers.push(MarkerUpdate {
                flag: marker::HAS_BEEN_ROUTED.to_string(),
                value: false,
            });
        }
        self.rule
    }
}
