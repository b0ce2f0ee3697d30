//! Job ad model.

use std::collections::BTreeMap;

use crate::{eval, AdError, Expr, Value};

/// A job record: named attributes bound to expressions.
///
/// Attribute lookup is case-insensitive; the spelling of the most recent
/// write is kept for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobAd {
    attrs: BTreeMap<String, (String, Expr)>,
}

impl JobAd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to a literal value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        self.set_expr(name, Expr::Lit(value.into()));
    }

    /// Binds `name` to an unevaluated expression.
    pub fn set_expr(&mut self, name: &str, expr: Expr) {
        self.attrs
            .insert(name.to_ascii_lowercase(), (name.to_string(), expr));
    }

    /// The expression bound to `name`, if any.
    pub fn get_expr(&self, name: &str) -> Option<&Expr> {
        self.attrs.get(&name.to_ascii_lowercase()).map(|(_, e)| e)
    }

    /// Removes `name`, returning its expression.
    pub fn remove(&mut self, name: &str) -> Option<Expr> {
        self.attrs.remove(&name.to_ascii_lowercase()).map(|(_, e)| e)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Iterates `(name, expr)` in case-insensitive name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Expr)> {
        self.attrs.values().map(|(n, e)| (n.as_str(), e))
    }

    /// Evaluates the attribute `name`; absent attributes are `undefined`.
    pub fn eval_attr(&self, name: &str) -> Value {
        eval(&Expr::attr(name), self)
    }

    /// Evaluates an arbitrary expression in the context of this ad.
    pub fn evaluate(&self, expr: &Expr) -> Value {
        eval(expr, self)
    }

    /// Builds an ad from a JSON object. Every value is stored as a literal.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, AdError> {
        let serde_json::Value::Object(map) = json else {
            return Err(AdError::NotAnObject(json_type(json)));
        };

        let mut ad = JobAd::new();
        for (name, value) in map {
            if name.is_empty() {
                return Err(AdError::EmptyAttributeName);
            }
            ad.set(name, Value::from_json(value));
        }
        Ok(ad)
    }

    /// Serialises the ad as a JSON object. Literals keep their JSON form;
    /// unevaluated expressions are written as their ClassAd text.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .iter()
            .map(|(name, expr)| {
                let value = match expr.as_lit() {
                    Some(lit) => lit.to_json(),
                    None => serde_json::Value::String(expr.to_string()),
                };
                (name.to_string(), value)
            })
            .collect();
        serde_json::Value::Object(map)
    }
}

fn json_type(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_keys_keep_latest_spelling() {
        let mut ad = JobAd::new();
        ad.set("desired_sites", "T1_US_FNAL");
        ad.set("DESIRED_Sites", "T2_CH_CERN");
        assert_eq!(ad.len(), 1);
        assert_eq!(ad.eval_attr("Desired_Sites"), Value::from("T2_CH_CERN"));
        assert_eq!(ad.iter().next().map(|(n, _)| n), Some("DESIRED_Sites"));

        assert!(ad.remove("DESIRED_SITES").is_some());
        assert!(!ad.contains("DESIRED_Sites"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        let err = JobAd::from_json(&serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err, AdError::NotAnObject("array"));

        let err = JobAd::from_json(&serde_json::json!({"": 1})).unwrap_err();
        assert_eq!(err, AdError::EmptyAttributeName);
    }

    #[test]
    fn test_json_round_trip_keeps_expressions_as_text() {
        let mut ad = JobAd::from_json(&serde_json::json!({
            "JobPrio": 10,
            "DESIRED_Sites": "T1_US_FNAL",
        }))
        .unwrap();
        ad.set_expr("PostJobPrio1", Expr::attr("JR_PostJobPrio1"));

        let json = ad.to_json();
        assert_eq!(json["JobPrio"], serde_json::json!(10));
        assert_eq!(json["PostJobPrio1"], serde_json::json!("JR_PostJobPrio1"));
    }
}
