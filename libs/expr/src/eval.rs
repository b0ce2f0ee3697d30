//! ClassAd-compatible evaluation against a [`JobAd`].
//!
//! # Invariants
//!
//! - Evaluation never panics and never fails: every type mismatch, overflow
//!   or malformed argument yields [`Value::Error`].
//! - Reading an absent attribute yields [`Value::Undefined`].
//! - `is` / `isnt` always yield a boolean.
//! - Attribute chains deeper than [`MAX_DEPTH`] yield `error`, so a
//!   self-referencing attribute cannot recurse forever.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use jobrouter_sites::sitelist;
use regex::Regex;

use crate::expr::{BinaryOp, Expr, Func, UnaryOp};
use crate::{JobAd, Value};

/// Maximum attribute indirection depth.
pub const MAX_DEPTH: usize = 32;

/// Evaluates `expr` against `ad`.
pub fn eval(expr: &Expr, ad: &JobAd) -> Value {
    eval_at(expr, ad, 0)
}

fn eval_at(expr: &Expr, ad: &JobAd, depth: usize) -> Value {
    match expr {
        Expr::Lit(value) => value.clone(),
        Expr::Attr(attr) => {
            if depth >= MAX_DEPTH {
                return Value::Error;
            }
            match ad.get_expr(&attr.name) {
                Some(inner) => eval_at(inner, ad, depth + 1),
                None => Value::Undefined,
            }
        }
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
        } => negate(eval_at(expr, ad, depth)),
        Expr::Binary {
            op: BinaryOp::And,
            lhs,
            rhs,
        } => and(ad, lhs, rhs, depth),
        Expr::Binary { op, lhs, rhs } => {
            let l = eval_at(lhs, ad, depth);
            let r = eval_at(rhs, ad, depth);
            binary(*op, &l, &r)
        }
        Expr::Member { item, list } => {
            let item = eval_at(item, ad, depth);
            let list = eval_at(list, ad, depth);
            member(&item, &list)
        }
        Expr::Regexp { pattern, target } => regexp(pattern, &eval_at(target, ad, depth)),
        Expr::Call { func, args } => {
            let args: Vec<Value> = args.iter().map(|a| eval_at(a, ad, depth)).collect();
            call(*func, &args)
        }
        Expr::Cond {
            cond,
            then,
            otherwise,
        } => {
            let c = eval_at(cond, ad, depth);
            match truth(&c) {
                Some(true) => eval_at(then, ad, depth),
                Some(false) => eval_at(otherwise, ad, depth),
                None if c.is_undefined() => Value::Undefined,
                None => Value::Error,
            }
        }
    }
}

/// Condition truthiness: booleans as-is, numbers by non-zero.
fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(i) => Some(*i != 0),
        Value::Real(r) => Some(*r != 0.0),
        _ => None,
    }
}

/// `&&` with ClassAd semantics.
///
/// `false` dominates `undefined`; `error` dominates everything on the left;
/// non-boolean operands are an error.
fn and(ad: &JobAd, lhs: &Expr, rhs: &Expr, depth: usize) -> Value {
    let l = eval_at(lhs, ad, depth);
    match l {
        Value::Bool(false) => Value::Bool(false),
        Value::Bool(true) => match eval_at(rhs, ad, depth) {
            r @ (Value::Bool(_) | Value::Undefined) => r,
            _ => Value::Error,
        },
        Value::Undefined => match eval_at(rhs, ad, depth) {
            Value::Bool(false) => Value::Bool(false),
            Value::Bool(true) | Value::Undefined => Value::Undefined,
            _ => Value::Error,
        },
        _ => Value::Error,
    }
}

fn negate(value: Value) -> Value {
    match value {
        Value::Int(i) => i.checked_neg().map(Value::Int).unwrap_or(Value::Error),
        Value::Real(r) => Value::Real(-r),
        Value::Undefined => Value::Undefined,
        _ => Value::Error,
    }
}

/// Propagates `error` first, then `undefined`.
fn strict(l: &Value, r: &Value) -> Option<Value> {
    if l.is_error() || r.is_error() {
        Some(Value::Error)
    } else if l.is_undefined() || r.is_undefined() {
        Some(Value::Undefined)
    } else {
        None
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Is => return Value::Bool(l.identical(r)),
        BinaryOp::Isnt => return Value::Bool(!l.identical(r)),
        _ => {}
    }

    if let Some(v) = strict(l, r) {
        return v;
    }

    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => arithmetic(op, l, r),
        BinaryOp::Eq => equals(l, r).map(Value::Bool).unwrap_or(Value::Error),
        BinaryOp::Ne => equals(l, r).map(|b| Value::Bool(!b)).unwrap_or(Value::Error),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => match order(l, r) {
            Some(ord) => Value::Bool(match op {
                BinaryOp::Lt => ord == Ordering::Less,
                BinaryOp::Le => ord != Ordering::Greater,
                BinaryOp::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            }),
            None => Value::Error,
        },
        BinaryOp::Is | BinaryOp::Isnt | BinaryOp::And => Value::Error,
    }
}

fn arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => {
            let out = match op {
                BinaryOp::Add => a.checked_add(*b),
                BinaryOp::Sub => a.checked_sub(*b),
                BinaryOp::Mul => a.checked_mul(*b),
                BinaryOp::Div => a.checked_div(*b),
                _ => None,
            };
            out.map(Value::Int).unwrap_or(Value::Error)
        }
        _ => {
            let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) else {
                return Value::Error;
            };
            match op {
                BinaryOp::Add => Value::Real(a + b),
                BinaryOp::Sub => Value::Real(a - b),
                BinaryOp::Mul => Value::Real(a * b),
                BinaryOp::Div if b == 0.0 => Value::Error,
                BinaryOp::Div => Value::Real(a / b),
                _ => Value::Error,
            }
        }
    }
}

/// `==` on defined scalars. Strings compare case-insensitively.
fn equals(l: &Value, r: &Value) -> Option<bool> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.eq_ignore_ascii_case(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a == b),
        _ => order(l, r).map(|o| o == Ordering::Equal),
    }
}

fn order(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Str(a), Value::Str(b)) => Some(a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase())),
        _ => {
            let (a, b) = (l.as_f64()?, r.as_f64()?);
            a.partial_cmp(&b)
        }
    }
}

fn member(item: &Value, list: &Value) -> Value {
    if let Some(v) = strict(item, list) {
        return v;
    }
    let Value::List(items) = list else {
        return Value::Error;
    };
    if matches!(item, Value::List(_) | Value::Record(_)) {
        return Value::Error;
    }
    Value::Bool(
        items
            .iter()
            .any(|candidate| equals(item, candidate).unwrap_or(false)),
    )
}

/// Upper bound on cached patterns; the cache is cleared when it fills.
const PATTERN_CACHE_LIMIT: usize = 256;

/// Compiles `pattern` once per process. Invalid patterns are cached as `None`.
fn compiled(pattern: &str) -> Option<Regex> {
    static CACHE: OnceLock<Mutex<HashMap<String, Option<Regex>>>> = OnceLock::new();
    let mut cache = CACHE
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(cached) = cache.get(pattern) {
        return cached.clone();
    }
    if cache.len() >= PATTERN_CACHE_LIMIT {
        cache.clear();
    }
    let re = Regex::new(pattern).ok();
    cache.insert(pattern.to_string(), re.clone());
    re
}

fn regexp(pattern: &str, target: &Value) -> Value {
    match target {
        Value::Str(s) => match compiled(pattern) {
            Some(re) => Value::Bool(re.is_match(s)),
            None => Value::Error,
        },
        Value::Undefined => Value::Undefined,
        _ => Value::Error,
    }
}

/// String form used by `strcat`.
fn concat_piece(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Real(_) | Value::Bool(_) => Some(value.to_string()),
        _ => None,
    }
}

fn call(func: Func, args: &[Value]) -> Value {
    match (func, args) {
        (Func::Size, [Value::Str(s)]) => Value::Int(s.chars().count() as i64),
        (Func::Size, [Value::List(items)]) => Value::Int(items.len() as i64),
        (Func::Size, [Value::Undefined]) => Value::Undefined,

        (Func::Strcat, args) => {
            if args.iter().any(Value::is_error) {
                return Value::Error;
            }
            if args.iter().any(Value::is_undefined) {
                return Value::Undefined;
            }
            let mut out = String::new();
            for arg in args {
                match concat_piece(arg) {
                    Some(piece) => out.push_str(&piece),
                    None => return Value::Error,
                }
            }
            Value::Str(out)
        }

        (Func::StringListMember, [item, list]) => match strict(item, list) {
            Some(v) => v,
            None => match (item, list) {
                (Value::Str(item), Value::Str(list)) => Value::Bool(sitelist::contains(list, item)),
                _ => Value::Error,
            },
        },

        (Func::SortStringSet, [Value::Str(list)]) => Value::Str(sitelist::sort_set(list)),
        (Func::SortStringSet, [Value::Undefined]) => Value::Undefined,

        (Func::SiteMapping, [list, mapping]) => match strict(list, mapping) {
            Some(v) => v,
            None => site_mapping(list, mapping),
        },

        (Func::RemoveSite, [site, list]) => match strict(site, list) {
            Some(v) => v,
            None => match (site, list) {
                (Value::Str(site), Value::Str(list)) => Value::Str(sitelist::remove(list, site)),
                _ => Value::Error,
            },
        },

        _ => Value::Error,
    }
}

/// `siteMapping(list, record)`: appends every destination the record maps a
/// listed source to.
fn site_mapping(list: &Value, mapping: &Value) -> Value {
    let (Value::Str(list), Value::Record(mapping)) = (list, mapping) else {
        return Value::Error;
    };

    let mut malformed = false;
    let expanded = sitelist::expand(list, |source| match mapping.get(source) {
        Some(Value::List(dests)) => dests
            .iter()
            .filter_map(|d| match d.as_str() {
                Some(s) => Some(s.to_string()),
                None => {
                    malformed = true;
                    None
                }
            })
            .collect(),
        Some(_) => {
            malformed = true;
            Vec::new()
        }
        None => Vec::new(),
    });

    if malformed {
        Value::Error
    } else {
        Value::Str(expanded)
    }
}
