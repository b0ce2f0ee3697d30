//! ClassAd text rendering.
//!
//! This is the only module that knows ClassAd surface syntax. Output is
//! deterministic: record keys are emitted in sorted order and parentheses are
//! inserted only where precedence requires them.

use std::fmt::{self, Write};

use crate::expr::{AttrRef, Expr, Scope, UnaryOp};
use crate::Value;

const UNARY_PRECEDENCE: u8 = 8;
const PRIMARY_PRECEDENCE: u8 = 9;

/// Words that cannot appear as bare attribute names.
const RESERVED: &[&str] = &[
    "true",
    "false",
    "undefined",
    "error",
    "is",
    "isnt",
    "my",
    "target",
    "parent",
];

/// Quotes a string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Returns true if `name` can be written without quoting.
pub fn is_plain_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return false;
    }
    !RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

/// Renders an attribute name, single-quoting it when necessary.
pub fn attribute_name(name: &str) -> String {
    if is_plain_name(name) {
        return name.to_string();
    }

    let mut out = String::with_capacity(name.len() + 2);
    out.push('\'');
    for c in name.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn format_real(r: f64) -> String {
    if r.is_nan() {
        return "real(\"NaN\")".to_string();
    }
    if r.is_infinite() {
        return if r > 0.0 {
            "real(\"INF\")".to_string()
        } else {
            "real(\"-INF\")".to_string()
        };
    }
    let s = format!("{r}");
    if s.contains(['.', 'e', 'E']) {
        s
    } else {
        format!("{s}.0")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Error => f.write_str("error"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => f.write_str(&format_real(*r)),
            Value::Str(s) => f.write_str(&quote(s)),
            Value::List(items) => {
                if items.is_empty() {
                    return f.write_str("{ }");
                }
                f.write_str("{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str(" }")
            }
            Value::Record(map) => {
                if map.is_empty() {
                    return f.write_str("[ ]");
                }
                f.write_str("[ ")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{} = {value}", attribute_name(key))?;
                }
                f.write_str(" ]")
            }
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(Scope::Target) => f.write_str("target.")?,
            Some(Scope::My) => f.write_str("my.")?,
            None => {}
        }
        f.write_str(&attribute_name(&self.name))
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } => UNARY_PRECEDENCE,
        Expr::Lit(Value::Int(i)) if *i < 0 => UNARY_PRECEDENCE,
        Expr::Lit(Value::Real(r)) if *r < 0.0 => UNARY_PRECEDENCE,
        _ => PRIMARY_PRECEDENCE,
    }
}

fn write_expr<W: Write>(out: &mut W, expr: &Expr, min_precedence: u8) -> fmt::Result {
    let wrap = precedence(expr) < min_precedence;
    if wrap {
        out.write_char('(')?;
    }

    match expr {
        Expr::Lit(value) => write!(out, "{value}")?,
        Expr::Attr(attr) => write!(out, "{attr}")?,
        Expr::Unary {
            op: UnaryOp::Neg,
            expr,
        } => {
            out.write_char('-')?;
            write_expr(out, expr, UNARY_PRECEDENCE)?;
        }
        Expr::Binary { op, lhs, rhs } => {
            let p = op.precedence();
            write_expr(out, lhs, p)?;
            write!(out, " {} ", op.symbol())?;
            write_expr(out, rhs, p + 1)?;
        }
        Expr::Member { item, list } => {
            out.write_str("member(")?;
            write_expr(out, item, 0)?;
            out.write_str(", ")?;
            write_expr(out, list, 0)?;
            out.write_char(')')?;
        }
        Expr::Regexp { pattern, target } => {
            write!(out, "regexp({}, ", quote(pattern))?;
            write_expr(out, target, 0)?;
            out.write_char(')')?;
        }
        Expr::Call { func, args } => {
            write!(out, "{}(", func.name())?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.write_str(", ")?;
                }
                write_expr(out, arg, 0)?;
            }
            out.write_char(')')?;
        }
        Expr::Cond {
            cond,
            then,
            otherwise,
        } => {
            out.write_str("ifThenElse(")?;
            write_expr(out, cond, 0)?;
            out.write_str(", ")?;
            write_expr(out, then, 0)?;
            out.write_str(", ")?;
            write_expr(out, otherwise, 0)?;
            out.write_char(')')?;
        }
    }

    if wrap {
        out.write_char(')')?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(f, self, 0)
    }
}
