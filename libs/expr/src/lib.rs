//! # jobrouter-expr
//!
//! A small typed expression language for job-router rules.
//!
//! ## Layers
//!
//! - [`Value`]: literal values (strings, numbers, lists, records, `undefined`, `error`)
//! - [`Expr`]: the expression tree (attribute references, comparisons,
//!   membership, regex matches, conditionals, a fixed set of functions)
//! - [`Guard`]: an AND-only conjunction of predicates built by the
//!   [`guard`] helpers
//! - [`render`]: the single place that turns trees into ClassAd text
//! - [`eval`]: a ClassAd-compatible evaluator against a [`JobAd`]
//!
//! ## Three-valued logic
//!
//! A missing attribute evaluates to `undefined`. Ordinary comparisons with
//! `undefined` yield `undefined`; the identity operators `is` / `isnt` never
//! do. A guard holds only when it evaluates to exactly `true`, so an absent
//! marker flag reads as "not true" without being an error.

mod ad;
mod error;
pub mod eval;
mod expr;
pub mod guard;
pub mod render;
mod value;

pub use ad::JobAd;
pub use error::AdError;
pub use eval::eval;
pub use expr::{AttrRef, BinaryOp, Expr, Func, Scope, UnaryOp};
pub use guard::{CmpOp, Guard};
pub use value::Value;
