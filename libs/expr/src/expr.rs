//! The expression tree.

use std::ops;

use crate::Value;

/// Which ad an attribute reference resolves against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The job being routed (`target.X`).
    Target,
    /// The rule ad itself (`my.X`).
    My,
}

/// A reference to a named attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrRef {
    pub scope: Option<Scope>,
    pub name: String,
}

impl AttrRef {
    /// Unscoped reference (`X`).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            scope: None,
            name: name.into(),
        }
    }

    /// Reference into the job ad (`target.X`).
    pub fn target(name: impl Into<String>) -> Self {
        Self {
            scope: Some(Scope::Target),
            name: name.into(),
        }
    }
}

impl From<&str> for AttrRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for AttrRef {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// Identity (`=?=`), never undefined.
    Is,
    /// Non-identity (`=!=`), never undefined.
    Isnt,
    And,
}

impl BinaryOp {
    /// ClassAd spelling of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Is => "=?=",
            BinaryOp::Isnt => "=!=",
            BinaryOp::And => "&&",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Is | BinaryOp::Isnt => 4,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 5,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Mul | BinaryOp::Div => 7,
        }
    }
}

/// Built-in functions available to rules.
///
/// `siteMapping` and `removeSite` are site-list extensions installed in the
/// router; the rest are standard ClassAd functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// `size(s)`: length of a string or list.
    Size,
    /// `strcat(a, b, ...)`: string concatenation.
    Strcat,
    /// `stringListMember(item, list)`: membership in a comma-separated list.
    StringListMember,
    /// `sortStringSet(list)`: sorted, deduplicated comma-separated list.
    SortStringSet,
    /// `siteMapping(list, map)`: expands a whitelist through a source→dests record.
    SiteMapping,
    /// `removeSite(site, list)`: drops a site from a comma-separated list.
    RemoveSite,
}

impl Func {
    /// ClassAd function name.
    pub fn name(self) -> &'static str {
        match self {
            Func::Size => "size",
            Func::Strcat => "strcat",
            Func::StringListMember => "stringListMember",
            Func::SortStringSet => "sortStringSet",
            Func::SiteMapping => "siteMapping",
            Func::RemoveSite => "removeSite",
        }
    }
}

/// An expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Lit(Value),
    Attr(AttrRef),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `member(item, list)`.
    Member {
        item: Box<Expr>,
        list: Box<Expr>,
    },
    /// `regexp("pattern", target)`, unanchored.
    Regexp {
        pattern: String,
        target: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
    /// `ifThenElse(cond, then, otherwise)`.
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    /// Literal expression.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Lit(value.into())
    }

    /// Unscoped attribute reference.
    pub fn attr(name: impl Into<String>) -> Self {
        Expr::Attr(AttrRef::new(name))
    }

    /// `target.`-scoped attribute reference.
    pub fn target(name: impl Into<String>) -> Self {
        Expr::Attr(AttrRef::target(name))
    }

    /// Binary expression.
    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `self && rhs`.
    pub fn and(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::And, self, rhs)
    }

    /// `self =?= rhs`.
    pub fn is(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Is, self, rhs)
    }

    /// `self =!= rhs`.
    pub fn isnt(self, rhs: Expr) -> Self {
        Expr::binary(BinaryOp::Isnt, self, rhs)
    }

    /// Function call.
    pub fn call(func: Func, args: Vec<Expr>) -> Self {
        Expr::Call { func, args }
    }

    /// `member(item, list)`.
    pub fn member(item: Expr, list: Expr) -> Self {
        Expr::Member {
            item: Box::new(item),
            list: Box::new(list),
        }
    }

    /// `regexp(pattern, target)`.
    pub fn regexp(pattern: impl Into<String>, target: Expr) -> Self {
        Expr::Regexp {
            pattern: pattern.into(),
            target: Box::new(target),
        }
    }

    /// `ifThenElse(cond, then, otherwise)`.
    pub fn if_then_else(cond: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Cond {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Returns the literal value, if this is a literal.
    pub fn as_lit(&self) -> Option<&Value> {
        match self {
            Expr::Lit(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Lit(value)
    }
}

impl From<AttrRef> for Expr {
    fn from(attr: AttrRef) -> Self {
        Expr::Attr(attr)
    }
}

macro_rules! arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expr {
            type Output = Expr;

            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary($op, self, rhs)
            }
        }
    };
}

arith_op!(Add, add, BinaryOp::Add);
arith_op!(Sub, sub, BinaryOp::Sub);
arith_op!(Mul, mul, BinaryOp::Mul);
arith_op!(Div, div, BinaryOp::Div);

impl ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::Unary {
            op: UnaryOp::Neg,
            expr: Box::new(self),
        }
    }
}
