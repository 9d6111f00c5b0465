//! Compiled filters as data: a small expression tree shared by the evaluators.
use crate::record::Value;
use std::fmt;
use std::marker::PhantomData;
use std::ops::Not;

/// Navigation path relative to the record or collection element an expression is evaluated
/// against. The empty path is the element itself.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new(segments: Vec<String>) -> FieldPath {
        FieldPath { segments }
    }

    /// Path of the current collection element.
    pub fn this() -> FieldPath {
        FieldPath::default()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_this(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            write!(f, "$this")
        } else {
            write!(f, "{}", self.segments.join("."))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        };
        write!(f, "{}", symbol)
    }
}

/// Case-insensitive text tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl TextOp {
    pub fn test(&self, text: &str, pattern: &str) -> bool {
        match self {
            TextOp::Contains => text.contains(pattern),
            TextOp::StartsWith => text.starts_with(pattern),
            TextOp::EndsWith => text.ends_with(pattern),
        }
    }
}

impl fmt::Display for TextOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextOp::Contains => "contains",
            TextOp::StartsWith => "startsWith",
            TextOp::EndsWith => "endsWith",
        };
        write!(f, "{}", name)
    }
}

/// Boolean expression over a record.
///
/// Comparisons are two-valued: against a null field every comparison is false except
/// [`CompareOp::Neq`]. `Text` patterns are stored lower-cased and matched against the
/// lower-cased field text. A null value in `In` matches a null field.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Const(bool),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare { path: FieldPath, op: CompareOp, value: Value },
    IsNull(FieldPath),
    Text { path: FieldPath, op: TextOp, pattern: String },
    In { path: FieldPath, values: Vec<Value> },
    /// At least one element of the collection at `path` satisfies `predicate`.
    Any { path: FieldPath, predicate: Box<Expr> },
    /// Every element of the collection at `path` satisfies `predicate`, true when empty.
    All { path: FieldPath, predicate: Box<Expr> },
}

impl Expr {
    pub fn and(self, other: Expr) -> Expr {
        Expr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Expr) -> Expr {
        Expr::Or(Box::new(self), Box::new(other))
    }

    pub fn negate(self) -> Expr {
        match self {
            Expr::Const(value) => Expr::Const(!value),
            other => Expr::Not(Box::new(other)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Const(value) => write!(f, "{}", value),
            Expr::And(l, r) => write!(f, "({} and {})", l, r),
            Expr::Or(l, r) => write!(f, "({} or {})", l, r),
            Expr::Not(e) => write!(f, "not {}", e),
            Expr::Compare { path, op, value } => write!(f, "{} {} {}", path, op, value),
            Expr::IsNull(path) => write!(f, "{} is null", path),
            Expr::Text { path, op, pattern } => write!(f, "{} {} {:?}", path, op, pattern),
            Expr::In { path, values } => {
                write!(f, "{} in [", path)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Expr::Any { path, predicate } => write!(f, "any {} ({})", path, predicate),
            Expr::All { path, predicate } => write!(f, "all {} ({})", path, predicate),
        }
    }
}

/// Compiled filter over records of type `T`.
///
/// The predicate is plain data: it can be evaluated in memory with [`Predicate::matches`] or
/// lowered to a store query, and is shareable between threads whatever `T` is.
pub struct Predicate<T> {
    expr: Expr,
    marker: PhantomData<fn(&T) -> bool>,
}

impl<T> Predicate<T> {
    pub fn from_expr(expr: Expr) -> Predicate<T> {
        Predicate {
            expr,
            marker: PhantomData,
        }
    }

    /// Predicate matching every record.
    pub fn always() -> Predicate<T> {
        Predicate::from_expr(Expr::Const(true))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn and(self, other: Predicate<T>) -> Predicate<T> {
        Predicate::from_expr(self.expr.and(other.expr))
    }

    pub fn or(self, other: Predicate<T>) -> Predicate<T> {
        Predicate::from_expr(self.expr.or(other.expr))
    }
}

impl<T> Not for Predicate<T> {
    type Output = Predicate<T>;
    fn not(self) -> Predicate<T> {
        Predicate::from_expr(self.expr.negate())
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Predicate::from_expr(self.expr.clone())
    }
}

impl<T> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Predicate").field(&self.expr).finish()
    }
}

impl<T> fmt::Display for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}
