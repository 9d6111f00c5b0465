//! Parsed form of a filter expression.
//!
//! A [`FilterRequest`] is what the parser produces and what the compiler consumes. It can be
//! rendered back to filter text with `Display`, which parses again to an equal request.
#[cfg(feature = "serde_info")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical connective applied to every rule of one list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub enum Combinator {
    And,
    Or,
}

impl Default for Combinator {
    fn default() -> Combinator {
        Combinator::And
    }
}

/// Distribution of a condition over a collection segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub enum Quantifier {
    Any,
    All,
}

impl Quantifier {
    pub(crate) fn keyword(&self) -> &'static str {
        match self {
            Quantifier::Any => "any",
            Quantifier::All => "all",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub enum FilterOperator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
    IsTrue,
    IsFalse,
}

/// Shape of the operand an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arity {
    None,
    Scalar,
    List,
    Range,
}

impl FilterOperator {
    pub(crate) fn arity(&self) -> Arity {
        match self {
            FilterOperator::IsNull | FilterOperator::IsNotNull | FilterOperator::IsTrue | FilterOperator::IsFalse => {
                Arity::None
            }
            FilterOperator::In | FilterOperator::NotIn => Arity::List,
            FilterOperator::Between => Arity::Range,
            _ => Arity::Scalar,
        }
    }

    /// Quantifier used on a collection segment when the path does not name one.
    pub fn default_quantifier(&self) -> Quantifier {
        match self {
            FilterOperator::Neq | FilterOperator::NotIn => Quantifier::All,
            _ => Quantifier::Any,
        }
    }

    /// Canonical spelling, the one used when rendering a request.
    pub fn symbol(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Neq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Gte => ">=",
            FilterOperator::Lt => "<",
            FilterOperator::Lte => "<=",
            FilterOperator::Contains => "contains",
            FilterOperator::StartsWith => "startsWith",
            FilterOperator::EndsWith => "endsWith",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "notIn",
            FilterOperator::IsNull => "isNull",
            FilterOperator::IsNotNull => "isNotNull",
            FilterOperator::Between => "between",
            FilterOperator::IsTrue => "isTrue",
            FilterOperator::IsFalse => "isFalse",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Literal value written in a filter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i32),
    Float(f64),
    String(String),
    List(Vec<Scalar>),
}

impl Scalar {
    /// Number literal, integral values in the 32 bit range become `Int`.
    pub fn number(value: f64) -> Scalar {
        if value.fract() == 0.0 && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
            Scalar::Int(value as i32)
        } else {
            Scalar::Float(value)
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Scalar {
        Scalar::String(s.to_string())
    }
}
impl From<String> for Scalar {
    fn from(s: String) -> Scalar {
        Scalar::String(s)
    }
}
impl From<i32> for Scalar {
    fn from(v: i32) -> Scalar {
        Scalar::Int(v)
    }
}
impl From<f64> for Scalar {
    fn from(v: f64) -> Scalar {
        Scalar::number(v)
    }
}
impl From<bool> for Scalar {
    fn from(v: bool) -> Scalar {
        Scalar::Bool(v)
    }
}
impl<T: Into<Scalar>> From<Vec<T>> for Scalar {
    fn from(v: Vec<T>) -> Scalar {
        Scalar::List(v.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Int(i) => write!(f, "{}", i),
            Scalar::Float(v) => write!(f, "{}", v),
            Scalar::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        '\r' => f.write_str("\\r")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("\"")
            }
            Scalar::List(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub struct FilterCondition {
    /// Logical field path as written, quantifier annotations included.
    pub field: String,
    /// Physical path set by the path resolver.
    pub resolved_path: Option<String>,
    pub operator: FilterOperator,
    pub value: Option<Scalar>,
    /// Upper bound of `between`.
    pub value2: Option<Scalar>,
    /// First quantifier annotation found in `field`.
    pub quantifier: Option<Quantifier>,
}

impl FilterCondition {
    pub fn new(field: &str, operator: FilterOperator, value: Option<Scalar>) -> FilterCondition {
        FilterCondition {
            field: field.to_string(),
            resolved_path: None,
            operator,
            value,
            value2: None,
            quantifier: first_quantifier(field),
        }
    }

    pub fn between(field: &str, low: Scalar, high: Scalar) -> FilterCondition {
        FilterCondition {
            value2: Some(high),
            ..FilterCondition::new(field, FilterOperator::Between, Some(low))
        }
    }

    /// Path the compiler walks: the resolved one when present.
    pub fn effective_path(&self) -> &str {
        self.resolved_path.as_deref().unwrap_or(&self.field)
    }
}

fn first_quantifier(field: &str) -> Option<Quantifier> {
    let lower = field.to_ascii_lowercase();
    let any = lower.find("[any]");
    let all = lower.find("[all]");
    match (any, all) {
        (Some(a), Some(b)) if b < a => Some(Quantifier::All),
        (Some(_), _) => Some(Quantifier::Any),
        (None, Some(_)) => Some(Quantifier::All),
        (None, None) => None,
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator)?;
        match self.operator.arity() {
            Arity::None => Ok(()),
            Arity::Range => {
                let low = self.value.as_ref().unwrap_or(&Scalar::Null);
                let high = self.value2.as_ref().unwrap_or(&Scalar::Null);
                write!(f, " {} and {}", low, high)
            }
            Arity::Scalar | Arity::List => match &self.value {
                Some(v) => write!(f, " {}", v),
                None => f.write_str(" null"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub struct FilterGroup {
    pub combinator: Combinator,
    pub rules: Vec<FilterRule>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub enum FilterRule {
    Condition(FilterCondition),
    Group(FilterGroup),
}

impl From<FilterCondition> for FilterRule {
    fn from(c: FilterCondition) -> FilterRule {
        FilterRule::Condition(c)
    }
}

impl From<FilterGroup> for FilterRule {
    fn from(g: FilterGroup) -> FilterRule {
        FilterRule::Group(g)
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRule::Condition(c) => write!(f, "{}", c),
            FilterRule::Group(g) => {
                f.write_str("(")?;
                write_rules(f, g.combinator, &g.rules)?;
                f.write_str(")")
            }
        }
    }
}

/// Root of a parsed filter. No rules means everything matches.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde_info", derive(Serialize, Deserialize))]
pub struct FilterRequest {
    pub combinator: Combinator,
    pub rules: Vec<FilterRule>,
}

impl FilterRequest {
    pub fn new(combinator: Combinator, rules: Vec<FilterRule>) -> FilterRequest {
        FilterRequest { combinator, rules }
    }

    /// Request matching everything.
    pub fn empty() -> FilterRequest {
        FilterRequest::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Visit every condition, nested groups included.
    pub fn conditions(&self) -> Vec<&FilterCondition> {
        let mut found = Vec::new();
        collect_conditions(&self.rules, &mut found);
        found
    }
}

fn collect_conditions<'a>(rules: &'a [FilterRule], found: &mut Vec<&'a FilterCondition>) {
    for rule in rules {
        match rule {
            FilterRule::Condition(c) => found.push(c),
            FilterRule::Group(g) => collect_conditions(&g.rules, found),
        }
    }
}

fn write_rules(f: &mut fmt::Formatter<'_>, combinator: Combinator, rules: &[FilterRule]) -> fmt::Result {
    let sep = match combinator {
        Combinator::And => " and ",
        Combinator::Or => " or ",
    };
    for (i, rule) in rules.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", rule)?;
    }
    Ok(())
}

impl fmt::Display for FilterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_rules(f, self.combinator, &self.rules)
    }
}
