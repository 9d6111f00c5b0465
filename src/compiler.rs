//! Compilation of parsed filter requests into predicates over a record type.
use crate::{
    coerce::coerce,
    desc::{FieldType, RecordDescription, ScalarType},
    error::{FRes, FilterError},
    predicate::{CompareOp, Expr, FieldPath, Predicate, TextOp},
    record::{Filterable, Value},
    request::{Combinator, FilterCondition, FilterOperator, FilterRequest, FilterRule, Quantifier, Scalar},
    resolver::{split_path, PathSegment},
};
use log::{debug, trace};

/// Compile a request against the description of `T`.
///
/// Conditions use `resolved_path` when the request went through [`resolve_paths`], the field
/// text otherwise. An empty request compiles to a predicate matching every record.
///
/// [`resolve_paths`]: crate::resolve_paths
pub fn compile<T: Filterable>(request: &FilterRequest) -> FRes<Predicate<T>> {
    let description = T::description();
    let expr = compile_rules(request.combinator, &request.rules, &description)?;
    debug!("compiled filter on '{}': {}", description.name(), expr);
    Ok(Predicate::from_expr(expr))
}

fn compile_rules(combinator: Combinator, rules: &[FilterRule], desc: &RecordDescription) -> FRes<Expr> {
    let mut folded: Option<Expr> = None;
    for rule in rules {
        let expr = match rule {
            FilterRule::Condition(condition) => compile_condition(condition, desc)?,
            FilterRule::Group(group) => compile_rules(group.combinator, &group.rules, desc)?,
        };
        folded = Some(match folded {
            None => expr,
            Some(acc) => match combinator {
                Combinator::And => acc.and(expr),
                Combinator::Or => acc.or(expr),
            },
        });
    }
    Ok(folded.unwrap_or(Expr::Const(true)))
}

fn compile_condition(condition: &FilterCondition, desc: &RecordDescription) -> FRes<Expr> {
    let segments = split_path(condition.effective_path())?;
    compile_path(condition, &segments, desc)
}

/// Walk `segments` starting on a record. Single associations extend the navigation path, a
/// collection wraps everything after it in a quantified sub expression on the element type.
fn compile_path(condition: &FilterCondition, segments: &[PathSegment], desc: &RecordDescription) -> FRes<Expr> {
    let mut current = desc.clone();
    let mut path = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let field = current
            .find_field(&segment.name)
            .ok_or_else(|| FilterError::UnknownField {
                field: condition.field.clone(),
                record: current.name().to_string(),
            })?;
        path.push(field.name().to_string());
        let field_type = *field.field_type();
        let rest = &segments[i + 1..];
        if let FieldType::Collection(element) = field_type {
            let quantifier = match segment.quantifier {
                Some(q) => q,
                None => {
                    let q = condition.operator.default_quantifier();
                    trace!(
                        "'{}' on '{}' defaults to {:?} for segment '{}'",
                        condition.operator,
                        condition.field,
                        q,
                        segment.name
                    );
                    q
                }
            };
            let inner = compile_element(condition, &segment.name, rest, element())?;
            return Ok(quantified(quantifier, FieldPath::new(path), inner));
        }
        if segment.quantifier.is_some() {
            return Err(FilterError::QuantifierOnScalar {
                field: condition.field.clone(),
                segment: segment.name.clone(),
            });
        }
        if rest.is_empty() {
            return compile_leaf(condition, FieldPath::new(path), field_type);
        }
        match field_type {
            FieldType::Record { description, .. } => current = description(),
            _ => {
                return Err(FilterError::NotNavigable {
                    field: condition.field.clone(),
                    segment: segment.name.clone(),
                })
            }
        }
    }
    Err(FilterError::InvalidPath(condition.effective_path().to_string()))
}

fn compile_element(
    condition: &FilterCondition,
    segment: &str,
    rest: &[PathSegment],
    element: FieldType,
) -> FRes<Expr> {
    match element {
        FieldType::Record { description, .. } if !rest.is_empty() => compile_path(condition, rest, &description()),
        FieldType::Collection(inner) => {
            let q = condition.operator.default_quantifier();
            let sub = compile_element(condition, segment, rest, inner())?;
            Ok(quantified(q, FieldPath::this(), sub))
        }
        _ if rest.is_empty() => compile_leaf(condition, FieldPath::this(), element),
        _ => Err(FilterError::NotNavigable {
            field: condition.field.clone(),
            segment: segment.to_string(),
        }),
    }
}

fn quantified(quantifier: Quantifier, path: FieldPath, predicate: Expr) -> Expr {
    let predicate = Box::new(predicate);
    match quantifier {
        Quantifier::Any => Expr::Any { path, predicate },
        Quantifier::All => Expr::All { path, predicate },
    }
}

fn compile_leaf(condition: &FilterCondition, path: FieldPath, field_type: FieldType) -> FRes<Expr> {
    let operator = condition.operator;
    let mismatch = || FilterError::OperatorMismatch {
        field: condition.field.clone(),
        operator: operator.to_string(),
        field_type: field_type.to_string(),
    };
    let scalar = match field_type {
        FieldType::Scalar { ty, .. } => Some(ty),
        _ => None,
    };
    let operand = condition.value.as_ref().unwrap_or(&Scalar::Null);
    Ok(match operator {
        FilterOperator::IsNull => Expr::IsNull(path),
        FilterOperator::IsNotNull => Expr::IsNull(path).negate(),
        FilterOperator::Eq
        | FilterOperator::Neq
        | FilterOperator::Gt
        | FilterOperator::Gte
        | FilterOperator::Lt
        | FilterOperator::Lte => {
            if operand.is_null() {
                return Ok(if operator == FilterOperator::Neq {
                    Expr::IsNull(path).negate()
                } else {
                    Expr::IsNull(path)
                });
            }
            let ty = scalar.ok_or_else(mismatch)?;
            Expr::Compare {
                path,
                op: compare_op(operator),
                value: coerce_operand(condition, operand, ty)?,
            }
        }
        FilterOperator::Contains | FilterOperator::StartsWith | FilterOperator::EndsWith => {
            scalar.filter(|ty| *ty == ScalarType::Text).ok_or_else(mismatch)?;
            if operand.is_null() {
                return Ok(Expr::Const(false));
            }
            let pattern = match coerce_operand(condition, operand, ScalarType::Text)? {
                Value::Text(text) => text.to_lowercase(),
                _ => return Err(mismatch()),
            };
            let op = match operator {
                FilterOperator::Contains => TextOp::Contains,
                FilterOperator::StartsWith => TextOp::StartsWith,
                _ => TextOp::EndsWith,
            };
            Expr::Text { path, op, pattern }
        }
        FilterOperator::In | FilterOperator::NotIn => {
            let membership = match operand {
                Scalar::Null => Expr::Const(false),
                Scalar::List(items) => {
                    let ty = scalar.ok_or_else(mismatch)?;
                    let values = items
                        .iter()
                        .map(|item| coerce_operand(condition, item, ty))
                        .collect::<FRes<Vec<Value>>>()?;
                    Expr::In { path, values }
                }
                other => {
                    return Err(FilterError::Coercion {
                        field: condition.field.clone(),
                        operator: operator.to_string(),
                        value: other.to_string(),
                        target: "List".to_string(),
                    })
                }
            };
            if operator == FilterOperator::NotIn {
                membership.negate()
            } else {
                membership
            }
        }
        FilterOperator::Between => {
            let ty = scalar.ok_or_else(mismatch)?;
            let (low, high) = match (&condition.value, &condition.value2) {
                (Some(low), Some(high)) => (low, high),
                _ => {
                    return Err(FilterError::MissingOperand {
                        field: condition.field.clone(),
                        operator: operator.to_string(),
                    })
                }
            };
            if low.is_null() || high.is_null() {
                return Ok(Expr::Const(false));
            }
            let low = Expr::Compare {
                path: path.clone(),
                op: CompareOp::Gte,
                value: coerce_operand(condition, low, ty)?,
            };
            let high = Expr::Compare {
                path,
                op: CompareOp::Lte,
                value: coerce_operand(condition, high, ty)?,
            };
            low.and(high)
        }
        FilterOperator::IsTrue | FilterOperator::IsFalse => {
            scalar.filter(|ty| *ty == ScalarType::Bool).ok_or_else(mismatch)?;
            Expr::Compare {
                path,
                op: CompareOp::Eq,
                value: Value::Bool(operator == FilterOperator::IsTrue),
            }
        }
    })
}

fn compare_op(operator: FilterOperator) -> CompareOp {
    match operator {
        FilterOperator::Neq => CompareOp::Neq,
        FilterOperator::Gt => CompareOp::Gt,
        FilterOperator::Gte => CompareOp::Gte,
        FilterOperator::Lt => CompareOp::Lt,
        FilterOperator::Lte => CompareOp::Lte,
        _ => CompareOp::Eq,
    }
}

fn coerce_operand(condition: &FilterCondition, value: &Scalar, ty: ScalarType) -> FRes<Value> {
    coerce(value, ty).ok_or_else(|| FilterError::Coercion {
        field: condition.field.clone(),
        operator: condition.operator.to_string(),
        value: value.to_string(),
        target: ty.to_string(),
    })
}
