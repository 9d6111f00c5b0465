//! Recursive descent parser for the filter language.
//!
//! ```text
//! request    := exprList
//! exprList   := (expr combinator?)*
//! expr       := group | condition
//! group      := '(' exprList ')'
//! condition  := field operator value?
//! field      := segment ('.' segment)*
//! segment    := identifier ('[' ('any'|'all') ']')?
//! ```
//!
//! Every `and`/`or` met inside one list overwrites the combinator of that whole list, the last
//! one wins: `a = 1 or b = 2 and c = 3` is `a = 1 and b = 2 and c = 3`. Mixed logic needs
//! explicit parentheses.
use crate::{
    error::ParseError,
    request::{Arity, Combinator, FilterCondition, FilterGroup, FilterOperator, FilterRequest, FilterRule, Quantifier, Scalar},
};
use log::debug;

type PRes<T> = Result<T, ParseError>;

const SYMBOL_OPERATORS: [(&str, FilterOperator); 9] = [
    ("==", FilterOperator::Eq),
    ("!=", FilterOperator::Neq),
    ("<>", FilterOperator::Neq),
    (">=", FilterOperator::Gte),
    ("<=", FilterOperator::Lte),
    ("=", FilterOperator::Eq),
    (">", FilterOperator::Gt),
    ("<", FilterOperator::Lt),
    ("~", FilterOperator::Contains),
];

const WORD_OPERATORS: [(&str, FilterOperator); 10] = [
    ("contains", FilterOperator::Contains),
    ("startsWith", FilterOperator::StartsWith),
    ("endsWith", FilterOperator::EndsWith),
    ("notIn", FilterOperator::NotIn),
    ("in", FilterOperator::In),
    ("isNotNull", FilterOperator::IsNotNull),
    ("isNull", FilterOperator::IsNull),
    ("between", FilterOperator::Between),
    ("isTrue", FilterOperator::IsTrue),
    ("isFalse", FilterOperator::IsFalse),
];

/// Limits applied while parsing.
///
/// # Example
/// ```
/// use dynfilter::{parse_with, ParseOptions};
/// let options = ParseOptions::new().max_depth(4);
/// assert!(parse_with("((((year = 1))))", &options).is_ok());
/// assert!(parse_with("(((((year = 1)))))", &options).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    max_depth: usize,
    context_radius: usize,
}

impl Default for ParseOptions {
    fn default() -> ParseOptions {
        ParseOptions {
            max_depth: 32,
            context_radius: 20,
        }
    }
}

impl ParseOptions {
    pub fn new() -> ParseOptions {
        ParseOptions::default()
    }

    /// Maximum nesting of groups and array literals.
    pub fn max_depth(mut self, max_depth: usize) -> ParseOptions {
        self.max_depth = max_depth;
        self
    }

    /// Characters quoted on each side of an error position.
    pub fn context_radius(mut self, context_radius: usize) -> ParseOptions {
        self.context_radius = context_radius;
        self
    }
}

/// Parse filter text with the default options.
///
/// Empty or blank text gives a request without rules, which matches everything.
///
/// # Example
/// ```
/// use dynfilter::{parse, Combinator};
/// let request = parse("year >= 1970 and genre[any].name = \"Rock\"").unwrap();
/// assert_eq!(request.combinator, Combinator::And);
/// assert_eq!(request.rules.len(), 2);
/// ```
pub fn parse(text: &str) -> PRes<FilterRequest> {
    parse_with(text, &ParseOptions::default())
}

pub fn parse_with(text: &str, options: &ParseOptions) -> PRes<FilterRequest> {
    let mut parser = Parser {
        chars: text.chars().collect(),
        pos: 0,
        options,
    };
    let request = parser.parse_request()?;
    debug!(
        "parsed filter with {} top level rules combined by {:?}",
        request.rules.len(),
        request.combinator
    );
    Ok(request)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    options: &'a ParseOptions,
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_number_part(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-' || c == '+' || c == 'e' || c == 'E'
}

impl<'a> Parser<'a> {
    fn parse_request(&mut self) -> PRes<FilterRequest> {
        let (combinator, rules) = self.parse_list(0)?;
        self.skip_whitespace();
        if !self.at_end() {
            return Err(self.error_at(self.pos, "unexpected ')' without matching '('"));
        }
        Ok(FilterRequest { combinator, rules })
    }

    fn parse_list(&mut self, depth: usize) -> PRes<(Combinator, Vec<FilterRule>)> {
        let mut combinator = Combinator::And;
        let mut rules = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None | Some(')') => break,
                _ => {}
            }
            rules.push(self.parse_expression(depth)?);
            self.skip_whitespace();
            if self.eat_keyword("and") {
                combinator = Combinator::And;
            } else if self.eat_keyword("or") {
                combinator = Combinator::Or;
            }
        }
        Ok((combinator, rules))
    }

    fn parse_expression(&mut self, depth: usize) -> PRes<FilterRule> {
        if self.peek() == Some('(') {
            let open = self.pos;
            if depth >= self.options.max_depth {
                return Err(self.error_at(
                    open,
                    &format!("groups nested deeper than {}", self.options.max_depth),
                ));
            }
            self.pos += 1;
            let (combinator, rules) = self.parse_list(depth + 1)?;
            self.skip_whitespace();
            if !self.eat(')') {
                return Err(self.error_at(open, "unterminated group"));
            }
            Ok(FilterRule::Group(FilterGroup { combinator, rules }))
        } else {
            Ok(FilterRule::Condition(self.parse_condition(depth)?))
        }
    }

    fn parse_condition(&mut self, depth: usize) -> PRes<FilterCondition> {
        let (field, quantifier) = self.parse_field()?;
        self.skip_whitespace();
        let operator = match self.parse_operator() {
            Some(op) => op,
            None => return Err(self.error_at(self.pos, &format!("expected operator after '{}'", field))),
        };
        let mut condition = FilterCondition {
            field,
            resolved_path: None,
            operator,
            value: None,
            value2: None,
            quantifier,
        };
        match operator.arity() {
            Arity::None => {}
            Arity::Scalar => {
                condition.value = Some(self.parse_single_value(operator)?);
            }
            Arity::List => {
                self.skip_whitespace();
                if self.peek() != Some('[') {
                    return Err(self.error_at(self.pos, &format!("operator '{}' expects a list", operator)));
                }
                condition.value = Some(self.parse_value(depth)?);
            }
            Arity::Range => {
                condition.value = Some(self.parse_single_value(operator)?);
                self.skip_whitespace();
                if !self.eat_keyword("and") {
                    return Err(self.error_at(self.pos, "expected 'and' between the bounds of 'between'"));
                }
                condition.value2 = Some(self.parse_single_value(operator)?);
            }
        }
        Ok(condition)
    }

    fn parse_field(&mut self) -> PRes<(String, Option<Quantifier>)> {
        let mut field = String::new();
        let mut quantifier = None;
        loop {
            let start = self.pos;
            let name = match self.parse_identifier() {
                Some(name) => name,
                None => return Err(self.error_at(start, "expected field name")),
            };
            if name.eq_ignore_ascii_case("and") || name.eq_ignore_ascii_case("or") {
                return Err(self.error_at(start, &format!("unexpected combinator '{}'", name)));
            }
            field.push_str(&name);
            if self.eat('[') {
                let word_start = self.pos;
                let q = match self.parse_identifier() {
                    Some(ref w) if w.eq_ignore_ascii_case("any") => Quantifier::Any,
                    Some(ref w) if w.eq_ignore_ascii_case("all") => Quantifier::All,
                    _ => return Err(self.error_at(word_start, "expected quantifier 'any' or 'all'")),
                };
                if !self.eat(']') {
                    return Err(self.error_at(self.pos, "unterminated quantifier, expected ']'"));
                }
                field.push('[');
                field.push_str(q.keyword());
                field.push(']');
                if quantifier.is_none() {
                    quantifier = Some(q);
                }
            }
            if !self.eat('.') {
                break;
            }
            field.push('.');
        }
        Ok((field, quantifier))
    }

    fn parse_identifier(&mut self) -> Option<String> {
        match self.peek() {
            Some(c) if is_identifier_start(c) => {}
            _ => return None,
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_identifier_part(c) {
                break;
            }
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    fn parse_operator(&mut self) -> Option<FilterOperator> {
        for (symbol, op) in SYMBOL_OPERATORS.iter() {
            if self.starts_with(symbol) {
                self.pos += symbol.chars().count();
                return Some(*op);
            }
        }
        for (word, op) in WORD_OPERATORS.iter() {
            if self.eat_keyword(word) {
                return Some(*op);
            }
        }
        None
    }

    fn parse_single_value(&mut self, operator: FilterOperator) -> PRes<Scalar> {
        self.skip_whitespace();
        if self.peek() == Some('[') {
            return Err(self.error_at(self.pos, &format!("operator '{}' expects a single value", operator)));
        }
        self.parse_value(0)
    }

    fn parse_value(&mut self, depth: usize) -> PRes<Scalar> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(self.error_at(self.pos, "expected value")),
            Some('"') => self.parse_string(),
            Some('[') => self.parse_array(depth),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '+' || c == '.' => self.parse_number(),
            Some(_) => {
                if self.eat_keyword("true") {
                    Ok(Scalar::Bool(true))
                } else if self.eat_keyword("false") {
                    Ok(Scalar::Bool(false))
                } else if self.eat_keyword("null") {
                    Ok(Scalar::Null)
                } else {
                    Err(self.error_at(self.pos, "expected value, text values must be quoted"))
                }
            }
        }
    }

    fn parse_string(&mut self) -> PRes<Scalar> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        loop {
            match self.next() {
                None => return Err(self.error_at(start, "unterminated string")),
                Some('"') => break,
                Some('\\') => match self.next() {
                    None => return Err(self.error_at(start, "unterminated string")),
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some(c) => value.push(c),
                },
                Some(c) => value.push(c),
            }
        }
        Ok(Scalar::String(value))
    }

    fn parse_number(&mut self) -> PRes<Scalar> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !is_number_part(c) {
                break;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        match text.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Scalar::number(v)),
            _ => Err(self.error_at(start, &format!("invalid number '{}'", text))),
        }
    }

    fn parse_array(&mut self, depth: usize) -> PRes<Scalar> {
        let open = self.pos;
        if depth >= self.options.max_depth {
            return Err(self.error_at(open, &format!("lists nested deeper than {}", self.options.max_depth)));
        }
        self.pos += 1;
        let mut values = Vec::new();
        self.skip_whitespace();
        if self.eat(']') {
            return Ok(Scalar::List(values));
        }
        loop {
            values.push(self.parse_value(depth + 1)?);
            self.skip_whitespace();
            if self.eat(',') {
                continue;
            }
            if self.eat(']') {
                break;
            }
            if self.at_end() {
                return Err(self.error_at(open, "unterminated list"));
            }
            return Err(self.error_at(self.pos, "expected ',' or ']' in list"));
        }
        Ok(Scalar::List(values))
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        let len = word.chars().count();
        if self.pos + len > self.chars.len() {
            return false;
        }
        let matches = self.chars[self.pos..self.pos + len]
            .iter()
            .zip(word.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b));
        if !matches {
            return false;
        }
        if let Some(next) = self.chars.get(self.pos + len) {
            if is_identifier_part(*next) {
                return false;
            }
        }
        self.pos += len;
        true
    }

    fn starts_with(&self, symbol: &str) -> bool {
        let mut i = self.pos;
        for c in symbol.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn error_at(&self, position: usize, message: &str) -> ParseError {
        let radius = self.options.context_radius;
        let from = position.saturating_sub(radius);
        let to = usize::min(position + radius, self.chars.len());
        let from = usize::min(from, to);
        ParseError {
            position,
            message: message.to_string(),
            context: self.chars[from..to].iter().collect(),
        }
    }
}
