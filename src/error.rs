use persy::{PersyError, PE};
use std::{fmt, io::Error as IOError, sync::PoisonError};

/// Syntax error raised by the filter parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Character offset in the filter text.
    pub position: usize,
    pub message: String,
    /// Text surrounding the offending position.
    pub context: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {} near '{}'", self.message, self.position, self.context)
    }
}

#[derive(Debug)]
pub enum FilterError {
    Parse(ParseError),
    Resolution {
        field: String,
        physical: String,
    },
    InvalidPath(String),
    UnknownField {
        field: String,
        record: String,
    },
    NotNavigable {
        field: String,
        segment: String,
    },
    QuantifierOnScalar {
        field: String,
        segment: String,
    },
    OperatorMismatch {
        field: String,
        operator: String,
        field_type: String,
    },
    MissingOperand {
        field: String,
        operator: String,
    },
    Coercion {
        field: String,
        operator: String,
        value: String,
        target: String,
    },
    Untranslatable(String),
    Unrepresentable(String),
    InvalidStoreQuery(String),
    CollectionNotDefined(String),
    CollectionAlreadyDefined(String),
    InvalidId,
    PersyError(PersyError),
    JsonError(serde_json::Error),
    IOError,
    PoisonedLock,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterError::Parse(e) => write!(f, "syntax error: {}", e),
            FilterError::Resolution { field, physical } => write!(
                f,
                "cannot carry quantifiers of '{}' over to '{}': segment counts differ",
                field, physical
            ),
            FilterError::InvalidPath(path) => write!(f, "invalid field path '{}'", path),
            FilterError::UnknownField { field, record } => {
                write!(f, "no field '{}' on record '{}'", field, record)
            }
            FilterError::NotNavigable { field, segment } => {
                write!(f, "cannot navigate past scalar '{}' in '{}'", segment, field)
            }
            FilterError::QuantifierOnScalar { field, segment } => {
                write!(f, "quantifier on non collection segment '{}' in '{}'", segment, field)
            }
            FilterError::OperatorMismatch {
                field,
                operator,
                field_type,
            } => write!(
                f,
                "operator '{}' not applicable to '{}' of type {}",
                operator, field, field_type
            ),
            FilterError::MissingOperand { field, operator } => {
                write!(f, "operator '{}' on '{}' requires an operand", operator, field)
            }
            FilterError::Coercion {
                field,
                operator,
                value,
                target,
            } => write!(
                f,
                "cannot convert {} to {} for '{}' {}",
                value, target, field, operator
            ),
            FilterError::Untranslatable(what) => write!(f, "cannot translate to store query: {}", what),
            FilterError::Unrepresentable(what) => write!(f, "cannot store value: {}", what),
            FilterError::InvalidStoreQuery(what) => write!(f, "invalid store query: {}", what),
            FilterError::CollectionNotDefined(name) => write!(f, "collection '{}' not defined", name),
            FilterError::CollectionAlreadyDefined(name) => write!(f, "collection '{}' already defined", name),
            FilterError::InvalidId => write!(f, "invalid document id"),
            FilterError::PersyError(e) => write!(f, "storage error: {}", e),
            FilterError::JsonError(e) => write!(f, "document error: {}", e),
            FilterError::IOError => write!(f, "io error"),
            FilterError::PoisonedLock => write!(f, "poisoned lock"),
        }
    }
}

impl std::error::Error for FilterError {}

impl From<ParseError> for FilterError {
    fn from(err: ParseError) -> FilterError {
        FilterError::Parse(err)
    }
}

impl<T: Into<PersyError>> From<PE<T>> for FilterError {
    fn from(err: PE<T>) -> FilterError {
        FilterError::PersyError(err.error().into())
    }
}

impl From<serde_json::Error> for FilterError {
    fn from(err: serde_json::Error) -> FilterError {
        FilterError::JsonError(err)
    }
}

impl<T> From<PoisonError<T>> for FilterError {
    fn from(_err: PoisonError<T>) -> FilterError {
        FilterError::PoisonedLock
    }
}

impl From<IOError> for FilterError {
    fn from(_err: IOError) -> FilterError {
        FilterError::IOError
    }
}

pub type FRes<T> = Result<T, FilterError>;
