//! Filter language, predicate compiler and evaluators for typed records.
//!
//! A filter text is parsed into a [`FilterRequest`], optionally rewritten from logical to
//! physical field paths with [`resolve_paths`], then compiled against a [`Filterable`] record
//! type into a [`Predicate`]. The same predicate runs in memory, with [`Predicate::matches`]
//! and [`Predicate::filter`], or on a [`DocumentStore`] once lowered to a [`StoreQuery`].
//!
//! # Example
//!
//! ```
//! use dynfilter::{compile_str, DocumentStore};
//! use dynfilter_derive::Filterable;
//! # use dynfilter::FRes;
//! # fn foo() -> FRes<()> {
//! #[derive(Filterable)]
//! struct Genre {
//!     name: String,
//! }
//!
//! #[derive(Filterable)]
//! struct Song {
//!     title: String,
//!     year: i32,
//!     genre: Vec<Genre>,
//! }
//!
//! let songs = vec![
//!     Song { title: "Echoes".to_string(), year: 1971, genre: vec![Genre { name: "Rock".to_string() }] },
//!     Song { title: "Hello".to_string(), year: 2015, genre: Vec::new() },
//! ];
//! let predicate = compile_str::<Song>(r#"year < 2000 and genre[any].name = "Rock""#)?;
//! assert_eq!(predicate.filter(&songs).count(), 1);
//!
//! let store = DocumentStore::memory()?;
//! store.define::<Song>()?;
//! store.insert_all(&songs)?;
//! assert_eq!(store.query(&predicate)?.len(), 1);
//! # Ok(())
//! # }
//! # foo().unwrap();
//! ```
//!
//! With the `derive` feature the macro is also re-exported as `dynfilter::Filterable`.
mod coerce;
mod compiler;
pub use crate::compiler::compile;
mod desc;
pub use crate::desc::{FieldDescription, FieldType, RecordDescription, RecordDescriptionBuilder, ScalarType};
mod error;
pub use crate::error::{FRes, FilterError, ParseError};
mod eval;
pub use crate::eval::FilterIter;
mod format;
mod fuzzy;
pub use crate::fuzzy::FuzzySearch;
mod id;
pub use crate::id::DocumentId;
mod parser;
pub use crate::parser::{parse, parse_with, ParseOptions};
mod predicate;
pub use crate::predicate::{CompareOp, Expr, FieldPath, Predicate, TextOp};
mod record;
pub use crate::record::{FieldRef, FilterField, Filterable, Value};
mod request;
pub use crate::request::{
    Combinator, FilterCondition, FilterGroup, FilterOperator, FilterRequest, FilterRule, Quantifier, Scalar,
};
mod resolver;
pub use crate::resolver::{resolve_paths, PathMapping};
mod store;
pub use crate::store::{DocumentIter, DocumentStore, StoreConfig, StoreQuery};

#[cfg(feature = "derive")]
pub use dynfilter_derive::Filterable;

/// Parse and compile a filter text against `T`.
///
/// # Example
/// ```
/// use dynfilter::{compile_str, FieldRef, FilterField, Filterable, RecordDescription};
/// # use dynfilter::FRes;
/// struct Album {
///     title: String,
/// }
///
/// impl Filterable for Album {
///     fn description() -> RecordDescription {
///         RecordDescription::builder("Album").field::<String>("title").build()
///     }
///     fn field(&self, name: &str) -> Option<FieldRef<'_>> {
///         match name {
///             "title" => Some(self.title.field_ref()),
///             _ => None,
///         }
///     }
/// }
/// # fn example() -> FRes<()> {
/// let predicate = compile_str::<Album>("title startsWith \"the\"")?;
/// assert!(predicate.matches(&Album { title: "The Wall".to_string() }));
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub fn compile_str<T: Filterable>(text: &str) -> FRes<Predicate<T>> {
    let request = parse(text)?;
    compile(&request)
}

/// Parse a filter text, rewrite its field names through `mapping`, then compile it against `T`.
pub fn compile_with_mapping<T: Filterable>(text: &str, mapping: &PathMapping) -> FRes<Predicate<T>> {
    let mut request = parse(text)?;
    resolve_paths(&mut request, mapping)?;
    compile(&request)
}
