//! In-memory evaluation of predicates.
use crate::{
    predicate::{CompareOp, Expr, Predicate},
    record::{FieldRef, Filterable, Value},
};
use std::borrow::Borrow;
use std::cmp::Ordering;

impl<T: Filterable> Predicate<T> {
    /// Check a single record.
    pub fn matches(&self, record: &T) -> bool {
        evaluate(self.expr(), &FieldRef::Record(record))
    }

    /// Lazily keep the items matching this predicate.
    ///
    /// # Example
    /// ```
    /// use dynfilter::{compile_str, Filterable, FilterField, FieldRef, RecordDescription};
    /// # use dynfilter::FRes;
    /// struct Track {
    ///     year: i32,
    /// }
    /// impl Filterable for Track {
    ///     fn description() -> RecordDescription {
    ///         RecordDescription::builder("Track").field::<i32>("year").build()
    ///     }
    ///     fn field(&self, name: &str) -> Option<FieldRef<'_>> {
    ///         match name {
    ///             "year" => Some(self.year.field_ref()),
    ///             _ => None,
    ///         }
    ///     }
    /// }
    /// # fn example() -> FRes<()> {
    /// let predicate = compile_str::<Track>("year >= 2000")?;
    /// let tracks = vec![Track { year: 1999 }, Track { year: 2010 }];
    /// assert_eq!(predicate.filter(&tracks).count(), 1);
    /// # Ok(())
    /// # }
    /// # example().unwrap();
    /// ```
    pub fn filter<I>(&self, iter: I) -> FilterIter<'_, T, I::IntoIter>
    where
        I: IntoIterator,
        I::Item: Borrow<T>,
    {
        FilterIter {
            predicate: self,
            iter: iter.into_iter(),
        }
    }
}

/// Iterator returned by [`Predicate::filter`].
pub struct FilterIter<'p, T, I> {
    predicate: &'p Predicate<T>,
    iter: I,
}

impl<'p, T, I> Iterator for FilterIter<'p, T, I>
where
    T: Filterable,
    I: Iterator,
    I::Item: Borrow<T>,
{
    type Item = I::Item;
    fn next(&mut self) -> Option<Self::Item> {
        let predicate = self.predicate;
        self.iter.find(|item| predicate.matches(item.borrow()))
    }
}

pub(crate) fn evaluate(expr: &Expr, target: &FieldRef<'_>) -> bool {
    match expr {
        Expr::Const(value) => *value,
        Expr::And(l, r) => evaluate(l, target) && evaluate(r, target),
        Expr::Or(l, r) => evaluate(l, target) || evaluate(r, target),
        Expr::Not(e) => !evaluate(e, target),
        Expr::Compare { path, op, value } => with_field(target, path.segments(), |field| match field {
            FieldRef::Value(v) => compare(v, *op, value),
            _ => *op == CompareOp::Neq,
        }),
        Expr::IsNull(path) => with_field(target, path.segments(), |field| match field {
            FieldRef::Value(v) => v.is_null(),
            _ => false,
        }),
        Expr::Text { path, op, pattern } => with_field(target, path.segments(), |field| match field {
            FieldRef::Value(Value::Text(text)) => op.test(&text.to_lowercase(), pattern),
            _ => false,
        }),
        Expr::In { path, values } => with_field(target, path.segments(), |field| match field {
            FieldRef::Value(v) => values.iter().any(|candidate| same(v, candidate)),
            _ => false,
        }),
        Expr::Any { path, predicate } => with_field(target, path.segments(), |field| match field {
            FieldRef::Collection(items) => items.iter().any(|item| evaluate(predicate, item)),
            _ => false,
        }),
        Expr::All { path, predicate } => with_field(target, path.segments(), |field| match field {
            FieldRef::Collection(items) => items.iter().all(|item| evaluate(predicate, item)),
            _ => true,
        }),
    }
}

/// Run `f` on the field at `path`. Missing fields and fields behind a null association read as
/// null.
fn with_field<F>(target: &FieldRef<'_>, path: &[String], f: F) -> bool
where
    F: FnOnce(&FieldRef<'_>) -> bool,
{
    match path.split_first() {
        None => f(target),
        Some((name, rest)) => match target {
            FieldRef::Record(record) => match record.field(name) {
                Some(field) => with_field(&field, rest, f),
                None => f(&FieldRef::Value(Value::Null)),
            },
            _ => f(&FieldRef::Value(Value::Null)),
        },
    }
}

fn compare(field: &Value, op: CompareOp, value: &Value) -> bool {
    let ordering = field.compare(value);
    match op {
        CompareOp::Eq => ordering == Some(Ordering::Equal),
        CompareOp::Neq => ordering != Some(Ordering::Equal),
        CompareOp::Gt => ordering == Some(Ordering::Greater),
        CompareOp::Gte => matches!(ordering, Some(Ordering::Greater) | Some(Ordering::Equal)),
        CompareOp::Lt => ordering == Some(Ordering::Less),
        CompareOp::Lte => matches!(ordering, Some(Ordering::Less) | Some(Ordering::Equal)),
    }
}

fn same(field: &Value, candidate: &Value) -> bool {
    if candidate.is_null() {
        field.is_null()
    } else {
        field.compare(candidate) == Some(Ordering::Equal)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        compile_str,
        desc::{FieldType, RecordDescription},
        predicate::{Expr, FieldPath, Predicate},
        record::{FieldRef, FilterField, Filterable},
    };

    struct Artist {
        name: String,
    }

    impl Filterable for Artist {
        fn description() -> RecordDescription {
            RecordDescription::builder("Artist").field::<String>("name").build()
        }
        fn field(&self, name: &str) -> Option<FieldRef<'_>> {
            match name {
                "name" => Some(self.name.field_ref()),
                _ => None,
            }
        }
    }

    impl FilterField for Artist {
        fn field_type() -> FieldType {
            FieldType::Record {
                nullable: false,
                description: <Artist as Filterable>::description,
            }
        }
        fn field_ref(&self) -> FieldRef<'_> {
            FieldRef::Record(self)
        }
    }

    struct Track {
        id: i32,
        title: String,
        year: i32,
        rating: Option<f64>,
        artist: Option<Artist>,
        tags: Vec<String>,
    }

    impl Filterable for Track {
        fn description() -> RecordDescription {
            RecordDescription::builder("Track")
                .field::<i32>("id")
                .field::<String>("title")
                .field::<i32>("year")
                .field::<Option<f64>>("rating")
                .field::<Option<Artist>>("artist")
                .field::<Vec<String>>("tags")
                .build()
        }
        fn field(&self, name: &str) -> Option<FieldRef<'_>> {
            match name {
                "id" => Some(self.id.field_ref()),
                "title" => Some(self.title.field_ref()),
                "year" => Some(self.year.field_ref()),
                "rating" => Some(self.rating.field_ref()),
                "artist" => Some(self.artist.field_ref()),
                "tags" => Some(self.tags.field_ref()),
                _ => None,
            }
        }
    }

    fn track(id: i32, title: &str, year: i32, rating: Option<f64>, artist: Option<&str>, tags: &[&str]) -> Track {
        Track {
            id,
            title: title.to_string(),
            year,
            rating,
            artist: artist.map(|name| Artist { name: name.to_string() }),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn tracks() -> Vec<Track> {
        vec![
            track(1, "Echoes", 1971, Some(4.5), Some("Pink Floyd"), &["prog", "live"]),
            track(2, "Money", 1973, None, Some("Pink Floyd"), &["prog"]),
            track(3, "Hello", 2015, Some(3.0), None, &[]),
            track(4, "Yellow", 2000, Some(4.0), Some("Coldplay"), &["pop", "LIVE"]),
        ]
    }

    fn ids(text: &str) -> Vec<i32> {
        let predicate = compile_str::<Track>(text).expect("compile works");
        predicate.filter(tracks()).map(|t| t.id).collect()
    }

    #[test]
    fn comparisons() {
        assert_eq!(ids("year = 1973"), vec![2]);
        assert_eq!(ids("year != 1973"), vec![1, 3, 4]);
        assert_eq!(ids("year between 1971 and 2000"), vec![1, 2, 4]);
        assert_eq!(ids("title > \"Hello\""), vec![2, 4]);
        assert_eq!(ids("year in [2015, 1971]"), vec![1, 3]);
        assert_eq!(ids("year notIn [2015, 1971]"), vec![2, 4]);
        assert_eq!(ids(""), vec![1, 2, 3, 4]);
    }

    #[test]
    fn null_fields() {
        assert_eq!(ids("rating > 3.5"), vec![1, 4]);
        assert_eq!(ids("rating != 4"), vec![1, 2, 3]);
        assert_eq!(ids("rating isNull"), vec![2]);
        assert_eq!(ids("rating = null"), vec![2]);
        assert_eq!(ids("rating != null"), vec![1, 3, 4]);
        assert_eq!(ids("rating in [null, 3]"), vec![2, 3]);
        assert_eq!(ids("artist.name = \"Pink Floyd\""), vec![1, 2]);
        assert_eq!(ids("artist.name != \"Pink Floyd\""), vec![3, 4]);
        assert_eq!(ids("artist.name isNull"), vec![3]);
        assert_eq!(ids("artist isNotNull"), vec![1, 2, 4]);
    }

    #[test]
    fn text_and_collections() {
        assert_eq!(ids("title contains \"ELL\""), vec![3, 4]);
        assert_eq!(ids("title startsWith \"e\" or title endsWith \"NEY\""), vec![1, 2]);
        assert_eq!(ids("tags = \"live\""), vec![1]);
        assert_eq!(ids("tags contains \"live\""), vec![1, 4]);
        assert_eq!(ids("tags[all] = \"prog\""), vec![2, 3]);
        assert_eq!(ids("tags != \"prog\""), vec![3, 4]);
    }

    #[test]
    fn short_circuit_order() {
        let always = Predicate::<Track>::always();
        let never = !Predicate::<Track>::always();
        let t = track(9, "x", 1, None, None, &[]);
        assert!(always.clone().or(never.clone()).matches(&t));
        assert!(!always.and(never).matches(&t));
        let missing = Predicate::<Track>::from_expr(Expr::IsNull(FieldPath::new(vec!["nothing".to_string()])));
        assert!(missing.matches(&t));
    }
}
