//! Free text search over a single text projection.
use crate::{
    compiler::compile,
    error::FRes,
    predicate::Predicate,
    record::Filterable,
    request::{Combinator, FilterCondition, FilterOperator, FilterRequest, FilterRule, Scalar},
};

/// Conjunctive, case-insensitive substring search: an item matches when its text contains every
/// whitespace separated term of the search text.
///
/// # Example
/// ```
/// use dynfilter::FuzzySearch;
/// let titles = vec!["Stairway to Heaven", "Highway to Hell", "Heaven Knows"];
/// let search = FuzzySearch::new("heaven TO");
/// let found: Vec<_> = search.apply(titles, |t| t.to_string()).collect();
/// assert_eq!(found, vec!["Stairway to Heaven"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzySearch {
    terms: Vec<String>,
}

impl FuzzySearch {
    pub fn new(text: &str) -> FuzzySearch {
        FuzzySearch {
            terms: text.split_whitespace().map(str::to_lowercase).collect(),
        }
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.terms.iter().all(|term| text.contains(term.as_str()))
    }

    /// Lazily keep the items whose projected text matches.
    pub fn apply<'s, I, F>(&'s self, items: I, projector: F) -> impl Iterator<Item = I::Item> + 's
    where
        I: IntoIterator,
        I: 's,
        I::IntoIter: 's,
        F: Fn(&I::Item) -> String + 's,
    {
        items.into_iter().filter(move |item| self.matches(&projector(item)))
    }

    /// The same search as a predicate on a text field of `T`, usable by both evaluators.
    pub fn predicate<T: Filterable>(&self, field: &str) -> FRes<Predicate<T>> {
        if self.terms.is_empty() {
            return Ok(Predicate::always());
        }
        let rules = self
            .terms
            .iter()
            .map(|term| {
                FilterRule::Condition(FilterCondition::new(
                    field,
                    FilterOperator::Contains,
                    Some(Scalar::String(term.clone())),
                ))
            })
            .collect();
        compile(&FilterRequest::new(Combinator::And, rules))
    }
}

#[cfg(test)]
mod test {
    use super::FuzzySearch;
    use crate::{
        desc::RecordDescription,
        error::FilterError,
        record::{FieldRef, FilterField, Filterable},
    };

    struct Track {
        title: String,
        plays: i32,
    }

    impl Filterable for Track {
        fn description() -> RecordDescription {
            RecordDescription::builder("Track")
                .field::<String>("title")
                .field::<i32>("plays")
                .build()
        }
        fn field(&self, name: &str) -> Option<FieldRef<'_>> {
            match name {
                "title" => Some(self.title.field_ref()),
                "plays" => Some(self.plays.field_ref()),
                _ => None,
            }
        }
    }

    fn tracks() -> Vec<Track> {
        ["Rolling in the Deep", "Deep Purple Haze", "In the Air Tonight", "Hello"]
            .iter()
            .map(|t| Track {
                title: t.to_string(),
                plays: 1,
            })
            .collect()
    }

    #[test]
    fn all_terms_required() {
        let search = FuzzySearch::new("  DEEP\tthe ");
        assert_eq!(search.terms(), &["deep".to_string(), "the".to_string()]);
        assert!(search.matches("Rolling in the Deep"));
        assert!(!search.matches("Deep Purple Haze"));
        assert!(!search.matches(""));
    }

    #[test]
    fn empty_search_matches_everything() {
        let search = FuzzySearch::new("   ");
        assert!(search.is_empty());
        assert!(search.matches(""));
        assert_eq!(search.apply(tracks(), |t| t.title.clone()).count(), 4);
        let predicate = search.predicate::<Track>("title").expect("predicate works");
        assert_eq!(predicate.filter(&tracks()).count(), 4);
    }

    #[test]
    fn predicate_agrees_with_apply() {
        let data = tracks();
        for text in &["deep", "in the", "HAZE purple", "o", "zz"] {
            let search = FuzzySearch::new(text);
            let direct: Vec<_> = search.apply(&data, |t| t.title.clone()).map(|t| &t.title).collect();
            let predicate = search.predicate::<Track>("title").expect("predicate works");
            let compiled: Vec<_> = predicate.filter(&data).map(|t| &t.title).collect();
            assert_eq!(direct, compiled, "search '{}'", text);
        }
    }

    #[test]
    fn predicate_needs_text_field() {
        let search = FuzzySearch::new("1");
        assert!(matches!(
            search.predicate::<Track>("plays"),
            Err(FilterError::OperatorMismatch { .. })
        ));
        assert!(matches!(
            search.predicate::<Track>("missing"),
            Err(FilterError::UnknownField { .. })
        ));
    }
}
