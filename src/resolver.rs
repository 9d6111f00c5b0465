//! Rewriting of logical field names into physical navigation paths.
use crate::{
    error::{FRes, FilterError},
    request::{FilterCondition, FilterRequest, FilterRule, Quantifier},
};
use log::debug;
use std::collections::HashMap;
use std::iter::FromIterator;

/// One dotted segment of a field path, with its optional quantifier annotation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PathSegment {
    pub(crate) name: String,
    pub(crate) quantifier: Option<Quantifier>,
}

/// Split `a.b[any].c` into its segments.
pub(crate) fn split_path(path: &str) -> FRes<Vec<PathSegment>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (name, quantifier) = match part.find('[') {
            Some(open) => {
                let annotation = part[open..]
                    .strip_prefix('[')
                    .and_then(|a| a.strip_suffix(']'))
                    .ok_or_else(|| FilterError::InvalidPath(path.to_string()))?;
                let quantifier = if annotation.eq_ignore_ascii_case("any") {
                    Quantifier::Any
                } else if annotation.eq_ignore_ascii_case("all") {
                    Quantifier::All
                } else {
                    return Err(FilterError::InvalidPath(path.to_string()));
                };
                (&part[..open], Some(quantifier))
            }
            None => (part, None),
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(FilterError::InvalidPath(path.to_string()));
        }
        segments.push(PathSegment {
            name: name.to_string(),
            quantifier,
        });
    }
    Ok(segments)
}

fn render_path(segments: &[PathSegment]) -> String {
    segments
        .iter()
        .map(|s| match s.quantifier {
            Some(q) => format!("{}[{}]", s.name, q.keyword()),
            None => s.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Case-insensitive map from logical dotted field names to physical paths.
///
/// # Example
/// ```
/// use dynfilter::{parse, resolve_paths, PathMapping};
/// # use dynfilter::FRes;
/// # fn example() -> FRes<()> {
/// let mapping: PathMapping = vec![("genre.name", "genres.label")].into_iter().collect();
/// let mut request = parse("Genre[all].Name != \"Unknown\"")?;
/// resolve_paths(&mut request, &mapping)?;
/// assert_eq!(request.conditions()[0].effective_path(), "genres[all].label");
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Clone, Debug, Default)]
pub struct PathMapping {
    entries: HashMap<String, String>,
}

impl PathMapping {
    pub fn new() -> PathMapping {
        PathMapping::default()
    }

    pub fn insert(&mut self, logical: &str, physical: &str) {
        self.entries.insert(logical.to_ascii_lowercase(), physical.to_string());
    }

    pub fn get(&self, logical: &str) -> Option<&str> {
        self.entries.get(&logical.to_ascii_lowercase()).map(|p| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for PathMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> PathMapping {
        let mut mapping = PathMapping::new();
        for (logical, physical) in iter {
            mapping.insert(logical.as_ref(), physical.as_ref());
        }
        mapping
    }
}

/// Set `resolved_path` on every condition, nested groups included, whose field is present in
/// the mapping. Quantifiers written on the logical field move to the physical segment at the
/// same position.
pub fn resolve_paths(request: &mut FilterRequest, mapping: &PathMapping) -> FRes<()> {
    resolve_rules(&mut request.rules, mapping)
}

fn resolve_rules(rules: &mut [FilterRule], mapping: &PathMapping) -> FRes<()> {
    for rule in rules {
        match rule {
            FilterRule::Condition(condition) => resolve_condition(condition, mapping)?,
            FilterRule::Group(group) => resolve_rules(&mut group.rules, mapping)?,
        }
    }
    Ok(())
}

fn resolve_condition(condition: &mut FilterCondition, mapping: &PathMapping) -> FRes<()> {
    let logical = split_path(&condition.field)?;
    let key = logical.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(".");
    let physical = match mapping.get(&key) {
        Some(physical) => physical,
        None => return Ok(()),
    };
    let mut segments = split_path(physical)?;
    if logical.iter().any(|s| s.quantifier.is_some()) {
        if logical.len() != segments.len() {
            return Err(FilterError::Resolution {
                field: condition.field.clone(),
                physical: physical.to_string(),
            });
        }
        for (target, source) in segments.iter_mut().zip(logical.iter()) {
            if source.quantifier.is_some() {
                target.quantifier = source.quantifier;
            }
        }
    }
    let resolved = render_path(&segments);
    debug!("resolved field '{}' to '{}'", condition.field, resolved);
    condition.resolved_path = Some(resolved);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::{resolve_paths, split_path, PathMapping, PathSegment};
    use crate::{
        error::FilterError,
        parser::parse,
        request::{FilterRule, Quantifier},
    };

    fn mapping() -> PathMapping {
        vec![
            ("artist", "album.artists.name"),
            ("genre.name", "genres.label"),
            ("Album.Title", "album.title"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn segments() {
        assert_eq!(
            split_path("album.artists[ANY].name").expect("valid path"),
            vec![
                PathSegment {
                    name: "album".to_string(),
                    quantifier: None
                },
                PathSegment {
                    name: "artists".to_string(),
                    quantifier: Some(Quantifier::Any)
                },
                PathSegment {
                    name: "name".to_string(),
                    quantifier: None
                },
            ]
        );
        assert!(split_path("a..b").is_err());
        assert!(split_path("a[some]").is_err());
        assert!(split_path("a[any").is_err());
    }

    #[test]
    fn maps_case_insensitive() {
        let mut request = parse("ALBUM.title = \"x\" and year = 1").expect("parse works");
        resolve_paths(&mut request, &mapping()).expect("resolution works");
        let conditions = request.conditions();
        assert_eq!(conditions[0].resolved_path.as_deref(), Some("album.title"));
        assert_eq!(conditions[1].resolved_path, None);
        assert_eq!(conditions[1].effective_path(), "year");
    }

    #[test]
    fn carries_quantifiers_by_position() {
        let mut request = parse("genre[all].name != \"Unknown\"").expect("parse works");
        resolve_paths(&mut request, &mapping()).expect("resolution works");
        assert_eq!(request.conditions()[0].resolved_path.as_deref(), Some("genres[all].label"));
    }

    #[test]
    fn rejects_mismatched_segment_counts() {
        let mut request = parse("artist[any] = \"x\"").expect("parse works");
        match resolve_paths(&mut request, &mapping()) {
            Err(FilterError::Resolution { field, physical }) => {
                assert_eq!(field, "artist[any]");
                assert_eq!(physical, "album.artists.name");
            }
            other => panic!("expected a resolution error, found {:?}", other),
        }
        // without quantifiers the segment counts do not matter
        let mut request = parse("artist = \"x\"").expect("parse works");
        resolve_paths(&mut request, &mapping()).expect("resolution works");
        assert_eq!(request.conditions()[0].resolved_path.as_deref(), Some("album.artists.name"));
    }

    #[test]
    fn recurses_into_groups() {
        let mut request = parse("year = 1 or (genre.name = \"Rock\" and (artist = \"x\"))").expect("parse works");
        resolve_paths(&mut request, &mapping()).expect("resolution works");
        match &request.rules[1] {
            FilterRule::Group(_) => {}
            other => panic!("expected a group, found {:?}", other),
        }
        let resolved: Vec<_> = request
            .conditions()
            .iter()
            .map(|c| c.resolved_path.clone())
            .collect();
        assert_eq!(
            resolved,
            vec![
                None,
                Some("genres.label".to_string()),
                Some("album.artists.name".to_string())
            ]
        );
    }
}
