use crate::error::{FRes, FilterError};
use persy::PersyId;

/// Identifier of a document in a [`DocumentStore`](crate::DocumentStore), displayed as
/// `<collection>@<persy id>`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct DocumentId {
    pub(crate) collection: String,
    pub(crate) raw_id: PersyId,
}

impl DocumentId {
    pub(crate) fn new(collection: &str, raw_id: PersyId) -> DocumentId {
        DocumentId {
            collection: collection.to_string(),
            raw_id,
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.collection, self.raw_id)
    }
}

fn raw_parse(s: &str) -> FRes<(&str, &str)> {
    let mut split = s.splitn(2, '@');
    let sty = split.next();
    let sid = split.next();
    match (sty, sid) {
        (Some(ty), Some(id)) if !ty.is_empty() => Ok((ty, id)),
        _ => Err(FilterError::InvalidId),
    }
}

impl std::str::FromStr for DocumentId {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, id) = raw_parse(s)?;
        Ok(DocumentId {
            collection: collection.to_string(),
            raw_id: id.parse().or(Err(FilterError::InvalidId))?,
        })
    }
}
