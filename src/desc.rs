use crate::record::FilterField;
use std::fmt;

/// Declared type of a scalar field.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
#[cfg_attr(feature = "serde_info", derive(serde::Serialize, serde::Deserialize))]
pub enum ScalarType {
    Text,
    Int,
    Long,
    Float,
    Bool,
    Date,
    DateTime,
    Duration,
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Text => "Text",
            ScalarType::Int => "Int",
            ScalarType::Long => "Long",
            ScalarType::Float => "Float",
            ScalarType::Bool => "Bool",
            ScalarType::Date => "Date",
            ScalarType::DateTime => "DateTime",
            ScalarType::Duration => "Duration",
        };
        write!(f, "{}", name)
    }
}

/// Declared type of a record field.
///
/// Nested record descriptions are produced on demand, so a record type may refer to itself.
#[derive(Clone, Copy, Debug)]
pub enum FieldType {
    Scalar { ty: ScalarType, nullable: bool },
    Record {
        nullable: bool,
        description: fn() -> RecordDescription,
    },
    /// Element type of the collection.
    Collection(fn() -> FieldType),
}

impl FieldType {
    pub fn scalar(ty: ScalarType) -> FieldType {
        FieldType::Scalar { ty, nullable: false }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            FieldType::Scalar { nullable, .. } => *nullable,
            FieldType::Record { nullable, .. } => *nullable,
            FieldType::Collection(_) => false,
        }
    }

    pub(crate) fn as_nullable(self) -> FieldType {
        match self {
            FieldType::Scalar { ty, .. } => FieldType::Scalar { ty, nullable: true },
            FieldType::Record { description, .. } => FieldType::Record {
                nullable: true,
                description,
            },
            FieldType::Collection(element) => FieldType::Collection(element),
        }
    }

    /// Element type for collections.
    pub fn element(&self) -> Option<FieldType> {
        match self {
            FieldType::Collection(element) => Some(element()),
            _ => None,
        }
    }

    pub fn record_description(&self) -> Option<RecordDescription> {
        match self {
            FieldType::Record { description, .. } => Some(description()),
            _ => None,
        }
    }
}

impl PartialEq for FieldType {
    fn eq(&self, other: &FieldType) -> bool {
        match (self, other) {
            (FieldType::Scalar { ty, nullable }, FieldType::Scalar { ty: oty, nullable: on }) => {
                ty == oty && nullable == on
            }
            (FieldType::Record { nullable, description }, FieldType::Record { nullable: on, description: od }) => {
                nullable == on && description().name() == od().name()
            }
            (FieldType::Collection(_), FieldType::Collection(_)) => self.element() == other.element(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar { ty, nullable: false } => write!(f, "{}", ty),
            FieldType::Scalar { ty, nullable: true } => write!(f, "Option<{}>", ty),
            FieldType::Record {
                description,
                nullable: false,
            } => write!(f, "{}", description().name()),
            FieldType::Record {
                description,
                nullable: true,
            } => write!(f, "Option<{}>", description().name()),
            FieldType::Collection(element) => write!(f, "Vec<{}>", element()),
        }
    }
}

/// Field metadata
#[derive(PartialEq, Clone, Debug)]
pub struct FieldDescription {
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
}

impl FieldDescription {
    pub fn new<T: FilterField>(name: &str) -> FieldDescription {
        FieldDescription {
            name: name.to_string(),
            field_type: T::field_type(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// Name and fields of a filterable record type.
#[derive(PartialEq, Clone, Debug)]
pub struct RecordDescription {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldDescription>,
}

impl RecordDescription {
    pub fn builder(name: &str) -> RecordDescriptionBuilder {
        RecordDescriptionBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescription> {
        self.fields.iter()
    }

    /// Field with exactly this name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDescription> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Lookup used by the filter compiler: an exact match wins, otherwise the first field whose
    /// name matches ignoring ASCII case.
    pub fn find_field(&self, name: &str) -> Option<&FieldDescription> {
        self.get_field(name)
            .or_else(|| self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name)))
    }
}

pub struct RecordDescriptionBuilder {
    desc: RecordDescription,
}

impl RecordDescriptionBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            desc: RecordDescription {
                name: name.to_string(),
                fields: Vec::new(),
            },
        }
    }

    pub fn add_field(mut self, name: &str, field_type: FieldType) -> Self {
        self.desc.fields.push(FieldDescription {
            name: name.to_string(),
            field_type,
        });
        self
    }

    pub fn field<T: FilterField>(mut self, name: &str) -> Self {
        self.desc.fields.push(FieldDescription::new::<T>(name));
        self
    }

    pub fn build(self) -> RecordDescription {
        self.desc
    }
}

#[cfg(test)]
mod test {
    use super::{FieldType, RecordDescription, ScalarType};
    use chrono::NaiveDate;

    fn sample() -> RecordDescription {
        RecordDescription::builder("Song")
            .field::<i32>("id")
            .field::<String>("title")
            .field::<Option<NaiveDate>>("released")
            .field::<Vec<String>>("tags")
            .field::<String>("Title")
            .build()
    }

    #[test]
    fn field_lookup() {
        let desc = sample();
        assert_eq!(desc.name(), "Song");
        assert_eq!(desc.fields().count(), 5);
        assert_eq!(desc.find_field("Title").map(|f| f.name()), Some("Title"));
        assert_eq!(desc.find_field("title").map(|f| f.name()), Some("title"));
        assert_eq!(desc.find_field("TITLE").map(|f| f.name()), Some("title"));
        assert_eq!(desc.find_field("ID").map(|f| f.name()), Some("id"));
        assert!(desc.find_field("missing").is_none());
        assert!(desc.get_field("ID").is_none());
    }

    #[test]
    fn field_types() {
        let desc = sample();
        let released = desc.find_field("released").map(|f| *f.field_type());
        assert_eq!(
            released,
            Some(FieldType::Scalar {
                ty: ScalarType::Date,
                nullable: true
            })
        );
        let tags = desc.find_field("tags").map(|f| *f.field_type());
        assert_eq!(tags.and_then(|t| t.element()), Some(FieldType::scalar(ScalarType::Text)));
        assert_eq!(tags.map(|t| t.to_string()), Some("Vec<Text>".to_string()));
        assert_eq!(released.map(|t| t.to_string()), Some("Option<Date>".to_string()));
    }
}
