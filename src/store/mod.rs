//! Single file document store backed by persy.
//!
//! Records are stored as JSON documents, one persy segment per collection, and filtered either
//! with a [`StoreQuery`] or with a compiled [`Predicate`] that is lowered to one.
use crate::{
    error::{FRes, FilterError},
    format::BinaryFormat,
    id::DocumentId,
    predicate::Predicate,
    record::Filterable,
};
use data_encoding::BASE32_DNSSEC;
use log::{debug, warn};
use persy::{Config, Persy};
use serde_json::Value as JsonValue;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

mod document;
mod matcher;
mod query;
pub use query::StoreQuery;

pub(crate) const INTERNAL_SEGMENT_NAME: &str = "__#catalog";

/// Catalog entry of a defined collection, `fields` holds `name: type` pairs.
#[derive(Clone, Debug, PartialEq)]
struct CatalogEntry {
    collection: String,
    segment: String,
    fields: Vec<String>,
}

impl CatalogEntry {
    fn create(collection: &str, fields: Vec<String>) -> CatalogEntry {
        let rnd = rand::random::<u32>();
        let segment = format!("{}_{}", BASE32_DNSSEC.encode(&rnd.to_be_bytes()), collection);
        CatalogEntry {
            collection: collection.to_string(),
            segment,
            fields,
        }
    }
}

impl BinaryFormat for CatalogEntry {
    fn write(&self, write: &mut dyn Write) -> FRes<()> {
        self.collection.write(write)?;
        self.segment.write(write)?;
        self.fields.write(write)?;
        Ok(())
    }
    fn read(read: &mut dyn Read) -> FRes<CatalogEntry> {
        let collection = String::read(read)?;
        let segment = String::read(read)?;
        let fields = Vec::<String>::read(read)?;
        Ok(CatalogEntry {
            collection,
            segment,
            fields,
        })
    }
}

fn field_signatures<T: Filterable>() -> Vec<String> {
    T::description()
        .fields()
        .map(|f| format!("{}: {}", f.name(), f.field_type()))
        .collect()
}

struct Catalog {
    entries: Mutex<HashMap<String, CatalogEntry>>,
}

impl Catalog {
    fn new(entries: HashMap<String, CatalogEntry>) -> Catalog {
        Catalog {
            entries: Mutex::new(entries),
        }
    }

    fn is_defined(&self, collection: &str) -> FRes<bool> {
        let lock = self.entries.lock()?;
        Ok(lock.contains_key(collection))
    }

    fn segment(&self, collection: &str) -> FRes<String> {
        let lock = self.entries.lock()?;
        match lock.get(collection) {
            Some(entry) => Ok(entry.segment.clone()),
            None => Err(FilterError::CollectionNotDefined(collection.to_string())),
        }
    }

    fn define<F>(&self, collection: &str, fields: Vec<String>, create: F) -> FRes<bool>
    where
        F: Fn(CatalogEntry) -> FRes<CatalogEntry>,
    {
        let mut lock = self.entries.lock()?;
        match lock.entry(collection.to_string()) {
            Entry::Occupied(x) => {
                if x.get().fields != fields {
                    return Err(FilterError::CollectionAlreadyDefined(collection.to_string()));
                }
                Ok(false)
            }
            Entry::Vacant(x) => {
                let entry = create(CatalogEntry::create(collection, fields))?;
                x.insert(entry);
                Ok(true)
            }
        }
    }
}

/// Configuration builder for opening or creating a store file.
///
/// # Example
/// ```
/// use dynfilter::DocumentStore;
/// # use dynfilter::FRes;
/// # fn example() -> FRes<()> {
/// let config = DocumentStore::config("path/to/library.db").create(true);
/// let store = DocumentStore::open(config)?;
/// # Ok(())
/// # }
/// ```
pub struct StoreConfig {
    create: bool,
    path: PathBuf,
}

impl StoreConfig {
    /// Set flag to create the file if it does not exist
    pub fn create(mut self, create: bool) -> StoreConfig {
        self.create = create;
        self
    }
}

impl<T: AsRef<Path>> From<T> for StoreConfig {
    fn from(path: T) -> StoreConfig {
        StoreConfig {
            create: true,
            path: path.as_ref().to_path_buf(),
        }
    }
}

struct StoreImpl {
    persy: Persy,
    catalog: Catalog,
}

impl StoreImpl {
    fn init_segment<P: AsRef<Path>>(path: P) -> FRes<()> {
        let persy = Persy::open(path, Config::new())?;
        let mut tx = persy.begin()?;
        tx.create_segment(INTERNAL_SEGMENT_NAME)?;
        tx.prepare()?.commit()?;
        Ok(())
    }

    fn open(config: StoreConfig) -> FRes<StoreImpl> {
        if config.create && !config.path.exists() {
            Persy::create(&config.path)?;
            StoreImpl::init_segment(&config.path)?;
        }
        let persy = Persy::open(&config.path, Config::new())?;
        let entries = persy
            .scan(INTERNAL_SEGMENT_NAME)?
            .map(|(_, r)| CatalogEntry::read(&mut Cursor::new(r)).map(|e| (e.collection.clone(), e)))
            .collect::<FRes<HashMap<_, _>>>()?;
        debug!("opened store {:?} with {} collections", config.path, entries.len());
        Ok(StoreImpl {
            persy,
            catalog: Catalog::new(entries),
        })
    }

    fn memory() -> FRes<StoreImpl> {
        let persy = persy::OpenOptions::new().memory()?;
        let mut tx = persy.begin()?;
        tx.create_segment(INTERNAL_SEGMENT_NAME)?;
        tx.prepare()?.commit()?;
        Ok(StoreImpl {
            persy,
            catalog: Catalog::new(HashMap::new()),
        })
    }

    fn define<T: Filterable>(&self) -> FRes<bool> {
        let collection = T::description().name().to_string();
        let defined = self.catalog.define(&collection, field_signatures::<T>(), |entry| {
            let mut buff = Vec::new();
            entry.write(&mut buff)?;
            let mut tx = self.persy.begin()?;
            tx.insert(INTERNAL_SEGMENT_NAME, &buff)?;
            tx.create_segment(entry.segment.as_str())?;
            tx.prepare()?.commit()?;
            Ok(entry)
        })?;
        if defined {
            debug!("defined collection '{}'", collection);
        }
        Ok(defined)
    }

    fn insert_all<'a, T, I>(&self, records: I) -> FRes<Vec<DocumentId>>
    where
        T: Filterable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let collection = T::description().name().to_string();
        let segment = self.catalog.segment(&collection)?;
        let mut tx = self.persy.begin()?;
        let mut ids = Vec::new();
        for record in records {
            let buff = serde_json::to_vec(&document::to_document(record)?)?;
            let id = tx.insert(segment.as_str(), &buff)?;
            ids.push(DocumentId::new(&collection, id));
        }
        tx.prepare()?.commit()?;
        Ok(ids)
    }

    fn read<T: Filterable>(&self, id: &DocumentId) -> FRes<Option<JsonValue>> {
        let collection = T::description().name().to_string();
        if id.collection != collection {
            return Err(FilterError::InvalidId);
        }
        let segment = self.catalog.segment(&collection)?;
        match self.persy.read(segment.as_str(), &id.raw_id)? {
            Some(buff) => Ok(Some(serde_json::from_slice(&buff)?)),
            None => Ok(None),
        }
    }

    fn scan<T: Filterable>(&self) -> FRes<DocumentIter<T>> {
        let collection = T::description().name().to_string();
        let segment = self.catalog.segment(&collection)?;
        Ok(DocumentIter {
            iter: self.persy.scan(segment.as_str())?,
            collection,
            marker: PhantomData,
        })
    }
}

/// Iterator over the documents of a collection, a document that does not decode is an error
/// item.
pub struct DocumentIter<T> {
    iter: persy::SegmentIter,
    collection: String,
    marker: PhantomData<fn() -> T>,
}

impl<T> Iterator for DocumentIter<T> {
    type Item = FRes<(DocumentId, JsonValue)>;
    fn next(&mut self) -> Option<Self::Item> {
        let (id, buff) = self.iter.next()?;
        let id = DocumentId::new(&self.collection, id);
        Some(match serde_json::from_slice(&buff) {
            Ok(document) => Ok((id, document)),
            Err(e) => {
                warn!("document {} does not decode: {}", id, e);
                Err(e.into())
            }
        })
    }
}

/// Document store over a single persy file.
///
/// # Example
/// ```
/// use dynfilter::{compile_str, DocumentStore, FieldRef, FilterField, Filterable, RecordDescription};
/// # use dynfilter::FRes;
/// struct Song {
///     title: String,
///     year: i32,
/// }
///
/// impl Filterable for Song {
///     fn description() -> RecordDescription {
///         RecordDescription::builder("Song").field::<String>("title").field::<i32>("year").build()
///     }
///     fn field(&self, name: &str) -> Option<FieldRef<'_>> {
///         match name {
///             "title" => Some(self.title.field_ref()),
///             "year" => Some(self.year.field_ref()),
///             _ => None,
///         }
///     }
/// }
///
/// # fn example() -> FRes<()> {
/// let store = DocumentStore::memory()?;
/// store.define::<Song>()?;
/// store.insert(&Song { title: "Yellow".to_string(), year: 2000 })?;
/// store.insert(&Song { title: "Hello".to_string(), year: 2015 })?;
/// let found = store.query(&compile_str::<Song>("year > 2010")?)?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
#[derive(Clone)]
pub struct DocumentStore {
    inner: Arc<StoreImpl>,
}

impl DocumentStore {
    /// Config builder for opening an existing store file.
    pub fn config<C: AsRef<Path>>(path: C) -> StoreConfig {
        let mut c = StoreConfig::from(path);
        c.create = false;
        c
    }

    /// Open a store file, a bare path creates the file when missing.
    pub fn open<C: Into<StoreConfig>>(config: C) -> FRes<DocumentStore> {
        Ok(DocumentStore {
            inner: Arc::new(StoreImpl::open(config.into())?),
        })
    }

    /// Store living only in memory, dropped with the last clone.
    pub fn memory() -> FRes<DocumentStore> {
        Ok(DocumentStore {
            inner: Arc::new(StoreImpl::memory()?),
        })
    }

    /// Define the collection of `T`, returns false if it was already defined with the same fields.
    ///
    /// Fails with [`FilterError::CollectionAlreadyDefined`] if a collection with the same name
    /// exists with different field names or types.
    pub fn define<T: Filterable>(&self) -> FRes<bool> {
        self.inner.define::<T>()
    }

    pub fn is_defined<T: Filterable>(&self) -> FRes<bool> {
        self.inner.catalog.is_defined(T::description().name())
    }

    pub fn insert<T: Filterable>(&self, record: &T) -> FRes<DocumentId> {
        let mut ids = self.inner.insert_all(std::iter::once(record))?;
        ids.pop().ok_or(FilterError::InvalidId)
    }

    /// Insert all the records in a single transaction.
    pub fn insert_all<'a, T, I>(&self, records: I) -> FRes<Vec<DocumentId>>
    where
        T: Filterable + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        self.inner.insert_all(records)
    }

    pub fn read<T: Filterable>(&self, id: &DocumentId) -> FRes<Option<JsonValue>> {
        self.inner.read::<T>(id)
    }

    pub fn scan<T: Filterable>(&self) -> FRes<DocumentIter<T>> {
        self.inner.scan::<T>()
    }

    /// Ids of the documents of `T` matching a store query, in scan order.
    pub fn find<T: Filterable>(&self, query: &StoreQuery) -> FRes<Vec<DocumentId>> {
        debug!("store query on '{}': {}", T::description().name(), query);
        let mut found = Vec::new();
        for item in self.scan::<T>()? {
            let (id, document) = item?;
            if query.matches(&document)? {
                found.push(id);
            }
        }
        Ok(found)
    }

    /// Lower a compiled predicate and run it on the store.
    pub fn query<T: Filterable>(&self, predicate: &Predicate<T>) -> FRes<Vec<DocumentId>> {
        let query = StoreQuery::from_predicate(predicate)?;
        self.find::<T>(&query)
    }
}
