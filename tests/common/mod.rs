#![allow(dead_code)]
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use dynfilter::{compile_str, DocumentId, DocumentStore, FRes, Predicate};
use dynfilter_derive::Filterable;
use tempfile::tempdir;

#[derive(Filterable, Clone, Debug)]
pub struct Genre {
    pub name: String,
}

#[derive(Filterable, Clone, Debug)]
pub struct Artist {
    pub name: String,
    pub country: String,
}

#[derive(Filterable, Clone, Debug)]
pub struct Song {
    pub id: i32,
    pub title: String,
    pub year: i32,
    #[filter(rename = "isFavorite")]
    pub is_favorite: bool,
    pub rating: Option<f64>,
    pub added: NaiveDate,
    pub genre: Vec<Genre>,
    pub artist: Option<Artist>,
    pub tags: Vec<String>,
    pub plays: i64,
    pub played_at: NaiveDateTime,
    pub released: Option<DateTime<Utc>>,
    pub length: Duration,
}

pub fn init_log() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn date_time(y: i32, m: u32, d: u32, hour: u32, nanos: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_nano_opt(hour, 0, 0, nanos).expect("valid time")
}

pub fn genres(names: &[&str]) -> Vec<Genre> {
    names.iter().map(|n| Genre { name: n.to_string() }).collect()
}

pub fn artist(name: &str, country: &str) -> Option<Artist> {
    Some(Artist {
        name: name.to_string(),
        country: country.to_string(),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn song(
    id: i32,
    title: &str,
    year: i32,
    is_favorite: bool,
    rating: Option<f64>,
    genre: &[&str],
    artist: Option<Artist>,
    tags: &[&str],
) -> Song {
    Song {
        id,
        title: title.to_string(),
        year,
        is_favorite,
        rating,
        added: if id <= 5 { date(2019, 5, 1) } else { date(2021, 3, 15) },
        genre: genres(genre),
        artist,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        plays: i64::from(id) * 1_000_000_000,
        played_at: played_at(id),
        released: if id == 10 {
            None
        } else {
            Some(Utc.from_utc_datetime(&played_at(id)))
        },
        length: Duration::seconds(i64::from(180 + 10 * id)) + Duration::nanoseconds(if id % 3 == 0 { 1_500 } else { 0 }),
    }
}

/// One hour apart from 2019-05-01 00:00, even ids half a microsecond later.
fn played_at(id: i32) -> NaiveDateTime {
    let nanos = if id % 2 == 0 { 500 } else { 0 };
    date_time(2019, 5, 1, (id - 1) as u32, nanos)
}

/// Ten well known songs, ids 1 to 10.
pub fn library() -> Vec<Song> {
    vec![
        song(1, "Echoes in the Dark", 1973, true, Some(4.8), &["Rock", "Progressive"], artist("Pink Floyd", "UK"), &["psychedelic"]),
        song(2, "Comfortably Numb", 1979, true, Some(4.9), &["Rock"], artist("Pink Floyd", "UK"), &[]),
        song(3, "Come Together", 1969, false, None, &["Rock", "Pop"], artist("The Beatles", "UK"), &[]),
        song(4, "Bohemian Rhapsody", 1975, true, Some(5.0), &["Rock", "Opera"], artist("Queen", "UK"), &["opera", "epic"]),
        song(5, "Stairway to Heaven", 1971, false, Some(4.7), &["Rock"], artist("Led Zeppelin", "UK"), &["epic"]),
        song(6, "Whole Lotta Love", 1969, false, None, &["Rock", "Blues"], artist("Led Zeppelin", "UK"), &[]),
        song(7, "Blinding Lights", 2020, false, Some(4.1), &["Pop", "Synthwave"], artist("The Weeknd", "Canada"), &[]),
        song(8, "Rolling in the Deep", 2010, true, Some(4.3), &["Soul", "Pop"], artist("Adele", "UK"), &[]),
        song(9, "Hello", 2015, false, None, &[], artist("Adele", "UK"), &[]),
        song(10, "Yellow", 2000, false, Some(3.9), &["Alternative"], None, &[]),
    ]
}

pub fn store_inst(name: &str, test: fn(store: &DocumentStore) -> FRes<()>) {
    init_log();
    let dir = tempdir().expect("can make a tempdir");
    let file = dir.path().join(format!("{}.db", name));

    let store = DocumentStore::open(&file).expect("can open just create");
    test(&store).expect("test is fine");
}

pub fn loaded_store(songs: &[Song]) -> FRes<DocumentStore> {
    let store = DocumentStore::memory()?;
    store.define::<Song>()?;
    store.insert_all(songs)?;
    Ok(store)
}

pub fn song_id(store: &DocumentStore, id: &DocumentId) -> i32 {
    let document = store.read::<Song>(id).expect("read works").expect("document exists");
    document["id"].as_i64().expect("song has an id") as i32
}

pub fn in_memory(songs: &[Song], predicate: &Predicate<Song>) -> Vec<i32> {
    let mut ids: Vec<i32> = predicate.filter(songs).map(|s| s.id).collect();
    ids.sort();
    ids
}

pub fn in_store(store: &DocumentStore, predicate: &Predicate<Song>) -> Vec<i32> {
    let mut ids: Vec<i32> = store
        .query(predicate)
        .expect("store query works")
        .iter()
        .map(|id| song_id(store, id))
        .collect();
    ids.sort();
    ids
}

/// Ids matched by `filter`, checking that both evaluators agree.
pub fn both(songs: &[Song], store: &DocumentStore, filter: &str) -> Vec<i32> {
    let predicate = compile_str::<Song>(filter).expect("filter compiles");
    let memory = in_memory(songs, &predicate);
    let stored = in_store(store, &predicate);
    assert_eq!(memory, stored, "evaluators disagree on '{}' ({})", filter, predicate);
    memory
}
