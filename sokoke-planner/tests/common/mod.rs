#![allow(dead_code)]

use std::ops::Range;
use std::time::Duration;

use sokoke_data::Dialect;
use sokoke_data_sqlx::SqlStore;
use sokoke_planner::{Backend, Feature, NewFeature, Planner, Status};

const SQLITE_SCHEMA: &[&str] = &[
    "CREATE TABLE statuses (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        bg_color TEXT NOT NULL,
        text_color TEXT NOT NULL,
        accent_color TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE features (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        status_id TEXT REFERENCES statuses(id),
        last_check_status TEXT,
        completed INTEGER NOT NULL DEFAULT 0,
        priority INTEGER NOT NULL DEFAULT 0,
        archived INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE tasks (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        feature_id TEXT REFERENCES features(id),
        completed INTEGER NOT NULL DEFAULT 0,
        priority INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
];

pub async fn sqlite_planner() -> Planner {
    let store = SqlStore::connect("sqlite::memory:", Dialect::Sqlite, 1)
        .await
        .unwrap();
    for statement in SQLITE_SCHEMA {
        store.execute(statement).await.unwrap();
    }
    Planner::with_backend(Backend::Relational(store))
}

pub fn memory_planner() -> Planner {
    Planner::with_backend(Backend::in_memory())
}

/// One planner per backend family, labelled for assertion messages.
pub async fn planners() -> Vec<(&'static str, Planner)> {
    vec![("document", memory_planner()), ("sqlite", sqlite_planner().await)]
}

/// Creation times at millisecond precision must differ for the default order
/// to be deterministic.
pub async fn tick() {
    tokio::time::sleep(Duration::from_millis(3)).await;
}

/// `Item 00` .. `Item {count-1}`; every third one completed, priority `i % 5`.
pub async fn seed_items(planner: &Planner, count: usize) -> Vec<Feature> {
    seed_range(planner, 0..count).await
}

pub async fn seed_range(planner: &Planner, range: Range<usize>) -> Vec<Feature> {
    let mut created = Vec::with_capacity(range.len());
    for i in range {
        let mut input = NewFeature::new(&format!("Item {i:02}"), &format!("Seeded item number {i}"))
            .with_priority((i % 5) as i64);
        input.completed = i % 3 == 0;
        let feature = planner.features().create(input).await.into_result().unwrap();
        created.push(feature);
        tick().await;
    }
    created
}

pub fn names(items: &[Feature]) -> Vec<String> {
    items.iter().map(|f| f.name.clone()).collect()
}

pub fn status_names(items: &[Status]) -> Vec<String> {
    items.iter().map(|s| s.name.clone()).collect()
}
