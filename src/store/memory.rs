// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    Collection, ListQuery, Record, RecordStore, compare_values, new_record_id, timestamp_now,
    validate_id,
};
use crate::error::AppError;

/// In-process mock of the record API.
///
/// Records are kept per collection in insertion order, which doubles as
/// creation order when no sort key is given.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn record_id(record: &Record) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// Whether `data` collides with another record (any but `skip_id`) on a unique field.
/// Callers hold the write lock, so the check and the write are one step.
fn violates_unique(
    collection: Collection,
    records: &[Record],
    data: &Record,
    skip_id: Option<&str>,
) -> bool {
    collection.unique_fields().iter().any(|field| {
        let Some(value) = data.get(*field).filter(|v| !v.is_null()) else {
            return false;
        };
        records
            .iter()
            .filter(|r| skip_id.is_none() || record_id(r) != skip_id)
            .any(|r| r.get(*field) == Some(value))
    })
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        query.validate()?;

        let guard = self.collections.read().await;
        let mut items: Vec<Record> = guard
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| query.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.sort {
            // Stable sort keeps insertion order among equal keys.
            items.sort_by(|a, b| {
                let ord = compare_values(a.get(&sort.field), b.get(&sort.field));
                if sort.descending { ord.reverse() } else { ord }
            });
        }

        Ok(items)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Record, AppError> {
        validate_id(id)?;

        let guard = self.collections.read().await;
        guard
            .get(&collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned()
            .ok_or_else(|| collection.not_found())
    }

    async fn create(&self, collection: Collection, mut data: Record) -> Result<Record, AppError> {
        let mut guard = self.collections.write().await;
        let records = guard.entry(collection).or_default();
        if violates_unique(collection, records, &data, None) {
            return Err(collection.conflict());
        }

        let now = timestamp_now();
        data.insert("id".to_string(), Value::String(new_record_id()));
        data.insert("created".to_string(), Value::String(now.clone()));
        data.insert("updated".to_string(), Value::String(now));
        records.push(data.clone());

        Ok(data)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, AppError> {
        validate_id(id)?;

        let mut guard = self.collections.write().await;
        let records = guard
            .get_mut(&collection)
            .ok_or_else(|| collection.not_found())?;
        if violates_unique(collection, records, &patch, Some(id)) {
            return Err(collection.conflict());
        }
        let record = records
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
            .ok_or_else(|| collection.not_found())?;

        for (key, value) in patch {
            if matches!(key.as_str(), "id" | "created" | "updated") {
                continue;
            }
            record.insert(key, value);
        }
        record.insert("updated".to_string(), Value::String(timestamp_now()));

        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::into_record;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_list_sorted() {
        let store = MemoryStore::new();
        for (title, order) in [("third", 3), ("first", 1), ("second", 2)] {
            store
                .create(
                    Collection::Tasks,
                    into_record(json!({"scenario": "s1", "title": title, "order": order})).unwrap(),
                )
                .await
                .unwrap();
        }
        store
            .create(
                Collection::Tasks,
                into_record(json!({"scenario": "other", "title": "x", "order": 0})).unwrap(),
            )
            .await
            .unwrap();

        let tasks = store
            .list(Collection::Tasks, &ListQuery::new().filter("scenario", "s1").sort("order"))
            .await
            .unwrap();

        let titles: Vec<&str> = tasks.iter().map(|t| t["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get(Collection::Scenarios, "nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(msg) if msg == "Scenario not found"));
    }

    #[tokio::test]
    async fn duplicate_user_email_conflicts() {
        let store = MemoryStore::new();
        let first = store
            .create(Collection::Users, into_record(json!({"email": "a@simulex.io"})).unwrap())
            .await
            .unwrap();
        store
            .create(Collection::Users, into_record(json!({"email": "b@simulex.io"})).unwrap())
            .await
            .unwrap();

        let err = store
            .create(Collection::Users, into_record(json!({"email": "a@simulex.io"})).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Taking another user's email through an update is refused too
        let id = first["id"].as_str().unwrap();
        let err = store
            .update(Collection::Users, id, into_record(json!({"email": "b@simulex.io"})).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Re-saving its own email is fine
        store
            .update(Collection::Users, id, into_record(json!({"email": "a@simulex.io"})).unwrap())
            .await
            .unwrap();

        // Other collections carry no such constraint
        for _ in 0..2 {
            store
                .create(Collection::Scenarios, into_record(json!({"email": "a@simulex.io"})).unwrap())
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn update_merges_and_keeps_identity() {
        let store = MemoryStore::new();
        let created = store
            .create(
                Collection::Submissions,
                into_record(json!({"task": "t1", "time_spent": 12})).unwrap(),
            )
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let updated = store
            .update(
                Collection::Submissions,
                &id,
                into_record(json!({"score": 0.9, "id": "hijack"})).unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(updated["id"], json!(id));
        assert_eq!(updated["score"], json!(0.9));
        assert_eq!(updated["time_spent"], json!(12));
        assert_eq!(updated["created"], created["created"]);
    }
}
