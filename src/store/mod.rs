// src/store/mod.rs

//! Generic record storage.
//!
//! Every entity lives in a named collection as a JSON object. Backends only
//! have to support equality filters, a single sort key and shallow patches,
//! which is all the hosted record API offers.

pub mod memory;
pub mod pocketbase;
pub mod sqlite;

use std::{cmp::Ordering, fmt, sync::Arc, sync::LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};

use crate::{
    config::{Config, StoreBackend},
    error::AppError,
};

pub use memory::MemoryStore;
pub use pocketbase::PocketBaseStore;
pub use sqlite::SqliteStore;

/// A stored document. Always a JSON object carrying `id`, `created` and `updated`.
pub type Record = Map<String, Value>;

static FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid field regex"));

static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,64}$").expect("valid id regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Scenarios,
    Tasks,
    Submissions,
    Analytics,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Scenarios => "scenarios",
            Collection::Tasks => "tasks",
            Collection::Submissions => "submissions",
            Collection::Analytics => "analytics",
        }
    }

    /// Human label used in "not found" messages.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Users => "User",
            Collection::Scenarios => "Scenario",
            Collection::Tasks => "Task",
            Collection::Submissions => "Submission",
            Collection::Analytics => "Analytics",
        }
    }

    pub fn not_found(self) -> AppError {
        AppError::NotFound(format!("{} not found", self.label()))
    }

    /// Fields whose values no two records of the collection may share.
    /// The SQLite backend carries a matching unique index per entry.
    pub fn unique_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["email"],
            _ => &[],
        }
    }

    pub fn conflict(self) -> AppError {
        let fields = self.unique_fields();
        if fields.is_empty() {
            AppError::Conflict(format!("{} already exists", self.label()))
        } else {
            AppError::Conflict(format!(
                "{} with this {} already exists",
                self.label(),
                fields.join(" and ")
            ))
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar value an equality filter compares against.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Bool(bool),
}

impl FilterValue {
    /// Whether a stored JSON value equals this filter value.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (FilterValue::Text(a), Value::String(b)) => a == b,
            (FilterValue::Bool(a), Value::Bool(b)) => a == b,
            (FilterValue::Int(a), Value::Number(b)) => b.as_f64() == Some(*a as f64),
            _ => false,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Text(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Text(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Bool(v)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        FilterValue::Int(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: FilterValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    /// Parses PocketBase notation: `order` ascending, `-order` descending.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => SortKey {
                field: field.to_string(),
                descending: true,
            },
            None => SortKey {
                field: raw.trim_start_matches('+').to_string(),
                descending: false,
            },
        }
    }

    pub fn to_pocketbase(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// Equality filters (all must match) plus an optional sort key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: Option<SortKey>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &str, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn sort(mut self, key: &str) -> Self {
        self.sort = Some(SortKey::parse(key));
        self
    }

    /// Rejects field names that could escape a filter expression.
    pub fn validate(&self) -> Result<(), AppError> {
        for f in &self.filters {
            validate_field(&f.field)?;
        }
        if let Some(sort) = &self.sort {
            validate_field(&sort.field)?;
        }
        Ok(())
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| {
            record
                .get(&f.field)
                .map(|v| f.value.matches(v))
                .unwrap_or(false)
        })
    }
}

pub fn validate_field(field: &str) -> Result<(), AppError> {
    if FIELD_RE.is_match(field) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid field name '{}'", field)))
    }
}

pub fn validate_id(id: &str) -> Result<(), AppError> {
    if ID_RE.is_match(id) {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!("Invalid record id '{}'", id)))
    }
}

/// 15 lowercase alphanumeric characters, the same shape PocketBase issues.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..15].to_string()
}

pub fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Ordering used by stores that sort in-process.
/// Missing values sort first; mixed kinds order null < bool < number < string.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Turns request data into a record body, refusing non-objects.
pub fn into_record(data: Value) -> Result<Record, AppError> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest("Record data must be a JSON object".to_string())),
    }
}

/// The record API the service persists through.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, AppError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Record, AppError>;

    async fn create(&self, collection: Collection, data: Record) -> Result<Record, AppError>;

    async fn update(&self, collection: Collection, id: &str, patch: Record) -> Result<Record, AppError>;
}

/// Builds the store selected by `STORE_BACKEND`.
pub async fn connect(config: &Config) -> Result<Arc<dyn RecordStore>, AppError> {
    match config.store_backend {
        StoreBackend::Sqlite => {
            let store = SqliteStore::connect_with_retry(&config.database_url).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::PocketBase => {
            let store = PocketBaseStore::new(&config.pocketbase_url)?;
            if let (Some(email), Some(password)) = (
                &config.pocketbase_admin_email,
                &config.pocketbase_admin_password,
            ) {
                store.authenticate(email, password).await?;
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sort_key_parses_direction() {
        assert_eq!(
            SortKey::parse("-created"),
            SortKey { field: "created".into(), descending: true }
        );
        assert_eq!(
            SortKey::parse("order"),
            SortKey { field: "order".into(), descending: false }
        );
        assert_eq!(SortKey::parse("-order").to_pocketbase(), "-order");
    }

    #[test]
    fn rejects_injection_in_field_names() {
        let q = ListQuery::new().filter("user\" || 1=1", "x");
        assert!(q.validate().is_err());
        assert!(ListQuery::new().sort("order;drop").validate().is_err());
        assert!(ListQuery::new().filter("created_by", "abc").sort("-created").validate().is_ok());
    }

    #[test]
    fn id_shape_is_checked() {
        assert!(validate_id("abc123").is_ok());
        assert!(validate_id("").is_err());
        assert!(validate_id("a\"b").is_err());
        let id = new_record_id();
        assert_eq!(id.len(), 15);
        assert!(validate_id(&id).is_ok());
    }

    #[test]
    fn filter_matching_is_type_aware() {
        let record = into_record(json!({
            "scenario": "s1",
            "order": 2,
            "is_active": true,
        }))
        .unwrap();

        assert!(ListQuery::new().filter("scenario", "s1").matches(&record));
        assert!(ListQuery::new().filter("order", 2i64).matches(&record));
        assert!(ListQuery::new().filter("is_active", true).matches(&record));
        assert!(!ListQuery::new().filter("is_active", "true").matches(&record));
        assert!(!ListQuery::new().filter("missing", "x").matches(&record));
    }

    #[test]
    fn compare_orders_numbers_numerically() {
        let two = json!(2);
        let ten = json!(10);
        assert_eq!(compare_values(Some(&two), Some(&ten)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&two)), Ordering::Less);
        let a = json!("a");
        let b = json!("b");
        assert_eq!(compare_values(Some(&b), Some(&a)), Ordering::Greater);
    }

    #[test]
    fn conflicts_name_the_unique_field() {
        assert!(matches!(
            Collection::Users.conflict(),
            AppError::Conflict(m) if m == "User with this email already exists"
        ));
        assert!(Collection::Tasks.unique_fields().is_empty());
    }

    #[test]
    fn non_objects_are_not_records() {
        assert!(into_record(json!([1, 2])).is_err());
    }
}
