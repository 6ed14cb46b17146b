// src/store/pocketbase.rs

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use url::Url;

use super::{Collection, FilterValue, ListQuery, Record, RecordStore, validate_id};
use crate::{config::POCKETBASE_PAGE_SIZE, error::AppError, utils::format::truncate};

/// Client for a hosted PocketBase instance's record API.
pub struct PocketBaseStore {
    base_url: Url,
    http_client: reqwest::Client,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListPage {
    page: u32,
    total_pages: u32,
    items: Vec<Record>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: HashMap<String, FieldError>,
}

#[derive(Debug, Deserialize)]
struct FieldError {
    #[serde(default)]
    code: String,
}

impl ErrorBody {
    fn violates_unique(&self) -> bool {
        self.data.values().any(|f| f.code == "validation_not_unique")
    }
}

/// Fills the fields PocketBase requires on auth collections.
///
/// `users` lives in PocketBase's built-in auth collection, which insists on
/// `password`/`passwordConfirm`. Logins are verified against `password_hash`,
/// so the PocketBase password is a random secret nobody knows.
fn with_auth_fields(collection: Collection, mut data: Record) -> Record {
    if collection != Collection::Users || data.contains_key("password") {
        return data;
    }

    let secret = uuid::Uuid::new_v4().simple().to_string();
    data.insert("password".into(), Value::String(secret.clone()));
    data.insert("passwordConfirm".into(), Value::String(secret));
    data.entry("emailVisibility").or_insert(Value::Bool(true));
    data
}

impl PocketBaseStore {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        // Url::join drops the last path segment unless the base ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            AppError::InternalServerError(format!("Invalid POCKETBASE_URL '{}': {}", base_url, e))
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .user_agent("simulex/0.1")
            .build()?;

        Ok(Self {
            base_url,
            http_client,
            token: RwLock::new(None),
        })
    }

    /// Logs in as a superuser; the token is attached to every later request.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<(), AppError> {
        let url = self.join("api/collections/_superusers/auth-with-password")?;
        let response = self
            .http_client
            .post(url)
            .json(&json!({ "identity": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            tracing::error!("PocketBase superuser login failed with {}", status);
            return Err(AppError::InternalServerError(format!(
                "PocketBase authentication failed: HTTP {}",
                status
            )));
        }

        let auth: AuthResponse = response.json().await?;
        *self.token.write().await = Some(auth.token);
        tracing::info!("Authenticated against PocketBase at {}", self.base_url);
        Ok(())
    }

    fn join(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::InternalServerError(e.to_string()))
    }

    fn records_url(&self, collection: Collection, id: Option<&str>) -> Result<Url, AppError> {
        match id {
            Some(id) => self.join(&format!("api/collections/{}/records/{}", collection, id)),
            None => self.join(&format!("api/collections/{}/records", collection)),
        }
    }

    async fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token.read().await.as_deref() {
            Some(token) => request.header(reqwest::header::AUTHORIZATION, token),
            None => request,
        }
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(
        collection: Collection,
        response: Response,
    ) -> Result<T, AppError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<ErrorBody>(&body).unwrap_or_default();

        match status {
            StatusCode::NOT_FOUND => Err(collection.not_found()),
            StatusCode::BAD_REQUEST if error.violates_unique() => Err(collection.conflict()),
            StatusCode::BAD_REQUEST => Err(AppError::BadRequest(if error.message.is_empty() {
                format!("Invalid {} data", collection.label())
            } else {
                error.message
            })),
            _ => {
                tracing::error!(
                    "PocketBase returned {} for {}: {}",
                    status,
                    collection,
                    truncate(&body, 500)
                );
                Err(AppError::InternalServerError(format!(
                    "PocketBase returned {} for {}",
                    status, collection
                )))
            }
        }
    }
}

/// Renders equality filters in PocketBase's filter syntax, e.g. `(a = "x" && b = true)`.
pub fn render_filter(query: &ListQuery) -> Option<String> {
    if query.filters.is_empty() {
        return None;
    }

    let clauses: Vec<String> = query
        .filters
        .iter()
        .map(|f| format!("{} = {}", f.field, render_literal(&f.value)))
        .collect();

    Some(format!("({})", clauses.join(" && ")))
}

fn render_literal(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        FilterValue::Int(i) => i.to_string(),
        FilterValue::Bool(b) => b.to_string(),
    }
}

#[async_trait]
impl RecordStore for PocketBaseStore {
    async fn list(&self, collection: Collection, query: &ListQuery) -> Result<Vec<Record>, AppError> {
        query.validate()?;

        let url = self.records_url(collection, None)?;
        let filter = render_filter(query);
        let sort = query.sort.as_ref().map(|s| s.to_pocketbase());

        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let mut request = self.http_client.get(url.clone()).query(&[
                ("page", page.to_string()),
                ("perPage", POCKETBASE_PAGE_SIZE.to_string()),
            ]);
            if let Some(filter) = &filter {
                request = request.query(&[("filter", filter)]);
            }
            if let Some(sort) = &sort {
                request = request.query(&[("sort", sort)]);
            }

            let response = self.authorized(request).await.send().await?;
            let batch: ListPage = Self::read_json(collection, response).await?;
            items.extend(batch.items);

            if batch.page >= batch.total_pages {
                break;
            }
            page = batch.page + 1;
        }

        Ok(items)
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Record, AppError> {
        validate_id(id)?;
        let url = self.records_url(collection, Some(id))?;
        let response = self.authorized(self.http_client.get(url)).await.send().await?;
        Self::read_json(collection, response).await
    }

    async fn create(&self, collection: Collection, data: Record) -> Result<Record, AppError> {
        let url = self.records_url(collection, None)?;
        let data = with_auth_fields(collection, data);
        let request = self.http_client.post(url).json(&Value::Object(data));
        let response = self.authorized(request).await.send().await?;
        Self::read_json(collection, response).await
    }

    async fn update(&self, collection: Collection, id: &str, mut patch: Record) -> Result<Record, AppError> {
        validate_id(id)?;
        for key in ["id", "created", "updated"] {
            patch.remove(key);
        }

        let url = self.records_url(collection, Some(id))?;
        let request = self.http_client.patch(url).json(&Value::Object(patch));
        let response = self.authorized(request).await.send().await?;
        Self::read_json(collection, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_combined_filters() {
        let q = ListQuery::new()
            .filter("user", "u1")
            .filter("completed", true)
            .filter("order", 3i64);
        assert_eq!(
            render_filter(&q).as_deref(),
            Some(r#"(user = "u1" && completed = true && order = 3)"#)
        );
        assert_eq!(render_filter(&ListQuery::new()), None);
    }

    #[test]
    fn escapes_string_literals() {
        let q = ListQuery::new().filter("title", r#"say "hi" \o/"#);
        assert_eq!(
            render_filter(&q).as_deref(),
            Some(r#"(title = "say \"hi\" \\o/")"#)
        );
    }

    #[test]
    fn users_get_a_throwaway_auth_password() {
        let mut data = Record::new();
        data.insert("email".into(), json!("ada@simulex.test"));

        let user = with_auth_fields(Collection::Users, data.clone());
        assert_eq!(user["password"], user["passwordConfirm"]);
        assert!(user["password"].as_str().unwrap().len() >= 8);
        assert_eq!(user["emailVisibility"], true);

        let scenario = with_auth_fields(Collection::Scenarios, data);
        assert!(!scenario.contains_key("password"));
    }

    #[test]
    fn unique_violations_are_recognized() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"message":"Failed to create record.","data":{"email":{"code":"validation_not_unique","message":"Value must be unique."}}}"#,
        )
        .unwrap();
        assert!(body.violates_unique());

        let body: ErrorBody = serde_json::from_str(r#"{"message":"Failed to create record.","data":{}}"#).unwrap();
        assert!(!body.violates_unique());
    }

    #[test]
    fn base_url_without_slash_keeps_path() {
        let store = PocketBaseStore::new("http://pb.local/sub").unwrap();
        let url = store.records_url(Collection::Tasks, Some("abc")).unwrap();
        assert_eq!(url.as_str(), "http://pb.local/sub/api/collections/tasks/records/abc");
    }
}
