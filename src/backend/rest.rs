use crate::backend::Backend;
use crate::backend::queries::{
    COMPLETIONS, HABITS, LIST_ACTIVE_REMINDERS, LIST_COMPLETIONS, LIST_HABITS, LIST_TASKS,
    PREFER_HEADER, PREFER_MERGE_DUPLICATES, PREFER_REPRESENTATION, REMINDERS, TASKS,
    date_filter, expired_before_filter, id_filter,
};
use crate::config::Config;
use crate::model::{
    CompletionRecord, Habit, HabitPatch, NewHabit, NewReminder, NewTask, Reminder, Task, TaskPatch,
};
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// PostgREST-style datastore reached at `<backend_url>/rest/v1/<collection>`.
#[derive(Debug, Clone)]
pub struct RestBackend {
    client: Client,
    base_url: Url,
}

impl RestBackend {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.resolve_api_key().context(
            "Backend API key is missing. Set `DayTracker config set backend.api_key <KEY>` or `DAYTRACKER_API_KEY`.",
        )?;

        Self::new(
            &config.resolve_backend_url()?,
            &api_key,
            config.backend_timeout_seconds,
        )
    }

    pub fn new(backend_url: &str, api_key: &str, timeout_seconds: u64) -> Result<Self> {
        let base_url = rest_base_url(backend_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).context("Failed to build apikey header")?,
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("Failed to build Authorization header")?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(PREFER_HEADER, HeaderValue::from_static(PREFER_REPRESENTATION));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(3)))
            .default_headers(headers)
            .build()
            .context("Failed to create backend HTTP client")?;

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, collection: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(collection)
            .with_context(|| format!("Failed to build endpoint for {collection}"))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }

    async fn send(&self, request: RequestBuilder, action: &str) -> Result<String> {
        let response = request
            .send()
            .await
            .with_context(|| format!("Backend request failed: {action}"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read backend response body: {action}"))?;

        if !status.is_success() {
            bail!("Backend error {status} during {action}: {body}");
        }

        debug!(action, status = %status, "backend request completed");
        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        collection: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>> {
        let url = self.endpoint(collection, params)?;
        let body = self
            .send(self.client.get(url), &format!("list {collection}"))
            .await?;

        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse {collection} list: {body}"))
    }

    async fn insert<B: Serialize, T: DeserializeOwned>(
        &self,
        collection: &str,
        record: &B,
    ) -> Result<T> {
        let url = self.endpoint(collection, &[])?;
        let body = self
            .send(
                self.client.post(url).json(record),
                &format!("create {collection}"),
            )
            .await?;

        serde_json::from_str::<Vec<T>>(&body)
            .with_context(|| format!("Failed to parse created {collection} record: {body}"))?
            .into_iter()
            .next()
            .with_context(|| format!("Backend returned no created {collection} record"))
    }

    async fn patch<B: Serialize>(&self, collection: &str, id: i64, patch: &B) -> Result<()> {
        let filter = id_filter(id);
        let url = self.endpoint(collection, &[("id", filter.as_str())])?;

        self.send(
            self.client.patch(url).json(patch),
            &format!("update {collection} {id}"),
        )
        .await
        .map(|_| ())
    }

    async fn remove(&self, collection: &str, params: &[(&str, &str)]) -> Result<()> {
        let url = self.endpoint(collection, params)?;

        self.send(self.client.delete(url), &format!("delete {collection}"))
            .await
            .map(|_| ())
    }
}

impl Backend for RestBackend {
    async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.fetch(TASKS, LIST_TASKS).await
    }

    async fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.insert(TASKS, task).await
    }

    async fn update_task(&self, id: i64, patch: &TaskPatch) -> Result<()> {
        self.patch(TASKS, id, patch).await
    }

    async fn delete_task(&self, id: i64) -> Result<()> {
        self.remove(TASKS, &[("id", id_filter(id).as_str())]).await
    }

    async fn delete_tasks_expired_before(&self, now: DateTime<Utc>) -> Result<()> {
        self.remove(TASKS, &[("expires_at", expired_before_filter(now).as_str())])
            .await
    }

    async fn list_habits(&self) -> Result<Vec<Habit>> {
        self.fetch(HABITS, LIST_HABITS).await
    }

    async fn create_habit(&self, habit: &NewHabit) -> Result<Habit> {
        self.insert(HABITS, habit).await
    }

    async fn update_habit(&self, id: i64, patch: &HabitPatch) -> Result<()> {
        self.patch(HABITS, id, patch).await
    }

    async fn delete_habit(&self, id: i64) -> Result<()> {
        self.remove(HABITS, &[("id", id_filter(id).as_str())]).await
    }

    async fn list_reminders(&self) -> Result<Vec<Reminder>> {
        self.fetch(REMINDERS, LIST_ACTIVE_REMINDERS).await
    }

    async fn create_reminder(&self, reminder: &NewReminder) -> Result<Reminder> {
        self.insert(REMINDERS, reminder).await
    }

    async fn delete_reminder(&self, id: i64) -> Result<()> {
        self.remove(REMINDERS, &[("id", id_filter(id).as_str())])
            .await
    }

    async fn list_completions(&self) -> Result<Vec<CompletionRecord>> {
        self.fetch(COMPLETIONS, LIST_COMPLETIONS).await
    }

    async fn upsert_completion(&self, record: &CompletionRecord) -> Result<()> {
        let url = self.endpoint(COMPLETIONS, &[])?;

        self.send(
            self.client
                .post(url)
                .header(PREFER_HEADER, PREFER_MERGE_DUPLICATES)
                .json(record),
            &format!("upsert completion {}", record.date),
        )
        .await
        .map(|_| ())
    }

    async fn delete_completion(&self, date: &str) -> Result<()> {
        self.remove(COMPLETIONS, &[("date", date_filter(date).as_str())])
            .await
    }
}

fn rest_base_url(backend_url: &str) -> Result<Url> {
    let trimmed = backend_url.trim().trim_end_matches('/');
    Url::parse(&format!("{trimmed}/rest/v1/"))
        .with_context(|| format!("Invalid backend URL: {backend_url}"))
}
