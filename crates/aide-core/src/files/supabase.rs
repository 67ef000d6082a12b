//! REST row-store backend speaking the Supabase (PostgREST) dialect.

use crate::errors::AgentError;
use crate::files::{FileBackend, FileRecord};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

pub const DEFAULT_TABLE: &str = "project_files";

#[derive(Debug, Clone)]
pub struct SupabaseBackend {
    client: Client,
    base_url: String,
    table: String,
    service_key: String,
}

impl SupabaseBackend {
    pub fn new(base_url: String, service_key: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            table: DEFAULT_TABLE.to_string(),
            service_key,
        }
    }

    pub fn with_table(mut self, table: String) -> Self {
        self.table = table;
        self
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn path_filter(path: &str) -> String {
        format!("eq.{}", urlencoding::encode(path))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn check(response: Response, action: &str) -> Result<Response, AgentError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(AgentError::PersistenceError(format!(
            "{} failed with status {}: {}",
            action, status, body
        )))
    }

    async fn send(request: RequestBuilder, action: &str) -> Result<Response, AgentError> {
        let response = request.send().await.map_err(|e| {
            AgentError::PersistenceError(format!("{} request failed: {}", action, e))
        })?;
        Self::check(response, action).await
    }
}

#[async_trait]
impl FileBackend for SupabaseBackend {
    async fn upsert(&self, record: &FileRecord) -> Result<(), AgentError> {
        let url = format!("{}?on_conflict=file_path", self.table_url());
        log::debug!("Supabase upsert {} into {}", record.path, self.table);

        let request = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record);
        Self::send(request, "upsert").await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AgentError> {
        let url = format!("{}?file_path={}", self.table_url(), Self::path_filter(path));
        log::debug!("Supabase delete {} from {}", path, self.table);

        let request = self.authorize(self.client.delete(&url));
        Self::send(request, "delete").await?;
        Ok(())
    }

    async fn fetch(&self, path: &str) -> Result<Option<FileRecord>, AgentError> {
        let url = format!(
            "{}?file_path={}&select=*",
            self.table_url(),
            Self::path_filter(path)
        );

        let request = self.authorize(self.client.get(&url));
        let response = Self::send(request, "fetch").await?;
        let mut rows: Vec<FileRecord> = response.json().await.map_err(|e| {
            AgentError::PersistenceError(format!("Invalid fetch response for {}: {}", path, e))
        })?;

        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn list(&self) -> Result<Vec<FileRecord>, AgentError> {
        let url = format!("{}?select=*&order=file_path.asc", self.table_url());

        let request = self.authorize(self.client.get(&url));
        let response = Self::send(request, "list").await?;
        response
            .json()
            .await
            .map_err(|e| AgentError::PersistenceError(format!("Invalid list response: {}", e)))
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
