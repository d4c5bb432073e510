//! HTTP [`RowStore`] speaking the PostgREST dialect used by hosted table
//! stores: `/rest/v1/<table>` with `apikey` and bearer headers.

use super::remote::{Row, RowStore};
use crate::error::{Result, SiteError};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const HEALTH_CHECK_TABLE: &str = "health_check";

pub struct RestRowStore {
    base_url: Url,
    api_key: String,
    timeout: Duration,
    client: Client,
}

#[derive(Deserialize)]
struct DataColumn {
    data: Value,
}

impl RestRowStore {
    /// Fails with [`SiteError::Config`] when the URL is not http(s) or the key
    /// is blank, and with [`SiteError::Remote`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(SiteError::Config("remote url must not be empty".to_string()));
        }
        if api_key.trim().is_empty() {
            return Err(SiteError::Config("remote api key must not be empty".to_string()));
        }

        // Url::join drops the last path segment unless the base ends with '/'
        let with_slash = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{}/", trimmed)
        };
        let base_url = Url::parse(&with_slash)
            .map_err(|e| SiteError::Config(format!("invalid remote url {}: {}", trimmed, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(SiteError::Config(format!(
                "remote url must be http or https, got {}",
                base_url.scheme()
            )));
        }

        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| SiteError::Remote(e.to_string()))?;

        Ok(Self {
            base_url,
            api_key: api_key.trim().to_string(),
            timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn table_url(&self, table: &str) -> Result<Url> {
        self.base_url
            .join(&format!("rest/v1/{}", table))
            .map_err(|e| SiteError::Config(format!("invalid table name {}: {}", table, e)))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().unwrap_or_default();
        Err(SiteError::Remote(format!("HTTP {}: {}", status, body.trim())))
    }

    fn map_error(&self, e: reqwest::Error) -> SiteError {
        if e.is_timeout() {
            SiteError::Timeout(self.timeout)
        } else {
            SiteError::Remote(e.to_string())
        }
    }
}

impl RowStore for RestRowStore {
    fn upsert(&self, table: &str, row: &Row) -> Result<()> {
        let url = self.table_url(table)?;
        let request = self
            .client
            .post(url)
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[row]);
        self.send(request)?;
        Ok(())
    }

    fn select_latest(&self, table: &str, user_id: &str) -> Result<Option<Value>> {
        let url = self.table_url(table)?;
        let user_filter = format!("eq.{}", user_id);
        let request = self.client.get(url).query(&[
            ("select", "data"),
            ("user_id", user_filter.as_str()),
            ("order", "updated_at.desc"),
            ("limit", "1"),
        ]);
        let rows: Vec<DataColumn> = self
            .send(request)?
            .json()
            .map_err(|e| SiteError::Remote(format!("unexpected response body: {}", e)))?;
        Ok(rows.into_iter().next().map(|r| r.data))
    }

    fn delete(&self, table: &str, user_id: &str) -> Result<()> {
        let url = self.table_url(table)?;
        let user_filter = format!("eq.{}", user_id);
        let request = self
            .client
            .delete(url)
            .query(&[("user_id", user_filter.as_str())]);
        self.send(request)?;
        Ok(())
    }

    fn ping(&self) -> Result<()> {
        let url = self.table_url(HEALTH_CHECK_TABLE)?;
        let request = self.client.get(url).query(&[("select", "*"), ("limit", "1")]);
        self.send(request)?;
        Ok(())
    }
}
