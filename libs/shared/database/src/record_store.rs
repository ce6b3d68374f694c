use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::table_store::TableStore;

/// REST client for the external patient/payment record store. Speaks
/// PostgREST-style JSON: `apikey` header plus an optional bearer token.
pub struct RecordStoreClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_key: String,
}

impl RecordStoreClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.record_store_url.clone(),
            anon_key: config.record_store_anon_key.clone(),
            service_key: config.record_store_service_key.clone(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", HeaderValue::from_str(&self.anon_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making request to {}", url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Record store error ({}): {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => anyhow!("Authentication error: {}", error_text),
                404 => anyhow!("Resource not found: {}", error_text),
                _ => anyhow!("API error ({}): {}", status, error_text),
            });
        }

        let data = response.json::<T>().await?;
        Ok(data)
    }

    /// Insert a row and return the stored representation.
    pub async fn insert(&self, table: &str, row: Value, auth_token: Option<&str>) -> Result<Value> {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self
            .request_with_headers(
                Method::POST,
                &format!("/rest/v1/{}", table),
                auth_token,
                Some(row),
                Some(headers),
            )
            .await?;

        result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Record store returned no row for insert into {}", table))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    fn service_token(&self) -> Option<&str> {
        if self.service_key.is_empty() {
            None
        } else {
            Some(&self.service_key)
        }
    }
}

#[async_trait]
impl TableStore for RecordStoreClient {
    async fn load(&self, table: &str) -> Result<Vec<Value>> {
        debug!("Loading table {}", table);
        self.request(
            Method::GET,
            &format!("/rest/v1/{}?select=*", table),
            self.service_token(),
            None,
        )
        .await
    }

    /// One POST carrying every row; the store applies it as a single
    /// statement, so either all rows land or none do.
    async fn upsert(&self, table: &str, rows: Vec<Value>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );

        let count = rows.len();
        let stored: Vec<Value> = self
            .request_with_headers(
                Method::POST,
                &format!("/rest/v1/{}?on_conflict=id", table),
                self.service_token(),
                Some(Value::Array(rows)),
                Some(headers),
            )
            .await?;

        debug!("Upserted {} of {} rows into {}", stored.len(), count, table);
        Ok(())
    }
}
