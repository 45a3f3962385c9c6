//! PostgREST record API backend (Supabase's `/rest/v1`).

use std::time::Duration;

use async_trait::async_trait;
use bday_core::{NewProfile, PersistedProfile};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde_json::json;

use crate::{validate_table_name, ProfileStore, StoreError};

const SELECT_COLUMNS: &str = "id,profile_data,card_url";
const PROFILE_URL_FILTER: &str = "profile_data->>profileUrl";
const NAME_FILTER: &str = "profile_data->>name";

pub struct RestStore {
    client: Client,
    table_url: Url,
    api_key: String,
}

impl RestStore {
    /// Builds a client for `{base_url}/rest/v1/{table}`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::InvalidTableName`] if `table` is not a plain identifier.
    /// - [`StoreError::InvalidUrl`] if `base_url` does not parse.
    /// - [`StoreError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        api_key: &str,
        table: &str,
        timeout_secs: u64,
    ) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        let raw = format!("{}/rest/v1/{table}", base_url.trim_end_matches('/'));
        let table_url = Url::parse(&raw).map_err(|e| StoreError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            table_url,
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client
            .request(method, self.table_url.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select_where(
        &self,
        filter: Option<(&str, &str)>,
    ) -> Result<Vec<PersistedProfile>, StoreError> {
        let mut query = vec![
            ("select", SELECT_COLUMNS.to_string()),
            ("order", "id.asc".to_string()),
        ];
        if let Some((column, value)) = filter {
            query.push((column, format!("eq.{value}")));
        }
        let response = self.request(Method::GET).query(&query).send().await?;
        let rows = check_status(response)
            .await?
            .json::<Vec<PersistedProfile>>()
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ProfileStore for RestStore {
    async fn select_all(&self) -> Result<Vec<PersistedProfile>, StoreError> {
        self.select_where(None).await
    }

    async fn select_by_profile_url(
        &self,
        profile_url: &str,
    ) -> Result<Vec<PersistedProfile>, StoreError> {
        self.select_where(Some((PROFILE_URL_FILTER, profile_url)))
            .await
    }

    async fn select_by_name(&self, name: &str) -> Result<Vec<PersistedProfile>, StoreError> {
        self.select_where(Some((NAME_FILTER, name))).await
    }

    async fn insert(&self, profile: &NewProfile) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST)
            .header("Prefer", "return=minimal")
            .json(profile)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    async fn update_card_url(&self, id: i64, card_url: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH)
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&json!({ "card_url": card_url }))
            .send()
            .await?;
        let updated = check_status(response)
            .await?
            .json::<Vec<serde_json::Value>>()
            .await?;
        if updated.is_empty() {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::UnexpectedStatus {
        status: status.as_u16(),
        url,
        body,
    })
}
