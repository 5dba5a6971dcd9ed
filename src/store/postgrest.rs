//! Lead store backed by a PostgREST endpoint (`<base>/rest/v1/<table>`).

use super::{Filter, LeadColumns, LeadStore};
use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use crate::core::models::{Lead, LeadId, LeadUpdate};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde_json::{Map, Value};
use url::Url;

/// Talks to the lead table over HTTP using the anon/service key.
#[derive(Clone)]
pub struct PostgrestStore {
    http: Client,
    table_url: Url,
    columns: LeadColumns,
}

impl PostgrestStore {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_columns(config, LeadColumns::from_config(config))
    }

    pub fn with_columns(config: &Config, columns: LeadColumns) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.store_api_key)
            .map_err(|e| AppError::Config(format!("Store API key is not a valid header: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.store_api_key))
            .map_err(|e| AppError::Config(format!("Store API key is not a valid header: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))?;

        let table_url = Url::parse(&format!(
            "{}/rest/v1/{}",
            config.store_url.trim_end_matches('/'),
            config.table
        ))?;
        tracing::debug!(target: "store", "PostgREST table endpoint: {}", table_url);

        Ok(Self {
            http,
            table_url,
            columns,
        })
    }

    /// Query string for a filtered read. Repeated columns are ANDed by PostgREST.
    pub(crate) fn read_params(&self, filters: &[Filter], limit: usize) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(filters.len() + 2);
        params.push(("select".to_string(), self.columns.select_list()));
        params.extend(filters.iter().map(encode_filter));
        params.push(("limit".to_string(), limit.to_string()));
        params
    }
}

/// PostgREST operator syntax for one filter. `*` is the URL-safe `LIKE`
/// wildcard.
pub(crate) fn encode_filter(filter: &Filter) -> (String, String) {
    let value = match filter {
        Filter::Equals { value, .. } => format!("eq.{}", value),
        Filter::NotNull { .. } => "not.is.null".to_string(),
        Filter::NotEmpty { .. } => "neq.".to_string(),
        Filter::StartsWith { prefix, .. } => format!("like.{}*", prefix),
        Filter::NotContains { needle, .. } => format!("not.like.*{}*", needle),
    };
    (filter.column().to_string(), value)
}

#[async_trait]
impl LeadStore for PostgrestStore {
    async fn select(&self, filters: &[Filter], limit: usize) -> Result<Vec<Lead>> {
        let params = self.read_params(filters, limit);
        tracing::trace!(target: "store", "GET {} {:?}", self.table_url, params);

        let response = self
            .http
            .get(self.table_url.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::StoreRead(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::StoreRead(format!("HTTP {}: {}", status, body)));
        }

        let rows: Vec<Map<String, Value>> = response.json().await?;
        tracing::debug!(target: "store", "Read {} row(s) from {}", rows.len(), self.table_url);
        rows.iter().map(|row| self.columns.decode(row)).collect()
    }

    async fn update(&self, id: &LeadId, update: &LeadUpdate) -> Result<()> {
        let body = self.columns.encode_update(update);
        if body.is_empty() {
            tracing::debug!(target: "store", "Nothing to write for lead {}", id);
            return Ok(());
        }

        let response = self
            .http
            .patch(self.table_url.clone())
            .query(&[(self.columns.id.as_str(), format!("eq.{}", id))])
            .header("Prefer", "return=minimal")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::StoreWrite(format!("Request failed for lead {}: {}", id, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::StoreWrite(format!(
                "HTTP {} for lead {}: {}",
                status, id, text
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{test_config, SelectionMode};
    use crate::store::SelectionPolicy;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Vec<&'a str> {
        params
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    #[test]
    fn test_marker_mode_query() {
        let config = test_config();
        let store = PostgrestStore::new(&config).unwrap();
        let policy = SelectionPolicy::from_config(&config);
        let params = store.read_params(&policy.filters(), 10);

        assert_eq!(param(&params, "select"), vec!["id,telefone,wpp_checked"]);
        assert_eq!(param(&params, "wpp_checked"), vec!["eq.false"]);
        assert_eq!(param(&params, "telefone"), vec!["not.is.null", "neq."]);
        assert_eq!(param(&params, "limit"), vec!["10"]);
        assert_eq!(
            store.table_url.as_str(),
            "http://localhost:54321/rest/v1/clientes"
        );
    }

    #[test]
    fn test_pattern_mode_query() {
        let mut config = test_config();
        config.selection_mode = SelectionMode::Pattern;
        let store = PostgrestStore::new(&config).unwrap();
        let policy = SelectionPolicy::from_config(&config);
        let params = store.read_params(&policy.filters(), 1);

        assert_eq!(param(&params, "select"), vec!["id,telefone"]);
        assert_eq!(
            param(&params, "telefone"),
            vec!["like.55*", "not.like.*✅*", "not.like.*❌*"]
        );
        assert_eq!(param(&params, "limit"), vec!["1"]);
    }

    #[test]
    fn test_inspection_query_selects_checked_column_in_pattern_mode() {
        let mut config = test_config();
        config.selection_mode = SelectionMode::Pattern;
        let store = PostgrestStore::with_columns(&config, LeadColumns::for_inspection(&config)).unwrap();
        let filters = [Filter::Equals {
            column: "wpp_checked".to_string(),
            value: true,
        }];
        let params = store.read_params(&filters, 5);

        assert_eq!(param(&params, "select"), vec!["id,telefone,wpp_checked"]);
        assert_eq!(param(&params, "wpp_checked"), vec!["eq.true"]);
    }

    #[test]
    fn test_invalid_key_is_rejected() {
        let mut config = test_config();
        config.store_api_key = "bad\nkey".to_string();
        assert!(matches!(PostgrestStore::new(&config), Err(AppError::Config(_))));
    }
}
