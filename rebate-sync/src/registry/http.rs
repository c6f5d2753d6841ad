//! HTTP implementation of the registry client.
//!
//! The registry exposes a SharePoint-style list API: items live under
//! `{base}/items`, responses are wrapped in a `d` envelope and paging is done
//! through a `d.__next` link.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use super::{NotifyRequest, RedeemedPage, RegistryClient, RegistryRecord};
use crate::auth::ClientCredentials;
use crate::config::RegistryConfig;
use crate::error::RegistryError;

const ACCEPT_VERBOSE: &str = "application/json;odata=verbose";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    d: T,
}

#[derive(Debug, Deserialize)]
struct CreatedItem {
    #[serde(rename = "ID")]
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ItemList {
    #[serde(default)]
    results: Vec<RegistryRecord>,
    #[serde(rename = "__next")]
    next: Option<String>,
}

/// Registry client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpRegistryClient {
    client: Client,
    items_url: String,
    credentials: ClientCredentials,
}

impl HttpRegistryClient {
    pub fn new(client: Client, config: &RegistryConfig) -> Self {
        let credentials = ClientCredentials::new(
            client.clone(),
            config.auth_url.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );
        Self {
            client,
            items_url: format!("{}/items", config.base_url.trim_end_matches('/')),
            credentials,
        }
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, RegistryError> {
        let token = self.credentials.access_token().await?;
        Ok(request
            .bearer_auth(token)
            .header(header::ACCEPT, ACCEPT_VERBOSE))
    }

    fn query_url(&self, params: &[(&str, String)]) -> Result<Url, RegistryError> {
        Ok(Url::parse_with_params(&self.items_url, params)?)
    }

    async fn fetch_list(&self, url: &str) -> Result<ItemList, RegistryError> {
        let request = self.authorized(self.client.get(url)).await?;
        let response = request.send().await?.error_for_status()?;
        let envelope: Envelope<ItemList> = response.json().await?;
        Ok(envelope.d)
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn notify(&self, request: &NotifyRequest) -> Result<i64, RegistryError> {
        let builder = self
            .authorized(self.client.post(&self.items_url).json(request))
            .await?;
        let response = builder.send().await?.error_for_status()?;
        let envelope: Envelope<CreatedItem> = response.json().await?;

        info!(
            ncda_id = envelope.d.id,
            application_id = ?request.application_id,
            "registry_notify_complete"
        );

        Ok(envelope.d.id)
    }

    async fn get_rebate(
        &self,
        id: i64,
        fields: &[&str],
    ) -> Result<Vec<RegistryRecord>, RegistryError> {
        let url = self.query_url(&[
            ("$select", fields.join(",")),
            ("$filter", format!("ID eq {}", id)),
        ])?;
        let list = self.fetch_list(url.as_str()).await?;

        debug!(ncda_id = id, records = list.results.len(), "registry_rebate_fetched");

        Ok(list.results)
    }

    async fn redeemed_page(
        &self,
        since: &str,
        cursor: Option<&str>,
    ) -> Result<RedeemedPage, RegistryError> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self
                .query_url(&[
                    ("$select", "ID".to_string()),
                    (
                        "$filter",
                        format!("Status eq 'Redeemed' and Modified ge datetime'{}'", since),
                    ),
                ])?
                .to_string(),
        };
        let list = self.fetch_list(&url).await?;

        let ids = list
            .results
            .iter()
            .map(|record| {
                record.get("ID").and_then(Value::as_i64).ok_or_else(|| {
                    RegistryError::Response(format!("redeemed record without ID: {:?}", record))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            since = since,
            page_size = ids.len(),
            has_next = list.next.is_some(),
            "registry_redeemed_page_fetched"
        );

        Ok(RedeemedPage {
            ids,
            next: list.next,
        })
    }

    async fn delete_rebate(&self, id: i64) -> Result<(), RegistryError> {
        let url = format!("{}({})", self.items_url, id);
        let request = self
            .authorized(self.client.delete(url))
            .await?
            .header(header::IF_MATCH, "*");
        request.send().await?.error_for_status()?;

        info!(ncda_id = id, "registry_rebate_deleted");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpRegistryClient {
        HttpRegistryClient::new(
            Client::new(),
            &RegistryConfig {
                base_url: "https://registry.example.com/_api/web/lists/getbytitle('ITVR')/"
                    .to_string(),
                auth_url: "https://auth.example.com/token".to_string(),
                client_id: "id".to_string(),
                client_secret: "secret".to_string(),
            },
        )
    }

    #[test]
    fn test_items_url_strips_trailing_slash() {
        assert_eq!(
            client().items_url,
            "https://registry.example.com/_api/web/lists/getbytitle('ITVR')/items"
        );
    }

    #[test]
    fn test_query_url_encodes_filter() {
        let url = client()
            .query_url(&[("$filter", "ID eq 7".to_string())])
            .unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(pairs, vec![("$filter".to_string(), "ID eq 7".to_string())]);
    }

    #[test]
    fn test_item_list_deserialization() {
        let json = r#"{"d": {"results": [{"ID": 4, "Status": "Redeemed"}], "__next": "https://next"}}"#;
        let envelope: Envelope<ItemList> = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.d.results.len(), 1);
        assert_eq!(envelope.d.next.as_deref(), Some("https://next"));
    }

    #[test]
    fn test_created_item_deserialization() {
        let envelope: Envelope<CreatedItem> =
            serde_json::from_str(r#"{"d": {"ID": 812, "Title": "x"}}"#).unwrap();
        assert_eq!(envelope.d.id, 812);
    }
}
