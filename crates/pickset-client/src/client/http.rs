use super::{
    error::{ClientError, Result},
    transport::Transport,
};
use core::time::Duration;
use pickset_core::{
    AddItems, AddOutcome, ErrorBody, Page, PageQuery, Scope, Selection, SelectionUpdate,
};
use serde::de::DeserializeOwned;

/// JSON-over-HTTP transport against a running `pickset-server`.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(base_url.to_owned()));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Decodes a success body, or turns an error response into
/// [`ClientError::Status`] carrying the server's message.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.error,
        Err(_) => status.canonical_reason().unwrap_or("unknown error").to_owned(),
    };
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

impl Transport for HttpTransport {
    async fn fetch_page(&self, scope: Scope, query: PageQuery) -> Result<Page> {
        let response = self
            .http
            .get(self.url("/api/items"))
            .query(&[("scope", scope.as_str())])
            .query(&query)
            .send()
            .await?;
        decode(response).await
    }

    async fn add_items(&self, ids: Vec<String>) -> Result<AddOutcome> {
        let response = self
            .http
            .post(self.url("/api/items"))
            .json(&AddItems { ids })
            .send()
            .await?;
        decode(response).await
    }

    async fn full_selection(&self) -> Result<Page> {
        let response = self.http.get(self.url("/api/selection")).send().await?;
        decode(response).await
    }

    async fn save_selection(&self, ids: Vec<u64>) -> Result<Selection> {
        let response = self
            .http
            .put(self.url("/api/selection"))
            .json(&SelectionUpdate { ids })
            .send()
            .await?;
        decode(response).await
    }
}
