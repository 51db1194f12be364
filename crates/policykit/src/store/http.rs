//! Policy Store over HTTP.

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    CreatePolicyRequest, CreatedPolicy, Policy, PolicyStore, StoreError, UpdatePolicyRequest,
    Wallet,
};
use crate::config::ClientConfig;

const MASTER_PASSWORD_HEADER: &str = "X-Master-Password";

/// Error body returned by the daemon.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WalletList {
    items: Vec<Wallet>,
}

/// [`PolicyStore`] backed by the daemon's REST API.
#[derive(Clone)]
pub struct HttpPolicyStore {
    client: reqwest::Client,
    base_url: String,
    master_password: Option<String>,
}

impl std::fmt::Debug for HttpPolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPolicyStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpPolicyStore {
    /// Create a store client from a config.
    pub fn new(config: &ClientConfig) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            master_password: config.master_password.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.master_password {
            Some(password) => builder.header(MASTER_PASSWORD_HEADER, password),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = builder.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self.send(builder).await?;
        let status = response.status().as_u16();
        response.json().await.map_err(|e| {
            StoreError::new(status, "INVALID_RESPONSE", format!("unexpected response body: {e}"))
        })
    }
}

fn policy_path(id: &str) -> String {
    format!("/v1/policies/{id}")
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::timeout()
    } else {
        StoreError::network(err.to_string())
    }
}

async fn error_from_response(response: Response) -> StoreError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    parse_error_body(status.as_u16(), &text)
}

fn parse_error_body(status: u16, text: &str) -> StoreError {
    let body = serde_json::from_str::<ErrorBody>(text).ok();
    let code = body
        .as_ref()
        .and_then(|b| b.code.clone())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    let message = body
        .and_then(|b| b.message)
        .unwrap_or_else(|| text.trim().to_string());
    StoreError::new(status, code, message)
}

#[async_trait]
impl PolicyStore for HttpPolicyStore {
    async fn list_policies(&self, wallet_id: Option<&str>) -> Result<Vec<Policy>, StoreError> {
        let mut builder = self.request(Method::GET, "/v1/policies");
        if let Some(id) = wallet_id {
            builder = builder.query(&[("walletId", id)]);
        }
        let policies: Vec<Policy> = self.send_json(builder).await?;
        tracing::debug!(count = policies.len(), wallet_id, "listed policies");
        Ok(policies)
    }

    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<CreatedPolicy, StoreError> {
        let builder = self.request(Method::POST, "/v1/policies").json(request);
        let created: CreatedPolicy = self.send_json(builder).await?;
        tracing::info!(id = %created.id, policy_type = %request.policy_type, "created policy");
        Ok(created)
    }

    async fn update_policy(
        &self,
        id: &str,
        request: &UpdatePolicyRequest,
    ) -> Result<Policy, StoreError> {
        let builder = self.request(Method::PUT, &policy_path(id)).json(request);
        let policy = self.send_json(builder).await?;
        tracing::info!(id, "updated policy");
        Ok(policy)
    }

    async fn delete_policy(&self, id: &str) -> Result<(), StoreError> {
        self.send(self.request(Method::DELETE, &policy_path(id)))
            .await?;
        tracing::info!(id, "deleted policy");
        Ok(())
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        let list: WalletList = self.send_json(self.request(Method::GET, "/v1/wallets")).await?;
        Ok(list.items)
    }
}
