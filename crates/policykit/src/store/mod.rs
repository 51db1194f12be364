//! Access to the Policy Store.
//!
//! The store owns every persisted policy; this crate only reads lists and
//! sends create / update / delete requests. [`PolicyStore`] is the seam:
//! [`HttpPolicyStore`] talks to a running daemon, [`InMemoryPolicyStore`]
//! keeps everything in-process.
//!
//! ```text
//! GET    /v1/policies[?walletId=<id>]   -> Policy[] (wallet's own + global)
//! POST   /v1/policies                   -> {id}
//! PUT    /v1/policies/{id}              -> Policy
//! DELETE /v1/policies/{id}
//! GET    /v1/wallets                    -> {items: Wallet[]}
//! ```

mod http;
mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, ParseError};
use crate::rules::{PolicyRules, PolicyType};

pub use http::HttpPolicyStore;
pub use memory::{InMemoryPolicyStore, StoreCall};

/// A policy as stored by the Policy Store.
///
/// `rules` is kept as raw JSON: the store does not guarantee it matches
/// `policy_type`. Use [`Policy::typed_rules`] to decode it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Server-assigned id.
    pub id: String,
    /// Wallet the policy is scoped to; `None` means every wallet.
    #[serde(default)]
    pub wallet_id: Option<String>,
    /// Network the policy is scoped to; `None` means every network.
    #[serde(default)]
    pub network: Option<String>,
    /// Policy type.
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    /// Rule payload as stored.
    #[serde(default)]
    pub rules: serde_json::Value,
    /// Tie-break among overlapping policies.
    #[serde(default)]
    pub priority: i64,
    /// Disabled policies are stored but inert.
    #[serde(default)]
    pub enabled: bool,
    /// Creation time, seconds since the epoch.
    #[serde(default)]
    pub created_at: i64,
    /// Last update time, seconds since the epoch.
    #[serde(default)]
    pub updated_at: i64,
}

impl Policy {
    /// Returns true if the policy applies to every wallet.
    pub fn is_global(&self) -> bool {
        self.wallet_id.is_none()
    }

    /// Decode the stored rules into the shape of the policy's type.
    pub fn typed_rules(&self) -> Result<PolicyRules, ParseError> {
        codec::from_json_value(self.policy_type, self.rules.clone())
    }
}

/// A wallet, as far as policy authoring cares.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Wallet id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Chain family, e.g. `solana`.
    #[serde(default)]
    pub chain: String,
    /// Default network.
    #[serde(default)]
    pub network: String,
}

/// Body of `POST /v1/policies`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyRequest {
    /// Wallet scope; omitted for global policies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,
    /// Network scope; omitted for all networks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Policy type.
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    /// Rule payload, exactly as it goes on the wire.
    pub rules: serde_json::Value,
    /// Priority.
    pub priority: i64,
    /// Enabled flag.
    pub enabled: bool,
}

/// Body of `PUT /v1/policies/{id}`. Type and scope are fixed after creation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdatePolicyRequest {
    /// Rule payload, exactly as it goes on the wire.
    pub rules: serde_json::Value,
    /// Priority.
    pub priority: i64,
    /// Enabled flag.
    pub enabled: bool,
}

/// Response of `POST /v1/policies`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPolicy {
    /// Id assigned to the new policy.
    pub id: String,
}

/// A request the Policy Store rejected, or that never reached it.
///
/// Client-side failures use status 0 with code `NETWORK_ERROR` or `TIMEOUT`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("[{status}] {code}: {message}")]
pub struct StoreError {
    /// HTTP status, 0 when no response was received.
    pub status: u16,
    /// Machine-readable error code.
    pub code: String,
    /// Server-provided message.
    pub message: String,
}

impl StoreError {
    /// Create a store error.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// The store could not be reached.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(0, "NETWORK_ERROR", message)
    }

    /// The store did not answer in time.
    pub fn timeout() -> Self {
        Self::new(0, "TIMEOUT", "request timed out")
    }

    /// Operator-facing text for this error.
    pub fn user_message(&self) -> String {
        crate::messages::error_message(&self.code)
    }
}

/// The Policy Store as seen by the authoring layer.
///
/// Implementations must be thread-safe for use across async tasks.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// List policies.
    ///
    /// With `wallet_id` the store returns the policies that apply to that
    /// wallet: its own plus the global ones.
    async fn list_policies(&self, wallet_id: Option<&str>) -> Result<Vec<Policy>, StoreError>;

    /// Create a policy.
    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<CreatedPolicy, StoreError>;

    /// Replace the rules, priority and enabled flag of a policy.
    async fn update_policy(
        &self,
        id: &str,
        request: &UpdatePolicyRequest,
    ) -> Result<Policy, StoreError>;

    /// Delete a policy.
    async fn delete_policy(&self, id: &str) -> Result<(), StoreError>;

    /// List wallets.
    async fn list_wallets(&self) -> Result<Vec<Wallet>, StoreError>;
}

#[async_trait]
impl<S: PolicyStore + ?Sized> PolicyStore for std::sync::Arc<S> {
    async fn list_policies(&self, wallet_id: Option<&str>) -> Result<Vec<Policy>, StoreError> {
        (**self).list_policies(wallet_id).await
    }

    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<CreatedPolicy, StoreError> {
        (**self).create_policy(request).await
    }

    async fn update_policy(
        &self,
        id: &str,
        request: &UpdatePolicyRequest,
    ) -> Result<Policy, StoreError> {
        (**self).update_policy(id, request).await
    }

    async fn delete_policy(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete_policy(id).await
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        (**self).list_wallets().await
    }
}
