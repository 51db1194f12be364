//! In-process Policy Store.

use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    CreatePolicyRequest, CreatedPolicy, Policy, PolicyStore, StoreError, UpdatePolicyRequest,
    Wallet,
};

/// A request received by an [`InMemoryPolicyStore`].
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    /// `GET /v1/policies`
    ListPolicies {
        /// Server-side filter sent with the request.
        wallet_id: Option<String>,
    },
    /// `POST /v1/policies`
    CreatePolicy(CreatePolicyRequest),
    /// `PUT /v1/policies/{id}`
    UpdatePolicy {
        /// Target policy.
        id: String,
        /// Request body.
        request: UpdatePolicyRequest,
    },
    /// `DELETE /v1/policies/{id}`
    DeletePolicy {
        /// Target policy.
        id: String,
    },
    /// `GET /v1/wallets`
    ListWallets,
}

#[derive(Debug, Default)]
struct State {
    policies: Vec<Policy>,
    wallets: Vec<Wallet>,
    next_id: u64,
    calls: Vec<StoreCall>,
    fail_next: Option<StoreError>,
}

/// A [`PolicyStore`] that keeps everything in memory.
///
/// Every request is recorded (see [`InMemoryPolicyStore::calls`]) and a
/// failure can be queued for the next request with
/// [`InMemoryPolicyStore::fail_next`]. Useful for tests and dry runs.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    state: RwLock<State>,
}

impl std::fmt::Debug for InMemoryPolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryPolicyStore").finish_non_exhaustive()
    }
}

impl InMemoryPolicyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with wallets.
    pub fn with_wallets(self, wallets: Vec<Wallet>) -> Self {
        let mut state = self.state.into_inner();
        state.wallets = wallets;
        Self {
            state: RwLock::new(state),
        }
    }

    /// Seed the store with policies.
    pub fn with_policies(self, policies: Vec<Policy>) -> Self {
        let mut state = self.state.into_inner();
        state.policies = policies;
        Self {
            state: RwLock::new(state),
        }
    }

    /// Make the next request fail with `error`.
    pub async fn fail_next(&self, error: StoreError) {
        self.state.write().await.fail_next = Some(error);
    }

    /// Requests received so far, oldest first.
    pub async fn calls(&self) -> Vec<StoreCall> {
        self.state.read().await.calls.clone()
    }

    /// Snapshot of the stored policies.
    pub async fn policies(&self) -> Vec<Policy> {
        self.state.read().await.policies.clone()
    }
}

impl State {
    fn record(&mut self, call: StoreCall) -> Result<(), StoreError> {
        self.calls.push(call);
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Policy, StoreError> {
        self.policies
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))
    }
}

fn not_found(id: &str) -> StoreError {
    StoreError::new(404, "POLICY_NOT_FOUND", format!("Policy {id} not found"))
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn list_policies(&self, wallet_id: Option<&str>) -> Result<Vec<Policy>, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::ListPolicies {
            wallet_id: wallet_id.map(str::to_string),
        })?;
        // A wallet query also returns the policies that apply to every wallet.
        Ok(state
            .policies
            .iter()
            .filter(|p| match wallet_id {
                Some(id) => p.is_global() || p.wallet_id.as_deref() == Some(id),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn create_policy(
        &self,
        request: &CreatePolicyRequest,
    ) -> Result<CreatedPolicy, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::CreatePolicy(request.clone()))?;

        state.next_id += 1;
        let id = format!("policy-{}", state.next_id);
        let now = now_secs();
        let policy = Policy {
            id: id.clone(),
            wallet_id: request.wallet_id.clone(),
            network: request.network.clone(),
            policy_type: request.policy_type,
            rules: request.rules.clone(),
            priority: request.priority,
            enabled: request.enabled,
            created_at: now,
            updated_at: now,
        };
        state.policies.push(policy);
        tracing::debug!(%id, "stored policy");
        Ok(CreatedPolicy { id })
    }

    async fn update_policy(
        &self,
        id: &str,
        request: &UpdatePolicyRequest,
    ) -> Result<Policy, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::UpdatePolicy {
            id: id.to_string(),
            request: request.clone(),
        })?;

        let policy = state.find_mut(id)?;
        policy.rules = request.rules.clone();
        policy.priority = request.priority;
        policy.enabled = request.enabled;
        policy.updated_at = now_secs();
        Ok(policy.clone())
    }

    async fn delete_policy(&self, id: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::DeletePolicy { id: id.to_string() })?;

        let before = state.policies.len();
        state.policies.retain(|p| p.id != id);
        if state.policies.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn list_wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        let mut state = self.state.write().await;
        state.record(StoreCall::ListWallets)?;
        Ok(state.wallets.clone())
    }
}
