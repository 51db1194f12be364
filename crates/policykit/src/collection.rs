//! The filtered list of stored policies.
//!
//! Every fetch is tagged with a generation number. When filter changes race,
//! only the response to the most recent request is kept; older responses are
//! dropped on arrival.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::store::{Policy, PolicyStore, StoreError, Wallet};

/// Which policies the collection shows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum PolicyFilter {
    /// Every policy.
    #[default]
    All,
    /// Policies that apply to one wallet: its own and the global ones.
    ///
    /// Filtered by the store; the response is shown as returned.
    Wallet(String),
    /// Policies with no wallet scope.
    ///
    /// The store has no query for this, so the full list is fetched and
    /// filtered locally.
    GlobalOnly,
}

impl PolicyFilter {
    /// The `walletId` query parameter to send, if any.
    pub fn query_wallet_id(&self) -> Option<&str> {
        match self {
            PolicyFilter::Wallet(id) => Some(id),
            PolicyFilter::All | PolicyFilter::GlobalOnly => None,
        }
    }

    /// Returns true if `policy` belongs in the filtered view.
    pub fn admits(&self, policy: &Policy) -> bool {
        match self {
            PolicyFilter::All | PolicyFilter::Wallet(_) => true,
            PolicyFilter::GlobalOnly => policy.is_global(),
        }
    }
}

/// One entry of the filter selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterOption {
    /// Filter applied when selected.
    pub filter: PolicyFilter,
    /// Display text.
    pub label: String,
}

#[derive(Debug, Default)]
struct CollectionState {
    filter: PolicyFilter,
    generation: u64,
    policies: Vec<Policy>,
    wallets: Vec<Wallet>,
}

impl CollectionState {
    /// Start a fetch, superseding any still in flight.
    fn begin_fetch(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Install a fetched list together with the filter it was fetched for.
    /// Returns false if a newer fetch has started.
    fn finish_fetch(
        &mut self,
        generation: u64,
        filter: PolicyFilter,
        policies: Vec<Policy>,
    ) -> bool {
        if generation != self.generation {
            return false;
        }
        self.policies = policies.into_iter().filter(|p| filter.admits(p)).collect();
        self.filter = filter;
        true
    }
}

/// Filtered view over the Policy Store.
pub struct PolicyCollection<S> {
    store: Arc<S>,
    state: RwLock<CollectionState>,
}

impl<S> std::fmt::Debug for PolicyCollection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyCollection").finish_non_exhaustive()
    }
}

impl<S: PolicyStore> PolicyCollection<S> {
    /// Create an empty collection showing every policy.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: RwLock::new(CollectionState::default()),
        }
    }

    /// Current filter.
    pub async fn filter(&self) -> PolicyFilter {
        self.state.read().await.filter.clone()
    }

    /// Fetch the list for `filter` and switch to it.
    ///
    /// The filter only changes once its list has arrived; on failure both
    /// the filter and the list stay as they were.
    pub async fn set_filter(&self, filter: PolicyFilter) -> Result<(), StoreError> {
        self.fetch(filter).await
    }

    /// Refetch the list for the current filter.
    pub async fn refresh(&self) -> Result<(), StoreError> {
        let filter = self.filter().await;
        self.fetch(filter).await
    }

    async fn fetch(&self, filter: PolicyFilter) -> Result<(), StoreError> {
        let generation = self.state.write().await.begin_fetch();
        let policies = self.store.list_policies(filter.query_wallet_id()).await?;

        let mut state = self.state.write().await;
        if state.finish_fetch(generation, filter, policies) {
            tracing::debug!(generation, filter = ?state.filter, "policy list updated");
        } else {
            tracing::debug!(generation, "dropping stale policy list");
        }
        Ok(())
    }

    /// Policies currently shown.
    pub async fn policies(&self) -> Vec<Policy> {
        self.state.read().await.policies.clone()
    }

    /// Fetch the wallet list used for labels and filter options.
    pub async fn load_wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        let wallets = self.store.list_wallets().await?;
        self.state.write().await.wallets = wallets.clone();
        Ok(wallets)
    }

    /// Display label for a policy's wallet scope.
    ///
    /// `Global` for unscoped policies, the wallet name when known, otherwise
    /// a shortened id.
    pub async fn wallet_label(&self, wallet_id: Option<&str>) -> String {
        let Some(id) = wallet_id else {
            return "Global".to_string();
        };
        let state = self.state.read().await;
        match state.wallets.iter().find(|w| w.id == id) {
            Some(wallet) => wallet.name.clone(),
            None => {
                let head: String = id.chars().take(8).collect();
                format!("{head}...")
            }
        }
    }

    /// Entries for the filter selector: all, global, then one per wallet.
    pub async fn filter_options(&self) -> Vec<FilterOption> {
        let state = self.state.read().await;
        let mut options = vec![
            FilterOption {
                filter: PolicyFilter::All,
                label: "All Policies".to_string(),
            },
            FilterOption {
                filter: PolicyFilter::GlobalOnly,
                label: "Global Only".to_string(),
            },
        ];
        options.extend(state.wallets.iter().map(|w| FilterOption {
            filter: PolicyFilter::Wallet(w.id.clone()),
            label: format!("{} ({}/{})", w.name, w.chain, w.network),
        }));
        options
    }

    /// Delete a policy, then refetch.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete_policy(id).await?;
        tracing::info!(id, "policy deleted");
        self.refresh().await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rules::PolicyType;
    use crate::store::{InMemoryPolicyStore, StoreCall};

    fn policy(id: &str, wallet_id: Option<&str>) -> Policy {
        Policy {
            id: id.to_string(),
            wallet_id: wallet_id.map(str::to_string),
            network: None,
            policy_type: PolicyType::RateLimit,
            rules: serde_json::json!({"max_requests": 1, "window_seconds": 60}),
            priority: 0,
            enabled: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    fn wallet(id: &str, name: &str) -> Wallet {
        Wallet {
            id: id.to_string(),
            name: name.to_string(),
            chain: "solana".to_string(),
            network: "devnet".to_string(),
        }
    }

    fn seeded() -> Arc<InMemoryPolicyStore> {
        Arc::new(
            InMemoryPolicyStore::new()
                .with_policies(vec![
                    policy("p-1", None),
                    policy("p-2", Some("w-1")),
                    policy("p-3", Some("w-2")),
                ])
                .with_wallets(vec![wallet("w-1", "trader"), wallet("w-2", "treasury")]),
        )
    }

    fn ids(policies: &[Policy]) -> Vec<&str> {
        policies.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_filters() {
        let store = seeded();
        let collection = PolicyCollection::new(store.clone());

        collection.refresh().await.unwrap();
        assert_eq!(ids(&collection.policies().await), ["p-1", "p-2", "p-3"]);

        collection
            .set_filter(PolicyFilter::Wallet("w-1".to_string()))
            .await
            .unwrap();
        assert_eq!(ids(&collection.policies().await), ["p-1", "p-2"]);

        collection.set_filter(PolicyFilter::GlobalOnly).await.unwrap();
        assert_eq!(ids(&collection.policies().await), ["p-1"]);

        assert_eq!(
            store.calls().await,
            vec![
                StoreCall::ListPolicies { wallet_id: None },
                StoreCall::ListPolicies {
                    wallet_id: Some("w-1".to_string())
                },
                StoreCall::ListPolicies { wallet_id: None },
            ]
        );
    }

    #[test]
    fn test_stale_fetch_dropped() {
        let mut state = CollectionState::default();
        let first = state.begin_fetch();
        let second = state.begin_fetch();

        assert!(state.finish_fetch(
            second,
            PolicyFilter::GlobalOnly,
            vec![policy("p-1", None), policy("p-2", Some("w-1"))]
        ));
        assert!(!state.finish_fetch(
            first,
            PolicyFilter::All,
            vec![policy("p-1", None), policy("p-2", Some("w-1"))]
        ));
        assert_eq!(ids(&state.policies), ["p-1"]);
        assert_eq!(state.filter, PolicyFilter::GlobalOnly);
    }

    #[test]
    fn test_wallet_filter_shows_store_response() {
        let filter = PolicyFilter::Wallet("w-1".to_string());
        assert!(filter.admits(&policy("g", None)));
        assert!(filter.admits(&policy("w1p", Some("w-1"))));
        assert!(!PolicyFilter::GlobalOnly.admits(&policy("w1p", Some("w-1"))));
    }

    #[tokio::test]
    async fn test_wallet_labels_and_options() {
        let collection = PolicyCollection::new(seeded());
        collection.load_wallets().await.unwrap();

        assert_eq!(collection.wallet_label(None).await, "Global");
        assert_eq!(collection.wallet_label(Some("w-1")).await, "trader");
        assert_eq!(
            collection
                .wallet_label(Some("0194f2c8-7d1e-7000-8000-000000000000"))
                .await,
            "0194f2c8..."
        );

        let labels: Vec<String> = collection
            .filter_options()
            .await
            .into_iter()
            .map(|o| o.label)
            .collect();
        assert_eq!(
            labels,
            [
                "All Policies",
                "Global Only",
                "trader (solana/devnet)",
                "treasury (solana/devnet)"
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_refetches() {
        let store = seeded();
        let collection = PolicyCollection::new(store.clone());
        collection.refresh().await.unwrap();

        collection.delete("p-2").await.unwrap();
        assert_eq!(ids(&collection.policies().await), ["p-1", "p-3"]);
        assert!(matches!(
            store.calls().await.last(),
            Some(StoreCall::ListPolicies { wallet_id: None })
        ));

        let err = collection.delete("p-2").await.unwrap_err();
        assert_eq!(err.code, "POLICY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_list() {
        let store = seeded();
        let collection = PolicyCollection::new(store.clone());
        collection.refresh().await.unwrap();

        collection
            .set_filter(PolicyFilter::Wallet("w-2".to_string()))
            .await
            .unwrap();
        assert_eq!(ids(&collection.policies().await), ["p-1", "p-3"]);

        store.fail_next(StoreError::network("connection refused")).await;
        assert!(collection.set_filter(PolicyFilter::GlobalOnly).await.is_err());
        assert_eq!(
            collection.filter().await,
            PolicyFilter::Wallet("w-2".to_string())
        );
        assert_eq!(ids(&collection.policies().await), ["p-1", "p-3"]);

        collection.refresh().await.unwrap();
        assert!(matches!(
            store.calls().await.last(),
            Some(StoreCall::ListPolicies { wallet_id: Some(id) }) if id == "w-2"
        ));
    }
}
