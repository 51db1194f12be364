//! Policy types and their rule payloads.
//!
//! The set of policy types is closed: every type has exactly one payload
//! shape (see [`PolicyRules`]) and one canonical default, which is what a new
//! draft starts from when the type is selected.
//!
//! ## Example
//!
//! ```rust
//! use policykit::rules::PolicyType;
//!
//! let rules = PolicyType::RateLimit.default_rules();
//! assert_eq!(rules.policy_type(), PolicyType::RateLimit);
//! ```

mod variants;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use variants::{
    AllowedNetworksRules, AllowedTokensRules, ApproveAmountLimitRules, ApproveTierOverrideRules,
    ApprovedSpendersRules, ContractEntry, ContractWhitelistRules, ExtraFields, HourRange,
    MethodEntry, MethodWhitelistRules, NetworkEntry, PolicyRules, RateLimitRules, SpenderEntry,
    SpendingLimitRules, Tier, TimeRestrictionRules, TokenEntry, TokenLimit, WhitelistRules,
    X402AllowedDomainsRules,
};

/// The kind of a policy, which fixes the shape of its rules.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyType {
    /// Escalating instant / notify / delay / approval thresholds.
    #[default]
    SpendingLimit,
    /// Destination address allowlist.
    Whitelist,
    /// Allowed weekdays and hours.
    TimeRestriction,
    /// Requests per time window.
    RateLimit,
    /// Token allowlist.
    AllowedTokens,
    /// Contract call allowlist.
    ContractWhitelist,
    /// Contract method allowlist.
    MethodWhitelist,
    /// Approval spender allowlist.
    ApprovedSpenders,
    /// Cap on approval amounts.
    ApproveAmountLimit,
    /// Fixed tier for approvals.
    ApproveTierOverride,
    /// Network allowlist.
    AllowedNetworks,
    /// x402 payment domain allowlist.
    #[serde(rename = "X402_ALLOWED_DOMAINS")]
    X402AllowedDomains,
}

impl PolicyType {
    /// Every policy type, in display order.
    pub const ALL: [PolicyType; 12] = [
        PolicyType::SpendingLimit,
        PolicyType::Whitelist,
        PolicyType::TimeRestriction,
        PolicyType::RateLimit,
        PolicyType::AllowedTokens,
        PolicyType::ContractWhitelist,
        PolicyType::MethodWhitelist,
        PolicyType::ApprovedSpenders,
        PolicyType::ApproveAmountLimit,
        PolicyType::ApproveTierOverride,
        PolicyType::AllowedNetworks,
        PolicyType::X402AllowedDomains,
    ];

    /// Wire tag, e.g. `SPENDING_LIMIT`.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::SpendingLimit => "SPENDING_LIMIT",
            PolicyType::Whitelist => "WHITELIST",
            PolicyType::TimeRestriction => "TIME_RESTRICTION",
            PolicyType::RateLimit => "RATE_LIMIT",
            PolicyType::AllowedTokens => "ALLOWED_TOKENS",
            PolicyType::ContractWhitelist => "CONTRACT_WHITELIST",
            PolicyType::MethodWhitelist => "METHOD_WHITELIST",
            PolicyType::ApprovedSpenders => "APPROVED_SPENDERS",
            PolicyType::ApproveAmountLimit => "APPROVE_AMOUNT_LIMIT",
            PolicyType::ApproveTierOverride => "APPROVE_TIER_OVERRIDE",
            PolicyType::AllowedNetworks => "ALLOWED_NETWORKS",
            PolicyType::X402AllowedDomains => "X402_ALLOWED_DOMAINS",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            PolicyType::SpendingLimit => "Spending Limit",
            PolicyType::Whitelist => "Whitelist",
            PolicyType::TimeRestriction => "Time Restriction",
            PolicyType::RateLimit => "Rate Limit",
            PolicyType::AllowedTokens => "Allowed Tokens",
            PolicyType::ContractWhitelist => "Contract Whitelist",
            PolicyType::MethodWhitelist => "Method Whitelist",
            PolicyType::ApprovedSpenders => "Approved Spenders",
            PolicyType::ApproveAmountLimit => "Approve Amount Limit",
            PolicyType::ApproveTierOverride => "Approve Tier Override",
            PolicyType::AllowedNetworks => "Allowed Networks",
            PolicyType::X402AllowedDomains => "x402 Allowed Domains",
        }
    }

    /// The canonical default rules for this type.
    ///
    /// Every call builds a new value; nothing is shared between callers.
    pub fn default_rules(&self) -> PolicyRules {
        match self {
            PolicyType::SpendingLimit => PolicyRules::SpendingLimit(SpendingLimitRules {
                instant_max: "1000000".to_string(),
                notify_max: "5000000".to_string(),
                delay_max: "10000000".to_string(),
                delay_seconds: 300,
                approval_timeout: 3600,
                ..Default::default()
            }),
            PolicyType::Whitelist => PolicyRules::Whitelist(WhitelistRules::default()),
            PolicyType::TimeRestriction => PolicyRules::TimeRestriction(TimeRestrictionRules {
                allowed_hours: Some(HourRange { start: 0, end: 24 }),
                allowed_days: (0..=6).collect(),
                extra: ExtraFields::new(),
            }),
            PolicyType::RateLimit => PolicyRules::RateLimit(RateLimitRules {
                max_requests: 100,
                window_seconds: 3600,
                extra: ExtraFields::new(),
            }),
            PolicyType::AllowedTokens => PolicyRules::AllowedTokens(AllowedTokensRules::default()),
            PolicyType::ContractWhitelist => {
                PolicyRules::ContractWhitelist(ContractWhitelistRules::default())
            }
            PolicyType::MethodWhitelist => {
                PolicyRules::MethodWhitelist(MethodWhitelistRules::default())
            }
            PolicyType::ApprovedSpenders => {
                PolicyRules::ApprovedSpenders(ApprovedSpendersRules::default())
            }
            PolicyType::ApproveAmountLimit => {
                PolicyRules::ApproveAmountLimit(ApproveAmountLimitRules {
                    max_amount: Some("1000000".to_string()),
                    block_unlimited: true,
                    extra: ExtraFields::new(),
                })
            }
            PolicyType::ApproveTierOverride => {
                PolicyRules::ApproveTierOverride(ApproveTierOverrideRules {
                    tier: Tier::Delay,
                    extra: ExtraFields::new(),
                })
            }
            PolicyType::AllowedNetworks => {
                PolicyRules::AllowedNetworks(AllowedNetworksRules::default())
            }
            PolicyType::X402AllowedDomains => {
                PolicyRules::X402AllowedDomains(X402AllowedDomainsRules::default())
            }
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known policy type.
#[derive(Debug, Clone, Error)]
#[error("unknown policy type: {0}")]
pub struct ParsePolicyTypeError(String);

impl FromStr for PolicyType {
    type Err = ParsePolicyTypeError;

    /// Accepts the wire tag (`SPENDING_LIMIT`) or kebab-case (`spending-limit`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().replace('-', "_").to_ascii_uppercase();
        PolicyType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or_else(|| ParsePolicyTypeError(s.to_string()))
    }
}
