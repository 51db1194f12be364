//! Rule payload shapes, one struct per policy type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::PolicyType;

/// Keys a rule object carries that this crate does not model.
///
/// Every payload and list entry keeps them here so an edit or a JSON-mode
/// submit sends them back to the store unchanged.
pub type ExtraFields = serde_json::Map<String, serde_json::Value>;

/// Escalating spending thresholds.
///
/// The raw tiers are integer strings in the chain's smallest unit
/// (lamports/wei). The USD tiers, cumulative limits and per-token limits are
/// optional and omitted from JSON when unset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingLimitRules {
    /// Upper bound for instantly executed transfers.
    pub instant_max: String,
    /// Upper bound for transfers executed with a notification.
    pub notify_max: String,
    /// Upper bound for delayed transfers; anything above needs approval.
    pub delay_max: String,
    /// Delay applied to the delay tier, in seconds.
    pub delay_seconds: i64,
    /// How long an approval request stays open, in seconds.
    pub approval_timeout: i64,
    /// Instant tier expressed in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instant_max_usd: Option<f64>,
    /// Notify tier expressed in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify_max_usd: Option<f64>,
    /// Delay tier expressed in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_max_usd: Option<f64>,
    /// Rolling 24h cumulative limit in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_limit_usd: Option<f64>,
    /// Rolling 30d cumulative limit in USD.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_limit_usd: Option<f64>,
    /// Per-token tiers in human-readable amounts, keyed by token (`native`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_limits: Option<BTreeMap<String, TokenLimit>>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Tier amounts for a single token, e.g. `0.5` SOL.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLimit {
    /// Instant tier amount.
    pub instant_max: String,
    /// Notify tier amount.
    pub notify_max: String,
    /// Delay tier amount.
    pub delay_max: String,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Destination address whitelist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistRules {
    /// Addresses transfers may be sent to.
    pub allowed_addresses: Vec<String>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Hour window within a day, `start` inclusive, `end` exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourRange {
    /// First allowed hour (0-23).
    pub start: u8,
    /// Hour at which the window closes (1-24).
    pub end: u8,
}

/// Weekday and hour restrictions.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRestrictionRules {
    /// Allowed hours; absent means all day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_hours: Option<HourRange>,
    /// Allowed weekdays, 0 = Sunday.
    pub allowed_days: Vec<u8>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Request count per time window.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRules {
    /// Requests allowed per window.
    pub max_requests: i64,
    /// Window length in seconds.
    pub window_seconds: i64,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A token the wallet may transfer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Token mint / contract address.
    pub address: String,
    /// Ticker symbol, display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Unmodelled keys, e.g. a CAIP-19 `assetId`.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Token allowlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedTokensRules {
    /// Allowed tokens.
    pub tokens: Vec<TokenEntry>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A contract the wallet may call.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEntry {
    /// Contract address.
    pub address: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Contract call allowlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractWhitelistRules {
    /// Allowed contracts.
    pub contracts: Vec<ContractEntry>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Allowed function selectors on one contract.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodEntry {
    /// Contract the selectors belong to.
    #[serde(rename = "contractAddress")]
    pub contract_address: String,
    /// 4-byte function selectors, hex encoded.
    pub selectors: Vec<String>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Contract method allowlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodWhitelistRules {
    /// Allowed methods grouped by contract.
    pub methods: Vec<MethodEntry>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A spender token approvals may be granted to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpenderEntry {
    /// Spender address.
    pub address: String,
    /// Optional cap on the approved amount, integer string.
    #[serde(
        default,
        rename = "maxAmount",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_amount: Option<String>,
    /// Unmodelled keys, e.g. a display `name`.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Approval spender allowlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovedSpendersRules {
    /// Allowed spenders.
    pub spenders: Vec<SpenderEntry>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Caps on token approval amounts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveAmountLimitRules {
    /// Largest approvable amount, integer string.
    #[serde(
        default,
        rename = "maxAmount",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_amount: Option<String>,
    /// Reject unlimited (max uint) approvals.
    #[serde(default, rename = "blockUnlimited")]
    pub block_unlimited: bool,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Authorization tier a transaction can be routed to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Executed immediately.
    Instant,
    /// Executed immediately, owner notified.
    Notify,
    /// Executed after a delay.
    #[default]
    Delay,
    /// Held until the owner approves.
    Approval,
}

impl Tier {
    /// Wire tag of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Instant => "INSTANT",
            Tier::Notify => "NOTIFY",
            Tier::Delay => "DELAY",
            Tier::Approval => "APPROVAL",
        }
    }
}

/// Forces token approvals into a fixed tier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveTierOverrideRules {
    /// Tier every approval is routed to.
    pub tier: Tier,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A network the wallet may operate on.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkEntry {
    /// Network id, e.g. `ethereum-sepolia`.
    pub network: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Network allowlist.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedNetworksRules {
    /// Allowed networks.
    pub networks: Vec<NetworkEntry>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Domains x402 payments may be made to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct X402AllowedDomainsRules {
    /// Allowed domains.
    pub domains: Vec<String>,
    /// Unmodelled keys.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A rule payload. The variant always agrees with the policy's [`PolicyType`].
///
/// Serializes as the bare payload object; deserialization goes through
/// [`PolicyRules::from_value`] because the shape is picked by the type tag,
/// which lives next to the payload rather than inside it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PolicyRules {
    /// `SPENDING_LIMIT`
    SpendingLimit(SpendingLimitRules),
    /// `WHITELIST`
    Whitelist(WhitelistRules),
    /// `TIME_RESTRICTION`
    TimeRestriction(TimeRestrictionRules),
    /// `RATE_LIMIT`
    RateLimit(RateLimitRules),
    /// `ALLOWED_TOKENS`
    AllowedTokens(AllowedTokensRules),
    /// `CONTRACT_WHITELIST`
    ContractWhitelist(ContractWhitelistRules),
    /// `METHOD_WHITELIST`
    MethodWhitelist(MethodWhitelistRules),
    /// `APPROVED_SPENDERS`
    ApprovedSpenders(ApprovedSpendersRules),
    /// `APPROVE_AMOUNT_LIMIT`
    ApproveAmountLimit(ApproveAmountLimitRules),
    /// `APPROVE_TIER_OVERRIDE`
    ApproveTierOverride(ApproveTierOverrideRules),
    /// `ALLOWED_NETWORKS`
    AllowedNetworks(AllowedNetworksRules),
    /// `X402_ALLOWED_DOMAINS`
    X402AllowedDomains(X402AllowedDomainsRules),
}

impl PolicyRules {
    /// The policy type this payload belongs to.
    pub fn policy_type(&self) -> PolicyType {
        match self {
            PolicyRules::SpendingLimit(_) => PolicyType::SpendingLimit,
            PolicyRules::Whitelist(_) => PolicyType::Whitelist,
            PolicyRules::TimeRestriction(_) => PolicyType::TimeRestriction,
            PolicyRules::RateLimit(_) => PolicyType::RateLimit,
            PolicyRules::AllowedTokens(_) => PolicyType::AllowedTokens,
            PolicyRules::ContractWhitelist(_) => PolicyType::ContractWhitelist,
            PolicyRules::MethodWhitelist(_) => PolicyType::MethodWhitelist,
            PolicyRules::ApprovedSpenders(_) => PolicyType::ApprovedSpenders,
            PolicyRules::ApproveAmountLimit(_) => PolicyType::ApproveAmountLimit,
            PolicyRules::ApproveTierOverride(_) => PolicyType::ApproveTierOverride,
            PolicyRules::AllowedNetworks(_) => PolicyType::AllowedNetworks,
            PolicyRules::X402AllowedDomains(_) => PolicyType::X402AllowedDomains,
        }
    }

    /// The payload as a JSON object, unmodelled keys included.
    pub fn to_value(&self) -> serde_json::Value {
        // String-keyed structs only; serialization to a value cannot fail.
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Decode a JSON payload into the shape dictated by `policy_type`.
    pub fn from_value(
        policy_type: PolicyType,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        use serde_json::from_value;

        Ok(match policy_type {
            PolicyType::SpendingLimit => PolicyRules::SpendingLimit(from_value(value)?),
            PolicyType::Whitelist => PolicyRules::Whitelist(from_value(value)?),
            PolicyType::TimeRestriction => PolicyRules::TimeRestriction(from_value(value)?),
            PolicyType::RateLimit => PolicyRules::RateLimit(from_value(value)?),
            PolicyType::AllowedTokens => PolicyRules::AllowedTokens(from_value(value)?),
            PolicyType::ContractWhitelist => PolicyRules::ContractWhitelist(from_value(value)?),
            PolicyType::MethodWhitelist => PolicyRules::MethodWhitelist(from_value(value)?),
            PolicyType::ApprovedSpenders => PolicyRules::ApprovedSpenders(from_value(value)?),
            PolicyType::ApproveAmountLimit => PolicyRules::ApproveAmountLimit(from_value(value)?),
            PolicyType::ApproveTierOverride => {
                PolicyRules::ApproveTierOverride(from_value(value)?)
            }
            PolicyType::AllowedNetworks => PolicyRules::AllowedNetworks(from_value(value)?),
            PolicyType::X402AllowedDomains => PolicyRules::X402AllowedDomains(from_value(value)?),
        })
    }
}
