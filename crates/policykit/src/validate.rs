//! Per-type rule validation.
//!
//! [`validate`] is pure and cheap, so it can run on every edit. Errors are
//! keyed by dotted field paths; array entries use their index as a segment,
//! e.g. `methods.1.selectors.0`.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::rules::{
    AllowedNetworksRules, AllowedTokensRules, ApproveAmountLimitRules, ApprovedSpendersRules,
    ContractWhitelistRules, MethodWhitelistRules, PolicyRules, RateLimitRules,
    SpendingLimitRules, TimeRestrictionRules, WhitelistRules, X402AllowedDomainsRules,
};

/// Field path to message. Empty means valid.
pub type FieldErrors = BTreeMap<String, String>;

/// Smallest accepted `delay_seconds` for spending limits.
pub const MIN_DELAY_SECONDS: i64 = 60;

const POSITIVE_INTEGER: &str = "Positive integer required";

#[allow(clippy::expect_used)] // literal pattern
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+$").expect("valid regex"));
#[allow(clippy::expect_used)] // literal pattern
static DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(\.\d+)?$").expect("valid regex"));

/// Validate a rule payload against the predicates of its type.
pub fn validate(rules: &PolicyRules) -> FieldErrors {
    let mut errors = FieldErrors::new();
    match rules {
        PolicyRules::SpendingLimit(r) => spending_limit(r, &mut errors),
        PolicyRules::Whitelist(r) => whitelist(r, &mut errors),
        PolicyRules::TimeRestriction(r) => time_restriction(r, &mut errors),
        PolicyRules::RateLimit(r) => rate_limit(r, &mut errors),
        PolicyRules::AllowedTokens(r) => allowed_tokens(r, &mut errors),
        PolicyRules::ContractWhitelist(r) => contract_whitelist(r, &mut errors),
        PolicyRules::MethodWhitelist(r) => method_whitelist(r, &mut errors),
        PolicyRules::ApprovedSpenders(r) => approved_spenders(r, &mut errors),
        PolicyRules::ApproveAmountLimit(r) => approve_amount_limit(r, &mut errors),
        // Closed enum selection; nothing free-form to check.
        PolicyRules::ApproveTierOverride(_) => {}
        PolicyRules::AllowedNetworks(r) => allowed_networks(r, &mut errors),
        PolicyRules::X402AllowedDomains(r) => x402_allowed_domains(r, &mut errors),
    }
    errors
}

fn is_digits(value: &str) -> bool {
    DIGITS.is_match(value)
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn spending_limit(r: &SpendingLimitRules, errors: &mut FieldErrors) {
    for (field, value) in [
        ("instant_max", &r.instant_max),
        ("notify_max", &r.notify_max),
        ("delay_max", &r.delay_max),
    ] {
        if !is_digits(value) {
            errors.insert(field.to_string(), POSITIVE_INTEGER.to_string());
        }
    }
    if r.delay_seconds < MIN_DELAY_SECONDS {
        errors.insert(
            "delay_seconds".to_string(),
            format!("Minimum {MIN_DELAY_SECONDS} seconds"),
        );
    }

    for (field, value) in [
        ("instant_max_usd", r.instant_max_usd),
        ("notify_max_usd", r.notify_max_usd),
        ("delay_max_usd", r.delay_max_usd),
        ("daily_limit_usd", r.daily_limit_usd),
        ("monthly_limit_usd", r.monthly_limit_usd),
    ] {
        // NaN fails too
        if let Some(v) = value
            && v.partial_cmp(&0.0) != Some(std::cmp::Ordering::Greater)
        {
            errors.insert(field.to_string(), "Positive amount required".to_string());
        }
    }

    if let Some(limits) = &r.token_limits {
        for (token, limit) in limits {
            for (field, value) in [
                ("instant_max", &limit.instant_max),
                ("notify_max", &limit.notify_max),
                ("delay_max", &limit.delay_max),
            ] {
                if !value.is_empty() && !DECIMAL.is_match(value) {
                    errors.insert(
                        format!("token_limits.{token}.{field}"),
                        "Decimal amount required".to_string(),
                    );
                }
            }
        }
    }
}

fn whitelist(r: &WhitelistRules, errors: &mut FieldErrors) {
    if r.allowed_addresses.is_empty() {
        errors.insert(
            "allowed_addresses".to_string(),
            "At least one address required".to_string(),
        );
    }
    for (i, address) in r.allowed_addresses.iter().enumerate() {
        if is_blank(address) {
            errors.insert(
                format!("allowed_addresses.{i}"),
                "Address required".to_string(),
            );
        }
    }
}

fn time_restriction(r: &TimeRestrictionRules, errors: &mut FieldErrors) {
    if r.allowed_days.is_empty() {
        errors.insert(
            "allowed_days".to_string(),
            "At least one day required".to_string(),
        );
    }
    if let Some(hours) = r.allowed_hours
        && hours.start >= hours.end
    {
        errors.insert(
            "allowed_hours".to_string(),
            "Start hour must be before end hour".to_string(),
        );
    }
}

fn rate_limit(r: &RateLimitRules, errors: &mut FieldErrors) {
    if r.max_requests < 1 {
        errors.insert("max_requests".to_string(), POSITIVE_INTEGER.to_string());
    }
    if r.window_seconds < 1 {
        errors.insert("window_seconds".to_string(), POSITIVE_INTEGER.to_string());
    }
}

fn allowed_tokens(r: &AllowedTokensRules, errors: &mut FieldErrors) {
    if r.tokens.is_empty() {
        errors.insert(
            "tokens".to_string(),
            "At least one token required".to_string(),
        );
    }
    for (i, token) in r.tokens.iter().enumerate() {
        if is_blank(&token.address) {
            errors.insert(
                format!("tokens.{i}.address"),
                "Token address is required".to_string(),
            );
        }
    }
}

fn contract_whitelist(r: &ContractWhitelistRules, errors: &mut FieldErrors) {
    if r.contracts.is_empty() {
        errors.insert(
            "contracts".to_string(),
            "At least one contract required".to_string(),
        );
    }
    for (i, contract) in r.contracts.iter().enumerate() {
        if is_blank(&contract.address) {
            errors.insert(
                format!("contracts.{i}.address"),
                "Contract address required".to_string(),
            );
        }
    }
}

fn method_whitelist(r: &MethodWhitelistRules, errors: &mut FieldErrors) {
    if r.methods.is_empty() {
        errors.insert(
            "methods".to_string(),
            "At least one method entry required".to_string(),
        );
    }
    for (i, method) in r.methods.iter().enumerate() {
        if is_blank(&method.contract_address) {
            errors.insert(
                format!("methods.{i}.contractAddress"),
                "Contract address required".to_string(),
            );
        }
        if method.selectors.is_empty() {
            errors.insert(
                format!("methods.{i}.selectors"),
                "At least one selector required".to_string(),
            );
        }
        for (j, selector) in method.selectors.iter().enumerate() {
            if is_blank(selector) {
                errors.insert(
                    format!("methods.{i}.selectors.{j}"),
                    "Selector required".to_string(),
                );
            }
        }
    }
}

fn approved_spenders(r: &ApprovedSpendersRules, errors: &mut FieldErrors) {
    if r.spenders.is_empty() {
        errors.insert(
            "spenders".to_string(),
            "At least one spender required".to_string(),
        );
    }
    for (i, spender) in r.spenders.iter().enumerate() {
        if is_blank(&spender.address) {
            errors.insert(
                format!("spenders.{i}.address"),
                "Spender address required".to_string(),
            );
        }
        if let Some(amount) = &spender.max_amount
            && !is_digits(amount)
        {
            errors.insert(
                format!("spenders.{i}.maxAmount"),
                POSITIVE_INTEGER.to_string(),
            );
        }
    }
}

fn approve_amount_limit(r: &ApproveAmountLimitRules, errors: &mut FieldErrors) {
    if let Some(amount) = &r.max_amount
        && !is_digits(amount)
    {
        errors.insert("maxAmount".to_string(), POSITIVE_INTEGER.to_string());
    }
}

fn allowed_networks(r: &AllowedNetworksRules, errors: &mut FieldErrors) {
    if r.networks.is_empty() {
        errors.insert(
            "networks".to_string(),
            "At least one network required".to_string(),
        );
    }
    for (i, entry) in r.networks.iter().enumerate() {
        if is_blank(&entry.network) {
            errors.insert(
                format!("networks.{i}.network"),
                "Network required".to_string(),
            );
        }
    }
}

fn x402_allowed_domains(r: &X402AllowedDomainsRules, errors: &mut FieldErrors) {
    if r.domains.is_empty() {
        errors.insert(
            "domains".to_string(),
            "At least one domain required".to_string(),
        );
    }
    for (i, domain) in r.domains.iter().enumerate() {
        if is_blank(domain) {
            errors.insert(format!("domains.{i}"), "Domain required".to_string());
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::rules::{
        ContractEntry, HourRange, MethodEntry, NetworkEntry, PolicyType, SpenderEntry,
        TokenEntry, TokenLimit,
    };

    fn spending(edit: impl FnOnce(&mut SpendingLimitRules)) -> PolicyRules {
        let PolicyRules::SpendingLimit(mut r) = PolicyType::SpendingLimit.default_rules() else {
            unreachable!()
        };
        edit(&mut r);
        PolicyRules::SpendingLimit(r)
    }

    #[test]
    fn test_default_validity_split() {
        let valid = [
            PolicyType::SpendingLimit,
            PolicyType::RateLimit,
            PolicyType::TimeRestriction,
            PolicyType::ApproveAmountLimit,
            PolicyType::ApproveTierOverride,
        ];
        for t in PolicyType::ALL {
            let errors = validate(&t.default_rules());
            if valid.contains(&t) {
                assert!(errors.is_empty(), "{t}: {errors:?}");
            } else {
                assert!(!errors.is_empty(), "{t} default should be rejected");
            }
        }
    }

    #[test]
    fn test_spending_limit_empty_threshold() {
        let errors = validate(&spending(|r| r.instant_max = String::new()));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["instant_max"], "Positive integer required");
    }

    #[test]
    fn test_spending_limit_rejects_non_digits() {
        let errors = validate(&spending(|r| {
            r.notify_max = "1.5".to_string();
            r.delay_max = "-3".to_string();
        }));
        assert!(errors.contains_key("notify_max"));
        assert!(errors.contains_key("delay_max"));
        assert!(!errors.contains_key("instant_max"));
    }

    #[test]
    fn test_spending_limit_delay_seconds_minimum() {
        assert!(validate(&spending(|r| r.delay_seconds = 60)).is_empty());
        let errors = validate(&spending(|r| r.delay_seconds = 59));
        assert_eq!(errors["delay_seconds"], "Minimum 60 seconds");
    }

    #[test]
    fn test_spending_limit_ordering_not_enforced() {
        let rules = spending(|r| {
            r.instant_max = "900".to_string();
            r.notify_max = "10".to_string();
            r.delay_max = "1".to_string();
        });
        assert!(validate(&rules).is_empty());
    }

    #[test]
    fn test_spending_limit_optional_amounts() {
        let errors = validate(&spending(|r| {
            r.daily_limit_usd = Some(0.0);
            r.monthly_limit_usd = Some(500.0);
            r.token_limits = Some(BTreeMap::from([(
                "native".to_string(),
                TokenLimit {
                    instant_max: "0.5".to_string(),
                    notify_max: "abc".to_string(),
                    delay_max: String::new(),
                    ..Default::default()
                },
            )]));
        }));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["daily_limit_usd"], "Positive amount required");
        assert_eq!(
            errors["token_limits.native.notify_max"],
            "Decimal amount required"
        );
    }

    #[test]
    fn test_whitelist() {
        let errors = validate(&PolicyRules::Whitelist(WhitelistRules::default()));
        assert_eq!(
            errors,
            FieldErrors::from([(
                "allowed_addresses".to_string(),
                "At least one address required".to_string()
            )])
        );

        let errors = validate(&PolicyRules::Whitelist(WhitelistRules {
            allowed_addresses: vec!["0xabc".to_string(), "  ".to_string()],
            ..Default::default()
        }));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["allowed_addresses.1"], "Address required");
    }

    #[test]
    fn test_rate_limit_requires_positive() {
        let errors = validate(&PolicyRules::RateLimit(RateLimitRules {
            max_requests: 0,
            window_seconds: 1,
            ..Default::default()
        }));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["max_requests"], "Positive integer required");
    }

    #[test]
    fn test_approve_amount_limit_optional_amount() {
        let none = PolicyRules::ApproveAmountLimit(ApproveAmountLimitRules {
            max_amount: None,
            block_unlimited: false,
            ..Default::default()
        });
        assert!(validate(&none).is_empty());

        let bad = PolicyRules::ApproveAmountLimit(ApproveAmountLimitRules {
            max_amount: Some("ten".to_string()),
            block_unlimited: true,
            ..Default::default()
        });
        assert_eq!(validate(&bad)["maxAmount"], "Positive integer required");
    }

    #[test]
    fn test_allowed_tokens_entry_address() {
        let errors = validate(&PolicyRules::AllowedTokens(AllowedTokensRules {
            tokens: vec![TokenEntry {
                address: String::new(),
                symbol: Some("USDC".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }));
        assert_eq!(errors["tokens.0.address"], "Token address is required");
        assert!(!errors.contains_key("tokens"));
    }

    #[test]
    fn test_contract_whitelist_entry_address() {
        let errors = validate(&PolicyRules::ContractWhitelist(ContractWhitelistRules {
            contracts: vec![
                ContractEntry {
                    address: "0x1".to_string(),
                    ..Default::default()
                },
                ContractEntry::default(),
            ],
            ..Default::default()
        }));
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_key("contracts.1.address"));
    }

    #[test]
    fn test_method_whitelist_nested_paths() {
        let errors = validate(&PolicyRules::MethodWhitelist(MethodWhitelistRules {
            methods: vec![
                MethodEntry {
                    contract_address: "0xabc".to_string(),
                    selectors: vec!["0xa9059cbb".to_string(), String::new()],
                    ..Default::default()
                },
                MethodEntry {
                    contract_address: " ".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }));
        assert_eq!(
            errors.keys().cloned().collect::<Vec<_>>(),
            vec![
                "methods.0.selectors.1".to_string(),
                "methods.1.contractAddress".to_string(),
                "methods.1.selectors".to_string(),
            ]
        );
    }

    #[test]
    fn test_approved_spenders() {
        let errors = validate(&PolicyRules::ApprovedSpenders(ApprovedSpendersRules {
            spenders: vec![
                SpenderEntry {
                    address: "0xspender".to_string(),
                    max_amount: Some("100".to_string()),
                    ..Default::default()
                },
                SpenderEntry {
                    address: String::new(),
                    max_amount: Some("1e6".to_string()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }));
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("spenders.1.address"));
        assert_eq!(errors["spenders.1.maxAmount"], "Positive integer required");
    }

    #[test]
    fn test_time_restriction() {
        let ok = PolicyRules::TimeRestriction(TimeRestrictionRules {
            allowed_hours: None,
            allowed_days: vec![1],
            ..Default::default()
        });
        assert!(validate(&ok).is_empty());

        let errors = validate(&PolicyRules::TimeRestriction(TimeRestrictionRules {
            allowed_hours: Some(HourRange { start: 17, end: 9 }),
            ..Default::default()
        }));
        assert!(errors.contains_key("allowed_days"));
        assert!(errors.contains_key("allowed_hours"));

        let errors = validate(&PolicyRules::TimeRestriction(TimeRestrictionRules {
            allowed_hours: Some(HourRange { start: 9, end: 9 }),
            allowed_days: vec![1, 2],
            ..Default::default()
        }));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_allowed_networks_and_domains() {
        let errors = validate(&PolicyRules::AllowedNetworks(AllowedNetworksRules {
            networks: vec![NetworkEntry::default()],
            ..Default::default()
        }));
        assert_eq!(errors["networks.0.network"], "Network required");

        let errors = validate(&PolicyRules::X402AllowedDomains(X402AllowedDomainsRules {
            domains: vec!["api.example.com".to_string(), "".to_string()],
            ..Default::default()
        }));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors["domains.1"], "Domain required");
    }
}
