//! One-line summaries of rule payloads for policy listings.

use crate::rules::{HourRange, PolicyRules, SpendingLimitRules};
use crate::store::Policy;

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MAX_LISTED: usize = 3;
const RAW_PREVIEW_CHARS: usize = 60;

/// Summarize a rule payload in one line.
pub fn summarize(rules: &PolicyRules) -> String {
    match rules {
        PolicyRules::SpendingLimit(r) => spending_limit(r),
        PolicyRules::Whitelist(r) => format!("{} addresses", r.allowed_addresses.len()),
        PolicyRules::TimeRestriction(r) => {
            let days = format_days(&r.allowed_days);
            let hours = r.allowed_hours.as_ref().map(format_hours).unwrap_or_default();
            format!("{days} {hours}").trim().to_string()
        }
        PolicyRules::RateLimit(r) => {
            format!("{} req / {}", r.max_requests, human_window(r.window_seconds))
        }
        PolicyRules::AllowedTokens(r) => {
            if r.tokens.is_empty() {
                return "No tokens".to_string();
            }
            r.tokens
                .iter()
                .map(|t| match &t.symbol {
                    Some(symbol) if !symbol.is_empty() => symbol.clone(),
                    _ => short_address(&t.address),
                })
                .collect::<Vec<_>>()
                .join(", ")
        }
        PolicyRules::ContractWhitelist(r) => listed(
            r.contracts.iter().map(|c| match &c.name {
                Some(name) if !name.is_empty() => name.clone(),
                _ => short_address(&c.address),
            }),
            "No contracts",
        ),
        PolicyRules::MethodWhitelist(r) => {
            let selectors: usize = r.methods.iter().map(|m| m.selectors.len()).sum();
            format!("{} contracts, {selectors} methods", r.methods.len())
        }
        PolicyRules::ApprovedSpenders(r) => format!("{} spenders", r.spenders.len()),
        PolicyRules::ApproveAmountLimit(r) => {
            let max = r.max_amount.as_deref().filter(|m| !m.is_empty());
            match (max, r.block_unlimited) {
                (Some(max), true) => format!("Max: {} + Block unlimited", group_digits(max)),
                (Some(max), false) => format!("Max: {}", group_digits(max)),
                (None, true) => "Block unlimited only".to_string(),
                (None, false) => "No limits".to_string(),
            }
        }
        PolicyRules::ApproveTierOverride(r) => r.tier.as_str().to_string(),
        PolicyRules::AllowedNetworks(r) => {
            listed(r.networks.iter().map(|n| n.network.clone()), "No networks")
        }
        PolicyRules::X402AllowedDomains(r) => listed(r.domains.iter().cloned(), "No domains"),
    }
}

/// Summarize a stored policy.
///
/// Rules that do not fit the policy's type are shown as truncated raw JSON.
pub fn summarize_policy(policy: &Policy) -> String {
    match policy.typed_rules() {
        Ok(rules) => summarize(&rules),
        Err(_) => {
            let raw = policy.rules.to_string();
            if raw.chars().count() > RAW_PREVIEW_CHARS {
                let head: String = raw.chars().take(RAW_PREVIEW_CHARS).collect();
                format!("{head}...")
            } else {
                raw
            }
        }
    }
}

fn spending_limit(r: &SpendingLimitRules) -> String {
    let mut out = format!(
        "Instant {} / Notify {} / Delay {} / Approval",
        group_digits(&r.instant_max),
        group_digits(&r.notify_max),
        group_digits(&r.delay_max),
    );
    if let Some(daily) = r.daily_limit_usd
        && daily > 0.0
    {
        out.push_str(&format!(" · Daily ${}", format_usd(daily)));
    }
    if let Some(monthly) = r.monthly_limit_usd
        && monthly > 0.0
    {
        out.push_str(&format!(" · Monthly ${}", format_usd(monthly)));
    }
    out
}

fn listed(items: impl ExactSizeIterator<Item = String>, empty: &str) -> String {
    let total = items.len();
    if total == 0 {
        return empty.to_string();
    }
    let mut shown: Vec<String> = items.take(MAX_LISTED).collect();
    if total > MAX_LISTED {
        shown.push(format!("+{} more", total - MAX_LISTED));
    }
    shown.join(", ")
}

fn short_address(address: &str) -> String {
    if address.is_empty() {
        return "?".to_string();
    }
    let head: String = address.chars().take(8).collect();
    format!("{head}...")
}

/// Insert thousands separators into a non-negative integer string.
/// Anything else is returned unchanged.
fn group_digits(value: &str) -> String {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return value.to_string();
    }
    let trimmed = value.trim_start_matches('0');
    let digits = if trimmed.is_empty() { "0" } else { trimmed };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// At most two decimals, trailing zeros dropped.
fn format_usd(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let (whole, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac.trim_end_matches('0');
    let whole = group_digits(whole);
    if frac.is_empty() {
        whole
    } else {
        format!("{whole}.{frac}")
    }
}

fn human_window(seconds: i64) -> String {
    const DAY: i64 = 86_400;
    const HOUR: i64 = 3_600;
    const MINUTE: i64 = 60;

    if seconds > 0 && seconds % DAY == 0 {
        format!("{}d", seconds / DAY)
    } else if seconds > 0 && seconds % HOUR == 0 {
        format!("{}h", seconds / HOUR)
    } else if seconds > 0 && seconds % MINUTE == 0 {
        format!("{}m", seconds / MINUTE)
    } else {
        format!("{seconds}s")
    }
}

fn day_name(day: u8) -> String {
    DAY_NAMES
        .get(usize::from(day))
        .map(|d| d.to_string())
        .unwrap_or_else(|| day.to_string())
}

fn format_days(days: &[u8]) -> String {
    let mut sorted = days.to_vec();
    sorted.sort_unstable();

    let consecutive = sorted.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]));
    if consecutive
        && sorted.len() > 2
        && let (Some(first), Some(last)) = (sorted.first(), sorted.last())
    {
        return format!("{}-{}", day_name(*first), day_name(*last));
    }
    sorted
        .into_iter()
        .map(day_name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_hours(hours: &HourRange) -> String {
    format!("{:02}:00-{:02}:00", hours.start, hours.end)
}
