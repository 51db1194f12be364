//! Conversion between structured rules and the raw JSON text an operator edits.

use thiserror::Error;

use crate::rules::{PolicyRules, PolicyType};

/// Errors from parsing rule JSON text.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The text is not JSON at all.
    #[error("invalid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
    /// The JSON is not an object.
    #[error("rules must be a JSON object")]
    NotAnObject,
    /// The object does not fit the payload shape of the policy type.
    #[error("rules do not match {policy_type}: {source}")]
    Shape {
        /// Type the text was parsed for.
        policy_type: PolicyType,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Render rules as pretty-printed JSON (two-space indent).
pub fn to_json_text(rules: &PolicyRules) -> String {
    // Rule payloads only contain string-keyed maps, so this cannot fail.
    serde_json::to_string_pretty(rules).unwrap_or_else(|_| String::from("{}"))
}

/// Render an arbitrary stored payload as pretty-printed JSON.
pub fn value_to_json_text(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Parse JSON text into the rule shape of `policy_type`.
pub fn from_json_text(policy_type: PolicyType, text: &str) -> Result<PolicyRules, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ParseError::Syntax)?;
    from_json_value(policy_type, value)
}

/// Parse JSON text, check it fits `policy_type`, and return the object as
/// written.
///
/// Unlike [`from_json_text`] the result is the operator's object itself, so
/// number formatting and explicit nulls survive into the request body.
pub fn parse_verbatim(
    policy_type: PolicyType,
    text: &str,
) -> Result<serde_json::Value, ParseError> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(ParseError::Syntax)?;
    from_json_value(policy_type, value.clone())?;
    Ok(value)
}

/// Decode an already-parsed JSON value into the rule shape of `policy_type`.
pub fn from_json_value(
    policy_type: PolicyType,
    value: serde_json::Value,
) -> Result<PolicyRules, ParseError> {
    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    PolicyRules::from_value(policy_type, value)
        .map_err(|source| ParseError::Shape { policy_type, source })
}
