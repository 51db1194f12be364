//! The editable, not-yet-persisted state of a policy.
//!
//! [`PolicyDraft`] is a plain value: every operation consumes the draft and
//! returns the next one, so the UI layer decides where drafts live. Network
//! calls are not made here; [`PolicyDraft::check_submit`] only gates a
//! submission and builds the request body.
//!
//! The rule payload is held in exactly one of two forms (see [`RuleForm`]).
//! Switching from JSON back to structured either succeeds completely or
//! leaves the draft as it was, with a draft-level error set.

use crate::codec::{self, ParseError};
use crate::rules::{PolicyRules, PolicyType};
use crate::store::{CreatePolicyRequest, Policy, UpdatePolicyRequest};
use crate::validate::{FieldErrors, validate};

/// Shown when a type change is attempted on an edit draft.
pub const TYPE_LOCKED: &str = "Policy type cannot be changed after creation";
/// Shown when a scope change is attempted on an edit draft.
pub const SCOPE_LOCKED: &str = "Wallet and network cannot be changed after creation";
/// Shown when JSON-mode text is not valid JSON on submit.
pub const INVALID_JSON: &str = "Invalid JSON in rules field";

/// Whether a draft creates a new policy or edits an existing one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DraftKind {
    /// A policy that does not exist yet.
    Create,
    /// An existing policy.
    Edit {
        /// Id of the policy being edited.
        policy_id: String,
    },
}

/// The representation a draft's rules are currently edited in.
#[derive(Clone, Debug, PartialEq)]
pub enum RuleForm {
    /// Typed fields, checked by the validator on submit.
    Structured(PolicyRules),
    /// Raw JSON text, parsed on submit.
    Json(String),
}

/// A request ready to send to the Policy Store.
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    /// `POST /v1/policies`
    Create(CreatePolicyRequest),
    /// `PUT /v1/policies/{id}`
    Update {
        /// Target policy.
        id: String,
        /// Request body.
        request: UpdatePolicyRequest,
    },
}

/// Editable state of one policy.
#[derive(Clone, Debug, PartialEq)]
pub struct PolicyDraft {
    kind: DraftKind,
    policy_type: PolicyType,
    form: RuleForm,
    priority: i64,
    enabled: bool,
    network: Option<String>,
    wallet_id: Option<String>,
    field_errors: FieldErrors,
    error: Option<String>,
}

impl PolicyDraft {
    /// A fresh create draft: spending limit defaults, enabled, priority 0, global.
    pub fn new_create() -> Self {
        let policy_type = PolicyType::default();
        Self {
            kind: DraftKind::Create,
            policy_type,
            form: RuleForm::Structured(policy_type.default_rules()),
            priority: 0,
            enabled: true,
            network: None,
            wallet_id: None,
            field_errors: FieldErrors::new(),
            error: None,
        }
    }

    /// An edit draft seeded from a stored policy.
    ///
    /// Rules that do not fit the policy's type open in JSON mode so they can
    /// be repaired by hand.
    pub fn from_policy(policy: &Policy) -> Self {
        let form = match policy.typed_rules() {
            Ok(rules) => RuleForm::Structured(rules),
            Err(err) => {
                tracing::warn!(
                    id = %policy.id,
                    error = %err,
                    "stored rules do not fit type, opening as JSON"
                );
                RuleForm::Json(codec::value_to_json_text(&policy.rules))
            }
        };
        Self {
            kind: DraftKind::Edit {
                policy_id: policy.id.clone(),
            },
            policy_type: policy.policy_type,
            form,
            priority: policy.priority,
            enabled: policy.enabled,
            network: policy.network.clone(),
            wallet_id: policy.wallet_id.clone(),
            field_errors: FieldErrors::new(),
            error: None,
        }
    }

    /// Switch to another policy type.
    ///
    /// Installs fresh defaults for `policy_type`, clears field errors and
    /// returns to structured mode; JSON text typed for the previous type is
    /// discarded. Edit drafts keep their type and get a draft-level error.
    pub fn select_type(mut self, policy_type: PolicyType) -> Self {
        if self.is_edit() {
            tracing::warn!(requested = %policy_type, "type change rejected on edit draft");
            self.error = Some(TYPE_LOCKED.to_string());
            return self;
        }
        self.policy_type = policy_type;
        self.form = RuleForm::Structured(policy_type.default_rules());
        self.field_errors.clear();
        self.error = None;
        self
    }

    /// Apply an edit to the structured rules.
    ///
    /// Once a submit has produced field errors, every edit re-validates so
    /// fixed fields clear as the operator types. Ignored in JSON mode.
    pub fn edit_rules(mut self, edit: impl FnOnce(&mut PolicyRules)) -> Self {
        if let RuleForm::Structured(rules) = &mut self.form {
            edit(rules);
            if !self.field_errors.is_empty() {
                self.field_errors = validate(rules);
            }
        }
        self
    }

    /// Replace the JSON text. Ignored in structured mode.
    pub fn set_json_text(mut self, text: impl Into<String>) -> Self {
        if let RuleForm::Json(current) = &mut self.form {
            *current = text.into();
        }
        self
    }

    /// Switch between structured and JSON mode.
    ///
    /// Structured to JSON always succeeds. JSON to structured parses the
    /// text; on failure the draft stays in JSON mode with its text untouched
    /// and the parse error as the draft-level error.
    pub fn toggle_mode(mut self) -> Self {
        match self.form {
            RuleForm::Structured(rules) => {
                self.form = RuleForm::Json(codec::to_json_text(&rules));
                self.error = None;
            }
            RuleForm::Json(text) => match codec::from_json_text(self.policy_type, &text) {
                Ok(rules) => {
                    self.form = RuleForm::Structured(rules);
                    self.error = None;
                }
                Err(err) => {
                    tracing::debug!(error = %err, "staying in JSON mode");
                    self.error = Some(err.to_string());
                    self.form = RuleForm::Json(text);
                }
            },
        }
        self
    }

    /// Set the priority. Not range-checked.
    pub fn set_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the enabled flag.
    pub fn set_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Scope the policy to a wallet, or `None` for global. Create drafts only.
    pub fn set_wallet_id(mut self, wallet_id: Option<String>) -> Self {
        if self.is_edit() {
            self.error = Some(SCOPE_LOCKED.to_string());
        } else {
            self.wallet_id = wallet_id;
        }
        self
    }

    /// Scope the policy to a network, or `None` for all. Create drafts only.
    pub fn set_network(mut self, network: Option<String>) -> Self {
        if self.is_edit() {
            self.error = Some(SCOPE_LOCKED.to_string());
        } else {
            self.network = network;
        }
        self
    }

    /// Record a draft-level error, e.g. a rejected submission.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Gate a submission.
    ///
    /// JSON mode must parse into the type's shape and is then sent as the
    /// object the operator wrote; structured mode must validate. When either
    /// fails the draft comes back with its errors set and no submission.
    pub fn check_submit(mut self) -> (Self, Option<Submission>) {
        let rules = match &self.form {
            RuleForm::Json(text) => match codec::parse_verbatim(self.policy_type, text) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(error = %err, "rules JSON rejected");
                    let message = match err {
                        ParseError::Syntax(_) => INVALID_JSON.to_string(),
                        other => other.to_string(),
                    };
                    self.error = Some(message);
                    return (self, None);
                }
            },
            RuleForm::Structured(rules) => {
                let errors = validate(rules);
                if !errors.is_empty() {
                    tracing::debug!(count = errors.len(), "rules failed validation");
                    self.field_errors = errors;
                    return (self, None);
                }
                rules.to_value()
            }
        };

        self.field_errors.clear();
        self.error = None;
        let submission = match &self.kind {
            DraftKind::Create => Submission::Create(CreatePolicyRequest {
                wallet_id: self.wallet_id.clone(),
                network: self.network.clone(),
                policy_type: self.policy_type,
                rules,
                priority: self.priority,
                enabled: self.enabled,
            }),
            DraftKind::Edit { policy_id } => Submission::Update {
                id: policy_id.clone(),
                request: UpdatePolicyRequest {
                    rules,
                    priority: self.priority,
                    enabled: self.enabled,
                },
            },
        };
        (self, Some(submission))
    }

    /// Create or edit.
    pub fn kind(&self) -> &DraftKind {
        &self.kind
    }

    /// Returns true for edit drafts.
    pub fn is_edit(&self) -> bool {
        matches!(self.kind, DraftKind::Edit { .. })
    }

    /// Selected policy type.
    pub fn policy_type(&self) -> PolicyType {
        self.policy_type
    }

    /// Current rule representation.
    pub fn form(&self) -> &RuleForm {
        &self.form
    }

    /// Structured rules, if in structured mode.
    pub fn rules(&self) -> Option<&PolicyRules> {
        match &self.form {
            RuleForm::Structured(rules) => Some(rules),
            RuleForm::Json(_) => None,
        }
    }

    /// JSON text, if in JSON mode.
    pub fn json_text(&self) -> Option<&str> {
        match &self.form {
            RuleForm::Json(text) => Some(text),
            RuleForm::Structured(_) => None,
        }
    }

    /// Returns true in JSON mode.
    pub fn is_json_mode(&self) -> bool {
        matches!(self.form, RuleForm::Json(_))
    }

    /// Priority.
    pub fn priority(&self) -> i64 {
        self.priority
    }

    /// Enabled flag.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Network scope.
    pub fn network(&self) -> Option<&str> {
        self.network.as_deref()
    }

    /// Wallet scope.
    pub fn wallet_id(&self) -> Option<&str> {
        self.wallet_id.as_deref()
    }

    /// Field path to message, from the last failed submit.
    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    /// Draft-level error, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Default for PolicyDraft {
    fn default() -> Self {
        Self::new_create()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rules::{ExtraFields, WhitelistRules};

    fn stored(policy_type: &str, rules: serde_json::Value) -> Policy {
        serde_json::from_value(serde_json::json!({
            "id": "p-7",
            "walletId": "w-1",
            "network": "ethereum-sepolia",
            "type": policy_type,
            "rules": rules,
            "priority": 5,
            "enabled": false
        }))
        .unwrap()
    }

    fn spending_limit(draft: &PolicyDraft) -> &crate::rules::SpendingLimitRules {
        match draft.rules() {
            Some(PolicyRules::SpendingLimit(r)) => r,
            other => panic!("unexpected rules: {other:?}"),
        }
    }

    #[test]
    fn test_new_create_defaults() {
        let draft = PolicyDraft::new_create();
        assert_eq!(draft.kind(), &DraftKind::Create);
        assert_eq!(draft.policy_type(), PolicyType::SpendingLimit);
        assert_eq!(
            draft.rules(),
            Some(&PolicyType::SpendingLimit.default_rules())
        );
        assert!(draft.enabled());
        assert_eq!(draft.priority(), 0);
        assert!(draft.field_errors().is_empty());
    }

    #[test]
    fn test_type_change_resets_json_and_errors() {
        let (draft, submission) = PolicyDraft::new_create()
            .select_type(PolicyType::Whitelist)
            .check_submit();
        assert!(submission.is_none());
        assert!(!draft.field_errors().is_empty());

        let draft = draft
            .toggle_mode()
            .set_json_text("{\"allowed_addresses\": [\"0x1\"]");
        assert!(draft.is_json_mode());

        let draft = draft.select_type(PolicyType::TimeRestriction);
        assert!(!draft.is_json_mode());
        assert!(draft.field_errors().is_empty());
        assert_eq!(
            draft.rules(),
            Some(&PolicyType::TimeRestriction.default_rules())
        );
    }

    #[test]
    fn test_type_change_rejected_on_edit() {
        let policy = stored(
            "RATE_LIMIT",
            serde_json::json!({"max_requests": 5, "window_seconds": 60}),
        );
        let draft = PolicyDraft::from_policy(&policy).select_type(PolicyType::Whitelist);

        assert_eq!(draft.policy_type(), PolicyType::RateLimit);
        assert_eq!(draft.error(), Some(TYPE_LOCKED));
    }

    #[test]
    fn test_toggle_abort_keeps_text() {
        let broken = "{\"instant_max\": \"1\",";
        let draft = PolicyDraft::new_create().toggle_mode().set_json_text(broken);

        let draft = draft.toggle_mode();
        assert!(draft.is_json_mode());
        assert_eq!(draft.json_text(), Some(broken));
        assert!(draft.error().is_some());
    }

    #[test]
    fn test_toggle_abort_on_wrong_shape() {
        let wrong = r#"{"max_requests": "many", "window_seconds": 60}"#;
        let draft = PolicyDraft::new_create()
            .select_type(PolicyType::RateLimit)
            .toggle_mode()
            .set_json_text(wrong);
        let before = draft.clone();

        let draft = draft.toggle_mode();
        assert!(matches!(draft.form(), RuleForm::Json(text) if text == wrong));
        assert_eq!(draft.rules(), None);
        assert_eq!(draft.policy_type(), PolicyType::RateLimit);
        assert!(draft.error().unwrap().contains("RATE_LIMIT"));
        assert_eq!(draft.with_error("x"), before.with_error("x"));
    }

    #[test]
    fn test_toggle_round_trip() {
        let draft = PolicyDraft::new_create().select_type(PolicyType::RateLimit);
        let before = draft.rules().cloned();

        let draft = draft.toggle_mode();
        assert_eq!(
            draft.json_text(),
            Some("{\n  \"max_requests\": 100,\n  \"window_seconds\": 3600\n}")
        );

        let draft = draft.toggle_mode();
        assert!(!draft.is_json_mode());
        assert_eq!(draft.rules().cloned(), before);
        assert_eq!(draft.error(), None);
    }

    #[test]
    fn test_toggle_adopts_edited_json() {
        let draft = PolicyDraft::new_create()
            .select_type(PolicyType::Whitelist)
            .toggle_mode()
            .set_json_text(r#"{"allowed_addresses": ["0xabc"]}"#)
            .toggle_mode();

        assert_eq!(
            draft.rules(),
            Some(&PolicyRules::Whitelist(WhitelistRules {
                allowed_addresses: vec!["0xabc".to_string()],
                extra: ExtraFields::new(),
            }))
        );
    }

    #[test]
    fn test_edit_revalidates_only_after_failed_submit() {
        let clear = |r: &mut PolicyRules| {
            if let PolicyRules::SpendingLimit(s) = r {
                s.instant_max.clear();
            }
        };
        let draft = PolicyDraft::new_create().edit_rules(clear);
        assert!(draft.field_errors().is_empty());

        let (draft, submission) = draft.check_submit();
        assert!(submission.is_none());
        assert_eq!(
            draft.field_errors().get("instant_max").map(String::as_str),
            Some("Positive integer required")
        );

        let draft = draft.edit_rules(|r| {
            if let PolicyRules::SpendingLimit(s) = r {
                s.instant_max = "5".to_string();
            }
        });
        assert!(draft.field_errors().is_empty());
        assert_eq!(spending_limit(&draft).instant_max, "5");
    }

    #[test]
    fn test_submit_create_request() {
        let (draft, submission) = PolicyDraft::new_create()
            .set_wallet_id(Some("w-1".to_string()))
            .set_priority(7)
            .set_enabled(false)
            .check_submit();
        assert!(draft.field_errors().is_empty());

        let Some(Submission::Create(request)) = submission else {
            panic!("expected create submission");
        };
        assert_eq!(request.policy_type, PolicyType::SpendingLimit);
        assert_eq!(request.wallet_id.as_deref(), Some("w-1"));
        assert_eq!(request.priority, 7);
        assert!(!request.enabled);
    }

    #[test]
    fn test_submit_invalid_json() {
        let (draft, submission) = PolicyDraft::new_create()
            .toggle_mode()
            .set_json_text("not json")
            .check_submit();

        assert!(submission.is_none());
        assert_eq!(draft.error(), Some(INVALID_JSON));
        assert_eq!(draft.json_text(), Some("not json"));
    }

    #[test]
    fn test_submit_json_skips_validator() {
        let (_, submission) = PolicyDraft::new_create()
            .select_type(PolicyType::Whitelist)
            .toggle_mode()
            .check_submit();

        let Some(Submission::Create(request)) = submission else {
            panic!("expected create submission");
        };
        assert_eq!(request.rules, serde_json::json!({"allowed_addresses": []}));
    }

    #[test]
    fn test_submit_json_sends_object_as_written() {
        let text = r#"{"tokens": [{"address": "0xa", "assetId": "eip155:1/erc20:0xa"}]}"#;
        let (_, submission) = PolicyDraft::new_create()
            .select_type(PolicyType::AllowedTokens)
            .toggle_mode()
            .set_json_text(text)
            .check_submit();

        let Some(Submission::Create(request)) = submission else {
            panic!("expected create submission");
        };
        assert_eq!(
            request.rules,
            serde_json::from_str::<serde_json::Value>(text).unwrap()
        );
    }

    #[test]
    fn test_submit_json_missing_field_blocked() {
        let (draft, submission) = PolicyDraft::new_create()
            .select_type(PolicyType::RateLimit)
            .toggle_mode()
            .set_json_text("{}")
            .check_submit();

        assert!(submission.is_none());
        let error = draft.error().unwrap();
        assert_ne!(error, INVALID_JSON);
        assert!(error.contains("max_requests"), "{error}");
        assert_eq!(draft.json_text(), Some("{}"));
    }

    #[test]
    fn test_edit_keeps_unmodelled_keys() {
        let rules = serde_json::json!({
            "spenders": [{"address": "0xbeef", "name": "Router", "maxAmount": "5"}]
        });
        let policy = stored("APPROVED_SPENDERS", rules.clone());
        let draft = PolicyDraft::from_policy(&policy);
        assert!(!draft.is_json_mode());

        let (_, submission) = draft.set_priority(9).check_submit();
        let Some(Submission::Update { request, .. }) = submission else {
            panic!("expected update submission");
        };
        assert_eq!(request.rules, rules);
        assert_eq!(request.priority, 9);
    }

    #[test]
    fn test_edit_draft_submits_update() {
        let policy = stored(
            "RATE_LIMIT",
            serde_json::json!({"max_requests": 5, "window_seconds": 60}),
        );
        let draft = PolicyDraft::from_policy(&policy);
        assert_eq!(draft.wallet_id(), Some("w-1"));
        assert_eq!(draft.network(), Some("ethereum-sepolia"));

        let draft = draft.set_wallet_id(None);
        assert_eq!(draft.wallet_id(), Some("w-1"));
        assert_eq!(draft.error(), Some(SCOPE_LOCKED));

        let (_, submission) = draft.set_enabled(true).check_submit();
        let Some(Submission::Update { id, request }) = submission else {
            panic!("expected update submission");
        };
        assert_eq!(id, "p-7");
        assert_eq!(request.priority, 5);
        assert!(request.enabled);
    }

    #[test]
    fn test_mismatched_stored_rules_open_as_json() {
        let policy = stored("WHITELIST", serde_json::json!({"allowed_addresses": "0xabc"}));
        let draft = PolicyDraft::from_policy(&policy);

        assert!(draft.is_json_mode());
        assert!(draft.json_text().unwrap().contains("\"0xabc\""));
    }
}
