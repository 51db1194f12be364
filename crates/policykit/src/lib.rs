//! Policykit: transaction policy authoring for AI-agent wallets
//!
//! Policies tell a wallet daemon which transactions an agent may send on its
//! own, which need a notification or delay, and which need an operator's
//! approval. This crate is the authoring side: it knows the twelve policy
//! types and their defaults, validates rule payloads, converts between typed
//! rules and the JSON an operator edits by hand, drives create / edit drafts
//! and keeps a filtered view of what the Policy Store holds.
//!
//! Enforcement happens elsewhere; nothing here evaluates a transaction.

mod collection;
mod draft;
mod editor;

pub mod codec;
pub mod config;
pub mod messages;
pub mod rules;
pub mod store;
pub mod summary;
pub mod validate;

pub use codec::ParseError;
pub use collection::{FilterOption, PolicyCollection, PolicyFilter};
pub use config::{ClientConfig, ConfigError};
pub use draft::{
    DraftKind, INVALID_JSON, PolicyDraft, RuleForm, SCOPE_LOCKED, Submission, TYPE_LOCKED,
};
pub use editor::{EditorError, PolicyEditor, SubmitOutcome};
pub use rules::{ParsePolicyTypeError, PolicyRules, PolicyType};
pub use store::{
    HttpPolicyStore, InMemoryPolicyStore, Policy, PolicyStore, StoreError, Wallet,
};
pub use validate::{FieldErrors, validate};
