//! Policykit CLI
//!
//! Author wallet transaction policies against a running daemon.
//!
//! Usage:
//!   policykit list [--wallet <id> | --global]
//!   policykit create --type rate-limit --rules '{"max_requests": 10, "window_seconds": 60}'
//!   policykit validate whitelist --rules-file rules.json
//!
//! Rules are validated locally before anything is sent; failures print one
//! `path: message` line per field and exit with status 1.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use policykit::codec;
use policykit::summary::summarize_policy;
use policykit::{
    ClientConfig, EditorError, FieldErrors, HttpPolicyStore, PolicyCollection, PolicyDraft,
    PolicyEditor, PolicyFilter, PolicyStore, PolicyType, SubmitOutcome,
};

/// Policykit - wallet transaction policy authoring
#[derive(Parser, Debug)]
#[command(name = "policykit")]
#[command(about = "Create, edit and inspect wallet transaction policies")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// JSON config file
    #[arg(long, global = true, env = "POLICYKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Daemon base URL
    #[arg(long, global = true, env = "POLICYKIT_BASE_URL")]
    base_url: Option<String>,

    /// Master password sent with every request
    #[arg(
        long,
        global = true,
        env = "POLICYKIT_MASTER_PASSWORD",
        hide_env_values = true
    )]
    master_password: Option<String>,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored policies
    List {
        /// Policies that apply to this wallet, global ones included
        #[arg(long, conflicts_with = "global")]
        wallet: Option<String>,

        /// Only policies that apply to every wallet
        #[arg(long)]
        global: bool,

        /// Print the raw policies as JSON
        #[arg(long)]
        json: bool,
    },

    /// List wallets
    Wallets,

    /// Create a policy
    Create {
        /// Policy type, e.g. SPENDING_LIMIT or spending-limit
        #[arg(long = "type")]
        policy_type: PolicyType,

        /// Scope to a wallet (global when omitted)
        #[arg(long)]
        wallet: Option<String>,

        /// Scope to a network (all networks when omitted)
        #[arg(long)]
        network: Option<String>,

        #[command(flatten)]
        rules: RulesArgs,

        /// Priority among overlapping policies
        #[arg(long, default_value_t = 0)]
        priority: i64,

        /// Store the policy disabled
        #[arg(long)]
        disabled: bool,
    },

    /// Replace the rules, priority or enabled flag of a policy
    Update {
        /// Policy id
        id: String,

        #[command(flatten)]
        rules: RulesArgs,

        /// New priority
        #[arg(long)]
        priority: Option<i64>,

        /// Enable or disable
        #[arg(long)]
        enabled: Option<bool>,
    },

    /// Delete a policy
    Delete {
        /// Policy id
        id: String,
    },

    /// Print the default rules for a policy type
    Defaults {
        /// Policy type
        policy_type: PolicyType,
    },

    /// Validate rules locally without contacting the daemon
    Validate {
        /// Policy type
        policy_type: PolicyType,

        #[command(flatten)]
        rules: RulesArgs,
    },
}

#[derive(clap::Args, Debug)]
struct RulesArgs {
    /// Rules as a JSON object
    #[arg(long, conflicts_with = "rules_file")]
    rules: Option<String>,

    /// Read rules from a JSON file
    #[arg(long)]
    rules_file: Option<PathBuf>,
}

impl RulesArgs {
    fn text(&self) -> anyhow::Result<Option<String>> {
        match (&self.rules, &self.rules_file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => std::fs::read_to_string(path)
                .map(Some)
                .with_context(|| format!("failed to read {}", path.display())),
            (None, None) => Ok(None),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so command output stays clean.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let args = Args::parse();

    // Local commands work without a reachable daemon or a valid config.
    if let Some(code) = run_local(&args.command)? {
        return Ok(code);
    }

    let config = load_config(&args)?;
    let store = Arc::new(HttpPolicyStore::new(&config)?);
    tracing::debug!(base_url = config.base_url(), "using policy store");
    run_remote(args.command, store).await
}

fn run_local(command: &Command) -> anyhow::Result<Option<ExitCode>> {
    match command {
        Command::Defaults { policy_type } => {
            println!("{}", codec::to_json_text(&policy_type.default_rules()));
            Ok(Some(ExitCode::SUCCESS))
        }
        Command::Validate { policy_type, rules } => {
            let Some(text) = rules.text()? else {
                bail!("--rules or --rules-file is required");
            };
            validate_only(*policy_type, &text).map(Some)
        }
        _ => Ok(None),
    }
}

fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if let Some(password) = &args.master_password {
        config.master_password = Some(password.clone());
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout = Duration::from_millis(ms);
    }
    Ok(config)
}

async fn run_remote<S: PolicyStore>(
    command: Command,
    store: Arc<S>,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::List {
            wallet,
            global,
            json,
        } => {
            let filter = match (wallet, global) {
                (Some(id), _) => PolicyFilter::Wallet(id),
                (None, true) => PolicyFilter::GlobalOnly,
                (None, false) => PolicyFilter::All,
            };
            list(store, filter, json).await
        }
        Command::Wallets => {
            for w in store.list_wallets().await.map_err(remote)? {
                println!("{}  {} ({}/{})", w.id, w.name, w.chain, w.network);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Create {
            policy_type,
            wallet,
            network,
            rules,
            priority,
            disabled,
        } => {
            let text = rules.text()?;
            let editor = PolicyEditor::new(store);
            editor.open_create().await?;
            editor
                .update(|d| {
                    let d = d
                        .select_type(policy_type)
                        .set_wallet_id(wallet)
                        .set_network(network)
                        .set_priority(priority)
                        .set_enabled(!disabled);
                    with_rules_text(d, text)
                })
                .await?;
            submit(&editor).await
        }
        Command::Update {
            id,
            rules,
            priority,
            enabled,
        } => {
            let text = rules.text()?;
            let policies = store.list_policies(None).await.map_err(remote)?;
            let Some(policy) = policies.into_iter().find(|p| p.id == id) else {
                bail!("Policy not found: {id}");
            };
            let editor = PolicyEditor::new(store);
            editor.open_edit(&policy).await?;
            editor
                .update(|mut d| {
                    if let Some(priority) = priority {
                        d = d.set_priority(priority);
                    }
                    if let Some(enabled) = enabled {
                        d = d.set_enabled(enabled);
                    }
                    with_rules_text(d, text)
                })
                .await?;
            submit(&editor).await
        }
        Command::Delete { id } => {
            let collection = PolicyCollection::new(store);
            collection.delete(&id).await.map_err(remote)?;
            println!("deleted {id}");
            Ok(ExitCode::SUCCESS)
        }
        Command::Defaults { .. } | Command::Validate { .. } => {
            Ok(run_local(&command)?.unwrap_or(ExitCode::SUCCESS))
        }
    }
}

async fn list<S: PolicyStore>(
    store: Arc<S>,
    filter: PolicyFilter,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let collection = PolicyCollection::new(store);
    if let Err(e) = collection.load_wallets().await {
        tracing::warn!(error = %e, "could not load wallets, showing ids");
    }
    collection.set_filter(filter).await.map_err(remote)?;
    let policies = collection.policies().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&policies)?);
        return Ok(ExitCode::SUCCESS);
    }
    for policy in &policies {
        let scope = collection.wallet_label(policy.wallet_id.as_deref()).await;
        let state = if policy.enabled { "on" } else { "off" };
        println!(
            "{}  {:<22} {:<12} {:<3} p{:<4} {}",
            policy.id,
            policy.policy_type.as_str(),
            scope,
            state,
            policy.priority,
            summarize_policy(policy),
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// Replace the draft's rules with `text`, parsed into structured form.
fn with_rules_text(draft: PolicyDraft, text: Option<String>) -> PolicyDraft {
    let Some(text) = text else {
        return draft;
    };
    let draft = if draft.is_json_mode() {
        draft
    } else {
        draft.toggle_mode()
    };
    draft.set_json_text(text).toggle_mode()
}

async fn submit<S: PolicyStore>(editor: &PolicyEditor<S>) -> anyhow::Result<ExitCode> {
    match editor.submit().await {
        Ok(SubmitOutcome::Created { id }) => {
            println!("created {id}");
            Ok(ExitCode::SUCCESS)
        }
        Ok(SubmitOutcome::Updated(policy)) => {
            println!("updated {}: {}", policy.id, summarize_policy(&policy));
            Ok(ExitCode::SUCCESS)
        }
        Ok(SubmitOutcome::Blocked) => {
            if let Some(draft) = editor.draft().await {
                if let Some(error) = draft.error() {
                    eprintln!("{error}");
                }
                print_field_errors(draft.field_errors());
            }
            Ok(ExitCode::FAILURE)
        }
        Err(EditorError::Store(e)) => Err(remote(e)),
        Err(e) => Err(e.into()),
    }
}

fn validate_only(policy_type: PolicyType, text: &str) -> anyhow::Result<ExitCode> {
    let rules = match codec::from_json_text(policy_type, text) {
        Ok(rules) => rules,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let errors = policykit::validate(&rules);
    if errors.is_empty() {
        println!("ok");
        return Ok(ExitCode::SUCCESS);
    }
    print_field_errors(&errors);
    Ok(ExitCode::FAILURE)
}

fn print_field_errors(errors: &FieldErrors) {
    for (path, message) in errors {
        eprintln!("{path}: {message}");
    }
}

fn remote(e: policykit::StoreError) -> anyhow::Error {
    anyhow::anyhow!("{} ({e})", e.user_message())
}
