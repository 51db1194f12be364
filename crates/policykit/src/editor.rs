//! Drives a [`PolicyDraft`] against a [`PolicyStore`].
//!
//! At most one draft is open per editor, and at most one submission is in
//! flight. While it is, the draft cannot be edited, cancelled or replaced,
//! so the response always lands on the draft that was sent. A remote
//! failure never discards the draft: the operator's input stays in place
//! with the store's message as the draft-level error.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::draft::{PolicyDraft, Submission};
use crate::store::{Policy, PolicyStore, StoreError};

/// Errors from [`PolicyEditor`] operations.
#[derive(Debug, Error)]
pub enum EditorError {
    /// No draft is open.
    #[error("no draft is open")]
    NoDraft,
    /// A draft is already open.
    #[error("a draft is already open")]
    DraftOpen,
    /// A submission for this draft has not finished yet.
    #[error("a submission is already in flight")]
    SubmitInFlight,
    /// The Policy Store rejected the request or could not be reached.
    #[error("policy store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of a successful [`PolicyEditor::submit`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// A new policy was stored. The draft is closed.
    Created {
        /// Id assigned by the store.
        id: String,
    },
    /// An existing policy was replaced. The draft is closed.
    Updated(Policy),
    /// Local checks failed; nothing was sent. The draft holds the errors.
    Blocked,
}

#[derive(Debug, Default)]
struct EditorState {
    draft: Option<PolicyDraft>,
    submitting: bool,
}

/// Owns the open draft and submits it.
pub struct PolicyEditor<S> {
    store: Arc<S>,
    state: Mutex<EditorState>,
}

impl<S> std::fmt::Debug for PolicyEditor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyEditor").finish_non_exhaustive()
    }
}

impl<S: PolicyStore> PolicyEditor<S> {
    /// Create an editor with no open draft.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            state: Mutex::new(EditorState::default()),
        }
    }

    /// Open a fresh create draft.
    pub async fn open_create(&self) -> Result<PolicyDraft, EditorError> {
        self.open(PolicyDraft::new_create()).await
    }

    /// Open an edit draft seeded from `policy`.
    pub async fn open_edit(&self, policy: &Policy) -> Result<PolicyDraft, EditorError> {
        self.open(PolicyDraft::from_policy(policy)).await
    }

    async fn open(&self, draft: PolicyDraft) -> Result<PolicyDraft, EditorError> {
        let mut state = self.state.lock().await;
        if state.submitting {
            return Err(EditorError::SubmitInFlight);
        }
        if state.draft.is_some() {
            return Err(EditorError::DraftOpen);
        }
        state.draft = Some(draft.clone());
        Ok(draft)
    }

    /// Apply an update to the open draft and return the result.
    pub async fn update(
        &self,
        f: impl FnOnce(PolicyDraft) -> PolicyDraft,
    ) -> Result<PolicyDraft, EditorError> {
        let mut state = self.state.lock().await;
        if state.submitting {
            return Err(EditorError::SubmitInFlight);
        }
        let draft = state.draft.take().ok_or(EditorError::NoDraft)?;
        let next = f(draft);
        state.draft = Some(next.clone());
        Ok(next)
    }

    /// Snapshot of the open draft.
    pub async fn draft(&self) -> Option<PolicyDraft> {
        self.state.lock().await.draft.clone()
    }

    /// Close the open draft without submitting.
    pub async fn cancel(&self) -> Result<(), EditorError> {
        let mut state = self.state.lock().await;
        if state.submitting {
            return Err(EditorError::SubmitInFlight);
        }
        state.draft = None;
        Ok(())
    }

    /// Returns true while a submission is outstanding.
    pub async fn is_submitting(&self) -> bool {
        self.state.lock().await.submitting
    }

    /// Gate and send the open draft.
    ///
    /// Local failures return [`SubmitOutcome::Blocked`] without touching the
    /// store. On success the draft is closed, so the next
    /// [`open_create`](Self::open_create) starts from fresh defaults.
    pub async fn submit(&self) -> Result<SubmitOutcome, EditorError> {
        let submission = {
            let mut state = self.state.lock().await;
            if state.submitting {
                return Err(EditorError::SubmitInFlight);
            }
            let draft = state.draft.take().ok_or(EditorError::NoDraft)?;
            let (draft, submission) = draft.check_submit();
            state.draft = Some(draft);
            match submission {
                Some(submission) => {
                    state.submitting = true;
                    submission
                }
                None => return Ok(SubmitOutcome::Blocked),
            }
        };

        let result = match submission {
            Submission::Create(request) => self
                .store
                .create_policy(&request)
                .await
                .map(|created| SubmitOutcome::Created { id: created.id }),
            Submission::Update { id, request } => self
                .store
                .update_policy(&id, &request)
                .await
                .map(SubmitOutcome::Updated),
        };

        let mut state = self.state.lock().await;
        state.submitting = false;
        match result {
            Ok(outcome) => {
                tracing::info!(?outcome, "policy submitted");
                state.draft = None;
                Ok(outcome)
            }
            Err(err) => {
                tracing::warn!(error = %err, "policy submission failed");
                if let Some(draft) = state.draft.take() {
                    state.draft = Some(draft.with_error(err.user_message()));
                }
                Err(EditorError::Store(err))
            }
        }
    }
}
