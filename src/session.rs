//! Per-session state and the generate/validate/correct actions
//!
//! All state lives in an explicit struct handed to the action methods, so
//! the actions are testable without a terminal harness. Nothing here is
//! persisted: a session starts from a placeholder draft and ends when the
//! process exits.

use crate::extract::{extract_code, Extraction};
use crate::llm::{self, prompts, FailureKind, ModelExchange};
use crate::provider::CloudProvider;
use crate::sanitize::sanitize;
use crate::util::CancelFlag;
use crate::validate::{self, Verdict};
use std::path::Path;
use std::time::Duration;

/// Where the current draft content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    Placeholder,
    Generated,
    Corrected,
    UserEdited,
}

/// The current candidate configuration text. Replaced wholesale, never
/// merged.
#[derive(Debug, Clone)]
pub struct Draft {
    pub content: String,
    pub origin: DraftOrigin,
}

impl Draft {
    pub fn placeholder(provider: CloudProvider) -> Self {
        Self {
            content: format!(
                "# Describe your {} infrastructure above and generate a draft",
                provider.label()
            ),
            origin: DraftOrigin::Placeholder,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.origin == DraftOrigin::Placeholder
    }
}

/// What an action did, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionReport {
    DraftReplaced {
        origin: DraftOrigin,
        warning: Option<String>,
    },
    Validated {
        succeeded: bool,
    },
    Failed(String),
}

/// Session state: one draft, at most one verdict for it, and the raw model
/// reply kept around when extraction could not use it cleanly.
#[derive(Debug, Clone)]
pub struct Session {
    pub provider: CloudProvider,
    pub request: String,
    pub draft: Draft,
    pub verdict: Option<Verdict>,
    pub debug_response: Option<String>,
}

impl Session {
    pub fn new(provider: CloudProvider) -> Self {
        Self {
            provider,
            request: provider.example_request().to_string(),
            draft: Draft::placeholder(provider),
            verdict: None,
            debug_response: None,
        }
    }

    /// Switch provider. The example request and placeholder follow along
    /// only while the user has not produced anything yet.
    pub fn set_provider(&mut self, provider: CloudProvider) {
        let untouched = self.draft.is_placeholder();
        if untouched && self.request == self.provider.example_request() {
            self.request = provider.example_request().to_string();
        }
        self.provider = provider;
        if untouched {
            self.draft = Draft::placeholder(provider);
        }
    }

    /// Replace the draft wholesale. Any previous verdict refers to content
    /// that no longer exists, so it is dropped here, before anything else
    /// can observe the new draft.
    pub fn replace_draft(&mut self, content: String, origin: DraftOrigin) {
        self.draft = Draft { content, origin };
        self.verdict = None;
    }

    /// Apply a direct user edit.
    pub fn edit_draft(&mut self, content: String) {
        if content != self.draft.content {
            self.replace_draft(content, DraftOrigin::UserEdited);
        }
    }

    pub fn can_validate(&self) -> bool {
        !self.draft.is_placeholder() && !self.draft.content.trim().is_empty()
    }

    pub fn can_correct(&self) -> bool {
        matches!(&self.verdict, Some(v) if !v.succeeded)
    }

    /// Ask the model for a fresh draft from the plain-language request.
    pub async fn generate(&mut self, api_key: &str) -> ActionReport {
        if self.request.trim().is_empty() {
            return ActionReport::Failed(
                "Describe the infrastructure you want before generating.".to_string(),
            );
        }
        let system = prompts::generation_system(self.provider);
        let user = sanitize(&self.request);
        let exchange = llm::complete(api_key, &system, &user).await;
        self.absorb_exchange(exchange, DraftOrigin::Generated)
    }

    /// Feed the failing draft plus the validator's diagnostics back to the
    /// model for a corrected draft.
    pub async fn correct(&mut self, api_key: &str) -> ActionReport {
        let message = match &self.verdict {
            Some(v) if !v.succeeded => v.message.clone(),
            _ => {
                return ActionReport::Failed(
                    "Correction needs a failed validation first.".to_string(),
                )
            }
        };
        let code = sanitize(&self.draft.content);
        let diagnostics = sanitize(&message);
        let user = prompts::correction_request(&code, &diagnostics);
        let exchange = llm::complete(api_key, prompts::CORRECTION_SYSTEM, &user).await;
        self.absorb_exchange(exchange, DraftOrigin::Corrected)
    }

    /// Run the external validator against the current draft and record the
    /// verdict.
    pub fn run_validation(
        &mut self,
        terraform: &Path,
        workdir: &Path,
        timeout: Duration,
        cancel: &CancelFlag,
    ) -> ActionReport {
        if !self.can_validate() {
            return ActionReport::Failed("Nothing to validate yet.".to_string());
        }
        match validate::validate(&self.draft.content, workdir, terraform, timeout, cancel) {
            Ok(verdict) => {
                let succeeded = verdict.succeeded;
                self.verdict = Some(verdict);
                ActionReport::Validated { succeeded }
            }
            Err(err) => ActionReport::Failed(format!("Validation could not run: {:#}", err)),
        }
    }

    /// Fold a model exchange into the session: extract code on success, set
    /// the sentinel on empty output, keep raw text for the debug pane when
    /// the reply could not be used cleanly.
    fn absorb_exchange(&mut self, exchange: ModelExchange, origin: DraftOrigin) -> ActionReport {
        match exchange.failure {
            FailureKind::None => match extract_code(&exchange.raw_response) {
                Extraction::Fenced(code) | Extraction::Raw(code) => {
                    self.replace_draft(code, origin);
                    self.debug_response = None;
                    ActionReport::DraftReplaced {
                        origin,
                        warning: None,
                    }
                }
                Extraction::Stripped(code) => {
                    self.replace_draft(code, origin);
                    self.debug_response = Some(exchange.raw_response);
                    ActionReport::DraftReplaced {
                        origin,
                        warning: Some(
                            "The reply did not contain a standard fenced code block; using the raw output."
                                .to_string(),
                        ),
                    }
                }
                Extraction::Empty => {
                    self.set_no_content_sentinel();
                    self.debug_response = Some(exchange.raw_response);
                    ActionReport::Failed("The model reply contained no code.".to_string())
                }
            },
            FailureKind::MalformedOutput => {
                self.set_no_content_sentinel();
                self.debug_response =
                    Some("The service returned an empty or malformed completion object.".to_string());
                ActionReport::Failed(exchange.failure_message())
            }
            FailureKind::Auth | FailureKind::Transient => {
                self.debug_response = Some(exchange.raw_response.clone());
                ActionReport::Failed(exchange.failure_message())
            }
        }
    }

    /// The draft must never be left stale after a failed generation: an
    /// explicit sentinel makes "there is no fresh code" visible.
    fn set_no_content_sentinel(&mut self) {
        self.replace_draft(
            "# The model returned no content.".to_string(),
            DraftOrigin::Placeholder,
        );
    }
}
