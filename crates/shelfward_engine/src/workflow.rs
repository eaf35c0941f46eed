//! Workflow runner.
//!
//! An explicit finite-state machine over a normalized step list. The
//! session state is one serializable value - `step_index` plus the
//! accumulated attributes and step results - so the whole wizard can
//! be unit-tested step by step without rendering anything.
//!
//! The runner is host-driven. Remote calls are split into a `begin_*`
//! that hands the host a [`SessionToken`] and a request body, and a
//! `complete_*`/`finish_*` that applies the result. A token minted
//! before any later transition no longer matches the session epoch,
//! so results arriving after the user moved on (or the hosting UI was
//! dismissed and restarted the session) are discarded, never applied.
//!
//! Within one session, transitions are strictly sequential: every
//! mutation happens in a `&mut self` method on the host's event loop,
//! and suspension occurs only between `begin_*` and `complete_*`.

use crate::error::{SaveError, WorkflowError};
use crate::lookup::{diff, merge_results, DiffEntry};
use crate::validate::is_empty_value;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shelfward_contract::{
    Attributes, Contract, Field, Identifier, Item, WorkflowStep,
};
use shelfward_protocol::{
    AssetRef, ItemDraft, ItemService, LookupError, LookupRequest, LookupResponse, MetadataService,
};
use tracing::{debug, warn};

/// The user's image selection: exactly one source wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ImageChoice {
    /// A provider-returned asset URL
    ProviderUrl { url: String },

    /// A file picked locally by the user
    LocalFile { filename: String, bytes: Vec<u8> },
}

/// Proof that an async result belongs to the current session state.
///
/// Minted by `begin_*`, checked by `complete_*`. Any transition
/// invalidates previously minted tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionToken(u64);

/// Runtime state of one wizard invocation. Created on workflow start,
/// discarded on completion, cancellation, or the hosting UI closing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub step_index: usize,
    pub attributes: Attributes,
    pub lookup: Option<LookupResponse>,
    pub image: Option<ImageChoice>,

    #[serde(skip)]
    epoch: u64,
}

impl WorkflowSession {
    fn fresh(epoch: u64) -> Self {
        Self {
            step_index: 0,
            attributes: Attributes::new(),
            lookup: None,
            image: None,
            epoch,
        }
    }
}

/// Guarantee the user is always offered image selection before
/// persistence: if no SELECT_IMAGE step exists, synthesize one
/// immediately before the first SAVE_ITEM (or append it when the
/// workflow has no save step). A list that already contains
/// SELECT_IMAGE passes through untouched.
pub fn normalize_steps(steps: &[WorkflowStep]) -> Vec<WorkflowStep> {
    if steps.iter().any(|s| matches!(s, WorkflowStep::SelectImage)) {
        return steps.to_vec();
    }
    let mut normalized = steps.to_vec();
    match normalized
        .iter()
        .position(|s| matches!(s, WorkflowStep::SaveItem))
    {
        Some(save_pos) => normalized.insert(save_pos, WorkflowStep::SelectImage),
        None => normalized.push(WorkflowStep::SelectImage),
    }
    normalized
}

/// State machine sequencing one contract workflow.
#[derive(Debug)]
pub struct WorkflowRunner {
    contract: Contract,
    workflow_key: String,
    steps: Vec<WorkflowStep>,
    session: WorkflowSession,
    next_epoch: u64,
}

impl WorkflowRunner {
    /// Start a session for the named workflow. The contract is owned
    /// and immutable for the runner's lifetime.
    pub fn new(contract: Contract, workflow_key: &str) -> Result<Self, WorkflowError> {
        let workflow = contract
            .workflow(workflow_key)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(workflow_key.to_string()))?;
        let steps = normalize_steps(&workflow.steps);
        debug!(workflow = workflow_key, steps = steps.len(), "workflow session started");
        Ok(Self {
            contract,
            workflow_key: workflow_key.to_string(),
            steps,
            session: WorkflowSession::fresh(0),
            next_epoch: 1,
        })
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn workflow_key(&self) -> &str {
        &self.workflow_key
    }

    pub fn steps(&self) -> &[WorkflowStep] {
        &self.steps
    }

    pub fn session(&self) -> &WorkflowSession {
        &self.session
    }

    pub fn attributes(&self) -> &Attributes {
        &self.session.attributes
    }

    /// The step the session is on, or `None` once complete.
    pub fn current_step(&self) -> Option<&WorkflowStep> {
        self.steps.get(self.session.step_index)
    }

    /// Terminal state, reached only via save completion.
    pub fn is_complete(&self) -> bool {
        self.session.step_index == self.steps.len()
    }

    /// Switch to another workflow of the same contract. The session
    /// restarts: accumulated attributes and results are discarded and
    /// in-flight tokens invalidated.
    pub fn switch_workflow(&mut self, workflow_key: &str) -> Result<(), WorkflowError> {
        let workflow = self
            .contract
            .workflow(workflow_key)
            .ok_or_else(|| WorkflowError::UnknownWorkflow(workflow_key.to_string()))?;
        self.steps = normalize_steps(&workflow.steps);
        self.workflow_key = workflow_key.to_string();
        self.session = WorkflowSession::fresh(self.next_epoch);
        self.next_epoch += 1;
        debug!(workflow = workflow_key, "workflow switched, session reset");
        Ok(())
    }

    /// Fields a PROMPT / PROMPT_ANY step renders, resolved from the
    /// live contract on every entry - a field that disappeared since
    /// workflow start degrades to a visible warning, not a crash.
    pub fn fields_for_current_step(&self) -> Result<Vec<&Field>, WorkflowError> {
        let keys: Vec<&str> = match self.current_step() {
            Some(WorkflowStep::Prompt { field }) => vec![field.as_str()],
            Some(WorkflowStep::PromptAny { fields }) => {
                fields.iter().map(String::as_str).collect()
            }
            _ => return Ok(Vec::new()),
        };
        keys.iter()
            .map(|key| {
                self.contract.field(key).ok_or_else(|| {
                    warn!(field = %key, "workflow step references unknown field");
                    WorkflowError::MissingField {
                        field: key.to_string(),
                    }
                })
            })
            .collect()
    }

    /// Submit the one-field form of a PROMPT step.
    pub fn submit_prompt(&mut self, values: Attributes) -> Result<(), WorkflowError> {
        self.expect_step("PROMPT")?;
        self.merge_attributes(values);
        self.advance();
        Ok(())
    }

    /// Submit the multi-field form of a PROMPT_ANY step. Rejected -
    /// the session stays put - unless at least one of the step's
    /// listed fields carries a non-empty value.
    pub fn submit_prompt_any(&mut self, values: Attributes) -> Result<(), WorkflowError> {
        let listed: Vec<String> = match self.current_step() {
            Some(WorkflowStep::PromptAny { fields }) => fields.clone(),
            other => return Err(self.mismatch("PROMPT_ANY", other)),
        };
        let any_filled = listed
            .iter()
            .any(|key| values.get(key).is_some_and(|v| !is_empty_value(v)));
        if !any_filled {
            return Err(WorkflowError::NothingEntered);
        }
        self.merge_attributes(values);
        self.advance();
        Ok(())
    }

    /// Identifier values derivable from the accumulated attributes,
    /// using each contract field's declared identifier kinds.
    pub fn identifiers_from_attributes(&self) -> Vec<Identifier> {
        let mut identifiers = Vec::new();
        for field in &self.contract.fields {
            if field.identifiers.is_empty() {
                continue;
            }
            let Some(value) = self.session.attributes.get(&field.key) else {
                continue;
            };
            if is_empty_value(value) {
                continue;
            }
            let Some(raw) = stringify(value) else {
                continue;
            };
            for kind in &field.identifiers {
                identifiers.push(Identifier::new(kind.clone(), raw.clone()));
            }
        }
        identifiers
    }

    /// Start the LOOKUP_METADATA step: derive identifiers and build
    /// the request. With no identifier values available this fails
    /// recoverably and the session remains on the step.
    pub fn begin_lookup(&self) -> Result<(SessionToken, LookupRequest), WorkflowError> {
        let providers = match self.current_step() {
            Some(WorkflowStep::LookupMetadata { providers }) => {
                if providers.is_empty() {
                    self.contract
                        .enabled_providers()
                        .iter()
                        .map(|p| p.key.clone())
                        .collect()
                } else {
                    providers.clone()
                }
            }
            other => return Err(self.mismatch("LOOKUP_METADATA", other)),
        };
        let identifiers = self.identifiers_from_attributes();
        if identifiers.is_empty() {
            return Err(WorkflowError::NoIdentifiers);
        }
        if providers.is_empty() {
            // Neither the step nor the contract names a provider;
            // there is nobody to ask.
            return Err(LookupError::NoProviders(self.contract.key.clone()).into());
        }
        let request = LookupRequest {
            module_id: self.contract.key.clone(),
            identifiers,
            providers,
        };
        Ok((self.token(), request))
    }

    /// Apply a lookup response. Returns `false` when the token is
    /// stale - the session transitioned while the call was in flight
    /// and the result is discarded.
    pub fn complete_lookup(&mut self, token: SessionToken, response: LookupResponse) -> bool {
        if !self.token_is_current(token) {
            debug!("stale lookup result discarded");
            return false;
        }
        for (provider, error) in response.provider_errors() {
            warn!(provider, error, "provider lookup failed");
        }
        self.session.lookup = Some(response);
        self.advance();
        true
    }

    /// Begin, await, and complete a lookup in one call. For hosts that
    /// drive the runner from a single task; multi-task hosts use the
    /// begin/complete pair directly.
    pub async fn run_lookup(&mut self, service: &dyn MetadataService) -> Result<(), WorkflowError> {
        let (token, request) = self.begin_lookup()?;
        let response = service.lookup(&request).await?;
        self.complete_lookup(token, response);
        Ok(())
    }

    /// Suggested changes for the APPLY_METADATA step.
    pub fn diff_entries(&self) -> Result<Vec<DiffEntry>, WorkflowError> {
        self.expect_step("APPLY_METADATA")?;
        let lookup = self.session.lookup.as_ref().ok_or(WorkflowError::NoLookup)?;
        Ok(diff(&self.session.attributes, &merge_results(lookup)))
    }

    /// Apply the chosen subset of suggestions. Only the selected keys
    /// are overwritten; everything else the user entered stands.
    pub fn apply_selected(&mut self, keys: &[&str]) -> Result<(), WorkflowError> {
        self.expect_step("APPLY_METADATA")?;
        let lookup = self.session.lookup.as_ref().ok_or(WorkflowError::NoLookup)?;
        let merged = merge_results(lookup);
        for key in keys {
            if let Some(value) = merged.get(*key) {
                self.session
                    .attributes
                    .insert((*key).to_string(), value.clone());
            }
        }
        self.advance();
        Ok(())
    }

    /// Convenience alias: select every diff entry.
    pub fn apply_all(&mut self) -> Result<(), WorkflowError> {
        let keys: Vec<String> = self.diff_entries()?.into_iter().map(|e| e.key).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.apply_selected(&refs)
    }

    /// Decline every suggestion and move on.
    pub fn skip_apply(&mut self) -> Result<(), WorkflowError> {
        self.expect_step("APPLY_METADATA")?;
        self.advance();
        Ok(())
    }

    /// Provider assets offered on the SELECT_IMAGE step, filtered to
    /// images. The local-file option is always available regardless.
    pub fn image_candidates(&self) -> Vec<&AssetRef> {
        self.session
            .lookup
            .as_ref()
            .map(|l| l.image_assets())
            .unwrap_or_default()
    }

    /// Record the image selection and move on.
    pub fn choose_image(&mut self, choice: ImageChoice) -> Result<(), WorkflowError> {
        self.expect_step("SELECT_IMAGE")?;
        self.session.image = Some(choice);
        self.advance();
        Ok(())
    }

    /// Skip image selection; any earlier selection is cleared.
    pub fn skip_image(&mut self) -> Result<(), WorkflowError> {
        self.expect_step("SELECT_IMAGE")?;
        self.session.image = None;
        self.advance();
        Ok(())
    }

    /// Merge review-form edits into the accumulated attributes without
    /// advancing. Used by the SAVE_ITEM review form.
    pub fn update_attributes(&mut self, values: Attributes) {
        self.merge_attributes(values);
    }

    /// The image follow-up the save must perform after creation, if
    /// the user selected one.
    pub fn image_follow_up(&self) -> Option<&ImageChoice> {
        self.session.image.as_ref()
    }

    /// Start the SAVE_ITEM step: build the creation draft from the
    /// accumulated attributes. A deprecated lifecycle state is not
    /// assignable to new items.
    pub fn begin_save(
        &self,
        collection_id: Option<String>,
        state_key: Option<String>,
    ) -> Result<(SessionToken, ItemDraft), WorkflowError> {
        self.expect_step("SAVE_ITEM")?;
        if let Some(key) = &state_key {
            let selectable = self
                .contract
                .selectable_states()
                .iter()
                .any(|s| &s.key == key);
            if !selectable {
                return Err(WorkflowError::StateNotSelectable(key.clone()));
            }
        }
        let draft = ItemDraft {
            module_id: self.contract.key.clone(),
            collection_id,
            attributes: self.session.attributes.clone(),
            state_key,
        };
        Ok((self.token(), draft))
    }

    /// Mark the session complete with the persisted item. Returns
    /// `false` for a stale token: the item exists server-side but this
    /// session moved on, so the result must be discarded by the host.
    pub fn complete_save(&mut self, token: SessionToken) -> bool {
        if !self.token_is_current(token) {
            debug!("stale save result discarded; session not completed");
            return false;
        }
        self.session.step_index = self.steps.len();
        self.bump_epoch();
        debug!(workflow = %self.workflow_key, "workflow session complete");
        true
    }

    /// Persist the item and perform the image follow-up: exactly one
    /// of set-image-from-url or upload, never both, and only after
    /// creation succeeded. On [`SaveError::ImageAttach`] the item
    /// already exists and is not rolled back; the session stays on the
    /// save step and nothing retries automatically.
    ///
    /// A stale token fails with [`SaveError::StaleSession`] before
    /// anything is sent: the draft belongs to a step the session has
    /// since left and must not reach the server.
    pub async fn finish_save(
        &mut self,
        items: &dyn ItemService,
        token: SessionToken,
        draft: ItemDraft,
    ) -> Result<Item, SaveError> {
        if !self.token_is_current(token) {
            debug!("stale save token; draft discarded before send");
            return Err(SaveError::StaleSession);
        }
        let created = items.create_item(&draft).await?;
        let item = match self.session.image.clone() {
            Some(ImageChoice::ProviderUrl { url }) => {
                match items.set_image_url(created.id, &url).await {
                    Ok(updated) => updated,
                    Err(source) => {
                        return Err(SaveError::ImageAttach {
                            item: Box::new(created),
                            source,
                        })
                    }
                }
            }
            Some(ImageChoice::LocalFile { filename, bytes }) => {
                match items.upload_image(created.id, bytes, &filename).await {
                    Ok(updated) => updated,
                    Err(source) => {
                        return Err(SaveError::ImageAttach {
                            item: Box::new(created),
                            source,
                        })
                    }
                }
            }
            None => created,
        };
        self.complete_save(token);
        Ok(item)
    }

    /// Step back one step. Permitted from any step but the first;
    /// accumulated attributes are kept. In-flight tokens invalidate.
    pub fn go_prev(&mut self) -> bool {
        if self.session.step_index == 0 || self.is_complete() {
            return false;
        }
        self.session.step_index -= 1;
        self.bump_epoch();
        debug!(step_index = self.session.step_index, "stepped back");
        true
    }

    fn advance(&mut self) {
        // SAVE_ITEM completion is the only way past the last step.
        if self.session.step_index + 1 < self.steps.len() {
            self.session.step_index += 1;
            debug!(
                step_index = self.session.step_index,
                step = self.current_step().map(|s| s.kind()).unwrap_or("-"),
                "advanced"
            );
        }
        self.bump_epoch();
    }

    fn merge_attributes(&mut self, values: Attributes) {
        for (key, value) in values {
            self.session.attributes.insert(key, value);
        }
    }

    fn token(&self) -> SessionToken {
        SessionToken(self.session.epoch)
    }

    fn token_is_current(&self, token: SessionToken) -> bool {
        token.0 == self.session.epoch
    }

    fn bump_epoch(&mut self) {
        self.session.epoch = self.next_epoch;
        self.next_epoch += 1;
    }

    fn expect_step(&self, expected: &'static str) -> Result<(), WorkflowError> {
        match self.current_step() {
            Some(step) if step.kind() == expected => Ok(()),
            other => Err(self.mismatch(expected, other)),
        }
    }

    fn mismatch(&self, expected: &'static str, actual: Option<&WorkflowStep>) -> WorkflowError {
        WorkflowError::StepMismatch {
            expected,
            actual: actual.map(|s| s.kind().to_string()).unwrap_or_else(|| "COMPLETE".to_string()),
        }
    }
}

/// Attribute value as an identifier string: strings pass through,
/// numbers are formatted, anything else is not an identifier.
fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
