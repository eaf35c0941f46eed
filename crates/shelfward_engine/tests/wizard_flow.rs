//! End-to-end wizard runs against fake services.
//!
//! These drive the full contract-to-saved-item path: form submission,
//! provider lookup, suggestion apply, image selection, and persistence
//! with its image follow-up, without any UI or network.

use serde_json::{json, Value};
use shelfward_contract::{
    Attributes, Contract, Field, FieldType, Identifier, Item, ItemId, LifecycleState, ProviderRef,
    Workflow, WorkflowStep,
};
use shelfward_engine::{FormModel, ImageChoice, SaveError, WorkflowRunner};
use shelfward_protocol::{
    AssetRef, ItemDraft, ItemService, LookupError, LookupRequest, LookupResponse, MetadataService,
    ProviderResult, ServiceError,
};
use std::sync::Mutex;

fn attrs(pairs: &[(&str, Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn book_contract() -> Contract {
    Contract::new("books", "Books")
        .with_field(Field::new("title", "Title", FieldType::Text).required())
        .with_field(Field::new("author", "Author", FieldType::Text))
        .with_field(Field::new("isbn", "ISBN", FieldType::Text).with_identifier("isbn_13"))
        .with_state(LifecycleState::new("owned", "Owned"))
        .with_provider(ProviderRef::new("openlib", "Open Library"))
        .with_workflow(Workflow::new(
            "quick_add",
            "Quick add",
            vec![
                WorkflowStep::PromptAny {
                    fields: vec!["isbn".to_string()],
                },
                WorkflowStep::LookupMetadata {
                    providers: Vec::new(),
                },
                WorkflowStep::ApplyMetadata,
                WorkflowStep::SaveItem,
            ],
        ))
}

/// Canned lookup service recording what it was asked.
struct FakeMetadata {
    response: LookupResponse,
    requests: Mutex<Vec<LookupRequest>>,
}

impl FakeMetadata {
    fn returning(response: LookupResponse) -> Self {
        Self {
            response,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl MetadataService for FakeMetadata {
    async fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse, LookupError> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

#[derive(Default)]
struct FakeItems {
    fail_image_attach: bool,
    created: Mutex<Vec<ItemDraft>>,
    image_urls: Mutex<Vec<String>>,
    uploads: Mutex<Vec<String>>,
}

fn item_from_draft(draft: &ItemDraft) -> Item {
    Item {
        id: ItemId::new(),
        collection_id: draft.collection_id.clone(),
        module_id: draft.module_id.clone(),
        state_key: draft.state_key.clone(),
        attributes: draft.attributes.clone(),
        identifiers: Vec::new(),
    }
}

#[async_trait::async_trait]
impl ItemService for FakeItems {
    async fn create_item(&self, draft: &ItemDraft) -> Result<Item, ServiceError> {
        self.created.lock().unwrap().push(draft.clone());
        Ok(item_from_draft(draft))
    }

    async fn set_image_url(&self, item_id: ItemId, url: &str) -> Result<Item, ServiceError> {
        if self.fail_image_attach {
            return Err(ServiceError::Transport("image host unreachable".to_string()));
        }
        self.image_urls.lock().unwrap().push(url.to_string());
        Ok(Item {
            id: item_id,
            collection_id: None,
            module_id: "books".to_string(),
            state_key: None,
            attributes: Attributes::new(),
            identifiers: Vec::new(),
        })
    }

    async fn upload_image(
        &self,
        item_id: ItemId,
        _bytes: Vec<u8>,
        filename: &str,
    ) -> Result<Item, ServiceError> {
        self.uploads.lock().unwrap().push(filename.to_string());
        Ok(Item {
            id: item_id,
            collection_id: None,
            module_id: "books".to_string(),
            state_key: None,
            attributes: Attributes::new(),
            identifiers: Vec::new(),
        })
    }
}

/// Scenario: one required TEXT field. An empty submission surfaces a
/// validation error and hands nothing back; a filled one submits.
#[test]
fn required_title_blocks_then_allows_submission() {
    let contract = Contract::new("books", "Books")
        .with_field(Field::new("title", "Title", FieldType::Text).required());

    let mut form = FormModel::for_contract(&contract, Attributes::new());
    form.set_value("title", json!(""));
    assert!(form.submit().is_err());
    assert!(form.error("title").is_some());

    form.set_value("title", json!("Dune"));
    let values = form.submit().expect("valid form submits");
    assert_eq!(values.get("title"), Some(&json!("Dune")));
}

/// Scenario: isbn prompt, lookup, apply, synthesized image step, save.
#[tokio::test]
async fn quick_add_wizard_runs_end_to_end() {
    let metadata = FakeMetadata::returning(LookupResponse {
        results: vec![ProviderResult::new("openlib")
            .with_values(attrs(&[("title", json!("Dune"))]))
            .with_asset(AssetRef::image("https://covers/dune.jpg", "openlib"))],
        ..LookupResponse::default()
    });
    let items = FakeItems::default();

    let mut runner = WorkflowRunner::new(book_contract(), "quick_add").unwrap();
    runner
        .submit_prompt_any(attrs(&[("isbn", json!("9780441013593"))]))
        .unwrap();

    runner.run_lookup(&metadata).await.unwrap();
    let sent = metadata.requests.lock().unwrap();
    assert_eq!(
        sent[0].identifiers,
        vec![Identifier::new("isbn_13", "9780441013593")]
    );
    drop(sent);

    // The provider suggested a title the user never typed.
    let diff = runner.diff_entries().unwrap();
    assert!(diff.iter().any(|e| e.key == "title" && e.current.is_none()));
    runner.apply_all().unwrap();
    assert_eq!(runner.attributes().get("title"), Some(&json!("Dune")));

    // Arrived at the synthesized SELECT_IMAGE step.
    assert_eq!(runner.current_step(), Some(&WorkflowStep::SelectImage));
    let candidates = runner.image_candidates();
    assert_eq!(candidates.len(), 1);
    let url = candidates[0].url.clone();
    runner
        .choose_image(ImageChoice::ProviderUrl { url })
        .unwrap();

    assert_eq!(runner.current_step(), Some(&WorkflowStep::SaveItem));
    let (token, draft) = runner.begin_save(None, Some("owned".to_string())).unwrap();
    let saved = runner.finish_save(&items, token, draft).await.unwrap();

    assert!(runner.is_complete());
    assert_eq!(saved.module_id, "books");
    assert_eq!(
        items.created.lock().unwrap()[0].attributes.get("title"),
        Some(&json!("Dune"))
    );
    // Exactly one image follow-up, the URL one.
    assert_eq!(
        items.image_urls.lock().unwrap().as_slice(),
        ["https://covers/dune.jpg"]
    );
    assert!(items.uploads.lock().unwrap().is_empty());
}

/// Scenario: two providers, no designated best - the later one wins.
#[tokio::test]
async fn later_provider_wins_merge_without_best() {
    let metadata = FakeMetadata::returning(LookupResponse {
        results: vec![
            ProviderResult::new("a").with_values(attrs(&[("author", json!("A"))])),
            ProviderResult::new("b").with_values(attrs(&[("author", json!("B"))])),
        ],
        ..LookupResponse::default()
    });

    let mut runner = WorkflowRunner::new(book_contract(), "quick_add").unwrap();
    runner
        .submit_prompt_any(attrs(&[("isbn", json!("9780441013593"))]))
        .unwrap();
    runner.run_lookup(&metadata).await.unwrap();

    runner.apply_all().unwrap();
    assert_eq!(runner.attributes().get("author"), Some(&json!("B")));
}

/// Partial persistence: creation succeeds, image attach fails. The
/// item stays created, the session stays on the save step, and the
/// error carries the orphaned item for the host to surface.
#[tokio::test]
async fn image_attach_failure_keeps_created_item() {
    let items = FakeItems {
        fail_image_attach: true,
        ..FakeItems::default()
    };

    let mut runner = WorkflowRunner::new(book_contract(), "quick_add").unwrap();
    runner
        .submit_prompt_any(attrs(&[("isbn", json!("9780441013593"))]))
        .unwrap();
    let (token, _req) = runner.begin_lookup().unwrap();
    runner.complete_lookup(token, LookupResponse::default());
    runner.skip_apply().unwrap();
    runner
        .choose_image(ImageChoice::ProviderUrl {
            url: "https://covers/dune.jpg".to_string(),
        })
        .unwrap();

    let (token, draft) = runner.begin_save(None, None).unwrap();
    let err = runner.finish_save(&items, token, draft).await.unwrap_err();

    match err {
        SaveError::ImageAttach { item, .. } => {
            assert_eq!(item.module_id, "books");
        }
        other => panic!("expected ImageAttach, got {other:?}"),
    }
    // Item was created server-side and is not rolled back.
    assert_eq!(items.created.lock().unwrap().len(), 1);
    // The session did not complete; the user may retry or back out.
    assert!(!runner.is_complete());
    assert_eq!(runner.current_step(), Some(&WorkflowStep::SaveItem));
}

/// Scenario: the user backs out of the save step while the service
/// call would be in flight. The stale token withdraws the draft:
/// nothing reaches the service and the session does not complete.
#[tokio::test]
async fn backing_out_of_save_withdraws_the_draft() {
    let items = FakeItems::default();

    let mut runner = WorkflowRunner::new(book_contract(), "quick_add").unwrap();
    runner
        .submit_prompt_any(attrs(&[("isbn", json!("9780441013593"))]))
        .unwrap();
    let (token, _req) = runner.begin_lookup().unwrap();
    runner.complete_lookup(token, LookupResponse::default());
    runner.skip_apply().unwrap();
    runner.skip_image().unwrap();

    let (token, draft) = runner.begin_save(None, Some("owned".to_string())).unwrap();
    // The user hits "back" before the call goes out.
    assert!(runner.go_prev());

    let err = runner.finish_save(&items, token, draft).await.unwrap_err();
    assert!(matches!(err, SaveError::StaleSession));
    // No item was created and the session is back on the image step.
    assert!(items.created.lock().unwrap().is_empty());
    assert!(!runner.is_complete());
    assert_eq!(runner.current_step(), Some(&WorkflowStep::SelectImage));
}

/// A local file upload is the mutually exclusive alternative to the
/// provider URL.
#[tokio::test]
async fn local_file_choice_uses_upload_only() {
    let items = FakeItems::default();

    let mut runner = WorkflowRunner::new(book_contract(), "quick_add").unwrap();
    runner
        .submit_prompt_any(attrs(&[("isbn", json!("9780441013593"))]))
        .unwrap();
    let (token, _req) = runner.begin_lookup().unwrap();
    runner.complete_lookup(token, LookupResponse::default());
    runner.skip_apply().unwrap();
    runner
        .choose_image(ImageChoice::LocalFile {
            filename: "cover.png".to_string(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        })
        .unwrap();

    let (token, draft) = runner.begin_save(None, None).unwrap();
    runner.finish_save(&items, token, draft).await.unwrap();

    assert_eq!(items.uploads.lock().unwrap().as_slice(), ["cover.png"]);
    assert!(items.image_urls.lock().unwrap().is_empty());
}
