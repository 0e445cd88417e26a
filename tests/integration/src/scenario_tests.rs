//! Focused scenarios: the canonical one-character matching case and the
//! opportunistic importer path (extract -> map -> fingerprint).

use std::sync::Arc;

use lore_engine::{
    CandidateLists, CreateChoices, Extractor, LinkGraph, PresetRegistry, RemoteCatalog,
    build_plan, fingerprint, map, reconcile,
};
use lore_engine::Candidate;
use lore_model::EntityKind;
use lore_stores::{LocalStore, RemoteCharacter};
use lore_test_utils::{MemoryLocalStore, MemoryRemoteService, local};
use pretty_assertions::assert_eq;

const CAMPAIGN: &str = "camp1";

fn remote_with_character(name: &str) -> Arc<MemoryRemoteService> {
    let remote = Arc::new(MemoryRemoteService::new());
    remote.seed_character(RemoteCharacter {
        id: "r-mira".to_string(),
        name: name.to_string(),
        character_type: Some("PC".to_string()),
        description: String::new(),
        image_url: None,
    });
    remote
}

fn mira_locals() -> CandidateLists {
    CandidateLists {
        characters: vec![Candidate::typed("l-mira", "Mira", "player")],
        ..Default::default()
    }
}

#[tokio::test]
async fn matching_names_produce_one_pair_and_an_empty_plan() {
    let remote = remote_with_character("Mira");
    let catalog = RemoteCatalog::fetch(remote.as_ref(), CAMPAIGN).await.unwrap();

    let reconciliation = reconcile(&catalog.candidates(), &mira_locals());

    let remote_row = &reconciliation.characters.remote[0];
    let local_row = &reconciliation.characters.local[0];
    assert_eq!(remote_row.matched.as_deref(), Some("l-mira"));
    assert_eq!(local_row.matched.as_deref(), Some("r-mira"));
    assert!(remote_row.selected && local_row.selected);

    let plan = build_plan(
        &reconciliation,
        &catalog,
        &LinkGraph::default(),
        &CreateChoices::new(),
    );
    assert!(plan.create_local.is_empty());
    assert!(plan.import_refs.is_empty());
    assert!(plan.exports.is_empty());
    assert_eq!(plan.links.len(), 1);
}

#[tokio::test]
async fn renamed_remote_becomes_an_import_candidate() {
    let remote = remote_with_character("Mira K.");
    let catalog = RemoteCatalog::fetch(remote.as_ref(), CAMPAIGN).await.unwrap();

    let reconciliation = reconcile(&catalog.candidates(), &mira_locals());
    assert_eq!(reconciliation.characters.remote[0].matched, None);

    let plan = build_plan(
        &reconciliation,
        &catalog,
        &LinkGraph::default(),
        &CreateChoices::new(),
    );
    assert_eq!(plan.import_refs.len(), 1);
    assert_eq!(plan.import_refs[0].name, "Mira K.");
}

#[tokio::test]
async fn importer_path_skips_unchanged_records() {
    let mut mira = local::player("l-mira", "Mira");
    mira.attributes.insert(
        "description".to_string(),
        serde_json::json!("<p>A quiet ranger.</p>"),
    );
    let store = MemoryLocalStore::with_records([mira]);

    // First pass: extract, classify, fingerprint, stamp
    let entities = Extractor::new().extract_all(&store).await.unwrap();
    assert_eq!(entities.len(), 1);

    let registry = PresetRegistry::with_builtins();
    let preset = registry.for_system(None).unwrap();
    let proposal = map(&entities[0], preset).unwrap();
    assert_eq!(proposal.target, EntityKind::Character);
    assert_eq!(proposal.labels, vec!["PC"]);
    assert!(proposal.score > 0.5);
    assert_eq!(
        proposal.payload.get("description").map(String::as_str),
        Some("A quiet ranger.")
    );

    let first_print = fingerprint(&entities[0]);
    store.set_fingerprint("l-mira", &first_print).await.unwrap();

    // Second pass over unchanged content: fingerprint agrees, no work
    let entities = Extractor::new().extract_all(&store).await.unwrap();
    let second_print = fingerprint(&entities[0]);
    assert_eq!(second_print, first_print);
    assert_eq!(
        store.snapshot("l-mira").unwrap().metadata.fingerprint,
        Some(first_print)
    );

    // An edit invalidates the stored print
    let mut edited = store.snapshot("l-mira").unwrap();
    edited.attributes.insert(
        "description".to_string(),
        serde_json::json!("<p>A loud ranger.</p>"),
    );
    store.insert(edited);

    let entities = Extractor::new().extract_all(&store).await.unwrap();
    let third_print = fingerprint(&entities[0]);
    assert_ne!(third_print, second_print);
}

#[tokio::test]
async fn malformed_records_do_not_abort_extraction() {
    let store = MemoryLocalStore::with_records([
        local::player("l-ok", "Mira"),
        local::player("l-broken", "   "),
    ]);

    let entities = Extractor::new().extract_all(&store).await.unwrap();
    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].name, "Mira");
}
