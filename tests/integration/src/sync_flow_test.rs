//! End-to-end guided setup flow over the in-memory fakes:
//! fetch -> reconcile -> user choices -> plan -> execute -> verify.

use std::sync::Arc;

use lore_engine::{
    Candidate, CandidateLists, CreateChoices, EngineConfig, LinkGraph, LinkGraphIndexer,
    PlanExecutor, Progress, RemoteCatalog, Side, build_plan, link_docs, reconcile,
    reset_sync_metadata,
};
use lore_model::EntityKind;
use lore_stores::{LocalStore, RemoteCharacter, RemoteFaction, RemoteItem, RemoteSession};
use lore_test_utils::{MemoryLocalStore, MemoryRemoteService, local};

const CAMPAIGN: &str = "camp1";

/// Seed a campaign mid-flight: some entities exist on both sides, some on
/// one only.
fn seed() -> (Arc<MemoryLocalStore>, Arc<MemoryRemoteService>) {
    let store = Arc::new(MemoryLocalStore::with_records([
        local::player("l-mira", "Mira"),
        local::npc("l-bram", "Bram"),
        local::location("l-keep", "Stormwatch Keep", None),
    ]));

    let remote = Arc::new(MemoryRemoteService::new());
    remote.seed_character(RemoteCharacter {
        id: "r-mira".to_string(),
        name: "Mira".to_string(),
        character_type: Some("PC".to_string()),
        description: "A quiet ranger.".to_string(),
        image_url: None,
    });
    remote.seed_character(RemoteCharacter {
        id: "r-vex".to_string(),
        name: "Vex".to_string(),
        character_type: Some("NPC".to_string()),
        description: "A smuggler with debts.".to_string(),
        image_url: None,
    });
    remote.seed_item(RemoteItem {
        id: "r-amulet".to_string(),
        name: "Amulet of the Deep".to_string(),
        description: "Hums near water.".to_string(),
        image_url: None,
    });
    remote.seed_faction(RemoteFaction {
        id: "r-circle".to_string(),
        name: "Iron Circle".to_string(),
        description: "Mercenary cartel.".to_string(),
    });
    remote.seed_session(RemoteSession {
        id: "r-s1".to_string(),
        title: "Session One".to_string(),
        date: Some("2026-02-01".parse().unwrap()),
        summary: "The party reached the keep.".to_string(),
    });

    (store, remote)
}

async fn local_candidates(store: &MemoryLocalStore) -> CandidateLists {
    let mut lists = CandidateLists::default();
    for kind in [EntityKind::Character, EntityKind::Item, EntityKind::Location] {
        let candidates: Vec<Candidate> = store
            .list(kind)
            .await
            .unwrap()
            .iter()
            .map(|record| match &record.subtype {
                Some(subtype) => Candidate::typed(&record.id, &record.name, subtype.clone()),
                None => Candidate::new(&record.id, &record.name),
            })
            .collect();
        match kind {
            EntityKind::Character => lists.characters = candidates,
            EntityKind::Item => lists.items = candidates,
            EntityKind::Location => lists.locations = candidates,
            _ => unreachable!(),
        }
    }
    lists
}

#[tokio::test]
async fn guided_setup_full_flow() {
    let (store, remote) = seed();

    // Fetch and reconcile
    let catalog = RemoteCatalog::fetch(remote.as_ref(), CAMPAIGN).await.unwrap();
    let locals = local_candidates(&store).await;
    let mut reconciliation = reconcile(&catalog.candidates(), &locals);

    // Mira matched across sides; Vex and Bram unmatched
    assert!(reconciliation.characters.is_symmetric());
    let mira = reconciliation
        .characters
        .rows(Side::Remote)
        .iter()
        .find(|row| row.name == "Mira")
        .unwrap();
    assert_eq!(mira.matched.as_deref(), Some("l-mira"));

    // The user keeps everything except the keep export
    reconciliation.locations.toggle_selected(Side::Local, "l-keep");

    // Vex gets a full local record; everything else defaults
    let mut choices = CreateChoices::new();
    choices.opt_in("r-vex");

    let plan = build_plan(&reconciliation, &catalog, &LinkGraph::default(), &choices);
    assert_eq!(plan.create_local.len(), 1); // Vex
    assert_eq!(plan.links.len(), 1); // Mira
    assert_eq!(plan.exports.len(), 1); // Bram (keep deselected)
    assert_eq!(plan.import_refs.len(), 2); // amulet + faction
    assert_eq!(plan.recaps.len(), 1);

    // Execute with progress collection
    let mut updates: Vec<Progress> = Vec::new();
    let mut sink = |p: Progress| updates.push(p);
    let executor = PlanExecutor::new(
        store.clone(),
        remote.clone(),
        EngineConfig::for_campaign(CAMPAIGN),
    );
    let report = executor.execute(plan, &mut sink).await.unwrap();

    assert!(report.failed.is_empty(), "failures: {:?}", report.failed);
    assert_eq!(report.processed, report.total);
    assert_eq!(updates.last().unwrap().processed, report.total);

    // Vex exists locally with a cross-reference
    let characters = store.list(EntityKind::Character).await.unwrap();
    let vex = characters.iter().find(|c| c.name == "Vex").unwrap();
    assert_eq!(vex.metadata.remote_id.as_deref(), Some("r-vex"));
    assert_eq!(vex.subtype.as_deref(), Some("npc"));

    // Mira is linked, not duplicated
    let mira = store.snapshot("l-mira").unwrap();
    assert_eq!(mira.metadata.remote_id.as_deref(), Some("r-mira"));
    assert_eq!(
        characters.iter().filter(|c| c.name == "Mira").count(),
        1
    );

    // Bram was exported and stamped
    let bram = store.snapshot("l-bram").unwrap();
    assert!(bram.metadata.remote_id.is_some());
    assert!(bram.metadata.fingerprint.is_some());

    // The amulet and the faction arrived as reference records; the recap
    // was created in its folder
    let journals = store.list(EntityKind::Journal).await.unwrap();
    assert!(journals.iter().any(|j| j.name == "Amulet of the Deep"));
    assert!(journals.iter().any(|j| j.name == "Iron Circle"));
    assert!(
        journals
            .iter()
            .any(|j| j.name == "Session One" && j.folder.as_deref() == Some("Session Recaps"))
    );

    // The deselected keep stayed local-only
    assert_eq!(store.snapshot("l-keep").unwrap().metadata.remote_id, None);
}

#[tokio::test]
async fn relationship_edges_are_mirrored_to_the_service_once() {
    let (store, remote) = seed();

    // Mira carries the amulet's local counterpart; link them first
    let amulet_id = {
        let catalog = RemoteCatalog::fetch(remote.as_ref(), CAMPAIGN).await.unwrap();
        let locals = local_candidates(&store).await;
        let reconciliation = reconcile(&catalog.candidates(), &locals);
        let plan = build_plan(
            &reconciliation,
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );
        let executor = PlanExecutor::new(
            store.clone(),
            remote.clone(),
            EngineConfig::for_campaign(CAMPAIGN),
        );
        let mut sink = |_: Progress| {};
        executor.execute(plan, &mut sink).await.unwrap();

        store
            .list(EntityKind::Journal)
            .await
            .unwrap()
            .iter()
            .find(|j| j.name == "Amulet of the Deep")
            .unwrap()
            .id
            .clone()
    };

    link_docs(store.as_ref(), "l-mira", &amulet_id).await.unwrap();
    let graph = LinkGraphIndexer::rebuild(store.as_ref()).await.unwrap();
    assert!(graph.outbound("l-mira").is_some());

    // A second pass mirrors the edge as a remote link; a third adds nothing
    for _ in 0..2 {
        let catalog = RemoteCatalog::fetch(remote.as_ref(), CAMPAIGN).await.unwrap();
        let locals = local_candidates(&store).await;
        let reconciliation = reconcile(&catalog.candidates(), &locals);
        let plan = build_plan(&reconciliation, &catalog, &graph, &CreateChoices::new());
        let executor = PlanExecutor::new(
            store.clone(),
            remote.clone(),
            EngineConfig::for_campaign(CAMPAIGN),
        );
        let mut sink = |_: Progress| {};
        let report = executor.execute(plan, &mut sink).await.unwrap();
        assert!(report.failed.is_empty());
    }

    assert_eq!(remote.link_count(), 2); // mira -> amulet and amulet -> mira
}

#[tokio::test]
async fn reset_clears_only_engine_metadata_and_is_idempotent() {
    let (store, remote) = seed();

    let catalog = RemoteCatalog::fetch(remote.as_ref(), CAMPAIGN).await.unwrap();
    let locals = local_candidates(&store).await;
    let reconciliation = reconcile(&catalog.candidates(), &locals);
    let plan = build_plan(
        &reconciliation,
        &catalog,
        &LinkGraph::default(),
        &CreateChoices::new(),
    );
    let executor = PlanExecutor::new(
        store.clone(),
        remote.clone(),
        EngineConfig::for_campaign(CAMPAIGN),
    );
    let mut sink = |_: Progress| {};
    executor.execute(plan, &mut sink).await.unwrap();

    let touched = reset_sync_metadata(store.as_ref()).await.unwrap();
    assert!(touched > 0);

    // Engine fields are gone; host fields survive
    let mira = store.snapshot("l-mira").unwrap();
    assert!(mira.metadata.is_empty());
    assert_eq!(mira.name, "Mira");
    assert_eq!(mira.subtype.as_deref(), Some("player"));

    // Second reset finds nothing
    assert_eq!(reset_sync_metadata(store.as_ref()).await.unwrap(), 0);
}
