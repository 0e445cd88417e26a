//! Reconciliation, link-graph, and sync-plan engine for Lore Sync
//!
//! Keeps a locally-editable world store and a remote campaign service in
//! agreement without duplicating records or losing manual edits on either
//! side. The engine implements:
//!
//! - **Extraction**: normalize heterogeneous local records into a uniform
//!   entity stream
//! - **Confidence mapping**: classify entities into target shapes with
//!   scored rule presets
//! - **Fingerprinting**: content hashes for idempotent re-import
//! - **Reconciliation**: duplicate-safe name/type matching between the two
//!   stores
//! - **Link graph**: a rebuildable relationship index with a cycle-safe
//!   location hierarchy
//! - **Plan execution**: ordered create/link/import batches with progress
//!   reporting and per-job failure isolation
//!
//! # Architecture
//!
//! `lore-engine` sits between the host-facing layers and the collaborator
//! interfaces:
//!
//! ```text
//!     wizard / settings UI
//!             |
//!        lore-engine
//!             |
//!      +------+------+
//!      |             |
//!  lore-stores   lore-model
//! ```
//!
//! Two flows share the same vocabulary: the opportunistic importer path
//! (extract -> map -> fingerprint -> upsert) and the guided first-time
//! setup (reconcile -> link index -> plan -> execute).

pub mod config;
pub mod error;
pub mod executor;
pub mod extract;
pub mod fingerprint;
pub mod graph;
pub mod logging;
pub mod mapping;
pub mod plan;
pub mod reconcile;
pub mod reset;
pub mod text;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use executor::{ExecutionReport, FailedJob, PlanExecutor, Progress, ProgressSink};
pub use extract::{DESCRIPTION_FALLBACKS, Extractor, extract_refs};
pub use fingerprint::{VOLATILE_KEYS, canonical_projection, fingerprint};
pub use graph::{LinkGraph, LinkGraphIndexer, link_docs, set_parent, unlink_docs};
pub use mapping::{
    FieldKind, FieldSpec, Guard, MappingPreset, MappingProposal, MappingRule, PresetRegistry, map,
};
pub use plan::{
    CreateChoices, CreateLocalJob, ExportJob, ImportRefJob, KindCounters, LinkJob, RecapJob,
    RemoteCatalog, RemoteLinkJob, SyncPlan, build_plan,
};
pub use reconcile::{
    Candidate, CandidateLists, CategoryPairing, Reconciliation, ReconciliationRow, Side,
    reconcile, reconcile_category,
};
pub use reset::reset_sync_metadata;
