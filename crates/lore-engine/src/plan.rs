//! Sync plan building
//!
//! Converts finalized reconciliation rows plus the user's "also create
//! locally" choices into the ordered batch of operations the executor
//! runs. A plan is built once and consumed exactly once.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use lore_model::EntityKind;
use lore_stores::{
    RemoteCharacter, RemoteFaction, RemoteItem, RemoteLocation, RemoteService, RemoteSession,
};

use crate::Result;
use crate::graph::LinkGraph;
use crate::reconcile::{Candidate, CandidateLists, CategoryPairing, Reconciliation};

/// Everything fetched from the remote service for one campaign, in one pass.
#[derive(Debug, Clone, Default)]
pub struct RemoteCatalog {
    pub characters: Vec<RemoteCharacter>,
    pub items: Vec<RemoteItem>,
    pub locations: Vec<RemoteLocation>,
    pub factions: Vec<RemoteFaction>,
    pub sessions: Vec<RemoteSession>,
}

impl RemoteCatalog {
    /// Fetch every remote list for the campaign.
    pub async fn fetch(remote: &dyn RemoteService, campaign_id: &str) -> Result<Self> {
        Ok(Self {
            characters: remote.list_characters(campaign_id).await?,
            items: remote.list_items(campaign_id).await?,
            locations: remote.list_locations(campaign_id).await?,
            factions: remote.list_factions(campaign_id).await?,
            sessions: remote.list_sessions(campaign_id).await?,
        })
    }

    /// Project the reconcilable lists into matching candidates.
    pub fn candidates(&self) -> CandidateLists {
        CandidateLists {
            characters: self
                .characters
                .iter()
                .map(|c| match &c.character_type {
                    Some(character_type) => {
                        Candidate::typed(&c.id, &c.name, character_type.clone())
                    }
                    None => Candidate::new(&c.id, &c.name),
                })
                .collect(),
            items: self
                .items
                .iter()
                .map(|i| Candidate::new(&i.id, &i.name))
                .collect(),
            locations: self
                .locations
                .iter()
                .map(|l| Candidate::new(&l.id, &l.name))
                .collect(),
            factions: self
                .factions
                .iter()
                .map(|f| Candidate::new(&f.id, &f.name))
                .collect(),
        }
    }
}

/// Per-record "also create locally" opt-ins, collected in a separate wizard
/// step after matching.
#[derive(Debug, Clone, Default)]
pub struct CreateChoices {
    create_locally: HashSet<String>,
}

impl CreateChoices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opt a remote-only record into full local creation.
    pub fn opt_in(&mut self, remote_id: impl Into<String>) -> &mut Self {
        self.create_locally.insert(remote_id.into());
        self
    }

    pub fn is_opted_in(&self, remote_id: &str) -> bool {
        self.create_locally.contains(remote_id)
    }
}

/// Create a full local record for a remote-only entity (opted in).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateLocalJob {
    pub kind: EntityKind,
    pub remote_id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Import a remote-only entity as a lightweight reference record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRefJob {
    pub kind: EntityKind,
    pub remote_id: String,
    pub name: String,
    pub description: String,
}

/// Create or update a session recap record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecapJob {
    pub session_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub summary: String,
}

/// Create a remote record for a local-only entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportJob {
    pub kind: EntityKind,
    pub local_id: String,
    pub name: String,
}

/// Record the cross-reference between a matched local/remote pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkJob {
    pub kind: EntityKind,
    pub local_id: String,
    pub remote_id: String,
}

/// Mirror one local relationship edge as a remote link resource.
///
/// Endpoints are local ids; the executor resolves them to remote ids at run
/// time, since exports mint remote ids only during execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteLinkJob {
    pub from_local_id: String,
    pub to_local_id: String,
    pub link_type: String,
}

/// Import/export/link totals for one kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounters {
    pub imported: usize,
    pub exported: usize,
    pub linked: usize,
}

/// The ordered batch of operations produced from a reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncPlan {
    /// Phase 1: full local records for opted-in remote-only entities
    pub create_local: Vec<CreateLocalJob>,
    /// Phase 2: lightweight reference imports
    pub import_refs: Vec<ImportRefJob>,
    /// Phase 3: session recaps, ascending by date (undated last)
    pub recaps: Vec<RecapJob>,
    /// Phase 4a: exports of local-only entities
    pub exports: Vec<ExportJob>,
    /// Phase 4b: cross-reference writes for matched pairs
    pub links: Vec<LinkJob>,
    /// Phase 4c: relationship edges mirrored to the remote link resource
    pub remote_links: Vec<RemoteLinkJob>,
    /// Totals per kind, for display
    pub counters: BTreeMap<EntityKind, KindCounters>,
}

impl SyncPlan {
    /// Number of jobs the executor will process.
    pub fn total_jobs(&self) -> usize {
        self.create_local.len()
            + self.import_refs.len()
            + self.recaps.len()
            + self.exports.len()
            + self.links.len()
            + self.remote_links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_jobs() == 0
    }

    fn counter(&mut self, kind: EntityKind) -> &mut KindCounters {
        self.counters.entry(kind).or_default()
    }
}

/// Build the plan from finalized reconciliation rows, the remote catalog,
/// the relationship graph, and the user's creation opt-ins.
///
/// Per reconciled category: a selected remote row with a match becomes a
/// link; a selected remote row without a match becomes a local creation if
/// opted in, else a reference import; a selected local row without a match
/// becomes an export. Factions and sessions skip reconciliation entirely
/// and are always imported in full.
pub fn build_plan(
    reconciliation: &Reconciliation,
    catalog: &RemoteCatalog,
    graph: &LinkGraph,
    choices: &CreateChoices,
) -> SyncPlan {
    let mut plan = SyncPlan::default();

    plan_category(
        &mut plan,
        EntityKind::Character,
        &reconciliation.characters,
        choices,
        |row| {
            let character = catalog.characters.iter().find(|c| c.id == row_id(row))?;
            Some(CreateLocalJob {
                kind: EntityKind::Character,
                remote_id: character.id.clone(),
                name: character.name.clone(),
                description: character.description.clone(),
                subtype: character.character_type.as_deref().map(str::to_lowercase),
                image: character.image_url.clone(),
            })
        },
        |row| {
            catalog
                .characters
                .iter()
                .find(|c| c.id == row_id(row))
                .map(|c| c.description.clone())
        },
    );

    plan_category(
        &mut plan,
        EntityKind::Item,
        &reconciliation.items,
        choices,
        |row| {
            let item = catalog.items.iter().find(|i| i.id == row_id(row))?;
            Some(CreateLocalJob {
                kind: EntityKind::Item,
                remote_id: item.id.clone(),
                name: item.name.clone(),
                description: item.description.clone(),
                subtype: None,
                image: item.image_url.clone(),
            })
        },
        |row| {
            catalog
                .items
                .iter()
                .find(|i| i.id == row_id(row))
                .map(|i| i.description.clone())
        },
    );

    plan_category(
        &mut plan,
        EntityKind::Location,
        &reconciliation.locations,
        choices,
        |row| {
            let location = catalog.locations.iter().find(|l| l.id == row_id(row))?;
            Some(CreateLocalJob {
                kind: EntityKind::Location,
                remote_id: location.id.clone(),
                name: location.name.clone(),
                description: location.description.clone(),
                subtype: None,
                image: location.image_url.clone(),
            })
        },
        |row| {
            catalog
                .locations
                .iter()
                .find(|l| l.id == row_id(row))
                .map(|l| l.description.clone())
        },
    );

    // Factions are import-only: no reconciliation, always imported in full.
    for faction in &catalog.factions {
        plan.import_refs.push(ImportRefJob {
            kind: EntityKind::Faction,
            remote_id: faction.id.clone(),
            name: faction.name.clone(),
            description: faction.description.clone(),
        });
        plan.counter(EntityKind::Faction).imported += 1;
    }

    // Sessions are import-only, ordered ascending by date; undated sessions
    // keep their input order at the end.
    let mut recaps: Vec<RecapJob> = catalog
        .sessions
        .iter()
        .map(|session| RecapJob {
            session_id: session.id.clone(),
            title: session.title.clone(),
            date: session.date,
            summary: session.summary.clone(),
        })
        .collect();
    recaps.sort_by_key(|recap| match recap.date {
        Some(date) => (0, date),
        None => (1, NaiveDate::MAX),
    });
    plan.counter(EntityKind::Journal).imported += recaps.len();
    plan.recaps = recaps;

    // Relationship edges become remote link mirror jobs for every source
    // entity the graph knows about. Resolution to remote ids happens at
    // execution time.
    plan.remote_links = remote_link_jobs(graph);

    plan
}

fn row_id(row: &crate::reconcile::ReconciliationRow) -> &str {
    row.id.as_str()
}

/// Shared per-category planning rules.
fn plan_category(
    plan: &mut SyncPlan,
    kind: EntityKind,
    pairing: &CategoryPairing,
    choices: &CreateChoices,
    mut create_job: impl FnMut(&crate::reconcile::ReconciliationRow) -> Option<CreateLocalJob>,
    mut describe: impl FnMut(&crate::reconcile::ReconciliationRow) -> Option<String>,
) {
    for row in pairing.remote.iter().filter(|row| row.selected) {
        match &row.matched {
            Some(local_id) => {
                plan.links.push(LinkJob {
                    kind,
                    local_id: local_id.clone(),
                    remote_id: row.id.clone(),
                });
                plan.counter(kind).linked += 1;
            }
            None if choices.is_opted_in(&row.id) => {
                if let Some(job) = create_job(row) {
                    plan.create_local.push(job);
                    plan.counter(kind).imported += 1;
                }
            }
            None => {
                plan.import_refs.push(ImportRefJob {
                    kind,
                    remote_id: row.id.clone(),
                    name: row.name.clone(),
                    description: describe(row).unwrap_or_default(),
                });
                plan.counter(kind).imported += 1;
            }
        }
    }

    for row in pairing
        .local
        .iter()
        .filter(|row| row.selected && row.matched.is_none())
    {
        plan.exports.push(ExportJob {
            kind,
            local_id: row.id.clone(),
            name: row.name.clone(),
        });
        plan.counter(kind).exported += 1;
    }
}

/// Flatten the graph's outbound adjacency into link mirror jobs.
fn remote_link_jobs(graph: &LinkGraph) -> Vec<RemoteLinkJob> {
    let mut jobs = Vec::new();
    let mut from_ids: Vec<&String> = graph.outbound_ids().collect();
    from_ids.sort_unstable();

    for from_id in from_ids {
        let Some(buckets) = graph.outbound(from_id) else {
            continue;
        };
        for kind in EntityKind::ALL {
            for to_id in buckets.bucket(kind) {
                jobs.push(RemoteLinkJob {
                    from_local_id: from_id.clone(),
                    to_local_id: to_id.clone(),
                    link_type: kind.to_string(),
                });
            }
        }
    }
    jobs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{CandidateLists, reconcile};
    use pretty_assertions::assert_eq;

    fn catalog_with_characters(characters: Vec<RemoteCharacter>) -> RemoteCatalog {
        RemoteCatalog {
            characters,
            ..Default::default()
        }
    }

    fn remote_character(id: &str, name: &str, character_type: &str) -> RemoteCharacter {
        RemoteCharacter {
            id: id.to_string(),
            name: name.to_string(),
            character_type: Some(character_type.to_string()),
            description: format!("{name} description"),
            image_url: None,
        }
    }

    #[test]
    fn matched_pair_produces_only_a_link() {
        let catalog = catalog_with_characters(vec![remote_character("r1", "Mira", "PC")]);
        let local = CandidateLists {
            characters: vec![crate::reconcile::Candidate::typed("l1", "Mira", "player")],
            ..Default::default()
        };
        let reconciliation = reconcile(&catalog.candidates(), &local);

        let plan = build_plan(
            &reconciliation,
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );

        assert_eq!(plan.links.len(), 1);
        assert!(plan.create_local.is_empty());
        assert!(plan.import_refs.is_empty());
        assert!(plan.exports.is_empty());
        assert_eq!(plan.counters[&EntityKind::Character].linked, 1);
    }

    #[test]
    fn unmatched_remote_is_import_candidate() {
        let catalog = catalog_with_characters(vec![remote_character("r1", "Mira K.", "PC")]);
        let local = CandidateLists {
            characters: vec![crate::reconcile::Candidate::typed("l1", "Mira", "player")],
            ..Default::default()
        };
        let reconciliation = reconcile(&catalog.candidates(), &local);

        // Without opt-in: a reference import. The unmatched local exports.
        let plan = build_plan(
            &reconciliation,
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );
        assert_eq!(plan.import_refs.len(), 1);
        assert_eq!(plan.exports.len(), 1);
        assert!(plan.create_local.is_empty());

        // With opt-in: a full local creation instead.
        let mut choices = CreateChoices::new();
        choices.opt_in("r1");
        let plan = build_plan(&reconciliation, &catalog, &LinkGraph::default(), &choices);
        assert_eq!(plan.create_local.len(), 1);
        assert_eq!(plan.create_local[0].subtype.as_deref(), Some("pc"));
        assert!(plan.import_refs.is_empty());
    }

    #[test]
    fn deselected_rows_are_ignored() {
        let catalog = catalog_with_characters(vec![remote_character("r1", "Mira", "PC")]);
        let mut reconciliation = reconcile(&catalog.candidates(), &CandidateLists::default());
        reconciliation
            .characters
            .toggle_selected(crate::reconcile::Side::Remote, "r1");

        let plan = build_plan(
            &reconciliation,
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn factions_are_always_imported_in_full() {
        let catalog = RemoteCatalog {
            factions: vec![RemoteFaction {
                id: "f1".to_string(),
                name: "Iron Circle".to_string(),
                description: String::new(),
            }],
            ..Default::default()
        };
        let reconciliation = reconcile(&catalog.candidates(), &CandidateLists::default());

        let plan = build_plan(
            &reconciliation,
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );
        assert_eq!(plan.import_refs.len(), 1);
        assert_eq!(plan.counters[&EntityKind::Faction].imported, 1);
    }

    #[test]
    fn recaps_sort_ascending_with_undated_last() {
        let session = |id: &str, title: &str, date: Option<&str>| RemoteSession {
            id: id.to_string(),
            title: title.to_string(),
            date: date.map(|d| d.parse().unwrap()),
            summary: String::new(),
        };
        let catalog = RemoteCatalog {
            sessions: vec![
                session("s3", "Third", Some("2026-03-01")),
                session("s0", "Undated", None),
                session("s1", "First", Some("2026-01-01")),
                session("s2", "Second", Some("2026-02-01")),
            ],
            ..Default::default()
        };

        let plan = build_plan(
            &reconcile(&catalog.candidates(), &CandidateLists::default()),
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );

        let order: Vec<&str> = plan.recaps.iter().map(|r| r.session_id.as_str()).collect();
        assert_eq!(order, vec!["s1", "s2", "s3", "s0"]);
    }

    #[test]
    fn total_jobs_counts_every_phase() {
        let catalog = catalog_with_characters(vec![remote_character("r1", "Mira", "PC")]);
        let plan = build_plan(
            &reconcile(&catalog.candidates(), &CandidateLists::default()),
            &catalog,
            &LinkGraph::default(),
            &CreateChoices::new(),
        );
        assert_eq!(plan.total_jobs(), plan.import_refs.len());
    }
}
