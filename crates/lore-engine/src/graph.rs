//! Link graph indexing
//!
//! Builds an in-memory directional adjacency index over all entities from
//! their persisted relationship metadata, plus a locations-only
//! parent/child tree with precomputed ancestor chains.
//!
//! The graph is a derived, rebuildable cache: record metadata stays the
//! source of truth, and any operation that changes relationship metadata
//! invalidates the whole graph. There is no incremental patching — callers
//! rebuild and swap. A snapshot must be treated as possibly stale until the
//! next rebuild.

use std::collections::{HashMap, HashSet};

use lore_model::{EntityKind, RelationshipBuckets};
use lore_stores::{LocalRecord, LocalStore, list_all};

use crate::Result;

/// The derived relationship index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkGraph {
    outbound: HashMap<String, RelationshipBuckets>,
    children: HashMap<String, Vec<String>>,
    ancestors: HashMap<String, Vec<String>>,
}

impl LinkGraph {
    /// Outbound adjacency for one entity. O(1).
    pub fn outbound(&self, id: &str) -> Option<&RelationshipBuckets> {
        self.outbound.get(id)
    }

    /// Child locations of a location. O(1).
    pub fn children_of(&self, location_id: &str) -> &[String] {
        self.children
            .get(location_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Ancestor chain of a location, in root-to-parent order. O(1).
    pub fn ancestors_of(&self, location_id: &str) -> &[String] {
        self.ancestors
            .get(location_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True if `ancestor_id` appears in `location_id`'s ancestor chain.
    pub fn is_ancestor(&self, ancestor_id: &str, location_id: &str) -> bool {
        self.ancestors_of(location_id)
            .iter()
            .any(|id| id == ancestor_id)
    }

    /// Ids of every entity with any outbound adjacency, in no particular order.
    pub fn outbound_ids(&self) -> impl Iterator<Item = &String> {
        self.outbound.keys()
    }

    /// Number of entities with any outbound adjacency.
    pub fn len(&self) -> usize {
        self.outbound.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty()
    }
}

/// Builds [`LinkGraph`] snapshots from record metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkGraphIndexer;

impl LinkGraphIndexer {
    /// Build a graph from an already-loaded record set. O(n) in record count.
    pub fn build(records: &[LocalRecord]) -> LinkGraph {
        let kind_by_id: HashMap<&str, EntityKind> = records
            .iter()
            .map(|record| (record.id.as_str(), record.kind))
            .collect();

        let mut graph = LinkGraph::default();

        for record in records {
            let buckets = effective_buckets(record, &kind_by_id);
            if !buckets.is_empty() {
                graph.outbound.insert(record.id.clone(), buckets);
            }

            if record.kind == EntityKind::Location
                && let Some(parent) = &record.metadata.parent_location_id
            {
                graph
                    .children
                    .entry(parent.clone())
                    .or_default()
                    .push(record.id.clone());
            }
        }

        // Deterministic child ordering regardless of listing order
        for children in graph.children.values_mut() {
            children.sort_unstable();
        }

        let parent_by_id: HashMap<&str, &str> = records
            .iter()
            .filter(|record| record.kind == EntityKind::Location)
            .filter_map(|record| {
                record
                    .metadata
                    .parent_location_id
                    .as_deref()
                    .map(|parent| (record.id.as_str(), parent))
            })
            .collect();

        for record in records.iter().filter(|r| r.kind == EntityKind::Location) {
            graph
                .ancestors
                .insert(record.id.clone(), ancestor_chain(&record.id, &parent_by_id));
        }

        graph
    }

    /// Rebuild the whole graph from the store. Idempotent: replaces, never
    /// patches.
    pub async fn rebuild(store: &dyn LocalStore) -> Result<LinkGraph> {
        let records = list_all(store).await?;
        Ok(Self::build(&records))
    }
}

/// Pick the adjacency source for one record: the directional outbound field
/// when present, the legacy symmetric refs field as fallback, and when both
/// are absent a superset fabricated from the record's local cross-references
/// (bucketed by each target's actual kind; unknown targets land in the
/// entries bucket).
fn effective_buckets(
    record: &LocalRecord,
    kind_by_id: &HashMap<&str, EntityKind>,
) -> RelationshipBuckets {
    if !record.metadata.relationship_outbound.is_empty() {
        return record.metadata.relationship_outbound.clone();
    }
    if !record.metadata.relationship_refs.is_empty() {
        return record.metadata.relationship_refs.clone();
    }

    let mut fabricated = RelationshipBuckets::default();
    for reference in &record.metadata.local_cross_references {
        let kind = kind_by_id
            .get(reference.as_str())
            .copied()
            .unwrap_or(EntityKind::Journal);
        fabricated.add(kind, reference.clone());
    }
    fabricated
}

/// Walk the parent chain for one location, returning ancestors in
/// root-to-parent order. A cycle in the persisted metadata (possible under
/// concurrent edits) stops the walk instead of recursing forever.
fn ancestor_chain(location_id: &str, parent_by_id: &HashMap<&str, &str>) -> Vec<String> {
    let mut chain = Vec::new();
    let mut seen: HashSet<&str> = HashSet::from([location_id]);
    let mut current = location_id;

    while let Some(parent) = parent_by_id.get(current) {
        if !seen.insert(parent) {
            tracing::warn!(
                location = %location_id,
                at = %parent,
                "Cycle in location hierarchy; truncating ancestor chain"
            );
            break;
        }
        chain.push((*parent).to_string());
        current = parent;
    }

    chain.reverse();
    chain
}

/// Record a mutual link between two records' outbound buckets.
///
/// Both sides' metadata is updated; the caller rebuilds the graph after.
pub async fn link_docs(store: &dyn LocalStore, a_id: &str, b_id: &str) -> Result<()> {
    let a = store.get(a_id).await?;
    let b = store.get(b_id).await?;

    let mut a_buckets = a.metadata.relationship_outbound.clone();
    a_buckets.add(b.kind, b_id);
    store.set_relationship_metadata(a_id, a_buckets).await?;

    let mut b_buckets = b.metadata.relationship_outbound.clone();
    b_buckets.add(a.kind, a_id);
    store.set_relationship_metadata(b_id, b_buckets).await?;

    Ok(())
}

/// Remove a mutual link, restoring both records' buckets to their pre-link
/// state for that pair.
pub async fn unlink_docs(store: &dyn LocalStore, a_id: &str, b_id: &str) -> Result<()> {
    let a = store.get(a_id).await?;
    let b = store.get(b_id).await?;

    let mut a_buckets = a.metadata.relationship_outbound.clone();
    a_buckets.remove(b.kind, b_id);
    store.set_relationship_metadata(a_id, a_buckets).await?;

    let mut b_buckets = b.metadata.relationship_outbound.clone();
    b_buckets.remove(a.kind, a_id);
    store.set_relationship_metadata(b_id, b_buckets).await?;

    Ok(())
}

/// Set or clear a location's parent, refusing a reparent that would make
/// the location its own ancestor.
///
/// The prospective parent's chain is walked against live store metadata
/// before committing; the walk stops (rather than recursing forever) if it
/// runs into an existing cycle. This is best-effort avoidance, not a
/// transactional guarantee — concurrent edits from other users can still
/// race. Returns false when the reparent was refused.
pub async fn set_parent(
    store: &dyn LocalStore,
    child_id: &str,
    parent_id: Option<&str>,
) -> Result<bool> {
    if let Some(parent_id) = parent_id {
        if parent_id == child_id {
            tracing::warn!(location = %child_id, "Refusing to parent a location to itself");
            return Ok(false);
        }

        let mut seen: HashSet<String> = HashSet::from([parent_id.to_string()]);
        let mut current = parent_id.to_string();
        loop {
            let Some(next) = lore_stores::metadata_or_default(store, &current)
                .await?
                .parent_location_id
            else {
                break;
            };
            if next == child_id {
                tracing::warn!(
                    location = %child_id,
                    parent = %parent_id,
                    "Refusing reparent: prospective parent is a descendant"
                );
                return Ok(false);
            }
            if !seen.insert(next.clone()) {
                // Pre-existing cycle above the parent; stop walking
                break;
            }
            current = next;
        }
    }

    store.set_parent_location(child_id, parent_id).await?;
    Ok(true)
}
