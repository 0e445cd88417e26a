//! Reconciliation
//!
//! Bipartite name/type matching between a remote candidate list and a local
//! candidate list, per category. Matching is deterministic and a pure
//! function of its inputs: the same two lists always produce the same
//! pairing, which is what makes re-running sync safe.
//!
//! The user can afterwards toggle row selection and re-match rows; both
//! operations preserve the one-to-one symmetry invariant (if row A matches
//! row B then row B matches row A).

use serde::{Deserialize, Serialize};

/// Which side of a pairing a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Remote,
    Local,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Remote => Side::Local,
            Side::Local => Side::Remote,
        }
    }
}

/// One candidate record on either side of a matching pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
    /// Remote character type ("PC"/"NPC") or local subtype; None when the
    /// record carries no classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: None,
        }
    }

    pub fn typed(
        id: impl Into<String>,
        name: impl Into<String>,
        entity_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            entity_type: Some(entity_type.into()),
        }
    }
}

/// One row of a reconciliation pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRow {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    /// Whether the row takes part in the sync plan; defaults to true
    pub selected: bool,
    /// Id of the matched row on the opposite side, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

impl ReconciliationRow {
    fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            id: candidate.id.clone(),
            name: candidate.name.clone(),
            entity_type: candidate.entity_type.clone(),
            selected: true,
            matched: None,
        }
    }
}

/// Paired rows for one category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPairing {
    pub remote: Vec<ReconciliationRow>,
    pub local: Vec<ReconciliationRow>,
}

/// The full result of a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub characters: CategoryPairing,
    pub items: CategoryPairing,
    pub locations: CategoryPairing,
    pub factions: CategoryPairing,
}

/// Candidate lists per category, one struct per side.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateLists {
    pub characters: Vec<Candidate>,
    pub items: Vec<Candidate>,
    pub locations: Vec<Candidate>,
    pub factions: Vec<Candidate>,
}

/// Run the full reconciliation pass over every category.
pub fn reconcile(remote: &CandidateLists, local: &CandidateLists) -> Reconciliation {
    Reconciliation {
        characters: reconcile_category(&remote.characters, &local.characters),
        items: reconcile_category(&remote.items, &local.items),
        locations: reconcile_category(&remote.locations, &local.locations),
        factions: reconcile_category(&remote.factions, &local.factions),
    }
}

/// Greedy one-to-one matching for a single category.
///
/// Pass one scans remote rows in input order and claims the first
/// not-yet-claimed local row with an exactly equal name (case-insensitive)
/// and a compatible type. Pass two re-attempts name-only matching for rows
/// still unmatched on both sides, which covers local stores whose records
/// carry no usable classification. Output rows are sorted by name for
/// stable display.
pub fn reconcile_category(remote: &[Candidate], local: &[Candidate]) -> CategoryPairing {
    let mut remote_rows: Vec<ReconciliationRow> =
        remote.iter().map(ReconciliationRow::from_candidate).collect();
    let mut local_rows: Vec<ReconciliationRow> =
        local.iter().map(ReconciliationRow::from_candidate).collect();

    // Pass 1: exact name, type-gated
    for remote_row in &mut remote_rows {
        let claim = local_rows.iter_mut().find(|candidate| {
            candidate.matched.is_none()
                && names_equal(&candidate.name, &remote_row.name)
                && types_compatible(
                    remote_row.entity_type.as_deref(),
                    candidate.entity_type.as_deref(),
                )
        });
        if let Some(local_row) = claim {
            local_row.matched = Some(remote_row.id.clone());
            remote_row.matched = Some(local_row.id.clone());
        }
    }

    // Pass 2: name only, for rows unmatched on both sides
    for remote_row in remote_rows.iter_mut().filter(|r| r.matched.is_none()) {
        let claim = local_rows
            .iter_mut()
            .find(|candidate| candidate.matched.is_none() && names_equal(&candidate.name, &remote_row.name));
        if let Some(local_row) = claim {
            local_row.matched = Some(remote_row.id.clone());
            remote_row.matched = Some(local_row.id.clone());
        }
    }

    sort_rows(&mut remote_rows);
    sort_rows(&mut local_rows);

    CategoryPairing {
        remote: remote_rows,
        local: local_rows,
    }
}

fn sort_rows(rows: &mut [ReconciliationRow]) {
    rows.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn names_equal(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Type gate for the first matching pass.
///
/// The constraint is keyed off the remote classification: a remote "PC" may
/// only claim a local record classified as a player, and a remote "NPC"
/// only an npc. A local record with no (or an unrecognized) classification
/// accepts any remote type, as does a remote record with none.
fn types_compatible(remote: Option<&str>, local: Option<&str>) -> bool {
    let Some(remote) = remote else { return true };
    let Some(local) = normalize_type(local) else {
        return true;
    };
    match remote.to_lowercase().as_str() {
        "pc" => local == "pc",
        "npc" => local == "npc",
        _ => true,
    }
}

/// Map local subtype vocabulary onto the remote's PC/NPC classes.
/// Unrecognized vocabulary counts as unknown.
fn normalize_type(local: Option<&str>) -> Option<&'static str> {
    match local?.to_lowercase().as_str() {
        "player" | "pc" | "character" => Some("pc"),
        "npc" => Some("npc"),
        _ => None,
    }
}

impl CategoryPairing {
    fn row(&self, side: Side, id: &str) -> Option<&ReconciliationRow> {
        self.rows(side).iter().find(|row| row.id == id)
    }

    fn row_mut(&mut self, side: Side, id: &str) -> Option<&mut ReconciliationRow> {
        self.rows_mut(side).iter_mut().find(|row| row.id == id)
    }

    pub fn rows(&self, side: Side) -> &Vec<ReconciliationRow> {
        match side {
            Side::Remote => &self.remote,
            Side::Local => &self.local,
        }
    }

    fn rows_mut(&mut self, side: Side) -> &mut Vec<ReconciliationRow> {
        match side {
            Side::Remote => &mut self.remote,
            Side::Local => &mut self.local,
        }
    }

    /// Toggle a row's selection, propagating the new state to its matched
    /// counterpart so link/unlink stays symmetric. Returns the new state,
    /// or None if the row does not exist.
    pub fn toggle_selected(&mut self, side: Side, id: &str) -> Option<bool> {
        let (new_state, counterpart) = {
            let row = self.row_mut(side, id)?;
            row.selected = !row.selected;
            (row.selected, row.matched.clone())
        };
        if let Some(counterpart_id) = counterpart
            && let Some(other) = self.row_mut(side.opposite(), &counterpart_id)
        {
            other.selected = new_state;
        }
        Some(new_state)
    }

    /// Re-match a row to a different counterpart (or to nothing).
    ///
    /// Both endpoints' prior links are cleared before the new link is
    /// established, so a row is never matched to more than one counterpart
    /// and symmetry holds when this returns.
    pub fn rematch(&mut self, side: Side, id: &str, new_match: Option<&str>) {
        // Clear the row's existing link
        let old_match = match self.row(side, id) {
            Some(row) => row.matched.clone(),
            None => return,
        };
        if let Some(old_id) = old_match
            && let Some(old_counterpart) = self.row_mut(side.opposite(), &old_id)
        {
            old_counterpart.matched = None;
        }
        if let Some(row) = self.row_mut(side, id) {
            row.matched = None;
        }

        let Some(target_id) = new_match else { return };

        // Steal the target from whoever held it
        let stolen = match self.row(side.opposite(), target_id) {
            Some(target) => target.matched.clone(),
            None => return,
        };
        if let Some(holder_id) = stolen
            && let Some(holder) = self.row_mut(side, &holder_id)
        {
            holder.matched = None;
        }

        if let Some(target) = self.row_mut(side.opposite(), target_id) {
            target.matched = Some(id.to_string());
        }
        if let Some(row) = self.row_mut(side, id) {
            row.matched = Some(target_id.to_string());
        }
    }

    /// Assert the one-to-one symmetry invariant. Test/debug helper.
    pub fn is_symmetric(&self) -> bool {
        let check = |rows: &[ReconciliationRow], others: &CategoryPairing, side: Side| {
            rows.iter().all(|row| match &row.matched {
                None => true,
                Some(counterpart_id) => others
                    .row(side.opposite(), counterpart_id)
                    .is_some_and(|other| other.matched.as_deref() == Some(row.id.as_str())),
            })
        };
        check(&self.remote, self, Side::Remote) && check(&self.local, self, Side::Local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn pairing_for(remote: &[Candidate], local: &[Candidate]) -> CategoryPairing {
        let pairing = reconcile_category(remote, local);
        assert!(pairing.is_symmetric());
        pairing
    }

    #[test]
    fn matches_equal_names_case_insensitively() {
        let pairing = pairing_for(
            &[Candidate::typed("r1", "MIRA", "PC")],
            &[Candidate::typed("l1", "mira", "player")],
        );

        assert_eq!(pairing.remote[0].matched.as_deref(), Some("l1"));
        assert_eq!(pairing.local[0].matched.as_deref(), Some("r1"));
        assert!(pairing.remote[0].selected && pairing.local[0].selected);
    }

    #[test]
    fn renamed_remote_does_not_match() {
        let pairing = pairing_for(
            &[Candidate::typed("r1", "Mira K.", "PC")],
            &[Candidate::typed("l1", "Mira", "player")],
        );

        assert_eq!(pairing.remote[0].matched, None);
        assert_eq!(pairing.local[0].matched, None);
    }

    #[rstest]
    #[case("PC", "npc", "player")]
    #[case("NPC", "player", "npc")]
    #[case("PC", "npc", "vehicle")] // unrecognized local vocabulary accepts any
    fn first_pass_skips_type_conflicting_local(
        #[case] remote_type: &str,
        #[case] conflicting: &str,
        #[case] compatible: &str,
    ) {
        // The conflicting local comes first; the type gate makes pass 1
        // walk past it and claim the compatible one.
        let pairing = pairing_for(
            &[Candidate::typed("r1", "Mira", remote_type)],
            &[
                Candidate::typed("l1", "Mira", conflicting),
                Candidate::typed("l2", "Mira", compatible),
            ],
        );
        assert_eq!(pairing.remote_row_match("r1").as_deref(), Some("l2"));
    }

    #[test]
    fn untyped_local_accepts_any_remote_type() {
        let pairing = pairing_for(
            &[Candidate::typed("r1", "Mira", "PC")],
            &[Candidate::new("l1", "Mira")],
        );
        assert_eq!(pairing.remote[0].matched.as_deref(), Some("l1"));
    }

    #[test]
    fn loose_pass_matches_type_conflicts_left_over() {
        // Remote PC vs local npc: rejected in pass 1, reunited in pass 2.
        let pairing = pairing_for(
            &[Candidate::typed("r1", "Mira", "PC")],
            &[Candidate::typed("l1", "Mira", "npc")],
        );
        assert_eq!(pairing.remote[0].matched.as_deref(), Some("l1"));
    }

    #[test]
    fn matching_is_one_to_one() {
        let pairing = pairing_for(
            &[
                Candidate::typed("r1", "Mira", "PC"),
                Candidate::typed("r2", "Mira", "PC"),
            ],
            &[Candidate::typed("l1", "Mira", "player")],
        );

        let matched: Vec<_> = pairing
            .remote
            .iter()
            .filter(|row| row.matched.is_some())
            .collect();
        assert_eq!(matched.len(), 1);
    }

    #[test]
    fn matching_is_idempotent() {
        let remote = vec![
            Candidate::typed("r1", "Mira", "PC"),
            Candidate::new("r2", "Zeph"),
            Candidate::typed("r3", "Bram", "NPC"),
        ];
        let local = vec![
            Candidate::typed("l1", "bram", "npc"),
            Candidate::new("l2", "Mira"),
            Candidate::new("l3", "Old Tower"),
        ];

        let first = reconcile_category(&remote, &local);
        let second = reconcile_category(&remote, &local);
        assert_eq!(first, second);
    }

    #[test]
    fn rows_are_sorted_by_name() {
        let pairing = pairing_for(
            &[
                Candidate::new("r1", "Zeph"),
                Candidate::new("r2", "bram"),
                Candidate::new("r3", "Mira"),
            ],
            &[],
        );
        let names: Vec<&str> = pairing.remote.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bram", "Mira", "Zeph"]);
    }

    #[test]
    fn toggle_propagates_to_counterpart() {
        let mut pairing = pairing_for(
            &[Candidate::typed("r1", "Mira", "PC")],
            &[Candidate::typed("l1", "Mira", "player")],
        );

        assert_eq!(pairing.toggle_selected(Side::Remote, "r1"), Some(false));
        assert!(!pairing.local[0].selected);

        assert_eq!(pairing.toggle_selected(Side::Local, "l1"), Some(true));
        assert!(pairing.remote[0].selected);
        assert!(pairing.is_symmetric());
    }

    #[test]
    fn rematch_clears_prior_links_on_both_sides() {
        let mut pairing = pairing_for(
            &[
                Candidate::typed("r1", "Mira", "PC"),
                Candidate::typed("r2", "Bram", "NPC"),
            ],
            &[
                Candidate::typed("l1", "Mira", "player"),
                Candidate::typed("l2", "Bram", "npc"),
            ],
        );

        // Steal l2 for r1; r2 and l1 must end up unmatched
        pairing.rematch(Side::Remote, "r1", Some("l2"));

        assert!(pairing.is_symmetric());
        assert_eq!(pairing.remote_row_match("r1").as_deref(), Some("l2"));
        assert_eq!(pairing.remote_row_match("r2"), None);
        assert_eq!(pairing.local_row_match("l1"), None);
    }

    #[test]
    fn rematch_to_none_unlinks() {
        let mut pairing = pairing_for(
            &[Candidate::typed("r1", "Mira", "PC")],
            &[Candidate::typed("l1", "Mira", "player")],
        );

        pairing.rematch(Side::Remote, "r1", None);
        assert!(pairing.is_symmetric());
        assert_eq!(pairing.remote_row_match("r1"), None);
        assert_eq!(pairing.local_row_match("l1"), None);
    }

    impl CategoryPairing {
        fn remote_row_match(&self, id: &str) -> Option<String> {
            self.row(Side::Remote, id).and_then(|r| r.matched.clone())
        }

        fn local_row_match(&self, id: &str) -> Option<String> {
            self.row(Side::Local, id).and_then(|r| r.matched.clone())
        }
    }
}
