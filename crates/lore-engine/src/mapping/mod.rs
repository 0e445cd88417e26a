//! Confidence mapping
//!
//! Classifies a [`GenericEntity`] into a target shape using ordered rule
//! presets. Every non-fallback rule whose guard matches is scored and the
//! highest score wins; the fallback rule (the one with no guard) is used
//! only when nothing else matched, so mapping never fails outright — an
//! ambiguous entity just surfaces as a low confidence score.

mod preset;

pub use preset::{PresetRegistry, builtin_generic, builtin_pathfinder, builtin_fifth_edition};

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use lore_model::{EntityKind, GenericEntity};

use crate::error::{Error, Result};
use crate::text::is_external_url;

/// Guard predicate deciding whether a rule applies to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Guard {
    /// The entity has the given kind
    Kind { kind: EntityKind },
    /// The field at `path` equals `value` (case-insensitive)
    FieldEquals { path: String, value: String },
    /// The field at `path` is one of `values` (case-insensitive)
    FieldIn { path: String, values: Vec<String> },
    /// The field at `path` matches the regex `pattern`
    FieldMatches { path: String, pattern: String },
    /// Every subguard matches
    All { guards: Vec<Guard> },
    /// At least one subguard matches
    Any { guards: Vec<Guard> },
}

impl Guard {
    /// Evaluate the guard against an entity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRulePattern`] if a `FieldMatches` pattern
    /// does not compile.
    pub fn matches(&self, entity: &GenericEntity) -> Result<bool> {
        match self {
            Guard::Kind { kind } => Ok(entity.kind == *kind),
            Guard::FieldEquals { path, value } => Ok(entity
                .lookup(path)
                .is_some_and(|field| field.eq_ignore_ascii_case(value))),
            Guard::FieldIn { path, values } => Ok(entity.lookup(path).is_some_and(|field| {
                values.iter().any(|value| field.eq_ignore_ascii_case(value))
            })),
            Guard::FieldMatches { path, pattern } => {
                let regex = Regex::new(pattern).map_err(|e| Error::InvalidRulePattern {
                    rule: path.clone(),
                    message: e.to_string(),
                })?;
                Ok(entity
                    .lookup(path)
                    .is_some_and(|field| regex.is_match(&field)))
            }
            Guard::All { guards } => {
                for guard in guards {
                    if !guard.matches(entity)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Guard::Any { guards } => {
                for guard in guards {
                    if guard.matches(entity)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// How a materialized field is validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    /// Only absolute external URLs are accepted
    Image,
}

/// One output field: an ordered list of source paths, first non-empty wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub sources: Vec<String>,
    #[serde(default)]
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn text(sources: &[&str]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            kind: FieldKind::Text,
        }
    }

    pub fn image(sources: &[&str]) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            kind: FieldKind::Image,
        }
    }

    /// Resolve the first usable source value from the entity.
    pub fn materialize(&self, entity: &GenericEntity) -> Option<String> {
        for source in &self.sources {
            if let Some(value) = entity.lookup(source) {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if self.kind == FieldKind::Image && !is_external_url(trimmed) {
                    continue;
                }
                return Some(trimmed.to_string());
            }
        }
        None
    }
}

/// One mapping rule inside a preset.
///
/// A rule without a guard is the preset's fallback: it applies only when no
/// guarded rule matched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingRule {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Guard>,
    pub target: EntityKind,
    /// Classification labels attached to the proposal (e.g. "PC", "NPC")
    #[serde(default)]
    pub labels: Vec<String>,
    /// Keywords that corroborate the classification when found in the
    /// entity's name or folder
    #[serde(default)]
    pub keywords: Vec<String>,
    pub base_score: f32,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

/// An ordered list of rules for one game system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingPreset {
    pub id: String,
    /// System identifier this preset serves; None for the generic preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub rules: Vec<MappingRule>,
}

impl MappingPreset {
    /// Check the preset is well-formed: exactly one fallback rule, and every
    /// base score inside [0,1].
    pub fn validate(&self) -> Result<()> {
        let fallbacks = self.rules.iter().filter(|r| r.guard.is_none()).count();
        if fallbacks != 1 {
            return Err(Error::InvalidConfig {
                message: format!(
                    "preset '{}' must have exactly one fallback rule, found {}",
                    self.id, fallbacks
                ),
            });
        }
        for rule in &self.rules {
            if !(0.0..=1.0).contains(&rule.base_score) {
                return Err(Error::InvalidConfig {
                    message: format!(
                        "rule '{}' in preset '{}' has base score {} outside [0,1]",
                        rule.name, self.id, rule.base_score
                    ),
                });
            }
        }
        Ok(())
    }

    fn fallback(&self) -> Option<&MappingRule> {
        self.rules.iter().find(|r| r.guard.is_none())
    }
}

/// Output of the confidence mapper: a scored classification proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingProposal {
    pub target: EntityKind,
    /// Materialized target-shape fields
    pub payload: BTreeMap<String, String>,
    pub labels: Vec<String>,
    /// Confidence in [0,1]
    pub score: f32,
    /// Name of the rule that produced the proposal
    pub rule: String,
}

/// Classify an entity under a preset.
///
/// All matching non-fallback rules are scored and the highest score wins;
/// on a tie the earliest-declared rule is kept. The fallback rule is used
/// only when nothing else matched.
pub fn map(entity: &GenericEntity, preset: &MappingPreset) -> Result<MappingProposal> {
    let mut best: Option<MappingProposal> = None;

    for rule in preset.rules.iter().filter(|r| r.guard.is_some()) {
        let guard = rule.guard.as_ref().expect("filtered to guarded rules");
        if !guard.matches(entity)? {
            continue;
        }
        let proposal = propose(entity, rule);
        match &best {
            Some(current) if current.score >= proposal.score => {}
            _ => best = Some(proposal),
        }
    }

    if let Some(proposal) = best {
        return Ok(proposal);
    }
    match preset.fallback() {
        Some(rule) => Ok(propose(entity, rule)),
        None => Err(Error::InvalidConfig {
            message: format!("preset '{}' has no fallback rule", preset.id),
        }),
    }
}

/// Build the proposal for a single rule, including the heuristic score.
fn propose(entity: &GenericEntity, rule: &MappingRule) -> MappingProposal {
    let mut payload = BTreeMap::new();
    for (field, spec) in &rule.fields {
        if let Some(value) = spec.materialize(entity) {
            payload.insert(field.clone(), value);
        }
    }

    MappingProposal {
        target: rule.target,
        payload,
        labels: rule.labels.clone(),
        score: score(entity, rule),
        rule: rule.name.clone(),
    }
}

/// Heuristic scorer: base score plus bounded increments for corroborating
/// signal, clamped to [0,1].
fn score(entity: &GenericEntity, rule: &MappingRule) -> f32 {
    let mut score = rule.base_score;

    if !entity.images.is_empty() {
        score += 0.10;
    }
    if !entity.tags.is_empty() {
        score += 0.05;
    }
    if entity.kind == rule.target {
        score += 0.15;
    }
    if let Some(subtype) = &entity.subtype
        && rule
            .labels
            .iter()
            .any(|label| label.eq_ignore_ascii_case(subtype))
    {
        score += 0.10;
    }

    // Keyword corroboration in name/folder, capped at three hits
    let haystack = format!(
        "{} {}",
        entity.name.to_lowercase(),
        entity.folder_name.as_deref().unwrap_or("").to_lowercase()
    );
    let hits = rule
        .keywords
        .iter()
        .filter(|keyword| haystack.contains(&keyword.to_lowercase()))
        .count()
        .min(3);
    score += hits as f32 * 0.05;

    score.clamp(0.0, 1.0)
}
