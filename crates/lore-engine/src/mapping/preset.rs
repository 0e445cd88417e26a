//! Built-in mapping presets and the preset registry
//!
//! A preset serves one game system; the generic preset is the default when
//! no system-specific preset exists. Hosts can ship extra presets as TOML
//! without recompiling.

use std::collections::BTreeMap;
use std::collections::HashMap;

use lore_model::EntityKind;

use crate::error::Result;

use super::{FieldSpec, Guard, MappingPreset, MappingRule};

/// Registry of mapping presets, looked up by system id.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: HashMap<String, MappingPreset>,
    generic: Option<MappingPreset>,
}

impl PresetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in presets registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register(builtin_generic())
            .expect("builtin generic preset is valid");
        registry
            .register(builtin_fifth_edition())
            .expect("builtin fifth-edition preset is valid");
        registry
            .register(builtin_pathfinder())
            .expect("builtin pathfinder preset is valid");
        registry
    }

    /// Register a preset, validating it first.
    ///
    /// A preset with no `system` becomes (or replaces) the generic default.
    pub fn register(&mut self, preset: MappingPreset) -> Result<()> {
        preset.validate()?;
        match &preset.system {
            Some(system) => {
                self.presets.insert(system.clone(), preset);
            }
            None => self.generic = Some(preset),
        }
        Ok(())
    }

    /// Parse and register presets from a TOML document.
    ///
    /// The document holds a `presets` array of tables in the same shape as
    /// [`MappingPreset`].
    pub fn register_toml(&mut self, content: &str) -> Result<usize> {
        #[derive(serde::Deserialize)]
        struct Document {
            presets: Vec<MappingPreset>,
        }

        let document: Document = toml::from_str(content)?;
        let count = document.presets.len();
        for preset in document.presets {
            self.register(preset)?;
        }
        Ok(count)
    }

    /// Look up the preset for a system, falling back to the generic preset.
    pub fn for_system(&self, system: Option<&str>) -> Option<&MappingPreset> {
        system
            .and_then(|id| self.presets.get(id))
            .or(self.generic.as_ref())
    }

    /// All registered system ids, sorted.
    pub fn systems(&self) -> Vec<&str> {
        let mut systems: Vec<&str> = self.presets.keys().map(String::as_str).collect();
        systems.sort_unstable();
        systems
    }
}

/// Common remote-shape field specs shared by the built-in presets.
fn standard_fields() -> BTreeMap<String, FieldSpec> {
    BTreeMap::from([
        ("name".to_string(), FieldSpec::text(&["name"])),
        ("description".to_string(), FieldSpec::text(&["body", "folder"])),
        (
            "image_url".to_string(),
            FieldSpec::image(&["images.0", "metadata.img"]),
        ),
    ])
}

fn rule(
    name: &str,
    guard: Option<Guard>,
    target: EntityKind,
    base_score: f32,
) -> MappingRule {
    MappingRule {
        name: name.to_string(),
        guard,
        target,
        labels: Vec::new(),
        keywords: Vec::new(),
        base_score,
        fields: standard_fields(),
    }
}

/// The generic preset: rules any host system satisfies.
pub fn builtin_generic() -> MappingPreset {
    let mut player = rule(
        "player-character",
        Some(Guard::All {
            guards: vec![
                Guard::Kind {
                    kind: EntityKind::Character,
                },
                Guard::FieldIn {
                    path: "subtype".to_string(),
                    values: vec!["player".to_string(), "pc".to_string()],
                },
            ],
        }),
        EntityKind::Character,
        0.70,
    );
    player.labels = vec!["PC".to_string()];

    let mut npc = rule(
        "non-player-character",
        Some(Guard::Kind {
            kind: EntityKind::Character,
        }),
        EntityKind::Character,
        0.55,
    );
    npc.labels = vec!["NPC".to_string()];

    let item = rule(
        "item",
        Some(Guard::Kind {
            kind: EntityKind::Item,
        }),
        EntityKind::Item,
        0.60,
    );

    let mut location = rule(
        "location",
        Some(Guard::Kind {
            kind: EntityKind::Location,
        }),
        EntityKind::Location,
        0.60,
    );
    location.keywords = vec![
        "city".to_string(),
        "village".to_string(),
        "keep".to_string(),
        "dungeon".to_string(),
    ];

    let faction = rule(
        "faction",
        Some(Guard::Kind {
            kind: EntityKind::Faction,
        }),
        EntityKind::Faction,
        0.60,
    );

    // Journals whose name or folder reads like a place are proposed as
    // locations; plain journals fall through to the fallback.
    let mut journal_location = rule(
        "journal-as-location",
        Some(Guard::All {
            guards: vec![
                Guard::Kind {
                    kind: EntityKind::Journal,
                },
                Guard::Any {
                    guards: vec![
                        Guard::FieldMatches {
                            path: "name".to_string(),
                            pattern: r"(?i)\b(city|town|village|keep|castle|ruins?)\b".to_string(),
                        },
                        Guard::FieldMatches {
                            path: "folder".to_string(),
                            pattern: r"(?i)\b(locations?|places)\b".to_string(),
                        },
                    ],
                },
            ],
        }),
        EntityKind::Location,
        0.45,
    );
    journal_location.keywords = vec!["map".to_string()];

    let fallback = rule("fallback-journal", None, EntityKind::Journal, 0.20);

    MappingPreset {
        id: "generic".to_string(),
        system: None,
        rules: vec![
            player,
            npc,
            item,
            location,
            faction,
            journal_location,
            fallback,
        ],
    }
}

/// Preset for fifth-edition hosts, which expose `metadata.type` on actors.
pub fn builtin_fifth_edition() -> MappingPreset {
    let mut preset = builtin_generic();
    preset.id = "fifth-edition".to_string();
    preset.system = Some("dnd5e".to_string());

    // The sheet type field is authoritative on these hosts; score it above
    // the generic subtype rule.
    let mut sheet_pc = rule(
        "sheet-player-character",
        Some(Guard::FieldEquals {
            path: "metadata.type".to_string(),
            value: "character".to_string(),
        }),
        EntityKind::Character,
        0.80,
    );
    sheet_pc.labels = vec!["PC".to_string()];

    let mut sheet_npc = rule(
        "sheet-npc",
        Some(Guard::FieldEquals {
            path: "metadata.type".to_string(),
            value: "npc".to_string(),
        }),
        EntityKind::Character,
        0.75,
    );
    sheet_npc.labels = vec!["NPC".to_string()];

    preset.rules.insert(0, sheet_npc);
    preset.rules.insert(0, sheet_pc);
    preset
}

/// Preset for pathfinder hosts; actor subtype vocabulary differs.
pub fn builtin_pathfinder() -> MappingPreset {
    let mut preset = builtin_generic();
    preset.id = "pathfinder".to_string();
    preset.system = Some("pf2e".to_string());

    let mut partied = rule(
        "party-member",
        Some(Guard::All {
            guards: vec![
                Guard::Kind {
                    kind: EntityKind::Character,
                },
                Guard::FieldIn {
                    path: "subtype".to_string(),
                    values: vec!["character".to_string(), "familiar".to_string()],
                },
            ],
        }),
        EntityKind::Character,
        0.75,
    );
    partied.labels = vec!["PC".to_string()];

    preset.rules.insert(0, partied);
    preset
}
