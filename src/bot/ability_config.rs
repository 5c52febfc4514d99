//! Data-Driven Ability Catalog
//!
//! The shared, read-only ability reference data every agent resolves its
//! `AbilityId`s against. Abilities are defined in `assets/config/abilities.ron`
//! and loaded once; the catalog is then shared behind an `Arc`.
//!
//! ## Usage
//! ```ignore
//! let catalog = AbilityCatalog::load_from_file(ABILITY_CATALOG_PATH)?;
//! let fireball = catalog.get(AbilityId(133)).map(|a| a.cast_time_ms);
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::abilities::{AbilityId, AbilityInfo};

/// Default location of the ability catalog.
pub const ABILITY_CATALOG_PATH: &str = "assets/config/abilities.ron";

/// Root structure for the abilities.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct AbilitiesConfig {
    pub abilities: Vec<AbilityInfo>,
}

/// All ability definitions, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct AbilityCatalog {
    definitions: HashMap<AbilityId, AbilityInfo>,
}

impl AbilityCatalog {
    /// Create from a loaded config. Later duplicates replace earlier ones.
    pub fn new(config: AbilitiesConfig) -> Self {
        let definitions = config
            .abilities
            .into_iter()
            .map(|ability| (ability.id, ability))
            .collect();
        Self { definitions }
    }

    /// Build directly from a list of definitions (tests, hosts that assemble
    /// their own data).
    pub fn from_abilities(abilities: impl IntoIterator<Item = AbilityInfo>) -> Self {
        Self {
            definitions: abilities.into_iter().map(|a| (a.id, a)).collect(),
        }
    }

    pub fn get(&self, id: AbilityId) -> Option<&AbilityInfo> {
        self.definitions.get(&id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &AbilityId> {
        self.definitions.keys()
    }

    /// Every rank of the chain `head` belongs to, lowest rank first.
    pub fn chain(&self, head: AbilityId) -> Vec<&AbilityInfo> {
        let mut ranks: Vec<&AbilityInfo> = self
            .definitions
            .values()
            .filter(|a| a.chain_head() == head)
            .collect();
        ranks.sort_by_key(|a| a.rank);
        ranks
    }

    /// Check internal references: every `first_rank` must exist and be a
    /// chain head itself, and ranks above one must name their first rank.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();
        let mut ids: Vec<&AbilityId> = self.definitions.keys().collect();
        ids.sort();

        for id in ids {
            let ability = &self.definitions[id];
            match ability.first_rank {
                Some(head) => match self.definitions.get(&head) {
                    None => problems.push(format!(
                        "{} ({:?}) names missing first rank {:?}",
                        ability.name, id, head
                    )),
                    Some(first) if first.first_rank.is_some() => problems.push(format!(
                        "{} ({:?}) names {:?} as first rank, which is not a chain head",
                        ability.name, id, head
                    )),
                    Some(_) => {}
                },
                None if ability.rank > 1 => problems.push(format!(
                    "{} ({:?}) has rank {} but no first rank",
                    ability.name, id, ability.rank
                )),
                None => {}
            }
            if let Some(max) = ability.max_range {
                if max < ability.min_range {
                    problems.push(format!(
                        "{} ({:?}) has max range {} below min range {}",
                        ability.name, id, max, ability.min_range
                    ));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }

    /// Parse and validate a catalog from RON text. `source` names the input
    /// in error messages.
    pub fn from_ron_str(contents: &str, source: &str) -> Result<Self, String> {
        let config: AbilitiesConfig = ron::from_str(contents)
            .map_err(|e| format!("Failed to parse {}: {}", source, e))?;

        let count = config.abilities.len();
        let catalog = AbilityCatalog::new(config);
        if catalog.len() != count {
            return Err(format!(
                "Duplicate ability ids in {}: {} entries, {} unique",
                source,
                count,
                catalog.len()
            ));
        }

        catalog
            .validate()
            .map_err(|problems| format!("Invalid ability catalog {}: {:?}", source, problems))?;

        Ok(catalog)
    }

    pub fn load_from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        let catalog = Self::from_ron_str(&contents, path)?;
        info!("Loaded {} ability definitions from {}", catalog.len(), path);
        Ok(catalog)
    }
}

/// Load the ability catalog from assets/config/abilities.ron
pub fn load_ability_catalog() -> Result<AbilityCatalog, String> {
    AbilityCatalog::load_from_file(ABILITY_CATALOG_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_RANKS: &str = r#"(
        abilities: [
            (id: 2050, name: "Lesser Heal", school: Holy, max_range: Some(40.0),
             cast_time_ms: 1500, heal_amount: 52, effects: [Heal]),
            (id: 2052, name: "Lesser Heal", rank: 2, first_rank: Some(2050), school: Holy,
             max_range: Some(40.0), cast_time_ms: 2000, heal_amount: 79, effects: [Heal]),
        ],
    )"#;

    #[test]
    fn test_parses_chain() {
        let catalog = AbilityCatalog::from_ron_str(TWO_RANKS, "inline").expect("parses");
        assert_eq!(catalog.len(), 2);
        let chain = catalog.chain(AbilityId(2050));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].heal_amount, 79);
        assert!(catalog.get(AbilityId(2052)).expect("lesser heal").on_global_cooldown);
    }

    #[test]
    fn test_missing_first_rank_is_rejected() {
        let text = r#"(abilities: [
            (id: 2052, name: "Lesser Heal", rank: 2, first_rank: Some(2050)),
        ])"#;
        let result = AbilityCatalog::from_ron_str(text, "inline");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("missing first rank"));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let text = r#"(abilities: [
            (id: 1, name: "A"),
            (id: 1, name: "B"),
        ])"#;
        assert!(AbilityCatalog::from_ron_str(text, "inline").is_err());
    }

    #[test]
    fn test_default_file_loads() {
        let catalog = load_ability_catalog().expect("bundled catalog loads");
        assert!(!catalog.is_empty());
    }
}
