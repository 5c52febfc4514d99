//! JSON configuration parsing for headless mode
//!
//! A scenario describes one encounter: a scripted leader, the bot-controlled
//! party that follows it, and the hostiles they fight.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bot::character::{CharacterClass, Race};
use crate::bot::role::Role;
use crate::bot::world::{CreatureType, RaidMarker};

/// Largest group the runner builds (a full raid, leader included).
pub const MAX_GROUP_SIZE: usize = 40;

/// Headless scenario configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Scenario name, echoed in the result
    #[serde(default = "default_name")]
    pub name: String,
    /// The scripted group leader. It walks up to the nearest hostile and
    /// attacks it; everyone else is a bot.
    pub leader: MemberConfig,
    /// Bot-controlled group members
    pub party: Vec<MemberConfig>,
    pub hostiles: Vec<HostileConfig>,
    /// Build a raid instead of a party
    #[serde(default)]
    pub raid: bool,
    /// Raid markers set by the leader before the pull
    #[serde(default)]
    pub marks: Vec<MarkConfig>,
    #[serde(default)]
    pub map_id: u32,
    #[serde(default)]
    pub in_instance: bool,
    /// Custom output path for the JSON result (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Maximum scenario duration in seconds (default: 180)
    #[serde(default = "default_max_duration")]
    pub max_duration_secs: f32,
    /// Simulated milliseconds per frame (default: 100)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u32,
    /// Random seed for deterministic runs
    #[serde(default)]
    pub random_seed: Option<u64>,
}

/// One player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberConfig {
    pub class: String,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default = "default_level")]
    pub level: u32,
    /// Forced role; classified from known abilities when absent
    #[serde(default)]
    pub role: Option<String>,
    pub position: [f32; 3],
    /// Known ability ids
    #[serde(default)]
    pub abilities: Vec<u32>,
    /// Maximum health override
    #[serde(default)]
    pub health: Option<u32>,
    #[serde(default)]
    pub shield: bool,
    /// Weapons equipped (main hand, off hand)
    #[serde(default = "default_weapons")]
    pub weapons: [bool; 2],
}

/// One hostile creature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostileConfig {
    #[serde(default = "default_hostile_name")]
    pub name: String,
    /// Creature template id
    #[serde(default)]
    pub entry: u32,
    #[serde(default = "default_level")]
    pub level: u32,
    pub health: u32,
    pub position: [f32; 3],
    /// Damage of one auto-attack swing (default: derived from level)
    #[serde(default)]
    pub melee_damage: Option<u32>,
    /// Attacks the closest hostile within this radius (0 = only when hit)
    #[serde(default)]
    pub aggro_radius: f32,
    #[serde(default)]
    pub creature_type: Option<String>,
    /// Uses mana and counts as a caster for interrupt/target choices
    #[serde(default)]
    pub caster: bool,
}

/// A raid marker on a hostile, by index into `hostiles`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkConfig {
    pub marker: String,
    pub hostile: usize,
}

fn default_name() -> String {
    "Unnamed scenario".to_string()
}

fn default_hostile_name() -> String {
    "Hostile".to_string()
}

fn default_level() -> u32 {
    60
}

fn default_weapons() -> [bool; 2] {
    [true, false]
}

fn default_max_duration() -> f32 {
    180.0
}

fn default_tick_ms() -> u32 {
    100
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario file {}: {}", path.display(), e))?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a scenario from JSON text
    pub fn from_json_str(contents: &str) -> Result<Self, String> {
        let config: ScenarioConfig =
            serde_json::from_str(contents).map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.party.is_empty() {
            return Err("party must have at least one member".to_string());
        }
        let group_size = self.party.len() + 1;
        let limit = if self.raid { MAX_GROUP_SIZE } else { 5 };
        if group_size > limit {
            return Err(format!(
                "group of {} exceeds the {} limit of {}",
                group_size,
                if self.raid { "raid" } else { "party" },
                limit
            ));
        }
        if self.hostiles.is_empty() {
            return Err("hostiles must not be empty".to_string());
        }

        for member in std::iter::once(&self.leader).chain(self.party.iter()) {
            member.parse_class()?;
            member.parse_race()?;
            member.parse_role()?;
            if member.level == 0 {
                return Err(format!("{} level must be positive", member.class));
            }
        }

        for hostile in &self.hostiles {
            if hostile.health == 0 {
                return Err(format!("hostile '{}' has no health", hostile.name));
            }
            hostile.parse_creature_type()?;
        }

        for mark in &self.marks {
            parse_marker(&mark.marker)?;
            if mark.hostile >= self.hostiles.len() {
                return Err(format!(
                    "mark {} targets hostile {} which is out of range ({} hostiles)",
                    mark.marker,
                    mark.hostile,
                    self.hostiles.len()
                ));
            }
        }

        if self.max_duration_secs <= 0.0 {
            return Err("max_duration_secs must be positive".to_string());
        }
        if self.tick_ms == 0 {
            return Err("tick_ms must be positive".to_string());
        }

        Ok(())
    }
}

impl MemberConfig {
    pub fn parse_class(&self) -> Result<CharacterClass, String> {
        CharacterClass::from_name(&self.class).ok_or_else(|| {
            let valid: Vec<&str> = CharacterClass::all().iter().map(|c| c.name()).collect();
            format!("Unknown class: '{}'. Valid classes: {}", self.class, valid.join(", "))
        })
    }

    pub fn parse_race(&self) -> Result<Option<Race>, String> {
        match &self.race {
            None => Ok(None),
            Some(name) => Race::from_name(name)
                .map(Some)
                .ok_or_else(|| format!("Unknown race: '{}'", name)),
        }
    }

    pub fn parse_role(&self) -> Result<Option<Role>, String> {
        match &self.role {
            None => Ok(None),
            Some(name) => Role::from_name(name).map(Some).ok_or_else(|| {
                format!(
                    "Unknown role: '{}'. Valid roles: Tank, MeleeDPS, RangeDPS, Healer",
                    name
                )
            }),
        }
    }
}

impl HostileConfig {
    pub fn parse_creature_type(&self) -> Result<CreatureType, String> {
        let Some(name) = &self.creature_type else {
            return Ok(CreatureType::default());
        };
        match name.to_ascii_lowercase().as_str() {
            "humanoid" => Ok(CreatureType::Humanoid),
            "beast" => Ok(CreatureType::Beast),
            "demon" => Ok(CreatureType::Demon),
            "dragonkin" => Ok(CreatureType::Dragonkin),
            "elemental" => Ok(CreatureType::Elemental),
            "giant" => Ok(CreatureType::Giant),
            "undead" => Ok(CreatureType::Undead),
            "mechanical" => Ok(CreatureType::Mechanical),
            _ => Err(format!("Unknown creature type: '{}'", name)),
        }
    }
}

/// Parse a raid marker name
pub fn parse_marker(name: &str) -> Result<RaidMarker, String> {
    match name.to_ascii_lowercase().as_str() {
        "star" => Ok(RaidMarker::Star),
        "circle" => Ok(RaidMarker::Circle),
        "diamond" => Ok(RaidMarker::Diamond),
        "triangle" => Ok(RaidMarker::Triangle),
        "moon" => Ok(RaidMarker::Moon),
        "square" => Ok(RaidMarker::Square),
        "cross" => Ok(RaidMarker::Cross),
        "skull" => Ok(RaidMarker::Skull),
        _ => Err(format!("Unknown raid marker: '{}'", name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "leader": { "class": "Warrior", "position": [0, 0, 0] },
        "party": [ { "class": "Priest", "role": "Healer", "position": [-5, 0, 0] } ],
        "hostiles": [ { "health": 500, "position": [20, 0, 0] } ]
    }"#;

    #[test]
    fn test_defaults_are_filled_in() {
        let config = ScenarioConfig::from_json_str(MINIMAL).expect("valid");
        assert_eq!(config.max_duration_secs, 180.0);
        assert_eq!(config.tick_ms, 100);
        assert_eq!(config.party[0].level, 60);
        assert_eq!(config.party[0].weapons, [true, false]);
        assert!(config.random_seed.is_none());
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        let text = MINIMAL.replace("Priest", "Bard");
        let error = ScenarioConfig::from_json_str(&text).unwrap_err();
        assert!(error.contains("Unknown class: 'Bard'"));
    }

    #[test]
    fn test_party_size_limit() {
        let mut config = ScenarioConfig::from_json_str(MINIMAL).expect("valid");
        let member = config.party[0].clone();
        config.party = vec![member; 5];
        assert!(config.validate().is_err());
        config.raid = true;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_mark_index_out_of_range() {
        let mut config = ScenarioConfig::from_json_str(MINIMAL).expect("valid");
        config.marks.push(MarkConfig {
            marker: "Skull".to_string(),
            hostile: 3,
        });
        assert!(config.validate().unwrap_err().contains("out of range"));
    }
}
