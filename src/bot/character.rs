//! Character classes and races

use serde::{Deserialize, Serialize};

/// Available character classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterClass {
    Warrior,
    Paladin,
    Hunter,
    Rogue,
    Priest,
    Shaman,
    Mage,
    Warlock,
    Druid,
}

impl CharacterClass {
    /// Get all available character classes
    pub fn all() -> &'static [CharacterClass] {
        &[
            CharacterClass::Warrior,
            CharacterClass::Paladin,
            CharacterClass::Hunter,
            CharacterClass::Rogue,
            CharacterClass::Priest,
            CharacterClass::Shaman,
            CharacterClass::Mage,
            CharacterClass::Warlock,
            CharacterClass::Druid,
        ]
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            CharacterClass::Warrior => "Warrior",
            CharacterClass::Paladin => "Paladin",
            CharacterClass::Hunter => "Hunter",
            CharacterClass::Rogue => "Rogue",
            CharacterClass::Priest => "Priest",
            CharacterClass::Shaman => "Shaman",
            CharacterClass::Mage => "Mage",
            CharacterClass::Warlock => "Warlock",
            CharacterClass::Druid => "Druid",
        }
    }

    /// Parse a display name, case-insensitively.
    pub fn from_name(name: &str) -> Option<CharacterClass> {
        CharacterClass::all()
            .iter()
            .copied()
            .find(|class| class.name().eq_ignore_ascii_case(name))
    }

    /// Classes whose damage comes from melee weapons. Buffs with a melee and
    /// a caster variant (Blessing of Might / Wisdom) pick by this.
    pub fn is_melee_weapon_class(&self) -> bool {
        matches!(
            self,
            CharacterClass::Warrior | CharacterClass::Paladin | CharacterClass::Rogue
        )
    }

    /// Classes whose damage is mostly physical and who lose it under a
    /// physical immunity.
    pub fn is_physical_damage_class(&self) -> bool {
        matches!(
            self,
            CharacterClass::Warrior
                | CharacterClass::Paladin
                | CharacterClass::Rogue
                | CharacterClass::Hunter
        )
    }

    pub fn is_ranged_damage_class(&self) -> bool {
        matches!(
            self,
            CharacterClass::Hunter
                | CharacterClass::Mage
                | CharacterClass::Priest
                | CharacterClass::Warlock
        )
    }
}

/// Playable races. Only used to pick the right mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Race {
    Human,
    Dwarf,
    NightElf,
    Gnome,
    Orc,
    Undead,
    Tauren,
    Troll,
}

impl Race {
    pub fn from_name(name: &str) -> Option<Race> {
        match name.to_ascii_lowercase().as_str() {
            "human" => Some(Race::Human),
            "dwarf" => Some(Race::Dwarf),
            "nightelf" | "night elf" => Some(Race::NightElf),
            "gnome" => Some(Race::Gnome),
            "orc" => Some(Race::Orc),
            "undead" => Some(Race::Undead),
            "tauren" => Some(Race::Tauren),
            "troll" => Some(Race::Troll),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_names_round_trip() {
        for class in CharacterClass::all() {
            assert_eq!(CharacterClass::from_name(class.name()), Some(*class));
        }
        assert_eq!(CharacterClass::from_name("priest"), Some(CharacterClass::Priest));
        assert_eq!(CharacterClass::from_name("Deathknight"), None);
    }

    #[test]
    fn test_race_aliases() {
        assert_eq!(Race::from_name("Night Elf"), Some(Race::NightElf));
        assert_eq!(Race::from_name("NightElf"), Some(Race::NightElf));
        assert_eq!(Race::from_name("goblin"), None);
    }
}
