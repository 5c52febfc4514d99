//! Role Classification
//!
//! Every agent plays exactly one behavioral role. The role is derived once
//! from the class and a handful of signature talents, unless the spawner
//! asked for a specific one.

use serde::{Deserialize, Serialize};

use super::abilities::AbilityId;
use super::character::CharacterClass;

/// Behavioral archetype governing which cascade branches an agent takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Tank,
    MeleeDps,
    RangeDps,
    Healer,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Tank => "Tank",
            Role::MeleeDps => "MeleeDPS",
            Role::RangeDps => "RangeDPS",
            Role::Healer => "Healer",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        match name.to_ascii_lowercase().as_str() {
            "tank" => Some(Role::Tank),
            "meleedps" | "melee" => Some(Role::MeleeDps),
            "rangedps" | "ranged" | "range" => Some(Role::RangeDps),
            "healer" | "heal" => Some(Role::Healer),
            _ => None,
        }
    }

    /// Roles that fight from range and keep their distance.
    pub fn is_ranged(&self) -> bool {
        matches!(self, Role::RangeDps | Role::Healer)
    }
}

/// Signature talents that imply a specialization.
pub mod signature {
    use super::AbilityId;

    pub const SHIELD_SLAM: AbilityId = AbilityId(23922);
    pub const HOLY_SHIELD: AbilityId = AbilityId(20925);
    pub const SANCTITY_AURA: AbilityId = AbilityId(20218);
    pub const SHADOWFORM: AbilityId = AbilityId(15473);
    pub const ELEMENTAL_MASTERY: AbilityId = AbilityId(16166);
    pub const STORMSTRIKE: AbilityId = AbilityId(17364);
    pub const MOONKIN_FORM: AbilityId = AbilityId(24858);
    pub const LEADER_OF_THE_PACK: AbilityId = AbilityId(17007);
}

/// Assign a role from class and known abilities.
///
/// Pure and total: the same inputs always produce the same role.
pub fn classify_role(class: CharacterClass, knows: impl Fn(AbilityId) -> bool) -> Role {
    match class {
        CharacterClass::Warrior => {
            if knows(signature::SHIELD_SLAM) {
                Role::Tank
            } else {
                Role::MeleeDps
            }
        }
        CharacterClass::Rogue => Role::MeleeDps,
        CharacterClass::Hunter | CharacterClass::Mage | CharacterClass::Warlock => Role::RangeDps,
        CharacterClass::Paladin => {
            if knows(signature::HOLY_SHIELD) {
                Role::Tank
            } else if knows(signature::SANCTITY_AURA) {
                Role::MeleeDps
            } else {
                Role::Healer
            }
        }
        CharacterClass::Priest => {
            if knows(signature::SHADOWFORM) {
                Role::RangeDps
            } else {
                Role::Healer
            }
        }
        CharacterClass::Shaman => {
            if knows(signature::ELEMENTAL_MASTERY) {
                Role::RangeDps
            } else if knows(signature::STORMSTRIKE) {
                Role::MeleeDps
            } else {
                Role::Healer
            }
        }
        CharacterClass::Druid => {
            if knows(signature::MOONKIN_FORM) {
                Role::RangeDps
            } else if knows(signature::LEADER_OF_THE_PACK) {
                Role::MeleeDps
            } else {
                Role::Healer
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn knows_set(ids: &[AbilityId]) -> impl Fn(AbilityId) -> bool {
        let set: HashSet<AbilityId> = ids.iter().copied().collect();
        move |id| set.contains(&id)
    }

    #[test]
    fn test_warrior_with_shield_slam_tanks() {
        assert_eq!(
            classify_role(CharacterClass::Warrior, knows_set(&[signature::SHIELD_SLAM])),
            Role::Tank
        );
        assert_eq!(classify_role(CharacterClass::Warrior, knows_set(&[])), Role::MeleeDps);
    }

    #[test]
    fn test_paladin_probe_order() {
        // Holy Shield wins over Sanctity Aura
        let both = knows_set(&[signature::HOLY_SHIELD, signature::SANCTITY_AURA]);
        assert_eq!(classify_role(CharacterClass::Paladin, both), Role::Tank);
        assert_eq!(
            classify_role(CharacterClass::Paladin, knows_set(&[signature::SANCTITY_AURA])),
            Role::MeleeDps
        );
        assert_eq!(classify_role(CharacterClass::Paladin, knows_set(&[])), Role::Healer);
    }

    #[test]
    fn test_hybrid_defaults_to_healer() {
        for class in [CharacterClass::Priest, CharacterClass::Shaman, CharacterClass::Druid] {
            assert_eq!(classify_role(class, knows_set(&[])), Role::Healer, "{:?}", class);
        }
    }

    #[test]
    fn test_pure_dps_classes() {
        assert_eq!(classify_role(CharacterClass::Rogue, |_| true), Role::MeleeDps);
        assert_eq!(classify_role(CharacterClass::Mage, |_| true), Role::RangeDps);
        assert_eq!(classify_role(CharacterClass::Hunter, |_| false), Role::RangeDps);
    }

    #[test]
    fn test_role_names_parse() {
        for role in [Role::Tank, Role::MeleeDps, Role::RangeDps, Role::Healer] {
            assert_eq!(Role::from_name(role.name()), Some(role));
        }
    }
}
