//! Consumables
//!
//! Which potion, bandage, elixir, flask, food, drink and mount an agent
//! uses, chosen once from level, race, class and role. Consumables are used
//! through their triggered spells, so no item bookkeeping is needed.

use super::abilities::AbilityId;
use super::character::{CharacterClass, Race};
use super::role::Role;

pub const FOOD: AbilityId = AbilityId(1131);
pub const DRINK: AbilityId = AbilityId(1137);
/// Better drink from level 50.
pub const DRINK_50: AbilityId = AbilityId(25696);

/// Debuff the host applies on an auto-revive.
pub const HONORLESS_TARGET: AbilityId = AbilityId(2479);

/// Health fraction below which an agent eats out of combat.
pub const EAT_BELOW_PCT: f32 = 90.0;
/// Mana fraction below which a mana user drinks out of combat.
pub const DRINK_BELOW_PCT: f32 = 85.0;

/// Health at which the emergency potion is used in combat.
pub const POTION_BELOW_PCT: f32 = 15.0;
/// Health at which damage dealers bandage.
pub const BANDAGE_BELOW_PCT: f32 = 50.0;

/// Consumables chosen for one agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Consumables {
    pub potion: Option<AbilityId>,
    pub bandage: Option<AbilityId>,
    /// Removes harmful magic, curses, poisons and diseases.
    pub restorative: Option<AbilityId>,
    pub elixir: Option<AbilityId>,
    pub flask: Option<AbilityId>,
    pub mount: Option<AbilityId>,
}

impl Consumables {
    pub fn choose(level: u32, race: Option<Race>, class: CharacterClass, role: Role) -> Self {
        let mut chosen = Consumables {
            potion: healing_potion(level),
            mount: mount_for(level, race, class),
            ..Default::default()
        };

        if level >= 60 {
            chosen.bandage = Some(AbilityId(18610));
        }

        if level == 60 {
            chosen.restorative = Some(AbilityId(11359));
            let (elixir, flask) = match role {
                Role::Tank => (17537, 17626),
                Role::Healer => (24363, 17627),
                Role::MeleeDps => (17538, 17626),
                Role::RangeDps if class == CharacterClass::Hunter => (17538, 17626),
                Role::RangeDps => (24363, 17628),
            };
            chosen.elixir = Some(AbilityId(elixir));
            chosen.flask = Some(AbilityId(flask));
        }

        chosen
    }
}

/// Best healing potion usable at `level`.
pub fn healing_potion(level: u32) -> Option<AbilityId> {
    let id = match level {
        60.. => 22729,
        45.. => 17534,
        35.. => 4042,
        21.. => 2024,
        12.. => 441,
        3.. => 440,
        _ => return None,
    };
    Some(AbilityId(id))
}

/// Mount spell for the agent. Paladins and warlocks ride their class
/// mounts; everyone else rides their race's. None below level 40.
pub fn mount_for(level: u32, race: Option<Race>, class: CharacterClass) -> Option<AbilityId> {
    let epic = if level >= 60 {
        true
    } else if level >= 40 {
        false
    } else {
        return None;
    };

    let id = match (class, race) {
        (CharacterClass::Paladin, _) => pick(epic, 23214, 13819),
        (CharacterClass::Warlock, _) => pick(epic, 23161, 5784),
        (_, Some(Race::Human)) => pick(epic, 22717, 470),
        (_, Some(Race::NightElf)) => pick(epic, 22723, 10787),
        (_, Some(Race::Dwarf)) => pick(epic, 22720, 6896),
        (_, Some(Race::Gnome)) => pick(epic, 22719, 17456),
        (_, Some(Race::Troll)) => pick(epic, 22721, 10795),
        (_, Some(Race::Orc)) => pick(epic, 22724, 581),
        (_, Some(Race::Tauren)) => pick(epic, 22718, 18363),
        (_, Some(Race::Undead)) => pick(epic, 22722, 8980),
        (_, None) => return None,
    };
    Some(AbilityId(id))
}

fn pick(epic: bool, fast: u32, slow: u32) -> u32 {
    if epic {
        fast
    } else {
        slow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_potion_by_level() {
        assert_eq!(healing_potion(1), None);
        assert_eq!(healing_potion(3), Some(AbilityId(440)));
        assert_eq!(healing_potion(30), Some(AbilityId(2024)));
        assert_eq!(healing_potion(60), Some(AbilityId(22729)));
    }

    #[test]
    fn test_mounts() {
        assert_eq!(mount_for(39, Some(Race::Orc), CharacterClass::Warrior), None);
        assert_eq!(
            mount_for(40, Some(Race::Orc), CharacterClass::Warrior),
            Some(AbilityId(581))
        );
        assert_eq!(
            mount_for(60, Some(Race::Human), CharacterClass::Paladin),
            Some(AbilityId(23214))
        );
    }

    #[test]
    fn test_role_flasks_only_at_sixty() {
        let healer = Consumables::choose(60, Some(Race::Dwarf), CharacterClass::Priest, Role::Healer);
        assert_eq!(healer.flask, Some(AbilityId(17627)));
        assert_eq!(healer.elixir, Some(AbilityId(24363)));

        let hunter = Consumables::choose(60, Some(Race::Dwarf), CharacterClass::Hunter, Role::RangeDps);
        assert_eq!(hunter.elixir, Some(AbilityId(17538)));

        let low = Consumables::choose(50, Some(Race::Dwarf), CharacterClass::Priest, Role::Healer);
        assert_eq!(low.flask, None);
        assert_eq!(low.bandage, None);
    }
}
