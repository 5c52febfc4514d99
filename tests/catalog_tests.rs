//! Integration tests for the bundled reference data
//!
//! These tests verify that:
//! - abilities.ron and slot_table.ron load and validate
//! - Every slot binding and talent names a catalogued ability
//! - Role signatures, consumables, potions and mounts are catalogued
//! - Stances and forms replace each other through exclusive groups
//! - The slot table sorts real rank chains the way the decision loop expects
//! - Populating the same roster twice gives the same loadout

mod common;

use partybot::bot::abilities::{AbilityEffect, AbilityId, ShapeshiftForm};
use partybot::bot::ability_config::AbilityCatalog;
use partybot::bot::character::{CharacterClass, Race};
use partybot::bot::consumables::{healing_potion, mount_for, Consumables};
use partybot::bot::loadout::Loadout;
use partybot::bot::role::{signature, Role};
use partybot::bot::slot_table::{Slot, SlotTableConfig, Talent, SLOT_TABLE_PATH};
use partybot::bot::world::KnownAbility;
use partybot::sandbox::SandboxWorld;

fn slot_table_config() -> SlotTableConfig {
    let contents = std::fs::read_to_string(SLOT_TABLE_PATH).expect("slot table file should exist");
    ron::from_str(&contents).expect("slot table should parse")
}

fn assert_catalogued(catalog: &AbilityCatalog, id: AbilityId, what: &str) {
    assert!(catalog.get(id).is_some(), "{} {:?} is not in the catalog", what, id);
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_bundled_data_loads_and_validates() {
    let catalog = common::catalog();
    let table = common::slot_table();

    assert!(!catalog.is_empty());
    assert!(!table.is_empty());
    assert_eq!(catalog.validate(), Ok(()));
    assert_eq!(table.validate(), Ok(()));
}

#[test]
fn test_slot_bindings_name_catalogued_abilities() {
    let catalog = common::catalog();
    let config = slot_table_config();

    for id in config.bindings.keys() {
        assert_catalogued(&catalog, *id, "slot binding");
    }
    for id in config.talents.keys() {
        assert_catalogued(&catalog, *id, "talent");
        assert!(catalog.get(*id).map(|a| a.passive).unwrap_or(false), "talent {:?} should be passive", id);
    }
}

#[test]
fn test_bindings_point_at_chain_heads() {
    let catalog = common::catalog();
    let config = slot_table_config();

    for id in config.bindings.keys() {
        let ability = catalog.get(*id).expect("binding is catalogued");
        assert_eq!(ability.chain_head(), *id, "{} should be bound by its first rank", ability.name);
    }
}

#[test]
fn test_role_signatures_are_catalogued() {
    let catalog = common::catalog();
    for id in [
        signature::SHIELD_SLAM,
        signature::HOLY_SHIELD,
        signature::SANCTITY_AURA,
        signature::SHADOWFORM,
        signature::ELEMENTAL_MASTERY,
        signature::STORMSTRIKE,
        signature::MOONKIN_FORM,
        signature::LEADER_OF_THE_PACK,
    ] {
        assert_catalogued(&catalog, id, "role signature");
    }
}

#[test]
fn test_consumables_are_catalogued() {
    let catalog = common::catalog();
    let races = [
        Race::Human,
        Race::Dwarf,
        Race::NightElf,
        Race::Gnome,
        Race::Orc,
        Race::Undead,
        Race::Tauren,
        Race::Troll,
    ];
    let roles = [Role::Tank, Role::Healer, Role::MeleeDps, Role::RangeDps];

    for level in [1, 10, 20, 40, 50, 60] {
        if let Some(potion) = healing_potion(level) {
            assert_catalogued(&catalog, potion, "healing potion");
        }
        for class in CharacterClass::all() {
            for race in races {
                if let Some(mount) = mount_for(level, Some(race), *class) {
                    assert_catalogued(&catalog, mount, "mount");
                }
            }
            for role in roles {
                let chosen = Consumables::choose(level, Some(Race::Human), *class, role);
                for id in [chosen.bandage, chosen.restorative, chosen.elixir, chosen.flask]
                    .into_iter()
                    .flatten()
                {
                    assert_catalogued(&catalog, id, "consumable");
                }
            }
        }
    }
}

#[test]
fn test_stances_and_forms_are_exclusive() {
    let catalog = common::catalog();
    let mut checked = 0;

    for id in catalog.ids() {
        let ability = catalog.get(*id).expect("listed id resolves");
        let exclusive_form = ability.effects.iter().any(|effect| {
            matches!(
                effect,
                AbilityEffect::Shapeshift(
                    ShapeshiftForm::BattleStance
                        | ShapeshiftForm::DefensiveStance
                        | ShapeshiftForm::BerserkerStance
                        | ShapeshiftForm::Bear
                        | ShapeshiftForm::DireBear
                        | ShapeshiftForm::Cat
                        | ShapeshiftForm::Travel
                        | ShapeshiftForm::Aquatic
                        | ShapeshiftForm::Moonkin
                )
            )
        });
        if !exclusive_form {
            continue;
        }
        let aura = ability.aura.as_ref().expect("forms leave an aura");
        assert!(aura.positive, "{} should be a positive aura", ability.name);
        assert!(aura.exclusive_group.is_some(), "{} needs an exclusive group", ability.name);
        checked += 1;
    }

    assert!(checked >= 9);
}

// ============================================================================
// Loadouts From Real Data
// ============================================================================

fn loadout_for(abilities: &[u32]) -> Loadout {
    let world = SandboxWorld::with_catalog(common::catalog());
    let roster: Vec<KnownAbility> = common::ids(abilities).into_iter().map(KnownAbility::active).collect();
    Loadout::populate(&roster, &world, &common::slot_table())
}

#[test]
fn test_populate_is_repeatable_and_order_independent() {
    let roster = [635, 25292, 19750, 19943, 4987, 20473, 20216, 19740, 25291];
    let first = loadout_for(&roster);
    let again = loadout_for(&roster);
    assert_eq!(first, again);

    let mut reversed = roster;
    reversed.reverse();
    assert_eq!(loadout_for(&reversed), first);
}

#[test]
fn test_highest_rank_wins_slot() {
    let loadout = loadout_for(&[1243, 10938, 133, 25306]);

    assert_eq!(loadout.get(Slot::PowerWordFortitude), Some(AbilityId(10938)));
    assert_eq!(loadout.get(Slot::Fireball), Some(AbilityId(25306)));
}

#[test]
fn test_greater_blessing_outranks_every_blessing_rank() {
    let loadout = loadout_for(&[19740, 25291, 25782]);

    assert_eq!(loadout.get(Slot::BlessingOfMight), Some(AbilityId(25782)));
}

#[test]
fn test_heals_sorted_strongest_first() {
    let loadout = loadout_for(&[2050, 2053, 2061, 2052, 139, 25315]);

    assert_eq!(
        loadout.direct_heals,
        vec![AbilityId(2061), AbilityId(2053), AbilityId(2052), AbilityId(2050)]
    );
    assert_eq!(loadout.periodic_heals, vec![AbilityId(25315), AbilityId(139)]);
}

#[test]
fn test_passive_talents_recorded() {
    let loadout = loadout_for(&[133, 11069, 11095]);

    assert!(loadout.has_talent(Talent::ImprovedFireball));
    assert!(loadout.has_talent(Talent::ImprovedScorch));
    assert!(!loadout.has_talent(Talent::ImprovedArcaneMissiles));
    assert!(!loadout.contains(AbilityId(11069)));
}
