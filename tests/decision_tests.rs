//! Integration tests for single decision cycles
//!
//! These tests verify that:
//! - Healers pick the heal closest to the missing health
//! - A critically hurt member is healed before anyone is dispelled or renewed
//! - Heal priority runs own subgroup, then other subgroups, then pets
//! - Heal claims keep a second healer off the same target
//! - Buff rounds cover the agent first, then the party
//! - Harmful magic on a party member gets dispelled, even by a hurt tank
//!   with no heal to fall back on
//! - Agents low on mana sit down to drink and stay down
//! - Mages polymorph a second attacker instead of nuking
//! - Tanks pick up loose mobs and taunt them off the party
//! - Nothing is attacked when nothing around is attackable
//! - Encounter rules move agents out of hazards before they fight
//! - No decision cycle issues more than one cast or movement

mod common;

use bevy::prelude::*;
use common::{spawn_hostile, Party};
use partybot::bot::abilities::{AbilityId, DispelType, ShapeshiftForm};
use partybot::bot::character::CharacterClass;
use partybot::bot::commands::Command;
use partybot::bot::consumables::DRINK;
use partybot::bot::mechanics::molten_core;
use partybot::bot::role::Role;
use partybot::bot::world::{AuraInfo, HealClaim, HealKind, LifeState, UnitKind};

const LESSER_HEAL_RANK_2: AbilityId = AbilityId(2052);
const RENEW: AbilityId = AbilityId(139);
const FORTITUDE: AbilityId = AbilityId(1243);
const DISPEL_MAGIC: AbilityId = AbilityId(527);
const POLYMORPH: AbilityId = AbilityId(118);
const TAUNT: AbilityId = AbilityId(355);

fn debuff(dispel: DispelType) -> AuraInfo {
    AuraInfo {
        ability: AbilityId(589),
        chain_head: AbilityId(589),
        caster: None,
        stacks: 1,
        positive: false,
        dispel,
        periodic_heal: false,
        exclusive_group: None,
        group_power: 0,
    }
}

fn healer_priest(abilities: &[u32]) -> Party {
    let mut party = Party::new(
        CharacterClass::Priest,
        Some(Role::Healer),
        abilities,
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    party
}

// ============================================================================
// Healing
// ============================================================================

#[test]
fn test_priest_picks_heal_closest_to_missing_health() {
    let mut party = healer_priest(&[2050, 2052, 2053]);
    let leader = party.leader;
    // 80 missing: rank 3 heals 146, rank 2 heals 79.
    party.world.update_unit(leader, |u| {
        u.max_health = 150;
        u.health = 70;
    });

    let commands = party.decide();

    assert_eq!(commands.casts(), vec![(leader, LESSER_HEAL_RANK_2)]);
    assert!(commands.contains(|c| matches!(
        c,
        Command::ClaimHeal { target, kind: HealKind::Direct, .. } if *target == leader
    )));
}

#[test]
fn test_priest_renews_moderately_injured_member() {
    let mut party = healer_priest(&[2050, 139]);
    let leader = party.leader;
    party.world.update_unit(leader, |u| {
        u.max_health = 1000;
        u.health = 600;
    });

    let commands = party.decide();

    assert_eq!(commands.last_cast(), Some((leader, RENEW)));
    assert!(commands.contains(|c| matches!(
        c,
        Command::ClaimHeal { kind: HealKind::Periodic, .. }
    )));
}

#[test]
fn test_critical_member_is_healed_before_renewing_lightly_injured() {
    let mut party = healer_priest(&[2050, 2052, 2053, 139]);
    let me = party.me();
    let leader = party.leader;
    let hurt = party.add_member(CharacterClass::Rogue, Vec3::new(0.0, 4.0, 0.0));
    party.world.update_unit(me, |u| u.in_combat = true);
    party.world.update_unit(leader, |u| u.health = u.max_health * 7 / 10);
    party.world.update_unit(hurt, |u| u.health = u.max_health * 3 / 10);

    let commands = party.decide();

    let casts = commands.casts();
    assert_eq!(casts.len(), 1);
    assert_eq!(casts[0].0, hurt);
    assert_ne!(casts[0].1, RENEW);
}

#[test]
fn test_heal_priority_runs_subgroup_then_party_then_pets() {
    let mut party = healer_priest(&[2050, 2052, 2053]);
    let me = party.me();
    let leader = party.leader;
    let outsider = party.add_member(CharacterClass::Mage, Vec3::new(0.0, 4.0, 0.0));
    let pet = party.world.spawn_unit(UnitKind::Creature, Vec3::new(0.0, -4.0, 0.0), |u| {
        u.level = 40;
        u.max_health = 800;
        u.health = 200;
    });
    party.world.update_unit(me, |u| u.in_combat = true);
    party.world.update_unit(leader, |u| {
        u.pet = Some(pet);
        u.health = u.max_health * 4 / 10;
    });
    party.world.update_unit(outsider, |u| {
        u.subgroup = 1;
        u.health = u.max_health * 3 / 10;
    });

    let first = party.decide();
    assert_eq!(first.last_cast().map(|(target, _)| target), Some(leader));

    party.world.update_unit(leader, |u| u.health = u.max_health);
    let second = party.decide();
    assert_eq!(second.last_cast().map(|(target, _)| target), Some(outsider));

    party.world.update_unit(outsider, |u| u.health = u.max_health);
    let third = party.decide();
    assert_eq!(third.last_cast().map(|(target, _)| target), Some(pet));
}

#[test]
fn test_critical_healer_heals_itself_before_dispelling() {
    let cases = [
        (CharacterClass::Priest, vec![2050, 527], DispelType::Magic, DISPEL_MAGIC),
        (CharacterClass::Paladin, vec![635, 4987], DispelType::Magic, AbilityId(4987)),
        (CharacterClass::Shaman, vec![331, 526], DispelType::Poison, AbilityId(526)),
    ];

    for (class, abilities, dispel, dispel_ability) in cases {
        let mut party = Party::new(class, Some(Role::Healer), &abilities, Vec3::new(-3.0, 0.0, 0.0));
        party.initialize();
        let me = party.me();
        let leader = party.leader;
        let hostile = spawn_hostile(&mut party.world, Vec3::new(8.0, 0.0, 0.0), 2000, &[leader, me]);
        party.world.update_unit(hostile, |u| {
            u.victim = Some(leader);
            u.in_combat = true;
        });
        party.world.update_unit(leader, |u| {
            u.victim = Some(hostile);
            u.in_combat = true;
        });
        party.world.update_unit(me, |u| {
            u.in_combat = true;
            u.health = u.max_health * 4 / 10;
        });
        party.world.add_aura(leader, debuff(dispel));

        let commands = party.decide();

        let casts = commands.casts();
        assert_eq!(casts.len(), 1, "{:?} should cast exactly once", class);
        assert_eq!(casts[0].0, me, "{:?} should heal itself", class);
        assert_ne!(casts[0].1, dispel_ability, "{:?} dispelled while critical", class);
        assert_eq!(commands.actions().len(), 1, "{:?} also moved", class);
    }
}

#[test]
fn test_claimed_target_is_left_to_other_healer() {
    let mut party = healer_priest(&[2050, 2052, 2053]);
    let leader = party.leader;
    party.world.update_unit(leader, |u| {
        u.max_health = 150;
        u.health = 70;
    });
    let mut claim = HealClaim::default();
    claim.direct.set(2000);
    party.world.set_heal_claim(leader, claim);

    let commands = party.decide();

    assert!(commands.casts().is_empty());
}

// ============================================================================
// Buffs & Dispels
// ============================================================================

#[test]
fn test_fortitude_goes_on_self_then_leader() {
    let mut party = healer_priest(&[1243]);
    let me = party.me();
    let leader = party.leader;

    let first = party.step();
    assert_eq!(first.casts(), vec![(me, FORTITUDE)]);
    assert!(party.bot.state().is_buffing);

    // Let the global cooldown run out.
    party.world.tick(1000);

    let second = party.decide();
    assert_eq!(second.casts(), vec![(leader, FORTITUDE)]);
}

#[test]
fn test_dispel_magic_cleans_party_member() {
    let mut party = healer_priest(&[527]);
    let leader = party.leader;
    party.world.add_aura(leader, debuff(DispelType::Magic));

    let commands = party.decide();

    assert_eq!(commands.casts(), vec![(leader, DISPEL_MAGIC)]);
}

#[test]
fn test_tank_without_heals_falls_through_to_cleanse() {
    let mut party = Party::new(
        CharacterClass::Paladin,
        Some(Role::Tank),
        &[4987],
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    let me = party.me();
    let leader = party.leader;
    party.world.update_unit(me, |u| {
        u.in_combat = true;
        u.health = u.max_health * 3 / 10;
    });
    party.world.add_aura(leader, debuff(DispelType::Magic));

    let commands = party.decide();

    assert_eq!(commands.casts(), vec![(leader, AbilityId(4987))]);
}

// ============================================================================
// Resting
// ============================================================================

#[test]
fn test_low_mana_agent_drinks_and_keeps_resting() {
    let mut party = healer_priest(&[2050]);
    let me = party.me();
    party.world.update_unit(me, |u| u.power = u.max_power / 10);

    let first = party.step();
    assert!(first.contains(|c| matches!(
        c,
        Command::UseConsumable { agent, ability } if *agent == me && *ability == DRINK
    )));

    // Drinking now: nothing new is requested until the mana is back.
    let second = party.decide();
    assert!(second.commands.is_empty());
}

// ============================================================================
// Crowd Control
// ============================================================================

#[test]
fn test_mage_polymorphs_second_attacker() {
    let mut party = Party::new(
        CharacterClass::Mage,
        Some(Role::RangeDps),
        &[133, 118],
        Vec3::new(0.0, 5.0, 0.0),
    );
    party.initialize();
    let me = party.me();
    let leader = party.leader;

    let fighting_leader = spawn_hostile(&mut party.world, Vec3::new(20.0, 0.0, 0.0), 2000, &[leader, me]);
    let on_me = spawn_hostile(&mut party.world, Vec3::new(0.0, 25.0, 0.0), 2000, &[leader, me]);
    party.world.update_unit(fighting_leader, |u| {
        u.victim = Some(leader);
        u.in_combat = true;
    });
    party.world.update_unit(on_me, |u| {
        u.victim = Some(me);
        u.in_combat = true;
    });
    party.world.update_unit(leader, |u| {
        u.victim = Some(fighting_leader);
        u.target = Some(fighting_leader);
        u.in_combat = true;
    });
    party.world.update_unit(me, |u| {
        u.victim = Some(fighting_leader);
        u.target = Some(fighting_leader);
        u.in_combat = true;
        u.melee_attacking = true;
    });

    let commands = party.decide();

    assert_eq!(commands.last_cast(), Some((on_me, POLYMORPH)));
    assert!(!commands.casts().contains(&(fighting_leader, AbilityId(133))));
}

// ============================================================================
// Tanking & Target Selection
// ============================================================================

fn tank_warrior() -> Party {
    let mut party = Party::new(
        CharacterClass::Warrior,
        Some(Role::Tank),
        &[71, 355, 78],
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    let me = party.me();
    party.world.update_unit(me, |u| {
        u.form = ShapeshiftForm::DefensiveStance;
        u.in_combat = true;
        u.power = 50;
    });
    party
}

#[test]
fn test_tank_picks_up_mob_on_party_member() {
    let mut party = tank_warrior();
    let me = party.me();
    let leader = party.leader;
    let loose = spawn_hostile(&mut party.world, Vec3::new(-1.0, 0.0, 0.0), 2000, &[leader, me]);
    party.world.update_unit(loose, |u| {
        u.victim = Some(leader);
        u.in_combat = true;
    });

    let commands = party.decide();

    assert!(commands.contains(|c| matches!(
        c,
        Command::Attack { agent, target, .. } if *agent == me && *target == loose
    )));
    assert!(commands.actions().len() <= 1);
}

#[test]
fn test_tank_taunts_victim_off_party_member() {
    let mut party = tank_warrior();
    let me = party.me();
    let leader = party.leader;
    let loose = spawn_hostile(&mut party.world, Vec3::new(-1.0, 0.0, 0.0), 2000, &[leader, me]);
    party.world.update_unit(loose, |u| {
        u.victim = Some(leader);
        u.in_combat = true;
    });
    party.world.update_unit(me, |u| {
        u.victim = Some(loose);
        u.target = Some(loose);
        u.melee_attacking = true;
    });

    let commands = party.decide();

    assert_eq!(commands.casts(), vec![(loose, TAUNT)]);
}

#[test]
fn test_nothing_attackable_means_no_attack() {
    let mut party = Party::new(
        CharacterClass::Warrior,
        Some(Role::MeleeDps),
        &[78],
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    let me = party.me();
    let leader = party.leader;

    // Fighting the leader but not hostile to the agent.
    let neutral = spawn_hostile(&mut party.world, Vec3::new(2.0, 0.0, 0.0), 2000, &[leader]);
    // Hostile but already dead.
    let corpse = spawn_hostile(&mut party.world, Vec3::new(0.0, 3.0, 0.0), 2000, &[leader, me]);
    party.world.update_unit(neutral, |u| {
        u.victim = Some(leader);
        u.in_combat = true;
    });
    party.world.update_unit(corpse, |u| {
        u.victim = Some(me);
        u.health = 0;
        u.life = LifeState::Corpse;
    });
    party.world.update_unit(leader, |u| {
        u.victim = Some(neutral);
        u.in_combat = true;
    });
    party.world.update_unit(me, |u| u.in_combat = true);

    let commands = party.decide();

    assert!(!commands.contains(|c| matches!(c, Command::Attack { .. })));
    assert!(commands.casts().is_empty());
}

// ============================================================================
// Encounter Mechanics
// ============================================================================

#[test]
fn test_fire_bomb_moves_agent_instead_of_attacking() {
    let mut party = Party::new(
        CharacterClass::Warrior,
        Some(Role::MeleeDps),
        &[78],
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    let me = party.me();
    let leader = party.leader;

    let hostile = spawn_hostile(&mut party.world, Vec3::new(2.0, 0.0, 0.0), 2000, &[leader, me]);
    for unit in [me, leader, hostile] {
        party.world.update_unit(unit, |u| {
            u.map_id = molten_core::MAP_ID;
            u.in_instance = true;
            u.in_combat = true;
        });
    }
    party.world.update_unit(hostile, |u| u.victim = Some(leader));
    party.world.update_unit(me, |u| {
        u.victim = Some(hostile);
        u.target = Some(hostile);
    });
    party.world.add_object(molten_core::FIRE_BOMB, Vec3::new(-1.0, 0.0, 0.0));

    let commands = party.decide();

    assert!(commands.contains(|c| matches!(c, Command::Move { agent, .. } if *agent == me)));
    assert!(commands.casts().is_empty());
    assert!(!commands.contains(|c| matches!(c, Command::Attack { .. })));
}

#[test]
fn test_fire_bomb_wins_over_picking_a_new_target() {
    let mut party = Party::new(
        CharacterClass::Warrior,
        Some(Role::MeleeDps),
        &[78],
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    let me = party.me();
    let leader = party.leader;

    let hostile = spawn_hostile(&mut party.world, Vec3::new(2.0, 0.0, 0.0), 2000, &[leader, me]);
    for unit in [me, leader, hostile] {
        party.world.update_unit(unit, |u| {
            u.map_id = molten_core::MAP_ID;
            u.in_instance = true;
            u.in_combat = true;
        });
    }
    party.world.update_unit(hostile, |u| u.victim = Some(leader));
    party.world.update_unit(leader, |u| u.victim = Some(hostile));
    party.world.add_object(molten_core::FIRE_BOMB, Vec3::new(-1.0, 0.0, 0.0));

    let commands = party.decide();

    assert!(commands.contains(|c| matches!(c, Command::Move { agent, .. } if *agent == me)));
    assert!(!commands.contains(|c| matches!(c, Command::Attack { .. })));
}

// ============================================================================
// One Action Per Cycle
// ============================================================================

#[test]
fn test_every_class_issues_at_most_one_action_per_cycle() {
    let fixtures: [(CharacterClass, Role, &[u32], bool); 7] = [
        (CharacterClass::Priest, Role::Healer, &[2050, 2052, 2053, 139, 14751, 585], false),
        (CharacterClass::Paladin, Role::Healer, &[635, 19750, 20473, 20216, 4987], false),
        (CharacterClass::Rogue, Role::MeleeDps, &[1752, 14183, 14177], true),
        (CharacterClass::Rogue, Role::MeleeDps, &[1752, 14177], false),
        (CharacterClass::Mage, Role::RangeDps, &[116, 122, 133], false),
        (CharacterClass::Warrior, Role::Tank, &[71, 2457, 355, 7386, 78], false),
        (CharacterClass::Hunter, Role::RangeDps, &[75, 3044, 2973], false),
    ];

    for (class, role, abilities, stealthed) in fixtures {
        let mut party = Party::new(class, Some(role), abilities, Vec3::new(-1.0, 0.0, 0.0));
        party.initialize();
        let me = party.me();
        let leader = party.leader;

        let hostile = spawn_hostile(&mut party.world, Vec3::new(0.5, 0.0, 0.0), 5000, &[leader, me]);
        party.world.update_unit(hostile, |u| {
            u.victim = Some(me);
            u.in_combat = true;
        });
        party.world.update_unit(leader, |u| {
            u.victim = Some(hostile);
            u.in_combat = true;
            u.health = u.max_health * 3 / 10;
        });
        party.world.update_unit(me, |u| {
            u.victim = Some(hostile);
            u.target = Some(hostile);
            u.in_combat = true;
            u.stealthed = stealthed;
        });

        for cycle in 0..6 {
            let commands = party.step();
            assert!(
                commands.actions().len() <= 1,
                "{:?} {:?} cycle {} issued {:?}",
                class,
                role,
                cycle,
                commands.actions()
            );
        }
    }
}
