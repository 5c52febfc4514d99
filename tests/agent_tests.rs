//! Integration tests for the agent lifecycle
//!
//! These tests verify that:
//! - Nothing happens before the first-update delay
//! - Roles are classified from known abilities on the first tick
//! - An agent whose leader left the group asks to be removed
//! - Idle agents follow, or teleport when too far away
//! - Dead agents revive at the leader once the wait runs out, marked
//!   Honorless Target
//! - Session hooks reset the agent and answer protocol messages

mod common;

use bevy::prelude::*;
use common::{spawn_player, Party};
use partybot::bot::agent::{AUTO_REVIVE_WAIT_MS, FIRST_UPDATE_DELAY_MS, UPDATE_INTERVAL_MS};
use partybot::bot::character::CharacterClass;
use partybot::bot::commands::{Command, CommandBuffer, OutboundCommand};
use partybot::bot::rng::BotRng;
use partybot::bot::role::Role;
use partybot::bot::session::{on_login, on_message, SessionMessage};
use partybot::bot::consumables::HONORLESS_TARGET;
use partybot::bot::world::{GroupInfo, LifeState, WorldQuery, WorldQueryExt};
use partybot::sandbox::SandboxWorld;
use partybot::PartyBot;

// ============================================================================
// Initialization
// ============================================================================

#[test]
fn test_no_decisions_before_first_update_delay() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-20.0, 0.0, 0.0));
    let mut buffer = CommandBuffer::new();

    party
        .bot
        .update(FIRST_UPDATE_DELAY_MS - 1, &party.world, &party.world, &mut buffer);
    assert!(!party.bot.is_initialized());
    assert!(buffer.commands.is_empty());

    party.bot.update(1, &party.world, &party.world, &mut buffer);
    assert!(party.bot.is_initialized());
}

#[test]
fn test_role_classified_from_signature_ability() {
    let mut tank = Party::new(CharacterClass::Warrior, None, &[78, 23922], Vec3::new(-3.0, 0.0, 0.0));
    tank.initialize();
    assert_eq!(tank.bot.role(), Role::Tank);

    let mut dps = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-3.0, 0.0, 0.0));
    dps.initialize();
    assert_eq!(dps.bot.role(), Role::MeleeDps);

    let mut shadow = Party::new(CharacterClass::Priest, None, &[2050, 15473], Vec3::new(-3.0, 0.0, 0.0));
    shadow.initialize();
    assert_eq!(shadow.bot.role(), Role::RangeDps);
}

#[test]
fn test_forced_role_overrides_classification() {
    let mut party = Party::new(
        CharacterClass::Warrior,
        Some(Role::MeleeDps),
        &[78, 23922],
        Vec3::new(-3.0, 0.0, 0.0),
    );
    party.initialize();
    assert_eq!(party.bot.role(), Role::MeleeDps);
}

#[test]
fn test_loadout_built_on_first_tick() {
    let mut party = Party::new(CharacterClass::Priest, None, &[2050, 2052, 139], Vec3::new(-3.0, 0.0, 0.0));
    party.initialize();

    let loadout = &party.bot.state().loadout;
    assert_eq!(loadout.direct_heals.len(), 2);
    assert_eq!(loadout.periodic_heals.len(), 1);
}

// ============================================================================
// Group Membership
// ============================================================================

#[test]
fn test_removal_requested_when_leader_not_in_group() {
    let mut world = SandboxWorld::with_catalog(common::catalog());
    let leader = spawn_player(&mut world, CharacterClass::Warrior, 40, Vec3::ZERO);
    let stranger = spawn_player(&mut world, CharacterClass::Mage, 40, Vec3::Y);
    let me = spawn_player(&mut world, CharacterClass::Rogue, 40, Vec3::X);
    world.add_group(GroupInfo {
        leader: Some(stranger),
        members: [stranger, me].into_iter().collect(),
        ..Default::default()
    });
    let mut bot = PartyBot::new(me, CharacterClass::Rogue, leader, None, common::slot_table(), BotRng::from_seed(3));

    let mut buffer = CommandBuffer::new();
    bot.update(FIRST_UPDATE_DELAY_MS, &world, &world, &mut buffer);
    bot.update(UPDATE_INTERVAL_MS, &world, &world, &mut buffer);

    assert!(buffer.contains(|c| matches!(c, Command::Removal { agent } if *agent == me)));
}

#[test]
fn test_removal_requested_without_group() {
    let mut world = SandboxWorld::with_catalog(common::catalog());
    let leader = spawn_player(&mut world, CharacterClass::Warrior, 40, Vec3::ZERO);
    let me = spawn_player(&mut world, CharacterClass::Rogue, 40, Vec3::X);
    let mut bot = PartyBot::new(me, CharacterClass::Rogue, leader, None, common::slot_table(), BotRng::from_seed(3));

    let mut buffer = CommandBuffer::new();
    bot.update(FIRST_UPDATE_DELAY_MS, &world, &world, &mut buffer);
    bot.update(UPDATE_INTERVAL_MS, &world, &world, &mut buffer);

    assert!(buffer.contains(|c| matches!(c, Command::Removal { agent } if *agent == me)));
}

// ============================================================================
// Movement
// ============================================================================

#[test]
fn test_idle_agent_follows_leader() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-20.0, 0.0, 0.0));
    party.initialize();
    let leader = party.leader;

    let commands = party.decide();

    assert!(commands.contains(|c| matches!(c, Command::Follow { leader: l, .. } if *l == leader)));
}

#[test]
fn test_distant_agent_teleports_to_leader() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-150.0, 0.0, 0.0));
    party.initialize();
    let leader = party.leader;

    let commands = party.decide();

    assert!(commands.contains(|c| matches!(c, Command::TeleportTo { destination, .. } if *destination == leader)));
    assert!(!commands.contains(|c| matches!(c, Command::Follow { .. })));
}

#[test]
fn test_agent_on_other_map_teleports() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-3.0, 0.0, 0.0));
    let me = party.me();
    party.world.update_unit(me, |u| u.map_id = 1);
    party.initialize();

    let commands = party.decide();

    assert!(commands.contains(|c| matches!(c, Command::TeleportTo { .. })));
}

// ============================================================================
// Death
// ============================================================================

#[test]
fn test_dead_agent_waits_before_auto_revive() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-3.0, 0.0, 0.0));
    let me = party.me();
    party.world.update_unit(me, |u| {
        u.life = LifeState::Corpse;
        u.health = 0;
    });
    party.initialize();

    let early = party.decide();
    assert!(!early.contains(|c| matches!(c, Command::Revive { .. })));

    let mut revived = false;
    let mut waited = FIRST_UPDATE_DELAY_MS + UPDATE_INTERVAL_MS;
    while waited <= AUTO_REVIVE_WAIT_MS + 2 * UPDATE_INTERVAL_MS {
        let commands = party.decide();
        waited += UPDATE_INTERVAL_MS;
        if commands.contains(|c| matches!(c, Command::Revive { agent } if *agent == me)) {
            assert!(commands.contains(|c| matches!(c, Command::TeleportTo { .. })));
            revived = true;
            break;
        }
    }

    assert!(revived, "agent should revive after waiting");
    assert!(waited > AUTO_REVIVE_WAIT_MS);
}

#[test]
fn test_ghost_revives_immediately() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-3.0, 0.0, 0.0));
    let me = party.me();
    party.world.update_unit(me, |u| {
        u.life = LifeState::Ghost;
        u.health = 0;
    });
    party.initialize();

    let mut commands = party.decide();

    assert!(commands.contains(|c| matches!(c, Command::Revive { agent } if *agent == me)));
    assert_eq!(commands.actions().len(), 1);

    party.world.apply(&mut commands);
    let revived = party.world.unit(me).expect("agent");
    assert!(revived.is_alive());
    assert!(party.world.has_aura(me, HONORLESS_TARGET));
}

#[test]
fn test_dead_agent_stays_down_while_leader_fights() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-3.0, 0.0, 0.0));
    let me = party.me();
    let leader = party.leader;
    party.world.update_unit(me, |u| {
        u.life = LifeState::Corpse;
        u.health = 0;
    });
    party.world.update_unit(leader, |u| u.in_combat = true);
    party.initialize();

    let mut buffer = CommandBuffer::new();
    party
        .bot
        .update(AUTO_REVIVE_WAIT_MS * 2, &party.world, &party.world, &mut buffer);

    assert!(!buffer.contains(|c| matches!(c, Command::Revive { .. })));
}

// ============================================================================
// Session
// ============================================================================

#[test]
fn test_login_resets_initialization() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78, 23922], Vec3::new(-3.0, 0.0, 0.0));
    party.initialize();
    assert!(party.bot.is_initialized());

    on_login(&mut party.bot);
    assert!(!party.bot.is_initialized());

    party.initialize();
    assert_eq!(party.bot.role(), Role::Tank);
}

#[test]
fn test_resurrect_request_is_accepted() {
    let mut party = Party::new(CharacterClass::Warrior, None, &[78], Vec3::new(-3.0, 0.0, 0.0));
    let caster = party.leader;

    on_message(&mut party.bot, SessionMessage::ResurrectRequest { caster }, false);

    assert_eq!(
        party.bot.outbound().pop(),
        Some(OutboundCommand::AcceptResurrect { caster })
    );
}
