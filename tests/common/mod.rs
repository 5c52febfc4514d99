//! Shared fixtures for the integration tests
//!
//! Builds a small sandbox party (a leader plus one bot) using the bundled
//! ability catalog and slot table.

#![allow(dead_code)]

use std::sync::Arc;

use bevy::prelude::*;
use partybot::bot::abilities::{AbilityId, PowerType};
use partybot::bot::ability_config::{load_ability_catalog, AbilityCatalog};
use partybot::bot::agent::{PartyBot, FIRST_UPDATE_DELAY_MS, UPDATE_INTERVAL_MS};
use partybot::bot::character::{CharacterClass, Race};
use partybot::bot::commands::CommandBuffer;
use partybot::bot::rng::BotRng;
use partybot::bot::role::Role;
use partybot::bot::slot_table::{load_slot_table, SlotTable};
use partybot::bot::world::{GroupInfo, UnitKind};
use partybot::sandbox::SandboxWorld;

pub fn catalog() -> Arc<AbilityCatalog> {
    Arc::new(load_ability_catalog().expect("bundled ability catalog should load"))
}

pub fn slot_table() -> Arc<SlotTable> {
    Arc::new(load_slot_table().expect("bundled slot table should load"))
}

pub fn ids(raw: &[u32]) -> Vec<AbilityId> {
    raw.iter().copied().map(AbilityId).collect()
}

/// Spawn a player with the health and power pools of a fresh character.
pub fn spawn_player(world: &mut SandboxWorld, class: CharacterClass, level: u32, position: Vec3) -> Entity {
    world.spawn_unit(UnitKind::Player, position, |u| {
        u.class = Some(class);
        u.race = Some(Race::Human);
        u.level = level;
        u.max_health = level * 60 + 200;
        u.health = u.max_health;
        match class {
            CharacterClass::Warrior => {
                u.power_type = PowerType::Rage;
                u.power = 0;
                u.max_power = 100;
            }
            CharacterClass::Rogue => {
                u.power_type = PowerType::Energy;
                u.power = 100;
                u.max_power = 100;
            }
            _ => {
                u.power_type = PowerType::Mana;
                u.max_power = level * 40 + 100;
                u.power = u.max_power;
            }
        }
        u.main_hand.equipped = true;
    })
}

/// Spawn a creature hostile to every unit in `enemies`.
pub fn spawn_hostile(world: &mut SandboxWorld, position: Vec3, health: u32, enemies: &[Entity]) -> Entity {
    let hostile = world.spawn_unit(UnitKind::Creature, position, |u| {
        u.level = 38;
        u.max_health = health;
        u.health = health;
        u.power_type = PowerType::Rage;
        u.power = 0;
    });
    for enemy in enemies {
        world.set_hostile(*enemy, hostile);
    }
    hostile
}

/// A leader and one bot, grouped together.
pub struct Party {
    pub world: SandboxWorld,
    pub leader: Entity,
    pub bot: PartyBot,
}

impl Party {
    /// Level 40 party: high enough for the basic consumables, below the
    /// level where elixirs and flasks take over the out-of-combat tick.
    pub fn new(class: CharacterClass, role: Option<Role>, abilities: &[u32], bot_position: Vec3) -> Self {
        let mut world = SandboxWorld::with_catalog(catalog());
        let leader = spawn_player(&mut world, CharacterClass::Warrior, 40, Vec3::ZERO);
        let member = spawn_player(&mut world, class, 40, bot_position);
        world.learn_all(member, ids(abilities));
        world.add_group(GroupInfo {
            leader: Some(leader),
            members: [leader, member].into_iter().collect(),
            ..Default::default()
        });

        let bot = PartyBot::new(member, class, leader, role, slot_table(), BotRng::from_seed(11));
        Self { world, leader, bot }
    }

    /// Spawn another player at `position` and put it in the party.
    pub fn add_member(&mut self, class: CharacterClass, position: Vec3) -> Entity {
        let member = spawn_player(&mut self.world, class, 40, position);
        self.world.join_group(self.leader, member);
        member
    }

    pub fn me(&self) -> Entity {
        self.bot.entity()
    }

    /// Run the first-tick setup and apply whatever it asked for.
    pub fn initialize(&mut self) {
        let mut buffer = CommandBuffer::new();
        self.bot
            .update(FIRST_UPDATE_DELAY_MS, &self.world, &self.world, &mut buffer);
        assert!(self.bot.is_initialized(), "bot should initialize after the first delay");
        self.world.apply(&mut buffer);
    }

    /// One decision cycle. The commands are returned without being applied.
    pub fn decide(&mut self) -> CommandBuffer {
        let mut buffer = CommandBuffer::new();
        self.bot
            .update(UPDATE_INTERVAL_MS, &self.world, &self.world, &mut buffer);
        buffer
    }

    /// One decision cycle whose commands are applied, then the world clock
    /// advanced by the same interval.
    pub fn step(&mut self) -> CommandBuffer {
        let mut buffer = self.decide();
        let recorded = CommandBuffer {
            commands: buffer.commands.clone(),
            cast_result: None,
        };
        self.world.apply(&mut buffer);
        self.world.tick(UPDATE_INTERVAL_MS);
        recorded
    }
}
