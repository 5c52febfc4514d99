//! Headless scenario execution
//!
//! Runs a party of bots against a handful of hostiles inside the sandbox,
//! driven by a bevy `ScheduleRunnerPlugin` loop. Each frame advances the
//! simulation by a fixed step, so a seeded run is fully reproducible.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::bot::abilities::{AbilityId, PowerType};
use crate::bot::ability_config::{load_ability_catalog, AbilityCatalog};
use crate::bot::agent::PartyBot;
use crate::bot::character::CharacterClass;
use crate::bot::commands::{CommandBuffer, CommandSink};
use crate::bot::rng::BotRng;
use crate::bot::slot_table::{load_slot_table, SlotTable};
use crate::bot::world::{GroupInfo, UnitKind, WorldQuery};
use crate::sandbox::SandboxWorld;

use super::config::{parse_marker, MemberConfig, ScenarioConfig};

/// How a scenario ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Every hostile died
    Victory,
    /// The leader and every bot died
    Defeat,
    /// Time ran out first
    Timeout,
}

/// Result of a completed headless scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub outcome: Outcome,
    /// Simulated duration in seconds
    pub duration_secs: f32,
    /// Random seed used (if deterministic mode)
    pub random_seed: Option<u64>,
    pub members: Vec<MemberResult>,
    pub hostiles_alive: usize,
    /// Total casts resolved by anyone
    pub casts: usize,
}

/// Statistics for one bot after the scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResult {
    pub class_name: String,
    pub role: String,
    pub survived: bool,
    pub max_health: u32,
    pub final_health: u32,
    pub damage_done: u32,
    pub damage_taken: u32,
    pub healing_done: u32,
    pub casts: u32,
}

impl ScenarioResult {
    /// Write the result as pretty JSON.
    pub fn save_to_file(&self, path: &str) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize result: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("Failed to write {}: {}", path, e))
    }

    /// One-line summary, as printed at the end of a run.
    pub fn summary(&self) -> String {
        format!(
            "Scenario '{}' finished: {:?} after {:.1}s ({} hostiles alive, {} casts)",
            self.name, self.outcome, self.duration_secs, self.hostiles_alive, self.casts
        )
    }
}

// ============================================================================
// Scenario State
// ============================================================================

/// Everything one run owns. Built before the app starts so configuration
/// errors surface as `Err` instead of a panic inside a system.
#[derive(Resource)]
pub struct ScenarioState {
    pub name: String,
    pub world: SandboxWorld,
    pub bots: Vec<PartyBot>,
    pub leader: Entity,
    pub hostiles: Vec<Entity>,
    buffer: CommandBuffer,
    tick_ms: u32,
    max_duration_ms: u64,
    random_seed: Option<u64>,
    pub complete: bool,
}

/// Shared slot the finished result is written to; it outlives the app.
#[derive(Resource, Clone, Default)]
pub struct ScenarioOutcome(pub Arc<Mutex<Option<ScenarioResult>>>);

/// Health, power type, power and max power for a fresh character.
fn class_pools(class: CharacterClass, level: u32) -> (u32, PowerType, u32, u32) {
    let health = level * 60 + 200;
    match class {
        CharacterClass::Warrior => (health, PowerType::Rage, 0, 100),
        CharacterClass::Rogue => (health, PowerType::Energy, 100, 100),
        _ => {
            let mana = level * 40 + 100;
            (health, PowerType::Mana, mana, mana)
        }
    }
}

impl ScenarioState {
    pub fn new(
        config: &ScenarioConfig,
        catalog: Arc<AbilityCatalog>,
        slot_table: Arc<SlotTable>,
    ) -> Result<Self, String> {
        config.validate()?;
        let mut world = SandboxWorld::with_catalog(catalog);

        let leader = spawn_member(&mut world, &config.leader, config)?;
        let mut members = vec![leader];
        let mut bots = Vec::new();
        for (index, member) in config.party.iter().enumerate() {
            let entity = spawn_member(&mut world, member, config)?;
            let role = member.parse_role()?;
            let rng = match config.random_seed {
                Some(seed) => BotRng::from_seed(seed.wrapping_add(index as u64)),
                None => BotRng::from_entropy(),
            };
            if let Some(role) = role {
                world.set_role(entity, role);
            }
            bots.push(PartyBot::new(
                entity,
                member.parse_class()?,
                leader,
                role,
                slot_table.clone(),
                rng,
            ));
            members.push(entity);
        }

        let mut hostiles = Vec::new();
        for hostile in &config.hostiles {
            let creature_type = hostile.parse_creature_type()?;
            let position = Vec3::from_array(hostile.position);
            let entity = world.spawn_unit(UnitKind::Creature, position, |u| {
                u.level = hostile.level;
                u.entry = hostile.entry;
                u.creature_type = creature_type;
                u.max_health = hostile.health;
                u.health = hostile.health;
                u.map_id = config.map_id;
                u.in_instance = config.in_instance;
                if hostile.caster {
                    let mana = hostile.level * 40 + 100;
                    u.power = mana;
                    u.max_power = mana;
                } else {
                    u.power_type = PowerType::Rage;
                    u.power = 0;
                }
            });
            if let Some(unit) = world.sandbox_unit_mut(entity) {
                unit.name = hostile.name.clone();
                unit.aggro_radius = hostile.aggro_radius;
                if let Some(damage) = hostile.melee_damage {
                    unit.melee_damage = damage;
                }
            }
            for member in &members {
                world.set_hostile(*member, entity);
            }
            hostiles.push(entity);
        }

        world.add_group(GroupInfo {
            leader: Some(leader),
            raid: config.raid,
            members: members.iter().copied().collect(),
            marks: Default::default(),
        });
        for mark in &config.marks {
            world.mark(leader, parse_marker(&mark.marker)?, hostiles[mark.hostile]);
        }

        info!(
            "Scenario '{}' set up: leader + {} bots vs {} hostiles",
            config.name,
            bots.len(),
            hostiles.len()
        );

        Ok(Self {
            name: config.name.clone(),
            world,
            bots,
            leader,
            hostiles,
            buffer: CommandBuffer::new(),
            tick_ms: config.tick_ms,
            max_duration_ms: (config.max_duration_secs * 1000.0) as u64,
            random_seed: config.random_seed,
            complete: false,
        })
    }

    /// Advance one frame: leader script, every bot, then the world.
    pub fn step(&mut self) {
        self.drive_leader();

        for bot in self.bots.iter_mut() {
            bot.update(self.tick_ms, &self.world, &self.world, &mut self.buffer);
            self.world.apply(&mut self.buffer);
            let entity = bot.entity();
            for reply in bot.outbound().drain() {
                debug!("{:?} outbound {:?}", entity, reply);
            }
            if bot.is_initialized() {
                self.world.set_role(bot.entity(), bot.role());
            }
        }

        self.world.tick(self.tick_ms);
    }

    /// The leader walks to the closest living hostile and attacks it.
    fn drive_leader(&mut self) {
        let Some(leader) = self.world.unit(self.leader) else {
            return;
        };
        if leader.is_dead() {
            return;
        }
        if leader.victim.map(|v| self.world.can_attack(leader.entity, v)).unwrap_or(false) {
            return;
        }

        let target = self
            .hostiles
            .iter()
            .filter_map(|h| self.world.unit(*h))
            .filter(|h| h.is_alive())
            .min_by(|a, b| leader.distance_to(a).total_cmp(&leader.distance_to(b)));
        if let Some(target) = target {
            debug!("Leader pulling {:?}", target.entity);
            self.buffer.request_attack(leader.entity, target.entity, true);
            self.buffer.request_chase(leader.entity, target.entity, 1.0);
            self.world.apply(&mut self.buffer);
        }
    }

    /// The outcome, once there is one.
    pub fn outcome(&self) -> Option<Outcome> {
        let alive = |e: &Entity| self.world.unit(*e).map(|u| u.is_alive()).unwrap_or(false);
        if !self.hostiles.iter().any(alive) {
            return Some(Outcome::Victory);
        }
        let party_alive = alive(&self.leader) || self.bots.iter().any(|b| alive(&b.entity()));
        if !party_alive {
            return Some(Outcome::Defeat);
        }
        if self.world.elapsed_ms() >= self.max_duration_ms {
            return Some(Outcome::Timeout);
        }
        None
    }

    pub fn build_result(&self, outcome: Outcome) -> ScenarioResult {
        let members = self
            .bots
            .iter()
            .map(|bot| {
                let unit = self.world.unit(bot.entity());
                let stats = self.world.stats(bot.entity());
                MemberResult {
                    class_name: bot.class().name().to_string(),
                    role: bot.role().name().to_string(),
                    survived: unit.as_ref().map(|u| u.is_alive()).unwrap_or(false),
                    max_health: unit.as_ref().map(|u| u.max_health).unwrap_or(0),
                    final_health: unit.as_ref().map(|u| u.health).unwrap_or(0),
                    damage_done: stats.damage_done,
                    damage_taken: stats.damage_taken,
                    healing_done: stats.healing_done,
                    casts: stats.casts,
                }
            })
            .collect();

        ScenarioResult {
            name: self.name.clone(),
            outcome,
            duration_secs: self.world.elapsed_ms() as f32 / 1000.0,
            random_seed: self.random_seed,
            members,
            hostiles_alive: self
                .hostiles
                .iter()
                .filter(|h| self.world.unit(**h).map(|u| u.is_alive()).unwrap_or(false))
                .count(),
            casts: self.world.cast_log().len(),
        }
    }
}

fn spawn_member(
    world: &mut SandboxWorld,
    member: &MemberConfig,
    config: &ScenarioConfig,
) -> Result<Entity, String> {
    let class = member.parse_class()?;
    let race = member.parse_race()?;
    for id in &member.abilities {
        if world.catalog().get(AbilityId(*id)).is_none() {
            return Err(format!("Unknown ability id {} for {}", id, member.class));
        }
    }

    let (health, power_type, power, max_power) = class_pools(class, member.level);
    let health = member.health.unwrap_or(health);
    let entity = world.spawn_unit(UnitKind::Player, Vec3::from_array(member.position), |u| {
        u.class = Some(class);
        u.race = race;
        u.level = member.level;
        u.max_health = health;
        u.health = health;
        u.power_type = power_type;
        u.power = power;
        u.max_power = max_power;
        u.map_id = config.map_id;
        u.in_instance = config.in_instance;
        u.has_shield = member.shield;
        u.main_hand.equipped = member.weapons[0];
        u.off_hand.equipped = member.weapons[1];
    });
    if let Some(unit) = world.sandbox_unit_mut(entity) {
        unit.name = format!("{} {}", class.name(), entity.index());
    }
    world.learn_all(entity, member.abilities.iter().map(|id| AbilityId(*id)));
    Ok(entity)
}

// ============================================================================
// Plugin & Systems
// ============================================================================

/// Plugin for headless scenario execution
pub struct HeadlessPlugin {
    pub outcome: ScenarioOutcome,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.outcome.clone())
            .add_systems(Update, (headless_step, headless_check_end).chain())
            .add_systems(PostUpdate, headless_exit_on_complete);
    }
}

fn headless_step(mut state: ResMut<ScenarioState>) {
    if !state.complete {
        state.step();
    }
}

/// Check for a victory, a wipe or a timeout
fn headless_check_end(mut state: ResMut<ScenarioState>, outcome: Res<ScenarioOutcome>) {
    if state.complete {
        return;
    }
    let Some(result) = state.outcome() else {
        return;
    };
    info!("Scenario '{}' ended: {:?}", state.name, result);
    let result = state.build_result(result);
    if let Ok(mut slot) = outcome.0.lock() {
        *slot = Some(result);
    }
    state.complete = true;
}

/// Exit the app when the scenario is complete
fn headless_exit_on_complete(state: Res<ScenarioState>, mut exit: EventWriter<AppExit>) {
    if state.complete {
        exit.send(AppExit::Success);
    }
}

// ============================================================================
// Entry Points
// ============================================================================

/// Run a scenario with the bundled ability catalog and slot table.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioResult, String> {
    let catalog = Arc::new(load_ability_catalog()?);
    let slot_table = Arc::new(load_slot_table()?);
    run_scenario_with(config, catalog, slot_table, false)
}

/// Run a scenario to completion and return its result.
pub fn run_scenario_with(
    config: &ScenarioConfig,
    catalog: Arc<AbilityCatalog>,
    slot_table: Arc<SlotTable>,
    with_logging: bool,
) -> Result<ScenarioResult, String> {
    let state = ScenarioState::new(config, catalog, slot_table)?;
    let outcome = ScenarioOutcome::default();

    let mut app = App::new();
    // Frames are simulated time, not wall time: run them back to back.
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::ZERO)));
    if with_logging {
        app.add_plugins(LogPlugin::default());
    }
    app.insert_resource(state)
        .add_plugins(HeadlessPlugin {
            outcome: outcome.clone(),
        })
        .run();

    let result = outcome
        .0
        .lock()
        .map_err(|_| "Scenario result lock poisoned".to_string())?
        .take();
    result.ok_or_else(|| format!("Scenario '{}' stopped without a result", config.name))
}

/// Run a headless scenario from the CLI: progress on stdout, result saved
/// to `output_path` when set.
pub fn run_headless_scenario(config: ScenarioConfig) -> Result<(), String> {
    println!("Starting headless scenario '{}'...", config.name);
    println!("  Leader: {}", config.leader.class);
    let party: Vec<&str> = config.party.iter().map(|m| m.class.as_str()).collect();
    println!("  Party: {:?}", party);
    println!("  Hostiles: {}", config.hostiles.len());
    println!("  Max duration: {:.0}s", config.max_duration_secs);

    let catalog = Arc::new(load_ability_catalog()?);
    let slot_table = Arc::new(load_slot_table()?);
    let result = run_scenario_with(&config, catalog, slot_table, true)?;

    println!("{}", result.summary());
    for member in &result.members {
        println!(
            "  {} ({}): {}/{} hp, {} damage, {} healing, {} casts",
            member.class_name,
            member.role,
            member.final_health,
            member.max_health,
            member.damage_done,
            member.healing_done,
            member.casts
        );
    }

    if let Some(path) = &config.output_path {
        match result.save_to_file(path) {
            Ok(()) => println!("Result saved to: {}", path),
            Err(e) => eprintln!("Failed to save result: {}", e),
        }
    }
    Ok(())
}
