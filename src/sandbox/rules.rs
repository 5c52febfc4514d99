//! Simplified combat rules
//!
//! Applies recorded agent commands and advances the sandbox clock. Numbers
//! are nominal: abilities deal their catalog `damage_amount` and heal their
//! `heal_amount`, nothing crits, nothing misses.
//!
//! ## Tick order
//! 1. Cooldowns, global cooldowns, heal claims
//! 2. Casts with a cast time
//! 3. Movement orders
//! 4. Auras: periodic ticks and expiry
//! 5. Resting, power regeneration
//! 6. Auto-attacks and auto-repeat shots
//! 7. Creature aggro, combat flags, deaths

use bevy::prelude::*;

use crate::bot::abilities::{
    AbilityEffect, AbilityId, AbilityInfo, AuraState, DamageClass, Mechanic, PowerType, ShapeshiftForm,
};
use crate::bot::character::CharacterClass;
use crate::bot::commands::{CancelAura, Command, CommandBuffer};
use crate::bot::consumables::{DRINK, DRINK_50, FOOD, HONORLESS_TARGET};
use crate::bot::eligibility::can_attempt;
use crate::bot::movement::offset_point;
use crate::bot::timers::SaturatingCountdown;
use crate::bot::world::{
    AbilityBook, HealKind, LifeState, UnitKind, WeaponHand, WorldQuery,
};

use super::world::{
    CastRecord, Motion, PendingCast, SandboxWorld, GLOBAL_COOLDOWN_MS, PERIODIC_TICK_MS, SWING_INTERVAL_MS,
};

/// Yards per second on foot.
pub const RUN_SPEED: f32 = 7.0;
/// Yards per second mounted.
pub const MOUNTED_SPEED: f32 = 14.0;

/// Health and power restored per second while eating or drinking, in
/// percent of the maximum.
const REST_REGEN_PCT: f32 = 10.0;
/// Mana restored per second outside of combat, in percent of the maximum.
const MANA_REGEN_PCT: f32 = 2.0;
const ENERGY_PER_SECOND: u32 = 10;
const RAGE_PER_SWING: u32 = 5;

const MAX_COMBO_POINTS: u32 = 5;

/// Pools a druid starts a form with.
const FORM_ENERGY: u32 = 60;
const FORM_RAGE: u32 = 10;

/// Creature template of a summoned hunter companion.
const COMPANION_ENTRY: u32 = 1;

/// Health after being revived or resurrected, in percent.
const REVIVE_HEALTH_PCT: u32 = 50;

impl SandboxWorld {
    // ========================================================================
    // Commands
    // ========================================================================

    /// Apply every command recorded in `buffer`, emptying it.
    pub fn apply(&mut self, buffer: &mut CommandBuffer) {
        let commands: Vec<Command> = buffer.drain().collect();
        for command in commands {
            self.apply_command(command);
        }
    }

    pub fn apply_command(&mut self, command: Command) {
        match command {
            Command::Cast { caster, target, ability } => self.start_cast(caster, target, ability),
            Command::UseConsumable { agent, ability } => self.use_consumable(agent, ability),
            Command::Move { agent, destination } => self.set_motion(agent, Motion::MoveTo(destination)),
            Command::StopMovement { agent } => self.set_motion(agent, Motion::Idle),
            Command::Follow { agent, leader, distance, angle } => {
                self.set_motion(agent, Motion::Follow { leader, distance, angle });
            }
            Command::Chase { agent, target, distance } => {
                self.set_motion(agent, Motion::Chase { target, distance });
            }
            Command::Attack { agent, target, melee } => self.start_attack(agent, target, melee),
            Command::AttackStop { agent } => self.update_unit(agent, |u| {
                u.melee_attacking = false;
                u.victim = None;
            }),
            Command::PetAttack { agent, target } => {
                if let Some(pet) = self.unit(agent).and_then(|u| u.pet) {
                    self.start_attack(pet, target, true);
                }
            }
            Command::StopAutoRepeat { agent } => self.update_unit(agent, |u| u.auto_repeating = false),
            Command::TeleportTo { agent, destination } => self.teleport(agent, destination),
            Command::Revive { agent } => self.revive(agent),
            Command::ReleaseSpirit { agent } => self.update_unit(agent, |u| {
                if u.life == LifeState::Corpse {
                    u.life = LifeState::Ghost;
                }
            }),
            Command::Removal { agent } => {
                info!("{:?} removed from the sandbox", agent);
                self.units.remove(&agent);
                self.removed.push(agent);
            }
            Command::Restock { agent, item } => debug!("{:?} restocked item {}", agent, item),
            Command::Dismount { agent } => self.update_unit(agent, |u| u.mounted = false),
            Command::CancelAura { agent, aura } => self.cancel_aura(agent, aura),
            Command::SummonCompanion { agent } => {
                let has_pet = self.unit(agent).and_then(|u| u.pet).is_some();
                if !has_pet {
                    self.summon(agent, COMPANION_ENTRY, "Companion");
                }
            }
            Command::WeaponEnchant { agent, ability, hand } => self.weapon_enchant(agent, ability, hand),
            Command::ClaimHeal { target, kind, duration_ms } => {
                let claim = self.heal_claims.entry(target).or_default();
                match kind {
                    HealKind::Direct => claim.direct.set(duration_ms),
                    HealKind::Periodic => claim.periodic.set(duration_ms),
                }
            }
        }
    }

    fn set_motion(&mut self, agent: Entity, motion: Motion) {
        if let Some(unit) = self.units.get_mut(&agent) {
            unit.motion = motion;
            unit.info.following = match motion {
                Motion::Follow { leader, .. } => Some(leader),
                _ => None,
            };
            unit.info.chasing = match motion {
                Motion::Chase { target, .. } => Some(target),
                _ => None,
            };
            if motion == Motion::Idle {
                unit.info.moving = false;
            }
        }
    }

    fn start_attack(&mut self, agent: Entity, target: Entity, melee: bool) {
        if !self.can_attack(agent, target) {
            debug!("sandbox: {:?} cannot attack {:?}", agent, target);
            return;
        }
        self.update_unit(agent, |u| {
            u.victim = Some(target);
            u.target = Some(target);
            u.melee_attacking = melee;
            u.in_combat = true;
        });
        self.provoke(target, agent);
    }

    /// `target` notices `attacker` and fights back if it is idle.
    fn provoke(&mut self, target: Entity, attacker: Entity) {
        let threat = self.threat.entry((target, attacker)).or_insert(0.0);
        *threat = threat.max(1.0);
        if let Some(unit) = self.units.get_mut(&target) {
            unit.info.in_combat = true;
            if unit.info.kind != UnitKind::Player && unit.info.victim.is_none() {
                unit.info.victim = Some(attacker);
                unit.info.melee_attacking = true;
            }
        }
    }

    fn teleport(&mut self, agent: Entity, destination: Entity) {
        let Some(target) = self.unit(destination) else {
            return;
        };
        self.update_unit(agent, |u| {
            u.position = target.position + Vec3::new(1.0, 0.0, 0.0);
            u.map_id = target.map_id;
            u.transport = target.transport;
        });
        self.set_motion(agent, Motion::Idle);
    }

    /// Auto-revive in place, leaving the Honorless Target debuff.
    fn revive(&mut self, agent: Entity) {
        let was_dead = self.unit(agent).map(|u| u.is_dead()).unwrap_or(false);
        if !was_dead {
            return;
        }
        self.update_unit(agent, |u| {
            u.life = LifeState::Alive;
            u.health = u.max_health * REVIVE_HEALTH_PCT / 100;
        });
        let catalog = self.catalog.clone();
        if let Some(info) = catalog.get(HONORLESS_TARGET) {
            self.apply_ability_aura(agent, agent, info);
        }
    }

    fn cancel_aura(&mut self, agent: Entity, aura: CancelAura) {
        let matches: fn(&AbilityInfo) -> bool = match aura {
            CancelAura::Stealth => |i: &AbilityInfo| i.has_effect(AbilityEffect::Stealth),
            CancelAura::FeignDeath => |i: &AbilityInfo| i.has_effect(AbilityEffect::FeignDeath),
            CancelAura::Mount => |i: &AbilityInfo| i.has_effect(AbilityEffect::Mount),
            CancelAura::Shapeshift => {
                |i: &AbilityInfo| i.effects.iter().any(|e| matches!(e, AbilityEffect::Shapeshift(_)))
            }
        };
        let catalog = self.catalog.clone();
        if let Some(list) = self.auras.get_mut(&agent) {
            list.retain(|a| !catalog.get(a.info.ability).map(matches).unwrap_or(false));
        }
        match aura {
            CancelAura::Stealth => self.update_unit(agent, |u| {
                u.stealthed = false;
                u.aura_states &= !AuraState::Stealthed.bit();
            }),
            CancelAura::FeignDeath => self.update_unit(agent, |u| u.feigning_death = false),
            CancelAura::Mount => self.update_unit(agent, |u| u.mounted = false),
            CancelAura::Shapeshift => self.shift_form(agent, ShapeshiftForm::None),
        }
    }

    /// Change form. Druids swap to energy in cat form and rage in bear
    /// form, and get their mana back in caster form.
    fn shift_form(&mut self, entity: Entity, form: ShapeshiftForm) {
        let Some(unit) = self.units.get_mut(&entity) else {
            return;
        };
        let info = &mut unit.info;
        if info.class == Some(CharacterClass::Druid) {
            if info.power_type == PowerType::Mana {
                unit.stored_mana = Some((info.power, info.max_power));
            }
            match form {
                ShapeshiftForm::Cat => {
                    info.power_type = PowerType::Energy;
                    info.power = FORM_ENERGY;
                    info.max_power = 100;
                }
                form if form.is_bear() => {
                    info.power_type = PowerType::Rage;
                    info.power = FORM_RAGE;
                    info.max_power = 100;
                }
                _ => {
                    if let Some((power, max_power)) = unit.stored_mana.take() {
                        info.power_type = PowerType::Mana;
                        info.power = power;
                        info.max_power = max_power;
                    }
                }
            }
        }
        info.form = form;
    }

    fn weapon_enchant(&mut self, agent: Entity, ability: AbilityId, hand: WeaponHand) {
        if self.ability_info(ability).is_none() {
            debug!("sandbox: unknown weapon enchant {:?}", ability);
            return;
        }
        self.update_unit(agent, |u| {
            let weapon = match hand {
                WeaponHand::MainHand => &mut u.main_hand,
                WeaponHand::OffHand => &mut u.off_hand,
            };
            if weapon.equipped {
                weapon.enchanted = true;
            }
        });
    }

    // ========================================================================
    // Casting
    // ========================================================================

    fn start_cast(&mut self, caster: Entity, target: Entity, ability: AbilityId) {
        let Some(info) = self.ability_info(ability).cloned() else {
            debug!("sandbox: {:?} cast unknown ability {:?}", caster, ability);
            return;
        };
        let Some(me) = self.unit(caster) else {
            return;
        };
        if me.is_dead() || me.casting {
            return;
        }
        if me.is_player() && !self.knows(caster, ability) {
            debug!("sandbox: {:?} does not know {}", caster, info.name);
            return;
        }
        let max_stack = info.aura.as_ref().map(|a| a.max_stack).unwrap_or(1);
        if !can_attempt(&*self, &*self, &me, target, ability, max_stack) {
            debug!("sandbox: {:?} cast of {} on {:?} rejected", caster, info.name, target);
            return;
        }

        self.spend_power(caster, &info);
        if info.cooldown_ms > 0 {
            self.set_cooldown(caster, ability, info.cooldown_ms);
        }
        if info.on_global_cooldown {
            self.set_global_cooldown(caster, GLOBAL_COOLDOWN_MS);
        }
        if let Some(unit) = self.units.get_mut(&caster) {
            unit.stats.casts += 1;
        }

        if is_auto_repeat(&info) {
            self.update_unit(caster, |u| u.auto_repeating = true);
            self.start_attack(caster, target, false);
            return;
        }

        if info.cast_time_ms > 0 {
            if let Some(unit) = self.units.get_mut(&caster) {
                let mut remaining = SaturatingCountdown::new();
                remaining.set(info.cast_time_ms);
                unit.pending_cast = Some(PendingCast { target, ability, remaining });
                unit.info.casting = true;
            }
            return;
        }

        self.resolve_cast(caster, target, &info);
    }

    fn spend_power(&mut self, caster: Entity, info: &AbilityInfo) {
        self.update_unit(caster, |u| match info.power_type {
            PowerType::Health => u.health = u.health.saturating_sub(info.cost),
            _ => u.power = u.power.saturating_sub(info.cost),
        });
    }

    fn use_consumable(&mut self, agent: Entity, ability: AbilityId) {
        let Some(info) = self.ability_info(ability).cloned() else {
            debug!("sandbox: {:?} used unknown consumable {:?}", agent, ability);
            return;
        };
        if self.cooldown_remaining(agent, ability) > 0 {
            return;
        }
        if info.cooldown_ms > 0 {
            self.set_cooldown(agent, ability, info.cooldown_ms);
        }
        self.resolve_cast(agent, agent, &info);
    }

    /// Apply an ability's effects.
    pub(crate) fn resolve_cast(&mut self, caster: Entity, target: Entity, info: &AbilityInfo) {
        let target = if info.self_targeted { caster } else { target };
        self.cast_log.push(CastRecord {
            time_ms: self.elapsed_ms,
            caster,
            target,
            ability: info.id,
        });

        let hostile = self.is_hostile(caster, target);
        if hostile {
            self.provoke(target, caster);
            self.update_unit(caster, |u| u.in_combat = true);
        }

        for effect in info.effects.iter().copied() {
            match effect {
                AbilityEffect::Damage => {
                    self.deal_damage(caster, target, info.damage_amount.max(0) as u32);
                    self.award_combo_point(caster, info);
                }
                AbilityEffect::Heal => self.heal(caster, target, info.heal_amount.max(0) as u32),
                AbilityEffect::Taunt => self.taunt(caster, target),
                AbilityEffect::AreaTaunt => {
                    let Some(center) = self.unit(caster).map(|u| u.position) else {
                        continue;
                    };
                    for hostile in self.hostiles_near(center, 10.0, caster) {
                        self.taunt(caster, hostile);
                    }
                }
                AbilityEffect::Resurrect => self.update_unit(target, |u| {
                    if u.is_dead() {
                        u.life = LifeState::Alive;
                        u.health = u.max_health * REVIVE_HEALTH_PCT / 100;
                    }
                }),
                AbilityEffect::Dispel(kind) => {
                    let friendly = !hostile;
                    if let Some(list) = self.auras.get_mut(&target) {
                        if let Some(index) = list
                            .iter()
                            .position(|a| a.info.dispel == kind && a.info.positive != friendly)
                        {
                            list.remove(index);
                        }
                    }
                }
                AbilityEffect::Interrupt => {
                    if let Some(unit) = self.units.get_mut(&target) {
                        unit.pending_cast = None;
                        unit.info.casting = false;
                    }
                }
                AbilityEffect::Summon => self.summon(caster, info.id.0, &info.name),
                AbilityEffect::Shapeshift(form) => self.shift_form(caster, form),
                AbilityEffect::Stealth => self.update_unit(caster, |u| {
                    u.stealthed = true;
                    u.aura_states |= AuraState::Stealthed.bit();
                }),
                AbilityEffect::FeignDeath => {
                    self.update_unit(caster, |u| u.feigning_death = true);
                    self.threat.retain(|(_, unit), _| *unit != caster);
                }
                AbilityEffect::Mount => self.update_unit(caster, |u| u.mounted = true),
                AbilityEffect::Threat => {
                    let threat = self.threat.entry((target, caster)).or_insert(0.0);
                    *threat += info.damage_amount.max(0) as f32;
                }
                AbilityEffect::PeriodicHeal
                | AbilityEffect::PeriodicDamage
                | AbilityEffect::WeaponEnchant
                | AbilityEffect::Absorb => {}
            }
        }

        self.apply_ability_aura(caster, target, info);

        if info.has_effect(AbilityEffect::Damage) || info.has_effect(AbilityEffect::PeriodicDamage) {
            self.update_unit(caster, |u| {
                u.stealthed = false;
                u.aura_states &= !AuraState::Stealthed.bit();
            });
        }
    }

    fn apply_ability_aura(&mut self, caster: Entity, target: Entity, info: &AbilityInfo) {
        let Some(spec) = info.aura.clone() else {
            return;
        };
        let stacks = self
            .auras
            .get(&target)
            .and_then(|list| list.iter().find(|a| a.info.ability == info.id))
            .map(|a| (a.info.stacks + 1).min(spec.max_stack.max(1)))
            .unwrap_or(1);
        let Some(aura) = self.aura_info(info, caster, stacks) else {
            return;
        };

        if spec.single_target {
            for list in self.auras.values_mut() {
                list.retain(|a| !(a.info.ability == info.id && a.info.caster == Some(caster)));
            }
        }
        if let Some(group) = spec.exclusive_group {
            if let Some(list) = self.auras.get_mut(&target) {
                list.retain(|a| a.info.exclusive_group != Some(group));
            }
        }

        let ticks = (spec.duration_ms / PERIODIC_TICK_MS).max(1);
        let periodic_amount = if info.has_effect(AbilityEffect::PeriodicHeal) {
            info.heal_amount.max(0) as u32 / ticks
        } else if info.has_effect(AbilityEffect::PeriodicDamage) {
            info.damage_amount.max(0) as u32 / ticks
        } else {
            0
        };
        self.insert_aura(target, aura, spec.duration_ms, periodic_amount);
    }

    fn summon(&mut self, caster: Entity, entry: u32, name: &str) {
        let Some(owner) = self.unit(caster) else {
            return;
        };
        if let Some(old) = owner.pet {
            self.units.remove(&old);
        }
        let pet = self.spawn_unit(UnitKind::Pet, owner.position + Vec3::new(-2.0, 0.0, 0.0), |u| {
            u.owner = Some(caster);
            u.level = owner.level;
            u.entry = entry;
            u.max_health = owner.max_health / 2;
            u.health = u.max_health;
            u.map_id = owner.map_id;
        });
        if let Some(unit) = self.units.get_mut(&pet) {
            unit.name = name.to_string();
        }
        let enemies: Vec<Entity> = self
            .units
            .keys()
            .copied()
            .filter(|e| self.is_hostile(caster, *e))
            .collect();
        for enemy in enemies {
            self.set_hostile(pet, enemy);
        }
        self.update_unit(caster, |u| u.pet = Some(pet));
        self.set_motion(pet, Motion::Follow { leader: caster, distance: 2.0, angle: std::f32::consts::PI });
    }

    fn taunt(&mut self, caster: Entity, target: Entity) {
        let top = self
            .threat
            .iter()
            .filter(|((hostile, _), _)| *hostile == target)
            .map(|(_, value)| *value)
            .fold(0.0_f32, f32::max);
        self.threat.insert((target, caster), top + 1.0);
        self.update_unit(target, |u| u.victim = Some(caster));
    }

    fn award_combo_point(&mut self, caster: Entity, info: &AbilityInfo) {
        if info.power_type != PowerType::Energy || info.damage_class != DamageClass::Melee {
            return;
        }
        self.update_unit(caster, |u| {
            if u.combo_points >= MAX_COMBO_POINTS {
                u.combo_points = 0;
            } else {
                u.combo_points += 1;
            }
        });
    }

    pub(crate) fn deal_damage(&mut self, source: Entity, target: Entity, amount: u32) {
        if amount == 0 {
            return;
        }
        let Some(unit) = self.units.get_mut(&target) else {
            return;
        };
        if unit.info.is_dead() {
            return;
        }
        let dealt = amount.min(unit.info.health);
        unit.info.health -= dealt;
        unit.stats.damage_taken += dealt;
        if unit.info.power_type == PowerType::Rage {
            unit.info.power = (unit.info.power + RAGE_PER_SWING).min(unit.info.max_power);
        }
        if let Some(source_unit) = self.units.get_mut(&source) {
            source_unit.stats.damage_done += dealt;
        }
        *self.threat.entry((target, source)).or_insert(0.0) += dealt as f32;

        let catalog = self.catalog.clone();
        if let Some(list) = self.auras.get_mut(&target) {
            list.retain(|a| !catalog.get(a.info.ability).map(|i| i.breaks_on_damage()).unwrap_or(false));
        }
    }

    fn heal(&mut self, healer: Entity, target: Entity, amount: u32) {
        let Some(unit) = self.units.get_mut(&target) else {
            return;
        };
        if unit.info.is_dead() {
            return;
        }
        let healed = amount.min(unit.info.missing_health());
        unit.info.health += healed;
        if let Some(healer_unit) = self.units.get_mut(&healer) {
            healer_unit.stats.healing_done += healed;
        }

        let attackers = self.attackers(target);
        for hostile in attackers {
            *self.threat.entry((hostile, healer)).or_insert(0.0) += healed as f32 / 2.0;
        }
    }

    // ========================================================================
    // Clock
    // ========================================================================

    /// Advance the world by `diff` ms.
    pub fn tick(&mut self, diff: u32) {
        self.elapsed_ms += diff as u64;

        for countdown in self.cooldowns.values_mut() {
            countdown.tick(diff);
        }
        for countdown in self.global_cooldowns.values_mut() {
            countdown.tick(diff);
        }
        for claim in self.heal_claims.values_mut() {
            claim.tick(diff);
        }

        self.advance_casts(diff);
        self.advance_movement(diff);
        self.advance_auras(diff);
        self.regenerate(diff);
        self.auto_attacks(diff);
        self.update_combat_state();
    }

    fn advance_casts(&mut self, diff: u32) {
        let mut finished = Vec::new();
        for (entity, unit) in self.units.iter_mut() {
            let Some(pending) = unit.pending_cast.as_mut() else {
                continue;
            };
            pending.remaining.tick(diff);
            if pending.remaining.is_expired() {
                finished.push((*entity, pending.target, pending.ability));
                unit.pending_cast = None;
                unit.info.casting = false;
            }
        }
        for (caster, target, ability) in finished {
            if let Some(info) = self.ability_info(ability).cloned() {
                self.resolve_cast(caster, target, &info);
            }
        }
    }

    fn advance_movement(&mut self, diff: u32) {
        let seconds = diff as f32 / 1000.0;
        let entities: Vec<Entity> = self.units.keys().copied().collect();
        for entity in entities {
            let Some(unit) = self.units.get(&entity) else {
                continue;
            };
            let corpse = unit.info.life == LifeState::Corpse;
            if corpse || unit.info.rooted || unit.info.lost_control {
                continue;
            }
            let destination = match unit.motion {
                Motion::Idle => None,
                Motion::MoveTo(point) => Some(point),
                Motion::Follow { leader, distance, .. } => self
                    .unit(leader)
                    .map(|l| offset_point(l.position, distance, l.angle_to(&unit.info))),
                Motion::Chase { target, distance } => self.unit(target).and_then(|t| {
                    (unit.info.distance_to(&t) > distance.max(1.0)).then(|| {
                        let direction = (unit.info.position - t.position).normalize_or_zero();
                        t.position + direction * distance
                    })
                }),
            };

            let speed = if unit.info.mounted { MOUNTED_SPEED } else { RUN_SPEED };
            let step = speed * seconds;
            let reached_motion = matches!(unit.motion, Motion::MoveTo(_));

            let Some(unit) = self.units.get_mut(&entity) else {
                continue;
            };
            match destination {
                Some(point) if unit.info.position.distance(point) > 0.1 => {
                    let delta = point - unit.info.position;
                    let travel = delta.length().min(step);
                    unit.info.position += delta.normalize_or_zero() * travel;
                    unit.info.moving = true;
                    if unit.info.casting {
                        unit.pending_cast = None;
                        unit.info.casting = false;
                    }
                }
                _ => {
                    unit.info.moving = false;
                    if reached_motion {
                        unit.motion = Motion::Idle;
                    }
                }
            }
        }
    }

    fn advance_auras(&mut self, diff: u32) {
        let mut periodic = Vec::new();
        for (entity, list) in self.auras.iter_mut() {
            for aura in list.iter_mut() {
                aura.remaining.tick(diff);
                if aura.periodic_amount == 0 {
                    continue;
                }
                aura.next_tick.tick(diff);
                if aura.next_tick.is_expired() {
                    aura.next_tick.set(PERIODIC_TICK_MS);
                    periodic.push((*entity, aura.info));
                }
            }
        }
        for (entity, info) in periodic {
            let amount = self
                .auras
                .get(&entity)
                .and_then(|list| list.iter().find(|a| a.info.ability == info.ability))
                .map(|a| a.periodic_amount)
                .unwrap_or(0);
            let source = info.caster.unwrap_or(entity);
            if info.periodic_heal {
                self.heal(source, entity, amount);
            } else {
                self.deal_damage(source, entity, amount);
            }
        }
        for list in self.auras.values_mut() {
            list.retain(|a| a.remaining.is_running());
        }
    }

    fn regenerate(&mut self, diff: u32) {
        let seconds = diff as f32 / 1000.0;
        let resting: Vec<(Entity, bool, bool)> = self
            .units
            .keys()
            .map(|e| {
                let auras = self.auras.get(e);
                let has = |id: AbilityId| auras.map(|l| l.iter().any(|a| a.info.ability == id)).unwrap_or(false);
                (*e, has(FOOD), has(DRINK) || has(DRINK_50))
            })
            .collect();

        for (entity, eating, drinking) in resting {
            let Some(unit) = self.units.get_mut(&entity) else {
                continue;
            };
            let info = &mut unit.info;
            if info.is_dead() {
                continue;
            }
            if eating {
                let gain = (info.max_health as f32 * REST_REGEN_PCT / 100.0 * seconds) as u32;
                info.health = (info.health + gain.max(1)).min(info.max_health);
            }
            match info.power_type {
                PowerType::Mana => {
                    let pct = if drinking {
                        REST_REGEN_PCT
                    } else if !info.in_combat {
                        MANA_REGEN_PCT
                    } else {
                        0.0
                    };
                    let gain = (info.max_power as f32 * pct / 100.0 * seconds) as u32;
                    info.power = (info.power + gain).min(info.max_power);
                }
                PowerType::Energy => {
                    let gain = (ENERGY_PER_SECOND as f32 * seconds) as u32;
                    info.power = (info.power + gain.max(1)).min(info.max_power);
                }
                PowerType::Rage if !info.in_combat => {
                    info.power = info.power.saturating_sub(1);
                }
                _ => {}
            }
            let done_eating = !eating || info.health >= info.max_health;
            let done_drinking = !drinking || info.power >= info.max_power;
            if done_eating && done_drinking && (eating || drinking) {
                if let Some(list) = self.auras.get_mut(&entity) {
                    list.retain(|a| ![FOOD, DRINK, DRINK_50].contains(&a.info.ability));
                }
            }
        }
    }

    fn auto_attacks(&mut self, diff: u32) {
        let mut swings = Vec::new();
        for (entity, unit) in self.units.iter_mut() {
            unit.swing.tick(diff);
            let info = &unit.info;
            if info.is_dead() || info.casting || info.lost_control || !unit.swing.is_expired() {
                continue;
            }
            if !(info.melee_attacking || info.auto_repeating) {
                continue;
            }
            if let Some(victim) = info.victim {
                swings.push((*entity, victim, info.auto_repeating, unit.melee_damage));
            }
        }

        for (attacker, victim, ranged, damage) in swings {
            let (Some(me), Some(target)) = (self.unit(attacker), self.unit(victim)) else {
                continue;
            };
            if !self.can_attack(attacker, victim) {
                continue;
            }
            let in_reach = if ranged {
                me.distance_to(&target) <= 35.0
            } else {
                me.can_reach_with_melee(&target)
            };
            if !in_reach {
                continue;
            }
            if let Some(unit) = self.units.get_mut(&attacker) {
                unit.swing.set(SWING_INTERVAL_MS);
                if unit.info.power_type == PowerType::Rage {
                    unit.info.power = (unit.info.power + RAGE_PER_SWING).min(unit.info.max_power);
                }
            }
            self.provoke(victim, attacker);
            self.deal_damage(attacker, victim, damage);
        }
    }

    fn update_combat_state(&mut self) {
        // Deaths first, so nothing below picks a dead unit.
        let dead: Vec<Entity> = self
            .units
            .values()
            .filter(|u| u.info.is_alive() && u.info.health == 0)
            .map(|u| u.info.entity)
            .collect();
        for entity in dead {
            info!("sandbox: {:?} died", entity);
            if let Some(unit) = self.units.get_mut(&entity) {
                unit.info.life = LifeState::Corpse;
                unit.info.victim = None;
                unit.info.melee_attacking = false;
                unit.info.auto_repeating = false;
                unit.info.casting = false;
                unit.info.in_combat = false;
                unit.pending_cast = None;
                unit.motion = Motion::Idle;
                unit.info.following = None;
                unit.info.chasing = None;
            }
            self.auras.remove(&entity);
            self.threat.retain(|(hostile, unit), _| *hostile != entity && *unit != entity);
        }

        let entities: Vec<Entity> = self.units.keys().copied().collect();
        for entity in entities {
            let Some(me) = self.unit(entity) else {
                continue;
            };
            if me.is_dead() {
                continue;
            }

            if me.kind != UnitKind::Player {
                self.creature_target(entity);
            }

            let victim_alive = self
                .unit(entity)
                .and_then(|u| u.victim)
                .map(|v| self.can_attack(entity, v))
                .unwrap_or(false);
            let attacked = !self.attackers(entity).is_empty();
            let mechanics = self.mechanic_flags(entity);

            if let Some(unit) = self.units.get_mut(&entity) {
                let info = &mut unit.info;
                if !victim_alive {
                    info.victim = None;
                    info.melee_attacking = false;
                    info.auto_repeating = false;
                }
                info.in_combat = victim_alive || attacked;
                if info.health_pct() < 20.0 {
                    info.aura_states |= AuraState::HealthBelow20.bit();
                } else {
                    info.aura_states &= !AuraState::HealthBelow20.bit();
                }
                info.lost_control = mechanics.lost_control;
                info.rooted = mechanics.rooted;
                info.snared = mechanics.snared;
                info.breakable_cc = mechanics.breakable;
            }
        }
    }

    /// Creatures fight whoever has the most threat on them, and aggro on
    /// the closest hostile within their aggro radius.
    fn creature_target(&mut self, entity: Entity) {
        let Some(unit) = self.units.get(&entity) else {
            return;
        };
        let me = unit.info;
        let aggro_radius = unit.aggro_radius;

        let mut best: Option<(Entity, f32)> = None;
        for ((hostile, target), value) in self.threat.iter() {
            if *hostile != entity || !self.can_attack(entity, *target) {
                continue;
            }
            if best.map(|(_, top)| *value > top).unwrap_or(true) {
                best = Some((*target, *value));
            }
        }

        let victim = match best {
            Some((target, _)) => Some(target),
            None if aggro_radius > 0.0 && me.victim.is_none() => self
                .hostiles_near(me.position, aggro_radius, entity)
                .into_iter()
                .filter_map(|e| self.unit(e))
                .filter(|u| !u.feigning_death && !u.stealthed)
                .min_by(|a, b| me.distance_to(a).total_cmp(&me.distance_to(b)))
                .map(|u| u.entity),
            None => me.victim,
        };

        if let Some(target) = victim {
            if me.victim != Some(target) {
                self.provoke(entity, target);
            }
            if let Some(unit) = self.units.get_mut(&entity) {
                unit.info.victim = Some(target);
                unit.info.melee_attacking = true;
                if !matches!(unit.motion, Motion::Chase { target: t, .. } if t == target) {
                    unit.motion = Motion::Chase { target, distance: 1.0 };
                    unit.info.chasing = Some(target);
                }
            }
        }
    }

    fn mechanic_flags(&self, entity: Entity) -> MechanicFlags {
        let mut flags = MechanicFlags::default();
        for aura in self.auras.get(&entity).into_iter().flatten() {
            let Some(info) = self.catalog.get(aura.info.ability) else {
                continue;
            };
            let Some(mechanic) = info.mechanic() else {
                continue;
            };
            match mechanic {
                Mechanic::Root => flags.rooted = true,
                Mechanic::Snare => flags.snared = true,
                Mechanic::Shield | Mechanic::Bandage | Mechanic::Silence => {}
                _ => flags.lost_control = true,
            }
            if info.breaks_on_damage() {
                flags.breakable = true;
            }
        }
        flags
    }
}

#[derive(Default)]
struct MechanicFlags {
    lost_control: bool,
    rooted: bool,
    snared: bool,
    breakable: bool,
}

/// Repeating ranged attacks (Shoot, Auto Shot) start a swing timer instead
/// of resolving once.
fn is_auto_repeat(info: &AbilityInfo) -> bool {
    info.damage_class == DamageClass::Ranged && info.cast_time_ms == 0 && info.cooldown_ms == 0 && !info.on_global_cooldown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::ability_config::AbilityCatalog;
    use crate::bot::commands::CommandSink;
    use crate::bot::world::{KnownAbility, WorldQueryExt};

    fn catalog() -> AbilityCatalog {
        AbilityCatalog::from_ron_str(
            r#"(abilities: [
                (id: 133, name: "Fireball", school: Fire, damage_class: Magic, cost: 30,
                 max_range: Some(35.0), cast_time_ms: 1500, damage_amount: 40, effects: [Damage]),
                (id: 2050, name: "Lesser Heal", school: Holy, cost: 20, max_range: Some(40.0),
                 heal_amount: 50, effects: [Heal]),
                (id: 118, name: "Polymorph", school: Arcane, cost: 20, max_range: Some(30.0),
                 aura: Some((mechanic: Some(Polymorph), breaks_on_damage: true, single_target: true))),
            ])"#,
            "inline",
        )
        .expect("catalog parses")
    }

    fn duel() -> (SandboxWorld, Entity, Entity) {
        let mut world = SandboxWorld::new(catalog());
        let mage = world.spawn_unit(UnitKind::Player, Vec3::ZERO, |u| u.level = 10);
        let wolf = world.spawn_unit(UnitKind::Creature, Vec3::new(20.0, 0.0, 0.0), |u| u.level = 10);
        world.set_hostile(mage, wolf);
        world.learn_all(mage, [AbilityId(133), AbilityId(2050), AbilityId(118)]);
        (world, mage, wolf)
    }

    #[test]
    fn test_cast_time_resolves_after_delay() {
        let (mut world, mage, wolf) = duel();
        let mut buffer = CommandBuffer::new();
        buffer.request_cast(mage, wolf, AbilityId(133));
        world.apply(&mut buffer);

        assert!(world.unit(mage).expect("mage").casting);
        assert_eq!(world.unit(mage).expect("mage").power, 70);
        assert!(world.global_cooldown_remaining(mage, AbilityId(133)) > 0);

        world.tick(1000);
        assert_eq!(world.unit(wolf).expect("wolf").health, 100);
        world.tick(500);
        assert_eq!(world.unit(wolf).expect("wolf").health, 60);
        assert_eq!(world.stats(mage).damage_done, 40);
        assert_eq!(world.cast_log().len(), 1);
    }

    #[test]
    fn test_damage_breaks_polymorph() {
        let (mut world, mage, wolf) = duel();
        world.update_unit(wolf, |u| u.position = Vec3::new(10.0, 0.0, 0.0));
        let mut buffer = CommandBuffer::new();
        buffer.request_cast(mage, wolf, AbilityId(118));
        world.apply(&mut buffer);
        world.tick(100);
        assert!(world.has_aura(wolf, AbilityId(118)));
        assert!(world.unit(wolf).expect("wolf").lost_control);
        assert!(world.single_target_aura_active(mage, AbilityId(118)));

        world.deal_damage(mage, wolf, 5);
        world.tick(100);
        assert!(!world.has_aura(wolf, AbilityId(118)));
        assert!(!world.unit(wolf).expect("wolf").lost_control);
    }

    #[test]
    fn test_out_of_range_cast_is_dropped() {
        let (mut world, mage, wolf) = duel();
        world.update_unit(wolf, |u| u.position = Vec3::new(80.0, 0.0, 0.0));
        let mut buffer = CommandBuffer::new();
        buffer.request_cast(mage, wolf, AbilityId(133));
        world.apply(&mut buffer);
        assert!(!world.unit(mage).expect("mage").casting);
        assert_eq!(world.unit(mage).expect("mage").power, 100);
    }

    #[test]
    fn test_heal_claims_count_down() {
        let (mut world, mage, _) = duel();
        let mut buffer = CommandBuffer::new();
        buffer.claim_heal(mage, HealKind::Direct, 1000);
        world.apply(&mut buffer);
        assert!(world.heal_claim(mage).direct.is_running());
        world.tick(1000);
        assert!(!world.heal_claim(mage).direct.is_running());
    }

    #[test]
    fn test_unknown_ability_is_ignored() {
        let (mut world, mage, wolf) = duel();
        world.learn(mage, KnownAbility::active(AbilityId(9999)));
        let mut buffer = CommandBuffer::new();
        buffer.request_cast(mage, wolf, AbilityId(9999));
        world.apply(&mut buffer);
        assert!(world.cast_log().is_empty());
    }

    #[test]
    fn test_follow_moves_toward_leader() {
        let (mut world, mage, _) = duel();
        let leader = world.spawn_unit(UnitKind::Player, Vec3::new(30.0, 0.0, 0.0), |_| {});
        let mut buffer = CommandBuffer::new();
        buffer.request_follow(mage, leader, 3.0, std::f32::consts::PI);
        world.apply(&mut buffer);
        world.tick(1000);

        let mage_info = world.unit(mage).expect("mage");
        assert_eq!(mage_info.following, Some(leader));
        assert!(mage_info.moving);
        assert!((mage_info.position.x - RUN_SPEED).abs() < 0.01);
    }
}
