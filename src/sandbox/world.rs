//! Sandbox storage and the read-only interfaces over it.
//!
//! Every collection is ordered (`BTreeMap`) so that iteration, and with it
//! every decision made from it, is reproducible under a fixed seed.

use bevy::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::bot::abilities::{AbilityEffect, AbilityId, AbilityInfo};
use crate::bot::ability_config::AbilityCatalog;
use crate::bot::role::Role;
use crate::bot::timers::SaturatingCountdown;
use crate::bot::world::{
    AbilityBook, AuraInfo, GroupInfo, HealClaim, KnownAbility, RaidMarker, UnitInfo, UnitKind,
    UnitList, WorldQuery,
};

/// Every ability that triggers it puts the caster on this global cooldown.
pub const GLOBAL_COOLDOWN_MS: u32 = 1500;

/// Interval between periodic aura ticks.
pub const PERIODIC_TICK_MS: u32 = 3000;

/// Interval between auto-attack swings and auto-repeat shots.
pub const SWING_INTERVAL_MS: u32 = 2000;

/// Per-unit running totals, reported by the headless runner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UnitStats {
    pub damage_done: u32,
    pub damage_taken: u32,
    pub healing_done: u32,
    pub casts: u32,
}

/// Host-side movement order.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Motion {
    #[default]
    Idle,
    MoveTo(Vec3),
    Follow { leader: Entity, distance: f32, angle: f32 },
    Chase { target: Entity, distance: f32 },
}

/// A cast with a cast time, resolved when the countdown runs out.
#[derive(Clone, Copy, Debug)]
pub struct PendingCast {
    pub target: Entity,
    pub ability: AbilityId,
    pub remaining: SaturatingCountdown,
}

/// One unit plus the state only the sandbox needs.
#[derive(Clone, Debug)]
pub struct SandboxUnit {
    pub info: UnitInfo,
    pub name: String,
    /// Damage of one auto-attack swing or auto-repeat shot.
    pub melee_damage: u32,
    /// Creatures attack the closest hostile that comes this near.
    pub aggro_radius: f32,
    pub swing: SaturatingCountdown,
    pub motion: Motion,
    pub pending_cast: Option<PendingCast>,
    /// Mana (current, max) kept aside while a druid is in an animal form.
    pub stored_mana: Option<(u32, u32)>,
    pub stats: UnitStats,
}

/// One aura with its remaining duration.
#[derive(Clone, Copy, Debug)]
pub struct SandboxAura {
    pub info: AuraInfo,
    pub remaining: SaturatingCountdown,
    /// Amount applied per periodic tick; heals when `info.periodic_heal`.
    pub periodic_amount: u32,
    pub next_tick: SaturatingCountdown,
}

/// A cast that resolved, in resolution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CastRecord {
    pub time_ms: u64,
    pub caster: Entity,
    pub target: Entity,
    pub ability: AbilityId,
}

/// In-memory world for tests and headless runs.
///
/// Implements [`WorldQuery`] and [`AbilityBook`]; agents write into a
/// [`CommandBuffer`](crate::bot::commands::CommandBuffer) that is then
/// handed to [`SandboxWorld::apply`].
pub struct SandboxWorld {
    pub(crate) catalog: Arc<AbilityCatalog>,
    next_id: u32,
    pub(crate) units: BTreeMap<Entity, SandboxUnit>,
    pub(crate) auras: BTreeMap<Entity, Vec<SandboxAura>>,
    known: BTreeMap<Entity, Vec<KnownAbility>>,
    pub(crate) cooldowns: BTreeMap<(Entity, AbilityId), SaturatingCountdown>,
    pub(crate) global_cooldowns: BTreeMap<Entity, SaturatingCountdown>,
    pub(crate) heal_claims: BTreeMap<Entity, HealClaim>,
    hostile_pairs: BTreeSet<(Entity, Entity)>,
    groups: Vec<GroupInfo>,
    pub(crate) threat: BTreeMap<(Entity, Entity), f32>,
    objects: Vec<(u32, Vec3)>,
    blocked_sight: BTreeSet<(Entity, Entity)>,
    roles: BTreeMap<Entity, Role>,
    pub(crate) removed: Vec<Entity>,
    pub(crate) cast_log: Vec<CastRecord>,
    pub(crate) elapsed_ms: u64,
}

fn pair(a: Entity, b: Entity) -> (Entity, Entity) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl SandboxWorld {
    pub fn new(catalog: AbilityCatalog) -> Self {
        Self::with_catalog(Arc::new(catalog))
    }

    /// Share an already loaded catalog.
    pub fn with_catalog(catalog: Arc<AbilityCatalog>) -> Self {
        Self {
            catalog,
            next_id: 1,
            units: BTreeMap::new(),
            auras: BTreeMap::new(),
            known: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
            global_cooldowns: BTreeMap::new(),
            heal_claims: BTreeMap::new(),
            hostile_pairs: BTreeSet::new(),
            groups: Vec::new(),
            threat: BTreeMap::new(),
            objects: Vec::new(),
            blocked_sight: BTreeSet::new(),
            roles: BTreeMap::new(),
            removed: Vec::new(),
            cast_log: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn catalog(&self) -> &Arc<AbilityCatalog> {
        &self.catalog
    }

    // ========================================================================
    // Setup
    // ========================================================================

    /// Add a unit at `position`; `init` fills in everything else.
    pub fn spawn_unit(
        &mut self,
        kind: UnitKind,
        position: Vec3,
        init: impl FnOnce(&mut UnitInfo),
    ) -> Entity {
        let entity = Entity::from_raw(self.next_id);
        self.next_id += 1;

        let mut info = UnitInfo::new(entity, kind, position);
        init(&mut info);
        info.entity = entity;

        let melee_damage = 5 + info.level * 2;
        self.units.insert(
            entity,
            SandboxUnit {
                info,
                name: format!("{:?} {}", kind, entity.index()),
                melee_damage,
                aggro_radius: 0.0,
                swing: SaturatingCountdown::new(),
                motion: Motion::Idle,
                pending_cast: None,
                stored_mana: None,
                stats: UnitStats::default(),
            },
        );
        entity
    }

    /// Edit a unit in place. Unknown entities are ignored.
    pub fn update_unit(&mut self, entity: Entity, edit: impl FnOnce(&mut UnitInfo)) {
        if let Some(unit) = self.units.get_mut(&entity) {
            edit(&mut unit.info);
        }
    }

    pub fn sandbox_unit(&self, entity: Entity) -> Option<&SandboxUnit> {
        self.units.get(&entity)
    }

    pub fn sandbox_unit_mut(&mut self, entity: Entity) -> Option<&mut SandboxUnit> {
        self.units.get_mut(&entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.units.keys().copied()
    }

    pub fn set_hostile(&mut self, a: Entity, b: Entity) {
        self.hostile_pairs.insert(pair(a, b));
    }

    pub fn is_hostile(&self, a: Entity, b: Entity) -> bool {
        self.hostile_pairs.contains(&pair(a, b))
    }

    pub fn learn(&mut self, agent: Entity, ability: KnownAbility) {
        let roster = self.known.entry(agent).or_default();
        roster.retain(|known| known.id != ability.id);
        roster.push(ability);
    }

    pub fn learn_all(&mut self, agent: Entity, abilities: impl IntoIterator<Item = AbilityId>) {
        for id in abilities {
            self.learn(agent, KnownAbility::active(id));
        }
    }

    pub fn set_cooldown(&mut self, agent: Entity, ability: AbilityId, remaining_ms: u32) {
        self.cooldowns
            .entry((agent, ability))
            .or_default()
            .set(remaining_ms);
    }

    pub fn set_global_cooldown(&mut self, agent: Entity, remaining_ms: u32) {
        self.global_cooldowns.entry(agent).or_default().set(remaining_ms);
    }

    /// Put an aura on `entity`, replacing one from the same ability.
    pub fn add_aura(&mut self, entity: Entity, aura: AuraInfo) {
        let duration = self
            .catalog
            .get(aura.ability)
            .and_then(|info| info.aura.as_ref())
            .map(|spec| spec.duration_ms)
            .unwrap_or(u32::MAX);
        self.insert_aura(entity, aura, duration, 0);
    }

    pub(crate) fn insert_aura(&mut self, entity: Entity, aura: AuraInfo, duration_ms: u32, periodic_amount: u32) {
        let list = self.auras.entry(entity).or_default();
        list.retain(|existing| existing.info.ability != aura.ability);
        let mut remaining = SaturatingCountdown::new();
        remaining.set(duration_ms);
        let mut next_tick = SaturatingCountdown::new();
        next_tick.set(PERIODIC_TICK_MS);
        list.push(SandboxAura {
            info: aura,
            remaining,
            periodic_amount,
            next_tick,
        });
    }

    pub fn remove_aura(&mut self, entity: Entity, ability: AbilityId) {
        if let Some(list) = self.auras.get_mut(&entity) {
            list.retain(|aura| aura.info.ability != ability);
        }
    }

    /// Add a group. A unit belongs to the first group listing it.
    pub fn add_group(&mut self, group: GroupInfo) {
        self.groups.push(group);
    }

    /// Add `member` to every group `existing` belongs to.
    pub fn join_group(&mut self, existing: Entity, member: Entity) {
        for group in self.groups.iter_mut().filter(|g| g.contains(existing)) {
            if !group.contains(member) {
                group.members.push(member);
            }
        }
    }

    /// Set a raid marker on every group `member` belongs to.
    pub fn mark(&mut self, member: Entity, marker: RaidMarker, target: Entity) {
        for group in self.groups.iter_mut().filter(|g| g.contains(member)) {
            group.marks.retain(|(m, _)| *m != marker);
            group.marks.push((marker, target));
        }
    }

    pub fn set_threat(&mut self, hostile: Entity, unit: Entity, value: f32) {
        self.threat.insert((hostile, unit), value);
    }

    pub fn add_object(&mut self, entry: u32, position: Vec3) {
        self.objects.push((entry, position));
    }

    pub fn block_line_of_sight(&mut self, a: Entity, b: Entity) {
        self.blocked_sight.insert(pair(a, b));
    }

    pub fn set_role(&mut self, entity: Entity, role: Role) {
        self.roles.insert(entity, role);
    }

    pub fn set_heal_claim(&mut self, entity: Entity, claim: HealClaim) {
        self.heal_claims.insert(entity, claim);
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn stats(&self, entity: Entity) -> UnitStats {
        self.units.get(&entity).map(|u| u.stats).unwrap_or_default()
    }

    pub fn cast_log(&self) -> &[CastRecord] {
        &self.cast_log
    }

    /// Units that asked to leave.
    pub fn removed(&self) -> &[Entity] {
        &self.removed
    }

    pub fn motion(&self, entity: Entity) -> Motion {
        self.units.get(&entity).map(|u| u.motion).unwrap_or_default()
    }

    pub(crate) fn ability_info(&self, id: AbilityId) -> Option<&AbilityInfo> {
        self.catalog.get(id)
    }

    pub(crate) fn aura_info(&self, ability: &AbilityInfo, caster: Entity, stacks: u32) -> Option<AuraInfo> {
        let spec = ability.aura.as_ref()?;
        Some(AuraInfo {
            ability: ability.id,
            chain_head: ability.chain_head(),
            caster: Some(caster),
            stacks,
            positive: spec.positive,
            dispel: spec.dispel,
            periodic_heal: ability.has_effect(AbilityEffect::PeriodicHeal),
            exclusive_group: spec.exclusive_group,
            group_power: spec.group_power,
        })
    }
}

// ============================================================================
// Read-only Interfaces
// ============================================================================

impl WorldQuery for SandboxWorld {
    fn unit(&self, entity: Entity) -> Option<UnitInfo> {
        self.units.get(&entity).map(|u| u.info)
    }

    fn auras(&self, entity: Entity) -> Vec<AuraInfo> {
        self.auras
            .get(&entity)
            .map(|list| list.iter().map(|a| a.info).collect())
            .unwrap_or_default()
    }

    fn attackers(&self, entity: Entity) -> UnitList {
        self.units
            .values()
            .filter(|u| u.info.is_alive() && u.info.victim == Some(entity))
            .filter(|u| self.is_hostile(u.info.entity, entity))
            .map(|u| u.info.entity)
            .collect()
    }

    fn group(&self, entity: Entity) -> Option<GroupInfo> {
        self.groups.iter().find(|g| g.contains(entity)).cloned()
    }

    fn in_line_of_sight(&self, from: Entity, to: Entity) -> bool {
        !self.blocked_sight.contains(&pair(from, to))
    }

    fn can_attack(&self, attacker: Entity, target: Entity) -> bool {
        let Some(target) = self.units.get(&target) else {
            return false;
        };
        self.is_hostile(attacker, target.info.entity) && target.info.is_alive() && !target.info.isolated
    }

    fn threat(&self, hostile: Entity, unit: Entity) -> f32 {
        self.threat.get(&(hostile, unit)).copied().unwrap_or(0.0)
    }

    fn hostiles_near(&self, center: Vec3, radius: f32, viewer: Entity) -> UnitList {
        self.units
            .values()
            .filter(|u| u.info.is_alive() && self.is_hostile(viewer, u.info.entity))
            .filter(|u| u.info.position.distance(center) <= radius)
            .map(|u| u.info.entity)
            .collect()
    }

    fn objects_near(&self, center: Vec3, radius: f32, entry: u32) -> Vec<Vec3> {
        self.objects
            .iter()
            .filter(|(e, position)| *e == entry && position.distance(center) <= radius)
            .map(|(_, position)| *position)
            .collect()
    }

    fn heal_claim(&self, entity: Entity) -> HealClaim {
        self.heal_claims.get(&entity).copied().unwrap_or_default()
    }

    fn single_target_aura_active(&self, caster: Entity, ability: AbilityId) -> bool {
        self.auras
            .values()
            .flatten()
            .any(|a| a.info.ability == ability && a.info.caster == Some(caster))
    }

    fn bot_role(&self, entity: Entity) -> Option<Role> {
        self.roles.get(&entity).copied()
    }
}

impl AbilityBook for SandboxWorld {
    fn ability(&self, id: AbilityId) -> Option<&AbilityInfo> {
        self.catalog.get(id)
    }

    fn known_abilities(&self, agent: Entity) -> Vec<KnownAbility> {
        self.known.get(&agent).cloned().unwrap_or_default()
    }

    fn cooldown_remaining(&self, agent: Entity, id: AbilityId) -> u32 {
        self.cooldowns
            .get(&(agent, id))
            .map(|c| c.remaining())
            .unwrap_or(0)
    }

    fn global_cooldown_remaining(&self, agent: Entity, _id: AbilityId) -> u32 {
        self.global_cooldowns
            .get(&agent)
            .map(|c| c.remaining())
            .unwrap_or(0)
    }

    fn knows(&self, agent: Entity, id: AbilityId) -> bool {
        self.known
            .get(&agent)
            .map(|roster| roster.iter().any(|k| k.id == id && !k.disabled && !k.removed))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::world::WorldQueryExt;

    fn empty_world() -> SandboxWorld {
        SandboxWorld::new(AbilityCatalog::from_abilities(Vec::new()))
    }

    #[test]
    fn test_attackers_need_hostility() {
        let mut world = empty_world();
        let me = world.spawn_unit(UnitKind::Player, Vec3::ZERO, |_| {});
        let friend = world.spawn_unit(UnitKind::Player, Vec3::X, |u| u.victim = None);
        let enemy = world.spawn_unit(UnitKind::Creature, Vec3::Y, |_| {});
        world.update_unit(enemy, |u| u.victim = Some(me));
        world.update_unit(friend, |u| u.victim = Some(me));

        assert!(world.attackers(me).is_empty());
        world.set_hostile(me, enemy);
        assert_eq!(world.attackers(me).as_slice(), &[enemy]);
        assert_eq!(world.attackers_within(me, 5.0), 1);
    }

    #[test]
    fn test_group_lookup_and_marks() {
        let mut world = empty_world();
        let a = world.spawn_unit(UnitKind::Player, Vec3::ZERO, |_| {});
        let b = world.spawn_unit(UnitKind::Player, Vec3::ZERO, |_| {});
        let skull = world.spawn_unit(UnitKind::Creature, Vec3::ZERO, |_| {});
        world.add_group(GroupInfo {
            leader: Some(a),
            members: [a, b].into_iter().collect(),
            ..Default::default()
        });
        world.mark(a, RaidMarker::Skull, skull);

        let group = world.group(b).expect("b is grouped");
        assert_eq!(group.marked(RaidMarker::Skull), Some(skull));
        assert!(world.group(skull).is_none());
    }

    #[test]
    fn test_known_abilities_respect_flags() {
        let mut world = empty_world();
        let me = world.spawn_unit(UnitKind::Player, Vec3::ZERO, |_| {});
        world.learn(me, KnownAbility::active(AbilityId(133)));
        world.learn(
            me,
            KnownAbility {
                id: AbilityId(116),
                disabled: true,
                removed: false,
            },
        );
        assert!(world.knows(me, AbilityId(133)));
        assert!(!world.knows(me, AbilityId(116)));
        assert_eq!(world.known_abilities(me).len(), 2);
    }
}
