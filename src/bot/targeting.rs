//! Target Selection
//!
//! Selection algorithms over the group roster and the hostiles around it.
//! Every selector returns `Option`; ties are broken with the agent's own
//! `BotRng`, which is the only state a selector touches.
//!
//! ## Heal tiers
//! 1. self, when below the threshold
//! 2. same-subgroup members
//! 3. other-subgroup members
//! 4. pets of same-subgroup members

use bevy::prelude::*;

use super::abilities::{AbilityId, Mechanic};
use super::choice::choose_one;
use super::context::BotContext;
use super::coordination;
use super::eligibility::{is_valid_buff_target, is_valid_dispel_target};
use super::role::{signature, Role};
use super::world::{HealKind, UnitInfo, UnitList, WorldQueryExt};

/// Friendly spells (heals, buffs, dispels) reach this far.
pub const FRIENDLY_SPELL_RANGE: f32 = 30.0;

/// Party attackers farther than this are ignored.
pub const PARTY_ASSIST_RANGE: f32 = 120.0;

impl<'a> BotContext<'a> {
    /// Living members of the agent's group other than the agent, resolved
    /// to snapshots. Members that no longer resolve are skipped.
    pub fn other_members(&self) -> Vec<UnitInfo> {
        let Some(group) = &self.group else {
            return Vec::new();
        };
        group
            .members
            .iter()
            .filter(|m| **m != self.me.entity)
            .filter_map(|m| self.world.unit(*m))
            .collect()
    }

    /// Whether `member` is a tank: a bot with the Tank role, or a unit that
    /// knows a tanking signature or sits in bear form.
    pub fn is_tank(&self, member: &UnitInfo) -> bool {
        if member.entity == self.me.entity {
            return self.role() == Role::Tank;
        }
        if let Some(role) = self.world.bot_role(member.entity) {
            return role == Role::Tank;
        }
        self.book.knows(member.entity, signature::SHIELD_SLAM)
            || self.book.knows(member.entity, signature::HOLY_SHIELD)
            || member.form.is_bear()
    }

    /// Attackable, visible, not isolated and not under damage-breakable
    /// crowd control.
    pub fn is_valid_hostile_target(&self, target: &UnitInfo) -> bool {
        target.is_alive()
            && self.world.can_attack(self.me.entity, target.entity)
            && !target.isolated
            && !target.breakable_cc
    }

    fn is_valid_heal_target(&self, target: &UnitInfo, health_pct: f32) -> bool {
        target.health_pct() < health_pct
            && target.is_alive()
            && self.world.in_line_of_sight(self.me.entity, target.entity)
            && self.me.distance_to(target) <= FRIENDLY_SPELL_RANGE
    }

    /// Pick a unit to heal below `health_pct`. In periodic mode, units that
    /// already carry a heal-over-time are skipped.
    pub fn select_heal_target(&mut self, health_pct: f32, periodic: bool) -> Option<Entity> {
        if self.me.health_pct() < health_pct
            && !(periodic && self.world.has_periodic_heal(self.me.entity))
        {
            return Some(self.me.entity);
        }

        let mut high: Vec<Entity> = Vec::new();
        let mut medium: Vec<Entity> = Vec::new();
        let mut low: Vec<Entity> = Vec::new();

        for member in self.other_members() {
            let claim = self.world.heal_claim(member.entity);
            let claimed = if periodic {
                claim.periodic.is_running()
            } else {
                claim.direct.is_running()
            };
            if claimed {
                continue;
            }

            let same_subgroup = member.subgroup == self.me.subgroup;

            if self.is_valid_heal_target(&member, health_pct)
                && !(periodic && self.world.has_periodic_heal(member.entity))
            {
                if same_subgroup {
                    high.push(member.entity);
                } else {
                    medium.push(member.entity);
                }
            }

            if same_subgroup {
                if let Some(pet) = member.pet.and_then(|p| self.world.unit(p)) {
                    if self.is_valid_heal_target(&pet, health_pct)
                        && !(periodic && self.world.has_periodic_heal(pet.entity))
                    {
                        low.push(pet.entity);
                    }
                }
            }
        }

        let rng = &mut self.state.rng;
        [high, medium, low]
            .iter()
            .find(|tier| !tier.is_empty())
            .and_then(|tier| choose_one(tier, rng))
    }

    /// Among `heals` (strongest first), the castable one whose amount is
    /// closest to the target's missing health. The walk stops at the first
    /// heal smaller than the deficit.
    pub fn select_most_efficient_heal(&self, target: Entity, heals: &[AbilityId]) -> Option<AbilityId> {
        let unit = self.world.unit(target)?;
        let missing = unit.missing_health() as i64;

        let mut best: Option<(AbilityId, i64)> = None;
        for heal in heals {
            if !self.can_attempt(target, *heal) {
                continue;
            }
            let Some(info) = self.book.ability(*heal) else {
                continue;
            };
            let diff = info.heal_amount as i64 - missing;
            if best.map(|(_, d)| diff.abs() < d).unwrap_or(true) {
                best = Some((*heal, diff.abs()));
            }
            if diff < 0 {
                break;
            }
        }
        best.map(|(id, _)| id)
    }

    /// Direct-heal `target` and claim it so other healers look elsewhere.
    pub fn heal_direct(&mut self, target: Entity) -> bool {
        let heals = self.state.loadout.direct_heals.clone();
        let Some(heal) = self.select_most_efficient_heal(target, &heals) else {
            return false;
        };
        if !self.do_cast(target, heal).is_ok() {
            return false;
        }

        if let Some(unit) = self.world.unit(target).filter(|u| u.is_player()) {
            let cast_time = self.book.ability(heal).map(|a| a.cast_time_ms).unwrap_or(0);
            let claim = if self.is_tank(&unit) {
                1
            } else if cast_time > 0 {
                cast_time / 2
            } else {
                1000
            };
            self.commands.claim_heal(target, HealKind::Direct, claim);
        }
        true
    }

    /// Heal-over-time on `target`, claiming its periodic slot.
    pub fn heal_periodic(&mut self, target: Entity) -> bool {
        let heals = self.state.loadout.periodic_heals.clone();
        let Some(heal) = self.select_most_efficient_heal(target, &heals) else {
            return false;
        };
        if !self.do_cast(target, heal).is_ok() {
            return false;
        }
        if self.world.unit(target).map(|u| u.is_player()).unwrap_or(false) {
            self.commands.claim_heal(target, HealKind::Periodic, 1000);
        }
        true
    }

    /// Three-tier healing pass: critical direct heals, then heal-over-time
    /// below `minimum`, then direct heals below the midpoint.
    pub fn find_and_heal_injured_ally(&mut self, minimum: f32, critical: f32) -> bool {
        let direct_threshold = minimum - (minimum - critical).abs() / 2.0;

        if let Some(target) = self.select_heal_target(critical, false) {
            return self.heal_direct(target);
        }

        if minimum > critical {
            if let Some(target) = self.select_heal_target(minimum, true) {
                return self.heal_periodic(target);
            }
            if let Some(target) = self.select_heal_target(direct_threshold, false) {
                return self.heal_direct(target);
            }
        }

        false
    }

    /// Self first, otherwise a random member carrying something `ability`
    /// removes.
    pub fn select_dispel_target(&mut self, ability: AbilityId) -> Option<Entity> {
        if is_valid_dispel_target(self.world, self.book, &self.me, &self.me, ability) {
            return Some(self.me.entity);
        }

        let candidates: Vec<Entity> = self
            .other_members()
            .into_iter()
            .filter(|m| {
                m.is_alive()
                    && is_valid_dispel_target(self.world, self.book, &self.me, m, ability)
                    && self.world.in_line_of_sight(self.me.entity, m.entity)
                    && self.me.distance_to(m) <= FRIENDLY_SPELL_RANGE
            })
            .map(|m| m.entity)
            .collect();

        choose_one(&candidates, &mut self.state.rng)
    }

    /// Whether `target` carries something `ability` removes.
    pub fn is_valid_dispel_target(&self, target: &UnitInfo, ability: AbilityId) -> bool {
        is_valid_dispel_target(self.world, self.book, &self.me, target, ability)
    }

    fn buff_candidate(&self, member: &UnitInfo) -> bool {
        member.is_alive()
            && self.world.in_line_of_sight(self.me.entity, member.entity)
            && self.me.distance_to(member) <= FRIENDLY_SPELL_RANGE
    }

    /// Self first, otherwise a random member that lacks the buff.
    pub fn select_buff_target(&mut self, ability: AbilityId) -> Option<Entity> {
        if is_valid_buff_target(self.world, self.book, self.me.entity, ability) {
            return Some(self.me.entity);
        }

        let candidates: Vec<Entity> = self
            .other_members()
            .into_iter()
            .filter(|m| m.is_player() && self.buff_candidate(m))
            .filter(|m| is_valid_buff_target(self.world, self.book, m.entity, ability))
            .map(|m| m.entity)
            .collect();

        choose_one(&candidates, &mut self.state.rng)
    }

    /// Random member, self included, that lacks the buff matching its
    /// weapon style. Returns the member and the ability to use on it.
    pub fn select_buff_target_by_class(
        &mut self,
        melee: AbilityId,
        ranged: AbilityId,
    ) -> Option<(Entity, AbilityId)> {
        let mut members = self.other_members();
        members.push(self.me);

        let candidates: Vec<(Entity, AbilityId)> = members
            .iter()
            .filter(|m| m.is_player() && self.buff_candidate(m))
            .filter_map(|m| {
                let ability = match m.class {
                    Some(class) if class.is_melee_weapon_class() => melee,
                    _ => ranged,
                };
                is_valid_buff_target(self.world, self.book, m.entity, ability).then_some((m.entity, ability))
            })
            .collect();

        choose_one(&candidates, &mut self.state.rng)
    }

    /// First valid hostile attacking the agent.
    fn first_valid_attacker(&self, attackers: &UnitList) -> Option<Entity> {
        attackers
            .iter()
            .filter_map(|a| self.world.unit(*a))
            .find(|a| self.is_valid_hostile_target(a))
            .map(|a| a.entity)
    }

    /// Who to fight: own attackers, the leader's target (focus marks
    /// first), the pet's fight, then anyone attacking the party.
    pub fn select_attack_target(&mut self) -> Option<Entity> {
        if let Some(attacker) = self.first_valid_attacker(&self.attackers()) {
            return Some(attacker);
        }

        if let Some(leader) = self.leader {
            if let Some(victim) = leader.victim.and_then(|v| self.world.unit(v)) {
                let focus: Vec<Entity> = self
                    .state
                    .focus_marks
                    .iter()
                    .filter_map(|mark| self.group.as_ref().and_then(|g| g.marked(*mark)))
                    .collect();
                for marked in focus {
                    if let Some(unit) = self.world.unit(marked) {
                        if self.is_valid_hostile_target(&unit) {
                            return Some(marked);
                        }
                    }
                }

                if leader.in_combat && self.is_valid_hostile_target(&victim) {
                    return Some(victim.entity);
                }
            }
        }

        if let Some(pet) = self.me.pet.and_then(|p| self.world.unit(p)) {
            if let Some(victim) = pet.victim.and_then(|v| self.world.unit(v)) {
                if self.is_valid_hostile_target(&victim) {
                    return Some(victim.entity);
                }
            }
            if let Some(attacker) = self.first_valid_attacker(&self.world.attackers(pet.entity)) {
                return Some(attacker);
            }
        }

        self.select_party_attack_target()
    }

    /// Random non-player hostile attacking another member (or a member's
    /// pet) within assist range. A tank leaves other tanks' victims alone.
    pub fn select_party_attack_target(&mut self) -> Option<Entity> {
        let mut candidates: Vec<Entity> = Vec::new();
        let i_am_tank = self.role() == Role::Tank;

        for member in self.other_members() {
            let member_is_tank = i_am_tank && self.is_tank(&member);
            for attacker in self.world.attackers(member.entity) {
                let Some(unit) = self.world.unit(attacker) else {
                    continue;
                };
                if unit.is_player()
                    || !self.is_valid_hostile_target(&unit)
                    || self.me.distance_to(&unit) > PARTY_ASSIST_RANGE
                {
                    continue;
                }
                if member_is_tank && member.victim == Some(attacker) {
                    continue;
                }
                candidates.push(attacker);
            }

            if let Some(pet) = member.pet {
                for attacker in self.world.attackers(pet) {
                    if let Some(unit) = self.world.unit(attacker) {
                        if self.is_valid_hostile_target(&unit)
                            && self.me.distance_to(&unit) <= PARTY_ASSIST_RANGE
                        {
                            candidates.push(attacker);
                        }
                    }
                }
            }
        }

        choose_one(&candidates, &mut self.state.rng)
    }

    /// First attacker of the agent other than `except`.
    pub fn select_attacker_different_from(&self, except: Option<Entity>) -> Option<Entity> {
        self.attackers().into_iter().find(|a| Some(*a) != except)
    }

    /// Attackers within `range` yards, edge to edge.
    pub fn attackers_in_range_count(&self, range: f32) -> usize {
        self.attackers()
            .iter()
            .filter_map(|a| self.world.unit(*a))
            .filter(|a| self.me.combat_distance_to(a) <= range)
            .count()
    }

    /// Members and their pets within `range` below `health_pct`. Members
    /// with a direct heal already claimed are not counted.
    pub fn allies_needing_heal_count(&self, range: f32, health_pct: f32) -> usize {
        let mut members = self.other_members();
        members.push(self.me);

        let mut count = 0;
        for member in members {
            if self.me.distance_to(&member) > range {
                continue;
            }
            if self.world.heal_claim(member.entity).direct.is_running() {
                continue;
            }
            if self.is_valid_heal_target(&member, health_pct) {
                count += 1;
            }
            if let Some(pet) = member.pet.and_then(|p| self.world.unit(p)) {
                if self.is_valid_heal_target(&pet, health_pct) {
                    count += 1;
                }
            }
        }
        count
    }

    /// Random hostile near `victim`, other than the victim, on which
    /// `ability` could be cast.
    pub fn select_spell_target_different_from(
        &mut self,
        ability: AbilityId,
        victim: Option<Entity>,
        radius: f32,
    ) -> Option<Entity> {
        if !self.is_ready(ability) {
            return None;
        }
        let center = victim
            .and_then(|v| self.world.unit(v))
            .map(|v| v.position)
            .unwrap_or(self.me.position);

        let candidates: Vec<Entity> = self
            .world
            .hostiles_near(center, radius, self.me.entity)
            .into_iter()
            .filter(|h| Some(*h) != victim)
            .filter(|h| {
                self.world.in_line_of_sight(self.me.entity, *h)
                    && self.world.can_attack(self.me.entity, *h)
                    && self.can_attempt(*h, ability)
            })
            .collect();

        choose_one(&candidates, &mut self.state.rng)
    }

    /// Random dead member, other than the agent, whose body is still there.
    pub fn select_resurrection_target(&mut self) -> Option<Entity> {
        let candidates: Vec<Entity> = self
            .other_members()
            .into_iter()
            .filter(|m| m.is_player() && m.life == super::world::LifeState::Corpse)
            .map(|m| m.entity)
            .collect();
        choose_one(&candidates, &mut self.state.rng)
    }

    /// First member below half health that is being attacked and can take
    /// a shield.
    pub fn select_shield_target(&self) -> Option<Entity> {
        self.other_members()
            .into_iter()
            .find(|m| {
                self.is_valid_heal_target(m, 50.0)
                    && !self.world.attackers(m.entity).is_empty()
                    && !m.is_immune_to_mechanic(Mechanic::Shield)
            })
            .map(|m| m.entity)
    }

    /// Most injured living member (pets excluded) within `range` below
    /// `health_pct`, not counting the agent.
    pub fn select_lowest_health_ally(&self, range: f32, health_pct: f32) -> Option<UnitInfo> {
        self.other_members()
            .into_iter()
            .filter(|m| m.is_alive() && m.health_pct() < health_pct && self.me.distance_to(m) <= range)
            .min_by(|a, b| a.health_pct().total_cmp(&b.health_pct()))
    }

    /// Crowd control on `target` will not be wasted: damage-breakable
    /// effects are kept off targets others are fighting, and single-target
    /// effects are not recast while active elsewhere.
    pub fn can_use_crowd_control(&self, ability: AbilityId, target: Entity) -> bool {
        let Some(info) = self.book.ability(ability) else {
            return false;
        };
        if info.breaks_on_damage() && coordination::others_on_same_target(self, target) > 0 {
            return false;
        }
        if info.is_single_target_aura() && self.world.single_target_aura_active(self.me.entity, ability) {
            return false;
        }
        true
    }

    /// Marked hostiles worth crowd-controlling, in marker order.
    pub fn crowd_control_candidates(&self) -> Vec<Entity> {
        let Some(group) = self.group.as_ref() else {
            return Vec::new();
        };
        self.state
            .cc_marks
            .iter()
            .filter_map(|mark| group.marked(*mark))
            .filter_map(|e| self.world.unit(e))
            .filter(|target| {
                !target.lost_control
                    && self.is_valid_hostile_target(target)
                    && coordination::others_on_same_target(self, target.entity) < 2
            })
            .map(|t| t.entity)
            .collect()
    }

    /// `entity` carries an aura from any rank of `ability`'s chain.
    pub fn has_aura_any_rank(&self, entity: Entity, ability: AbilityId) -> bool {
        match self.book.ability(ability) {
            Some(info) => self.world.has_aura_chain(entity, info.chain_head()),
            None => false,
        }
    }
}
