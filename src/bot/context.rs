//! Bot Context
//!
//! Everything a decision needs for one tick, bundled so class behaviors can
//! stay stateless: the world and ability views, the command sink, the
//! agent's mutable state, and snapshots of the agent, its leader and group.

use bevy::prelude::*;

use super::abilities::{AbilityId, AbilityInfo};
use super::agent::BotState;
use super::commands::{CastResult, CommandSink};
use super::eligibility;
use super::loadout::Loadout;
use super::role::Role;
use super::slot_table::Slot;
use super::world::{AbilityBook, GroupInfo, UnitInfo, UnitList, WorldQuery, WorldQueryExt};

/// Per-tick decision context.
pub struct BotContext<'a> {
    pub world: &'a dyn WorldQuery,
    pub book: &'a dyn AbilityBook,
    pub commands: &'a mut dyn CommandSink,
    pub state: &'a mut BotState,
    /// Snapshot of the agent taken at the start of the tick.
    pub me: UnitInfo,
    pub leader: Option<UnitInfo>,
    pub group: Option<GroupInfo>,
}

impl<'a> BotContext<'a> {
    pub fn role(&self) -> Role {
        self.state.role
    }

    pub fn loadout(&self) -> &Loadout {
        &self.state.loadout
    }

    /// Ability filling `slot`, if any.
    pub fn slot(&self, slot: Slot) -> Option<AbilityId> {
        self.state.loadout.get(slot)
    }

    pub fn ability(&self, id: AbilityId) -> Option<&'a AbilityInfo> {
        self.book.ability(id)
    }

    pub fn unit(&self, entity: Entity) -> Option<UnitInfo> {
        self.world.unit(entity)
    }

    /// Current victim, if it still resolves.
    pub fn victim(&self) -> Option<UnitInfo> {
        self.me.victim.and_then(|v| self.world.unit(v))
    }

    pub fn attackers(&self) -> UnitList {
        self.world.attackers(self.me.entity)
    }

    pub fn attackers_within(&self, range: f32) -> usize {
        self.world.attackers_within(self.me.entity, range)
    }

    /// Hostiles within `radius` of the agent.
    pub fn enemies_near(&self, radius: f32) -> usize {
        self.world.hostiles_near(self.me.position, radius, self.me.entity).len()
    }

    /// Hostiles within `radius` of `unit`.
    pub fn enemies_near_unit(&self, unit: &UnitInfo, radius: f32) -> usize {
        self.world.hostiles_near(unit.position, radius, self.me.entity).len()
    }

    pub fn has_aura(&self, entity: Entity, ability: AbilityId) -> bool {
        self.world.has_aura(entity, ability)
    }

    pub fn in_raid(&self) -> bool {
        self.group.as_ref().map(|g| g.raid).unwrap_or(false)
    }

    pub fn is_ready(&self, ability: AbilityId) -> bool {
        eligibility::is_ready(self.book, &self.me, ability)
    }

    pub fn can_attempt(&self, target: Entity, ability: AbilityId) -> bool {
        self.can_attempt_stack(target, ability, 1)
    }

    pub fn can_attempt_stack(&self, target: Entity, ability: AbilityId, max_stack: u32) -> bool {
        eligibility::can_attempt(self.world, self.book, &self.me, target, ability, max_stack)
    }

    /// Request a cast with the standard bookkeeping around it.
    pub fn do_cast(&mut self, target: Entity, ability: AbilityId) -> CastResult {
        if self.me.mounted {
            self.commands.request_dismount(self.me.entity);
            self.me.mounted = false;
        }

        let result = self.commands.request_cast(self.me.entity, target, ability);
        let info = self.book.ability(ability);

        match result {
            CastResult::Ok => {
                if self.me.moving && info.map(|i| i.cast_time_ms > 0).unwrap_or(false) {
                    self.commands.request_stop_movement(self.me.entity);
                    self.me.moving = false;
                }
            }
            CastResult::NoAmmo | CastResult::ItemNotReady => {
                if let Some(reagent) = info.and_then(|i| i.reagent) {
                    self.commands.request_restock(self.me.entity, reagent);
                }
                debug!("{:?} cast of {:?} failed: {:?}", self.me.entity, ability, result);
            }
            _ => {
                debug!("{:?} cast of {:?} rejected: {:?}", self.me.entity, ability, result);
            }
        }

        result
    }

    /// Cast `ability` on `target` if it is eligible. True when the cast was
    /// accepted and the tick's action is taken.
    pub fn try_cast(&mut self, target: Entity, ability: AbilityId) -> bool {
        self.try_cast_stack(target, ability, 1)
    }

    pub fn try_cast_stack(&mut self, target: Entity, ability: AbilityId, max_stack: u32) -> bool {
        self.can_attempt_stack(target, ability, max_stack) && self.do_cast(target, ability).is_ok()
    }

    /// `try_cast` on whatever fills `slot`.
    pub fn try_slot(&mut self, target: Entity, slot: Slot) -> bool {
        self.try_slot_stack(target, slot, 1)
    }

    pub fn try_slot_stack(&mut self, target: Entity, slot: Slot, max_stack: u32) -> bool {
        match self.slot(slot) {
            Some(ability) => self.try_cast_stack(target, ability, max_stack),
            None => false,
        }
    }

    /// `try_slot` on the agent itself.
    pub fn try_self(&mut self, slot: Slot) -> bool {
        let me = self.me.entity;
        self.try_slot(me, slot)
    }

    /// `try_slot` on the current victim, if there is one.
    pub fn try_victim(&mut self, slot: Slot) -> bool {
        match self.me.victim {
            Some(victim) => self.try_slot(victim, slot),
            None => false,
        }
    }

    pub fn try_victim_stack(&mut self, slot: Slot, max_stack: u32) -> bool {
        match self.me.victim {
            Some(victim) => self.try_slot_stack(victim, slot, max_stack),
            None => false,
        }
    }

    /// Throttle gating area abilities is clear.
    pub fn aoe_ready(&self) -> bool {
        self.state.aoe_throttle.is_expired()
    }
}
