//! Command Interface
//!
//! Requests from an agent to the simulation. All of them are best effort:
//! the host may reject anything, and the agent only learns about it through
//! the `CastResult` of a cast or the next tick's world state.

use bevy::prelude::*;
use std::collections::VecDeque;

use super::abilities::AbilityId;
use super::world::{HealKind, WeaponHand};

/// Outcome of a cast request.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CastResult {
    Ok,
    OutOfRange,
    NoAmmo,
    ItemNotReady,
    NotReady,
    Moving,
    Rejected,
}

impl CastResult {
    pub fn is_ok(self) -> bool {
        self == CastResult::Ok
    }
}

/// Auras an agent can remove from itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CancelAura {
    Stealth,
    FeignDeath,
    Shapeshift,
    Mount,
}

/// Everything an agent can ask the simulation to do.
pub trait CommandSink {
    fn request_cast(&mut self, caster: Entity, target: Entity, ability: AbilityId) -> CastResult;
    /// Cast a consumable's triggered spell (potion, food, mount). No cost,
    /// cooldown or global cooldown applies.
    fn request_use_consumable(&mut self, agent: Entity, ability: AbilityId) -> CastResult;
    /// Supersedes any pending movement.
    fn request_move(&mut self, agent: Entity, destination: Vec3);
    fn request_stop_movement(&mut self, agent: Entity);
    fn request_follow(&mut self, agent: Entity, leader: Entity, distance: f32, angle: f32);
    fn request_chase(&mut self, agent: Entity, target: Entity, distance: f32);
    fn request_attack(&mut self, agent: Entity, target: Entity, melee: bool) -> bool;
    fn request_attack_stop(&mut self, agent: Entity);
    fn request_pet_attack(&mut self, agent: Entity, target: Entity);
    fn request_stop_auto_repeat(&mut self, agent: Entity);
    fn request_teleport_to(&mut self, agent: Entity, destination: Entity);
    fn request_revive(&mut self, agent: Entity);
    fn request_release_spirit(&mut self, agent: Entity);
    fn request_removal(&mut self, agent: Entity);
    fn request_restock(&mut self, agent: Entity, item: u32);
    fn request_dismount(&mut self, agent: Entity);
    fn request_cancel_aura(&mut self, agent: Entity, aura: CancelAura);
    fn request_summon_companion(&mut self, agent: Entity);
    /// Apply a temporary weapon enchant through `ability`.
    fn request_weapon_enchant(
        &mut self,
        agent: Entity,
        ability: AbilityId,
        hand: WeaponHand,
    ) -> CastResult;
    fn claim_heal(&mut self, target: Entity, kind: HealKind, duration_ms: u32);
}

/// A single recorded request.
#[derive(Clone, Copy, PartialEq, Debug)]
pub enum Command {
    Cast { caster: Entity, target: Entity, ability: AbilityId },
    UseConsumable { agent: Entity, ability: AbilityId },
    Move { agent: Entity, destination: Vec3 },
    StopMovement { agent: Entity },
    Follow { agent: Entity, leader: Entity, distance: f32, angle: f32 },
    Chase { agent: Entity, target: Entity, distance: f32 },
    Attack { agent: Entity, target: Entity, melee: bool },
    AttackStop { agent: Entity },
    PetAttack { agent: Entity, target: Entity },
    StopAutoRepeat { agent: Entity },
    TeleportTo { agent: Entity, destination: Entity },
    Revive { agent: Entity },
    ReleaseSpirit { agent: Entity },
    Removal { agent: Entity },
    Restock { agent: Entity, item: u32 },
    Dismount { agent: Entity },
    CancelAura { agent: Entity, aura: CancelAura },
    SummonCompanion { agent: Entity },
    WeaponEnchant { agent: Entity, ability: AbilityId, hand: WeaponHand },
    ClaimHeal { target: Entity, kind: HealKind, duration_ms: u32 },
}

impl Command {
    /// Casts and movement orders. An agent issues at most one of these per
    /// tick; the rest (attack toggles, stops, claims, dismounts) only
    /// accompany one.
    pub fn is_action(&self) -> bool {
        matches!(
            self,
            Command::Cast { .. }
                | Command::UseConsumable { .. }
                | Command::WeaponEnchant { .. }
                | Command::SummonCompanion { .. }
                | Command::Move { .. }
                | Command::Follow { .. }
                | Command::Chase { .. }
                | Command::TeleportTo { .. }
        )
    }
}

/// A sink that records every request and accepts all of them, unless told
/// to answer casts with a fixed result.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    pub commands: Vec<Command>,
    /// Returned from every cast request when set.
    pub cast_result: Option<CastResult>,
}

impl CommandBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(result: CastResult) -> Self {
        Self {
            commands: Vec::new(),
            cast_result: Some(result),
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.commands.drain(..)
    }

    /// Abilities cast so far, in order.
    pub fn casts(&self) -> Vec<(Entity, AbilityId)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Cast { target, ability, .. } => Some((*target, *ability)),
                _ => None,
            })
            .collect()
    }

    /// Casts and movement orders recorded so far.
    pub fn actions(&self) -> Vec<Command> {
        self.commands.iter().filter(|c| c.is_action()).copied().collect()
    }

    pub fn last_cast(&self) -> Option<(Entity, AbilityId)> {
        self.casts().last().copied()
    }

    pub fn moves(&self) -> Vec<Vec3> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Move { destination, .. } => Some(*destination),
                _ => None,
            })
            .collect()
    }

    pub fn contains(&self, predicate: impl Fn(&Command) -> bool) -> bool {
        self.commands.iter().any(predicate)
    }

    fn cast_outcome(&self) -> CastResult {
        self.cast_result.unwrap_or(CastResult::Ok)
    }
}

impl CommandSink for CommandBuffer {
    fn request_cast(&mut self, caster: Entity, target: Entity, ability: AbilityId) -> CastResult {
        self.commands.push(Command::Cast { caster, target, ability });
        self.cast_outcome()
    }

    fn request_use_consumable(&mut self, agent: Entity, ability: AbilityId) -> CastResult {
        self.commands.push(Command::UseConsumable { agent, ability });
        self.cast_outcome()
    }

    fn request_move(&mut self, agent: Entity, destination: Vec3) {
        self.commands.push(Command::Move { agent, destination });
    }

    fn request_stop_movement(&mut self, agent: Entity) {
        self.commands.push(Command::StopMovement { agent });
    }

    fn request_follow(&mut self, agent: Entity, leader: Entity, distance: f32, angle: f32) {
        self.commands.push(Command::Follow { agent, leader, distance, angle });
    }

    fn request_chase(&mut self, agent: Entity, target: Entity, distance: f32) {
        self.commands.push(Command::Chase { agent, target, distance });
    }

    fn request_attack(&mut self, agent: Entity, target: Entity, melee: bool) -> bool {
        self.commands.push(Command::Attack { agent, target, melee });
        true
    }

    fn request_attack_stop(&mut self, agent: Entity) {
        self.commands.push(Command::AttackStop { agent });
    }

    fn request_pet_attack(&mut self, agent: Entity, target: Entity) {
        self.commands.push(Command::PetAttack { agent, target });
    }

    fn request_stop_auto_repeat(&mut self, agent: Entity) {
        self.commands.push(Command::StopAutoRepeat { agent });
    }

    fn request_teleport_to(&mut self, agent: Entity, destination: Entity) {
        self.commands.push(Command::TeleportTo { agent, destination });
    }

    fn request_revive(&mut self, agent: Entity) {
        self.commands.push(Command::Revive { agent });
    }

    fn request_release_spirit(&mut self, agent: Entity) {
        self.commands.push(Command::ReleaseSpirit { agent });
    }

    fn request_removal(&mut self, agent: Entity) {
        self.commands.push(Command::Removal { agent });
    }

    fn request_restock(&mut self, agent: Entity, item: u32) {
        self.commands.push(Command::Restock { agent, item });
    }

    fn request_dismount(&mut self, agent: Entity) {
        self.commands.push(Command::Dismount { agent });
    }

    fn request_cancel_aura(&mut self, agent: Entity, aura: CancelAura) {
        self.commands.push(Command::CancelAura { agent, aura });
    }

    fn request_summon_companion(&mut self, agent: Entity) {
        self.commands.push(Command::SummonCompanion { agent });
    }

    fn request_weapon_enchant(
        &mut self,
        agent: Entity,
        ability: AbilityId,
        hand: WeaponHand,
    ) -> CastResult {
        self.commands.push(Command::WeaponEnchant { agent, ability, hand });
        self.cast_outcome()
    }

    fn claim_heal(&mut self, target: Entity, kind: HealKind, duration_ms: u32) {
        self.commands.push(Command::ClaimHeal { target, kind, duration_ms });
    }
}

/// Protocol replies produced by session hooks, drained by the transport.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OutboundCommand {
    AcceptResurrect { caster: Entity },
    PassLootRoll { roll_id: u32 },
    BeginTrade,
    AcceptTrade,
    TeleportAck,
    WorldPortAck,
    BattlegroundPort { accept: bool },
}

/// FIFO queue of outbound protocol replies.
#[derive(Debug, Default)]
pub struct CommandQueue {
    queue: VecDeque<OutboundCommand>,
}

impl CommandQueue {
    pub fn push(&mut self, command: OutboundCommand) {
        self.queue.push_back(command);
    }

    pub fn pop(&mut self) -> Option<OutboundCommand> {
        self.queue.pop_front()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = OutboundCommand> + '_ {
        self.queue.drain(..)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_records_in_order() {
        let agent = Entity::from_raw(1);
        let target = Entity::from_raw(2);
        let mut buffer = CommandBuffer::new();

        assert!(buffer.request_cast(agent, target, AbilityId(133)).is_ok());
        buffer.request_stop_movement(agent);
        buffer.request_cast(agent, target, AbilityId(116));

        assert_eq!(
            buffer.casts(),
            vec![(target, AbilityId(133)), (target, AbilityId(116))]
        );
        assert_eq!(buffer.commands.len(), 3);
    }

    #[test]
    fn test_only_casts_and_moves_are_actions() {
        let agent = Entity::from_raw(1);
        let target = Entity::from_raw(2);
        let mut buffer = CommandBuffer::new();

        buffer.request_attack(agent, target, true);
        buffer.request_stop_movement(agent);
        buffer.claim_heal(target, HealKind::Direct, 1000);
        assert!(buffer.actions().is_empty());

        buffer.request_chase(agent, target, 1.0);
        buffer.request_cast(agent, target, AbilityId(133));
        assert_eq!(buffer.actions().len(), 2);
    }

    #[test]
    fn test_rejecting_buffer() {
        let mut buffer = CommandBuffer::rejecting(CastResult::OutOfRange);
        let e = Entity::from_raw(1);
        assert_eq!(buffer.request_cast(e, e, AbilityId(1)), CastResult::OutOfRange);
    }

    #[test]
    fn test_queue_is_fifo() {
        let mut queue = CommandQueue::default();
        queue.push(OutboundCommand::TeleportAck);
        queue.push(OutboundCommand::WorldPortAck);
        assert_eq!(queue.pop(), Some(OutboundCommand::TeleportAck));
        assert_eq!(queue.len(), 1);
    }
}
