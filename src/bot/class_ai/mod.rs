//! Class-Specific Behaviors
//!
//! Each class has its own module implementing `ClassBehavior`. Behaviors are
//! stateless unit structs; everything they remember between ticks lives in
//! `BotState` and reaches them through `BotContext`.
//!
//! ## Architecture
//!
//! Every tick the agent loop runs one of two cascades:
//! 1. **Out of combat**: buffs, dispels, top-up heals, pets, forms
//! 2. **In combat**: the class's fixed priority list
//!
//! Cascades are written as a chain of `if ctx.try_...() { return true; }`
//! steps: the first accepted action ends the tick.

pub mod druid;
pub mod hunter;
pub mod mage;
pub mod paladin;
pub mod priest;
pub mod rogue;
pub mod shaman;
pub mod warlock;
pub mod warrior;

use bevy::prelude::*;

use super::abilities::AbilityId;
use super::character::CharacterClass;
use super::context::BotContext;
use super::loadout::Loadout;
use super::rng::BotRng;
use super::role::Role;
use super::slot_table::Slot;
use super::world::{UnitInfo, WeaponHand};

/// Out-of-combat healing thresholds shared by every healer.
pub const OOC_HEAL_MINIMUM: f32 = 90.0;
pub const OOC_HEAL_CRITICAL: f32 = 50.0;

/// Emergency in-combat healing pass, run by hybrids before anything else.
pub const EMERGENCY_HEAL: f32 = 35.0;

/// Regular in-combat healing pass for healers.
pub const COMBAT_HEAL_MINIMUM: f32 = 95.0;
pub const COMBAT_HEAL_CRITICAL: f32 = 50.0;

/// Inputs to class-specific loadout choices.
pub struct PopulateInput<'r> {
    pub role: Role,
    pub me: UnitInfo,
    pub rng: &'r mut BotRng,
}

/// Trait for class-specific decision logic.
pub trait ClassBehavior: Send + Sync {
    fn class(&self) -> CharacterClass;

    /// Make the class's random-once loadout choices. Runs right after the
    /// generic population.
    fn populate_abilities(&self, _loadout: &mut Loadout, _input: PopulateInput) {}

    /// Out-of-combat cascade. Returns true if an action was taken.
    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool;

    /// In-combat cascade. Returns true if an action was taken.
    fn update_in_combat(&self, ctx: &mut BotContext) -> bool;

    /// Ability used on crowd-control marked targets.
    fn crowd_control_ability(&self, _ctx: &BotContext) -> Option<AbilityId> {
        None
    }

    /// Bring out the class pet if it is missing. Returns true if an action
    /// was taken.
    fn summon_pet(&self, _ctx: &mut BotContext) -> bool {
        false
    }
}

/// Get the behavior for a given class.
pub fn behavior_for(class: CharacterClass) -> Box<dyn ClassBehavior> {
    match class {
        CharacterClass::Warrior => Box::new(warrior::WarriorBehavior),
        CharacterClass::Paladin => Box::new(paladin::PaladinBehavior),
        CharacterClass::Hunter => Box::new(hunter::HunterBehavior),
        CharacterClass::Rogue => Box::new(rogue::RogueBehavior),
        CharacterClass::Priest => Box::new(priest::PriestBehavior),
        CharacterClass::Shaman => Box::new(shaman::ShamanBehavior),
        CharacterClass::Mage => Box::new(mage::MageBehavior),
        CharacterClass::Warlock => Box::new(warlock::WarlockBehavior),
        CharacterClass::Druid => Box::new(druid::DruidBehavior),
    }
}

// ============================================================================
// Shared Cascade Steps
// ============================================================================

/// Buff a member (self first) that lacks the buff in `slot`. Sets the
/// buffing flag so the agent does not wander off mid-round.
pub fn try_group_buff(ctx: &mut BotContext, slot: Slot) -> bool {
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    let Some(target) = ctx.select_buff_target(ability) else {
        return false;
    };
    if ctx.try_cast(target, ability) {
        ctx.state.is_buffing = true;
        return true;
    }
    false
}

/// Like `try_group_buff`, picking the melee or ranged variant per member.
pub fn try_group_buff_by_class(ctx: &mut BotContext, melee: Slot, ranged: Slot) -> bool {
    let (melee, ranged) = match (ctx.slot(melee), ctx.slot(ranged)) {
        (Some(melee), Some(ranged)) => (melee, ranged),
        (Some(only), None) | (None, Some(only)) => (only, only),
        (None, None) => return false,
    };
    let Some((target, ability)) = ctx.select_buff_target_by_class(melee, ranged) else {
        return false;
    };
    if ctx.try_cast(target, ability) {
        ctx.state.is_buffing = true;
        return true;
    }
    false
}

/// End the buff round once the global cooldown of the ability in `slot`
/// has run out (or the slot is empty).
pub fn finish_buff_round(ctx: &mut BotContext, slot: Slot) {
    if !ctx.state.is_buffing {
        return;
    }
    let on_gcd = ctx
        .slot(slot)
        .map(|ability| ctx.book.global_cooldown_remaining(ctx.me.entity, ability) > 0)
        .unwrap_or(false);
    if !on_gcd {
        ctx.state.is_buffing = false;
    }
}

/// Self-only buff that is missing.
pub fn try_self_buff(ctx: &mut BotContext, slot: Slot) -> bool {
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    let me = ctx.me.entity;
    if ctx.has_aura_any_rank(me, ability) {
        return false;
    }
    ctx.try_cast(me, ability)
}

/// Healers bring anyone under the critical threshold back up before they
/// dispel or buff.
pub fn try_critical_heal(ctx: &mut BotContext) -> bool {
    ctx.role() == Role::Healer
        && ctx.find_and_heal_injured_ally(COMBAT_HEAL_CRITICAL, COMBAT_HEAL_CRITICAL)
}

/// Dispel a member (self first) carrying something `slot` removes.
pub fn try_dispel(ctx: &mut BotContext, slot: Slot) -> bool {
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    match ctx.select_dispel_target(ability) {
        Some(target) => ctx.try_cast(target, ability),
        None => false,
    }
}

/// Temporary weapon enchant on `hand`, if the weapon has none.
pub fn try_weapon_enchant(ctx: &mut BotContext, slot: Slot, hand: WeaponHand) -> bool {
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    let weapon = match hand {
        WeaponHand::MainHand => ctx.me.main_hand,
        WeaponHand::OffHand => ctx.me.off_hand,
    };
    if !weapon.equipped || weapon.enchanted || !ctx.is_ready(ability) {
        return false;
    }
    ctx.commands
        .request_weapon_enchant(ctx.me.entity, ability, hand)
        .is_ok()
}

/// Shapeshift or stance change into the form granted by `slot`.
pub fn try_enter_form(ctx: &mut BotContext, slot: Slot) -> bool {
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    let me = ctx.me.entity;
    ctx.try_cast(me, ability)
}

/// Start auto-attacking the victim if not already swinging.
pub fn ensure_melee(ctx: &mut BotContext) {
    if let Some(victim) = ctx.me.victim {
        if !ctx.me.melee_attacking {
            ctx.commands.request_attack(ctx.me.entity, victim, true);
        }
    }
}

/// Fire the repeating ranged attack (Auto Shot, Shoot) at the victim.
pub fn try_auto_repeat(ctx: &mut BotContext, ability: AbilityId) -> bool {
    let Some(victim) = ctx.me.victim else {
        return false;
    };
    if ctx.me.auto_repeating || ctx.me.moving {
        return false;
    }
    if !ctx.can_attempt(victim, ability) {
        return false;
    }
    let accepted = ctx.do_cast(victim, ability).is_ok();
    if accepted {
        debug!("{:?} started auto-repeat {:?}", ctx.me.entity, ability);
    }
    accepted
}

/// Switch the agent's attack to `target`.
pub fn attack_start(ctx: &mut BotContext, target: Entity) -> bool {
    ctx.state.is_buffing = false;
    if ctx.me.mounted {
        ctx.commands.request_dismount(ctx.me.entity);
        ctx.me.mounted = false;
    }
    if !ctx.commands.request_attack(ctx.me.entity, target, true) {
        return false;
    }
    ctx.me.victim = Some(target);
    if let Some(unit) = ctx.unit(target) {
        super::movement::chase(ctx, &unit);
    }
    true
}
