//! Warrior AI
//!
//! Stance dance by role and health, interrupts, shield cooldowns for tanks,
//! then a rage-gated rotation: procs and debuffs first, main strikes once
//! there is rage to spare, Heroic Strike as the dump.

use crate::bot::abilities::{Mechanic, ShapeshiftForm};
use crate::bot::character::CharacterClass;
use crate::bot::context::BotContext;
use crate::bot::role::Role;
use crate::bot::slot_table::Slot;
use crate::bot::world::UnitInfo;

use super::ClassBehavior;

/// Below this rage percentage only procs and debuffs are used.
const RAGE_FOR_UTILITY: f32 = 15.0;
/// Main strikes wait for this much rage.
const RAGE_FOR_STRIKES: f32 = 30.0;

/// Sunder Armor stacks a tank builds in passes.
const SUNDER_FIRST: u32 = 1;
const SUNDER_SECOND: u32 = 2;
const SUNDER_MAX: u32 = 5;

pub struct WarriorBehavior;

impl ClassBehavior for WarriorBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Warrior
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        if ctx.try_self(Slot::BattleStance) {
            return true;
        }

        let Some(shout) = ctx.slot(Slot::BattleShout) else {
            return false;
        };
        let me = ctx.me.entity;
        if ctx.has_aura(me, shout) {
            return false;
        }
        if ctx.try_cast(me, shout) {
            return true;
        }
        ctx.me.power < 10 && ctx.try_self(Slot::Bloodrage)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let Some(victim) = ctx.victim() else {
            return ctx.try_self(Slot::BattleShout);
        };
        let me = ctx.me.entity;
        let role = ctx.role();

        if ctx.try_slot(victim.entity, Slot::Charge) {
            return true;
        }

        if victim.can_reach_with_melee(&ctx.me) && choose_stance(ctx, role) {
            return true;
        }

        if victim.casting {
            if ctx.try_slot(victim.entity, Slot::Pummel) {
                return true;
            }
            if ctx.me.has_shield && ctx.try_slot(victim.entity, Slot::ShieldBash) {
                return true;
            }
        }

        if role == Role::Tank
            && ctx.enemies_near(10.0) > 3
            && ctx.attackers_in_range_count(10.0) <= 1
            && ctx.try_self(Slot::ChallengingShout)
        {
            return true;
        }

        if ctx.me.form == ShapeshiftForm::DefensiveStance
            && ctx.me.has_shield
            && !ctx.attackers().is_empty()
        {
            if ctx.me.health_pct() < 70.0 && ctx.try_self(Slot::ShieldBlock) {
                return true;
            }
            if ctx.me.health_pct() < 30.0 && ctx.try_self(Slot::ShieldWall) {
                return true;
            }
        }

        if ctx.me.health_pct() < 20.0 && ctx.try_self(Slot::LastStand) {
            return true;
        }

        if role != Role::Tank
            && ctx.me.health_pct() < 20.0
            && ctx.attackers_in_range_count(10.0) > 2
            && ctx.try_slot(victim.entity, Slot::IntimidatingShout)
        {
            return true;
        }

        if ctx.try_self(Slot::BattleShout) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::Revenge)
            || ctx.try_slot(victim.entity, Slot::Overpower)
            || ctx.try_self(Slot::BerserkerRage)
        {
            return true;
        }

        if victim.health_pct() < 20.0 && ctx.try_slot(victim.entity, Slot::Execute) {
            return true;
        }

        if role == Role::Tank && ctx.try_slot(victim.entity, Slot::DemoralizingShout) {
            return true;
        }

        if ctx.me.power_pct() < RAGE_FOR_UTILITY {
            return false;
        }

        if role == Role::Tank && ctx.try_slot_stack(victim.entity, Slot::SunderArmor, SUNDER_FIRST) {
            return true;
        }

        if ctx.enemies_near(10.0) > 2 {
            if role == Role::Tank {
                if ctx.try_slot_stack(me, Slot::BattleShout, 2) {
                    return true;
                }
            } else if ctx.try_slot(victim.entity, Slot::Whirlwind)
                || ctx.try_slot(victim.entity, Slot::ThunderClap)
            {
                return true;
            }
        }

        if ctx.try_slot(victim.entity, Slot::Rend) {
            return true;
        }

        if (victim.casting || victim.moving || ctx.me.health_pct() < 50.0)
            && ctx.try_slot(victim.entity, Slot::ConcussionBlow)
        {
            return true;
        }

        if running_free(&victim) && ctx.try_slot(victim.entity, Slot::Hamstring) {
            return true;
        }

        if ctx.me.power_pct() < RAGE_FOR_STRIKES {
            return false;
        }

        if ctx.try_slot(victim.entity, Slot::ShieldSlam) {
            return true;
        }

        if ctx.enemies_near_unit(&victim, 10.0) > 1 && ctx.try_self(Slot::SweepingStrikes) {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::MortalStrike) || ctx.try_slot(victim.entity, Slot::Bloodthirst) {
            return true;
        }

        if role == Role::Tank && ctx.try_slot_stack(victim.entity, Slot::SunderArmor, SUNDER_SECOND) {
            return true;
        }

        let armed = victim.class.map(|c| c.is_melee_weapon_class()).unwrap_or(false);
        if armed && ctx.try_slot(victim.entity, Slot::Disarm) {
            return true;
        }

        if ctx.attackers_in_range_count(10.0) > 2 && ctx.try_self(Slot::Retaliation) {
            return true;
        }

        if role != Role::Tank
            && ctx.me.health_pct() > 60.0
            && victim.health_pct() > 40.0
            && !ctx.me.rooted
            && !ctx.me.is_immune_to_mechanic(Mechanic::Fear)
            && (ctx.try_self(Slot::DeathWish) || ctx.try_self(Slot::Recklessness))
        {
            return true;
        }

        if ctx.try_slot(victim.entity, Slot::Intercept) {
            return true;
        }

        if ctx.enemies_near_unit(&victim, 8.0) > 1 && ctx.try_slot(victim.entity, Slot::Cleave) {
            return true;
        }

        if role == Role::Tank && ctx.try_slot_stack(victim.entity, Slot::SunderArmor, SUNDER_MAX) {
            return true;
        }

        ctx.try_slot(victim.entity, Slot::HeroicStrike)
    }
}

/// Defensive for tanks and the badly hurt; otherwise the stance that
/// carries the known main strike. Returns true if a stance was cast.
fn choose_stance(ctx: &mut BotContext, role: Role) -> bool {
    let me = ctx.me.entity;
    let stance = if role == Role::Tank || ctx.me.health_pct() < 25.0 {
        Some((Slot::DefensiveStance, ShapeshiftForm::DefensiveStance))
    } else if ctx.me.health_pct() > 60.0 {
        if ctx.loadout().has(Slot::Bloodthirst) {
            Some((Slot::BerserkerStance, ShapeshiftForm::BerserkerStance))
        } else if ctx.loadout().has(Slot::MortalStrike) {
            Some((Slot::BattleStance, ShapeshiftForm::BattleStance))
        } else {
            None
        }
    } else {
        None
    };

    let Some((slot, form)) = stance else {
        return false;
    };
    if ctx.me.form == form {
        return false;
    }
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    if ctx.can_attempt(me, ability) && ctx.do_cast(me, ability).is_ok() {
        ctx.me.form = form;
        return true;
    }
    false
}

/// Moving and not yet slowed or rooted.
fn running_free(victim: &UnitInfo) -> bool {
    victim.moving && !victim.rooted && !victim.snared
}
