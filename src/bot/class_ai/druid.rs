//! Druid AI
//!
//! The druid's cascade branches on its current form:
//!
//! ## Forms
//! - **Cat**: Prowl openers, finishers at high combo points, Rake and Shred
//! - **Bear**: Feral Charge and Bash, roars and Swipe on packs, Maul
//! - **Caster / Moonkin**: roots to peel, Hurricane on packs, dots and nukes
//!
//! Buffs need caster form, so buffing out of combat drops the current form
//! first. Healers stay in caster form.

use bevy::prelude::*;

use crate::bot::abilities::{AbilityId, ShapeshiftForm};
use crate::bot::character::CharacterClass;
use crate::bot::commands::CancelAura;
use crate::bot::context::BotContext;
use crate::bot::movement::{flee, DEFAULT_FLEE_DISTANCE};
use crate::bot::role::Role;
use crate::bot::slot_table::{Slot, Talent};
use crate::bot::world::{UnitInfo, WorldQueryExt};

use super::{
    finish_buff_round, try_critical_heal, ClassBehavior, COMBAT_HEAL_CRITICAL, COMBAT_HEAL_MINIMUM, EMERGENCY_HEAL,
    OOC_HEAL_CRITICAL, OOC_HEAL_MINIMUM,
};

/// With Furor, leaving cat form at this energy or below refills it on the
/// next shift.
const FUROR_ENERGY: u32 = 12;

pub struct DruidBehavior;

impl ClassBehavior for DruidBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Druid
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        let wild = if ctx.loadout().has(Slot::GiftOfTheWild) {
            Slot::GiftOfTheWild
        } else {
            Slot::MarkOfTheWild
        };
        if buff_out_of_form(ctx, wild, true) || buff_out_of_form(ctx, Slot::OmenOfClarity, false) {
            return true;
        }
        if !ctx.in_raid() && buff_out_of_form(ctx, Slot::Thorns, true) {
            return true;
        }

        finish_buff_round(ctx, Slot::MarkOfTheWild);

        if try_cures(ctx) {
            return true;
        }

        if ctx.role() == Role::Healer {
            return ctx.find_and_heal_injured_ally(OOC_HEAL_MINIMUM, OOC_HEAL_CRITICAL);
        }

        match ctx.me.form {
            ShapeshiftForm::None => enter_combat_form(ctx),
            ShapeshiftForm::Cat => !ctx.me.stealthed && ctx.try_self(Slot::Prowl),
            _ => false,
        }
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let form = ctx.me.form;
        let role = ctx.role();

        if try_critical_heal(ctx) {
            return true;
        }

        if ctx.attackers_in_range_count(10.0) > 0
            && matches!(form, ShapeshiftForm::None | ShapeshiftForm::Moonkin)
            && ctx.me.health_pct() < 50.0
            && ctx.try_self(Slot::Barkskin)
        {
            return true;
        }

        if role == Role::Tank && ctx.me.health_pct() < EMERGENCY_HEAL {
            let me = ctx.me.entity;
            if ctx.heal_direct(me) {
                return true;
            }
        }
        if role != Role::Tank && ctx.find_and_heal_injured_ally(EMERGENCY_HEAL, EMERGENCY_HEAL) {
            return true;
        }

        if try_cures(ctx) {
            return true;
        }

        if role == Role::Healer {
            if ctx.allies_needing_heal_count(20.0, 70.0) >= 3 && ctx.try_self(Slot::Tranquility) {
                return true;
            }

            if try_swiftmend(ctx) {
                return true;
            }

            if ctx.find_and_heal_injured_ally(COMBAT_HEAL_MINIMUM, COMBAT_HEAL_CRITICAL) {
                return true;
            }
        }

        if form == ShapeshiftForm::None {
            if role != Role::Tank && ctx.enemies_near(10.0) > 1 {
                if let Some(attacker) = ctx.attackers().first().copied() {
                    if ctx.try_slot(attacker, Slot::Hibernate) {
                        return true;
                    }
                }
            }

            if ctx.me.health_pct() > 40.0 && ctx.me.power_pct() < 10.0 && ctx.try_self(Slot::Innervate) {
                return true;
            }

            if enter_combat_form(ctx) {
                return true;
            }
        }

        let Some(victim) = ctx.victim() else {
            return false;
        };

        if form != ShapeshiftForm::None
            && ctx.me.rooted
            && (role != Role::Tank || !ctx.me.can_reach_with_melee(&victim))
        {
            cancel_form(ctx);
        }

        if role == Role::Healer {
            return false;
        }

        match ctx.me.form {
            ShapeshiftForm::Cat => cat_rotation(ctx, &victim),
            ShapeshiftForm::Bear | ShapeshiftForm::DireBear => bear_rotation(ctx, &victim),
            ShapeshiftForm::None | ShapeshiftForm::Moonkin => caster_rotation(ctx, &victim),
            _ => false,
        }
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::Hibernate).or_else(|| ctx.slot(Slot::EntanglingRoots))
    }
}

fn cancel_form(ctx: &mut BotContext) {
    ctx.commands.request_cancel_aura(ctx.me.entity, CancelAura::Shapeshift);
    ctx.me.form = ShapeshiftForm::None;
}

/// Cast a buff, leaving any form first. `group` buffs go to whichever
/// member lacks them; others go on the druid.
fn buff_out_of_form(ctx: &mut BotContext, slot: Slot, group: bool) -> bool {
    let Some(ability) = ctx.slot(slot) else {
        return false;
    };
    let target = if group {
        ctx.select_buff_target(ability)
    } else {
        Some(ctx.me.entity)
    };
    let Some(target) = target else {
        return false;
    };
    if !ctx.can_attempt(target, ability) {
        return false;
    }
    if ctx.me.form != ShapeshiftForm::None {
        cancel_form(ctx);
    }
    if ctx.do_cast(target, ability).is_ok() {
        ctx.state.is_buffing = true;
        return true;
    }
    false
}

/// Abolish Poison (or Cure Poison), then Remove Curse.
fn try_cures(ctx: &mut BotContext) -> bool {
    let poison = ctx
        .slot(Slot::AbolishPoison)
        .or_else(|| ctx.slot(Slot::DruidCurePoison));
    for ability in poison.into_iter().chain(ctx.slot(Slot::RemoveCurse)) {
        if let Some(target) = ctx.select_dispel_target(ability) {
            if ctx.try_cast(target, ability) {
                return true;
            }
        }
    }
    false
}

/// Swiftmend a badly hurt member who has a heal-over-time on them.
fn try_swiftmend(ctx: &mut BotContext) -> bool {
    let Some(swiftmend) = ctx.slot(Slot::Swiftmend) else {
        return false;
    };
    let Some(target) = ctx.select_heal_target(50.0, false) else {
        return false;
    };
    ctx.world.has_periodic_heal(target) && ctx.try_cast(target, swiftmend)
}

/// Shift into the form the role fights in.
fn enter_combat_form(ctx: &mut BotContext) -> bool {
    let role = ctx.role();
    if role == Role::MeleeDps && ctx.try_self(Slot::CatForm) {
        return true;
    }
    if matches!(role, Role::Tank | Role::MeleeDps) && ctx.try_self(Slot::BearForm) {
        return true;
    }
    role == Role::RangeDps && ctx.try_self(Slot::MoonkinForm)
}

fn cat_rotation(ctx: &mut BotContext, victim: &UnitInfo) -> bool {
    if ctx.loadout().has_talent(Talent::Furor) && ctx.me.power <= FUROR_ENERGY {
        debug!("{:?} leaving cat form to refill energy", ctx.me.entity);
        cancel_form(ctx);
        return false;
    }

    if ctx.me.stealthed {
        return ctx.try_slot(victim.entity, Slot::Ravage) || ctx.try_slot(victim.entity, Slot::Pounce);
    }

    if ctx.attackers_in_range_count(8.0) > 0 && ctx.try_self(Slot::Cower) {
        return true;
    }

    let combo = ctx.me.combo_points;
    if (combo > 4 || (combo > 2 && victim.health_pct() < 10.0))
        && (ctx.try_slot(victim.entity, Slot::FerociousBite) || ctx.try_slot(victim.entity, Slot::Rip))
    {
        return true;
    }

    if !ctx.me.can_reach_with_melee(victim) {
        if ctx.try_slot(victim.entity, Slot::FaerieFireFeral) {
            return true;
        }
        if victim.moving && ctx.try_self(Slot::Dash) {
            return true;
        }
    }

    if ctx.try_slot(victim.entity, Slot::Rake) {
        return true;
    }

    if ctx.loadout().has(Slot::Shred) {
        ctx.try_slot(victim.entity, Slot::Shred)
    } else {
        ctx.try_slot(victim.entity, Slot::Claw)
    }
}

fn bear_rotation(ctx: &mut BotContext, victim: &UnitInfo) -> bool {
    if ctx.try_slot(victim.entity, Slot::FeralCharge) || ctx.try_slot(victim.entity, Slot::Bash) {
        return true;
    }

    if ctx.me.health_pct() < 30.0 && ctx.try_self(Slot::FrenziedRegeneration) {
        return true;
    }

    if ctx.try_slot(victim.entity, Slot::FaerieFireFeral) {
        return true;
    }

    if (ctx.me.power > 80 || ctx.attackers_in_range_count(10.0) > 1)
        && (ctx.try_slot(victim.entity, Slot::DemoralizingRoar) || ctx.try_slot(victim.entity, Slot::Swipe))
    {
        return true;
    }

    ctx.try_slot(victim.entity, Slot::Maul)
}

fn caster_rotation(ctx: &mut BotContext, victim: &UnitInfo) -> bool {
    let me = ctx.me.entity;

    if victim.victim == Some(me)
        && ctx.enemies_near(10.0) > 1
        && victim.can_reach_with_melee(&ctx.me)
        && !ctx.me.rooted
    {
        if let Some(roots) = ctx.slot(Slot::EntanglingRoots) {
            if ctx.has_aura(victim.entity, roots) {
                flee(ctx, victim, DEFAULT_FLEE_DISTANCE, true);
                return true;
            }
            if ctx.try_cast(victim.entity, roots) {
                return true;
            }
        }
    }

    if ctx.aoe_ready()
        && ctx.enemies_near_unit(victim, 8.0) > 3
        && victim.health_pct() < 75.0
        && ctx.try_slot(victim.entity, Slot::Hurricane)
    {
        return true;
    }

    if ctx.try_self(Slot::NaturesGrasp) {
        return true;
    }

    if victim.class == Some(CharacterClass::Rogue) && ctx.try_slot(victim.entity, Slot::FaerieFire) {
        return true;
    }

    if ctx.try_slot(victim.entity, Slot::InsectSwarm) || ctx.try_slot(victim.entity, Slot::Moonfire) {
        return true;
    }

    if victim.health_pct() > 50.0 && ctx.try_slot(victim.entity, Slot::Starfire) {
        return true;
    }

    ctx.try_slot(victim.entity, Slot::Wrath)
}
