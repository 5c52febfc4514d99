//! Priest AI
//!
//! Fortitude, Spirit and Shadow Protection for the party out of combat.
//! Healers run the shared healing passes with Prayer of Healing on grouped
//! damage; Shadow priests dot and blast from Shadowform.

use crate::bot::abilities::{AbilityId, ShapeshiftForm};
use crate::bot::character::CharacterClass;
use crate::bot::context::BotContext;
use crate::bot::movement::{flee, DEFAULT_FLEE_DISTANCE};
use crate::bot::role::Role;
use crate::bot::slot_table::Slot;

use super::{
    finish_buff_round, try_auto_repeat, try_critical_heal, try_dispel, try_group_buff, ClassBehavior,
    COMBAT_HEAL_CRITICAL, COMBAT_HEAL_MINIMUM, EMERGENCY_HEAL, OOC_HEAL_CRITICAL, OOC_HEAL_MINIMUM,
};
use super::mage::SHOOT;

/// Prayer of Healing needs this many hurt members in reach.
const PRAYER_OF_HEALING_MIN_TARGETS: usize = 3;

pub struct PriestBehavior;

impl ClassBehavior for PriestBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Priest
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        let fortitude = prefer(ctx, Slot::PrayerOfFortitude, Slot::PowerWordFortitude);
        if try_group_buff(ctx, fortitude) {
            return true;
        }

        let spirit = prefer(ctx, Slot::PrayerOfSpirit, Slot::DivineSpirit);
        if try_group_buff(ctx, spirit) {
            return true;
        }

        if try_group_buff(ctx, Slot::ShadowProtection) {
            return true;
        }

        if ctx.try_self(Slot::InnerFire) || ctx.try_self(Slot::TouchOfWeakness) {
            ctx.state.is_buffing = true;
            return true;
        }

        finish_buff_round(ctx, fortitude);

        if try_dispel(ctx, Slot::DispelMagic) || try_dispel(ctx, Slot::AbolishDisease) {
            return true;
        }

        ctx.role() == Role::Healer && ctx.find_and_heal_injured_ally(OOC_HEAL_MINIMUM, OOC_HEAL_CRITICAL)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let me = ctx.me.entity;

        if try_critical_heal(ctx) {
            return true;
        }

        if !ctx.attackers().is_empty() {
            if ctx.try_self(Slot::Fade) {
                return true;
            }

            if ctx.try_self(Slot::PowerWordShield) {
                return true;
            }

            if shackle_first_attacker(ctx) {
                return true;
            }

            if ctx.me.health_pct() < 50.0
                && ctx.attackers_within(10.0) > 1
                && ctx.try_self(Slot::PsychicScream)
            {
                return true;
            }
        }

        if ctx.me.power_pct() < 50.0 {
            if let Some(focus) = ctx.slot(Slot::InnerFocus) {
                if ctx.can_attempt(me, focus) && ctx.do_cast(me, focus).is_ok() {
                    return true;
                }
            }
        }

        if ctx.find_and_heal_injured_ally(EMERGENCY_HEAL, EMERGENCY_HEAL) {
            return true;
        }

        if try_dispel(ctx, Slot::DispelMagic) || try_dispel(ctx, Slot::AbolishDisease) {
            return true;
        }

        if ctx.role() == Role::Healer {
            if ctx.allies_needing_heal_count(20.0, 70.0) >= PRAYER_OF_HEALING_MIN_TARGETS
                && ctx.try_self(Slot::PrayerOfHealing)
            {
                return true;
            }

            if let Some(target) = ctx.select_shield_target() {
                if ctx.try_slot(target, Slot::PowerWordShield) {
                    return true;
                }
            }

            return ctx.find_and_heal_injured_ally(COMBAT_HEAL_MINIMUM, COMBAT_HEAL_CRITICAL);
        }

        shadow_rotation(ctx)
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::ShackleUndead)
    }
}

/// The group variant of a buff when known, otherwise the single-target one.
fn prefer(ctx: &BotContext, group: Slot, single: Slot) -> Slot {
    if ctx.loadout().has(group) {
        group
    } else {
        single
    }
}

/// Shackle the first attacker if it would win the fight; once it is held,
/// step away from it.
fn shackle_first_attacker(ctx: &mut BotContext) -> bool {
    let Some(shackle) = ctx.slot(Slot::ShackleUndead) else {
        return false;
    };
    let Some(attacker) = ctx.attackers().first().and_then(|a| ctx.unit(*a)) else {
        return false;
    };
    if ctx.has_aura_any_rank(attacker.entity, shackle) {
        if ctx.me.rooted || !attacker.can_reach_with_melee(&ctx.me) {
            return false;
        }
        flee(ctx, &attacker, DEFAULT_FLEE_DISTANCE, true);
        return true;
    }
    if attacker.health <= ctx.me.health || !ctx.can_use_crowd_control(shackle, attacker.entity) {
        return false;
    }
    ctx.try_cast(attacker.entity, shackle)
}

fn shadow_rotation(ctx: &mut BotContext) -> bool {
    let Some(victim) = ctx.victim() else {
        return false;
    };
    let me = ctx.me.entity;

    if ctx.me.form != ShapeshiftForm::Shadowform && ctx.try_self(Slot::Shadowform) {
        return true;
    }

    if victim.casting && ctx.try_slot(victim.entity, Slot::Silence) {
        return true;
    }

    if ctx.me.form == ShapeshiftForm::None
        && ctx.enemies_near(10.0) > 2
        && ctx.aoe_ready()
        && ctx.try_self(Slot::HolyNova)
    {
        return true;
    }

    if ctx.me.power_pct() < 50.0
        && victim.uses_mana()
        && victim.power_pct() > 10.0
        && ctx.try_slot(victim.entity, Slot::ManaBurn)
    {
        return true;
    }

    let dots = [
        Slot::VampiricEmbrace,
        Slot::ShadowWordPain,
        Slot::DevouringPlague,
        Slot::MindBlast,
        Slot::MindFlay,
        Slot::Smite,
    ];
    if dots.into_iter().any(|slot| ctx.try_slot(victim.entity, slot)) {
        return true;
    }

    ctx.book.knows(me, SHOOT) && try_auto_repeat(ctx, SHOOT)
}
