//! Paladin AI
//!
//! Auras and blessings out of combat; a seal-and-judgement melee rotation,
//! or direct healing for Holy paladins. Paladins also cover emergencies on
//! other members (Blessing of Protection, Sacrifice, Lay on Hands).

use bevy::prelude::*;

use crate::bot::abilities::AbilityId;
use crate::bot::character::CharacterClass;
use crate::bot::choice::choose_present;
use crate::bot::context::BotContext;
use crate::bot::loadout::Loadout;
use crate::bot::role::Role;
use crate::bot::slot_table::Slot;
use crate::bot::world::CreatureType;

use super::{
    finish_buff_round, try_critical_heal, try_dispel, try_group_buff_by_class, ClassBehavior, PopulateInput, COMBAT_HEAL_CRITICAL,
    COMBAT_HEAL_MINIMUM, EMERGENCY_HEAL, OOC_HEAL_CRITICAL, OOC_HEAL_MINIMUM,
};

/// Judgement of the Crusader, all ranks. A victim carrying one does not
/// need another Seal of the Crusader.
const JUDGEMENT_OF_THE_CRUSADER: [AbilityId; 6] = [
    AbilityId(20188),
    AbilityId(20300),
    AbilityId(20301),
    AbilityId(20302),
    AbilityId(20303),
    AbilityId(21183),
];

/// Vengeance proc; Consecration is worth it single-target while it lasts.
const VENGEANCE: AbilityId = AbilityId(20059);

pub struct PaladinBehavior;

impl ClassBehavior for PaladinBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Paladin
    }

    fn populate_abilities(&self, loadout: &mut Loadout, input: PopulateInput) {
        let seal = match loadout.get(Slot::SealOfFury) {
            Some(fury) if input.role == Role::Tank => Some(fury),
            _ => loadout
                .get(Slot::SealOfCommand)
                .or_else(|| loadout.get(Slot::SealOfRighteousness)),
        };
        loadout.set(Slot::ChosenSeal, seal);

        let sanctuary = loadout.get(Slot::BlessingOfSanctuary);
        let light = loadout.get(Slot::BlessingOfLight);
        let (melee, ranged) = match (input.role, sanctuary, light) {
            (Role::Tank, Some(sanctuary), _) => (Some(sanctuary), Some(sanctuary)),
            (Role::Healer, _, Some(light)) => (Some(light), Some(light)),
            _ => {
                let might = loadout.get(Slot::BlessingOfMight);
                let wisdom = loadout.get(Slot::BlessingOfWisdom);
                let kings = loadout.get(Slot::BlessingOfKings);
                (
                    choose_present(&[might, kings], input.rng),
                    choose_present(&[wisdom, kings], input.rng),
                )
            }
        };
        loadout.set(Slot::BlessingMelee, melee);
        loadout.set(Slot::BlessingRanged, ranged);

        let aura = choose_present(
            &[
                loadout.get(Slot::DevotionAura),
                loadout.get(Slot::ConcentrationAura),
                loadout.get(Slot::RetributionAura),
            ],
            input.rng,
        );
        loadout.set(Slot::PaladinAura, aura);
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        if ctx.try_self(Slot::PaladinAura) {
            return true;
        }

        if ctx.role() == Role::Tank && ctx.try_self(Slot::RighteousFury) {
            return true;
        }

        if try_group_buff_by_class(ctx, Slot::BlessingMelee, Slot::BlessingRanged) {
            return true;
        }

        finish_buff_round(ctx, Slot::BlessingMelee);

        if try_dispel(ctx, Slot::Cleanse) {
            return true;
        }

        ctx.role() == Role::Healer && ctx.find_and_heal_injured_ally(OOC_HEAL_MINIMUM, OOC_HEAL_CRITICAL)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let me = ctx.me.entity;
        let role = ctx.role();

        if role != Role::Tank && ctx.me.health_pct() < 25.0 && ctx.try_self(Slot::DivineShield) {
            return true;
        }

        if try_critical_heal(ctx) {
            return true;
        }

        if let Some(friend) = ctx.select_lowest_health_ally(30.0, 70.0) {
            let physical = friend.class.map(|c| c.is_physical_damage_class()).unwrap_or(false);
            if !physical && ctx.try_slot(friend.entity, Slot::BlessingOfProtection) {
                return true;
            }
            if ctx.me.health_pct() > 80.0 && ctx.try_slot(friend.entity, Slot::BlessingOfSacrifice) {
                return true;
            }
            if friend.health_pct() < 15.0 && ctx.try_slot(friend.entity, Slot::LayOnHands) {
                return true;
            }
        }

        if role == Role::Tank && ctx.me.health_pct() < EMERGENCY_HEAL && ctx.heal_direct(me) {
            return true;
        }
        if role != Role::Tank && ctx.find_and_heal_injured_ally(EMERGENCY_HEAL, EMERGENCY_HEAL) {
            return true;
        }

        if try_dispel(ctx, Slot::Cleanse) {
            return true;
        }

        if !ctx.attackers().is_empty() {
            if ctx.try_self(Slot::HolyShield) {
                return true;
            }
            if role != Role::Tank {
                let undead = ctx
                    .select_attacker_different_from(ctx.me.victim)
                    .and_then(|a| ctx.unit(a))
                    .filter(|a| a.creature_type == CreatureType::Undead);
                if let Some(attacker) = undead {
                    if ctx.try_slot(attacker.entity, Slot::TurnUndead) {
                        return true;
                    }
                }
            }
        }

        if role == Role::Healer {
            if ctx.me.health_pct() < 50.0 && holy_shock(ctx, me) {
                return true;
            }
            if ctx.find_and_heal_injured_ally(COMBAT_HEAL_MINIMUM, COMBAT_HEAL_CRITICAL) {
                return true;
            }
        } else if damage_rotation(ctx) {
            return true;
        }

        (ctx.me.rooted || ctx.me.snared) && ctx.try_self(Slot::BlessingOfFreedom)
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::Repentance)
    }
}

/// Holy Shock on `target`. Divine Favor goes out first when it is up and
/// takes the tick; the shock follows on the next one.
fn holy_shock(ctx: &mut BotContext, target: Entity) -> bool {
    let Some(shock) = ctx.slot(Slot::HolyShock) else {
        return false;
    };
    if !ctx.can_attempt(target, shock) {
        return false;
    }
    if let Some(favor) = ctx.slot(Slot::DivineFavor) {
        let me = ctx.me.entity;
        if ctx.can_attempt(me, favor) && ctx.do_cast(me, favor).is_ok() {
            return true;
        }
    }
    ctx.do_cast(target, shock).is_ok()
}

/// Keep a seal up if none is active. Returns true if one was cast.
fn refresh_seal(ctx: &mut BotContext, victim_has_crusader: bool) -> bool {
    let me = ctx.me.entity;
    let seals = ctx.loadout().present(&[
        Slot::ChosenSeal,
        Slot::SealOfWisdom,
        Slot::SealOfTheCrusader,
    ]);
    if seals.iter().any(|s| ctx.has_aura(me, *s)) {
        return false;
    }

    if ctx.me.power_pct() < 25.0 && ctx.try_self(Slot::SealOfWisdom) {
        return true;
    }
    if !victim_has_crusader && ctx.try_self(Slot::SealOfTheCrusader) {
        return true;
    }
    ctx.try_self(Slot::ChosenSeal)
}

fn damage_rotation(ctx: &mut BotContext) -> bool {
    let Some(victim) = ctx.victim() else {
        return false;
    };
    let me = ctx.me.entity;

    let victim_has_crusader = JUDGEMENT_OF_THE_CRUSADER
        .iter()
        .any(|j| ctx.has_aura(victim.entity, *j));
    if refresh_seal(ctx, victim_has_crusader) {
        return true;
    }

    let has_seal = ctx
        .loadout()
        .present(&[Slot::ChosenSeal, Slot::SealOfWisdom, Slot::SealOfTheCrusader])
        .iter()
        .any(|s| ctx.has_aura(me, *s));
    if has_seal && ctx.me.power_pct() > 30.0 && ctx.try_slot(victim.entity, Slot::Judgement) {
        return true;
    }

    let in_trouble = ctx.me.health_pct() < 20.0 && !ctx.attackers().is_empty();
    if (victim.casting || in_trouble) && ctx.try_slot(victim.entity, Slot::HammerOfJustice) {
        return true;
    }

    if victim.health_pct() < 20.0 && ctx.try_slot(victim.entity, Slot::HammerOfWrath) {
        return true;
    }

    let vengeance = ctx.has_aura(me, VENGEANCE) && victim.can_reach_with_melee(&ctx.me);
    if (ctx.enemies_near(10.0) > 2 || vengeance) && ctx.try_self(Slot::Consecration) {
        return true;
    }

    if holy_shock(ctx, victim.entity) {
        return true;
    }

    let creature = !victim.is_player();
    if creature
        && victim.creature_type == CreatureType::Undead
        && ctx.try_slot(victim.entity, Slot::Exorcism)
    {
        return true;
    }

    if creature
        && matches!(victim.creature_type, CreatureType::Undead | CreatureType::Demon)
        && ctx.attackers().len() < 3
        && ctx.try_slot(victim.entity, Slot::HolyWrath)
    {
        debug!("{:?} Holy Wrath on {:?}", me, victim.entity);
        return true;
    }

    false
}
