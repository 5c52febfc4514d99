//! Rogue AI
//!
//! Poisons and Stealth near the leader out of combat. Openers from stealth,
//! a random finisher at five combo points, Blind on a second attacker,
//! interrupts, then builders.

use bevy::prelude::*;

use crate::bot::abilities::AbilityId;
use crate::bot::character::CharacterClass;
use crate::bot::choice::{choose_one, choose_present};
use crate::bot::context::BotContext;
use crate::bot::loadout::Loadout;
use crate::bot::movement::{flee, DEFAULT_FLEE_DISTANCE};
use crate::bot::rng::BotRng;
use crate::bot::slot_table::Slot;
use crate::bot::world::WeaponHand;

use super::{try_weapon_enchant, ClassBehavior, PopulateInput};

/// Stealth is only entered this close to the leader.
const STEALTH_LEADER_RANGE: f32 = 10.0;

/// Finishers fire at this many combo points.
const FINISHER_COMBO_POINTS: u32 = 5;

pub struct RogueBehavior;

impl ClassBehavior for RogueBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Rogue
    }

    fn populate_abilities(&self, loadout: &mut Loadout, input: PopulateInput) {
        let main_hand = pick_poison(loadout, input.rng);
        let off_hand = pick_poison(loadout, input.rng);
        loadout.set(Slot::MainHandPoison, main_hand);
        loadout.set(Slot::OffHandPoison, off_hand);
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        if try_weapon_enchant(ctx, Slot::MainHandPoison, WeaponHand::MainHand)
            || try_weapon_enchant(ctx, Slot::OffHandPoison, WeaponHand::OffHand)
        {
            return true;
        }

        let near_leader = ctx
            .leader
            .map(|leader| ctx.me.distance_to(&leader) <= STEALTH_LEADER_RANGE)
            .unwrap_or(false);
        near_leader && !ctx.me.stealthed && ctx.try_self(Slot::Stealth)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        let Some(victim) = ctx.victim() else {
            return false;
        };
        let me = ctx.me.entity;

        if ctx.me.stealthed {
            // Vanished out of trouble: get clear before opening again.
            if ctx.me.health_pct() < 10.0 && !ctx.me.rooted && victim.can_reach_with_melee(&ctx.me) {
                flee(ctx, &victim, DEFAULT_FLEE_DISTANCE, true);
                return true;
            }

            if let Some(premeditation) = ctx.slot(Slot::Premeditation) {
                if ctx.can_attempt(victim.entity, premeditation)
                    && ctx.do_cast(victim.entity, premeditation).is_ok()
                {
                    return true;
                }
            }

            let openers: &[Slot] = if victim.is_caster() {
                &[Slot::Garrote]
            } else {
                &[Slot::Ambush, Slot::CheapShot]
            };
            if openers.iter().any(|slot| ctx.try_slot(victim.entity, *slot)) {
                return true;
            }
        } else if ctx.me.health_pct() < 10.0 {
            if let Some(vanish) = ctx.slot(Slot::Vanish) {
                if !ctx.is_ready(vanish) && ctx.try_self(Slot::Preparation) {
                    return true;
                }
                if ctx.try_cast(me, vanish) {
                    return true;
                }
            }
        }

        if ctx.me.combo_points >= FINISHER_COMBO_POINTS {
            let finishers = ctx.loadout().present(&[
                Slot::SliceAndDice,
                Slot::Eviscerate,
                Slot::KidneyShot,
                Slot::ExposeArmor,
                Slot::Rupture,
            ]);
            if let Some(finisher) = choose_one(&finishers, &mut ctx.state.rng) {
                if ctx.try_cast(victim.entity, finisher) {
                    return true;
                }
            }
        }

        if try_blind_second_attacker(ctx, victim.entity) {
            return true;
        }

        if ctx.me.power == 0 && ctx.try_self(Slot::AdrenalineRush) {
            return true;
        }

        if victim.casting
            && (ctx.try_slot(victim.entity, Slot::Gouge) || ctx.try_slot(victim.entity, Slot::Kick))
        {
            return true;
        }

        if !ctx.me.stealthed {
            let melee_victim = !victim.class.map(|c| c.is_ranged_damage_class()).unwrap_or(false);
            if ctx.me.health_pct() < 80.0
                && (ctx.attackers_in_range_count(10.0) > 2 || melee_victim)
                && ctx.try_self(Slot::Evasion)
            {
                return true;
            }

            if let Some(cold_blood) = ctx.slot(Slot::ColdBlood) {
                if ctx.can_attempt(me, cold_blood) && ctx.do_cast(me, cold_blood).is_ok() {
                    return true;
                }
            }

            if ctx.try_self(Slot::BladeFlurry) {
                return true;
            }
        }

        let builders = [
            Slot::Riposte,
            Slot::Backstab,
            Slot::GhostlyStrike,
            Slot::Hemorrhage,
            Slot::SinisterStrike,
        ];
        if builders.into_iter().any(|slot| ctx.try_slot(victim.entity, slot)) {
            return true;
        }

        !ctx.me.rooted && !ctx.me.can_reach_with_melee(&victim) && ctx.try_self(Slot::Sprint)
    }

    fn crowd_control_ability(&self, ctx: &BotContext) -> Option<AbilityId> {
        ctx.slot(Slot::Sap)
    }
}

/// One random known poison.
fn pick_poison(loadout: &Loadout, rng: &mut BotRng) -> Option<AbilityId> {
    choose_present(
        &[
            loadout.get(Slot::DeadlyPoison),
            loadout.get(Slot::InstantPoison),
            loadout.get(Slot::CripplingPoison),
            loadout.get(Slot::WoundPoison),
            loadout.get(Slot::MindNumbingPoison),
        ],
        rng,
    )
}

/// Blind an attacker other than the victim and keep swinging at the victim.
fn try_blind_second_attacker(ctx: &mut BotContext, victim: Entity) -> bool {
    let Some(blind) = ctx.slot(Slot::Blind) else {
        return false;
    };
    let Some(target) = ctx.select_attacker_different_from(Some(victim)) else {
        return false;
    };
    if !ctx.can_use_crowd_control(blind, target) || !ctx.try_cast(target, blind) {
        return false;
    }
    ctx.commands.request_attack(ctx.me.entity, victim, true);
    true
}
