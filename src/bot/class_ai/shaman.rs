//! Shaman AI
//!
//! One totem per element, picked once at population. Healers run the
//! shared healing passes; everyone else shocks, strikes and bolts.

use crate::bot::abilities::AbilityId;
use crate::bot::character::CharacterClass;
use crate::bot::choice::choose_present;
use crate::bot::context::BotContext;
use crate::bot::loadout::Loadout;
use crate::bot::rng::BotRng;
use crate::bot::role::Role;
use crate::bot::slot_table::Slot;
use crate::bot::world::WeaponHand;

use super::{
    try_critical_heal, try_dispel, try_weapon_enchant, ClassBehavior, PopulateInput, COMBAT_HEAL_CRITICAL,
    COMBAT_HEAL_MINIMUM, EMERGENCY_HEAL, OOC_HEAL_CRITICAL, OOC_HEAL_MINIMUM,
};

pub struct ShamanBehavior;

impl ClassBehavior for ShamanBehavior {
    fn class(&self) -> CharacterClass {
        CharacterClass::Shaman
    }

    fn populate_abilities(&self, loadout: &mut Loadout, input: PopulateInput) {
        let air = pick(
            loadout,
            &[
                Slot::GraceOfAirTotem,
                Slot::NatureResistanceTotem,
                Slot::WindfuryTotem,
                Slot::WindwallTotem,
                Slot::TranquilAirTotem,
            ],
            input.rng,
        );
        let earth = pick(
            loadout,
            &[
                Slot::EarthbindTotem,
                Slot::StoneclawTotem,
                Slot::StoneskinTotem,
                Slot::StrengthOfEarthTotem,
                Slot::TremorTotem,
            ],
            input.rng,
        );
        let fire = pick(
            loadout,
            &[
                Slot::FireNovaTotem,
                Slot::MagmaTotem,
                Slot::SearingTotem,
                Slot::FlametongueTotem,
                Slot::FrostResistanceTotem,
            ],
            input.rng,
        );
        let water = pick(
            loadout,
            &[
                Slot::FireResistanceTotem,
                Slot::DiseaseCleansingTotem,
                Slot::HealingStreamTotem,
                Slot::ManaSpringTotem,
                Slot::PoisonCleansingTotem,
            ],
            input.rng,
        );
        loadout.set(Slot::AirTotem, air);
        loadout.set(Slot::EarthTotem, earth);
        loadout.set(Slot::FireTotem, fire);
        loadout.set(Slot::WaterTotem, water);

        let weapon = match loadout.get(Slot::WindfuryWeapon) {
            Some(windfury) if input.role == Role::MeleeDps => Some(windfury),
            _ => pick(
                loadout,
                &[Slot::WindfuryWeapon, Slot::RockbiterWeapon, Slot::FrostbrandWeapon],
                input.rng,
            ),
        };
        loadout.set(Slot::WeaponBuff, weapon);
    }

    fn update_out_of_combat(&self, ctx: &mut BotContext) -> bool {
        if try_weapon_enchant(ctx, Slot::WeaponBuff, WeaponHand::MainHand) {
            return true;
        }

        if ctx.try_self(Slot::LightningShield) {
            return true;
        }

        ctx.role() == Role::Healer && ctx.find_and_heal_injured_ally(OOC_HEAL_MINIMUM, OOC_HEAL_CRITICAL)
    }

    fn update_in_combat(&self, ctx: &mut BotContext) -> bool {
        if try_critical_heal(ctx) {
            return true;
        }

        if ctx.me.power_pct() < 50.0 && ctx.try_self(Slot::ManaTideTotem) {
            return true;
        }

        if ctx.find_and_heal_injured_ally(EMERGENCY_HEAL, EMERGENCY_HEAL) {
            return true;
        }

        if try_dispel(ctx, Slot::CureDisease) || try_dispel(ctx, Slot::ShamanCurePoison) {
            return true;
        }

        if ctx.role() == Role::Healer {
            return ctx.find_and_heal_injured_ally(COMBAT_HEAL_MINIMUM, COMBAT_HEAL_CRITICAL);
        }

        if let Some(victim) = ctx.victim() {
            if summon_totems(ctx) {
                return true;
            }

            if ctx.attackers().is_empty() && ctx.try_self(Slot::ElementalMastery) {
                return true;
            }

            if victim.casting && ctx.try_slot(victim.entity, Slot::EarthShock) {
                return true;
            }

            if victim.moving && ctx.try_slot(victim.entity, Slot::FrostShock) {
                return true;
            }

            if ctx.try_slot(victim.entity, Slot::Stormstrike)
                || ctx.try_slot(victim.entity, Slot::ChainLightning)
            {
                return true;
            }

            if let Some(purge) = ctx.slot(Slot::Purge) {
                if ctx.is_valid_dispel_target(&victim, purge) && ctx.try_cast(victim.entity, purge) {
                    return true;
                }
            }

            if ctx.try_slot(victim.entity, Slot::FlameShock) {
                return true;
            }

            let bolt_range = ctx.role() == Role::RangeDps || !ctx.me.can_reach_with_melee(&victim);
            if bolt_range && ctx.try_slot(victim.entity, Slot::LightningBolt) {
                return true;
            }
        }

        summon_totems(ctx)
    }
}

/// Random filled slot among `slots`.
fn pick(loadout: &Loadout, slots: &[Slot], rng: &mut BotRng) -> Option<AbilityId> {
    let present: Vec<Option<AbilityId>> = slots.iter().map(|s| loadout.get(*s)).collect();
    choose_present(&present, rng)
}

/// Drop the chosen totem of each element that is not already down.
fn summon_totems(ctx: &mut BotContext) -> bool {
    [Slot::AirTotem, Slot::EarthTotem, Slot::FireTotem, Slot::WaterTotem]
        .into_iter()
        .any(|totem| ctx.try_self(totem))
}
