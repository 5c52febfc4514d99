//! Cast Eligibility
//!
//! Stateless predicates answering "may this ability be cast right now?".
//! They never issue commands and never fail: an unknown unit or catalog
//! entry simply makes the answer `false`.
//!
//! ## Checks
//! - `is_ready`: cooldown, global cooldown, caster aura state, shapeshift
//!   form, power
//! - `can_attempt`: `is_ready` plus target immunity, target aura state,
//!   reflection, aura stacking and range
//! - dispel and buff target validity

use bevy::prelude::*;

use super::abilities::{AbilityId, AbilityInfo, DamageClass, DispelType, PowerType};
use super::world::{AbilityBook, AuraInfo, UnitInfo, WorldQuery, WorldQueryExt};

/// Whether `me` could start casting `ability` if a target were in range.
pub fn is_ready(book: &dyn AbilityBook, me: &UnitInfo, ability: AbilityId) -> bool {
    let Some(info) = book.ability(ability) else {
        return false;
    };

    if book.cooldown_remaining(me.entity, ability) > 0 {
        return false;
    }

    if info.on_global_cooldown && book.global_cooldown_remaining(me.entity, ability) > 0 {
        return false;
    }

    if let Some(state) = info.caster_aura_state {
        if !me.has_aura_state(state) {
            return false;
        }
    }

    if !info.usable_in_form(me.form) {
        return false;
    }

    has_power_for(me, info)
}

fn has_power_for(me: &UnitInfo, info: &AbilityInfo) -> bool {
    match info.power_type {
        PowerType::Health => me.health > info.cost,
        power_type => me.power_of(power_type) >= info.cost,
    }
}

/// Whether `ability` may be cast by `me` on `target` this tick.
///
/// `max_stack` is the number of stacks of the ability's aura the target may
/// already carry; 1 means "not if already present".
pub fn can_attempt(
    world: &dyn WorldQuery,
    book: &dyn AbilityBook,
    me: &UnitInfo,
    target: Entity,
    ability: AbilityId,
    max_stack: u32,
) -> bool {
    if !is_ready(book, me, ability) {
        return false;
    }

    let Some(info) = book.ability(ability) else {
        return false;
    };

    let Some(target_info) = world.unit(target) else {
        return false;
    };

    if target_info.immune_schools.contains(info.school) {
        return false;
    }
    if let Some(mechanic) = info.mechanic() {
        if target_info.is_immune_to_mechanic(mechanic) {
            return false;
        }
    }

    if let Some(state) = info.target_aura_state {
        if !target_info.has_aura_state(state) {
            return false;
        }
    }

    if info.damage_class == DamageClass::Magic && target_info.reflect_schools.contains(info.school) {
        return false;
    }

    if info.applies_aura() {
        let aura_holder = if info.self_targeted { me.entity } else { target };
        if world.aura_stacks(aura_holder, ability) >= max_stack.max(1) {
            return false;
        }
    }

    let on_self = target == me.entity || info.self_targeted;
    if !on_self {
        let Some(max_range) = info.max_range else {
            return false;
        };
        let distance = me.combat_distance_to(&target_info);
        if distance > max_range || distance < info.min_range {
            return false;
        }
    }

    true
}

/// A negative aura a friendly dispel could remove, or a positive aura a
/// hostile purge could strip.
fn is_dispellable(aura: &AuraInfo, kinds: &[DispelType], friendly: bool) -> bool {
    aura.dispel != DispelType::None && kinds.contains(&aura.dispel) && aura.positive != friendly
}

/// Whether `target` carries something `ability` can dispel.
///
/// Friendly targets need a negative aura, hostile targets a positive one and
/// must be attackable. A target immune to the dispel's school never
/// qualifies.
pub fn is_valid_dispel_target(
    world: &dyn WorldQuery,
    book: &dyn AbilityBook,
    me: &UnitInfo,
    target: &UnitInfo,
    ability: AbilityId,
) -> bool {
    let Some(info) = book.ability(ability) else {
        return false;
    };

    let kinds: Vec<DispelType> = info.dispels().collect();
    if kinds.is_empty() {
        return false;
    }

    if target.immune_schools.contains(info.school) {
        return false;
    }

    let hostile = world.can_attack(me.entity, target.entity);
    world
        .auras(target.entity)
        .iter()
        .any(|aura| is_dispellable(aura, &kinds, !hostile))
}

/// Whether `target` could use the buff `ability` without overwriting an
/// equal or stronger effect.
pub fn is_valid_buff_target(world: &dyn WorldQuery, book: &dyn AbilityBook, target: Entity, ability: AbilityId) -> bool {
    let Some(info) = book.ability(ability) else {
        return false;
    };
    let head = info.chain_head();
    let group = info.aura.as_ref().and_then(|a| a.exclusive_group);
    let power = info.aura.as_ref().map(|a| a.group_power).unwrap_or(0);

    !world.auras(target).iter().any(|aura| {
        aura.ability == ability
            || aura.chain_head == head
            || (group.is_some() && aura.exclusive_group == group && aura.group_power >= power)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::abilities::{AbilityInfo, AuraSpec, SpellSchool};
    use crate::bot::world::{AuraInfo, KnownAbility};
    use crate::bot::ability_config::AbilityCatalog;
    use crate::sandbox::SandboxWorld;
    use crate::bot::world::UnitKind;

    fn fireball() -> AbilityInfo {
        ron::from_str(
            r#"(id: 133, name: "Fireball", school: Fire, damage_class: Magic, cost: 30,
                max_range: Some(35.0), cast_time_ms: 1500, effects: [Damage])"#,
        )
        .expect("fireball parses")
    }

    fn world_with(abilities: Vec<AbilityInfo>) -> (SandboxWorld, Entity, Entity) {
        let mut world = SandboxWorld::new(AbilityCatalog::from_abilities(abilities));
        let me = world.spawn_unit(UnitKind::Player, Vec3::ZERO, |_| {});
        let enemy = world.spawn_unit(UnitKind::Creature, Vec3::new(20.0, 0.0, 0.0), |_| {});
        world.set_hostile(me, enemy);
        (world, me, enemy)
    }

    #[test]
    fn test_is_ready_respects_cooldown_and_power() {
        let (mut world, me, _) = world_with(vec![fireball()]);
        world.learn(me, KnownAbility::active(AbilityId(133)));
        let info = world.unit(me).expect("me");
        assert!(is_ready(&world, &info, AbilityId(133)));

        world.set_cooldown(me, AbilityId(133), 500);
        assert!(!is_ready(&world, &info, AbilityId(133)));

        world.set_cooldown(me, AbilityId(133), 0);
        world.update_unit(me, |u| u.power = 10);
        let info = world.unit(me).expect("me");
        assert!(!is_ready(&world, &info, AbilityId(133)));
    }

    #[test]
    fn test_can_attempt_range_and_immunity() {
        let (mut world, me, enemy) = world_with(vec![fireball()]);
        let info = world.unit(me).expect("me");
        assert!(can_attempt(&world, &world, &info, enemy, AbilityId(133), 1));

        world.update_unit(enemy, |u| u.position = Vec3::new(50.0, 0.0, 0.0));
        assert!(!can_attempt(&world, &world, &info, enemy, AbilityId(133), 1));

        world.update_unit(enemy, |u| {
            u.position = Vec3::new(10.0, 0.0, 0.0);
            u.immune_schools = SpellSchool::Fire.mask();
        });
        assert!(!can_attempt(&world, &world, &info, enemy, AbilityId(133), 1));
    }

    #[test]
    fn test_self_cast_skips_range_but_not_immunity() {
        let heal: AbilityInfo = ron::from_str(
            r#"(id: 2050, name: "Lesser Heal", school: Holy, damage_class: Magic, cost: 30,
                max_range: Some(40.0), cast_time_ms: 1500, effects: [Heal])"#,
        )
        .expect("heal parses");
        let (mut world, me, _) = world_with(vec![heal]);
        let info = world.unit(me).expect("me");
        assert!(can_attempt(&world, &world, &info, me, AbilityId(2050), 1));

        world.update_unit(me, |u| u.immune_schools = SpellSchool::Holy.mask());
        let info = world.unit(me).expect("me");
        assert!(!can_attempt(&world, &world, &info, me, AbilityId(2050), 1));
    }

    #[test]
    fn test_dispel_skips_immune_target() {
        let dispel: AbilityInfo = ron::from_str(
            r#"(id: 527, name: "Dispel Magic", school: Holy, damage_class: Magic, cost: 20,
                max_range: Some(30.0), effects: [Dispel(Magic)])"#,
        )
        .expect("dispel parses");
        let (mut world, me, _) = world_with(vec![dispel]);
        let ally = world.spawn_unit(UnitKind::Player, Vec3::new(5.0, 0.0, 0.0), |_| {});
        world.add_aura(
            ally,
            AuraInfo {
                ability: AbilityId(589),
                chain_head: AbilityId(589),
                caster: None,
                stacks: 1,
                positive: false,
                dispel: DispelType::Magic,
                periodic_heal: false,
                exclusive_group: None,
                group_power: 0,
            },
        );
        let info = world.unit(me).expect("me");
        let ally_info = world.unit(ally).expect("ally");
        assert!(is_valid_dispel_target(&world, &world, &info, &ally_info, AbilityId(527)));

        world.update_unit(ally, |u| u.immune_schools = SpellSchool::Holy.mask());
        let ally_info = world.unit(ally).expect("ally");
        assert!(!is_valid_dispel_target(&world, &world, &info, &ally_info, AbilityId(527)));
    }

    #[test]
    fn test_unknown_ability_is_never_eligible() {
        let (world, me, enemy) = world_with(vec![]);
        let info = world.unit(me).expect("me");
        assert!(!is_ready(&world, &info, AbilityId(999)));
        assert!(!can_attempt(&world, &world, &info, enemy, AbilityId(999), 1));
    }

    #[test]
    fn test_aura_stack_limit() {
        let mut sunder = fireball();
        sunder.id = AbilityId(7386);
        sunder.cast_time_ms = 0;
        sunder.aura = Some(AuraSpec { max_stack: 5, ..Default::default() });
        let (mut world, me, enemy) = world_with(vec![sunder]);
        world.add_aura(
            enemy,
            AuraInfo {
                ability: AbilityId(7386),
                chain_head: AbilityId(7386),
                caster: Some(me),
                stacks: 2,
                positive: false,
                dispel: DispelType::None,
                periodic_heal: false,
                exclusive_group: None,
                group_power: 0,
            },
        );
        let info = world.unit(me).expect("me");
        assert!(!can_attempt(&world, &world, &info, enemy, AbilityId(7386), 1));
        assert!(!can_attempt(&world, &world, &info, enemy, AbilityId(7386), 2));
        assert!(can_attempt(&world, &world, &info, enemy, AbilityId(7386), 5));
    }
}
