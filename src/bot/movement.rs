//! Movement Planner
//!
//! Computes where an agent should go and hands the destination to the
//! host. Every planner cancels whatever movement is pending and issues a
//! single move; the host owns pathing and the agent never retries.

use bevy::prelude::*;
use std::f32::consts::{PI, TAU};

use super::choice::choose_one;
use super::context::BotContext;
use super::rng::BotRng;
use super::role::Role;
use super::world::UnitInfo;

/// Default follow distance range, in yards.
pub const FOLLOW_MIN_DISTANCE: f32 = 3.0;
pub const FOLLOW_MAX_DISTANCE: f32 = 6.0;

/// Default follow angle range, in radians from the leader's facing.
pub const FOLLOW_MIN_ANGLE: f32 = 2.0;
pub const FOLLOW_MAX_ANGLE: f32 = 4.0;

/// Flee distance when a caller has no preference.
pub const DEFAULT_FLEE_DISTANCE: f32 = 12.0;

/// Fleeing never rallies on a leader closer than this.
pub const MIN_RALLY_DISTANCE: f32 = 20.0;

/// How close a rally brings the agent to its leader.
pub const RALLY_DISTANCE: f32 = 6.0;

/// Width of one escape sector when fleeing ground objects.
pub const SECTOR_WIDTH: f32 = 1.05;

/// Ranged roles keep this far beyond the target's bounding radius.
pub const CASTER_CHASE_DISTANCE: f32 = 25.0;

/// Point `distance` away from `origin` at planar angle `angle`.
pub fn offset_point(origin: Vec3, distance: f32, angle: f32) -> Vec3 {
    Vec3::new(
        origin.x + distance * angle.cos(),
        origin.y + distance * angle.sin(),
        origin.z,
    )
}

fn issue_move(ctx: &mut BotContext, destination: Vec3) {
    if ctx.me.moving {
        ctx.commands.request_stop_movement(ctx.me.entity);
    }
    ctx.commands.request_move(ctx.me.entity, destination);
}

/// Escape point directly away from `target`, or `None` when the agent is
/// already at least `distance` away.
pub fn flee_point(me: &UnitInfo, target: &UnitInfo, distance: f32, rng: &mut BotRng) -> Option<Vec3> {
    let offset = distance - me.distance_to(target) + rng.random_range(0.0, 0.5);
    if offset < 0.0 {
        return None;
    }
    let angle = me.angle_to(target) - PI + rng.random_range(-0.5, 0.5);
    Some(offset_point(me.position, offset, angle))
}

/// Get away from `target`. With `rally`, an agent whose leader is far from
/// it (or from the threat) runs back to the leader instead.
pub fn flee(ctx: &mut BotContext, target: &UnitInfo, distance: f32, rally: bool) {
    let rally_distance = distance.max(MIN_RALLY_DISTANCE);

    if rally {
        if let Some(leader) = ctx.leader {
            if leader.is_alive()
                && leader.map_id == ctx.me.map_id
                && (ctx.me.distance_to(&leader) > rally_distance
                    || leader.distance_to(target) > rally_distance)
            {
                move_toward(ctx, &leader, RALLY_DISTANCE);
                return;
            }
        }
    }

    if let Some(destination) = flee_point(&ctx.me, target, distance, &mut ctx.state.rng) {
        issue_move(ctx, destination);
    }
}

/// Escape sector away from the hazards around `origin`.
///
/// Each hazard blocks the sector it falls in and every sector after it.
/// Sector 1 or 5 wins outright when free; otherwise a random free sector,
/// or sector 0 when everything is blocked.
pub fn escape_sector(origin: Vec3, hazards: &[Vec3], rng: &mut BotRng) -> usize {
    let mut free = [true; 6];
    for hazard in hazards {
        let delta = *hazard - origin;
        let angle = delta.y.atan2(delta.x).rem_euclid(TAU);
        let sector = ((angle / SECTOR_WIDTH) + 0.5) as usize % 6;
        for slot in free.iter_mut().skip(sector) {
            *slot = false;
        }
    }

    if free[1] {
        return 1;
    }
    if free[5] {
        return 5;
    }
    let open: Vec<usize> = (0..6).filter(|i| free[*i]).collect();
    choose_one(&open, rng).unwrap_or(0)
}

/// Step away from ground hazards (fire bombs and the like).
pub fn flee_object(ctx: &mut BotContext, hazards: &[Vec3], distance: f32) {
    let sector = escape_sector(ctx.me.position, hazards, &mut ctx.state.rng);
    let angle = sector as f32 * SECTOR_WIDTH + ctx.state.rng.random_range(-0.1, 0.1);
    let destination = offset_point(ctx.me.position, distance, angle);
    issue_move(ctx, destination);
}

/// Leave an area effect sideways.
pub fn flee_area(ctx: &mut BotContext, radius: f32) {
    let mut angle = ctx.state.rng.random_range(1.0, 2.0);
    if ctx.state.rng.random_bool() {
        angle = -angle;
    }
    let destination = offset_point(ctx.me.position, radius, angle);
    issue_move(ctx, destination);
}

/// Move next to `target`, landing up to `distance` yards from it.
pub fn move_toward(ctx: &mut BotContext, target: &UnitInfo, distance: f32) {
    let angle = ctx.state.rng.random_range(FOLLOW_MIN_ANGLE, FOLLOW_MAX_ANGLE);
    let distance = if distance > 1.0 {
        ctx.state.rng.random_range(0.5, distance)
    } else {
        distance
    };
    let destination = offset_point(target.position, distance, angle);
    issue_move(ctx, destination);
}

/// Point on the line to `target` that puts the agent `distance` yards
/// from it.
pub fn keep_distance_point(me: &UnitInfo, target: &UnitInfo, distance: f32, rng: &mut BotRng) -> Vec3 {
    let mut angle = me.angle_to(target);
    let mut offset = me.distance_to(target) - distance + rng.random_range(-0.25, 0.25);
    if offset < 0.0 {
        angle += PI;
        offset = -offset;
    }
    offset_point(me.position, offset, angle)
}

/// Walk toward or away from `target` to stand `distance` yards from it.
pub fn maintain_distance(ctx: &mut BotContext, target: &UnitInfo, distance: f32) {
    let destination = keep_distance_point(&ctx.me, target, distance, &mut ctx.state.rng);
    issue_move(ctx, destination);
}

/// Follow the leader at a random distance and angle within the ranges.
pub fn follow_leader(ctx: &mut BotContext, min: f32, max: f32, min_angle: f32, max_angle: f32) {
    let Some(leader) = ctx.leader else {
        return;
    };
    let distance = ctx.state.rng.random_range(min, max);
    let angle = ctx.state.rng.random_range(min_angle, max_angle);
    ctx.commands.request_follow(ctx.me.entity, leader.entity, distance, angle);
}

/// Follow with the default distance and angle ranges.
pub fn follow_leader_default(ctx: &mut BotContext) {
    follow_leader(
        ctx,
        FOLLOW_MIN_DISTANCE,
        FOLLOW_MAX_DISTANCE,
        FOLLOW_MIN_ANGLE,
        FOLLOW_MAX_ANGLE,
    );
}

/// Chase distance for a role against `target`.
pub fn chase_distance(role: Role, target: &UnitInfo, rng: &mut BotRng) -> f32 {
    if role.is_ranged() {
        return target.bounding_radius + CASTER_CHASE_DISTANCE;
    }
    let mut distance = if role == Role::Tank { 1.0 } else { target.melee_reach };
    if distance > 3.0 {
        distance *= rng.random_range(0.75, 0.9);
    }
    distance
}

/// Pursue `target` at the role's preferred distance. Returns false when
/// the agent is already chasing it and nothing was issued.
pub fn chase(ctx: &mut BotContext, target: &UnitInfo) -> bool {
    if ctx.me.chasing == Some(target.entity) {
        return false;
    }
    let distance = chase_distance(ctx.role(), target, &mut ctx.state.rng);
    ctx.commands.request_chase(ctx.me.entity, target.entity, distance);
    ctx.me.chasing = Some(target.entity);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::world::UnitKind;

    fn unit_at(id: u32, x: f32, y: f32) -> UnitInfo {
        UnitInfo::new(Entity::from_raw(id), UnitKind::Player, Vec3::new(x, y, 0.0))
    }

    #[test]
    fn test_offset_point() {
        let p = offset_point(Vec3::ZERO, 10.0, 0.0);
        assert!((p.x - 10.0).abs() < 1e-4);
        assert!(p.y.abs() < 1e-4);
    }

    #[test]
    fn test_flee_point_none_when_far_enough() {
        let mut rng = BotRng::from_seed(1);
        let me = unit_at(1, 0.0, 0.0);
        let far = unit_at(2, 30.0, 0.0);
        assert!(flee_point(&me, &far, 12.0, &mut rng).is_none());
    }

    #[test]
    fn test_flee_point_moves_away() {
        let mut rng = BotRng::from_seed(2);
        let me = unit_at(1, 0.0, 0.0);
        let threat = unit_at(2, 5.0, 0.0);
        let point = flee_point(&me, &threat, 12.0, &mut rng).expect("should flee");
        assert!(point.x < 0.0, "fled toward the threat: {:?}", point);
        assert!(point.distance(threat.position) > 5.0);
    }

    #[test]
    fn test_keep_distance_backs_off_when_too_close() {
        let mut rng = BotRng::from_seed(3);
        let me = unit_at(1, 0.0, 0.0);
        let target = unit_at(2, 10.0, 0.0);
        let point = keep_distance_point(&me, &target, 25.0, &mut rng);
        assert!(point.x < -14.0 && point.x > -15.5, "{:?}", point);
    }

    #[test]
    fn test_escape_sector_prefers_side_sectors() {
        let mut rng = BotRng::from_seed(4);
        assert_eq!(escape_sector(Vec3::ZERO, &[], &mut rng), 1);
        let behind = Vec3::new((3.0_f32).cos() * 5.0, (3.0_f32).sin() * 5.0, 0.0);
        // Sector 3 blocks 3..=5; 1 remains free.
        assert_eq!(escape_sector(Vec3::ZERO, &[behind], &mut rng), 1);
        let ahead = Vec3::new(5.0, 0.0, 0.0);
        assert_eq!(escape_sector(Vec3::ZERO, &[ahead], &mut rng), 0);
    }

    #[test]
    fn test_chase_distance_by_role() {
        let mut rng = BotRng::from_seed(5);
        let target = unit_at(2, 0.0, 0.0);
        assert_eq!(chase_distance(Role::Tank, &target, &mut rng), 1.0);
        assert_eq!(
            chase_distance(Role::Healer, &target, &mut rng),
            target.bounding_radius + CASTER_CHASE_DISTANCE
        );
        let melee = chase_distance(Role::MeleeDps, &target, &mut rng);
        assert!(melee >= 3.75 && melee <= 4.5);
    }
}
