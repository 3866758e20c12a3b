use bevy::prelude::*;

use crate::{
    config::CradleConfig,
    error::CradleError,
    physics::{Anchor, Body, BodyId, JointId, PhysicsEngine, World},
};

const ANCHOR_THICKNESS: f32 = 5.0;

/// Ordered handles to the balls of a built cradle.
#[derive(Debug, Clone, PartialEq)]
pub struct Cradle {
    pub balls: Vec<BodyId>,
    pub joints: Vec<JointId>,
    /// World position each ball hangs from.
    pub pivots: Vec<Vec2>,
    pub rod_length: f32,
    /// Largest swing either way that keeps a ball clear of the bar.
    pub max_angle: f32,
}

/// Populates `world` with the anchor bar, the balls and their pins.
pub fn build_scene<E: PhysicsEngine + ?Sized>(
    engine: &E,
    world: &mut World,
    config: &CradleConfig,
) -> Result<Cradle, CradleError> {
    config.validate()?;

    let anchor = Anchor {
        position: config.anchor_position,
        half_length: config.anchor_half_length,
        thickness: ANCHOR_THICKNESS,
    };
    let anchor_position = anchor.position;
    engine.add_anchor(world, anchor);

    let max_angle = clear_of_bar(config.radius, config.rod_length);
    let angle = config.initial_angle().clamp(-max_angle, max_angle);
    let mut cradle = Cradle {
        balls: Vec::with_capacity(config.ball_count as usize),
        joints: Vec::with_capacity(config.ball_count as usize),
        pivots: Vec::with_capacity(config.ball_count as usize),
        rod_length: config.rod_length,
        max_angle,
    };

    for index in 0..config.ball_count {
        let anchor_offset = Vec2::new(config.pivot_offset(index), 0.0);
        let pivot = anchor_position + anchor_offset;

        let position = if index < config.displaced_balls {
            pivot + config.rod_length * Vec2::new(angle.sin(), angle.cos())
        } else {
            pivot + Vec2::new(0.0, config.rod_length)
        };

        let ball = Body::ball(position, config.radius, config.mass)
            .with_material(config.restitution, config.friction);
        let body = engine.add_body(world, ball)?;
        let joint = engine.add_joint(world, anchor_offset, body, Vec2::ZERO)?;

        cradle.balls.push(body);
        cradle.joints.push(joint);
        cradle.pivots.push(pivot);
    }

    Ok(cradle)
}

/// The bar only collides in the sense that a ball may not swing up into it:
/// its top edge has to stay under the bar's lower edge.
fn clear_of_bar(radius: f32, rod_length: f32) -> f32 {
    ((radius + ANCHOR_THICKNESS * 0.5) / rod_length)
        .min(1.0)
        .acos()
}

impl Cradle {
    pub fn ball_count(&self) -> usize {
        self.balls.len()
    }

    /// Swing angle of ball `index` from hanging straight down. Negative is left.
    pub fn angle(&self, world: &World, index: usize) -> Option<f32> {
        let body = world.body(*self.balls.get(index)?)?;
        let offset = body.position - self.pivots[index];
        Some(offset.x.atan2(offset.y))
    }

    /// Puts ball `index` on its arc at `angle`, at rest. Angles past
    /// [`Cradle::max_angle`] stop there.
    pub fn set_angle(&self, world: &mut World, index: usize, angle: f32) {
        let Some(id) = self.balls.get(index) else {
            return;
        };
        let angle = angle.clamp(-self.max_angle, self.max_angle);
        let position = self.pivots[index] + self.rod_length * Vec2::new(angle.sin(), angle.cos());
        if let Some(body) = world.body_mut(*id) {
            body.teleport(position);
        }
    }

    /// Raises the first `count` balls to `angle` and lets them go.
    pub fn lift(&self, world: &mut World, count: usize, angle: f32) {
        for index in 0..self.ball_count() {
            let target = if index < count { angle } else { 0.0 };
            self.set_angle(world, index, target);
            if let Some(body) = world.body_mut(self.balls[index]) {
                body.held = false;
            }
        }
    }

    pub fn ball_at(&self, world: &World, point: Vec2) -> Option<usize> {
        self.balls
            .iter()
            .position(|id| world.body(*id).map_or(false, |b| b.contains(point)))
    }

    /// Holds ball `index` on its arc towards `point`, no higher than
    /// [`Cradle::max_angle`]. Balls on the side it is dragged towards are
    /// carried along.
    pub fn drag(&self, world: &mut World, index: usize, point: Vec2) {
        let Some(current) = self.angle(world, index) else {
            return;
        };
        let offset = point - self.pivots[index];
        let angle = offset.x.atan2(offset.y).clamp(-self.max_angle, self.max_angle);

        let followers = if angle < current && angle < 0.0 {
            0..index
        } else if angle > current && angle > 0.0 {
            index + 1..self.ball_count()
        } else {
            0..0
        };

        for i in followers.chain(std::iter::once(index)) {
            self.set_angle(world, i, angle);
            if let Some(body) = world.body_mut(self.balls[i]) {
                body.held = true;
            }
        }
    }

    /// Hands every ball back to the solver, at rest.
    pub fn release(&self, world: &mut World) {
        for id in &self.balls {
            if let Some(body) = world.body_mut(*id) {
                body.held = false;
                body.velocity = Vec2::ZERO;
                body.prev_position = body.position;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ConfigError, physics::PbdEngine};

    fn build(config: &CradleConfig) -> (World, Cradle) {
        let engine = PbdEngine::new(config.sub_steps);
        let mut world = engine.create_world(config.gravity);
        let cradle = build_scene(&engine, &mut world, config).unwrap();
        (world, cradle)
    }

    #[test]
    fn builds_one_joint_per_ball() {
        for count in [1, 2, 5, 9] {
            let config = CradleConfig {
                ball_count: count,
                ..default()
            };
            let (world, cradle) = build(&config);
            assert_eq!(world.bodies().len(), count as usize);
            assert_eq!(world.joints().len(), count as usize);
            assert_eq!(cradle.ball_count(), count as usize);
            for joint in world.joints() {
                let d = world
                    .anchor_point(joint)
                    .unwrap()
                    .distance(world.body_point(joint).unwrap());
                assert!((d - config.rod_length).abs() < 1e-3);
                assert!((joint.length - config.rod_length).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn rejects_empty_cradle() {
        let engine = PbdEngine::default();
        let mut world = engine.create_world(Vec2::ZERO);
        let config = CradleConfig {
            ball_count: 0,
            ..default()
        };
        let err = build_scene(&engine, &mut world, &config).unwrap_err();
        assert!(matches!(err, CradleError::Config(ConfigError::NoBalls)));
        assert!(world.bodies().is_empty());
        assert!(world.anchor().is_none());
    }

    #[test]
    fn several_balls_can_start_displaced() {
        let config = CradleConfig {
            displaced_balls: 2,
            ..default()
        };
        let (world, cradle) = build(&config);
        let expected = config.initial_angle();
        for index in 0..2 {
            assert!(
                (cradle.angle(&world, index).unwrap() - expected).abs() < 1e-4
            );
        }
        assert!(cradle.angle(&world, 2).unwrap().abs() < 1e-6);
    }

    #[test]
    fn set_angle_stays_on_the_arc() {
        let (mut world, cradle) = build(&CradleConfig::default());
        cradle.set_angle(&mut world, 3, 0.4);
        let body = world.body(cradle.balls[3]).unwrap();
        assert!(
            (body.position.distance(cradle.pivots[3]) - 150.0).abs() < 1e-3
        );
        assert!((cradle.angle(&world, 3).unwrap() - 0.4).abs() < 1e-5);
        assert_eq!(body.velocity, Vec2::ZERO);
    }

    #[test]
    fn lift_raises_leading_balls() {
        let (mut world, cradle) = build(&CradleConfig::default());
        cradle.lift(&mut world, 3, -0.7);
        for index in 0..3 {
            assert!((cradle.angle(&world, index).unwrap() + 0.7).abs() < 1e-5);
        }
        for index in 3..5 {
            assert!(cradle.angle(&world, index).unwrap().abs() < 1e-6);
        }
    }

    #[test]
    fn finds_ball_under_point() {
        let (world, cradle) = build(&CradleConfig::default());
        assert_eq!(cradle.ball_at(&world, Vec2::new(430.0, 255.0)), Some(3));
        assert_eq!(cradle.ball_at(&world, Vec2::new(430.0, 150.0)), None);
    }

    #[test]
    fn dragging_left_carries_left_neighbours() {
        let config = CradleConfig {
            initial_angle_degrees: 0.0,
            ..default()
        };
        let (mut world, cradle) = build(&config);
        let pivot = cradle.pivots[2];
        cradle.drag(&mut world, 2, pivot + Vec2::new(-100.0, 100.0));

        for index in 0..=2 {
            let angle = cradle.angle(&world, index).unwrap();
            assert!((angle + std::f32::consts::FRAC_PI_4).abs() < 1e-4);
            assert!(world.body(cradle.balls[index]).unwrap().held);
        }
        for index in 3..5 {
            assert!(cradle.angle(&world, index).unwrap().abs() < 1e-6);
            assert!(!world.body(cradle.balls[index]).unwrap().held);
        }

        cradle.release(&mut world);
        assert!(world.bodies().iter().all(|b| !b.held));
    }

    #[test]
    fn drag_stops_below_the_bar() {
        let config = CradleConfig {
            initial_angle_degrees: 0.0,
            ..default()
        };
        let (mut world, cradle) = build(&config);
        let pivot = cradle.pivots[4];
        cradle.drag(&mut world, 4, pivot + Vec2::new(50.0, -200.0));

        let angle = cradle.angle(&world, 4).unwrap();
        assert!((angle - cradle.max_angle).abs() < 1e-4);
        assert!(angle < std::f32::consts::FRAC_PI_2);

        let anchor = world.anchor().unwrap();
        let ball = world.body(cradle.balls[4]).unwrap();
        let bar_bottom = anchor.position.y + anchor.thickness * 0.5;
        assert!(ball.position.y - ball.radius >= bar_bottom - 1e-3);

        // same limit on the other side
        cradle.drag(&mut world, 0, cradle.pivots[0] + Vec2::new(-50.0, -200.0));
        assert!(
            (cradle.angle(&world, 0).unwrap() + cradle.max_angle).abs() < 1e-4
        );
    }

    #[test]
    fn steep_start_is_kept_below_the_bar() {
        let config = CradleConfig {
            initial_angle_degrees: -90.0,
            ..default()
        };
        let (world, cradle) = build(&config);
        assert!(
            (cradle.angle(&world, 0).unwrap() + cradle.max_angle).abs() < 1e-4
        );
    }

    #[test]
    fn short_rods_cannot_swing() {
        assert_eq!(clear_of_bar(15.0, 10.0), 0.0);
        assert!(
            (clear_of_bar(0.0, 1.0e6) - std::f32::consts::FRAC_PI_2).abs() < 1e-4
        );
    }
}
